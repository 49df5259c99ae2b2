//! Access to raw parsed values, keyed by registered argument id.
//!
//! "Unset" is `Ok(None)` and never confused with an empty string: a user who
//! passes `--lineterminator ''` gets `Some(FieldValue::Text(""))`.

use crate::action::{collect_occurrences, Accumulation};
use crate::fields::{FieldShape, FieldValue};
use crate::validate::QuotingMode;
use crate::ArgmapError;
use clap::parser::ValueSource;
use clap::ArgMatches;
use indexmap::IndexMap;

/// Argument ids and flags one field was registered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKey {
    pub(crate) id: String,
    pub(crate) long: String,
    pub(crate) negated_id: Option<String>,
    pub(crate) negated_long: Option<String>,
}

impl FieldKey {
    /// `--{prefix}-{name}` with id `{prefix}_{name}`, or `--{name}` / `{name}`
    /// without a prefix.
    pub fn new(prefix: Option<&str>, name: &str, negatable: bool) -> Self {
        let (id, long, negated_id, negated_long) = match prefix {
            Some(p) => (
                format!("{p}_{name}"),
                format!("{p}-{name}"),
                format!("{p}_no_{name}"),
                format!("{p}-no-{name}"),
            ),
            None => (
                name.to_string(),
                name.to_string(),
                format!("no_{name}"),
                format!("no-{name}"),
            ),
        };
        Self {
            id,
            long,
            negated_id: negatable.then_some(negated_id),
            negated_long: negatable.then_some(negated_long),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn flag(&self) -> String {
        format!("--{}", self.long)
    }

    pub fn negated_id(&self) -> Option<&str> {
        self.negated_id.as_deref()
    }

    pub fn negated_flag(&self) -> Option<String> {
        self.negated_long.as_ref().map(|long| format!("--{long}"))
    }
}

/// Source of raw per-field values for the deferred dialect builder.
pub trait RawValues {
    /// The value supplied for `key`, or `None` when it was left unset.
    fn lookup(&self, key: &FieldKey, shape: FieldShape) -> Result<Option<FieldValue>, ArgmapError>;
}

impl RawValues for ArgMatches {
    fn lookup(&self, key: &FieldKey, shape: FieldShape) -> Result<Option<FieldValue>, ArgmapError> {
        ensure_known(self, key.id())?;
        match shape {
            FieldShape::Flag { .. } => {
                if was_supplied(self, key.id()) {
                    return Ok(Some(FieldValue::Flag(true)));
                }
                if let Some(negated) = key.negated_id() {
                    ensure_known(self, negated)?;
                    if was_supplied(self, negated) {
                        return Ok(Some(FieldValue::Flag(false)));
                    }
                }
                Ok(None)
            }
            FieldShape::Char => Ok(last::<char>(self, key.id())?.map(FieldValue::Char)),
            FieldShape::Text => Ok(last::<String>(self, key.id())?.map(FieldValue::Text)),
            FieldShape::Quoting => Ok(last::<QuotingMode>(self, key.id())?.map(FieldValue::Quoting)),
        }
    }
}

/// In-memory values keyed by argument id; absence means unset.
impl RawValues for IndexMap<String, FieldValue> {
    fn lookup(&self, key: &FieldKey, shape: FieldShape) -> Result<Option<FieldValue>, ArgmapError> {
        match self.get(key.id()) {
            Some(value) if !shape.admits(value) => Err(ArgmapError::ShapeMismatch {
                field: key.flag(),
                expected: shape.describe(),
            }),
            value => Ok(value.cloned()),
        }
    }
}

fn ensure_known(matches: &ArgMatches, id: &str) -> Result<(), ArgmapError> {
    matches
        .try_contains_id(id)
        .map(|_| ())
        .map_err(|_| ArgmapError::UnknownField(id.to_string()))
}

fn was_supplied(matches: &ArgMatches, id: &str) -> bool {
    matches!(matches.value_source(id), Some(source) if source != ValueSource::DefaultValue)
}

fn last<T>(matches: &ArgMatches, id: &str) -> Result<Option<T>, ArgmapError>
where
    T: Clone + Send + Sync + 'static,
{
    Ok(collect_occurrences::<T>(matches, id, Accumulation::Replace)?.into_single())
}
