//! Field specifications for the dialect argument group.
//!
//! Each [`FieldSpec`] describes one configurable dialect attribute: which
//! field it is, what shape of input it takes, and the value used when the
//! user leaves it unset. [`DialectFields`] is the ordered set a group
//! registers.

use crate::validate::{quoting_choices, QuotingMode};
use crate::ArgmapError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DialectField {
    Delimiter,
    QuoteChar,
    EscapeChar,
    DoubleQuote,
    SkipInitialSpace,
    LineTerminator,
    Quoting,
}

impl DialectField {
    /// Every field, in registration order.
    pub const ALL: [DialectField; 7] = [
        DialectField::Delimiter,
        DialectField::QuoteChar,
        DialectField::EscapeChar,
        DialectField::DoubleQuote,
        DialectField::SkipInitialSpace,
        DialectField::LineTerminator,
        DialectField::Quoting,
    ];

    /// Flag name without prefix or dashes.
    pub fn name(self) -> &'static str {
        match self {
            DialectField::Delimiter => "delimiter",
            DialectField::QuoteChar => "quotechar",
            DialectField::EscapeChar => "escapechar",
            DialectField::DoubleQuote => "doublequote",
            DialectField::SkipInitialSpace => "skipinitialspace",
            DialectField::LineTerminator => "lineterminator",
            DialectField::Quoting => "quoting",
        }
    }

    pub fn shape(self) -> FieldShape {
        match self {
            DialectField::Delimiter | DialectField::QuoteChar | DialectField::EscapeChar => {
                FieldShape::Char
            }
            DialectField::DoubleQuote => FieldShape::Flag { negatable: true },
            DialectField::SkipInitialSpace => FieldShape::Flag { negatable: false },
            DialectField::LineTerminator => FieldShape::Text,
            DialectField::Quoting => FieldShape::Quoting,
        }
    }

    fn help(self) -> &'static str {
        match self {
            DialectField::Delimiter => "Character separating fields",
            DialectField::QuoteChar => "Character used to quote fields containing special characters",
            DialectField::EscapeChar => "Character used to escape the delimiter or quote character",
            DialectField::DoubleQuote => "Represent a quote character inside a field as two quote characters",
            DialectField::SkipInitialSpace => "Ignore whitespace immediately following the delimiter",
            DialectField::LineTerminator => "String terminating each record",
            DialectField::Quoting => "Which fields get quoted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// Boolean switch; a negatable flag also gets a `--no-` counterpart.
    Flag { negatable: bool },
    /// Exactly one character.
    Char,
    /// Free-form string, the empty string included.
    Text,
    /// One of the quoting-mode labels.
    Quoting,
}

impl FieldShape {
    pub fn describe(self) -> &'static str {
        match self {
            FieldShape::Flag { .. } => "boolean",
            FieldShape::Char => "single-character",
            FieldShape::Text => "string",
            FieldShape::Quoting => "quoting mode",
        }
    }

    pub fn admits(self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (FieldShape::Flag { .. }, FieldValue::Flag(_))
                | (FieldShape::Char, FieldValue::Char(_))
                | (FieldShape::Text, FieldValue::Text(_))
                | (FieldShape::Quoting, FieldValue::Quoting(_))
        )
    }
}

/// A resolved value for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Flag(bool),
    Char(char),
    Text(String),
    Quoting(QuotingMode),
}

impl FieldValue {
    /// Rendering used in help text.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Flag(true) => "on".to_string(),
            FieldValue::Flag(false) => "off".to_string(),
            FieldValue::Char(c) => format!("{c:?}"),
            FieldValue::Text(s) => format!("{s:?}"),
            FieldValue::Quoting(mode) => quoting_choices()
                .label_of(mode)
                .unwrap_or(mode.label())
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    field: DialectField,
    shape: FieldShape,
    default: Option<FieldValue>,
    help: &'static str,
}

impl FieldSpec {
    /// A spec with the field's own shape and no default.
    pub fn new(field: DialectField) -> Self {
        Self {
            field,
            shape: field.shape(),
            default: None,
            help: field.help(),
        }
    }

    pub fn with_default(mut self, value: FieldValue) -> Result<Self, ArgmapError> {
        if !self.shape.admits(&value) {
            return Err(ArgmapError::ShapeMismatch {
                field: self.field.name().to_string(),
                expected: self.shape.describe(),
            });
        }
        self.default = Some(value);
        Ok(self)
    }

    pub fn without_default(mut self) -> Self {
        self.default = None;
        self
    }

    /// Add or drop the `--no-` counterpart of a boolean field.
    /// Has no effect on other shapes.
    pub fn negatable(mut self, negatable: bool) -> Self {
        if let FieldShape::Flag { .. } = self.shape {
            self.shape = FieldShape::Flag { negatable };
        }
        self
    }

    pub fn help(mut self, help: &'static str) -> Self {
        self.help = help;
        self
    }

    pub fn field(&self) -> DialectField {
        self.field
    }

    pub fn shape(&self) -> FieldShape {
        self.shape
    }

    pub fn default_value(&self) -> Option<&FieldValue> {
        self.default.as_ref()
    }

    pub fn help_text(&self) -> &'static str {
        self.help
    }
}

/// The ordered set of fields one dialect group registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectFields {
    specs: Vec<FieldSpec>,
}

impl DialectFields {
    /// Specs are kept in registration order regardless of input order.
    pub fn new(specs: impl IntoIterator<Item = FieldSpec>) -> Result<Self, ArgmapError> {
        let mut out: Vec<FieldSpec> = Vec::new();
        for spec in specs {
            if out.iter().any(|s| s.field == spec.field) {
                return Err(ArgmapError::DuplicateField(spec.field.name().to_string()));
            }
            out.push(spec);
        }
        out.sort_by_key(|s| s.field);
        Ok(Self { specs: out })
    }

    /// All seven fields. Only the delimiter, the two booleans and the
    /// quoting mode carry defaults; quote and escape characters stay unset
    /// unless given, and the line terminator falls back to the platform's.
    pub fn standard() -> Self {
        let specs = DialectField::ALL
            .iter()
            .map(|&field| {
                let default = match field {
                    DialectField::Delimiter => Some(FieldValue::Char(',')),
                    DialectField::DoubleQuote => Some(FieldValue::Flag(true)),
                    DialectField::SkipInitialSpace => Some(FieldValue::Flag(false)),
                    DialectField::Quoting => Some(FieldValue::Quoting(QuotingMode::Minimal)),
                    DialectField::QuoteChar
                    | DialectField::EscapeChar
                    | DialectField::LineTerminator => None,
                };
                FieldSpec {
                    default,
                    ..FieldSpec::new(field)
                }
            })
            .collect();
        Self { specs }
    }

    /// [`DialectFields::standard`] plus a `"` quote character and CRLF line
    /// endings, the conventional spreadsheet dialect.
    pub fn excel() -> Self {
        let mut fields = Self::standard();
        for spec in &mut fields.specs {
            match spec.field {
                DialectField::QuoteChar => spec.default = Some(FieldValue::Char('"')),
                DialectField::LineTerminator => {
                    spec.default = Some(FieldValue::Text("\r\n".to_string()))
                }
                _ => {}
            }
        }
        fields
    }

    pub fn without(mut self, field: DialectField) -> Self {
        self.specs.retain(|s| s.field != field);
        self
    }

    pub fn with_default(
        mut self,
        field: DialectField,
        value: FieldValue,
    ) -> Result<Self, ArgmapError> {
        let position = self
            .specs
            .iter()
            .position(|s| s.field == field)
            .ok_or_else(|| ArgmapError::UnknownField(field.name().to_string()))?;
        let spec = self.specs[position].clone().with_default(value)?;
        self.specs[position] = spec;
        Ok(self)
    }

    pub fn without_default(mut self, field: DialectField) -> Self {
        for spec in self.specs.iter_mut().filter(|s| s.field == field) {
            spec.default = None;
        }
        self
    }

    pub fn get(&self, field: DialectField) -> Option<&FieldSpec> {
        self.specs.iter().find(|s| s.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> + '_ {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for DialectFields {
    fn default() -> Self {
        Self::standard()
    }
}
