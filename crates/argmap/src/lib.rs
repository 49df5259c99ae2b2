//! argmap — choice-mapping argument actions and CSV dialect argument groups.
//!
//! This crate extends a clap `Command` with two capabilities:
//! - mapping actions: a flag accepts a fixed set of labels and stores the
//!   backing value bound to each label, under replace, append, or extend
//!   accumulation
//! - dialect groups: one flag per CSV dialect field is registered up front,
//!   and a deferred builder folds the parsed matches into a validated
//!   [`Dialect`] once parsing is complete
//!
//! This crate contains NO CLI entrypoint and NO CSV encoding.
//! It consumes clap matches and produces dialect descriptors or errors.

pub mod action;
pub mod choice;
pub mod dialect;
pub mod fields;
pub mod group;
pub mod raw;

pub mod error {
    use crate::validate::QuotingMode;
    use thiserror::Error;

    #[derive(Debug, Error, Clone, PartialEq, Eq)]
    pub enum ArgmapError {
        #[error("invalid choice: '{token}' (choose from {})", .choices.join(", "))]
        UnknownChoice { token: String, choices: Vec<String> },

        #[error("duplicate choice label: {0}")]
        DuplicateLabel(String),

        #[error("{flag} expects {expected} per occurrence, got {got}")]
        TokenCount {
            flag: String,
            expected: &'static str,
            got: usize,
        },

        #[error("{field} must be a single character, got {value:?}")]
        InvalidLength { field: String, value: String },

        #[error("quoting mode '{quoting}' requires {quote_flag} or {escape_flag}")]
        MissingRequiredField {
            quoting: QuotingMode,
            quote_flag: String,
            escape_flag: String,
        },

        #[error("argument already registered: {0}")]
        NameCollision(String),

        #[error("dialect field listed more than once: {0}")]
        DuplicateField(String),

        #[error("{field} expects a {expected} value")]
        ShapeMismatch {
            field: String,
            expected: &'static str,
        },

        #[error("no parsed values registered for field: {0}")]
        UnknownField(String),
    }
}

pub use error::ArgmapError;

pub mod validate {
    //! Validation helpers shared by the dialect fields: the single-character
    //! check and the table of allowed quoting modes.

    use super::ArgmapError;
    use crate::choice::ChoiceMap;
    use once_cell::sync::Lazy;
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use std::sync::Arc;

    /// Accept `token` only if it is exactly one character.
    ///
    /// Length is counted in Unicode scalar values, so `"é"` passes and
    /// `""` or `"ab"` fail with [`ArgmapError::InvalidLength`].
    pub fn single_char(field: &str, token: &str) -> Result<char, ArgmapError> {
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ArgmapError::InvalidLength {
                field: field.to_string(),
                value: token.to_string(),
            }),
        }
    }

    /// Which fields of a record get wrapped in quote characters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum QuotingMode {
        All,
        Minimal,
        None,
        NonNumeric,
    }

    impl QuotingMode {
        /// Every mode, in label order.
        pub const VARIANTS: [QuotingMode; 4] = [
            QuotingMode::All,
            QuotingMode::Minimal,
            QuotingMode::None,
            QuotingMode::NonNumeric,
        ];

        pub fn label(self) -> &'static str {
            match self {
                QuotingMode::All => "all",
                QuotingMode::Minimal => "minimal",
                QuotingMode::None => "none",
                QuotingMode::NonNumeric => "nonnumeric",
            }
        }

        /// Whether a dialect in this mode needs a quote or escape character.
        pub fn requires_quote_or_escape(self) -> bool {
            self != QuotingMode::None
        }
    }

    impl fmt::Display for QuotingMode {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.label())
        }
    }

    static QUOTING_CHOICES: Lazy<Arc<ChoiceMap<QuotingMode>>> = Lazy::new(|| {
        Arc::new(ChoiceMap::from_distinct(
            QuotingMode::VARIANTS.iter().map(|mode| (mode.label(), *mode)),
        ))
    });

    /// The allowed quoting-mode labels and the mode each one selects.
    pub fn quoting_choices() -> Arc<ChoiceMap<QuotingMode>> {
        Arc::clone(&QUOTING_CHOICES)
    }

    /// Reject a quoting mode that needs a quote or escape character when
    /// neither is present.
    pub(crate) fn ensure_quoting(
        quoting: QuotingMode,
        quote_char: Option<char>,
        escape_char: Option<char>,
        quote_flag: &str,
        escape_flag: &str,
    ) -> Result<(), ArgmapError> {
        if quoting.requires_quote_or_escape() && quote_char.is_none() && escape_char.is_none() {
            return Err(ArgmapError::MissingRequiredField {
                quoting,
                quote_flag: quote_flag.to_string(),
                escape_flag: escape_flag.to_string(),
            });
        }
        Ok(())
    }

}

pub use action::{Accumulated, Accumulation, MappingAction, MappingParser};
pub use choice::ChoiceMap;
pub use dialect::{Dialect, PLATFORM_LINE_TERMINATOR};
pub use fields::{DialectField, DialectFields, FieldShape, FieldSpec, FieldValue};
pub use group::{register_group, DialectBuilder, DialectGroup};
pub use raw::{FieldKey, RawValues};
pub use validate::{quoting_choices, single_char, QuotingMode};
