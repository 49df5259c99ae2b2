//! The structured dialect descriptor handed to CSV readers and writers.

use crate::fields::{DialectField, FieldValue};
use crate::validate::{ensure_quoting, QuotingMode};
use crate::ArgmapError;
use serde::{Deserialize, Serialize};

/// Line ending used when neither the user nor the field spec gives one.
pub const PLATFORM_LINE_TERMINATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// A fully resolved CSV dialect.
///
/// Quote and escape characters are optional; every other field always has a
/// value. A dialect produced by a [`crate::DialectBuilder`] has already passed
/// [`Dialect::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialect {
    pub delimiter: char,
    pub quote_char: Option<char>,
    pub escape_char: Option<char>,
    pub double_quote: bool,
    pub skip_initial_space: bool,
    pub line_terminator: String,
    pub quoting: QuotingMode,
}

impl Dialect {
    pub const FALLBACK_DELIMITER: char = ',';
    pub const FALLBACK_DOUBLE_QUOTE: bool = true;
    pub const FALLBACK_SKIP_INITIAL_SPACE: bool = false;
    pub const FALLBACK_QUOTING: QuotingMode = QuotingMode::Minimal;

    pub fn excel() -> Self {
        Self {
            delimiter: ',',
            quote_char: Some('"'),
            escape_char: None,
            double_quote: true,
            skip_initial_space: false,
            line_terminator: "\r\n".to_string(),
            quoting: QuotingMode::Minimal,
        }
    }

    pub fn excel_tab() -> Self {
        Self {
            delimiter: '\t',
            ..Self::excel()
        }
    }

    pub fn unix() -> Self {
        Self {
            line_terminator: "\n".to_string(),
            quoting: QuotingMode::All,
            ..Self::excel()
        }
    }

    /// Check the quoting invariant: any mode other than `none` needs a quote
    /// or an escape character.
    pub fn validate(&self) -> Result<(), ArgmapError> {
        ensure_quoting(
            self.quoting,
            self.quote_char,
            self.escape_char,
            "--quotechar",
            "--escapechar",
        )
    }
}

/// Per-field values collected before fallbacks and validation.
#[derive(Debug, Default)]
pub(crate) struct PartialDialect {
    delimiter: Option<char>,
    quote_char: Option<char>,
    escape_char: Option<char>,
    double_quote: Option<bool>,
    skip_initial_space: Option<bool>,
    line_terminator: Option<String>,
    quoting: Option<QuotingMode>,
}

impl PartialDialect {
    pub(crate) fn set(&mut self, field: DialectField, value: FieldValue) -> Result<(), ArgmapError> {
        match (field, value) {
            (DialectField::Delimiter, FieldValue::Char(c)) => self.delimiter = Some(c),
            (DialectField::QuoteChar, FieldValue::Char(c)) => self.quote_char = Some(c),
            (DialectField::EscapeChar, FieldValue::Char(c)) => self.escape_char = Some(c),
            (DialectField::DoubleQuote, FieldValue::Flag(b)) => self.double_quote = Some(b),
            (DialectField::SkipInitialSpace, FieldValue::Flag(b)) => {
                self.skip_initial_space = Some(b)
            }
            (DialectField::LineTerminator, FieldValue::Text(s)) => self.line_terminator = Some(s),
            (DialectField::Quoting, FieldValue::Quoting(q)) => self.quoting = Some(q),
            (field, _) => {
                return Err(ArgmapError::ShapeMismatch {
                    field: field.name().to_string(),
                    expected: field.shape().describe(),
                })
            }
        }
        Ok(())
    }

    /// Apply library fallbacks, then enforce the quoting invariant using the
    /// flags the user actually sees.
    pub(crate) fn finish(self, quote_flag: &str, escape_flag: &str) -> Result<Dialect, ArgmapError> {
        let dialect = Dialect {
            delimiter: fallback(self.delimiter, DialectField::Delimiter, Dialect::FALLBACK_DELIMITER),
            quote_char: self.quote_char,
            escape_char: self.escape_char,
            double_quote: fallback(
                self.double_quote,
                DialectField::DoubleQuote,
                Dialect::FALLBACK_DOUBLE_QUOTE,
            ),
            skip_initial_space: fallback(
                self.skip_initial_space,
                DialectField::SkipInitialSpace,
                Dialect::FALLBACK_SKIP_INITIAL_SPACE,
            ),
            line_terminator: fallback(
                self.line_terminator,
                DialectField::LineTerminator,
                PLATFORM_LINE_TERMINATOR.to_string(),
            ),
            quoting: fallback(self.quoting, DialectField::Quoting, Dialect::FALLBACK_QUOTING),
        };
        ensure_quoting(
            dialect.quoting,
            dialect.quote_char,
            dialect.escape_char,
            quote_flag,
            escape_flag,
        )?;
        Ok(dialect)
    }
}

fn fallback<T>(value: Option<T>, field: DialectField, default: T) -> T {
    value.unwrap_or_else(|| {
        log::debug!("dialect field {} resolved from library fallback", field.name());
        default
    })
}
