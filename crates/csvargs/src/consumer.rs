// File: crates/csvargs/src/consumer.rs
//
// Hands resolved dialects to the `csv` crate.
//
// The `csv` crate works on single bytes, so every dialect character must be
// ASCII. Readers recognise `\r`, `\n` and `\r\n` regardless of the dialect's
// line terminator; only writers honour it.

use argmap::{Dialect, QuotingMode};
use csv::{QuoteStyle, ReaderBuilder, Terminator, Trim, WriterBuilder};
use std::io::{self, Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("{field} {value:?} is not a single-byte ASCII character")]
    NotAscii { field: &'static str, value: char },

    #[error("line terminator {0:?} is not supported (use \"\\r\\n\" or one ASCII character)")]
    Terminator(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Options that belong to the recoding run rather than to either dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecodeOptions {
    /// Overrides the trimming implied by `skip_initial_space`.
    pub trim: Option<Trim>,
    pub flexible: bool,
}

fn ascii(field: &'static str, value: char) -> Result<u8, ConsumerError> {
    if value.is_ascii() {
        Ok(value as u8)
    } else {
        Err(ConsumerError::NotAscii { field, value })
    }
}

fn terminator(line_terminator: &str) -> Result<Terminator, ConsumerError> {
    if line_terminator == "\r\n" {
        return Ok(Terminator::CRLF);
    }
    let mut chars = line_terminator.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(Terminator::Any(c as u8)),
        _ => Err(ConsumerError::Terminator(line_terminator.to_string())),
    }
}

fn quote_style(quoting: QuotingMode) -> QuoteStyle {
    match quoting {
        QuotingMode::All => QuoteStyle::Always,
        QuotingMode::Minimal => QuoteStyle::Necessary,
        QuotingMode::NonNumeric => QuoteStyle::NonNumeric,
        QuotingMode::None => QuoteStyle::Never,
    }
}

pub fn reader_builder(dialect: &Dialect, options: RecodeOptions) -> Result<ReaderBuilder, ConsumerError> {
    let mut builder = ReaderBuilder::new();
    builder
        .has_headers(false)
        .flexible(options.flexible)
        .delimiter(ascii("delimiter", dialect.delimiter)?)
        .double_quote(dialect.double_quote)
        .escape(
            dialect
                .escape_char
                .map(|c| ascii("escapechar", c))
                .transpose()?,
        )
        .terminator(Terminator::CRLF);

    match dialect.quote_char {
        Some(q) if dialect.quoting != QuotingMode::None => {
            builder.quote(ascii("quotechar", q)?);
        }
        _ => {
            builder.quoting(false);
        }
    }

    let trim = options.trim.unwrap_or(if dialect.skip_initial_space {
        Trim::Fields
    } else {
        Trim::None
    });
    builder.trim(trim);
    Ok(builder)
}

pub fn writer_builder(dialect: &Dialect, options: RecodeOptions) -> Result<WriterBuilder, ConsumerError> {
    let mut builder = WriterBuilder::new();
    builder
        .has_headers(false)
        .flexible(options.flexible)
        .delimiter(ascii("delimiter", dialect.delimiter)?)
        .double_quote(dialect.double_quote)
        .quote_style(quote_style(dialect.quoting))
        .terminator(terminator(&dialect.line_terminator)?);
    if let Some(q) = dialect.quote_char {
        builder.quote(ascii("quotechar", q)?);
    }
    if let Some(e) = dialect.escape_char {
        builder.escape(ascii("escapechar", e)?);
    }
    Ok(builder)
}

/// Copy every record from `input` to `output`, returning the record count.
pub fn recode<R: Read, W: Write>(
    input: R,
    output: W,
    from: &Dialect,
    to: &Dialect,
    options: RecodeOptions,
) -> Result<u64, ConsumerError> {
    let mut reader = reader_builder(from, options)?.from_reader(input);
    let mut writer = writer_builder(to, options)?.from_writer(output);

    let mut count = 0u64;
    for record in reader.byte_records() {
        writer.write_byte_record(&record?)?;
        count += 1;
    }
    writer.flush()?;
    log::debug!("recoded {count} records");
    Ok(count)
}
