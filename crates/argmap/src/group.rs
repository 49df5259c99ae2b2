//! Dialect argument groups.
//!
//! Registration and construction are two separate phases:
//! 1. [`DialectGroup::register`] adds one flag per field to a clap `Command`
//!    and hands back a [`DialectBuilder`].
//! 2. After clap has parsed argv, [`DialectBuilder::build`] resolves every
//!    field (user value, then field default, then library fallback) and
//!    checks the quoting invariant.
//!
//! Several groups may live on one command as long as their prefixes differ.
//! A collision is reported as an error and nothing is registered.

use crate::action::MappingAction;
use crate::dialect::{Dialect, PartialDialect};
use crate::fields::{DialectField, DialectFields, FieldShape, FieldSpec};
use crate::raw::{FieldKey, RawValues};
use crate::validate::{quoting_choices, single_char};
use crate::ArgmapError;
use clap::{value_parser, Arg, ArgAction, ArgGroup, Command};

/// A dialect group waiting to be registered on a command.
#[derive(Debug, Clone)]
pub struct DialectGroup {
    fields: DialectFields,
    prefix: Option<String>,
    title: Option<String>,
    description: Option<String>,
}

impl DialectGroup {
    pub fn new(fields: DialectFields) -> Self {
        Self {
            fields,
            prefix: None,
            title: None,
            description: None,
        }
    }

    /// An empty prefix is the same as no prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Help heading for the group's flags.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Paragraph appended to the command's long help under the title.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn register(self, cmd: Command) -> Result<(Command, DialectBuilder), ArgmapError> {
        let prefix = self.prefix.as_deref();
        let fields: Vec<BoundField> = self
            .fields
            .iter()
            .map(|spec| BoundField::new(prefix, spec.clone()))
            .collect();
        let group_id = match prefix {
            Some(p) => format!("{p}_dialect"),
            None => "dialect".to_string(),
        };

        check_collisions(&cmd, &fields, &group_id)?;

        let previous_heading = cmd.get_next_help_heading().map(str::to_string);
        let mut cmd = cmd;
        if let Some(title) = &self.title {
            cmd = cmd.next_help_heading(title.clone());
        }

        let mut ids = Vec::new();
        for field in &fields {
            for arg in field.to_args() {
                log::debug!(
                    "registered dialect flag --{}",
                    arg.get_long().unwrap_or_default()
                );
                ids.push(arg.get_id().as_str().to_string());
                cmd = cmd.arg(arg);
            }
        }

        cmd = match previous_heading {
            Some(heading) => cmd.next_help_heading(heading),
            None => cmd.next_help_heading(Option::<&'static str>::None),
        };
        cmd = cmd.group(ArgGroup::new(group_id).args(ids).multiple(true));

        if let Some(description) = &self.description {
            let heading = self.title.as_deref().unwrap_or("Dialect");
            let section = format!("{heading}:\n  {description}");
            let text = match cmd.get_after_long_help() {
                Some(existing) => format!("{existing}\n\n{section}"),
                None => section,
            };
            cmd = cmd.after_long_help(text);
        }

        Ok((
            cmd,
            DialectBuilder {
                fields,
                prefix: self.prefix,
            },
        ))
    }
}

/// Register a dialect group on `cmd`; see [`DialectGroup`].
pub fn register_group(
    cmd: Command,
    fields: DialectFields,
    prefix: Option<&str>,
    title: Option<&str>,
    description: Option<&str>,
) -> Result<(Command, DialectBuilder), ArgmapError> {
    let mut group = DialectGroup::new(fields);
    if let Some(prefix) = prefix {
        group = group.prefix(prefix);
    }
    if let Some(title) = title {
        group = group.title(title);
    }
    if let Some(description) = description {
        group = group.description(description);
    }
    group.register(cmd)
}

fn check_collisions(cmd: &Command, fields: &[BoundField], group_id: &str) -> Result<(), ArgmapError> {
    // Arg ids and group ids share one namespace in clap.
    let id_taken = |id: &str| {
        cmd.get_arguments().any(|arg| arg.get_id().as_str() == id)
            || cmd.get_groups().any(|g| g.get_id().as_str() == id)
    };
    let taken = |id: &str, long: &str| {
        id_taken(id) || cmd.get_arguments().any(|arg| arg.get_long() == Some(long))
    };
    for field in fields {
        let key = &field.key;
        if taken(&key.id, &key.long) {
            return Err(ArgmapError::NameCollision(key.flag()));
        }
        if let (Some(id), Some(long)) = (&key.negated_id, &key.negated_long) {
            if taken(id, long) {
                return Err(ArgmapError::NameCollision(format!("--{long}")));
            }
        }
    }
    if id_taken(group_id) {
        return Err(ArgmapError::NameCollision(group_id.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct BoundField {
    spec: FieldSpec,
    key: FieldKey,
}

impl BoundField {
    fn new(prefix: Option<&str>, spec: FieldSpec) -> Self {
        let negatable = matches!(spec.shape(), FieldShape::Flag { negatable: true });
        let key = FieldKey::new(prefix, spec.field().name(), negatable);
        Self { spec, key }
    }

    fn help(&self) -> String {
        match self.spec.default_value() {
            Some(default) => format!("{} [default: {}]", self.spec.help_text(), default.display()),
            None => self.spec.help_text().to_string(),
        }
    }

    fn to_args(&self) -> Vec<Arg> {
        let key = &self.key;
        let base = Arg::new(key.id.clone())
            .long(key.long.clone())
            .help(self.help());

        match self.spec.shape() {
            FieldShape::Flag { .. } => {
                // Repeating a switch is accepted; the last spelling wins.
                let arg = base
                    .action(ArgAction::SetTrue)
                    .overrides_with(key.id.clone());
                match (&key.negated_id, &key.negated_long) {
                    (Some(negated_id), Some(negated_long)) => vec![
                        arg.overrides_with(negated_id.clone()),
                        Arg::new(negated_id.clone())
                            .long(negated_long.clone())
                            .action(ArgAction::SetTrue)
                            .overrides_with(negated_id.clone())
                            .overrides_with(key.id.clone())
                            .help(format!("Turn off {}", key.flag())),
                    ],
                    _ => vec![arg],
                }
            }
            FieldShape::Char => {
                let flag = key.flag();
                vec![base
                    .value_name("CHAR")
                    .value_parser(move |token: &str| single_char(&flag, token))
                    .action(ArgAction::Append)
                    .num_args(1)
                    .allow_hyphen_values(true)]
            }
            FieldShape::Text => vec![base
                .value_name("STR")
                .value_parser(value_parser!(String))
                .action(ArgAction::Append)
                .num_args(1)
                .allow_hyphen_values(true)],
            FieldShape::Quoting => {
                let help = self.help();
                vec![MappingAction::store(key.id.clone(), quoting_choices())
                    .long(key.long.clone())
                    .value_name("MODE")
                    .help(help)
                    .to_arg()]
            }
        }
    }
}

/// Deferred constructor returned by [`DialectGroup::register`].
#[derive(Debug, Clone)]
pub struct DialectBuilder {
    fields: Vec<BoundField>,
    prefix: Option<String>,
}

impl DialectBuilder {
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The flag a user types for `field`, if the group registered it.
    pub fn flag_for(&self, field: DialectField) -> Option<String> {
        self.bound(field).map(|b| b.key.flag())
    }

    pub fn key_for(&self, field: DialectField) -> Option<&FieldKey> {
        self.bound(field).map(|b| &b.key)
    }

    fn bound(&self, field: DialectField) -> Option<&BoundField> {
        self.fields.iter().find(|b| b.spec.field() == field)
    }

    /// Flag named in errors about `field`; unregistered fields fall back to
    /// the prefixed spelling so the message still points somewhere useful.
    fn error_flag(&self, field: DialectField) -> String {
        self.flag_for(field)
            .unwrap_or_else(|| FieldKey::new(self.prefix.as_deref(), field.name(), false).flag())
    }

    /// Build a dialect from parsed values.
    ///
    /// Calling this twice with the same values yields equal dialects.
    pub fn build<R>(&self, raw: &R) -> Result<Dialect, ArgmapError>
    where
        R: RawValues + ?Sized,
    {
        let mut partial = PartialDialect::default();
        for bound in &self.fields {
            let field = bound.spec.field();
            let resolved = match raw.lookup(&bound.key, bound.spec.shape())? {
                Some(value) => {
                    log::debug!("dialect field {} resolved from {}", field.name(), bound.key.flag());
                    Some(value)
                }
                None => {
                    let default = bound.spec.default_value().cloned();
                    if default.is_some() {
                        log::debug!("dialect field {} resolved from field default", field.name());
                    }
                    default
                }
            };
            if let Some(value) = resolved {
                partial.set(field, value)?;
            }
        }
        partial.finish(
            &self.error_flag(DialectField::QuoteChar),
            &self.error_flag(DialectField::EscapeChar),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldValue;
    use crate::validate::QuotingMode;
    use crate::PLATFORM_LINE_TERMINATOR;
    use clap::error::ErrorKind;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use std::error::Error as _;

    fn command() -> Command {
        Command::new("test")
    }

    fn parse(
        fields: DialectFields,
        prefix: Option<&str>,
        argv: &[&str],
    ) -> Result<Dialect, ArgmapError> {
        let (cmd, builder) = register_group(command(), fields, prefix, None, None).unwrap();
        let m = cmd
            .try_get_matches_from(std::iter::once("test").chain(argv.iter().copied()))
            .unwrap();
        builder.build(&m)
    }

    #[test]
    fn slash_delimiter_without_quoting() {
        let dialect = parse(
            DialectFields::standard(),
            None,
            &["--delimiter", "/", "--quoting", "none"],
        )
        .unwrap();
        assert_eq!(
            dialect,
            Dialect {
                delimiter: '/',
                quote_char: None,
                escape_char: None,
                double_quote: true,
                skip_initial_space: false,
                line_terminator: PLATFORM_LINE_TERMINATOR.to_string(),
                quoting: QuotingMode::None,
            }
        );
    }

    #[test]
    fn prefixed_flags_fill_every_field() {
        let dialect = parse(
            DialectFields::standard(),
            Some("csv"),
            &[
                "--csv-delimiter",
                ";",
                "--csv-quotechar",
                "'",
                "--csv-escapechar",
                "\\",
                "--csv-no-doublequote",
                "--csv-skipinitialspace",
                "--csv-lineterminator",
                "\r\n",
                "--csv-quoting",
                "nonnumeric",
            ],
        )
        .unwrap();
        assert_eq!(
            dialect,
            Dialect {
                delimiter: ';',
                quote_char: Some('\''),
                escape_char: Some('\\'),
                double_quote: false,
                skip_initial_space: true,
                line_terminator: "\r\n".to_string(),
                quoting: QuotingMode::NonNumeric,
            }
        );
    }

    #[test]
    fn excel_preset_builds_without_arguments() {
        let dialect = parse(DialectFields::excel(), Some("csv"), &[]).unwrap();
        assert_eq!(dialect, Dialect::excel());
    }

    #[test]
    fn quoting_all_needs_quote_or_escape() {
        let err = parse(DialectFields::standard(), None, &["--quoting", "all"]).unwrap_err();
        assert_eq!(
            err,
            ArgmapError::MissingRequiredField {
                quoting: QuotingMode::All,
                quote_flag: "--quotechar".into(),
                escape_flag: "--escapechar".into(),
            }
        );

        let ok = parse(
            DialectFields::standard(),
            None,
            &["--quoting", "all", "--quotechar", "\""],
        )
        .unwrap();
        assert_eq!(ok.quote_char, Some('"'));

        let ok = parse(
            DialectFields::standard(),
            None,
            &["--quoting", "all", "--escapechar", "\\"],
        )
        .unwrap();
        assert_eq!(ok.escape_char, Some('\\'));
    }

    #[test]
    fn missing_field_error_names_prefixed_flags() {
        let err = parse(DialectFields::standard(), Some("in"), &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "quoting mode 'minimal' requires --in-quotechar or --in-escapechar"
        );
    }

    #[test]
    fn single_char_fields_reject_long_tokens() {
        let (cmd, _) = DialectGroup::new(DialectFields::standard())
            .register(command())
            .unwrap();
        let err = cmd
            .try_get_matches_from(["test", "--delimiter", "ab"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        let source = err
            .source()
            .and_then(|s| s.downcast_ref::<ArgmapError>())
            .cloned();
        assert_eq!(
            source,
            Some(ArgmapError::InvalidLength {
                field: "--delimiter".into(),
                value: "ab".into(),
            })
        );
    }

    #[test]
    fn unknown_quoting_label_is_a_usage_error() {
        let (cmd, _) = DialectGroup::new(DialectFields::standard())
            .register(command())
            .unwrap();
        let err = cmd
            .try_get_matches_from(["test", "--quoting", "sometimes"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn last_occurrence_wins() {
        let dialect = parse(
            DialectFields::excel(),
            None,
            &["--delimiter", ";", "--delimiter", "|", "--no-doublequote", "--doublequote"],
        )
        .unwrap();
        assert_eq!(dialect.delimiter, '|');
        assert!(dialect.double_quote);
    }

    #[test]
    fn build_is_idempotent() {
        let (cmd, builder) = DialectGroup::new(DialectFields::excel())
            .prefix("csv")
            .register(command())
            .unwrap();
        let m = cmd
            .try_get_matches_from(["test", "--csv-delimiter", "\t"])
            .unwrap();
        assert_eq!(builder.build(&m).unwrap(), builder.build(&m).unwrap());
    }

    #[test]
    fn two_groups_share_one_command() {
        let (cmd, input) = DialectGroup::new(DialectFields::excel())
            .prefix("in")
            .register(command())
            .unwrap();
        let (cmd, output) = DialectGroup::new(DialectFields::excel())
            .prefix("out")
            .register(cmd)
            .unwrap();
        let m = cmd
            .try_get_matches_from(["test", "--in-delimiter", ";", "--out-quoting", "all"])
            .unwrap();
        assert_eq!(input.build(&m).unwrap().delimiter, ';');
        assert_eq!(input.build(&m).unwrap().quoting, QuotingMode::Minimal);
        assert_eq!(output.build(&m).unwrap().delimiter, ',');
        assert_eq!(output.build(&m).unwrap().quoting, QuotingMode::All);
    }

    #[test]
    fn colliding_prefix_is_rejected() {
        let (cmd, _) = DialectGroup::new(DialectFields::excel())
            .prefix("csv")
            .register(command())
            .unwrap();
        let err = DialectGroup::new(DialectFields::excel())
            .prefix("csv")
            .register(cmd)
            .unwrap_err();
        assert_eq!(err, ArgmapError::NameCollision("--csv-delimiter".into()));

        let cmd = command().arg(Arg::new("other").long("quoting"));
        let err = DialectGroup::new(DialectFields::standard())
            .register(cmd)
            .unwrap_err();
        assert_eq!(err, ArgmapError::NameCollision("--quoting".into()));
    }

    #[test]
    fn group_id_clashing_with_an_arg_is_rejected() {
        let cmd = command().arg(Arg::new("dialect").long("dialect"));
        let err = DialectGroup::new(DialectFields::excel())
            .register(cmd)
            .unwrap_err();
        assert_eq!(err, ArgmapError::NameCollision("dialect".into()));

        let cmd = command().arg(Arg::new("in_dialect").long("input-dialect"));
        let err = DialectGroup::new(DialectFields::excel())
            .prefix("in")
            .register(cmd)
            .unwrap_err();
        assert_eq!(err, ArgmapError::NameCollision("in_dialect".into()));
    }

    #[test]
    fn field_id_clashing_with_a_group_is_rejected() {
        let cmd = command()
            .arg(Arg::new("mode").long("mode"))
            .group(ArgGroup::new("csv_quoting").arg("mode"));
        let err = DialectGroup::new(DialectFields::excel())
            .prefix("csv")
            .register(cmd)
            .unwrap_err();
        assert_eq!(err, ArgmapError::NameCollision("--csv-quoting".into()));
    }

    #[test]
    fn repeated_switches_are_accepted() {
        let dialect = parse(
            DialectFields::excel(),
            None,
            &["--skipinitialspace", "--skipinitialspace", "--doublequote", "--doublequote"],
        )
        .unwrap();
        assert!(dialect.skip_initial_space);
        assert!(dialect.double_quote);

        let dialect = parse(
            DialectFields::excel(),
            None,
            &["--no-doublequote", "--no-doublequote", "--escapechar", "\\"],
        )
        .unwrap();
        assert!(!dialect.double_quote);
    }

    #[test]
    fn omitted_fields_fall_back() {
        let fields = DialectFields::standard()
            .without(DialectField::LineTerminator)
            .without(DialectField::Delimiter);
        let (cmd, builder) = DialectGroup::new(fields).register(command()).unwrap();
        assert!(builder.flag_for(DialectField::Delimiter).is_none());
        let err = cmd
            .clone()
            .try_get_matches_from(["test", "--delimiter", ";"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);

        let m = cmd
            .try_get_matches_from(["test", "--quotechar", "\""])
            .unwrap();
        let dialect = builder.build(&m).unwrap();
        assert_eq!(dialect.delimiter, Dialect::FALLBACK_DELIMITER);
        assert_eq!(dialect.line_terminator, PLATFORM_LINE_TERMINATOR);
    }

    #[test]
    fn builds_from_in_memory_values() {
        let (_, builder) = DialectGroup::new(DialectFields::standard())
            .prefix("csv")
            .register(command())
            .unwrap();
        let mut values = IndexMap::new();
        values.insert("csv_delimiter".to_string(), FieldValue::Char('/'));
        values.insert("csv_quoting".to_string(), FieldValue::Quoting(QuotingMode::None));
        values.insert("csv_lineterminator".to_string(), FieldValue::Text(String::new()));
        let dialect = builder.build(&values).unwrap();
        assert_eq!(dialect.delimiter, '/');
        assert_eq!(dialect.quoting, QuotingMode::None);
        assert_eq!(dialect.line_terminator, "");
    }

    #[test]
    fn help_lists_labels_and_heading() {
        let (mut cmd, builder) = DialectGroup::new(DialectFields::excel())
            .prefix("csv")
            .title("CSV format")
            .description("Specify the details of the CSV file format.")
            .register(command())
            .unwrap();
        cmd.build();
        assert_eq!(builder.prefix(), Some("csv"));
        assert_eq!(
            builder.flag_for(DialectField::Quoting).as_deref(),
            Some("--csv-quoting")
        );

        let quoting = cmd
            .get_arguments()
            .find(|a| a.get_id().as_str() == "csv_quoting")
            .unwrap();
        assert_eq!(quoting.get_help_heading(), Some("CSV format"));
        let labels: Vec<String> = quoting
            .get_possible_values()
            .iter()
            .map(|v| v.get_name().to_string())
            .collect();
        assert_eq!(labels, vec!["all", "minimal", "none", "nonnumeric"]);

        let after = cmd.get_after_long_help().map(|s| s.to_string()).unwrap();
        assert!(after.contains("Specify the details of the CSV file format."));
        assert!(cmd.get_next_help_heading().is_none());
    }
}
