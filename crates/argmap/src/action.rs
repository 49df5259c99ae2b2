//! Mapping actions: flags whose labels translate into backing values.
//!
//! A [`MappingAction`] binds one flag to a [`ChoiceMap`]. The labels are what
//! clap validates and shows in help; the backing values are what lands in the
//! matches. How repeated occurrences combine is set by [`Accumulation`]:
//!
//! - `Replace`: one label per occurrence, last occurrence wins
//! - `Append`: one label per occurrence, each occurrence adds one value
//! - `Extend`: one or more labels per occurrence, all added in order
//!
//! clap records every occurrence separately; [`MappingAction::resolve`] folds
//! them into an [`Accumulated`] value starting from `Unset` on every call, so
//! no accumulator outlives a single parse.

use crate::choice::ChoiceMap;
use crate::ArgmapError;
use clap::builder::{PossibleValue, PossibleValuesParser, TypedValueParser, ValueRange};
use clap::error::ErrorKind;
use clap::parser::MatchesError;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::any::{type_name, Any};
use std::ffi::OsStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulation {
    Replace,
    Append,
    Extend,
}

/// Destination value of a mapping action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accumulated<T> {
    Unset,
    Single(T),
    List(Vec<T>),
}

impl<T> Default for Accumulated<T> {
    fn default() -> Self {
        Accumulated::Unset
    }
}

impl<T> Accumulated<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Accumulated::Unset)
    }

    /// The stored value; for a list, its last element.
    pub fn into_single(self) -> Option<T> {
        match self {
            Accumulated::Unset => None,
            Accumulated::Single(value) => Some(value),
            Accumulated::List(mut values) => values.pop(),
        }
    }

    pub fn into_list(self) -> Vec<T> {
        match self {
            Accumulated::Unset => Vec::new(),
            Accumulated::Single(value) => vec![value],
            Accumulated::List(values) => values,
        }
    }
}

impl Accumulation {
    /// Fold one occurrence's translated values into `current`.
    ///
    /// `current` is consumed and a new destination is returned; nothing is
    /// shared with the previous value.
    pub fn combine<T>(self, current: Accumulated<T>, occurrence: Vec<T>) -> Accumulated<T> {
        match self {
            Accumulation::Replace => match occurrence.into_iter().last() {
                Some(value) => Accumulated::Single(value),
                None => current,
            },
            Accumulation::Append | Accumulation::Extend => {
                let mut items = current.into_list();
                items.extend(occurrence);
                Accumulated::List(items)
            }
        }
    }

    fn accepts(self, count: usize) -> bool {
        match self {
            Accumulation::Replace | Accumulation::Append => count == 1,
            Accumulation::Extend => count >= 1,
        }
    }

    fn arity(self) -> &'static str {
        match self {
            Accumulation::Replace | Accumulation::Append => "exactly one value",
            Accumulation::Extend => "one or more values",
        }
    }

    fn num_args(self) -> ValueRange {
        match self {
            Accumulation::Replace | Accumulation::Append => ValueRange::new(1),
            Accumulation::Extend => ValueRange::new(1..),
        }
    }
}

/// Fold every recorded occurrence of `id` under `mode`.
pub(crate) fn collect_occurrences<T>(
    matches: &ArgMatches,
    id: &str,
    mode: Accumulation,
) -> Result<Accumulated<T>, ArgmapError>
where
    T: Any + Clone + Send + Sync + 'static,
{
    let occurrences = matches
        .try_get_occurrences::<T>(id)
        .map_err(|e| matches_error::<T>(id, e))?;

    let mut acc = Accumulated::Unset;
    for occurrence in occurrences.into_iter().flatten() {
        acc = mode.combine(acc, occurrence.cloned().collect());
    }
    Ok(acc)
}

pub(crate) fn matches_error<T>(id: &str, err: MatchesError) -> ArgmapError {
    match err {
        MatchesError::UnknownArgument { .. } => ArgmapError::UnknownField(id.to_string()),
        _ => ArgmapError::ShapeMismatch {
            field: id.to_string(),
            expected: type_name::<T>(),
        },
    }
}

/// clap value parser that validates labels and yields backing values.
///
/// Label validation is delegated to clap's own possible-values check, so
/// unknown labels surface as `ErrorKind::InvalidValue` with the usual
/// suggestions, and help lists labels rather than backing values.
#[derive(Clone)]
pub struct MappingParser<T> {
    labels: PossibleValuesParser,
    choices: Arc<ChoiceMap<T>>,
}

impl<T> MappingParser<T> {
    pub fn new(choices: Arc<ChoiceMap<T>>) -> Self {
        let labels: Vec<String> = choices.labels().map(str::to_string).collect();
        Self {
            labels: PossibleValuesParser::new(labels),
            choices,
        }
    }
}

impl<T> TypedValueParser for MappingParser<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Value = T;

    fn parse_ref(
        &self,
        cmd: &Command,
        arg: Option<&Arg>,
        value: &OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let label = self.labels.parse_ref(cmd, arg, value)?;
        self.choices
            .translate(&label)
            .cloned()
            .map_err(|e| clap::Error::raw(ErrorKind::InvalidValue, format!("{e}\n")).with_cmd(cmd))
    }

    fn possible_values(&self) -> Option<Box<dyn Iterator<Item = PossibleValue> + '_>> {
        self.labels.possible_values()
    }
}

/// One flag whose labels map to backing values of type `T`.
#[derive(Clone)]
pub struct MappingAction<T> {
    id: String,
    long: String,
    help: Option<String>,
    value_name: Option<String>,
    choices: Arc<ChoiceMap<T>>,
    mode: Accumulation,
}

impl<T> MappingAction<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The long flag defaults to `id` with underscores turned into dashes.
    pub fn new(
        id: impl Into<String>,
        choices: impl Into<Arc<ChoiceMap<T>>>,
        mode: Accumulation,
    ) -> Self {
        let id = id.into();
        let long = id.replace('_', "-");
        Self {
            id,
            long,
            help: None,
            value_name: None,
            choices: choices.into(),
            mode,
        }
    }

    pub fn store(id: impl Into<String>, choices: impl Into<Arc<ChoiceMap<T>>>) -> Self {
        Self::new(id, choices, Accumulation::Replace)
    }

    pub fn append(id: impl Into<String>, choices: impl Into<Arc<ChoiceMap<T>>>) -> Self {
        Self::new(id, choices, Accumulation::Append)
    }

    pub fn extend(id: impl Into<String>, choices: impl Into<Arc<ChoiceMap<T>>>) -> Self {
        Self::new(id, choices, Accumulation::Extend)
    }

    pub fn long(mut self, long: impl Into<String>) -> Self {
        self.long = long.into();
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn value_name(mut self, value_name: impl Into<String>) -> Self {
        self.value_name = Some(value_name.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn flag(&self) -> String {
        format!("--{}", self.long)
    }

    pub fn mode(&self) -> Accumulation {
        self.mode
    }

    pub fn choices(&self) -> &ChoiceMap<T> {
        &self.choices
    }

    pub fn translate(&self, token: &str) -> Result<T, ArgmapError> {
        self.choices.translate(token).cloned()
    }

    /// Apply one occurrence of the flag, given its raw tokens, to `current`.
    ///
    /// Every token is translated before anything is combined, so a bad label
    /// leaves no partial result behind.
    pub fn apply(
        &self,
        current: Accumulated<T>,
        tokens: &[&str],
    ) -> Result<Accumulated<T>, ArgmapError> {
        if !self.mode.accepts(tokens.len()) {
            return Err(ArgmapError::TokenCount {
                flag: self.flag(),
                expected: self.mode.arity(),
                got: tokens.len(),
            });
        }
        let values = tokens
            .iter()
            .map(|token| self.translate(token))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.mode.combine(current, values))
    }

    pub fn value_parser(&self) -> MappingParser<T> {
        MappingParser::new(Arc::clone(&self.choices))
    }

    pub fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.id.clone())
            .long(self.long.clone())
            .value_parser(self.value_parser())
            .action(ArgAction::Append)
            .num_args(self.mode.num_args());
        if let Some(help) = &self.help {
            arg = arg.help(help.clone());
        }
        if let Some(value_name) = &self.value_name {
            arg = arg.value_name(value_name.clone());
        }
        arg
    }

    /// Destination value after parsing, built fresh from `matches`.
    pub fn resolve(&self, matches: &ArgMatches) -> Result<Accumulated<T>, ArgmapError> {
        collect_occurrences(matches, &self.id, self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rps() -> ChoiceMap<i32> {
        ChoiceMap::try_from_pairs([("rock", 4), ("paper", 5), ("scissors", 8)]).unwrap()
    }

    fn parse(action: &MappingAction<i32>, argv: &[&str]) -> Result<ArgMatches, clap::Error> {
        Command::new("test")
            .arg(action.to_arg())
            .try_get_matches_from(std::iter::once("test").chain(argv.iter().copied()))
    }

    #[test]
    fn replace_keeps_last_occurrence() {
        let action = MappingAction::store("foo", rps());
        let acc = action.apply(Accumulated::Unset, &["rock"]).unwrap();
        let acc = action.apply(acc, &["scissors"]).unwrap();
        assert_eq!(acc, Accumulated::Single(8));
    }

    #[test]
    fn append_adds_one_per_occurrence() {
        let action = MappingAction::append("foo", rps());
        let acc = action.apply(Accumulated::Unset, &["rock"]).unwrap();
        let acc = action.apply(acc, &["scissors"]).unwrap();
        assert_eq!(acc, Accumulated::List(vec![4, 8]));
    }

    #[test]
    fn extend_adds_every_token_in_order() {
        let action = MappingAction::extend("foo", rps());
        let acc = action.apply(Accumulated::Unset, &["rock", "paper"]).unwrap();
        let acc = action.apply(acc, &["scissors"]).unwrap();
        assert_eq!(acc, Accumulated::List(vec![4, 5, 8]));
    }

    #[test]
    fn apply_enforces_token_count() {
        let action = MappingAction::append("foo", rps());
        let err = action
            .apply(Accumulated::Unset, &["rock", "paper"])
            .unwrap_err();
        assert_eq!(
            err,
            ArgmapError::TokenCount {
                flag: "--foo".into(),
                expected: "exactly one value",
                got: 2,
            }
        );
        let extend = MappingAction::extend("foo", rps());
        assert!(extend.apply(Accumulated::Unset, &[]).is_err());
    }

    #[test]
    fn apply_rejects_unknown_label_without_partial_result() {
        let action = MappingAction::extend("foo", rps());
        let err = action
            .apply(Accumulated::List(vec![4]), &["paper", "lizard"])
            .unwrap_err();
        assert!(matches!(err, ArgmapError::UnknownChoice { ref token, .. } if token == "lizard"));
    }

    #[test]
    fn clap_store_mapping() {
        let action = MappingAction::store("foo", rps());
        let m = parse(&action, &["--foo", "rock"]).unwrap();
        assert_eq!(action.resolve(&m).unwrap(), Accumulated::Single(4));

        let m = parse(&action, &["--foo", "rock", "--foo", "scissors"]).unwrap();
        assert_eq!(action.resolve(&m).unwrap().into_single(), Some(8));
    }

    #[test]
    fn clap_append_mapping() {
        let action = MappingAction::append("foo", rps());
        let m = parse(&action, &["--foo", "rock", "--foo", "scissors"]).unwrap();
        assert_eq!(action.resolve(&m).unwrap().into_list(), vec![4, 8]);
    }

    #[test]
    fn clap_extend_mapping() {
        let action = MappingAction::extend("foo", rps());
        let m = parse(&action, &["--foo", "rock", "--foo", "paper", "scissors", "rock"]).unwrap();
        assert_eq!(action.resolve(&m).unwrap().into_list(), vec![4, 5, 8, 4]);
    }

    #[test]
    fn absent_flag_resolves_unset() {
        let action = MappingAction::append("foo", rps());
        let m = parse(&action, &[]).unwrap();
        assert!(action.resolve(&m).unwrap().is_unset());
    }

    #[test]
    fn accumulators_are_fresh_per_parse() {
        let action = MappingAction::append("foo", rps());
        let first = parse(&action, &["--foo", "rock"]).unwrap();
        let second = parse(&action, &["--foo", "paper"]).unwrap();
        assert_eq!(action.resolve(&first).unwrap().into_list(), vec![4]);
        assert_eq!(action.resolve(&second).unwrap().into_list(), vec![5]);
        assert_eq!(action.resolve(&first).unwrap().into_list(), vec![4]);
    }

    #[test]
    fn clap_rejects_unknown_label() {
        let action = MappingAction::store("foo", rps());
        let err = parse(&action, &["--foo", "lizard"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        let err = parse(&action, &["--foo", "4"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn help_shows_labels_not_values() {
        let action = MappingAction::store("game_move", rps()).help("Pick a move");
        assert_eq!(action.flag(), "--game-move");
        let mut cmd = Command::new("test").arg(action.to_arg());
        cmd.build();
        let arg = cmd
            .get_arguments()
            .find(|a| a.get_id().as_str() == "game_move")
            .unwrap();
        assert_eq!(arg.get_long(), Some("game-move"));
        let names: Vec<String> = arg
            .get_possible_values()
            .iter()
            .map(|v| v.get_name().to_string())
            .collect();
        assert_eq!(names, vec!["rock", "paper", "scissors"]);
    }

    #[test]
    fn backing_values_need_not_be_strings() {
        #[derive(Debug, Clone, PartialEq)]
        enum Shape {
            Square(u32),
            Circle { radius: f32 },
        }
        let choices = ChoiceMap::new()
            .with("small", Shape::Square(1))
            .and_then(|m| m.with("round", Shape::Circle { radius: 2.5 }))
            .unwrap();
        let action = MappingAction::extend("shape", choices);
        let m = Command::new("test")
            .arg(action.to_arg())
            .try_get_matches_from(["test", "--shape", "round", "small"])
            .unwrap();
        assert_eq!(
            action.resolve(&m).unwrap().into_list(),
            vec![Shape::Circle { radius: 2.5 }, Shape::Square(1)]
        );
    }
}
