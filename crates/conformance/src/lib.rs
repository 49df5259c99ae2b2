// File: crates/conformance/src/lib.rs
//
// Conformance harness for argmap dialect groups.
//
// Purpose:
// - Register a dialect group on a fresh command for each fixture
// - Parse the fixture's argv and build the dialect
// - Compare the outcome against a golden JSON file
//
// Goldens are bound to error kinds and messages as well as dialect values, so
// a wording change shows up here before it reaches users.

use argmap::{ArgmapError, Dialect, DialectFields, DialectGroup};
use clap::error::ErrorKind;
use clap::Command;
use serde::{Deserialize, Serialize};
use std::error::Error as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConformanceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("golden mismatch: {0}")]
    GoldenMismatch(String),

    #[error("fixture invalid: {0}")]
    FixtureInvalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub name: String,

    /// Arguments after the program name.
    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default)]
    pub expect_dialect: Option<String>,

    #[serde(default)]
    pub expect_error: Option<String>,
}

fn default_preset() -> String {
    "standard".into()
}

impl Fixture {
    pub fn base_dir(&self, fixture_file: &Path) -> PathBuf {
        fixture_file
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn golden_path(&self, fixture_file: &Path) -> Result<PathBuf, ConformanceError> {
        let rel = self
            .expect_dialect
            .as_ref()
            .or(self.expect_error.as_ref())
            .ok_or_else(|| ConformanceError::FixtureInvalid("missing golden path".into()))?;
        Ok(self.base_dir(fixture_file).join(rel))
    }

    pub fn fields(&self) -> Result<DialectFields, ConformanceError> {
        match self.preset.as_str() {
            "standard" => Ok(DialectFields::standard()),
            "excel" => Ok(DialectFields::excel()),
            other => Err(ConformanceError::FixtureInvalid(format!(
                "fixture '{}' has unknown preset '{}'",
                self.name, other
            ))),
        }
    }

    pub fn validate(&self) -> Result<(), ConformanceError> {
        match (self.expect_dialect.is_some(), self.expect_error.is_some()) {
            (true, false) | (false, true) => Ok(()),
            (false, false) => Err(ConformanceError::FixtureInvalid(format!(
                "fixture '{}' must specify exactly one of expect_dialect or expect_error",
                self.name
            ))),
            (true, true) => Err(ConformanceError::FixtureInvalid(format!(
                "fixture '{}' must not specify both expect_dialect and expect_error",
                self.name
            ))),
        }
    }
}

/// Stable description of a failed parse or build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceError {
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&ArgmapError> for TraceError {
    fn from(e: &ArgmapError) -> Self {
        let kind = match e {
            ArgmapError::UnknownChoice { .. } => "UnknownChoice",
            ArgmapError::DuplicateLabel(_) => "DuplicateLabel",
            ArgmapError::TokenCount { .. } => "TokenCount",
            ArgmapError::InvalidLength { .. } => "InvalidLength",
            ArgmapError::MissingRequiredField { .. } => "MissingRequiredField",
            ArgmapError::NameCollision(_) => "NameCollision",
            ArgmapError::DuplicateField(_) => "DuplicateField",
            ArgmapError::ShapeMismatch { .. } => "ShapeMismatch",
            ArgmapError::UnknownField(_) => "UnknownField",
        };
        Self {
            kind: kind.into(),
            message: Some(e.to_string()),
        }
    }
}

impl From<&clap::Error> for TraceError {
    // clap's own rendering depends on terminal styling, so only library
    // errors carry a message.
    fn from(e: &clap::Error) -> Self {
        if let Some(inner) = e.source().and_then(|s| s.downcast_ref::<ArgmapError>()) {
            return Self::from(inner);
        }
        let kind = match e.kind() {
            ErrorKind::InvalidValue => "UnknownChoice".to_string(),
            other => format!("{other:?}"),
        };
        Self {
            kind,
            message: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DialectTrace {
    Success { dialect: Dialect },
    Failure { error: TraceError },
}

#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    pub bless: bool,
}

pub struct Runner {
    cfg: RunnerConfig,
}

impl Runner {
    pub fn new(cfg: RunnerConfig) -> Self {
        Self { cfg }
    }

    pub fn load_fixture(path: impl AsRef<Path>) -> Result<Fixture, ConformanceError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn run_fixture(&self, fixture: &Fixture) -> Result<DialectTrace, ConformanceError> {
        let mut group = DialectGroup::new(fixture.fields()?);
        if let Some(prefix) = &fixture.prefix {
            group = group.prefix(prefix.clone());
        }

        let (cmd, builder) = match group.register(Command::new("fixture")) {
            Ok(registered) => registered,
            Err(e) => return Ok(failure(TraceError::from(&e))),
        };

        let argv = std::iter::once("fixture".to_string()).chain(fixture.args.iter().cloned());
        let matches = match cmd.try_get_matches_from(argv) {
            Ok(m) => m,
            Err(e) => return Ok(failure(TraceError::from(&e))),
        };

        Ok(match builder.build(&matches) {
            Ok(dialect) => DialectTrace::Success { dialect },
            Err(e) => failure(TraceError::from(&e)),
        })
    }

    pub fn assert_matches(
        &self,
        fixture_file: impl AsRef<Path>,
        fixture: &Fixture,
        produced: &DialectTrace,
    ) -> Result<(), ConformanceError> {
        let fixture_file = fixture_file.as_ref();
        let golden_path = fixture.golden_path(fixture_file)?;

        if self.cfg.bless {
            fs::create_dir_all(golden_path.parent().unwrap_or_else(|| Path::new(".")))?;
            let s = serde_json::to_string_pretty(produced)?;
            fs::write(golden_path, s.as_bytes())?;
            return Ok(());
        }

        let golden_bytes = fs::read(&golden_path)?;
        let golden: DialectTrace = serde_json::from_slice(&golden_bytes)?;

        if &golden != produced {
            let golden_s = serde_json::to_string_pretty(&golden)?;
            let produced_s = serde_json::to_string_pretty(produced)?;
            return Err(ConformanceError::GoldenMismatch(format!(
                "fixture '{}' does not match golden.\nfixture_file: {}\nargs: {:?}\nexpected: {}\n\n--- golden ---\n{}\n\n--- produced ---\n{}\n",
                fixture.name,
                fixture_file.display(),
                fixture.args,
                golden_path.display(),
                golden_s,
                produced_s,
            )));
        }

        Ok(())
    }

    pub fn run_and_check(&self, fixture_file: impl AsRef<Path>) -> Result<(), ConformanceError> {
        let fixture_file = fixture_file.as_ref();
        let fixture = Self::load_fixture(fixture_file)?;
        fixture.validate()?;
        let produced = self.run_fixture(&fixture)?;
        self.assert_matches(fixture_file, &fixture, &produced)
    }
}

fn failure(error: TraceError) -> DialectTrace {
    DialectTrace::Failure { error }
}
