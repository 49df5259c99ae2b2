// File: crates/csvargs/src/args.rs
//
// Command-line argument definitions for the `csvargs` executable.
//
// Static options are declared with clap derive. The `--trim` mapping action
// and the input/output dialect groups are added to the derived command at
// runtime, and everything is read back from one set of matches.

use argmap::{ArgmapError, ChoiceMap, Dialect, DialectBuilder, DialectFields, DialectGroup, MappingAction};
use clap::{ArgMatches, Command, CommandFactory, FromArgMatches, Parser};
use csv::Trim;
use std::ffi::OsString;
use std::path::PathBuf;
use thiserror::Error;

/// Recode CSV from one dialect to another.
///
/// The input dialect is described with `--in-*` flags, the output dialect
/// with `--out-*` flags. Both start from the spreadsheet dialect: comma
/// delimited, `"` quoted, CRLF line endings, minimal quoting.
#[derive(Debug, Parser)]
#[command(name = "csvargs")]
#[command(version)]
#[command(about = "Recode CSV between dialects described on the command line", long_about = None)]
pub struct Args {
    /// Input CSV file (`-` for stdin)
    #[arg(value_name = "FILE", default_value = "-")]
    pub input: String,

    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the resolved input and output dialects as JSON and exit
    ///
    /// Useful for checking how flags and defaults combine before recoding.
    #[arg(long)]
    pub describe: bool,

    /// Accept records whose field counts differ
    #[arg(long)]
    pub flexible: bool,
}

#[derive(Debug, Error)]
pub enum ParseError {
    /// Usage errors, including unknown labels and bad single-character values.
    #[error(transparent)]
    Usage(#[from] clap::Error),

    /// Parsing succeeded but a dialect could not be assembled.
    #[error(transparent)]
    Dialect(#[from] ArgmapError),
}

/// Everything the executable needs after parsing.
#[derive(Debug)]
pub struct Cli {
    pub args: Args,
    pub input: Dialect,
    pub output: Dialect,
    pub trim: Option<Trim>,
}

/// The full command plus the handles needed to read it back.
pub struct CliCommand {
    cmd: Command,
    trim: MappingAction<Trim>,
    input: DialectBuilder,
    output: DialectBuilder,
}

fn trim_choices() -> Result<ChoiceMap<Trim>, ArgmapError> {
    ChoiceMap::try_from_pairs([
        ("none", Trim::None),
        ("headers", Trim::Headers),
        ("fields", Trim::Fields),
        ("all", Trim::All),
    ])
}

pub fn command() -> Result<CliCommand, ArgmapError> {
    let trim = MappingAction::store("trim", trim_choices()?)
        .value_name("WHERE")
        .help("Trim surrounding whitespace when reading (overrides --in-skipinitialspace)");

    let cmd = Args::command().arg(trim.to_arg());
    let (cmd, input) = DialectGroup::new(DialectFields::excel())
        .prefix("in")
        .title("Input dialect")
        .description("How the input is delimited and quoted. Line endings are always auto-detected when reading.")
        .register(cmd)?;
    let (cmd, output) = DialectGroup::new(DialectFields::excel())
        .prefix("out")
        .title("Output dialect")
        .description("How the output is delimited, quoted and terminated.")
        .register(cmd)?;

    Ok(CliCommand {
        cmd,
        trim,
        input,
        output,
    })
}

impl CliCommand {
    pub fn command(&self) -> &Command {
        &self.cmd
    }

    pub fn parse_from<I, T>(mut self, argv: I) -> Result<Cli, ParseError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.cmd.try_get_matches_from_mut(argv)?;
        self.read(&matches)
    }

    fn read(&self, matches: &ArgMatches) -> Result<Cli, ParseError> {
        Ok(Cli {
            args: Args::from_arg_matches(matches)?,
            input: self.input.build(matches)?,
            output: self.output.build(matches)?,
            trim: self.trim.resolve(matches)?.into_single(),
        })
    }
}
