// File: crates/csvargs/src/main.rs

mod args;
mod consumer;

use args::ParseError;
use consumer::{ConsumerError, RecodeOptions};
use std::fs::File;
use std::io::{self, Read, Write};

fn main() {
    // Deterministic logging initialization:
    // - respects RUST_LOG if set
    // - otherwise defaults to warn
    init_logging();

    let command = match args::command() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("csvargs: failed to register arguments: {e}");
            std::process::exit(2);
        }
    };

    let cli = match command.parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(ParseError::Usage(e)) => e.exit(),
        Err(ParseError::Dialect(e)) => {
            // Every flag parsed but the combination is not a usable dialect.
            eprintln!("csvargs: {e}");
            std::process::exit(3);
        }
    };

    if cli.args.describe {
        let described = serde_json::json!({
            "input": cli.input,
            "output": cli.output,
        });
        match serde_json::to_string_pretty(&described) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("csvargs: failed to serialize dialects: {e}");
                std::process::exit(4);
            }
        }
        return;
    }

    let options = RecodeOptions {
        trim: cli.trim,
        flexible: cli.args.flexible,
    };

    match run(&cli, options) {
        Ok(count) => log::info!("wrote {count} records"),
        Err(e) => {
            eprintln!("csvargs: {e}");
            std::process::exit(4);
        }
    }
}

fn run(cli: &args::Cli, options: RecodeOptions) -> Result<u64, ConsumerError> {
    let input: Box<dyn Read> = if cli.args.input == "-" {
        Box::new(io::stdin().lock())
    } else {
        Box::new(File::open(&cli.args.input)?)
    };
    let output: Box<dyn Write> = match &cli.args.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    consumer::recode(input, output, &cli.input, &cli.output, options)
}

fn init_logging() {
    // No timestamps so that stderr is stable across runs.
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));

    builder.format(|buf, record| {
        writeln!(buf, "[{}] {}", record.level(), record.args())
    });

    let _ = builder.try_init();
}
