use std::time::Instant;

use clap::Parser;

mod cli;
mod cmd;
mod error;
mod format;
mod io;

pub use cli::{Cli, Command, OutputFormat, PathOrStdin};

use crate::error::CliError;
use crate::format::FormatterConfig;

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the level follows `--quiet` and
/// `--verbose`; JSON mode logs errors only so stderr stays NDJSON.
fn init_tracing(cli: &Cli, formatter: &FormatterConfig) {
    let default = if cli.verbose {
        "debug"
    } else if cli.quiet || formatter.format == OutputFormat::Json {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(formatter.colors)
        .with_target(false)
        .init();
}

fn run(cli: &Cli, formatter: &FormatterConfig) -> Result<(), CliError> {
    let started = Instant::now();
    let result = match &cli.command {
        Command::Version => {
            println!("{}", unitmatch_core::version());
            return Ok(());
        }
        Command::Resolve { file, args } => {
            let document = io::read_study(file, cli.max_file_size)?;
            cmd::resolve::run(&document, &args.config(), formatter)
        }
        Command::Rewrite { file, args } => {
            let document = io::read_study(file, cli.max_file_size)?;
            cmd::rewrite::run(&document, &args.config(), formatter)
        }
        Command::Inspect { file, args } => {
            let document = io::read_study(file, cli.max_file_size)?;
            cmd::inspect::run(&document, &args.config(), formatter)
        }
    };
    tracing::debug!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "command finished"
    );
    result
}

fn main() {
    let cli = Cli::parse();
    let formatter = FormatterConfig::from_flags(cli.format, cli.no_color, cli.quiet);
    init_tracing(&cli, &formatter);

    if let Err(e) = run(&cli, &formatter) {
        eprintln!("{}", e.message());
        std::process::exit(e.exit_code());
    }
}
