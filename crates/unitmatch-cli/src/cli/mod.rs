//! Clap CLI definition: root struct, subcommands, and shared argument types.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use unitmatch_core::{AssignConfig, ResolveConfig, UnmatchedNumbering, UnmatchedOrder};

/// A CLI argument that is either a filesystem path or the stdin sentinel `"-"`.
///
/// Parsing `"-"` yields [`PathOrStdin::Stdin`]; anything else yields
/// [`PathOrStdin::Path`].
#[derive(Clone, Debug)]
pub enum PathOrStdin {
    /// Read from standard input.
    Stdin,
    /// Read from the given filesystem path.
    Path(PathBuf),
}

impl std::str::FromStr for PathOrStdin {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "-" {
            Ok(PathOrStdin::Stdin)
        } else {
            Ok(PathOrStdin::Path(PathBuf::from(s)))
        }
    }
}

/// Output format for CLI commands.
///
/// `Human` emits aligned text to stdout and colored problems to stderr.
/// `Json` emits a single JSON object to stdout and NDJSON problems to stderr.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, optionally colored output (default).
    Human,
    /// Structured JSON / NDJSON output.
    Json,
}

/// Spacing of identities given to unmatched units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Numbering {
    /// Dense numbering after the last matched identity (default).
    Sequential,
    /// Escalating offsets, as older output files were numbered.
    Legacy,
}

/// Which unmatched units are numbered first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum UnmatchedOrderArg {
    /// First-session units, then later units in session order (default).
    Session,
    /// Units first seen after the first session, then first-session units.
    CrossSessionFirst,
}

/// Identity assignment options shared by every resolving subcommand.
#[derive(Args, Clone, Debug)]
pub struct ResolveArgs {
    /// Spacing of unmatched identities.
    #[arg(long, value_enum, default_value = "sequential")]
    pub numbering: Numbering,

    /// Numbering order of unmatched units.
    #[arg(long, value_enum, default_value = "session")]
    pub unmatched_order: UnmatchedOrderArg,

    /// Use the legacy block order and escalating spacing (legacy
    /// numbering, cross-session units first). Overrides `--numbering` and
    /// `--unmatched-order`.
    #[arg(long)]
    pub legacy: bool,

    /// Skip checking comparisons against the label sets sessions declare.
    #[arg(long)]
    pub no_verify_labels: bool,
}

impl ResolveArgs {
    /// Builds the resolver configuration these flags describe.
    pub fn config(&self) -> ResolveConfig {
        let assign = if self.legacy {
            AssignConfig::legacy()
        } else {
            AssignConfig {
                unmatched_order: match self.unmatched_order {
                    UnmatchedOrderArg::Session => UnmatchedOrder::SessionOrder,
                    UnmatchedOrderArg::CrossSessionFirst => UnmatchedOrder::CrossSessionFirst,
                },
                unmatched_numbering: match self.numbering {
                    Numbering::Sequential => UnmatchedNumbering::Sequential,
                    Numbering::Legacy => UnmatchedNumbering::LegacyEscalating,
                },
            }
        };
        ResolveConfig {
            assign,
            verify_session_labels: !self.no_verify_labels,
        }
    }
}

/// All top-level subcommands exposed by the `unitmatch` binary.
#[derive(Subcommand)]
pub enum Command {
    /// Resolve global unit identities and print every session's remap table.
    Resolve {
        /// Path to a study document, or `-` for stdin.
        #[arg(value_name = "FILE")]
        file: PathOrStdin,
        #[command(flatten)]
        args: ResolveArgs,
    },

    /// Resolve identities and rewrite every session's event labels.
    Rewrite {
        /// Path to a study document, or `-` for stdin.
        #[arg(value_name = "FILE")]
        file: PathOrStdin,
        #[command(flatten)]
        args: ResolveArgs,
    },

    /// Print the ranked chains and unmatched units of every subject.
    Inspect {
        /// Path to a study document, or `-` for stdin.
        #[arg(value_name = "FILE")]
        file: PathOrStdin,
        #[command(flatten)]
        args: ResolveArgs,
    },

    /// Print the unitmatch-core library version.
    Version,
}

/// Root CLI struct for the `unitmatch` binary.
///
/// All global flags are defined here and marked `global = true` so that clap
/// propagates them to every subcommand.
#[derive(Parser)]
#[command(
    name = "unitmatch",
    version,
    about = "Cross-session unit identity resolution",
    long_about = "Links spike-sorted units across the recording sessions of each subject,\n\
                  assigns one global identity per inferred physical unit, and rewrites\n\
                  per-session cluster labels to those identities."
)]
pub struct Cli {
    /// Active subcommand.
    #[command(subcommand)]
    pub command: Command,

    /// Output format: human (default) or json.
    #[arg(long, short = 'f', default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Suppress all stderr output except errors (incompatible with `--verbose`).
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Increase stderr verbosity: per-chain debug events and timing
    /// (incompatible with `--quiet`).
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Maximum input file size in bytes.
    ///
    /// Can also be set via the `UNITMATCH_MAX_FILE_SIZE` environment variable.
    /// The CLI flag takes precedence over the environment variable.
    /// Default: 268435456 (256 MB).
    #[arg(
        long,
        global = true,
        env = "UNITMATCH_MAX_FILE_SIZE",
        default_value = "268435456"
    )]
    pub max_file_size: u64,

    /// Disable ANSI color codes in human output.
    ///
    /// Also respects the `NO_COLOR` environment variable per
    /// <https://no-color.org>.
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,
}
