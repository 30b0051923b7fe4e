/// Problem reporting: human-readable and JSON (NDJSON) modes.
///
/// Subject failures, session rewrite failures and resolver warnings are
/// collected as [`Problem`] values and written to stderr:
///
/// - **Human mode** (default): one line per problem, color-coded by
///   severity. Colors are disabled when `--no-color` is set, the `NO_COLOR`
///   environment variable is present, or stderr is not a TTY.
/// - **JSON mode**: each problem is a single-line JSON object.
///
/// Quiet mode drops warnings but always keeps errors.
use std::io::{IsTerminal as _, Write};

use serde::Serialize;
use unitmatch_core::{SessionId, StudyReport, SubjectId};

use crate::OutputFormat;

// ---------------------------------------------------------------------------
// Color support detection
// ---------------------------------------------------------------------------

/// Returns `true` if ANSI color codes should be emitted to stderr.
pub fn colors_enabled(no_color_flag: bool) -> bool {
    if no_color_flag {
        return false;
    }
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    std::io::stderr().is_terminal()
}

const ANSI_RED: &str = "\x1b[31m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RESET: &str = "\x1b[0m";

// ---------------------------------------------------------------------------
// FormatterConfig
// ---------------------------------------------------------------------------

/// Configuration for the problem formatter, derived from CLI flags.
#[derive(Debug, Clone, Copy)]
pub struct FormatterConfig {
    /// Output mode.
    pub format: OutputFormat,
    /// Whether ANSI colors are enabled.
    pub colors: bool,
    /// Suppress warnings.
    pub quiet: bool,
}

impl FormatterConfig {
    /// Constructs a [`FormatterConfig`] from the raw CLI flags.
    pub fn from_flags(format: OutputFormat, no_color_flag: bool, quiet: bool) -> Self {
        Self {
            format,
            colors: colors_enabled(no_color_flag),
            quiet,
        }
    }
}

// ---------------------------------------------------------------------------
// Problem
// ---------------------------------------------------------------------------

/// How serious a [`Problem`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The subject or session produced no output.
    Error,
    /// Output was produced but deserves attention.
    Warning,
}

/// One reportable failure or warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    /// Severity.
    pub severity: Severity,
    /// Subject concerned.
    pub subject: SubjectId,
    /// Session concerned, for rewrite failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionId>,
    /// Human-readable description.
    pub message: String,
}

impl Problem {
    fn location(&self) -> String {
        match &self.session {
            Some(session) => format!("{}/{session}", self.subject),
            None => self.subject.to_string(),
        }
    }
}

/// Collects every problem of a study run, in subject order.
///
/// `with_rewrites` controls whether session rewrite failures are included.
pub fn problems(report: &StudyReport, with_rewrites: bool) -> Vec<Problem> {
    let mut out = Vec::new();
    for outcome in &report.outcomes {
        match &outcome.resolution {
            Ok(resolution) => {
                out.extend(resolution.warnings.iter().map(|w| Problem {
                    severity: Severity::Warning,
                    subject: outcome.subject.clone(),
                    session: None,
                    message: w.to_string(),
                }));
            }
            Err(e) => out.push(Problem {
                severity: Severity::Error,
                subject: outcome.subject.clone(),
                session: None,
                message: e.to_string(),
            }),
        }
        if with_rewrites {
            out.extend(outcome.failed_rewrites().map(|(session, e)| Problem {
                severity: Severity::Error,
                subject: outcome.subject.clone(),
                session: Some(session.clone()),
                message: e.to_string(),
            }));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Writes a single [`Problem`] in human-readable format.
///
/// Format: `[E] mouse-07/day2: event 3 carries label 9, which has no resolved identity`
///
/// # Errors
///
/// Returns an error only if writing to `writer` fails.
pub fn write_problem_human<W: Write>(
    writer: &mut W,
    problem: &Problem,
    config: &FormatterConfig,
) -> std::io::Result<()> {
    let (tag, color) = match problem.severity {
        Severity::Error => ("[E]", ANSI_RED),
        Severity::Warning => ("[W]", ANSI_YELLOW),
    };
    let location = problem.location();
    if config.colors {
        writeln!(
            writer,
            "{color}{tag}{ANSI_RESET} {location}: {}",
            problem.message
        )
    } else {
        writeln!(writer, "{tag} {location}: {}", problem.message)
    }
}

/// Writes a single [`Problem`] as an NDJSON line.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_problem_json<W: Write>(writer: &mut W, problem: &Problem) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, problem)?;
    writeln!(writer)
}

/// Writes every problem in the configured format, honouring quiet mode.
///
/// # Errors
///
/// Returns an error only if writing to `writer` fails.
pub fn write_problems<W: Write>(
    writer: &mut W,
    problems: &[Problem],
    config: &FormatterConfig,
) -> std::io::Result<()> {
    for problem in problems {
        if config.quiet && problem.severity == Severity::Warning {
            continue;
        }
        match config.format {
            OutputFormat::Human => write_problem_human(writer, problem, config)?,
            OutputFormat::Json => write_problem_json(writer, problem)?,
        }
    }
    Ok(())
}

/// Returns the singular or plural form of a word depending on `count`.
pub fn pluralize<'a>(count: usize, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 { singular } else { plural }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
