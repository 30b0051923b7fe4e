//! Implementation of `unitmatch resolve <file>`.
//!
//! Resolves every subject of a study document and prints each session's
//! remap table to stdout. Subject failures and warnings go to stderr.
//!
//! Exit codes:
//! - 0 = every subject resolved
//! - 1 = at least one subject failed (the others are still printed)
//! - 2 = the document could not be read or parsed
use std::fmt::Write as _;

use serde::Serialize;
use unitmatch_core::{ResolveConfig, SessionRemap, StudyDocument, StudyReport, resolve_study};

use crate::cmd::{DiscardRewriter, finish, is_json, write_json, write_text};
use crate::error::CliError;
use crate::format::{FormatterConfig, problems};

/// One subject in the JSON output.
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum SubjectEntry<'a> {
    Resolved {
        subject: &'a str,
        sessions: &'a [SessionRemap],
    },
    Failed {
        subject: &'a str,
        error: String,
    },
}

#[derive(Serialize)]
struct ResolveOutput<'a> {
    subjects: Vec<SubjectEntry<'a>>,
}

/// Runs the `resolve` command.
///
/// # Errors
///
/// - [`CliError::SubjectsFailed`]: at least one subject could not be
///   resolved.
/// - [`CliError::IoError`] / [`CliError::InternalError`]: output failed.
pub fn run(
    document: &StudyDocument,
    config: &ResolveConfig,
    formatter: &FormatterConfig,
) -> Result<(), CliError> {
    let report = resolve_study(document, &mut DiscardRewriter, config);

    if is_json(formatter.format) {
        write_json(&json_output(&report))?;
    } else {
        write_text(&render_human(&report))?;
    }

    finish(&report, &problems(&report, false), formatter)
}

fn json_output(report: &StudyReport) -> ResolveOutput<'_> {
    ResolveOutput {
        subjects: report
            .outcomes
            .iter()
            .map(|o| match &o.resolution {
                Ok(r) => SubjectEntry::Resolved {
                    subject: &o.subject,
                    sessions: &r.sessions,
                },
                Err(e) => SubjectEntry::Failed {
                    subject: &o.subject,
                    error: e.to_string(),
                },
            })
            .collect(),
    }
}

/// Renders resolved subjects as
///
/// ```text
/// mouse-07
///   day1  1:1 2:2 3:3
///   day2  1:1 2:2
/// ```
fn render_human(report: &StudyReport) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        let Ok(resolution) = &outcome.resolution else {
            continue;
        };
        writeln!(out, "{}", outcome.subject).ok();
        let width = resolution
            .sessions
            .iter()
            .map(|s| s.session.len())
            .max()
            .unwrap_or(0);
        for remap in &resolution.sessions {
            let pairs: Vec<String> = remap
                .table
                .iter()
                .map(|(label, id)| format!("{label}:{id}"))
                .collect();
            writeln!(
                out,
                "  {:<width$}  {}",
                remap.session.to_string(),
                pairs.join(" ")
            )
            .ok();
        }
    }
    out
}
