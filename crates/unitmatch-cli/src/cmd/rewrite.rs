//! Implementation of `unitmatch rewrite <file>`.
//!
//! Resolves every subject, then rewrites each session's event labels to
//! global identities and prints the rewritten arrays. A session whose events
//! carry a label without an identity is reported on stderr; the remaining
//! sessions and subjects are still rewritten.
//!
//! Exit codes:
//! - 0 = every session rewritten
//! - 1 = a subject failed to resolve, or a session failed to rewrite
//! - 2 = the document could not be read or parsed
use std::fmt::Write as _;

use serde::Serialize;
use unitmatch_core::{
    GlobalId, InMemoryRewriter, ResolveConfig, StudyDocument, StudyReport, resolve_study,
};

use crate::cmd::{finish, is_json, write_json, write_text};
use crate::error::CliError;
use crate::format::{FormatterConfig, problems};

#[derive(Serialize)]
struct SessionEntry<'a> {
    session: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<&'a [GlobalId]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct SubjectEntry<'a> {
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    sessions: Vec<SessionEntry<'a>>,
}

#[derive(Serialize)]
struct RewriteOutput<'a> {
    subjects: Vec<SubjectEntry<'a>>,
}

/// Runs the `rewrite` command.
///
/// # Errors
///
/// - [`CliError::SubjectsFailed`]: at least one subject could not be
///   resolved.
/// - [`CliError::RewriteFailed`]: every subject resolved but at least one
///   session could not be rewritten.
pub fn run(
    document: &StudyDocument,
    config: &ResolveConfig,
    formatter: &FormatterConfig,
) -> Result<(), CliError> {
    let mut rewriter = InMemoryRewriter::new();
    let report = resolve_study(document, &mut rewriter, config);

    if is_json(formatter.format) {
        write_json(&json_output(&report, &rewriter))?;
    } else {
        write_text(&render_human(&report, &rewriter))?;
    }

    finish(&report, &problems(&report, true), formatter)
}

fn json_output<'a>(report: &'a StudyReport, rewriter: &'a InMemoryRewriter) -> RewriteOutput<'a> {
    let subjects = report
        .outcomes
        .iter()
        .map(|outcome| SubjectEntry {
            subject: &outcome.subject,
            error: outcome.resolution.as_ref().err().map(ToString::to_string),
            sessions: outcome
                .rewrites
                .iter()
                .map(|r| SessionEntry {
                    session: &r.session,
                    events: rewriter.events(&outcome.subject, &r.session),
                    error: r.result.as_ref().err().map(ToString::to_string),
                })
                .collect(),
        })
        .collect();
    RewriteOutput { subjects }
}

/// Renders one line per rewritten session: `mouse-07/day1: 1 2 2 4`.
fn render_human(report: &StudyReport, rewriter: &InMemoryRewriter) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        for rewrite in &outcome.rewrites {
            let Some(events) = rewriter.events(&outcome.subject, &rewrite.session) else {
                continue;
            };
            let ids: Vec<String> = events.iter().map(ToString::to_string).collect();
            writeln!(
                out,
                "{}/{}: {}",
                outcome.subject,
                rewrite.session,
                ids.join(" ")
            )
            .ok();
        }
    }
    out
}
