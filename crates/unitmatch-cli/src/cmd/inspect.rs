//! Implementation of `unitmatch inspect <file>`.
//!
//! Resolves every subject and prints how its identities came about:
//! - ranked chains with their identity, mean distance and session path
//! - unmatched units with their identity, category and session
//!
//! In `--format json` mode a single JSON object is emitted to stdout.
//! In human mode, aligned columns are printed per subject.
//!
//! Exit codes: 0 = success, 1 = a subject failed, 2 = parse failure.
use std::fmt::Write as _;

use serde::Serialize;
use unitmatch_core::{
    ChainSummary, ResolveConfig, StudyDocument, StudyReport, SubjectResolution, UnmatchedKind,
    UnmatchedSummary, resolve_study,
};

use crate::cmd::{DiscardRewriter, finish, is_json, write_json, write_text};
use crate::error::CliError;
use crate::format::{FormatterConfig, pluralize, problems};

#[derive(Serialize)]
struct SubjectEntry<'a> {
    subject: &'a str,
    chains: &'a [ChainSummary],
    unmatched: &'a [UnmatchedSummary],
}

#[derive(Serialize)]
struct InspectOutput<'a> {
    subjects: Vec<SubjectEntry<'a>>,
}

/// Runs the `inspect` command.
///
/// # Errors
///
/// Returns [`CliError::SubjectsFailed`] if any subject could not be
/// resolved; the resolved ones are still printed.
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

fn json_output(report: &StudyReport) -> InspectOutput<'_> {
    InspectOutput {
        subjects: resolved(report)
            .map(|r| SubjectEntry {
                subject: &r.subject,
                chains: &r.chains,
                unmatched: &r.unmatched,
            })
            .collect(),
    }
}

fn resolved(report: &StudyReport) -> impl Iterator<Item = &SubjectResolution> {
    report
        .outcomes
        .iter()
        .filter_map(|o| o.resolution.as_ref().ok())
}

fn kind_str(kind: UnmatchedKind) -> &'static str {
    match kind {
        UnmatchedKind::FirstSessionUnmatched => "first-session",
        UnmatchedKind::CrossSessionUnmatched => "cross-session",
    }
}

fn render_human(report: &StudyReport) -> String {
    let mut out = String::new();
    for r in resolved(report) {
        writeln!(
            out,
            "{}: {} {}, {} unmatched",
            r.subject,
            r.chains.len(),
            pluralize(r.chains.len(), "chain", "chains"),
            r.unmatched.len()
        )
        .ok();
        for chain in &r.chains {
            let path: Vec<String> = chain
                .path
                .iter()
                .map(|(session, label)| format!("{session}:{label}"))
                .collect();
            writeln!(
                out,
                "  {:>4}  {:.4}  {}",
                chain.identity.get(),
                chain.mean_distance,
                path.join(" -> ")
            )
            .ok();
        }
        for unit in &r.unmatched {
            writeln!(
                out,
                "  {:>4}  {:<13}  {}:{}",
                unit.identity.get(),
                kind_str(unit.kind),
                unit.session,
                unit.label
            )
            .ok();
        }
    }
    out
}
