/// Command module for the `unitmatch` CLI.
///
/// Each submodule implements one subcommand. The `run` function in each
/// module takes the parsed study document and flags, writes its output to
/// stdout, and returns `Ok(())` on success or a [`CliError`] on failure.
pub mod inspect;
pub mod resolve;
pub mod rewrite;

use std::io::Write;

use serde::Serialize;
use unitmatch_core::{LabelRewriter, RemapTable, RewriteError, Session, StudyReport, SubjectId};

use crate::OutputFormat;
use crate::error::{CliError, stdout_error};
use crate::format::{FormatterConfig, Problem, write_problems};

/// A [`LabelRewriter`] that accepts every table and keeps nothing.
///
/// Used by commands that only report identities.
pub struct DiscardRewriter;

impl LabelRewriter for DiscardRewriter {
    fn rewrite(
        &mut self,
        _subject: &SubjectId,
        _session: &Session,
        _remap: &RemapTable,
    ) -> Result<(), RewriteError> {
        Ok(())
    }
}

/// Writes `value` to stdout as pretty JSON followed by a newline.
///
/// # Errors
///
/// Returns [`CliError::InternalError`] if serialization fails and
/// [`CliError::IoError`] if stdout cannot be written.
pub fn write_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value).map_err(|e| CliError::InternalError {
        detail: format!("JSON serialization failed: {e}"),
    })?;
    out.write_all(b"\n").map_err(|e| stdout_error(&e))
}

/// Writes pre-rendered human text to stdout.
///
/// # Errors
///
/// Returns [`CliError::IoError`] if stdout cannot be written.
pub fn write_text(text: &str) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    out.write_all(text.as_bytes()).map_err(|e| stdout_error(&e))
}

/// Reports problems on stderr and turns failures into an exit status.
///
/// Failed subjects take precedence over failed session rewrites.
///
/// # Errors
///
/// [`CliError::SubjectsFailed`] if any subject failed, otherwise
/// [`CliError::RewriteFailed`] if any problem names a session.
pub fn finish(
    report: &StudyReport,
    problems: &[Problem],
    config: &FormatterConfig,
) -> Result<(), CliError> {
    let stderr = std::io::stderr();
    let mut err_out = stderr.lock();
    write_problems(&mut err_out, problems, config).map_err(|e| CliError::IoError {
        source: "stderr".to_owned(),
        detail: e.to_string(),
    })?;

    let total = report.outcomes.len();
    let failed = total - report.resolved_count();
    if failed > 0 {
        return Err(CliError::SubjectsFailed { failed, total });
    }
    let sessions = problems.iter().filter(|p| p.session.is_some()).count();
    if sessions > 0 {
        return Err(CliError::RewriteFailed { sessions });
    }
    Ok(())
}

/// Returns `true` when output goes out as JSON.
pub fn is_json(format: OutputFormat) -> bool {
    matches!(format, OutputFormat::Json)
}
