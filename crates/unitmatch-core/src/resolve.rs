//! Per-subject orchestration of the resolution stages.
//!
//! For each subject this module:
//!
//! 1. Orders the sessions by their recording sequence key.
//! 2. Asks a [`PairwiseComparator`] for every adjacent pair.
//! 3. Optionally checks each comparison against the sessions' declared labels.
//! 4. Links the comparisons into chains ([`crate::linker::link`]).
//! 5. Assigns identities once ([`crate::assign::assign_identities`]).
//! 6. Hands every session's table to a [`LabelRewriter`].
//!
//! Subjects never share state. A subject whose input is malformed is
//! reported and skipped; a session whose events cannot be rewritten is
//! reported without affecting its siblings.
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::assign::{AssignConfig, Assignment, assign_identities};
use crate::chain::{Group, UnmatchedKind};
use crate::comparison::{Comparison, check_declared};
use crate::error::{ResolveError, ResolveWarning, RewriteError, Side};
use crate::linker::{Linkage, link};
use crate::newtypes::{GlobalId, LocalLabel, SessionId, SubjectId};
use crate::remap::{RemapTable, rewrite_labels};

// ---------------------------------------------------------------------------
// Input model
// ---------------------------------------------------------------------------

/// One recording session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session name, unique within its subject.
    pub id: SessionId,
    /// Recording-order key; sessions are processed by ascending `sequence`.
    pub sequence: u32,
    /// Unit labels produced by spike sorting. May be left empty, in which
    /// case the comparisons alone define the label set.
    #[serde(default)]
    pub labels: BTreeSet<LocalLabel>,
    /// Per-event cluster labels, rewritten once identities are resolved.
    #[serde(default)]
    pub events: Vec<u32>,
}

/// A subject and its sessions, in any order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject name.
    pub id: SubjectId,
    /// Every session recorded from the subject.
    pub sessions: Vec<Session>,
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Source of pairwise correspondences between adjacent sessions.
pub trait PairwiseComparator {
    /// Compares `earlier` with the session recorded directly after it.
    ///
    /// # Errors
    ///
    /// Implementations return [`ResolveError::ComparisonUnavailable`] when no
    /// correspondence exists for the pair.
    fn compare(&self, earlier: &Session, later: &Session) -> Result<Comparison, ResolveError>;
}

/// Consumer of finished remap tables.
pub trait LabelRewriter {
    /// Rewrites the event labels of `session`, recorded from `subject`,
    /// through `remap`.
    ///
    /// # Errors
    ///
    /// Returns [`RewriteError::KeyUnmapped`] when an event label has no
    /// identity; the failure is isolated to this session.
    fn rewrite(
        &mut self,
        subject: &SubjectId,
        session: &Session,
        remap: &RemapTable,
    ) -> Result<(), RewriteError>;
}

/// A [`LabelRewriter`] that keeps rewritten arrays in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryRewriter {
    /// Rewritten event arrays keyed by subject and session.
    pub rewritten: BTreeMap<(SubjectId, SessionId), Vec<GlobalId>>,
}

impl InMemoryRewriter {
    /// Creates an empty rewriter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewritten events of one session.
    pub fn events(&self, subject: &SubjectId, session: &SessionId) -> Option<&[GlobalId]> {
        self.rewritten
            .get(&(subject.clone(), session.clone()))
            .map(Vec::as_slice)
    }
}

impl LabelRewriter for InMemoryRewriter {
    fn rewrite(
        &mut self,
        subject: &SubjectId,
        session: &Session,
        remap: &RemapTable,
    ) -> Result<(), RewriteError> {
        let out = rewrite_labels(&session.events, remap)?;
        self.rewritten
            .insert((subject.clone(), session.id.clone()), out);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for resolving subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveConfig {
    /// Identity assignment settings.
    pub assign: AssignConfig,
    /// Check every comparison side against the session's declared labels
    /// (skipped for sessions that declare none).
    ///
    /// Default: `true`.
    pub verify_session_labels: bool,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            assign: AssignConfig::default(),
            verify_session_labels: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Output model
// ---------------------------------------------------------------------------

/// The finished table of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRemap {
    /// Session name.
    pub session: SessionId,
    /// Recording-order key.
    pub sequence: u32,
    /// Local label to global identity.
    pub table: RemapTable,
}

/// One chain as it appears in the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainSummary {
    /// Assigned identity.
    pub identity: GlobalId,
    /// Mean match distance.
    pub mean_distance: f64,
    /// `(session, label)` path from first to last session.
    pub path: Vec<(SessionId, LocalLabel)>,
    /// Distances along the path.
    pub distances: Vec<f64>,
}

/// One placeholder as it appears in the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmatchedSummary {
    /// Assigned identity.
    pub identity: GlobalId,
    /// Placeholder category.
    pub kind: UnmatchedKind,
    /// Session holding the label.
    pub session: SessionId,
    /// The unmatched label.
    pub label: LocalLabel,
}

/// Everything resolved for one subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectResolution {
    /// Subject name.
    pub subject: SubjectId,
    /// Tables in session order.
    pub sessions: Vec<SessionRemap>,
    /// Chains in rank order.
    pub chains: Vec<ChainSummary>,
    /// Placeholders in numbering order.
    pub unmatched: Vec<UnmatchedSummary>,
    /// Non-fatal observations.
    #[serde(skip)]
    pub warnings: Vec<ResolveWarning>,
}

impl SubjectResolution {
    /// Table of the session named `id`.
    pub fn table(&self, id: &SessionId) -> Option<&RemapTable> {
        self.sessions
            .iter()
            .find(|s| &s.session == id)
            .map(|s| &s.table)
    }
}

/// Outcome of rewriting one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRewrite {
    /// Session name.
    pub session: SessionId,
    /// Rewrite result.
    pub result: Result<(), RewriteError>,
}

/// Outcome of resolving and rewriting one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectOutcome {
    /// Subject name.
    pub subject: SubjectId,
    /// Resolution, or the error that aborted it.
    pub resolution: Result<SubjectResolution, ResolveError>,
    /// Per-session rewrite results (empty when resolution failed).
    pub rewrites: Vec<SessionRewrite>,
}

impl SubjectOutcome {
    /// Rewrites that failed.
    pub fn failed_rewrites(&self) -> impl Iterator<Item = (&SessionId, &RewriteError)> {
        self.rewrites
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (&r.session, e)))
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Returns the sessions of `subject` in recording order.
///
/// # Errors
///
/// Returns [`ResolveError::SessionOrderAmbiguous`] when two sessions share a
/// sequence key.
pub fn ordered_sessions(subject: &Subject) -> Result<Vec<&Session>, ResolveError> {
    let mut sessions: Vec<&Session> = subject.sessions.iter().collect();
    sessions.sort_by_key(|s| s.sequence);
    for pair in sessions.windows(2) {
        let [a, b] = pair else {
            continue;
        };
        if a.sequence == b.sequence {
            return Err(ResolveError::SessionOrderAmbiguous {
                sequence: a.sequence,
                first: a.id.clone(),
                second: b.id.clone(),
            });
        }
    }
    Ok(sessions)
}

/// Resolves the identities of one subject.
///
/// # Errors
///
/// Any [`ResolveError`] from ordering, comparing, validating, linking, or
/// assigning. The error is specific to this subject.
pub fn resolve_subject(
    subject: &Subject,
    comparator: &dyn PairwiseComparator,
    config: &ResolveConfig,
) -> Result<SubjectResolution, ResolveError> {
    let sessions = ordered_sessions(subject)?;

    let mut comparisons: Vec<Comparison> = Vec::with_capacity(sessions.len().saturating_sub(1));
    for (index, pair) in sessions.windows(2).enumerate() {
        let [earlier, later] = pair else {
            continue;
        };
        let comparison = comparator.compare(earlier, later)?;
        if config.verify_session_labels {
            if !earlier.labels.is_empty() {
                check_declared(&comparison, index, Side::Earlier, &earlier.labels)?;
            }
            if !later.labels.is_empty() {
                check_declared(&comparison, index, Side::Later, &later.labels)?;
            }
        }
        comparisons.push(comparison);
    }

    let mut warnings = Vec::new();
    let linkage = match sessions.as_slice() {
        [only] => {
            warnings.push(ResolveWarning::SingleSession);
            Linkage::lone_session(&only.labels)
        }
        _ => link(&comparisons)?,
    };

    let assignment = assign_identities(&linkage, &config.assign)?;
    warnings.extend(assignment.warnings.iter().cloned());

    let resolution = summarize(subject, &sessions, &linkage, &assignment, warnings);
    tracing::info!(
        subject = %subject.id,
        sessions = resolution.sessions.len(),
        chains = resolution.chains.len(),
        unmatched = resolution.unmatched.len(),
        "resolved subject"
    );
    Ok(resolution)
}

/// Hands every session's table and events to `rewriter`.
///
/// Sessions are rewritten independently; a failure is recorded and the
/// remaining sessions still run.
pub fn rewrite_subject(
    subject: &Subject,
    resolution: &SubjectResolution,
    rewriter: &mut dyn LabelRewriter,
) -> Vec<SessionRewrite> {
    let mut results = Vec::with_capacity(resolution.sessions.len());
    for remap in &resolution.sessions {
        let Some(session) = subject.sessions.iter().find(|s| s.id == remap.session) else {
            continue;
        };
        let result = rewriter.rewrite(&subject.id, session, &remap.table);
        if let Err(e) = &result {
            tracing::debug!(subject = %subject.id, session = %session.id, error = %e, "rewrite failed");
        }
        results.push(SessionRewrite {
            session: session.id.clone(),
            result,
        });
    }
    results
}

/// Resolves one subject and, on success, rewrites its sessions.
pub fn resolve_and_rewrite(
    subject: &Subject,
    comparator: &dyn PairwiseComparator,
    rewriter: &mut dyn LabelRewriter,
    config: &ResolveConfig,
) -> SubjectOutcome {
    let resolution = resolve_subject(subject, comparator, config);
    let rewrites = match &resolution {
        Ok(r) => rewrite_subject(subject, r, rewriter),
        Err(e) => {
            tracing::debug!(subject = %subject.id, error = %e, "subject not resolved");
            Vec::new()
        }
    };
    SubjectOutcome {
        subject: subject.id.clone(),
        resolution,
        rewrites,
    }
}

fn summarize(
    subject: &Subject,
    sessions: &[&Session],
    linkage: &Linkage,
    assignment: &Assignment,
    warnings: Vec<ResolveWarning>,
) -> SubjectResolution {
    let session_remaps = sessions
        .iter()
        .zip(assignment.tables.iter())
        .map(|(s, table)| SessionRemap {
            session: s.id.clone(),
            sequence: s.sequence,
            table: table.clone(),
        })
        .collect();

    let session_id = |index: usize| sessions.get(index).map(|s| s.id.clone());

    let chains = assignment
        .ranked
        .iter()
        .filter_map(|ranked| {
            let chain = linkage.arena.chain(ranked.group)?;
            let first = chain.first_edge()?;
            let mut path = vec![(session_id(first.comparison)?, first.earlier)];
            for edge in chain.edges() {
                path.push((session_id(edge.comparison + 1)?, edge.later));
            }
            Some(ChainSummary {
                identity: ranked.identity,
                mean_distance: ranked.mean_distance,
                path,
                distances: chain.distances().collect(),
            })
        })
        .collect();

    let unmatched = assignment
        .unmatched
        .iter()
        .filter_map(|numbered| match linkage.arena.get(numbered.group)? {
            Group::Unmatched(p) => Some(UnmatchedSummary {
                identity: numbered.identity,
                kind: p.kind,
                session: session_id(p.session)?,
                label: p.label,
            }),
            Group::Chain(_) => None,
        })
        .collect();

    SubjectResolution {
        subject: subject.id.clone(),
        sessions: session_remaps,
        chains,
        unmatched,
        warnings,
    }
}
