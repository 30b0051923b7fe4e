//! Study documents: subjects, sessions, and precomputed comparisons.
//!
//! A study document is the JSON form the command line works with:
//!
//! ```json
//! {
//!   "subjects": [{
//!     "id": "mouse-07",
//!     "sessions": [{ "id": "day1", "sequence": 1, "labels": [1, 2], "events": [1, 2, 2] }],
//!     "comparisons": [{
//!       "earlier": "day1", "later": "day2",
//!       "matches": [[1, 1]], "distances": [0.1],
//!       "unmatched_prev": [2], "unmatched_curr": []
//!     }]
//!   }]
//! }
//! ```
//!
//! Comparisons are produced ahead of time by whatever matcher the lab uses;
//! [`PrecomputedComparator`] serves them to the resolver.
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::comparison::Comparison;
use crate::error::ResolveError;
use crate::newtypes::{SessionId, SubjectId};
use crate::resolve::{
    LabelRewriter, PairwiseComparator, ResolveConfig, Session, Subject, SubjectOutcome,
    resolve_and_rewrite,
};

/// Error produced while loading a study document.
#[derive(Debug)]
pub enum StudyError {
    /// The document is not valid JSON or does not match the document shape.
    Json(serde_json::Error),
    /// Two subjects share a name.
    DuplicateSubject(SubjectId),
    /// Two sessions of one subject share a name.
    DuplicateSession {
        /// Subject holding the sessions.
        subject: SubjectId,
        /// The repeated session name.
        session: SessionId,
    },
    /// A session pair carries more than one comparison.
    DuplicateComparison {
        /// Subject holding the sessions.
        subject: SubjectId,
        /// Earlier session of the pair.
        earlier: SessionId,
        /// Later session of the pair.
        later: SessionId,
    },
}

impl std::fmt::Display for StudyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StudyError::Json(e) => write!(f, "study document is malformed: {e}"),
            StudyError::DuplicateSubject(id) => write!(f, "subject {id} appears more than once"),
            StudyError::DuplicateSession { subject, session } => {
                write!(f, "subject {subject} lists session {session} more than once")
            }
            StudyError::DuplicateComparison {
                subject,
                earlier,
                later,
            } => write!(
                f,
                "subject {subject} has more than one comparison for {earlier} -> {later}"
            ),
        }
    }
}

impl std::error::Error for StudyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StudyError::Json(e) => Some(e),
            StudyError::DuplicateSubject(_)
            | StudyError::DuplicateSession { .. }
            | StudyError::DuplicateComparison { .. } => None,
        }
    }
}

/// A comparison keyed by the session pair it joins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    /// Earlier session of the pair.
    pub earlier: SessionId,
    /// Later session of the pair.
    pub later: SessionId,
    /// Matches, distances, and leftovers.
    #[serde(flatten)]
    pub comparison: Comparison,
}

/// One subject with its precomputed comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    /// The subject and its sessions.
    #[serde(flatten)]
    pub subject: Subject,
    /// Comparisons between adjacent sessions.
    #[serde(default)]
    pub comparisons: Vec<ComparisonRecord>,
}

/// Root of a study document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyDocument {
    /// Every subject of the study.
    pub subjects: Vec<SubjectRecord>,
}

impl StudyDocument {
    /// Checks the naming invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first duplicate subject, session, or comparison found.
    pub fn check(&self) -> Result<(), StudyError> {
        let mut subjects = HashSet::new();
        for record in &self.subjects {
            let subject = &record.subject;
            if !subjects.insert(&subject.id) {
                return Err(StudyError::DuplicateSubject(subject.id.clone()));
            }
            let mut sessions = HashSet::new();
            for s in &subject.sessions {
                if !sessions.insert(&s.id) {
                    return Err(StudyError::DuplicateSession {
                        subject: subject.id.clone(),
                        session: s.id.clone(),
                    });
                }
            }
            let mut pairs = HashSet::new();
            for c in &record.comparisons {
                if !pairs.insert((&c.earlier, &c.later)) {
                    return Err(StudyError::DuplicateComparison {
                        subject: subject.id.clone(),
                        earlier: c.earlier.clone(),
                        later: c.later.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Parses and checks a study document.
///
/// # Errors
///
/// Returns [`StudyError`] if the JSON is malformed or names repeat.
pub fn parse_study(content: &str) -> Result<StudyDocument, StudyError> {
    let document: StudyDocument = serde_json::from_str(content).map_err(StudyError::Json)?;
    document.check()?;
    Ok(document)
}

/// A [`PairwiseComparator`] that looks comparisons up by session names.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedComparator {
    pairs: HashMap<(SessionId, SessionId), Comparison>,
}

impl PrecomputedComparator {
    /// Indexes the comparisons of one subject record.
    pub fn from_record(record: &SubjectRecord) -> Self {
        record.comparisons.iter().cloned().collect()
    }

    /// Number of indexed pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FromIterator<ComparisonRecord> for PrecomputedComparator {
    fn from_iter<I: IntoIterator<Item = ComparisonRecord>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|r| ((r.earlier, r.later), r.comparison))
                .collect(),
        }
    }
}

impl PairwiseComparator for PrecomputedComparator {
    fn compare(&self, earlier: &Session, later: &Session) -> Result<Comparison, ResolveError> {
        self.pairs
            .get(&(earlier.id.clone(), later.id.clone()))
            .cloned()
            .ok_or_else(|| ResolveError::ComparisonUnavailable {
                earlier: earlier.id.clone(),
                later: later.id.clone(),
            })
    }
}

/// Outcomes of every subject of a study, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudyReport {
    /// One outcome per subject.
    pub outcomes: Vec<SubjectOutcome>,
}

impl StudyReport {
    /// Number of subjects that resolved.
    pub fn resolved_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.resolution.is_ok())
            .count()
    }

    /// Returns `true` if every subject resolved and every session rewrote.
    pub fn is_clean(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.resolution.is_ok() && o.failed_rewrites().next().is_none())
    }
}

/// Resolves every subject of `document` and rewrites its sessions.
///
/// Subjects are independent: a subject that fails is recorded in the report
/// and the next one is processed as usual.
pub fn resolve_study(
    document: &StudyDocument,
    rewriter: &mut dyn LabelRewriter,
    config: &ResolveConfig,
) -> StudyReport {
    let outcomes: Vec<SubjectOutcome> = document
        .subjects
        .iter()
        .map(|record| {
            let comparator = PrecomputedComparator::from_record(record);
            resolve_and_rewrite(&record.subject, &comparator, rewriter, config)
        })
        .collect();
    let report = StudyReport { outcomes };
    tracing::info!(
        subjects = report.outcomes.len(),
        resolved = report.resolved_count(),
        "study resolved"
    );
    report
}
