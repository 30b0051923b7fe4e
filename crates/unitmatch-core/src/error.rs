//! Error and warning types shared by the resolution stages.
//!
//! [`ResolveError`] is fatal for the subject being resolved: the input is
//! structurally malformed (or the engine hit a defect) and nothing is retried.
//! [`RewriteError`] is fatal for one session only. [`ResolveWarning`] values
//! are returned as data alongside a successful result.
use std::fmt;

use crate::newtypes::{GlobalId, LocalLabel, SessionId};

// ---------------------------------------------------------------------------
// Side / InconsistencyReason
// ---------------------------------------------------------------------------

/// Which session of a comparison a label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The earlier session of the pair.
    Earlier,
    /// The later session of the pair.
    Later,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Earlier => f.write_str("earlier"),
            Self::Later => f.write_str("later"),
        }
    }
}

/// Why a label breaks the match-set invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InconsistencyReason {
    /// The label takes part in more than one match on the same side.
    RepeatedInMatches,
    /// The label is listed twice in the same unmatched set.
    RepeatedInUnmatched,
    /// The label is both matched and listed as unmatched on the same side.
    MatchedAndUnmatched,
    /// The neighbouring comparison describes the same session without this
    /// label.
    AbsentFromAdjacentComparison,
    /// The session's declared label set does not contain this label.
    NotDeclaredBySession,
    /// The session declares this label but the comparison never mentions it.
    MissingFromComparison,
}

impl fmt::Display for InconsistencyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RepeatedInMatches => f.write_str("appears in more than one match"),
            Self::RepeatedInUnmatched => f.write_str("is listed twice as unmatched"),
            Self::MatchedAndUnmatched => f.write_str("is both matched and unmatched"),
            Self::AbsentFromAdjacentComparison => {
                f.write_str("is absent from the adjacent comparison of the same session")
            }
            Self::NotDeclaredBySession => f.write_str("is not a label of the session"),
            Self::MissingFromComparison => f.write_str("is never mentioned by the comparison"),
        }
    }
}

// ---------------------------------------------------------------------------
// ResolveError
// ---------------------------------------------------------------------------

/// Errors that abort the resolution of one subject.
///
/// Comparison indices are zero-based positions in the subject's temporal
/// sequence: comparison `k` joins session `k` to session `k + 1`.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// A label violates the uniqueness or coverage invariants of a comparison.
    MatchSetInconsistent {
        /// The offending comparison.
        comparison: usize,
        /// Side of the comparison the label belongs to.
        side: Side,
        /// The offending label.
        label: LocalLabel,
        /// What exactly is wrong with it.
        reason: InconsistencyReason,
    },
    /// The distance sequence is not aligned with the match sequence.
    DistanceCountMismatch {
        /// The offending comparison.
        comparison: usize,
        /// Number of match pairs.
        matches: usize,
        /// Number of distances.
        distances: usize,
    },
    /// A distance is negative, infinite, or NaN.
    InvalidDistance {
        /// The offending comparison.
        comparison: usize,
        /// Position of the distance in the sequence.
        index: usize,
        /// The rejected value.
        value: f64,
    },
    /// Two sessions of one subject claim the same recording position.
    SessionOrderAmbiguous {
        /// The shared sequence key.
        sequence: u32,
        /// First session carrying it.
        first: SessionId,
        /// Second session carrying it.
        second: SessionId,
    },
    /// The comparator has no correspondence record for an adjacent pair.
    ComparisonUnavailable {
        /// Earlier session of the pair.
        earlier: SessionId,
        /// Later session of the pair.
        later: SessionId,
    },
    /// Two writes disagree on the identity of one local label.
    ///
    /// Indicates a defect in the engine rather than bad input.
    ConflictingAssignment {
        /// Session position within the subject.
        session: usize,
        /// The label written twice.
        label: LocalLabel,
        /// Identity already present.
        existing: GlobalId,
        /// Identity the second write carried.
        incoming: GlobalId,
    },
    /// More identities were needed than fit in a `u32`.
    IdentityOverflow,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatchSetInconsistent {
                comparison,
                side,
                label,
                reason,
            } => write!(
                f,
                "match set inconsistent in comparison {comparison}: {side} label {label} {reason}"
            ),
            Self::DistanceCountMismatch {
                comparison,
                matches,
                distances,
            } => write!(
                f,
                "comparison {comparison} has {matches} match(es) but {distances} distance(s)"
            ),
            Self::InvalidDistance {
                comparison,
                index,
                value,
            } => write!(
                f,
                "comparison {comparison} distance #{index} is {value}; distances must be finite and non-negative"
            ),
            Self::SessionOrderAmbiguous {
                sequence,
                first,
                second,
            } => write!(
                f,
                "sessions {first} and {second} share sequence position {sequence}"
            ),
            Self::ComparisonUnavailable { earlier, later } => {
                write!(f, "no comparison available for sessions {earlier} -> {later}")
            }
            Self::ConflictingAssignment {
                session,
                label,
                existing,
                incoming,
            } => write!(
                f,
                "label {label} of session {session} already resolved to {existing}, refusing to overwrite with {incoming}"
            ),
            Self::IdentityOverflow => f.write_str("global identity space exhausted"),
        }
    }
}

impl std::error::Error for ResolveError {}

// ---------------------------------------------------------------------------
// RewriteError
// ---------------------------------------------------------------------------

/// Errors produced while rewriting one session's event labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    /// An event carries a label the session's remap table does not know.
    KeyUnmapped {
        /// The raw event label.
        label: u32,
        /// Position of the first offending event.
        position: usize,
    },
}

impl fmt::Display for RewriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyUnmapped { label, position } => write!(
                f,
                "event {position} carries label {label}, which has no resolved identity"
            ),
        }
    }
}

impl std::error::Error for RewriteError {}

// ---------------------------------------------------------------------------
// ResolveWarning
// ---------------------------------------------------------------------------

/// Non-fatal observations produced while resolving a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveWarning {
    /// No chain recorded a distance; every identity is an unmatched one.
    EmptyDistancePool,
    /// The subject has a single session, so nothing could be matched.
    SingleSession,
}

impl fmt::Display for ResolveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDistancePool => {
                f.write_str("no matched chains; all identities were assigned to unmatched units")
            }
            Self::SingleSession => {
                f.write_str("subject has a single session; labels numbered without matching")
            }
        }
    }
}
