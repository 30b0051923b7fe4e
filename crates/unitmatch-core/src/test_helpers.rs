//! Shared test helper functions for constructing fixtures.
//!
//! Compiled only in test builds. Integration tests in
//! `crates/unitmatch-core/tests/` define their own helpers because they link
//! against the non-test library build.
#![allow(clippy::expect_used)]

use std::collections::BTreeSet;

use crate::comparison::Comparison;
use crate::newtypes::{GlobalId, LocalLabel, SessionId, SubjectId};
use crate::resolve::{Session, Subject};

/// Builds a [`LocalLabel`], panicking on zero (test-only).
pub fn label(n: u32) -> LocalLabel {
    LocalLabel::try_from(n).expect("positive label")
}

/// Builds a [`GlobalId`], panicking on zero (test-only).
pub fn gid(n: u32) -> GlobalId {
    GlobalId::try_from(n).expect("positive identity")
}

/// Builds a [`Comparison`] from raw integers.
pub fn comparison(
    matches: &[(u32, u32)],
    distances: &[f64],
    unmatched_prev: &[u32],
    unmatched_curr: &[u32],
) -> Comparison {
    Comparison {
        matches: matches.iter().map(|&(a, b)| (label(a), label(b))).collect(),
        distances: distances.to_vec(),
        unmatched_prev: unmatched_prev.iter().copied().map(label).collect(),
        unmatched_curr: unmatched_curr.iter().copied().map(label).collect(),
    }
}

/// Builds a [`Session`] with the given labels and no events.
pub fn session(id: &str, sequence: u32, labels: &[u32]) -> Session {
    Session {
        id: SessionId::try_from(id).expect("valid SessionId"),
        sequence,
        labels: labels.iter().copied().map(label).collect::<BTreeSet<_>>(),
        events: Vec::new(),
    }
}

/// Builds a [`Subject`] from its sessions.
pub fn subject(id: &str, sessions: Vec<Session>) -> Subject {
    Subject {
        id: SubjectId::try_from(id).expect("valid SubjectId"),
        sessions,
    }
}

/// The three-session walkthrough used across the test suites.
///
/// Session 1 has labels {1,2,3}; label 3 never matches. Chains 1→1→5 and
/// 2→2→6 continue across both comparisons; label 7 appears in session 3
/// only.
pub fn three_session_comparisons() -> Vec<Comparison> {
    vec![
        comparison(&[(1, 1), (2, 2)], &[0.1, 0.2], &[3], &[]),
        comparison(&[(1, 5), (2, 6)], &[0.05, 0.3], &[], &[7]),
    ]
}
