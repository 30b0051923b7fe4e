//! Cross-session linking: stitching per-comparison matches into chains.
//!
//! Comparisons are consumed strictly in temporal order. Comparison `k` is
//! linked against the finished state of comparison `k - 1`:
//!
//! 1. **Continuation.** Every later label of comparison `k - 1` that belongs
//!    to a chain and is matched again as an earlier label of comparison `k`
//!    extends that chain; the new later label inherits the chain.
//! 2. **Break check.** Labels that appeared in session `k` without a
//!    predecessor (comparison `k - 1`'s `unmatched_curr`) either start a new
//!    chain at comparison `k`, or become a
//!    [`UnmatchedKind::CrossSessionUnmatched`] placeholder of session `k`.
//!    Chains that find no continuation end for good; a unit that reappears
//!    later starts a different chain.
//! 3. **Tail.** After the last comparison, every label in its
//!    `unmatched_curr` becomes a placeholder of the last session.
//!
//! All comparisons are validated (individually and pairwise) before any
//! linking, so a malformed input never yields a partial [`Linkage`].
use std::collections::{BTreeMap, BTreeSet};

use crate::chain::{
    GroupArena, GroupId, LocalMapping, UnmatchedKind, UnmatchedPlaceholder, build_comparison,
};
use crate::comparison::{Comparison, check_adjacent};
use crate::error::ResolveError;
use crate::newtypes::LocalLabel;

/// Everything the identity assigner needs for one subject.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Linkage {
    /// Number of sessions covered (comparisons + 1, or 0 when empty).
    pub session_count: usize,
    /// Every chain and placeholder of the subject.
    pub arena: GroupArena,
    /// One finished mapping per comparison, in temporal order.
    pub mappings: Vec<LocalMapping>,
    /// Provisional first-session table (matched label keyed by itself).
    pub first_session: BTreeMap<LocalLabel, LocalLabel>,
}

impl Linkage {
    /// Linkage for a subject recorded in a single session.
    ///
    /// Nothing can match; every label becomes a first-session placeholder.
    pub fn lone_session(labels: &BTreeSet<LocalLabel>) -> Self {
        let mut arena = GroupArena::new();
        for &label in labels {
            arena.open_placeholder(UnmatchedPlaceholder {
                kind: UnmatchedKind::FirstSessionUnmatched,
                session: 0,
                label,
                opened_by: None,
            });
        }
        Self {
            session_count: 1,
            arena,
            mappings: Vec::new(),
            first_session: BTreeMap::new(),
        }
    }
}

/// Validates every comparison of a subject.
///
/// # Errors
///
/// Returns the first [`ResolveError`] found, checking each comparison in
/// order and then its agreement with its predecessor.
pub fn validate_all(comparisons: &[Comparison]) -> Result<(), ResolveError> {
    for (index, comparison) in comparisons.iter().enumerate() {
        comparison.validate(index)?;
        if index > 0 {
            check_adjacent(&comparisons[index - 1], comparison, index)?;
        }
    }
    Ok(())
}

/// Links the comparisons of one subject, given in temporal order.
///
/// # Errors
///
/// Returns [`ResolveError::MatchSetInconsistent`] (or another validation
/// error) when any comparison breaks the match-set invariants, including a
/// label that one comparison mentions and its neighbour silently drops.
pub fn link(comparisons: &[Comparison]) -> Result<Linkage, ResolveError> {
    validate_all(comparisons)?;

    let Some(first) = comparisons.first() else {
        return Ok(Linkage::default());
    };

    let mut arena = GroupArena::new();
    let mut mappings: Vec<LocalMapping> = Vec::with_capacity(comparisons.len());

    let built = build_comparison(first, 0, &mut arena);
    let seed = built.root.unwrap_or_default();
    let first_session = seed.first_session;
    let mut prev_matched: BTreeMap<LocalLabel, GroupId> = seed.opened;
    let mut prev_unmatched: &[LocalLabel] = &first.unmatched_curr;
    mappings.push(built.mapping);

    for (index, comparison) in comparisons.iter().enumerate().skip(1) {
        let built = build_comparison(comparison, index, &mut arena);
        let mapping = built.mapping;
        let mut matched: BTreeMap<LocalLabel, GroupId> = BTreeMap::new();

        // Continuation of existing chains.
        for (&label, &group) in &prev_matched {
            match mapping.edge_from(label) {
                Some(edge) => {
                    if arena.extend_chain(group, edge) {
                        matched.insert(edge.later, group);
                    }
                }
                None => {
                    tracing::debug!(
                        comparison = index,
                        %label,
                        group = group.index(),
                        "chain terminated"
                    );
                }
            }
        }

        // Labels new in session `index`: start a chain here or stay alone.
        for &label in prev_unmatched {
            if let Some(edge) = mapping.edge_from(label) {
                let group = arena.open_chain(edge);
                tracing::debug!(
                    comparison = index,
                    earlier = %edge.earlier,
                    later = %edge.later,
                    "opened chain after first session"
                );
                matched.insert(edge.later, group);
            } else {
                arena.open_placeholder(UnmatchedPlaceholder {
                    kind: UnmatchedKind::CrossSessionUnmatched,
                    session: index,
                    label,
                    opened_by: Some(index),
                });
            }
        }

        prev_matched = matched;
        prev_unmatched = &comparison.unmatched_curr;
        mappings.push(mapping);
    }

    // Tail: labels of the last session that nothing matched.
    let last = comparisons.len() - 1;
    for &label in prev_unmatched {
        arena.open_placeholder(UnmatchedPlaceholder {
            kind: UnmatchedKind::CrossSessionUnmatched,
            session: comparisons.len(),
            label,
            opened_by: Some(last),
        });
    }

    tracing::debug!(
        comparisons = comparisons.len(),
        chains = arena.chains().count(),
        placeholders = arena.placeholders().count(),
        "linked subject"
    );

    Ok(Linkage {
        session_count: comparisons.len() + 1,
        arena,
        mappings,
        first_session,
    })
}

#[cfg(test)]
mod tests;
