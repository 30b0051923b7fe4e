//! Pairwise correspondence between two adjacent sessions.
//!
//! A [`Comparison`] is produced by an external pairwise comparator and
//! consumed as-is. Before any linking happens it is checked against the
//! match-set invariants: every label takes part in at most one match per
//! side, and no label is both matched and unmatched on the same side.
//! [`check_adjacent`] additionally verifies that two consecutive comparisons
//! agree on the label set of the session they share.
use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{InconsistencyReason, ResolveError, Side};
use crate::newtypes::LocalLabel;

/// Matches, distances and leftovers for one adjacent session pair.
///
/// Match pairs are `(earlier_label, later_label)`; `distances[i]` is the
/// dissimilarity of `matches[i]` (smaller is more confident).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Comparison {
    /// Matched label pairs in comparator order.
    pub matches: Vec<(LocalLabel, LocalLabel)>,
    /// One non-negative distance per match.
    pub distances: Vec<f64>,
    /// Earlier-session labels that take part in no match.
    #[serde(default)]
    pub unmatched_prev: Vec<LocalLabel>,
    /// Later-session labels that take part in no match.
    #[serde(default)]
    pub unmatched_curr: Vec<LocalLabel>,
}

impl Comparison {
    /// Checks the structural invariants of this comparison.
    ///
    /// `index` is only used to label errors.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::DistanceCountMismatch`] when `distances` and `matches`
    ///   differ in length.
    /// - [`ResolveError::InvalidDistance`] for a negative or non-finite distance.
    /// - [`ResolveError::MatchSetInconsistent`] when a label repeats within the
    ///   matches or unmatched set of one side, or sits in both.
    pub fn validate(&self, index: usize) -> Result<(), ResolveError> {
        if self.matches.len() != self.distances.len() {
            return Err(ResolveError::DistanceCountMismatch {
                comparison: index,
                matches: self.matches.len(),
                distances: self.distances.len(),
            });
        }

        for (i, &d) in self.distances.iter().enumerate() {
            if !d.is_finite() || d < 0.0 {
                return Err(ResolveError::InvalidDistance {
                    comparison: index,
                    index: i,
                    value: d,
                });
            }
        }

        check_side(
            index,
            Side::Earlier,
            self.matches.iter().map(|&(earlier, _)| earlier),
            &self.unmatched_prev,
        )?;
        check_side(
            index,
            Side::Later,
            self.matches.iter().map(|&(_, later)| later),
            &self.unmatched_curr,
        )
    }

    /// All labels of the earlier session mentioned by this comparison.
    pub fn earlier_labels(&self) -> BTreeSet<LocalLabel> {
        self.matches
            .iter()
            .map(|&(earlier, _)| earlier)
            .chain(self.unmatched_prev.iter().copied())
            .collect()
    }

    /// All labels of the later session mentioned by this comparison.
    pub fn later_labels(&self) -> BTreeSet<LocalLabel> {
        self.matches
            .iter()
            .map(|&(_, later)| later)
            .chain(self.unmatched_curr.iter().copied())
            .collect()
    }

    /// Returns the labels of `side`.
    pub fn labels(&self, side: Side) -> BTreeSet<LocalLabel> {
        match side {
            Side::Earlier => self.earlier_labels(),
            Side::Later => self.later_labels(),
        }
    }

    /// Returns `true` if the comparison mentions no label at all.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty() && self.unmatched_prev.is_empty() && self.unmatched_curr.is_empty()
    }
}

/// Uniqueness check for one side of a comparison.
fn check_side(
    index: usize,
    side: Side,
    matched: impl Iterator<Item = LocalLabel>,
    unmatched: &[LocalLabel],
) -> Result<(), ResolveError> {
    let inconsistent = |label, reason| ResolveError::MatchSetInconsistent {
        comparison: index,
        side,
        label,
        reason,
    };

    let mut seen_matched: HashSet<LocalLabel> = HashSet::new();
    for label in matched {
        if !seen_matched.insert(label) {
            return Err(inconsistent(label, InconsistencyReason::RepeatedInMatches));
        }
    }

    let mut seen_unmatched: HashSet<LocalLabel> = HashSet::new();
    for &label in unmatched {
        if seen_matched.contains(&label) {
            return Err(inconsistent(label, InconsistencyReason::MatchedAndUnmatched));
        }
        if !seen_unmatched.insert(label) {
            return Err(inconsistent(label, InconsistencyReason::RepeatedInUnmatched));
        }
    }
    Ok(())
}

/// Checks that comparison `index - 1` (`prev`) and comparison `index`
/// (`next`) describe the same session with the same label set.
///
/// # Errors
///
/// Returns [`ResolveError::MatchSetInconsistent`] with reason
/// [`InconsistencyReason::AbsentFromAdjacentComparison`] for the smallest
/// label present on one side only. A label the earlier comparison knows but
/// the later one drops is reported against `next`; the converse is reported
/// against `prev`.
pub fn check_adjacent(
    prev: &Comparison,
    next: &Comparison,
    index: usize,
) -> Result<(), ResolveError> {
    let shared_from_prev = prev.later_labels();
    let shared_from_next = next.earlier_labels();

    let dropped = shared_from_prev.difference(&shared_from_next).next().copied();
    let invented = shared_from_next.difference(&shared_from_prev).next().copied();

    match (dropped, invented) {
        (None, None) => Ok(()),
        (Some(d), Some(i)) if i < d => Err(ResolveError::MatchSetInconsistent {
            comparison: index.saturating_sub(1),
            side: Side::Later,
            label: i,
            reason: InconsistencyReason::AbsentFromAdjacentComparison,
        }),
        (Some(d), _) => Err(ResolveError::MatchSetInconsistent {
            comparison: index,
            side: Side::Earlier,
            label: d,
            reason: InconsistencyReason::AbsentFromAdjacentComparison,
        }),
        (None, Some(i)) => Err(ResolveError::MatchSetInconsistent {
            comparison: index.saturating_sub(1),
            side: Side::Later,
            label: i,
            reason: InconsistencyReason::AbsentFromAdjacentComparison,
        }),
    }
}

/// Checks one side of a comparison against the label set its session
/// declares.
///
/// # Errors
///
/// Returns [`ResolveError::MatchSetInconsistent`] for the smallest label that
/// is mentioned but undeclared ([`InconsistencyReason::NotDeclaredBySession`])
/// or declared but never mentioned
/// ([`InconsistencyReason::MissingFromComparison`]).
pub fn check_declared(
    comparison: &Comparison,
    index: usize,
    side: Side,
    declared: &BTreeSet<LocalLabel>,
) -> Result<(), ResolveError> {
    let mentioned = comparison.labels(side);
    if let Some(&label) = mentioned.difference(declared).next() {
        return Err(ResolveError::MatchSetInconsistent {
            comparison: index,
            side,
            label,
            reason: InconsistencyReason::NotDeclaredBySession,
        });
    }
    if let Some(&label) = declared.difference(&mentioned).next() {
        return Err(ResolveError::MatchSetInconsistent {
            comparison: index,
            side,
            label,
            reason: InconsistencyReason::MissingFromComparison,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::test_helpers::{comparison, label};

    #[test]
    fn well_formed_comparison_validates() {
        let c = comparison(&[(1, 1), (2, 2)], &[0.1, 0.2], &[3], &[]);
        assert!(c.validate(0).is_ok());
    }

    #[test]
    fn distance_count_mismatch_is_rejected() {
        let c = comparison(&[(1, 1), (2, 2)], &[0.1], &[], &[]);
        assert_eq!(
            c.validate(4),
            Err(ResolveError::DistanceCountMismatch {
                comparison: 4,
                matches: 2,
                distances: 1,
            })
        );
    }

    #[test]
    fn negative_and_nan_distances_are_rejected() {
        let c = comparison(&[(1, 1)], &[-0.5], &[], &[]);
        assert!(matches!(
            c.validate(0),
            Err(ResolveError::InvalidDistance { index: 0, .. })
        ));

        let c = comparison(&[(1, 1), (2, 2)], &[0.1, f64::NAN], &[], &[]);
        assert!(matches!(
            c.validate(0),
            Err(ResolveError::InvalidDistance { index: 1, .. })
        ));
    }

    #[test]
    fn zero_distance_is_allowed() {
        let c = comparison(&[(1, 1)], &[0.0], &[], &[]);
        assert!(c.validate(0).is_ok());
    }

    #[test]
    fn label_in_two_matches_is_inconsistent() {
        let c = comparison(&[(1, 1), (1, 2)], &[0.1, 0.2], &[], &[]);
        assert_eq!(
            c.validate(0),
            Err(ResolveError::MatchSetInconsistent {
                comparison: 0,
                side: Side::Earlier,
                label: label(1),
                reason: InconsistencyReason::RepeatedInMatches,
            })
        );
    }

    #[test]
    fn later_label_matched_and_unmatched_is_inconsistent() {
        let c = comparison(&[(1, 5)], &[0.1], &[], &[5]);
        assert_eq!(
            c.validate(2),
            Err(ResolveError::MatchSetInconsistent {
                comparison: 2,
                side: Side::Later,
                label: label(5),
                reason: InconsistencyReason::MatchedAndUnmatched,
            })
        );
    }

    #[test]
    fn repeated_unmatched_label_is_inconsistent() {
        let c = comparison(&[], &[], &[3, 3], &[]);
        assert!(matches!(
            c.validate(0),
            Err(ResolveError::MatchSetInconsistent {
                reason: InconsistencyReason::RepeatedInUnmatched,
                ..
            })
        ));
    }

    #[test]
    fn same_label_on_both_sides_is_fine() {
        // Label spaces are per session; 3 -> 3 is an ordinary match.
        let c = comparison(&[(3, 3)], &[0.4], &[1], &[1]);
        assert!(c.validate(0).is_ok());
    }

    #[test]
    fn adjacent_comparisons_agree() {
        let first = comparison(&[(1, 1), (2, 2)], &[0.1, 0.2], &[3], &[4]);
        let second = comparison(&[(1, 5), (4, 6)], &[0.1, 0.2], &[2], &[]);
        assert!(check_adjacent(&first, &second, 1).is_ok());
    }

    #[test]
    fn dropped_label_is_reported_against_later_comparison() {
        let first = comparison(&[(1, 1), (2, 2)], &[0.1, 0.2], &[], &[]);
        let second = comparison(&[(1, 5)], &[0.1], &[], &[]);
        assert_eq!(
            check_adjacent(&first, &second, 1),
            Err(ResolveError::MatchSetInconsistent {
                comparison: 1,
                side: Side::Earlier,
                label: label(2),
                reason: InconsistencyReason::AbsentFromAdjacentComparison,
            })
        );
    }

    #[test]
    fn invented_label_is_reported_against_earlier_comparison() {
        let first = comparison(&[(1, 1)], &[0.1], &[], &[]);
        let second = comparison(&[(1, 5), (9, 6)], &[0.1, 0.3], &[], &[]);
        assert_eq!(
            check_adjacent(&first, &second, 1),
            Err(ResolveError::MatchSetInconsistent {
                comparison: 0,
                side: Side::Later,
                label: label(9),
                reason: InconsistencyReason::AbsentFromAdjacentComparison,
            })
        );
    }

    #[test]
    fn declared_labels_must_match_mentioned_labels() {
        let c = comparison(&[(1, 1)], &[0.1], &[2], &[]);
        let declared: BTreeSet<LocalLabel> = [label(1), label(2)].into_iter().collect();
        assert!(check_declared(&c, 0, Side::Earlier, &declared).is_ok());

        let declared: BTreeSet<LocalLabel> = [label(1), label(2), label(3)].into_iter().collect();
        assert!(matches!(
            check_declared(&c, 0, Side::Earlier, &declared),
            Err(ResolveError::MatchSetInconsistent {
                reason: InconsistencyReason::MissingFromComparison,
                ..
            })
        ));

        let declared: BTreeSet<LocalLabel> = [label(1)].into_iter().collect();
        assert!(matches!(
            check_declared(&c, 0, Side::Earlier, &declared),
            Err(ResolveError::MatchSetInconsistent {
                reason: InconsistencyReason::NotDeclaredBySession,
                ..
            })
        ));
    }

    #[test]
    fn deserializes_pairs_from_json_arrays() {
        let c: Comparison = serde_json::from_str(
            r#"{"matches": [[1, 1], [2, 2]], "distances": [0.1, 0.2], "unmatched_prev": [3]}"#,
        )
        .expect("parse comparison");
        assert_eq!(c.matches.len(), 2);
        assert!(c.unmatched_curr.is_empty());
        assert_eq!(c.earlier_labels().len(), 3);
    }
}
