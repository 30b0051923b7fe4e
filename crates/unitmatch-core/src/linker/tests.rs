#![allow(clippy::expect_used)]

use super::*;
use crate::chain::Group;
use crate::error::{InconsistencyReason, Side};
use crate::test_helpers::{comparison, label, three_session_comparisons};

fn chain_paths(linkage: &Linkage) -> Vec<Vec<(usize, u32, u32)>> {
    linkage
        .arena
        .chains()
        .map(|(_, chain)| {
            chain
                .edges()
                .iter()
                .map(|e| (e.comparison, e.earlier.get(), e.later.get()))
                .collect()
        })
        .collect()
}

fn placeholders(linkage: &Linkage) -> Vec<(UnmatchedKind, usize, u32)> {
    linkage
        .arena
        .placeholders()
        .map(|(_, p)| (p.kind, p.session, p.label.get()))
        .collect()
}

#[test]
fn empty_input_links_to_empty_linkage() {
    let linkage = link(&[]).expect("empty is fine");
    assert_eq!(linkage.session_count, 0);
    assert!(linkage.arena.is_empty());
}

#[test]
fn three_sessions_build_two_chains_and_two_placeholders() {
    let linkage = link(&three_session_comparisons()).expect("link");

    assert_eq!(linkage.session_count, 3);
    assert_eq!(linkage.mappings.len(), 2);
    assert_eq!(
        chain_paths(&linkage),
        vec![vec![(0, 1, 1), (1, 1, 5)], vec![(0, 2, 2), (1, 2, 6)]]
    );
    assert_eq!(
        placeholders(&linkage),
        vec![
            (UnmatchedKind::FirstSessionUnmatched, 0, 3),
            (UnmatchedKind::CrossSessionUnmatched, 2, 7),
        ]
    );
    assert_eq!(linkage.first_session.len(), 2);
}

#[test]
fn broken_chain_never_resumes() {
    // Unit 1 drops out of session 3, then a different label picks up.
    let comparisons = vec![
        comparison(&[(1, 1)], &[0.1], &[], &[2]),
        comparison(&[(2, 4)], &[0.2], &[1], &[]),
        comparison(&[(4, 8)], &[0.3], &[], &[]),
    ];
    let linkage = link(&comparisons).expect("link");
    assert_eq!(
        chain_paths(&linkage),
        vec![vec![(0, 1, 1)], vec![(1, 2, 4), (2, 4, 8)]]
    );
    assert!(placeholders(&linkage).is_empty());
}

#[test]
fn unit_appearing_mid_sequence_starts_its_own_chain() {
    let comparisons = vec![
        comparison(&[(1, 1)], &[0.1], &[], &[9]),
        comparison(&[(1, 1), (9, 3)], &[0.1, 0.4], &[], &[]),
    ];
    let linkage = link(&comparisons).expect("link");
    let paths = chain_paths(&linkage);
    assert!(paths.contains(&vec![(1, 9, 3)]), "{paths:?}");
    assert!(paths.contains(&vec![(0, 1, 1), (1, 1, 1)]), "{paths:?}");
}

#[test]
fn unit_seen_in_one_middle_session_becomes_cross_session_placeholder() {
    let comparisons = vec![
        comparison(&[(1, 1)], &[0.1], &[], &[9]),
        comparison(&[(1, 2)], &[0.1], &[9], &[]),
    ];
    let linkage = link(&comparisons).expect("link");
    assert_eq!(
        placeholders(&linkage),
        vec![(UnmatchedKind::CrossSessionUnmatched, 1, 9)]
    );
    let (_, placeholder) = linkage.arena.placeholders().next().expect("placeholder");
    assert_eq!(placeholder.opened_by, Some(1));
}

#[test]
fn tail_placeholders_belong_to_last_session() {
    let comparisons = vec![comparison(&[(1, 1)], &[0.1], &[], &[4, 5])];
    let linkage = link(&comparisons).expect("link");
    assert_eq!(
        placeholders(&linkage),
        vec![
            (UnmatchedKind::CrossSessionUnmatched, 1, 4),
            (UnmatchedKind::CrossSessionUnmatched, 1, 5),
        ]
    );
}

#[test]
fn comparison_without_matches_links_to_placeholders_only() {
    let comparisons = vec![comparison(&[], &[], &[1, 2], &[3])];
    let linkage = link(&comparisons).expect("link");
    assert_eq!(linkage.arena.chains().count(), 0);
    assert_eq!(linkage.arena.placeholders().count(), 3);
}

#[test]
fn dropped_counterpart_is_inconsistent() {
    // Label 2 of session 2 is matched by comparison 0 but comparison 1 does
    // not mention it at all.
    let comparisons = vec![
        comparison(&[(1, 1), (2, 2)], &[0.1, 0.2], &[], &[]),
        comparison(&[(1, 5)], &[0.05], &[], &[]),
    ];
    assert_eq!(
        link(&comparisons),
        Err(ResolveError::MatchSetInconsistent {
            comparison: 1,
            side: Side::Earlier,
            label: label(2),
            reason: InconsistencyReason::AbsentFromAdjacentComparison,
        })
    );
}

#[test]
fn invalid_later_comparison_fails_before_linking() {
    let comparisons = vec![
        comparison(&[(1, 1)], &[0.1], &[], &[]),
        comparison(&[(1, 2)], &[0.1, 0.2], &[], &[]),
    ];
    assert!(matches!(
        link(&comparisons),
        Err(ResolveError::DistanceCountMismatch { comparison: 1, .. })
    ));
}

#[test]
fn lone_session_opens_one_placeholder_per_label() {
    let labels = [label(4), label(2)].into_iter().collect();
    let linkage = Linkage::lone_session(&labels);
    assert_eq!(linkage.session_count, 1);
    let got: Vec<_> = linkage
        .arena
        .iter()
        .map(|(_, g)| match g {
            Group::Unmatched(p) => (p.label.get(), p.opened_by),
            Group::Chain(_) => (0, None),
        })
        .collect();
    assert_eq!(got, vec![(2, None), (4, None)]);
}

#[test]
fn every_match_lands_in_exactly_one_chain() {
    let comparisons = vec![
        comparison(&[(1, 2), (2, 1), (3, 3)], &[0.3, 0.2, 0.1], &[], &[4]),
        comparison(&[(1, 1), (4, 2)], &[0.1, 0.1], &[2, 3], &[3]),
        comparison(&[(1, 9), (3, 8)], &[0.1, 0.7], &[2], &[]),
    ];
    let linkage = link(&comparisons).expect("link");
    let total_edges: usize = linkage
        .arena
        .chains()
        .map(|(_, c)| c.edges().len())
        .sum();
    let total_matches: usize = comparisons.iter().map(|c| c.matches.len()).sum();
    assert_eq!(total_edges, total_matches);
}
