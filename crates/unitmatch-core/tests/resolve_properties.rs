//! Property-based tests for identity resolution.
//!
//! Generates subjects of 1-5 sessions with 1-6 labels each, joined by random
//! partial one-to-one matchings, and checks the resolved tables against the
//! matching itself: completeness, matched-before-unmatched ordering, chain
//! continuation between adjacent sessions, and determinism. Identities are
//! also cross-checked against the connected components of the match graph.
#![allow(clippy::expect_used)]

use std::collections::{BTreeMap, BTreeSet};

use petgraph::unionfind::UnionFind;
use proptest::prelude::*;
use unitmatch_core::{
    Comparison, ComparisonRecord, GlobalId, LocalLabel, PrecomputedComparator, ResolveConfig,
    Session, SessionId, Subject, SubjectId, SubjectResolution, resolve_subject,
};

fn label(n: u32) -> LocalLabel {
    LocalLabel::try_from(n).expect("positive label")
}

fn session_name(i: usize) -> SessionId {
    SessionId::try_from(format!("s{i}").as_str()).expect("valid SessionId")
}

/// A generated subject: label counts per session plus one comparison per
/// adjacent pair.
#[derive(Debug, Clone)]
struct Generated {
    counts: Vec<u32>,
    comparisons: Vec<Comparison>,
}

impl Generated {
    fn subject(&self) -> Subject {
        Subject {
            id: SubjectId::try_from("subject").expect("valid SubjectId"),
            sessions: self
                .counts
                .iter()
                .enumerate()
                .map(|(i, &n)| Session {
                    id: session_name(i),
                    sequence: i as u32,
                    labels: (1..=n).map(label).collect(),
                    events: (1..=n).collect(),
                })
                .collect(),
        }
    }

    fn comparator(&self) -> PrecomputedComparator {
        self.comparisons
            .iter()
            .enumerate()
            .map(|(k, c)| ComparisonRecord {
                earlier: session_name(k),
                later: session_name(k + 1),
                comparison: c.clone(),
            })
            .collect()
    }

    fn resolve(&self) -> SubjectResolution {
        resolve_subject(
            &self.subject(),
            &self.comparator(),
            &ResolveConfig::default(),
        )
        .expect("generated subjects are consistent")
    }
}

fn build_comparison(prev: &[u32], next: &[u32], k: u32, distances: &[f64]) -> Comparison {
    let k = k as usize;
    let sorted = |labels: &[u32]| -> Vec<LocalLabel> {
        let set: BTreeSet<u32> = labels.iter().copied().collect();
        set.into_iter().map(label).collect()
    };
    Comparison {
        matches: prev[..k]
            .iter()
            .zip(&next[..k])
            .map(|(&a, &b)| (label(a), label(b)))
            .collect(),
        distances: distances[..k].to_vec(),
        unmatched_prev: sorted(&prev[k..]),
        unmatched_curr: sorted(&next[k..]),
    }
}

fn arb_subject() -> impl Strategy<Value = Generated> {
    prop::collection::vec(1u32..=6, 1..=5)
        .prop_flat_map(|counts| {
            let pairs: Vec<_> = counts
                .windows(2)
                .map(|w| {
                    let (a, b) = (w[0], w[1]);
                    let m = a.min(b);
                    (
                        Just((1..=a).collect::<Vec<u32>>()).prop_shuffle(),
                        Just((1..=b).collect::<Vec<u32>>()).prop_shuffle(),
                        0..=m,
                        prop::collection::vec(0.0f64..1.0, m as usize),
                    )
                })
                .collect();
            (Just(counts), pairs)
        })
        .prop_map(|(counts, pairs)| Generated {
            counts,
            comparisons: pairs
                .iter()
                .map(|(prev, next, k, d)| build_comparison(prev, next, *k, d))
                .collect(),
        })
}

/// Session-ordered tables as plain maps.
fn tables(resolution: &SubjectResolution) -> Vec<BTreeMap<LocalLabel, GlobalId>> {
    resolution
        .sessions
        .iter()
        .map(|s| s.table.iter().collect())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every declared label gets exactly one identity, and identities are
    /// dense from 1.
    #[test]
    fn every_label_is_resolved(generated in arb_subject()) {
        let resolution = generated.resolve();
        let tables = tables(&resolution);
        prop_assert_eq!(tables.len(), generated.counts.len());

        let mut all = BTreeSet::new();
        for (table, &n) in tables.iter().zip(&generated.counts) {
            let keys: Vec<u32> = table.keys().map(|l| l.get()).collect();
            prop_assert_eq!(keys, (1..=n).collect::<Vec<u32>>());
            all.extend(table.values().map(|g| g.get()));
        }
        let expected: BTreeSet<u32> = (1..=all.len() as u32).collect();
        prop_assert_eq!(all, expected);
    }

    /// Matched identities are numerically below unmatched ones.
    #[test]
    fn matched_identities_come_first(generated in arb_subject()) {
        let resolution = generated.resolve();
        let max_matched = resolution.chains.iter().map(|c| c.identity).max();
        let min_unmatched = resolution.unmatched.iter().map(|u| u.identity).min();
        if let (Some(matched), Some(unmatched)) = (max_matched, min_unmatched) {
            prop_assert!(matched < unmatched);
        }
        let ranked: Vec<u32> = resolution.chains.iter().map(|c| c.identity.get()).collect();
        prop_assert_eq!(ranked, (1..=resolution.chains.len() as u32).collect::<Vec<u32>>());
    }

    /// Chains are ranked by ascending mean distance.
    #[test]
    fn chains_rank_by_mean_distance(generated in arb_subject()) {
        let resolution = generated.resolve();
        for pair in resolution.chains.windows(2) {
            prop_assert!(pair[0].mean_distance <= pair[1].mean_distance);
        }
    }

    /// Identities shared by adjacent sessions are exactly those carried by
    /// the comparison's matches.
    #[test]
    fn shared_identities_reproduce_matches(generated in arb_subject()) {
        let resolution = generated.resolve();
        let tables = tables(&resolution);
        for (k, comparison) in generated.comparisons.iter().enumerate() {
            let (earlier, later) = (&tables[k], &tables[k + 1]);
            let mut declared = BTreeSet::new();
            for (a, b) in &comparison.matches {
                let id = earlier.get(a).copied();
                prop_assert!(id.is_some());
                prop_assert_eq!(id, later.get(b).copied());
                declared.extend(id);
            }
            let earlier_ids: BTreeSet<GlobalId> = earlier.values().copied().collect();
            let shared: BTreeSet<GlobalId> = later
                .values()
                .copied()
                .filter(|g| earlier_ids.contains(g))
                .collect();
            prop_assert_eq!(shared, declared);
        }
    }

    /// Two labels share an identity exactly when the match graph connects
    /// them.
    #[test]
    fn identities_are_match_graph_components(generated in arb_subject()) {
        let resolution = generated.resolve();
        let tables = tables(&resolution);

        let mut index = BTreeMap::new();
        for (s, table) in tables.iter().enumerate() {
            for &l in table.keys() {
                let next = index.len();
                index.insert((s, l), next);
            }
        }
        let mut components = UnionFind::<usize>::new(index.len());
        for (k, comparison) in generated.comparisons.iter().enumerate() {
            for (a, b) in &comparison.matches {
                components.union(index[&(k, *a)], index[&(k + 1, *b)]);
            }
        }

        let nodes: Vec<((usize, LocalLabel), usize)> =
            index.iter().map(|(&key, &i)| (key, i)).collect();
        for &((s1, l1), i1) in &nodes {
            for &((s2, l2), i2) in &nodes {
                let same_component = components.equiv(i1, i2);
                let same_identity = tables[s1][&l1] == tables[s2][&l2];
                prop_assert_eq!(same_component, same_identity);
            }
        }
    }

    /// Resolving the same subject twice gives identical results.
    #[test]
    fn resolution_is_deterministic(generated in arb_subject()) {
        prop_assert_eq!(generated.resolve(), generated.resolve());
    }
}
