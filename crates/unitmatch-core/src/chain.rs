//! Equivalence groups and the per-comparison chain builder.
//!
//! Every inferred physical unit lives in a flat [`GroupArena`] and is
//! addressed by an opaque [`GroupId`]. A group is either a matched chain
//! ([`EquivalenceGroup`]) spanning a contiguous run of comparisons, or an
//! [`UnmatchedPlaceholder`] numbering a single label that never matched.
//!
//! The builder half of this module turns one [`Comparison`] into its
//! [`LocalMapping`] and, for the first comparison of a subject, seeds one
//! chain per match plus one placeholder per unmatched first-session label.
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::comparison::Comparison;
use crate::newtypes::LocalLabel;

// ---------------------------------------------------------------------------
// Identifiers and records
// ---------------------------------------------------------------------------

/// Opaque handle to a group in a [`GroupArena`].
///
/// Handles are issued in creation order, so comparing two handles compares
/// creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupId(usize);

impl GroupId {
    /// Position of the group in its arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One match of a chain: `earlier` in session `comparison` corresponds to
/// `later` in session `comparison + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChainEdge {
    /// Zero-based comparison index.
    pub comparison: usize,
    /// Label in the earlier session.
    pub earlier: LocalLabel,
    /// Label in the later session.
    pub later: LocalLabel,
    /// Comparator distance of the match.
    pub distance: f64,
}

/// A matched chain: one physical unit followed across adjacent sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct EquivalenceGroup {
    edges: Vec<ChainEdge>,
}

impl EquivalenceGroup {
    fn new(edge: ChainEdge) -> Self {
        Self { edges: vec![edge] }
    }

    /// Appends the continuation of this chain in the next comparison.
    ///
    /// Chains are contiguous: the new edge must belong to the comparison
    /// directly after the current tail and start from the tail's later label.
    fn extend(&mut self, edge: ChainEdge) {
        debug_assert!(
            self.edges
                .last()
                .is_some_and(|tail| tail.comparison + 1 == edge.comparison
                    && tail.later == edge.earlier),
            "chain extension must be contiguous"
        );
        self.edges.push(edge);
    }

    /// Matches in chain order.
    pub fn edges(&self) -> &[ChainEdge] {
        &self.edges
    }

    /// Match pairs in chain order.
    pub fn matches(&self) -> impl Iterator<Item = (LocalLabel, LocalLabel)> + '_ {
        self.edges.iter().map(|e| (e.earlier, e.later))
    }

    /// Distances in chain order.
    pub fn distances(&self) -> impl Iterator<Item = f64> + '_ {
        self.edges.iter().map(|e| e.distance)
    }

    /// Comparison indices spanned, ascending and contiguous.
    pub fn comparisons(&self) -> impl Iterator<Item = usize> + '_ {
        self.edges.iter().map(|e| e.comparison)
    }

    /// The first match of the chain.
    pub fn first_edge(&self) -> Option<&ChainEdge> {
        self.edges.first()
    }

    /// Arithmetic mean of the recorded distances.
    pub fn mean_distance(&self) -> f64 {
        let sum: f64 = self.distances().sum();
        sum / self.edges.len() as f64
    }

    /// Number of sessions the chain covers.
    pub fn session_span(&self) -> usize {
        self.edges.len() + 1
    }
}

/// Why an unmatched label got its own placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedKind {
    /// A label of the subject's first session that no comparison picked up.
    FirstSessionUnmatched,
    /// A label that appeared after the first session and never started a
    /// chain, including labels left over in the last session.
    CrossSessionUnmatched,
}

/// A unit observed in exactly one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnmatchedPlaceholder {
    /// Placeholder category.
    pub kind: UnmatchedKind,
    /// Zero-based session position within the subject.
    pub session: usize,
    /// The label being numbered.
    pub label: LocalLabel,
    /// Comparison that opened the placeholder; `None` for a lone session.
    pub opened_by: Option<usize>,
}

/// An arena record.
#[derive(Debug, Clone, PartialEq)]
pub enum Group {
    /// A matched chain.
    Chain(EquivalenceGroup),
    /// A label with no matches.
    Unmatched(UnmatchedPlaceholder),
}

// ---------------------------------------------------------------------------
// GroupArena
// ---------------------------------------------------------------------------

/// Flat storage for every group of one subject.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupArena {
    groups: Vec<Group>,
}

impl GroupArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new chain whose first match is `edge`.
    pub fn open_chain(&mut self, edge: ChainEdge) -> GroupId {
        self.push(Group::Chain(EquivalenceGroup::new(edge)))
    }

    /// Opens a new placeholder.
    pub fn open_placeholder(&mut self, placeholder: UnmatchedPlaceholder) -> GroupId {
        self.push(Group::Unmatched(placeholder))
    }

    fn push(&mut self, group: Group) -> GroupId {
        let id = GroupId(self.groups.len());
        self.groups.push(group);
        id
    }

    /// Extends the chain `id` with `edge`.
    ///
    /// Returns `false` without modifying anything when `id` is not a chain.
    pub fn extend_chain(&mut self, id: GroupId, edge: ChainEdge) -> bool {
        match self.groups.get_mut(id.0) {
            Some(Group::Chain(chain)) => {
                chain.extend(edge);
                true
            }
            Some(Group::Unmatched(_)) | None => false,
        }
    }

    /// Returns the group behind `id`.
    pub fn get(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id.0)
    }

    /// Returns the chain behind `id`, if it is one.
    pub fn chain(&self, id: GroupId) -> Option<&EquivalenceGroup> {
        match self.get(id) {
            Some(Group::Chain(chain)) => Some(chain),
            Some(Group::Unmatched(_)) | None => None,
        }
    }

    /// All groups in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &Group)> {
        self.groups.iter().enumerate().map(|(i, g)| (GroupId(i), g))
    }

    /// All chains in creation order.
    pub fn chains(&self) -> impl Iterator<Item = (GroupId, &EquivalenceGroup)> {
        self.iter().filter_map(|(id, g)| match g {
            Group::Chain(chain) => Some((id, chain)),
            Group::Unmatched(_) => None,
        })
    }

    /// All placeholders in creation order.
    pub fn placeholders(&self) -> impl Iterator<Item = (GroupId, &UnmatchedPlaceholder)> {
        self.iter().filter_map(|(id, g)| match g {
            Group::Unmatched(p) => Some((id, p)),
            Group::Chain(_) => None,
        })
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if the arena holds no group.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

// ---------------------------------------------------------------------------
// LocalMapping
// ---------------------------------------------------------------------------

/// The working map of one comparison: later label to earlier label.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMapping {
    comparison: usize,
    later_to_earlier: BTreeMap<LocalLabel, LocalLabel>,
    by_earlier: HashMap<LocalLabel, ChainEdge>,
}

impl LocalMapping {
    /// Builds the mapping for comparison `index`.
    ///
    /// The comparison must already be validated; with unique labels per side
    /// no entry is overwritten.
    pub fn from_comparison(comparison: &Comparison, index: usize) -> Self {
        let mut later_to_earlier = BTreeMap::new();
        let mut by_earlier = HashMap::with_capacity(comparison.matches.len());
        for (&(earlier, later), &distance) in
            comparison.matches.iter().zip(comparison.distances.iter())
        {
            later_to_earlier.insert(later, earlier);
            by_earlier.insert(
                earlier,
                ChainEdge {
                    comparison: index,
                    earlier,
                    later,
                    distance,
                },
            );
        }
        Self {
            comparison: index,
            later_to_earlier,
            by_earlier,
        }
    }

    /// Comparison index this mapping belongs to.
    pub fn comparison(&self) -> usize {
        self.comparison
    }

    /// Earlier label recorded for `later`.
    pub fn earlier_of(&self, later: LocalLabel) -> Option<LocalLabel> {
        self.later_to_earlier.get(&later).copied()
    }

    /// The match whose earlier label is `earlier`.
    pub fn edge_from(&self, earlier: LocalLabel) -> Option<ChainEdge> {
        self.by_earlier.get(&earlier).copied()
    }

    /// `(later, earlier)` entries ordered by later label.
    pub fn iter(&self) -> impl Iterator<Item = (LocalLabel, LocalLabel)> + '_ {
        self.later_to_earlier.iter().map(|(&l, &e)| (l, e))
    }

    /// Number of matches.
    pub fn len(&self) -> usize {
        self.later_to_earlier.len()
    }

    /// Returns `true` if the comparison matched nothing.
    pub fn is_empty(&self) -> bool {
        self.later_to_earlier.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Chain builder
// ---------------------------------------------------------------------------

/// Chains and placeholders opened by the first comparison of a subject.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootSeed {
    /// Provisional first-session table: each matched earlier label keyed by
    /// itself until identities exist.
    pub first_session: BTreeMap<LocalLabel, LocalLabel>,
    /// Chain opened for each later label of the first comparison.
    pub opened: BTreeMap<LocalLabel, GroupId>,
    /// Placeholders for first-session labels left unmatched.
    pub placeholders: Vec<GroupId>,
}

/// Output of the chain builder for one comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltComparison {
    /// The comparison's local mapping.
    pub mapping: LocalMapping,
    /// Seeds opened when this is the subject's first comparison.
    pub root: Option<RootSeed>,
}

/// Runs the chain builder on comparison `index`.
///
/// Comparison `0` is the chain-root case: its earlier session is the first
/// session of the subject, so every match opens a fresh chain and every
/// `unmatched_prev` label opens a [`UnmatchedKind::FirstSessionUnmatched`]
/// placeholder. Later comparisons only produce their mapping; their
/// unmatched labels are handled by the linker.
pub fn build_comparison(
    comparison: &Comparison,
    index: usize,
    arena: &mut GroupArena,
) -> BuiltComparison {
    let mapping = LocalMapping::from_comparison(comparison, index);
    let root = (index == 0).then(|| seed_root(comparison, &mapping, arena));
    BuiltComparison { mapping, root }
}

fn seed_root(comparison: &Comparison, mapping: &LocalMapping, arena: &mut GroupArena) -> RootSeed {
    let mut seed = RootSeed::default();

    for &(earlier, _) in &comparison.matches {
        let Some(edge) = mapping.edge_from(earlier) else {
            continue;
        };
        let id = arena.open_chain(edge);
        tracing::debug!(earlier = %edge.earlier, later = %edge.later, "opened root chain");
        seed.first_session.insert(earlier, earlier);
        seed.opened.insert(edge.later, id);
    }

    for &label in &comparison.unmatched_prev {
        let id = arena.open_placeholder(UnmatchedPlaceholder {
            kind: UnmatchedKind::FirstSessionUnmatched,
            session: 0,
            label,
            opened_by: Some(0),
        });
        seed.placeholders.push(id);
    }

    seed
}
