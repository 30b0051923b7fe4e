//! Identity assignment: ranking chains and producing remap tables.
//!
//! Given a subject's finished [`Linkage`], this module:
//!
//! 1. Ranks every chain by the mean of its match distances (ascending).
//!    Ties break on the chain's first comparison index, then the later label
//!    of its first match, then the earlier label of its first match.
//! 2. Assigns identities `1..=M` in rank order and writes each chain's
//!    identity into both sessions of every one of its matches.
//! 3. Queues one [`PendingPatch`] per chain that starts after the first
//!    comparison: the earlier label of its first match lives in a session
//!    whose table was produced as the later side of the previous comparison.
//!    Patches are applied in one pass before any table is returned, and a
//!    patch may fire once per chain root and never overwrite an entry.
//! 4. Numbers placeholders after every matched identity, in two ordered
//!    blocks chosen by [`UnmatchedOrder`] and spaced by
//!    [`UnmatchedNumbering`].
//!
//! [`assign_identities`] is a pure function of its inputs.
use std::collections::HashSet;

use serde::Serialize;

use crate::chain::{
    EquivalenceGroup, Group, GroupArena, GroupId, UnmatchedKind, UnmatchedPlaceholder,
};
use crate::error::{ResolveError, ResolveWarning};
use crate::linker::Linkage;
use crate::newtypes::{GlobalId, LocalLabel};
use crate::remap::RemapTable;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Order of the two placeholder blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmatchedOrder {
    /// First-session placeholders, then cross-session ones by session.
    #[default]
    SessionOrder,
    /// Cross-session placeholders first, then first-session ones.
    CrossSessionFirst,
}

/// Spacing of placeholder identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmatchedNumbering {
    /// Dense: `M + 1`, `M + 2`, ...
    #[default]
    Sequential,
    /// Starts from `M + 1` (left unused) and grows by `i + 1` at the `i`-th
    /// placeholder of each block, as older output files did.
    LegacyEscalating,
}

/// Configuration for [`assign_identities`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssignConfig {
    /// Placeholder block order.
    ///
    /// Default: [`UnmatchedOrder::SessionOrder`].
    pub unmatched_order: UnmatchedOrder,
    /// Placeholder spacing.
    ///
    /// Default: [`UnmatchedNumbering::Sequential`].
    pub unmatched_numbering: UnmatchedNumbering,
}

impl AssignConfig {
    /// Legacy block order and escalating spacing.
    ///
    /// Placeholders still land in the table of the session their label
    /// belongs to, and are numbered even when no chain matched, so output
    /// can differ from legacy files in those two cases.
    pub fn legacy() -> Self {
        Self {
            unmatched_order: UnmatchedOrder::CrossSessionFirst,
            unmatched_numbering: UnmatchedNumbering::LegacyEscalating,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A chain with its rank-derived identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedChain {
    /// The chain.
    pub group: GroupId,
    /// Identity assigned from its rank.
    pub identity: GlobalId,
    /// Mean match distance used for ranking.
    pub mean_distance: f64,
}

/// A placeholder with its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NumberedPlaceholder {
    /// The placeholder.
    pub group: GroupId,
    /// Identity assigned after every matched one.
    pub identity: GlobalId,
}

/// A deferred write into a table produced by an earlier comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingPatch {
    /// Chain whose root the patch belongs to.
    pub group: GroupId,
    /// Session position whose table is patched.
    pub session: usize,
    /// Label receiving the identity.
    pub label: LocalLabel,
    /// Identity written.
    pub identity: GlobalId,
}

/// The finished identities of one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// One table per session position.
    pub tables: Vec<RemapTable>,
    /// Chains in rank order.
    pub ranked: Vec<RankedChain>,
    /// Placeholders in numbering order.
    pub unmatched: Vec<NumberedPlaceholder>,
    /// Patches that were applied to earlier tables.
    pub patches: Vec<PendingPatch>,
    /// Non-fatal observations.
    pub warnings: Vec<ResolveWarning>,
}

impl Assignment {
    /// Number of matched identities (`M`).
    pub fn matched_count(&self) -> usize {
        self.ranked.len()
    }

    /// Identity given to `group`.
    pub fn identity_of(&self, group: GroupId) -> Option<GlobalId> {
        self.ranked
            .iter()
            .find(|r| r.group == group)
            .map(|r| r.identity)
            .or_else(|| {
                self.unmatched
                    .iter()
                    .find(|p| p.group == group)
                    .map(|p| p.identity)
            })
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Assigns global identities for one subject.
///
/// # Errors
///
/// - [`ResolveError::ConflictingAssignment`] if two writes disagree on a
///   label, or a patch targets an entry that already exists. Both indicate a
///   defect upstream, not bad input.
/// - [`ResolveError::IdentityOverflow`] if identities exceed `u32`.
pub fn assign_identities(
    linkage: &Linkage,
    config: &AssignConfig,
) -> Result<Assignment, ResolveError> {
    let mut tables = vec![RemapTable::new(); linkage.session_count];
    let mut warnings = Vec::new();

    let ranking = rank_chains(&linkage.arena);
    let mut ranked = Vec::with_capacity(ranking.len());
    let mut patches = Vec::new();

    for (rank, &(group, mean_distance)) in ranking.iter().enumerate() {
        let identity = nth_identity(rank as u64)?;
        ranked.push(RankedChain {
            group,
            identity,
            mean_distance,
        });

        let Some(chain) = linkage.arena.chain(group) else {
            continue;
        };
        for (j, edge) in chain.edges().iter().enumerate() {
            if j == 0 && edge.comparison > 0 {
                patches.push(PendingPatch {
                    group,
                    session: edge.comparison,
                    label: edge.earlier,
                    identity,
                });
            } else {
                record(&mut tables, edge.comparison, edge.earlier, identity)?;
            }
            record(&mut tables, edge.comparison + 1, edge.later, identity)?;
        }
    }

    apply_patches(&mut tables, &patches)?;

    let unmatched = number_placeholders(&linkage.arena, ranked.len(), config)?;
    for numbered in &unmatched {
        if let Some(placeholder) = placeholder(&linkage.arena, numbered.group) {
            record(
                &mut tables,
                placeholder.session,
                placeholder.label,
                numbered.identity,
            )?;
        }
    }

    if ranked.is_empty() && !linkage.mappings.is_empty() {
        tracing::debug!(
            placeholders = unmatched.len(),
            "no chain recorded a distance; numbering unmatched units only"
        );
        warnings.push(ResolveWarning::EmptyDistancePool);
    }

    Ok(Assignment {
        tables,
        ranked,
        unmatched,
        patches,
        warnings,
    })
}

/// Chains with at least one distance, best (smallest mean) first.
pub fn rank_chains(arena: &GroupArena) -> Vec<(GroupId, f64)> {
    let mut ranking: Vec<(GroupId, f64)> = arena
        .chains()
        .filter(|(_, chain)| !chain.edges().is_empty())
        .map(|(id, chain)| (id, chain.mean_distance()))
        .collect();

    ranking.sort_by(|&(id_a, mean_a), &(id_b, mean_b)| {
        let key = |id: GroupId| {
            arena
                .chain(id)
                .and_then(EquivalenceGroup::first_edge)
                .map(|e| (e.comparison, e.later, e.earlier))
        };
        mean_a
            .total_cmp(&mean_b)
            .then_with(|| key(id_a).cmp(&key(id_b)))
            .then_with(|| id_a.cmp(&id_b))
    });
    ranking
}

fn placeholder(arena: &GroupArena, group: GroupId) -> Option<&UnmatchedPlaceholder> {
    match arena.get(group) {
        Some(Group::Unmatched(p)) => Some(p),
        Some(Group::Chain(_)) | None => None,
    }
}

/// Identity for zero-based position `n`.
fn nth_identity(n: u64) -> Result<GlobalId, ResolveError> {
    u32::try_from(n)
        .ok()
        .and_then(|n| GlobalId::FIRST.offset(n))
        .ok_or(ResolveError::IdentityOverflow)
}

fn record(
    tables: &mut [RemapTable],
    session: usize,
    label: LocalLabel,
    identity: GlobalId,
) -> Result<(), ResolveError> {
    tables[session]
        .record(label, identity)
        .map_err(|existing| ResolveError::ConflictingAssignment {
            session,
            label,
            existing,
            incoming: identity,
        })
}

fn apply_patches(tables: &mut [RemapTable], patches: &[PendingPatch]) -> Result<(), ResolveError> {
    let mut fired: HashSet<GroupId> = HashSet::with_capacity(patches.len());
    for patch in patches {
        let table = &tables[patch.session];
        let existing = table.get(patch.label);
        if !fired.insert(patch.group) || existing.is_some() {
            return Err(ResolveError::ConflictingAssignment {
                session: patch.session,
                label: patch.label,
                existing: existing.unwrap_or(patch.identity),
                incoming: patch.identity,
            });
        }
        record(tables, patch.session, patch.label, patch.identity)?;
        tracing::debug!(
            session = patch.session,
            label = %patch.label,
            identity = %patch.identity,
            "patched chain root into earlier table"
        );
    }
    Ok(())
}

fn number_placeholders(
    arena: &GroupArena,
    matched: usize,
    config: &AssignConfig,
) -> Result<Vec<NumberedPlaceholder>, ResolveError> {
    let block = |kind: UnmatchedKind| -> Vec<(GroupId, usize)> {
        let mut ids: Vec<(GroupId, usize)> = arena
            .placeholders()
            .filter(|(_, p)| p.kind == kind)
            .map(|(id, p)| (id, p.session))
            .collect();
        ids.sort_by_key(|&(id, session)| (session, id));
        ids
    };
    let first = block(UnmatchedKind::FirstSessionUnmatched);
    let cross = block(UnmatchedKind::CrossSessionUnmatched);
    let blocks = match config.unmatched_order {
        UnmatchedOrder::SessionOrder => [first, cross],
        UnmatchedOrder::CrossSessionFirst => [cross, first],
    };

    let matched = matched as u64;
    let mut numbered = Vec::new();
    match config.unmatched_numbering {
        UnmatchedNumbering::Sequential => {
            let mut next = matched;
            for (group, _) in blocks.iter().flatten() {
                numbered.push(NumberedPlaceholder {
                    group: *group,
                    identity: nth_identity(next)?,
                });
                next += 1;
            }
        }
        UnmatchedNumbering::LegacyEscalating => {
            // Raw identity values: the gap id is M + 1.
            let mut max_id = matched + 1;
            for block in &blocks {
                for (i, (group, _)) in block.iter().enumerate() {
                    max_id += i as u64 + 1;
                    numbered.push(NumberedPlaceholder {
                        group: *group,
                        identity: nth_identity(max_id - 1)?,
                    });
                }
            }
        }
    }
    Ok(numbered)
}
