//! Finished per-session remap tables and the label rewrite primitive.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RewriteError;
use crate::newtypes::{GlobalId, LocalLabel};

/// Final mapping from one session's local labels to global identities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemapTable {
    entries: BTreeMap<LocalLabel, GlobalId>,
}

impl RemapTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `label → identity`.
    ///
    /// Re-recording the same identity is a no-op. A different identity for a
    /// label already present is refused and the existing identity returned.
    pub(crate) fn record(&mut self, label: LocalLabel, identity: GlobalId) -> Result<(), GlobalId> {
        match self.entries.get(&label) {
            Some(&existing) if existing != identity => Err(existing),
            Some(_) => Ok(()),
            None => {
                self.entries.insert(label, identity);
                Ok(())
            }
        }
    }

    /// Returns the identity of `label`.
    pub fn get(&self, label: LocalLabel) -> Option<GlobalId> {
        self.entries.get(&label).copied()
    }

    /// Returns `true` if `label` has an identity.
    pub fn contains(&self, label: LocalLabel) -> bool {
        self.entries.contains_key(&label)
    }

    /// Entries ordered by local label.
    pub fn iter(&self) -> impl Iterator<Item = (LocalLabel, GlobalId)> + '_ {
        self.entries.iter().map(|(&l, &g)| (l, g))
    }

    /// Identities present in the table, ordered by local label.
    pub fn identities(&self) -> impl Iterator<Item = GlobalId> + '_ {
        self.entries.values().copied()
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(LocalLabel, GlobalId)> for RemapTable {
    fn from_iter<I: IntoIterator<Item = (LocalLabel, GlobalId)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Rewrites a per-event label array through `remap`.
///
/// # Errors
///
/// Returns [`RewriteError::KeyUnmapped`] for the first event whose label is
/// not a key of `remap` (including the noise label `0`). Nothing is returned
/// for a partially rewritten array.
pub fn rewrite_labels(events: &[u32], remap: &RemapTable) -> Result<Vec<GlobalId>, RewriteError> {
    events
        .iter()
        .enumerate()
        .map(|(position, &raw)| {
            LocalLabel::try_from(raw)
                .ok()
                .and_then(|label| remap.get(label))
                .ok_or(RewriteError::KeyUnmapped {
                    label: raw,
                    position,
                })
        })
        .collect()
}
