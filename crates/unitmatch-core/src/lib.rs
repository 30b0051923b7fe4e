#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod assign;
pub mod chain;
pub mod comparison;
pub mod error;
pub mod linker;
pub mod newtypes;
pub mod remap;
pub mod resolve;
pub mod study;

#[cfg(test)]
mod test_helpers;

pub use assign::{
    AssignConfig, Assignment, NumberedPlaceholder, PendingPatch, RankedChain, UnmatchedNumbering,
    UnmatchedOrder, assign_identities, rank_chains,
};
pub use chain::{
    ChainEdge, EquivalenceGroup, Group, GroupArena, GroupId, LocalMapping, UnmatchedKind,
    UnmatchedPlaceholder, build_comparison,
};
pub use comparison::{Comparison, check_adjacent, check_declared};
pub use error::{InconsistencyReason, ResolveError, ResolveWarning, RewriteError, Side};
pub use linker::{Linkage, link, validate_all};
pub use newtypes::{GlobalId, LocalLabel, NewtypeError, SessionId, SubjectId};
pub use remap::{RemapTable, rewrite_labels};
pub use resolve::{
    ChainSummary, InMemoryRewriter, LabelRewriter, PairwiseComparator, ResolveConfig, Session,
    SessionRemap, SessionRewrite, Subject, SubjectOutcome, SubjectResolution, UnmatchedSummary,
    ordered_sessions, resolve_and_rewrite, resolve_subject, rewrite_subject,
};
pub use study::{
    ComparisonRecord, PrecomputedComparator, StudyDocument, StudyError, StudyReport,
    SubjectRecord, parse_study, resolve_study,
};

/// Returns the current version of the unitmatch-core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
