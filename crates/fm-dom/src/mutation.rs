//! Mutation records
//!
//! The [`Document`](crate::Document) journals every insertion; the harness
//! drains the journal and delivers it to the engine in order, standing in for
//! the browser's MutationObserver callback. Only additions are recorded: the
//! filtering pipeline never reacts to removals, and attribute changes it
//! performs itself (hidden markers, filtered flags) must not feed back into
//! the observer.

/// One structural change: the nodes added by a single insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub added: Vec<crate::NodeId>,
}
