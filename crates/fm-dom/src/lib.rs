//! FeedMute Document Model
//!
//! A lightweight stand-in for the host page's DOM: an arena of elements with
//! stable integer identifiers, a mutation journal that plays the role of the
//! browser's MutationObserver delivery, and a serde fixture format for
//! building pages in tests and the CLI harness.
//!
//! Node identifiers are never reused for the lifetime of a [`Document`], so
//! they can be held in processed-sets and work queues without keeping any
//! node "alive" or dangling when the page detaches a subtree.
//!
//! # Modules
//!
//! - `arena`: the node arena and structural/query operations
//! - `mutation`: mutation records and the journal drain
//! - `fixture`: serde page fixtures

pub mod arena;
pub mod fixture;
pub mod mutation;

pub use arena::{Document, Node, NodeId};
pub use fixture::{build_document, FixtureNode, PageFixture};
pub use mutation::MutationRecord;
