//! Error taxonomy
//!
//! Nothing here is fatal. Per-node classification errors are caught at node
//! granularity, logged, and the node is marked processed anyway so it is
//! never retried; store errors degrade to defaults or a silently failed
//! save.

use fm_dom::NodeId;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("node {0:?} is no longer attached to the document")]
    NodeDetached(NodeId),
    #[error(transparent)]
    Store(#[from] StoreError),
}
