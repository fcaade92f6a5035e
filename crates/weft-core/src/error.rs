//! Core error types for weft-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! the failure modes of the graph data model.

use crate::id::NodeId;
use thiserror::Error;

/// Core errors produced by the weft-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A node id was not found in the graph.
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    /// A node has no input edge at the requested slot.
    #[error("node {node} has no input at slot {slot}")]
    SlotNotFound { node: NodeId, slot: u16 },
}
