//! Core error types for stagegraph-core.
//!
//! The graph scan itself never fails. These variants cover loading a trace
//! table and checking a finished graph against its structural invariants.

use crate::id::NodeId;
use thiserror::Error;

/// Errors produced by the stagegraph-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Two rows of one trace carry the same node id.
    #[error("duplicate node in trace: NodeId({id})")]
    DuplicateNode { id: NodeId },

    /// A node id was not found in the trace or graph.
    #[error("node not found: NodeId({id})")]
    NodeNotFound { id: NodeId },

    /// A successor list references a node that has no adjacency entry.
    #[error("node {node} lists unknown successor {successor}")]
    UnknownSuccessor { node: NodeId, successor: NodeId },

    /// An edge points backwards (or sideways) in trace order.
    #[error("edge {from} -> {to} does not point forward in trace order")]
    BackwardEdge { from: NodeId, to: NodeId },

    /// The adjacency contains a cycle through the given node.
    #[error("graph contains a cycle through node {node}")]
    Cycle { node: NodeId },

    /// The trace document could not be parsed.
    #[error("trace parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The trace document could not be read.
    #[error("trace read error: {0}")]
    Io(#[from] std::io::Error),
}
