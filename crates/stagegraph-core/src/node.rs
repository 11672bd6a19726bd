//! Trace nodes and their classification.
//!
//! An [`ExecutionNode`] is one step record of a running process. It carries
//! raw markers (stage marker, parallel label, thread name) exactly as the trace
//! producer recorded them; [`classify`] folds those markers into a
//! [`NodeKind`], which is the only thing the graph scan looks at besides the
//! optional [`StepError`].

use serde::{Deserialize, Serialize};

use crate::id::NodeId;

// ---------------------------------------------------------------------------
// Error payload
// ---------------------------------------------------------------------------

/// Failure of the real-world step a trace row represents.
///
/// The graph treats this as opaque data: it is copied into the error table of
/// every node it is attributed to and never inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepError {
    /// Human-readable failure message.
    pub message: String,
    /// Producer-specific structured detail, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl StepError {
    /// Creates an error payload with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        StepError {
            message: message.into(),
            details: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Execution nodes
// ---------------------------------------------------------------------------

/// One step record of an execution trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionNode {
    /// Stable identity of this node within its trace.
    pub id: NodeId,
    /// Name shown for the node; empty when the producer did not supply one.
    #[serde(default)]
    pub display_name: String,
    /// Set when the step opens a top-level stage.
    #[serde(default)]
    pub stage_marker: bool,
    /// Label of the parallel group this step belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_label: Option<String>,
    /// Branch (thread) name within the parallel group, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_name: Option<String>,
    /// Failure carried by this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
}

impl ExecutionNode {
    /// Creates a plain step with no markers and no error.
    pub fn step(id: NodeId, display_name: impl Into<String>) -> Self {
        ExecutionNode {
            id,
            display_name: display_name.into(),
            stage_marker: false,
            parallel_label: None,
            thread_name: None,
            error: None,
        }
    }

    /// Creates a stage node.
    pub fn stage(id: NodeId, display_name: impl Into<String>) -> Self {
        ExecutionNode {
            stage_marker: true,
            ..Self::step(id, display_name)
        }
    }

    /// Creates a parallel branch node belonging to the group `label`.
    pub fn branch(id: NodeId, label: impl Into<String>, thread: impl Into<String>) -> Self {
        let thread = thread.into();
        ExecutionNode {
            parallel_label: Some(label.into()),
            thread_name: Some(thread.clone()),
            ..Self::step(id, thread)
        }
    }

    /// Attaches an error payload to this node.
    pub fn with_error(mut self, error: StepError) -> Self {
        self.error = Some(error);
        self
    }

    /// Returns the classification of this node.
    pub fn kind(&self) -> NodeKind {
        classify(self)
    }

    /// Returns `true` if this node opens a stage.
    pub fn is_stage(&self) -> bool {
        self.kind() == NodeKind::Stage
    }

    /// Returns `true` if this node is a branch of a parallel group.
    pub fn is_parallel_branch(&self) -> bool {
        self.kind() == NodeKind::ParallelBranch
    }

    /// Returns `true` if this node becomes a vertex of the stage graph.
    pub fn is_acceptable(&self) -> bool {
        self.kind().is_acceptable()
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// What role a trace node plays in the stage graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A top-level sequential unit of work.
    Stage,
    /// One branch of a labelled parallel group.
    ParallelBranch,
    /// Any other step; never becomes a graph vertex.
    Other,
}

impl NodeKind {
    /// Returns `true` for stages and parallel branches.
    pub fn is_acceptable(self) -> bool {
        !matches!(self, NodeKind::Other)
    }
}

/// Classifies a node from its raw markers.
///
/// A stage marker takes precedence: a malformed node carrying both a stage
/// marker and parallel markers is a stage. A parallel branch needs both a
/// group label and a thread name.
pub fn classify(node: &ExecutionNode) -> NodeKind {
    if node.stage_marker {
        NodeKind::Stage
    } else if node.parallel_label.is_some() && node.thread_name.is_some() {
        NodeKind::ParallelBranch
    } else {
        NodeKind::Other
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One position in an ordered trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Zero-based index of this row in the trace.
    pub position: usize,
    /// The step recorded at this position.
    pub node: ExecutionNode,
}

impl Row {
    pub fn new(position: usize, node: ExecutionNode) -> Self {
        Row { position, node }
    }
}
