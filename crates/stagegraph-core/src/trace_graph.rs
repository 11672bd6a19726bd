//! TraceGraph: a trace table paired with the graph built from it.
//!
//! The graph is built exactly once, when the [`TraceGraph`] is created, and
//! handed out by reference afterwards. Callers that need the nodes of a run
//! more than once hold on to a `TraceGraph` instead of rebuilding.

use crate::builder::GraphBuilder;
use crate::error::CoreError;
use crate::graph::{PipelineNode, StageGraph};
use crate::node::ExecutionNode;
use crate::trace::TraceTable;

/// An owned trace with its stage graph.
#[derive(Debug, Clone)]
pub struct TraceGraph {
    trace: TraceTable,
    graph: StageGraph,
}

impl TraceGraph {
    /// Builds the graph for `trace`.
    pub fn new(trace: TraceTable) -> Self {
        let graph = GraphBuilder::new(trace.rows()).build();
        TraceGraph { trace, graph }
    }

    /// Parses a JSON trace document and builds its graph.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        Ok(Self::new(TraceTable::from_json_str(json)?))
    }

    /// Returns the underlying trace.
    pub fn trace(&self) -> &TraceTable {
        &self.trace
    }

    /// Returns the graph built at construction.
    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    /// Per-vertex output, in first-encounter order.
    pub fn pipeline_nodes(&self) -> Vec<PipelineNode<'_>> {
        self.graph.pipeline_nodes()
    }

    /// Looks up the trace node behind a graph vertex.
    pub fn execution_node(&self, node: &PipelineNode<'_>) -> Result<&ExecutionNode, CoreError> {
        self.trace.node(node.id)
    }

    /// Checks the graph against the trace it was built from.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.graph.validate(&self.trace)
    }
}
