//! StageGraph: the immutable result of scanning one execution trace.
//!
//! A [`StageGraph`] holds two ordered tables keyed by [`NodeId`]:
//! - **Adjacency**: every stage and parallel branch seen in the trace, in
//!   first-encounter order, each with its ordered list of direct successors.
//! - **Error table**: the error payloads attributed to each node, in the order
//!   they were attributed. A node may hold the same payload more than once.
//!
//! Graphs are produced by [`GraphBuilder`](crate::builder::GraphBuilder) and
//! never mutated afterwards. Read-only accessors, the per-node
//! [`PipelineNode`] view, a petgraph export and an invariant check are
//! provided on top.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use smallvec::SmallVec;

use crate::error::CoreError;
use crate::id::NodeId;
use crate::node::{NodeKind, StepError};
use crate::trace::TraceTable;

/// Successor list of one vertex. Most stages have a single successor and
/// most branches fan into a single stage.
pub type Successors = SmallVec<[NodeId; 2]>;

/// A vertex of the stage graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    /// Whether this vertex is a stage or a parallel branch.
    pub kind: NodeKind,
    /// Direct successors in the order the edges were discovered.
    pub successors: Successors,
}

impl GraphNode {
    pub(crate) fn new(kind: NodeKind) -> Self {
        GraphNode {
            kind,
            successors: SmallVec::new(),
        }
    }
}

/// Stage/branch DAG plus its error table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageGraph {
    nodes: IndexMap<NodeId, GraphNode>,
    errors: IndexMap<NodeId, Vec<StepError>>,
}

impl StageGraph {
    /// Assembles a graph from already-accumulated tables.
    pub(crate) fn from_parts(
        nodes: IndexMap<NodeId, GraphNode>,
        errors: IndexMap<NodeId, Vec<StepError>>,
    ) -> Self {
        let graph = StageGraph { nodes, errors };

        #[cfg(debug_assertions)]
        graph.assert_consistency();

        graph
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the trace contained no stage or parallel branch.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `true` if `id` is a vertex.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Vertex ids in first-encounter order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Looks up a vertex.
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    /// Direct successors of `id`; empty for unknown ids and terminal vertices.
    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.successors.as_slice())
            .unwrap_or(&[])
    }

    /// Errors attributed to `id`; empty when none were.
    pub fn errors(&self, id: NodeId) -> &[StepError] {
        self.errors.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The full error table, in order of first attribution.
    pub fn error_table(&self) -> &IndexMap<NodeId, Vec<StepError>> {
        &self.errors
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.successors.len()).sum()
    }

    /// Vertices no edge points to, in first-encounter order.
    pub fn entry_nodes(&self) -> Vec<NodeId> {
        let targets: HashSet<NodeId> = self
            .nodes
            .values()
            .flat_map(|n| n.successors.iter().copied())
            .collect();
        self.node_ids().filter(|id| !targets.contains(id)).collect()
    }

    /// Vertices without successors, in first-encounter order.
    pub fn terminal_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.successors.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Derived views
    // -----------------------------------------------------------------------

    /// One [`PipelineNode`] per vertex, in first-encounter order.
    pub fn pipeline_nodes(&self) -> Vec<PipelineNode<'_>> {
        self.nodes
            .iter()
            .map(|(id, node)| {
                let errors = self.errors(*id);
                PipelineNode {
                    id: *id,
                    kind: node.kind,
                    successors: node.successors.as_slice(),
                    errors,
                    failed: !errors.is_empty(),
                }
            })
            .collect()
    }

    /// Exports the adjacency as a petgraph `DiGraph` whose node weights are
    /// the vertex ids. Node indices follow first-encounter order.
    pub fn to_petgraph(&self) -> DiGraph<NodeId, ()> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edge_count());
        let mut indices: HashMap<NodeId, NodeIndex> = HashMap::with_capacity(self.nodes.len());

        for id in self.nodes.keys() {
            indices.insert(*id, graph.add_node(*id));
        }
        for (id, node) in &self.nodes {
            for succ in &node.successors {
                if let Some(&to) = indices.get(succ) {
                    graph.add_edge(indices[id], to, ());
                }
            }
        }
        graph
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Checks the structural invariants against the trace the graph was built
    /// from: every successor is a vertex, the graph is acyclic, and every edge
    /// points strictly forward in trace order.
    pub fn validate(&self, trace: &TraceTable) -> Result<(), CoreError> {
        for (id, node) in &self.nodes {
            for succ in &node.successors {
                if !self.nodes.contains_key(succ) {
                    return Err(CoreError::UnknownSuccessor {
                        node: *id,
                        successor: *succ,
                    });
                }
            }
        }

        let graph = self.to_petgraph();
        if let Err(cycle) = toposort(&graph, None) {
            return Err(CoreError::Cycle {
                node: graph[cycle.node_id()],
            });
        }

        for (id, node) in &self.nodes {
            let from = trace
                .position_of(*id)
                .ok_or(CoreError::NodeNotFound { id: *id })?;
            for succ in &node.successors {
                let to = trace
                    .position_of(*succ)
                    .ok_or(CoreError::NodeNotFound { id: *succ })?;
                if to <= from {
                    return Err(CoreError::BackwardEdge {
                        from: *id,
                        to: *succ,
                    });
                }
            }
        }

        Ok(())
    }

    #[cfg(debug_assertions)]
    fn assert_consistency(&self) {
        for (id, node) in &self.nodes {
            assert!(
                node.kind.is_acceptable(),
                "Vertex {:?} is neither a stage nor a parallel branch",
                id
            );
            for succ in &node.successors {
                assert!(
                    self.nodes.contains_key(succ),
                    "Vertex {:?} lists successor {:?} which has no adjacency entry",
                    id,
                    succ
                );
            }
        }
    }
}

/// Per-vertex output handed to the node model: identity, kind, ordered
/// successors and attributed errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineNode<'g> {
    pub id: NodeId,
    pub kind: NodeKind,
    pub successors: &'g [NodeId],
    pub errors: &'g [StepError],
    /// `true` when at least one error was attributed to this vertex.
    pub failed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ExecutionNode;
    use smallvec::smallvec;

    fn vertex(kind: NodeKind, successors: &[u32]) -> GraphNode {
        GraphNode {
            kind,
            successors: successors.iter().map(|&s| NodeId(s)).collect(),
        }
    }

    /// stage 1 -> {branch 2, branch 3} -> stage 4
    fn diamond() -> StageGraph {
        let mut nodes = IndexMap::new();
        nodes.insert(NodeId(1), vertex(NodeKind::Stage, &[2, 3]));
        nodes.insert(NodeId(2), vertex(NodeKind::ParallelBranch, &[4]));
        nodes.insert(NodeId(3), vertex(NodeKind::ParallelBranch, &[4]));
        nodes.insert(NodeId(4), vertex(NodeKind::Stage, &[]));

        let mut errors = IndexMap::new();
        errors.insert(NodeId(3), vec![StepError::new("boom")]);

        StageGraph::from_parts(nodes, errors)
    }

    fn diamond_trace() -> TraceTable {
        TraceTable::from_nodes(vec![
            ExecutionNode::stage(NodeId(1), "a"),
            ExecutionNode::branch(NodeId(2), "p", "x"),
            ExecutionNode::branch(NodeId(3), "p", "y"),
            ExecutionNode::stage(NodeId(4), "b"),
        ])
        .unwrap()
    }

    #[test]
    fn accessors_report_adjacency() {
        let graph = diamond();
        assert_eq!(graph.len(), 4);
        assert!(!graph.is_empty());
        assert!(graph.contains(NodeId(2)));
        assert!(!graph.contains(NodeId(9)));
        assert_eq!(graph.successors(NodeId(1)), &[NodeId(2), NodeId(3)]);
        assert_eq!(graph.successors(NodeId(9)), &[] as &[NodeId]);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.node(NodeId(4)).unwrap().kind, NodeKind::Stage);
    }

    #[test]
    fn entry_and_terminal_nodes() {
        let graph = diamond();
        assert_eq!(graph.entry_nodes(), vec![NodeId(1)]);
        assert_eq!(graph.terminal_nodes(), vec![NodeId(4)]);
    }

    #[test]
    fn pipeline_nodes_follow_key_order() {
        let graph = diamond();
        let nodes = graph.pipeline_nodes();
        let ids: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![NodeId(1), NodeId(2), NodeId(3), NodeId(4)]);

        assert!(!nodes[0].failed);
        assert!(nodes[2].failed);
        assert_eq!(nodes[2].errors, &[StepError::new("boom")]);
        assert_eq!(nodes[1].successors, &[NodeId(4)]);
    }

    #[test]
    fn pipeline_node_serializes() {
        let graph = diamond();
        let value = serde_json::to_value(&graph.pipeline_nodes()[2]).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": 3,
                "kind": "parallel_branch",
                "successors": [4],
                "errors": [{"message": "boom"}],
                "failed": true
            })
        );
    }

    #[test]
    fn petgraph_export_matches_adjacency() {
        let graph = diamond();
        let pg = graph.to_petgraph();
        assert_eq!(pg.node_count(), 4);
        assert_eq!(pg.edge_count(), 4);
        assert_eq!(pg[NodeIndex::new(0)], NodeId(1));
        assert!(toposort(&pg, None).is_ok());
    }

    #[test]
    fn validate_accepts_diamond() {
        diamond().validate(&diamond_trace()).unwrap();
    }

    #[test]
    fn validate_rejects_backward_edge() {
        let mut nodes = IndexMap::new();
        nodes.insert(NodeId(4), vertex(NodeKind::Stage, &[1]));
        nodes.insert(NodeId(1), vertex(NodeKind::Stage, &[]));
        let graph = StageGraph::from_parts(nodes, IndexMap::new());

        match graph.validate(&diamond_trace()) {
            Err(CoreError::BackwardEdge { from, to }) => {
                assert_eq!(from, NodeId(4));
                assert_eq!(to, NodeId(1));
            }
            other => panic!("expected BackwardEdge, got {:?}", other),
        }
    }

    #[test]
    fn validate_rejects_cycle() {
        let mut nodes = IndexMap::new();
        nodes.insert(NodeId(1), vertex(NodeKind::Stage, &[4]));
        nodes.insert(NodeId(4), vertex(NodeKind::Stage, &[1]));
        let graph = StageGraph::from_parts(nodes, IndexMap::new());

        assert!(matches!(
            graph.validate(&diamond_trace()),
            Err(CoreError::Cycle { .. })
        ));
    }

    #[test]
    fn validate_rejects_vertex_missing_from_trace() {
        let mut nodes = IndexMap::new();
        nodes.insert(NodeId(1), GraphNode {
            kind: NodeKind::Stage,
            successors: smallvec![NodeId(7)],
        });
        nodes.insert(NodeId(7), vertex(NodeKind::Stage, &[]));
        let graph = StageGraph::from_parts(nodes, IndexMap::new());

        assert!(matches!(
            graph.validate(&diamond_trace()),
            Err(CoreError::NodeNotFound { id }) if id == NodeId(7)
        ));
    }

    #[test]
    fn graph_can_be_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StageGraph>();

        let graph = std::sync::Arc::new(diamond());
        let reader = std::sync::Arc::clone(&graph);
        let edges = std::thread::spawn(move || reader.edge_count()).join().unwrap();
        assert_eq!(edges, graph.edge_count());
    }

    #[test]
    fn empty_graph_is_valid() {
        let graph = StageGraph::default();
        assert!(graph.is_empty());
        assert!(graph.entry_nodes().is_empty());
        assert!(graph.pipeline_nodes().is_empty());
        graph.validate(&TraceTable::default()).unwrap();
    }
}
