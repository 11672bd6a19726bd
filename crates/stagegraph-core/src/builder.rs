//! GraphBuilder: one forward scan from trace rows to a [`StageGraph`].
//!
//! The scan walks the rows in order, keeping only the most recent stage
//! (the *gating* stage) as state:
//!
//! - A stage is chained after the gating stage and becomes the new gating
//!   stage.
//! - A parallel branch opens a group. The group is extended by every branch
//!   up to the next stage; the gating stage fans out to each branch and each
//!   branch fans in to that next stage, which then becomes the gating stage.
//!   If the trace ends first, the branches stay terminal and there is no
//!   gating stage any more.
//!
//! Error attribution:
//!
//! - An erroring row seen by the outer scan is attributed to the gating stage.
//!   The first stage also keeps its own error, since nothing gates it.
//! - An erroring row seen while a group is open is attributed to the latest
//!   branch of the group *and* to the gating stage. A branch that carries an
//!   error is itself the latest branch. The branch that opened the group is
//!   seen by the outer scan, so its own error only reaches the gating stage.
//!
//! Rows consumed by a group scan are never revisited by the outer scan, so
//! the whole build is linear in the number of rows.

use indexmap::map::Entry;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::graph::{GraphNode, StageGraph};
use crate::id::NodeId;
use crate::node::{NodeKind, Row, StepError};

/// Builds a [`StageGraph`] from an ordered slice of trace rows.
///
/// The builder only borrows the rows. [`build`](Self::build) keeps its scan
/// state local to the call, so building twice yields identical graphs.
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder<'a> {
    rows: &'a [Row],
}

impl<'a> GraphBuilder<'a> {
    pub fn new(rows: &'a [Row]) -> Self {
        GraphBuilder { rows }
    }

    /// Runs the scan and returns the finished graph.
    pub fn build(&self) -> StageGraph {
        let mut scan = Scan::default();
        let mut i = 0;

        while i < self.rows.len() {
            let node = &self.rows[i].node;

            if let (Some(error), Some(prev)) = (&node.error, scan.previous_stage) {
                scan.attach_error(prev, error);
            }

            match node.kind() {
                NodeKind::Other => {}
                NodeKind::Stage => {
                    scan.ensure(node.id, NodeKind::Stage);
                    match scan.previous_stage {
                        None => {
                            if let Some(error) = &node.error {
                                scan.attach_error(node.id, error);
                            }
                        }
                        Some(prev) => scan.link(prev, node.id),
                    }
                    scan.previous_stage = Some(node.id);
                }
                NodeKind::ParallelBranch => {
                    i = scan.parallel_group(self.rows, i);
                }
            }

            i += 1;
        }

        let graph = scan.finish();
        tracing::debug!(
            rows = self.rows.len(),
            nodes = graph.len(),
            edges = graph.edge_count(),
            errored_nodes = graph.error_table().len(),
            "built stage graph"
        );
        graph
    }
}

/// Accumulator state for a single build.
#[derive(Default)]
struct Scan {
    nodes: IndexMap<NodeId, GraphNode>,
    errors: IndexMap<NodeId, Vec<StepError>>,
    previous_stage: Option<NodeId>,
}

impl Scan {
    fn ensure(&mut self, id: NodeId, kind: NodeKind) -> &mut GraphNode {
        self.nodes.entry(id).or_insert_with(|| GraphNode::new(kind))
    }

    /// Adds `to` as a successor of `from`. `from` must already be a vertex.
    fn link(&mut self, from: NodeId, to: NodeId) {
        if let Some(node) = self.nodes.get_mut(&from) {
            node.successors.push(to);
        }
    }

    fn attach_error(&mut self, id: NodeId, error: &StepError) {
        match self.errors.entry(id) {
            Entry::Occupied(mut e) => e.get_mut().push(error.clone()),
            Entry::Vacant(e) => {
                e.insert(vec![error.clone()]);
            }
        }
    }

    /// Consumes the parallel group opened at `start` and wires it between the
    /// gating stage and the next stage.
    ///
    /// Returns the index of the last row consumed: the closing stage, or the
    /// final row of the trace if no stage follows the group.
    fn parallel_group(&mut self, rows: &[Row], start: usize) -> usize {
        let first = &rows[start].node;
        let mut group: SmallVec<[NodeId; 4]> = SmallVec::new();
        group.push(first.id);
        let mut last_branch = first.id;
        let mut next_stage = None;
        let mut consumed = rows.len() - 1;

        for (j, row) in rows.iter().enumerate().skip(start + 1) {
            let node = &row.node;
            let kind = node.kind();

            if kind == NodeKind::ParallelBranch {
                group.push(node.id);
                last_branch = node.id;
            }

            if let Some(error) = &node.error {
                self.attach_error(last_branch, error);
                if let Some(prev) = self.previous_stage {
                    self.attach_error(prev, error);
                }
            }

            if kind == NodeKind::Stage {
                next_stage = Some(node.id);
                consumed = j;
                break;
            }
        }

        for &branch in &group {
            let entry = self.ensure(branch, NodeKind::ParallelBranch);
            if let Some(next) = next_stage {
                entry.successors.push(next);
            }
            if let Some(prev) = self.previous_stage {
                self.link(prev, branch);
            }
        }

        if let Some(next) = next_stage {
            self.ensure(next, NodeKind::Stage);
        }

        self.previous_stage = next_stage;
        consumed
    }

    fn finish(self) -> StageGraph {
        StageGraph::from_parts(self.nodes, self.errors)
    }
}
