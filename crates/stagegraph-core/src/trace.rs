//! The ordered trace table consumed by the graph builder.
//!
//! A [`TraceTable`] is fully materialized before any graph is built: rows are
//! owned, positioned 0..n in trace order, and node ids are checked for
//! uniqueness on construction.
//!
//! The JSON form is either `{"rows": [node, ...]}` or a bare array of nodes,
//! where each node is an [`ExecutionNode`].

use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;

use crate::error::CoreError;
use crate::id::NodeId;
use crate::node::{ExecutionNode, Row};

/// An ordered, finite, already-materialized execution trace.
#[derive(Debug, Clone, Default)]
pub struct TraceTable {
    rows: Vec<Row>,
    positions: HashMap<NodeId, usize>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TraceDocument {
    Table { rows: Vec<ExecutionNode> },
    Bare(Vec<ExecutionNode>),
}

impl TraceTable {
    /// Builds a table from nodes in trace order, assigning positions 0..n.
    ///
    /// Fails with [`CoreError::DuplicateNode`] if two nodes share an id.
    pub fn from_nodes<I>(nodes: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = ExecutionNode>,
    {
        let mut rows = Vec::new();
        let mut positions = HashMap::new();

        for (position, node) in nodes.into_iter().enumerate() {
            if positions.insert(node.id, position).is_some() {
                return Err(CoreError::DuplicateNode { id: node.id });
            }
            rows.push(Row::new(position, node));
        }

        Ok(TraceTable { rows, positions })
    }

    /// Parses a trace document from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let doc: TraceDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    /// Parses a trace document from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CoreError> {
        let doc: TraceDocument = serde_json::from_reader(reader)?;
        Self::from_document(doc)
    }

    fn from_document(doc: TraceDocument) -> Result<Self, CoreError> {
        match doc {
            TraceDocument::Table { rows } | TraceDocument::Bare(rows) => Self::from_nodes(rows),
        }
    }

    /// Returns the rows in trace order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the trace has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the trace position of the node with the given id.
    pub fn position_of(&self, id: NodeId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Returns the node with the given id.
    pub fn node(&self, id: NodeId) -> Result<&ExecutionNode, CoreError> {
        self.position_of(id)
            .map(|pos| &self.rows[pos].node)
            .ok_or(CoreError::NodeNotFound { id })
    }
}
