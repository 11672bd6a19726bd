//! Turns a flat, time-ordered execution trace into a stage DAG.
//!
//! Stages are chained in trace order; parallel branches fan out from the
//! preceding stage and fan back into the next one. Errors carried by trace
//! rows are attributed to the vertices where they should surface. See
//! [`builder`] for the scan itself.

pub mod builder;
pub mod error;
pub mod graph;
pub mod id;
pub mod node;
pub mod trace;
pub mod trace_graph;

// Re-export commonly used types
pub use builder::GraphBuilder;
pub use error::CoreError;
pub use graph::{GraphNode, PipelineNode, StageGraph, Successors};
pub use id::NodeId;
pub use node::{classify, ExecutionNode, NodeKind, Row, StepError};
pub use trace::TraceTable;
pub use trace_graph::TraceGraph;
