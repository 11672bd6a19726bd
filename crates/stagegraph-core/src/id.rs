//! Stable identity for trace nodes.
//!
//! A [`NodeId`] is assigned by whoever produces the trace table and is unique
//! within one trace. The graph uses it as the node identity everywhere, so two
//! rows are "the same node" exactly when their ids are equal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable node identifier within a single execution trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(raw: u32) -> Self {
        NodeId(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_display() {
        assert_eq!(format!("{}", NodeId(7)), "7");
    }

    #[test]
    fn node_id_serializes_as_bare_number() {
        let json = serde_json::to_string(&NodeId(42)).unwrap();
        assert_eq!(json, "42");

        let back: NodeId = serde_json::from_str("42").unwrap();
        assert_eq!(back, NodeId(42));
    }

    #[test]
    fn node_id_ordering_follows_inner_value() {
        assert!(NodeId(1) < NodeId(2));
        assert_eq!(NodeId::from(3), NodeId(3));
    }
}
