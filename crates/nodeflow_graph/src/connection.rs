// SPDX-License-Identifier: MIT OR Apache-2.0
//! Links between an output port and an input port.
//!
//! A link id is stable across undo and reload of the same document; only
//! import assigns new ones.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable link handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// A fresh random link id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A directed link; the target input accepts no other link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Source node ID
    pub from_node: NodeId,
    /// Source output port
    pub from_port: String,
    /// Target node ID
    pub to_node: NodeId,
    /// Target input port
    pub to_port: String,
}

impl Connection {
    /// Link `from_node.from_port` to `to_node.to_port` under `id`
    pub fn new(
        id: ConnectionId,
        from_node: NodeId,
        from_port: impl Into<String>,
        to_node: NodeId,
        to_port: impl Into<String>,
    ) -> Self {
        Self {
            id,
            from_node,
            from_port: from_port.into(),
            to_node,
            to_port: to_port.into(),
        }
    }

    /// Whether either end sits on `node_id`
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }

    /// Whether this link feeds input `port` of `node_id`
    pub fn feeds(&self, node_id: NodeId, port: &str) -> bool {
        self.to_node == node_id && self.to_port == port
    }
}
