// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes, connections and cached results.

use crate::catalog::Catalog;
use crate::connection::{Connection, ConnectionId};
use crate::error::{GraphError, NodeError};
use crate::node::{Node, NodeId};
use crate::types::{TypeRegistry, Value};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of the last evaluation of one node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeResult {
    /// Every output port has a value
    Resolved(IndexMap<String, Value>),
    /// The node's outputs are undefined for the pass
    Undefined(NodeError),
}

impl NodeResult {
    /// Value of one output port, if resolved
    pub fn value(&self, port: &str) -> Option<Value> {
        match self {
            Self::Resolved(values) => values.get(port).copied(),
            Self::Undefined(_) => None,
        }
    }

    /// Whether the node resolved
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Why the node is undefined, if it is
    pub fn error(&self) -> Option<&NodeError> {
        match self {
            Self::Resolved(_) => None,
            Self::Undefined(err) => Some(err),
        }
    }
}

/// A graph instance: owned nodes, owned links and the last computed values
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) nodes: IndexMap<NodeId, Node>,
    pub(crate) connections: IndexMap<ConnectionId, Connection>,
    pub(crate) results: IndexMap<NodeId, NodeResult>,
    pub(crate) dirty: IndexSet<NodeId>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            results: IndexMap::new(),
            dirty: IndexSet::new(),
        }
    }

    /// The catalog this graph was built against
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The type rules links are checked against
    pub fn types(&self) -> &TypeRegistry {
        &self.catalog.types
    }

    /// Add a node of a catalog type
    pub fn add_node(&mut self, type_id: &str) -> Result<NodeId, GraphError> {
        let node = self
            .catalog
            .nodes
            .create_node(type_id)
            .ok_or_else(|| GraphError::UnknownNodeType(type_id.to_string()))?;
        self.insert_node(node)
    }

    pub(crate) fn insert_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        if let Some(name) = node.boundary_name() {
            if self.boundary_name_taken(name, None) {
                return Err(GraphError::DuplicateBoundaryName {
                    name: name.to_string(),
                });
            }
        }

        let id = node.id;
        tracing::debug!(node = %id, node_type = %node.node_type, "Added node");
        self.nodes.insert(id, node);
        self.mark_dirty(id);
        Ok(id)
    }

    /// Inputs and outputs share one namespace since both become wrapper port ids
    pub(crate) fn boundary_name_taken(&self, name: &str, except: Option<NodeId>) -> bool {
        self.nodes
            .values()
            .any(|n| Some(n.id) != except && n.boundary_name() == Some(name))
    }

    /// Remove a node and its connections
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let downstream: Vec<NodeId> = self
            .connections_from(node_id)
            .map(|c| c.to_node)
            .collect();

        // Remove connections involving this node
        self.connections.retain(|_, c| !c.involves_node(node_id));
        self.results.shift_remove(&node_id);
        self.dirty.shift_remove(&node_id);
        for id in downstream {
            self.mark_dirty(id);
        }

        let removed = self.nodes.shift_remove(&node_id);
        if removed.is_some() {
            tracing::debug!(node = %node_id, "Removed node");
        }
        removed
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    pub(crate) fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get all nodes, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Move a node in the editor
    pub fn set_position(&mut self, node_id: NodeId, position: [f32; 2]) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        node.position = position;
        Ok(())
    }

    /// Rename a node's display title
    pub fn set_title(&mut self, node_id: NodeId, title: impl Into<String>) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        node.title = title.into();
        Ok(())
    }

    /// Set a node parameter (e.g. a constant's literal)
    pub fn set_parameter(
        &mut self,
        node_id: NodeId,
        name: &str,
        value: Value,
    ) -> Result<(), GraphError> {
        let catalog = Arc::clone(&self.catalog);
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        node.set_param(name, value, &catalog.types)?;
        self.mark_dirty(node_id);
        tracing::debug!(node = %node_id, param = name, %value, "Set parameter");
        Ok(())
    }

    /// Add a link from an output port to an input port.
    ///
    /// A link already feeding the input is replaced. Fails without touching
    /// existing links when the types are incompatible or the link would close
    /// a cycle.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: &str,
        to_node: NodeId,
        to_port: &str,
    ) -> Result<ConnectionId, GraphError> {
        self.insert_link(ConnectionId::new(), from_node, from_port, to_node, to_port)
    }

    /// [`Graph::connect`] with a caller-chosen link id
    pub(crate) fn insert_link(
        &mut self,
        id: ConnectionId,
        from_node: NodeId,
        from_port: &str,
        to_node: NodeId,
        to_port: &str,
    ) -> Result<ConnectionId, GraphError> {
        // Validate nodes exist
        let source_node = self
            .nodes
            .get(&from_node)
            .ok_or(GraphError::NodeNotFound(from_node))?;
        let target_node = self
            .nodes
            .get(&to_node)
            .ok_or(GraphError::NodeNotFound(to_node))?;

        // Validate ports exist
        let source_port = source_node
            .output(from_port)
            .ok_or_else(|| GraphError::PortNotFound {
                node: from_node,
                port: from_port.to_string(),
            })?;
        let target_port = target_node
            .input(to_port)
            .ok_or_else(|| GraphError::PortNotFound {
                node: to_node,
                port: to_port.to_string(),
            })?;

        if !source_port.can_connect(target_port, self.types()) {
            return Err(GraphError::IncompatibleType {
                from: source_port.value_type,
                to: target_port.value_type,
            });
        }

        if from_node == to_node || self.reaches(to_node, from_node) {
            return Err(GraphError::CyclicGraph);
        }

        // An input accepts a single link
        let replaced: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.feeds(to_node, to_port))
            .map(|c| c.id)
            .collect();
        for id in replaced {
            self.connections.shift_remove(&id);
            tracing::debug!(link = ?id, "Replaced link");
        }

        let connection = Connection::new(id, from_node, from_port, to_node, to_port);
        self.connections.insert(id, connection);
        self.mark_dirty(to_node);
        tracing::debug!(from = %from_node, from_port, to = %to_node, to_port, "Connected");
        Ok(id)
    }

    /// Remove a connection
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Result<Connection, GraphError> {
        let connection = self
            .connections
            .shift_remove(&connection_id)
            .ok_or(GraphError::LinkNotFound(connection_id))?;
        self.mark_dirty(connection.to_node);
        tracing::debug!(link = ?connection_id, "Disconnected");
        Ok(connection)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get connections leaving a node
    pub fn connections_from(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.from_node == node_id)
    }

    /// Get connections entering a node
    pub fn connections_into(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.to_node == node_id)
    }

    /// The link feeding an input port, if any
    pub fn connection_to_port(&self, node_id: NodeId, port: &str) -> Option<&Connection> {
        self.connections.values().find(|c| c.feeds(node_id, port))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Whether `to` is reachable from `from` by following links
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if seen.insert(id) {
                stack.extend(self.connections_from(id).map(|c| c.to_node));
            }
        }
        false
    }

    /// Get nodes in topological order (for evaluation).
    ///
    /// Independent nodes keep their insertion order.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
        let mut visited = HashSet::new();
        let mut temp_mark = HashSet::new();
        let mut order = Vec::with_capacity(self.nodes.len());

        for node_id in self.nodes.keys() {
            if !visited.contains(node_id) {
                self.visit(*node_id, &mut visited, &mut temp_mark, &mut order)?;
            }
        }

        Ok(order)
    }

    fn visit(
        &self,
        node_id: NodeId,
        visited: &mut HashSet<NodeId>,
        temp_mark: &mut HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> Result<(), GraphError> {
        if temp_mark.contains(&node_id) {
            return Err(GraphError::CyclicGraph);
        }
        if visited.contains(&node_id) {
            return Ok(());
        }

        temp_mark.insert(node_id);

        // Visit all nodes that this node depends on
        for connection in self.connections_into(node_id) {
            self.visit(connection.from_node, visited, temp_mark, order)?;
        }

        temp_mark.remove(&node_id);
        visited.insert(node_id);
        order.push(node_id);

        Ok(())
    }

    /// Whether the links form a DAG
    pub fn is_acyclic(&self) -> bool {
        self.topological_order().is_ok()
    }

    /// Last evaluation outcome of a node
    pub fn node_result(&self, node_id: NodeId) -> Option<&NodeResult> {
        self.results.get(&node_id)
    }

    /// Last resolved value of an output port
    pub fn output_value(&self, node_id: NodeId, port: &str) -> Option<Value> {
        self.results.get(&node_id).and_then(|r| r.value(port))
    }

    /// Flag a node for re-evaluation
    pub fn mark_dirty(&mut self, node_id: NodeId) {
        self.dirty.insert(node_id);
    }

    /// Flag every node for re-evaluation
    pub fn mark_all_dirty(&mut self) {
        self.dirty.extend(self.nodes.keys().copied());
    }

    /// Whether any edit is waiting for a pass
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Consume the dirty set and close it over everything downstream.
    ///
    /// Volatile nodes and nodes that have never been evaluated are always
    /// included.
    pub(crate) fn take_stale(&mut self, order: &[NodeId]) -> HashSet<NodeId> {
        let dirty = std::mem::take(&mut self.dirty);
        let mut stale = HashSet::new();

        for &id in order {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let seeded =
                dirty.contains(&id) || node.is_volatile() || !self.results.contains_key(&id);
            if seeded || self.connections_into(id).any(|c| stale.contains(&c.from_node)) {
                stale.insert(id);
            }
        }

        stale
    }

    pub(crate) fn set_result(&mut self, node_id: NodeId, result: NodeResult) {
        self.results.insert(node_id, result);
    }
}
