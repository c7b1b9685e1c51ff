// SPDX-License-Identifier: MIT OR Apache-2.0
//! Plain serializable form of a graph.
//!
//! Cached results and injected values are transient and never stored.
//! Rebuilding a graph re-runs every structural check, so a hand-edited file
//! cannot smuggle in a cycle, an ill-typed link or a duplicate boundary name.

use crate::boundary::{GRAPH_INPUT, GRAPH_OUTPUT, SUBGRAPH};
use crate::catalog::Catalog;
use crate::connection::ConnectionId;
use crate::error::GraphError;
use crate::graph::Graph;
use crate::node::{Node, NodeId, NodeKind};
use crate::types::{Value, ValueType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Serialized graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    /// Nodes in insertion order
    pub nodes: Vec<NodeData>,
    /// Links in insertion order
    pub links: Vec<LinkData>,
}

/// Serialized node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Node id at the time of saving
    pub id: NodeId,
    /// Node type id
    pub node_type: String,
    /// Display title
    pub title: String,
    /// Editor position
    pub position: [f32; 2],
    /// Parameter values by name
    #[serde(default)]
    pub params: IndexMap<String, Value>,
    /// Name and type, for graph-input and graph-output nodes
    #[serde(default)]
    pub boundary: Option<BoundaryData>,
    /// Embedded graph, for nested-graph nodes
    #[serde(default)]
    pub subgraph: Option<Box<GraphData>>,
}

/// Exported name and type of a boundary node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryData {
    /// Exported name
    pub name: String,
    /// Exported type
    pub value_type: ValueType,
}

/// Serialized link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkData {
    /// Link id at the time of saving; files without one get a fresh id
    #[serde(default)]
    pub id: ConnectionId,
    /// Source node
    pub from_node: NodeId,
    /// Source output port
    pub from_port: String,
    /// Target node
    pub to_node: NodeId,
    /// Target input port
    pub to_port: String,
}

/// What node ids a rebuilt graph gets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPolicy {
    /// Keep the saved node and link ids (undo, reload of the same document)
    Preserve,
    /// Assign new node and link ids (import, paste)
    Fresh,
}

impl Graph {
    /// Capture the graph's structure and parameters
    pub fn to_data(&self) -> GraphData {
        let nodes = self.nodes().map(node_to_data).collect();
        let links = self
            .connections()
            .map(|c| LinkData {
                id: c.id,
                from_node: c.from_node,
                from_port: c.from_port.clone(),
                to_node: c.to_node,
                to_port: c.to_port.clone(),
            })
            .collect();
        GraphData { nodes, links }
    }

    /// Rebuild a graph against `catalog`.
    ///
    /// Every node starts dirty, so the next pass evaluates everything.
    pub fn from_data(
        data: &GraphData,
        catalog: Arc<Catalog>,
        ids: IdPolicy,
    ) -> Result<Self, GraphError> {
        let mut graph = Graph::new(Arc::clone(&catalog));
        let mut id_map: HashMap<NodeId, NodeId> = HashMap::with_capacity(data.nodes.len());

        for node_data in &data.nodes {
            if id_map.contains_key(&node_data.id) {
                return Err(invalid(format!("node id {} appears twice", node_data.id)));
            }

            let mut node = node_from_data(node_data, &catalog, ids)?;
            node.title = node_data.title.clone();
            node.position = node_data.position;
            if ids == IdPolicy::Preserve {
                node.id = node_data.id;
            }

            id_map.insert(node_data.id, node.id);
            graph.insert_node(node)?;
        }

        let mut link_ids = HashSet::with_capacity(data.links.len());
        for link in &data.links {
            if !link_ids.insert(link.id) {
                return Err(invalid(format!("link id {} appears twice", link.id)));
            }
            let from = lookup(&id_map, link.from_node)?;
            let to = lookup(&id_map, link.to_node)?;
            let id = match ids {
                IdPolicy::Preserve => link.id,
                IdPolicy::Fresh => ConnectionId::new(),
            };
            graph.insert_link(id, from, &link.from_port, to, &link.to_port)?;
        }

        Ok(graph)
    }
}

fn invalid(reason: String) -> GraphError {
    GraphError::InvalidGraphData { reason }
}

fn lookup(id_map: &HashMap<NodeId, NodeId>, id: NodeId) -> Result<NodeId, GraphError> {
    id_map
        .get(&id)
        .copied()
        .ok_or_else(|| invalid(format!("link refers to unknown node {id}")))
}

fn node_to_data(node: &Node) -> NodeData {
    let boundary = match node.kind() {
        NodeKind::GraphInput { name, .. } => node.outputs.first().map(|p| BoundaryData {
            name: name.clone(),
            value_type: p.value_type,
        }),
        NodeKind::GraphOutput { name, .. } => node.inputs.first().map(|p| BoundaryData {
            name: name.clone(),
            value_type: p.value_type,
        }),
        NodeKind::Operator(_) | NodeKind::Subgraph(_) => None,
    };

    NodeData {
        id: node.id,
        node_type: node.node_type.clone(),
        title: node.title.clone(),
        position: node.position,
        params: node
            .params()
            .map(|(name, p)| (name.to_string(), p.value))
            .collect(),
        boundary,
        subgraph: node.subgraph().map(|inner| Box::new(inner.to_data())),
    }
}

fn node_from_data(
    data: &NodeData,
    catalog: &Arc<Catalog>,
    ids: IdPolicy,
) -> Result<Node, GraphError> {
    match data.node_type.as_str() {
        GRAPH_INPUT => {
            let boundary = require_boundary(data)?;
            let default = data
                .params
                .get("default")
                .copied()
                .unwrap_or_else(|| catalog.types.default_of(boundary.value_type));
            Node::graph_input(&boundary.name, boundary.value_type, default, &catalog.types)
        }
        GRAPH_OUTPUT => {
            let boundary = require_boundary(data)?;
            Ok(Node::graph_output(&boundary.name, boundary.value_type))
        }
        SUBGRAPH => {
            let inner = data
                .subgraph
                .as_deref()
                .ok_or_else(|| invalid(format!("subgraph node {} has no graph", data.id)))?;
            let inner = Graph::from_data(inner, Arc::clone(catalog), ids)?;
            Node::wrap_graph(&data.title, inner)
        }
        type_id => {
            let mut node = catalog
                .nodes
                .create_node(type_id)
                .ok_or_else(|| GraphError::UnknownNodeType(type_id.to_string()))?;
            for (name, value) in &data.params {
                node.set_param(name, *value, &catalog.types)?;
            }
            Ok(node)
        }
    }
}

fn require_boundary(data: &NodeData) -> Result<&BoundaryData, GraphError> {
    data.boundary
        .as_ref()
        .ok_or_else(|| invalid(format!("boundary node {} has no name", data.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::Evaluator;

    fn sample() -> (Graph, NodeId) {
        let mut g = Graph::new(Catalog::shared());
        let a = g.add_node("scalar").unwrap();
        g.set_parameter(a, "value", Value::Scalar(2.5)).unwrap();
        g.set_position(a, [10.0, 20.0]).unwrap();
        let n = g.add_node("negate").unwrap();
        g.connect(a, "value", n, "a").unwrap();
        (g, n)
    }

    #[test]
    fn test_preserve_keeps_ids_and_values() {
        let (g, n) = sample();
        let data = g.to_data();
        let mut rebuilt = Graph::from_data(&data, Catalog::shared(), IdPolicy::Preserve).unwrap();

        assert_eq!(rebuilt.to_data(), data);
        let link = g.connections().next().unwrap().id;
        assert!(rebuilt.connection(link).is_some());
        Evaluator::with_seed(0).evaluate(&mut rebuilt).unwrap();
        assert_eq!(rebuilt.output_value(n, "result"), Some(Value::Scalar(-2.5)));
    }

    #[test]
    fn test_fresh_assigns_new_ids() {
        let (g, n) = sample();
        let rebuilt = Graph::from_data(&g.to_data(), Catalog::shared(), IdPolicy::Fresh).unwrap();

        assert!(rebuilt.node(n).is_none());
        assert_eq!(rebuilt.node_count(), 2);
        assert_eq!(rebuilt.connection_count(), 1);
        let link = g.connections().next().unwrap().id;
        assert!(rebuilt.connection(link).is_none());
    }

    #[test]
    fn test_json_shape_survives() {
        let (g, _) = sample();
        let json = serde_json::to_string(&g.to_data()).unwrap();
        let data: GraphData = serde_json::from_str(&json).unwrap();
        assert_eq!(data, g.to_data());
    }

    #[test]
    fn test_rejects_dangling_link() {
        let (g, _) = sample();
        let mut data = g.to_data();
        data.links[0].from_node = NodeId::new();

        assert!(matches!(
            Graph::from_data(&data, Catalog::shared(), IdPolicy::Preserve),
            Err(GraphError::InvalidGraphData { .. })
        ));
    }

    #[test]
    fn test_rejects_cycle_in_data() {
        let mut g = Graph::new(Catalog::shared());
        let a = g.add_node("negate").unwrap();
        let b = g.add_node("negate").unwrap();
        g.connect(a, "result", b, "a").unwrap();

        let mut data = g.to_data();
        data.links.push(LinkData {
            id: ConnectionId::new(),
            from_node: b,
            from_port: "result".to_string(),
            to_node: a,
            to_port: "a".to_string(),
        });
        assert!(matches!(
            Graph::from_data(&data, Catalog::shared(), IdPolicy::Preserve),
            Err(GraphError::CyclicGraph)
        ));
    }

    #[test]
    fn test_nested_graph_round_trips() {
        let mut inner = Graph::new(Catalog::shared());
        let x = inner.add_graph_input("x", ValueType::Integer, Value::Integer(7)).unwrap();
        let y = inner.add_graph_output("y", ValueType::Integer).unwrap();
        inner.connect(x, "value", y, "value").unwrap();

        let mut g = Graph::new(Catalog::shared());
        let wrapper = g.add_subgraph("Pass", inner).unwrap();
        let mut rebuilt =
            Graph::from_data(&g.to_data(), Catalog::shared(), IdPolicy::Preserve).unwrap();

        Evaluator::with_seed(0).evaluate(&mut rebuilt).unwrap();
        assert_eq!(rebuilt.output_value(wrapper, "y"), Some(Value::Integer(7)));
    }
}
