// SPDX-License-Identifier: MIT OR Apache-2.0
//! Nested-graph boundary.
//!
//! Graph-input and graph-output nodes define a graph's external contract.
//! A subgraph node embeds a whole graph and exposes exactly that contract as
//! its own ports: one optional input per graph-input, one output per
//! graph-output, both in declaration order and named after the boundary
//! nodes. Nothing else inside the embedded graph is visible to the parent.

use crate::error::{GraphError, NodeError};
use crate::evaluation::{self, PassEnv};
use crate::graph::Graph;
use crate::node::{InputRule, Node, NodeCategory, NodeId, NodeKind, Param};
use crate::operators::OperatorInputs;
use crate::port::Port;
use crate::types::{TypeRegistry, Value, ValueType};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Node type id of graph-input nodes
pub const GRAPH_INPUT: &str = "graph_input";
/// Node type id of graph-output nodes
pub const GRAPH_OUTPUT: &str = "graph_output";
/// Node type id of nested-graph nodes
pub const SUBGRAPH: &str = "subgraph";

/// One entry of a graph's external contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryPort {
    /// Boundary node carrying the name
    pub node: NodeId,
    /// Exported name
    pub name: String,
    /// Exported type
    pub value_type: ValueType,
}

fn boundary_node(node_type: &str, name: &str, kind: NodeKind) -> Node {
    Node {
        id: NodeId::new(),
        node_type: node_type.to_string(),
        title: name.to_string(),
        category: NodeCategory::Graph,
        position: [0.0, 0.0],
        inputs: Vec::new(),
        outputs: Vec::new(),
        params: IndexMap::new(),
        kind,
        input_rule: InputRule::AllRequired,
    }
}

impl Node {
    /// Create a graph-input node that outputs `default` unless a value is injected
    pub fn graph_input(
        name: &str,
        value_type: ValueType,
        default: Value,
        types: &TypeRegistry,
    ) -> Result<Self, GraphError> {
        let default = types.coerce(default, default.value_type(), value_type)?;
        let mut node = boundary_node(
            GRAPH_INPUT,
            name,
            NodeKind::GraphInput {
                name: name.to_string(),
                injected: None,
            },
        );
        node.outputs = vec![Port::output("value", value_type).with_label(name)];
        node.params.insert(
            "default".to_string(),
            Param {
                value_type,
                value: default,
            },
        );
        Ok(node)
    }

    /// Create a graph-output node that exports whatever reaches its input
    pub fn graph_output(name: &str, value_type: ValueType) -> Self {
        let mut node = boundary_node(
            GRAPH_OUTPUT,
            name,
            NodeKind::GraphOutput {
                name: name.to_string(),
                last_value: None,
            },
        );
        node.inputs = vec![Port::input("value", value_type).with_label(name)];
        node
    }

    /// Wrap a graph as a single node.
    ///
    /// Fails with `DuplicateBoundaryName` if the graph's boundary names
    /// collide.
    pub fn wrap_graph(title: &str, inner: Graph) -> Result<Self, GraphError> {
        let mut node = boundary_node(SUBGRAPH, title, NodeKind::Subgraph(Box::new(inner)));
        node.refresh_subgraph_ports()?;
        Ok(node)
    }

    /// Re-derive the wrapper's ports from the embedded graph's boundary
    pub(crate) fn refresh_subgraph_ports(&mut self) -> Result<(), GraphError> {
        let NodeKind::Subgraph(inner) = &self.kind else {
            return Err(GraphError::NotASubgraph(self.id));
        };

        let inputs = inner
            .boundary_inputs()?
            .into_iter()
            .map(|b| Port::input(b.name.clone(), b.value_type).with_label(b.name).optional())
            .collect();
        let outputs = inner
            .boundary_outputs()?
            .into_iter()
            .map(|b| Port::output(b.name.clone(), b.value_type).with_label(b.name))
            .collect();

        self.inputs = inputs;
        self.outputs = outputs;
        Ok(())
    }

    /// Value injected into a graph-input node, if any
    pub fn injected_value(&self) -> Option<Value> {
        match &self.kind {
            NodeKind::GraphInput { injected, .. } => *injected,
            _ => None,
        }
    }

    /// Value a graph-output node received in the last pass
    pub fn last_value(&self) -> Option<Value> {
        match &self.kind {
            NodeKind::GraphOutput { last_value, .. } => *last_value,
            _ => None,
        }
    }
}

fn collect_boundary(
    graph: &Graph,
    input_side: bool,
) -> Result<Vec<BoundaryPort>, GraphError> {
    let mut seen = HashSet::new();
    let mut ports = Vec::new();

    for node in graph.nodes() {
        let Some(name) = node.boundary_name() else {
            continue;
        };
        if !seen.insert(name) {
            return Err(GraphError::DuplicateBoundaryName {
                name: name.to_string(),
            });
        }
        if node.is_graph_input() != input_side {
            continue;
        }

        let port = if input_side {
            node.outputs.first()
        } else {
            node.inputs.first()
        };
        let value_type = port.map(|p| p.value_type).ok_or_else(|| GraphError::PortNotFound {
            node: node.id,
            port: "value".to_string(),
        })?;
        ports.push(BoundaryPort {
            node: node.id,
            name: name.to_string(),
            value_type,
        });
    }

    Ok(ports)
}

impl Graph {
    /// Add a graph-input node
    pub fn add_graph_input(
        &mut self,
        name: &str,
        value_type: ValueType,
        default: Value,
    ) -> Result<NodeId, GraphError> {
        let node = Node::graph_input(name, value_type, default, self.types())?;
        self.insert_node(node)
    }

    /// Add a graph-output node
    pub fn add_graph_output(
        &mut self,
        name: &str,
        value_type: ValueType,
    ) -> Result<NodeId, GraphError> {
        self.insert_node(Node::graph_output(name, value_type))
    }

    /// Embed `inner` as a single node
    pub fn add_subgraph(&mut self, title: &str, inner: Graph) -> Result<NodeId, GraphError> {
        let node = Node::wrap_graph(title, inner)?;
        tracing::debug!(
            title,
            inputs = node.inputs.len(),
            outputs = node.outputs.len(),
            "Embedded subgraph"
        );
        self.insert_node(node)
    }

    /// Graph-input names and types, in declaration order
    pub fn boundary_inputs(&self) -> Result<Vec<BoundaryPort>, GraphError> {
        collect_boundary(self, true)
    }

    /// Graph-output names and types, in declaration order
    pub fn boundary_outputs(&self) -> Result<Vec<BoundaryPort>, GraphError> {
        collect_boundary(self, false)
    }

    fn boundary_node_id(&self, input_side: bool, name: &str) -> Result<NodeId, GraphError> {
        self.nodes()
            .find(|n| n.is_graph_input() == input_side && n.boundary_name() == Some(name))
            .map(|n| n.id)
            .ok_or_else(|| GraphError::BoundaryNotFound {
                name: name.to_string(),
            })
    }

    /// Override a graph-input's value until cleared
    pub fn inject_input(&mut self, name: &str, value: Value) -> Result<(), GraphError> {
        let id = self.boundary_node_id(true, name)?;
        let catalog = self.catalog().clone();
        let node = self.node_mut(id).ok_or(GraphError::NodeNotFound(id))?;
        let value_type = node
            .outputs
            .first()
            .map(|p| p.value_type)
            .unwrap_or(value.value_type());
        let value = catalog.types.coerce(value, value.value_type(), value_type)?;
        if let NodeKind::GraphInput { injected, .. } = &mut node.kind {
            *injected = Some(value);
        }
        self.mark_dirty(id);
        tracing::debug!(name, %value, "Injected graph input");
        Ok(())
    }

    /// Drop an injected value so the graph-input falls back to its default
    pub fn clear_injection(&mut self, name: &str) -> Result<(), GraphError> {
        let id = self.boundary_node_id(true, name)?;
        if let Some(NodeKind::GraphInput { injected, .. }) = self.node_mut(id).map(|n| &mut n.kind) {
            *injected = None;
        }
        self.mark_dirty(id);
        Ok(())
    }

    /// Rename a graph-input or graph-output node
    pub fn rename_boundary(&mut self, node_id: NodeId, new_name: &str) -> Result<(), GraphError> {
        let node = self.node(node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        if node.boundary_name().is_none() {
            return Err(GraphError::NotABoundaryNode(node_id));
        }
        if self.boundary_name_taken(new_name, Some(node_id)) {
            return Err(GraphError::DuplicateBoundaryName {
                name: new_name.to_string(),
            });
        }

        if let Some(node) = self.node_mut(node_id) {
            node.title = new_name.to_string();
            match &mut node.kind {
                NodeKind::GraphInput { name, .. } | NodeKind::GraphOutput { name, .. } => {
                    *name = new_name.to_string();
                }
                _ => {}
            }
            for port in node.inputs.iter_mut().chain(node.outputs.iter_mut()) {
                port.label = new_name.to_string();
            }
        }
        self.mark_dirty(node_id);
        Ok(())
    }

    /// Value the named graph-output received in the last pass
    pub fn output_value_named(&self, name: &str) -> Option<Value> {
        self.boundary_node_id(false, name)
            .ok()
            .and_then(|id| self.node(id))
            .and_then(Node::last_value)
    }

    /// Edit the graph embedded in a subgraph node.
    ///
    /// The wrapper's ports are re-derived afterwards and parent links whose
    /// ports disappeared or changed type incompatibly are dropped. A failed
    /// edit leaves the embedded graph as it was.
    pub fn update_subgraph<T>(
        &mut self,
        node_id: NodeId,
        edit: impl FnOnce(&mut Graph) -> Result<T, GraphError>,
    ) -> Result<T, GraphError> {
        let node = self.node_mut(node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        let NodeKind::Subgraph(inner) = &mut node.kind else {
            return Err(GraphError::NotASubgraph(node_id));
        };
        let backup = (**inner).clone();
        let out = match edit(inner).and_then(|out| node.refresh_subgraph_ports().map(|()| out)) {
            Ok(out) => out,
            Err(err) => {
                node.kind = NodeKind::Subgraph(Box::new(backup));
                tracing::debug!(node = %node_id, error = %err, "Rolled back subgraph edit");
                return Err(err);
            }
        };

        let stale: Vec<_> = self
            .connections()
            .filter(|c| c.involves_node(node_id))
            .filter(|c| !self.link_still_valid(c.from_node, &c.from_port, c.to_node, &c.to_port))
            .map(|c| c.id)
            .collect();
        for id in stale {
            self.disconnect(id)?;
            tracing::debug!(link = ?id, "Dropped link to removed subgraph port");
        }

        self.mark_dirty(node_id);
        Ok(out)
    }

    fn link_still_valid(&self, from: NodeId, from_port: &str, to: NodeId, to_port: &str) -> bool {
        let source = self.node(from).and_then(|n| n.output(from_port));
        let target = self.node(to).and_then(|n| n.input(to_port));
        match (source, target) {
            (Some(s), Some(t)) => s.can_connect(t, self.types()),
            _ => false,
        }
    }
}

/// Evaluate an embedded graph with the wrapper's resolved inputs injected
pub(crate) fn evaluate_subgraph(
    inner: &mut Graph,
    inputs: &OperatorInputs<'_>,
    env: &mut PassEnv<'_>,
) -> Result<Vec<Value>, NodeError> {
    let mut saved = Vec::new();
    for node in inner.nodes.values_mut() {
        if let NodeKind::GraphInput { name, injected } = &mut node.kind {
            saved.push((node.id, *injected));
            *injected = inputs.value(name.as_str());
        }
    }

    inner.mark_all_dirty();
    let pass = evaluation::run_pass(inner, env);

    // Injection only lasts for this pass
    for (id, previous) in saved {
        if let Some(NodeKind::GraphInput { injected, .. }) = inner.node_mut(id).map(|n| &mut n.kind) {
            *injected = previous;
        }
    }
    pass.map_err(|err| NodeError::Subgraph(Box::new(err)))?;

    let outputs = inner
        .boundary_outputs()
        .map_err(|err| NodeError::Subgraph(Box::new(err)))?;
    outputs
        .into_iter()
        .map(|b| {
            inner
                .output_value_named(&b.name)
                .ok_or(NodeError::SubgraphOutputUndefined { name: b.name })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::evaluation::Evaluator;

    fn increment_graph() -> Graph {
        let mut g = Graph::new(Catalog::shared());
        let x = g.add_graph_input("x", ValueType::Scalar, Value::Scalar(0.0)).unwrap();
        let one = g.add_node("scalar").unwrap();
        g.set_parameter(one, "value", Value::Scalar(1.0)).unwrap();
        let add = g.add_node("add").unwrap();
        let y = g.add_graph_output("y", ValueType::Scalar).unwrap();
        g.connect(x, "value", add, "a").unwrap();
        g.connect(one, "value", add, "b").unwrap();
        g.connect(add, "result", y, "value").unwrap();
        g
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut g = Graph::new(Catalog::shared());
        g.add_graph_input("x", ValueType::Scalar, Value::Scalar(0.0)).unwrap();
        assert_eq!(
            g.add_graph_input("x", ValueType::Integer, Value::Integer(0)),
            Err(GraphError::DuplicateBoundaryName { name: "x".to_string() })
        );
        // An output may not reuse an input's name either
        assert_eq!(
            g.add_graph_output("x", ValueType::Scalar),
            Err(GraphError::DuplicateBoundaryName { name: "x".to_string() })
        );
        let y = g.add_graph_output("y", ValueType::Scalar).unwrap();
        assert!(matches!(
            g.rename_boundary(y, "x"),
            Err(GraphError::DuplicateBoundaryName { .. })
        ));
    }

    #[test]
    fn test_wrapper_ports_follow_boundary() {
        let inner = increment_graph();
        let node = Node::wrap_graph("Increment", inner).unwrap();

        assert_eq!(node.inputs.len(), 1);
        assert_eq!(node.inputs[0].id, "x");
        assert!(node.inputs[0].optional);
        assert_eq!(node.outputs.len(), 1);
        assert_eq!(node.outputs[0].id, "y");
    }

    #[test]
    fn test_unconnected_wrapper_input_uses_default() {
        let mut inner = increment_graph();
        let x = inner.boundary_inputs().unwrap()[0].node;
        inner.set_parameter(x, "default", Value::Scalar(10.0)).unwrap();

        let mut g = Graph::new(Catalog::shared());
        let wrapper = g.add_subgraph("Increment", inner).unwrap();
        Evaluator::with_seed(0).evaluate(&mut g).unwrap();

        assert_eq!(g.output_value(wrapper, "y"), Some(Value::Scalar(11.0)));
    }

    #[test]
    fn test_inject_and_clear() {
        let mut g = increment_graph();
        let mut evaluator = Evaluator::with_seed(0);

        g.inject_input("x", Value::Integer(5)).unwrap();
        evaluator.evaluate(&mut g).unwrap();
        assert_eq!(g.output_value_named("y"), Some(Value::Scalar(6.0)));

        g.clear_injection("x").unwrap();
        evaluator.evaluate(&mut g).unwrap();
        assert_eq!(g.output_value_named("y"), Some(Value::Scalar(1.0)));

        assert!(matches!(
            g.inject_input("missing", Value::Scalar(1.0)),
            Err(GraphError::BoundaryNotFound { .. })
        ));
    }

    #[test]
    fn test_rename_boundary_checks_collisions() {
        let mut g = Graph::new(Catalog::shared());
        let a = g.add_graph_input("a", ValueType::Scalar, Value::Scalar(0.0)).unwrap();
        g.add_graph_input("b", ValueType::Scalar, Value::Scalar(0.0)).unwrap();
        let c = g.add_node("scalar").unwrap();

        assert!(matches!(
            g.rename_boundary(a, "b"),
            Err(GraphError::DuplicateBoundaryName { .. })
        ));
        assert_eq!(g.rename_boundary(c, "z"), Err(GraphError::NotABoundaryNode(c)));
        g.rename_boundary(a, "alpha").unwrap();
        assert_eq!(g.boundary_inputs().unwrap()[0].name, "alpha");
    }

    #[test]
    fn test_update_subgraph_drops_stale_links() {
        let mut g = Graph::new(Catalog::shared());
        let source = g.add_node("scalar").unwrap();
        let wrapper = g.add_subgraph("Increment", increment_graph()).unwrap();
        g.connect(source, "value", wrapper, "x").unwrap();

        let x = g.node(wrapper).unwrap().subgraph().unwrap().boundary_inputs().unwrap()[0].node;
        g.update_subgraph(wrapper, |inner| inner.rename_boundary(x, "input")).unwrap();

        assert_eq!(g.node(wrapper).unwrap().inputs[0].id, "input");
        assert_eq!(g.connection_count(), 0);
    }

    #[test]
    fn test_failed_update_subgraph_rolls_back() {
        let mut g = Graph::new(Catalog::shared());
        let wrapper = g.add_subgraph("Increment", increment_graph()).unwrap();

        let failed = g.update_subgraph(wrapper, |inner| {
            inner.add_graph_output("z", ValueType::Scalar)?;
            inner.add_node("teleport")
        });
        assert_eq!(failed, Err(GraphError::UnknownNodeType("teleport".to_string())));

        let node = g.node(wrapper).unwrap();
        let names: Vec<_> = node
            .subgraph()
            .unwrap()
            .boundary_outputs()
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["y".to_string()]);
        assert_eq!(node.outputs.len(), 1);

        Evaluator::with_seed(0).evaluate(&mut g).unwrap();
        assert_eq!(g.output_value(wrapper, "y"), Some(Value::Scalar(1.0)));
    }
}
