// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.
//!
//! Every node is the same concrete record: ports, parameters and a
//! [`NodeKind`] saying how its outputs are produced. Operator behaviour comes
//! from table entries in [`crate::operators`], not from per-operator types.

use crate::error::{GraphError, NodeError};
use crate::graph::Graph;
use crate::operators::{Operator, OperatorInputs};
use crate::port::Port;
use crate::types::{TypeRegistry, Value, ValueType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node type category (presentational only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Literal values
    Constant,
    /// Scalar arithmetic
    Math,
    /// Boolean logic and comparisons
    Logic,
    /// Vector math
    Vector,
    /// Explicit type conversions
    Conversion,
    /// Time and randomness
    Source,
    /// Nested-graph boundary and wrapper nodes
    Graph,
}

/// Declaration of a node-local parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub value_type: ValueType,
    /// Initial value
    pub default: Value,
}

impl ParamSpec {
    /// Declare a parameter
    pub fn new(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            value_type: default.value_type(),
            default,
        }
    }
}

/// Current value of a node-local parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param {
    /// Declared type
    pub value_type: ValueType,
    /// Current value
    pub value: Value,
}

/// Rule deciding whether a node's resolved inputs are sufficient
#[derive(Debug, Clone, Copy)]
pub enum InputRule {
    /// Every non-optional input must be resolved
    AllRequired,
    /// Operator-specific check
    Custom(fn(&OperatorInputs<'_>) -> bool),
}

/// Node type definition (one entry of the operator table)
#[derive(Debug, Clone)]
pub struct NodeType {
    /// Unique type identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Input ports
    pub inputs: Vec<Port>,
    /// Output ports
    pub outputs: Vec<Port>,
    /// Node-local parameters
    pub params: Vec<ParamSpec>,
    /// Computation rule
    pub operator: Operator,
    /// Input validation rule
    pub input_rule: InputRule,
}

/// How a node produces its outputs
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Pure function from the operator table
    Operator(Operator),
    /// Subgraph entry point; outputs the injected value or its default
    GraphInput {
        /// Exported name
        name: String,
        /// Value supplied by the parent context or by the caller
        injected: Option<Value>,
    },
    /// Subgraph exit point; records the value it receives
    GraphOutput {
        /// Exported name
        name: String,
        /// Value received in the last pass
        last_value: Option<Value>,
    },
    /// An entire graph acting as one node
    Subgraph(Box<Graph>),
}

/// A node instance in the graph
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Node type ID
    pub node_type: String,
    /// Display name (can be customized)
    pub title: String,
    /// Category
    pub category: NodeCategory,
    /// Position in the editor (opaque to the engine)
    pub position: [f32; 2],
    /// Input ports
    pub inputs: Vec<Port>,
    /// Output ports
    pub outputs: Vec<Port>,
    pub(crate) params: IndexMap<String, Param>,
    pub(crate) kind: NodeKind,
    pub(crate) input_rule: InputRule,
}

impl Node {
    /// Create a new node from a type definition
    pub fn new(node_type: &NodeType) -> Self {
        Self {
            id: NodeId::new(),
            node_type: node_type.id.clone(),
            title: node_type.name.clone(),
            category: node_type.category,
            position: [0.0, 0.0],
            inputs: node_type.inputs.clone(),
            outputs: node_type.outputs.clone(),
            params: node_type
                .params
                .iter()
                .map(|spec| {
                    (
                        spec.name.clone(),
                        Param {
                            value_type: spec.value_type,
                            value: spec.default,
                        },
                    )
                })
                .collect(),
            kind: NodeKind::Operator(node_type.operator),
            input_rule: node_type.input_rule,
        }
    }

    /// Get an input port by ID
    pub fn input(&self, port_id: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.id == port_id)
    }

    /// Get an output port by ID
    pub fn output(&self, port_id: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.id == port_id)
    }

    /// Get a port by ID, inputs first
    pub fn port(&self, port_id: &str) -> Option<&Port> {
        self.input(port_id).or_else(|| self.output(port_id))
    }

    /// Get all ports
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Current value of a parameter
    pub fn param(&self, name: &str) -> Option<Value> {
        self.params.get(name).map(|p| p.value)
    }

    /// All parameters, in declaration order
    pub fn params(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.params.iter().map(|(name, p)| (name.as_str(), p))
    }

    /// Set a parameter, coercing the value into the declared type
    pub fn set_param(
        &mut self,
        name: &str,
        value: Value,
        types: &TypeRegistry,
    ) -> Result<(), GraphError> {
        let id = self.id;
        let param = self
            .params
            .get_mut(name)
            .ok_or_else(|| GraphError::UnknownParameter {
                node: id,
                name: name.to_string(),
            })?;
        param.value = types.coerce(value, value.value_type(), param.value_type)?;
        Ok(())
    }

    /// How this node produces its outputs
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Exported name, for graph-input and graph-output nodes
    pub fn boundary_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::GraphInput { name, .. } | NodeKind::GraphOutput { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }

    /// Whether this is a graph-input node
    pub fn is_graph_input(&self) -> bool {
        matches!(self.kind, NodeKind::GraphInput { .. })
    }

    /// The embedded graph, for nested-graph nodes
    pub fn subgraph(&self) -> Option<&Graph> {
        match &self.kind {
            NodeKind::Subgraph(inner) => Some(inner),
            _ => None,
        }
    }

    /// Whether the node samples time or entropy and must run every pass
    pub fn is_volatile(&self) -> bool {
        match &self.kind {
            NodeKind::Operator(op) => op.is_volatile(),
            NodeKind::Subgraph(inner) => inner.nodes().any(Node::is_volatile),
            NodeKind::GraphInput { .. } | NodeKind::GraphOutput { .. } => false,
        }
    }

    /// Check whether the resolved inputs are sufficient to evaluate
    pub fn validate_inputs(&self, inputs: &OperatorInputs<'_>) -> bool {
        match self.input_rule {
            InputRule::AllRequired => inputs.required_resolved(),
            InputRule::Custom(check) => check(inputs),
        }
    }

    /// Decide whether the node can run this pass.
    ///
    /// `upstream_undefined` lists linked inputs whose source is undefined.
    /// Under [`InputRule::AllRequired`] any of them makes the node undefined;
    /// a custom rule only cares about the inputs it actually reads.
    pub(crate) fn check_inputs(
        &self,
        inputs: &OperatorInputs<'_>,
        upstream_undefined: &[String],
    ) -> Result<(), NodeError> {
        if let (InputRule::AllRequired, Some(port)) = (self.input_rule, upstream_undefined.first()) {
            return Err(NodeError::UpstreamUndefined { port: port.clone() });
        }
        if self.validate_inputs(inputs) {
            return Ok(());
        }

        let port = inputs.first_missing().unwrap_or_default().to_string();
        if upstream_undefined.contains(&port) {
            Err(NodeError::UpstreamUndefined { port })
        } else {
            Err(NodeError::MissingInput { port })
        }
    }
}

/// Registry of available node types
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    /// Registered node types by ID
    types: IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    /// Register a node type
    pub fn register(&mut self, node_type: NodeType) {
        self.types.insert(node_type.id.clone(), node_type);
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Create a node from a type ID
    pub fn create_node(&self, type_id: &str) -> Option<Node> {
        self.get(type_id).map(Node::new)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
