// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for graph mutation and evaluation.
//!
//! [`GraphError`] is returned by mutations and by the pass as a whole.
//! [`NodeError`] never escapes a pass: it is recorded as the reason one
//! node's outputs are undefined.

use crate::connection::ConnectionId;
use crate::node::NodeId;
use crate::types::ValueType;
use thiserror::Error;

/// Error produced by a graph mutation or by the evaluator itself
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// No declared coercion edge between the two types
    #[error("incompatible types: cannot coerce {from} into {to}")]
    IncompatibleType {
        /// Source type
        from: ValueType,
        /// Target type
        to: ValueType,
    },

    /// Value does not satisfy the validity predicate of its claimed type
    #[error("value is not a valid {expected}")]
    InvalidValue {
        /// Type the value was checked against
        expected: ValueType,
    },

    /// The links form a directed cycle
    #[error("graph contains a cycle")]
    CyclicGraph,

    /// Two graph-input or two graph-output nodes share a name
    #[error("duplicate boundary name: '{name}'")]
    DuplicateBoundaryName {
        /// The colliding name
        name: String,
    },

    /// Node not found
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port not found on a node
    #[error("port '{port}' not found on node {node}")]
    PortNotFound {
        /// Owning node
        node: NodeId,
        /// Requested port id
        port: String,
    },

    /// Link not found
    #[error("link not found: {0:?}")]
    LinkNotFound(ConnectionId),

    /// Node type id missing from the catalog
    #[error("unknown node type: '{0}'")]
    UnknownNodeType(String),

    /// Parameter not declared by the node
    #[error("node {node} has no parameter '{name}'")]
    UnknownParameter {
        /// Owning node
        node: NodeId,
        /// Requested parameter name
        name: String,
    },

    /// No graph-input or graph-output node has this name
    #[error("no boundary node named '{name}'")]
    BoundaryNotFound {
        /// Requested name
        name: String,
    },

    /// Operation requires a graph-input or graph-output node
    #[error("node {0} is not a boundary node")]
    NotABoundaryNode(NodeId),

    /// Operation requires a nested-graph node
    #[error("node {0} is not a subgraph")]
    NotASubgraph(NodeId),

    /// Serialized graph data is inconsistent
    #[error("invalid graph data: {reason}")]
    InvalidGraphData {
        /// What is wrong with it
        reason: String,
    },
}

/// Why a node's outputs are undefined for one pass
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    /// A required input has no value
    #[error("missing required input '{port}'")]
    MissingInput {
        /// Unresolved input port
        port: String,
    },

    /// An input is linked to an output that is itself undefined
    #[error("input '{port}' is fed by an undefined output")]
    UpstreamUndefined {
        /// Affected input port
        port: String,
    },

    /// An input holds a value of the wrong shape for the operator
    #[error("input '{port}' holds a value of the wrong type")]
    Incompatible {
        /// Affected input port
        port: String,
    },

    /// A declared parameter is absent
    #[error("missing parameter '{name}'")]
    MissingParameter {
        /// Parameter name
        name: String,
    },

    /// The node produced a value its output port's type rejects
    #[error("output '{port}' produced an invalid value")]
    InvalidOutput {
        /// Offending output port
        port: String,
    },

    /// The node did not produce one value per output port
    #[error("expected {expected} outputs, produced {produced}")]
    PartialOutput {
        /// Number of output ports
        expected: usize,
        /// Number of values produced
        produced: usize,
    },

    /// A nested graph left one of its exported outputs undefined
    #[error("subgraph output '{name}' is undefined")]
    SubgraphOutputUndefined {
        /// Graph-output name
        name: String,
    },

    /// The nested graph could not be evaluated at all
    #[error("subgraph evaluation failed: {0}")]
    Subgraph(Box<GraphError>),
}
