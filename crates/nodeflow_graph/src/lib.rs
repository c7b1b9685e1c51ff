// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dataflow node graph engine for Nodeflow.
//!
//! A graph is a set of nodes with typed input and output ports joined by
//! links. Evaluation runs in topological order and only recomputes what an
//! edit could have changed.
//!
//! ## Architecture
//!
//! The engine is built on a single concrete node model with:
//! - A type registry with declared, non-transitive coercions
//! - A data-driven operator table
//! - Cycle rejection at link time
//! - Incremental evaluation with explicit undefined results
//! - Whole graphs usable as nodes through graph-input and graph-output nodes
//! - Serialization support

pub mod boundary;
pub mod catalog;
pub mod connection;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod graph;
pub mod node;
pub mod operators;
pub mod port;
pub mod types;

pub use boundary::BoundaryPort;
pub use catalog::Catalog;
pub use connection::{Connection, ConnectionId};
pub use data::{GraphData, IdPolicy, LinkData, NodeData};
pub use error::{GraphError, NodeError};
pub use evaluation::{Clock, EvaluationReport, Evaluator, FixedClock, SystemClock};
pub use graph::{Graph, NodeResult};
pub use node::{Node, NodeCategory, NodeId, NodeKind, NodeRegistry, NodeType};
pub use port::{Port, PortDirection};
pub use types::{TypeRegistry, Value, ValueType};
