// SPDX-License-Identifier: MIT OR Apache-2.0
//! The explicitly constructed registries a graph is built against.

use crate::node::NodeRegistry;
use crate::operators::standard_registry;
use crate::types::TypeRegistry;
use std::sync::Arc;

/// Type rules plus the operator table, shared by every graph built from them
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Value types and coercion edges
    pub types: TypeRegistry,
    /// Available node types
    pub nodes: NodeRegistry,
}

impl Catalog {
    /// Create a catalog from explicit registries
    pub fn new(types: TypeRegistry, nodes: NodeRegistry) -> Self {
        Self { types, nodes }
    }

    /// The standard type rules and operator table
    pub fn standard() -> Self {
        Self::new(TypeRegistry::standard(), standard_registry())
    }

    /// The standard catalog, ready to share between graphs
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::standard())
    }
}
