// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use crate::types::{TypeRegistry, Value, ValueType};
use serde::{Deserialize, Serialize};

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// A typed connection point on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Identifier, unique among the ports of one node
    pub id: String,
    /// Human readable label
    pub label: String,
    /// Port direction
    pub direction: PortDirection,
    /// Data type
    pub value_type: ValueType,
    /// Value used when an optional input is left unconnected
    pub default_value: Option<Value>,
    /// Whether an input may be left unconnected (inputs only)
    pub optional: bool,
}

impl Port {
    /// Create a new port
    pub fn new(
        id: impl Into<String>,
        value_type: ValueType,
        direction: PortDirection,
    ) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            direction,
            value_type,
            default_value: None,
            optional: false,
        }
    }

    /// Create a new required input port
    pub fn input(id: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(id, value_type, PortDirection::Input)
    }

    /// Create a new output port
    pub fn output(id: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(id, value_type, PortDirection::Output)
    }

    /// Set the display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the default value, which makes the input optional
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self.optional = true;
        self
    }

    /// Mark as optional without a default; the input then resolves to absent
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Whether this is an input port
    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    /// Check if a link from this port into `other` is valid
    pub fn can_connect(&self, other: &Port, types: &TypeRegistry) -> bool {
        // Links always run output -> input
        if self.direction != PortDirection::Output || other.direction != PortDirection::Input {
            return false;
        }

        types.can_coerce(self.value_type, other.value_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_rules() {
        let types = TypeRegistry::standard();
        let out = Port::output("result", ValueType::Scalar);
        let input = Port::input("a", ValueType::Scalar);

        assert!(out.can_connect(&input, &types));
        assert!(!input.can_connect(&out, &types));
        assert!(!out.can_connect(&out.clone(), &types));
    }

    #[test]
    fn test_type_rules() {
        let types = TypeRegistry::standard();
        let vector_out = Port::output("v", ValueType::Vector3);
        let scalar_in = Port::input("a", ValueType::Scalar);
        let scalar_out = Port::output("s", ValueType::Scalar);
        let vector_in = Port::input("v", ValueType::Vector3);

        assert!(!vector_out.can_connect(&scalar_in, &types));
        assert!(scalar_out.can_connect(&vector_in, &types));
    }

    #[test]
    fn test_default_makes_optional() {
        let port = Port::input("t", ValueType::Scalar).with_default(Value::Scalar(0.5));
        assert!(port.optional);
        assert_eq!(port.default_value, Some(Value::Scalar(0.5)));
        assert!(!Port::input("a", ValueType::Scalar).optional);
    }
}
