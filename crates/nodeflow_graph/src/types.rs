// SPDX-License-Identifier: MIT OR Apache-2.0
//! Value types and the coercion rules between them.
//!
//! The [`TypeRegistry`] is the single authority on which port types may be
//! linked and how a value crosses a link. Every coercion is a directly
//! declared edge; the registry never chains edges to find a path.

use crate::error::GraphError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Data type that can flow through ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Floating point value
    Scalar,
    /// Integer value
    Integer,
    /// Boolean value
    Boolean,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// 4D vector
    Vector4,
}

impl ValueType {
    /// All value types, in declaration order
    pub const ALL: [ValueType; 6] = [
        Self::Scalar,
        Self::Integer,
        Self::Boolean,
        Self::Vector2,
        Self::Vector3,
        Self::Vector4,
    ];

    /// Short display name
    pub fn name(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Vector2 => "vector2",
            Self::Vector3 => "vector3",
            Self::Vector4 => "vector4",
        }
    }

    /// The all-zero value of this type
    pub fn zero(self) -> Value {
        match self {
            Self::Scalar => Value::Scalar(0.0),
            Self::Integer => Value::Integer(0),
            Self::Boolean => Value::Boolean(false),
            Self::Vector2 => Value::Vector2([0.0; 2]),
            Self::Vector3 => Value::Vector3([0.0; 3]),
            Self::Vector4 => Value::Vector4([0.0; 4]),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved value.
///
/// Values are `Copy`, so every consumer of an output port receives its own
/// copy and no consumer can observe another's mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Floating point
    Scalar(f64),
    /// Integer
    Integer(i64),
    /// Boolean
    Boolean(bool),
    /// 2D vector
    Vector2([f64; 2]),
    /// 3D vector
    Vector3([f64; 3]),
    /// 4D vector
    Vector4([f64; 4]),
}

impl Value {
    /// Get the type this value's variant belongs to
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Scalar(_) => ValueType::Scalar,
            Self::Integer(_) => ValueType::Integer,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Vector2(_) => ValueType::Vector2,
            Self::Vector3(_) => ValueType::Vector3,
            Self::Vector4(_) => ValueType::Vector4,
        }
    }

    /// Scalar payload, if this is a scalar
    pub fn as_scalar(&self) -> Option<f64> {
        match *self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Integer payload, if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            Self::Integer(v) => Some(v),
            _ => None,
        }
    }

    /// Boolean payload, if this is a boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match *self {
            Self::Boolean(v) => Some(v),
            _ => None,
        }
    }

    /// Vector components, if this is a vector of any width
    pub fn components(&self) -> Option<&[f64]> {
        match self {
            Self::Vector2(v) => Some(v),
            Self::Vector3(v) => Some(v),
            Self::Vector4(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Vector2(_) | Self::Vector3(_) | Self::Vector4(_) => {
                let parts: Vec<String> = self
                    .components()
                    .unwrap_or_default()
                    .iter()
                    .map(f64::to_string)
                    .collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}

/// Conversion along one declared coercion edge
pub type CoerceFn = fn(Value) -> Value;

/// Validity predicate over raw values
pub type ValidityFn = fn(&Value) -> bool;

/// Everything the registry knows about one value type
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Type identifier
    pub id: ValueType,
    /// Value used for optional inputs and fresh parameters
    pub default: Value,
    validity: ValidityFn,
    coercions: IndexMap<ValueType, CoerceFn>,
}

impl TypeDescriptor {
    /// Create a descriptor with no outgoing coercions
    pub fn new(id: ValueType, default: Value, validity: ValidityFn) -> Self {
        Self {
            id,
            default,
            validity,
            coercions: IndexMap::new(),
        }
    }

    /// Declare a coercion edge from this type into `to`
    pub fn with_coercion(mut self, to: ValueType, convert: CoerceFn) -> Self {
        self.coercions.insert(to, convert);
        self
    }

    /// Check a raw value against this type
    pub fn is_valid(&self, value: &Value) -> bool {
        (self.validity)(value)
    }
}

/// Registry of value types and their coercion edges
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<ValueType, TypeDescriptor>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a type descriptor
    pub fn register(&mut self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.id, descriptor);
    }

    /// Build the registry with the standard scalar/integer/boolean/vector rules
    pub fn standard() -> Self {
        use ValueType as T;

        let mut registry = Self::new();

        registry.register(
            TypeDescriptor::new(T::Scalar, Value::Scalar(0.0), |v| {
                matches!(v, Value::Scalar(_))
            })
            // `as` saturates and maps NaN to zero, so this is total
            .with_coercion(T::Integer, |v| match v {
                Value::Scalar(s) => Value::Integer(s.round() as i64),
                other => other,
            })
            .with_coercion(T::Boolean, |v| match v {
                Value::Scalar(s) => Value::Boolean(s != 0.0),
                other => other,
            })
            .with_coercion(T::Vector2, |v| match v {
                Value::Scalar(s) => Value::Vector2([s; 2]),
                other => other,
            })
            .with_coercion(T::Vector3, |v| match v {
                Value::Scalar(s) => Value::Vector3([s; 3]),
                other => other,
            })
            .with_coercion(T::Vector4, |v| match v {
                Value::Scalar(s) => Value::Vector4([s; 4]),
                other => other,
            }),
        );

        registry.register(
            TypeDescriptor::new(T::Integer, Value::Integer(0), |v| {
                matches!(v, Value::Integer(_))
            })
            .with_coercion(T::Scalar, |v| match v {
                Value::Integer(i) => Value::Scalar(i as f64),
                other => other,
            })
            .with_coercion(T::Boolean, |v| match v {
                Value::Integer(i) => Value::Boolean(i != 0),
                other => other,
            })
            .with_coercion(T::Vector2, |v| match v {
                Value::Integer(i) => Value::Vector2([i as f64; 2]),
                other => other,
            })
            .with_coercion(T::Vector3, |v| match v {
                Value::Integer(i) => Value::Vector3([i as f64; 3]),
                other => other,
            })
            .with_coercion(T::Vector4, |v| match v {
                Value::Integer(i) => Value::Vector4([i as f64; 4]),
                other => other,
            }),
        );

        registry.register(
            TypeDescriptor::new(T::Boolean, Value::Boolean(false), |v| {
                matches!(v, Value::Boolean(_))
            })
            .with_coercion(T::Scalar, |v| match v {
                Value::Boolean(b) => Value::Scalar(if b { 1.0 } else { 0.0 }),
                other => other,
            })
            .with_coercion(T::Integer, |v| match v {
                Value::Boolean(b) => Value::Integer(i64::from(b)),
                other => other,
            }),
        );

        registry.register(
            TypeDescriptor::new(T::Vector2, Value::Vector2([0.0; 2]), |v| {
                matches!(v, Value::Vector2(_))
            })
            .with_coercion(T::Vector3, |v| match v {
                Value::Vector2([x, y]) => Value::Vector3([x, y, 0.0]),
                other => other,
            })
            .with_coercion(T::Vector4, |v| match v {
                Value::Vector2([x, y]) => Value::Vector4([x, y, 0.0, 0.0]),
                other => other,
            }),
        );

        registry.register(
            TypeDescriptor::new(T::Vector3, Value::Vector3([0.0; 3]), |v| {
                matches!(v, Value::Vector3(_))
            })
            .with_coercion(T::Vector2, |v| match v {
                Value::Vector3([x, y, _]) => Value::Vector2([x, y]),
                other => other,
            })
            .with_coercion(T::Vector4, |v| match v {
                Value::Vector3([x, y, z]) => Value::Vector4([x, y, z, 0.0]),
                other => other,
            }),
        );

        registry.register(
            TypeDescriptor::new(T::Vector4, Value::Vector4([0.0; 4]), |v| {
                matches!(v, Value::Vector4(_))
            })
            .with_coercion(T::Vector2, |v| match v {
                Value::Vector4([x, y, _, _]) => Value::Vector2([x, y]),
                other => other,
            })
            .with_coercion(T::Vector3, |v| match v {
                Value::Vector4([x, y, z, _]) => Value::Vector3([x, y, z]),
                other => other,
            }),
        );

        registry
    }

    /// Get the descriptor for a type
    pub fn descriptor(&self, value_type: ValueType) -> Option<&TypeDescriptor> {
        self.types.get(&value_type)
    }

    /// Registered types, in registration order
    pub fn types(&self) -> impl Iterator<Item = ValueType> + '_ {
        self.types.keys().copied()
    }

    /// Check a raw value against a type
    pub fn is_valid(&self, value_type: ValueType, value: &Value) -> bool {
        self.descriptor(value_type)
            .is_some_and(|d| d.is_valid(value))
    }

    /// Default value of a type
    pub fn default_of(&self, value_type: ValueType) -> Value {
        self.descriptor(value_type)
            .map_or_else(|| value_type.zero(), |d| d.default)
    }

    /// Whether a port of type `from` may feed a port of type `to`
    pub fn can_coerce(&self, from: ValueType, to: ValueType) -> bool {
        from == to
            || self
                .descriptor(from)
                .is_some_and(|d| d.coercions.contains_key(&to))
    }

    /// Convert `value` from `from` into `to` along a declared edge
    pub fn coerce(&self, value: Value, from: ValueType, to: ValueType) -> Result<Value, GraphError> {
        if !self.is_valid(from, &value) {
            return Err(GraphError::InvalidValue { expected: from });
        }
        if from == to {
            return Ok(value);
        }

        let convert = self
            .descriptor(from)
            .and_then(|d| d.coercions.get(&to))
            .ok_or(GraphError::IncompatibleType { from, to })?;
        Ok(convert(value))
    }
}
