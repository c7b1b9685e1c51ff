// SPDX-License-Identifier: MIT OR Apache-2.0
//! The atomic operator table.
//!
//! Operators are data: each entry of [`standard_registry`] pairs a port
//! layout with one [`Operator`] shape. Scalar math, comparisons and logic
//! share a shape and differ only in the function they carry.

use crate::error::NodeError;
use crate::evaluation::PassEnv;
use crate::node::{InputRule, NodeCategory, NodeRegistry, NodeType, Param, ParamSpec};
use crate::port::Port;
use crate::types::{TypeRegistry, Value, ValueType};
use indexmap::IndexMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Hand-written operator body
pub type OperatorFn = fn(&OperatorInputs<'_>) -> Result<Vec<Value>, NodeError>;

/// Behaviour shape of an operator-table entry
#[derive(Debug, Clone, Copy)]
pub enum Operator {
    /// Outputs its `value` parameter
    Constant,
    /// Scalar `a` -> scalar
    Unary(fn(f64) -> f64),
    /// Scalars `a`, `b` -> scalar
    Binary(fn(f64, f64) -> f64),
    /// Scalars `a`, `b` -> boolean
    Compare(fn(f64, f64) -> bool),
    /// Booleans `a`, `b` -> boolean
    Logic(fn(bool, bool) -> bool),
    /// Boolean `a` -> boolean
    Not,
    /// First input converted into the first output's type
    Convert,
    /// `cond` picks `a` or `b`
    Select,
    /// Anything else
    Custom(OperatorFn),
    /// Pass time in seconds
    Time,
    /// Random value in [0, 1), reproducible when `seed` is linked
    Random,
    /// Random value in [0, 1) fully determined by `seed`
    SeededRandom,
}

impl Operator {
    /// Whether the operator reads the clock or the pass generator
    pub fn is_volatile(&self) -> bool {
        matches!(self, Self::Time | Self::Random)
    }

    /// Produce one value per output port, in port order
    pub fn apply(
        &self,
        inputs: &OperatorInputs<'_>,
        outputs: &[Port],
        types: &TypeRegistry,
        env: &mut PassEnv<'_>,
    ) -> Result<Vec<Value>, NodeError> {
        let value = match *self {
            Self::Constant => inputs
                .param("value")
                .ok_or_else(|| NodeError::MissingParameter {
                    name: "value".to_string(),
                })?,
            Self::Unary(f) => Value::Scalar(f(inputs.scalar("a")?)),
            Self::Binary(f) => Value::Scalar(f(inputs.scalar("a")?, inputs.scalar("b")?)),
            Self::Compare(f) => Value::Boolean(f(inputs.scalar("a")?, inputs.scalar("b")?)),
            Self::Logic(f) => Value::Boolean(f(inputs.boolean("a")?, inputs.boolean("b")?)),
            Self::Not => Value::Boolean(!inputs.boolean("a")?),
            Self::Convert => {
                let (Some(input), Some(output)) = (inputs.ports.first(), outputs.first()) else {
                    return Err(NodeError::PartialOutput {
                        expected: outputs.len(),
                        produced: 0,
                    });
                };
                let value = inputs.require(&input.id)?;
                types
                    .coerce(value, input.value_type, output.value_type)
                    .map_err(|_| NodeError::Incompatible {
                        port: input.id.clone(),
                    })?
            }
            Self::Select => {
                if inputs.boolean("cond")? {
                    Value::Scalar(inputs.scalar("a")?)
                } else {
                    Value::Scalar(inputs.scalar("b")?)
                }
            }
            Self::Custom(f) => return f(inputs),
            Self::Time => Value::Scalar(env.time),
            Self::Random => match inputs.value("seed") {
                Some(Value::Integer(seed)) => Value::Scalar(seeded_unit(seed)),
                _ => Value::Scalar(env.rng.gen::<f64>()),
            },
            Self::SeededRandom => Value::Scalar(seeded_unit(inputs.integer("seed")?)),
        };
        Ok(vec![value])
    }
}

fn seeded_unit(seed: i64) -> f64 {
    ChaCha8Rng::seed_from_u64(seed as u64).gen::<f64>()
}

/// Resolved input values of one node for one pass, addressed by port id
#[derive(Debug, Clone, Copy)]
pub struct OperatorInputs<'a> {
    ports: &'a [Port],
    values: &'a [Option<Value>],
    params: &'a IndexMap<String, Param>,
}

impl<'a> OperatorInputs<'a> {
    /// Pair input ports with their resolved values (same order)
    pub fn new(
        ports: &'a [Port],
        values: &'a [Option<Value>],
        params: &'a IndexMap<String, Param>,
    ) -> Self {
        Self {
            ports,
            values,
            params,
        }
    }

    /// Resolved value of an input, if any
    pub fn value(&self, port: &str) -> Option<Value> {
        self.ports
            .iter()
            .position(|p| p.id == port)
            .and_then(|index| self.values.get(index).copied().flatten())
    }

    /// Whether an input has a resolved value
    pub fn is_resolved(&self, port: &str) -> bool {
        self.value(port).is_some()
    }

    /// Resolved value of an input, or `MissingInput`
    pub fn require(&self, port: &str) -> Result<Value, NodeError> {
        self.value(port).ok_or_else(|| NodeError::MissingInput {
            port: port.to_string(),
        })
    }

    /// Scalar input
    pub fn scalar(&self, port: &str) -> Result<f64, NodeError> {
        self.require(port)?
            .as_scalar()
            .ok_or_else(|| incompatible(port))
    }

    /// Integer input
    pub fn integer(&self, port: &str) -> Result<i64, NodeError> {
        self.require(port)?
            .as_integer()
            .ok_or_else(|| incompatible(port))
    }

    /// Boolean input
    pub fn boolean(&self, port: &str) -> Result<bool, NodeError> {
        self.require(port)?
            .as_boolean()
            .ok_or_else(|| incompatible(port))
    }

    /// 3D vector input
    pub fn vector3(&self, port: &str) -> Result<[f64; 3], NodeError> {
        match self.require(port)? {
            Value::Vector3(v) => Ok(v),
            _ => Err(incompatible(port)),
        }
    }

    /// Current value of a node parameter
    pub fn param(&self, name: &str) -> Option<Value> {
        self.params.get(name).map(|p| p.value)
    }

    /// Whether every non-optional input is resolved
    pub fn required_resolved(&self) -> bool {
        self.ports
            .iter()
            .zip(self.values)
            .all(|(port, value)| port.optional || value.is_some())
    }

    /// The input to blame when validation fails
    pub fn first_missing(&self) -> Option<&'a str> {
        let mut unresolved = self
            .ports
            .iter()
            .zip(self.values)
            .filter(|(_, value)| value.is_none())
            .map(|(port, _)| port);
        let first = unresolved.clone().next();
        unresolved
            .find(|port| !port.optional)
            .or(first)
            .map(|port| port.id.as_str())
    }
}

fn incompatible(port: &str) -> NodeError {
    NodeError::Incompatible {
        port: port.to_string(),
    }
}

fn select_ready(inputs: &OperatorInputs<'_>) -> bool {
    match inputs.value("cond") {
        Some(Value::Boolean(true)) => inputs.is_resolved("a"),
        Some(Value::Boolean(false)) => inputs.is_resolved("b"),
        _ => false,
    }
}

fn clamp(inputs: &OperatorInputs<'_>) -> Result<Vec<Value>, NodeError> {
    let value = inputs.scalar("value")?;
    let lo = inputs.scalar("min")?;
    let hi = inputs.scalar("max")?;
    // f64::clamp panics when lo > hi
    Ok(vec![Value::Scalar(value.max(lo).min(hi))])
}

fn lerp(inputs: &OperatorInputs<'_>) -> Result<Vec<Value>, NodeError> {
    let a = inputs.scalar("a")?;
    let b = inputs.scalar("b")?;
    let t = inputs.scalar("t")?;
    Ok(vec![Value::Scalar(a + (b - a) * t)])
}

fn make_vector2(inputs: &OperatorInputs<'_>) -> Result<Vec<Value>, NodeError> {
    Ok(vec![Value::Vector2([inputs.scalar("x")?, inputs.scalar("y")?])])
}

fn make_vector3(inputs: &OperatorInputs<'_>) -> Result<Vec<Value>, NodeError> {
    Ok(vec![Value::Vector3([
        inputs.scalar("x")?,
        inputs.scalar("y")?,
        inputs.scalar("z")?,
    ])])
}

fn make_vector4(inputs: &OperatorInputs<'_>) -> Result<Vec<Value>, NodeError> {
    Ok(vec![Value::Vector4([
        inputs.scalar("x")?,
        inputs.scalar("y")?,
        inputs.scalar("z")?,
        inputs.scalar("w")?,
    ])])
}

fn split_vector3(inputs: &OperatorInputs<'_>) -> Result<Vec<Value>, NodeError> {
    let [x, y, z] = inputs.vector3("vector")?;
    Ok(vec![Value::Scalar(x), Value::Scalar(y), Value::Scalar(z)])
}

fn dot(inputs: &OperatorInputs<'_>) -> Result<Vec<Value>, NodeError> {
    let a = inputs.vector3("a")?;
    let b = inputs.vector3("b")?;
    Ok(vec![Value::Scalar(a[0] * b[0] + a[1] * b[1] + a[2] * b[2])])
}

fn cross(inputs: &OperatorInputs<'_>) -> Result<Vec<Value>, NodeError> {
    let [ax, ay, az] = inputs.vector3("a")?;
    let [bx, by, bz] = inputs.vector3("b")?;
    Ok(vec![Value::Vector3([
        ay * bz - az * by,
        az * bx - ax * bz,
        ax * by - ay * bx,
    ])])
}

fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn length(inputs: &OperatorInputs<'_>) -> Result<Vec<Value>, NodeError> {
    Ok(vec![Value::Scalar(norm(inputs.vector3("vector")?))])
}

fn normalize(inputs: &OperatorInputs<'_>) -> Result<Vec<Value>, NodeError> {
    let v = inputs.vector3("vector")?;
    let len = norm(v);
    // zero-length vectors stay zero
    if len == 0.0 {
        return Ok(vec![Value::Vector3(v)]);
    }
    Ok(vec![Value::Vector3([v[0] / len, v[1] / len, v[2] / len])])
}

fn vector_add(inputs: &OperatorInputs<'_>) -> Result<Vec<Value>, NodeError> {
    let a = inputs.vector3("a")?;
    let b = inputs.vector3("b")?;
    Ok(vec![Value::Vector3([a[0] + b[0], a[1] + b[1], a[2] + b[2]])])
}

fn vector_scale(inputs: &OperatorInputs<'_>) -> Result<Vec<Value>, NodeError> {
    let v = inputs.vector3("vector")?;
    let k = inputs.scalar("factor")?;
    Ok(vec![Value::Vector3([v[0] * k, v[1] * k, v[2] * k])])
}

fn entry(
    id: &str,
    name: &str,
    category: NodeCategory,
    description: &str,
    operator: Operator,
) -> NodeType {
    NodeType {
        id: id.to_string(),
        name: name.to_string(),
        category,
        description: description.to_string(),
        inputs: Vec::new(),
        outputs: Vec::new(),
        params: Vec::new(),
        operator,
        input_rule: InputRule::AllRequired,
    }
}

type BinaryEntry = (&'static str, &'static str, &'static str, fn(f64, f64) -> f64);
type UnaryEntry = (&'static str, &'static str, &'static str, fn(f64) -> f64);
type CompareEntry = (&'static str, &'static str, &'static str, fn(f64, f64) -> bool);
type LogicEntry = (&'static str, &'static str, &'static str, fn(bool, bool) -> bool);

/// Create the node registry with every standard operator
pub fn standard_registry() -> NodeRegistry {
    use ValueType as T;

    let mut registry = NodeRegistry::new();

    // ========================================================================
    // Constants
    // ========================================================================

    let constants = [
        ("scalar", "Scalar", Value::Scalar(0.0)),
        ("integer", "Integer", Value::Integer(0)),
        ("boolean", "Boolean", Value::Boolean(false)),
        ("vector2", "Vector2", Value::Vector2([0.0; 2])),
        ("vector3", "Vector3", Value::Vector3([0.0; 3])),
        ("vector4", "Vector4", Value::Vector4([0.0; 4])),
    ];
    for (id, name, default) in constants {
        registry.register(NodeType {
            outputs: vec![Port::output("value", default.value_type()).with_label("Value")],
            params: vec![ParamSpec::new("value", default)],
            ..entry(
                id,
                name,
                NodeCategory::Constant,
                &format!("Constant {} value", default.value_type()),
                Operator::Constant,
            )
        });
    }

    // ========================================================================
    // Math
    // ========================================================================

    let binary: [BinaryEntry; 9] = [
        ("add", "Add", "Sum of two scalars", |a, b| a + b),
        ("subtract", "Subtract", "Difference of two scalars", |a, b| a - b),
        ("multiply", "Multiply", "Product of two scalars", |a, b| a * b),
        ("divide", "Divide", "Quotient of two scalars", |a, b| a / b),
        ("modulo", "Modulo", "Remainder of a divided by b", |a, b| a % b),
        ("power", "Power", "a raised to the power b", f64::powf),
        ("min", "Min", "Smaller of two scalars", f64::min),
        ("max", "Max", "Larger of two scalars", f64::max),
        ("atan2", "Atan2", "Angle of the point (b, a) in radians", f64::atan2),
    ];
    for (id, name, description, f) in binary {
        registry.register(NodeType {
            inputs: vec![Port::input("a", T::Scalar), Port::input("b", T::Scalar)],
            outputs: vec![Port::output("result", T::Scalar).with_label("Result")],
            ..entry(id, name, NodeCategory::Math, description, Operator::Binary(f))
        });
    }

    let unary: [UnaryEntry; 8] = [
        ("negate", "Negate", "Negated scalar", |a| -a),
        ("abs", "Absolute", "Absolute value", f64::abs),
        ("sqrt", "Square Root", "Square root", f64::sqrt),
        ("floor", "Floor", "Largest integer not above the value", f64::floor),
        ("ceil", "Ceil", "Smallest integer not below the value", f64::ceil),
        ("round", "Round", "Nearest integer, halves away from zero", f64::round),
        ("sin", "Sine", "Sine of an angle in radians", f64::sin),
        ("cos", "Cosine", "Cosine of an angle in radians", f64::cos),
    ];
    for (id, name, description, f) in unary {
        registry.register(NodeType {
            inputs: vec![Port::input("a", T::Scalar)],
            outputs: vec![Port::output("result", T::Scalar).with_label("Result")],
            ..entry(id, name, NodeCategory::Math, description, Operator::Unary(f))
        });
    }

    registry.register(NodeType {
        inputs: vec![
            Port::input("value", T::Scalar),
            Port::input("min", T::Scalar).with_default(Value::Scalar(0.0)),
            Port::input("max", T::Scalar).with_default(Value::Scalar(1.0)),
        ],
        outputs: vec![Port::output("result", T::Scalar).with_label("Result")],
        ..entry(
            "clamp",
            "Clamp",
            NodeCategory::Math,
            "Value limited to [min, max]",
            Operator::Custom(clamp),
        )
    });

    registry.register(NodeType {
        inputs: vec![
            Port::input("a", T::Scalar),
            Port::input("b", T::Scalar),
            Port::input("t", T::Scalar).with_default(Value::Scalar(0.5)),
        ],
        outputs: vec![Port::output("result", T::Scalar).with_label("Result")],
        ..entry(
            "lerp",
            "Lerp",
            NodeCategory::Math,
            "Linear interpolation from a to b",
            Operator::Custom(lerp),
        )
    });

    // ========================================================================
    // Logic
    // ========================================================================

    let compare: [CompareEntry; 3] = [
        ("equal", "Equal", "Whether a equals b", |a, b| a == b),
        ("greater", "Greater", "Whether a is greater than b", |a, b| a > b),
        ("less", "Less", "Whether a is less than b", |a, b| a < b),
    ];
    for (id, name, description, f) in compare {
        registry.register(NodeType {
            inputs: vec![Port::input("a", T::Scalar), Port::input("b", T::Scalar)],
            outputs: vec![Port::output("result", T::Boolean).with_label("Result")],
            ..entry(id, name, NodeCategory::Logic, description, Operator::Compare(f))
        });
    }

    let logic: [LogicEntry; 3] = [
        ("and", "And", "Both inputs true", |a, b| a && b),
        ("or", "Or", "Either input true", |a, b| a || b),
        ("xor", "Xor", "Exactly one input true", |a, b| a != b),
    ];
    for (id, name, description, f) in logic {
        registry.register(NodeType {
            inputs: vec![Port::input("a", T::Boolean), Port::input("b", T::Boolean)],
            outputs: vec![Port::output("result", T::Boolean).with_label("Result")],
            ..entry(id, name, NodeCategory::Logic, description, Operator::Logic(f))
        });
    }

    registry.register(NodeType {
        inputs: vec![Port::input("a", T::Boolean)],
        outputs: vec![Port::output("result", T::Boolean).with_label("Result")],
        ..entry("not", "Not", NodeCategory::Logic, "Inverted boolean", Operator::Not)
    });

    registry.register(NodeType {
        inputs: vec![
            Port::input("cond", T::Boolean).with_label("Condition"),
            Port::input("a", T::Scalar).with_label("If True"),
            Port::input("b", T::Scalar).with_label("If False"),
        ],
        outputs: vec![Port::output("result", T::Scalar).with_label("Result")],
        // only the branch that is picked has to be resolved
        input_rule: InputRule::Custom(select_ready),
        ..entry(
            "select",
            "Select",
            NodeCategory::Logic,
            "Pick a when the condition holds, otherwise b",
            Operator::Select,
        )
    });

    // ========================================================================
    // Vector
    // ========================================================================

    let component = |id: &str| Port::input(id, T::Scalar).with_default(Value::Scalar(0.0));

    registry.register(NodeType {
        inputs: vec![component("x"), component("y")],
        outputs: vec![Port::output("vector", T::Vector2)],
        ..entry(
            "make_vector2",
            "Make Vector2",
            NodeCategory::Vector,
            "Build a 2D vector from components",
            Operator::Custom(make_vector2),
        )
    });

    registry.register(NodeType {
        inputs: vec![component("x"), component("y"), component("z")],
        outputs: vec![Port::output("vector", T::Vector3)],
        ..entry(
            "make_vector3",
            "Make Vector3",
            NodeCategory::Vector,
            "Build a 3D vector from components",
            Operator::Custom(make_vector3),
        )
    });

    registry.register(NodeType {
        inputs: vec![component("x"), component("y"), component("z"), component("w")],
        outputs: vec![Port::output("vector", T::Vector4)],
        ..entry(
            "make_vector4",
            "Make Vector4",
            NodeCategory::Vector,
            "Build a 4D vector from components",
            Operator::Custom(make_vector4),
        )
    });

    registry.register(NodeType {
        inputs: vec![Port::input("vector", T::Vector3)],
        outputs: vec![
            Port::output("x", T::Scalar),
            Port::output("y", T::Scalar),
            Port::output("z", T::Scalar),
        ],
        ..entry(
            "split_vector3",
            "Split Vector3",
            NodeCategory::Vector,
            "Components of a 3D vector",
            Operator::Custom(split_vector3),
        )
    });

    let vector_ops: [(&str, &str, &str, OperatorFn, Vec<Port>, Port); 6] = [
        (
            "dot",
            "Dot Product",
            "Dot product of two 3D vectors",
            dot,
            vec![Port::input("a", T::Vector3), Port::input("b", T::Vector3)],
            Port::output("result", T::Scalar),
        ),
        (
            "cross",
            "Cross Product",
            "Cross product of two 3D vectors",
            cross,
            vec![Port::input("a", T::Vector3), Port::input("b", T::Vector3)],
            Port::output("result", T::Vector3),
        ),
        (
            "length",
            "Length",
            "Euclidean length of a 3D vector",
            length,
            vec![Port::input("vector", T::Vector3)],
            Port::output("result", T::Scalar),
        ),
        (
            "normalize",
            "Normalize",
            "Unit vector in the same direction",
            normalize,
            vec![Port::input("vector", T::Vector3)],
            Port::output("result", T::Vector3),
        ),
        (
            "vector_add",
            "Vector Add",
            "Component-wise sum of two 3D vectors",
            vector_add,
            vec![Port::input("a", T::Vector3), Port::input("b", T::Vector3)],
            Port::output("result", T::Vector3),
        ),
        (
            "vector_scale",
            "Vector Scale",
            "3D vector multiplied by a scalar",
            vector_scale,
            vec![
                Port::input("vector", T::Vector3),
                Port::input("factor", T::Scalar).with_default(Value::Scalar(1.0)),
            ],
            Port::output("result", T::Vector3),
        ),
    ];
    for (id, name, description, f, inputs, output) in vector_ops {
        registry.register(NodeType {
            inputs,
            outputs: vec![output.with_label("Result")],
            ..entry(id, name, NodeCategory::Vector, description, Operator::Custom(f))
        });
    }

    // ========================================================================
    // Conversion
    // ========================================================================

    let conversions = [
        ("to_scalar", "To Scalar", T::Integer, T::Scalar),
        ("to_integer", "To Integer", T::Scalar, T::Integer),
        ("to_boolean", "To Boolean", T::Scalar, T::Boolean),
        ("to_vector3", "To Vector3", T::Scalar, T::Vector3),
    ];
    for (id, name, from, to) in conversions {
        registry.register(NodeType {
            inputs: vec![Port::input("value", from)],
            outputs: vec![Port::output("value", to)],
            ..entry(
                id,
                name,
                NodeCategory::Conversion,
                &format!("Convert {from} into {to}"),
                Operator::Convert,
            )
        });
    }

    // ========================================================================
    // Sources
    // ========================================================================

    registry.register(NodeType {
        outputs: vec![Port::output("seconds", T::Scalar).with_label("Seconds")],
        ..entry(
            "time",
            "Time",
            NodeCategory::Source,
            "Wall-clock seconds, sampled once per pass",
            Operator::Time,
        )
    });

    registry.register(NodeType {
        inputs: vec![Port::input("seed", T::Integer).optional()],
        outputs: vec![Port::output("value", T::Scalar)],
        ..entry(
            "random",
            "Random",
            NodeCategory::Source,
            "Random value in [0, 1); reproducible when a seed is linked",
            Operator::Random,
        )
    });

    registry.register(NodeType {
        inputs: vec![Port::input("seed", T::Integer)],
        outputs: vec![Port::output("value", T::Scalar)],
        ..entry(
            "seeded_random",
            "Seeded Random",
            NodeCategory::Source,
            "Random value in [0, 1) determined by the seed",
            Operator::SeededRandom,
        )
    });

    registry
}
