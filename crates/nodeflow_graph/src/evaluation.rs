// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph evaluation and execution.
//!
//! A pass orders the nodes topologically, then evaluates every stale node
//! against the values its predecessors produced in that same pass. Nodes that
//! fail are recorded as undefined; the pass itself only fails when the graph
//! contains a cycle.

use crate::boundary;
use crate::error::{GraphError, NodeError};
use crate::graph::{Graph, NodeResult};
use crate::node::{NodeId, NodeKind};
use crate::operators::OperatorInputs;
use crate::types::{TypeRegistry, Value};
use indexmap::IndexMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the time value `time` nodes observe
pub trait Clock {
    /// Current time in seconds
    fn now_seconds(&self) -> f64;
}

/// Wall clock (seconds since the Unix epoch)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_seconds(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedClock(pub f64);

impl Clock for FixedClock {
    fn now_seconds(&self) -> f64 {
        self.0
    }
}

/// External state sampled once at the start of a pass
#[derive(Debug)]
pub struct PassEnv<'a> {
    /// Time every `time` node in the pass observes
    pub time: f64,
    /// Generator for unseeded random nodes
    pub rng: &'a mut ChaCha8Rng,
}

/// Result of one evaluation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReport {
    /// Nodes evaluated in this pass, in evaluation order
    pub recomputed: Vec<NodeId>,
    /// Nodes whose outputs are undefined after this pass
    pub undefined: Vec<(NodeId, NodeError)>,
}

impl EvaluationReport {
    /// Whether every recomputed node resolved
    pub fn is_clean(&self) -> bool {
        self.undefined.is_empty()
    }
}

/// Drives evaluation passes over graphs
pub struct Evaluator {
    clock: Box<dyn Clock>,
    rng: ChaCha8Rng,
}

impl Evaluator {
    /// Create an evaluator with the system clock and an entropy-seeded generator
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Create an evaluator whose unseeded random nodes are reproducible
    pub fn with_seed(seed: u64) -> Self {
        Self {
            clock: Box::new(SystemClock),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Re-evaluate every node affected by edits since the last pass
    pub fn evaluate(&mut self, graph: &mut Graph) -> Result<EvaluationReport, GraphError> {
        let mut env = PassEnv {
            time: self.clock.now_seconds(),
            rng: &mut self.rng,
        };
        let report = run_pass(graph, &mut env)?;
        tracing::debug!(
            recomputed = report.recomputed.len(),
            undefined = report.undefined.len(),
            "Evaluation pass finished"
        );
        Ok(report)
    }

    /// Re-evaluate every node
    pub fn evaluate_full(&mut self, graph: &mut Graph) -> Result<EvaluationReport, GraphError> {
        graph.mark_all_dirty();
        self.evaluate(graph)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

type Feeds = HashMap<(NodeId, String), (NodeId, String)>;

pub(crate) fn run_pass(
    graph: &mut Graph,
    env: &mut PassEnv<'_>,
) -> Result<EvaluationReport, GraphError> {
    let order = graph.topological_order()?;
    let stale = graph.take_stale(&order);
    let feeds: Feeds = graph
        .connections()
        .map(|c| {
            (
                (c.to_node, c.to_port.clone()),
                (c.from_node, c.from_port.clone()),
            )
        })
        .collect();
    let catalog = graph.catalog().clone();

    let mut report = EvaluationReport::default();
    for node_id in order {
        if !stale.contains(&node_id) {
            continue;
        }

        let result = evaluate_node(graph, node_id, &feeds, &catalog.types, env);
        if let NodeResult::Undefined(err) = &result {
            tracing::trace!(node = %node_id, error = %err, "Node undefined");
            report.undefined.push((node_id, err.clone()));
        }
        report.recomputed.push(node_id);
        graph.set_result(node_id, result);
    }

    Ok(report)
}

/// Input values of one node for one pass
struct ResolvedInputs {
    values: Vec<Option<Value>>,
    /// Linked ports whose source output is undefined this pass
    upstream_undefined: Vec<String>,
}

fn resolve_inputs(
    graph: &Graph,
    node_id: NodeId,
    feeds: &Feeds,
    types: &TypeRegistry,
) -> Result<ResolvedInputs, NodeError> {
    let mut resolved = ResolvedInputs {
        values: Vec::new(),
        upstream_undefined: Vec::new(),
    };
    let Some(node) = graph.node(node_id) else {
        return Ok(resolved);
    };

    resolved.values.reserve(node.inputs.len());
    for port in &node.inputs {
        let value = match feeds.get(&(node_id, port.id.clone())) {
            Some((source, source_port)) => {
                let source_type = graph
                    .node(*source)
                    .and_then(|n| n.output(source_port))
                    .map(|p| p.value_type);
                match (graph.output_value(*source, source_port), source_type) {
                    (Some(value), Some(source_type)) => {
                        let converted = types
                            .coerce(value, source_type, port.value_type)
                            .map_err(|_| NodeError::Incompatible {
                                port: port.id.clone(),
                            })?;
                        Some(converted)
                    }
                    // Left to the node's input rule
                    _ => {
                        resolved.upstream_undefined.push(port.id.clone());
                        None
                    }
                }
            }
            None if port.optional => port.default_value,
            None => None,
        };
        resolved.values.push(value);
    }
    Ok(resolved)
}

fn evaluate_node(
    graph: &mut Graph,
    node_id: NodeId,
    feeds: &Feeds,
    types: &TypeRegistry,
    env: &mut PassEnv<'_>,
) -> NodeResult {
    let resolved = resolve_inputs(graph, node_id, feeds, types);
    let Some(node) = graph.node_mut(node_id) else {
        return NodeResult::Undefined(NodeError::MissingInput {
            port: String::new(),
        });
    };

    let produced = resolved.and_then(|resolved| {
        let inputs = OperatorInputs::new(&node.inputs, &resolved.values, &node.params);
        node.check_inputs(&inputs, &resolved.upstream_undefined)?;

        match &mut node.kind {
            NodeKind::Operator(op) => op.apply(&inputs, &node.outputs, types, env),
            NodeKind::GraphInput { injected, .. } => {
                let value = injected
                    .or_else(|| node.params.get("default").map(|p| p.value))
                    .ok_or_else(|| NodeError::MissingParameter {
                        name: "default".to_string(),
                    })?;
                Ok(vec![value])
            }
            NodeKind::GraphOutput { last_value, .. } => {
                *last_value = inputs.value("value");
                Ok(Vec::new())
            }
            NodeKind::Subgraph(inner) => boundary::evaluate_subgraph(inner, &inputs, env),
        }
    });

    let values = match produced {
        Ok(values) => values,
        Err(err) => {
            if let NodeKind::GraphOutput { last_value, .. } = &mut node.kind {
                *last_value = None;
            }
            return NodeResult::Undefined(err);
        }
    };

    // Partial output is not a valid result
    if values.len() != node.outputs.len() {
        return NodeResult::Undefined(NodeError::PartialOutput {
            expected: node.outputs.len(),
            produced: values.len(),
        });
    }

    let mut outputs = IndexMap::with_capacity(values.len());
    for (port, value) in node.outputs.iter().zip(values) {
        if !types.is_valid(port.value_type, &value) {
            return NodeResult::Undefined(NodeError::InvalidOutput {
                port: port.id.clone(),
            });
        }
        outputs.insert(port.id.clone(), value);
    }
    NodeResult::Resolved(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn test_time_is_sampled_once_per_pass() {
        let mut g = Graph::new(Catalog::shared());
        let t1 = g.add_node("time").unwrap();
        let t2 = g.add_node("time").unwrap();

        let mut evaluator = Evaluator::with_seed(1).with_clock(FixedClock(3.5));
        evaluator.evaluate(&mut g).unwrap();

        assert_eq!(g.output_value(t1, "seconds"), Some(Value::Scalar(3.5)));
        assert_eq!(g.output_value(t1, "seconds"), g.output_value(t2, "seconds"));
    }

    #[test]
    fn test_unchanged_graph_recomputes_nothing() {
        let mut g = Graph::new(Catalog::shared());
        let c = g.add_node("scalar").unwrap();
        let n = g.add_node("negate").unwrap();
        g.connect(c, "value", n, "a").unwrap();

        let mut evaluator = Evaluator::with_seed(1);
        let first = evaluator.evaluate(&mut g).unwrap();
        assert_eq!(first.recomputed, vec![c, n]);

        let second = evaluator.evaluate(&mut g).unwrap();
        assert!(second.recomputed.is_empty());
    }

    #[test]
    fn test_volatile_nodes_always_rerun() {
        let mut g = Graph::new(Catalog::shared());
        let r = g.add_node("random").unwrap();
        let n = g.add_node("negate").unwrap();
        g.connect(r, "value", n, "a").unwrap();

        let mut evaluator = Evaluator::with_seed(9);
        evaluator.evaluate(&mut g).unwrap();
        let second = evaluator.evaluate(&mut g).unwrap();
        assert_eq!(second.recomputed, vec![r, n]);
    }

    #[test]
    fn test_same_seed_same_random_sequence() {
        let sample = || {
            let mut g = Graph::new(Catalog::shared());
            let r = g.add_node("random").unwrap();
            Evaluator::with_seed(5).evaluate(&mut g).unwrap();
            g.output_value(r, "value")
        };
        assert_eq!(sample(), sample());
    }

    #[test]
    fn test_edit_only_recomputes_downstream() {
        let mut g = Graph::new(Catalog::shared());
        let a = g.add_node("scalar").unwrap();
        let b = g.add_node("scalar").unwrap();
        let na = g.add_node("negate").unwrap();
        let nb = g.add_node("negate").unwrap();
        g.connect(a, "value", na, "a").unwrap();
        g.connect(b, "value", nb, "a").unwrap();

        let mut evaluator = Evaluator::with_seed(1);
        evaluator.evaluate(&mut g).unwrap();

        g.set_parameter(a, "value", Value::Scalar(4.0)).unwrap();
        let report = evaluator.evaluate(&mut g).unwrap();
        assert_eq!(report.recomputed, vec![a, na]);
        assert_eq!(g.output_value(na, "result"), Some(Value::Scalar(-4.0)));
    }
}
