// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end evaluation behaviour of the graph engine.

use nodeflow_graph::{
    Catalog, Evaluator, Graph, GraphError, IdPolicy, NodeError, NodeId, Value, ValueType,
};
use std::sync::Arc;

struct Chain {
    graph: Graph,
    a: NodeId,
    b: NodeId,
    c: NodeId,
}

/// A outputs 2, B doubles it, C adds 10
fn chain() -> Chain {
    let mut graph = Graph::new(Catalog::shared());

    let a = graph.add_node("scalar").unwrap();
    graph.set_parameter(a, "value", Value::Scalar(2.0)).unwrap();
    let two = graph.add_node("scalar").unwrap();
    graph.set_parameter(two, "value", Value::Scalar(2.0)).unwrap();
    let ten = graph.add_node("scalar").unwrap();
    graph.set_parameter(ten, "value", Value::Scalar(10.0)).unwrap();

    let b = graph.add_node("multiply").unwrap();
    graph.connect(a, "value", b, "a").unwrap();
    graph.connect(two, "value", b, "b").unwrap();

    let c = graph.add_node("add").unwrap();
    graph.connect(b, "result", c, "a").unwrap();
    graph.connect(ten, "value", c, "b").unwrap();

    Chain { graph, a, b, c }
}

#[test]
fn chain_evaluates_in_dependency_order() {
    let Chain { mut graph, a, b, c } = chain();
    let mut evaluator = Evaluator::with_seed(0);

    evaluator.evaluate(&mut graph).unwrap();
    assert_eq!(graph.output_value(b, "result"), Some(Value::Scalar(4.0)));
    assert_eq!(graph.output_value(c, "result"), Some(Value::Scalar(14.0)));

    graph.set_parameter(a, "value", Value::Scalar(5.0)).unwrap();
    evaluator.evaluate(&mut graph).unwrap();
    assert_eq!(graph.output_value(b, "result"), Some(Value::Scalar(10.0)));
    assert_eq!(graph.output_value(c, "result"), Some(Value::Scalar(20.0)));
}

#[test]
fn incremental_pass_matches_full_pass() {
    let Chain { mut graph, a, c, .. } = chain();
    let mut evaluator = Evaluator::with_seed(0);
    evaluator.evaluate(&mut graph).unwrap();

    graph.set_parameter(a, "value", Value::Integer(-3)).unwrap();
    evaluator.evaluate(&mut graph).unwrap();
    let incremental = graph.output_value(c, "result");

    evaluator.evaluate_full(&mut graph).unwrap();
    assert_eq!(graph.output_value(c, "result"), incremental);
    assert_eq!(incremental, Some(Value::Scalar(4.0)));
}

#[test]
fn evaluating_twice_is_idempotent() {
    let Chain { mut graph, .. } = chain();
    let mut evaluator = Evaluator::with_seed(0);

    evaluator.evaluate_full(&mut graph).unwrap();
    let first: Vec<_> = graph
        .node_ids()
        .map(|id| graph.node_result(id).cloned())
        .collect();
    evaluator.evaluate_full(&mut graph).unwrap();
    let second: Vec<_> = graph
        .node_ids()
        .map(|id| graph.node_result(id).cloned())
        .collect();

    assert_eq!(first, second);
}

#[test]
fn closing_a_cycle_is_rejected() {
    let Chain { mut graph, b, c, .. } = chain();
    let negate = graph.add_node("negate").unwrap();
    graph.connect(c, "result", negate, "a").unwrap();

    let before: Vec<_> = graph.connections().cloned().collect();
    assert_eq!(
        graph.connect(negate, "result", b, "a"),
        Err(GraphError::CyclicGraph)
    );
    let after: Vec<_> = graph.connections().cloned().collect();

    assert_eq!(before, after);
    assert!(graph.is_acyclic());
}

#[test]
fn missing_input_propagates_downstream() {
    let mut graph = Graph::new(Catalog::shared());
    let add = graph.add_node("add").unwrap();
    let constant = graph.add_node("scalar").unwrap();
    graph.connect(constant, "value", add, "a").unwrap();
    let negate = graph.add_node("negate").unwrap();
    graph.connect(add, "result", negate, "a").unwrap();

    let report = Evaluator::with_seed(0).evaluate(&mut graph).unwrap();

    assert_eq!(
        graph.node_result(add).and_then(|r| r.error()),
        Some(&NodeError::MissingInput {
            port: "b".to_string()
        })
    );
    assert_eq!(graph.output_value(negate, "result"), None);
    assert!(matches!(
        graph.node_result(negate).and_then(|r| r.error()),
        Some(NodeError::UpstreamUndefined { .. })
    ));
    assert_eq!(report.undefined.len(), 2);
    assert!(!report.is_clean());
}

#[test]
fn select_ignores_undefined_unpicked_branch() {
    let mut graph = Graph::new(Catalog::shared());
    let cond = graph.add_node("boolean").unwrap();
    graph.set_parameter(cond, "value", Value::Boolean(true)).unwrap();
    let four = graph.add_node("scalar").unwrap();
    graph.set_parameter(four, "value", Value::Scalar(4.0)).unwrap();
    let broken = graph.add_node("add").unwrap();
    graph.connect(four, "value", broken, "a").unwrap();

    let select = graph.add_node("select").unwrap();
    graph.connect(cond, "value", select, "cond").unwrap();
    graph.connect(four, "value", select, "a").unwrap();
    graph.connect(broken, "result", select, "b").unwrap();

    let mut evaluator = Evaluator::with_seed(0);
    evaluator.evaluate(&mut graph).unwrap();
    assert_eq!(graph.output_value(select, "result"), Some(Value::Scalar(4.0)));

    // Picking the undefined branch makes the select undefined
    graph.set_parameter(cond, "value", Value::Boolean(false)).unwrap();
    evaluator.evaluate(&mut graph).unwrap();
    assert_eq!(
        graph.node_result(select).and_then(|r| r.error()),
        Some(&NodeError::UpstreamUndefined {
            port: "b".to_string()
        })
    );
}

#[test]
fn links_follow_the_coercion_relation() {
    let catalog = Catalog::shared();
    for from in ValueType::ALL {
        for to in ValueType::ALL {
            let mut graph = Graph::new(Arc::clone(&catalog));
            let source = graph
                .add_graph_input("in", from, from.zero())
                .unwrap();
            let sink = graph.add_graph_output("out", to).unwrap();

            let linked = graph.connect(source, "value", sink, "value");
            let allowed = from == to || catalog.types.can_coerce(from, to);
            assert_eq!(linked.is_ok(), allowed, "{from} -> {to}");

            if allowed {
                Evaluator::with_seed(0).evaluate(&mut graph).unwrap();
                let value = graph.output_value_named("out").unwrap();
                assert!(catalog.types.is_valid(to, &value), "{from} -> {to}");
            }
        }
    }
}

fn increment() -> Graph {
    let mut inner = Graph::new(Catalog::shared());
    let x = inner
        .add_graph_input("x", ValueType::Scalar, Value::Scalar(0.0))
        .unwrap();
    let one = inner.add_node("scalar").unwrap();
    inner.set_parameter(one, "value", Value::Scalar(1.0)).unwrap();
    let add = inner.add_node("add").unwrap();
    let y = inner.add_graph_output("y", ValueType::Scalar).unwrap();
    inner.connect(x, "value", add, "a").unwrap();
    inner.connect(one, "value", add, "b").unwrap();
    inner.connect(add, "result", y, "value").unwrap();
    inner
}

#[test]
fn nested_graph_acts_as_one_node() {
    let mut graph = Graph::new(Catalog::shared());
    let three = graph.add_node("scalar").unwrap();
    graph.set_parameter(three, "value", Value::Scalar(3.0)).unwrap();
    let wrapper = graph.add_subgraph("Increment", increment()).unwrap();
    graph.connect(three, "value", wrapper, "x").unwrap();

    Evaluator::with_seed(0).evaluate(&mut graph).unwrap();
    assert_eq!(graph.output_value(wrapper, "y"), Some(Value::Scalar(4.0)));

    // The injection does not outlive the pass
    let inner = graph.node(wrapper).unwrap().subgraph().unwrap();
    let x = inner.boundary_inputs().unwrap()[0].node;
    assert_eq!(inner.node(x).unwrap().injected_value(), None);
}

#[test]
fn retitling_inner_nodes_keeps_wrapper_ports() {
    let mut graph = Graph::new(Catalog::shared());
    let source = graph.add_node("scalar").unwrap();
    let wrapper = graph.add_subgraph("Increment", increment()).unwrap();
    graph.connect(source, "value", wrapper, "x").unwrap();

    let ports_before: Vec<_> = graph.node(wrapper).unwrap().ports().cloned().collect();
    let inner_ids: Vec<_> = graph
        .node(wrapper)
        .unwrap()
        .subgraph()
        .unwrap()
        .node_ids()
        .collect();
    graph
        .update_subgraph(wrapper, |inner| {
            for id in inner_ids {
                inner.set_title(id, "renamed")?;
            }
            Ok(())
        })
        .unwrap();

    let ports_after: Vec<_> = graph.node(wrapper).unwrap().ports().cloned().collect();
    assert_eq!(ports_before, ports_after);
    assert_eq!(graph.connection_count(), 1);
}

#[test]
fn saved_graph_rebuilds_with_same_results() {
    let Chain { graph, .. } = chain();
    let data = graph.to_data();

    let mut rebuilt = Graph::from_data(&data, Catalog::shared(), IdPolicy::Fresh).unwrap();
    Evaluator::with_seed(0).evaluate(&mut rebuilt).unwrap();

    assert_eq!(rebuilt.node_count(), graph.node_count());
    assert_eq!(rebuilt.connection_count(), graph.connection_count());
    let results: Vec<_> = rebuilt
        .nodes()
        .filter(|n| n.node_type == "add")
        .filter_map(|n| rebuilt.output_value(n.id, "result"))
        .collect();
    assert_eq!(results, vec![Value::Scalar(14.0)]);
}
