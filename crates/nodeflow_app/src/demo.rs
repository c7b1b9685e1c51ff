// SPDX-License-Identifier: MIT OR Apache-2.0
//! Demo graphs: an arithmetic chain and a nested increment graph.

use crate::{print_results, AppResult};
use nodeflow_graph::{Graph, GraphError, Value, ValueType};
use nodeflow_session::TabManager;
use std::sync::Arc;

/// `a = 2`, `b = a * 2`, `c = b + 10`
fn build_chain(graph: &mut Graph) -> Result<(), GraphError> {
    let a = graph.add_node("scalar")?;
    graph.set_title(a, "a")?;
    graph.set_parameter(a, "value", Value::Scalar(2.0))?;

    let two = graph.add_node("scalar")?;
    graph.set_parameter(two, "value", Value::Scalar(2.0))?;
    let b = graph.add_node("multiply")?;
    graph.set_title(b, "b")?;
    graph.connect(a, "value", b, "a")?;
    graph.connect(two, "value", b, "b")?;

    let ten = graph.add_node("scalar")?;
    graph.set_parameter(ten, "value", Value::Scalar(10.0))?;
    let c = graph.add_node("add")?;
    graph.set_title(c, "c")?;
    graph.connect(b, "result", c, "a")?;
    graph.connect(ten, "value", c, "b")?;

    let out = graph.add_graph_output("c", ValueType::Scalar)?;
    graph.connect(c, "result", out, "value")?;
    Ok(())
}

/// Wrap `y = x + 1` as one node and feed it 3
fn build_nested(graph: &mut Graph) -> Result<(), GraphError> {
    let mut inner = Graph::new(Arc::clone(graph.catalog()));
    let x = inner.add_graph_input("x", ValueType::Scalar, Value::Scalar(0.0))?;
    let one = inner.add_node("scalar")?;
    inner.set_parameter(one, "value", Value::Scalar(1.0))?;
    let add = inner.add_node("add")?;
    let y = inner.add_graph_output("y", ValueType::Scalar)?;
    inner.connect(x, "value", add, "a")?;
    inner.connect(one, "value", add, "b")?;
    inner.connect(add, "result", y, "value")?;

    let three = graph.add_node("scalar")?;
    graph.set_parameter(three, "value", Value::Scalar(3.0))?;
    let wrapper = graph.add_subgraph("Increment", inner)?;
    graph.connect(three, "value", wrapper, "x")?;

    let out = graph.add_graph_output("y", ValueType::Scalar)?;
    graph.connect(wrapper, "y", out, "value")?;
    Ok(())
}

pub(crate) fn run(mut manager: TabManager) -> AppResult {
    let chain = manager.create_tab(Some("Chain"), None);
    manager.edit_active("Build chain", build_chain)?;
    manager.evaluate(chain)?;

    let nested = manager.create_tab(Some("Nested"), None);
    manager.edit_active("Build nested graph", build_nested)?;
    manager.evaluate(nested)?;

    for id in [chain, nested] {
        if let Some(tab) = manager.tab(id) {
            println!("{}", tab.name());
            print_results(tab.graph());
        }
    }

    // Change the chain's source and re-evaluate only what depends on it
    manager.set_active_tab(chain);
    let source = manager
        .active_tab()
        .and_then(|tab| tab.graph().nodes().find(|n| n.title == "a").map(|n| n.id));
    if let Some(source) = source {
        manager.edit_active("Set a = 5", |g| {
            g.set_parameter(source, "value", Value::Scalar(5.0))
        })?;
        let report = manager.evaluate_active()?;
        println!("Chain after a = 5 ({} nodes recomputed)", report.recomputed.len());
        if let Some(tab) = manager.active_tab() {
            print_results(tab.graph());
        }
    }

    println!("{}", manager.export_tab_json(nested)?);
    let events = manager.drain_events();
    for event in &events {
        tracing::debug!(tab = %event.tab(), ?event, "Session event");
    }
    tracing::info!(events = events.len(), "Demo finished");
    Ok(())
}
