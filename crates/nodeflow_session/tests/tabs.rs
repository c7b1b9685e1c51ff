// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tab lifecycle and exchange-format behaviour.

use nodeflow_graph::{Catalog, Value, ValueType};
use nodeflow_session::{
    CloseOutcome, SessionConfig, SessionEvent, TabManager, TabSettingsUpdate, TabState,
};
use serde_json::json;

fn manager() -> TabManager {
    let config = SessionConfig {
        random_seed: Some(3),
        ..SessionConfig::default()
    };
    TabManager::new(Catalog::shared(), config)
}

#[test]
fn unsaved_last_tab_is_not_closed_without_confirmation() {
    let mut m = manager();
    let id = m.active_tab_id().unwrap();
    m.mark_unsaved(id).unwrap();

    assert_eq!(m.close_tab(id, false), CloseOutcome::NeedsConfirmation);
    assert_eq!(m.tab_count(), 1);
    assert_eq!(m.tab(id).unwrap().state(), TabState::Closing);

    assert!(m.cancel_close(id));
    assert_eq!(m.tab(id).unwrap().state(), TabState::Active);
    assert!(m.tab(id).unwrap().has_unsaved_changes());
}

#[test]
fn confirmed_close_replaces_last_tab() {
    let mut m = manager();
    let id = m.active_tab_id().unwrap();
    m.mark_unsaved(id).unwrap();

    assert_eq!(m.close_tab(id, false), CloseOutcome::NeedsConfirmation);
    assert_eq!(m.confirm_close(id), CloseOutcome::Closed);

    assert_eq!(m.tab_count(), 1);
    let fresh = m.active_tab().unwrap();
    assert_ne!(fresh.id(), id);
    assert!(!fresh.has_unsaved_changes());
}

#[test]
fn forced_close_of_last_tab_leaves_one_default_tab() {
    let mut m = manager();
    let id = m.active_tab_id().unwrap();
    m.edit_active("add", |g| g.add_node("scalar")).unwrap();
    m.drain_events();

    assert_eq!(m.close_tab(id, true), CloseOutcome::Closed);
    assert_eq!(m.tab_count(), 1);

    let tab = m.active_tab().unwrap();
    assert_eq!(tab.name(), "Untitled");
    assert_eq!(tab.graph().node_count(), 0);
    assert_eq!(tab.state(), TabState::Active);
    let fresh = tab.id();

    let events = m.drain_events();
    assert_eq!(events[0], SessionEvent::TabClosed(id));
    assert!(matches!(events[1], SessionEvent::TabCreated(_)));
    assert_eq!(events[1].tab(), fresh);
}

#[test]
fn closing_active_tab_activates_a_remaining_one() {
    let mut m = manager();
    let first = m.active_tab_id().unwrap();
    let second = m.create_tab(Some("Second"), None);
    let third = m.create_tab(Some("Third"), None);

    assert_eq!(m.close_tab(third, false), CloseOutcome::Closed);
    assert_eq!(m.active_tab_id(), Some(second));
    assert_eq!(m.tab(first).unwrap().state(), TabState::Inactive);

    // Closing an inactive tab leaves the active one alone
    assert_eq!(m.close_tab(first, false), CloseOutcome::Closed);
    assert_eq!(m.active_tab_id(), Some(second));
    assert_eq!(m.confirm_close(first), CloseOutcome::NotFound);
}

#[test]
fn export_import_round_trip() {
    let mut m = manager();
    let id = m.active_tab_id().unwrap();
    m.rename_tab(id, "Shading").unwrap();
    m.update_tab_settings(
        id,
        TabSettingsUpdate {
            snap_to_grid: Some(true),
            ..Default::default()
        },
    )
    .unwrap();

    m.edit_active("build", |g| {
        let a = g.add_node("scalar")?;
        g.set_parameter(a, "value", Value::Scalar(1.5))?;
        let b = g.add_node("vector3")?;
        let scale = g.add_node("vector_scale")?;
        g.connect(b, "value", scale, "vector")?;
        g.connect(a, "value", scale, "factor")?;
        g.add_graph_output("out", ValueType::Vector3)
            .and_then(|out| g.connect(scale, "result", out, "value"))
    })
    .unwrap();

    let mut data = m.export_tab_data(id).unwrap();
    data.graph.viewport = json!({ "zoom": 1.25, "pan": [10, -4] });
    let json = serde_json::to_string(&data).unwrap();

    let imported = m.import_tab_json(&json).unwrap();
    let round_trip = m.export_tab_data(imported).unwrap();

    assert_eq!(round_trip.name, "Shading");
    assert_eq!(round_trip.settings, data.settings);
    assert_eq!(round_trip.graph.viewport, data.graph.viewport);
    assert_eq!(round_trip.graph.nodes.len(), data.graph.nodes.len());
    assert_eq!(round_trip.graph.links.len(), data.graph.links.len());

    // Same topology and parameters, new ids
    for (before, after) in data.graph.nodes.iter().zip(&round_trip.graph.nodes) {
        assert_ne!(before.id, after.id);
        assert_eq!(before.node_type, after.node_type);
        assert_eq!(before.params, after.params);
        assert_eq!(before.boundary, after.boundary);
    }
    let position = |nodes: &[nodeflow_graph::NodeData], id| nodes.iter().position(|n| n.id == id);
    for (before, after) in data.graph.links.iter().zip(&round_trip.graph.links) {
        assert_eq!(
            position(data.graph.nodes.as_slice(), before.from_node),
            position(round_trip.graph.nodes.as_slice(), after.from_node)
        );
        assert_eq!(
            position(data.graph.nodes.as_slice(), before.to_node),
            position(round_trip.graph.nodes.as_slice(), after.to_node)
        );
        assert_eq!(before.from_port, after.from_port);
        assert_eq!(before.to_port, after.to_port);
    }

    let tab = m.tab(imported).unwrap();
    assert!(!tab.has_unsaved_changes());
    assert_eq!(m.active_tab_id(), Some(imported));
}

#[test]
fn import_rejects_invalid_graph() {
    let mut m = manager();
    let before = m.tab_count();
    let json = r#"{
        "name": "Bad",
        "graph": {
            "nodes": [{
                "id": "00000000-0000-0000-0000-000000000001",
                "node_type": "teleport",
                "title": "?",
                "position": [0.0, 0.0]
            }],
            "links": []
        }
    }"#;

    assert!(m.import_tab_json(json).is_err());
    assert_eq!(m.tab_count(), before);
}

#[test]
fn tabs_keep_separate_histories() {
    let mut m = manager();
    let first = m.active_tab_id().unwrap();
    m.edit_active("add", |g| g.add_node("scalar")).unwrap();

    let second = m.create_tab(None, None);
    m.edit_active("add", |g| g.add_node("boolean")).unwrap();
    m.edit_active("add", |g| g.add_node("boolean")).unwrap();

    m.undo(first).unwrap();
    assert_eq!(m.tab(first).unwrap().graph().node_count(), 0);
    assert_eq!(m.tab(second).unwrap().graph().node_count(), 2);
    assert!(m.tab(second).unwrap().history().can_undo());
}

#[test]
fn configured_seed_makes_sessions_reproducible() {
    let run = || {
        let mut m = manager();
        let node = m.edit_active("add", |g| g.add_node("random")).unwrap();
        m.evaluate_active().unwrap();
        m.active_tab().unwrap().graph().output_value(node, "value")
    };
    assert_eq!(run(), run());
}
