// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tabs: one owned graph instance plus its editor-facing metadata.

use crate::history::History;
use nodeflow_graph::{Graph, LinkData, NodeData};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Unique identifier for a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(pub Uuid);

impl TabId {
    /// Create a new random tab ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabState {
    /// Constructed but never shown
    Created,
    /// The one tab receiving edits
    Active,
    /// Open in the background
    Inactive,
    /// Close requested, waiting for confirmation
    Closing,
    /// Destroyed
    Closed,
}

/// Per-tab editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabSettings {
    /// Draw the background grid
    pub show_grid: bool,
    /// Snap node positions to the grid
    pub snap_to_grid: bool,
    /// Grid spacing in editor units
    pub grid_size: f32,
    /// Theme name
    pub theme: String,
}

impl Default for TabSettings {
    fn default() -> Self {
        Self {
            show_grid: true,
            snap_to_grid: false,
            grid_size: 20.0,
            theme: "dark".to_string(),
        }
    }
}

/// Partial settings change; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabSettingsUpdate {
    /// New grid visibility
    pub show_grid: Option<bool>,
    /// New snapping flag
    pub snap_to_grid: Option<bool>,
    /// New grid spacing
    pub grid_size: Option<f32>,
    /// New theme
    pub theme: Option<String>,
}

impl TabSettingsUpdate {
    /// Apply to `settings`, returning whether anything changed
    pub fn apply(self, settings: &mut TabSettings) -> bool {
        let before = settings.clone();
        if let Some(show_grid) = self.show_grid {
            settings.show_grid = show_grid;
        }
        if let Some(snap) = self.snap_to_grid {
            settings.snap_to_grid = snap;
        }
        if let Some(size) = self.grid_size {
            settings.grid_size = size;
        }
        if let Some(theme) = self.theme {
            settings.theme = theme;
        }
        *settings != before
    }
}

/// Graph part of the tab exchange shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabGraphData {
    /// Nodes in insertion order
    pub nodes: Vec<NodeData>,
    /// Links in insertion order
    pub links: Vec<LinkData>,
    /// Editor viewport, carried through untouched
    #[serde(default)]
    pub viewport: serde_json::Value,
}

/// Serializable shape of a tab for export and import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabData {
    /// Tab name
    pub name: String,
    /// Tab settings
    #[serde(default)]
    pub settings: TabSettings,
    /// Graph topology, parameters and viewport
    pub graph: TabGraphData,
}

/// A tab owning one graph instance
#[derive(Debug)]
pub struct Tab {
    pub(crate) id: TabId,
    pub(crate) name: String,
    pub(crate) state: TabState,
    pub(crate) graph: Graph,
    pub(crate) settings: TabSettings,
    pub(crate) viewport: serde_json::Value,
    pub(crate) unsaved: bool,
    pub(crate) history: History,
    pub(crate) created_at: u64,
    pub(crate) modified_at: u64,
}

impl Tab {
    pub(crate) fn new(
        name: String,
        graph: Graph,
        settings: TabSettings,
        viewport: serde_json::Value,
        history: History,
    ) -> Self {
        let now = now_secs();
        Self {
            id: TabId::new(),
            name,
            state: TabState::Created,
            graph,
            settings,
            viewport,
            unsaved: false,
            history,
            created_at: now,
            modified_at: now,
        }
    }

    /// Tab ID
    pub fn id(&self) -> TabId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lifecycle state
    pub fn state(&self) -> TabState {
        self.state
    }

    /// The owned graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Current settings
    pub fn settings(&self) -> &TabSettings {
        &self.settings
    }

    /// Opaque editor viewport
    pub fn viewport(&self) -> &serde_json::Value {
        &self.viewport
    }

    /// Check if the tab has unsaved changes
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Undo history of this tab
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Creation time (seconds since the Unix epoch)
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Last modification time (seconds since the Unix epoch)
    pub fn modified_at(&self) -> u64 {
        self.modified_at
    }

    pub(crate) fn touch(&mut self) {
        self.modified_at = now_secs();
    }

    /// Capture the exchange shape
    pub fn to_data(&self) -> TabData {
        let graph = self.graph.to_data();
        TabData {
            name: self.name.clone(),
            settings: self.settings.clone(),
            graph: TabGraphData {
                nodes: graph.nodes,
                links: graph.links,
                viewport: self.viewport.clone(),
            },
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_update_reports_change() {
        let mut settings = TabSettings::default();
        let unchanged = TabSettingsUpdate {
            show_grid: Some(true),
            ..Default::default()
        };
        assert!(!unchanged.apply(&mut settings));

        let update = TabSettingsUpdate {
            grid_size: Some(32.0),
            theme: Some("light".to_string()),
            ..Default::default()
        };
        assert!(update.apply(&mut settings));
        assert_eq!(settings.grid_size, 32.0);
        assert_eq!(settings.theme, "light");
        assert!(settings.show_grid);
    }

    #[test]
    fn test_missing_settings_use_defaults() {
        let data: TabData = serde_json::from_str(
            r#"{"name":"Empty","graph":{"nodes":[],"links":[]}}"#,
        )
        .unwrap();
        assert_eq!(data.settings, TabSettings::default());
        assert!(data.graph.viewport.is_null());
    }
}
