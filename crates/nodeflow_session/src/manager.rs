// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tab manager: owns every open graph instance of a session.
//!
//! Exactly one tab is active at any time and the manager never ends up with
//! zero tabs. Closing a tab with unsaved changes needs an explicit
//! confirmation unless forced; the manager only exposes that decision point.

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::events::SessionEvent;
use crate::history::{History, StateSnapshot};
use crate::tab::{Tab, TabData, TabId, TabSettingsUpdate, TabState};
use indexmap::IndexMap;
use nodeflow_graph::{
    Catalog, EvaluationReport, Evaluator, Graph, GraphData, GraphError, IdPolicy,
};
use std::sync::Arc;

/// Result of a close request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The tab and its graph were destroyed
    Closed,
    /// The tab has unsaved changes; call `confirm_close` or `cancel_close`
    NeedsConfirmation,
    /// No open tab with that id
    NotFound,
}

/// Owner of all tabs in a session
pub struct TabManager {
    catalog: Arc<Catalog>,
    config: SessionConfig,
    tabs: IndexMap<TabId, Tab>,
    active: Option<TabId>,
    evaluator: Evaluator,
    events: Vec<SessionEvent>,
}

impl TabManager {
    /// Create a manager holding one default tab
    pub fn new(catalog: Arc<Catalog>, config: SessionConfig) -> Self {
        let evaluator = match config.random_seed {
            Some(seed) => Evaluator::with_seed(seed),
            None => Evaluator::new(),
        };
        let mut manager = Self {
            catalog,
            config,
            tabs: IndexMap::new(),
            active: None,
            evaluator,
            events: Vec::new(),
        };
        manager.create_tab(None, None);
        manager
    }

    /// Replace the evaluator (e.g. to install a fixed clock)
    pub fn with_evaluator(mut self, evaluator: Evaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// The catalog every tab's graph is built against
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create a tab and make it active.
    ///
    /// A missing name falls back to the configured default; a missing graph
    /// starts empty.
    pub fn create_tab(&mut self, name: Option<&str>, graph: Option<Graph>) -> TabId {
        let name = name.map_or_else(|| self.config.default_tab_name.clone(), str::to_string);
        let graph = graph.unwrap_or_else(|| Graph::new(Arc::clone(&self.catalog)));
        let tab = Tab::new(
            name,
            graph,
            self.config.default_settings.clone(),
            serde_json::Value::Null,
            History::with_max_depth(self.config.history_depth),
        );
        self.insert_tab(tab)
    }

    fn insert_tab(&mut self, tab: Tab) -> TabId {
        let id = tab.id;
        tracing::info!(tab = %id, name = %tab.name, "Created tab");
        self.tabs.insert(id, tab);
        self.events.push(SessionEvent::TabCreated(id));
        self.activate(id);
        id
    }

    fn activate(&mut self, id: TabId) {
        if self.active == Some(id) {
            if let Some(tab) = self.tabs.get_mut(&id) {
                tab.state = TabState::Active;
            }
            return;
        }

        if let Some(previous) = self.active.and_then(|prev| self.tabs.get_mut(&prev)) {
            if previous.state == TabState::Active {
                previous.state = TabState::Inactive;
            }
        }
        if let Some(tab) = self.tabs.get_mut(&id) {
            tab.state = TabState::Active;
            self.active = Some(id);
            self.events.push(SessionEvent::TabActivated(id));
            tracing::debug!(tab = %id, "Activated tab");
        }
    }

    /// Make a tab the active one.
    ///
    /// Returns `false` without changing anything if the id is unknown.
    /// Activating a tab that is waiting for close confirmation cancels the
    /// pending close.
    pub fn set_active_tab(&mut self, id: TabId) -> bool {
        if !self.tabs.contains_key(&id) {
            tracing::warn!(tab = %id, "Cannot activate unknown tab");
            return false;
        }
        self.activate(id);
        true
    }

    /// Rename a tab
    pub fn rename_tab(&mut self, id: TabId, name: impl Into<String>) -> Result<()> {
        let tab = self.tabs.get_mut(&id).ok_or(SessionError::TabNotFound(id))?;
        let name = name.into();
        if tab.name != name {
            tab.name = name.clone();
            tab.touch();
            tracing::debug!(tab = %id, name = %name, "Renamed tab");
            self.events.push(SessionEvent::TabRenamed { id, name });
        }
        Ok(())
    }

    /// Request that a tab be closed
    pub fn close_tab(&mut self, id: TabId, force: bool) -> CloseOutcome {
        let Some(tab) = self.tabs.get_mut(&id) else {
            return CloseOutcome::NotFound;
        };

        if !force && tab.unsaved {
            tab.state = TabState::Closing;
            tracing::debug!(tab = %id, "Close needs confirmation");
            return CloseOutcome::NeedsConfirmation;
        }

        self.destroy(id);
        CloseOutcome::Closed
    }

    /// Complete a close that returned `NeedsConfirmation`.
    ///
    /// Returns `NotFound` when no close is pending for the tab.
    pub fn confirm_close(&mut self, id: TabId) -> CloseOutcome {
        let pending = self
            .tabs
            .get(&id)
            .is_some_and(|tab| tab.state == TabState::Closing);
        if !pending {
            return CloseOutcome::NotFound;
        }
        self.destroy(id);
        CloseOutcome::Closed
    }

    /// Abandon a pending close, returning whether one was pending
    pub fn cancel_close(&mut self, id: TabId) -> bool {
        let is_active = self.active == Some(id);
        match self.tabs.get_mut(&id) {
            Some(tab) if tab.state == TabState::Closing => {
                tab.state = if is_active {
                    TabState::Active
                } else {
                    TabState::Inactive
                };
                true
            }
            _ => false,
        }
    }

    fn destroy(&mut self, id: TabId) {
        let Some(mut tab) = self.tabs.shift_remove(&id) else {
            return;
        };
        tab.state = TabState::Closed;
        tracing::info!(tab = %id, name = %tab.name, state = ?tab.state, "Closed tab");
        self.events.push(SessionEvent::TabClosed(id));

        if self.active == Some(id) {
            self.active = None;
            let next = self.tabs.keys().last().copied();
            match next {
                Some(next) => self.activate(next),
                None => {
                    self.create_tab(None, None);
                }
            }
        }
    }

    /// Change some of a tab's settings, returning whether anything changed
    pub fn update_tab_settings(&mut self, id: TabId, update: TabSettingsUpdate) -> Result<bool> {
        let tab = self.tabs.get_mut(&id).ok_or(SessionError::TabNotFound(id))?;
        if !update.apply(&mut tab.settings) {
            return Ok(false);
        }

        self.events.push(SessionEvent::SettingsChanged {
            id,
            settings: tab.settings.clone(),
        });
        set_unsaved(tab, &mut self.events);
        Ok(true)
    }

    /// Flag a tab as having unsaved changes
    pub fn mark_unsaved(&mut self, id: TabId) -> Result<()> {
        let tab = self.tabs.get_mut(&id).ok_or(SessionError::TabNotFound(id))?;
        set_unsaved(tab, &mut self.events);
        Ok(())
    }

    /// Flag a tab as saved
    pub fn mark_saved(&mut self, id: TabId) -> Result<()> {
        let tab = self.tabs.get_mut(&id).ok_or(SessionError::TabNotFound(id))?;
        if tab.unsaved {
            tab.unsaved = false;
            self.events.push(SessionEvent::TabSaved(id));
        }
        Ok(())
    }

    /// Get a tab by ID
    pub fn tab(&self, id: TabId) -> Option<&Tab> {
        self.tabs.get(&id)
    }

    /// All open tabs, in creation order
    pub fn tabs(&self) -> impl Iterator<Item = &Tab> {
        self.tabs.values()
    }

    /// Number of open tabs
    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    /// ID of the active tab
    pub fn active_tab_id(&self) -> Option<TabId> {
        self.active
    }

    /// The active tab
    pub fn active_tab(&self) -> Option<&Tab> {
        self.active.and_then(|id| self.tabs.get(&id))
    }

    fn active_id(&self) -> Result<TabId> {
        self.active.ok_or(SessionError::NoActiveTab)
    }

    /// Export a tab's name, settings and graph
    pub fn export_tab_data(&self, id: TabId) -> Result<TabData> {
        let tab = self.tabs.get(&id).ok_or(SessionError::TabNotFound(id))?;
        tracing::debug!(tab = %id, nodes = tab.graph.node_count(), "Exported tab");
        Ok(tab.to_data())
    }

    /// Export a tab as pretty JSON
    pub fn export_tab_json(&self, id: TabId) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_tab_data(id)?)?)
    }

    /// Open exported data as a new, saved, active tab with fresh ids
    pub fn import_tab_data(&mut self, data: TabData) -> Result<TabId> {
        let graph_data = GraphData {
            nodes: data.graph.nodes,
            links: data.graph.links,
        };
        let graph = Graph::from_data(&graph_data, Arc::clone(&self.catalog), IdPolicy::Fresh)?;
        tracing::info!(
            name = %data.name,
            nodes = graph.node_count(),
            links = graph.connection_count(),
            "Imported tab"
        );

        let tab = Tab::new(
            data.name,
            graph,
            data.settings,
            data.graph.viewport,
            History::with_max_depth(self.config.history_depth),
        );
        Ok(self.insert_tab(tab))
    }

    /// Import a tab from JSON
    pub fn import_tab_json(&mut self, json: &str) -> Result<TabId> {
        let data: TabData = serde_json::from_str(json)?;
        self.import_tab_data(data)
    }

    /// Edit the active tab's graph as one undoable step
    pub fn edit_active<T>(
        &mut self,
        description: &str,
        edit: impl FnOnce(&mut Graph) -> std::result::Result<T, GraphError>,
    ) -> Result<T> {
        let id = self.active_id()?;
        self.edit(id, description, edit)
    }

    /// Edit a tab's graph as one undoable step.
    ///
    /// If `edit` fails the graph is restored to its prior state and nothing
    /// is recorded. Edits that leave the saved shape unchanged (such as
    /// injecting a value) are not recorded either.
    pub fn edit<T>(
        &mut self,
        id: TabId,
        description: &str,
        edit: impl FnOnce(&mut Graph) -> std::result::Result<T, GraphError>,
    ) -> Result<T> {
        let tab = self.tabs.get_mut(&id).ok_or(SessionError::TabNotFound(id))?;
        let before = StateSnapshot::from_value(&tab.graph.to_data())?;
        let backup = tab.graph.clone();

        let value = match edit(&mut tab.graph) {
            Ok(value) => value,
            Err(err) => {
                tab.graph = backup;
                tracing::debug!(tab = %id, description, error = %err, "Rolled back edit");
                return Err(err.into());
            }
        };

        let after = StateSnapshot::from_value(&tab.graph.to_data())?;
        if after.data != before.data {
            tab.history.commit(description, before, after);
            tab.touch();
            set_unsaved(tab, &mut self.events);
            tracing::debug!(tab = %id, description, "Recorded edit");
        }
        Ok(value)
    }

    /// Undo the last edit of a tab
    pub fn undo(&mut self, id: TabId) -> Result<()> {
        let tab = self.tabs.get_mut(&id).ok_or(SessionError::TabNotFound(id))?;
        let operation = tab.history.undo()?;
        let data: GraphData = operation.before.to_value()?;
        tab.graph = Graph::from_data(&data, Arc::clone(&self.catalog), IdPolicy::Preserve)?;
        tab.touch();
        set_unsaved(tab, &mut self.events);
        tracing::info!(tab = %id, operation = %operation.description, "Undo");
        Ok(())
    }

    /// Redo the last undone edit of a tab
    pub fn redo(&mut self, id: TabId) -> Result<()> {
        let tab = self.tabs.get_mut(&id).ok_or(SessionError::TabNotFound(id))?;
        let operation = tab.history.redo()?;
        let data: GraphData = operation.after.to_value()?;
        tab.graph = Graph::from_data(&data, Arc::clone(&self.catalog), IdPolicy::Preserve)?;
        tab.touch();
        set_unsaved(tab, &mut self.events);
        tracing::info!(tab = %id, operation = %operation.description, "Redo");
        Ok(())
    }

    /// Evaluate the active tab's graph
    pub fn evaluate_active(&mut self) -> Result<EvaluationReport> {
        let id = self.active_id()?;
        self.evaluate(id)
    }

    /// Evaluate a tab's graph, raising one event per recomputed node
    pub fn evaluate(&mut self, id: TabId) -> Result<EvaluationReport> {
        let tab = self.tabs.get_mut(&id).ok_or(SessionError::TabNotFound(id))?;
        let report = self.evaluator.evaluate(&mut tab.graph)?;

        for &node in &report.recomputed {
            if let Some(result) = tab.graph.node_result(node) {
                self.events.push(SessionEvent::NodeRecomputed {
                    tab: id,
                    node,
                    result: result.clone(),
                });
            }
        }
        Ok(report)
    }

    /// Take every event raised since the last call
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }
}

fn set_unsaved(tab: &mut Tab, events: &mut Vec<SessionEvent>) {
    if !tab.unsaved {
        tab.unsaved = true;
        events.push(SessionEvent::TabModified(tab.id));
    }
}
