// SPDX-License-Identifier: MIT OR Apache-2.0
//! Events raised for the editor layer to observe.

use crate::tab::{TabId, TabSettings};
use nodeflow_graph::{NodeId, NodeResult};

/// Something observable happened in the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A tab was created
    TabCreated(TabId),
    /// A tab became the active tab
    TabActivated(TabId),
    /// A tab was renamed
    TabRenamed {
        /// Renamed tab
        id: TabId,
        /// New name
        name: String,
    },
    /// A tab and its graph were destroyed
    TabClosed(TabId),
    /// A tab gained unsaved changes
    TabModified(TabId),
    /// A tab's changes were saved
    TabSaved(TabId),
    /// A tab's settings changed
    SettingsChanged {
        /// Affected tab
        id: TabId,
        /// Settings after the change
        settings: TabSettings,
    },
    /// A node was re-evaluated
    NodeRecomputed {
        /// Owning tab
        tab: TabId,
        /// Re-evaluated node
        node: NodeId,
        /// The node's new outputs, or why they are undefined
        result: NodeResult,
    },
}

impl SessionEvent {
    /// The tab this event concerns
    pub fn tab(&self) -> TabId {
        match self {
            Self::TabCreated(id)
            | Self::TabActivated(id)
            | Self::TabClosed(id)
            | Self::TabModified(id)
            | Self::TabSaved(id)
            | Self::TabRenamed { id, .. }
            | Self::SettingsChanged { id, .. } => *id,
            Self::NodeRecomputed { tab, .. } => *tab,
        }
    }
}
