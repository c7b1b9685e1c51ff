// SPDX-License-Identifier: MIT OR Apache-2.0
//! Session error types.

use crate::tab::TabId;
use nodeflow_graph::GraphError;
use thiserror::Error;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Errors raised by the tab manager
#[derive(Debug, Error)]
pub enum SessionError {
    /// No tab with this id
    #[error("Tab not found: {0}")]
    TabNotFound(TabId),

    /// The session has no active tab
    #[error("No active tab")]
    NoActiveTab,

    /// A graph mutation or rebuild failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Undo/redo failed
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Tab JSON could not be read or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file is not valid RON
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] ron::de::SpannedError),

    /// Configuration could not be written
    #[error("Config write error: {0}")]
    ConfigWrite(#[from] ron::Error),

    /// File I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
