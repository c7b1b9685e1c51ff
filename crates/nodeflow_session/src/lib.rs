// SPDX-License-Identifier: MIT OR Apache-2.0
//! Session and tab management for Nodeflow.
//!
//! A session owns any number of tabs, each holding exactly one graph
//! instance with its own undo history, settings and saved flag.
//!
//! ## Architecture
//!
//! - [`TabManager`] owns the tabs and enforces the lifecycle rules
//! - [`History`] stores bincode snapshots of a tab's graph per edit
//! - [`SessionEvent`]s queue up for the editor layer to drain
//! - [`SessionConfig`] is read from RON

pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod manager;
pub mod tab;

pub use config::SessionConfig;
pub use error::{HistoryError, SessionError};
pub use events::SessionEvent;
pub use history::History;
pub use manager::{CloseOutcome, TabManager};
pub use tab::{Tab, TabData, TabGraphData, TabId, TabSettings, TabSettingsUpdate, TabState};
