// SPDX-License-Identifier: MIT OR Apache-2.0
//! Session configuration, stored as RON.

use crate::error::Result;
use crate::history::MAX_HISTORY;
use crate::tab::TabSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings that shape every tab a session creates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name given to tabs created without one
    pub default_tab_name: String,
    /// Undo depth per tab
    pub history_depth: usize,
    /// Settings of newly created tabs
    pub default_settings: TabSettings,
    /// Fixed seed for unseeded random nodes; entropy when unset
    pub random_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_tab_name: "Untitled".to_string(),
            history_depth: MAX_HISTORY,
            default_settings: TabSettings::default(),
            random_seed: None,
        }
    }
}

impl SessionConfig {
    /// Parse a RON document; missing fields take their defaults
    pub fn from_ron_str(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded session config");
        Ok(config)
    }

    /// Render as pretty RON
    pub fn to_ron_string(&self) -> Result<String> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }
}
