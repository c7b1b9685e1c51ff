// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-tab undo/redo history built on whole-graph snapshots.
//!
//! Every committed edit stores the graph's serialized shape before and after
//! the edit. Undo restores `before`, redo restores `after`.

use crate::error::HistoryError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum undo history depth
pub const MAX_HISTORY: usize = 100;

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Unique operation ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(u64);

/// Graph state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Serialized graph state
    pub data: Vec<u8>,
    /// Timestamp when snapshot was taken
    pub timestamp: u64,
    /// Size in bytes
    pub size: usize,
}

impl StateSnapshot {
    /// Create a new state snapshot
    pub fn new(data: Vec<u8>) -> Self {
        let size = data.len();
        Self {
            data,
            timestamp: now_secs(),
            size,
        }
    }

    /// Create from serializable value
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self> {
        let data = bincode::serialize(value)?;
        Ok(Self::new(data))
    }

    /// Deserialize to value
    pub fn to_value<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        Ok(bincode::deserialize(&self.data)?)
    }
}

/// An edit that can be undone/redone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Unique operation ID
    pub id: OperationId,
    /// Human-readable description
    pub description: String,
    /// State before the edit (for undo)
    pub before: StateSnapshot,
    /// State after the edit (for redo)
    pub after: StateSnapshot,
    /// Timestamp
    pub timestamp: u64,
}

impl Operation {
    /// Get memory size of this operation
    pub fn memory_size(&self) -> usize {
        self.before.size + self.after.size
    }
}

/// History statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Total operations in undo stack
    pub undo_count: usize,
    /// Total operations in redo stack
    pub redo_count: usize,
    /// Total memory used by history (bytes)
    pub memory_used: usize,
    /// Maximum history depth
    pub max_depth: usize,
}

/// Undo/redo history manager
#[derive(Debug)]
pub struct History {
    /// Undo stack
    undo_stack: VecDeque<Operation>,
    /// Redo stack
    redo_stack: VecDeque<Operation>,
    /// Next operation ID
    next_id: u64,
    /// Maximum history depth
    max_depth: usize,
    /// Total memory used by the undo stack
    memory_used: usize,
}

impl History {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            next_id: 1,
            max_depth,
            memory_used: 0,
        }
    }

    /// Record an edit
    pub fn commit(
        &mut self,
        description: impl Into<String>,
        before: StateSnapshot,
        after: StateSnapshot,
    ) -> OperationId {
        let id = OperationId(self.next_id);
        self.next_id += 1;

        // A new edit invalidates everything that was undone
        self.redo_stack.clear();

        let operation = Operation {
            id,
            description: description.into(),
            before,
            after,
            timestamp: now_secs(),
        };
        self.memory_used += operation.memory_size();
        self.undo_stack.push_back(operation);

        // Enforce history limit
        while self.undo_stack.len() > self.max_depth {
            if let Some(old) = self.undo_stack.pop_front() {
                self.memory_used = self.memory_used.saturating_sub(old.memory_size());
            }
        }

        id
    }

    /// Undo the last operation
    pub fn undo(&mut self) -> Result<Operation> {
        let operation = self
            .undo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToUndo)?;

        self.memory_used = self.memory_used.saturating_sub(operation.memory_size());
        self.redo_stack.push_back(operation.clone());

        Ok(operation)
    }

    /// Redo the last undone operation
    pub fn redo(&mut self) -> Result<Operation> {
        let operation = self
            .redo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToRedo)?;

        self.memory_used += operation.memory_size();
        self.undo_stack.push_back(operation.clone());

        Ok(operation)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
            memory_used: self.memory_used,
            max_depth: self.max_depth,
        }
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|op| op.description.as_str())
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|op| op.description.as_str())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(n: u32) -> StateSnapshot {
        StateSnapshot::from_value(&n).unwrap()
    }

    #[test]
    fn test_undo_redo_order() {
        let mut history = History::new();
        history.commit("first", snapshot(0), snapshot(1));
        history.commit("second", snapshot(1), snapshot(2));

        assert_eq!(history.undo_description(), Some("second"));
        let op = history.undo().unwrap();
        assert_eq!(op.before.to_value::<u32>().unwrap(), 1);
        assert_eq!(history.redo_description(), Some("second"));

        let op = history.redo().unwrap();
        assert_eq!(op.after.to_value::<u32>().unwrap(), 2);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_commit_clears_redo() {
        let mut history = History::new();
        history.commit("a", snapshot(0), snapshot(1));
        history.undo().unwrap();
        assert!(history.can_redo());

        history.commit("b", snapshot(0), snapshot(5));
        assert!(!history.can_redo());
        assert!(matches!(history.redo(), Err(HistoryError::NothingToRedo)));
    }

    #[test]
    fn test_depth_limit() {
        let mut history = History::with_max_depth(2);
        for i in 0..5 {
            history.commit(format!("edit {i}"), snapshot(i), snapshot(i + 1));
        }

        let stats = history.stats();
        assert_eq!(stats.undo_count, 2);
        assert_eq!(history.undo_description(), Some("edit 4"));
    }

    #[test]
    fn test_empty_history() {
        let mut history = History::default();
        assert!(matches!(history.undo(), Err(HistoryError::NothingToUndo)));
        assert_eq!(history.stats().memory_used, 0);
    }
}
