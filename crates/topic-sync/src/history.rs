//! Undo/redo history
//!
//! Snapshot stacks of whole [`TopicState`]s. Snapshots are cheap enough at
//! topic scale and make undo an exact inverse of the commit it reverts.

use std::collections::VecDeque;
use topic_graph::TopicState;

/// Default number of undo snapshots kept
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Undo and redo stacks
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<TopicState>,
    redo: Vec<TopicState>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    /// History keeping at most `limit` undo snapshots (oldest dropped first)
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record the state before a commit; clears redo
    pub fn record(&mut self, previous: TopicState) {
        if self.undo.len() == self.limit {
            self.undo.pop_front();
        }
        self.undo.push_back(previous);
        self.redo.clear();
    }

    /// Step back: returns the state to restore, remembering `current` for redo
    pub fn undo(&mut self, current: TopicState) -> Option<TopicState> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Step forward: returns the state to restore, remembering `current` for undo
    pub fn redo(&mut self, current: TopicState) -> Option<TopicState> {
        let next = self.redo.pop()?;
        self.undo.push_back(current);
        Some(next)
    }

    /// Forget everything (after a load)
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    #[inline]
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    #[inline]
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    #[inline]
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }
}
