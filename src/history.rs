//! Bounded log of submitted queries with cursor navigation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Older,
    Newer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub raw_query: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(raw_query: impl Into<String>) -> Self {
        Self {
            raw_query: raw_query.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryLedger {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    /// Index into `entries`; `None` is "past the newest".
    cursor: Option<usize>,
}

impl Default for HistoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            cursor: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a query. Content is not validated and duplicates are kept.
    pub fn record(&mut self, raw_query: impl Into<String>) {
        self.push(HistoryEntry::new(raw_query));
        self.cursor = None;
    }

    fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Step the cursor and return the entry under it.
    ///
    /// `Older` from the rest position lands on the newest entry and then stops
    /// at the oldest. `Newer` past the newest entry returns `None` and puts the
    /// cursor back at rest.
    pub fn navigate(&mut self, direction: Direction) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;

        self.cursor = match (direction, self.cursor) {
            (Direction::Older, None) => Some(last),
            (Direction::Older, Some(i)) => Some(i.saturating_sub(1)),
            (Direction::Newer, None) => None,
            (Direction::Newer, Some(i)) if i >= last => None,
            (Direction::Newer, Some(i)) => Some(i + 1),
        };

        self.cursor
            .and_then(|i| self.entries.get(i))
            .map(|e| e.raw_query.clone())
    }

    /// Raw queries, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.raw_query.clone()).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> + '_ {
        self.entries.iter()
    }

    /// Replace the contents with a persisted sequence, oldest first. Only the
    /// newest `capacity` entries are kept.
    pub fn restore(&mut self, raw_queries: Vec<String>) {
        self.restore_entries(raw_queries.into_iter().map(HistoryEntry::new).collect());
    }

    pub fn restore_entries(&mut self, entries: Vec<HistoryEntry>) {
        self.entries.clear();
        for entry in entries {
            self.push(entry);
        }
        self.cursor = None;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}
