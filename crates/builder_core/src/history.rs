//! Snapshot history of the item store with undo/redo.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use shared::{domain::Item, protocol::serialize_items};
use tracing::{debug, warn};

pub const DEFAULT_CAPACITY: usize = 50;
pub const DEFAULT_GUARD_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
struct Snapshot {
    items: Vec<Item>,
    serialized: String,
}

impl Snapshot {
    fn capture(items: &[Item]) -> Self {
        let serialized = serialize_items(items).unwrap_or_else(|error| {
            warn!(%error, "failed to serialize history snapshot");
            String::new()
        });
        Self {
            items: items.to_vec(),
            serialized,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Guard {
    generation: u64,
    until: Instant,
}

/// Linear history with a cursor. Restoring an entry arms a guard so the
/// store change caused by the restore is not itself recorded.
#[derive(Debug)]
pub struct HistoryManager {
    stack: VecDeque<Snapshot>,
    cursor: Option<usize>,
    capacity: usize,
    guard_window: Duration,
    generation: u64,
    guard: Option<Guard>,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_GUARD_WINDOW)
    }
}

impl HistoryManager {
    pub fn new(capacity: usize, guard_window: Duration) -> Self {
        Self {
            stack: VecDeque::new(),
            cursor: None,
            capacity: capacity.max(1),
            guard_window,
            generation: 0,
            guard: None,
        }
    }

    pub fn init(&mut self, items: &[Item]) {
        self.stack.clear();
        self.stack.push_back(Snapshot::capture(items));
        self.cursor = Some(0);
        self.guard = None;
    }

    /// Appends `items` as a new entry when it differs from the current one.
    /// Returns whether an entry was added.
    pub fn record(&mut self, items: &[Item]) -> bool {
        self.record_at(items, Instant::now())
    }

    pub fn record_at(&mut self, items: &[Item], now: Instant) -> bool {
        if self.guard_active(now) {
            debug!("history restore in progress; skipping record");
            return false;
        }
        let Some(cursor) = self.cursor else {
            self.init(items);
            return true;
        };

        let snapshot = Snapshot::capture(items);
        if self
            .stack
            .get(cursor)
            .is_some_and(|current| current.serialized == snapshot.serialized)
        {
            return false;
        }

        self.stack.truncate(cursor + 1);
        self.stack.push_back(snapshot);
        while self.stack.len() > self.capacity {
            self.stack.pop_front();
        }
        self.cursor = Some(self.stack.len() - 1);
        debug!(entries = self.stack.len(), "history entry recorded");
        true
    }

    pub fn undo(&mut self) -> Option<Vec<Item>> {
        self.undo_at(Instant::now())
    }

    /// Steps back one entry. The restore guard runs from `now`, the same
    /// clock [`record_at`](Self::record_at) is checked against.
    pub fn undo_at(&mut self, now: Instant) -> Option<Vec<Item>> {
        let cursor = self.cursor.filter(|cursor| *cursor > 0)?;
        self.restore(cursor - 1, now)
    }

    pub fn redo(&mut self) -> Option<Vec<Item>> {
        self.redo_at(Instant::now())
    }

    pub fn redo_at(&mut self, now: Instant) -> Option<Vec<Item>> {
        let cursor = self.cursor.filter(|cursor| cursor + 1 < self.stack.len())?;
        self.restore(cursor + 1, now)
    }

    fn restore(&mut self, index: usize, now: Instant) -> Option<Vec<Item>> {
        let items = self.stack.get(index)?.items.clone();
        self.cursor = Some(index);
        self.generation += 1;
        self.guard = Some(Guard {
            generation: self.generation,
            until: now + self.guard_window,
        });
        Some(items)
    }

    /// Ends the guard armed by the restore with `generation`. A stale
    /// generation leaves a newer guard in place.
    pub fn release_guard(&mut self, generation: u64) -> bool {
        match self.guard {
            Some(guard) if guard.generation == generation => {
                self.guard = None;
                true
            }
            _ => false,
        }
    }

    pub fn guard_generation(&self) -> u64 {
        self.generation
    }

    pub fn guard_active(&self, now: Instant) -> bool {
        self.guard.is_some_and(|guard| now < guard.until)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|cursor| cursor > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor
            .is_some_and(|cursor| cursor + 1 < self.stack.len())
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current(&self) -> Option<&[Item]> {
        let cursor = self.cursor?;
        self.stack.get(cursor).map(|snapshot| snapshot.items.as_slice())
    }
}

#[cfg(test)]
#[path = "tests/history_tests.rs"]
mod tests;
