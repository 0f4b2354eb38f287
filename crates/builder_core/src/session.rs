//! Editing session: the item store together with its history.

use std::time::Instant;

use serde_json::Value as Json;
use shared::{
    domain::{Item, ItemId, Position},
    error::StoreError,
};
use tracing::debug;

use crate::{
    compose::{compose, RenderMode, RenderNode},
    config::BuilderSettings,
    history::HistoryManager,
    settle::{SettlePolicy, SettleWindow},
    store::{ItemPatch, ItemStore},
};

/// Owns the store. Edits go through the session so that settled bursts
/// land in history and undo/redo never get recorded as edits.
pub struct BuilderSession<P = SettleWindow> {
    store: ItemStore,
    history: HistoryManager,
    policy: P,
    mode: RenderMode,
}

impl BuilderSession<SettleWindow> {
    pub fn new(settings: &BuilderSettings) -> Self {
        Self::with_policy(settings, SettleWindow::new(settings.settle_window()))
    }
}

impl<P: SettlePolicy> BuilderSession<P> {
    pub fn with_policy(settings: &BuilderSettings, policy: P) -> Self {
        Self {
            store: ItemStore::with_grid_size(settings.grid_size),
            history: HistoryManager::new(settings.history_capacity, settings.guard_window()),
            policy,
            mode: settings.render_mode,
        }
    }

    /// Replaces the contents and starts a fresh history.
    pub fn load(&mut self, items: Vec<Item>) {
        self.store.replace_all(items);
        self.history.init(&self.store.snapshot());
        self.policy.reset();
        debug!(items = self.store.len(), "session loaded");
    }

    pub fn add_item(&mut self, item: Item) -> ItemId {
        let id = self.store.add_item(item);
        self.policy.note_edit(Instant::now());
        id
    }

    pub fn update_item(&mut self, id: &ItemId, patch: ItemPatch) -> Result<(), StoreError> {
        self.store.update_item(id, patch)?;
        self.policy.note_edit(Instant::now());
        Ok(())
    }

    pub fn remove_item(&mut self, id: &ItemId) -> Vec<ItemId> {
        let removed = self.store.remove_item(id);
        if !removed.is_empty() {
            self.policy.note_edit(Instant::now());
        }
        removed
    }

    pub fn move_item(&mut self, id: &ItemId, position: Position) -> Result<(), StoreError> {
        let before = self.store.revision();
        self.store.move_item(id, position)?;
        if self.store.revision() != before {
            self.policy.note_edit(Instant::now());
        }
        Ok(())
    }

    /// Records a history entry if the pending burst has settled by `now`.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.policy.poll(now) {
            return false;
        }
        self.history.record_at(&self.store.snapshot(), now)
    }

    /// Records the current state right away, ending any pending burst.
    pub fn commit(&mut self) -> bool {
        self.policy.reset();
        self.history.record(&self.store.snapshot())
    }

    pub fn undo(&mut self) -> bool {
        self.undo_at(Instant::now())
    }

    /// Undo on the same clock that drives [`tick`](Self::tick).
    pub fn undo_at(&mut self, now: Instant) -> bool {
        let restored = self.history.undo_at(now);
        self.apply_restored(restored)
    }

    pub fn redo(&mut self) -> bool {
        self.redo_at(Instant::now())
    }

    pub fn redo_at(&mut self, now: Instant) -> bool {
        let restored = self.history.redo_at(now);
        self.apply_restored(restored)
    }

    fn apply_restored(&mut self, restored: Option<Vec<Item>>) -> bool {
        let Some(items) = restored else {
            return false;
        };
        let generation = self.history.guard_generation();
        self.policy.reset();
        self.store.replace_all(items);
        self.history.release_guard(generation);
        true
    }

    pub fn compose(&self, context: &Json) -> Vec<RenderNode> {
        compose(&self.store, context, self.mode)
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        self.mode = mode;
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn is_dirty(&self) -> bool {
        self.policy.is_pending()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
