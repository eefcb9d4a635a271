//! Cross-page, cross-state selection of workbox items.
//!
//! Membership is keyed by [`ItemUri`] only. Every mutation that changes
//! membership is written through to the [`KeyValueStore`] before it takes
//! effect, so a failed write leaves the selection unchanged.

use crate::domain::{ItemUri, StateId, WorkboxError, WorkboxItem};
use crate::storage::KeyValueStore;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Storage key of the persisted selection.
pub const SELECTION_STORAGE_KEY: &str = "workbox.selected-items";

/// Current selection document version.
pub const SELECTION_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SelectionDocument {
    version: u32,
    saved_at: DateTime<Utc>,
    items: Vec<WorkboxItem>,
}

pub struct SelectionSet {
    items: Vec<WorkboxItem>,
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SelectionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionSet")
            .field("items", &self.items.len())
            .finish()
    }
}

impl SelectionSet {
    /// An empty selection that persists into `store`. Nothing is written until
    /// the first mutation.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            items: Vec::new(),
            store,
        }
    }

    /// Loads the selection saved under [`SELECTION_STORAGE_KEY`], or an empty
    /// one if nothing was saved yet.
    pub fn restore(store: Arc<dyn KeyValueStore>) -> Result<Self, WorkboxError> {
        let stored = store
            .get(SELECTION_STORAGE_KEY)
            .map_err(|e| WorkboxError::storage(&e))?;

        let Some(stored) = stored else {
            return Ok(Self::new(store));
        };

        let document: SelectionDocument = serde_json::from_value(stored)
            .context("Failed to parse stored selection")
            .map_err(|e| WorkboxError::storage(&e))?;

        if document.version > SELECTION_VERSION {
            return Err(WorkboxError::StorageFailure {
                message: format!(
                    "Stored selection version {} is newer than supported version {}",
                    document.version, SELECTION_VERSION
                ),
            });
        }

        let mut selection = Self::new(store);
        for item in document.items {
            selection.insert(item);
        }
        tracing::debug!(items = selection.len(), "selection restored");
        Ok(selection)
    }

    /// Writes the full selection to storage.
    pub fn persist(&self) -> Result<(), WorkboxError> {
        self.write(&self.items)
    }

    pub fn add(&mut self, item: WorkboxItem) -> Result<bool, WorkboxError> {
        if self.contains(&item.uri) {
            return Ok(false);
        }
        let mut next = self.items.clone();
        next.push(item);
        self.commit(next)
    }

    pub fn remove(&mut self, uri: &ItemUri) -> Result<bool, WorkboxError> {
        self.remove_all(std::iter::once(uri))
    }

    /// Removes every uri in `uris` with a single write.
    pub fn remove_all<'a>(
        &mut self,
        uris: impl IntoIterator<Item = &'a ItemUri>,
    ) -> Result<bool, WorkboxError> {
        let uris: HashSet<&ItemUri> = uris.into_iter().collect();
        let next: Vec<WorkboxItem> = self
            .items
            .iter()
            .filter(|i| !uris.contains(&i.uri))
            .cloned()
            .collect();
        if next.len() == self.items.len() {
            return Ok(false);
        }
        self.commit(next)
    }

    /// Adds the visible items that are in the browsed state. Others are skipped
    /// even when visible.
    pub fn select_all_visible(&mut self, visible: &[WorkboxItem]) -> Result<bool, WorkboxError> {
        let mut next = self.items.clone();
        for item in visible.iter().filter(|i| i.is_current_for_selected_state) {
            if !next.iter().any(|i| i.uri == item.uri) {
                next.push(item.clone());
            }
        }
        if next.len() == self.items.len() {
            return Ok(false);
        }
        self.commit(next)
    }

    /// Removes every visible item regardless of its state.
    pub fn deselect_all_visible(&mut self, visible: &[WorkboxItem]) -> Result<bool, WorkboxError> {
        self.remove_all(visible.iter().map(|i| &i.uri))
    }

    pub fn count_for_state(&self, state_id: StateId) -> usize {
        self.items
            .iter()
            .filter(|i| i.workflow_state_id == state_id)
            .count()
    }

    /// Selected items in `state_id`, sorted by path.
    pub fn items_for_state(&self, state_id: StateId) -> Vec<WorkboxItem> {
        let mut items: Vec<WorkboxItem> = self
            .items
            .iter()
            .filter(|i| i.workflow_state_id == state_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.path.cmp(&b.path));
        items
    }

    /// All selected items in selection order.
    pub fn items(&self) -> &[WorkboxItem] {
        &self.items
    }

    pub fn contains(&self, uri: &ItemUri) -> bool {
        self.items.iter().any(|i| &i.uri == uri)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn insert(&mut self, item: WorkboxItem) -> bool {
        if self.contains(&item.uri) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Replaces the selection with `next` once it is stored. On a failed
    /// write the selection is left as it was.
    fn commit(&mut self, next: Vec<WorkboxItem>) -> Result<bool, WorkboxError> {
        self.write(&next)?;
        self.items = next;
        Ok(true)
    }

    fn write(&self, items: &[WorkboxItem]) -> Result<(), WorkboxError> {
        let document = SelectionDocument {
            version: SELECTION_VERSION,
            saved_at: Utc::now(),
            items: items.to_vec(),
        };
        let value = serde_json::to_value(&document)
            .context("Failed to serialize selection")
            .map_err(|e| WorkboxError::storage(&e))?;
        self.store
            .set(SELECTION_STORAGE_KEY, &value)
            .map_err(|e| WorkboxError::storage(&e))
    }
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
