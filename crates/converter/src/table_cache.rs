//! Per-table view of destination metadata.
//!
//! Each table gets its own slot guarded by an async mutex, so alteration of
//! one table is serialized against every other record for that table while
//! different tables proceed independently. The outer map lock is only held
//! long enough to find or create a slot.

use std::collections::HashMap;
use std::sync::Arc;

use doris_core::TableDescriptor;
use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// What is known about one destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedTable {
    /// Confirmed to exist, columns not fetched yet.
    Unloaded,
    Loaded(Arc<TableDescriptor>),
}

/// Slot content; `None` means the table is not known to exist.
pub type TableSlot = Option<CachedTable>;

#[derive(Default)]
pub struct TableCache {
    slots: RwLock<HashMap<String, Arc<Mutex<TableSlot>>>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, table: &str) -> Arc<Mutex<TableSlot>> {
        if let Some(slot) = self.slots.read().get(table) {
            return slot.clone();
        }
        self.slots
            .write()
            .entry(table.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Exclusive access to the table's slot until the guard is dropped.
    pub async fn lock(&self, table: &str) -> OwnedMutexGuard<TableSlot> {
        self.slot(table).lock_owned().await
    }

    /// Loaded descriptor for `table`, if any.
    pub async fn get(&self, table: &str) -> Option<Arc<TableDescriptor>> {
        let slot = self.slots.read().get(table).cloned()?;
        let guard = slot.lock().await;
        match guard.as_ref() {
            Some(CachedTable::Loaded(d)) => Some(d.clone()),
            _ => None,
        }
    }

    /// Whether `table` has been confirmed to exist.
    pub async fn is_known(&self, table: &str) -> bool {
        let Some(slot) = self.slots.read().get(table).cloned() else {
            return false;
        };
        slot.lock().await.is_some()
    }
}
