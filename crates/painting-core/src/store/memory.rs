// # Memory Item Store
//
// In-memory implementation of ItemStore.
//
// ## Purpose
//
// Provides a simple, fast store that doesn't persist across restarts.
// Useful for testing and for embedding the engine next to another store.
//
// ## Crash Behavior
//
// - All records are lost on restart/crash
// - Ids restart at 1

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::model::{Painting, PaintingId};
use crate::traits::item_store::{ItemStore, ItemStoreFactory};

/// In-memory item store implementation
///
/// Records live in a `BTreeMap` protected by a RwLock, so listing is ordered
/// by id.
///
/// # Example
///
/// ```rust,no_run
/// use painting_core::store::MemoryItemStore;
/// use painting_core::traits::ItemStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryItemStore::new();
///     let lent = store.list_lent_items().await?;
///     assert!(lent.is_empty());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryItemStore {
    inner: Arc<RwLock<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: BTreeMap<PaintingId, Painting>,
    last_id: i64,
}

impl MemoryItemStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }

    /// Clear all records from the store
    pub async fn clear(&self) {
        let mut guard = self.inner.write().await;
        guard.records.clear();
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn list_lent_items(&self) -> Result<Vec<Painting>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.records.values().filter(|p| p.is_lent()).cloned().collect())
    }

    async fn list(&self) -> Result<Vec<Painting>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.records.values().cloned().collect())
    }

    async fn get(&self, id: PaintingId) -> Result<Option<Painting>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.records.get(&id).cloned())
    }

    async fn insert(&self, painting: &Painting) -> Result<Painting, Error> {
        let mut guard = self.inner.write().await;
        guard.last_id += 1;
        let mut stored = painting.clone();
        stored.id = PaintingId(guard.last_id);
        guard.records.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, painting: &Painting) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        match guard.records.get_mut(&painting.id) {
            Some(slot) => {
                *slot = painting.clone();
                Ok(())
            }
            None => Err(Error::not_found(format!("painting {}", painting.id))),
        }
    }

    async fn delete(&self, id: PaintingId) -> Result<bool, Error> {
        let mut guard = self.inner.write().await;
        Ok(guard.records.remove(&id).is_some())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for the `memory` store type
pub struct MemoryItemStoreFactory;

impl ItemStoreFactory for MemoryItemStoreFactory {
    fn create(&self, _config: &serde_json::Value) -> Result<Box<dyn ItemStore>, Error> {
        Ok(Box::new(MemoryItemStore::new()))
    }
}
