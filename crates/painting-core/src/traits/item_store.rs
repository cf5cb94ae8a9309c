// # Item Store Trait
//
// Defines the interface for reading and writing painting records.
//
// ## Purpose
//
// The store is the only owner of painting data. The notification engine
// reads from it during a sweep and never writes; the lending service writes
// through it and hands before/after snapshots to the engine.
//
// ## Implementations
//
// - In-memory: `MemoryItemStore`
// - SQLite single file: `SqliteItemStore`

use async_trait::async_trait;

use crate::model::{Painting, PaintingId};

/// Trait for painting record stores
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks. A sweep
/// may observe writes that land while it is running.
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
/// - ✅ Assign record ids
///
/// ## Forbidden Capabilities
/// - ❌ Send notifications (owned by `NotificationEngine`)
/// - ❌ Stamp audit fields (owned by `PaintingService`)
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// List paintings whose borrower name and email are both non-empty
    async fn list_lent_items(&self) -> Result<Vec<Painting>, crate::Error>;

    /// List every painting, ordered by id
    async fn list(&self) -> Result<Vec<Painting>, crate::Error>;

    /// Get a painting by id
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Painting))`: The record
    /// - `Ok(None)`: No such record
    /// - `Err(Error)`: Storage error
    async fn get(&self, id: PaintingId) -> Result<Option<Painting>, crate::Error>;

    /// Insert a new painting
    ///
    /// The store assigns the id. The `id` field of `painting` is ignored.
    async fn insert(&self, painting: &Painting) -> Result<Painting, crate::Error>;

    /// Overwrite an existing painting
    ///
    /// # Returns
    ///
    /// - `Err(Error::NotFound)`: No record with `painting.id`
    async fn update(&self, painting: &Painting) -> Result<(), crate::Error>;

    /// Delete a painting
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: The record existed and was removed
    /// - `Ok(false)`: There was no such record
    async fn delete(&self, id: PaintingId) -> Result<bool, crate::Error>;

    /// Get the store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}

/// Helper trait for constructing item stores from configuration
pub trait ItemStoreFactory: Send + Sync {
    /// Create an ItemStore instance from configuration
    fn create(&self, config: &serde_json::Value) -> Result<Box<dyn ItemStore>, crate::Error>;
}

