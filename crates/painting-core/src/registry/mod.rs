//! Plugin-based component registry
//!
//! The registry lets email senders and record stores be registered at
//! runtime and built from configuration, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use painting_core::registry::ComponentRegistry;
//! use painting_core::config::{SenderConfig, StoreConfig};
//!
//! // Built-in stores (memory, sqlite) are already registered
//! let registry = ComponentRegistry::with_builtin_stores();
//!
//! // Sender crates register themselves
//! painting_mail_resend::register(&registry);
//!
//! let store = registry.create_store(&StoreConfig::Sqlite { path: "./database.sqlite".into() })?;
//! let sender = registry.create_sender(&SenderConfig::Disabled)?; // None
//! ```
//!
//! ## Registration
//!
//! ```rust,ignore
//! // In painting-mail-resend
//! pub fn register(registry: &ComponentRegistry) {
//!     registry.register_sender("resend", Box::new(ResendFactory));
//! }
//! ```

use crate::config::{SenderConfig, StoreConfig};
use crate::error::{Error, Result};
use crate::store::{MemoryItemStoreFactory, SqliteItemStoreFactory};
use crate::traits::{EmailSender, EmailSenderFactory, ItemStore, ItemStoreFactory};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Registry of sender and store factories
///
/// ## Thread Safety
///
/// Interior mutability through `RwLock`: concurrent reads, exclusive writes.
/// A poisoned lock is recovered rather than propagated, since the maps are
/// only ever replaced entry by entry.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Registered email sender factories
    senders: RwLock<HashMap<String, Box<dyn EmailSenderFactory>>>,

    /// Registered record store factories
    stores: RwLock<HashMap<String, Box<dyn ItemStoreFactory>>>,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the `memory` and `sqlite` stores registered
    pub fn with_builtin_stores() -> Self {
        let registry = Self::new();
        registry.register_store("memory", Box::new(MemoryItemStoreFactory));
        registry.register_store("sqlite", Box::new(SqliteItemStoreFactory));
        registry
    }

    /// Register an email sender factory
    ///
    /// # Parameters
    ///
    /// - `name`: Sender type name (e.g., "resend")
    /// - `factory`: Factory object for creating sender instances
    pub fn register_sender(&self, name: impl Into<String>, factory: Box<dyn EmailSenderFactory>) {
        let mut senders = self.senders.write().unwrap_or_else(PoisonError::into_inner);
        senders.insert(name.into(), factory);
    }

    /// Register a record store factory
    ///
    /// # Parameters
    ///
    /// - `name`: Store type name (e.g., "sqlite", "memory")
    /// - `factory`: Factory object for creating store instances
    pub fn register_store(&self, name: impl Into<String>, factory: Box<dyn ItemStoreFactory>) {
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        stores.insert(name.into(), factory);
    }

    /// Create an email sender from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(None)`: Notifications are disabled
    /// - `Ok(Some(sender))`: Created sender instance
    /// - `Err(Error)`: If the sender type is not registered or creation fails
    pub fn create_sender(&self, config: &SenderConfig) -> Result<Option<Arc<dyn EmailSender>>> {
        if matches!(config, SenderConfig::Disabled) {
            return Ok(None);
        }

        let sender_type = config.type_name();
        let senders = self.senders.read().unwrap_or_else(PoisonError::into_inner);

        let factory = senders
            .get(sender_type)
            .ok_or_else(|| Error::config(format!("Unknown sender type: {}", sender_type)))?;

        factory.create(config).map(|sender| Some(Arc::from(sender)))
    }

    /// Create a record store from configuration
    ///
    /// Built-in store types receive their whole tagged config as JSON. Custom
    /// stores receive their own `config` value.
    pub fn create_store(&self, config: &StoreConfig) -> Result<Arc<dyn ItemStore>> {
        let store_type = config.type_name();
        let config_json = match config {
            StoreConfig::Custom { config, .. } => config.clone(),
            other => serde_json::to_value(other)?,
        };

        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);

        let factory = stores
            .get(store_type)
            .ok_or_else(|| Error::config(format!("Unknown store type: {}", store_type)))?;

        factory.create(&config_json).map(Arc::from)
    }

    /// List all registered sender types
    pub fn list_senders(&self) -> Vec<String> {
        let senders = self.senders.read().unwrap_or_else(PoisonError::into_inner);
        senders.keys().cloned().collect()
    }

    /// List all registered store types
    pub fn list_stores(&self) -> Vec<String> {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.keys().cloned().collect()
    }

    /// Check if a sender type is registered
    pub fn has_sender(&self, name: &str) -> bool {
        let senders = self.senders.read().unwrap_or_else(PoisonError::into_inner);
        senders.contains_key(name)
    }

    /// Check if a store type is registered
    pub fn has_store(&self, name: &str) -> bool {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockSenderFactory;

    impl EmailSenderFactory for MockSenderFactory {
        fn create(&self, _config: &SenderConfig) -> Result<Box<dyn EmailSender>> {
            Err(Error::not_found("Mock sender not implemented"))
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = ComponentRegistry::new();
        assert!(!registry.has_sender("mock"));

        registry.register_sender("mock", Box::new(MockSenderFactory));

        assert!(registry.has_sender("mock"));
        assert!(registry.list_senders().contains(&"mock".to_string()));
    }

    #[test]
    fn disabled_sender_is_none() {
        let registry = ComponentRegistry::new();
        assert!(registry.create_sender(&SenderConfig::Disabled).unwrap().is_none());
    }

    #[test]
    fn unknown_sender_type_is_a_config_error() {
        let registry = ComponentRegistry::new();
        let config = SenderConfig::Resend {
            api_key: "re_1".to_string(),
            from: "a@b.c".to_string(),
        };
        let err = registry.create_sender(&config).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn builtin_stores_are_available() {
        let registry = ComponentRegistry::with_builtin_stores();
        assert!(registry.has_store("memory"));
        assert!(registry.has_store("sqlite"));

        let store = registry.create_store(&StoreConfig::Memory).unwrap();
        assert_eq!(store.store_name(), "memory");
        assert!(store.list().await.unwrap().is_empty());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.sqlite").to_string_lossy().into_owned();
        let store = registry.create_store(&StoreConfig::Sqlite { path }).unwrap();
        assert_eq!(store.store_name(), "sqlite");
    }
}
