// # Item Store Implementations
//
// This module provides implementations of the ItemStore trait for
// different persistence strategies.

pub mod memory;
pub mod sqlite;

pub use memory::{MemoryItemStore, MemoryItemStoreFactory};
pub use sqlite::{SqliteItemStore, SqliteItemStoreFactory};
