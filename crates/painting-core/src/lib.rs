// # painting-core
//
// Core library for tracking lent paintings and emailing their borrowers.
//
// ## Architecture Overview
//
// - **ItemStore**: Trait for reading and writing painting records
// - **EmailSender**: Trait for delivering rendered emails via provider APIs
// - **Clock**: Trait for the source of "now"
// - **NotificationEngine**: Decides and sends lending confirmations, reminders
//   and overdue notices
// - **SweepScheduler**: Long-lived task that runs the daily sweep
// - **PaintingService**: Write path that commits first and notifies second
// - **ComponentRegistry**: Plugin-based registry for senders and stores
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Decision rules are pure and separate from I/O
// 2. **Best-Effort Email**: A failed send never fails or rolls back a write
// 3. **Plugin-Based**: Senders and stores are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Stateless Notifications**: Timing is recomputed from the due date on every sweep

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::{NotifierConfig, RuleConfig, ScheduleConfig, SenderConfig, StoreConfig};
pub use engine::{EngineEvent, NotificationEngine, NotifyOutcome, SkipReason, SweepReport};
pub use engine::rules::{NotificationEvent, NotificationKind, Transition};
pub use error::{Error, Result};
pub use model::{LendingState, Painting, PaintingDraft, PaintingId};
pub use registry::ComponentRegistry;
pub use scheduler::{SchedulerHandle, SchedulerState, SweepScheduler};
pub use service::{PaintingService, WriteOutcome};
pub use store::{MemoryItemStore, SqliteItemStore};
pub use traits::{Clock, EmailSender, ItemStore, SystemClock};
