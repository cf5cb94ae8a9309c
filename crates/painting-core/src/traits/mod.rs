//! Core traits for the painting notification system
//!
//! This module defines the abstract interfaces the engine depends on.
//!
//! - [`ItemStore`]: Read and write painting records
//! - [`EmailSender`]: Deliver a rendered email
//! - [`Clock`]: Source of "now"

pub mod clock;
pub mod email_sender;
pub mod item_store;

pub use clock::{Clock, SystemClock};
pub use email_sender::{EmailSender, EmailSenderFactory, OutgoingEmail, SendReceipt};
pub use item_store::{ItemStore, ItemStoreFactory};
