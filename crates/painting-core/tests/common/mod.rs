//! Test doubles and common utilities for contract tests
//!
//! Each suite only uses part of this module.
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use painting_core::config::NotifierConfig;
use painting_core::error::{Error, Result};
use painting_core::model::PaintingDraft;
use painting_core::traits::{Clock, EmailSender, ItemStore, OutgoingEmail, SendReceipt};
use painting_core::{EngineEvent, NotificationEngine, PaintingService};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// An EmailSender that records every message and can fail chosen recipients
pub struct RecordingSender {
    /// Messages the sender accepted
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    /// Call counter for send(), including failures
    call_count: Arc<AtomicUsize>,
    /// Recipients whose sends always fail
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(AtomicUsize::new(0)),
            failing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Make every send to `address` fail
    pub fn fail_for(&self, address: &str) {
        self.failing.lock().unwrap().insert(address.to_string());
    }

    /// Get the accepted messages
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Get the subjects of the accepted messages
    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.subject).collect()
    }

    /// Get the number of times send() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EmailSender for RecordingSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt> {
        let n = self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&email.to) {
            return Err(Error::sender("recording", format!("mailbox {} unavailable", email.to)));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(SendReceipt {
            message_id: Some(format!("msg-{}", n)),
        })
    }

    fn sender_name(&self) -> &'static str {
        "recording"
    }
}

/// A clock frozen at a settable instant
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// A clock that follows tokio's (pausable) time from a starting instant
pub struct TokioClock {
    base: DateTime<Utc>,
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn starting_at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            start: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + Duration::from_std(self.start.elapsed()).unwrap()
    }
}

/// Monday 2025-03-10 09:00 UTC
pub fn reference_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
}

/// Draft for a painting lent to `email` and due at `due`
pub fn lent_draft(title: &str, email: &str, due: DateTime<Utc>) -> PaintingDraft {
    PaintingDraft::new(title)
        .lent_to(format!("Borrower of {}", title), email)
        .with_due_date(due.to_rfc3339())
}

/// Build an engine over `store` with an optional sender
pub fn engine_with(
    store: Arc<dyn ItemStore>,
    sender: Option<Arc<RecordingSender>>,
    config: &NotifierConfig,
) -> (Arc<NotificationEngine>, mpsc::Receiver<EngineEvent>) {
    let sender = sender.map(|s| s as Arc<dyn EmailSender>);
    let (engine, rx) = NotificationEngine::new(store, sender, config).unwrap();
    (Arc::new(engine), rx)
}

/// Build a service, engine and clock around a fresh memory store
pub fn service_with(
    sender: Option<Arc<RecordingSender>>,
    now: DateTime<Utc>,
) -> (PaintingService, Arc<NotificationEngine>, Arc<FixedClock>, mpsc::Receiver<EngineEvent>) {
    let store: Arc<dyn ItemStore> = Arc::new(painting_core::MemoryItemStore::new());
    let (engine, rx) = engine_with(store.clone(), sender, &NotifierConfig::default());
    let clock = Arc::new(FixedClock::new(now));
    let service = PaintingService::new(store, engine.clone(), clock.clone());
    (service, engine, clock, rx)
}

/// Drain all currently queued engine events
pub fn drain(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
