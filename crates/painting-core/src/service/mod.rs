//! Lending service
//!
//! Write path for painting records. Every mutating call runs in two phases:
//!
//! 1. Commit the write to the [`ItemStore`]. A failure here is returned.
//! 2. Hand the before/after records to the [`NotificationEngine`]. Whatever
//!    happens here lands in [`WriteOutcome::notification`] and never turns
//!    the committed write into an error.
//!
//! Read-modify-write calls are serialized, so two concurrent updates that
//! both lend the same painting see each other's result and only the first
//! one is a transition.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::engine::{NotificationEngine, NotifyOutcome};
use crate::error::{Error, Result};
use crate::model::{Painting, PaintingDraft, PaintingId};
use crate::traits::{Clock, ItemStore};

/// Result of a committed write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// The record as stored
    pub painting: Painting,
    /// What the notify phase did
    pub notification: NotifyOutcome,
}

/// Create, update, return and delete paintings
pub struct PaintingService {
    store: Arc<dyn ItemStore>,
    engine: Arc<NotificationEngine>,
    clock: Arc<dyn Clock>,
    /// Held from the before-read to the committed write of an update
    write_lock: Mutex<()>,
}

impl PaintingService {
    pub fn new(store: Arc<dyn ItemStore>, engine: Arc<NotificationEngine>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            engine,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Create a painting
    ///
    /// A painting created already lent gets a lending confirmation.
    pub async fn create(&self, draft: PaintingDraft, actor: &str) -> Result<WriteOutcome> {
        let draft = draft.normalized();
        draft.validate()?;

        let now = self.clock.now();
        let stored = self
            .store
            .insert(&Painting::from_draft(PaintingId(0), draft, actor, now))
            .await?;
        info!("Painting {} ({}) created by {}", stored.id, stored.title, actor);

        let notification = self.engine.on_item_written(None, &stored).await;
        Ok(WriteOutcome {
            painting: stored,
            notification,
        })
    }

    /// Replace the editable fields of a painting
    ///
    /// # Errors
    ///
    /// - `Error::NotFound`: No painting with this id
    /// - `Error::InvalidInput`: Empty title
    pub async fn update(&self, id: PaintingId, draft: PaintingDraft, actor: &str) -> Result<WriteOutcome> {
        let draft = draft.normalized();
        draft.validate()?;

        let (before, after) = {
            let _guard = self.write_lock.lock().await;
            let before = self.require(id).await?;
            let after = self.commit_update(&before, draft, actor).await?;
            (before, after)
        };

        self.notify_updated(before, after).await
    }

    /// Record a painting as back in custody
    ///
    /// Clears the borrower and both dates. A return never notifies.
    pub async fn mark_returned(&self, id: PaintingId, actor: &str) -> Result<WriteOutcome> {
        let (before, after) = {
            let _guard = self.write_lock.lock().await;
            let before = self.require(id).await?;
            let draft = before.to_draft().returned();
            let after = self.commit_update(&before, draft, actor).await?;
            (before, after)
        };

        self.notify_updated(before, after).await
    }

    /// Delete a painting; returns whether it existed
    pub async fn delete(&self, id: PaintingId) -> Result<bool> {
        let existed = self.store.delete(id).await?;
        if existed {
            info!("Painting {} deleted", id);
        } else {
            debug!("Painting {} not found for delete", id);
        }
        Ok(existed)
    }

    pub async fn get(&self, id: PaintingId) -> Result<Option<Painting>> {
        self.store.get(id).await
    }

    pub async fn list(&self) -> Result<Vec<Painting>> {
        self.store.list().await
    }

    /// Apply a draft to `before` and write it; caller holds `write_lock`
    async fn commit_update(&self, before: &Painting, draft: PaintingDraft, actor: &str) -> Result<Painting> {
        let mut after = before.clone();
        after.apply_draft(draft, actor, self.clock.now());

        self.store.update(&after).await?;
        info!("Painting {} ({}) updated by {}", after.id, after.title, actor);
        Ok(after)
    }

    async fn notify_updated(&self, before: Painting, after: Painting) -> Result<WriteOutcome> {
        let notification = self.engine.on_item_written(Some(&before), &after).await;
        Ok(WriteOutcome {
            painting: after,
            notification,
        })
    }

    async fn require(&self, id: PaintingId) -> Result<Painting> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("painting {}", id)))
    }
}
