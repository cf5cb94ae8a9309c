//! Notification engine
//!
//! The NotificationEngine is responsible for:
//! - Deciding whether a write started a lending episode (confirmation email)
//! - Running the daily sweep over lent paintings (reminders, overdue notices)
//! - Rendering and handing messages to the EmailSender
//! - Reporting outcomes through events and logs, never through write errors
//!
//! ## Architecture
//!
//! ```text
//!  PaintingService ── before/after ──┐        ┌── now ── SweepScheduler
//!                                    ▼        ▼
//!                            ┌──────────────────────┐
//!                            │  NotificationEngine  │
//!                            └──────────────────────┘
//!                                     │
//!         ┌───────────────────────────┼───────────────────────────┐
//!         │                           │                           │
//!         ▼                           ▼                           ▼
//! ┌─────────────┐           ┌──────────────┐           ┌─────────────┐
//! │  ItemStore  │           │ EmailSender  │           │   Events    │
//! │ (lent list) │           │  (deliver)   │           │  (observe)  │
//! └─────────────┘           └──────────────┘           └─────────────┘
//! ```
//!
//! ## Sweep Flow
//!
//! 1. Skip entirely when no sender is configured
//! 2. Read the lent paintings from the ItemStore
//! 3. Decide reminders and overdue notices with [`rules::SweepRules`]
//! 4. Send each one in turn, awaiting each send before the next
//! 5. A failed send is logged and the sweep moves on
//!
//! The engine keeps no record of what it has sent.

pub mod render;
pub mod rules;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::NotifierConfig;
use crate::error::{Error, Result};
use crate::model::{Painting, PaintingId};
use crate::traits::{EmailSender, ItemStore, SendReceipt};

pub use rules::{NotificationEvent, NotificationKind, SweepRules, Transition};

/// Events emitted by the NotificationEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Sweep started
    SweepStarted { now: DateTime<Utc> },

    /// A notification was accepted by the sender
    NotificationSent {
        painting_id: PaintingId,
        kind: NotificationKind,
        recipient: String,
    },

    /// A notification failed after all attempts
    NotificationFailed {
        painting_id: PaintingId,
        kind: NotificationKind,
        error: String,
        retry_count: usize,
    },

    /// A notification was not attempted
    NotificationSkipped {
        painting_id: PaintingId,
        kind: NotificationKind,
        reason: SkipReason,
    },

    /// Sweep finished
    SweepCompleted {
        evaluated: usize,
        sent: usize,
        failed: usize,
    },
}

/// Why a notification was not attempted
///
/// Neither reason is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// No email sender is configured
    NotificationsDisabled,
    /// The painting has no borrower email
    MissingRecipient,
}

/// Result of the notify phase of a write
///
/// Kept separate from the write result: a failed notification never turns a
/// committed write into an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The write did not start a lending episode
    NoTransition,
    /// A notification was not attempted
    Skipped(SkipReason),
    /// The sender accepted the notification
    Sent { kind: NotificationKind },
    /// The sender rejected the notification
    Failed {
        kind: NotificationKind,
        reason: String,
    },
}

/// Summary of one daily sweep
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Lent paintings read from the store
    pub evaluated: usize,
    /// Notifications the rules decided on
    pub decided: Vec<NotificationEvent>,
    /// Notifications accepted by the sender
    pub sent: usize,
    /// Notifications that failed after all attempts
    pub failed: usize,
    /// Set when the whole sweep was skipped
    pub skipped: Option<SkipReason>,
}

impl SweepReport {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }
}

/// Core notification engine
///
/// Shared between the write path and the scheduler behind an `Arc`. All
/// methods take `&self`.
///
/// ## Load Resistance
///
/// - **Bounded event channel**: a full channel drops events with a warning
/// - **Sequential sends**: at most one outbound email at a time per caller
pub struct NotificationEngine {
    /// Source of lent paintings for the sweep
    store: Arc<dyn ItemStore>,

    /// Email sender; `None` disables every notification path
    sender: Option<Arc<dyn EmailSender>>,

    /// Reminder and overdue cadence
    rules: SweepRules,

    /// Additional attempts after a failed send
    max_send_retries: usize,

    /// Delay between send attempts (in seconds)
    retry_delay_secs: u64,

    /// Prefix for relative image links
    base_url: Option<String>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl NotificationEngine {
    /// Create a new notification engine
    ///
    /// # Parameters
    ///
    /// - `store`: Record store the sweep reads from
    /// - `sender`: Email sender, or `None` when notifications are not configured
    /// - `config`: Notifier configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        store: Arc<dyn ItemStore>,
        sender: Option<Arc<dyn EmailSender>>,
        config: &NotifierConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity.max(1));

        let engine = Self {
            store,
            sender,
            rules: SweepRules::from(&config.rules),
            max_send_retries: config.rules.max_send_retries,
            retry_delay_secs: config.rules.retry_delay_secs,
            base_url: config.engine.base_url.clone(),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Whether a sender is configured
    pub fn notifications_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// The store the sweep reads from
    pub fn store(&self) -> &Arc<dyn ItemStore> {
        &self.store
    }

    /// Notify phase of a write
    ///
    /// Call after the write has committed, with the record before the write
    /// (`None` on create) and after it. Sends one confirmation when the write
    /// made the painting lent. Never returns an error.
    pub async fn on_item_written(&self, before: Option<&Painting>, after: &Painting) -> NotifyOutcome {
        let Some(sender) = &self.sender else {
            debug!("Notifications disabled, not evaluating write to painting {}", after.id);
            return NotifyOutcome::Skipped(SkipReason::NotificationsDisabled);
        };

        let Some(event) = rules::lending_confirmation(before, after) else {
            debug!("Painting {} write is not a lending transition", after.id);
            return NotifyOutcome::NoTransition;
        };

        info!("Painting {} ({}) became lent", after.id, after.title);
        self.deliver(sender.as_ref(), &event).await
    }

    /// Run one daily sweep at `now`
    ///
    /// # Returns
    ///
    /// - `Ok(SweepReport)`: The sweep ran (individual send failures included)
    /// - `Err(Error)`: The lent paintings could not be read
    pub async fn run_sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let Some(sender) = &self.sender else {
            info!("Notifications disabled, skipping scheduled checks");
            return Ok(SweepReport::skipped(SkipReason::NotificationsDisabled));
        };

        info!("Running scheduled email checks");
        self.emit_event(EngineEvent::SweepStarted { now });

        let paintings = self.store.list_lent_items().await?;
        let decided = self.rules.evaluate(&paintings, now);
        debug!(
            "{} lent paintings, {} notifications due",
            paintings.len(),
            decided.len()
        );

        let mut report = SweepReport {
            evaluated: paintings.len(),
            ..SweepReport::default()
        };

        for event in &decided {
            match self.deliver(sender.as_ref(), event).await {
                NotifyOutcome::Sent { .. } => report.sent += 1,
                NotifyOutcome::Failed { .. } => report.failed += 1,
                NotifyOutcome::Skipped(_) | NotifyOutcome::NoTransition => {}
            }
        }
        report.decided = decided;

        if report.sent > 0 {
            info!("Total notification emails sent: {}", report.sent);
        }
        if report.failed > 0 {
            warn!("Notification emails failed: {}", report.failed);
        }
        info!("Scheduled checks complete");

        self.emit_event(EngineEvent::SweepCompleted {
            evaluated: report.evaluated,
            sent: report.sent,
            failed: report.failed,
        });

        Ok(report)
    }

    /// Render and send one notification with retry
    async fn deliver(&self, sender: &dyn EmailSender, event: &NotificationEvent) -> NotifyOutcome {
        let painting = event.painting();
        let kind = event.kind();

        let Some(email) = render::render(event, self.base_url.as_deref()) else {
            debug!("Painting {} has no borrower email, skipping {}", painting.id, kind);
            self.emit_event(EngineEvent::NotificationSkipped {
                painting_id: painting.id,
                kind,
                reason: SkipReason::MissingRecipient,
            });
            return NotifyOutcome::Skipped(SkipReason::MissingRecipient);
        };

        let mut last_error = None;
        for attempt in 0..=self.max_send_retries {
            match self.do_send(sender, &email).await {
                Ok(receipt) => {
                    info!(
                        "Sent {} to {} for painting {} ({}){}",
                        kind,
                        email.to,
                        painting.id,
                        painting.title,
                        receipt
                            .message_id
                            .map(|id| format!(", message id {}", id))
                            .unwrap_or_default()
                    );
                    self.emit_event(EngineEvent::NotificationSent {
                        painting_id: painting.id,
                        kind,
                        recipient: email.to.clone(),
                    });
                    return NotifyOutcome::Sent { kind };
                }
                Err(e) => {
                    warn!(
                        "Send attempt {} failed for {} of painting {}: {}",
                        attempt, kind, painting.id, e
                    );
                    last_error = Some(e);

                    if attempt < self.max_send_retries {
                        tokio::time::sleep(tokio::time::Duration::from_secs(self.retry_delay_secs))
                            .await;
                    }
                }
            }
        }

        let error = last_error.unwrap_or_else(|| Error::Other("Unknown error".to_string()));
        error!(
            "Failed to send {} for painting {} ({}): {}",
            kind, painting.id, painting.title, error
        );
        self.emit_event(EngineEvent::NotificationFailed {
            painting_id: painting.id,
            kind,
            error: error.to_string(),
            retry_count: self.max_send_retries,
        });
        NotifyOutcome::Failed {
            kind,
            reason: error.to_string(),
        }
    }

    /// Perform a single send attempt
    async fn do_send(
        &self,
        sender: &dyn EmailSender,
        email: &crate::traits::OutgoingEmail,
    ) -> Result<SendReceipt> {
        sender.send(email).await.map_err(|e| match e {
            Error::Sender { .. } => e,
            other => Error::sender(sender.sender_name(), other.to_string()),
        })
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}
