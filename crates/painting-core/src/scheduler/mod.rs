//! Daily sweep scheduler
//!
//! Owns the timer that drives [`NotificationEngine::run_sweep`]:
//!
//! 1. One sweep right away on startup (covers a process that was down at the
//!    scheduled time)
//! 2. Wait until the next occurrence of the configured local time of day,
//!    tomorrow's if today's has already passed
//! 3. Sweep, then sweep again every `period_secs` on a fixed timer
//!
//! Nothing is persisted. A restart recomputes the next boundary from the
//! current time.

use std::sync::Arc;

use chrono::{DateTime, Days, Duration as ChronoDuration, FixedOffset, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::config::ScheduleConfig;
use crate::engine::NotificationEngine;
use crate::error::{Error, Result};
use crate::traits::Clock;

/// Lifecycle of the scheduler task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Startup sweep done (or skipped), waiting for the first time-of-day boundary
    WaitingForFirstRun,
    /// Sweeping on the fixed period
    Running,
    /// Shut down through its handle
    Stopped,
}

/// Next occurrence of `at` strictly after `now`'s time of day, in `now`'s zone
///
/// When `now` is already at or past `at` today, the result is tomorrow's
/// occurrence. A local time skipped by a DST change resolves to the first
/// valid instant after it.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let today = now.date_naive();
    let date = if now.time() >= at {
        today.checked_add_days(Days::new(1)).unwrap_or(today)
    } else {
        today
    };

    resolve_local(&now.timezone(), date.and_time(at))
        .unwrap_or_else(|| now.clone() + ChronoDuration::days(1))
}

/// Time to wait from `now` until [`next_run_after`]
pub fn delay_until_next_run<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> Duration {
    let next = next_run_after(now, at);
    next.signed_duration_since(now.clone())
        .to_std()
        .unwrap_or(Duration::ZERO)
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive).earliest().or_else(|| {
        tz.from_local_datetime(&(naive + ChronoDuration::hours(1)))
            .earliest()
    })
}

/// Long-lived task that runs the daily sweep
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use painting_core::{NotificationEngine, NotifierConfig, SweepScheduler};
/// use painting_core::store::MemoryItemStore;
/// use painting_core::traits::SystemClock;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = NotifierConfig::default();
///     let store = Arc::new(MemoryItemStore::new());
///     let (engine, _events) = NotificationEngine::new(store, None, &config)?;
///
///     let handle = SweepScheduler::new(Arc::new(engine), Arc::new(SystemClock), config.schedule)
///         .spawn();
///     handle.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct SweepScheduler {
    engine: Arc<NotificationEngine>,
    clock: Arc<dyn Clock>,
    config: ScheduleConfig,
    /// Zone the time of day is read in; `None` means the host's local zone
    offset: Option<FixedOffset>,
}

impl SweepScheduler {
    /// Create a scheduler for the host's local time zone
    pub fn new(engine: Arc<NotificationEngine>, clock: Arc<dyn Clock>, config: ScheduleConfig) -> Self {
        Self {
            engine,
            clock,
            config,
            offset: None,
        }
    }

    /// Read the time of day at a fixed UTC offset instead of the local zone
    pub fn with_fixed_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Next scheduled sweep after `now`
    pub fn next_run(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let at = self.config.time_of_day();
        match self.offset {
            Some(offset) => next_run_after(&now.with_timezone(&offset), at).with_timezone(&Utc),
            None => next_run_after(&now.with_timezone(&Local), at).with_timezone(&Utc),
        }
    }

    /// Spawn the scheduler onto the tokio runtime
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (state_tx, state_rx) = watch::channel(SchedulerState::WaitingForFirstRun);
        let join = tokio::spawn(self.run(shutdown_rx, state_tx));

        SchedulerHandle {
            shutdown_tx: Some(shutdown_tx),
            state_rx,
            join,
        }
    }

    async fn run(self, mut shutdown_rx: oneshot::Receiver<()>, state_tx: watch::Sender<SchedulerState>) {
        info!("Email scheduler started");

        if self.config.run_on_startup {
            self.sweep().await;
        }

        let now = self.clock.now();
        let next = self.next_run(now);
        let delay = next.signed_duration_since(now).to_std().unwrap_or(Duration::ZERO);
        info!(
            "Next scheduled check at {} (in {}s)",
            next.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S %Z"),
            delay.as_secs()
        );

        tokio::select! {
            _ = tokio::time::sleep_until(Instant::now() + delay) => {}
            _ = &mut shutdown_rx => {
                info!("Shutdown signal received, scheduler stopped");
                state_tx.send_replace(SchedulerState::Stopped);
                return;
            }
        }

        state_tx.send_replace(SchedulerState::Running);

        let period = Duration::from_secs(self.config.period_secs);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.sweep().await,
                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received, scheduler stopped");
                    break;
                }
            }
        }

        state_tx.send_replace(SchedulerState::Stopped);
    }

    async fn sweep(&self) {
        let now = self.clock.now();
        match self.engine.run_sweep(now).await {
            Ok(report) => debug!(
                "Sweep at {}: {} evaluated, {} sent, {} failed",
                now, report.evaluated, report.sent, report.failed
            ),
            Err(e) => error!("Error running scheduled checks: {}", e),
        }
    }
}

/// Handle to a spawned [`SweepScheduler`]
///
/// Dropping the handle also stops the task at its next wait, but without
/// waiting for it to finish.
pub struct SchedulerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    state_rx: watch::Receiver<SchedulerState>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Current lifecycle state
    pub fn state(&self) -> SchedulerState {
        *self.state_rx.borrow()
    }

    /// Watch lifecycle changes
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state_rx.clone()
    }

    /// Stop the scheduler and wait for its task to finish
    ///
    /// A sweep already in progress completes first.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            // The task may already be gone; joining below reports that.
            let _ = tx.send(());
        }
        self.join
            .await
            .map_err(|e| Error::Other(format!("Scheduler task failed: {}", e)))
    }
}
