// # paintingd - Painting Loan Notification Daemon
//
// Thin composition root. All notification logic lives in painting-core.
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering senders and building the store and sender from config
// 4. Running the daily sweep scheduler until SIGTERM/SIGINT
//
// ## Configuration
//
// ### Email
// - `RESEND_API_KEY`: Resend API key (unset: notifications disabled)
// - `RESEND_FROM_EMAIL`: Sender address (default: onboarding@resend.dev)
// - `PAINTING_MAIL_MODE`: `dry-run` to log emails instead of sending them
// - `PAINTING_BASE_URL`: Absolute prefix for image links in emails
//
// ### Store
// - `PAINTING_DB_PATH`: SQLite database file (default: ./database.sqlite)
//
// ### Schedule
// - `PAINTING_SWEEP_HOUR`: Local hour of the daily sweep (default: 9)
// - `PAINTING_SWEEP_MINUTE`: Local minute of the daily sweep (default: 0)
// - `PAINTING_RUN_MODE`: `daemon` (default) or `once` (one sweep, then exit)
//
// ### Engine
// - `PAINTING_MAX_SEND_RETRIES`: Extra attempts after a failed send (default: 0)
// - `PAINTING_RETRY_DELAY_SECS`: Delay between attempts (default: 5)
// - `PAINTING_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export RESEND_API_KEY=re_xxxxxxxx
// export RESEND_FROM_EMAIL="Collection <loans@example.com>"
// export PAINTING_DB_PATH=/var/lib/paintings/database.sqlite
//
// paintingd
// ```

use anyhow::Result;
use painting_core::config::{NotifierConfig, SenderConfig, StoreConfig};
use painting_core::traits::{Clock, SystemClock};
use painting_core::{ComponentRegistry, NotificationEngine, SweepScheduler};
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Default sender address when `RESEND_FROM_EMAIL` is unset
const DEFAULT_FROM_EMAIL: &str = "onboarding@resend.dev";

/// Default database location
const DEFAULT_DB_PATH: &str = "./database.sqlite";

/// How long a running sweep may take to finish after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaintingExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<PaintingExitCode> for ExitCode {
    fn from(code: PaintingExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// What the daemon does after startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    /// Run the scheduler until a shutdown signal
    Daemon,
    /// Run one sweep and exit
    Once,
}

/// Application configuration
#[derive(Debug)]
struct Config {
    resend_api_key: Option<String>,
    from_email: String,
    db_path: String,
    sweep_hour: Option<u32>,
    sweep_minute: Option<u32>,
    base_url: Option<String>,
    max_send_retries: Option<usize>,
    retry_delay_secs: Option<u64>,
    run_mode: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    ///
    /// Blank values count as unset.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Self {
            resend_api_key: get("RESEND_API_KEY"),
            from_email: get("RESEND_FROM_EMAIL").unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string()),
            db_path: get("PAINTING_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            sweep_hour: parse_opt(&get, "PAINTING_SWEEP_HOUR")?,
            sweep_minute: parse_opt(&get, "PAINTING_SWEEP_MINUTE")?,
            base_url: get("PAINTING_BASE_URL"),
            max_send_retries: parse_opt(&get, "PAINTING_MAX_SEND_RETRIES")?,
            retry_delay_secs: parse_opt(&get, "PAINTING_RETRY_DELAY_SECS")?,
            run_mode: get("PAINTING_RUN_MODE").unwrap_or_else(|| "daemon".to_string()),
            log_level: get("PAINTING_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if let Some(key) = &self.resend_api_key {
            let key_lower = key.to_lowercase();
            if key_lower.contains("your_")
                || key_lower.contains("replace_me")
                || key_lower == "key"
            {
                anyhow::bail!(
                    "RESEND_API_KEY appears to be a placeholder. \
                    Use an actual API key from the Resend dashboard, or unset it to disable email."
                );
            }
        }

        if !self.from_email.contains('@') {
            anyhow::bail!(
                "RESEND_FROM_EMAIL must contain an email address. Got: {}",
                self.from_email
            );
        }

        if let Some(url) = &self.base_url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                anyhow::bail!("PAINTING_BASE_URL must use HTTP or HTTPS scheme. Got: {}", url);
            }
        }

        if let Some(retries) = self.max_send_retries {
            if retries > 10 {
                anyhow::bail!(
                    "PAINTING_MAX_SEND_RETRIES must be between 0 and 10. Got: {}",
                    retries
                );
            }
        }

        if let Some(delay) = self.retry_delay_secs {
            if !(1..=300).contains(&delay) {
                anyhow::bail!(
                    "PAINTING_RETRY_DELAY_SECS must be between 1 and 300 seconds. Got: {}",
                    delay
                );
            }
        }

        self.run_mode()?;
        self.log_level()?;

        self.notifier_config()
            .validate()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        Ok(())
    }

    fn run_mode(&self) -> Result<RunMode> {
        match self.run_mode.to_lowercase().as_str() {
            "daemon" => Ok(RunMode::Daemon),
            "once" => Ok(RunMode::Once),
            _ => anyhow::bail!(
                "PAINTING_RUN_MODE '{}' is not valid. Valid modes: daemon, once",
                self.run_mode
            ),
        }
    }

    fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "PAINTING_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    /// Build the core configuration
    fn notifier_config(&self) -> NotifierConfig {
        let mut config = NotifierConfig::default();

        config.sender = match &self.resend_api_key {
            Some(api_key) => SenderConfig::Resend {
                api_key: api_key.clone(),
                from: self.from_email.clone(),
            },
            None => SenderConfig::Disabled,
        };
        config.store = StoreConfig::Sqlite {
            path: self.db_path.clone(),
        };

        if let Some(hour) = self.sweep_hour {
            config.schedule.hour = hour;
        }
        if let Some(minute) = self.sweep_minute {
            config.schedule.minute = minute;
        }
        if let Some(retries) = self.max_send_retries {
            config.rules.max_send_retries = retries;
        }
        if let Some(delay) = self.retry_delay_secs {
            config.rules.retry_delay_secs = delay;
        }
        config.engine.base_url = self.base_url.clone();

        config
    }
}

fn parse_opt<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| anyhow::anyhow!("{} must be a number. Got '{}': {}", key, raw, e))
        })
        .transpose()
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return PaintingExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return PaintingExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = config.log_level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return PaintingExitCode::ConfigError.into();
    }

    info!("Starting paintingd");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return PaintingExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {}", e);
            PaintingExitCode::RuntimeError
        } else {
            PaintingExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let notifier = config.notifier_config();
    let run_mode = config.run_mode()?;

    let registry = ComponentRegistry::with_builtin_stores();

    #[cfg(feature = "resend")]
    {
        info!("Registering Resend sender");
        painting_mail_resend::register(&registry);
    }

    let store = registry.create_store(&notifier.store)?;
    info!("Record store: {} ({})", store.store_name(), config.db_path);

    let sender = registry.create_sender(&notifier.sender)?;
    match &sender {
        Some(sender) => info!("Email sender: {}", sender.sender_name()),
        None => info!("RESEND_API_KEY not set, email notifications are disabled"),
    }

    let (engine, mut events) = NotificationEngine::new(store, sender, &notifier)?;
    let engine = Arc::new(engine);

    let event_log = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Engine event: {:?}", event);
        }
    });

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match run_mode {
        RunMode::Once => {
            let report = engine.run_sweep(clock.now()).await?;
            info!(
                "Sweep finished: {} lent, {} sent, {} failed",
                report.evaluated, report.sent, report.failed
            );
        }
        RunMode::Daemon => {
            let handle = SweepScheduler::new(engine.clone(), clock, notifier.schedule.clone()).spawn();
            info!(
                "Daily sweep scheduled at {:02}:{:02} local time",
                notifier.schedule.hour, notifier.schedule.minute
            );

            let signal = wait_for_shutdown().await?;
            info!("Received shutdown signal: {}", signal);
            info!("Shutting down daemon");

            match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle.shutdown()).await {
                Ok(result) => result?,
                Err(_) => warn!("Scheduler did not stop within {:?}", SHUTDOWN_TIMEOUT),
            }
        }
    }

    event_log.abort();
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
