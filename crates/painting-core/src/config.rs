//! Configuration types for the painting notification system
//!
//! This module defines all configuration structures used throughout the crate.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Main notifier configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Email sender configuration
    #[serde(default)]
    pub sender: SenderConfig,

    /// Record store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Daily sweep schedule
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Reminder and overdue rules
    #[serde(default)]
    pub rules: RuleConfig,

    /// Engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl NotifierConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.sender.validate()?;
        self.store.validate()?;
        self.schedule.validate()?;
        self.rules.validate()?;
        Ok(())
    }

    /// Whether any notification can be sent at all
    pub fn notifications_enabled(&self) -> bool {
        !matches!(self.sender, SenderConfig::Disabled)
    }
}

/// Email sender configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SenderConfig {
    /// Resend transactional email API
    Resend {
        /// Resend API key
        api_key: String,
        /// Sender address, e.g. "Collection <loans@example.com>"
        from: String,
    },

    /// No sender configured: every notification path is a no-op
    #[default]
    Disabled,

    /// Custom sender
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl SenderConfig {
    /// Validate the sender configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SenderConfig::Resend { api_key, from } => {
                if api_key.is_empty() {
                    return Err(crate::Error::config("Resend API key cannot be empty"));
                }
                if from.trim().is_empty() {
                    return Err(crate::Error::config("Resend sender address cannot be empty"));
                }
                Ok(())
            }
            SenderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom sender factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom sender config cannot be null"));
                }
                Ok(())
            }
            SenderConfig::Disabled => Ok(()),
        }
    }

    /// Get the sender type name
    pub fn type_name(&self) -> &str {
        match self {
            SenderConfig::Resend { .. } => "resend",
            SenderConfig::Disabled => "disabled",
            SenderConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Record store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Single-file SQLite database
    Sqlite {
        /// Path to the database file
        path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,

    /// Custom store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::Sqlite { path } if path.trim().is_empty() => {
                Err(crate::Error::config("SQLite database path cannot be empty"))
            }
            StoreConfig::Custom { factory, .. } if factory.is_empty() => {
                Err(crate::Error::config("Custom store factory cannot be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::Sqlite { .. } => "sqlite",
            StoreConfig::Memory => "memory",
            StoreConfig::Custom { factory, .. } => factory,
        }
    }
}

/// When the daily sweep runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Local hour of the daily sweep (0-23)
    #[serde(default = "default_hour")]
    pub hour: u32,

    /// Local minute of the daily sweep (0-59)
    #[serde(default)]
    pub minute: u32,

    /// Period between sweeps after the first scheduled one (in seconds)
    ///
    /// This is a fixed timer; it is not re-aligned to the wall clock.
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,

    /// Run one sweep immediately on startup
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

impl ScheduleConfig {
    /// Validate the schedule
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.hour > 23 {
            return Err(crate::Error::config(format!(
                "Sweep hour must be between 0 and 23, got {}",
                self.hour
            )));
        }
        if self.minute > 59 {
            return Err(crate::Error::config(format!(
                "Sweep minute must be between 0 and 59, got {}",
                self.minute
            )));
        }
        if self.period_secs == 0 {
            return Err(crate::Error::config("Sweep period must be > 0"));
        }
        Ok(())
    }

    /// The configured local time of day
    pub fn time_of_day(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            hour: default_hour(),
            minute: 0,
            period_secs: default_period_secs(),
            run_on_startup: true,
        }
    }
}

/// Reminder and overdue cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Days before the due date on which the single reminder goes out
    #[serde(default = "default_seven")]
    pub reminder_days_before: i64,

    /// Overdue notices go out on day 1 and then every this many days
    #[serde(default = "default_seven")]
    pub overdue_repeat_days: i64,

    /// Additional send attempts after a failed send
    ///
    /// Defaults to 0: one attempt per notification.
    #[serde(default)]
    pub max_send_retries: usize,

    /// Delay between send attempts (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl RuleConfig {
    /// Validate the rules
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.reminder_days_before <= 0 {
            return Err(crate::Error::config("Reminder lead time must be > 0 days"));
        }
        if self.overdue_repeat_days <= 0 {
            return Err(crate::Error::config("Overdue repeat interval must be > 0 days"));
        }
        Ok(())
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            reminder_days_before: default_seven(),
            overdue_repeat_days: default_seven(),
            max_send_retries: 0,
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped with a warning.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Absolute prefix for image links in emails (e.g. "https://paintings.example.com")
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
            base_url: None,
        }
    }
}

fn default_hour() -> u32 {
    9
}

fn default_period_secs() -> u64 {
    24 * 60 * 60
}

fn default_true() -> bool {
    true
}

fn default_seven() -> i64 {
    7
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_event_channel_capacity() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_daily_nine_am_cadence() {
        let config = NotifierConfig::default();
        assert_eq!(config.schedule.time_of_day(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(config.schedule.period_secs, 86_400);
        assert!(config.schedule.run_on_startup);
        assert_eq!(config.rules.reminder_days_before, 7);
        assert_eq!(config.rules.overdue_repeat_days, 7);
        assert_eq!(config.rules.max_send_retries, 0);
        assert!(!config.notifications_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn resend_requires_key_and_sender() {
        let missing_key = SenderConfig::Resend {
            api_key: String::new(),
            from: "loans@example.com".to_string(),
        };
        assert!(missing_key.validate().is_err());

        let missing_from = SenderConfig::Resend {
            api_key: "re_123".to_string(),
            from: " ".to_string(),
        };
        assert!(missing_from.validate().is_err());
    }

    #[test]
    fn schedule_bounds_are_checked() {
        let mut schedule = ScheduleConfig::default();
        schedule.hour = 24;
        assert!(schedule.validate().is_err());

        let mut schedule = ScheduleConfig::default();
        schedule.period_secs = 0;
        assert!(schedule.validate().is_err());
    }

    #[test]
    fn sections_deserialize_with_defaults() {
        let config: NotifierConfig = serde_json::from_str(
            r#"{ "sender": { "type": "resend", "api_key": "re_1", "from": "a@b.c" },
                 "store": { "type": "sqlite", "path": "db.sqlite" } }"#,
        )
        .unwrap();

        assert_eq!(config.sender.type_name(), "resend");
        assert_eq!(config.store.type_name(), "sqlite");
        assert_eq!(config.schedule.hour, 9);
        assert!(config.notifications_enabled());
    }
}
