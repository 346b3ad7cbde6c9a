//! Configuration management.
//!
//! Settings load from a TOML file with environment-variable overrides for
//! credentials, so the file can be committed without secrets.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::platform::reddit::RedditCredentials;
use crate::retry::RetryPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Platform account and API credentials
    pub platform: PlatformConfig,

    /// Job persistence
    pub scheduler: SchedulerConfig,

    /// Retry behavior for remote calls
    pub retry: RetryConfig,

    /// Giveaway lifecycle tuning
    pub giveaway: GiveawayConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Platform account and API credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Bot account username
    pub bot_username: String,

    /// OAuth client id
    pub client_id: String,

    /// OAuth client secret (`WINDFALL_CLIENT_SECRET` overrides)
    pub client_secret: String,

    /// Bot account password (`WINDFALL_PASSWORD` overrides)
    pub password: String,

    /// User agent string
    pub user_agent: String,

    /// Paste host API key (`WINDFALL_PASTE_API_KEY` overrides)
    pub paste_api_key: String,
}

/// Job persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// SQLite database path for pending jobs
    pub db_path: PathBuf,
}

/// Retry behavior for remote calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Wait before the first retry, in seconds
    pub initial_wait_secs: f64,

    /// Multiplier applied to the wait after each retry
    pub backoff_multiplier: f64,
}

/// Giveaway lifecycle tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GiveawayConfig {
    /// Seconds between locate scans of the requester's submissions
    pub locate_interval_secs: u64,

    /// Seconds before an unlocated giveaway is abandoned
    pub locate_timeout_secs: u64,

    /// How many recent submissions each locate scan inspects
    pub recent_submissions: usize,

    /// Maximum keyword length accepted in requests
    pub keyword_max_len: usize,

    /// Keyword entries longer than this many characters are skipped
    pub comment_char_limit: usize,

    /// Delivery attempts per winner notification
    pub delivery_rounds: u32,

    /// Seconds between delivery rounds
    pub delivery_delay_secs: u64,

    /// Seconds between unread-inbox polls
    pub inbox_poll_secs: u64,

    /// Unread items fetched per poll
    pub inbox_batch: usize,

    /// Seconds between used-numbers tracker refreshes
    pub tracker_refresh_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from a file, then apply environment overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        config.apply_env();
        Ok(config)
    }

    /// Credential overrides from the environment.
    pub fn apply_env(&mut self) {
        if let Ok(secret) = std::env::var("WINDFALL_CLIENT_SECRET") {
            self.platform.client_secret = secret;
        }
        if let Ok(password) = std::env::var("WINDFALL_PASSWORD") {
            self.platform.password = password;
        }
        if let Ok(key) = std::env::var("WINDFALL_PASTE_API_KEY") {
            self.platform.paste_api_key = key;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.platform.bot_username.is_empty() {
            anyhow::bail!("platform.bot_username must be set");
        }

        if self.giveaway.locate_interval_secs == 0 {
            anyhow::bail!("giveaway.locate_interval_secs must be greater than 0");
        }

        if self.giveaway.locate_timeout_secs < self.giveaway.locate_interval_secs {
            anyhow::bail!("giveaway.locate_timeout_secs must cover at least one locate interval");
        }

        if self.giveaway.delivery_rounds == 0 {
            anyhow::bail!("giveaway.delivery_rounds must be greater than 0");
        }

        if self.retry.initial_wait_secs < 0.0 {
            anyhow::bail!("retry.initial_wait_secs must not be negative");
        }

        Ok(())
    }

    /// Credentials for the platform client.
    #[must_use]
    pub fn credentials(&self) -> RedditCredentials {
        RedditCredentials {
            client_id: self.platform.client_id.clone(),
            client_secret: self.platform.client_secret.clone(),
            username: self.platform.bot_username.clone(),
            password: self.platform.password.clone(),
            user_agent: self.platform.user_agent.clone(),
        }
    }

    /// Retry policy for remote calls.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            initial_wait_secs: self.retry.initial_wait_secs,
            backoff_multiplier: self.retry.backoff_multiplier,
        }
    }

    #[must_use]
    pub fn locate_interval(&self) -> Duration {
        Duration::from_secs(self.giveaway.locate_interval_secs)
    }

    #[must_use]
    pub fn locate_timeout(&self) -> Duration {
        Duration::from_secs(self.giveaway.locate_timeout_secs)
    }

    #[must_use]
    pub fn delivery_delay(&self) -> Duration {
        Duration::from_secs(self.giveaway.delivery_delay_secs)
    }

    #[must_use]
    pub fn inbox_poll_interval(&self) -> Duration {
        Duration::from_secs(self.giveaway.inbox_poll_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform: PlatformConfig::default(),
            scheduler: SchedulerConfig::default(),
            retry: RetryConfig::default(),
            giveaway: GiveawayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            bot_username: String::from("windfall-bot"),
            client_id: String::new(),
            client_secret: String::new(),
            password: String::new(),
            user_agent: format!("windfall/{}", env!("CARGO_PKG_VERSION")),
            paste_api_key: String::new(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/jobs.db"),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_wait_secs: 5.0,
            backoff_multiplier: 1.0,
        }
    }
}

impl Default for GiveawayConfig {
    fn default() -> Self {
        Self {
            locate_interval_secs: 60,
            locate_timeout_secs: 900,
            recent_submissions: 5,
            keyword_max_len: 300,
            comment_char_limit: 300,
            delivery_rounds: 6,
            delivery_delay_secs: 900,
            inbox_poll_secs: 30,
            inbox_batch: 25,
            tracker_refresh_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_shorter_than_interval_rejected() {
        let mut config = Config::default();
        config.giveaway.locate_interval_secs = 600;
        config.giveaway.locate_timeout_secs = 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_delivery_rounds_rejected() {
        let mut config = Config::default();
        config.giveaway.delivery_rounds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [platform]
            bot_username = "winbot"
            "#,
        )
        .unwrap();
        assert_eq!(config.platform.bot_username, "winbot");
        assert_eq!(config.giveaway.delivery_rounds, 6);
        assert_eq!(config.retry.max_retries, 5);
    }

    #[test]
    #[serial_test::serial]
    fn test_env_overrides_credentials() {
        std::env::set_var("WINDFALL_CLIENT_SECRET", "s3cret");
        std::env::set_var("WINDFALL_PASSWORD", "hunter2");
        let mut config = Config::default();
        config.apply_env();
        std::env::remove_var("WINDFALL_CLIENT_SECRET");
        std::env::remove_var("WINDFALL_PASSWORD");
        assert_eq!(config.platform.client_secret, "s3cret");
        assert_eq!(config.platform.password, "hunter2");
    }

    #[test]
    fn test_duration_accessors() {
        let config = Config::default();
        assert_eq!(config.locate_interval(), Duration::from_secs(60));
        assert_eq!(config.delivery_delay(), Duration::from_secs(900));
    }
}
