//! Configuration for the economic data bot

use crate::error::{BotError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default FRED API endpoint
pub const DEFAULT_FRED_BASE_URL: &str = "https://api.stlouisfed.org/fred";

/// Default Finviz endpoint
pub const DEFAULT_FINVIZ_BASE_URL: &str = "https://finviz.com";

/// Configuration for the bot
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Discord bot token (only needed when connecting to Discord)
    pub discord_token: Option<String>,

    /// FRED API key
    pub fred_api_key: String,

    /// Prefix for text commands
    pub command_prefix: String,

    /// File holding subscribed channel ids
    pub subscriptions_path: PathBuf,

    /// How often the reminder poller wakes up
    pub poll_interval: Duration,

    /// How long a fetched release calendar stays fresh
    pub calendar_refresh_interval: Duration,

    /// How far ahead of a release the reminder goes out
    pub reminder_lead: Duration,

    /// Number of days of upcoming releases kept in the calendar
    pub calendar_horizon_days: u32,

    /// Timeout for chart downloads
    pub chart_timeout: Duration,

    /// FRED requests per minute
    pub fred_rate_limit: u32,

    /// FRED API base URL
    pub fred_base_url: String,

    /// Finviz base URL
    pub finviz_base_url: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            discord_token: None,
            fred_api_key: String::new(),
            command_prefix: ";".to_string(),
            subscriptions_path: PathBuf::from("channels.json"),
            poll_interval: Duration::from_secs(60),               // 1 minute
            calendar_refresh_interval: Duration::from_secs(86_400), // 1 day
            reminder_lead: Duration::from_secs(15 * 60),          // 15 minutes
            calendar_horizon_days: 7,
            chart_timeout: Duration::from_secs(15),
            fred_rate_limit: 120,
            fred_base_url: DEFAULT_FRED_BASE_URL.to_string(),
            finviz_base_url: DEFAULT_FINVIZ_BASE_URL.to_string(),
        }
    }
}

impl BotConfig {
    /// Create a new configuration builder
    pub fn builder() -> BotConfigBuilder {
        BotConfigBuilder::default()
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::builder().with_env()?.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.fred_api_key.trim().is_empty() {
            return Err(BotError::ConfigError(
                "FRED_API_KEY environment variable not set".to_string(),
            ));
        }

        if self.command_prefix.is_empty() || self.command_prefix.contains(char::is_whitespace) {
            return Err(BotError::ConfigError(
                "command prefix must be non-empty and contain no whitespace".to_string(),
            ));
        }

        if self.poll_interval.is_zero() {
            return Err(BotError::ConfigError(
                "poll interval must be greater than 0".to_string(),
            ));
        }

        if self.reminder_lead.is_zero() {
            return Err(BotError::ConfigError(
                "reminder lead time must be greater than 0".to_string(),
            ));
        }

        if self.fred_rate_limit == 0 {
            return Err(BotError::ConfigError(
                "fred_rate_limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Discord token, or a configuration error when it is missing
    pub fn require_discord_token(&self) -> Result<&str> {
        self.discord_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                BotError::ConfigError("DISCORD_TOKEN environment variable not set".to_string())
            })
    }
}

/// Builder for BotConfig
#[derive(Debug, Default)]
pub struct BotConfigBuilder {
    discord_token: Option<String>,
    fred_api_key: Option<String>,
    command_prefix: Option<String>,
    subscriptions_path: Option<PathBuf>,
    poll_interval: Option<Duration>,
    calendar_refresh_interval: Option<Duration>,
    reminder_lead: Option<Duration>,
    calendar_horizon_days: Option<u32>,
    chart_timeout: Option<Duration>,
    fred_rate_limit: Option<u32>,
    fred_base_url: Option<String>,
    finviz_base_url: Option<String>,
}

impl BotConfigBuilder {
    /// Set the Discord token
    pub fn discord_token(mut self, token: impl Into<String>) -> Self {
        self.discord_token = Some(token.into());
        self
    }

    /// Set the FRED API key
    pub fn fred_api_key(mut self, key: impl Into<String>) -> Self {
        self.fred_api_key = Some(key.into());
        self
    }

    /// Set the text command prefix
    pub fn command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.command_prefix = Some(prefix.into());
        self
    }

    /// Set the subscription file path
    pub fn subscriptions_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.subscriptions_path = Some(path.into());
        self
    }

    /// Set the poller tick interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Set how long a fetched calendar stays fresh
    pub fn calendar_refresh_interval(mut self, interval: Duration) -> Self {
        self.calendar_refresh_interval = Some(interval);
        self
    }

    /// Set the reminder lead time
    pub fn reminder_lead(mut self, lead: Duration) -> Self {
        self.reminder_lead = Some(lead);
        self
    }

    /// Set the calendar horizon in days
    pub fn calendar_horizon_days(mut self, days: u32) -> Self {
        self.calendar_horizon_days = Some(days);
        self
    }

    /// Set the chart download timeout
    pub fn chart_timeout(mut self, timeout: Duration) -> Self {
        self.chart_timeout = Some(timeout);
        self
    }

    /// Set the FRED rate limit (requests per minute)
    pub fn fred_rate_limit(mut self, limit: u32) -> Self {
        self.fred_rate_limit = Some(limit);
        self
    }

    /// Override the FRED base URL
    pub fn fred_base_url(mut self, url: impl Into<String>) -> Self {
        self.fred_base_url = Some(url.into());
        self
    }

    /// Override the Finviz base URL
    pub fn finviz_base_url(mut self, url: impl Into<String>) -> Self {
        self.finviz_base_url = Some(url.into());
        self
    }

    /// Load settings from the process environment
    pub fn with_env(self) -> Result<Self> {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through a lookup function
    ///
    /// Only variables that are present override the builder.
    pub fn with_lookup<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("DISCORD_TOKEN") {
            self.discord_token = Some(token);
        }
        if let Some(key) = lookup("FRED_API_KEY") {
            self.fred_api_key = Some(key);
        }
        if let Some(prefix) = lookup("ECON_BOT_PREFIX") {
            self.command_prefix = Some(prefix);
        }
        if let Some(path) = lookup("ECON_BOT_SUBSCRIPTIONS") {
            self.subscriptions_path = Some(PathBuf::from(path));
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "ECON_BOT_POLL_SECONDS")? {
            self.poll_interval = Some(Duration::from_secs(secs));
        }
        if let Some(minutes) = parse_var::<u64, _>(&lookup, "ECON_BOT_LEAD_MINUTES")? {
            self.reminder_lead = Some(Duration::from_secs(minutes.saturating_mul(60)));
        }
        if let Some(days) = parse_var::<u32, _>(&lookup, "ECON_BOT_HORIZON_DAYS")? {
            self.calendar_horizon_days = Some(days);
        }
        Ok(self)
    }

    /// Build the configuration
    pub fn build(self) -> Result<BotConfig> {
        let defaults = BotConfig::default();

        let config = BotConfig {
            discord_token: self.discord_token,
            fred_api_key: self.fred_api_key.unwrap_or(defaults.fred_api_key),
            command_prefix: self.command_prefix.unwrap_or(defaults.command_prefix),
            subscriptions_path: self
                .subscriptions_path
                .unwrap_or(defaults.subscriptions_path),
            poll_interval: self.poll_interval.unwrap_or(defaults.poll_interval),
            calendar_refresh_interval: self
                .calendar_refresh_interval
                .unwrap_or(defaults.calendar_refresh_interval),
            reminder_lead: self.reminder_lead.unwrap_or(defaults.reminder_lead),
            calendar_horizon_days: self
                .calendar_horizon_days
                .unwrap_or(defaults.calendar_horizon_days),
            chart_timeout: self.chart_timeout.unwrap_or(defaults.chart_timeout),
            fred_rate_limit: self.fred_rate_limit.unwrap_or(defaults.fred_rate_limit),
            fred_base_url: self.fred_base_url.unwrap_or(defaults.fred_base_url),
            finviz_base_url: self.finviz_base_url.unwrap_or(defaults.finviz_base_url),
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            BotError::ConfigError(format!("{key} has an invalid value: {raw}"))
        }),
    }
}
