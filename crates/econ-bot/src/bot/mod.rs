//! Economic data bot
//!
//! Platform-independent command execution. Discord and the console both
//! parse or construct a [`Command`] and hand it to [`EconBot::handle`], which
//! always produces a [`Reply`]; failures become user-facing messages.
//!
//! # Example
//!
//! ```rust,ignore
//! use econ_bot::{BotConfig, EconBot, bot::CommandContext};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bot = EconBot::new(BotConfig::from_env()?).await?;
//!     let ctx = CommandContext::new(1);
//!     if let Some(reply) = bot.process_input(";getdata UNRATE", &ctx).await {
//!         println!("{:?}", reply);
//!     }
//!     Ok(())
//! }
//! ```

pub mod commands;

use crate::analysis::correlate;
use crate::api::finviz::ChartClient;
use crate::api::fred::FredClient;
use crate::calendar::{CalendarSource, FredCalendar};
use crate::config::BotConfig;
use crate::error::{BotError, Result};
use crate::interface::formatter;
use crate::interface::reply::Reply;
use crate::reminder::{Notifier, ReminderPoller, ReminderSettings, SharedEvents};
use crate::subscriptions::SubscriptionStore;
use chrono::{Days, Utc};
use std::sync::Arc;

pub use commands::Command;

/// Where a command came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandContext {
    pub channel_id: u64,
    /// Caller has the administrator permission in this channel
    pub is_admin: bool,
}

impl CommandContext {
    pub fn new(channel_id: u64) -> Self {
        Self {
            channel_id,
            is_admin: false,
        }
    }

    pub fn admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }
}

/// Economic data and chart bot
pub struct EconBot {
    config: BotConfig,
    fred: Arc<FredClient>,
    charts: ChartClient,
    calendar: Arc<dyn CalendarSource>,
    subscriptions: Arc<SubscriptionStore>,
    events: SharedEvents,
}

impl EconBot {
    /// Create a bot, loading subscriptions from the configured file
    pub async fn new(config: BotConfig) -> Result<Self> {
        let subscriptions = SubscriptionStore::open(&config.subscriptions_path).await?;
        Self::with_subscriptions(config, subscriptions)
    }

    /// Create a bot around an existing subscription store
    pub fn with_subscriptions(config: BotConfig, subscriptions: SubscriptionStore) -> Result<Self> {
        config.validate()?;

        let fred = Arc::new(FredClient::from_config(&config));
        let charts = ChartClient::from_config(&config)?;
        let calendar: Arc<dyn CalendarSource> =
            Arc::new(FredCalendar::new(fred.clone(), config.calendar_horizon_days));

        Ok(Self {
            config,
            fred,
            charts,
            calendar,
            subscriptions: Arc::new(subscriptions),
            events: SharedEvents::default(),
        })
    }

    /// Replace the release calendar source
    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarSource>) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn prefix(&self) -> &str {
        &self.config.command_prefix
    }

    pub fn subscriptions(&self) -> &Arc<SubscriptionStore> {
        &self.subscriptions
    }

    /// Cached release calendar
    pub fn events(&self) -> &SharedEvents {
        &self.events
    }

    /// Build the reminder poller sharing this bot's calendar cache
    pub fn reminder_poller<N: Notifier>(&self, notifier: N) -> ReminderPoller<dyn CalendarSource, N> {
        ReminderPoller::new(
            self.calendar.clone(),
            notifier,
            self.subscriptions.clone(),
            self.events.clone(),
            ReminderSettings::from_config(&self.config),
        )
    }

    /// Handle a prefix-style message; `None` when it is not addressed to the bot
    pub async fn process_input(&self, input: &str, ctx: &CommandContext) -> Option<Reply> {
        if !input.trim_start().starts_with(self.prefix()) {
            return None;
        }

        let reply = match Command::parse(input, self.prefix()) {
            Ok(command) => self.handle(command, ctx).await,
            Err(e) => Reply::error(e.to_string()),
        };
        Some(reply)
    }

    /// Execute a command, turning failures into a user-facing reply
    pub async fn handle(&self, command: Command, ctx: &CommandContext) -> Reply {
        let context = match &command {
            Command::GetData { .. } => Some("Error fetching data"),
            Command::Search { .. } => Some("Error searching"),
            Command::Correlation { .. } => Some("Error calculating correlation"),
            Command::Events => Some("Error fetching events"),
            Command::SetChannel | Command::RemoveChannel => Some("Error updating subscriptions"),
            Command::Help | Command::Chart { .. } => None,
        };
        let description = command.description();

        match self.execute(command, ctx).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(command = description, channel_id = ctx.channel_id, error = %e, "Command failed");
                match context {
                    Some(context) => Reply::error(format!("{}: {}", context, e)),
                    None => Reply::error(e.to_string()),
                }
            }
        }
    }

    /// Execute a parsed command
    pub async fn execute(&self, command: Command, ctx: &CommandContext) -> Result<Reply> {
        if command.requires_admin() && !ctx.is_admin {
            return Ok(Reply::error(
                "You need administrator permissions to use this command.",
            ));
        }

        match command {
            Command::Help => Ok(Reply::embed(formatter::help_embed(self.prefix()))),
            Command::SetChannel => {
                if self.subscriptions.subscribe(ctx.channel_id).await? {
                    Ok(Reply::text(
                        "✅ This channel will now receive economic event notifications!",
                    ))
                } else {
                    Ok(Reply::text(
                        "✅ This channel already receives economic event notifications.",
                    ))
                }
            }
            Command::RemoveChannel => {
                if self.subscriptions.unsubscribe(ctx.channel_id).await? {
                    Ok(Reply::text(
                        "❌ This channel will no longer receive economic event notifications!",
                    ))
                } else {
                    Ok(Reply::text(
                        "This channel was not receiving economic event notifications.",
                    ))
                }
            }
            Command::Events => {
                if self.events.read().await.is_empty() {
                    self.refresh_events().await?;
                }
                let events = self.events.read().await;
                Ok(formatter::events_reply(&events))
            }
            Command::GetData { series_id } => {
                let (info, latest) = tokio::try_join!(
                    self.fred.get_series_info(&series_id),
                    self.fred.get_latest(&series_id),
                )?;
                Ok(Reply::embed(formatter::series_embed(&info, &latest)))
            }
            Command::Search { text } => {
                let results = self.fred.search(&text, 5).await?;
                Ok(Reply::embed(formatter::search_embed(&text, &results)))
            }
            Command::Correlation {
                series1,
                series2,
                days,
            } => {
                let start = Utc::now()
                    .date_naive()
                    .checked_sub_days(Days::new(u64::from(days)))
                    .ok_or_else(|| BotError::CommandError(format!("Invalid day range: {days}")))?;
                let (a, b) = tokio::try_join!(
                    self.fred.get_series_since(&series1, start),
                    self.fred.get_series_since(&series2, start),
                )?;
                let result = correlate(&a, &b)?;
                Ok(Reply::embed(formatter::correlation_embed(
                    &series1, &series2, days, &result,
                )))
            }
            Command::Chart { ticker, timeframe } => {
                let result = self
                    .charts
                    .chart(&ticker, timeframe, Utc::now().timestamp())
                    .await;
                Ok(formatter::chart_reply(&result))
            }
        }
    }

    /// Reload the release calendar into the shared cache
    pub async fn refresh_events(&self) -> Result<usize> {
        let snapshot = self.calendar.upcoming_releases(Utc::now()).await?;
        if !snapshot.is_complete() {
            tracing::warn!(unresolved = ?snapshot.unresolved, "Some release schedules are missing");
        }
        let count = snapshot.events.len();
        *self.events.write().await = snapshot.events;
        Ok(count)
    }
}
