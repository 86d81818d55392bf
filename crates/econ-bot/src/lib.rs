//! Economic data notification bot
//!
//! Relays FRED economic data and Finviz stock charts into Discord. It
//! includes:
//!
//! - A FRED client (series info, observations, search, release schedules)
//! - A Finviz chart client with attachment upload and link fallback
//! - A release calendar for a fixed set of tracked indicators
//! - A reminder poller that notifies subscribed channels before releases
//! - A persistent channel subscription store
//! - Prefix and slash command handling on Discord, plus a local console
//!
//! # Example
//!
//! ```rust,ignore
//! use econ_bot::{BotConfig, EconBot, platforms::discord};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BotConfig::from_env()?;
//!     let bot = Arc::new(EconBot::new(config).await?);
//!     discord::run(bot).await
//! }
//! ```

pub mod analysis;
pub mod api;
pub mod bot;
pub mod calendar;
pub mod config;
pub mod error;
pub mod indicators;
pub mod interface;
pub mod platforms;
pub mod reminder;
pub mod subscriptions;

// Re-export main types for convenience
pub use bot::{Command, CommandContext, EconBot};
pub use calendar::{CalendarSnapshot, CalendarSource, FredCalendar, ReleaseEvent};
pub use config::BotConfig;
pub use error::{BotError, Result};
pub use interface::{Embed, Reply};
pub use reminder::{Notifier, ReminderPoller, ReminderSettings};
pub use subscriptions::SubscriptionStore;
