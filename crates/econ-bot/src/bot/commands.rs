//! Command parsing for prefix-style chat messages
//!
//! Named commands take precedence; any other two-word message is read as a
//! chart request (`;aapl d`).

use crate::api::finviz::{Timeframe, validate_ticker};
use crate::error::{BotError, Result};

/// Default look-back for `correlation`
pub const DEFAULT_CORRELATION_DAYS: u32 = 90;

/// Upper bound on the correlation window
pub const MAX_CORRELATION_DAYS: u32 = 36_500;

/// Parsed command from user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show help
    Help,
    /// Subscribe the current channel to reminders
    SetChannel,
    /// Unsubscribe the current channel
    RemoveChannel,
    /// List upcoming releases
    Events,
    /// Latest value of a series
    GetData { series_id: String },
    /// Keyword search over FRED series
    Search { text: String },
    /// Correlation of two series over the last `days` days
    Correlation {
        series1: String,
        series2: String,
        days: u32,
    },
    /// Finviz chart
    Chart { ticker: String, timeframe: Timeframe },
}

/// Reply to anything that is neither a named command nor a chart request
pub fn invalid_command_message(prefix: &str) -> String {
    format!(
        "Invalid command. Use format: {p}ticker timeframe (e.g., {p}aapl d, {p}aapl w, {p}aapl m)",
        p = prefix
    )
}

impl Command {
    /// Parse a command from user input
    ///
    /// `input` must start with `prefix`.
    pub fn parse(input: &str, prefix: &str) -> Result<Self> {
        let input = input.trim();
        let body = input
            .strip_prefix(prefix)
            .ok_or_else(|| BotError::CommandError(invalid_command_message(prefix)))?;

        let parts: Vec<&str> = body.split_whitespace().collect();
        let Some((first, args)) = parts.split_first() else {
            return Err(BotError::CommandError(invalid_command_message(prefix)));
        };

        match first.to_lowercase().as_str() {
            "help" => Ok(Command::Help),
            "setchannel" => Ok(Command::SetChannel),
            "removechannel" => Ok(Command::RemoveChannel),
            "events" => Ok(Command::Events),
            "getdata" => {
                let series_id = args.first().ok_or_else(|| {
                    BotError::CommandError(format!("Usage: {prefix}getdata <series_id>"))
                })?;
                Ok(Command::GetData {
                    series_id: series_id.to_uppercase(),
                })
            }
            "search" => {
                if args.is_empty() {
                    return Err(BotError::CommandError(format!(
                        "Usage: {prefix}search <keywords>"
                    )));
                }
                Ok(Command::Search {
                    text: args.join(" "),
                })
            }
            "correlation" => {
                let [series1, series2, rest @ ..] = args else {
                    return Err(BotError::CommandError(format!(
                        "Usage: {prefix}correlation <series1> <series2> [days]"
                    )));
                };
                let days = match rest.first() {
                    Some(raw) => parse_days(raw)?,
                    None => DEFAULT_CORRELATION_DAYS,
                };
                Ok(Command::Correlation {
                    series1: series1.to_uppercase(),
                    series2: series2.to_uppercase(),
                    days,
                })
            }
            _ => match parts.as_slice() {
                [ticker, timeframe] => Ok(Command::Chart {
                    ticker: validate_ticker(ticker)?,
                    timeframe: Timeframe::parse(timeframe)?,
                }),
                _ => Err(BotError::CommandError(invalid_command_message(prefix))),
            },
        }
    }

    /// Whether the command needs administrator permission
    pub fn requires_admin(&self) -> bool {
        matches!(self, Command::SetChannel | Command::RemoveChannel)
    }

    /// Get a short description of the command
    pub fn description(&self) -> &'static str {
        match self {
            Command::Help => "Show help",
            Command::SetChannel => "Enable release reminders in this channel",
            Command::RemoveChannel => "Disable release reminders in this channel",
            Command::Events => "List upcoming economic releases",
            Command::GetData { .. } => "Latest value of an economic series",
            Command::Search { .. } => "Search FRED series",
            Command::Correlation { .. } => "Correlation between two series",
            Command::Chart { .. } => "Stock chart",
        }
    }
}

/// Validate a correlation window in days
pub fn parse_days(raw: &str) -> Result<u32> {
    match raw.parse::<u32>() {
        Ok(days) if (1..=MAX_CORRELATION_DAYS).contains(&days) => Ok(days),
        _ => Err(BotError::CommandError(format!(
            "Days must be a whole number between 1 and {MAX_CORRELATION_DAYS}, got '{raw}'"
        ))),
    }
}
