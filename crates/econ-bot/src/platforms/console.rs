//! Console bot
//!
//! Runs the command router against stdin for local use without Discord
//! credentials. The console acts as one administrator in one channel.

use crate::bot::{CommandContext, EconBot};
use crate::calendar::ReleaseEvent;
use crate::error::Result;
use crate::interface::formatter::reminder_embed;
use crate::interface::reply::Reply;
use crate::interface::{ConsoleFormatter, Formatter};
use crate::reminder::Notifier;
use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Channel id the console subscribes and posts as
pub const CONSOLE_CHANNEL_ID: u64 = 1;

/// Prints reminders to stdout
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, channel_id: u64, event: &ReleaseEvent) -> Result<()> {
        tracing::info!(channel_id, series_id = %event.series_id, "Release reminder");
        let text = ConsoleFormatter.render(&Reply::embed(reminder_embed(event)));
        println!("\n[channel {}]\n{}\n", channel_id, text);
        Ok(())
    }
}

/// Interactive console front end
pub struct ConsoleBot {
    bot: Arc<EconBot>,
    formatter: Box<dyn Formatter>,
    context: CommandContext,
}

impl ConsoleBot {
    pub fn new(bot: Arc<EconBot>) -> Self {
        Self {
            bot,
            formatter: Box::new(ConsoleFormatter),
            context: CommandContext::new(CONSOLE_CHANNEL_ID).admin(true),
        }
    }

    /// Prepend the command prefix when the user left it out
    pub fn normalize_input(&self, input: &str) -> String {
        let input = input.trim();
        let prefix = self.bot.prefix();
        if input.starts_with(prefix) {
            input.to_string()
        } else {
            format!("{}{}", prefix, input)
        }
    }

    /// Handle one line; `None` means the user asked to quit
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let line = line.trim();
        if matches!(line, "exit" | "quit") {
            return None;
        }
        if line.is_empty() {
            return Some(String::new());
        }

        let input = self.normalize_input(line);
        let output = match self.bot.process_input(&input, &self.context).await {
            Some(reply) => self.formatter.render(&reply),
            None => String::new(),
        };
        Some(output)
    }

    /// Read commands from stdin until EOF or `exit`
    pub async fn run(self) -> anyhow::Result<()> {
        let poller = self.bot.reminder_poller(LogNotifier);
        let poller_task = tokio::spawn(poller.run());

        println!(
            "Economic data bot console ({} platform). Type 'help' for commands, 'exit' to quit.",
            self.formatter.platform()
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                println!("\nGoodbye!");
                break;
            };

            match self.handle_line(&line).await {
                Some(output) if output.is_empty() => {}
                Some(output) => println!("{}\n", output),
                None => {
                    println!("Goodbye!");
                    break;
                }
            }
        }

        poller_task.abort();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use crate::indicators::Impact;
    use crate::subscriptions::SubscriptionStore;
    use chrono::NaiveDate;

    fn console() -> ConsoleBot {
        let config = BotConfig::builder()
            .fred_api_key("test_key")
            .fred_base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        let bot = EconBot::with_subscriptions(config, SubscriptionStore::in_memory()).unwrap();
        ConsoleBot::new(Arc::new(bot))
    }

    #[test]
    fn test_normalize_input() {
        let console = console();
        assert_eq!(console.normalize_input("help"), ";help");
        assert_eq!(console.normalize_input("  ;aapl d "), ";aapl d");
    }

    #[tokio::test]
    async fn test_exit_and_blank_lines() {
        let console = console();
        assert_eq!(console.handle_line("exit").await, None);
        assert_eq!(console.handle_line("quit").await, None);
        assert_eq!(console.handle_line("   ").await, Some(String::new()));
    }

    #[tokio::test]
    async fn test_console_is_admin() {
        let console = console();
        let output = console.handle_line("setchannel").await.unwrap();
        assert!(output.contains("will now receive"));
        assert_eq!(
            console.bot.subscriptions().list_subscribers().await,
            vec![CONSOLE_CHANNEL_ID]
        );
    }

    #[tokio::test]
    async fn test_log_notifier_succeeds() {
        let event = ReleaseEvent {
            series_id: "ICSA".to_string(),
            title: "Initial Jobless Claims".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 6).unwrap(),
            scheduled_at: None,
            impact: Impact::Medium,
            previous: "229,000".to_string(),
        };
        assert!(LogNotifier.notify(CONSOLE_CHANNEL_ID, &event).await.is_ok());
    }
}
