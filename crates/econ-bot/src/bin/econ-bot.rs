//! Economic data bot
//!
//! Runs the Discord bot, or a local console with `--console`.
//!
//! # Usage
//!
//! ```bash
//! # Set up environment variables (or put them in .env)
//! export FRED_API_KEY="your-fred-key"
//! export DISCORD_TOKEN="your-discord-token"
//!
//! # Run the bot
//! cargo run --bin econ-bot -p econ-bot
//!
//! # Try commands locally without Discord
//! cargo run --bin econ-bot -p econ-bot -- --console
//! ```

use clap::Parser;
use econ_bot::platforms::{ConsoleBot, discord};
use econ_bot::{BotConfig, EconBot};
use econ_utils::{LogFormat, init_tracing, load_dotenv};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "econ-bot", version, about = "FRED economic data and Finviz chart bot for Discord")]
struct Args {
    /// Run an interactive console instead of connecting to Discord
    #[arg(long)]
    console: bool,

    /// Subscription file (overrides ECON_BOT_SUBSCRIPTIONS)
    #[arg(long, value_name = "PATH")]
    subscriptions: Option<PathBuf>,

    /// Command prefix (overrides ECON_BOT_PREFIX)
    #[arg(long, value_name = "PREFIX")]
    prefix: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let dotenv = load_dotenv();
    init_tracing(LogFormat::from_flag(args.log_json));
    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    let mut builder = BotConfig::builder().with_env()?;
    if let Some(path) = args.subscriptions {
        builder = builder.subscriptions_path(path);
    }
    if let Some(prefix) = args.prefix {
        builder = builder.command_prefix(prefix);
    }
    let config = builder.build()?;

    tracing::info!(
        prefix = %config.command_prefix,
        subscriptions = %config.subscriptions_path.display(),
        console = args.console,
        "Starting econ-bot"
    );

    let bot = Arc::new(EconBot::new(config).await?);

    if args.console {
        ConsoleBot::new(bot).run().await
    } else {
        discord::run(bot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args() {
        Args::command().debug_assert();

        let args = Args::parse_from(["econ-bot", "--console", "--prefix", "!", "--log-json"]);
        assert!(args.console);
        assert!(args.log_json);
        assert_eq!(args.prefix.as_deref(), Some("!"));
        assert!(args.subscriptions.is_none());
    }
}
