//! Platform-specific bot implementations

pub mod console;
pub mod discord;

pub use console::{ConsoleBot, LogNotifier};
pub use discord::DiscordNotifier;
