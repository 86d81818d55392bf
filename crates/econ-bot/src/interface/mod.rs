//! Bot platform interfaces
//!
//! Platform-agnostic reply model and formatting shared by Discord and the
//! console

pub mod formatter;
pub mod reply;

pub use formatter::{ConsoleFormatter, Formatter};
pub use reply::{Attachment, BotPlatform, Embed, EmbedField, Reply, ResponseType};
