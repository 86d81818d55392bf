//! Platform-agnostic replies
//!
//! Command handlers return a [`Reply`]; each platform turns it into its own
//! message format.

use serde::{Deserialize, Serialize};

/// Platform identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BotPlatform {
    /// Discord gateway bot
    Discord,

    /// Local line-oriented console
    Console,
}

impl std::fmt::Display for BotPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotPlatform::Discord => write!(f, "Discord"),
            BotPlatform::Console => write!(f, "Console"),
        }
    }
}

/// Type of reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    /// Plain text
    Text,

    /// Rich message with embeds
    Formatted,

    /// Error message
    Error,
}

/// A named value inside an embed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Rich card with title, fields and optional image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub fields: Vec<EmbedField>,
    /// Remote URL or `attachment://<file name>`
    pub image_url: Option<String>,
    pub footer: Option<String>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }
}

/// File uploaded alongside a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub content: Vec<u8>,
    pub filename: String,
}

impl Attachment {
    /// A PNG chart
    pub fn chart_png(content: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            content,
            filename: filename.into(),
        }
    }

    /// URL an embed uses to show this attachment
    pub fn embed_url(&self) -> String {
        format!("attachment://{}", self.filename)
    }
}

/// Bot reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Text content, may be empty when embeds carry everything
    pub content: String,
    pub response_type: ResponseType,
    pub embeds: Vec<Embed>,
    pub attachments: Vec<Attachment>,
}

impl Reply {
    /// Create a simple text reply
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            response_type: ResponseType::Text,
            embeds: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Create a reply consisting of one embed
    pub fn embed(embed: Embed) -> Self {
        Self {
            content: String::new(),
            response_type: ResponseType::Formatted,
            embeds: vec![embed],
            attachments: Vec::new(),
        }
    }

    /// Create an error reply
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            response_type: ResponseType::Error,
            embeds: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.response_type = ResponseType::Formatted;
        self.embeds.push(embed);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn is_error(&self) -> bool {
        self.response_type == ResponseType::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_creation() {
        let reply = Reply::text("Hello, world!");
        assert_eq!(reply.response_type, ResponseType::Text);
        assert_eq!(reply.content, "Hello, world!");
        assert!(!reply.is_error());
        assert!(Reply::error("boom").is_error());
    }

    #[test]
    fn test_embed_builder() {
        let embed = Embed::new()
            .title("VIX")
            .color(0x00ff00)
            .field("Latest Value", "13.20", true)
            .field("Units", "Index", true)
            .footer("FRED");

        assert_eq!(embed.title.as_deref(), Some("VIX"));
        assert_eq!(embed.fields.len(), 2);
        assert_eq!(embed.fields[1].name, "Units");
    }

    #[test]
    fn test_attachment_embed_url() {
        let attachment = Attachment::chart_png(vec![1, 2, 3], "AAPL_d_1.png");
        assert_eq!(attachment.embed_url(), "attachment://AAPL_d_1.png");

        let reply = Reply::text("")
            .with_embed(Embed::new().image(attachment.embed_url()))
            .with_attachment(attachment);
        assert_eq!(reply.response_type, ResponseType::Formatted);
        assert_eq!(reply.attachments.len(), 1);
    }
}
