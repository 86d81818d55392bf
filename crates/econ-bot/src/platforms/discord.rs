//! Discord bot implementation
//!
//! Slash commands are registered through poise. Prefix messages are routed
//! through the event handler and parsed by [`Command::parse`], since the free
//! form chart syntax (`;aapl d`) has no fixed command name.

use crate::api::finviz::{Timeframe, validate_ticker};
use crate::bot::commands::DEFAULT_CORRELATION_DAYS;
use crate::bot::{Command, CommandContext, EconBot};
use crate::calendar::ReleaseEvent;
use crate::error::{BotError, Result};
use crate::interface::formatter::reminder_embed;
use crate::interface::reply::{Embed, Reply};
use crate::reminder::Notifier;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::num::NonZeroU64;
use std::sync::Arc;

/// Shared data accessible across all poise commands and event handlers
pub struct Data {
    pub bot: Arc<EconBot>,
}

pub type Error = anyhow::Error;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Convert an embed to the serenity builder
pub fn to_create_embed(embed: &Embed) -> serenity::CreateEmbed {
    let mut builder = serenity::CreateEmbed::new();
    if let Some(title) = &embed.title {
        builder = builder.title(title);
    }
    if let Some(description) = &embed.description {
        builder = builder.description(description);
    }
    if let Some(color) = embed.color {
        builder = builder.color(color);
    }
    for field in &embed.fields {
        builder = builder.field(&field.name, &field.value, field.inline);
    }
    if let Some(url) = &embed.image_url {
        builder = builder.image(url);
    }
    if let Some(footer) = &embed.footer {
        builder = builder.footer(serenity::CreateEmbedFooter::new(footer));
    }
    builder
}

fn to_attachments(reply: &Reply) -> Vec<serenity::CreateAttachment> {
    reply
        .attachments
        .iter()
        .map(|a| serenity::CreateAttachment::bytes(a.content.clone(), a.filename.clone()))
        .collect()
}

/// Convert a reply to a channel message
pub fn to_create_message(reply: &Reply) -> serenity::CreateMessage {
    let mut message = serenity::CreateMessage::new();
    if !reply.content.is_empty() {
        message = message.content(&reply.content);
    }
    message
        .embeds(reply.embeds.iter().map(to_create_embed).collect())
        .add_files(to_attachments(reply))
}

/// Convert a reply to a slash command response
///
/// Errors are only shown to the caller, except after a public defer where
/// Discord keeps the deferred visibility.
pub fn to_create_reply(reply: &Reply, deferred: bool) -> poise::CreateReply {
    let mut builder = poise::CreateReply::default().ephemeral(reply.is_error() && !deferred);
    if !reply.content.is_empty() {
        builder = builder.content(&reply.content);
    }
    for embed in &reply.embeds {
        builder = builder.embed(to_create_embed(embed));
    }
    for attachment in to_attachments(reply) {
        builder = builder.attachment(attachment);
    }
    builder
}

/// Posts reminders to Discord channels
pub struct DiscordNotifier {
    http: Arc<serenity::Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, channel_id: u64, event: &ReleaseEvent) -> Result<()> {
        let channel = NonZeroU64::new(channel_id)
            .map(serenity::ChannelId::from)
            .ok_or_else(|| BotError::NotificationError(format!("invalid channel id {channel_id}")))?;

        let message = serenity::CreateMessage::new().embed(to_create_embed(&reminder_embed(event)));
        channel
            .send_message(self.http.as_ref(), message)
            .await
            .map_err(|e| BotError::NotificationError(e.to_string()))?;
        Ok(())
    }
}

async fn send_result(
    ctx: Context<'_>,
    command: Command,
    deferred: bool,
) -> std::result::Result<(), Error> {
    // poise has already enforced required_permissions for admin commands
    let command_ctx = CommandContext::new(ctx.channel_id().get()).admin(command.requires_admin());
    let reply = ctx.data().bot.handle(command, &command_ctx).await;
    ctx.send(to_create_reply(&reply, deferred)).await?;
    Ok(())
}

async fn respond(ctx: Context<'_>, command: Command) -> std::result::Result<(), Error> {
    send_result(ctx, command, false).await
}

/// Acknowledge first for commands that call out to FRED or Finviz
async fn respond_deferred(ctx: Context<'_>, command: Command) -> std::result::Result<(), Error> {
    ctx.defer().await?;
    send_result(ctx, command, true).await
}

/// Show available commands and usage information
#[poise::command(slash_command)]
async fn help(ctx: Context<'_>) -> std::result::Result<(), Error> {
    respond(ctx, Command::Help).await
}

/// Set current channel for economic event announcements
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    default_member_permissions = "ADMINISTRATOR"
)]
async fn setchannel(ctx: Context<'_>) -> std::result::Result<(), Error> {
    respond(ctx, Command::SetChannel).await
}

/// Remove current channel from economic event announcements
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    default_member_permissions = "ADMINISTRATOR"
)]
async fn removechannel(ctx: Context<'_>) -> std::result::Result<(), Error> {
    respond(ctx, Command::RemoveChannel).await
}

/// Lists upcoming economic releases and events
#[poise::command(slash_command)]
async fn events(ctx: Context<'_>) -> std::result::Result<(), Error> {
    respond_deferred(ctx, Command::Events).await
}

/// Get current value for an economic indicator
#[poise::command(slash_command)]
async fn getdata(
    ctx: Context<'_>,
    #[description = "The series ID to look up (e.g., VIXCLS, CPIAUCSL)"] series_id: String,
) -> std::result::Result<(), Error> {
    let series_id = series_id.trim().to_uppercase();
    respond_deferred(ctx, Command::GetData { series_id }).await
}

/// Search for economic data series by keywords
#[poise::command(slash_command)]
async fn search(
    ctx: Context<'_>,
    #[description = "Keywords to search for (e.g., treasury yield)"] keywords: String,
) -> std::result::Result<(), Error> {
    respond_deferred(ctx, Command::Search { text: keywords.trim().to_string() }).await
}

/// Calculate correlation between two economic indicators
#[poise::command(slash_command)]
async fn correlation(
    ctx: Context<'_>,
    #[description = "First series ID (e.g., VIXCLS)"] series1: String,
    #[description = "Second series ID (e.g., DCOILWTICO)"] series2: String,
    #[description = "Number of days to analyze (default: 90)"]
    #[min = 1]
    #[max = 36500]
    days: Option<u32>,
) -> std::result::Result<(), Error> {
    let command = Command::Correlation {
        series1: series1.trim().to_uppercase(),
        series2: series2.trim().to_uppercase(),
        days: days.unwrap_or(DEFAULT_CORRELATION_DAYS),
    };
    respond_deferred(ctx, command).await
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
enum ChartTimeframe {
    #[name = "Daily"]
    Daily,
    #[name = "Weekly"]
    Weekly,
    #[name = "Monthly"]
    Monthly,
}

impl From<ChartTimeframe> for Timeframe {
    fn from(value: ChartTimeframe) -> Self {
        match value {
            ChartTimeframe::Daily => Timeframe::Daily,
            ChartTimeframe::Weekly => Timeframe::Weekly,
            ChartTimeframe::Monthly => Timeframe::Monthly,
        }
    }
}

/// Get a stock chart from Finviz
#[poise::command(slash_command)]
async fn chart(
    ctx: Context<'_>,
    #[description = "Stock ticker symbol (e.g., AAPL, MSFT)"] ticker: String,
    #[description = "Chart timeframe"] timeframe: ChartTimeframe,
) -> std::result::Result<(), Error> {
    let ticker = match validate_ticker(&ticker) {
        Ok(ticker) => ticker,
        Err(e) => {
            ctx.send(to_create_reply(&Reply::error(e.to_string()), false)).await?;
            return Ok(());
        }
    };

    respond_deferred(
        ctx,
        Command::Chart {
            ticker,
            timeframe: timeframe.into(),
        },
    )
    .await
}

/// All slash commands
pub fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        help(),
        setchannel(),
        removechannel(),
        events(),
        getdata(),
        search(),
        correlation(),
        chart(),
    ]
}

/// Administrator is guild-wide: the owner, or any role (including @everyone) granting it
fn grants_administrator(
    is_owner: bool,
    role_permissions: impl IntoIterator<Item = serenity::Permissions>,
) -> bool {
    is_owner
        || role_permissions
            .into_iter()
            .any(|permissions| permissions.administrator())
}

/// Whether the author of `msg` is a guild administrator
///
/// Resolved from roles rather than channel overwrites so threads work too.
async fn author_is_admin(ctx: &serenity::Context, msg: &serenity::Message) -> bool {
    let Some(guild_id) = msg.guild_id else {
        return false;
    };

    let member = match guild_id.member(ctx, msg.author.id).await {
        Ok(member) => member,
        Err(e) => {
            tracing::warn!(user_id = %msg.author.id, error = %e, "Failed to fetch member");
            return false;
        }
    };

    let Some(guild) = ctx.cache.guild(guild_id) else {
        return false;
    };
    let everyone = serenity::RoleId::new(guild_id.get());
    let role_permissions = member
        .roles
        .iter()
        .chain(std::iter::once(&everyone))
        .filter_map(|role_id| guild.roles.get(role_id))
        .map(|role| role.permissions);
    grants_administrator(guild.owner_id == member.user.id, role_permissions)
}

async fn handle_prefix_message(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> std::result::Result<(), Error> {
    if msg.author.bot || !msg.content.trim_start().starts_with(data.bot.prefix()) {
        return Ok(());
    }

    let needs_admin = Command::parse(&msg.content, data.bot.prefix())
        .map(|command| command.requires_admin())
        .unwrap_or(false);
    let is_admin = needs_admin && author_is_admin(ctx, msg).await;

    let command_ctx = CommandContext::new(msg.channel_id.get()).admin(is_admin);
    if let Some(reply) = data.bot.process_input(&msg.content, &command_ctx).await {
        msg.channel_id
            .send_message(&ctx.http, to_create_message(&reply))
            .await?;
    }
    Ok(())
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> std::result::Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!(user = %data_about_bot.user.name, "Connected to Discord");
        }
        serenity::FullEvent::Message { new_message } => {
            handle_prefix_message(ctx, new_message, data).await?;
        }
        _ => {}
    }
    Ok(())
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            tracing::error!(error = %error, "Failed to set up Discord framework");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::warn!(command = %ctx.command().name, error = %error, "Slash command failed");
            if let Err(e) = ctx.say(format!("Error: {error}")).await {
                tracing::warn!(error = %e, "Failed to report command error");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                tracing::error!(error = %e, "Error while handling error");
            }
        }
    }
}

/// Connect to Discord and run until the gateway connection ends
pub async fn run(bot: Arc<EconBot>) -> anyhow::Result<()> {
    let token = bot.config().require_discord_token()?.to_string();
    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!(
                    count = framework.options().commands.len(),
                    "Registered slash commands"
                );

                let poller = bot.reminder_poller(DiscordNotifier::new(ctx.http.clone()));
                tokio::spawn(poller.run());

                Ok(Data { bot })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;
    client.start().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::reply::Attachment;

    #[test]
    fn test_embed_conversion() {
        let embed = Embed::new()
            .title("📊 Unemployment Rate")
            .color(0x00ff00)
            .field("Latest Value", "3.90", true)
            .footer("FRED");

        let json = serde_json::to_value(to_create_embed(&embed)).unwrap();
        assert_eq!(json["title"], "📊 Unemployment Rate");
        assert_eq!(json["color"], 0x00ff00);
        assert_eq!(json["fields"][0]["name"], "Latest Value");
        assert_eq!(json["fields"][0]["inline"], true);
        assert_eq!(json["footer"]["text"], "FRED");
    }

    #[test]
    fn test_message_conversion_keeps_content_and_embeds() {
        let reply = Reply::text("📅 Economic Events:")
            .with_embed(Embed::new().image("https://finviz.com/chart.ashx?t=AAPL"));

        let json = serde_json::to_value(to_create_message(&reply)).unwrap();
        assert_eq!(json["content"], "📅 Economic Events:");
        assert_eq!(json["embeds"][0]["image"]["url"], "https://finviz.com/chart.ashx?t=AAPL");
    }

    #[test]
    fn test_immediate_error_replies_are_ephemeral() {
        let attachment = Attachment::chart_png(vec![1, 2, 3], "AAPL_d_1.png");
        let reply = Reply::embed(Embed::new().image(attachment.embed_url())).with_attachment(attachment);
        let builder = to_create_reply(&reply, false);
        assert_eq!(builder.ephemeral, Some(false));
        assert_eq!(builder.attachments.len(), 1);

        let builder = to_create_reply(&Reply::error("nope"), false);
        assert_eq!(builder.ephemeral, Some(true));
        assert_eq!(builder.content.as_deref(), Some("nope"));
    }

    #[test]
    fn test_administrator_from_any_role() {
        type Perms = serenity::Permissions;
        let none: Vec<Perms> = Vec::new();

        assert!(grants_administrator(true, none.clone()));
        assert!(grants_administrator(false, vec![Perms::SEND_MESSAGES, Perms::ADMINISTRATOR]));
        assert!(!grants_administrator(false, vec![Perms::SEND_MESSAGES, Perms::MANAGE_CHANNELS]));
        assert!(!grants_administrator(false, none));
    }

    #[test]
    fn test_deferred_error_replies_stay_public() {
        let builder = to_create_reply(&Reply::error("Error searching: timeout"), true);
        assert_eq!(builder.ephemeral, Some(false));
        assert_eq!(builder.content.as_deref(), Some("Error searching: timeout"));
    }

    #[test]
    fn test_slash_commands_registered() {
        let names: Vec<String> = commands().into_iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec![
                "help",
                "setchannel",
                "removechannel",
                "events",
                "getdata",
                "search",
                "correlation",
                "chart"
            ]
        );
    }

    #[test]
    fn test_timeframe_choice_maps_to_timeframe() {
        assert_eq!(Timeframe::from(ChartTimeframe::Weekly), Timeframe::Weekly);
    }
}
