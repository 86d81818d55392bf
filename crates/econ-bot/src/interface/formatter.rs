//! Response formatting utilities

use crate::analysis::Correlation;
use crate::api::finviz::{Chart, ChartResult};
use crate::api::fred::{ParsedObservation, SeriesInfo};
use crate::calendar::ReleaseEvent;
use crate::indicators::Impact;
use crate::interface::reply::{Attachment, BotPlatform, Embed, Reply};

/// Data replies
pub const COLOR_DATA: u32 = 0x00ff00;
/// High impact releases
pub const COLOR_HIGH_IMPACT: u32 = 0xFF0000;
/// Everything else on the calendar
pub const COLOR_OTHER: u32 = 0xFFD700;

/// Discord rejects embed field values longer than this
const MAX_FIELD_VALUE: usize = 1024;
const MAX_TITLE_CHARS: usize = 50;

const RATE_SERIES: &[&str] = &["UNRATE", "FEDFUNDS", "DGS2", "DGS10", "T10Y2Y"];

pub trait Formatter: Send + Sync {
    fn platform(&self) -> BotPlatform;
    fn render(&self, reply: &Reply) -> String;
    fn format_error(&self, error: &str) -> String;
}

/// Renders replies as plain text for the console
pub struct ConsoleFormatter;

impl Formatter for ConsoleFormatter {
    fn platform(&self) -> BotPlatform {
        BotPlatform::Console
    }

    fn render(&self, reply: &Reply) -> String {
        if reply.is_error() {
            return self.format_error(&reply.content);
        }

        let mut output = String::new();
        if !reply.content.is_empty() {
            output.push_str(&reply.content);
            output.push('\n');
        }

        for embed in &reply.embeds {
            if let Some(title) = &embed.title {
                output.push_str(&format!("== {} ==\n", title));
            }
            if let Some(description) = &embed.description {
                output.push_str(description);
                output.push('\n');
            }
            for field in &embed.fields {
                if field.value.contains('\n') {
                    output.push_str(&format!("{}:\n{}\n", field.name, field.value.trim_end()));
                } else {
                    output.push_str(&format!("{}: {}\n", field.name, field.value));
                }
            }
            if let Some(url) = &embed.image_url {
                output.push_str(&format!("[image] {}\n", url));
            }
            if let Some(footer) = &embed.footer {
                output.push_str(&format!("-- {}\n", footer));
            }
        }

        for attachment in &reply.attachments {
            output.push_str(&format!(
                "[attachment] {} ({} bytes)\n",
                attachment.filename,
                attachment.content.len()
            ));
        }

        output.trim_end().to_string()
    }

    fn format_error(&self, error: &str) -> String {
        format!("❌ {}", error)
    }
}

/// Format with thousands separators and a fixed number of decimals
pub fn format_number(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value.is_sign_negative() && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Format the latest value of a series the way the calendar shows it
pub fn format_previous_value(series_id: &str, units: &str, value: Option<f64>) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return "N/A".to_string();
    };

    if RATE_SERIES.contains(&series_id) {
        format!("{:.2}%", value)
    } else if series_id == "DCOILWTICO" {
        format!("${:.2}/bbl", value)
    } else if series_id == "GOLDPMGBD228NLBM" {
        format!("${:.2}/oz", value)
    } else if units.contains("Billions of Dollars") {
        format!("${}B", format_number(value, 2))
    } else if units.contains("Millions of Dollars") {
        format!("${}M", format_number(value, 2))
    } else if series_id == "ICSA" {
        format_number(value, 0)
    } else if series_id == "VIXCLS" {
        format!("{:.2}", value)
    } else {
        format_number(value, 2)
    }
}

/// Shorten FRED unit descriptions
pub fn simplify_units(units: &str) -> String {
    if units.contains("Index") {
        match units.split_once('=') {
            Some((_, base)) => format!("Index (Base: {})", base.trim()),
            None => "Index".to_string(),
        }
    } else if units.contains("Dollars per") {
        format!("${}", units.replace("Dollars per", "per"))
    } else if units.contains("Billions of Dollars") {
        "$B".to_string()
    } else if units.contains("Millions of Dollars") {
        "$M".to_string()
    } else {
        units.to_string()
    }
}

pub fn simplify_frequency(frequency: &str) -> String {
    frequency
        .replace(", Ending Friday", "")
        .replace(", Close", "")
}

/// Cut titles longer than 50 characters to 47 plus an ellipsis
pub fn truncate_title(title: &str) -> String {
    if title.chars().count() > MAX_TITLE_CHARS {
        let cut: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
        format!("{}...", cut)
    } else {
        title.to_string()
    }
}

/// Latest value card for `getdata`
pub fn series_embed(info: &SeriesInfo, latest: &ParsedObservation) -> Embed {
    let units = if info.units.is_empty() {
        "N/A"
    } else {
        info.units.as_str()
    };

    Embed::new()
        .title(format!("📊 {}", info.title))
        .color(COLOR_DATA)
        .field("Latest Value", format_number(latest.value, 2), true)
        .field("Last Updated", latest.date.format("%Y-%m-%d").to_string(), true)
        .field("Units", units, true)
}

/// Result list for `search`
pub fn search_embed(search_text: &str, results: &[SeriesInfo]) -> Embed {
    let mut embed = Embed::new()
        .title(format!("🔍 Search Results for '{}'", search_text))
        .color(COLOR_DATA);

    if results.is_empty() {
        return embed.description("No matching series found.");
    }

    for series in results {
        let value = format!(
            "**Series ID:** `{}`\n**Frequency:** {}\n**Units:** {}",
            series.id,
            simplify_frequency(&series.frequency),
            simplify_units(&series.units)
        );
        embed = embed.field(format!("📊 {}", truncate_title(&series.title)), value, false);
    }
    embed
}

pub fn correlation_embed(series1: &str, series2: &str, days: u32, result: &Correlation) -> Embed {
    Embed::new()
        .title(format!("📊 Correlation Analysis ({} days)", days))
        .description(format!("Correlation between {} and {}", series1, series2))
        .color(COLOR_DATA)
        .field("Correlation Coefficient", format!("{:.2}", result.coefficient), true)
        .field("Observations", result.observations.to_string(), true)
}

/// Chart reply, attaching the image when it was downloaded
pub fn chart_reply(result: &ChartResult) -> Reply {
    let embed = Embed::new()
        .title(format!("{} {} Chart", result.ticker, result.timeframe.label()))
        .color(COLOR_DATA);

    match &result.chart {
        Chart::Image(image) => {
            let attachment = Attachment::chart_png(image.bytes.clone(), image.file_name.clone());
            Reply::embed(embed.image(attachment.embed_url())).with_attachment(attachment)
        }
        Chart::Link(url) => Reply::embed(embed.image(url.clone())),
    }
}

fn event_date_label(event: &ReleaseEvent) -> String {
    event.date.format("%a, %b %d").to_string()
}

fn event_time_label(event: &ReleaseEvent) -> Option<String> {
    event
        .local_time()
        .map(|t| format!("{} ET", t.format("%I:%M %p")))
}

/// Calendar listing for `events`: high impact first, the rest grouped by day
pub fn events_reply(events: &[ReleaseEvent]) -> Reply {
    if events.is_empty() {
        return Reply::text("No economic events scheduled.");
    }

    let mut high = Embed::new()
        .title("🔴 High Impact Economic Releases")
        .color(COLOR_HIGH_IMPACT);
    for event in events.iter().filter(|e| e.impact == Impact::High) {
        let name = match event_time_label(event) {
            Some(time) => format!("{} • {}", event_date_label(event), time),
            None => event_date_label(event),
        };
        high = high.field(
            name,
            format!("**{}**\n└ Previous: {}", event.title, event.previous),
            false,
        );
    }
    if high.fields.is_empty() {
        high = high.description("None in the coming days.");
    }

    let mut other = Embed::new()
        .title("🟡 Other Economic Releases")
        .color(COLOR_OTHER);
    let mut current: Option<(String, String)> = None;
    for event in events.iter().filter(|e| e.impact != Impact::High) {
        let date = event_date_label(event);
        let line = match event_time_label(event) {
            Some(time) => format!("`{}` **{}** ({})\n", time, event.title, event.previous),
            None => format!("**{}** ({})\n", event.title, event.previous),
        };

        match current.as_mut() {
            Some((current_date, text))
                if *current_date == date && text.len() + line.len() <= MAX_FIELD_VALUE =>
            {
                text.push_str(&line);
            }
            _ => {
                if let Some((name, text)) = current.take() {
                    other = other.field(name, text, false);
                }
                current = Some((date, line));
            }
        }
    }
    if let Some((name, text)) = current {
        other = other.field(name, text, false);
    }
    if other.fields.is_empty() {
        other = other.description("None in the coming days.");
    }

    Reply::embed(high).with_embed(other)
}

/// Reminder posted to subscribed channels
pub fn reminder_embed(event: &ReleaseEvent) -> Embed {
    let time = match (event.local_time(), event.scheduled_at) {
        (Some(local), Some(utc)) => format!(
            "{} ET ({} UTC)",
            local.format("%I:%M %p"),
            utc.format("%H:%M")
        ),
        _ => event.date.format("%Y-%m-%d").to_string(),
    };

    Embed::new()
        .title("🔔 Upcoming Economic Release")
        .description(format!("**{}**", event.title))
        .color(COLOR_DATA)
        .field("Time", time, true)
        .field("Impact", event.impact.to_string(), true)
        .field("Previous Value", event.previous.clone(), true)
}

/// Command overview
pub fn help_embed(prefix: &str) -> Embed {
    Embed::new()
        .title("📊 Economic Data Bot Commands")
        .description("Economic data and stock chart bot with both slash and prefix commands")
        .color(COLOR_DATA)
        .field(
            "🔄 **Economic Events**",
            format!(
                "**`/events`** - List upcoming economic releases\n\
                 **`{p}events`** - Same as above (prefix version)",
                p = prefix
            ),
            false,
        )
        .field(
            "📈 **Data & Analysis**",
            format!(
                "**`/getdata <series_id>`** - Get current economic indicator value\n\
                 **`/search <keywords>`** - Search for economic data series\n\
                 **`/correlation <series1> <series2> [days]`** - Calculate correlation between indicators\n\
                 **`{p}getdata <series_id>`** - Prefix version\n\
                 **`{p}search <keywords>`** - Prefix version\n\
                 **`{p}correlation <series1> <series2> [days]`** - Prefix version",
                p = prefix
            ),
            false,
        )
        .field(
            "📊 **Charts**",
            format!(
                "**`/chart <ticker> <timeframe>`** - Get stock chart (Daily/Weekly/Monthly)\n\
                 **`{p}ticker timeframe`** - e.g., `{p}AAPL d`, `{p}MSFT w`, `{p}TSLA m`",
                p = prefix
            ),
            false,
        )
        .field(
            "⚙️ **Admin Commands**",
            format!(
                "**`/setchannel`** - Enable economic event notifications in this channel\n\
                 **`/removechannel`** - Disable economic event notifications\n\
                 **`{p}setchannel`** - Prefix version\n\
                 **`{p}removechannel`** - Prefix version",
                p = prefix
            ),
            false,
        )
        .field(
            "💡 **Tips**",
            format!(
                "• Both slash commands (`/command`) and prefix commands (`{p}command`) work\n\
                 • Economic data comes from FRED (Federal Reserve Economic Data)\n\
                 • Charts are sourced from Finviz\n\
                 • Admin commands require administrator permissions",
                p = prefix
            ),
            false,
        )
        .footer(format!(
            "Use /command for modern Discord interface or {}command for traditional chat",
            prefix
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::finviz::{ChartImage, Timeframe};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn event(series_id: &str, title: &str, impact: Impact, day: u32, time: Option<(u32, u32)>) -> ReleaseEvent {
        ReleaseEvent {
            series_id: series_id.to_string(),
            title: title.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            scheduled_at: time.map(|(h, m)| Utc.with_ymd_and_hms(2024, 6, day, h, m, 0).unwrap()),
            impact,
            previous: "1.00".to_string(),
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(999.0, 2), "999.00");
        assert_eq!(format_number(-1234.5, 1), "-1,234.5");
        assert_eq!(format_number(212000.0, 0), "212,000");
        assert_eq!(format_number(-0.001, 2), "0.00");
    }

    #[test]
    fn test_format_previous_value() {
        assert_eq!(format_previous_value("UNRATE", "Percent", Some(3.9)), "3.90%");
        assert_eq!(format_previous_value("DCOILWTICO", "Dollars per Barrel", Some(77.456)), "$77.46/bbl");
        assert_eq!(format_previous_value("GDP", "Billions of Dollars", Some(28269.174)), "$28,269.17B");
        assert_eq!(format_previous_value("WALCL", "Millions of Dollars", Some(7283412.0)), "$7,283,412.00M");
        assert_eq!(format_previous_value("ICSA", "Number", Some(229000.0)), "229,000");
        assert_eq!(format_previous_value("VIXCLS", "Index", Some(12.9)), "12.90");
        assert_eq!(format_previous_value("CPIAUCSL", "Index 1982-1984=100", Some(313.548)), "313.55");
        assert_eq!(format_previous_value("CPIAUCSL", "", None), "N/A");
    }

    #[test]
    fn test_simplify_units() {
        assert_eq!(simplify_units("Index 2017=100"), "Index (Base: 100)");
        assert_eq!(simplify_units("Index"), "Index");
        assert_eq!(simplify_units("Dollars per Barrel"), "$per Barrel");
        assert_eq!(simplify_units("Billions of Dollars"), "$B");
        assert_eq!(simplify_units("Millions of Dollars"), "$M");
        assert_eq!(simplify_units("Percent"), "Percent");
    }

    #[test]
    fn test_simplify_frequency_and_truncate() {
        assert_eq!(simplify_frequency("Weekly, Ending Friday"), "Weekly");
        assert_eq!(simplify_frequency("Daily, Close"), "Daily");

        let long = "Market Yield on U.S. Treasury Securities at 10-Year Constant Maturity";
        let short = truncate_title(long);
        assert_eq!(short.chars().count(), 50);
        assert!(short.ends_with("..."));
        assert_eq!(truncate_title("Unemployment Rate"), "Unemployment Rate");
    }

    #[test]
    fn test_events_reply_groups_by_impact_and_day() {
        let events = vec![
            event("CPIAUCSL", "Consumer Price Index (CPI)", Impact::High, 12, Some((12, 30))),
            event("ICSA", "Initial Jobless Claims", Impact::Medium, 13, Some((12, 30))),
            event("PCE", "Personal Consumption Expenditures", Impact::Medium, 13, None),
            event("HOUST", "Housing Starts", Impact::Medium, 14, Some((12, 30))),
        ];

        let reply = events_reply(&events);
        assert_eq!(reply.embeds.len(), 2);

        let high = &reply.embeds[0];
        assert_eq!(high.color, Some(COLOR_HIGH_IMPACT));
        assert_eq!(high.fields.len(), 1);
        assert_eq!(high.fields[0].name, "Wed, Jun 12 • 08:30 AM ET");

        let other = &reply.embeds[1];
        assert_eq!(other.color, Some(COLOR_OTHER));
        assert_eq!(other.fields.len(), 2);
        assert_eq!(other.fields[0].name, "Thu, Jun 13");
        assert!(other.fields[0].value.contains("`08:30 AM ET` **Initial Jobless Claims**"));
        assert!(other.fields[0].value.contains("**Personal Consumption Expenditures** (1.00)"));
        assert_eq!(other.fields[1].name, "Fri, Jun 14");
    }

    #[test]
    fn test_events_reply_empty() {
        let reply = events_reply(&[]);
        assert_eq!(reply.content, "No economic events scheduled.");
        assert!(reply.embeds.is_empty());
    }

    #[test]
    fn test_chart_reply_variants() {
        let image = ChartResult {
            ticker: "AAPL".to_string(),
            timeframe: Timeframe::Daily,
            chart: Chart::Image(ChartImage {
                bytes: vec![1, 2, 3],
                file_name: "AAPL_d_1.png".to_string(),
            }),
        };
        let reply = chart_reply(&image);
        assert_eq!(reply.attachments.len(), 1);
        assert_eq!(reply.embeds[0].title.as_deref(), Some("AAPL daily Chart"));
        assert_eq!(reply.embeds[0].image_url.as_deref(), Some("attachment://AAPL_d_1.png"));

        let link = ChartResult {
            ticker: "AAPL".to_string(),
            timeframe: Timeframe::Weekly,
            chart: Chart::Link("https://finviz.com/chart.ashx?t=AAPL&rand=1".to_string()),
        };
        let reply = chart_reply(&link);
        assert!(reply.attachments.is_empty());
        assert_eq!(
            reply.embeds[0].image_url.as_deref(),
            Some("https://finviz.com/chart.ashx?t=AAPL&rand=1")
        );
    }

    #[test]
    fn test_help_uses_prefix() {
        let embed = help_embed("!");
        assert!(embed.fields[2].value.contains("`!AAPL d`"));
        assert!(embed.footer.unwrap().contains("!command"));
    }

    #[test]
    fn test_console_render() {
        let reply = Reply::embed(
            Embed::new()
                .title("📊 Unemployment Rate")
                .field("Latest Value", "3.90", true),
        );
        let text = ConsoleFormatter.render(&reply);
        assert!(text.contains("== 📊 Unemployment Rate =="));
        assert!(text.contains("Latest Value: 3.90"));

        assert_eq!(ConsoleFormatter.render(&Reply::error("nope")), "❌ nope");
    }
}
