//! Finviz chart client
//!
//! Charts are public PNGs served from `chart.ashx`. The image is downloaded
//! and re-uploaded so that Discord does not serve a stale copy from its CDN.
//! When the download fails the caller embeds the URL directly with a
//! cache-busting parameter instead.

use crate::config::{BotConfig, DEFAULT_FINVIZ_BASE_URL};
use crate::error::{BotError, Result};
use reqwest::Client;
use reqwest::header::{ACCEPT, CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA, REFERER, USER_AGENT};
use std::fmt;
use std::time::Duration;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0 Safari/537.36";
const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";
const MAX_TICKER_LEN: usize = 10;

/// Chart period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    /// Parse a user-supplied timeframe (`d`, `w`, `m` or the full word)
    pub fn parse(input: &str) -> Result<Self> {
        match input.trim().to_lowercase().as_str() {
            "d" | "daily" => Ok(Timeframe::Daily),
            "w" | "weekly" => Ok(Timeframe::Weekly),
            "m" | "monthly" => Ok(Timeframe::Monthly),
            "3" | "5" | "15" => Err(BotError::IntradayUnavailable),
            other => Err(BotError::InvalidTimeframe(other.to_string())),
        }
    }

    /// Value of the `p` query parameter
    pub fn code(self) -> &'static str {
        match self {
            Timeframe::Daily => "d",
            Timeframe::Weekly => "w",
            Timeframe::Monthly => "m",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
            Timeframe::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Validate and normalize a ticker symbol
pub fn validate_ticker(ticker: &str) -> Result<String> {
    let ticker = ticker.trim();
    let valid = !ticker.is_empty()
        && ticker.len() <= MAX_TICKER_LEN
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');

    if valid {
        Ok(ticker.to_uppercase())
    } else {
        Err(BotError::InvalidSymbol(ticker.to_string()))
    }
}

/// Downloaded chart ready to attach
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

/// Result of a chart request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chart {
    /// The PNG was downloaded
    Image(ChartImage),
    /// Download failed; embed this URL instead
    Link(String),
}

/// A resolved chart with its display metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartResult {
    pub ticker: String,
    pub timeframe: Timeframe,
    pub chart: Chart,
}

/// Finviz chart client
pub struct ChartClient {
    client: Client,
    base_url: String,
}

impl ChartClient {
    /// Create a client with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_FINVIZ_BASE_URL.to_string(),
        })
    }

    /// Create from bot configuration
    pub fn from_config(config: &BotConfig) -> Result<Self> {
        Ok(Self::new(config.chart_timeout)?.with_base_url(config.finviz_base_url.clone()))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Candlestick chart URL with technical overlays, large size
    pub fn chart_url(&self, ticker: &str, timeframe: Timeframe) -> String {
        format!(
            "{}/chart.ashx?t={}&ty=c&ta=1&p={}&s=l",
            self.base_url,
            ticker,
            timeframe.code()
        )
    }

    fn browser_headers(&self, ticker: &str, timeframe: Timeframe) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(ACCEPT, HeaderValue::from_static(IMAGE_ACCEPT));

        let referer = format!("{}/quote.ashx?t={}&p={}", self.base_url, ticker, timeframe.code());
        if let Ok(value) = HeaderValue::from_str(&referer) {
            headers.insert(REFERER, value);
        }
        headers
    }

    /// Download the chart PNG
    pub async fn fetch_chart(&self, ticker: &str, timeframe: Timeframe) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.chart_url(ticker, timeframe))
            .headers(self.browser_headers(ticker, timeframe))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BotError::ApiError(format!("Finviz returned HTTP {}", status)));
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Resolve a chart, falling back to a cache-busted link on any failure
    ///
    /// `unix_time` names the attachment and busts Discord's image cache.
    pub async fn chart(&self, ticker: &str, timeframe: Timeframe, unix_time: i64) -> ChartResult {
        let ticker = ticker.to_uppercase();
        let chart = match self.fetch_chart(&ticker, timeframe).await {
            Ok(bytes) => Chart::Image(ChartImage {
                bytes,
                file_name: format!("{}_{}_{}.png", ticker, timeframe.code(), unix_time),
            }),
            Err(e) => {
                tracing::warn!(%ticker, error = %e, "Chart download failed, embedding link");
                Chart::Link(format!("{}&rand={}", self.chart_url(&ticker, timeframe), unix_time))
            }
        };

        ChartResult {
            ticker,
            timeframe,
            chart,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> ChartClient {
        ChartClient::new(Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.url())
    }

    #[test]
    fn test_timeframe_parse() {
        assert_eq!(Timeframe::parse("d").unwrap(), Timeframe::Daily);
        assert_eq!(Timeframe::parse("W").unwrap(), Timeframe::Weekly);
        assert_eq!(Timeframe::parse("monthly").unwrap(), Timeframe::Monthly);
        assert!(matches!(
            Timeframe::parse("5"),
            Err(BotError::IntradayUnavailable)
        ));
        assert!(matches!(
            Timeframe::parse("y"),
            Err(BotError::InvalidTimeframe(_))
        ));
    }

    #[test]
    fn test_validate_ticker() {
        assert_eq!(validate_ticker("aapl").unwrap(), "AAPL");
        assert_eq!(validate_ticker("brk.b").unwrap(), "BRK.B");
        assert!(validate_ticker("").is_err());
        assert!(validate_ticker("TOOLONGTICKER").is_err());
        assert!(validate_ticker("AA PL").is_err());
        assert!(validate_ticker("AAPL&p=w").is_err());
    }

    #[test]
    fn test_chart_url() {
        let client = ChartClient::new(Duration::from_secs(15)).unwrap();
        assert_eq!(
            client.chart_url("AAPL", Timeframe::Weekly),
            "https://finviz.com/chart.ashx?t=AAPL&ty=c&ta=1&p=w&s=l"
        );
    }

    #[tokio::test]
    async fn test_chart_downloads_image() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/chart.ashx")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("t".into(), "MSFT".into()),
                Matcher::UrlEncoded("p".into(), "d".into()),
            ]))
            .match_header("cache-control", "no-cache")
            .match_header("referer", Matcher::Regex("quote.ashx\\?t=MSFT".into()))
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body([0x89, b'P', b'N', b'G'])
            .create_async()
            .await;

        let result = client_for(&server)
            .chart("msft", Timeframe::Daily, 1_700_000_000)
            .await;

        assert_eq!(result.ticker, "MSFT");
        match result.chart {
            Chart::Image(image) => {
                assert_eq!(image.file_name, "MSFT_d_1700000000.png");
                assert_eq!(image.bytes, vec![0x89, b'P', b'N', b'G']);
            }
            Chart::Link(url) => panic!("expected image, got link {url}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_chart_falls_back_to_link() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/chart.ashx")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let client = client_for(&server);
        let result = client.chart("TSLA", Timeframe::Monthly, 42).await;

        let expected = format!("{}/chart.ashx?t=TSLA&ty=c&ta=1&p=m&s=l&rand=42", server.url());
        assert_eq!(result.chart, Chart::Link(expected));
    }
}
