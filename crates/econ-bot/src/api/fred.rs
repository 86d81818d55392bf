//! Federal Reserve Economic Data (FRED) API client
//!
//! FRED is a database maintained by the Federal Reserve Bank of St. Louis
//! containing over 800,000 economic time series from numerous sources.
//!
//! API Key: Free registration at https://fred.stlouisfed.org/docs/api/api_key.html
//! Rate Limit: 120 requests per minute

use crate::config::{BotConfig, DEFAULT_FRED_BASE_URL};
use crate::error::{BotError, Result};
use chrono::NaiveDate;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const DEFAULT_RATE_LIMIT: NonZeroU32 = match NonZeroU32::new(120) {
    Some(limit) => limit,
    None => NonZeroU32::MIN,
};

/// FRED marks missing observations with a single dot
const MISSING_VALUE: &str = ".";

/// Observation data from FRED series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Date of observation (YYYY-MM-DD)
    pub date: String,
    /// Value (can be "." for missing data)
    pub value: String,
}

impl Observation {
    /// Parse into a dated numeric value, `None` for missing or malformed rows
    pub fn parse(&self) -> Option<ParsedObservation> {
        if self.value == MISSING_VALUE {
            return None;
        }
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()?;
        let value = self.value.parse::<f64>().ok()?;
        Some(ParsedObservation { date, value })
    }
}

/// Parsed observation with numeric value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParsedObservation {
    pub date: NaiveDate,
    pub value: f64,
}

/// FRED series information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesInfo {
    pub id: String,
    pub title: String,
    pub observation_start: String,
    pub observation_end: String,
    pub frequency: String,
    pub frequency_short: String,
    pub units: String,
    pub units_short: String,
    pub seasonal_adjustment: String,
    pub seasonal_adjustment_short: String,
    pub last_updated: String,
    pub notes: Option<String>,
}

/// A FRED release (a publication that updates one or more series)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    pub name: String,
}

/// Sort order for observation queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_str(self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// Filters for an observations request
#[derive(Debug, Clone, Default)]
pub struct ObservationQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub limit: Option<u32>,
    pub sort: SortOrder,
}

/// FRED series response
#[derive(Debug, Clone, Deserialize)]
struct SeriesResponse {
    #[serde(default)]
    seriess: Vec<SeriesInfo>,
}

/// FRED observations response
#[derive(Debug, Clone, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<Observation>,
}

/// FRED series/release response
#[derive(Debug, Clone, Deserialize)]
struct ReleasesResponse {
    #[serde(default)]
    releases: Vec<Release>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReleaseDate {
    date: String,
}

/// FRED release/dates response
#[derive(Debug, Clone, Deserialize)]
struct ReleaseDatesResponse {
    #[serde(default)]
    release_dates: Vec<ReleaseDate>,
}

/// Error body FRED returns with non-2xx responses
#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error_message: String,
}

/// FRED API client
pub struct FredClient {
    client: Client,
    api_key: String,
    base_url: String,
    rate_limiter: SharedRateLimiter,
}

impl FredClient {
    /// Create a new FRED client
    ///
    /// # Arguments
    /// * `api_key` - FRED API key
    /// * `rate_limit` - Requests per minute (default 120)
    pub fn new(api_key: impl Into<String>, rate_limit: Option<u32>) -> Self {
        let per_minute = rate_limit
            .and_then(NonZeroU32::new)
            .unwrap_or(DEFAULT_RATE_LIMIT);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_FRED_BASE_URL.to_string(),
            rate_limiter,
        }
    }

    /// Create from bot configuration
    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(config.fred_api_key.clone(), Some(config.fred_rate_limit))
            .with_base_url(config.fred_base_url.clone())
    }

    /// Point the client at a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!(path, "FRED request");

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("file_type", "json")])
            .query(params)
            .send()
            .await
            .map_err(|e| BotError::ApiError(format!("FRED request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error_message)
                .unwrap_or_else(|_| status.to_string());
            return Err(BotError::ApiError(format!("FRED API error: {}", detail)));
        }

        response
            .json()
            .await
            .map_err(|e| BotError::ApiError(format!("Failed to parse FRED response: {}", e)))
    }

    /// Get series information
    pub async fn get_series_info(&self, series_id: &str) -> Result<SeriesInfo> {
        let data: SeriesResponse = self
            .get("series", &[("series_id", series_id.to_string())])
            .await?;

        data.seriess
            .into_iter()
            .next()
            .ok_or_else(|| BotError::SeriesNotFound(series_id.to_string()))
    }

    /// Get observations for a series
    pub async fn get_observations(
        &self,
        series_id: &str,
        query: &ObservationQuery,
    ) -> Result<Vec<Observation>> {
        let mut params = vec![
            ("series_id", series_id.to_string()),
            ("sort_order", query.sort.as_str().to_string()),
        ];

        if let Some(start) = query.start {
            params.push(("observation_start", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = query.end {
            params.push(("observation_end", end.format("%Y-%m-%d").to_string()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }

        let data: ObservationsResponse = self.get("series/observations", &params).await?;
        Ok(data.observations)
    }

    /// Get the latest non-missing value for a series
    pub async fn get_latest(&self, series_id: &str) -> Result<ParsedObservation> {
        let query = ObservationQuery {
            limit: Some(10),
            sort: SortOrder::Descending,
            ..Default::default()
        };
        let observations = self.get_observations(series_id, &query).await?;

        observations
            .iter()
            .find_map(Observation::parse)
            .ok_or_else(|| {
                BotError::InsufficientData(format!("no recent observations for {series_id}"))
            })
    }

    /// Get all non-missing observations since `start`, oldest first
    pub async fn get_series_since(
        &self,
        series_id: &str,
        start: NaiveDate,
    ) -> Result<Vec<ParsedObservation>> {
        let query = ObservationQuery {
            start: Some(start),
            ..Default::default()
        };
        let observations = self.get_observations(series_id, &query).await?;
        Ok(observations.iter().filter_map(Observation::parse).collect())
    }

    /// Full-text search over series titles and notes, in FRED's relevance order
    pub async fn search(&self, text: &str, limit: u32) -> Result<Vec<SeriesInfo>> {
        let data: SeriesResponse = self
            .get(
                "series/search",
                &[
                    ("search_text", text.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(data.seriess)
    }

    /// Get the release a series belongs to
    pub async fn get_series_release(&self, series_id: &str) -> Result<Release> {
        let data: ReleasesResponse = self
            .get("series/release", &[("series_id", series_id.to_string())])
            .await?;

        data.releases
            .into_iter()
            .next()
            .ok_or_else(|| BotError::SeriesNotFound(series_id.to_string()))
    }

    /// Get scheduled release dates on or after `from`, including future ones
    pub async fn get_release_dates(
        &self,
        release_id: u64,
        from: NaiveDate,
        limit: u32,
    ) -> Result<Vec<NaiveDate>> {
        let data: ReleaseDatesResponse = self
            .get(
                "release/dates",
                &[
                    ("release_id", release_id.to_string()),
                    ("realtime_start", from.format("%Y-%m-%d").to_string()),
                    ("include_release_dates_with_no_data", "true".to_string()),
                    ("sort_order", "asc".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(data
            .release_dates
            .iter()
            .filter_map(|d| NaiveDate::parse_from_str(&d.date, "%Y-%m-%d").ok())
            .filter(|date| *date >= from)
            .collect())
    }

    /// Next scheduled release date of the series on or after `from`
    pub async fn next_release_date(
        &self,
        series_id: &str,
        from: NaiveDate,
    ) -> Result<Option<NaiveDate>> {
        let release = self.get_series_release(series_id).await?;
        let dates = self.get_release_dates(release.id, from, 10).await?;
        Ok(dates.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> FredClient {
        FredClient::new("test_key", None).with_base_url(server.url())
    }

    #[test]
    fn test_client_creation() {
        let client = FredClient::new("test_key", None);
        assert_eq!(client.api_key, "test_key");
        assert_eq!(client.base_url, DEFAULT_FRED_BASE_URL);
    }

    #[test]
    fn test_observation_parse() {
        let obs = Observation {
            date: "2024-05-01".to_string(),
            value: "3.9".to_string(),
        };
        let parsed = obs.parse().unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert!((parsed.value - 3.9).abs() < f64::EPSILON);

        let missing = Observation {
            date: "2024-05-02".to_string(),
            value: ".".to_string(),
        };
        assert!(missing.parse().is_none());
    }

    #[tokio::test]
    async fn test_get_series_info() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/series")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("series_id".into(), "UNRATE".into()),
                Matcher::UrlEncoded("api_key".into(), "test_key".into()),
                Matcher::UrlEncoded("file_type".into(), "json".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"seriess":[{"id":"UNRATE","title":"Unemployment Rate","frequency":"Monthly","units":"Percent"}]}"#,
            )
            .create_async()
            .await;

        let info = client_for(&server).get_series_info("UNRATE").await.unwrap();
        assert_eq!(info.title, "Unemployment Rate");
        assert_eq!(info.units, "Percent");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_series_info_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/series")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"seriess":[]}"#)
            .create_async()
            .await;

        let err = client_for(&server).get_series_info("NOPE").await.unwrap_err();
        assert!(matches!(err, BotError::SeriesNotFound(id) if id == "NOPE"));
    }

    #[tokio::test]
    async fn test_api_error_message_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/series")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(
                r#"{"error_code":400,"error_message":"Bad Request.  The series does not exist."}"#,
            )
            .create_async()
            .await;

        let err = client_for(&server).get_series_info("NOPE").await.unwrap_err();
        assert!(err.to_string().contains("The series does not exist."));
    }

    #[tokio::test]
    async fn test_get_latest_skips_missing_values() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/series/observations")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("series_id".into(), "DGS10".into()),
                Matcher::UrlEncoded("sort_order".into(), "desc".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"observations":[
                    {"date":"2024-05-27","value":"."},
                    {"date":"2024-05-24","value":"4.47"},
                    {"date":"2024-05-23","value":"4.48"}
                ]}"#,
            )
            .create_async()
            .await;

        let latest = client_for(&server).get_latest("DGS10").await.unwrap();
        assert_eq!(latest.date, NaiveDate::from_ymd_opt(2024, 5, 24).unwrap());
        assert!((latest.value - 4.47).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_get_series_since() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/series/observations")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("observation_start".into(), "2024-01-01".into()),
                Matcher::UrlEncoded("sort_order".into(), "asc".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"observations":[
                    {"date":"2024-01-02","value":"1.0"},
                    {"date":"2024-01-03","value":"."},
                    {"date":"2024-01-04","value":"2.0"}
                ]}"#,
            )
            .create_async()
            .await;

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let series = client_for(&server)
            .get_series_since("VIXCLS", start)
            .await
            .unwrap();
        assert_eq!(series.len(), 2);
        assert!(series[0].date < series[1].date);
    }

    #[tokio::test]
    async fn test_search() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/series/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search_text".into(), "treasury yield".into()),
                Matcher::UrlEncoded("limit".into(), "5".into()),
                // Relevance order: no order_by or sort_order override
                Matcher::Regex("limit=5$".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"seriess":[
                    {"id":"DGS10","title":"Market Yield on U.S. Treasury Securities at 10-Year Constant Maturity","frequency":"Daily","units":"Percent"},
                    {"id":"DGS2","title":"Market Yield on U.S. Treasury Securities at 2-Year Constant Maturity","frequency":"Daily","units":"Percent"}
                ]}"#,
            )
            .create_async()
            .await;

        let results = client_for(&server).search("treasury yield", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "DGS10");
    }

    #[tokio::test]
    async fn test_next_release_date() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/series/release")
            .match_query(Matcher::UrlEncoded("series_id".into(), "CPIAUCSL".into()))
            .with_status(200)
            .with_body(r#"{"releases":[{"id":10,"name":"Consumer Price Index"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/release/dates")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("release_id".into(), "10".into()),
                Matcher::UrlEncoded("realtime_start".into(), "2024-06-03".into()),
                Matcher::UrlEncoded("include_release_dates_with_no_data".into(), "true".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"release_dates":[
                    {"release_id":10,"date":"2024-06-12"},
                    {"release_id":10,"date":"2024-07-11"}
                ]}"#,
            )
            .create_async()
            .await;

        let from = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let next = client_for(&server)
            .next_release_date("CPIAUCSL", from)
            .await
            .unwrap();
        assert_eq!(next, NaiveDate::from_ymd_opt(2024, 6, 12));
    }

    #[tokio::test]
    #[ignore] // Requires API key
    async fn test_get_latest_live() {
        let key = std::env::var("FRED_API_KEY").unwrap();
        let client = FredClient::new(key, None);
        let obs = client.get_latest("FEDFUNDS").await.unwrap();
        assert!(obs.value >= 0.0);
    }
}
