//! Upcoming economic release calendar
//!
//! Release dates come from FRED's release schedule. Times of day are not
//! published by FRED, so the scheduled instant is the indicator's customary
//! release time in US/Eastern. When the schedule lookup fails for a series
//! the event falls back to the next business day without a time, and the
//! series is reported as unresolved so callers can retry.

use crate::api::fred::FredClient;
use crate::error::{BotError, Result};
use crate::indicators::{Impact, Indicator, TRACKED_INDICATORS};
use crate::interface::formatter::format_previous_value;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use chrono_tz::US::Eastern;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Hour and minute (ET) after which today's releases are considered done
const MARKET_CUTOFF: (u32, u32) = (16, 30);

/// A scheduled release of a tracked indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseEvent {
    pub series_id: String,
    pub title: String,
    /// Release date in US/Eastern
    pub date: NaiveDate,
    /// Exact release instant, when the time of day is known
    pub scheduled_at: Option<DateTime<Utc>>,
    pub impact: Impact,
    /// Formatted latest value before this release
    pub previous: String,
}

impl ReleaseEvent {
    /// Dedup key for reminders
    pub fn key(&self) -> (String, NaiveDate) {
        (self.series_id.clone(), self.date)
    }

    /// Scheduled instant in US/Eastern
    pub fn local_time(&self) -> Option<DateTime<Tz>> {
        self.scheduled_at.map(|t| t.with_timezone(&Eastern))
    }
}

/// Result of one calendar build
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarSnapshot {
    /// Upcoming releases, sorted by date and time
    pub events: Vec<ReleaseEvent>,
    /// Series whose release schedule lookup failed
    pub unresolved: Vec<String>,
}

impl CalendarSnapshot {
    /// Whether every tracked series got a real schedule
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Source of upcoming releases
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Releases from `now` up to the source's horizon
    async fn upcoming_releases(&self, now: DateTime<Utc>) -> Result<CalendarSnapshot>;
}

/// Next business day in US/Eastern
///
/// Today, unless it is already past the afternoon cutoff, then rolled forward
/// over the weekend.
pub fn next_business_day(now_et: DateTime<Tz>) -> NaiveDate {
    let cutoff = NaiveTime::from_hms_opt(MARKET_CUTOFF.0, MARKET_CUTOFF.1, 0);
    let mut day = now_et.date_naive();
    if cutoff.is_some_and(|cutoff| now_et.time() >= cutoff) {
        day = day.succ_opt().unwrap_or(day);
    }
    while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
        day = day.succ_opt().unwrap_or(day);
    }
    day
}

/// Convert an Eastern wall-clock release time to UTC
///
/// Returns `None` when the time is unknown or falls in a DST gap.
pub fn schedule_at(date: NaiveDate, time: Option<NaiveTime>) -> Option<DateTime<Utc>> {
    let local = date.and_time(time?);
    Eastern
        .from_local_datetime(&local)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

/// Calendar backed by the FRED release schedule
pub struct FredCalendar {
    client: Arc<FredClient>,
    indicators: &'static [Indicator],
    horizon_days: u32,
}

impl FredCalendar {
    pub fn new(client: Arc<FredClient>, horizon_days: u32) -> Self {
        Self {
            client,
            indicators: TRACKED_INDICATORS,
            horizon_days,
        }
    }

    /// Track a different set of indicators
    pub fn with_indicators(mut self, indicators: &'static [Indicator]) -> Self {
        self.indicators = indicators;
        self
    }

    async fn previous_value(&self, indicator: &Indicator) -> String {
        let units = match self.client.get_series_info(indicator.series_id).await {
            Ok(info) => info.units,
            Err(e) => {
                tracing::debug!(series_id = indicator.series_id, error = %e, "Series info unavailable");
                String::new()
            }
        };

        let latest = match self.client.get_latest(indicator.series_id).await {
            Ok(obs) => Some(obs.value),
            Err(e) => {
                tracing::debug!(series_id = indicator.series_id, error = %e, "Latest value unavailable");
                None
            }
        };

        format_previous_value(indicator.series_id, &units, latest)
    }
}

#[async_trait]
impl CalendarSource for FredCalendar {
    async fn upcoming_releases(&self, now: DateTime<Utc>) -> Result<CalendarSnapshot> {
        let now_et = now.with_timezone(&Eastern);
        let today = now_et.date_naive();
        let horizon_end = today
            .checked_add_days(Days::new(u64::from(self.horizon_days)))
            .unwrap_or(NaiveDate::MAX);
        let fallback_day = next_business_day(now_et);

        let mut events = Vec::new();
        let mut unresolved = Vec::new();

        for indicator in self.indicators {
            let (date, scheduled_at) = match self
                .client
                .next_release_date(indicator.series_id, today)
                .await
            {
                Ok(Some(date)) => (date, schedule_at(date, indicator.release_time())),
                Ok(None) => {
                    tracing::debug!(series_id = indicator.series_id, "No scheduled release");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        series_id = indicator.series_id,
                        error = %e,
                        "Release schedule lookup failed, using next business day"
                    );
                    unresolved.push(indicator.series_id.to_string());
                    (fallback_day, None)
                }
            };

            if date > horizon_end {
                continue;
            }

            events.push(ReleaseEvent {
                series_id: indicator.series_id.to_string(),
                title: indicator.label.to_string(),
                date,
                scheduled_at,
                impact: indicator.impact,
                previous: self.previous_value(indicator).await,
            });
        }

        if !self.indicators.is_empty() && unresolved.len() == self.indicators.len() {
            return Err(BotError::ApiError(
                "release schedule unavailable for every tracked indicator".to_string(),
            ));
        }

        events.sort_by(|a, b| {
            (a.date, a.scheduled_at, &a.title).cmp(&(b.date, b.scheduled_at, &b.title))
        });

        tracing::info!(
            count = events.len(),
            unresolved = unresolved.len(),
            "Release calendar refreshed"
        );
        Ok(CalendarSnapshot { events, unresolved })
    }
}
