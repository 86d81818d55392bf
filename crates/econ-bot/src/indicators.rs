//! Economic indicators tracked by the release calendar
//!
//! Release times are the customary publication times in US/Eastern. Series
//! without a fixed time (daily market series, quarterly aggregates) carry
//! `None` and only ever show up as date-only calendar entries.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Market impact of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Impact {
    High,
    Medium,
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Impact::High => write!(f, "High"),
            Impact::Medium => write!(f, "Medium"),
        }
    }
}

/// A tracked FRED series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicator {
    /// FRED series id
    pub series_id: &'static str,
    /// Human readable label
    pub label: &'static str,
    /// Market impact
    pub impact: Impact,
    /// Release time of day in US/Eastern as (hour, minute)
    pub release_time: Option<(u32, u32)>,
}

impl Indicator {
    /// Release time of day in US/Eastern
    pub fn release_time(&self) -> Option<NaiveTime> {
        self.release_time
            .and_then(|(hour, minute)| NaiveTime::from_hms_opt(hour, minute, 0))
    }
}

const fn high(
    series_id: &'static str,
    label: &'static str,
    release_time: Option<(u32, u32)>,
) -> Indicator {
    Indicator {
        series_id,
        label,
        impact: Impact::High,
        release_time,
    }
}

const fn medium(
    series_id: &'static str,
    label: &'static str,
    release_time: Option<(u32, u32)>,
) -> Indicator {
    Indicator {
        series_id,
        label,
        impact: Impact::Medium,
        release_time,
    }
}

const MORNING: Option<(u32, u32)> = Some((8, 30));

/// Indicators shown by `events` and watched by the reminder poller
pub const TRACKED_INDICATORS: &[Indicator] = &[
    // High impact
    high("CPIAUCSL", "Consumer Price Index (CPI)", MORNING),
    medium("CPILFESL", "Core CPI (excluding Food & Energy)", MORNING),
    high("PAYEMS", "Nonfarm Payroll", MORNING),
    medium("UNRATE", "Unemployment Rate", MORNING),
    high("GDP", "Gross Domestic Product", MORNING),
    high("FEDFUNDS", "Federal Funds Rate", None),
    // Production & sales
    medium("INDPRO", "Industrial Production Index", Some((9, 15))),
    medium("RSXFS", "Retail Sales", MORNING),
    medium("RRSFS", "Real Retail Sales", MORNING),
    // Market indicators
    medium("VIXCLS", "VIX Volatility Index", None),
    medium("DTWEXB", "US Dollar Index", None),
    medium("DCOILWTICO", "Crude Oil WTI", None),
    // Rates & spreads
    medium("DGS2", "2-Year Treasury Rate", None),
    medium("DGS10", "10-Year Treasury Rate", None),
    medium("T10Y2Y", "10Y-2Y Treasury Spread", None),
    // Fed balance sheet & money
    medium("WALCL", "Fed Balance Sheet Total Assets", Some((16, 30))),
    medium("M2V", "Velocity of M2 Money Stock", None),
    medium("BOGMBASE", "Monetary Base", None),
    // Other
    medium("ICSA", "Initial Jobless Claims", MORNING),
    medium("PCE", "Personal Consumption Expenditures", MORNING),
    medium("HOUST", "Housing Starts", MORNING),
];

/// Look up a tracked indicator by series id (case-insensitive)
pub fn find(series_id: &str) -> Option<&'static Indicator> {
    TRACKED_INDICATORS
        .iter()
        .find(|indicator| indicator.series_id.eq_ignore_ascii_case(series_id))
}
