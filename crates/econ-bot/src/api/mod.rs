//! API clients for economic data and chart providers

pub mod finviz;
pub mod fred;

pub use finviz::{Chart, ChartClient, ChartImage, ChartResult, Timeframe, validate_ticker};
pub use fred::{
    FredClient, Observation, ObservationQuery, ParsedObservation, Release, SeriesInfo, SortOrder,
};
