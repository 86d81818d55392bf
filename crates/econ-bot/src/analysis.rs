//! Correlation between two economic series
//!
//! Series are aligned on observation date before computing the Pearson
//! coefficient, so a daily series and a weekly series only contribute the
//! dates they share.

use crate::api::fred::ParsedObservation;
use crate::error::{BotError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pearson correlation of two aligned series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    /// Coefficient in [-1, 1]
    pub coefficient: f64,
    /// Number of dates both series share
    pub observations: usize,
}

/// Inner join two series on date, ascending
pub fn align_observations(
    a: &[ParsedObservation],
    b: &[ParsedObservation],
) -> Vec<(NaiveDate, f64, f64)> {
    let right: BTreeMap<NaiveDate, f64> = b.iter().map(|o| (o.date, o.value)).collect();
    let left: BTreeMap<NaiveDate, f64> = a.iter().map(|o| (o.date, o.value)).collect();

    left.into_iter()
        .filter_map(|(date, x)| right.get(&date).map(|&y| (date, x, y)))
        .collect()
}

/// Pearson correlation coefficient
///
/// Fails when there are fewer than two points or either side has no variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(BotError::InsufficientData(format!(
            "series lengths differ ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(BotError::InsufficientData(format!(
            "need at least 2 overlapping observations, got {}",
            x.len()
        )));
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return Err(BotError::InsufficientData(
            "a series is constant over the period".to_string(),
        ));
    }

    Ok((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Align two series by date and correlate them
pub fn correlate(a: &[ParsedObservation], b: &[ParsedObservation]) -> Result<Correlation> {
    let aligned = align_observations(a, b);
    let (x, y): (Vec<f64>, Vec<f64>) = aligned.iter().map(|&(_, x, y)| (x, y)).unzip();

    Ok(Correlation {
        coefficient: pearson(&x, &y)?,
        observations: aligned.len(),
    })
}
