//! Short-horizon demand forecast from a historical daily series
//!
//! The estimator combines a trailing-window mean and trend with weekday
//! seasonality taken over the whole history. This heuristic replaces the
//! statistical-library forecast of the surrounding system for the
//! day-ahead horizon; long-horizon modeling stays with that collaborator.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use hashbrown::HashMap;
use serde::Serialize;

use crate::MAX_FORECAST_DAYS;
use crate::analytics::stats::{mean, ols_slope, stddev};
use crate::model::records::DailyTotal;

/// Days of history fitted for the window mean, deviation and trend.
const WINDOW_DAYS: usize = 14;
/// One-sided ~90% bound under a normal approximation.
const BOUND_Z: f64 = 1.64;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub forecast: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence: f64,
    /// Backfilled observation for the date, attached for comparison only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<f64>,
}

/// Forecasts the next `horizon_days` daily totals from the series' last
/// observed day. Empty history produces an empty forecast.
pub fn forecast(series: &[DailyTotal], horizon_days: usize) -> Vec<ForecastPoint> {
    match series.iter().map(|point| point.date).max() {
        Some(anchor) => forecast_from(series, anchor, horizon_days),
        None => Vec::new(),
    }
}

/// Forecasts from an explicit anchor date. Entries dated after the anchor
/// are not fitted; they are treated as backfilled actuals and attached to
/// matching forecast points.
pub fn forecast_from(
    series: &[DailyTotal],
    anchor: NaiveDate,
    horizon_days: usize,
) -> Vec<ForecastPoint> {
    let horizon_days = horizon_days.clamp(1, MAX_FORECAST_DAYS);

    // Duplicate dates keep the last value seen; gaps stay gaps.
    let mut history: HashMap<NaiveDate, f64> = HashMap::new();
    let mut backfill: HashMap<NaiveDate, f64> = HashMap::new();
    for point in series {
        if point.date <= anchor {
            history.insert(point.date, point.total);
        } else {
            backfill.insert(point.date, point.total);
        }
    }
    if history.is_empty() {
        return Vec::new();
    }

    let mut dates: Vec<NaiveDate> = history.keys().copied().collect();
    dates.sort_unstable();

    let window: Vec<f64> = dates
        .iter()
        .rev()
        .take(WINDOW_DAYS)
        .rev()
        .map(|date| history[date])
        .collect();
    let window_mean = mean(&window);
    let window_dev = stddev(&window, window_mean);
    let slope = ols_slope(&window);

    // Weekday seasonality over the entire history, not just the window.
    let mut weekday_totals: HashMap<Weekday, Vec<f64>> = HashMap::new();
    for date in &dates {
        weekday_totals
            .entry(date.weekday())
            .or_default()
            .push(history[date]);
    }
    let weekday_means: HashMap<Weekday, f64> = weekday_totals
        .into_iter()
        .map(|(weekday, totals)| (weekday, mean(&totals)))
        .collect();

    let variation = if window_mean > 0.0 {
        window_dev / window_mean
    } else {
        0.0
    };
    let confidence = (0.9 - variation * 0.5).clamp(0.65, 0.95);

    (1..=horizon_days)
        .filter_map(|offset| {
            let date = anchor.checked_add_signed(Duration::days(offset as i64))?;
            let base = weekday_means
                .get(&date.weekday())
                .copied()
                .unwrap_or(window_mean);
            let value = (base + slope * offset as f64).max(0.0);
            let lower = (value - BOUND_Z * window_dev).max(0.0);
            let upper = (value + BOUND_Z * window_dev).max(lower);
            Some(ForecastPoint {
                date,
                forecast: value,
                lower_bound: lower,
                upper_bound: upper,
                confidence,
                actual: backfill.get(&date).copied(),
            })
        })
        .collect()
}
