//! Aggregation, heuristics and forecasting over filtered snapshots
//!
//! Every builder takes the raw row slices plus a [`FilterSpec`](crate::model::FilterSpec)
//! and returns a fully materialized, JSON-serializable value. Builders never
//! fail: empty input produces empty output, degenerate denominators are
//! guarded, and out-of-range parameters are clamped.

pub mod dashboard;
pub mod forecast;
pub mod hubs;
pub mod kpi;
pub mod od;
pub mod stats;
pub mod suggest;
pub mod views;
