//! HTTP surface: query parameters become a `FilterSpec`, handlers call the
//! pure core builders and return their JSON-serializable results as-is.
//!
//! Every handler is total because the engine is; an empty dataset renders
//! as empty structures, never as an error status.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use railscope_core::prelude::*;

use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Comma-separated line ids.
    pub lines: Option<String>,
    pub direction: Option<String>,
    pub day_type: Option<String>,
    pub overload: Option<f64>,
    pub idle: Option<f64>,
}

impl FilterParams {
    pub fn into_spec(self) -> FilterSpec {
        let mut spec = FilterSpec::default();
        if let (Some(start), Some(end)) = (self.start, self.end) {
            spec.time_range = Some((start, end));
        }
        if let Some(lines) = self.lines {
            spec.lines = lines
                .split(',')
                .filter_map(|id| id.trim().parse().ok())
                .collect();
        }
        if let Some(direction) = self.direction {
            spec.direction = direction.parse().ok();
        }
        if let Some(day_type) = self.day_type {
            spec.day_type = day_type.parse().ok();
        }
        if let Some(overload) = self.overload {
            spec.thresholds.overload = overload;
        }
        if let Some(idle) = self.idle {
            spec.thresholds.idle = idle;
        }
        spec
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TopParams {
    pub top: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ForecastParams {
    pub days: Option<usize>,
    /// Restrict the historical series to these comma-separated lines.
    pub lines: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SequenceParams {
    pub direction: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/kpi", get(kpi))
        .route("/api/heatmap", get(heatmap))
        .route("/api/trend", get(trend))
        .route("/api/density", get(density))
        .route("/api/corridor", get(corridor))
        .route("/api/trip-heatmap", get(trip_heatmap))
        .route("/api/timetable", get(timetable))
        .route("/api/od", get(od))
        .route("/api/hubs", get(hubs))
        .route("/api/suggestions", get(suggestions))
        .route("/api/dashboard", get(dashboard))
        .route("/api/sequence/{line}", get(sequence))
        .route("/api/forecast", get(forecast_handler))
        .route("/api/ingest-report", get(ingest_report))
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "flows": state.dataset.flows.len(),
        "segments": state.dataset.segments.len(),
    }))
}

async fn kpi(State(state): State<Arc<AppState>>, Query(params): Query<FilterParams>) -> Json<KpiSummary> {
    let spec = params.into_spec();
    Json(compute_kpi(&state.dataset.flows, &state.dataset.segments, &spec))
}

async fn heatmap(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Json<railscope_core::analytics::views::Heatmap> {
    Json(build_heatmap(&state.dataset.segments, &params.into_spec()))
}

async fn trend(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Json<railscope_core::analytics::views::Trend> {
    Json(build_trend(&state.dataset.segments, &params.into_spec()))
}

async fn density(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Json<railscope_core::analytics::views::DensityRank> {
    Json(build_density_rank(&state.dataset.segments, &params.into_spec()))
}

async fn corridor(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Json<railscope_core::analytics::views::Corridor> {
    let spec = params.into_spec();
    Json(build_corridor(&state.dataset.flows, &state.dataset.segments, &spec))
}

async fn trip_heatmap(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Json<railscope_core::analytics::views::TripHeatmap> {
    Json(build_trip_heatmap(&state.dataset.segments, &params.into_spec()))
}

async fn timetable(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Json<railscope_core::analytics::views::TimetableScatter> {
    Json(build_timetable_scatter(&state.dataset.segments, &params.into_spec()))
}

async fn od(
    State(state): State<Arc<AppState>>,
    Query(top): Query<TopParams>,
    Query(params): Query<FilterParams>,
) -> Json<OdMatrix> {
    let top_n = top.top.unwrap_or(state.od_top_n);
    let spec = params.into_spec();
    Json(build_od_matrix(
        &state.dataset.flows,
        &spec,
        &state.dataset.names,
        top_n,
    ))
}

async fn hubs(State(state): State<Arc<AppState>>, Query(params): Query<FilterParams>) -> Json<HubMetrics> {
    let spec = params.into_spec();
    Json(build_hub_metrics(&state.dataset.segments, &state.dataset.flows, &spec))
}

async fn suggestions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Json<Vec<Suggestion>> {
    let spec = params.into_spec();
    Json(build_suggestions(&state.dataset.flows, &state.dataset.segments, &spec))
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Json<Dashboard> {
    let spec = params.into_spec();
    Json(build_dashboard(&state.dataset.flows, &state.dataset.segments, &spec))
}

async fn sequence(
    State(state): State<Arc<AppState>>,
    Path(line): Path<LineId>,
    Query(params): Query<SequenceParams>,
) -> Json<Vec<String>> {
    let direction = params
        .direction
        .as_deref()
        .and_then(|d| d.parse().ok())
        .unwrap_or(Direction::Up);

    let spec = FilterSpec::for_lines([line]);
    let segments = spec.segments(&state.dataset.segments);
    let mut order = build_station_sequence(&segments, direction);
    if order.is_empty() {
        // No segment observations for the line; fall back to the explicit
        // route-station records.
        let edges: Vec<_> = state
            .dataset
            .route_edges
            .iter()
            .filter(|edge| edge.line == line)
            .cloned()
            .collect();
        order = sequence_from_route_edges(&edges, direction);
    }
    Json(order.into_iter().map(|station| station.to_string()).collect())
}

async fn forecast_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ForecastParams>,
) -> Json<Vec<ForecastPoint>> {
    let days = params.days.unwrap_or(7);
    let spec = match params.lines {
        Some(lines) => FilterSpec::for_lines(
            lines.split(',').filter_map(|id| id.trim().parse().ok()),
        ),
        None => FilterSpec::default(),
    };
    let series = daily_totals(&state.dataset.flows, &spec);
    Json(forecast(&series, days))
}

async fn ingest_report(State(state): State<Arc<AppState>>) -> Json<IngestReport> {
    Json(state.dataset.report.clone())
}

/// Collapses the filtered flows into the daily demand series the forecast
/// estimator consumes.
fn daily_totals(flows: &[FlowRow], spec: &FilterSpec) -> Vec<DailyTotal> {
    use std::collections::BTreeMap;

    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in spec.flows(flows) {
        *totals.entry(row.date).or_insert(0.0) += f64::from(row.exchange());
    }
    totals
        .into_iter()
        .map(|(date, total)| DailyTotal { date, total })
        .collect()
}
