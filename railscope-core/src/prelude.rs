pub use crate::{MAX_FORECAST_DAYS, MAX_HUB_EDGES, MAX_HUB_NODES};

// Re-export key components
pub use crate::algo::sequence::{build_station_sequence, sequence_from_route_edges};
pub use crate::analytics::dashboard::{Dashboard, build_dashboard};
pub use crate::analytics::forecast::{ForecastPoint, forecast, forecast_from};
pub use crate::analytics::hubs::{HubMetrics, build_hub_metrics};
pub use crate::analytics::kpi::{KpiSummary, compute_kpi};
pub use crate::analytics::od::{AlertLevel, OdAlert, OdMatrix, OdPair, build_od_matrix};
pub use crate::analytics::suggest::{Suggestion, build_suggestions};
pub use crate::analytics::views::{
    build_corridor, build_density_rank, build_heatmap, build_timetable_scatter, build_trend,
    build_trip_heatmap,
};
pub use crate::loading::{Dataset, DatasetConfig, IngestReport, load_dataset};
pub use crate::model::{
    DailyTotal, DayType, Direction, FilterSpec, FlowRow, NameDirectory, NameResolver,
    RouteStationEdge, SegmentRow, Thresholds, TripKey,
};

// Core identifier types
pub use crate::Error;
pub use crate::LineId;
pub use crate::StationId;
