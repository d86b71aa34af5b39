//! One-call dashboard assembly
//!
//! The individual builders are pure over the same snapshot, so the
//! dashboard fans them out on the rayon pool and stitches the results.

use rayon::join;
use serde::Serialize;

use crate::analytics::kpi::{KpiSummary, compute_kpi};
use crate::analytics::suggest::{Suggestion, build_suggestions};
use crate::analytics::views::{
    Corridor, DensityRank, Heatmap, Trend, build_corridor, build_density_rank, build_heatmap,
    build_trend,
};
use crate::model::filter::FilterSpec;
use crate::model::records::{FlowRow, SegmentRow};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub kpi: KpiSummary,
    pub heatmap: Heatmap,
    pub trend: Trend,
    pub corridor: Corridor,
    pub density: DensityRank,
    pub suggestions: Vec<Suggestion>,
}

/// Computes the KPI summary, the main views and the suggestion list for
/// one filter in parallel.
pub fn build_dashboard(
    flows: &[FlowRow],
    segments: &[SegmentRow],
    filter: &FilterSpec,
) -> Dashboard {
    let ((kpi, heatmap), ((trend, corridor), (density, suggestions))) = join(
        || {
            join(
                || compute_kpi(flows, segments, filter),
                || build_heatmap(segments, filter),
            )
        },
        || {
            join(
                || {
                    join(
                        || build_trend(segments, filter),
                        || build_corridor(flows, segments, filter),
                    )
                },
                || {
                    join(
                        || build_density_rank(segments, filter),
                        || build_suggestions(flows, segments, filter),
                    )
                },
            )
        },
    );

    Dashboard {
        kpi,
        heatmap,
        trend,
        corridor,
        density,
        suggestions,
    }
}
