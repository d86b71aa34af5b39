//! Approximate hub centrality over the segment graph
//!
//! Betweenness and closeness here are degree-based proxies, not exact
//! centrality: betweenness is the station's degree normalized by the
//! maximum degree, closeness is `min(1, 0.2 + betweenness)`. Consumers
//! rely on these numbers as emitted; do not swap in exact algorithms.

use hashbrown::HashMap;
use itertools::Itertools;
use petgraph::Direction::{Incoming, Outgoing};
use petgraph::prelude::DiGraphMap;
use serde::Serialize;

use crate::analytics::stats::mean;
use crate::model::filter::FilterSpec;
use crate::model::records::{FlowRow, SegmentRow};
use crate::{MAX_HUB_EDGES, MAX_HUB_NODES, StationId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubNode {
    pub station: String,
    pub degree: usize,
    /// Degree normalized by the maximum degree; a proxy, not exact
    /// betweenness centrality.
    pub betweenness: f64,
    /// `min(1, 0.2 + betweenness)`; a proxy, not exact closeness.
    pub closeness: f64,
    /// Passengers boarded plus alighted at the station.
    pub flow: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubEdge {
    pub from: String,
    pub to: String,
    pub avg_load: f64,
    /// Mean full rate normalized by the maximum observed mean.
    pub weight: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubMetrics {
    pub nodes: Vec<HubNode>,
    pub edges: Vec<HubEdge>,
}

/// Degree per station over the filtered segment graph, parallel traversals
/// collapsed to one edge.
pub(crate) fn station_degrees(segments: &[&SegmentRow]) -> Vec<(StationId, usize)> {
    let mut graph: DiGraphMap<StationId, ()> = DiGraphMap::new();
    for row in segments {
        graph.add_edge(row.from_station, row.to_station, ());
    }

    graph
        .nodes()
        .map(|station| {
            let degree = graph.neighbors_directed(station, Incoming).count()
                + graph.neighbors_directed(station, Outgoing).count();
            (station, degree)
        })
        .sorted_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)))
        .collect()
}

/// Builds the hub view: top stations by degree with centrality proxies and
/// exchanged flow, plus the heaviest edges of the segment graph.
pub fn build_hub_metrics(
    segments: &[SegmentRow],
    flows: &[FlowRow],
    filter: &FilterSpec,
) -> HubMetrics {
    let segments = filter.segments(segments);
    let flows = filter.flows(flows);

    let degrees = station_degrees(&segments);
    let max_degree = degrees.first().map(|&(_, d)| d).unwrap_or(0);

    let mut station_flow: HashMap<StationId, u64> = HashMap::new();
    for row in &flows {
        *station_flow.entry(row.station).or_insert(0) += u64::from(row.exchange());
    }

    let nodes = degrees
        .iter()
        .take(MAX_HUB_NODES)
        .map(|&(station, degree)| {
            let betweenness = if max_degree == 0 {
                0.0
            } else {
                degree as f64 / max_degree as f64
            };
            HubNode {
                station: station.to_string(),
                degree,
                betweenness,
                closeness: (0.2 + betweenness).min(1.0),
                flow: station_flow.get(&station).copied().unwrap_or(0),
            }
        })
        .collect();

    let mut edge_rates: HashMap<(StationId, StationId), Vec<f64>> = HashMap::new();
    for row in &segments {
        edge_rates
            .entry((row.from_station, row.to_station))
            .or_default()
            .push(row.full_rate);
    }
    let mean_rates: Vec<((StationId, StationId), f64)> = edge_rates
        .into_iter()
        .map(|(key, rates)| (key, mean(&rates)))
        .sorted_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)))
        .collect();
    let max_rate = mean_rates.first().map(|&(_, rate)| rate).unwrap_or(0.0);

    let edges = mean_rates
        .into_iter()
        .take(MAX_HUB_EDGES)
        .map(|((from, to), rate)| HubEdge {
            from: from.to_string(),
            to: to.to_string(),
            avg_load: rate,
            weight: if max_rate > 0.0 { rate / max_rate } else { 0.0 },
        })
        .collect();

    HubMetrics { nodes, edges }
}
