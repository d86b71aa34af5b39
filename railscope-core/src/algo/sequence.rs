//! Station sequence reconstruction
//!
//! Segment observations for one line arrive as an unordered set of directed
//! station-to-station edges. The traversal order is rebuilt greedily from a
//! weighted adjacency graph, where each edge weight is the number of
//! observed traversals.

use hashbrown::HashSet;
use petgraph::Direction::Incoming;
use petgraph::prelude::DiGraphMap;

use crate::StationId;
use crate::model::records::{RouteStationEdge, SegmentRow};
use crate::model::filter::Direction;

/// Rebuilds the station order for one line from its segment observations.
///
/// The walk starts at the node with in-degree zero (smallest id on ties,
/// smallest id overall when every node has predecessors), then repeatedly
/// follows the unvisited successor with the highest traversal count,
/// breaking ties toward the smallest station id. Stations never reached by
/// the walk are appended in ascending id order, so the result contains
/// every known station exactly once. `Direction::Down` is the exact
/// reverse of `Direction::Up`.
pub fn build_station_sequence(segments: &[&SegmentRow], direction: Direction) -> Vec<StationId> {
    let mut graph: DiGraphMap<StationId, u64> = DiGraphMap::new();
    for segment in segments {
        if let Some(weight) = graph.edge_weight_mut(segment.from_station, segment.to_station) {
            *weight += 1;
        } else {
            graph.add_edge(segment.from_station, segment.to_station, 1);
        }
    }

    let mut nodes: Vec<StationId> = graph.nodes().collect();
    nodes.sort_unstable();
    let Some(&first) = nodes.first() else {
        return Vec::new();
    };

    // Smallest-id node with no predecessors, else the smallest id overall.
    let start = nodes
        .iter()
        .copied()
        .find(|&node| graph.neighbors_directed(node, Incoming).next().is_none())
        .unwrap_or(first);

    let mut visited: HashSet<StationId> = HashSet::with_capacity(nodes.len());
    let mut order = Vec::with_capacity(nodes.len());
    visited.insert(start);
    order.push(start);

    let mut current = start;
    loop {
        let mut candidates: Vec<(StationId, u64)> = graph
            .edges(current)
            .filter(|(_, successor, _)| !visited.contains(successor))
            .map(|(_, successor, weight)| (successor, *weight))
            .collect();
        candidates.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let Some(&(next, _)) = candidates.first() else {
            break;
        };
        visited.insert(next);
        order.push(next);
        current = next;
    }

    // Disconnected remainders, ascending so the output stays deterministic.
    for node in nodes {
        if !visited.contains(&node) {
            order.push(node);
        }
    }

    if direction == Direction::Down {
        order.reverse();
    }
    order
}

/// Materializes the station order from explicit route-station records,
/// for lines whose order is not derivable from segment data.
pub fn sequence_from_route_edges(
    edges: &[RouteStationEdge],
    direction: Direction,
) -> Vec<StationId> {
    let mut ordered: Vec<(u32, StationId)> =
        edges.iter().map(|edge| (edge.sequence, edge.station)).collect();
    ordered.sort_unstable();

    let mut seen: HashSet<StationId> = HashSet::with_capacity(ordered.len());
    let mut order: Vec<StationId> = ordered
        .into_iter()
        .filter_map(|(_, station)| seen.insert(station).then_some(station))
        .collect();

    if direction == Direction::Down {
        order.reverse();
    }
    order
}
