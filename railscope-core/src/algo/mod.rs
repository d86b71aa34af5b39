//! Graph algorithms over the observed segment network

pub mod sequence;

pub use sequence::{build_station_sequence, sequence_from_route_edges};
