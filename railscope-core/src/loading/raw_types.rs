//! String-typed CSV rows as they appear in the source files
//!
//! Every field deserializes as a string and defaults to empty; validation
//! and typing happen in one place when the raw row is converted.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawFlow {
    pub line_id: String,
    pub train_id: String,
    pub station_id: String,
    pub operation_date: String,
    pub direction: String,
    pub arrival_time: String,
    pub departure_time: String,
    pub boarded: String,
    pub alighted: String,
    pub capacity: String,
    pub origin_telecode: String,
    pub destination_telecode: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSegment {
    pub line_id: String,
    pub train_id: String,
    pub operation_date: String,
    pub trip: String,
    pub direction: String,
    pub from_station_id: String,
    pub to_station_id: String,
    pub segment_distance: String,
    pub segment_load: String,
    pub full_rate: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawRouteStation {
    pub line_id: String,
    pub sequence: String,
    pub station_id: String,
    pub previous_station_id: String,
    pub next_station_id: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawStation {
    pub station_id: String,
    pub station_name: String,
    pub telecode: String,
    pub line_id: String,
    pub line_name: String,
}
