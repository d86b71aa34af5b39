//! Loading of the tabular row source consumed by the engine
//!
//! The loader reads per-kind CSV files from a data directory, types every
//! row once at this boundary, and reports how many rows were dropped along
//! the way.

mod parser;
pub mod raw_types;

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use hashbrown::HashMap;
use log::{info, warn};
use serde::Serialize;

use crate::LineId;
use crate::error::Error;
use crate::loading::parser::{
    deserialize_csv_file, flow_from_raw, route_station_from_raw, segment_from_raw,
};
use crate::loading::raw_types::{RawFlow, RawRouteStation, RawSegment, RawStation};
use crate::model::names::NameDirectory;
use crate::model::records::{FlowRow, RouteStationEdge, SegmentRow, TripKey};

/// Sample cap for skip messages; the count keeps rising past it.
const MAX_ERROR_SAMPLES: usize = 20;

/// Summary of one loading run. Skipped rows are data-quality signal, not
/// errors; callers decide whether to warn.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub flows_loaded: usize,
    pub segments_loaded: usize,
    pub route_edges_loaded: usize,
    pub stations_loaded: usize,
    pub rows_skipped: usize,
    pub errors: Vec<String>,
}

impl IngestReport {
    pub(crate) fn skip(&mut self, message: String) {
        self.rows_skipped += 1;
        if self.errors.len() < MAX_ERROR_SAMPLES {
            self.errors.push(message);
        }
    }
}

/// Locations of the source files inside one data directory.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub data_dir: PathBuf,
}

impl DatasetConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn flows_path(&self) -> PathBuf {
        self.data_dir.join("flows.csv")
    }

    fn segments_path(&self) -> PathBuf {
        self.data_dir.join("segments.csv")
    }

    fn route_stations_path(&self) -> PathBuf {
        self.data_dir.join("route_stations.csv")
    }

    fn stations_path(&self) -> PathBuf {
        self.data_dir.join("stations.csv")
    }
}

/// In-memory snapshot handed to the analytics builders.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub flows: Vec<FlowRow>,
    pub segments: Vec<SegmentRow>,
    pub route_edges: Vec<RouteStationEdge>,
    pub names: NameDirectory,
    pub report: IngestReport,
}

/// Loads a dataset snapshot from the configured directory.
///
/// # Errors
///
/// Fails on an unreadable directory or when neither flow nor segment data
/// is present; malformed rows inside a readable file are skipped and
/// counted instead.
pub fn load_dataset(config: &DatasetConfig) -> Result<Dataset, Error> {
    validate_config(config)?;
    info!(
        "Loading passenger-flow dataset from {}",
        config.data_dir.display()
    );

    let mut report = IngestReport::default();
    let mut dataset = Dataset::default();

    if config.flows_path().exists() {
        let raw: Vec<RawFlow> = deserialize_csv_file(&config.flows_path(), &mut report)?;
        for row in &raw {
            match flow_from_raw(row) {
                Some(flow) => dataset.flows.push(flow),
                None => report.skip(format!(
                    "malformed flow row (line '{}', date '{}')",
                    row.line_id, row.operation_date
                )),
            }
        }
    }

    if config.segments_path().exists() {
        let raw: Vec<RawSegment> = deserialize_csv_file(&config.segments_path(), &mut report)?;
        for row in &raw {
            match segment_from_raw(row) {
                Some(segment) => dataset.segments.push(segment),
                None => report.skip(format!(
                    "malformed segment row (line '{}', date '{}')",
                    row.line_id, row.operation_date
                )),
            }
        }
    }

    if config.route_stations_path().exists() {
        let raw: Vec<RawRouteStation> =
            deserialize_csv_file(&config.route_stations_path(), &mut report)?;
        for row in &raw {
            match route_station_from_raw(row) {
                Some(edge) => dataset.route_edges.push(edge),
                None => report.skip(format!(
                    "malformed route-station row (line '{}')",
                    row.line_id
                )),
            }
        }
    }

    if config.stations_path().exists() {
        let raw: Vec<RawStation> = deserialize_csv_file(&config.stations_path(), &mut report)?;
        for row in &raw {
            let mut known = false;
            if let Ok(station) = row.station_id.trim().parse() {
                if !row.station_name.trim().is_empty() {
                    dataset.names.insert_station(station, row.station_name.trim());
                    known = true;
                }
            }
            if !row.telecode.trim().is_empty() && !row.station_name.trim().is_empty() {
                dataset
                    .names
                    .insert_telecode(row.telecode.trim(), row.station_name.trim());
                known = true;
            }
            if let Ok(line) = row.line_id.trim().parse() {
                if !row.line_name.trim().is_empty() {
                    dataset.names.insert_line(line, row.line_name.trim());
                    known = true;
                }
            }
            if known {
                report.stations_loaded += 1;
            } else {
                report.skip(format!("unusable station row ('{}')", row.station_id));
            }
        }
    }

    assign_trip_keys(&mut dataset.flows);

    report.flows_loaded = dataset.flows.len();
    report.segments_loaded = dataset.segments.len();
    report.route_edges_loaded = dataset.route_edges.len();

    info!(
        "Loaded {} flow rows, {} segment rows, {} route-station rows",
        report.flows_loaded, report.segments_loaded, report.route_edges_loaded
    );
    if report.rows_skipped > 0 {
        warn!("Skipped {} malformed rows during ingest", report.rows_skipped);
    }

    dataset.report = report;
    Ok(dataset)
}

/// Rekeys every call of a run to the run's first departure slot. A trip is
/// one train's single run on a line on a given date, so all of its calls
/// must share the key the segment data carries.
fn assign_trip_keys(flows: &mut [FlowRow]) {
    let mut first_departure: HashMap<(LineId, String, NaiveDate), NaiveTime> = HashMap::new();
    for row in flows.iter() {
        if let Some(departure) = row.departure {
            first_departure
                .entry((row.line, row.train.clone(), row.date))
                .and_modify(|earliest| {
                    if departure < *earliest {
                        *earliest = departure;
                    }
                })
                .or_insert(departure);
        }
    }
    for row in flows.iter_mut() {
        if let Some(&earliest) = first_departure.get(&(row.line, row.train.clone(), row.date)) {
            row.trip = Some(TripKey::from_time(earliest));
        }
    }
}

fn validate_config(config: &DatasetConfig) -> Result<(), Error> {
    if !config.data_dir.is_dir() {
        return Err(Error::InvalidData(format!(
            "data directory not found: {}",
            config.data_dir.display()
        )));
    }
    if !config.flows_path().exists() && !config.segments_path().exists() {
        return Err(Error::InvalidData(format!(
            "neither flows.csv nor segments.csv present in {}",
            config.data_dir.display()
        )));
    }
    Ok(())
}
