//! CSV deserialization and raw-to-typed row conversion
//!
//! Malformed rows are skipped, never fatal, but every skip is counted in
//! the ingest report so callers can surface data-quality warnings.

use std::fs::File;
use std::path::Path;

use chrono::{NaiveDate, NaiveTime};

use crate::error::Error;
use crate::loading::IngestReport;
use crate::loading::raw_types::{RawFlow, RawRouteStation, RawSegment};
use crate::model::records::{FlowRow, RouteStationEdge, SegmentRow, TripKey};

pub(crate) fn deserialize_csv_file<T>(path: &Path, report: &mut IngestReport) -> Result<Vec<T>, Error>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let file = File::open(path)?;
    let mut rows = Vec::new();
    for result in csv::Reader::from_reader(file).deserialize() {
        match result {
            Ok(row) => rows.push(row),
            Err(err) => report.skip(format!("{}: {err}", path.display())),
        }
    }
    Ok(rows)
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

pub(crate) fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
}

fn non_empty(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    if raw.is_empty() { None } else { Some(raw) }
}

/// Non-negative count; empty counts as zero, garbage as malformed.
fn parse_count(raw: &str) -> Option<u32> {
    match non_empty(raw) {
        Some(value) => value.parse().ok(),
        None => Some(0),
    }
}

fn parse_non_negative(raw: &str) -> Option<f64> {
    non_empty(raw)?.parse::<f64>().ok().filter(|value| *value >= 0.0)
}

pub(crate) fn flow_from_raw(raw: &RawFlow) -> Option<FlowRow> {
    let arrival = non_empty(&raw.arrival_time).and_then(parse_time);
    let departure = non_empty(&raw.departure_time).and_then(parse_time);
    Some(FlowRow {
        line: non_empty(&raw.line_id)?.parse().ok()?,
        train: non_empty(&raw.train_id)?.to_owned(),
        station: non_empty(&raw.station_id)?.parse().ok()?,
        date: parse_date(&raw.operation_date)?,
        direction: non_empty(&raw.direction).and_then(|d| d.parse().ok()),
        trip: departure.map(TripKey::from_time),
        arrival,
        departure,
        boarded: parse_count(&raw.boarded)?,
        alighted: parse_count(&raw.alighted)?,
        capacity: parse_count(&raw.capacity)?,
        origin_telecode: non_empty(&raw.origin_telecode).map(str::to_owned),
        destination_telecode: non_empty(&raw.destination_telecode).map(str::to_owned),
    })
}

pub(crate) fn segment_from_raw(raw: &RawSegment) -> Option<SegmentRow> {
    Some(SegmentRow {
        line: non_empty(&raw.line_id)?.parse().ok()?,
        train: non_empty(&raw.train_id)?.to_owned(),
        date: parse_date(&raw.operation_date)?,
        trip: TripKey::parse(&raw.trip)?,
        direction: non_empty(&raw.direction).and_then(|d| d.parse().ok()),
        from_station: non_empty(&raw.from_station_id)?.parse().ok()?,
        to_station: non_empty(&raw.to_station_id)?.parse().ok()?,
        distance_km: parse_non_negative(&raw.segment_distance)?,
        load: parse_non_negative(&raw.segment_load)?,
        full_rate: parse_non_negative(&raw.full_rate)?,
    })
}

pub(crate) fn route_station_from_raw(raw: &RawRouteStation) -> Option<RouteStationEdge> {
    Some(RouteStationEdge {
        line: non_empty(&raw.line_id)?.parse().ok()?,
        sequence: non_empty(&raw.sequence)?.parse().ok()?,
        station: non_empty(&raw.station_id)?.parse().ok()?,
        previous_station: non_empty(&raw.previous_station_id).and_then(|s| s.parse().ok()),
        next_station: non_empty(&raw.next_station_id).and_then(|s| s.parse().ok()),
    })
}
