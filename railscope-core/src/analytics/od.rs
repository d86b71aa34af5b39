//! Origin-destination aggregation and congestion alerts
//!
//! OD pairs come from the telecodes attached to flow records. When a row's
//! telecodes are missing or identical, the first and last stations of its
//! trip stand in for the origin and destination. That fallback is a
//! modeling assumption inherited from the source system; its accuracy for
//! multi-leg journeys is unverified.

use chrono::NaiveDate;
use hashbrown::HashMap;
use itertools::Itertools;
use serde::Serialize;

use crate::LineId;
use crate::model::filter::FilterSpec;
use crate::model::names::NameResolver;
use crate::model::records::{FlowRow, TripKey};

/// Alert count bounds; a requested top-N outside this range is clamped.
const MAX_ALERTS: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OdPair {
    pub origin: String,
    pub destination: String,
    pub volume: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OdAlert {
    pub origin: String,
    pub destination: String,
    pub volume: u64,
    /// Volume relative to the heaviest observed pair.
    pub ratio: f64,
    pub level: AlertLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    High,
    Medium,
    Low,
}

impl AlertLevel {
    fn from_ratio(ratio: f64) -> Self {
        if ratio >= 0.8 {
            Self::High
        } else if ratio >= 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OdMatrix {
    pub pairs: Vec<OdPair>,
    pub alerts: Vec<OdAlert>,
}

/// Builds the OD matrix over the filtered flows, with the `top_n` heaviest
/// pairs surfaced as alerts.
pub fn build_od_matrix<R: NameResolver>(
    flows: &[FlowRow],
    filter: &FilterSpec,
    names: &R,
    top_n: usize,
) -> OdMatrix {
    let flows = filter.flows(flows);
    let top_n = top_n.clamp(1, MAX_ALERTS);

    // First and last station per trip, used when telecodes cannot name
    // the pair.
    let mut trip_calls: HashMap<(LineId, &str, NaiveDate, TripKey), Vec<&FlowRow>> =
        HashMap::new();
    for &row in &flows {
        if let Some(trip) = row.trip {
            trip_calls
                .entry((row.line, row.train.as_str(), row.date, trip))
                .or_default()
                .push(row);
        }
    }
    let mut trip_ends: HashMap<(LineId, &str, NaiveDate, TripKey), (String, String)> =
        HashMap::new();
    for (key, mut calls) in trip_calls {
        // Untimed calls sort last so they never masquerade as the origin.
        calls.sort_by_key(|call| (call.departure.is_none(), call.departure, call.arrival, call.station));
        if let (Some(first), Some(last)) = (calls.first(), calls.last()) {
            if first.station != last.station {
                trip_ends.insert(
                    key,
                    (
                        station_label(names, first.station),
                        station_label(names, last.station),
                    ),
                );
            }
        }
    }

    let mut volumes: HashMap<(String, String), u64> = HashMap::new();
    for &row in &flows {
        let resolved = match (&row.origin_telecode, &row.destination_telecode) {
            (Some(origin), Some(destination)) if origin != destination => Some((
                telecode_label(names, origin),
                telecode_label(names, destination),
            )),
            _ => row.trip.and_then(|trip| {
                trip_ends
                    .get(&(row.line, row.train.as_str(), row.date, trip))
                    .cloned()
            }),
        };
        let Some((origin, destination)) = resolved else {
            continue;
        };
        *volumes.entry((origin, destination)).or_insert(0) += u64::from(row.exchange());
    }

    let pairs: Vec<OdPair> = volumes
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .map(|((origin, destination), volume)| OdPair {
            origin,
            destination,
            volume,
        })
        .collect();

    let max_volume = pairs.first().map(|pair| pair.volume).unwrap_or(0);
    let alerts = pairs
        .iter()
        .take(top_n)
        .map(|pair| {
            let ratio = if max_volume == 0 {
                0.0
            } else {
                pair.volume as f64 / max_volume as f64
            };
            OdAlert {
                origin: pair.origin.clone(),
                destination: pair.destination.clone(),
                volume: pair.volume,
                ratio,
                level: AlertLevel::from_ratio(ratio),
            }
        })
        .collect();

    OdMatrix { pairs, alerts }
}

fn station_label<R: NameResolver>(names: &R, station: crate::StationId) -> String {
    names
        .station_name(station)
        .map(str::to_owned)
        .unwrap_or_else(|| station.to_string())
}

fn telecode_label<R: NameResolver>(names: &R, code: &str) -> String {
    names
        .station_by_telecode(code)
        .map(str::to_owned)
        .unwrap_or_else(|| code.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::names::NameDirectory;

    fn flow(
        station: crate::StationId,
        slot: &str,
        departure_minute: u32,
        telecodes: Option<(&str, &str)>,
        exchange: u32,
    ) -> FlowRow {
        FlowRow {
            line: 1,
            train: "T1".into(),
            station,
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            direction: None,
            trip: Some(TripKey::parse(slot).unwrap()),
            arrival: None,
            departure: chrono::NaiveTime::from_hms_opt(8, departure_minute, 0),
            boarded: exchange,
            alighted: 0,
            capacity: 300,
            origin_telecode: telecodes.map(|(o, _)| o.to_owned()),
            destination_telecode: telecodes.map(|(_, d)| d.to_owned()),
        }
    }

    #[test]
    fn telecodes_resolve_through_directory() {
        let mut names = NameDirectory::new();
        names.insert_telecode("AAA", "Alpha");
        names.insert_telecode("BBB", "Beta");
        let flows = vec![
            flow(10, "0800", 0, Some(("AAA", "BBB")), 120),
            flow(11, "0800", 10, Some(("AAA", "BBB")), 80),
        ];
        let matrix = build_od_matrix(&flows, &FilterSpec::default(), &names, 10);
        assert_eq!(matrix.pairs.len(), 1);
        assert_eq!(matrix.pairs[0].origin, "Alpha");
        assert_eq!(matrix.pairs[0].destination, "Beta");
        assert_eq!(matrix.pairs[0].volume, 200);
    }

    #[test]
    fn missing_telecodes_fall_back_to_trip_ends() {
        let names = NameDirectory::new();
        let flows = vec![
            flow(10, "0800", 0, None, 50),
            flow(11, "0800", 10, None, 30),
            flow(12, "0800", 20, None, 20),
        ];
        let matrix = build_od_matrix(&flows, &FilterSpec::default(), &names, 10);
        assert_eq!(matrix.pairs.len(), 1);
        assert_eq!(matrix.pairs[0].origin, "10");
        assert_eq!(matrix.pairs[0].destination, "12");
        assert_eq!(matrix.pairs[0].volume, 100);
    }

    #[test]
    fn identical_telecodes_use_fallback_too() {
        let names = NameDirectory::new();
        let flows = vec![
            flow(10, "0800", 0, Some(("AAA", "AAA")), 40),
            flow(12, "0800", 20, Some(("AAA", "AAA")), 10),
        ];
        let matrix = build_od_matrix(&flows, &FilterSpec::default(), &names, 10);
        assert_eq!(matrix.pairs.len(), 1);
        assert_eq!(matrix.pairs[0].origin, "10");
        assert_eq!(matrix.pairs[0].destination, "12");
    }

    #[test]
    fn alerts_rank_against_heaviest_pair() {
        let mut names = NameDirectory::new();
        names.insert_telecode("AAA", "Alpha");
        names.insert_telecode("BBB", "Beta");
        names.insert_telecode("CCC", "Gamma");
        let flows = vec![
            flow(10, "0800", 0, Some(("AAA", "BBB")), 200),
            flow(10, "0900", 0, Some(("AAA", "CCC")), 100),
        ];
        let matrix = build_od_matrix(&flows, &FilterSpec::default(), &names, 1);
        assert_eq!(matrix.pairs.len(), 2);
        assert_eq!(matrix.alerts.len(), 1);
        assert_eq!(matrix.alerts[0].origin, "Alpha");
        assert!((matrix.alerts[0].ratio - 1.0).abs() < 1e-10);
        assert_eq!(matrix.alerts[0].level, AlertLevel::High);
    }

    #[test]
    fn empty_flows_yield_empty_matrix() {
        let names = NameDirectory::new();
        let matrix = build_od_matrix(&[], &FilterSpec::default(), &names, 10);
        assert!(matrix.pairs.is_empty());
        assert!(matrix.alerts.is_empty());
    }
}
