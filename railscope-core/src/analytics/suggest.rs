//! Heuristic capacity-adjustment suggestions
//!
//! Three rules run independently over the filtered snapshot and their
//! results are concatenated: overloaded sections ask for extra trips, idle
//! lines ask for a timetable review, and the two best-connected hubs ask
//! for transfer-capacity work. Suggestion ids are derived from the rule
//! target, so identical input always produces identical ids in identical
//! order.

use hashbrown::HashMap;
use itertools::Itertools;
use serde::Serialize;

use crate::analytics::hubs::station_degrees;
use crate::analytics::kpi::{line_occupancy, section_p95};
use crate::analytics::stats::mode;
use crate::model::filter::FilterSpec;
use crate::model::records::{FlowRow, SegmentRow};
use crate::{LineId, StationId};

/// Heuristic relief applied by an extra-trips suggestion.
const ADD_TRIPS_RELIEF: f64 = 0.15;
/// Relieved p95 never drops below this floor.
const ADD_TRIPS_FLOOR: f64 = 0.85;
/// Number of hub stations worth a transfer-capacity suggestion.
const HUB_SUGGESTIONS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SuggestionKind {
    AddTrips,
    Timetable,
    Hub,
}

impl SuggestionKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::AddTrips => "addTrips",
            Self::Timetable => "timetable",
            Self::Hub => "hub",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRef {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Impact {
    pub p95_before: f64,
    pub p95_after: f64,
    /// Relative improvement in percent; negative when the rule expects
    /// utilization to rise.
    pub drop_pct: f64,
}

impl Impact {
    fn new(before: f64, after: f64) -> Self {
        let drop_pct = if before > 0.0 {
            (before - after) / before * 100.0
        } else {
            0.0
        };
        Self {
            p95_before: before,
            p95_after: after,
            drop_pct,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cost {
    pub extra_trips: u32,
    pub op_cost_index: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub kind: SuggestionKind,
    pub line: Option<String>,
    pub segment: Option<SegmentRef>,
    pub station: Option<String>,
    pub time_window: String,
    pub reason: String,
    pub confidence: Confidence,
    pub impact: Impact,
    pub cost: Cost,
    pub status: String,
}

/// Runs all suggestion rules over the filtered snapshot.
pub fn build_suggestions(
    flows: &[FlowRow],
    segments: &[SegmentRow],
    filter: &FilterSpec,
) -> Vec<Suggestion> {
    let flows = filter.flows(flows);
    let segments = filter.segments(segments);

    let mut suggestions = Vec::new();
    suggestions.extend(overloaded_sections(&segments, filter));
    suggestions.extend(idle_lines(&flows, filter));
    suggestions.extend(hub_stations(&segments));
    suggestions
}

/// Rule 1: every section whose p95 full rate exceeds the overload
/// threshold gets an extra-trips suggestion, heaviest first.
fn overloaded_sections(segments: &[&SegmentRow], filter: &FilterSpec) -> Vec<Suggestion> {
    let overload = filter.thresholds.overload;

    // Modal overloaded hour per section, for the suggested time window.
    let mut over_hours: HashMap<(LineId, StationId, StationId), Vec<u8>> = HashMap::new();
    for row in segments {
        if row.full_rate > overload {
            over_hours
                .entry((row.line, row.from_station, row.to_station))
                .or_default()
                .push(row.trip.hour());
        }
    }

    section_p95(segments)
        .into_iter()
        .filter(|&(_, rate)| rate > overload)
        .sorted_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)))
        .map(|((line, from, to), rate)| {
            let hour = over_hours
                .get(&(line, from, to))
                .and_then(|hours| mode(hours))
                .unwrap_or(0);
            Suggestion {
                id: format!("{}-{line}-{from}-{to}", SuggestionKind::AddTrips.as_str()),
                kind: SuggestionKind::AddTrips,
                line: Some(line.to_string()),
                segment: Some(SegmentRef {
                    from: from.to_string(),
                    to: to.to_string(),
                }),
                station: None,
                time_window: format!("{hour:02}:00-{:02}:00", u32::from(hour) + 1),
                reason: format!(
                    "p95 full rate {rate:.2} exceeds the overload threshold {overload:.2}"
                ),
                confidence: Confidence::High,
                impact: Impact::new(rate, (rate - ADD_TRIPS_RELIEF).max(ADD_TRIPS_FLOOR)),
                cost: Cost {
                    extra_trips: 2,
                    op_cost_index: 1.0,
                },
                status: "proposed".to_owned(),
            }
        })
        .collect()
}

/// Rule 2: lines running below the idle occupancy threshold get a
/// timetable-consolidation suggestion.
fn idle_lines(flows: &[&FlowRow], filter: &FilterSpec) -> Vec<Suggestion> {
    let idle = filter.thresholds.idle;

    line_occupancy(flows)
        .into_iter()
        .filter(|&(_, ratio)| ratio < idle)
        .sorted_by_key(|&(line, _)| line)
        .map(|(line, ratio)| Suggestion {
            id: format!("{}-{line}", SuggestionKind::Timetable.as_str()),
            kind: SuggestionKind::Timetable,
            line: Some(line.to_string()),
            segment: None,
            station: None,
            time_window: "all-day".to_owned(),
            reason: format!(
                "average occupancy {ratio:.2} is below the idle threshold {idle:.2}"
            ),
            confidence: Confidence::Medium,
            impact: Impact::new(ratio, ratio + 0.1),
            cost: Cost {
                extra_trips: 0,
                op_cost_index: 0.2,
            },
            status: "proposed".to_owned(),
        })
        .collect()
}

/// Rule 3: the two best-connected stations get a transfer-capacity
/// suggestion with a fixed qualitative impact.
fn hub_stations(segments: &[&SegmentRow]) -> Vec<Suggestion> {
    station_degrees(segments)
        .into_iter()
        .take(HUB_SUGGESTIONS)
        .enumerate()
        .map(|(rank, (station, degree))| Suggestion {
            id: format!("{}-{station}", SuggestionKind::Hub.as_str()),
            kind: SuggestionKind::Hub,
            line: None,
            segment: None,
            station: Some(station.to_string()),
            time_window: "all-day".to_owned(),
            reason: format!(
                "station ranks #{} by connectivity with degree {degree}",
                rank + 1
            ),
            confidence: Confidence::Medium,
            impact: Impact::new(1.05, 0.95),
            cost: Cost {
                extra_trips: 0,
                op_cost_index: 0.6,
            },
            status: "proposed".to_owned(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::model::records::TripKey;

    fn segment(line: LineId, from: StationId, to: StationId, slot: &str, rate: f64) -> SegmentRow {
        SegmentRow {
            line,
            train: "T1".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            trip: TripKey::parse(slot).unwrap(),
            direction: None,
            from_station: from,
            to_station: to,
            distance_km: 9.0,
            load: rate * 420.0,
            full_rate: rate,
        }
    }

    fn flow(line: LineId, boarded: u32, capacity: u32) -> FlowRow {
        FlowRow {
            line,
            train: "T1".into(),
            station: 1,
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            direction: None,
            trip: Some(TripKey::parse("0800").unwrap()),
            arrival: None,
            departure: None,
            boarded,
            alighted: 0,
            capacity,
            origin_telecode: None,
            destination_telecode: None,
        }
    }

    #[test]
    fn overloaded_section_emits_add_trips() {
        let segments = vec![
            segment(3, 12, 15, "0800", 1.3),
            segment(3, 12, 15, "0800", 1.25),
        ];
        let got = build_suggestions(&[], &segments, &FilterSpec::default());
        let add = got
            .iter()
            .find(|s| s.kind == SuggestionKind::AddTrips)
            .unwrap();
        assert_eq!(add.id, "addTrips-3-12-15");
        assert_eq!(add.confidence, Confidence::High);
        assert_eq!(add.cost.extra_trips, 2);
        assert_eq!(add.time_window, "08:00-09:00");
        // Relief is capped at the 0.85 floor.
        assert!((add.impact.p95_after - (add.impact.p95_before - 0.15).max(0.85)).abs() < 1e-10);
        assert!(add.reason.contains("1.0"));
    }

    #[test]
    fn relief_floor_applies() {
        let filter = FilterSpec {
            thresholds: crate::model::Thresholds {
                overload: 0.5,
                idle: 0.35,
            },
            ..FilterSpec::default()
        };
        let segments = vec![segment(1, 2, 3, "0900", 0.6)];
        let got = build_suggestions(&[], &segments, &filter);
        let add = got
            .iter()
            .find(|s| s.kind == SuggestionKind::AddTrips)
            .unwrap();
        assert!((add.impact.p95_after - 0.85).abs() < 1e-10);
    }

    #[test]
    fn idle_line_emits_timetable() {
        let flows = vec![flow(7, 10, 400)];
        let got = build_suggestions(&flows, &[], &FilterSpec::default());
        assert_eq!(got.len(), 1);
        let idle = &got[0];
        assert_eq!(idle.kind, SuggestionKind::Timetable);
        assert_eq!(idle.id, "timetable-7");
        assert_eq!(idle.cost.extra_trips, 0);
        assert!((idle.impact.p95_after - (idle.impact.p95_before + 0.1)).abs() < 1e-10);
        // Expected utilization rises, so the drop is negative.
        assert!(idle.impact.drop_pct < 0.0);
    }

    #[test]
    fn top_hubs_get_two_suggestions() {
        let segments = vec![
            segment(1, 1, 2, "0800", 0.4),
            segment(1, 2, 3, "0800", 0.4),
            segment(1, 3, 4, "0800", 0.4),
        ];
        let got = build_suggestions(&[], &segments, &FilterSpec::default());
        let hubs: Vec<_> = got
            .iter()
            .filter(|s| s.kind == SuggestionKind::Hub)
            .collect();
        assert_eq!(hubs.len(), 2);
        assert_eq!(hubs[0].id, "hub-2");
        assert_eq!(hubs[1].id, "hub-3");
        assert!((hubs[0].impact.p95_before - 1.05).abs() < 1e-10);
        assert!((hubs[0].impact.p95_after - 0.95).abs() < 1e-10);
    }

    #[test]
    fn suggestions_are_deterministic() {
        let segments = vec![
            segment(2, 5, 6, "0700", 1.4),
            segment(1, 8, 9, "0800", 1.2),
            segment(1, 9, 10, "0900", 1.6),
        ];
        let flows = vec![flow(1, 5, 400), flow(2, 300, 400)];
        let filter = FilterSpec::default();

        let first: Vec<String> = build_suggestions(&flows, &segments, &filter)
            .into_iter()
            .map(|s| s.id)
            .collect();
        let second: Vec<String> = build_suggestions(&flows, &segments, &filter)
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(first, second);
        // Rule order first, then heaviest section first within rule 1.
        assert_eq!(first[0], "addTrips-1-9-10");
        assert_eq!(first[1], "addTrips-2-5-6");
        assert_eq!(first[2], "addTrips-1-8-9");
    }

    #[test]
    fn empty_input_emits_nothing() {
        assert!(build_suggestions(&[], &[], &FilterSpec::default()).is_empty());
    }
}
