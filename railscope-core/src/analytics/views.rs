//! Spatial and temporal views over the filtered snapshot
//!
//! Each builder groups the snapshot along one axis pair and returns a
//! sorted, JSON-serializable structure. Groupings are keyed on typed ids;
//! identifiers are stringified only at the output boundary.

use chrono::{NaiveDate, Timelike};
use hashbrown::HashMap;
use itertools::Itertools;
use serde::Serialize;

use crate::algo::sequence::build_station_sequence;
use crate::analytics::stats::{mean, mode, p95};
use crate::model::filter::{Direction, FilterSpec};
use crate::model::records::{FlowRow, SegmentRow, TripKey};
use crate::{LineId, StationId};

/// Minutes represented by one overloaded trip bucket; the source data is
/// sampled in 5-minute slots.
const OVERLOAD_BUCKET_MINUTES: u32 = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapCell {
    pub line: String,
    pub hour: u8,
    pub avg_load: f64,
    pub p95_load: f64,
    /// Overloaded observations expressed as minutes of congestion.
    pub over_minutes: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Heatmap {
    pub cells: Vec<HeatmapCell>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub avg_load: f64,
    pub p95_load: f64,
    pub total_load: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSeries {
    pub line: String,
    pub points: Vec<TrendPoint>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    pub series: Vec<TrendSeries>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityEntry {
    pub from: String,
    pub to: String,
    /// Passenger-kilometers per kilometer of segment length.
    pub density: f64,
    pub total_passenger_km: f64,
    pub total_km: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityRank {
    pub items: Vec<DensityEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorridorEntry {
    pub line: String,
    pub from: String,
    pub to: String,
    pub avg_load: f64,
    pub p95_load: f64,
    /// Modal hour of the flow rows joined to this corridor's trips.
    pub peak_hour: u8,
    pub trips: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Corridor {
    pub items: Vec<CorridorEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripCell {
    /// Position of the traversed edge's origin along the line's
    /// reconstructed station sequence.
    pub position: usize,
    pub from: String,
    pub to: String,
    pub full_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripLoadRow {
    pub line: String,
    pub train: String,
    pub date: NaiveDate,
    pub trip: String,
    pub cells: Vec<TripCell>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripHeatmap {
    pub trips: Vec<TripLoadRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableSlot {
    /// Departure slot rendered as `HH:MM`.
    pub time: String,
    pub avg_load: f64,
    pub p95_load: f64,
    pub sample_trips: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableScatter {
    pub slots: Vec<TimetableSlot>,
}

/// Congestion heatmap over (line, hour-of-departure) cells.
pub fn build_heatmap(segments: &[SegmentRow], filter: &FilterSpec) -> Heatmap {
    let segments = filter.segments(segments);

    let mut cells: HashMap<(LineId, u8), Vec<f64>> = HashMap::new();
    for row in &segments {
        cells
            .entry((row.line, row.trip.hour()))
            .or_default()
            .push(row.full_rate);
    }

    let cells = cells
        .into_iter()
        .sorted_by_key(|&((line, hour), _)| (line, hour))
        .map(|((line, hour), rates)| {
            let overloaded = rates
                .iter()
                .filter(|&&rate| rate > filter.thresholds.overload)
                .count() as u32;
            HeatmapCell {
                line: line.to_string(),
                hour,
                avg_load: mean(&rates),
                p95_load: p95(&rates),
                over_minutes: overloaded * OVERLOAD_BUCKET_MINUTES,
            }
        })
        .collect();

    Heatmap { cells }
}

/// Per-line daily load trend, points sorted ascending by date.
pub fn build_trend(segments: &[SegmentRow], filter: &FilterSpec) -> Trend {
    let segments = filter.segments(segments);

    let mut groups: HashMap<(LineId, NaiveDate), Vec<&SegmentRow>> = HashMap::new();
    for &row in &segments {
        groups.entry((row.line, row.date)).or_default().push(row);
    }

    let mut series: HashMap<LineId, Vec<TrendPoint>> = HashMap::new();
    for ((line, date), rows) in groups {
        let rates: Vec<f64> = rows.iter().map(|r| r.full_rate).collect();
        series.entry(line).or_default().push(TrendPoint {
            date,
            avg_load: mean(&rates),
            p95_load: p95(&rates),
            total_load: rows.iter().map(|r| r.load).sum(),
        });
    }

    let series = series
        .into_iter()
        .sorted_by_key(|&(line, _)| line)
        .map(|(line, mut points)| {
            points.sort_by_key(|point| point.date);
            TrendSeries {
                line: line.to_string(),
                points,
            }
        })
        .collect();

    Trend { series }
}

/// Segment pairs ranked by passenger-kilometers per kilometer. Pairs whose
/// accumulated distance is zero are excluded rather than divided.
pub fn build_density_rank(segments: &[SegmentRow], filter: &FilterSpec) -> DensityRank {
    let segments = filter.segments(segments);

    let mut totals: HashMap<(StationId, StationId), (f64, f64)> = HashMap::new();
    for row in &segments {
        let entry = totals
            .entry((row.from_station, row.to_station))
            .or_insert((0.0, 0.0));
        entry.0 += row.passenger_km();
        entry.1 += row.distance_km;
    }

    let items = totals
        .into_iter()
        .filter(|&(_, (_, km))| km > 0.0)
        .map(|((from, to), (pkm, km))| DensityEntry {
            from: from.to_string(),
            to: to.to_string(),
            density: pkm / km,
            total_passenger_km: pkm,
            total_km: km,
        })
        .sorted_by(|a, b| {
            b.density
                .total_cmp(&a.density)
                .then_with(|| (a.from.as_str(), a.to.as_str()).cmp(&(b.from.as_str(), b.to.as_str())))
        })
        .collect();

    DensityRank { items }
}

/// Corridor load profile with a representative peak hour recovered by
/// joining segment trips back to flow observations.
pub fn build_corridor(
    flows: &[FlowRow],
    segments: &[SegmentRow],
    filter: &FilterSpec,
) -> Corridor {
    let flows = filter.flows(flows);
    let segments = filter.segments(segments);

    // Hours seen per trip identity, for the statistical-mode join below.
    let mut trip_hours: HashMap<(LineId, &str, NaiveDate, TripKey), Vec<u8>> = HashMap::new();
    for row in &flows {
        let Some(trip) = row.trip else { continue };
        let hour = row
            .departure
            .map(|t| t.hour() as u8)
            .unwrap_or_else(|| trip.hour());
        trip_hours
            .entry((row.line, row.train.as_str(), row.date, trip))
            .or_default()
            .push(hour);
    }

    let mut groups: HashMap<(LineId, StationId, StationId), Vec<&SegmentRow>> = HashMap::new();
    for &row in &segments {
        groups
            .entry((row.line, row.from_station, row.to_station))
            .or_default()
            .push(row);
    }

    let items = groups
        .into_iter()
        .map(|((line, from, to), rows)| {
            let rates: Vec<f64> = rows.iter().map(|r| r.full_rate).collect();
            let joined: Vec<u8> = rows
                .iter()
                .filter_map(|r| trip_hours.get(&(r.line, r.train.as_str(), r.date, r.trip)))
                .flatten()
                .copied()
                .collect();
            CorridorEntry {
                line: line.to_string(),
                from: from.to_string(),
                to: to.to_string(),
                avg_load: mean(&rates),
                p95_load: p95(&rates),
                peak_hour: mode(&joined).unwrap_or(0),
                trips: rows.len(),
            }
        })
        .sorted_by(|a, b| {
            b.p95_load
                .total_cmp(&a.p95_load)
                .then_with(|| (&a.line, &a.from, &a.to).cmp(&(&b.line, &b.from, &b.to)))
        })
        .collect();

    Corridor { items }
}

/// Per-trip load cells positioned along the line's reconstructed station
/// sequence. Segment rows whose origin is unknown to the sequence are
/// dropped; skip-stop trips can reference station pairs that are not
/// adjacent in the rebuilt order.
pub fn build_trip_heatmap(segments: &[SegmentRow], filter: &FilterSpec) -> TripHeatmap {
    let segments = filter.segments(segments);
    let direction = filter.direction.unwrap_or(Direction::Up);

    let mut by_line: HashMap<LineId, Vec<&SegmentRow>> = HashMap::new();
    for &row in &segments {
        by_line.entry(row.line).or_default().push(row);
    }

    let positions: HashMap<LineId, HashMap<StationId, usize>> = by_line
        .iter()
        .map(|(&line, rows)| {
            let order = build_station_sequence(rows, direction);
            let index = order
                .into_iter()
                .enumerate()
                .map(|(position, station)| (station, position))
                .collect();
            (line, index)
        })
        .collect();

    let mut trips: HashMap<(LineId, &str, NaiveDate, TripKey), Vec<TripCell>> = HashMap::new();
    for row in &segments {
        let Some(position) = positions
            .get(&row.line)
            .and_then(|index| index.get(&row.from_station))
        else {
            continue;
        };
        trips
            .entry((row.line, row.train.as_str(), row.date, row.trip))
            .or_default()
            .push(TripCell {
                position: *position,
                from: row.from_station.to_string(),
                to: row.to_station.to_string(),
                full_rate: row.full_rate,
            });
    }

    let trips = trips
        .into_iter()
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .map(|((line, train, date, trip), mut cells)| {
            cells.sort_by_key(|cell| cell.position);
            TripLoadRow {
                line: line.to_string(),
                train: train.to_string(),
                date,
                trip: trip.to_string(),
                cells,
            }
        })
        .collect();

    TripHeatmap { trips }
}

/// Load scatter over scheduled departure slots, ascending by time of day.
pub fn build_timetable_scatter(segments: &[SegmentRow], filter: &FilterSpec) -> TimetableScatter {
    let segments = filter.segments(segments);

    let mut slots: HashMap<TripKey, Vec<&SegmentRow>> = HashMap::new();
    for &row in &segments {
        slots.entry(row.trip).or_default().push(row);
    }

    let slots = slots
        .into_iter()
        .sorted_by_key(|&(slot, _)| slot)
        .map(|(slot, rows)| {
            let rates: Vec<f64> = rows.iter().map(|r| r.full_rate).collect();
            let sample_trips = rows
                .iter()
                .map(|r| (r.line, r.train.as_str(), r.date))
                .sorted_unstable()
                .dedup()
                .count();
            TimetableSlot {
                time: slot.to_string(),
                avg_load: mean(&rates),
                p95_load: p95(&rates),
                sample_trips,
            }
        })
        .collect();

    TimetableScatter { slots }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn segment(line: LineId, from: StationId, to: StationId, slot: &str, rate: f64) -> SegmentRow {
        SegmentRow {
            line,
            train: "T1".into(),
            date: date(4),
            trip: TripKey::parse(slot).unwrap(),
            direction: None,
            from_station: from,
            to_station: to,
            distance_km: 10.0,
            load: rate * 400.0,
            full_rate: rate,
        }
    }

    fn flow(line: LineId, station: StationId, slot: &str, departure: &str) -> FlowRow {
        FlowRow {
            line,
            train: "T1".into(),
            station,
            date: date(4),
            direction: None,
            trip: Some(TripKey::parse(slot).unwrap()),
            arrival: None,
            departure: NaiveTime::parse_from_str(departure, "%H:%M").ok(),
            boarded: 20,
            alighted: 10,
            capacity: 200,
            origin_telecode: None,
            destination_telecode: None,
        }
    }

    #[test]
    fn heatmap_counts_overload_minutes() {
        let segments = vec![
            segment(1, 10, 11, "0810", 1.2),
            segment(1, 10, 11, "0840", 1.1),
            segment(1, 10, 11, "0850", 0.6),
            segment(1, 10, 11, "0910", 0.4),
        ];
        let heatmap = build_heatmap(&segments, &FilterSpec::default());
        assert_eq!(heatmap.cells.len(), 2);
        let eight = &heatmap.cells[0];
        assert_eq!(eight.hour, 8);
        assert_eq!(eight.over_minutes, 10);
        let nine = &heatmap.cells[1];
        assert_eq!(nine.hour, 9);
        assert_eq!(nine.over_minutes, 0);
    }

    #[test]
    fn trend_points_sorted_by_date() {
        let mut segments = vec![
            segment(1, 10, 11, "0800", 0.5),
            segment(1, 10, 11, "0800", 0.7),
        ];
        segments[1].date = date(2);
        let trend = build_trend(&segments, &FilterSpec::default());
        assert_eq!(trend.series.len(), 1);
        let points = &trend.series[0].points;
        assert_eq!(points.len(), 2);
        assert!(points[0].date < points[1].date);
    }

    #[test]
    fn density_excludes_zero_distance_pairs() {
        let mut segments = vec![
            segment(1, 10, 11, "0800", 0.5),
            segment(1, 11, 12, "0800", 0.9),
        ];
        segments[0].distance_km = 0.0;
        segments[0].load = 100.0;
        let rank = build_density_rank(&segments, &FilterSpec::default());
        assert_eq!(rank.items.len(), 1);
        assert_eq!(rank.items[0].from, "11");
        // density = load here because each row covers one traversal
        assert!((rank.items[0].density - segments[1].load).abs() < 1e-10);
    }

    #[test]
    fn density_sorts_descending() {
        let mut a = segment(1, 10, 11, "0800", 0.5);
        a.load = 50.0;
        let mut b = segment(1, 11, 12, "0800", 0.9);
        b.load = 300.0;
        let rank = build_density_rank(&[a, b], &FilterSpec::default());
        assert!(rank.items[0].density >= rank.items[1].density);
        assert_eq!(rank.items[0].from, "11");
    }

    #[test]
    fn corridor_recovers_modal_peak_hour() {
        let segments = vec![
            segment(1, 10, 11, "0830", 1.1),
            segment(1, 10, 11, "0830", 0.9),
        ];
        let flows = vec![
            flow(1, 10, "0830", "08:31"),
            flow(1, 11, "0830", "08:45"),
            flow(1, 12, "0830", "09:05"),
        ];
        let corridor = build_corridor(&flows, &segments, &FilterSpec::default());
        assert_eq!(corridor.items.len(), 1);
        // Joined hours are [8, 8, 9] twice over; the mode is 8.
        assert_eq!(corridor.items[0].peak_hour, 8);
        assert_eq!(corridor.items[0].trips, 2);
    }

    #[test]
    fn corridor_peak_hour_falls_back_to_zero() {
        let segments = vec![segment(1, 10, 11, "0830", 1.1)];
        let corridor = build_corridor(&[], &segments, &FilterSpec::default());
        assert_eq!(corridor.items[0].peak_hour, 0);
    }

    #[test]
    fn trip_heatmap_positions_follow_sequence() {
        let segments = vec![
            segment(1, 10, 11, "0800", 0.4),
            segment(1, 11, 12, "0800", 0.6),
        ];
        let heatmap = build_trip_heatmap(&segments, &FilterSpec::default());
        assert_eq!(heatmap.trips.len(), 1);
        let cells = &heatmap.trips[0].cells;
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].position, 0);
        assert_eq!(cells[0].from, "10");
        assert_eq!(cells[1].position, 1);
    }

    #[test]
    fn timetable_slots_sorted_by_departure() {
        let segments = vec![
            segment(1, 10, 11, "1615", 0.8),
            segment(1, 10, 11, "0730", 0.5),
        ];
        let scatter = build_timetable_scatter(&segments, &FilterSpec::default());
        assert_eq!(scatter.slots.len(), 2);
        assert_eq!(scatter.slots[0].time, "07:30");
        assert_eq!(scatter.slots[1].time, "16:15");
        assert_eq!(scatter.slots[0].sample_trips, 1);
    }

    #[test]
    fn builders_are_total_on_empty_input() {
        let filter = FilterSpec::default();
        assert!(build_heatmap(&[], &filter).cells.is_empty());
        assert!(build_trend(&[], &filter).series.is_empty());
        assert!(build_density_rank(&[], &filter).items.is_empty());
        assert!(build_corridor(&[], &[], &filter).items.is_empty());
        assert!(build_trip_heatmap(&[], &filter).trips.is_empty());
        assert!(build_timetable_scatter(&[], &filter).slots.is_empty());
    }
}
