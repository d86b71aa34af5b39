//! Scalar load KPIs per line and network-wide

use hashbrown::HashMap;
use itertools::Itertools;
use serde::Serialize;

use crate::analytics::stats::{mean, p95};
use crate::model::filter::FilterSpec;
use crate::model::records::{FlowRow, SegmentRow};
use crate::{LineId, StationId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineKpi {
    pub line: String,
    /// Mean exchange-to-capacity ratio, expressed 0-100.
    pub avg_occupancy_pct: f64,
    /// 95th percentile of full rate over the line's segment rows.
    pub p95_load: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopSection {
    pub line: String,
    pub from: String,
    pub to: String,
    pub p95_load: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    pub lines: Vec<LineKpi>,
    pub avg_occupancy_pct: f64,
    pub overload_line_count: usize,
    pub idle_line_count: usize,
    pub top_section: Option<TopSection>,
    pub peak_hours: Vec<u8>,
    pub efficiency_score: f64,
}

/// Mean occupancy ratio per line, clamped into [0, 1] so outlier capacity
/// data cannot push the displayed percentage outside its range.
pub(crate) fn line_occupancy(flows: &[&FlowRow]) -> HashMap<LineId, f64> {
    let mut ratios: HashMap<LineId, Vec<f64>> = HashMap::new();
    for row in flows {
        ratios.entry(row.line).or_default().push(row.occupancy_ratio());
    }
    ratios
        .into_iter()
        .map(|(line, values)| (line, mean(&values).clamp(0.0, 1.0)))
        .collect()
}

/// p95 full rate per line.
pub(crate) fn line_p95(segments: &[&SegmentRow]) -> HashMap<LineId, f64> {
    let mut rates: HashMap<LineId, Vec<f64>> = HashMap::new();
    for row in segments {
        rates.entry(row.line).or_default().push(row.full_rate);
    }
    rates
        .into_iter()
        .map(|(line, values)| (line, p95(&values)))
        .collect()
}

/// p95 full rate per directed (line, from, to) section.
pub(crate) fn section_p95(
    segments: &[&SegmentRow],
) -> HashMap<(LineId, StationId, StationId), f64> {
    let mut rates: HashMap<(LineId, StationId, StationId), Vec<f64>> = HashMap::new();
    for row in segments {
        rates
            .entry((row.line, row.from_station, row.to_station))
            .or_default()
            .push(row.full_rate);
    }
    rates
        .into_iter()
        .map(|(key, values)| (key, p95(&values)))
        .collect()
}

/// Top 3 hours ranked by mean p95 load across lines. The hour bucket comes
/// from the trip departure slot.
pub(crate) fn peak_hours(segments: &[&SegmentRow]) -> Vec<u8> {
    let mut cell_rates: HashMap<(LineId, u8), Vec<f64>> = HashMap::new();
    for row in segments {
        cell_rates
            .entry((row.line, row.trip.hour()))
            .or_default()
            .push(row.full_rate);
    }

    let mut hour_p95s: HashMap<u8, Vec<f64>> = HashMap::new();
    for ((_, hour), rates) in cell_rates {
        hour_p95s.entry(hour).or_default().push(p95(&rates));
    }

    hour_p95s
        .into_iter()
        .map(|(hour, values)| (hour, mean(&values)))
        .sorted_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)))
        .take(3)
        .map(|(hour, _)| hour)
        .collect()
}

/// Computes the KPI summary over the filtered snapshot.
///
/// Occupancy and efficiency are clamped into their display ranges; an
/// entirely empty snapshot short-circuits to the zeroed summary.
pub fn compute_kpi(flows: &[FlowRow], segments: &[SegmentRow], filter: &FilterSpec) -> KpiSummary {
    let flows = filter.flows(flows);
    let segments = filter.segments(segments);

    let occupancy = line_occupancy(&flows);
    let p95_by_line = line_p95(&segments);

    let line_ids: Vec<LineId> = occupancy
        .keys()
        .chain(p95_by_line.keys())
        .copied()
        .sorted_unstable()
        .dedup()
        .collect();
    if line_ids.is_empty() {
        return KpiSummary::default();
    }

    let lines: Vec<LineKpi> = line_ids
        .iter()
        .map(|&line| LineKpi {
            line: line.to_string(),
            avg_occupancy_pct: (occupancy.get(&line).copied().unwrap_or(0.0) * 100.0).round(),
            p95_load: p95_by_line.get(&line).copied().unwrap_or(0.0),
        })
        .collect();

    let overload_line_count = line_ids
        .iter()
        .filter(|&line| p95_by_line.get(line).copied().unwrap_or(0.0) > filter.thresholds.overload)
        .count();
    let idle_line_count = line_ids
        .iter()
        .filter(|&line| occupancy.get(line).copied().unwrap_or(0.0) < filter.thresholds.idle)
        .count();

    let top_section = section_p95(&segments)
        .into_iter()
        .sorted_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)))
        .next()
        .map(|((line, from, to), rate)| TopSection {
            line: line.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            p95_load: rate,
        });

    let total = line_ids.len() as f64;
    let overloaded_pct = overload_line_count as f64 / total * 100.0;
    let idle_pct = idle_line_count as f64 / total * 100.0;
    let avg_occupancy = line_ids
        .iter()
        .map(|line| occupancy.get(line).copied().unwrap_or(0.0) * 100.0)
        .collect::<Vec<_>>();
    let avg_occupancy_pct = mean(&avg_occupancy);
    let efficiency_score =
        (100.0 - overloaded_pct - idle_pct + 0.2 * avg_occupancy_pct).clamp(0.0, 100.0);

    KpiSummary {
        lines,
        avg_occupancy_pct: avg_occupancy_pct.round(),
        overload_line_count,
        idle_line_count,
        top_section,
        peak_hours: peak_hours(&segments),
        efficiency_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::model::records::TripKey;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn flow(line: LineId, boarded: u32, alighted: u32, capacity: u32) -> FlowRow {
        FlowRow {
            line,
            train: "T1".into(),
            station: 1,
            date: date(),
            direction: None,
            trip: Some(TripKey::parse("0800").unwrap()),
            arrival: None,
            departure: None,
            boarded,
            alighted,
            capacity,
            origin_telecode: None,
            destination_telecode: None,
        }
    }

    fn segment(
        line: LineId,
        from: StationId,
        to: StationId,
        slot: &str,
        full_rate: f64,
    ) -> SegmentRow {
        SegmentRow {
            line,
            train: "T1".into(),
            date: date(),
            trip: TripKey::parse(slot).unwrap(),
            direction: None,
            from_station: from,
            to_station: to,
            distance_km: 12.0,
            load: full_rate * 500.0,
            full_rate,
        }
    }

    #[test]
    fn empty_input_yields_zeroed_summary() {
        let summary = compute_kpi(&[], &[], &FilterSpec::default());
        assert_eq!(summary.overload_line_count, 0);
        assert_eq!(summary.idle_line_count, 0);
        assert!(summary.top_section.is_none());
        assert!(summary.peak_hours.is_empty());
        assert_eq!(summary.efficiency_score, 0.0);
        assert!(summary.lines.is_empty());
    }

    #[test]
    fn occupancy_is_rounded_and_clamped() {
        // Exchange 160 over capacity 100 would display above 100 percent.
        let flows = vec![flow(1, 100, 60, 100)];
        let summary = compute_kpi(&flows, &[], &FilterSpec::default());
        assert_eq!(summary.lines.len(), 1);
        assert!((summary.lines[0].avg_occupancy_pct - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn overload_and_idle_counts_use_thresholds() {
        let flows = vec![flow(1, 5, 5, 100), flow(2, 40, 40, 100)];
        let segments = vec![
            segment(1, 10, 11, "0800", 1.2),
            segment(1, 10, 11, "0800", 1.1),
            segment(2, 20, 21, "0900", 0.5),
        ];
        let summary = compute_kpi(&flows, &segments, &FilterSpec::default());
        // Line 1: p95 > 1.0 and occupancy 0.10 < 0.35 -> both overloaded and idle.
        assert_eq!(summary.overload_line_count, 1);
        assert_eq!(summary.idle_line_count, 1);
    }

    #[test]
    fn top_section_is_global_maximum() {
        let segments = vec![
            segment(1, 10, 11, "0800", 0.6),
            segment(2, 20, 21, "0800", 1.4),
            segment(2, 21, 22, "0900", 0.9),
        ];
        let summary = compute_kpi(&[], &segments, &FilterSpec::default());
        let top = summary.top_section.unwrap();
        assert_eq!(top.line, "2");
        assert_eq!(top.from, "20");
        assert_eq!(top.to, "21");
        assert!((top.p95_load - 1.4).abs() < 1e-10);
    }

    #[test]
    fn peak_hours_rank_top_three() {
        let segments = vec![
            segment(1, 10, 11, "0800", 1.5),
            segment(1, 10, 11, "0900", 1.0),
            segment(1, 10, 11, "1000", 0.7),
            segment(1, 10, 11, "1100", 0.2),
        ];
        let summary = compute_kpi(&[], &segments, &FilterSpec::default());
        assert_eq!(summary.peak_hours, vec![8, 9, 10]);
    }

    #[test]
    fn efficiency_score_stays_in_range() {
        let flows = vec![flow(1, 0, 0, 100)];
        let segments = vec![segment(1, 10, 11, "0800", 3.0)];
        let summary = compute_kpi(&flows, &segments, &FilterSpec::default());
        assert!(summary.efficiency_score >= 0.0);
        assert!(summary.efficiency_score <= 100.0);

        let busy_flows = vec![flow(1, 50, 40, 100)];
        let calm_segments = vec![segment(1, 10, 11, "0800", 0.6)];
        let summary = compute_kpi(&busy_flows, &calm_segments, &FilterSpec::default());
        assert!(summary.efficiency_score >= 0.0);
        assert!(summary.efficiency_score <= 100.0);
    }
}
