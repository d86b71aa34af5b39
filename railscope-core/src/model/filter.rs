//! Common filter specification applied to flow and segment snapshots

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use hashbrown::HashSet;

use crate::LineId;
use crate::model::records::{FlowRow, SegmentRow};

/// Travel direction along a line. "Down" traverses the station sequence
/// in reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayType {
    Workday,
    Weekend,
}

impl DayType {
    /// Monday through Friday count as workdays.
    pub fn of(date: NaiveDate) -> Self {
        if date.weekday().num_days_from_monday() < 5 {
            Self::Workday
        } else {
            Self::Weekend
        }
    }
}

impl FromStr for DayType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "workday" => Ok(Self::Workday),
            "weekend" => Ok(Self::Weekend),
            _ => Err(()),
        }
    }
}

/// Load thresholds shared by the KPI aggregator and the suggestion rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// A segment whose p95 full rate exceeds this is overloaded.
    pub overload: f64,
    /// A line whose mean occupancy ratio falls below this is idle.
    pub idle: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            overload: 1.0,
            idle: 0.35,
        }
    }
}

/// Filter applied uniformly before any aggregation. Absent fields are
/// no-ops, so the default spec passes every row through.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    /// Inclusive on both ends.
    pub time_range: Option<(NaiveDate, NaiveDate)>,
    /// Empty set means all lines.
    pub lines: HashSet<LineId>,
    /// `None` means both directions.
    pub direction: Option<Direction>,
    /// `None` means all day types.
    pub day_type: Option<DayType>,
    pub thresholds: Thresholds,
}

impl FilterSpec {
    pub fn for_lines<I: IntoIterator<Item = LineId>>(lines: I) -> Self {
        Self {
            lines: lines.into_iter().collect(),
            ..Self::default()
        }
    }

    fn accepts(&self, line: LineId, date: NaiveDate, direction: Option<Direction>) -> bool {
        if let Some((start, end)) = self.time_range {
            if date < start || date > end {
                return false;
            }
        }
        if !self.lines.is_empty() && !self.lines.contains(&line) {
            return false;
        }
        // Rows without a recorded direction pass a direction filter,
        // mirroring the absent-column behavior of the source data.
        if let (Some(wanted), Some(actual)) = (self.direction, direction) {
            if wanted != actual {
                return false;
            }
        }
        if let Some(day_type) = self.day_type {
            if DayType::of(date) != day_type {
                return false;
            }
        }
        true
    }

    /// Borrowed view of the flow rows matching this spec.
    pub fn flows<'a>(&self, rows: &'a [FlowRow]) -> Vec<&'a FlowRow> {
        rows.iter()
            .filter(|row| self.accepts(row.line, row.date, row.direction))
            .collect()
    }

    /// Borrowed view of the segment rows matching this spec.
    pub fn segments<'a>(&self, rows: &'a [SegmentRow]) -> Vec<&'a SegmentRow> {
        rows.iter()
            .filter(|row| self.accepts(row.line, row.date, row.direction))
            .collect()
    }
}
