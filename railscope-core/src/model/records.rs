//! Typed row kinds derived from the external row source

use std::fmt;

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::model::filter::Direction;
use crate::{LineId, StationId};

/// Departure-time bucket identifying one train run on a line and date.
///
/// Stored as the zero-padded 4-digit `HHMM` key used by the source data,
/// e.g. `0830` for a trip departing in the 08:30 slot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TripKey(u16);

impl TripKey {
    /// Builds a key from a raw `HHMM` value, rejecting impossible times.
    pub fn from_hhmm(value: u16) -> Option<Self> {
        let (hour, minute) = (value / 100, value % 100);
        if hour < 24 && minute < 60 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Parses the zero-padded 4-digit time key, e.g. `"0830"`.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<u16>().ok().and_then(Self::from_hhmm)
    }

    pub fn from_time(time: NaiveTime) -> Self {
        Self((time.hour() * 100 + time.minute()) as u16)
    }

    pub fn hour(self) -> u8 {
        (self.0 / 100) as u8
    }

    pub fn minute(self) -> u8 {
        (self.0 % 100) as u8
    }
}

impl fmt::Display for TripKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// One passenger-flow observation: a train calling at a station.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRow {
    pub line: LineId,
    pub train: String,
    pub station: StationId,
    pub date: NaiveDate,
    pub direction: Option<Direction>,
    /// Departure slot of the run, when a departure time was recorded.
    pub trip: Option<TripKey>,
    pub arrival: Option<NaiveTime>,
    pub departure: Option<NaiveTime>,
    pub boarded: u32,
    pub alighted: u32,
    pub capacity: u32,
    pub origin_telecode: Option<String>,
    pub destination_telecode: Option<String>,
}

impl FlowRow {
    /// Passengers exchanged at the station on this call.
    pub fn exchange(&self) -> u32 {
        self.boarded + self.alighted
    }

    /// Exchange relative to train capacity. A zero capacity counts as one
    /// seat so the ratio stays finite on malformed capacity data.
    pub fn occupancy_ratio(&self) -> f64 {
        f64::from(self.exchange()) / f64::from(self.capacity.max(1))
    }
}

/// One traversal of the directed edge between two consecutive stations.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRow {
    pub line: LineId,
    pub train: String,
    pub date: NaiveDate,
    pub trip: TripKey,
    pub direction: Option<Direction>,
    pub from_station: StationId,
    pub to_station: StationId,
    pub distance_km: f64,
    pub load: f64,
    /// Onboard load divided by train capacity for this traversal.
    pub full_rate: f64,
}

impl SegmentRow {
    pub fn passenger_km(&self) -> f64 {
        self.load * self.distance_km
    }
}

/// Station ordering record, used only when the order cannot be derived
/// from segment observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteStationEdge {
    pub line: LineId,
    pub sequence: u32,
    pub station: StationId,
    pub previous_station: Option<StationId>,
    pub next_station: Option<StationId>,
}

/// One day of the historical demand series consumed by the forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trip_key_parses_zero_padded_slots() {
        let key = TripKey::parse("0830").unwrap();
        assert_eq!(key.hour(), 8);
        assert_eq!(key.minute(), 30);
        assert_eq!(key.to_string(), "08:30");
    }

    #[test]
    fn trip_key_rejects_impossible_times() {
        assert!(TripKey::parse("2460").is_none());
        assert!(TripKey::parse("9999").is_none());
        assert!(TripKey::parse("abc").is_none());
        assert!(TripKey::from_hhmm(1261).is_none());
    }

    #[test]
    fn trip_key_orders_by_departure() {
        assert!(TripKey::parse("0730").unwrap() < TripKey::parse("1615").unwrap());
    }

    #[test]
    fn occupancy_guards_zero_capacity() {
        let row = FlowRow {
            line: 1,
            train: "G101".into(),
            station: 10,
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            direction: None,
            trip: None,
            arrival: None,
            departure: None,
            boarded: 30,
            alighted: 20,
            capacity: 0,
            origin_telecode: None,
            destination_telecode: None,
        };
        assert_eq!(row.exchange(), 50);
        assert!((row.occupancy_ratio() - 50.0).abs() < f64::EPSILON);
    }
}
