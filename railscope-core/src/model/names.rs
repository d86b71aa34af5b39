//! Station and line display-name resolution
//!
//! Names are presentation labels only; no computation depends on them.

use hashbrown::HashMap;

use crate::{LineId, StationId};

/// Lookup seam for display names. The engine falls back to stringified
/// identifiers whenever a name is unknown.
pub trait NameResolver {
    fn station_name(&self, id: StationId) -> Option<&str>;
    fn station_by_telecode(&self, code: &str) -> Option<&str>;
    fn line_name(&self, id: LineId) -> Option<&str>;
}

/// Map-backed resolver, filled from the station directory file at load time.
#[derive(Debug, Clone, Default)]
pub struct NameDirectory {
    stations: HashMap<StationId, String>,
    telecodes: HashMap<String, String>,
    lines: HashMap<LineId, String>,
}

impl NameDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_station(&mut self, id: StationId, name: impl Into<String>) {
        self.stations.insert(id, name.into());
    }

    pub fn insert_telecode(&mut self, code: impl Into<String>, name: impl Into<String>) {
        self.telecodes.insert(code.into(), name.into());
    }

    pub fn insert_line(&mut self, id: LineId, name: impl Into<String>) {
        self.lines.insert(id, name.into());
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty() && self.telecodes.is_empty() && self.lines.is_empty()
    }
}

impl NameResolver for NameDirectory {
    fn station_name(&self, id: StationId) -> Option<&str> {
        self.stations.get(&id).map(String::as_str)
    }

    fn station_by_telecode(&self, code: &str) -> Option<&str> {
        self.telecodes.get(code).map(String::as_str)
    }

    fn line_name(&self, id: LineId) -> Option<&str> {
        self.lines.get(&id).map(String::as_str)
    }
}
