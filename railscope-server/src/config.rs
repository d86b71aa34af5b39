use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Server configuration, read from a TOML file with per-field defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the server binds to.
    pub bind: String,
    /// Directory holding flows.csv, segments.csv, route_stations.csv and
    /// stations.csv.
    pub data_dir: PathBuf,
    /// Requests served concurrently before callers queue.
    pub max_concurrency: usize,
    /// Default number of OD pairs surfaced as alerts.
    pub od_top_n: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_owned(),
            data_dir: PathBuf::from("./data"),
            max_concurrency: 64,
            od_top_n: 10,
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}
