use serde::Deserialize;
use std::path::Path;

use crate::error::SimError;

#[derive(Debug, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub simulation: SimulationSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize)]
pub struct SimulationSection {
    /// Length of one redstone tick in milliseconds. Default: 100.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Stop after this many ticks. 0 = run until Ctrl+C.
    #[serde(default)]
    pub max_ticks: u64,
    /// Stop once every scenario action has run and no update is pending.
    #[serde(default)]
    pub stop_when_idle: bool,
    #[serde(default = "default_scenario")]
    pub scenario: String,
    /// Restore networks from this JSON snapshot instead of placing the
    /// scenario's components.
    #[serde(default)]
    pub load_snapshot: Option<String>,
    /// Write the network snapshot here on exit.
    #[serde(default)]
    pub save_snapshot: Option<String>,
    /// Log every component's state every N ticks. 0 = only at exit.
    #[serde(default = "default_report_interval")]
    pub report_interval: u64,
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_scenario() -> String {
    "scenario.toml".into()
}

fn default_report_interval() -> u64 {
    10
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: 0,
            stop_when_idle: false,
            scenario: default_scenario(),
            load_snapshot: None,
            save_snapshot: None,
            report_interval: default_report_interval(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl SimConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}
