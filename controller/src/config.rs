//! Lab configuration: the shared mode/pause file and the controller settings.

use crate::{real::Target, Error};
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Range, path::Path, path::PathBuf, str::FromStr, time::Duration};
use tracing::debug;

/// Number of attempts made to read the mode/pause file.
pub const READ_ATTEMPTS: usize = 5;

/// Delay between attempts to read the mode/pause file.
pub const READ_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Where handshake measurements come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// Perform real handshakes only.
    Real,
    /// Query the physics engine only.
    Physics,
}

impl Mode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Mode::Real => "REAL",
            Mode::Physics => "PHYSICS",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REAL" => Ok(Mode::Real),
            "PHYSICS" => Ok(Mode::Physics),
            _ => Err(Error::UnknownMode(s.to_string())),
        }
    }
}

/// Contents of the mode/pause file, as written by the front end.
#[derive(Debug, Default, Deserialize)]
struct RawLabConfig {
    mode: Option<String>,
    paused: Option<bool>,
}

/// An update read from the mode/pause file.
///
/// Fields are `None` when the file does not set them (or sets them to something invalid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LabConfig {
    pub mode: Option<Mode>,
    pub paused: Option<bool>,
}

/// Read the mode/pause file at `path`.
///
/// The file is rewritten concurrently by the front end, so unreadable or partially written
/// contents are retried up to [READ_ATTEMPTS] times. Returns `None` if the file does not
/// exist, is empty, or never parses.
pub async fn read_lab_config(path: &Path) -> Option<LabConfig> {
    for attempt in 1..=READ_ATTEMPTS {
        if !path.exists() {
            return None;
        }
        match tokio::fs::read_to_string(path).await {
            Ok(content) if content.trim().is_empty() => return None,
            Ok(content) => match parse_lab_config(&content) {
                Ok(config) => return Some(config),
                Err(err) => debug!(attempt, error = ?err, "failed to parse lab config"),
            },
            Err(err) => debug!(attempt, error = ?err, "failed to read lab config"),
        }
        tokio::time::sleep(READ_RETRY_INTERVAL).await;
    }
    None
}

/// Parse the contents of the mode/pause file.
///
/// An unknown mode is ignored, leaving the pause flag intact.
pub fn parse_lab_config(content: &str) -> Result<LabConfig, Error> {
    let raw: RawLabConfig = serde_json::from_str(content)?;
    Ok(LabConfig {
        mode: raw.mode.and_then(|mode| mode.parse().ok()),
        paused: raw.paused,
    })
}

/// Settings of the lab controller.
#[derive(Clone, Debug)]
pub struct Config {
    /// Mode/pause file shared with the front end.
    pub lab_config: PathBuf,
    /// JSON array of handshake records.
    pub report: PathBuf,
    /// Debug copy of the newest records.
    pub debug_dump: PathBuf,
    /// Delay between completed cycles.
    pub cycle_interval: Duration,
    /// Delay between polls while paused.
    pub pause_interval: Duration,
    /// Delay after a mode change before the next cycle.
    pub settle_interval: Duration,
    /// Maximum number of records kept in the report.
    pub max_records: usize,
    /// Round-trip times (in milliseconds) drawn for simulated handshakes.
    pub rtt_range: Range<f64>,
    /// Bandwidth (in Mbps) of simulated links.
    pub bandwidth_mbps: f64,
    /// Real handshake client.
    pub target: Target,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lab_config: PathBuf::from("lab_config.json"),
            report: PathBuf::from("captures/real_scan_results.json"),
            debug_dump: PathBuf::from("captures/debug_data_dump.json"),
            cycle_interval: Duration::from_secs(5),
            pause_interval: Duration::from_secs(2),
            settle_interval: Duration::from_secs(1),
            max_records: 2_000,
            rtt_range: 20.0..40.0,
            bandwidth_mbps: pqlab_physics::DEFAULT_BANDWIDTH_MBPS,
            target: Target::default(),
        }
    }
}

impl Config {
    /// Ensure the settings can drive the simulator.
    pub fn validate(&self) -> Result<(), Error> {
        let Range { start, end } = self.rtt_range;
        if !start.is_finite() || !end.is_finite() || start < 0.0 || start >= end {
            return Err(Error::InvalidRttRange(start, end));
        }
        pqlab_physics::Link::new(start, self.bandwidth_mbps)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pqlab_{name}_{}", rand::thread_rng().gen::<u64>()))
    }

    #[test]
    fn test_parse_lab_config() {
        let config = parse_lab_config(r#"{"mode": "REAL", "paused": false}"#).unwrap();
        assert_eq!(config.mode, Some(Mode::Real));
        assert_eq!(config.paused, Some(false));

        let config = parse_lab_config(r#"{"paused": true}"#).unwrap();
        assert_eq!(config.mode, None);
        assert_eq!(config.paused, Some(true));

        // Unknown modes are ignored without discarding the pause flag
        let config = parse_lab_config(r#"{"mode": "HYBRID", "paused": true}"#).unwrap();
        assert_eq!(config.mode, None);
        assert_eq!(config.paused, Some(true));

        assert!(parse_lab_config("{\"mode\": ").is_err());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("PHYSICS".parse::<Mode>().unwrap(), Mode::Physics);
        assert_eq!(Mode::Real.to_string(), "REAL");
        assert!(matches!("physics".parse::<Mode>(), Err(Error::UnknownMode(_))));
    }

    #[tokio::test]
    async fn test_read_lab_config() {
        let path = temp_path("lab_config");
        assert_eq!(read_lab_config(&path).await, None);

        std::fs::write(&path, "").unwrap();
        assert_eq!(read_lab_config(&path).await, None);

        std::fs::write(&path, r#"{"mode": "PHYSICS", "paused": false}"#).unwrap();
        assert_eq!(
            read_lab_config(&path).await,
            Some(LabConfig {
                mode: Some(Mode::Physics),
                paused: Some(false),
            })
        );

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(read_lab_config(&path).await, None);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let config = Config {
            rtt_range: 40.0..20.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidRttRange(_, _))));

        let config = Config {
            bandwidth_mbps: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Physics(_))));
    }
}
