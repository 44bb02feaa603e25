//! Configuration for the Synheart Stress Agent.

use crate::core::analytics::{REPORT_INTERVAL_SECS, SPIKE_COOLDOWN_SECS, SPIKE_DELTA};
use crate::core::breathing::{PhaseDurations, EXHALE_SECS, HOLD_SECS, INHALE_SECS};
use crate::core::engine::{
    BREATHING_TRIGGER_SCORE, HIGH_STRESS_THRESHOLD, MEDIUM_STRESS_THRESHOLD, STRESS_HISTORY_LEN,
};
use crate::core::smoother::{MIN_SMOOTHING_SAMPLES, SMOOTHING_WINDOW};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the stress agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Analytics engine parameters
    #[serde(default)]
    pub engine: EngineConfig,

    /// Path for exporting session reports
    pub export_path: PathBuf,

    /// Path for storing the transparency log
    pub data_path: PathBuf,

    /// Port for the status server
    pub server_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("synheart-stress-agent");

        Self {
            engine: EngineConfig::default(),
            export_path: data_dir.join("reports"),
            data_path: data_dir,
            server_port: 8000,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file, falling back to defaults if it is absent.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("synheart-stress-agent")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Thresholds, window sizes and timings used by the stress engine.
///
/// Read once when an engine is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frames averaged by the smoother
    pub smoothing_window: usize,
    /// Frames required before smoothing kicks in
    pub min_smoothing_samples: usize,
    /// Stress scores retained in history
    pub history_len: usize,
    /// Score at or above which stress is high
    pub high_threshold: f64,
    /// Score at or above which stress is medium; breathing stops below it
    pub medium_threshold: f64,
    /// Score at or above which the breathing guide starts
    pub breathing_trigger: f64,
    /// Minimum score jump counted as a spike
    pub spike_delta: f64,
    #[serde(with = "duration_serde")]
    pub spike_cooldown: Duration,
    #[serde(with = "duration_serde")]
    pub report_interval: Duration,
    #[serde(with = "duration_serde")]
    pub inhale: Duration,
    #[serde(with = "duration_serde")]
    pub hold: Duration,
    #[serde(with = "duration_serde")]
    pub exhale: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            smoothing_window: SMOOTHING_WINDOW,
            min_smoothing_samples: MIN_SMOOTHING_SAMPLES,
            history_len: STRESS_HISTORY_LEN,
            high_threshold: HIGH_STRESS_THRESHOLD,
            medium_threshold: MEDIUM_STRESS_THRESHOLD,
            breathing_trigger: BREATHING_TRIGGER_SCORE,
            spike_delta: SPIKE_DELTA,
            spike_cooldown: Duration::from_secs(SPIKE_COOLDOWN_SECS as u64),
            report_interval: Duration::from_secs(REPORT_INTERVAL_SECS as u64),
            inhale: Duration::from_secs(INHALE_SECS as u64),
            hold: Duration::from_secs(HOLD_SECS as u64),
            exhale: Duration::from_secs(EXHALE_SECS as u64),
        }
    }
}

impl EngineConfig {
    pub fn spike_cooldown(&self) -> chrono::Duration {
        to_chrono(self.spike_cooldown)
    }

    pub fn report_interval(&self) -> chrono::Duration {
        to_chrono(self.report_interval)
    }

    pub fn phase_durations(&self) -> PhaseDurations {
        PhaseDurations {
            inhale: to_chrono(self.inhale),
            hold: to_chrono(self.hold),
            exhale: to_chrono(self.exhale),
        }
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration)
        .unwrap_or_else(|_| chrono::Duration::milliseconds(i64::MAX))
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration, as fractional seconds.
mod duration_serde {
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_engine_config() {
        let engine = EngineConfig::default();
        assert_eq!(engine.smoothing_window, 10);
        assert_eq!(engine.min_smoothing_samples, 3);
        assert_eq!(engine.history_len, 100);
        assert_eq!(engine.high_threshold, 60.0);
        assert_eq!(engine.medium_threshold, 40.0);
        assert_eq!(engine.breathing_trigger, 70.0);
        assert_eq!(engine.spike_cooldown(), chrono::Duration::seconds(30));
        assert_eq!(engine.report_interval(), chrono::Duration::seconds(1800));
        assert_eq!(engine.phase_durations(), PhaseDurations::default());
    }

    #[test]
    fn test_config_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("synheart-stress-config-{}", uuid::Uuid::new_v4()))
            .join("config.json");

        let mut config = Config::default();
        config.server_port = 8123;
        config.engine.breathing_trigger = 75.0;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.server_port, 8123);
        assert_eq!(loaded.engine, config.engine);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_partial_engine_section_uses_defaults() {
        let json = r#"{
            "engine": {"high_threshold": 55.0, "report_interval": 600},
            "export_path": "/tmp/reports",
            "data_path": "/tmp/data",
            "server_port": 9000
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.engine.high_threshold, 55.0);
        assert_eq!(config.engine.report_interval, Duration::from_secs(600));
        assert_eq!(config.engine.smoothing_window, SMOOTHING_WINDOW);
    }

    #[test]
    fn test_sub_second_durations_survive_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("synheart-stress-config-{}", uuid::Uuid::new_v4()))
            .join("config.json");

        let mut config = Config::default();
        config.engine.hold = Duration::from_millis(1_500);
        config.engine.spike_cooldown = Duration::from_millis(250);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.engine.hold, Duration::from_millis(1_500));
        assert_eq!(loaded.engine.spike_cooldown(), chrono::Duration::milliseconds(250));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_negative_duration_rejected() {
        let json = r#"{
            "engine": {"hold": -2},
            "export_path": "/tmp/r",
            "data_path": "/tmp/d",
            "server_port": 1
        }"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load_from(std::path::Path::new("/no/such/config.json")).unwrap();
        assert_eq!(config.server_port, 8000);
    }
}
