//! Session report builder.
//!
//! A report is a self-contained JSON document summarising one session: time
//! per dominant emotion, recorded spikes and the score history. Reports are
//! produced on demand and whenever the engine signals one is due.

use crate::collector::types::Emotion;
use crate::core::analytics::elapsed_secs;
use crate::core::engine::{HistorySummary, StressBand, StressEngine};
use crate::core::ledger::EmotionShare;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The current report format version.
pub const REPORT_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "synheart-stress-agent";

/// Producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Summary of one stress session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub device_id: String,
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub session_duration_secs: f64,
    pub frames_processed: u64,
    pub stress_score: f64,
    pub band: StressBand,
    /// Time per dominant emotion, in category order
    pub emotions: BTreeMap<Emotion, EmotionShare>,
    pub spikes: Vec<DateTime<Utc>>,
    pub high_stress_secs: f64,
    pub history: HistorySummary,
}

/// Report export errors.
#[derive(Debug)]
pub enum ReportError {
    IoError(String),
    SerializeError(String),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::IoError(e) => write!(f, "IO error: {e}"),
            ReportError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ReportError {}

/// Builds session reports for one agent instance.
pub struct ReportBuilder {
    instance_id: Uuid,
    device_id: String,
}

impl ReportBuilder {
    /// Create a builder with a fresh instance ID and a hostname-derived device ID.
    pub fn new() -> Self {
        let instance_id = Uuid::new_v4();
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            device_id: format!("{}-{}", hostname, &instance_id.to_string()[..8]),
            instance_id,
        }
    }

    /// Override the device ID.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = device_id.into();
        self
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Summarise the engine's session as of `now`.
    pub fn build(&self, engine: &StressEngine, now: DateTime<Utc>) -> SessionReport {
        SessionReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                instance_id: self.instance_id.to_string(),
            },
            device_id: self.device_id.clone(),
            session_id: engine.session_id(),
            started_at: engine.started_at(),
            generated_at: now,
            session_duration_secs: elapsed_secs(engine.started_at(), now),
            frames_processed: engine.frames_processed(),
            stress_score: engine.stress_score(),
            band: engine.band(),
            emotions: engine.emotion_report(),
            spikes: engine.spikes().to_vec(),
            high_stress_secs: engine.high_stress_duration(now),
            history: engine.history_summary(),
        }
    }

    /// Build and serialize a report to JSON.
    pub fn build_json(&self, engine: &StressEngine, now: DateTime<Utc>) -> String {
        let report = self.build(engine, now);
        serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionReport {
    /// Default file name, e.g. `stress_session_20240122_100000.json`.
    pub fn file_name(&self) -> String {
        format!(
            "stress_session_{}.json",
            self.generated_at.format("%Y%m%d_%H%M%S")
        )
    }

    /// Write the report into `dir`, returning the file path.
    pub fn export_to_dir(&self, dir: &Path) -> Result<PathBuf, ReportError> {
        let path = dir.join(self.file_name());
        self.write_to(&path)?;
        Ok(path)
    }

    /// Write the report to a specific file.
    pub fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ReportError::IoError(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ReportError::SerializeError(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| ReportError::IoError(e.to_string()))
    }

    /// Human-readable summary for terminal output.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Session {}", self.session_id),
            format!(
                "  Duration: {:.0}s over {} frames",
                self.session_duration_secs, self.frames_processed
            ),
            format!("  Stress: {:.1} ({})", self.stress_score, self.band),
            format!(
                "  History: mean {:.1}, peak {:.1}",
                self.history.mean, self.history.peak
            ),
            format!("  Spikes: {}", self.spikes.len()),
        ];

        if self.emotions.is_empty() {
            lines.push("  Emotions: no time recorded".to_string());
        } else {
            lines.push("  Emotions:".to_string());
            for (emotion, share) in &self.emotions {
                lines.push(format!(
                    "    {:<9} {:>5.1}%  {}",
                    emotion.as_str(),
                    share.percentage,
                    share.time_str
                ));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::EmotionVector;
    use chrono::Duration;

    fn base() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-22T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn engine_with_frames() -> StressEngine {
        let mut engine = StressEngine::new(base());
        let calm = EmotionVector::from_pairs([(Emotion::Neutral, 90.0), (Emotion::Sad, 5.0)]);
        let upset = EmotionVector::from_pairs([(Emotion::Angry, 70.0), (Emotion::Fear, 20.0)]);

        for i in 0..20 {
            let vector = if i < 10 { calm } else { upset };
            engine.process_at(Some(&vector), base() + Duration::seconds(i));
        }
        engine
    }

    #[test]
    fn test_builder_ids() {
        let first = ReportBuilder::new();
        let second = ReportBuilder::new();
        assert_ne!(first.instance_id(), second.instance_id());
        assert!(!first.device_id().is_empty());

        let custom = ReportBuilder::new().with_device_id("kiosk-1");
        assert_eq!(custom.device_id(), "kiosk-1");
    }

    #[test]
    fn test_report_contents() {
        let engine = engine_with_frames();
        let now = base() + Duration::seconds(20);
        let report = ReportBuilder::new().build(&engine, now);

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.session_id, engine.session_id());
        assert_eq!(report.frames_processed, 20);
        assert_eq!(report.session_duration_secs, 20.0);

        let total: f64 = report.emotions.values().map(|s| s.duration_secs).sum();
        assert!((total - 19.0).abs() < 1e-9);
        assert!(report.emotions.contains_key(&Emotion::Neutral));
        assert!(report.emotions.contains_key(&Emotion::Angry));
    }

    #[test]
    fn test_report_json_and_export() {
        let engine = engine_with_frames();
        let builder = ReportBuilder::new();
        let now = base() + Duration::seconds(20);

        let json = builder.build_json(&engine, now);
        assert!(json.contains("report_version"));
        assert!(json.contains("\"neutral\""));

        let dir = std::env::temp_dir().join(format!("synheart-stress-report-{}", Uuid::new_v4()));
        let report = builder.build(&engine, now);
        let path = report.export_to_dir(&dir).unwrap();
        assert!(path.ends_with("stress_session_20240122_100020.json"));

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: SessionReport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.session_id, report.session_id);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_summary_lists_emotions() {
        let engine = engine_with_frames();
        let report = ReportBuilder::new().build(&engine, base() + Duration::seconds(20));
        let summary = report.summary();

        assert!(summary.contains("Spikes"));
        assert!(summary.contains("neutral"));

        let empty = ReportBuilder::new().build(&StressEngine::new(base()), base());
        assert!(empty.summary().contains("no time recorded"));
    }
}
