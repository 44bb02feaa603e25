//! Transparency log of what the agent has processed.
//!
//! Only counters are kept. No emotion scores, frames or images are stored.

use crate::core::engine::{BreathingTransition, ProcessOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Processing statistics for the current session.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Frames whose emotions were analysed
    frames_analyzed: AtomicU64,
    /// Frames where no face was detected
    frames_without_face: AtomicU64,
    /// Replay lines that could not be parsed
    malformed_frames: AtomicU64,
    /// Stress spikes recorded
    spikes_recorded: AtomicU64,
    /// Breathing exercises prompted
    breathing_prompts: AtomicU64,
    /// Session reports written
    reports_exported: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    /// Create a new transparency log.
    pub fn new() -> Self {
        Self {
            frames_analyzed: AtomicU64::new(0),
            frames_without_face: AtomicU64::new(0),
            malformed_frames: AtomicU64::new(0),
            spikes_recorded: AtomicU64::new(0),
            breathing_prompts: AtomicU64::new(0),
            reports_exported: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a transparency log with persistence.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        // Try to load existing stats
        if let Err(e) = log.load() {
            tracing::warn!("Could not load previous transparency stats: {}", e);
        }

        log
    }

    /// Count the effects of one processed frame.
    pub fn record_outcome(&self, outcome: &ProcessOutcome) {
        match outcome {
            ProcessOutcome::Skipped => {
                self.frames_without_face.fetch_add(1, Ordering::Relaxed);
            }
            ProcessOutcome::Updated(update) => {
                self.frames_analyzed.fetch_add(1, Ordering::Relaxed);
                if update.spike_recorded {
                    self.spikes_recorded.fetch_add(1, Ordering::Relaxed);
                }
                if update.breathing == BreathingTransition::Started {
                    self.breathing_prompts.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// Record replay lines that were skipped.
    pub fn record_malformed_frames(&self, count: u64) {
        self.malformed_frames.fetch_add(count, Ordering::Relaxed);
    }

    /// Record an exported report.
    pub fn record_report_exported(&self) {
        self.reports_exported.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            frames_analyzed: self.frames_analyzed.load(Ordering::Relaxed),
            frames_without_face: self.frames_without_face.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            spikes_recorded: self.spikes_recorded.load(Ordering::Relaxed),
            breathing_prompts: self.breathing_prompts.load(Ordering::Relaxed),
            reports_exported: self.reports_exported.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Frames analysed: {}\n\
             - Frames without a face: {}\n\
             - Malformed frames skipped: {}\n\
             - Stress spikes recorded: {}\n\
             - Breathing exercises prompted: {}\n\
             - Reports exported: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Privacy Guarantee:\n\
             - No video frames or images stored\n\
             - Emotion scores kept in memory for the session only\n\
             - Only aggregate counters persisted",
            stats.frames_analyzed,
            stats.frames_without_face,
            stats.malformed_frames,
            stats.spikes_recorded,
            stats.breathing_prompts,
            stats.reports_exported,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                frames_analyzed: stats.frames_analyzed,
                frames_without_face: stats.frames_without_face,
                malformed_frames: stats.malformed_frames,
                spikes_recorded: stats.spikes_recorded,
                breathing_prompts: stats.breathing_prompts,
                reports_exported: stats.reports_exported,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.frames_analyzed
                    .store(persisted.frames_analyzed, Ordering::Relaxed);
                self.frames_without_face
                    .store(persisted.frames_without_face, Ordering::Relaxed);
                self.malformed_frames
                    .store(persisted.malformed_frames, Ordering::Relaxed);
                self.spikes_recorded
                    .store(persisted.spikes_recorded, Ordering::Relaxed);
                self.breathing_prompts
                    .store(persisted.breathing_prompts, Ordering::Relaxed);
                self.reports_exported
                    .store(persisted.reports_exported, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.frames_analyzed.store(0, Ordering::Relaxed);
        self.frames_without_face.store(0, Ordering::Relaxed);
        self.malformed_frames.store(0, Ordering::Relaxed);
        self.spikes_recorded.store(0, Ordering::Relaxed);
        self.breathing_prompts.store(0, Ordering::Relaxed);
        self.reports_exported.store(0, Ordering::Relaxed);
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub frames_analyzed: u64,
    pub frames_without_face: u64,
    pub malformed_frames: u64,
    pub spikes_recorded: u64,
    pub breathing_prompts: u64,
    pub reports_exported: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    frames_analyzed: u64,
    frames_without_face: u64,
    #[serde(default)]
    malformed_frames: u64,
    spikes_recorded: u64,
    breathing_prompts: u64,
    reports_exported: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

/// Create a new shared transparency log.
pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

/// Create a new shared transparency log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::FrameUpdate;

    fn updated(spike: bool, breathing: BreathingTransition) -> ProcessOutcome {
        ProcessOutcome::Updated(FrameUpdate {
            score: 50.0,
            previous_score: 20.0,
            spike_recorded: spike,
            high_stress_started: false,
            breathing,
            phase_entered: None,
        })
    }

    #[test]
    fn test_outcome_counting() {
        let log = TransparencyLog::new();

        log.record_outcome(&ProcessOutcome::Skipped);
        log.record_outcome(&updated(true, BreathingTransition::Started));
        log.record_outcome(&updated(false, BreathingTransition::Stopped));

        let stats = log.stats();
        assert_eq!(stats.frames_analyzed, 2);
        assert_eq!(stats.frames_without_face, 1);
        assert_eq!(stats.spikes_recorded, 1);
        assert_eq!(stats.breathing_prompts, 1);
    }

    #[test]
    fn test_transparency_log_reset() {
        let log = TransparencyLog::new();

        log.record_malformed_frames(4);
        log.record_report_exported();
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.malformed_frames, 0);
        assert_eq!(stats.reports_exported, 0);
    }

    #[test]
    fn test_persistence_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "synheart-stress-transparency-{}.json",
            uuid::Uuid::new_v4()
        ));

        let log = TransparencyLog::with_persistence(path.clone());
        log.record_outcome(&ProcessOutcome::Skipped);
        log.record_report_exported();
        log.save().unwrap();

        let reloaded = TransparencyLog::with_persistence(path.clone());
        let stats = reloaded.stats();
        assert_eq!(stats.frames_without_face, 1);
        assert_eq!(stats.reports_exported, 1);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_summary_format() {
        let log = TransparencyLog::new();
        let summary = log.summary();

        assert!(summary.contains("Frames analysed"));
        assert!(summary.contains("Frames without a face"));
        assert!(summary.contains("Privacy Guarantee"));
        assert!(summary.contains("No video frames"));
    }
}
