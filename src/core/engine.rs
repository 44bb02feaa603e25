//! Per-session stress engine.
//!
//! The engine turns each classified frame into a stress score and keeps the
//! derived analytics current. Updates run in a fixed order:
//!
//! 1. smooth the raw vector
//! 2. credit the duration ledger with the smoothed vector
//! 3. score the smoothed vector, keeping the previous score
//! 4. append the score to history
//! 5. spike detection against the previous score
//! 6. open/close the high-stress interval
//! 7. advance the breathing guide, then apply the start/stop policy
//!
//! Frames without a detected face change nothing.

use crate::collector::types::{Emotion, EmotionVector, FrameEvent};
use crate::config::EngineConfig;
use crate::core::analytics::StressAnalytics;
use crate::core::breathing::{BreathingGuide, BreathingPhase, BreathingState};
use crate::core::ledger::{DurationLedger, EmotionShare};
use crate::core::smoother::Smoother;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, VecDeque};
use uuid::Uuid;

/// Score at or above which stress is considered high.
pub const HIGH_STRESS_THRESHOLD: f64 = 60.0;

/// Score at or above which stress is considered medium.
pub const MEDIUM_STRESS_THRESHOLD: f64 = 40.0;

/// Score at or above which a breathing exercise is prompted.
pub const BREATHING_TRIGGER_SCORE: f64 = 70.0;

/// Number of recent scores kept in history.
pub const STRESS_HISTORY_LEN: usize = 100;

/// Coarse stress level for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressBand {
    Low,
    Medium,
    High,
}

impl StressBand {
    pub fn from_score(score: f64, medium_threshold: f64, high_threshold: f64) -> Self {
        if score >= high_threshold {
            StressBand::High
        } else if score >= medium_threshold {
            StressBand::Medium
        } else {
            StressBand::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StressBand::Low => "low",
            StressBand::Medium => "medium",
            StressBand::High => "high",
        }
    }
}

impl std::fmt::Display for StressBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the breathing policy did on a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreathingTransition {
    Unchanged,
    Started,
    Stopped,
}

/// Result of processing one frame that carried emotions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameUpdate {
    pub score: f64,
    pub previous_score: f64,
    pub spike_recorded: bool,
    pub high_stress_started: bool,
    pub breathing: BreathingTransition,
    /// Phase the guide advanced into on this frame, if any
    pub phase_entered: Option<BreathingPhase>,
}

/// Result of [`StressEngine::process`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ProcessOutcome {
    /// No face in the frame; engine state untouched
    Skipped,
    Updated(FrameUpdate),
}

impl ProcessOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, ProcessOutcome::Skipped)
    }
}

/// Aggregate view of the score history.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HistorySummary {
    pub len: usize,
    pub mean: f64,
    pub peak: f64,
}

/// Consistent read of everything a renderer or status endpoint shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressSnapshot {
    pub session_id: Uuid,
    pub observed_at: DateTime<Utc>,
    pub stress_score: f64,
    pub band: StressBand,
    pub smoothed: Option<EmotionVector>,
    pub dominant_emotion: Option<Emotion>,
    pub breathing: BreathingState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breathing_instruction: Option<String>,
    pub high_stress_secs: f64,
    pub spike_count: usize,
    pub frames_processed: u64,
    pub history: HistorySummary,
    pub report_due: bool,
}

/// Stress analytics for a single session.
#[derive(Debug, Clone)]
pub struct StressEngine {
    config: EngineConfig,
    session_id: Uuid,
    started_at: DateTime<Utc>,
    smoother: Smoother,
    ledger: DurationLedger,
    analytics: StressAnalytics,
    breathing: BreathingGuide,
    history: VecDeque<f64>,
    stress_score: f64,
    smoothed: Option<EmotionVector>,
    frames_processed: u64,
}

impl StressEngine {
    /// Create an engine with default parameters.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self::with_config(EngineConfig::default(), started_at)
    }

    /// Create an engine with explicit parameters.
    pub fn with_config(config: EngineConfig, started_at: DateTime<Utc>) -> Self {
        Self {
            smoother: Smoother::new(config.smoothing_window, config.min_smoothing_samples),
            ledger: DurationLedger::new(),
            analytics: StressAnalytics::with_params(
                started_at,
                config.spike_delta,
                config.spike_cooldown(),
                config.report_interval(),
            ),
            breathing: BreathingGuide::new(config.phase_durations()),
            history: VecDeque::with_capacity(config.history_len),
            session_id: Uuid::new_v4(),
            started_at,
            stress_score: 0.0,
            smoothed: None,
            frames_processed: 0,
            config,
        }
    }

    /// Process a classified frame, using its capture time as the clock.
    pub fn process(&mut self, frame: &FrameEvent) -> ProcessOutcome {
        self.process_at(frame.emotions.as_ref(), frame.timestamp)
    }

    /// Process classifier output observed at `now`.
    pub fn process_at(
        &mut self,
        emotions: Option<&EmotionVector>,
        now: DateTime<Utc>,
    ) -> ProcessOutcome {
        let Some(raw) = emotions else {
            tracing::trace!("No face detected, frame skipped");
            return ProcessOutcome::Skipped;
        };

        let smoothed = self.smoother.update(*raw);
        self.ledger.update(&smoothed, now);

        let previous_score = self.stress_score;
        self.stress_score = smoothed.stress_sum();
        self.smoothed = Some(smoothed);

        if self.history.len() >= self.config.history_len {
            self.history.pop_front();
        }
        if self.config.history_len > 0 {
            self.history.push_back(self.stress_score);
        }

        let spike_recorded = self
            .analytics
            .detect_spike(self.stress_score, previous_score, now);
        if spike_recorded {
            tracing::debug!(
                score = self.stress_score,
                previous = previous_score,
                "Stress spike recorded"
            );
        }

        let is_high = self.stress_score >= self.config.high_threshold;
        let high_stress_started = self.analytics.update_high_stress(is_high, now);
        if high_stress_started {
            tracing::debug!(score = self.stress_score, "High stress interval opened");
        }

        let phase_entered = self.breathing.tick(now);
        let breathing = self.apply_breathing_policy(now);

        self.frames_processed += 1;

        ProcessOutcome::Updated(FrameUpdate {
            score: self.stress_score,
            previous_score,
            spike_recorded,
            high_stress_started,
            breathing,
            phase_entered,
        })
    }

    /// Start above the trigger, stop below the medium threshold, otherwise leave alone.
    fn apply_breathing_policy(&mut self, now: DateTime<Utc>) -> BreathingTransition {
        let active = self.breathing.is_active();

        if self.stress_score >= self.config.breathing_trigger && !active {
            self.breathing.start(now);
            tracing::info!(score = self.stress_score, "Breathing exercise started");
            BreathingTransition::Started
        } else if self.stress_score < self.config.medium_threshold && active {
            self.breathing.stop();
            tracing::info!(score = self.stress_score, "Breathing exercise stopped");
            BreathingTransition::Stopped
        } else {
            BreathingTransition::Unchanged
        }
    }

    pub fn stress_score(&self) -> f64 {
        self.stress_score
    }

    pub fn band(&self) -> StressBand {
        StressBand::from_score(
            self.stress_score,
            self.config.medium_threshold,
            self.config.high_threshold,
        )
    }

    /// Latest smoothed vector, `None` before the first detected face.
    pub fn smoothed(&self) -> Option<&EmotionVector> {
        self.smoothed.as_ref()
    }

    pub fn dominant_emotion(&self) -> Option<Emotion> {
        self.ledger.dominant()
    }

    pub fn breathing(&self) -> &BreathingGuide {
        &self.breathing
    }

    /// Time spent in each dominant emotion.
    pub fn emotion_report(&self) -> BTreeMap<Emotion, EmotionShare> {
        self.ledger.report()
    }

    pub fn ledger(&self) -> &DurationLedger {
        &self.ledger
    }

    pub fn high_stress_duration(&self, now: DateTime<Utc>) -> f64 {
        self.analytics.current_high_stress_duration(now)
    }

    /// Whether a periodic report is due. Stays due until [`mark_reported`](Self::mark_reported).
    pub fn should_report(&self, now: DateTime<Utc>) -> bool {
        self.analytics.should_report(now)
    }

    pub fn mark_reported(&mut self, now: DateTime<Utc>) {
        self.analytics.mark_reported(now);
    }

    pub fn spikes(&self) -> &[DateTime<Utc>] {
        self.analytics.spikes()
    }

    /// Recent scores, oldest first.
    pub fn history(&self) -> &VecDeque<f64> {
        &self.history
    }

    pub fn history_summary(&self) -> HistorySummary {
        if self.history.is_empty() {
            return HistorySummary::default();
        }
        HistorySummary {
            len: self.history.len(),
            mean: self.history.iter().mean(),
            peak: Statistics::max(self.history.iter()),
        }
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Capture the current state for display.
    pub fn snapshot(&self, now: DateTime<Utc>) -> StressSnapshot {
        StressSnapshot {
            session_id: self.session_id,
            observed_at: now,
            stress_score: self.stress_score,
            band: self.band(),
            smoothed: self.smoothed,
            dominant_emotion: self.dominant_emotion(),
            breathing: self.breathing.state(),
            breathing_instruction: self.breathing.instruction().map(str::to_string),
            high_stress_secs: self.high_stress_duration(now),
            spike_count: self.analytics.spike_count(),
            frames_processed: self.frames_processed,
            history: self.history_summary(),
            report_due: self.should_report(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at_ms(ms: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-22T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::milliseconds(ms)
    }

    /// Engine without smoothing, so each frame's score is exactly its stress sum.
    fn unsmoothed_engine() -> StressEngine {
        let config = EngineConfig {
            smoothing_window: 1,
            min_smoothing_samples: 1,
            ..EngineConfig::default()
        };
        StressEngine::with_config(config, at_ms(0))
    }

    fn stressed(score: f64) -> EmotionVector {
        EmotionVector::from_pairs([
            (Emotion::Angry, score / 2.0),
            (Emotion::Fear, score / 4.0),
            (Emotion::Sad, score / 4.0),
            (Emotion::Neutral, 100.0 - score),
        ])
    }

    #[test]
    fn test_score_is_sum_of_stress_categories() {
        let mut engine = unsmoothed_engine();
        let vector = EmotionVector::from_pairs([
            (Emotion::Angry, 20.0),
            (Emotion::Fear, 10.0),
            (Emotion::Sad, 5.0),
            (Emotion::Happy, 65.0),
        ]);

        engine.process_at(Some(&vector), at_ms(0));
        assert_eq!(engine.stress_score(), 35.0);
        assert_eq!(engine.band(), StressBand::Low);
    }

    #[test]
    fn test_no_detection_is_a_no_op() {
        let mut engine = unsmoothed_engine();
        engine.process_at(Some(&stressed(80.0)), at_ms(0));
        let before = engine.snapshot(at_ms(1_000));

        let outcome = engine.process_at(None, at_ms(500));
        assert!(outcome.is_skipped());
        assert_eq!(engine.snapshot(at_ms(1_000)), before);
    }

    #[test]
    fn test_band_thresholds() {
        assert_eq!(StressBand::from_score(39.9, 40.0, 60.0), StressBand::Low);
        assert_eq!(StressBand::from_score(40.0, 40.0, 60.0), StressBand::Medium);
        assert_eq!(StressBand::from_score(60.0, 40.0, 60.0), StressBand::High);
    }

    #[test]
    fn test_history_is_bounded() {
        let config = EngineConfig {
            history_len: 3,
            ..EngineConfig::default()
        };
        let mut engine = StressEngine::with_config(config, at_ms(0));
        for i in 0..5 {
            engine.process_at(Some(&stressed(10.0 * i as f64)), at_ms(i * 100));
        }

        assert_eq!(engine.history().len(), 3);
        let summary = engine.history_summary();
        assert_eq!(summary.len, 3);
        assert!(summary.peak >= summary.mean);
    }

    #[test]
    fn test_spike_uses_previous_score() {
        let mut engine = unsmoothed_engine();
        engine.process_at(Some(&stressed(10.0)), at_ms(0));

        match engine.process_at(Some(&stressed(40.0)), at_ms(1_000)) {
            ProcessOutcome::Updated(update) => {
                assert_eq!(update.previous_score, 10.0);
                assert_eq!(update.score, 40.0);
                assert!(update.spike_recorded);
            }
            ProcessOutcome::Skipped => panic!("frame should have been processed"),
        }
        assert_eq!(engine.spikes(), &[at_ms(1_000)]);
    }

    #[test]
    fn test_breathing_hysteresis() {
        let mut engine = unsmoothed_engine();
        let mut starts = 0;
        let mut stops = 0;

        let scores = [75.0, 80.0, 72.0, 65.0, 50.0, 41.0, 35.0, 30.0];
        for (i, score) in scores.into_iter().enumerate() {
            if let ProcessOutcome::Updated(update) =
                engine.process_at(Some(&stressed(score)), at_ms(i as i64 * 100))
            {
                match update.breathing {
                    BreathingTransition::Started => starts += 1,
                    BreathingTransition::Stopped => stops += 1,
                    BreathingTransition::Unchanged => {}
                }
            }
            let expected_active = score >= 40.0;
            assert_eq!(engine.breathing().is_active(), expected_active, "score {score}");
        }

        assert_eq!(starts, 1);
        assert_eq!(stops, 1);
    }

    #[test]
    fn test_breathing_advances_on_frames() {
        let mut engine = unsmoothed_engine();
        engine.process_at(Some(&stressed(80.0)), at_ms(0));
        assert_eq!(engine.breathing().phase(), Some(BreathingPhase::Inhale));

        match engine.process_at(Some(&stressed(80.0)), at_ms(4_000)) {
            ProcessOutcome::Updated(update) => {
                assert_eq!(update.phase_entered, Some(BreathingPhase::Hold));
                assert_eq!(update.breathing, BreathingTransition::Unchanged);
            }
            ProcessOutcome::Skipped => panic!("frame should have been processed"),
        }
    }

    #[test]
    fn test_snapshot_before_any_frame() {
        let engine = StressEngine::new(at_ms(0));
        let snapshot = engine.snapshot(at_ms(0));

        assert_eq!(snapshot.stress_score, 0.0);
        assert_eq!(snapshot.band, StressBand::Low);
        assert!(snapshot.smoothed.is_none());
        assert_eq!(snapshot.breathing, BreathingState::Inactive);
        assert_eq!(snapshot.history, HistorySummary::default());
        assert!(!snapshot.report_due);
    }

    #[test]
    fn test_independent_sessions() {
        let mut first = unsmoothed_engine();
        let second = unsmoothed_engine();
        first.process_at(Some(&stressed(90.0)), at_ms(0));

        assert_ne!(first.session_id(), second.session_id());
        assert_eq!(second.stress_score(), 0.0);
        assert!(!second.breathing().is_active());
    }
}
