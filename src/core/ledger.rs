//! Time spent in each dominant emotion.

use crate::collector::types::{Emotion, EmotionVector};
use crate::core::analytics::duration_secs;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the emotion report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionShare {
    /// Seconds this emotion was dominant
    pub duration_secs: f64,
    /// Share of all recorded time (0-100)
    pub percentage: f64,
    /// Whole minutes and seconds, e.g. "3m 7s"
    pub time_str: String,
}

/// Accumulates how long each emotion was the dominant one.
///
/// Time between two updates is credited to the emotion that was dominant at
/// the start of the gap, so the sum over all emotions equals the time
/// elapsed since the first update. Gaps are kept as exact durations and only
/// converted to seconds when read.
#[derive(Debug, Clone, Default)]
pub struct DurationLedger {
    durations: BTreeMap<Emotion, Duration>,
    last_update: Option<DateTime<Utc>>,
    dominant: Option<Emotion>,
}

impl DurationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a smoothed vector observed at `now`.
    pub fn update(&mut self, smoothed: &EmotionVector, now: DateTime<Utc>) {
        if let (Some(last), Some(previous)) = (self.last_update, self.dominant) {
            let elapsed = (now - last).max(Duration::zero());
            let total = self.durations.entry(previous).or_insert_with(Duration::zero);
            *total = *total + elapsed;
        }

        self.last_update = Some(now);
        self.dominant = Some(smoothed.dominant());
    }

    /// The dominant emotion of the latest update.
    pub fn dominant(&self) -> Option<Emotion> {
        self.dominant
    }

    /// Accumulated seconds for one emotion.
    pub fn duration_secs(&self, emotion: Emotion) -> f64 {
        self.durations.get(&emotion).copied().map_or(0.0, duration_secs)
    }

    /// Sum of all accumulated durations.
    pub fn total_secs(&self) -> f64 {
        duration_secs(self.total())
    }

    fn total(&self) -> Duration {
        self.durations
            .values()
            .fold(Duration::zero(), |sum, &duration| sum + duration)
    }

    /// Per-emotion durations and shares, in category order.
    ///
    /// Empty until some time has been credited.
    pub fn report(&self) -> BTreeMap<Emotion, EmotionShare> {
        let total = self.total_secs();
        if total <= 0.0 {
            return BTreeMap::new();
        }

        self.durations
            .iter()
            .map(|(&emotion, &duration)| {
                let secs = duration_secs(duration);
                let whole = duration.num_seconds().max(0);
                (
                    emotion,
                    EmotionShare {
                        duration_secs: secs,
                        percentage: secs / total * 100.0,
                        time_str: format!("{}m {}s", whole / 60, whole % 60),
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-22T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn only(emotion: Emotion) -> EmotionVector {
        EmotionVector::from_pairs([(emotion, 90.0)])
    }

    #[test]
    fn test_first_update_only_seeds() {
        let mut ledger = DurationLedger::new();
        ledger.update(&only(Emotion::Happy), base());

        assert_eq!(ledger.dominant(), Some(Emotion::Happy));
        assert_eq!(ledger.total_secs(), 0.0);
        assert!(ledger.report().is_empty());
    }

    #[test]
    fn test_time_credited_to_previous_dominant() {
        let mut ledger = DurationLedger::new();
        ledger.update(&only(Emotion::Happy), base());
        ledger.update(&only(Emotion::Sad), base() + Duration::seconds(10));
        ledger.update(&only(Emotion::Sad), base() + Duration::seconds(15));

        assert_eq!(ledger.duration_secs(Emotion::Happy), 10.0);
        assert_eq!(ledger.duration_secs(Emotion::Sad), 5.0);
    }

    #[test]
    fn test_durations_sum_to_elapsed_time() {
        let mut ledger = DurationLedger::new();
        let sequence = [
            (Emotion::Neutral, 0),
            (Emotion::Angry, 1_500),
            (Emotion::Neutral, 2_250),
            (Emotion::Fear, 9_000),
            (Emotion::Happy, 61_125),
        ];
        for (emotion, offset_ms) in sequence {
            ledger.update(&only(emotion), base() + Duration::milliseconds(offset_ms));
        }

        assert!((ledger.total_secs() - 61.125).abs() < 1e-9);
    }

    #[test]
    fn test_sub_millisecond_gaps_are_not_truncated() {
        let mut ledger = DurationLedger::new();
        let emotions = [Emotion::Neutral, Emotion::Sad];

        // 30 fps: 301 frames, 300 gaps of 33_333_333ns each
        for k in 0..=300i64 {
            let now = base() + Duration::nanoseconds(k * 33_333_333);
            ledger.update(&only(emotions[(k as usize / 30) % 2]), now);
        }

        assert!((ledger.total_secs() - 9.9999999).abs() < 1e-9);
        let report = ledger.report();
        let summed: f64 = report.values().map(|share| share.duration_secs).sum();
        assert!((summed - 9.9999999).abs() < 1e-9);
    }

    #[test]
    fn test_report_percentages_and_format() {
        let mut ledger = DurationLedger::new();
        ledger.update(&only(Emotion::Neutral), base());
        ledger.update(&only(Emotion::Angry), base() + Duration::seconds(90));
        ledger.update(&only(Emotion::Angry), base() + Duration::seconds(120));

        let report = ledger.report();
        assert_eq!(report.len(), 2);

        let neutral = &report[&Emotion::Neutral];
        assert_eq!(neutral.duration_secs, 90.0);
        assert!((neutral.percentage - 75.0).abs() < 1e-9);
        assert_eq!(neutral.time_str, "1m 30s");

        let angry = &report[&Emotion::Angry];
        assert!((angry.percentage - 25.0).abs() < 1e-9);
        assert_eq!(angry.time_str, "0m 30s");
    }

    #[test]
    fn test_report_is_idempotent() {
        let mut ledger = DurationLedger::new();
        ledger.update(&only(Emotion::Surprise), base());
        ledger.update(&only(Emotion::Disgust), base() + Duration::seconds(3));

        assert_eq!(ledger.report(), ledger.report());
    }

    #[test]
    fn test_clock_going_backwards_credits_nothing() {
        let mut ledger = DurationLedger::new();
        ledger.update(&only(Emotion::Happy), base());
        ledger.update(&only(Emotion::Happy), base() - Duration::seconds(5));

        assert_eq!(ledger.total_secs(), 0.0);
    }
}
