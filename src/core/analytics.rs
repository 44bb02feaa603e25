//! Stress spikes, sustained high-stress intervals and report gating.

use chrono::{DateTime, Duration, Utc};

/// Minimum frame-to-frame score increase that counts as a spike.
pub const SPIKE_DELTA: f64 = 25.0;

/// Spikes closer than this to the previously recorded one are dropped.
pub const SPIKE_COOLDOWN_SECS: i64 = 30;

/// How often a periodic session report falls due.
pub const REPORT_INTERVAL_SECS: i64 = 1800;

/// Exact length of `duration` in seconds, or 0 if it is negative.
pub fn duration_secs(duration: Duration) -> f64 {
    duration.to_std().map(|d| d.as_secs_f64()).unwrap_or(0.0)
}

/// Exact seconds from `since` to `now`, or 0 if the clock went backwards.
pub fn elapsed_secs(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    duration_secs(now - since)
}

/// Tracks spikes, the open high-stress interval and the report clock.
#[derive(Debug, Clone)]
pub struct StressAnalytics {
    spikes: Vec<DateTime<Utc>>,
    high_stress_start: Option<DateTime<Utc>>,
    last_report: DateTime<Utc>,
    spike_delta: f64,
    spike_cooldown: Duration,
    report_interval: Duration,
}

impl StressAnalytics {
    /// Create analytics for a session starting at `started_at`.
    ///
    /// The report clock starts with the session.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self::with_params(
            started_at,
            SPIKE_DELTA,
            Duration::seconds(SPIKE_COOLDOWN_SECS),
            Duration::seconds(REPORT_INTERVAL_SECS),
        )
    }

    pub fn with_params(
        started_at: DateTime<Utc>,
        spike_delta: f64,
        spike_cooldown: Duration,
        report_interval: Duration,
    ) -> Self {
        Self {
            spikes: Vec::new(),
            high_stress_start: None,
            last_report: started_at,
            spike_delta,
            spike_cooldown,
            report_interval,
        }
    }

    /// Record a spike if the score jumped by at least the spike delta and
    /// the cooldown since the last recorded spike has passed.
    ///
    /// Returns whether a spike was recorded.
    pub fn detect_spike(&mut self, current: f64, previous: f64, now: DateTime<Utc>) -> bool {
        if current - previous < self.spike_delta {
            return false;
        }

        let cooled_down = self
            .spikes
            .last()
            .map_or(true, |&last| now - last > self.spike_cooldown);

        if cooled_down {
            self.spikes.push(now);
        }
        cooled_down
    }

    /// Open an interval on the first high frame, close it on any low frame.
    ///
    /// Returns true when this call opened a new interval.
    pub fn update_high_stress(&mut self, is_high: bool, now: DateTime<Utc>) -> bool {
        if !is_high {
            self.high_stress_start = None;
            return false;
        }

        if self.high_stress_start.is_none() {
            self.high_stress_start = Some(now);
            return true;
        }
        false
    }

    /// Seconds since the open high-stress interval began, or 0.
    pub fn current_high_stress_duration(&self, now: DateTime<Utc>) -> f64 {
        self.high_stress_start
            .map(|start| elapsed_secs(start, now))
            .unwrap_or(0.0)
    }

    /// Start of the open high-stress interval, if any.
    pub fn high_stress_since(&self) -> Option<DateTime<Utc>> {
        self.high_stress_start
    }

    /// Whether a periodic report is due.
    ///
    /// This is a level, not an edge: it stays true on every call until the
    /// caller consumes the report and calls [`mark_reported`](Self::mark_reported).
    pub fn should_report(&self, now: DateTime<Utc>) -> bool {
        now - self.last_report >= self.report_interval
    }

    /// Restart the report clock at `now`.
    pub fn mark_reported(&mut self, now: DateTime<Utc>) {
        self.last_report = now;
    }

    pub fn last_report(&self) -> DateTime<Utc> {
        self.last_report
    }

    /// Recorded spike times, oldest first.
    pub fn spikes(&self) -> &[DateTime<Utc>] {
        &self.spikes
    }

    pub fn spike_count(&self) -> usize {
        self.spikes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-22T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::seconds(secs)
    }

    #[test]
    fn test_spike_threshold_and_cooldown() {
        let mut analytics = StressAnalytics::new(at(0));

        // Scores 10, 36, 40 at t = 0, 1, 2
        assert!(!analytics.detect_spike(10.0, 0.0, at(0)));
        assert!(analytics.detect_spike(36.0, 10.0, at(1)));
        assert!(!analytics.detect_spike(40.0, 36.0, at(2)));
        assert_eq!(analytics.spikes(), &[at(1)]);

        // Qualifying jump inside the cooldown is dropped
        assert!(!analytics.detect_spike(70.0, 40.0, at(5)));

        // Exactly 30s later is still inside the cooldown
        assert!(!analytics.detect_spike(70.0, 40.0, at(31)));

        assert!(analytics.detect_spike(70.0, 40.0, at(40)));
        assert_eq!(analytics.spike_count(), 2);
    }

    #[test]
    fn test_spike_delta_is_inclusive() {
        let mut analytics = StressAnalytics::new(at(0));
        assert!(!analytics.detect_spike(34.9, 10.0, at(0)));
        assert!(analytics.detect_spike(35.0, 10.0, at(0)));
    }

    #[test]
    fn test_high_stress_interval_has_no_hysteresis() {
        let mut analytics = StressAnalytics::new(at(0));
        let threshold = 60.0;

        assert!(analytics.update_high_stress(70.0 >= threshold, at(0)));
        assert!(!analytics.update_high_stress(65.0 >= threshold, at(5)));
        assert_eq!(analytics.current_high_stress_duration(at(5)), 5.0);

        analytics.update_high_stress(58.0 >= threshold, at(6));
        assert_eq!(analytics.current_high_stress_duration(at(6)), 0.0);
        assert!(analytics.high_stress_since().is_none());

        assert!(analytics.update_high_stress(62.0 >= threshold, at(7)));
        assert_eq!(analytics.high_stress_since(), Some(at(7)));
        assert_eq!(analytics.current_high_stress_duration(at(10)), 3.0);
    }

    #[test]
    fn test_high_stress_duration_keeps_sub_millisecond_precision() {
        let mut analytics = StressAnalytics::new(at(0));
        analytics.update_high_stress(true, at(0));

        let now = at(2) + Duration::nanoseconds(750_500);
        assert!((analytics.current_high_stress_duration(now) - 2.0007505).abs() < 1e-12);
    }

    #[test]
    fn test_elapsed_secs_clamps_negative() {
        assert_eq!(elapsed_secs(at(5), at(0)), 0.0);
        assert_eq!(elapsed_secs(at(0), at(0) + Duration::microseconds(1)), 0.000001);
    }

    #[test]
    fn test_should_report_stays_due_until_marked() {
        let mut analytics = StressAnalytics::new(at(0));

        assert!(!analytics.should_report(at(1799)));
        assert!(analytics.should_report(at(1800)));
        assert!(analytics.should_report(at(1900)));

        analytics.mark_reported(at(1900));
        assert!(!analytics.should_report(at(1901)));
        assert!(analytics.should_report(at(3700)));
    }
}
