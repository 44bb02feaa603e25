//! Paced-breathing prompt state machine.
//!
//! ```text
//!            start()
//! Inactive ──────────▶ Inhale ──4s──▶ Hold ──2s──▶ Exhale ─┐
//!    ▲                   ▲                                  │
//!    │ stop()            └───────────────6s─────────────────┘
//!    └──────────── any active phase
//! ```
//!
//! Phases advance only when [`BreathingGuide::tick`] is called; the next
//! phase starts at the tick that observed the expiry.

use crate::core::analytics::duration_secs;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const INHALE_SECS: i64 = 4;
pub const HOLD_SECS: i64 = 2;
pub const EXHALE_SECS: i64 = 6;

/// A phase of the breathing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreathingPhase {
    Inhale,
    Hold,
    Exhale,
}

impl BreathingPhase {
    fn next(self) -> Self {
        match self {
            BreathingPhase::Inhale => BreathingPhase::Hold,
            BreathingPhase::Hold => BreathingPhase::Exhale,
            BreathingPhase::Exhale => BreathingPhase::Inhale,
        }
    }

    /// On-screen prompt for this phase.
    pub fn instruction(&self) -> &'static str {
        match self {
            BreathingPhase::Inhale => "Breathe in slowly",
            BreathingPhase::Hold => "Hold your breath",
            BreathingPhase::Exhale => "Breathe out gently",
        }
    }
}

/// Fixed duration of each phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDurations {
    pub inhale: Duration,
    pub hold: Duration,
    pub exhale: Duration,
}

impl PhaseDurations {
    pub fn of(&self, phase: BreathingPhase) -> Duration {
        match phase {
            BreathingPhase::Inhale => self.inhale,
            BreathingPhase::Hold => self.hold,
            BreathingPhase::Exhale => self.exhale,
        }
    }

    /// Length of one full inhale-hold-exhale cycle.
    pub fn cycle(&self) -> Duration {
        self.inhale + self.hold + self.exhale
    }
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            inhale: Duration::seconds(INHALE_SECS),
            hold: Duration::seconds(HOLD_SECS),
            exhale: Duration::seconds(EXHALE_SECS),
        }
    }
}

/// Whether a breathing exercise is running, and where in the cycle it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BreathingState {
    Inactive,
    Active {
        phase: BreathingPhase,
        phase_start: DateTime<Utc>,
    },
}

/// Guides the user through a fixed inhale/hold/exhale rhythm.
#[derive(Debug, Clone)]
pub struct BreathingGuide {
    state: BreathingState,
    durations: PhaseDurations,
}

impl BreathingGuide {
    pub fn new(durations: PhaseDurations) -> Self {
        Self {
            state: BreathingState::Inactive,
            durations,
        }
    }

    /// Begin a cycle at inhale. Restarts the cycle if already active.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.state = BreathingState::Active {
            phase: BreathingPhase::Inhale,
            phase_start: now,
        };
    }

    pub fn stop(&mut self) {
        self.state = BreathingState::Inactive;
    }

    /// Advance to the next phase once the current one has run its course.
    ///
    /// Returns the phase entered, if any.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<BreathingPhase> {
        let BreathingState::Active { phase, phase_start } = self.state else {
            return None;
        };

        if now - phase_start < self.durations.of(phase) {
            return None;
        }

        let next = phase.next();
        self.state = BreathingState::Active {
            phase: next,
            phase_start: now,
        };
        Some(next)
    }

    pub fn state(&self) -> BreathingState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, BreathingState::Active { .. })
    }

    /// Current phase, or `None` while inactive.
    pub fn phase(&self) -> Option<BreathingPhase> {
        match self.state {
            BreathingState::Active { phase, .. } => Some(phase),
            BreathingState::Inactive => None,
        }
    }

    /// Prompt text for the current phase.
    pub fn instruction(&self) -> Option<&'static str> {
        self.phase().map(|phase| phase.instruction())
    }

    /// Seconds left in the current phase (0 while inactive or overdue).
    pub fn phase_remaining(&self, now: DateTime<Utc>) -> f64 {
        match self.state {
            BreathingState::Active { phase, phase_start } => {
                duration_secs(self.durations.of(phase) - (now - phase_start))
            }
            BreathingState::Inactive => 0.0,
        }
    }

    pub fn durations(&self) -> &PhaseDurations {
        &self.durations
    }
}

impl Default for BreathingGuide {
    fn default() -> Self {
        Self::new(PhaseDurations::default())
    }
}
