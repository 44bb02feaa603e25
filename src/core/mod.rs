//! Core functionality for the Synheart Stress Agent.
//!
//! This module contains:
//! - Smoothing of per-frame emotion vectors
//! - Dominant-emotion duration accounting
//! - Spike, high-stress and report-timing analytics
//! - The breathing-exercise state machine
//! - The per-session engine tying them together, and its shared handle
//! - Session report building for export

pub mod analytics;
pub mod breathing;
pub mod engine;
pub mod ledger;
pub mod report;
pub mod shared;
pub mod smoother;

// Re-export commonly used types
pub use analytics::StressAnalytics;
pub use breathing::{BreathingGuide, BreathingPhase, BreathingState, PhaseDurations};
pub use engine::{
    BreathingTransition, FrameUpdate, HistorySummary, ProcessOutcome, StressBand, StressEngine,
    StressSnapshot,
};
pub use ledger::{DurationLedger, EmotionShare};
pub use report::{ReportBuilder, ReportError, SessionReport, PRODUCER_NAME, REPORT_VERSION};
pub use shared::SharedStressEngine;
pub use smoother::Smoother;
