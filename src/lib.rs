//! Synheart Stress Agent - real-time stress analytics from facial emotion scores.
//!
//! An external classifier turns each video frame into emotion percentages.
//! This library turns that stream into a live stress score, spike and
//! high-stress tracking, time-per-emotion accounting and a paced-breathing
//! prompt.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Synheart Stress Agent                        │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌──────────┐   ┌─────────────┐                 │
//! │  │ Collector  │──▶│ Smoother │──▶│ Stress score│──▶ Analytics    │
//! │  │  (frames)  │   │ (10 fr.) │   │ angry+fear  │    (spikes,     │
//! │  └────────────┘   └──────────┘   │   +sad      │     high stress)│
//! │         │               │        └─────────────┘──▶ Breathing    │
//! │         ▼               ▼                             guide      │
//! │  ┌────────────┐   ┌──────────┐                                   │
//! │  │Transparency│   │ Duration │                                   │
//! │  │    Log     │   │  Ledger  │                                   │
//! │  └────────────┘   └──────────┘                                   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use synheart_stress_agent::{Emotion, EmotionVector, FrameEvent, StressEngine};
//!
//! let mut engine = StressEngine::new(Utc::now());
//!
//! let scores = EmotionVector::from_pairs([(Emotion::Angry, 55.0), (Emotion::Fear, 20.0)]);
//! engine.process(&FrameEvent::detected(scores));
//! engine.process(&FrameEvent::no_face());
//!
//! assert_eq!(engine.stress_score(), 75.0);
//! assert!(engine.breathing().is_active());
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod transparency;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use collector::{
    Collector, CollectorConfig, CollectorError, Emotion, EmotionVector, FrameEvent,
};
pub use config::{Config, EngineConfig};
pub use core::{
    BreathingGuide, BreathingPhase, ProcessOutcome, ReportBuilder, SessionReport,
    SharedStressEngine, StressBand, StressEngine, StressSnapshot,
};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Wellness disclaimer that can be displayed to users.
pub const WELLNESS_DISCLAIMER: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║            SYNHEART STRESS AGENT - WELLNESS DISCLAIMER           ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  The stress score is an estimate derived from facial emotion     ║
║  scores. It is a self-awareness aid, not a medical device.       ║
║                                                                  ║
║  ✓ WHAT IT DOES:                                                 ║
║    • Sums angry, fear and sad scores into a stress estimate      ║
║    • Notes sudden increases and sustained high stress            ║
║    • Suggests a 4-2-6 breathing rhythm when stress runs high     ║
║                                                                  ║
║  ✗ WHAT IT DOES NOT DO:                                          ║
║    • Diagnose anxiety, depression or any other condition         ║
║    • Store video frames or images                                ║
║    • Send data anywhere unless you run the status server         ║
║                                                                  ║
║  If you are in crisis, contact local emergency services.         ║
║                                                                  ║
║  You can view processing statistics anytime with:                ║
║    synheart-stress status                                        ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disclaimer_contents() {
        assert!(WELLNESS_DISCLAIMER.contains("DISCLAIMER"));
        assert!(WELLNESS_DISCLAIMER.contains("not a medical device"));
        assert!(WELLNESS_DISCLAIMER.contains("Store video frames"));
    }
}
