//! Frame collection module for the Synheart Stress Agent.
//!
//! The emotion classifier runs outside this crate. This module defines the
//! per-frame input it produces and a replay collector that streams recorded
//! classifier output into the engine.

pub mod replay;
pub mod types;

// Re-export commonly used types
pub use replay::{parse_line, CollectorConfig, CollectorError, ReplayCollector};
pub use types::{Emotion, EmotionVector, FrameEvent};

/// The collector the CLI drives
pub type Collector = ReplayCollector;
