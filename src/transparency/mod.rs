//! Transparency module for the Synheart Stress Agent.
//!
//! This module tracks and exposes what the agent has processed, so users
//! can see that only aggregate counters outlive a session.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, SharedTransparencyLog, TransparencyLog,
    TransparencyStats,
};
