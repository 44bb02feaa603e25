//! Thread-safe handle to a stress engine.
//!
//! One frame loop writes while renderers and status endpoints read. Every
//! call takes the lock once, so a reader sees either all of a frame's effects
//! or none of them.

use crate::collector::types::{Emotion, FrameEvent};
use crate::core::engine::{ProcessOutcome, StressEngine, StressSnapshot};
use crate::core::ledger::EmotionShare;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable, lock-protected stress engine.
#[derive(Debug, Clone)]
pub struct SharedStressEngine {
    inner: Arc<Mutex<StressEngine>>,
}

impl SharedStressEngine {
    pub fn new(engine: StressEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    // A panic elsewhere cannot leave the engine half-updated in a way later
    // frames would not overwrite, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, StressEngine> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn process(&self, frame: &FrameEvent) -> ProcessOutcome {
        self.lock().process(frame)
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> StressSnapshot {
        self.lock().snapshot(now)
    }

    pub fn stress_score(&self) -> f64 {
        self.lock().stress_score()
    }

    pub fn emotion_report(&self) -> BTreeMap<Emotion, EmotionShare> {
        self.lock().emotion_report()
    }

    pub fn should_report(&self, now: DateTime<Utc>) -> bool {
        self.lock().should_report(now)
    }

    pub fn mark_reported(&self, now: DateTime<Utc>) {
        self.lock().mark_reported(now);
    }

    /// Run a read-only closure under the lock.
    pub fn with<R>(&self, f: impl FnOnce(&StressEngine) -> R) -> R {
        f(&*self.lock())
    }

    /// Run a mutating closure under the lock.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut StressEngine) -> R) -> R {
        f(&mut *self.lock())
    }
}

impl From<StressEngine> for SharedStressEngine {
    fn from(engine: StressEngine) -> Self {
        Self::new(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::EmotionVector;
    use chrono::Duration;
    use std::thread;

    #[test]
    fn test_readers_see_whole_frames() {
        let start = Utc::now();
        let shared = SharedStressEngine::new(StressEngine::new(start));

        let writer = {
            let shared = shared.clone();
            thread::spawn(move || {
                for i in 0..500i64 {
                    let vector = EmotionVector::from_pairs([
                        (Emotion::Angry, (i % 100) as f64),
                        (Emotion::Neutral, 100.0 - (i % 100) as f64),
                    ]);
                    let now = start + Duration::milliseconds(i * 33);
                    let frame = FrameEvent::at(now, Some(vector));
                    shared.process(&frame);
                }
            })
        };

        let reader = {
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    shared.with(|engine| {
                        // Score and smoothed vector must come from the same frame
                        let expected = engine.smoothed().map(|v| v.stress_sum()).unwrap_or(0.0);
                        assert_eq!(engine.stress_score(), expected);
                        let retained = engine.frames_processed().min(100);
                        assert_eq!(engine.history().len() as u64, retained);
                    });
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();

        assert_eq!(shared.with(|engine| engine.frames_processed()), 500);
    }

    #[test]
    fn test_mark_reported_through_handle() {
        let start = Utc::now();
        let shared = SharedStressEngine::from(StressEngine::new(start));
        let later = start + Duration::seconds(1800);

        assert!(shared.should_report(later));
        shared.mark_reported(later);
        assert!(!shared.should_report(later));
    }
}
