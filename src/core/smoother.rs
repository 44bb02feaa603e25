//! Moving-average smoothing of per-frame emotion vectors.
//!
//! Classifier output is noisy frame to frame. The smoother keeps the last
//! few vectors and reports their per-category mean once enough history
//! exists to make the average meaningful.

use crate::collector::types::{Emotion, EmotionVector};
use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Number of recent frames averaged.
pub const SMOOTHING_WINDOW: usize = 10;

/// Below this many samples the latest raw vector is passed through.
pub const MIN_SMOOTHING_SAMPLES: usize = 3;

/// Bounded FIFO of recent emotion vectors.
#[derive(Debug, Clone)]
pub struct Smoother {
    window: VecDeque<EmotionVector>,
    capacity: usize,
    min_samples: usize,
}

impl Smoother {
    /// Create a smoother averaging up to `capacity` frames.
    pub fn new(capacity: usize, min_samples: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            min_samples,
        }
    }

    /// Add a raw vector and return the smoothed one.
    pub fn update(&mut self, raw: EmotionVector) -> EmotionVector {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(raw);

        if self.window.len() < self.min_samples {
            return raw;
        }

        EmotionVector::from_pairs(Emotion::ALL.into_iter().map(|emotion| {
            let mean = self.window.iter().map(|v| v.get(emotion)).mean();
            (emotion, mean)
        }))
    }

    /// Number of vectors currently held.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new(SMOOTHING_WINDOW, MIN_SMOOTHING_SAMPLES)
    }
}
