//! Frame-level input types for the Synheart Stress Agent.
//!
//! A frame carries the emotion scores an upstream classifier produced for a
//! single video frame, or nothing when no face was found.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Emotion categories reported by the classifier.
///
/// Declaration order is the fixed iteration order used everywhere: ties for
/// the dominant emotion go to the category listed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Fear,
    Sad,
    Happy,
    Neutral,
    Surprise,
    Disgust,
}

impl Emotion {
    /// All categories in their fixed order.
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Fear,
        Emotion::Sad,
        Emotion::Happy,
        Emotion::Neutral,
        Emotion::Surprise,
        Emotion::Disgust,
    ];

    /// Categories summed into the stress score.
    pub const STRESS: [Emotion; 3] = [Emotion::Angry, Emotion::Fear, Emotion::Sad];

    /// Lowercase label as emitted by the classifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Fear => "fear",
            Emotion::Sad => "sad",
            Emotion::Happy => "happy",
            Emotion::Neutral => "neutral",
            Emotion::Surprise => "surprise",
            Emotion::Disgust => "disgust",
        }
    }

    /// Parse a classifier label (case-insensitive). Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        Self::ALL.into_iter().find(|e| e.as_str() == label)
    }

    /// Whether this category contributes to the stress score.
    pub fn is_stress(&self) -> bool {
        Self::STRESS.contains(self)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-frame emotion percentages (0-100 each, not required to sum to 100).
///
/// Categories that were absent from the classifier output read as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<Emotion, f64>")]
pub struct EmotionVector {
    values: [f64; 7],
}

impl EmotionVector {
    /// Build a vector from `(category, percentage)` pairs. Later pairs win.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Emotion, f64)>,
    {
        let mut vector = Self::default();
        for (emotion, value) in pairs {
            vector.set(emotion, value);
        }
        vector
    }

    /// Get the percentage for a category.
    pub fn get(&self, emotion: Emotion) -> f64 {
        self.values[emotion.index()]
    }

    /// Set the percentage for a category. Negative or non-finite values are stored as 0.
    pub fn set(&mut self, emotion: Emotion, value: f64) {
        self.values[emotion.index()] = if value.is_finite() { value.max(0.0) } else { 0.0 };
    }

    /// Iterate `(category, percentage)` in the fixed category order.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        Emotion::ALL.into_iter().map(move |e| (e, self.get(e)))
    }

    /// Sum of the stress categories.
    pub fn stress_sum(&self) -> f64 {
        Emotion::STRESS.iter().map(|&e| self.get(e)).sum()
    }

    /// The highest-scoring category; ties go to the first in `Emotion::ALL`.
    pub fn dominant(&self) -> Emotion {
        let mut best = Emotion::ALL[0];
        for (emotion, value) in self.iter().skip(1) {
            if value > self.get(best) {
                best = emotion;
            }
        }
        best
    }
}

impl From<BTreeMap<String, f64>> for EmotionVector {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self::from_pairs(
            map.into_iter()
                .filter_map(|(label, value)| Emotion::from_label(&label).map(|e| (e, value))),
        )
    }
}

impl From<EmotionVector> for BTreeMap<Emotion, f64> {
    fn from(vector: EmotionVector) -> Self {
        vector.iter().collect()
    }
}

/// A single classified video frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameEvent {
    /// When the frame was captured
    pub timestamp: DateTime<Utc>,
    /// Classifier output, or `None` when no face was detected
    pub emotions: Option<EmotionVector>,
}

impl FrameEvent {
    /// A frame with detected emotions, stamped now.
    pub fn detected(emotions: EmotionVector) -> Self {
        Self::at(Utc::now(), Some(emotions))
    }

    /// A frame where the classifier found no face, stamped now.
    pub fn no_face() -> Self {
        Self::at(Utc::now(), None)
    }

    /// A frame with an explicit capture time.
    pub fn at(timestamp: DateTime<Utc>, emotions: Option<EmotionVector>) -> Self {
        Self {
            timestamp,
            emotions,
        }
    }

    pub fn has_detection(&self) -> bool {
        self.emotions.is_some()
    }
}
