//! JSON Lines replay of classifier output.
//!
//! Each line is one frame as produced by the emotion classifier:
//!
//! ```text
//! {"timestamp": "2024-01-22T10:00:01Z", "emotion": {"angry": 3.1, "neutral": 80.2, ...}}
//! {"timestamp": "2024-01-22T10:00:01.2Z", "emotion": null}
//! ```
//!
//! `timestamp` is optional (arrival time is used when missing) and a null or
//! missing `emotion` marks a frame without a detected face.

use crate::collector::types::{EmotionVector, FrameEvent};
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Longest pause honoured between frames when replaying in real time.
const MAX_REALTIME_GAP: Duration = Duration::from_secs(5);

/// Configuration for a replay collector.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// JSON Lines file to replay
    pub path: PathBuf,
    /// Sleep between frames according to their timestamps
    pub realtime: bool,
}

impl CollectorConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            realtime: false,
        }
    }
}

/// Errors that can occur during frame collection.
#[derive(Debug)]
pub enum CollectorError {
    AlreadyRunning,
    Io(String),
    Parse { line: usize, message: String },
}

impl std::fmt::Display for CollectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorError::AlreadyRunning => write!(f, "Collector is already running"),
            CollectorError::Io(e) => write!(f, "IO error: {e}"),
            CollectorError::Parse { line, message } => {
                write!(f, "Malformed frame on line {line}: {message}")
            }
        }
    }
}

impl std::error::Error for CollectorError {}

#[derive(Debug, Deserialize)]
struct FrameRecord {
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    emotion: Option<EmotionVector>,
}

/// Parse one replay line into a frame.
///
/// Blank lines are not frames and yield `Ok(None)`.
pub fn parse_line(line: &str, line_number: usize) -> Result<Option<FrameEvent>, CollectorError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let record: FrameRecord =
        serde_json::from_str(trimmed).map_err(|e| CollectorError::Parse {
            line: line_number,
            message: e.to_string(),
        })?;

    Ok(Some(FrameEvent::at(
        record.timestamp.unwrap_or_else(Utc::now),
        record.emotion,
    )))
}

/// Streams frames from a JSON Lines file over a bounded channel.
pub struct ReplayCollector {
    config: CollectorConfig,
    sender: Sender<FrameEvent>,
    receiver: Receiver<FrameEvent>,
    running: Arc<AtomicBool>,
    malformed: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl ReplayCollector {
    /// Create a new replay collector.
    pub fn new(config: CollectorConfig) -> Self {
        let (sender, receiver) = bounded(10_000);
        Self {
            config,
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            malformed: Arc::new(AtomicU64::new(0)),
            worker: None,
        }
    }

    /// Open the file and start streaming frames on a background thread.
    ///
    /// `is_running` turns false once the file is exhausted or `stop` is called.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }

        let file = std::fs::File::open(&self.config.path)
            .map_err(|e| CollectorError::Io(format!("{:?}: {e}", self.config.path)))?;

        self.running.store(true, Ordering::SeqCst);

        let sender = self.sender.clone();
        let running = self.running.clone();
        let malformed = self.malformed.clone();
        let realtime = self.config.realtime;

        self.worker = Some(thread::spawn(move || {
            let reader = BufReader::new(file);
            let mut last_timestamp: Option<DateTime<Utc>> = None;

            for (index, line) in reader.lines().enumerate() {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!("Stopping replay, read failed: {}", e);
                        break;
                    }
                };

                let frame = match parse_line(&line, index + 1) {
                    Ok(Some(frame)) => frame,
                    Ok(None) => continue,
                    Err(e) => {
                        malformed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!("{}", e);
                        continue;
                    }
                };

                if realtime {
                    if let Some(prev) = last_timestamp {
                        if let Ok(gap) = (frame.timestamp - prev).to_std() {
                            thread::sleep(gap.min(MAX_REALTIME_GAP));
                        }
                    }
                    last_timestamp = Some(frame.timestamp);
                }

                if sender.send(frame).is_err() {
                    break;
                }
            }

            running.store(false, Ordering::SeqCst);
        }));

        Ok(())
    }

    /// Stop streaming frames.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the collector is still streaming.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the receiver for frames.
    ///
    /// The collector keeps its own sender alive, so callers should stop
    /// draining once `is_running` is false and the channel is empty.
    pub fn receiver(&self) -> &Receiver<FrameEvent> {
        &self.receiver
    }

    /// Try to receive a frame without blocking.
    pub fn try_recv(&self) -> Option<FrameEvent> {
        self.receiver.try_recv().ok()
    }

    /// Number of lines skipped because they could not be parsed.
    pub fn malformed_lines(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    /// Wait for the replay thread to finish.
    pub fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for ReplayCollector {
    fn drop(&mut self) {
        self.stop();
    }
}
