//! Demonstration of the Synheart Stress Agent engine.
//!
//! This example shows how to:
//! 1. Create an engine on a simulated clock
//! 2. Feed it a calm, stressed, calm session one frame per second
//! 3. Follow spikes, high-stress intervals and the breathing guide
//! 4. Read the time-per-emotion report
//! 5. Build a session report
//!
//! Run with: cargo run --example replay_demo

use chrono::{Duration, TimeZone, Utc};

use synheart_stress_agent::{
    core::{BreathingTransition, ProcessOutcome, ReportBuilder},
    transparency::TransparencyLog,
    Emotion, EmotionVector, FrameEvent, StressEngine, WELLNESS_DISCLAIMER,
};

/// Emotion percentages for the demo script at second `t`.
fn scripted_frame(t: i64) -> Option<EmotionVector> {
    match t {
        // Calm start
        0..=19 => Some(EmotionVector::from_pairs([
            (Emotion::Neutral, 70.0),
            (Emotion::Happy, 20.0),
            (Emotion::Sad, 10.0),
        ])),
        // Looked away from the camera
        20..=22 => None,
        // Sudden stress
        23..=59 => Some(EmotionVector::from_pairs([
            (Emotion::Angry, 50.0),
            (Emotion::Fear, 25.0),
            (Emotion::Neutral, 25.0),
        ])),
        // Recovery
        _ => Some(EmotionVector::from_pairs([
            (Emotion::Neutral, 60.0),
            (Emotion::Happy, 35.0),
            (Emotion::Sad, 5.0),
        ])),
    }
}

fn main() {
    println!("Synheart Stress Agent - Replay Demo");
    println!("===================================");
    println!();

    println!("{WELLNESS_DISCLAIMER}");
    println!();

    let start = Utc.with_ymd_and_hms(2024, 1, 22, 10, 0, 0).unwrap();
    let mut engine = StressEngine::new(start);
    let transparency_log = TransparencyLog::new();
    let report_builder = ReportBuilder::new();

    println!("Session ID: {}", engine.session_id());
    println!("Device ID: {}", report_builder.device_id());
    println!();
    println!("Replaying 90 seconds of classifier output...");
    println!();

    for t in 0..90 {
        let now = start + Duration::seconds(t);
        let frame = FrameEvent::at(now, scripted_frame(t));

        let outcome = engine.process(&frame);
        transparency_log.record_outcome(&outcome);

        let ProcessOutcome::Updated(update) = outcome else {
            println!("  [{t:>2}s] no face, frame skipped");
            continue;
        };

        if update.spike_recorded {
            println!(
                "  [{t:>2}s] Spike: {:.1} -> {:.1}",
                update.previous_score, update.score
            );
        }
        if update.high_stress_started {
            println!("  [{t:>2}s] High stress interval opened");
        }
        match update.breathing {
            BreathingTransition::Started => println!("  [{t:>2}s] Breathing exercise started"),
            BreathingTransition::Stopped => println!("  [{t:>2}s] Breathing exercise stopped"),
            BreathingTransition::Unchanged => {
                if let Some(phase) = update.phase_entered {
                    println!("  [{t:>2}s]   {}", phase.instruction());
                }
            }
        }

        if t % 15 == 0 {
            println!(
                "  [{t:>2}s] Stress {:.1} ({}), dominant {}",
                engine.stress_score(),
                engine.band(),
                engine
                    .dominant_emotion()
                    .map(|e| e.as_str())
                    .unwrap_or("-")
            );
        }
    }

    let end = start + Duration::seconds(90);

    println!();
    println!("=== Time Per Emotion ===");
    for (emotion, share) in engine.emotion_report() {
        if share.duration_secs > 0.0 {
            println!(
                "  {:<8} {:>8}  {:>5.1}%",
                emotion.as_str(),
                share.time_str,
                share.percentage
            );
        }
    }
    println!();

    let history = engine.history_summary();
    println!("=== Stress History ===");
    println!("  Samples: {}", history.len);
    println!("  Mean: {:.1}", history.mean);
    println!("  Peak: {:.1}", history.peak);
    println!();

    let report = report_builder.build(&engine, end);
    println!("{}", report.summary());
    println!();

    // Show snippet of report JSON
    let json = serde_json::to_string_pretty(&report).unwrap();
    println!("Session Report (truncated):");
    for line in json.lines().take(20) {
        println!("  {line}");
    }
    println!("  ...");
    println!();

    println!("{}", transparency_log.summary());
}
