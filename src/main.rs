//! Synheart Stress Agent CLI
//!
//! Real-time stress analytics from facial emotion scores.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use synheart_stress_agent::{
    collector::{Collector, CollectorConfig, FrameEvent},
    config::Config,
    core::{
        BreathingTransition, FrameUpdate, ProcessOutcome, ReportBuilder, SessionReport,
        StressEngine,
    },
    transparency::{create_shared_log_with_persistence, SharedTransparencyLog},
    VERSION, WELLNESS_DISCLAIMER,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "synheart-stress")]
#[command(author = "Synheart")]
#[command(version = VERSION)]
#[command(about = "Real-time stress analytics from facial emotion scores", long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded classifier output (JSON Lines) through the engine
    Replay {
        /// File with one frame per line
        file: PathBuf,

        /// Where to write the final session report
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Pace frames according to their timestamps
        #[arg(long)]
        realtime: bool,
    },

    /// Serve live stress state over HTTP (requires server feature)
    Serve {
        /// Port to listen on (defaults to the configured port)
        #[arg(long)]
        port: Option<u16>,

        /// Feed frames from a JSON Lines file in real time while serving
        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// Show processing statistics
    Status,

    /// Display the wellness disclaimer
    Disclaimer,

    /// Show configuration
    Config,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Replay {
            file,
            output,
            realtime,
        } => {
            cmd_replay(file, output, realtime);
        }
        Commands::Serve { port, replay } => {
            cmd_serve(port, replay);
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Disclaimer => {
            cmd_disclaimer();
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config() -> Config {
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    });
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }
    config
}

fn cmd_replay(file: PathBuf, output: Option<PathBuf>, realtime: bool) {
    println!("Synheart Stress Agent v{VERSION}");
    println!();

    let config = load_config();
    let transparency =
        create_shared_log_with_persistence(config.data_path.join("transparency.json"));

    let mut collector = Collector::new(CollectorConfig {
        path: file.clone(),
        realtime,
    });
    if let Err(e) = collector.start() {
        eprintln!("Error starting replay: {e}");
        std::process::exit(1);
    }

    println!("Replaying {file:?}");
    println!("  Real-time pacing: {}", if realtime { "on" } else { "off" });
    println!(
        "  Report interval: {}s",
        config.engine.report_interval.as_secs()
    );
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    let reports = ReportBuilder::new();
    let mut engine: Option<StressEngine> = None;
    let mut last_timestamp: Option<DateTime<Utc>> = None;
    let receiver = collector.receiver().clone();

    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(frame) => {
                // The replayed timestamps are the session clock.
                let engine = engine.get_or_insert_with(|| {
                    StressEngine::with_config(config.engine.clone(), frame.timestamp)
                });
                let outcome = engine.process(&frame);
                transparency.record_outcome(&outcome);
                last_timestamp = Some(frame.timestamp);

                if let ProcessOutcome::Updated(update) = &outcome {
                    print_update(&frame, update);
                }

                if engine.should_report(frame.timestamp) {
                    let report = reports.build(engine, frame.timestamp);
                    println!();
                    println!("{}", report.summary());
                    println!();
                    export_report(&report, &config.export_path, &transparency);
                    engine.mark_reported(frame.timestamp);
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                if !collector.is_running() && receiver.is_empty() {
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                eprintln!("Collector disconnected unexpectedly");
                break;
            }
        }
    }

    collector.stop();
    transparency.record_malformed_frames(collector.malformed_lines());

    match (engine, last_timestamp) {
        (Some(engine), Some(now)) => {
            let report = reports.build(&engine, now);
            println!();
            println!("{}", report.summary());
            println!();

            match output {
                Some(path) => match report.write_to(&path) {
                    Ok(()) => {
                        transparency.record_report_exported();
                        println!("Exported session report to {path:?}");
                    }
                    Err(e) => eprintln!("Error writing report: {e}"),
                },
                None => export_report(&report, &config.export_path, &transparency),
            }
        }
        _ => println!("No frames were replayed."),
    }

    if let Err(e) = transparency.save() {
        eprintln!("Warning: Could not save transparency log: {e}");
    }

    println!();
    println!("{}", transparency.summary());
}

/// Print the notable events of a processed frame.
fn print_update(frame: &FrameEvent, update: &FrameUpdate) {
    let time = frame.timestamp.format("%H:%M:%S");

    if update.spike_recorded {
        println!(
            "[{time}] Stress spike: {:.1} (+{:.1})",
            update.score,
            update.score - update.previous_score
        );
    }
    if update.high_stress_started {
        println!("[{time}] High stress: {:.1}", update.score);
    }
    match update.breathing {
        BreathingTransition::Started => {
            println!("[{time}] Breathing exercise started (stress {:.1})", update.score)
        }
        BreathingTransition::Stopped => {
            println!("[{time}] Breathing exercise stopped (stress {:.1})", update.score)
        }
        BreathingTransition::Unchanged => {
            if let Some(phase) = update.phase_entered {
                println!("[{time}]   {}", phase.instruction());
            }
        }
    }
}

fn export_report(report: &SessionReport, dir: &Path, transparency: &SharedTransparencyLog) {
    match report.export_to_dir(dir) {
        Ok(path) => {
            transparency.record_report_exported();
            println!("Exported session report to {path:?}");
        }
        Err(e) => eprintln!("Error writing report: {e}"),
    }
}

#[cfg(feature = "server")]
fn cmd_serve(port: Option<u16>, replay: Option<PathBuf>) {
    use synheart_stress_agent::server::{run, ServerConfig, ServerState};
    use synheart_stress_agent::SharedStressEngine;

    println!("Synheart Stress Agent v{VERSION}");
    println!();

    let config = load_config();
    let transparency =
        create_shared_log_with_persistence(config.data_path.join("transparency.json"));
    let engine = SharedStressEngine::new(StressEngine::with_config(
        config.engine.clone(),
        Utc::now(),
    ));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error starting runtime: {e}");
            std::process::exit(1);
        }
    };

    let state = ServerState::new(engine.clone(), transparency.clone());
    let port = port.unwrap_or(config.server_port);
    let (addr, shutdown_tx) = match runtime.block_on(run(ServerConfig::new(port), state)) {
        Ok(bound) => bound,
        Err(e) => {
            eprintln!("Error starting server: {e}");
            std::process::exit(1);
        }
    };

    println!("Listening on http://{addr}");
    println!("  GET  /stress      current score, band and breathing prompt");
    println!("  GET  /report      session report");
    println!("  POST /frame       ingest a classified frame");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    let mut collector = replay.map(|path| {
        let mut collector = Collector::new(CollectorConfig {
            path,
            realtime: true,
        });
        if let Err(e) = collector.start() {
            eprintln!("Error starting replay: {e}");
            std::process::exit(1);
        }
        collector
    });

    while running.load(Ordering::SeqCst) {
        match collector.as_ref() {
            Some(collector) => {
                if let Ok(frame) = collector.receiver().recv_timeout(Duration::from_millis(100)) {
                    // Live replay: restamp with the server clock so reads and writes agree.
                    let frame = FrameEvent::at(Utc::now(), frame.emotions);
                    let outcome = engine.process(&frame);
                    transparency.record_outcome(&outcome);
                }
            }
            None => std::thread::sleep(Duration::from_millis(100)),
        }
    }

    if let Some(collector) = collector.as_mut() {
        collector.stop();
        transparency.record_malformed_frames(collector.malformed_lines());
    }
    let _ = shutdown_tx.send(());

    let report = engine.with(|engine| ReportBuilder::new().build(engine, Utc::now()));
    println!();
    println!("{}", report.summary());
    export_report(&report, &config.export_path, &transparency);

    if let Err(e) = transparency.save() {
        eprintln!("Warning: Could not save transparency log: {e}");
    }
}

#[cfg(not(feature = "server"))]
fn cmd_serve(_port: Option<u16>, _replay: Option<PathBuf>) {
    eprintln!("Error: serve requires the server feature (cargo build --features server)");
    std::process::exit(1);
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("Synheart Stress Agent Status");
    println!("============================");
    println!();

    println!("Configuration:");
    println!("  High stress threshold: {}", config.engine.high_threshold);
    println!(
        "  Breathing trigger: {} (stops below {})",
        config.engine.breathing_trigger, config.engine.medium_threshold
    );
    println!(
        "  Smoothing window: {} frames",
        config.engine.smoothing_window
    );
    println!(
        "  Report interval: {}s",
        config.engine.report_interval.as_secs()
    );
    println!("  Reports: {:?}", config.export_path);
    println!();

    // Load and show transparency stats if available
    let stats_path = config.data_path.join("transparency.json");
    if stats_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&stats_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                if let Some(frames) = stats.get("frames_analyzed") {
                    println!("  Frames analysed: {frames}");
                }
                if let Some(no_face) = stats.get("frames_without_face") {
                    println!("  Frames without a face: {no_face}");
                }
                if let Some(spikes) = stats.get("spikes_recorded") {
                    println!("  Stress spikes: {spikes}");
                }
                if let Some(prompts) = stats.get("breathing_prompts") {
                    println!("  Breathing exercises: {prompts}");
                }
                if let Some(reports) = stats.get("reports_exported") {
                    println!("  Reports exported: {reports}");
                }
            }
        }
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_disclaimer() {
    println!("{WELLNESS_DISCLAIMER}");
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");
}
