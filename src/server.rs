//! HTTP server exposing live stress state.
//!
//! This module provides a small JSON API over a shared engine:
//! - `GET /health` liveness and session ID
//! - `GET /stress` current snapshot (score, band, breathing prompt)
//! - `GET /report` session report
//! - `POST /report/ack` restart the periodic report clock
//! - `POST /frame` ingest one classified frame
//!
//! # Architecture
//!
//! ```text
//! classifier ──→ POST /frame ──┐
//!                              ├──→ SharedStressEngine ←── GET /stress ←── overlay / dashboard
//! replay loop ─────────────────┘
//! ```

use crate::collector::types::{EmotionVector, FrameEvent};
use crate::core::{ProcessOutcome, ReportBuilder, SessionReport, SharedStressEngine, StressSnapshot};
use crate::transparency::SharedTransparencyLog;
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

/// Largest accepted gap between a frame's capture time and the server clock.
pub const MAX_CLOCK_SKEW_SECS: i64 = 5;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

/// Shared server state
pub struct ServerState {
    engine: SharedStressEngine,
    transparency: SharedTransparencyLog,
    reports: ReportBuilder,
}

impl ServerState {
    /// Create new server state around an engine that other loops may also feed.
    pub fn new(engine: SharedStressEngine, transparency: SharedTransparencyLog) -> Self {
        Self {
            engine,
            transparency,
            reports: ReportBuilder::new(),
        }
    }

    fn report(&self, now: DateTime<Utc>) -> SessionReport {
        self.engine.with(|engine| self.reports.build(engine, now))
    }
}

/// One classified frame as posted by the classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramePayload {
    /// Capture time, checked against the server clock. Frames are always
    /// processed at server time so reads and writes share one clock.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Emotion percentages, or null when no face was detected
    #[serde(default)]
    pub emotion: Option<EmotionVector>,
}

/// Response from the frame endpoint
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub status: String,
    pub outcome: ProcessOutcome,
    pub snapshot: StressSnapshot,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub session_id: Uuid,
}

/// Report acknowledgement response
#[derive(Serialize)]
pub struct AckResponse {
    pub status: String,
    pub acknowledged_at: DateTime<Utc>,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// GET /health
async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        session_id: state.engine.with(|engine| engine.session_id()),
    })
}

/// GET /stress
async fn stress(State(state): State<Arc<ServerState>>) -> Json<StressSnapshot> {
    Json(state.engine.snapshot(Utc::now()))
}

/// GET /report
async fn report(State(state): State<Arc<ServerState>>) -> Json<SessionReport> {
    Json(state.report(Utc::now()))
}

/// POST /report/ack
///
/// The engine only signals that a report is due; whoever consumes the report
/// restarts the clock here.
async fn acknowledge_report(State(state): State<Arc<ServerState>>) -> Json<AckResponse> {
    let now = Utc::now();
    state.engine.mark_reported(now);
    state.transparency.record_report_exported();

    Json(AckResponse {
        status: "ok".to_string(),
        acknowledged_at: now,
    })
}

/// POST /frame
async fn ingest_frame(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<IngestResponse>, (StatusCode, Json<ErrorResponse>)> {
    let payload: FramePayload = serde_json::from_value(body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("Invalid frame: {}", e),
                code: "INVALID_FRAME".to_string(),
            }),
        )
    })?;

    let now = Utc::now();
    if let Some(captured) = payload.timestamp {
        let skew = (now - captured).num_seconds().abs();
        if skew > MAX_CLOCK_SKEW_SECS {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!(
                        "Frame timestamp is {}s away from server time (limit {}s)",
                        skew, MAX_CLOCK_SKEW_SECS
                    ),
                    code: "CLOCK_SKEW".to_string(),
                }),
            ));
        }
    }
    let frame = FrameEvent::at(now, payload.emotion);

    let (outcome, snapshot) = state.engine.with_mut(|engine| {
        let outcome = engine.process(&frame);
        (outcome, engine.snapshot(now))
    });
    state.transparency.record_outcome(&outcome);

    Ok(Json(IngestResponse {
        status: "ok".to_string(),
        outcome,
        snapshot,
    }))
}

/// Build the router without binding a socket.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stress", get(stress))
        .route("/report", get(report))
        .route("/report/ack", post(acknowledge_report))
        .route("/frame", post(ingest_frame))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://localhost:3000"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    state: ServerState,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(Arc::new(state));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Stress agent server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
