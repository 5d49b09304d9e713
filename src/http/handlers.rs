use super::state::AppState;
use crate::session::{
    ConversationSession, SessionConfig, SessionEvent, SessionStats, Turn,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartConversationRequest {
    /// Language to practice (default: first configured language)
    pub language: Option<String>,

    /// Conversation scenario (default: first configured scenario)
    pub scenario: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartConversationResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopConversationResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /conversation/start
/// Start a conversation session (at most one runs process-wide)
pub async fn start_conversation(
    State(state): State<AppState>,
    Json(req): Json<StartConversationRequest>,
) -> impl IntoResponse {
    // Refuse while a session is still running
    {
        let session = state.session.read().await;
        if let Some(session) = session.as_ref() {
            if session.status().is_running() {
                return (
                    StatusCode::CONFLICT,
                    Json(ErrorResponse {
                        error: "A conversation is already running".to_string(),
                    }),
                )
                    .into_response();
            }
        }
    }

    let config = SessionConfig {
        language: req
            .language
            .unwrap_or_else(|| crate::session::LANGUAGES[0].to_string()),
        scenario: req
            .scenario
            .unwrap_or_else(|| crate::session::SCENARIOS[0].to_string()),
        model: state.config.live.model.clone(),
        url: state.config.live.url.clone(),
        input_sample_rate: state.config.audio.input_sample_rate,
        output_sample_rate: state.config.audio.output_sample_rate,
        frame_samples: state.config.audio.frame_samples,
        inactivity_timeout: Duration::from_secs(state.config.live.inactivity_timeout_secs),
        ..SessionConfig::default()
    };

    info!(
        "Starting conversation: language={}, scenario={}",
        config.language, config.scenario
    );

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    spawn_event_logger(events_rx);

    let session = match ConversationSession::with_default_backends(config, events_tx) {
        Ok(session) => Arc::new(session),
        Err(e) => {
            error!("Failed to create session: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to create session: {}", e),
                }),
            )
                .into_response();
        }
    };

    let session_id = session.config().session_id.clone();

    // Store before starting so /status reflects failed attempts too
    {
        let mut slot = state.session.write().await;
        *slot = Some(Arc::clone(&session));
    }

    if let Err(e) = session.start().await {
        error!("Failed to start conversation: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response();
    }

    info!("Conversation started: {}", session_id);

    (
        StatusCode::OK,
        Json(StartConversationResponse {
            session_id: session_id.clone(),
            status: "connecting".to_string(),
            message: format!("Conversation {} started", session_id),
        }),
    )
        .into_response()
}

/// POST /conversation/stop
/// Stop the active conversation session
pub async fn stop_conversation(State(state): State<AppState>) -> impl IntoResponse {
    let session = {
        let slot = state.session.read().await;
        slot.clone()
    };

    match session {
        Some(session) => {
            session.stop().await;

            let stats = session.stats();
            let session_id = session.config().session_id.clone();

            info!("Conversation stopped: {}", session_id);

            (
                StatusCode::OK,
                Json(StopConversationResponse {
                    session_id,
                    status: "stopped".to_string(),
                    message: "Conversation stopped".to_string(),
                    stats,
                }),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No conversation session exists".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /conversation/status
/// Get status of the current session
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let slot = state.session.read().await;

    match slot.as_ref() {
        Some(session) => (StatusCode::OK, Json(session.stats())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No conversation session exists".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /conversation/transcript
/// Get the finalized transcript accumulated so far
pub async fn get_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let slot = state.session.read().await;

    match slot.as_ref() {
        Some(session) => {
            let transcript: Vec<Turn> = session.transcript();
            (StatusCode::OK, Json(transcript)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No conversation session exists".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// The process's display layer: renders session events into the log
fn spawn_event_logger(mut events_rx: mpsc::UnboundedReceiver<SessionEvent>) {
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                SessionEvent::Opened => info!("Conversation connected"),
                SessionEvent::Closed => info!("Conversation closed"),
                SessionEvent::Error { message } => warn!("Conversation error: {}", message),
                SessionEvent::TranscriptionUpdate { speaker, text_delta } => {
                    info!("[{:?}] {}", speaker, text_delta);
                }
                SessionEvent::TurnComplete { turns } => {
                    for turn in turns {
                        info!("Turn finalized [{:?}]: {}", turn.speaker, turn.text);
                    }
                }
            }
        }
    });
}
