use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::transcript::Turn;
use crate::live::Speaker;

/// Lifecycle status of a conversation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Connecting,
    Connected,
    Error,
}

impl SessionStatus {
    /// Connecting and Connected are collectively "running"
    pub fn is_running(&self) -> bool {
        matches!(self, SessionStatus::Connecting | SessionStatus::Connected)
    }
}

/// Event emitted to the display layer
///
/// The state machine is the sole emitter; the display layer never talks to
/// the transport, playback, or assembler directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SessionEvent {
    /// Session is open and live
    Opened,
    /// Session ended cleanly (explicit stop, server close, or inactivity)
    Closed,
    /// A failure or informational termination message
    Error { message: String },
    /// A fragment for the in-progress live line of one speaker
    TranscriptionUpdate { speaker: Speaker, text_delta: String },
    /// Finalized turns to append to the transcript log
    TurnComplete { turns: Vec<Turn> },
}

/// Statistics about a conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current lifecycle status
    pub status: SessionStatus,

    /// Session identifier
    pub session_id: String,

    /// Language being practiced
    pub language: String,

    /// Active scenario
    pub scenario: String,

    /// When the session object was created
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Number of finalized turns in the transcript
    pub turns_count: usize,
}
