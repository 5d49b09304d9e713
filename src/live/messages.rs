// Wire messages for the live conversational endpoint
//
// Outbound: one setup envelope at session start, then realtimeInput frames.
// Inbound: serverContent envelopes that interleave transcription fragments,
// synthesized audio, turn boundaries, and interruption signals. A single
// envelope can carry several of these at once; parsing flattens it into
// ordered ServerEvents.

use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::transport::ServerEvent;
use crate::audio::EncodedAudioChunk;

/// Who produced a transcription fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

// ============================================================================
// Outbound
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SetupMessage {
    pub setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    /// Empty objects enable transcription of both directions
    pub input_audio_transcription: TranscriptionConfig,
    pub output_audio_transcription: TranscriptionConfig,
}

#[derive(Debug, Serialize, Default)]
pub struct TranscriptionConfig {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub struct Part {
    pub text: String,
}

impl SetupMessage {
    pub fn new(model: &str, system_instruction: &str) -> Self {
        Self {
            setup: Setup {
                model: format!("models/{}", model),
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                },
                system_instruction: Content {
                    parts: vec![Part {
                        text: system_instruction.to_string(),
                    }],
                },
                input_audio_transcription: TranscriptionConfig::default(),
                output_audio_transcription: TranscriptionConfig::default(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<EncodedAudioChunk>,
}

impl RealtimeInputMessage {
    pub fn new(chunk: EncodedAudioChunk) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media_chunks: vec![chunk],
            },
        }
    }
}

// ============================================================================
// Inbound
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<serde_json::Value>,
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub input_transcription: Option<Transcription>,
    pub output_transcription: Option<Transcription>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
    pub model_turn: Option<ModelTurn>,
}

#[derive(Debug, Deserialize)]
pub struct Transcription {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<ServerPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPart {
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: Option<String>,
    pub data: Option<String>,
}

/// Flatten one server envelope into ordered events
///
/// Within an envelope the order is: input transcription, output
/// transcription, turn boundary, synthesized audio, interruption.
pub fn parse_server_message(text: &str) -> Result<Vec<ServerEvent>> {
    let message: ServerMessage =
        serde_json::from_str(text).context("Malformed server message")?;

    let mut events = Vec::new();

    if message.setup_complete.is_some() {
        events.push(ServerEvent::Opened);
    }

    let Some(content) = message.server_content else {
        return Ok(events);
    };

    if let Some(text) = content.input_transcription.and_then(|t| t.text) {
        events.push(ServerEvent::TranscriptFragment {
            speaker: Speaker::User,
            text,
        });
    }

    if let Some(text) = content.output_transcription.and_then(|t| t.text) {
        events.push(ServerEvent::TranscriptFragment {
            speaker: Speaker::Assistant,
            text,
        });
    }

    if content.turn_complete {
        events.push(ServerEvent::TurnComplete);
    }

    if let Some(encoded) = content
        .model_turn
        .and_then(|turn| turn.parts.into_iter().next())
        .and_then(|part| part.inline_data)
        .and_then(|inline| inline.data)
    {
        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .context("Invalid base64 audio payload")?;
        events.push(ServerEvent::AudioChunk { data });
    }

    if content.interrupted {
        events.push(ServerEvent::Interrupted);
    }

    Ok(events)
}
