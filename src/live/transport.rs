use anyhow::Result;
use tokio::sync::mpsc;

use super::messages::Speaker;
use crate::audio::EncodedAudioChunk;

/// Everything needed to open a live session
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Websocket endpoint URL
    pub url: String,
    /// Credential appended to the connect request
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// System instruction built from language + scenario
    pub system_instruction: String,
}

/// Event delivered by the remote service
///
/// Delivery order within one session is authoritative for transcript
/// assembly and playback scheduling.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Endpoint acknowledged setup; precedes any content event
    Opened,
    TranscriptFragment { speaker: Speaker, text: String },
    TurnComplete,
    /// Decoded PCM16LE bytes of synthesized audio
    AudioChunk { data: Vec<u8> },
    /// User started talking over the assistant
    Interrupted,
    Error { message: String },
    Closed,
}

/// Bidirectional channel to the remote conversational service
#[async_trait::async_trait]
pub trait SessionTransport: Send + Sync {
    /// Establish a session
    ///
    /// Returns the outbound handle and a channel receiver delivering
    /// server events in arrival order, starting with `Opened`.
    async fn connect(
        &self,
        config: TransportConfig,
    ) -> Result<(Box<dyn TransportHandle>, mpsc::Receiver<ServerEvent>)>;
}

/// Outbound half of an established session; single-owner
#[async_trait::async_trait]
pub trait TransportHandle: Send {
    /// Forward one encoded capture frame
    async fn send(&mut self, chunk: EncodedAudioChunk) -> Result<()>;

    /// Close the session; safe to call repeatedly
    async fn close(&mut self) -> Result<()>;
}
