pub mod audio;
pub mod config;
pub mod http;
pub mod live;
pub mod session;

pub use audio::{
    encode_frame, AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource,
    EncodedAudioChunk, FileBackend, MonotonicClock, NullSink, OutputSink, PlaybackClock,
    PlaybackScheduler, PlaybackUnit,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use live::{
    ServerEvent, SessionTransport, Speaker, TransportConfig, TransportHandle, WebSocketTransport,
};
pub use session::{
    ConversationSession, InactivityWatchdog, LiveTranscription, SessionConfig, SessionError,
    SessionEvent, SessionStats, SessionStatus, TranscriptAssembler, Turn,
};
