pub mod capture;
pub mod encode;
pub mod file;
pub mod microphone;
pub mod playback;

pub use capture::{AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource};
pub use encode::{encode_frame, pcm16le_bytes, pcm16le_to_f32, EncodedAudioChunk};
pub use file::FileBackend;
pub use microphone::MicrophoneBackend;
pub use playback::{
    MonotonicClock, NullSink, OutputSink, PlaybackClock, PlaybackScheduler, PlaybackUnit, RodioSink,
};
