// Wire encoding for outbound audio frames
//
// The live endpoint takes 16-bit signed little-endian PCM, base64-wrapped,
// with a mime tag declaring rate and encoding. All functions here are pure;
// independent frames can be encoded concurrently.

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Wire-ready audio payload: base64 PCM16LE plus its format tag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EncodedAudioChunk {
    /// Format tag, e.g. "audio/pcm;rate=16000"
    pub mime_type: String,
    /// Base64-encoded PCM16LE samples
    pub data: String,
}

/// Quantize normalized f32 samples to little-endian PCM16 bytes
///
/// Samples are clamped to [-1, 1] before scaling so out-of-range input
/// cannot overflow the i16 conversion.
pub fn pcm16le_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let quantized = (clamped * 32767.0) as i16;
        bytes.extend_from_slice(&quantized.to_le_bytes());
    }
    bytes
}

/// Decode little-endian PCM16 bytes back to normalized f32 samples
///
/// A trailing odd byte is ignored.
pub fn pcm16le_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect()
}

/// Encode one capture frame into the transport envelope
pub fn encode_frame(samples: &[f32], sample_rate: u32) -> EncodedAudioChunk {
    EncodedAudioChunk {
        mime_type: format!("audio/pcm;rate={}", sample_rate),
        data: base64::engine::general_purpose::STANDARD.encode(pcm16le_bytes(samples)),
    }
}
