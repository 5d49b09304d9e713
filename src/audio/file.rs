use anyhow::{Context, Result};
use hound::WavReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

use super::capture::{AudioFrame, CaptureBackend, CaptureConfig};

/// WAV file capture backend
///
/// Reads the whole file up front and delivers fixed-size frames at
/// real-time cadence, so downstream consumers see the same pacing a live
/// microphone would produce. The channel closes when the file runs out.
pub struct FileBackend {
    path: String,
    config: CaptureConfig,
    samples: Arc<Vec<f32>>,
    running: Arc<AtomicBool>,
}

impl FileBackend {
    pub fn open(path: impl AsRef<Path>, config: CaptureConfig) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening capture file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        let raw: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        // Fold interleaved channels down to mono and normalize to f32
        let channels = spec.channels.max(1) as usize;
        let samples: Vec<f32> = raw
            .chunks(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as f32 / 32768.0
            })
            .collect();

        let duration_seconds = samples.len() as f64 / spec.sample_rate as f64;

        info!(
            "Capture file loaded: {:.1}s, {}Hz, {} channels",
            duration_seconds, spec.sample_rate, spec.channels
        );

        Ok(Self {
            path: path.display().to_string(),
            config: CaptureConfig {
                sample_rate: spec.sample_rate,
                channels: 1,
                ..config
            },
            samples: Arc::new(samples),
            running: Arc::new(AtomicBool::new(false)),
        })
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.running.load(Ordering::SeqCst) {
            anyhow::bail!("Already capturing");
        }

        info!("Starting file capture: {}", self.path);

        self.running.store(true, Ordering::SeqCst);

        let (frame_tx, frame_rx) = mpsc::channel(self.config.queue_depth);
        let samples = Arc::clone(&self.samples);
        let running = Arc::clone(&self.running);
        let frame_samples = self.config.frame_samples;
        let sample_rate = self.config.sample_rate;

        tokio::spawn(async move {
            let frame_duration =
                Duration::from_millis((frame_samples as u64 * 1000) / sample_rate as u64);
            let mut cadence = tokio::time::interval(frame_duration);
            let mut offset = 0usize;
            let mut timestamp_ms = 0u64;

            while offset < samples.len() {
                cadence.tick().await;

                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let end = (offset + frame_samples).min(samples.len());
                let frame = AudioFrame {
                    samples: samples[offset..end].to_vec(),
                    sample_rate,
                    channels: 1,
                    timestamp_ms,
                };
                timestamp_ms += frame.duration_ms();
                offset = end;

                if frame_tx.send(frame).await.is_err() {
                    break;
                }
            }

            running.store(false, Ordering::SeqCst);
        });

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Stopping file capture: {}", self.path);
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}
