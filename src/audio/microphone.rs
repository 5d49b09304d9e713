// Microphone capture backend using cpal
//
// cpal streams are not Send, so the device stream lives on a dedicated
// thread for the lifetime of the capture. The stream callback accumulates
// fixed-size frames and try_sends them into a bounded channel; when the
// consumer lags, frames are dropped instead of blocking the audio callback.

use anyhow::{anyhow, bail, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::capture::{AudioFrame, CaptureBackend, CaptureConfig};

pub struct MicrophoneBackend {
    config: CaptureConfig,
    running: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.running.load(Ordering::SeqCst) {
            bail!("Already capturing");
        }

        info!(
            "Starting microphone capture ({}Hz, {} samples/frame)",
            self.config.sample_rate, self.config.frame_samples
        );

        let (frame_tx, frame_rx) = mpsc::channel(self.config.queue_depth);
        let (ready_tx, ready_rx) = oneshot::channel::<Result<String>>();

        let config = self.config.clone();
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::SeqCst);

        let worker = std::thread::spawn(move || {
            let stream = match build_input_stream(&config, frame_tx) {
                Ok((stream, device_name)) => {
                    let _ = ready_tx.send(Ok(device_name));
                    stream
                }
                Err(e) => {
                    running.store(false, Ordering::SeqCst);
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            // Hold the stream until stop() flips the flag
            while running.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(50));
            }
            drop(stream);
        });

        let device_name = match ready_rx.await {
            Ok(Ok(name)) => name,
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = worker.join();
                bail!("Capture thread exited before reporting readiness");
            }
        };

        self.worker = Some(worker);

        info!("Microphone capture started on \"{}\"", device_name);

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) && self.worker.is_none() {
            return Ok(());
        }

        info!("Stopping microphone capture");

        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Microphone capture thread panicked");
            }
        }

        info!("Microphone capture stopped");

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

/// Build and play the cpal input stream on the current thread
fn build_input_stream(
    config: &CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<(cpal::Stream, String)> {
    let device = cpal::default_host()
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let stream_config = StreamConfig {
        channels: config.channels,
        sample_rate: SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let frame_samples = config.frame_samples;
    let sample_rate = config.sample_rate;
    let channels = config.channels;
    let started = Instant::now();
    let mut buffer: Vec<f32> = Vec::with_capacity(frame_samples);

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for &sample in data {
                    buffer.push(sample);

                    if buffer.len() >= frame_samples {
                        let frame = AudioFrame {
                            samples: std::mem::replace(
                                &mut buffer,
                                Vec::with_capacity(frame_samples),
                            ),
                            sample_rate,
                            channels,
                            timestamp_ms: started.elapsed().as_millis() as u64,
                        };

                        if frame_tx.try_send(frame).is_err() {
                            warn!("Capture consumer lagging, dropping frame");
                        }
                    }
                }
            },
            move |err| {
                warn!("Microphone stream error: {}", err);
            },
            None,
        )
        .map_err(|e| anyhow!("Failed to open input stream: {}", e))?;

    stream
        .play()
        .map_err(|e| anyhow!("Failed to start input stream: {}", e))?;

    Ok((stream, device_name))
}
