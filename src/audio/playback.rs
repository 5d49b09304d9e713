// Playback scheduling for synthesized audio
//
// Chunks arrive in bursts from the live endpoint; each decoded unit is
// booked at max(next_start, now) and next_start advances by the unit's
// duration, so units play back-to-back regardless of arrival timing.
// interrupt() is the barge-in path: every active unit is halted, the set
// drained, and next_start rebased to the current clock so nothing stale
// survives.
//
// Scheduling runs against the playback subsystem's own monotonic clock,
// never wall-clock time.

use anyhow::{bail, Context, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::encode::pcm16le_to_f32;

/// Monotonic time source for playback scheduling
pub trait PlaybackClock: Send {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;
}

/// Process-monotonic clock backed by `Instant`
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Output device boundary
pub trait OutputSink: Send {
    /// Queue decoded samples for playback after everything already queued
    fn submit(&mut self, samples: Vec<f32>, sample_rate: u32) -> Result<()>;

    /// Halt playback immediately and drop everything queued
    fn cancel_all(&mut self);
}

/// Sink that discards audio; used for headless runs and tests
pub struct NullSink;

impl OutputSink for NullSink {
    fn submit(&mut self, _samples: Vec<f32>, _sample_rate: u32) -> Result<()> {
        Ok(())
    }

    fn cancel_all(&mut self) {}
}

enum SinkCommand {
    Submit(Vec<f32>, u32),
    CancelAll,
    Shutdown,
}

/// Speaker output via rodio
///
/// The rodio output stream is not Send, so a dedicated thread owns it and
/// takes commands over a channel. rodio's sink queue plays appended buffers
/// back-to-back, which matches the scheduler's gapless bookkeeping;
/// `Sink::stop` empties the queue for the barge-in cutoff.
pub struct RodioSink {
    cmd_tx: std::sync::mpsc::Sender<SinkCommand>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl RodioSink {
    pub fn new() -> Result<Self> {
        let (cmd_tx, cmd_rx) = std::sync::mpsc::channel::<SinkCommand>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<()>>();

        let worker = std::thread::spawn(move || {
            let (stream, handle) = match rodio::OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    let _ = ready_tx.send(Err(anyhow::anyhow!("No output device: {}", e)));
                    return;
                }
            };
            let mut sink = match rodio::Sink::try_new(&handle) {
                Ok(sink) => sink,
                Err(e) => {
                    let _ = ready_tx.send(Err(anyhow::anyhow!("Failed to create sink: {}", e)));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));

            // Keep the stream alive for the lifetime of the worker
            let _stream = stream;

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    SinkCommand::Submit(samples, sample_rate) => {
                        sink.append(rodio::buffer::SamplesBuffer::new(1, sample_rate, samples));
                    }
                    SinkCommand::CancelAll => {
                        // A stopped sink stays silent, so swap in a fresh one
                        // for whatever plays after the cutoff
                        sink.stop();
                        match rodio::Sink::try_new(&handle) {
                            Ok(fresh) => sink = fresh,
                            Err(e) => warn!("Failed to recreate sink after stop: {}", e),
                        }
                    }
                    SinkCommand::Shutdown => {
                        sink.stop();
                        break;
                    }
                }
            }
        });

        ready_rx
            .recv()
            .context("Playback thread exited before reporting readiness")??;

        info!("Speaker output initialized");

        Ok(Self {
            cmd_tx,
            worker: Some(worker),
        })
    }
}

impl OutputSink for RodioSink {
    fn submit(&mut self, samples: Vec<f32>, sample_rate: u32) -> Result<()> {
        self.cmd_tx
            .send(SinkCommand::Submit(samples, sample_rate))
            .map_err(|_| anyhow::anyhow!("Playback thread gone"))
    }

    fn cancel_all(&mut self) {
        let _ = self.cmd_tx.send(SinkCommand::CancelAll);
    }
}

impl Drop for RodioSink {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(SinkCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// One scheduled stretch of synthesized audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackUnit {
    pub id: u64,
    /// Scheduled start, in the scheduler's clock domain
    pub start_at: Duration,
    pub duration: Duration,
}

impl PlaybackUnit {
    pub fn end_at(&self) -> Duration {
        self.start_at + self.duration
    }
}

/// Gapless playback scheduler with immediate interruption
pub struct PlaybackScheduler {
    clock: Box<dyn PlaybackClock>,
    sink: Box<dyn OutputSink>,
    /// Output sample rate of decoded chunks (the endpoint synthesizes 24kHz mono)
    sample_rate: u32,
    next_start: Duration,
    active: Vec<PlaybackUnit>,
    next_id: u64,
}

impl PlaybackScheduler {
    pub fn new(clock: Box<dyn PlaybackClock>, sink: Box<dyn OutputSink>, sample_rate: u32) -> Self {
        Self {
            clock,
            sink,
            sample_rate,
            next_start: Duration::ZERO,
            active: Vec::new(),
            next_id: 0,
        }
    }

    /// Decode a PCM16LE chunk and book it right after the current backlog
    pub fn enqueue(&mut self, pcm_bytes: &[u8]) -> Result<PlaybackUnit> {
        let samples = pcm16le_to_f32(pcm_bytes);
        if samples.is_empty() {
            bail!("Empty audio payload");
        }

        self.reap();

        let now = self.clock.now();
        let start_at = self.next_start.max(now);
        let duration = Duration::from_secs_f64(samples.len() as f64 / self.sample_rate as f64);

        let unit = PlaybackUnit {
            id: self.next_id,
            start_at,
            duration,
        };
        self.next_id += 1;

        self.sink.submit(samples, self.sample_rate)?;
        self.next_start = start_at + duration;
        self.active.push(unit);

        debug!(
            "Scheduled playback unit {} at {:?} for {:?}",
            unit.id, unit.start_at, unit.duration
        );

        Ok(unit)
    }

    /// Barge-in: halt every active unit and rebase scheduling to now
    ///
    /// The active set is fully drained before this returns, so nothing
    /// enqueued afterwards can stack behind stale timing.
    pub fn interrupt(&mut self) {
        let halted = self.active.len();
        self.sink.cancel_all();
        self.active.clear();
        self.next_start = self.clock.now();

        if halted > 0 {
            info!("Playback interrupted, halted {} unit(s)", halted);
        }
    }

    /// Stop and clear everything; safe to call repeatedly
    pub fn shutdown(&mut self) {
        if !self.active.is_empty() {
            warn!("Shutting down playback with {} unit(s) active", self.active.len());
        }
        self.sink.cancel_all();
        self.active.clear();
        self.next_start = self.clock.now();
    }

    /// Drop units whose scheduled window has fully elapsed
    pub fn reap(&mut self) {
        let now = self.clock.now();
        self.active.retain(|unit| unit.end_at() > now);
    }

    pub fn active_units(&self) -> &[PlaybackUnit] {
        &self.active
    }

    pub fn next_start(&self) -> Duration {
        self.next_start
    }
}
