use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::{SessionConfig, API_KEY_ENV};
use super::error::SessionError;
use super::events::{SessionEvent, SessionStats, SessionStatus};
use super::transcript::{TranscriptAssembler, Turn};
use super::watchdog::InactivityWatchdog;
use crate::audio::{
    encode_frame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource,
    MonotonicClock, NullSink, OutputSink, PlaybackScheduler, RodioSink,
};
use crate::live::{
    ServerEvent, SessionTransport, TransportConfig, TransportHandle, WebSocketTransport,
};

/// Why the dispatch loop exited
enum EndReason {
    /// Explicit stop()
    Stopped,
    /// Server closed the stream
    ServerClosed,
    /// Mid-session transport failure (detail goes to the log only)
    Failed(String),
    /// Inactivity watchdog fired
    Inactivity,
}

/// A live voice-conversation session
///
/// Owns the whole pipeline: capture frames are encoded and pumped to the
/// transport; server events drive playback, transcript assembly, and the
/// lifecycle state machine. All state transitions happen in one dispatch
/// task; `start`/`stop` are the only public controls and the event channel
/// is the only surface the display layer sees.
pub struct ConversationSession {
    /// Session configuration
    config: SessionConfig,

    /// Transport used to reach the remote conversational service
    transport: Arc<dyn SessionTransport>,

    /// Capture backend (microphone or file)
    capture: Arc<Mutex<Box<dyn CaptureBackend>>>,

    /// Playback scheduler for synthesized audio
    playback: Arc<StdMutex<PlaybackScheduler>>,

    /// Outbound transport handle; single-owner, consumed exactly once on teardown
    handle: Arc<Mutex<Option<Box<dyn TransportHandle>>>>,

    /// Lifecycle status
    status: Arc<StdMutex<SessionStatus>>,

    /// Append-only log of finalized turns
    transcript: Arc<StdMutex<Vec<Turn>>>,

    /// Event channel to the display layer
    events_tx: mpsc::UnboundedSender<SessionEvent>,

    /// Set once the endpoint acknowledges setup; gates the frame pump
    connected: Arc<AtomicBool>,

    /// Signals the dispatch loop to end on stop(); fresh per run
    stop_tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,

    /// Handle for the event dispatch task
    dispatch_handle: Arc<Mutex<Option<JoinHandle<()>>>>,

    /// Handle for the capture frame pump task
    pump_handle: Arc<Mutex<Option<JoinHandle<()>>>>,

    /// When the session object was created
    started_at: chrono::DateTime<chrono::Utc>,
}

impl ConversationSession {
    /// Create a session with explicit backends
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn SessionTransport>,
        capture: Box<dyn CaptureBackend>,
        sink: Box<dyn OutputSink>,
        events_tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let playback = PlaybackScheduler::new(
            Box::new(MonotonicClock::new()),
            sink,
            config.output_sample_rate,
        );

        Self {
            config,
            transport,
            capture: Arc::new(Mutex::new(capture)),
            playback: Arc::new(StdMutex::new(playback)),
            handle: Arc::new(Mutex::new(None)),
            status: Arc::new(StdMutex::new(SessionStatus::Idle)),
            transcript: Arc::new(StdMutex::new(Vec::new())),
            events_tx,
            connected: Arc::new(AtomicBool::new(false)),
            stop_tx: Arc::new(Mutex::new(None)),
            dispatch_handle: Arc::new(Mutex::new(None)),
            pump_handle: Arc::new(Mutex::new(None)),
            started_at: chrono::Utc::now(),
        }
    }

    /// Create a session with the production backends: microphone capture,
    /// websocket transport, speaker playback (discarded when no output
    /// device exists, e.g. on headless hosts)
    pub fn with_default_backends(
        config: SessionConfig,
        events_tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> anyhow::Result<Self> {
        let capture_config = CaptureConfig {
            sample_rate: config.input_sample_rate,
            frame_samples: config.frame_samples,
            ..CaptureConfig::default()
        };
        let capture = CaptureBackendFactory::create(CaptureSource::Microphone, capture_config)?;

        let sink: Box<dyn OutputSink> = match RodioSink::new() {
            Ok(sink) => Box::new(sink),
            Err(e) => {
                warn!("Speaker output unavailable ({}), discarding playback", e);
                Box::new(NullSink)
            }
        };

        Ok(Self::new(
            config,
            Arc::new(WebSocketTransport::new()),
            capture,
            sink,
            events_tx,
        ))
    }

    /// Start the session
    ///
    /// Accepted only from Idle or Error; a running session ignores the
    /// call. Failure order: credential check, capture acquisition,
    /// transport connect — a capture failure means connect is never
    /// attempted. Any failure transitions to Error with full teardown.
    pub async fn start(&self) -> anyhow::Result<()> {
        {
            let mut status = self.status.lock().unwrap();
            if status.is_running() {
                warn!("start() ignored: session already running");
                return Ok(());
            }
            *status = SessionStatus::Connecting;
        }

        info!("Starting conversation session: {}", self.config.session_id);

        // Drop handles left over from a run that ended on its own
        self.dispatch_handle.lock().await.take();
        self.pump_handle.lock().await.take();

        self.transcript.lock().unwrap().clear();

        if self.config.api_key.trim().is_empty() {
            return Err(self.fail_start(SessionError::CredentialMissing(API_KEY_ENV)));
        }

        let frames_rx = match self.capture.lock().await.start().await {
            Ok(rx) => rx,
            Err(e) => {
                error!("Capture acquisition failed: {:#}", e);
                return Err(self.fail_start(SessionError::PermissionDenied(e.to_string())));
            }
        };

        let transport_config = TransportConfig {
            url: self.config.url.clone(),
            api_key: self.config.api_key.clone(),
            model: self.config.model.clone(),
            system_instruction: self.config.system_instruction(),
        };

        let (handle, events_rx) = match self.transport.connect(transport_config).await {
            Ok(pair) => pair,
            Err(e) => {
                error!("Transport connect failed: {:#}", e);
                if let Err(stop_err) = self.capture.lock().await.stop().await {
                    warn!("Failed to release capture after connect failure: {}", stop_err);
                }
                return Err(self.fail_start(SessionError::ConnectFailure(e.to_string())));
            }
        };

        *self.handle.lock().await = Some(handle);
        self.connected.store(false, Ordering::SeqCst);

        let (stop_tx, stop_rx) = oneshot::channel();
        *self.stop_tx.lock().await = Some(stop_tx);

        self.spawn_frame_pump(frames_rx).await;
        self.spawn_dispatch(events_rx, stop_rx).await;

        Ok(())
    }

    /// Stop the session and release every resource
    ///
    /// No-op while Idle; safe to call repeatedly.
    pub async fn stop(&self) {
        let task = self.dispatch_handle.lock().await.take();
        let Some(task) = task else {
            debug!("stop() ignored: no active session");
            return;
        };

        info!("Stopping conversation session: {}", self.config.session_id);

        if let Some(stop_tx) = self.stop_tx.lock().await.take() {
            // The dispatch loop may already have ended on its own
            let _ = stop_tx.send(());
        }
        if let Err(e) = task.await {
            if e.is_panic() {
                error!("Dispatch task panicked: {}", e);
            }
        }
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.lock().unwrap()
    }

    /// Snapshot of the append-only transcript log
    pub fn transcript(&self) -> Vec<Turn> {
        self.transcript.lock().unwrap().clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current session statistics
    pub fn stats(&self) -> SessionStats {
        let duration = chrono::Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            status: self.status(),
            session_id: self.config.session_id.clone(),
            language: self.config.language.clone(),
            scenario: self.config.scenario.clone(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            turns_count: self.transcript.lock().unwrap().len(),
        }
    }

    /// Record a start failure: Error state, one error event, and the
    /// error back to the caller
    fn fail_start(&self, err: SessionError) -> anyhow::Error {
        let message = err.to_string();
        error!("Failed to start session: {}", message);

        *self.status.lock().unwrap() = SessionStatus::Error;
        let _ = self.events_tx.send(SessionEvent::Error { message });

        anyhow::Error::new(err)
    }

    /// Consumer half of the capture channel: drains frames, encodes, and
    /// sends. Frames arriving before the endpoint acknowledged setup are
    /// discarded; a failed send is logged and never blocks the next frame.
    async fn spawn_frame_pump(&self, mut frames_rx: mpsc::Receiver<crate::audio::AudioFrame>) {
        let handle = Arc::clone(&self.handle);
        let connected = Arc::clone(&self.connected);
        let sample_rate = self.config.input_sample_rate;

        let pump = tokio::spawn(async move {
            while let Some(frame) = frames_rx.recv().await {
                if !connected.load(Ordering::SeqCst) {
                    continue;
                }

                let chunk = encode_frame(&frame.samples, sample_rate);

                let mut guard = handle.lock().await;
                match guard.as_mut() {
                    Some(handle) => {
                        if let Err(e) = handle.send(chunk).await {
                            warn!("Failed to send audio frame: {}", e);
                        }
                    }
                    None => break,
                }
            }

            debug!("Frame pump ended");
        });

        *self.pump_handle.lock().await = Some(pump);
    }

    /// The dispatch loop: every state transition happens here
    async fn spawn_dispatch(
        &self,
        mut events_rx: mpsc::Receiver<ServerEvent>,
        mut stop_rx: oneshot::Receiver<()>,
    ) {
        let config = self.config.clone();
        let capture = Arc::clone(&self.capture);
        let playback = Arc::clone(&self.playback);
        let handle = Arc::clone(&self.handle);
        let status = Arc::clone(&self.status);
        let transcript = Arc::clone(&self.transcript);
        let events_tx = self.events_tx.clone();
        let connected = Arc::clone(&self.connected);
        let pump_handle = Arc::clone(&self.pump_handle);

        let dispatch = tokio::spawn(async move {
            let mut assembler = TranscriptAssembler::new();
            let mut watchdog = InactivityWatchdog::new(config.inactivity_timeout);

            let reason = loop {
                tokio::select! {
                    // Also resolves if the session object is dropped mid-run
                    _ = &mut stop_rx => break EndReason::Stopped,

                    _ = watchdog.expired() => break EndReason::Inactivity,

                    event = events_rx.recv() => {
                        let Some(event) = event else {
                            break EndReason::ServerClosed;
                        };

                        // Any server activity counts as liveness
                        watchdog.reset();

                        match event {
                            ServerEvent::Opened => {
                                info!("Session open: {}", config.session_id);
                                *status.lock().unwrap() = SessionStatus::Connected;
                                connected.store(true, Ordering::SeqCst);
                                watchdog.arm();
                                let _ = events_tx.send(SessionEvent::Opened);
                            }
                            ServerEvent::TranscriptFragment { speaker, text } => {
                                assembler.on_fragment(speaker, &text);
                                let _ = events_tx.send(SessionEvent::TranscriptionUpdate {
                                    speaker,
                                    text_delta: text,
                                });
                            }
                            ServerEvent::TurnComplete => {
                                let turns = assembler.on_turn_complete();
                                if !turns.is_empty() {
                                    transcript.lock().unwrap().extend(turns.iter().cloned());
                                }
                                let _ = events_tx.send(SessionEvent::TurnComplete { turns });
                            }
                            ServerEvent::AudioChunk { data } => {
                                if let Err(e) = playback.lock().unwrap().enqueue(&data) {
                                    warn!("Failed to schedule audio chunk: {}", e);
                                }
                            }
                            ServerEvent::Interrupted => {
                                playback.lock().unwrap().interrupt();
                            }
                            ServerEvent::Error { message } => {
                                break EndReason::Failed(message);
                            }
                            ServerEvent::Closed => break EndReason::ServerClosed,
                        }
                    }
                }
            };

            watchdog.disarm();
            teardown(&capture, &handle, &playback, &pump_handle, &connected).await;

            match reason {
                EndReason::Stopped | EndReason::ServerClosed => {
                    *status.lock().unwrap() = SessionStatus::Idle;
                    let _ = events_tx.send(SessionEvent::Closed);
                }
                EndReason::Failed(detail) => {
                    let err = SessionError::TransportError(detail);
                    error!("Session failed: {:?}", err);
                    *status.lock().unwrap() = SessionStatus::Error;
                    let _ = events_tx.send(SessionEvent::Error {
                        message: err.to_string(),
                    });
                }
                EndReason::Inactivity => {
                    info!("Session ended by inactivity watchdog: {}", config.session_id);
                    *status.lock().unwrap() = SessionStatus::Idle;
                    let _ = events_tx.send(SessionEvent::Error {
                        message: SessionError::InactivityTimeout.to_string(),
                    });
                }
            }

            info!("Conversation session ended: {}", config.session_id);
        });

        *self.dispatch_handle.lock().await = Some(dispatch);
    }
}

/// Release every acquired resource; each step tolerates repetition
async fn teardown(
    capture: &Arc<Mutex<Box<dyn CaptureBackend>>>,
    handle: &Arc<Mutex<Option<Box<dyn TransportHandle>>>>,
    playback: &Arc<StdMutex<PlaybackScheduler>>,
    pump_handle: &Arc<Mutex<Option<JoinHandle<()>>>>,
    connected: &Arc<AtomicBool>,
) {
    connected.store(false, Ordering::SeqCst);

    if let Some(pump) = pump_handle.lock().await.take() {
        pump.abort();
    }

    if let Err(e) = capture.lock().await.stop().await {
        warn!("Failed to stop capture: {}", e);
    }

    if let Some(mut handle) = handle.lock().await.take() {
        if let Err(e) = handle.close().await {
            warn!("Failed to close transport: {}", e);
        }
    }

    playback.lock().unwrap().shutdown();
}
