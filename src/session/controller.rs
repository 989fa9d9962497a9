use super::config::SessionConfig;
use super::events::SessionEvent;
use super::stats::SessionStats;
use super::SessionState;
use crate::audio::{AudioCapture, AudioFrame, RecordingMeta, WavSink};
use crate::error::{PersistenceError, SessionError};
use crate::export::{self, ExportFormat};
use crate::meeting::{Meeting, MeetingAudioSource, MeetingTranscript, TranscriptSegment};
use crate::store::PersistenceGateway;
use crate::transcribe::{RecognizerEvent, SegmentAccumulator, TranscriptionEngine};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// State shared between the controller and its background tasks
struct SessionShared {
    /// Append-only transcript buffer for the active session
    buffer: Mutex<Vec<TranscriptSegment>>,
    /// Segments appended since the last successful save
    unsaved: AtomicUsize,
    /// Mirror of buffer.len() for lock-free stats reads
    segment_count: AtomicUsize,
    is_transcribing: AtomicBool,
    /// Cumulative recording duration, paused intervals excluded
    duration_ms: AtomicU64,
    accumulated_ms: AtomicU64,
    /// When the current recording stretch began; None while paused
    resumed_at: Mutex<Option<Instant>>,
    /// Cleared on stop to wind down the ticker
    live: AtomicBool,
}

impl SessionShared {
    fn new() -> Self {
        Self {
            buffer: Mutex::new(Vec::new()),
            unsaved: AtomicUsize::new(0),
            segment_count: AtomicUsize::new(0),
            is_transcribing: AtomicBool::new(false),
            duration_ms: AtomicU64::new(0),
            accumulated_ms: AtomicU64::new(0),
            resumed_at: Mutex::new(None),
            live: AtomicBool::new(false),
        }
    }
}

/// Handle to the transcription half of the pipeline; torn down on pause and
/// rebuilt on resume
struct Pipeline {
    router: JoinHandle<()>,
    segmenter: JoinHandle<()>,
    collector: JoinHandle<()>,
}

impl Pipeline {
    async fn join(self) {
        for (name, task) in [
            ("router", self.router),
            ("segmenter", self.segmenter),
            ("collector", self.collector),
        ] {
            if let Err(e) = task.await {
                error!("{} task panicked: {}", name, e);
            }
        }
    }
}

struct ActiveSession {
    meeting: Meeting,
    /// Live sender feeding captured frames into the engine; None while the
    /// engine is stopped (paused session)
    feed_slot: Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>,
    tee: JoinHandle<Option<RecordingMeta>>,
    pipeline: Option<Pipeline>,
    ticker: JoinHandle<()>,
}

/// Orchestrates one recording session at a time
///
/// Owns the capture source and transcription engine, enforces the
/// `Idle → Recording ⇄ Paused → Stopped` state machine, and persists the
/// meeting record and transcript through the [`PersistenceGateway`].
pub struct SessionController {
    config: SessionConfig,
    capture: Box<dyn AudioCapture>,
    engine: Box<dyn TranscriptionEngine>,
    store: Arc<dyn PersistenceGateway>,
    state: SessionState,
    events: broadcast::Sender<SessionEvent>,
    shared: Arc<SessionShared>,
    active: Option<ActiveSession>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        capture: Box<dyn AudioCapture>,
        engine: Box<dyn TranscriptionEngine>,
        store: Arc<dyn PersistenceGateway>,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            config,
            capture,
            engine,
            store,
            state: SessionState::Idle,
            events,
            shared: Arc::new(SessionShared::new()),
            active: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Subscribe to typed session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Live audio level in [0.0, 1.0] for UI metering
    pub fn audio_level(&self) -> watch::Receiver<f32> {
        self.capture.level()
    }

    /// Snapshot of the observable session state
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            state: self.state,
            is_recording: self.state == SessionState::Recording,
            is_transcribing: self.shared.is_transcribing.load(Ordering::SeqCst),
            started_at: self.active.as_ref().map(|a| a.meeting.started_at),
            duration_secs: self.shared.duration_ms.load(Ordering::SeqCst) as f64 / 1000.0,
            segment_count: self.shared.segment_count.load(Ordering::SeqCst),
        }
    }

    /// The active session's segments so far
    pub async fn transcript_segments(&self) -> Vec<TranscriptSegment> {
        self.shared.buffer.lock().await.clone()
    }

    /// The active session's transcript rendered as text lines
    pub async fn current_transcript(&self) -> String {
        self.shared
            .buffer
            .lock()
            .await
            .iter()
            .map(TranscriptSegment::render_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Start a new recording session. Fails with [`SessionError::AlreadyActive`]
    /// unless the controller is idle, and with
    /// [`SessionError::PermissionDenied`] (before any setup) when either
    /// capture or recognition access is refused.
    pub async fn start(
        &mut self,
        title: &str,
        source: MeetingAudioSource,
        participants: Vec<String>,
    ) -> Result<Uuid, SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyActive);
        }

        // Both permissions up front; a single denial means no partial setup
        let capture_ok = self.capture.request_access().await;
        let engine_ok = self.engine.request_access().await;
        if !capture_ok || !engine_ok {
            warn!(
                "session start refused: capture access={}, speech access={}",
                capture_ok, engine_ok
            );
            return Err(SessionError::PermissionDenied);
        }

        let mut meeting = Meeting::new(title, source, participants);
        let audio_path = self.store.audio_path(meeting.id);
        meeting.audio_path = Some(audio_path.display().to_string());

        info!("Starting session \"{}\" ({})", meeting.title, meeting.id);

        // Fresh per-session shared state
        self.shared = Arc::new(SessionShared::new());
        self.shared.live.store(true, Ordering::SeqCst);
        *self.shared.resumed_at.lock().await = Some(Instant::now());
        self.shared.is_transcribing.store(true, Ordering::SeqCst);

        let (cap_tx, cap_rx) = mpsc::channel(self.config.channel_capacity);
        let (engine_tx, engine_rx) = mpsc::channel(self.config.channel_capacity);
        let (event_tx, event_rx) = mpsc::channel(self.config.channel_capacity);

        self.capture.start(cap_tx).await?;

        let sink = match WavSink::create(&audio_path, self.config.sample_rate, self.config.channels)
        {
            Ok(sink) => sink,
            Err(e) => {
                let _ = self.capture.stop().await;
                return Err(e.into());
            }
        };

        if let Err(e) = self.engine.start(engine_rx, event_tx).await {
            let _ = self.capture.stop().await;
            // The sink finalizes on drop; without a meeting record the empty
            // WAV would be an orphan, so remove it.
            drop(sink);
            if let Err(remove_err) = std::fs::remove_file(&audio_path) {
                warn!(
                    "failed to remove unused recording {:?}: {}",
                    audio_path, remove_err
                );
            }
            return Err(e.into());
        }

        let feed_slot = Arc::new(Mutex::new(Some(engine_tx)));
        let tee = tokio::spawn(Self::run_tee(cap_rx, sink, Arc::clone(&feed_slot)));
        let pipeline = self.spawn_pipeline(event_rx, meeting.id, meeting.started_at);
        let ticker = tokio::spawn(Self::run_ticker(
            Arc::clone(&self.shared),
            self.events.clone(),
            self.config.tick_interval,
        ));

        self.active = Some(ActiveSession {
            meeting,
            feed_slot,
            tee,
            pipeline: Some(pipeline),
            ticker,
        });

        self.set_state(SessionState::Recording);
        Ok(self.active.as_ref().map(|a| a.meeting.id).unwrap_or_default())
    }

    /// Pause a recording session. The engine is stopped, which drains the
    /// accumulator and finalizes any open segment, so nothing leaks across
    /// the pause boundary; capture delivery is gated without tearing the
    /// device down.
    pub async fn pause(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Recording {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                action: "pause",
            });
        }

        let (feed_slot, pipeline) = match self.active.as_mut() {
            Some(active) => (Arc::clone(&active.feed_slot), active.pipeline.take()),
            None => {
                return Err(SessionError::InvalidTransition {
                    from: self.state,
                    action: "pause",
                })
            }
        };

        // Close the engine feed, stop recognition, and let the pipeline
        // drain: the accumulator finalizes its open segment on channel close.
        *feed_slot.lock().await = None;
        if let Err(e) = self.engine.stop().await {
            warn!("engine stop during pause failed: {}", e);
        }
        if let Some(pipeline) = pipeline {
            pipeline.join().await;
        }

        self.capture.pause();

        // Freeze the duration clock
        if let Some(started) = self.shared.resumed_at.lock().await.take() {
            self.shared
                .accumulated_ms
                .fetch_add(started.elapsed().as_millis() as u64, Ordering::SeqCst);
        }
        self.shared.duration_ms.store(
            self.shared.accumulated_ms.load(Ordering::SeqCst),
            Ordering::SeqCst,
        );
        self.shared.is_transcribing.store(false, Ordering::SeqCst);

        self.set_state(SessionState::Paused);
        Ok(())
    }

    /// Resume a paused session. Duration continues from the paused value.
    pub async fn resume(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Paused {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                action: "resume",
            });
        }

        let (meeting_id, started_at, feed_slot) = match self.active.as_ref() {
            Some(active) => (
                active.meeting.id,
                active.meeting.started_at,
                Arc::clone(&active.feed_slot),
            ),
            None => {
                return Err(SessionError::InvalidTransition {
                    from: self.state,
                    action: "resume",
                })
            }
        };

        let (engine_tx, engine_rx) = mpsc::channel(self.config.channel_capacity);
        let (event_tx, event_rx) = mpsc::channel(self.config.channel_capacity);

        self.engine.start(engine_rx, event_tx).await?;
        *feed_slot.lock().await = Some(engine_tx);

        let pipeline = self.spawn_pipeline(event_rx, meeting_id, started_at);
        if let Some(active) = self.active.as_mut() {
            active.pipeline = Some(pipeline);
        }

        self.capture.resume();
        *self.shared.resumed_at.lock().await = Some(Instant::now());
        self.shared.is_transcribing.store(true, Ordering::SeqCst);

        self.set_state(SessionState::Recording);
        Ok(())
    }

    /// Stop the session: wind down every component, persist the meeting and
    /// its full transcript, and return to idle. After this returns, no
    /// further segment or audio callback fires.
    pub async fn stop(&mut self) -> Result<Meeting, SessionError> {
        if self.state != SessionState::Recording && self.state != SessionState::Paused {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                action: "stop",
            });
        }

        let mut active = match self.active.take() {
            Some(active) => active,
            None => {
                return Err(SessionError::InvalidTransition {
                    from: self.state,
                    action: "stop",
                })
            }
        };

        info!("Stopping session {}", active.meeting.id);

        *active.feed_slot.lock().await = None;
        if let Err(e) = self.capture.stop().await {
            warn!("capture stop failed: {}", e);
        }
        if let Err(e) = self.engine.stop().await {
            warn!("engine stop failed: {}", e);
        }

        // Capture is down, so its sender is gone and the tee drains out,
        // finalizing the WAV file.
        let recording = match active.tee.await {
            Ok(meta) => meta,
            Err(e) => {
                error!("tee task panicked: {}", e);
                None
            }
        };

        if let Some(pipeline) = active.pipeline.take() {
            pipeline.join().await;
        }

        self.shared.live.store(false, Ordering::SeqCst);
        if let Err(e) = active.ticker.await {
            error!("ticker task panicked: {}", e);
        }

        if let Some(started) = self.shared.resumed_at.lock().await.take() {
            self.shared
                .accumulated_ms
                .fetch_add(started.elapsed().as_millis() as u64, Ordering::SeqCst);
        }
        let duration_secs = self.shared.accumulated_ms.load(Ordering::SeqCst) as f64 / 1000.0;

        let mut meeting = active.meeting;
        meeting.ended_at = Some(Utc::now());
        if let Some(meta) = recording {
            info!(
                "Recorded {:.1}s of audio to {:?}",
                meta.duration_secs(),
                meta.path
            );
            meeting.audio_path = Some(meta.path.display().to_string());
        }

        let segments = std::mem::take(&mut *self.shared.buffer.lock().await);
        info!(
            "Session {} finished: {:.1}s, {} segments",
            meeting.id,
            duration_secs,
            segments.len()
        );

        self.set_state(SessionState::Stopped);

        let persisted: Result<(), PersistenceError> = {
            let store = Arc::clone(&self.store);
            async {
                if !segments.is_empty() {
                    let mut transcript = MeetingTranscript::new(meeting.id, segments);
                    transcript.created_at = meeting.started_at;
                    store.save_transcript(&transcript).await?;
                    meeting.transcript_path =
                        Some(store.transcript_path(meeting.id).display().to_string());
                }
                store.save_meeting(&meeting).await?;
                Ok(())
            }
            .await
        };

        // Controller is ready for a new session either way
        self.shared.is_transcribing.store(false, Ordering::SeqCst);
        self.shared.duration_ms.store(0, Ordering::SeqCst);
        self.shared.segment_count.store(0, Ordering::SeqCst);
        self.set_state(SessionState::Idle);

        match persisted {
            Ok(()) => Ok(meeting),
            Err(e) => {
                error!("failed to persist meeting {}: {}", meeting.id, e);
                let _ = self.events.send(SessionEvent::Error(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Render a stored meeting's transcript in the given format
    pub async fn export_transcript(
        &self,
        meeting_id: Uuid,
        format: ExportFormat,
    ) -> Result<String, SessionError> {
        let meeting = self
            .store
            .load_meeting(meeting_id)
            .await?
            .ok_or(PersistenceError::NotFound(meeting_id))?;
        let transcript = self
            .store
            .load_transcript(meeting_id)
            .await?
            .ok_or(PersistenceError::NotFound(meeting_id))?;

        export::render(&meeting, &transcript, format).map_err(SessionError::from)
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        let _ = self.events.send(SessionEvent::StateChanged(state));
    }

    /// Forward captured frames to the WAV sink and, when one is wired in,
    /// the transcription feed. Never blocks the capture side: the feed uses
    /// `try_send` and drops on backpressure.
    async fn run_tee(
        mut frames: mpsc::Receiver<AudioFrame>,
        mut sink: WavSink,
        feed: Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>,
    ) -> Option<RecordingMeta> {
        let mut dropped = 0usize;

        while let Some(frame) = frames.recv().await {
            if let Err(e) = sink.write_frame(&frame) {
                warn!("failed to write audio frame: {}", e);
            }

            let feed_tx = feed.lock().await.clone();
            if let Some(tx) = feed_tx {
                if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(frame) {
                    dropped += 1;
                    if dropped % 100 == 1 {
                        warn!("transcription feed full, {} frames dropped", dropped);
                    }
                }
            }
        }

        match sink.finalize() {
            Ok(meta) => Some(meta),
            Err(e) => {
                error!("failed to finalize recording: {}", e);
                None
            }
        }
    }

    /// Spawn the recognizer-event router, the segment accumulator, and the
    /// segment collector for one recording stretch.
    fn spawn_pipeline(
        &self,
        mut recognizer_events: mpsc::Receiver<RecognizerEvent>,
        meeting_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Pipeline {
        let capacity = self.config.channel_capacity;
        let (partial_tx, partial_rx) = mpsc::channel(capacity);
        let (segment_tx, segment_rx) = mpsc::channel(capacity);

        // Router: split recognizer results from mid-stream failures. A
        // failure degrades transcription but never stops the session; audio
        // capture keeps running.
        let router_shared = Arc::clone(&self.shared);
        let router_events = self.events.clone();
        let router = tokio::spawn(async move {
            while let Some(event) = recognizer_events.recv().await {
                match event {
                    RecognizerEvent::Result(result) => {
                        if partial_tx.send(result).await.is_err() {
                            break;
                        }
                    }
                    RecognizerEvent::Failed(e) => {
                        error!("recognition failed mid-session: {}", e);
                        router_shared.is_transcribing.store(false, Ordering::SeqCst);
                        let _ = router_events.send(SessionEvent::Error(e.to_string()));
                    }
                }
            }
        });

        let accumulator =
            SegmentAccumulator::new(self.config.segmenter_config(), partial_rx, segment_tx);
        let segmenter = tokio::spawn(accumulator.run());

        let collector = tokio::spawn(Self::run_collector(
            segment_rx,
            Arc::clone(&self.shared),
            Arc::clone(&self.store),
            self.events.clone(),
            meeting_id,
            started_at,
            self.config.autosave_segments,
            self.config.autosave_interval,
        ));

        Pipeline {
            router,
            segmenter,
            collector,
        }
    }

    /// Append finalized segments to the buffer and flush to the store on the
    /// autosave policy. A failed save is logged and retried on the next
    /// trigger; it never interrupts the live session.
    #[allow(clippy::too_many_arguments)]
    async fn run_collector(
        mut segments: mpsc::Receiver<TranscriptSegment>,
        shared: Arc<SessionShared>,
        store: Arc<dyn PersistenceGateway>,
        events: broadcast::Sender<SessionEvent>,
        meeting_id: Uuid,
        started_at: DateTime<Utc>,
        autosave_segments: usize,
        autosave_interval: std::time::Duration,
    ) {
        let mut last_save = Instant::now();

        while let Some(segment) = segments.recv().await {
            {
                let mut buffer = shared.buffer.lock().await;
                buffer.push(segment.clone());
                shared.segment_count.store(buffer.len(), Ordering::SeqCst);
            }
            let unsaved = shared.unsaved.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = events.send(SessionEvent::SegmentAdded(segment));

            if unsaved < autosave_segments && last_save.elapsed() < autosave_interval {
                continue;
            }

            let snapshot = shared.buffer.lock().await.clone();
            let count = snapshot.len();
            let mut transcript = MeetingTranscript::new(meeting_id, snapshot);
            transcript.created_at = started_at;

            match store.save_transcript(&transcript).await {
                Ok(()) => {
                    shared.unsaved.store(0, Ordering::SeqCst);
                    last_save = Instant::now();
                    let _ = events.send(SessionEvent::TranscriptSaved { segments: count });
                }
                Err(e) => {
                    warn!("transcript autosave failed, will retry: {}", e);
                    let _ = events.send(SessionEvent::Error(e.to_string()));
                }
            }
        }
    }

    /// Publish the cumulative recording duration once per tick while the
    /// session is live; silent while paused so the value visibly freezes.
    async fn run_ticker(
        shared: Arc<SessionShared>,
        events: broadcast::Sender<SessionEvent>,
        tick: std::time::Duration,
    ) {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        interval.tick().await; // immediate first tick

        while shared.live.load(Ordering::SeqCst) {
            interval.tick().await;
            if !shared.live.load(Ordering::SeqCst) {
                break;
            }

            let stretch_ms = shared
                .resumed_at
                .lock()
                .await
                .map(|t| t.elapsed().as_millis() as u64);

            let Some(stretch_ms) = stretch_ms else {
                continue; // paused: duration stays frozen
            };

            let total = shared.accumulated_ms.load(Ordering::SeqCst) + stretch_ms;
            shared.duration_ms.store(total, Ordering::SeqCst);
            let _ = events.send(SessionEvent::DurationTick {
                secs: total as f64 / 1000.0,
            });
        }
    }
}
