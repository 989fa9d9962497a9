// Test doubles for the session pipeline: a capture source that manufactures
// silent frames and an engine that plays back a scripted result stream.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use meeting_scribe::error::{CaptureError, RecognitionError};
use meeting_scribe::{AudioCapture, AudioFrame, PartialResult, RecognizerEvent, TranscriptionEngine};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

/// Shared view into a fake component, cloned out before boxing it
#[derive(Clone, Default)]
pub struct Probe {
    pub started: Arc<AtomicUsize>,
    pub stopped: Arc<AtomicUsize>,
    pub capturing: Arc<AtomicBool>,
    pub frames_sent: Arc<AtomicUsize>,
}

/// Capture source that delivers silent 16kHz mono frames every 10ms
pub struct FakeCapture {
    access: bool,
    probe: Probe,
    paused: Arc<AtomicBool>,
    level_tx: watch::Sender<f32>,
    level_rx: watch::Receiver<f32>,
    task: Option<JoinHandle<()>>,
}

impl FakeCapture {
    pub fn new(access: bool) -> Self {
        let (level_tx, level_rx) = watch::channel(0.0);
        Self {
            access,
            probe: Probe::default(),
            paused: Arc::new(AtomicBool::new(false)),
            level_tx,
            level_rx,
            task: None,
        }
    }

    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }
}

#[async_trait]
impl AudioCapture for FakeCapture {
    async fn request_access(&self) -> bool {
        self.access
    }

    async fn start(&mut self, sink: mpsc::Sender<AudioFrame>) -> Result<(), CaptureError> {
        if self.probe.capturing.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.probe.started.fetch_add(1, Ordering::SeqCst);
        self.probe.capturing.store(true, Ordering::SeqCst);

        let probe = self.probe.clone();
        let paused = Arc::clone(&self.paused);
        let level_tx = self.level_tx.clone();

        self.task = Some(tokio::spawn(async move {
            let mut timestamp_ms = 0u64;
            while probe.capturing.load(Ordering::SeqCst) {
                if !paused.load(Ordering::SeqCst) {
                    let frame = AudioFrame {
                        samples: vec![0i16; 160],
                        sample_rate: 16000,
                        channels: 1,
                        timestamp_ms,
                    };
                    timestamp_ms += 10;
                    let _ = level_tx.send(0.5);
                    if sink.send(frame).await.is_err() {
                        break;
                    }
                    probe.frames_sent.fetch_add(1, Ordering::SeqCst);
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }));

        Ok(())
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.probe.capturing.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.probe.stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn level(&self) -> watch::Receiver<f32> {
        self.level_rx.clone()
    }

    fn is_capturing(&self) -> bool {
        self.probe.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "fake-capture"
    }
}

/// One scripted engine step: wait `delay`, then deliver `event`
pub type ScriptStep = (Duration, RecognizerEvent);

pub fn partial(text: &str) -> RecognizerEvent {
    RecognizerEvent::Result(PartialResult {
        text: text.to_string(),
        is_final: false,
        timestamp: Utc::now(),
        confidence: None,
    })
}

pub fn final_result(text: &str) -> RecognizerEvent {
    RecognizerEvent::Result(PartialResult {
        text: text.to_string(),
        is_final: true,
        timestamp: Utc::now(),
        confidence: None,
    })
}

pub fn failure(reason: &str) -> RecognizerEvent {
    RecognizerEvent::Failed(RecognitionError::RecognitionFailed(reason.to_string()))
}

/// Engine that drains the audio feed and plays back a scripted stream of
/// recognizer events. The script is shared across restarts, so a session
/// that pauses and resumes picks up where it left off.
pub struct ScriptedEngine {
    access: bool,
    script: Arc<Mutex<VecDeque<ScriptStep>>>,
    probe: Probe,
    running: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ScriptedEngine {
    pub fn new(access: bool, script: Vec<ScriptStep>) -> Self {
        Self {
            access,
            script: Arc::new(Mutex::new(script.into())),
            probe: Probe::default(),
            running: Arc::new(AtomicBool::new(false)),
            tasks: Vec::new(),
        }
    }

    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }
}

#[async_trait]
impl TranscriptionEngine for ScriptedEngine {
    async fn request_access(&self) -> bool {
        self.access
    }

    async fn start(
        &mut self,
        mut frames: mpsc::Receiver<AudioFrame>,
        events: mpsc::Sender<RecognizerEvent>,
    ) -> Result<(), RecognitionError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.probe.started.fetch_add(1, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);

        // Drain the audio feed like a real recognizer would
        self.tasks.push(tokio::spawn(async move {
            while frames.recv().await.is_some() {}
        }));

        let script = Arc::clone(&self.script);
        self.tasks.push(tokio::spawn(async move {
            loop {
                let step = script.lock().await.pop_front();
                match step {
                    Some((delay, event)) => {
                        tokio::time::sleep(delay).await;
                        if events.send(event).await.is_err() {
                            return;
                        }
                    }
                    // Script exhausted: stay alive (and keep the event
                    // sender open) until the engine is stopped
                    None => std::future::pending::<()>().await,
                }
            }
        }));

        Ok(())
    }

    async fn stop(&mut self) -> Result<(), RecognitionError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        for task in self.tasks.drain(..) {
            task.abort();
            let _ = task.await;
        }
        self.probe.stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_transcribing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "scripted-engine"
    }
}

/// Engine that grants access but fails to start
pub struct FailingEngine {
    probe: Probe,
}

impl FailingEngine {
    pub fn new() -> Self {
        Self {
            probe: Probe::default(),
        }
    }

    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }
}

#[async_trait]
impl TranscriptionEngine for FailingEngine {
    async fn request_access(&self) -> bool {
        true
    }

    async fn start(
        &mut self,
        _frames: mpsc::Receiver<AudioFrame>,
        _events: mpsc::Sender<RecognizerEvent>,
    ) -> Result<(), RecognitionError> {
        self.probe.started.fetch_add(1, Ordering::SeqCst);
        Err(RecognitionError::RecognizerUnavailable(
            "stt service offline".to_string(),
        ))
    }

    async fn stop(&mut self) -> Result<(), RecognitionError> {
        self.probe.stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_transcribing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "failing-engine"
    }
}

pub fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}
