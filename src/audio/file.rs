use super::capture::{AudioCapture, AudioCaptureConfig, AudioFrame};
use super::level::normalized_level;
use crate::error::CaptureError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// How often a paused source re-checks its gate
const PAUSE_POLL_MS: u64 = 20;

/// WAV-file capture source
///
/// Reads a WAV file and delivers it as fixed-size frames at real-time
/// cadence, so the rest of the pipeline behaves exactly as it would with a
/// live device. Used for batch processing and tests.
pub struct WavFileSource {
    path: PathBuf,
    config: AudioCaptureConfig,
    capturing: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    level_tx: watch::Sender<f32>,
    level_rx: watch::Receiver<f32>,
    task: Option<JoinHandle<()>>,
}

impl WavFileSource {
    pub fn new(path: impl AsRef<Path>, config: AudioCaptureConfig) -> Self {
        let (level_tx, level_rx) = watch::channel(0.0);
        Self {
            path: path.as_ref().to_path_buf(),
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            level_tx,
            level_rx,
            task: None,
        }
    }

    fn load_samples(&self) -> Result<(Vec<i16>, u32, u16), CaptureError> {
        let reader = hound::WavReader::open(&self.path)
            .map_err(|e| CaptureError::Device(format!("failed to open {:?}: {}", self.path, e)))?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CaptureError::Device(format!("failed to read samples: {}", e)))?;

        Ok((samples, spec.sample_rate, spec.channels))
    }
}

#[async_trait]
impl AudioCapture for WavFileSource {
    async fn request_access(&self) -> bool {
        // File access stands in for the microphone permission here
        self.path.exists()
    }

    async fn start(&mut self, sink: mpsc::Sender<AudioFrame>) -> Result<(), CaptureError> {
        if self.capturing.load(Ordering::SeqCst) {
            warn!("capture already started");
            return Ok(());
        }

        let (samples, sample_rate, channels) = self.load_samples()?;
        info!(
            "Starting WAV file capture: {:?} ({} samples, {}Hz, {}ch)",
            self.path,
            samples.len(),
            sample_rate,
            channels
        );

        self.capturing.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);

        let capturing = Arc::clone(&self.capturing);
        let paused = Arc::clone(&self.paused);
        let level_tx = self.level_tx.clone();
        let frame_len = self.config.frame_samples * channels as usize;

        let task = tokio::spawn(async move {
            let mut timestamp_ms = 0u64;
            let mut offset = 0usize;

            while offset < samples.len() {
                if !capturing.load(Ordering::SeqCst) {
                    break;
                }

                // Paused: hold position, deliver nothing
                if paused.load(Ordering::SeqCst) {
                    tokio::time::sleep(Duration::from_millis(PAUSE_POLL_MS)).await;
                    continue;
                }

                let end = (offset + frame_len).min(samples.len());
                let frame = AudioFrame {
                    samples: samples[offset..end].to_vec(),
                    sample_rate,
                    channels,
                    timestamp_ms,
                };
                offset = end;

                let frame_ms = frame.duration_ms();
                let _ = level_tx.send(normalized_level(&frame.samples));

                if sink.send(frame).await.is_err() {
                    // Receiver gone, nothing left to deliver to
                    break;
                }

                timestamp_ms += frame_ms;
                tokio::time::sleep(Duration::from_millis(frame_ms)).await;
            }

            capturing.store(false, Ordering::SeqCst);
            let _ = level_tx.send(0.0);
            info!("WAV file capture finished");
        });

        self.task = Some(task);
        Ok(())
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.capturing.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("capture task panicked: {}", e);
            }
        }

        Ok(())
    }

    fn level(&self) -> watch::Receiver<f32> {
        self.level_rx.clone()
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}
