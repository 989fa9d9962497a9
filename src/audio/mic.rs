//! Microphone capture via cpal (feature `microphone`)

use super::capture::{AudioCapture, AudioCaptureConfig, AudioFrame};
use super::level::normalized_level;
use crate::error::CaptureError;
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Live microphone capture source
///
/// The cpal stream is not `Send`, so it lives on a dedicated thread for the
/// duration of the capture; the real-time callback only does format
/// conversion and a `try_send` into the frame channel, never blocking.
pub struct MicrophoneSource {
    config: AudioCaptureConfig,
    capturing: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    level_tx: watch::Sender<f32>,
    level_rx: watch::Receiver<f32>,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl MicrophoneSource {
    pub fn new(config: AudioCaptureConfig) -> Self {
        let (level_tx, level_rx) = watch::channel(0.0);
        Self {
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            level_tx,
            level_rx,
            stop_tx: None,
            thread: None,
        }
    }
}

#[async_trait]
impl AudioCapture for MicrophoneSource {
    async fn request_access(&self) -> bool {
        // cpal exposes no permission API; device presence is the gate
        cpal::default_host().default_input_device().is_some()
    }

    async fn start(&mut self, sink: mpsc::Sender<AudioFrame>) -> Result<(), CaptureError> {
        if self.capturing.load(Ordering::SeqCst) {
            warn!("capture already started");
            return Ok(());
        }

        let capturing = Arc::clone(&self.capturing);
        let paused = Arc::clone(&self.paused);
        let level_tx = self.level_tx.clone();
        let target_rate = self.config.sample_rate;
        let frame_samples = self.config.frame_samples;

        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), CaptureError>>();

        let thread = std::thread::spawn(move || {
            let device = match cpal::default_host().default_input_device() {
                Some(d) => d,
                None => {
                    let _ = ready_tx.send(Err(CaptureError::Device(
                        "no input device available".to_string(),
                    )));
                    return;
                }
            };

            let supported = match device.default_input_config() {
                Ok(c) => c,
                Err(e) => {
                    let _ = ready_tx.send(Err(CaptureError::Device(format!(
                        "failed to query device config: {}",
                        e
                    ))));
                    return;
                }
            };

            let device_rate = supported.sample_rate().0;
            let device_channels = supported.channels() as usize;
            let decimation = if device_rate >= target_rate && device_rate % target_rate == 0 {
                (device_rate / target_rate) as usize
            } else {
                1
            };
            let out_rate = device_rate / decimation as u32;

            info!(
                "Microphone: {}Hz {}ch -> {}Hz mono",
                device_rate, device_channels, out_rate
            );

            let mut pending: Vec<i16> = Vec::with_capacity(frame_samples * 2);
            let delivered = AtomicUsize::new(0);
            let dropped = AtomicUsize::new(0);
            let cb_capturing = Arc::clone(&capturing);
            let cb_paused = Arc::clone(&paused);

            let stream = device.build_input_stream(
                &supported.config(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !cb_capturing.load(Ordering::Relaxed) || cb_paused.load(Ordering::Relaxed) {
                        return;
                    }

                    // Mix interleaved channels down to mono, then decimate
                    for (i, chunk) in data.chunks(device_channels).enumerate() {
                        if i % decimation != 0 {
                            continue;
                        }
                        let mono: f32 = chunk.iter().sum::<f32>() / device_channels as f32;
                        pending.push((mono.clamp(-1.0, 1.0) * i16::MAX as f32) as i16);
                    }

                    while pending.len() >= frame_samples {
                        let samples: Vec<i16> = pending.drain(..frame_samples).collect();
                        let _ = level_tx.send(normalized_level(&samples));

                        let n = delivered.fetch_add(frame_samples, Ordering::Relaxed);
                        let frame = AudioFrame {
                            samples,
                            sample_rate: out_rate,
                            channels: 1,
                            timestamp_ms: n as u64 * 1000 / out_rate as u64,
                        };

                        // Real-time callback: never block on a full channel
                        if sink.try_send(frame).is_err() {
                            let d = dropped.fetch_add(1, Ordering::Relaxed) + 1;
                            if d % 100 == 1 {
                                warn!("frame channel full, {} frames dropped", d);
                            }
                        }
                    }
                },
                |err| warn!("microphone stream error: {}", err),
                None,
            );

            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(CaptureError::Device(format!(
                        "failed to build input stream: {}",
                        e
                    ))));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(CaptureError::Device(format!(
                    "failed to start input stream: {}",
                    e
                ))));
                return;
            }

            let _ = ready_tx.send(Ok(()));

            // Hold the stream alive until stop; the sender half dropping also
            // counts as stop.
            let _ = stop_rx.recv();
            drop(stream);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.capturing.store(true, Ordering::SeqCst);
                self.paused.store(false, Ordering::SeqCst);
                self.stop_tx = Some(stop_tx);
                self.thread = Some(thread);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(CaptureError::Device("capture thread died".to_string()))
            }
        }
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

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = tokio::task::spawn_blocking(move || thread.join()).await;
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
        "microphone"
    }
}
