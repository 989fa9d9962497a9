use super::engine::{PartialResult, RecognizerEvent, TranscriptionEngine};
use crate::audio::AudioFrame;
use crate::error::RecognitionError;
use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Audio frame message published to the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub session_id: String,
    pub sequence: u32,
    /// Base64-encoded little-endian i16 PCM
    pub pcm: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// RFC3339 timestamp
    pub timestamp: String,
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// Transcript message received from the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    pub text: String,
    pub partial: bool,
    pub timestamp: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Remote speech recognition over NATS
///
/// Publishes PCM frames to `audio.frame.<session>` and maps everything the
/// STT service publishes on `stt.text.>` back into [`RecognizerEvent`]s,
/// filtered by session id.
pub struct NatsEngine {
    nats_url: String,
    session_id: String,
    running: Arc<AtomicBool>,
    sequence: Arc<AtomicUsize>,
    client: Option<async_nats::Client>,
    feed_task: Option<JoinHandle<()>>,
    result_task: Option<JoinHandle<()>>,
}

impl NatsEngine {
    pub fn new(nats_url: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            nats_url: nats_url.into(),
            session_id: session_id.into(),
            running: Arc::new(AtomicBool::new(false)),
            sequence: Arc::new(AtomicUsize::new(0)),
            client: None,
            feed_task: None,
            result_task: None,
        }
    }

    fn audio_subject(session_id: &str) -> String {
        format!("audio.frame.{}", session_id)
    }

    async fn publish_frame(
        client: &async_nats::Client,
        session_id: &str,
        sequence: u32,
        frame: Option<&AudioFrame>,
    ) -> anyhow::Result<()> {
        let (pcm_bytes, sample_rate, channels): (Vec<u8>, u32, u16) = match frame {
            Some(frame) => (
                frame.samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
                frame.sample_rate,
                frame.channels,
            ),
            // Empty payload marks the end of the stream
            None => (Vec::new(), 16000, 1),
        };

        let message = AudioFrameMessage {
            session_id: session_id.to_string(),
            sequence,
            pcm: base64::engine::general_purpose::STANDARD.encode(&pcm_bytes),
            sample_rate,
            channels,
            timestamp: Utc::now().to_rfc3339(),
            final_frame: frame.is_none(),
        };

        let payload = serde_json::to_vec(&message)?;
        client
            .publish(Self::audio_subject(session_id), payload.into())
            .await?;

        Ok(())
    }
}

#[async_trait]
impl TranscriptionEngine for NatsEngine {
    async fn request_access(&self) -> bool {
        // Remote engine: no local permission to acquire
        true
    }

    async fn start(
        &mut self,
        mut frames: mpsc::Receiver<AudioFrame>,
        events: mpsc::Sender<RecognizerEvent>,
    ) -> Result<(), RecognitionError> {
        if self.running.load(Ordering::SeqCst) {
            warn!("transcription already in progress");
            return Ok(());
        }

        info!("Connecting to NATS at {}", self.nats_url);
        let client = async_nats::connect(&self.nats_url)
            .await
            .map_err(|e| RecognitionError::RecognizerUnavailable(e.to_string()))?;

        // Subscribe to all transcripts (partial and final); filtering by
        // session_id happens on the message payload.
        let mut subscriber = client
            .subscribe("stt.text.>")
            .await
            .map_err(|e| RecognitionError::RecognizerUnavailable(e.to_string()))?;

        self.running.store(true, Ordering::SeqCst);

        // Feed task: audio frames -> NATS
        let feed_client = client.clone();
        let feed_events = events.clone();
        let feed_running = Arc::clone(&self.running);
        let feed_session = self.session_id.clone();
        let sequence = Arc::clone(&self.sequence);

        let feed_task = tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                if !feed_running.load(Ordering::SeqCst) {
                    break;
                }

                let seq = sequence.fetch_add(1, Ordering::SeqCst) as u32;
                if let Err(e) =
                    Self::publish_frame(&feed_client, &feed_session, seq, Some(&frame)).await
                {
                    warn!("failed to publish audio frame: {}", e);
                    let _ = feed_events
                        .send(RecognizerEvent::Failed(RecognitionError::RecognitionFailed(
                            e.to_string(),
                        )))
                        .await;
                    break;
                }
            }

            // Mark end of stream so the service flushes its final result
            let seq = sequence.load(Ordering::SeqCst) as u32;
            if let Err(e) = Self::publish_frame(&feed_client, &feed_session, seq, None).await {
                warn!("failed to publish final frame marker: {}", e);
            }
        });

        // Result task: NATS transcripts -> recognizer events
        let result_running = Arc::clone(&self.running);
        let result_session = self.session_id.clone();

        let result_task = tokio::spawn(async move {
            let mut last_timestamp: Option<DateTime<Utc>> = None;

            while let Some(msg) = subscriber.next().await {
                if !result_running.load(Ordering::SeqCst) {
                    break;
                }

                let transcript: TranscriptMessage = match serde_json::from_slice(&msg.payload) {
                    Ok(t) => t,
                    Err(e) => {
                        warn!("failed to parse transcript message: {}", e);
                        continue;
                    }
                };

                if transcript.session_id != result_session {
                    continue;
                }

                // Timestamps on delivered results never go backwards
                let parsed = DateTime::parse_from_rfc3339(&transcript.timestamp)
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                let timestamp = match last_timestamp {
                    Some(last) if parsed < last => last,
                    _ => parsed,
                };
                last_timestamp = Some(timestamp);

                let result = PartialResult {
                    text: transcript.text,
                    is_final: !transcript.partial,
                    timestamp,
                    confidence: transcript.confidence,
                };

                if events.send(RecognizerEvent::Result(result)).await.is_err() {
                    break;
                }
            }
        });

        self.client = Some(client);
        self.feed_task = Some(feed_task);
        self.result_task = Some(result_task);

        info!("NATS transcription started for session {}", self.session_id);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), RecognitionError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        info!("Stopping NATS transcription for session {}", self.session_id);

        // Joining the tasks is what guarantees no event is delivered after
        // stop() returns: their event senders are gone once they finish.
        if let Some(task) = self.feed_task.take() {
            task.abort();
            let _ = task.await;
        }
        if let Some(task) = self.result_task.take() {
            task.abort();
            let _ = task.await;
        }

        if let Some(client) = self.client.take() {
            let seq = self.sequence.load(Ordering::SeqCst) as u32;
            if let Err(e) = Self::publish_frame(&client, &self.session_id, seq, None).await {
                warn!("failed to publish final frame marker: {}", e);
            }
        }

        Ok(())
    }

    fn is_transcribing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "nats-stt"
    }
}
