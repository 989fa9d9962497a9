use super::PersistenceGateway;
use crate::error::PersistenceError;
use crate::meeting::{Meeting, MeetingTranscript, TranscriptSegment};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// JSON-file store rooted at a single directory
///
/// Layout:
/// ```text
/// <root>/meetings/<uuid>.json
/// <root>/transcripts/<uuid>.json
/// <root>/audio/<uuid>.wav
/// ```
pub struct JsonFileStore {
    meetings_dir: PathBuf,
    transcripts_dir: PathBuf,
    audio_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let root = root.as_ref();
        let store = Self {
            meetings_dir: root.join("meetings"),
            transcripts_dir: root.join("transcripts"),
            audio_dir: root.join("audio"),
        };

        for dir in [&store.meetings_dir, &store.transcripts_dir, &store.audio_dir] {
            fs::create_dir_all(dir)?;
        }

        info!("Meeting store at {:?}", root);
        Ok(store)
    }

    fn meeting_path(&self, id: Uuid) -> PathBuf {
        self.meetings_dir.join(format!("{}.json", id))
    }

    fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
        let data = serde_json::to_vec_pretty(value)?;
        fs::write(path, data)?;
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(
        path: &Path,
    ) -> Result<Option<T>, PersistenceError> {
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(path)?;
        Ok(Some(serde_json::from_slice(&data)?))
    }
}

#[async_trait]
impl PersistenceGateway for JsonFileStore {
    async fn save_meeting(&self, meeting: &Meeting) -> Result<(), PersistenceError> {
        Self::write_json(&self.meeting_path(meeting.id), meeting)?;
        debug!("saved meeting {} ({})", meeting.id, meeting.title);
        Ok(())
    }

    async fn load_meeting(&self, id: Uuid) -> Result<Option<Meeting>, PersistenceError> {
        Self::read_json(&self.meeting_path(id))
    }

    async fn list_meetings(&self) -> Result<Vec<Meeting>, PersistenceError> {
        let mut meetings = Vec::new();

        for entry in fs::read_dir(&self.meetings_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            // One bad file must not hide the rest of the history
            match Self::read_json::<Meeting>(&path) {
                Ok(Some(meeting)) => meetings.push(meeting),
                Ok(None) => {}
                Err(e) => warn!("skipping unreadable meeting file {:?}: {}", path, e),
            }
        }

        meetings.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(meetings)
    }

    async fn delete_meeting(&self, id: Uuid) -> Result<(), PersistenceError> {
        let meeting_path = self.meeting_path(id);
        if meeting_path.exists() {
            fs::remove_file(&meeting_path)?;
        }

        let transcript_path = self.transcript_path(id);
        if transcript_path.exists() {
            fs::remove_file(&transcript_path)?;
        }

        let audio_path = self.audio_path(id);
        if audio_path.exists() {
            fs::remove_file(&audio_path)?;
        }

        info!("deleted meeting {}", id);
        Ok(())
    }

    async fn save_transcript(&self, transcript: &MeetingTranscript) -> Result<(), PersistenceError> {
        Self::write_json(&self.transcript_path(transcript.meeting_id), transcript)?;
        debug!(
            "saved transcript for {} ({} segments)",
            transcript.meeting_id,
            transcript.segments.len()
        );
        Ok(())
    }

    async fn load_transcript(
        &self,
        meeting_id: Uuid,
    ) -> Result<Option<MeetingTranscript>, PersistenceError> {
        Self::read_json(&self.transcript_path(meeting_id))
    }

    async fn search_meetings(&self, query: &str) -> Result<Vec<Meeting>, PersistenceError> {
        let needle = query.to_lowercase();
        let meetings = self.list_meetings().await?;

        Ok(meetings
            .into_iter()
            .filter(|m| {
                m.title.to_lowercase().contains(&needle)
                    || m.description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
                    || m.participants
                        .iter()
                        .any(|p| p.to_lowercase().contains(&needle))
            })
            .collect())
    }

    async fn search_transcripts(
        &self,
        query: &str,
    ) -> Result<Vec<TranscriptSegment>, PersistenceError> {
        let needle = query.to_lowercase();
        let mut hits = Vec::new();

        for entry in fs::read_dir(&self.transcripts_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match Self::read_json::<MeetingTranscript>(&path) {
                Ok(Some(transcript)) => {
                    hits.extend(
                        transcript
                            .segments
                            .into_iter()
                            .filter(|s| s.text.to_lowercase().contains(&needle)),
                    );
                }
                Ok(None) => {}
                Err(e) => warn!("skipping unreadable transcript file {:?}: {}", path, e),
            }
        }

        hits.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(hits)
    }

    fn audio_path(&self, meeting_id: Uuid) -> PathBuf {
        self.audio_dir.join(format!("{}.wav", meeting_id))
    }

    fn transcript_path(&self, meeting_id: Uuid) -> PathBuf {
        self.transcripts_dir.join(format!("{}.json", meeting_id))
    }
}
