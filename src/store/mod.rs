//! Durable storage for meetings and transcripts
//!
//! The session controller only ever talks to the [`PersistenceGateway`]
//! trait; [`JsonFileStore`] is the on-disk implementation (one JSON file per
//! entity, named by its UUID).

pub mod json;

use crate::error::PersistenceError;
use crate::meeting::{Meeting, MeetingTranscript, TranscriptSegment};
use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

pub use json::JsonFileStore;

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn save_meeting(&self, meeting: &Meeting) -> Result<(), PersistenceError>;

    async fn load_meeting(&self, id: Uuid) -> Result<Option<Meeting>, PersistenceError>;

    /// All stored meetings, most recent first
    async fn list_meetings(&self) -> Result<Vec<Meeting>, PersistenceError>;

    /// Remove a meeting along with its transcript and audio files
    async fn delete_meeting(&self, id: Uuid) -> Result<(), PersistenceError>;

    async fn save_transcript(&self, transcript: &MeetingTranscript) -> Result<(), PersistenceError>;

    async fn load_transcript(
        &self,
        meeting_id: Uuid,
    ) -> Result<Option<MeetingTranscript>, PersistenceError>;

    /// Meetings whose title, description or participants match `query`
    async fn search_meetings(&self, query: &str) -> Result<Vec<Meeting>, PersistenceError>;

    /// Segments across all transcripts whose text matches `query`
    async fn search_transcripts(
        &self,
        query: &str,
    ) -> Result<Vec<TranscriptSegment>, PersistenceError>;

    /// Where the recorded audio for a meeting lives
    fn audio_path(&self, meeting_id: Uuid) -> PathBuf;

    /// Where the transcript JSON for a meeting lives
    fn transcript_path(&self, meeting_id: Uuid) -> PathBuf;
}
