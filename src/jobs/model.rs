use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::AppError;
use crate::subtitle::SubtitleSegment;
use crate::transcribe::TranscriptionResult;

/// Metadata of the source video, as reported by the downloader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    /// Seconds
    pub duration: u64,
    pub thumbnail: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
}

/// Pipeline stage of a job, declared in forward order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Downloading,
    ExtractingAudio,
    Transcribing,
    Translating,
    GeneratingSubtitles,
    Completed,
    Error,
}

impl JobStatus {
    pub const ALL: [JobStatus; 7] = [
        Self::Downloading,
        Self::ExtractingAudio,
        Self::Transcribing,
        Self::Translating,
        Self::GeneratingSubtitles,
        Self::Completed,
        Self::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Downloading => "downloading",
            Self::ExtractingAudio => "extracting_audio",
            Self::Transcribing => "transcribing",
            Self::Translating => "translating",
            Self::GeneratingSubtitles => "generating_subtitles",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Forward stage order, or a jump to `error` from any non-terminal state
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Self::Error || next >= *self
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown job status: {}", s)))
    }
}

/// One end-to-end request to subtitle a single video
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub video_info: VideoInfo,
    pub status: JobStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub language: String,
    pub target_language: String,
    pub video_path: Option<PathBuf>,
    pub audio_path: Option<PathBuf>,
    pub transcription: Option<TranscriptionResult>,
    pub subtitles: Option<Vec<SubtitleSegment>>,
    pub total_segments: Option<usize>,
    pub translated_segments: Option<usize>,
    pub current_segment_text: Option<String>,
    pub error: Option<String>,
}

impl Job {
    pub fn new(id: String, video_info: VideoInfo, language: &str, target_language: &str) -> Self {
        Self {
            id,
            video_info,
            status: JobStatus::Downloading,
            progress: 0,
            created_at: Utc::now(),
            completed_at: None,
            language: language.to_string(),
            target_language: target_language.to_string(),
            video_path: None,
            audio_path: None,
            transcription: None,
            subtitles: None,
            total_segments: None,
            translated_segments: None,
            current_segment_text: None,
            error: None,
        }
    }

    /// Media files owned by this job
    pub fn owned_files(&self) -> Vec<PathBuf> {
        self.video_path
            .iter()
            .chain(self.audio_path.iter())
            .cloned()
            .collect()
    }

    /// Seconds between creation and completion
    pub fn processing_seconds(&self) -> Option<f64> {
        self.completed_at
            .map(|done| (done - self.created_at).num_milliseconds() as f64 / 1000.0)
    }
}

/// Partial update merged into a job; unset fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub completed_at: Option<DateTime<Utc>>,
    pub video_path: Option<PathBuf>,
    pub audio_path: Option<PathBuf>,
    pub transcription: Option<TranscriptionResult>,
    pub subtitles: Option<Vec<SubtitleSegment>>,
    pub total_segments: Option<usize>,
    pub translated_segments: Option<usize>,
    pub current_segment_text: Option<String>,
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn completed_now(mut self) -> Self {
        self.completed_at = Some(Utc::now());
        self
    }

    pub fn media(mut self, video_path: PathBuf, audio_path: PathBuf) -> Self {
        self.video_path = Some(video_path);
        self.audio_path = Some(audio_path);
        self
    }

    pub fn transcription(mut self, transcription: TranscriptionResult) -> Self {
        self.transcription = Some(transcription);
        self
    }

    pub fn subtitles(mut self, subtitles: Vec<SubtitleSegment>) -> Self {
        self.subtitles = Some(subtitles);
        self
    }

    pub fn segments(mut self, translated: usize, total: usize) -> Self {
        self.translated_segments = Some(translated);
        self.total_segments = Some(total);
        self
    }

    pub fn current_segment_text<S: Into<String>>(mut self, text: S) -> Self {
        self.current_segment_text = Some(text.into());
        self
    }

    pub fn error<S: Into<String>>(mut self, error: S) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Merge into `job`. Progress never moves backwards.
    pub fn apply(self, job: &mut Job) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(progress) = self.progress {
            job.progress = job.progress.max(progress.min(100));
        }
        if let Some(completed_at) = self.completed_at {
            job.completed_at = Some(completed_at);
        }
        if let Some(path) = self.video_path {
            job.video_path = Some(path);
        }
        if let Some(path) = self.audio_path {
            job.audio_path = Some(path);
        }
        if let Some(transcription) = self.transcription {
            job.transcription = Some(transcription);
        }
        if let Some(subtitles) = self.subtitles {
            job.subtitles = Some(subtitles);
        }
        if let Some(total) = self.total_segments {
            job.total_segments = Some(total);
        }
        if let Some(translated) = self.translated_segments {
            job.translated_segments = Some(translated);
        }
        if let Some(text) = self.current_segment_text {
            job.current_segment_text = Some(text);
        }
        if let Some(error) = self.error {
            job.error = Some(error);
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_video_info() -> VideoInfo {
    VideoInfo {
        id: "dQw4w9WgXcQ".to_string(),
        title: "Sample".to_string(),
        duration: 212,
        thumbnail: "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string(),
        author: "Channel".to_string(),
        description: None,
        url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_order_and_transitions() {
        assert!(JobStatus::Downloading < JobStatus::Translating);
        assert!(JobStatus::Transcribing.can_transition_to(JobStatus::Translating));
        assert!(JobStatus::Transcribing.can_transition_to(JobStatus::Error));
        assert!(!JobStatus::Translating.can_transition_to(JobStatus::Downloading));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Error));
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in JobStatus::ALL {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert_eq!(
            serde_json::to_string(&JobStatus::GeneratingSubtitles).unwrap(),
            "\"generating_subtitles\""
        );
        assert!("pending".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_update_merges_only_set_fields() {
        let mut job = Job::new("id".to_string(), sample_video_info(), "en", "pt");
        JobUpdate::new().status(JobStatus::Transcribing).progress(30).apply(&mut job);
        JobUpdate::new().current_segment_text("hi").apply(&mut job);

        assert_eq!(job.status, JobStatus::Transcribing);
        assert_eq!(job.progress, 30);
        assert_eq!(job.current_segment_text.as_deref(), Some("hi"));
        assert!(job.error.is_none());

        JobUpdate::new().progress(10).apply(&mut job);
        assert_eq!(job.progress, 30);
    }

    #[test]
    fn test_video_info_is_camel_case() {
        let json = serde_json::to_value(sample_video_info()).unwrap();
        assert_eq!(json["duration"], 212);
        assert!(json.get("description").is_none());
    }
}
