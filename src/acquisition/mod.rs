// Media acquisition
//
// Resolves a video URL into metadata and job-scoped media files. The default
// implementation shells out to yt-dlp and normalizes audio with ffmpeg.

pub mod ytdlp;

use async_trait::async_trait;
use std::path::PathBuf;

#[cfg(test)]
use mockall::automock;

pub use ytdlp::{is_youtube_url, YtDlpAcquisition};

use crate::error::Result;
use crate::jobs::VideoInfo;

/// Video and raw audio as fetched, before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedMedia {
    pub job_id: String,
    pub video_path: PathBuf,
    pub raw_audio_path: PathBuf,
}

/// Final media owned by a job
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPaths {
    pub video_path: PathBuf,
    /// 16 kHz mono PCM WAV
    pub audio_path: PathBuf,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait MediaAcquisition: Send + Sync {
    /// Whether the URL has a supported video URL shape
    fn validate_url(&self, url: &str) -> bool;

    /// Fails with `InvalidUrl` or `NotFound`
    async fn fetch_metadata(&self, url: &str) -> Result<VideoInfo>;

    /// Fetch video and audio concurrently. On failure nothing is left on disk.
    async fn fetch_media(&self, url: &str, job_id: &str) -> Result<FetchedMedia>;

    /// Normalize the raw audio; the raw file is removed whatever the outcome
    async fn normalize_audio(&self, fetched: FetchedMedia) -> Result<MediaPaths>;

    /// Fetch then normalize
    async fn download(&self, url: &str, job_id: &str) -> Result<MediaPaths> {
        let fetched = self.fetch_media(url, job_id).await?;
        self.normalize_audio(fetched).await
    }
}
