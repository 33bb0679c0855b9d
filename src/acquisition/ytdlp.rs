use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::MediaConfig;
use crate::error::{AppError, Result};
use crate::jobs::VideoInfo;
use crate::media::{discard_files, MediaCommand, MediaLayout, MediaProcessorTrait};
use super::{FetchedMedia, MediaAcquisition, MediaPaths};

static YOUTUBE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:\S*&)?v=|shorts/|embed/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[?&#/]\S*)?$",
    )
    .expect("valid YouTube URL pattern")
});

/// Watch, shorts, embed and youtu.be URL shapes with an 11-character id
pub fn is_youtube_url(url: &str) -> bool {
    YOUTUBE_URL.is_match(url.trim())
}

/// Subset of `yt-dlp --dump-single-json`
#[derive(Debug, Deserialize)]
struct YtDlpMetadata {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl YtDlpMetadata {
    fn into_video_info(self, url: &str) -> VideoInfo {
        VideoInfo {
            id: self.id,
            title: self.title,
            duration: self.duration.map(|d| d.max(0.0).round() as u64).unwrap_or(0),
            thumbnail: self.thumbnail.unwrap_or_default(),
            author: self.uploader.or(self.channel).unwrap_or_default(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            url: url.to_string(),
        }
    }
}

/// yt-dlp for fetching, the media processor for audio normalization
pub struct YtDlpAcquisition {
    downloader_path: String,
    layout: MediaLayout,
    media: Arc<dyn MediaProcessorTrait>,
}

impl YtDlpAcquisition {
    pub fn new(config: &MediaConfig, media: Arc<dyn MediaProcessorTrait>) -> Self {
        Self {
            downloader_path: config.downloader_path.clone(),
            layout: MediaLayout::new(&config.media_root),
            media,
        }
    }

    pub fn layout(&self) -> &MediaLayout {
        &self.layout
    }

    fn metadata_command(&self, url: &str) -> MediaCommand {
        MediaCommand::new(&self.downloader_path, "Metadata lookup")
            .args(["--dump-single-json", "--no-playlist", "--skip-download", "--no-warnings"])
            .arg(url)
    }

    fn fetch_command(&self, url: &str, selector: &str, output: &Path, description: &str) -> MediaCommand {
        MediaCommand::new(&self.downloader_path, description)
            .args(["--no-playlist", "--no-part", "--quiet", "--force-overwrites", "-f", selector, "-o"])
            .output(output)
            .arg(url)
    }
}

#[async_trait]
impl MediaAcquisition for YtDlpAcquisition {
    fn validate_url(&self, url: &str) -> bool {
        is_youtube_url(url)
    }

    async fn fetch_metadata(&self, url: &str) -> Result<VideoInfo> {
        if !is_youtube_url(url) {
            return Err(AppError::InvalidUrl(url.to_string()));
        }

        let output = self.metadata_command(url).execute_capture().await.map_err(|e| {
            let message = e.to_string();
            if message.contains("unavailable") || message.contains("Private video") || message.contains("does not exist") {
                AppError::NotFound(format!("Video not available: {}", url))
            } else {
                AppError::Download(message)
            }
        })?;

        let metadata: YtDlpMetadata = serde_json::from_str(&output)
            .map_err(|e| AppError::Download(format!("Unreadable metadata for {}: {}", url, e)))?;

        Ok(metadata.into_video_info(url))
    }

    async fn fetch_media(&self, url: &str, job_id: &str) -> Result<FetchedMedia> {
        self.layout.ensure_directories().await?;

        let video_path = self.layout.video_path(job_id);
        let raw_audio_path = self.layout.raw_audio_path(job_id);

        let video = self.fetch_command(url, "best[ext=mp4]/best", &video_path, "Video download");
        let audio = self.fetch_command(url, "bestaudio", &raw_audio_path, "Audio download");

        if let Err(e) = tokio::try_join!(video.execute(), audio.execute()) {
            discard_files(&[&video_path, &raw_audio_path]).await;
            return Err(AppError::Download(e.to_string()));
        }

        info!("Fetched media for job {}", job_id);
        Ok(FetchedMedia {
            job_id: job_id.to_string(),
            video_path,
            raw_audio_path,
        })
    }

    async fn normalize_audio(&self, fetched: FetchedMedia) -> Result<MediaPaths> {
        let audio_path = self.layout.audio_path(&fetched.job_id);
        let outcome = self.media.normalize_audio(&fetched.raw_audio_path, &audio_path).await;

        discard_files(&[&fetched.raw_audio_path]).await;

        match outcome {
            Ok(()) => Ok(MediaPaths {
                video_path: fetched.video_path,
                audio_path,
            }),
            Err(e) => {
                warn!("Audio normalization failed for job {}: {}", fetched.job_id, e);
                discard_files(&[&fetched.video_path, &audio_path]).await;
                Err(AppError::Download(format!("Audio normalization failed: {}", e)))
            }
        }
    }
}
