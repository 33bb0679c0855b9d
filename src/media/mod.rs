// Media processing and on-disk media layout
//
// - Commands: ffmpeg/ffprobe command builders
// - Processor: FFmpeg-backed implementation of MediaProcessorTrait
// - Layout: job-scoped paths under the media root and stale file purging

pub mod commands;
pub mod layout;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;

#[cfg(test)]
use mockall::automock;

pub use commands::*;
pub use layout::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Main trait for media processing operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Convert an audio input into 16 kHz mono PCM WAV
    async fn normalize_audio(&self, input_path: &Path, audio_path: &Path) -> Result<()>;

    /// Duration of a media file in seconds
    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Cut `duration` seconds starting at `start` into a standalone WAV file
    async fn extract_segment(
        &self,
        input_path: &Path,
        output_path: &Path,
        start: f64,
        duration: f64,
    ) -> Result<()>;

    /// Get media processor version information
    async fn get_version_info(&self) -> Result<String>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::MediaProcessorImpl::new(config))
    }
}
