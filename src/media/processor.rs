use async_trait::async_trait;
use std::path::Path;
use tracing::{info, debug};

use crate::config::MediaConfig;
use crate::error::Result;
use super::{MediaProcessorTrait, MediaCommandBuilder, parse_probe_duration};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path, &config.probe_path);

        Self { command_builder }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn normalize_audio(&self, input_path: &Path, audio_path: &Path) -> Result<()> {
        info!("Normalizing audio {} -> {}", input_path.display(), audio_path.display());

        self.command_builder
            .normalize_audio(input_path, audio_path)
            .execute()
            .await?;

        info!("Audio normalization completed");
        Ok(())
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let output = self.command_builder.probe_duration(path).execute_capture().await?;
        let duration = parse_probe_duration(&output)?;

        debug!("Duration of {}: {:.2}s", path.display(), duration);
        Ok(duration)
    }

    async fn extract_segment(
        &self,
        input_path: &Path,
        output_path: &Path,
        start: f64,
        duration: f64,
    ) -> Result<()> {
        debug!(
            "Extracting {:.1}s from {} at {:.1}s into {}",
            duration,
            input_path.display(),
            start,
            output_path.display()
        );

        self.command_builder
            .extract_segment(input_path, output_path, start, duration)
            .execute()
            .await
    }

    async fn get_version_info(&self) -> Result<String> {
        debug!("Getting media processor version information");

        let output = self.command_builder.version_check().execute_capture().await?;
        // The first line carries the version
        let first_line = output.lines().next().unwrap_or("Unknown version");
        Ok(first_line.to_string())
    }
}
