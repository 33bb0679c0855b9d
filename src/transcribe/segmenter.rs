use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::media::MediaProcessorTrait;

/// One fixed-length window of the source audio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkSpec {
    pub index: usize,
    /// Start of the chunk on the source timeline, in seconds
    pub offset: f64,
    pub duration: f64,
}

/// Splits long audio into chunks small enough for a single upstream call
pub struct AudioSegmenter {
    media: Arc<dyn MediaProcessorTrait>,
    chunk_duration: f64,
}

impl AudioSegmenter {
    pub fn new(media: Arc<dyn MediaProcessorTrait>, chunk_duration: f64) -> Self {
        Self { media, chunk_duration }
    }

    pub async fn probe_duration(&self, audio_path: &Path) -> Result<f64> {
        self.media.probe_duration(audio_path).await
    }

    /// Chunk k starts at k * chunk_duration; the last one is clipped to the end
    pub fn plan(&self, total_duration: f64) -> Vec<ChunkSpec> {
        if total_duration <= 0.0 || self.chunk_duration <= 0.0 {
            return Vec::new();
        }

        let count = (total_duration / self.chunk_duration).ceil() as usize;
        (0..count)
            .map(|index| {
                let offset = index as f64 * self.chunk_duration;
                ChunkSpec {
                    index,
                    offset,
                    duration: self.chunk_duration.min(total_duration - offset),
                }
            })
            .collect()
    }

    /// Per-job scratch directory next to the audio file
    pub fn scratch_dir_for(audio_path: &Path) -> PathBuf {
        let stem = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        let parent = audio_path.parent().unwrap_or_else(|| Path::new("."));
        parent.join(format!("{}_chunks", stem))
    }

    pub async fn extract(&self, audio_path: &Path, scratch_dir: &Path, chunk: &ChunkSpec) -> Result<PathBuf> {
        let output = scratch_dir.join(format!("chunk_{:03}.wav", chunk.index));
        debug!("Extracting chunk {} ({:.1}s @ {:.1}s)", chunk.index, chunk.duration, chunk.offset);

        self.media
            .extract_segment(audio_path, &output, chunk.offset, chunk.duration)
            .await?;
        Ok(output)
    }
}
