use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use super::{AudioSegmenter, ChunkSpec, TranscriptionResult, TranscriptionService};

/// Transcribes one audio artifact, splitting it when it exceeds the upload limit
pub struct TranscriptionCoordinator {
    service: Arc<dyn TranscriptionService>,
    segmenter: AudioSegmenter,
    max_file_size: u64,
}

impl TranscriptionCoordinator {
    pub fn new(service: Arc<dyn TranscriptionService>, segmenter: AudioSegmenter, max_file_size: u64) -> Self {
        Self { service, segmenter, max_file_size }
    }

    pub fn model(&self) -> String {
        self.service.model()
    }

    pub async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<TranscriptionResult> {
        let metadata = match tokio::fs::metadata(audio_path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::FileNotFound(audio_path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.len() <= self.max_file_size {
            return self
                .service
                .transcribe(audio_path, language)
                .await
                .map_err(wrap_service_error);
        }

        info!(
            "Audio file is {} bytes (limit {}), transcribing in chunks",
            metadata.len(),
            self.max_file_size
        );
        self.transcribe_chunked(audio_path, language).await
    }

    async fn transcribe_chunked(&self, audio_path: &Path, language: &str) -> Result<TranscriptionResult> {
        let total = self
            .segmenter
            .probe_duration(audio_path)
            .await
            .map_err(wrap_service_error)?;
        let chunks = self.segmenter.plan(total);
        let scratch_dir = AudioSegmenter::scratch_dir_for(audio_path);

        tokio::fs::create_dir_all(&scratch_dir).await?;
        let parts = self.transcribe_chunks(audio_path, &scratch_dir, &chunks, language).await;

        if let Err(e) = tokio::fs::remove_dir_all(&scratch_dir).await {
            warn!("Failed to remove chunk directory {}: {}", scratch_dir.display(), e);
        }

        if parts.is_empty() {
            return Err(AppError::Transcription(format!(
                "All {} chunks of {} failed to transcribe",
                chunks.len(),
                audio_path.display()
            )));
        }

        info!("Merging {} of {} transcribed chunks", parts.len(), chunks.len());
        Ok(merge_chunks(parts, &self.model(), language))
    }

    /// Sequentially transcribe every chunk, skipping the ones that fail
    async fn transcribe_chunks(
        &self,
        audio_path: &Path,
        scratch_dir: &Path,
        chunks: &[ChunkSpec],
        language: &str,
    ) -> Vec<(ChunkSpec, TranscriptionResult)> {
        let mut parts = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let chunk_path = match self.segmenter.extract(audio_path, scratch_dir, chunk).await {
                Ok(path) => path,
                Err(e) => {
                    warn!("Skipping chunk {}: extraction failed: {}", chunk.index, e);
                    continue;
                }
            };

            match self.service.transcribe(&chunk_path, language).await {
                Ok(result) => parts.push((*chunk, result)),
                Err(e) => warn!("Skipping chunk {}: transcription failed: {}", chunk.index, e),
            }
        }

        parts
    }
}

/// Merge per-chunk transcripts onto one global timeline.
///
/// Segments shift by their chunk offset, texts join with a single space in
/// chunk order and ids are renumbered chronologically.
pub fn merge_chunks(
    mut parts: Vec<(ChunkSpec, TranscriptionResult)>,
    model: &str,
    language: &str,
) -> TranscriptionResult {
    parts.sort_by_key(|(chunk, _)| chunk.index);

    let mut texts = Vec::with_capacity(parts.len());
    let mut segments = Vec::new();
    let mut duration: f64 = 0.0;
    let mut detected_language = None;

    for (chunk, result) in parts {
        duration = duration.max(result.duration + chunk.offset);
        if detected_language.is_none() && !result.language.is_empty() {
            detected_language = Some(result.language.clone());
        }
        if !result.text.is_empty() {
            texts.push(result.text);
        }
        segments.extend(result.segments.into_iter().map(|seg| seg.offset_by(chunk.offset)));
    }

    for (id, seg) in segments.iter_mut().enumerate() {
        seg.id = id as u32;
    }

    TranscriptionResult {
        text: texts.join(" "),
        segments,
        language: detected_language.unwrap_or_else(|| language.to_string()),
        duration,
        model: model.to_string(),
    }
}

fn wrap_service_error(e: AppError) -> AppError {
    match e {
        AppError::Transcription(_) | AppError::FileNotFound(_) => e,
        other => AppError::Transcription(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockMediaProcessorTrait;
    use crate::transcribe::{MockTranscriptionService, TranscriptSegment};
    use assert_fs::prelude::*;

    fn chunk_result(text: &str, segments: Vec<TranscriptSegment>, duration: f64) -> TranscriptionResult {
        TranscriptionResult {
            text: text.to_string(),
            segments,
            language: "en".to_string(),
            duration,
            model: "test-model".to_string(),
        }
    }

    fn chunk(index: usize) -> ChunkSpec {
        ChunkSpec { index, offset: index as f64 * 600.0, duration: 600.0 }
    }

    #[test]
    fn test_merge_offsets_and_renumbers() {
        let parts = vec![
            (chunk(1), chunk_result("second", vec![TranscriptSegment::new(0, 0.0, 10.0, "second")], 300.0)),
            (
                chunk(0),
                chunk_result(
                    "first part",
                    vec![
                        TranscriptSegment::new(0, 0.0, 5.0, "first"),
                        TranscriptSegment::new(1, 5.0, 12.0, "part"),
                    ],
                    600.0,
                ),
            ),
        ];

        let merged = merge_chunks(parts, "test-model", "en");
        assert_eq!(merged.text, "first part second");
        assert_eq!(merged.duration, 900.0);
        assert_eq!(merged.segments.len(), 3);
        assert_eq!(merged.segments[2].start, 600.0);
        assert_eq!(merged.segments[2].end, 610.0);
        let ids: Vec<u32> = merged.segments.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_missing_file_is_file_not_found() {
        let service = MockTranscriptionService::new();
        let segmenter = AudioSegmenter::new(Arc::new(MockMediaProcessorTrait::new()), 600.0);
        let coordinator = TranscriptionCoordinator::new(Arc::new(service), segmenter, 1024);

        let result = coordinator.transcribe(Path::new("/does/not/exist.wav"), "en").await;
        assert!(matches!(result, Err(AppError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_small_file_is_sent_whole() {
        let temp = assert_fs::TempDir::new().unwrap();
        let audio = temp.child("job.wav");
        audio.write_binary(&[0u8; 16]).unwrap();

        let mut service = MockTranscriptionService::new();
        service
            .expect_transcribe()
            .times(1)
            .returning(|_, _| Ok(chunk_result("hello", vec![TranscriptSegment::new(0, 0.0, 1.0, "hello")], 1.0)));

        let segmenter = AudioSegmenter::new(Arc::new(MockMediaProcessorTrait::new()), 600.0);
        let coordinator = TranscriptionCoordinator::new(Arc::new(service), segmenter, 1024);

        let result = coordinator.transcribe(audio.path(), "en").await.unwrap();
        assert_eq!(result.text, "hello");
    }

    #[tokio::test]
    async fn test_failed_chunk_is_skipped_and_scratch_removed() {
        let temp = assert_fs::TempDir::new().unwrap();
        let audio = temp.child("job.wav");
        audio.write_binary(&[0u8; 64]).unwrap();

        let mut media = MockMediaProcessorTrait::new();
        media.expect_probe_duration().returning(|_| Ok(1500.0));
        media.expect_extract_segment().times(3).returning(|_, out, _, _| {
            std::fs::write(out, b"chunk")?;
            Ok(())
        });

        let mut service = MockTranscriptionService::new();
        service.expect_model().returning(|| "test-model".to_string());
        service.expect_transcribe().times(3).returning(|path, _| {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            match name.as_str() {
                "chunk_000.wav" => Ok(chunk_result("a", vec![TranscriptSegment::new(0, 1.0, 2.0, "a")], 600.0)),
                "chunk_001.wav" => Err(AppError::Transcription("rate limited".to_string())),
                _ => Ok(chunk_result("c", vec![TranscriptSegment::new(0, 3.0, 4.0, "c")], 300.0)),
            }
        });

        let segmenter = AudioSegmenter::new(Arc::new(media), 600.0);
        let coordinator = TranscriptionCoordinator::new(Arc::new(service), segmenter, 32);

        let result = coordinator.transcribe(audio.path(), "en").await.unwrap();
        assert_eq!(result.text, "a c");
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[1].start, 1203.0);
        assert_eq!(result.segments[1].id, 1);
        assert_eq!(result.duration, 1500.0);
        assert!(!temp.path().join("job_chunks").exists());
    }

    #[tokio::test]
    async fn test_all_chunks_failing_is_transcription_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let audio = temp.child("job.wav");
        audio.write_binary(&[0u8; 64]).unwrap();

        let mut media = MockMediaProcessorTrait::new();
        media.expect_probe_duration().returning(|_| Ok(700.0));
        media
            .expect_extract_segment()
            .returning(|_, _, _, _| Err(AppError::Media("ffmpeg failed".to_string())));

        let service = MockTranscriptionService::new();
        let segmenter = AudioSegmenter::new(Arc::new(media), 600.0);
        let coordinator = TranscriptionCoordinator::new(Arc::new(service), segmenter, 32);

        let result = coordinator.transcribe(audio.path(), "en").await;
        assert!(matches!(result, Err(AppError::Transcription(_))));
        assert!(!temp.path().join("job_chunks").exists());
    }
}
