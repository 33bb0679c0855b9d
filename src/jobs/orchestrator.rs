use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::acquisition::MediaAcquisition;
use crate::config::{PipelineConfig, ProgressConfig};
use crate::error::{AppError, Result};
use crate::media::discard_files;
use crate::quality;
use crate::transcribe::TranscriptionCoordinator;
use crate::translate::{TranslationPipeline, TranslationProgress};
use super::model::{Job, JobStatus, JobUpdate};
use super::store::JobStore;

/// A request to subtitle one video
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    pub url: String,
    pub language: Option<String>,
    pub target_language: Option<String>,
}

/// The created job and the detached task driving it
pub struct SubmittedJob {
    pub job: Job,
    pub task: JoinHandle<()>,
}

#[derive(Debug, Clone)]
struct RunParams {
    url: String,
    language: String,
    target_language: String,
}

/// Drives jobs from download to completed subtitles
pub struct Pipeline {
    store: Arc<JobStore>,
    acquisition: Arc<dyn MediaAcquisition>,
    transcriber: TranscriptionCoordinator,
    translation: TranslationPipeline,
    progress: ProgressConfig,
    max_video_duration: u64,
    default_language: String,
    default_target_language: String,
}

impl Pipeline {
    pub fn new(
        store: Arc<JobStore>,
        acquisition: Arc<dyn MediaAcquisition>,
        transcriber: TranscriptionCoordinator,
        translation: TranslationPipeline,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            store,
            acquisition,
            transcriber,
            translation,
            progress: config.progress,
            max_video_duration: config.max_video_duration_secs,
            default_language: config.default_language.clone(),
            default_target_language: config.default_target_language.clone(),
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn acquisition(&self) -> &Arc<dyn MediaAcquisition> {
        &self.acquisition
    }

    pub fn translation(&self) -> &TranslationPipeline {
        &self.translation
    }

    /// Validate the request, create the job and start processing it in the background.
    ///
    /// Videos longer than the configured limit are rejected before anything is
    /// downloaded.
    pub async fn submit(self: &Arc<Self>, request: ProcessRequest) -> Result<SubmittedJob> {
        let url = request.url.trim();
        if url.is_empty() {
            return Err(AppError::Validation("url is required".to_string()));
        }
        if !self.acquisition.validate_url(url) {
            return Err(AppError::InvalidUrl(url.to_string()));
        }

        let video_info = self.acquisition.fetch_metadata(url).await?;
        if video_info.duration > self.max_video_duration {
            return Err(AppError::VideoTooLong {
                duration: video_info.duration,
                limit: self.max_video_duration,
            });
        }

        let params = RunParams {
            url: url.to_string(),
            language: non_blank(request.language).unwrap_or_else(|| self.default_language.clone()),
            target_language: non_blank(request.target_language)
                .unwrap_or_else(|| self.default_target_language.clone()),
        };

        let job = self.store.create(video_info, &params.language, &params.target_language);
        info!(
            "Submitted job {} ({} -> {}): {}",
            job.id, params.language, params.target_language, job.video_info.title
        );

        let task = self.spawn(job.id.clone(), params);
        Ok(SubmittedJob { job, task })
    }

    /// Run the job on its own task; an error or a panic ends up in the job record
    fn spawn(self: &Arc<Self>, job_id: String, params: RunParams) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);

        tokio::spawn(async move {
            let worker = {
                let pipeline = Arc::clone(&pipeline);
                let job_id = job_id.clone();
                tokio::spawn(async move { pipeline.run(&job_id, &params).await })
            };

            match worker.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => pipeline.fail(&job_id, &e.to_string()),
                Err(e) => pipeline.fail(&job_id, &format!("Processing task failed: {}", e)),
            }
        })
    }

    async fn run(&self, job_id: &str, params: &RunParams) -> Result<()> {
        let marks = self.progress;

        let fetched = self.acquisition.fetch_media(&params.url, job_id).await?;
        let recorded = self.store.update(
            job_id,
            JobUpdate::new()
                .status(JobStatus::ExtractingAudio)
                .progress(marks.media_fetched),
        );
        if !recorded {
            self.abandon(job_id, &[&fetched.video_path, &fetched.raw_audio_path]).await;
            return Ok(());
        }

        let media = self.acquisition.normalize_audio(fetched).await?;
        // once recorded, deleting the job removes these files
        let recorded = self.store.update(
            job_id,
            JobUpdate::new()
                .status(JobStatus::Transcribing)
                .progress(marks.audio_ready)
                .media(media.video_path.clone(), media.audio_path.clone()),
        );
        if !recorded {
            self.abandon(job_id, &[&media.video_path, &media.audio_path]).await;
            return Ok(());
        }

        self.store
            .update(job_id, JobUpdate::new().progress(marks.transcription_issued));
        let transcript = self
            .transcriber
            .transcribe(&media.audio_path, &params.language)
            .await?;

        let report = quality::analyze(&transcript.segments);
        info!(
            "Job {}: {} segments, quality {} (avg |logprob| {:.3}, {} low confidence, {} silent)",
            job_id,
            transcript.segments.len(),
            report.overall_quality.as_str(),
            report.average_confidence,
            report.low_confidence_segments,
            report.silence_detected
        );

        let total = transcript.segments.len();
        let recorded = self.store.update(
            job_id,
            JobUpdate::new()
                .status(JobStatus::Translating)
                .progress(marks.transcript_received)
                .transcription(transcript.clone())
                .segments(0, total),
        );
        if !recorded {
            info!("Job {} was removed during transcription, skipping translation", job_id);
            return Ok(());
        }

        let store = &self.store;
        let mut on_progress = |update: TranslationProgress| {
            store.update(
                job_id,
                JobUpdate::new()
                    .progress(translating_progress(&marks, update.translated, update.total))
                    .segments(update.translated, update.total)
                    .current_segment_text(update.preview),
            );
        };
        let subtitles = self
            .translation
            .translate_segments(
                &transcript.segments,
                &params.language,
                &params.target_language,
                &mut on_progress,
            )
            .await;

        self.store.update(
            job_id,
            JobUpdate::new()
                .status(JobStatus::GeneratingSubtitles)
                .progress(marks.translation_done)
                .segments(total, total),
        );

        self.store.update(
            job_id,
            JobUpdate::new()
                .status(JobStatus::Completed)
                .progress(100)
                .subtitles(subtitles)
                .completed_now(),
        );
        info!("Job {} completed", job_id);
        Ok(())
    }

    /// The job is gone from the store, so nothing else will clean up its files
    async fn abandon(&self, job_id: &str, files: &[&PathBuf]) {
        info!("Job {} was removed while running, discarding its media", job_id);
        discard_files(files).await;
    }

    fn fail(&self, job_id: &str, message: &str) {
        match self.store.get(job_id) {
            Some(job) if job.status.is_terminal() => {
                debug!("Job {} already {}, dropping failure: {}", job_id, job.status, message);
            }
            Some(_) => {
                error!("Job {} failed: {}", job_id, message);
                self.store.update(
                    job_id,
                    JobUpdate::new()
                        .status(JobStatus::Error)
                        .error(message)
                        .completed_now(),
                );
            }
            None => warn!("Job {} failed after deletion: {}", job_id, message),
        }
    }
}

/// Position inside the translating band after `translated` of `total` segments
fn translating_progress(marks: &ProgressConfig, translated: usize, total: usize) -> u8 {
    let start = marks.transcript_received as usize;
    let end = marks.translation_done as usize;
    if total == 0 {
        return marks.transcript_received;
    }

    let value = start + (end - start) * translated.min(total) / total;
    value.min(end - 1) as u8
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{FetchedMedia, MediaPaths, MockMediaAcquisition};
    use crate::jobs::model::sample_video_info;
    use crate::jobs::VideoInfo;
    use crate::media::MockMediaProcessorTrait;
    use crate::transcribe::{AudioSegmenter, MockTranscriptionService, TranscriptSegment, TranscriptionResult};
    use crate::translate::MockTranslator;
    use assert_fs::prelude::*;
    use std::sync::Mutex;

    fn transcript() -> TranscriptionResult {
        TranscriptionResult {
            text: "Hello there. How are you? Goodbye.".to_string(),
            segments: vec![
                TranscriptSegment::new(0, 0.0, 2.0, "Hello there."),
                TranscriptSegment::new(1, 2.0, 4.0, "How are you?"),
                TranscriptSegment::new(2, 4.0, 6.0, "Goodbye."),
            ],
            language: "en".to_string(),
            duration: 6.0,
            model: "test-model".to_string(),
        }
    }

    fn acquisition_with(video_info: VideoInfo, audio_path: PathBuf) -> MockMediaAcquisition {
        let mut acquisition = MockMediaAcquisition::new();
        acquisition
            .expect_validate_url()
            .returning(|url| crate::acquisition::is_youtube_url(url));
        acquisition
            .expect_fetch_metadata()
            .returning(move |_| Ok(video_info.clone()));
        acquisition.expect_fetch_media().returning(|_, job_id| {
            Ok(FetchedMedia {
                job_id: job_id.to_string(),
                video_path: PathBuf::from(format!("/tmp/{}.mp4", job_id)),
                raw_audio_path: PathBuf::from(format!("/tmp/{}_raw.webm", job_id)),
            })
        });
        acquisition.expect_normalize_audio().returning(move |fetched| {
            Ok(MediaPaths {
                video_path: fetched.video_path,
                audio_path: audio_path.clone(),
            })
        });
        acquisition
    }

    fn transcription_service() -> MockTranscriptionService {
        let mut service = MockTranscriptionService::new();
        service.expect_transcribe().returning(|_, _| Ok(transcript()));
        service.expect_model().returning(|| "test-model".to_string());
        service
    }

    fn build(
        acquisition: MockMediaAcquisition,
        service: MockTranscriptionService,
        translator: MockTranslator,
    ) -> Arc<Pipeline> {
        build_with_store(Arc::new(JobStore::new()), acquisition, service, translator)
    }

    fn build_with_store(
        store: Arc<JobStore>,
        acquisition: MockMediaAcquisition,
        service: MockTranscriptionService,
        translator: MockTranslator,
    ) -> Arc<Pipeline> {
        let segmenter = AudioSegmenter::new(Arc::new(MockMediaProcessorTrait::new()), 600.0);
        let coordinator = TranscriptionCoordinator::new(Arc::new(service), segmenter, 25 * 1024 * 1024);
        Arc::new(Pipeline::new(
            store,
            Arc::new(acquisition),
            coordinator,
            TranslationPipeline::new(Arc::new(translator)),
            &PipelineConfig::default(),
        ))
    }

    fn request(target: &str) -> ProcessRequest {
        ProcessRequest {
            url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            language: Some("en".to_string()),
            target_language: Some(target.to_string()),
        }
    }

    fn audio_file() -> (assert_fs::TempDir, PathBuf) {
        let temp = assert_fs::TempDir::new().unwrap();
        let audio = temp.child("job.wav");
        audio.write_binary(&[0u8; 128]).unwrap();
        let path = audio.path().to_path_buf();
        (temp, path)
    }

    #[test]
    fn test_translating_progress_stays_in_band() {
        let marks = ProgressConfig::default();
        assert_eq!(translating_progress(&marks, 0, 4), 70);
        assert_eq!(translating_progress(&marks, 2, 4), 80);
        assert_eq!(translating_progress(&marks, 4, 4), 89);
        assert_eq!(translating_progress(&marks, 0, 0), 70);
    }

    #[tokio::test]
    async fn test_job_runs_to_completion_with_monotonic_progress() {
        let (_temp, audio) = audio_file();
        let seen: Arc<Mutex<Vec<(JobStatus, u8)>>> = Arc::new(Mutex::new(Vec::new()));

        let pipeline_cell: Arc<Mutex<Option<Arc<JobStore>>>> = Arc::new(Mutex::new(None));
        let mut translator = MockTranslator::new();
        {
            let seen = seen.clone();
            let cell = pipeline_cell.clone();
            translator.expect_translate().times(3).returning(move |text, _, _| {
                if let Some(store) = cell.lock().unwrap().as_ref() {
                    let job = store.list(None).remove(0);
                    seen.lock().unwrap().push((job.status, job.progress));
                }
                Ok(format!("[pt] {}", text))
            });
        }

        let pipeline = build(
            acquisition_with(sample_video_info(), audio),
            transcription_service(),
            translator,
        );
        *pipeline_cell.lock().unwrap() = Some(pipeline.store().clone());

        let submitted = tokio_test::assert_ok!(pipeline.submit(request("pt")).await);
        assert_eq!(submitted.job.status, JobStatus::Downloading);
        assert_eq!(submitted.job.progress, 0);
        submitted.task.await.unwrap();

        let job = pipeline.store().get(&submitted.job.id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.error.is_none());
        assert!(job.completed_at.is_some());
        assert!(job.transcription.is_some());
        assert_eq!(job.total_segments, Some(3));
        assert_eq!(job.translated_segments, Some(3));

        let subtitles = job.subtitles.unwrap();
        assert_eq!(subtitles.len(), 3);
        assert_eq!(subtitles[0].translation, "[pt] Hello there.");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|(status, _)| *status == JobStatus::Translating));
        assert!(seen.windows(2).all(|pair| pair[0].1 <= pair[1].1));
        assert!(seen.iter().all(|(_, p)| (70..90).contains(p)));
    }

    #[tokio::test]
    async fn test_same_language_skips_translation() {
        let (_temp, audio) = audio_file();
        let mut translator = MockTranslator::new();
        translator.expect_translate().times(0);

        let pipeline = build(
            acquisition_with(sample_video_info(), audio),
            transcription_service(),
            translator,
        );

        let submitted = pipeline.submit(request("en")).await.unwrap();
        submitted.task.await.unwrap();

        let job = pipeline.store().get(&submitted.job.id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.translated_segments, Some(3));
        assert!(job.subtitles.unwrap().iter().all(|s| s.translation == s.text));
    }

    #[tokio::test]
    async fn test_single_translation_failure_keeps_job_alive() {
        let (_temp, audio) = audio_file();
        let mut translator = MockTranslator::new();
        translator.expect_translate().returning(|text, _, _| {
            if text == "How are you?" {
                Err(AppError::Translation("upstream 500".to_string()))
            } else {
                Ok(format!("[pt] {}", text))
            }
        });

        let pipeline = build(
            acquisition_with(sample_video_info(), audio),
            transcription_service(),
            translator,
        );

        let submitted = pipeline.submit(request("pt")).await.unwrap();
        submitted.task.await.unwrap();

        let job = pipeline.store().get(&submitted.job.id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        let subtitles = job.subtitles.unwrap();
        assert_eq!(subtitles.len(), 3);
        assert_eq!(subtitles[1].translation, "How are you?");
        assert_eq!(subtitles[2].translation, "[pt] Goodbye.");
    }

    #[tokio::test]
    async fn test_transcription_failure_marks_job_error() {
        let (_temp, audio) = audio_file();
        let mut service = MockTranscriptionService::new();
        service
            .expect_transcribe()
            .returning(|_, _| Err(AppError::Transcription("quota exceeded".to_string())));
        service.expect_model().returning(|| "test-model".to_string());

        let pipeline = build(
            acquisition_with(sample_video_info(), audio),
            service,
            MockTranslator::new(),
        );

        let submitted = pipeline.submit(request("pt")).await.unwrap();
        submitted.task.await.unwrap();

        let job = pipeline.store().get(&submitted.job.id).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.error.unwrap().contains("quota exceeded"));
        assert!(job.completed_at.is_some());
        assert!(job.subtitles.is_none());
        assert_eq!(job.progress, 50);
    }

    #[tokio::test]
    async fn test_panicking_task_is_recorded_as_error() {
        let mut acquisition = MockMediaAcquisition::new();
        acquisition.expect_validate_url().returning(|_| true);
        acquisition
            .expect_fetch_metadata()
            .returning(|_| Ok(sample_video_info()));
        acquisition
            .expect_fetch_media()
            .returning(|_, _| panic!("downloader crashed"));

        let pipeline = build(acquisition, MockTranscriptionService::new(), MockTranslator::new());

        let submitted = pipeline.submit(request("pt")).await.unwrap();
        submitted.task.await.unwrap();

        let job = pipeline.store().get(&submitted.job.id).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.error.is_some());
    }

    #[tokio::test]
    async fn test_long_video_rejected_before_download() {
        let mut acquisition = MockMediaAcquisition::new();
        acquisition.expect_validate_url().returning(|_| true);
        acquisition.expect_fetch_metadata().returning(|_| {
            Ok(VideoInfo {
                duration: 2700,
                ..sample_video_info()
            })
        });
        acquisition.expect_fetch_media().times(0);

        let pipeline = build(acquisition, MockTranscriptionService::new(), MockTranslator::new());

        let result = pipeline.submit(request("pt")).await;
        assert!(matches!(
            result,
            Err(AppError::VideoTooLong { duration: 2700, limit: 1800 })
        ));
        assert!(pipeline.store().list(None).is_empty());
    }

    #[tokio::test]
    async fn test_deleted_during_download_discards_media() {
        let temp = assert_fs::TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let store = Arc::new(JobStore::new());

        let mut acquisition = MockMediaAcquisition::new();
        acquisition.expect_validate_url().returning(|_| true);
        acquisition.expect_fetch_metadata().returning(|_| Ok(sample_video_info()));
        {
            let store = store.clone();
            let root = root.clone();
            acquisition.expect_fetch_media().returning(move |_, job_id| {
                let video_path = root.join(format!("{}.mp4", job_id));
                let raw_audio_path = root.join(format!("{}_raw.webm", job_id));
                std::fs::write(&video_path, b"video").unwrap();
                std::fs::write(&raw_audio_path, b"audio").unwrap();
                assert!(store.delete(job_id));
                Ok(FetchedMedia { job_id: job_id.to_string(), video_path, raw_audio_path })
            });
        }
        acquisition.expect_normalize_audio().times(0);

        let mut service = MockTranscriptionService::new();
        service.expect_transcribe().times(0);
        let pipeline = build_with_store(store, acquisition, service, MockTranslator::new());

        let submitted = pipeline.submit(request("pt")).await.unwrap();
        submitted.task.await.unwrap();

        assert!(pipeline.store().get(&submitted.job.id).is_none());
        let left: Vec<_> = std::fs::read_dir(&root).unwrap().collect();
        assert!(left.is_empty(), "files left after delete: {:?}", left);
    }

    #[tokio::test]
    async fn test_deleted_during_normalization_discards_media() {
        let temp = assert_fs::TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let store = Arc::new(JobStore::new());

        let mut acquisition = MockMediaAcquisition::new();
        acquisition.expect_validate_url().returning(|_| true);
        acquisition.expect_fetch_metadata().returning(|_| Ok(sample_video_info()));
        {
            let root = root.clone();
            acquisition.expect_fetch_media().returning(move |_, job_id| {
                let video_path = root.join(format!("{}.mp4", job_id));
                std::fs::write(&video_path, b"video").unwrap();
                Ok(FetchedMedia {
                    job_id: job_id.to_string(),
                    video_path,
                    raw_audio_path: root.join(format!("{}_raw.webm", job_id)),
                })
            });
        }
        {
            let store = store.clone();
            let root = root.clone();
            acquisition.expect_normalize_audio().returning(move |fetched| {
                let audio_path = root.join(format!("{}.wav", fetched.job_id));
                std::fs::write(&audio_path, b"wav").unwrap();
                assert!(store.delete(&fetched.job_id));
                Ok(MediaPaths { video_path: fetched.video_path, audio_path })
            });
        }

        let mut service = MockTranscriptionService::new();
        service.expect_transcribe().times(0);
        let pipeline = build_with_store(store, acquisition, service, MockTranslator::new());

        let submitted = pipeline.submit(request("pt")).await.unwrap();
        submitted.task.await.unwrap();

        let left: Vec<_> = std::fs::read_dir(&root).unwrap().collect();
        assert!(left.is_empty(), "files left after delete: {:?}", left);
    }

    #[tokio::test]
    async fn test_request_validation() {
        let mut acquisition = MockMediaAcquisition::new();
        acquisition
            .expect_validate_url()
            .returning(|url| crate::acquisition::is_youtube_url(url));
        acquisition.expect_fetch_metadata().times(0);

        let pipeline = build(acquisition, MockTranscriptionService::new(), MockTranslator::new());

        let blank = pipeline.submit(ProcessRequest { url: "  ".to_string(), ..Default::default() }).await;
        assert!(matches!(blank, Err(AppError::Validation(_))));

        let invalid = pipeline
            .submit(ProcessRequest { url: "https://vimeo.com/1".to_string(), ..Default::default() })
            .await;
        assert!(matches!(invalid, Err(AppError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_defaults_fill_missing_languages() {
        let (_temp, audio) = audio_file();
        let mut translator = MockTranslator::new();
        translator
            .expect_translate()
            .withf(|_, source, target| source == "en" && target == "pt")
            .returning(|text, _, _| Ok(text.to_uppercase()));

        let pipeline = build(
            acquisition_with(sample_video_info(), audio),
            transcription_service(),
            translator,
        );

        let submitted = pipeline
            .submit(ProcessRequest {
                url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
                language: None,
                target_language: Some(" ".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(submitted.job.language, "en");
        assert_eq!(submitted.job.target_language, "pt");
        submitted.task.await.unwrap();
    }
}
