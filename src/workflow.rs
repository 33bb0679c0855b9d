use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

use crate::acquisition::{MediaAcquisition, YtDlpAcquisition};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::jobs::{Job, JobStatus, JobStore, Pipeline, ProcessRequest, ResultAssembler};
use crate::media::{MediaLayout, MediaProcessorFactory, MediaProcessorTrait};
use crate::subtitle::{write_subtitles, SubtitleFormat};
use crate::transcribe::{AudioSegmenter, OpenAiTranscriber, TranscriptionCoordinator, TranscriptionService};
use crate::translate::{ChatTranslator, TranslationPipeline, Translator};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The wired-up service: store, pipeline and result assembly over shared collaborators
pub struct Workflow {
    config: Config,
    store: Arc<JobStore>,
    pipeline: Arc<Pipeline>,
    results: ResultAssembler,
    media: Arc<dyn MediaProcessorTrait>,
    layout: MediaLayout,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let media: Arc<dyn MediaProcessorTrait> =
            Arc::from(MediaProcessorFactory::create_processor(config.media.clone()));
        let acquisition = Arc::new(YtDlpAcquisition::new(&config.media, media.clone()));
        let transcriber = Arc::new(OpenAiTranscriber::new(config.transcriber.clone())?);
        let translator = Arc::new(ChatTranslator::new(config.translate.clone())?);

        Ok(Self::from_parts(config, media, acquisition, transcriber, translator))
    }

    /// Assemble a workflow around the given collaborators
    pub fn from_parts(
        config: Config,
        media: Arc<dyn MediaProcessorTrait>,
        acquisition: Arc<dyn MediaAcquisition>,
        transcriber: Arc<dyn TranscriptionService>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        let store = Arc::new(JobStore::new());
        let segmenter = AudioSegmenter::new(media.clone(), config.transcriber.chunk_duration_secs);
        let coordinator =
            TranscriptionCoordinator::new(transcriber, segmenter, config.transcriber.max_file_size);

        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            acquisition,
            coordinator,
            TranslationPipeline::new(translator),
            &config.pipeline,
        ));
        let results = ResultAssembler::new(store.clone(), &config.api_prefix());
        let layout = MediaLayout::new(&config.media.media_root);

        Self {
            config,
            store,
            pipeline,
            results,
            media,
            layout,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn results(&self) -> &ResultAssembler {
        &self.results
    }

    pub fn layout(&self) -> &MediaLayout {
        &self.layout
    }

    /// Log the media tool versions; a missing tool is reported, not fatal
    pub async fn check_dependencies(&self) -> bool {
        match self.media.get_version_info().await {
            Ok(version) => {
                info!("Media processor: {}", version);
                true
            }
            Err(e) => {
                warn!("Media processor unavailable: {}", e);
                false
            }
        }
    }

    /// Run one job in-process, showing progress, then write its subtitles as SRT.
    ///
    /// Returns the path of the written subtitle file.
    pub async fn process_url<P: AsRef<Path>>(&self, request: ProcessRequest, output_dir: P) -> Result<PathBuf> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir).await?;

        let submitted = self.pipeline.submit(request).await?;
        let job_id = submitted.job.id.clone();
        info!("Processing \"{}\" as job {}", submitted.job.video_info.title, job_id);

        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
                .map_err(|e| AppError::Internal(format!("Invalid progress template: {}", e)))?
                .progress_chars("#>-"),
        );

        let job = loop {
            let Some(job) = self.store.get(&job_id) else {
                pb.abandon_with_message("job disappeared");
                return Err(AppError::NotFound(job_id));
            };

            pb.set_position(job.progress as u64);
            pb.set_message(progress_message(&job));

            if job.status.is_terminal() {
                break job;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        };

        if let Err(e) = submitted.task.await {
            warn!("Processing task for job {} ended abnormally: {}", job_id, e);
        }

        if job.status == JobStatus::Error {
            pb.abandon_with_message("failed");
            return Err(AppError::Internal(
                job.error.unwrap_or_else(|| "processing failed".to_string()),
            ));
        }
        pb.finish_with_message("done");

        let subtitles = job.subtitles.unwrap_or_default();
        let srt_path = output_dir.join(format!("{}_{}.srt", job.video_info.id, job.target_language));
        write_subtitles(&subtitles, SubtitleFormat::Srt, true, &srt_path).await?;

        info!("Wrote {} subtitles to {}", subtitles.len(), srt_path.display());
        Ok(srt_path)
    }
}

fn progress_message(job: &Job) -> String {
    match (job.status, job.translated_segments, job.total_segments) {
        (JobStatus::Translating, Some(done), Some(total)) => {
            format!("{} {}/{}", job.status, done, total)
        }
        _ => job.status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{FetchedMedia, MediaPaths, MockMediaAcquisition};
    use crate::jobs::model::sample_video_info;
    use crate::media::MockMediaProcessorTrait;
    use crate::transcribe::{MockTranscriptionService, TranscriptSegment, TranscriptionResult};
    use crate::translate::MockTranslator;

    #[tokio::test]
    async fn test_process_url_writes_srt() {
        let temp = tempfile::tempdir().unwrap();
        let audio = temp.path().join("job.wav");
        std::fs::write(&audio, [0u8; 64]).unwrap();

        let mut acquisition = MockMediaAcquisition::new();
        acquisition.expect_validate_url().returning(|_| true);
        acquisition.expect_fetch_metadata().returning(|_| Ok(sample_video_info()));
        acquisition.expect_fetch_media().returning(|_, id| {
            Ok(FetchedMedia {
                job_id: id.to_string(),
                video_path: PathBuf::from("/tmp/none.mp4"),
                raw_audio_path: PathBuf::from("/tmp/none.webm"),
            })
        });
        acquisition.expect_normalize_audio().returning(move |fetched| {
            Ok(MediaPaths { video_path: fetched.video_path, audio_path: audio.clone() })
        });

        let mut service = MockTranscriptionService::new();
        service.expect_transcribe().returning(|_, _| {
            Ok(TranscriptionResult {
                text: "Hello".to_string(),
                segments: vec![TranscriptSegment::new(0, 0.0, 1.5, "Hello")],
                language: "en".to_string(),
                duration: 1.5,
                model: "m".to_string(),
            })
        });
        service.expect_model().returning(|| "m".to_string());

        let mut translator = MockTranslator::new();
        translator.expect_translate().returning(|_, _, _| Ok("Olá".to_string()));

        let workflow = Workflow::from_parts(
            Config::default(),
            Arc::new(MockMediaProcessorTrait::new()),
            Arc::new(acquisition),
            Arc::new(service),
            Arc::new(translator),
        );

        let out = temp.path().join("out");
        let srt = workflow
            .process_url(
                ProcessRequest {
                    url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
                    language: None,
                    target_language: None,
                },
                &out,
            )
            .await
            .unwrap();

        assert_eq!(srt, out.join("dQw4w9WgXcQ_pt.srt"));
        let content = std::fs::read_to_string(srt).unwrap();
        assert!(content.contains("00:00:00,000 --> 00:00:01,500\nOlá\nHello"));
    }
}
