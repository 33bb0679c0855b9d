use serde::Serialize;
use std::sync::Arc;

use crate::subtitle::SubtitleSegment;
use crate::transcribe::TranscriptionResult;
use super::model::{JobStatus, VideoInfo};
use super::store::JobStore;

/// Everything a player needs to show a finished job
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoBundle {
    pub video_url: String,
    pub subtitles: Vec<SubtitleSegment>,
    pub video_info: VideoInfo,
    pub transcription: TranscriptionResult,
}

pub struct ResultAssembler {
    store: Arc<JobStore>,
    api_prefix: String,
}

impl ResultAssembler {
    pub fn new(store: Arc<JobStore>, api_prefix: &str) -> Self {
        Self {
            store,
            api_prefix: api_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn stream_url(&self, job_id: &str) -> String {
        format!("{}/video/{}/stream", self.api_prefix, job_id)
    }

    /// The bundle of a completed job with subtitles and a transcript, otherwise `None`
    pub fn get_result(&self, job_id: &str) -> Option<VideoBundle> {
        let job = self.store.get(job_id)?;
        if job.status != JobStatus::Completed {
            return None;
        }

        let subtitles = job.subtitles.filter(|s| !s.is_empty())?;
        let transcription = job.transcription?;

        Some(VideoBundle {
            video_url: self.stream_url(&job.id),
            subtitles,
            video_info: job.video_info,
            transcription,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::model::{sample_video_info, JobUpdate};
    use crate::transcribe::TranscriptSegment;

    fn transcript() -> TranscriptionResult {
        TranscriptionResult {
            text: "hi".to_string(),
            segments: vec![TranscriptSegment::new(0, 0.0, 1.0, "hi")],
            language: "en".to_string(),
            duration: 1.0,
            model: "m".to_string(),
        }
    }

    #[test]
    fn test_result_only_for_completed_jobs() {
        let store = Arc::new(JobStore::new());
        let assembler = ResultAssembler::new(store.clone(), "/api/v1");
        let job = store.create(sample_video_info(), "en", "pt");

        assert!(assembler.get_result(&job.id).is_none());
        assert!(assembler.get_result("missing").is_none());

        store.update(
            &job.id,
            JobUpdate::new()
                .status(JobStatus::Completed)
                .progress(100)
                .transcription(transcript())
                .subtitles(vec![SubtitleSegment::new(0.0, 1.0, "hi", "oi")])
                .completed_now(),
        );

        let bundle = assembler.get_result(&job.id).unwrap();
        assert_eq!(bundle.video_url, format!("/api/v1/video/{}/stream", job.id));
        assert_eq!(bundle.subtitles[0].translation, "oi");

        let again = assembler.get_result(&job.id).unwrap();
        assert_eq!(again.video_url, bundle.video_url);

        let json = serde_json::to_value(&bundle).unwrap();
        assert!(json.get("videoUrl").is_some());
        assert!(json.get("videoInfo").is_some());
    }

    #[test]
    fn test_completed_without_subtitles_has_no_result() {
        let store = Arc::new(JobStore::new());
        let assembler = ResultAssembler::new(store.clone(), "/api/v1/");
        let job = store.create(sample_video_info(), "en", "pt");
        store.update(
            &job.id,
            JobUpdate::new()
                .status(JobStatus::Completed)
                .transcription(transcript())
                .subtitles(Vec::new()),
        );

        assert!(assembler.get_result(&job.id).is_none());
        assert_eq!(assembler.stream_url("x"), "/api/v1/video/x/stream");
    }
}
