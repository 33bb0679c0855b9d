use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::error::AppError;
use crate::jobs::{Job, JobStats, JobStatus, ProcessRequest, VideoBundle, VideoInfo};
use crate::subtitle::SubtitleFormat;
use super::error::ApiError;
use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessBody {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub target_language: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub job_id: String,
    pub status: &'static str,
    pub message: String,
    pub video_info: VideoInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_segments: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_segments: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_segment_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<VideoBundle>,
}

/// Job listing entry without paths, transcript or subtitles
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: String,
    pub video_info: VideoInfo,
    pub status: JobStatus,
    pub progress: u8,
    pub language: String,
    pub target_language: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Job> for JobSummary {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            video_info: job.video_info,
            status: job.status,
            progress: job.progress,
            language: job.language,
            target_language: job.target_language,
            created_at: job.created_at,
            completed_at: job.completed_at,
            error: job.error,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobSummary>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubtitleQuery {
    pub format: Option<String>,
    pub bilingual: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateBody {
    #[serde(default)]
    pub url: Option<String>,
}

pub async fn process_video(
    State(state): State<AppState>,
    body: Result<Json<ProcessBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ProcessResponse>), ApiError> {
    let Json(body) = body?;
    let request = ProcessRequest {
        url: body.url.unwrap_or_default(),
        language: body.language,
        target_language: body.target_language,
    };

    let submitted = state
        .workflow
        .pipeline()
        .submit(request)
        .await
        .map_err(|e| state.fail(e))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ProcessResponse {
            job_id: submitted.job.id,
            status: "processing",
            message: "Processing started".to_string(),
            video_info: submitted.job.video_info,
        }),
    ))
}

pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job = state
        .workflow
        .store()
        .get(&job_id)
        .ok_or_else(|| ApiError::not_found(format!("Job {} not found", job_id)))?;

    let result = match job.status {
        JobStatus::Completed => state.workflow.results().get_result(&job.id),
        _ => None,
    };
    let message = match job.status {
        JobStatus::Error => job.error.clone(),
        _ => None,
    };

    Ok(Json(JobStatusResponse {
        job_id: job.id,
        status: job.status,
        progress: job.progress,
        message,
        error: job.error,
        total_segments: job.total_segments,
        translated_segments: job.translated_segments,
        current_segment_text: job.current_segment_text,
        result,
    }))
}

pub async fn job_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<VideoBundle>, ApiError> {
    state
        .workflow
        .results()
        .get_result(&job_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Result not found or not ready yet"))
}

pub async fn job_subtitles(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<SubtitleQuery>,
) -> Result<Response, ApiError> {
    let format: SubtitleFormat = query
        .format
        .as_deref()
        .unwrap_or("srt")
        .parse()
        .map_err(|e| state.fail(e))?;

    let bundle = state
        .workflow
        .results()
        .get_result(&job_id)
        .ok_or_else(|| ApiError::not_found("Subtitles not found or not ready yet"))?;
    let target = state
        .workflow
        .store()
        .get(&job_id)
        .map(|job| job.target_language)
        .unwrap_or_default();

    let content = format.render(&bundle.subtitles, query.bilingual.unwrap_or(true));
    let disposition = format!(
        "attachment; filename=\"{}_{}.{}\"",
        bundle.video_info.id,
        target,
        format.extension()
    );

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<JobListResponse>, ApiError> {
    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(raw.parse::<JobStatus>().map_err(|e| state.fail(e))?),
        None => None,
    };

    let jobs: Vec<JobSummary> = state
        .workflow
        .store()
        .list(status)
        .into_iter()
        .map(JobSummary::from)
        .collect();

    Ok(Json(JobListResponse {
        total: jobs.len(),
        jobs,
    }))
}

pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // removing media files blocks
    let store = state.workflow.store().clone();
    let id = job_id.clone();
    let deleted = tokio::task::spawn_blocking(move || store.delete(&id))
        .await
        .map_err(|e| state.fail(AppError::Internal(format!("Delete task failed: {}", e))))?;
    if !deleted {
        return Err(ApiError::not_found(format!("Job {} not found", job_id)));
    }

    info!("Job {} deleted via API", job_id);
    Ok(Json(json!({
        "message": "Job deleted",
        "jobId": job_id,
    })))
}

pub async fn job_stats(State(state): State<AppState>) -> Json<JobStats> {
    Json(state.workflow.store().stats())
}

/// Always 200; the outcome is in the `valid` flag
pub async fn validate_url(
    State(state): State<AppState>,
    body: Result<Json<ValidateBody>, JsonRejection>,
) -> Json<serde_json::Value> {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            return Json(json!({ "valid": false, "error": rejection.body_text() }));
        }
    };
    let url = body.url.unwrap_or_default();
    let url = url.trim();

    if url.is_empty() {
        return Json(json!({ "valid": false, "error": "url is required" }));
    }

    let acquisition = state.workflow.pipeline().acquisition();
    if !acquisition.validate_url(url) {
        return Json(json!({ "valid": false, "error": "Invalid video URL" }));
    }

    match acquisition.fetch_metadata(url).await {
        Ok(video_info) => Json(json!({ "valid": true, "videoInfo": video_info })),
        Err(e) => {
            warn!("Metadata lookup failed during validation of {}: {}", url, e);
            let error = match e {
                AppError::NotFound(_) => "Video not found".to_string(),
                _ => "Could not fetch video information".to_string(),
            };
            Json(json!({ "valid": false, "error": error }))
        }
    }
}
