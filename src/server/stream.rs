use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::error::ApiError;
use super::AppState;

/// An inclusive byte range inside a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Outcome of interpreting a `Range` header against a file size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// No usable range; serve the whole file
    Full,
    Partial(ByteRange),
    Unsatisfiable,
}

/// Parse a single `bytes=` range, including the open-ended and suffix forms.
///
/// Headers that are not byte ranges, or ask for several ranges, are ignored.
pub fn parse_range(header: Option<&str>, size: u64) -> RangeRequest {
    let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeRequest::Full;
    };
    if spec.contains(',') {
        return RangeRequest::Full;
    }
    let Some((start, end)) = spec.trim().split_once('-') else {
        return RangeRequest::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    if size == 0 {
        return RangeRequest::Unsatisfiable;
    }

    let range = if start.is_empty() {
        // bytes=-N is the last N bytes
        match end.parse::<u64>() {
            Ok(0) | Err(_) => return RangeRequest::Unsatisfiable,
            Ok(suffix) => ByteRange {
                start: size.saturating_sub(suffix),
                end: size - 1,
            },
        }
    } else {
        let Ok(start) = start.parse::<u64>() else {
            return RangeRequest::Unsatisfiable;
        };
        let end = if end.is_empty() {
            size - 1
        } else {
            match end.parse::<u64>() {
                Ok(end) => end.min(size - 1),
                Err(_) => return RangeRequest::Unsatisfiable,
            }
        };
        ByteRange { start, end }
    };

    if range.start >= size || range.start > range.end {
        RangeRequest::Unsatisfiable
    } else {
        RangeRequest::Partial(range)
    }
}

pub async fn stream_video(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let video_path = state
        .workflow
        .store()
        .get(&job_id)
        .and_then(|job| job.video_path)
        .ok_or_else(|| ApiError::not_found(format!("Video for job {} not found", job_id)))?;

    let mut file = match tokio::fs::File::open(&video_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("Video file is no longer on the server"));
        }
        Err(e) => return Err(state.fail(e.into())),
    };
    let size = file.metadata().await.map_err(|e| state.fail(e.into()))?.len();

    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    match parse_range(range_header, size) {
        RangeRequest::Full => {
            debug!("Streaming {} bytes of job {}", size, job_id);
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static("video/mp4")),
                    (header::ACCEPT_RANGES, HeaderValue::from_static("bytes")),
                    (header::CONTENT_LENGTH, HeaderValue::from(size)),
                ],
                Body::from_stream(ReaderStream::new(file)),
            )
                .into_response())
        }
        RangeRequest::Partial(range) => {
            debug!("Streaming bytes {}-{} of job {}", range.start, range.end, job_id);
            file.seek(SeekFrom::Start(range.start))
                .await
                .map_err(|e| state.fail(e.into()))?;
            let content_range = format!("bytes {}-{}/{}", range.start, range.end, size);

            Ok((
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static("video/mp4")),
                    (header::ACCEPT_RANGES, HeaderValue::from_static("bytes")),
                    (header::CONTENT_LENGTH, HeaderValue::from(range.len())),
                ],
                [(header::CONTENT_RANGE, content_range)],
                Body::from_stream(ReaderStream::new(file.take(range.len()))),
            )
                .into_response())
        }
        RangeRequest::Unsatisfiable => Ok((
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"))],
            [(header::CONTENT_RANGE, format!("bytes */{}", size))],
        )
            .into_response()),
    }
}
