use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, error};

use crate::config::Environment;
use crate::error::AppError;

/// JSON error body returned by every route
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new<E: Into<String>, M: Into<String>>(status: StatusCode, error: E, message: M) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                message: message.into(),
                detail: None,
            },
        }
    }

    pub fn not_found<M: Into<String>>(message: M) -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found", message)
    }

    /// Map a service error; the debug rendering is attached outside production
    pub fn from_app_error(e: AppError, environment: Environment) -> Self {
        let (status, label) = match &e {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
            AppError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "Invalid video URL"),
            AppError::VideoTooLong { .. } => (StatusCode::BAD_REQUEST, "Video too long"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        if e.is_client_error() {
            debug!("Rejected request: {}", e);
        } else if status.is_server_error() {
            error!("Request failed: {:?}", e);
        }

        let mut api_error = Self::new(status, label, e.to_string());
        if environment != Environment::Production {
            api_error.body.detail = Some(format!("{:?}", e));
        }
        api_error
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid request body", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
