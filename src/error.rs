use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Invalid video URL: {0}")]
    InvalidUrl(String),

    #[error("Video is too long: {duration}s exceeds the {limit}s limit")]
    VideoTooLong { duration: u64, limit: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Transcription service error: {0}")]
    Transcription(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors caused by the caller's input rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InvalidUrl(_) | Self::VideoTooLong { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
