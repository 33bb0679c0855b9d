use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, AppError};

// Defaults that older config files may not carry
fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub transcriber: TranscriberConfig,
    #[serde(default)]
    pub translate: TranslateConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Operating mode; error bodies carry diagnostic detail outside production
    pub environment: Environment,
    /// Allowed CORS origin
    pub cors_origin: String,
    /// Version segment of the API routes (`/api/<version>`)
    pub api_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Path to ffprobe binary
    pub probe_path: String,
    /// Path to the video downloader binary (yt-dlp)
    pub downloader_path: String,
    /// Root directory for downloaded media; `videos/` and `audio/` live below it
    pub media_root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Base URL of the OpenAI-compatible transcription API
    pub endpoint: String,
    /// Speech recognition model
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Largest audio file sent in a single request, in bytes
    pub max_file_size: u64,
    /// Length of each chunk when a file has to be split, in seconds
    pub chunk_duration_secs: f64,
    /// Decoding temperature
    pub temperature: f32,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Base URL of the OpenAI-compatible chat completions API
    pub endpoint: String,
    /// LLM model to use for translation
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Sampling temperature; low values keep translations literal
    pub temperature: f32,
    /// Upper bound on generated tokens per segment
    pub max_tokens: u32,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Source language used when a request does not name one
    pub default_language: String,
    /// Target language used when a request does not name one
    pub default_target_language: String,
    /// Longest accepted video, in seconds
    pub max_video_duration_secs: u64,
    /// Jobs older than this are swept, in hours
    pub job_max_age_hours: u64,
    /// How often the sweeper runs, in seconds
    pub sweep_interval_secs: u64,
    /// Progress reported at each stage boundary
    #[serde(default)]
    pub progress: ProgressConfig,
}

/// Stage boundaries of the 0..=100 progress scale.
///
/// These are stage-weight assumptions, not derived values; tune them if the
/// relative cost of the stages changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Video and audio fetched; audio extraction begins
    pub media_fetched: u8,
    /// Audio normalized; transcription begins
    pub audio_ready: u8,
    /// Upstream transcription call issued
    pub transcription_issued: u8,
    /// Transcript received; translation begins
    pub transcript_received: u8,
    /// All segments translated; subtitle generation begins
    pub translation_done: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            environment: Environment::Development,
            cors_origin: "http://localhost:3000".to_string(),
            api_version: "v1".to_string(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            probe_path: "ffprobe".to_string(),
            downloader_path: "yt-dlp".to_string(),
            media_root: PathBuf::from("uploads"),
        }
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1".to_string(),
            model: "whisper-large-v3-turbo".to_string(),
            api_key_env: default_api_key_env(),
            max_file_size: 25 * 1024 * 1024,
            chunk_duration_secs: 600.0,
            temperature: 0.0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-8b-8192".to_string(),
            api_key_env: default_api_key_env(),
            temperature: 0.3,
            max_tokens: 1000,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            default_target_language: "pt".to_string(),
            max_video_duration_secs: 1800,
            job_max_age_hours: 24,
            sweep_interval_secs: 3600,
            progress: ProgressConfig::default(),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            media_fetched: 10,
            audio_ready: 30,
            transcription_issued: 50,
            transcript_received: 70,
            translation_done: 90,
        }
    }
}

impl ProgressConfig {
    fn validate(&self) -> Result<()> {
        let marks = [
            self.media_fetched,
            self.audio_ready,
            self.transcription_issued,
            self.transcript_received,
            self.translation_done,
        ];

        let increasing = marks.windows(2).all(|pair| pair[0] < pair[1]);
        if marks[0] == 0 || marks[4] >= 100 || !increasing {
            return Err(AppError::Config(format!(
                "Progress marks must be strictly increasing within 1..=99, got {:?}",
                marks
            )));
        }

        Ok(())
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| AppError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.pipeline.progress.validate()?;

        if self.transcriber.chunk_duration_secs <= 0.0 {
            return Err(AppError::Config("chunk_duration_secs must be positive".to_string()));
        }

        if self.transcriber.max_file_size == 0 {
            return Err(AppError::Config("max_file_size must be positive".to_string()));
        }

        if self.pipeline.sweep_interval_secs == 0 {
            return Err(AppError::Config("sweep_interval_secs must be positive".to_string()));
        }

        Ok(())
    }

    /// Prefix shared by all versioned API routes, e.g. `/api/v1`.
    pub fn api_prefix(&self) -> String {
        format!("/api/{}", self.server.api_version)
    }
}

/// Read an API key from the environment variable named in the config.
pub fn api_key_from_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|key| !key.trim().is_empty())
}
