// OpenAI-compatible speech-to-text client
// Works against any `/audio/transcriptions` endpoint that returns verbose_json
// (Groq, OpenAI, local whisper servers).

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{api_key_from_env, TranscriberConfig};
use crate::error::{AppError, Result};
use super::{TranscriptionResult, TranscriptionService, VerboseTranscription};

pub struct OpenAiTranscriber {
    config: TranscriberConfig,
    client: reqwest::Client,
    api_key: Option<String>,
}

impl OpenAiTranscriber {
    pub fn new(config: TranscriberConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let api_key = api_key_from_env(&config.api_key_env);

        Ok(Self { config, client, api_key })
    }

    fn url(&self) -> String {
        format!("{}/audio/transcriptions", self.config.endpoint.trim_end_matches('/'))
    }

    async fn build_form(&self, audio_path: &Path, language: &str) -> Result<Form> {
        let bytes = tokio::fs::read(audio_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::FileNotFound(audio_path.display().to_string())
            } else {
                AppError::Io(e)
            }
        })?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.wav".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")?;

        Ok(Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("language", language.to_string())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment")
            .text("temperature", self.config.temperature.to_string()))
    }
}

#[async_trait]
impl TranscriptionService for OpenAiTranscriber {
    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<TranscriptionResult> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::Transcription(format!(
                "API key not configured; set {}",
                self.config.api_key_env
            ))
        })?;

        info!("Transcribing {} with {}", audio_path.display(), self.config.model);
        let form = self.build_form(audio_path, language).await?;

        let response = self
            .client
            .post(self.url())
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Transcription(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Transcription(format!(
                "Transcription request failed {}: {}",
                status, error_text
            )));
        }

        let body: VerboseTranscription = response
            .json()
            .await
            .map_err(|e| AppError::Transcription(format!("Failed to parse response: {}", e)))?;

        let result = body.into_result(&self.config.model, language);
        debug!(
            "Received {} segments covering {:.1}s",
            result.segments.len(),
            result.duration
        );
        Ok(result)
    }

    fn model(&self) -> String {
        self.config.model.clone()
    }
}
