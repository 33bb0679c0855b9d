use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::error::AppError;
use crate::translate::SUPPORTED_LANGUAGES;
use super::error::ApiError;
use super::AppState;

const MAX_TRANSLATE_CHARS: usize = 5000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateBody {
    #[serde(default)]
    pub text: String,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub original_text: String,
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    pub model: String,
    /// Milliseconds
    pub processing_time: u128,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImproveBody {
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub current_translation: String,
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImproveResponse {
    pub original_text: String,
    pub improved_translation: String,
    pub previous_translation: String,
    pub improvements: Vec<&'static str>,
    pub model: String,
    /// Rough estimate at four characters per token
    pub tokens_used: usize,
    /// Milliseconds
    pub processing_time: u128,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub max_tokens: u32,
    pub recommended: &'static str,
}

/// Chat models the translation endpoint is known to work with
const KNOWN_MODELS: &[(&str, ModelInfo)] = &[
    (
        "llama3-8b-8192",
        ModelInfo {
            name: "Llama 3 8B",
            description: "Fast model for general translation",
            max_tokens: 8192,
            recommended: "translation",
        },
    ),
    (
        "llama3-70b-8192",
        ModelInfo {
            name: "Llama 3 70B",
            description: "Larger model for higher quality",
            max_tokens: 8192,
            recommended: "improvement",
        },
    ),
    (
        "mixtral-8x7b-32768",
        ModelInfo {
            name: "Mixtral 8x7B",
            description: "Versatile model with a long context",
            max_tokens: 32768,
            recommended: "subtitles",
        },
    ),
    (
        "gemma-7b-it",
        ModelInfo {
            name: "Gemma 7B IT",
            description: "Instruction-tuned model",
            max_tokens: 8192,
            recommended: "general",
        },
    ),
];

pub async fn welcome(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.workflow.config();
    Json(json!({
        "message": "Welcome to the YouTranslate API",
        "description": "Video subtitling: transcription, translation and subtitle export",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.environment().as_str(),
        "endpoints": {
            "health": "/health",
            "api": config.api_prefix(),
        },
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "environment": state.environment().as_str(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn api_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "service": "YouTranslate API",
        "status": "running",
        "version": state.workflow.config().server.api_version,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn translate_text(
    State(state): State<AppState>,
    body: Result<Json<TranslateBody>, JsonRejection>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let Json(body) = body?;
    if body.text.trim().is_empty() {
        return Err(state.fail(AppError::Validation("text must not be empty".to_string())));
    }
    if body.text.chars().count() > MAX_TRANSLATE_CHARS {
        return Err(state.fail(AppError::Validation(format!(
            "text must be at most {} characters",
            MAX_TRANSLATE_CHARS
        ))));
    }

    let defaults = &state.workflow.config().pipeline;
    let source_language = body
        .source_language
        .unwrap_or_else(|| defaults.default_language.clone());
    let target_language = body
        .target_language
        .unwrap_or_else(|| defaults.default_target_language.clone());

    let translator = state.workflow.pipeline().translation().translator();
    let started = Instant::now();
    let translated_text = translator
        .translate(&body.text, &source_language, &target_language)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(TranslateResponse {
        original_text: body.text,
        translated_text,
        source_language,
        target_language,
        model: translator.model(),
        processing_time: started.elapsed().as_millis(),
    }))
}

pub async fn improve_translation(
    State(state): State<AppState>,
    body: Result<Json<ImproveBody>, JsonRejection>,
) -> Result<Json<ImproveResponse>, ApiError> {
    let Json(body) = body?;
    if body.original_text.trim().is_empty() {
        return Err(state.fail(AppError::Validation("originalText must not be empty".to_string())));
    }
    if body.current_translation.trim().is_empty() {
        return Err(state.fail(AppError::Validation(
            "currentTranslation must not be empty".to_string(),
        )));
    }

    let context = body.context.unwrap_or_default();
    let translator = state.workflow.pipeline().translation().translator();
    let started = Instant::now();
    let improved_translation = translator
        .improve(&body.original_text, &body.current_translation, &context)
        .await
        .map_err(|e| state.fail(e))?;

    let mut improvements = Vec::new();
    if improved_translation != body.current_translation {
        improvements.push("fluency improved");
        improvements.push("naturalness improved");
        if !context.trim().is_empty() {
            improvements.push("context considered");
        }
    }

    let chars = body.original_text.chars().count()
        + body.current_translation.chars().count()
        + improved_translation.chars().count();

    Ok(Json(ImproveResponse {
        original_text: body.original_text,
        improved_translation,
        previous_translation: body.current_translation,
        improvements,
        model: translator.model(),
        tokens_used: chars.div_ceil(4),
        processing_time: started.elapsed().as_millis(),
    }))
}

pub async fn models(State(state): State<AppState>) -> Json<serde_json::Value> {
    let models: BTreeMap<&str, &ModelInfo> = KNOWN_MODELS.iter().map(|(id, info)| (*id, info)).collect();

    Json(json!({
        "total": models.len(),
        "models": models,
        "default": state.workflow.config().translate.model,
    }))
}

pub async fn languages(State(state): State<AppState>) -> Json<serde_json::Value> {
    let languages: BTreeMap<&str, &str> = SUPPORTED_LANGUAGES.iter().copied().collect();
    let defaults = &state.workflow.config().pipeline;

    Json(json!({
        "total": languages.len(),
        "languages": languages,
        "defaultSource": defaults.default_language,
        "defaultTarget": defaults.default_target_language,
    }))
}
