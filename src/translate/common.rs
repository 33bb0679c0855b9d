use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::{api_key_from_env, TranslateConfig};
use crate::error::{AppError, Result};
use super::Translator;

/// Languages offered to API clients, as (code, English name)
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("pt", "Portuguese"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh", "Chinese"),
];

/// Convert a language code to its name for clearer prompts
pub fn language_name(code: &str) -> String {
    let lower = code.to_lowercase();
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| *c == lower)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| code.to_string())
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Translator backed by an OpenAI-compatible `/chat/completions` endpoint
pub struct ChatTranslator {
    client: Client,
    config: TranslateConfig,
    api_key: Option<String>,
}

impl ChatTranslator {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let api_key = api_key_from_env(&config.api_key_env);

        Ok(Self { client, config, api_key })
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }
}

/// Build the translation prompt for one segment
pub fn build_translation_prompt(text: &str, source_language: &str, target_language: &str) -> String {
    let source_name = language_name(source_language);
    let target_name = language_name(target_language);

    format!(
        "You are a professional subtitle translator.\n\
         \n\
         Translate the text below from {} to {} (language code: {}).\n\
         Keep the original context and tone.\n\
         Return ONLY the translation, without explanations, alternatives or quotes.\n\
         \n\
         Text to translate: \"{}\"",
        source_name, target_name, target_language, text
    )
}

const IMPROVE_TEMPERATURE: f32 = 0.4;
const IMPROVE_MAX_TOKENS: u32 = 500;

/// Build the prompt asking for a more natural rewrite of an existing translation
pub fn build_improvement_prompt(original_text: &str, translation: &str, context: &str) -> String {
    let context = match context.trim() {
        "" => "video/audio",
        given => given,
    };

    format!(
        "Improve the following translation, considering the {} context.\n\
         Keep the original meaning, but make the translation more natural and fluent.\n\
         \n\
         Original text: \"{}\"\n\
         Current translation: \"{}\"\n\
         \n\
         Return ONLY the improved translation:",
        context, original_text, translation
    )
}

/// Strip the chatter models sometimes wrap around a translation
pub fn clean_translation_response(response: &str) -> String {
    for line in response.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with("Here is")
            || trimmed.starts_with("Here's")
            || trimmed.starts_with("Translation:")
            || (trimmed.starts_with("**") && trimmed.ends_with("**"))
        {
            continue;
        }

        return strip_quotes(trimmed).to_string();
    }

    String::new()
}

fn strip_quotes(text: &str) -> &str {
    let quoted = text.len() >= 2
        && ((text.starts_with('"') && text.ends_with('"'))
            || (text.starts_with('“') && text.ends_with('”')));
    if quoted {
        let start = text.chars().next().map(char::len_utf8).unwrap_or(0);
        let end = text.chars().last().map(char::len_utf8).unwrap_or(0);
        text[start..text.len() - end].trim()
    } else {
        text
    }
}

impl ChatTranslator {
    /// Send one user prompt and return the raw reply text
    async fn complete(&self, prompt: String, temperature: f32, max_tokens: u32) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::Translation(format!("API key not configured; set {}", self.config.api_key_env))
        })?;

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(self.url())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Translation(format!(
                "Chat completion error {}: {}",
                status, error_text
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Translation(format!("Failed to parse response: {}", e)))?;

        let raw = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        debug!("Raw chat response: {}", raw);
        Ok(raw)
    }
}

#[async_trait]
impl Translator for ChatTranslator {
    async fn translate(&self, text: &str, source_language: &str, target_language: &str) -> Result<String> {
        let prompt = build_translation_prompt(text, source_language, target_language);
        let raw = self
            .complete(prompt, self.config.temperature, self.config.max_tokens)
            .await?;

        let cleaned = clean_translation_response(&raw);
        if cleaned.is_empty() {
            return Err(AppError::Translation("Empty translation received".to_string()));
        }

        Ok(cleaned)
    }

    async fn improve(&self, original_text: &str, translation: &str, context: &str) -> Result<String> {
        let prompt = build_improvement_prompt(original_text, translation, context);
        let raw = self
            .complete(prompt, IMPROVE_TEMPERATURE, IMPROVE_MAX_TOKENS)
            .await?;

        let cleaned = clean_translation_response(&raw);
        if cleaned.is_empty() {
            return Err(AppError::Translation("No improvement received".to_string()));
        }

        Ok(cleaned)
    }

    fn model(&self) -> String {
        self.config.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_name_lookup() {
        assert_eq!(language_name("pt"), "Portuguese");
        assert_eq!(language_name("JA"), "Japanese");
        assert_eq!(language_name("xx"), "xx");
    }

    #[test]
    fn test_prompt_names_both_languages() {
        let prompt = build_translation_prompt("Hello there", "en", "pt");
        assert!(prompt.contains("from English to Portuguese"));
        assert!(prompt.contains("\"Hello there\""));
    }

    #[test]
    fn test_improvement_prompt_defaults_context() {
        let prompt = build_improvement_prompt("Good morning", "Bom manhã", " ");
        assert!(prompt.contains("video/audio context"));
        assert!(prompt.contains("Current translation: \"Bom manhã\""));

        let prompt = build_improvement_prompt("Good morning", "Bom manhã", "cooking show");
        assert!(prompt.contains("cooking show context"));
    }

    #[test]
    fn test_clean_response_skips_preamble() {
        let raw = "Here is the translation:\n\n\"Olá, tudo bem?\"\n";
        assert_eq!(clean_translation_response(raw), "Olá, tudo bem?");
        assert_eq!(clean_translation_response("  Bom dia  "), "Bom dia");
        assert_eq!(clean_translation_response("\n  \n"), "");
    }

    #[test]
    fn test_chat_response_tolerates_missing_content() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#).unwrap();
        assert!(body.choices[0].message.content.is_none());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_translation_error() {
        let config = TranslateConfig {
            api_key_env: "YOUTRANSLATE_TEST_UNSET_TRANSLATE_KEY".to_string(),
            ..TranslateConfig::default()
        };
        let translator = ChatTranslator::new(config).unwrap();
        let result = translator.translate("hi", "en", "pt").await;
        assert!(matches!(result, Err(AppError::Translation(_))));

        let result = translator.improve("hi", "oi", "").await;
        tokio_test::assert_err!(result);
    }
}
