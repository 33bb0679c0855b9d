// Translation architecture
//
// - Common: OpenAI-compatible chat completions translator, prompt and language table
// - Pipeline: ordered per-segment translation with source-text fallback

pub mod common;
pub mod pipeline;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

pub use common::*;
pub use pipeline::{preview, TranslationPipeline, TranslationProgress};

use crate::error::Result;

/// Single-text translation backend
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate one piece of text; an empty result is an error
    async fn translate(&self, text: &str, source_language: &str, target_language: &str) -> Result<String>;

    /// Rewrite an existing translation so it reads more naturally; a blank context means none
    async fn improve(&self, original_text: &str, translation: &str, context: &str) -> Result<String>;

    /// Model name reported to API clients
    fn model(&self) -> String;
}
