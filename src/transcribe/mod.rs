// Transcription architecture
//
// - Common: transcript records and the validated upstream wire format
// - OpenAI: OpenAI-compatible `/audio/transcriptions` client (Groq by default)
// - Segmenter: splits oversized audio into fixed-length chunks
// - Coordinator: whole-file or chunked transcription with offset-corrected merge
//
// The coordinator only talks to `TranscriptionService`, so another speech
// backend only needs a new implementation of that trait.

pub mod common;
pub mod coordinator;
pub mod openai;
pub mod segmenter;

use async_trait::async_trait;
use std::path::Path;

#[cfg(test)]
use mockall::automock;

pub use common::*;
pub use coordinator::TranscriptionCoordinator;
pub use openai::OpenAiTranscriber;
pub use segmenter::{AudioSegmenter, ChunkSpec};

use crate::error::Result;

/// A single upstream transcription call
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Transcribe one audio file that fits within the upstream size limit
    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<TranscriptionResult>;

    /// Model name reported in merged results
    fn model(&self) -> String;
}
