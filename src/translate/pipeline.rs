use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::subtitle::SubtitleSegment;
use crate::transcribe::TranscriptSegment;
use super::Translator;

const PREVIEW_CHARS: usize = 50;

/// Reported after every processed segment, whether translated or fallen back
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationProgress {
    pub translated: usize,
    pub total: usize,
    pub preview: String,
}

/// First `max_chars` characters of `text`, with `...` appended when truncated
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Turns transcript segments into subtitle segments, one by one and in order
pub struct TranslationPipeline {
    translator: Arc<dyn Translator>,
}

impl TranslationPipeline {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self { translator }
    }

    pub fn translator(&self) -> &Arc<dyn Translator> {
        &self.translator
    }

    /// Translate every segment; a failed segment keeps its source text.
    ///
    /// When both languages match no external call is made and no progress is
    /// reported.
    pub async fn translate_segments(
        &self,
        segments: &[TranscriptSegment],
        source_language: &str,
        target_language: &str,
        on_progress: &mut (dyn FnMut(TranslationProgress) + Send),
    ) -> Vec<SubtitleSegment> {
        if source_language == target_language {
            debug!("Source and target language are both {}, skipping translation", source_language);
            return segments
                .iter()
                .map(|seg| SubtitleSegment::new(seg.start, seg.end, &seg.text, &seg.text))
                .collect();
        }

        let total = segments.len();
        let mut subtitles = Vec::with_capacity(total);
        let mut fallbacks = 0;

        for (index, seg) in segments.iter().enumerate() {
            let translation = match self.translator.translate(&seg.text, source_language, target_language).await {
                Ok(text) if !text.trim().is_empty() => text,
                Ok(_) => {
                    warn!("Segment {} came back empty, keeping source text", index + 1);
                    fallbacks += 1;
                    seg.text.clone()
                }
                Err(e) => {
                    warn!("Segment {} failed to translate, keeping source text: {}", index + 1, e);
                    fallbacks += 1;
                    seg.text.clone()
                }
            };

            subtitles.push(SubtitleSegment::new(seg.start, seg.end, &seg.text, &translation));
            on_progress(TranslationProgress {
                translated: index + 1,
                total,
                preview: preview(&seg.text, PREVIEW_CHARS),
            });
        }

        info!(
            "Translated {} segments from {} to {} ({} fell back to source)",
            total, source_language, target_language, fallbacks
        );
        subtitles
    }
}
