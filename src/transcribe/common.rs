use serde::{Deserialize, Serialize};
use tracing::debug;

/// One timed span of recognized speech
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub id: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub tokens: Vec<i64>,
    pub temperature: f64,
    pub avg_logprob: f64,
    pub compression_ratio: f64,
    pub no_speech_prob: f64,
}

impl TranscriptSegment {
    /// Segment with only timing and text; quality metrics take their defaults
    pub fn new<S: Into<String>>(id: u32, start: f64, end: f64, text: S) -> Self {
        Self {
            id,
            start,
            end,
            text: text.into(),
            tokens: Vec::new(),
            temperature: 0.0,
            avg_logprob: 0.0,
            compression_ratio: 0.0,
            no_speech_prob: 0.0,
        }
    }

    /// Shift the segment along the global timeline
    pub fn offset_by(mut self, seconds: f64) -> Self {
        self.start += seconds;
        self.end += seconds;
        self
    }
}

/// Time-ordered transcript of one audio artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
    pub language: String,
    pub duration: f64,
    pub model: String,
}

/// `verbose_json` body returned by OpenAI-compatible transcription endpoints.
///
/// Every field is optional on the wire; defaults are resolved once, in
/// [`VerboseTranscription::into_result`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerboseTranscription {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub segments: Vec<VerboseSegment>,
    pub language: Option<String>,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerboseSegment {
    pub id: Option<u32>,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tokens: Vec<i64>,
    pub temperature: Option<f64>,
    pub avg_logprob: Option<f64>,
    pub compression_ratio: Option<f64>,
    pub no_speech_prob: Option<f64>,
}

impl VerboseTranscription {
    /// Validate the upstream body into a [`TranscriptionResult`].
    ///
    /// Segments without a positive, finite time span are dropped.
    pub fn into_result(self, model: &str, requested_language: &str) -> TranscriptionResult {
        let segments: Vec<TranscriptSegment> = self
            .segments
            .into_iter()
            .enumerate()
            .filter(|(_, seg)| {
                let valid = seg.start.is_finite() && seg.end.is_finite() && seg.end > seg.start;
                if !valid {
                    debug!("Dropping segment with invalid span {}..{}", seg.start, seg.end);
                }
                valid
            })
            .map(|(index, seg)| TranscriptSegment {
                id: seg.id.unwrap_or(index as u32),
                start: seg.start,
                end: seg.end,
                text: seg.text.trim().to_string(),
                tokens: seg.tokens,
                temperature: seg.temperature.unwrap_or(0.0),
                avg_logprob: seg.avg_logprob.unwrap_or(0.0),
                compression_ratio: seg.compression_ratio.unwrap_or(0.0),
                no_speech_prob: seg.no_speech_prob.unwrap_or(0.0),
            })
            .collect();

        let duration = self
            .duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .or_else(|| segments.last().map(|seg| seg.end))
            .unwrap_or(0.0);

        TranscriptionResult {
            text: self.text.trim().to_string(),
            segments,
            language: self
                .language
                .filter(|lang| !lang.is_empty())
                .unwrap_or_else(|| requested_language.to_string()),
            duration,
            model: model.to_string(),
        }
    }
}
