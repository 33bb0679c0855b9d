use serde::{Deserialize, Serialize};

use crate::transcribe::TranscriptSegment;

const LOW_CONFIDENCE_LOGPROB: f64 = -0.5;
const SILENCE_NO_SPEECH_PROB: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl OverallQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }
}

/// Summary of recognition confidence over a transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptQuality {
    /// Mean of |avg_logprob|; lower is better
    pub average_confidence: f64,
    pub low_confidence_segments: usize,
    /// Segments the recognizer judged likely to be silence
    pub silence_detected: usize,
    pub overall_quality: OverallQuality,
}

pub fn analyze(segments: &[TranscriptSegment]) -> TranscriptQuality {
    if segments.is_empty() {
        return TranscriptQuality {
            average_confidence: 0.0,
            low_confidence_segments: 0,
            silence_detected: 0,
            overall_quality: OverallQuality::Poor,
        };
    }

    let count = segments.len() as f64;
    let average_confidence = segments.iter().map(|s| s.avg_logprob.abs()).sum::<f64>() / count;
    let low_confidence_segments = segments
        .iter()
        .filter(|s| s.avg_logprob < LOW_CONFIDENCE_LOGPROB)
        .count();
    let silence_detected = segments
        .iter()
        .filter(|s| s.no_speech_prob > SILENCE_NO_SPEECH_PROB)
        .count();

    let low_ratio = low_confidence_segments as f64 / count;
    let overall_quality = if average_confidence < 0.2 && low_ratio < 0.1 {
        OverallQuality::Excellent
    } else if average_confidence < 0.4 && low_ratio < 0.2 {
        OverallQuality::Good
    } else if average_confidence < 0.6 && low_ratio < 0.4 {
        OverallQuality::Fair
    } else {
        OverallQuality::Poor
    };

    TranscriptQuality {
        average_confidence,
        low_confidence_segments,
        silence_detected,
        overall_quality,
    }
}
