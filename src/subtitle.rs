use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

use crate::error::{AppError, Result};

/// A timed cue carrying both the source text and its translation.
///
/// `translation` is always set; when translation failed it holds the source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub translation: String,
}

impl SubtitleSegment {
    pub fn new(start: f64, end: f64, text: &str, translation: &str) -> Self {
        Self {
            start,
            end,
            text: text.to_string(),
            translation: translation.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    Srt,
    Vtt,
}

impl SubtitleFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Srt => "application/x-subrip; charset=utf-8",
            Self::Vtt => "text/vtt; charset=utf-8",
        }
    }

    pub fn render(&self, segments: &[SubtitleSegment], bilingual: bool) -> String {
        match self {
            Self::Srt => render_srt(segments, bilingual),
            Self::Vtt => render_vtt(segments, bilingual),
        }
    }
}

impl FromStr for SubtitleFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "srt" => Ok(Self::Srt),
            "vtt" | "webvtt" => Ok(Self::Vtt),
            other => Err(AppError::Validation(format!("Unsupported subtitle format: {}", other))),
        }
    }
}

fn cue_text(segment: &SubtitleSegment, bilingual: bool) -> String {
    let translation = segment.translation.trim();
    let source = segment.text.trim();
    if bilingual && translation != source {
        format!("{}\n{}", translation, source)
    } else {
        translation.to_string()
    }
}

pub fn render_srt(segments: &[SubtitleSegment], bilingual: bool) -> String {
    let mut content = String::new();

    for (index, segment) in segments.iter().enumerate() {
        content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_srt_time(segment.start),
            format_srt_time(segment.end),
            cue_text(segment, bilingual)
        ));
    }

    content
}

pub fn render_vtt(segments: &[SubtitleSegment], bilingual: bool) -> String {
    let mut content = String::from("WEBVTT\n\n");

    for segment in segments {
        content.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_vtt_time(segment.start),
            format_vtt_time(segment.end),
            cue_text(segment, bilingual)
        ));
    }

    content
}

/// Write subtitles to disk in the given format
pub async fn write_subtitles<P: AsRef<Path>>(
    segments: &[SubtitleSegment],
    format: SubtitleFormat,
    bilingual: bool,
    output_path: P,
) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Writing {} subtitle file: {}", format.extension(), output_path.display());

    fs::write(output_path, format.render(segments, bilingual)).await?;
    Ok(())
}

fn split_millis(seconds: f64) -> (u64, u64, u64, u64) {
    let total_milliseconds = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;
    (hours, minutes, secs, millis)
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm)
fn format_srt_time(seconds: f64) -> String {
    let (hours, minutes, secs, millis) = split_millis(seconds);
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// WebVTT uses a dot before the milliseconds
fn format_vtt_time(seconds: f64) -> String {
    let (hours, minutes, secs, millis) = split_millis(seconds);
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cues() -> Vec<SubtitleSegment> {
        vec![
            SubtitleSegment::new(0.0, 1.5, "Hello", "Olá"),
            SubtitleSegment::new(1.5, 3.0, "OK", "OK"),
        ]
    }

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(65.123), "00:01:05,123");
        assert_eq!(format_srt_time(3661.500), "01:01:01,500");
        assert_eq!(format_vtt_time(65.123), "00:01:05.123");
    }

    #[test]
    fn test_srt_bilingual_cues() {
        let srt = render_srt(&cues(), true);
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:01,500\nOlá\nHello\n\n2\n00:00:01,500 --> 00:00:03,000\nOK\n\n"
        );
        assert!(!render_srt(&cues(), false).contains("Hello"));
    }

    #[test]
    fn test_vtt_header_and_format_parsing() {
        let vtt = render_vtt(&cues(), false);
        assert!(vtt.starts_with("WEBVTT\n\n00:00:00.000 --> 00:00:01.500\nOlá\n"));
        assert_eq!("VTT".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::Vtt);
        assert!("ass".parse::<SubtitleFormat>().is_err());
    }

    #[tokio::test]
    async fn test_write_subtitles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.srt");
        write_subtitles(&cues(), SubtitleFormat::Srt, true, &path).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("1\n"));
    }
}
