//! YouTranslate - asynchronous video subtitling service
//!
//! Downloads a video, transcribes its audio, translates the transcript segment
//! by segment and serves bilingual subtitles next to a range-streamable copy of
//! the video.

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod error;
pub mod jobs;
pub mod media;
pub mod quality;
pub mod server;
pub mod subtitle;
pub mod transcribe;
pub mod translate;
pub mod workflow;
