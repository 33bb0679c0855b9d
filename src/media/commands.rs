use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, AppError};

/// Abstract external command representation (ffmpeg, ffprobe, yt-dlp)
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Disable video
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Set audio sample rate
    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    /// Set audio channels
    pub fn audio_channels(self, channels: u32) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    /// Seek the input to `seconds` before decoding
    pub fn seek(self, seconds: f64) -> Self {
        self.arg("-ss").arg(format!("{:.3}", seconds))
    }

    /// Limit the decoded duration
    pub fn duration(self, seconds: f64) -> Self {
        self.arg("-t").arg(format!("{:.3}", seconds))
    }

    /// Force the output container format
    pub fn format<S: Into<String>>(self, format: S) -> Self {
        self.arg("-f").arg(format)
    }

    /// Execute the command, discarding its output
    pub async fn execute(&self) -> Result<()> {
        self.execute_capture().await.map(|_| ())
    }

    /// Execute the command and return its standard output
    pub async fn execute_capture(&self) -> Result<String> {
        debug!("Executing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AppError::Media(format!("Failed to execute {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Media(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Builder for the ffmpeg/ffprobe invocations the pipeline needs
pub struct MediaCommandBuilder {
    binary_path: String,
    probe_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, probe_path: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            probe_path: probe_path.into(),
        }
    }

    /// Build the command converting any audio input into 16 kHz mono PCM WAV
    pub fn normalize_audio<P: AsRef<Path>>(&self, input_path: P, audio_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio normalization")
            .input(input_path)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(16000)
            .audio_channels(1)
            .format("wav")
            .overwrite()
            .output(audio_path)
    }

    /// Build the command cutting `[start, start + duration)` out of an audio file
    pub fn extract_segment<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: P,
        start: f64,
        duration: f64,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, format!("Audio segment extraction at {:.0}s", start))
            .seek(start)
            .input(input_path)
            .duration(duration)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(16000)
            .audio_channels(1)
            .format("wav")
            .overwrite()
            .output(output_path)
    }

    /// Build the ffprobe command printing the container duration in seconds
    pub fn probe_duration<P: AsRef<Path>>(&self, path: P) -> MediaCommand {
        MediaCommand::new(&self.probe_path, "Duration probe")
            .args(["-v", "error", "-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .output(path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check")
            .arg("-version")
    }
}

/// Parse the output of [`MediaCommandBuilder::probe_duration`]
pub fn parse_probe_duration(output: &str) -> Result<f64> {
    let value = output.trim();
    let duration: f64 = value
        .parse()
        .map_err(|_| AppError::Media(format!("Unexpected duration probe output: {:?}", value)))?;

    if !duration.is_finite() || duration < 0.0 {
        return Err(AppError::Media(format!("Invalid audio duration: {}", duration)));
    }

    Ok(duration)
}
