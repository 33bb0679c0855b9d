use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::Result;

/// Job-scoped media paths below a single root directory.
///
/// Every artifact name starts with the job id, so two jobs never share a file.
#[derive(Debug, Clone)]
pub struct MediaLayout {
    root: PathBuf,
}

impl MediaLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.root.join("videos")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio")
    }

    pub fn video_path(&self, job_id: &str) -> PathBuf {
        self.videos_dir().join(format!("{}.mp4", job_id))
    }

    /// Audio as fetched, before normalization
    pub fn raw_audio_path(&self, job_id: &str) -> PathBuf {
        self.audio_dir().join(format!("{}_raw.webm", job_id))
    }

    /// Normalized 16 kHz mono WAV
    pub fn audio_path(&self, job_id: &str) -> PathBuf {
        self.audio_dir().join(format!("{}.wav", job_id))
    }

    pub async fn ensure_directories(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.videos_dir()).await?;
        tokio::fs::create_dir_all(self.audio_dir()).await?;
        Ok(())
    }

    /// Remove media left behind by earlier processes once it is older than `max_age`.
    ///
    /// Returns the number of files removed.
    pub fn purge_stale_files(&self, max_age: Duration) -> u64 {
        let now = SystemTime::now();
        let mut removed = 0;

        for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }

            let age = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|modified| now.duration_since(modified).ok());

            if let Some(age) = age {
                if age > max_age {
                    match std::fs::remove_file(entry.path()) {
                        Ok(()) => {
                            debug!("Purged stale media file {}", entry.path().display());
                            removed += 1;
                        }
                        Err(e) => warn!("Failed to purge {}: {}", entry.path().display(), e),
                    }
                }
            }
        }

        if removed > 0 {
            info!("Purged {} stale media files from {}", removed, self.root.display());
        }
        removed
    }
}

/// Remove files if they exist; failures are logged, never raised.
pub fn remove_files<P: AsRef<Path>>(paths: &[P]) {
    for path in paths {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}

/// Async counterpart of [`remove_files`] for use inside tasks
pub async fn discard_files<P: AsRef<Path>>(paths: &[P]) {
    for path in paths {
        let path = path.as_ref();
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}
