use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::media::remove_files;
use super::model::{Job, JobStatus, JobUpdate, VideoInfo};

/// Aggregate counters over all known jobs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    pub total: usize,
    /// Every status is present, zero-filled
    pub by_status: BTreeMap<String, usize>,
    /// Mean seconds from creation to completion over completed jobs
    pub average_processing_time: f64,
}

/// In-memory registry of jobs.
///
/// Every operation takes the lock once, so an update is never observed half
/// applied. The lock is never held across an await point.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Job>> {
        self.jobs.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Job>> {
        self.jobs.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn create(&self, video_info: VideoInfo, language: &str, target_language: &str) -> Job {
        let id = Uuid::new_v4().to_string();
        let job = Job::new(id.clone(), video_info, language, target_language);

        self.write().insert(id.clone(), job.clone());
        info!("Created job {} for {}", id, job.video_info.url);
        job
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.read().get(id).cloned()
    }

    /// Merge `update` into the job.
    ///
    /// Unknown ids, finished jobs and backward status moves are ignored.
    /// Returns whether the update was applied.
    pub fn update(&self, id: &str, update: JobUpdate) -> bool {
        let mut jobs = self.write();
        let Some(job) = jobs.get_mut(id) else {
            warn!("Ignoring update for unknown job {}", id);
            return false;
        };

        if job.status.is_terminal() {
            warn!("Ignoring update for finished job {} ({})", id, job.status);
            return false;
        }
        if let Some(next) = update.status {
            if !job.status.can_transition_to(next) {
                warn!("Ignoring transition {} -> {} for job {}", job.status, next, id);
                return false;
            }
        }

        let mut next = job.clone();
        update.apply(&mut next);
        *job = next;
        true
    }

    /// Remove the job and its media files
    pub fn delete(&self, id: &str) -> bool {
        let removed = self.write().remove(id);

        match removed {
            Some(job) => {
                remove_files(&job.owned_files());
                info!("Deleted job {}", id);
                true
            }
            None => false,
        }
    }

    /// Jobs in creation order, optionally filtered by status
    pub fn list(&self, status: Option<JobStatus>) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .read()
            .values()
            .filter(|job| status.map_or(true, |s| job.status == s))
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    pub fn stats(&self) -> JobStats {
        let jobs = self.read();

        let mut by_status: BTreeMap<String, usize> = JobStatus::ALL
            .iter()
            .map(|status| (status.as_str().to_string(), 0))
            .collect();
        for job in jobs.values() {
            *by_status.entry(job.status.as_str().to_string()).or_insert(0) += 1;
        }

        let durations: Vec<f64> = jobs
            .values()
            .filter(|job| job.status == JobStatus::Completed)
            .filter_map(Job::processing_seconds)
            .collect();
        let average_processing_time = if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<f64>() / durations.len() as f64
        };

        JobStats {
            total: jobs.len(),
            by_status,
            average_processing_time,
        }
    }

    /// Delete every job created more than `max_age` ago
    pub fn sweep(&self, max_age: Duration) -> usize {
        self.sweep_before(Utc::now() - max_age)
    }

    pub fn sweep_before(&self, cutoff: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .read()
            .values()
            .filter(|job| job.created_at < cutoff)
            .map(|job| job.id.clone())
            .collect();

        let removed = expired.iter().filter(|id| self.delete(id)).count();
        if removed > 0 {
            info!("Swept {} expired jobs", removed);
        } else {
            debug!("No expired jobs to sweep");
        }
        removed
    }
}
