//! Pass progress callbacks and cooperative cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::pass_state::JobStatus;
use crate::utils::Utils;

/// Progress callback trait for job observers
pub trait ProgressCallback: Send + Sync {
    /// Called before a pass is handed to the encoder
    fn on_pass_start(&self, job_id: &str, pass_index: u8, total_passes: u8);

    /// Called after a pass succeeded
    fn on_pass_complete(&self, job_id: &str, pass_index: u8, total_passes: u8, elapsed: Duration);

    /// Called once when the job reaches a terminal status
    fn on_finished(&self, job_id: &str, status: JobStatus);
}

/// Logs progress through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressCallback for TracingProgress {
    fn on_pass_start(&self, job_id: &str, pass_index: u8, total_passes: u8) {
        info!(job_id, pass = pass_index, total = total_passes, "Pass started");
    }

    fn on_pass_complete(&self, job_id: &str, pass_index: u8, total_passes: u8, elapsed: Duration) {
        info!(
            job_id,
            pass = pass_index,
            total = total_passes,
            elapsed = %Utils::format_duration(elapsed),
            "Pass completed"
        );
    }

    fn on_finished(&self, job_id: &str, status: JobStatus) {
        info!(job_id, status = ?status, "Job finished");
    }
}

/// Event captured by [`RecordingProgress`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProgressEvent {
    PassStarted { job_id: String, pass: u8 },
    PassCompleted { job_id: String, pass: u8 },
    Finished { job_id: String, status: JobStatus },
}

/// Keeps every event in memory; used by embedding callers and tests
#[derive(Debug, Default, Clone)]
pub struct RecordingProgress {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn push(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_pass_start(&self, job_id: &str, pass_index: u8, _total_passes: u8) {
        self.push(ProgressEvent::PassStarted {
            job_id: job_id.to_string(),
            pass: pass_index,
        });
    }

    fn on_pass_complete(&self, job_id: &str, pass_index: u8, _total_passes: u8, _elapsed: Duration) {
        self.push(ProgressEvent::PassCompleted {
            job_id: job_id.to_string(),
            pass: pass_index,
        });
    }

    fn on_finished(&self, job_id: &str, status: JobStatus) {
        self.push(ProgressEvent::Finished {
            job_id: job_id.to_string(),
            status,
        });
    }
}

/// Cancellation flag checked between passes
#[derive(Debug, Default, Clone)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_cancelled());
        clone.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_recording_progress() {
        let progress = RecordingProgress::new();
        progress.on_pass_start("j", 1, 2);
        progress.on_pass_complete("j", 1, 2, Duration::from_secs(1));
        progress.on_finished("j", JobStatus::Completed);
        assert_eq!(
            progress.events(),
            vec![
                ProgressEvent::PassStarted { job_id: "j".into(), pass: 1 },
                ProgressEvent::PassCompleted { job_id: "j".into(), pass: 1 },
                ProgressEvent::Finished { job_id: "j".into(), status: JobStatus::Completed },
            ]
        );
    }
}
