// Per-job pass progress

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::model::{Codec, OutputFormat};

/// Lifecycle of one encode job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    /// A pass is executing
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// Mutable progress owned by exactly one job. Passes only move forward:
/// pass `n` may start once pass `n - 1` completed, and never again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingPassState {
    job_id: String,
    format: OutputFormat,
    codec: Codec,
    total_passes: u8,
    /// Highest pass started, 0 before the first
    current_pass: u8,
    completed_passes: u8,
    status: JobStatus,
    stats_logs: Vec<PathBuf>,
    elapsed: Duration,
}

impl EncodingPassState {
    pub fn new(job_id: impl Into<String>, format: OutputFormat, codec: Codec, total_passes: u8) -> Self {
        Self {
            job_id: job_id.into(),
            format,
            codec,
            total_passes,
            current_pass: 0,
            completed_passes: 0,
            status: JobStatus::Pending,
            stats_logs: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn total_passes(&self) -> u8 {
        self.total_passes
    }

    pub fn current_pass(&self) -> u8 {
        self.current_pass
    }

    pub fn completed_passes(&self) -> u8 {
        self.completed_passes
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Statistics logs recorded so far, in pass order
    pub fn stats_logs(&self) -> &[PathBuf] {
        &self.stats_logs
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn begin_pass(&mut self, pass_index: u8) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(self.transition_error(pass_index, "job already finished"));
        }
        if self.status == JobStatus::Running {
            return Err(self.transition_error(pass_index, "another pass is running"));
        }
        if pass_index != self.completed_passes + 1 || pass_index > self.total_passes {
            return Err(self.transition_error(pass_index, "passes must run in order, once"));
        }
        self.current_pass = pass_index;
        self.status = JobStatus::Running;
        Ok(())
    }

    pub fn complete_pass(
        &mut self,
        pass_index: u8,
        elapsed: Duration,
        stats_log: Option<PathBuf>,
    ) -> Result<(), DomainError> {
        if self.status != JobStatus::Running || pass_index != self.current_pass {
            return Err(self.transition_error(pass_index, "pass is not running"));
        }
        self.completed_passes = pass_index;
        self.elapsed += elapsed;
        self.stats_logs.extend(stats_log);
        self.status = if pass_index == self.total_passes {
            JobStatus::Completed
        } else {
            JobStatus::Pending
        };
        Ok(())
    }

    /// Record a failure of the current pass; terminal states are kept
    pub fn fail(&mut self, elapsed: Duration) {
        if !self.status.is_terminal() {
            self.elapsed += elapsed;
            self.status = JobStatus::Failed;
        }
    }

    /// Skip the remaining passes; completed passes stay completed
    pub fn cancel(&mut self) {
        if !self.status.is_terminal() {
            self.status = JobStatus::Cancelled;
        }
    }

    fn transition_error(&self, pass_index: u8, reason: &str) -> DomainError {
        DomainError::BadArgs(format!(
            "job {}: cannot move to pass {} from pass {} ({:?}): {}",
            self.job_id, pass_index, self.current_pass, self.status, reason
        ))
    }
}
