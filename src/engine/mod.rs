//! Multi-pass encoding engine module

pub mod budget;
pub mod cleanup;
pub mod pass_state;
pub mod progress;
pub mod runner;
pub mod scheduler;

pub use budget::{BudgetPermit, StorageBudget};
pub use cleanup::{RenditionGuard, StatsCleanupGuard};
pub use pass_state::{EncodingPassState, JobStatus};
pub use progress::{CancelFlag, ProgressCallback, ProgressEvent, RecordingProgress, TracingProgress};
pub use runner::{JobResult, JobRunner};
pub use scheduler::{EncodeJob, EncodedRendition, FailureReport, JobFailure, PassScheduler};
