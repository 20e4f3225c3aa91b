// Worker pool running many encode jobs concurrently

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::domain::errors::DomainError;
use crate::domain::model::OutputFormat;
use crate::engine::pass_state::EncodingPassState;
use crate::engine::progress::CancelFlag;
use crate::engine::scheduler::{EncodeJob, EncodedRendition, JobFailure, PassScheduler};

/// Outcome of one job run by the pool, tagged with its id
pub type JobResult = (String, Result<EncodedRendition, JobFailure>);

/// Runs independent jobs in parallel, at most `max_concurrent` at a time.
/// Passes inside a job stay sequential.
#[derive(Clone)]
pub struct JobRunner {
    scheduler: Arc<PassScheduler>,
    slots: Arc<Semaphore>,
    max_concurrent: usize,
}

impl JobRunner {
    pub fn new(scheduler: Arc<PassScheduler>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            scheduler,
            slots: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Run one job inside a worker slot
    pub async fn run_one(&self, job: EncodeJob, cancel: CancelFlag) -> Result<EncodedRendition, JobFailure> {
        let _slot = match Arc::clone(&self.slots).acquire_owned().await {
            Ok(slot) => slot,
            Err(_) => {
                let error = DomainError::FsFail("worker pool closed".to_string());
                return Err(unstarted(&job.job_id, job.format, error));
            }
        };
        debug!(job_id = %job.job_id, "Worker slot acquired");
        self.scheduler.run(&job, &cancel).await
    }

    /// Run every job; results come back in submission order
    pub async fn run_all(&self, jobs: Vec<EncodeJob>, cancel: CancelFlag) -> Vec<JobResult> {
        let mut set = JoinSet::new();
        let ids: Vec<(String, OutputFormat)> =
            jobs.iter().map(|job| (job.job_id.clone(), job.format)).collect();

        for (position, job) in jobs.into_iter().enumerate() {
            let runner = self.clone();
            let cancel = cancel.clone();
            set.spawn(async move { (position, runner.run_one(job, cancel).await) });
        }

        let mut results: Vec<Option<Result<EncodedRendition, JobFailure>>> =
            ids.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((position, result)) => results[position] = Some(result),
                Err(err) => error!(error = %err, "Encode worker panicked"),
            }
        }

        ids.into_iter()
            .zip(results)
            .map(|((job_id, format), result)| {
                let result = result.unwrap_or_else(|| {
                    let error = DomainError::FsFail(format!("worker for {} aborted", job_id));
                    Err(unstarted(&job_id, format, error))
                });
                (job_id, result)
            })
            .collect()
    }
}

/// Failure for a job that never reached its first pass
fn unstarted(job_id: &str, format: OutputFormat, error: DomainError) -> JobFailure {
    let mut state = EncodingPassState::new(job_id, format, format.codec(), 0);
    state.fail(Duration::ZERO);
    JobFailure { state, error }
}
