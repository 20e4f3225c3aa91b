//! Encoding pass scheduler
//!
//! Drives one job through its pass plan: profile selection, per-pass
//! encoder invocation, statistics bookkeeping and cleanup.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::{
    BitrateLevel, EncodingProfile, OutputFormat, ProjectionMetadata, QualityPreset, VideoAsset,
};
use crate::domain::rules::{ProfileTable, ProjectionMultipliers};
use crate::engine::budget::StorageBudget;
use crate::engine::cleanup::{RenditionGuard, StatsCleanupGuard};
use crate::engine::pass_state::{EncodingPassState, JobStatus};
use crate::engine::progress::{CancelFlag, ProgressCallback, TracingProgress};
use crate::planner::{PassKind, PassPlan, PlannedPass, SourceChoice};
use crate::ports::{EncodeInvocation, EncodePort, PassOutput, RateControl};
use crate::utils::path::JobLayout;
use crate::utils::Utils;

/// Space reserved for a statistics-only pass
const STATS_FOOTPRINT_MIB: u32 = 1;

/// Ladder tier a job renders in place of the format's table bitrates
#[derive(Debug, Clone)]
pub struct TierTarget {
    pub level: BitrateLevel,
    pub output: PathBuf,
    /// Keyframe spacing, equal to the package segment length
    pub keyframe_seconds: u32,
}

/// One rendition request, ready to schedule
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub job_id: String,
    pub asset: VideoAsset,
    pub format: OutputFormat,
    pub preset: QualityPreset,
    /// `None` or a non-spherical classification encodes without multipliers
    pub projection: Option<ProjectionMetadata>,
    pub source: SourceChoice,
    pub job_dir: PathBuf,
    pub tier: Option<TierTarget>,
}

impl EncodeJob {
    pub fn new(
        asset: VideoAsset,
        format: OutputFormat,
        preset: QualityPreset,
        projection: Option<ProjectionMetadata>,
        source: SourceChoice,
        layout: &JobLayout,
    ) -> Self {
        let job_id = JobLayout::job_id(asset.id(), format);
        let job_dir = layout.job_dir(&job_id);
        Self {
            job_id,
            asset,
            format,
            preset,
            projection,
            source,
            job_dir,
            tier: None,
        }
    }

    /// Job rendering one ladder level from the original source into
    /// `output`, scaled to the level's size
    pub fn for_tier(
        asset: VideoAsset,
        level: BitrateLevel,
        preset: QualityPreset,
        projection: Option<ProjectionMetadata>,
        output: PathBuf,
        keyframe_seconds: u32,
        layout: &JobLayout,
    ) -> Result<Self, DomainError> {
        let format = OutputFormat::for_rendition(level.codec, level.container).ok_or_else(|| {
            DomainError::UnsupportedFormat(format!(
                "no output format encodes {} into {}",
                level.codec,
                level.container.extension()
            ))
        })?;
        let job_id = JobLayout::tier_job_id(asset.id(), &level.rendition_key());
        let job_dir = layout.job_dir(&job_id);
        let source = SourceChoice::Original(asset.source_path().to_path_buf());
        Ok(Self {
            job_id,
            asset,
            format,
            preset,
            projection,
            source,
            job_dir,
            tier: Some(TierTarget {
                level,
                output,
                keyframe_seconds: keyframe_seconds.max(1),
            }),
        })
    }

    pub fn output_path(&self) -> PathBuf {
        match &self.tier {
            Some(tier) => tier.output.clone(),
            None => JobLayout::rendition_path(&self.job_dir, self.format),
        }
    }
}

/// A completed rendition
#[derive(Debug, Clone)]
pub struct EncodedRendition {
    pub job_id: String,
    pub format: OutputFormat,
    pub profile: EncodingProfile,
    pub source: SourceChoice,
    pub output: PathBuf,
    /// Ladder level key for tier jobs
    pub tier: Option<String>,
    pub state: EncodingPassState,
}

/// A job that did not complete, with the state it reached
#[derive(Debug, Clone)]
pub struct JobFailure {
    pub state: EncodingPassState,
    pub error: DomainError,
}

/// Serializable summary handed back to the job owner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReport {
    pub job_id: String,
    pub format: OutputFormat,
    pub status: JobStatus,
    pub furthest_completed_pass: u8,
    pub failed_pass: Option<u8>,
    pub total_passes: u8,
    pub error: String,
    pub stderr: Option<String>,
}

impl JobFailure {
    pub fn report(&self) -> FailureReport {
        let failed_pass = match self.state.status() {
            JobStatus::Failed if self.state.current_pass() > self.state.completed_passes() => {
                Some(self.state.current_pass())
            }
            _ => None,
        };
        let stderr = match &self.error {
            DomainError::PassExecutionFailed { stderr, .. } => Some(stderr.clone()),
            _ => None,
        };
        FailureReport {
            job_id: self.state.job_id().to_string(),
            format: self.state.format(),
            status: self.state.status(),
            furthest_completed_pass: self.state.completed_passes(),
            failed_pass,
            total_passes: self.state.total_passes(),
            error: self.error.to_string(),
            stderr,
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "job {} stopped at pass {}/{} with {} completed: {}",
            self.state.job_id(),
            self.state.current_pass(),
            self.state.total_passes(),
            self.state.completed_passes(),
            self.error
        )
    }
}

impl std::error::Error for JobFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Sequences passes for encode jobs. Holds only shared read-only tables and
/// the storage budget; all per-job state lives in the job's own
/// [`EncodingPassState`].
pub struct PassScheduler {
    encoder: Arc<dyn EncodePort>,
    profiles: Arc<ProfileTable>,
    multipliers: Arc<ProjectionMultipliers>,
    budget: StorageBudget,
    progress: Arc<dyn ProgressCallback>,
}

impl PassScheduler {
    pub fn new(
        encoder: Arc<dyn EncodePort>,
        profiles: Arc<ProfileTable>,
        multipliers: Arc<ProjectionMultipliers>,
        budget: StorageBudget,
    ) -> Self {
        Self {
            encoder,
            profiles,
            multipliers,
            budget,
            progress: Arc::new(TracingProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn budget(&self) -> &StorageBudget {
        &self.budget
    }

    /// Table profile, scaled by the projection multiplier for spherical sources
    pub fn resolve_profile(
        &self,
        format: OutputFormat,
        preset: QualityPreset,
        projection: Option<&ProjectionMetadata>,
    ) -> Result<EncodingProfile, DomainError> {
        let base = self.profiles.lookup(format, preset)?;
        match projection.filter(|meta| meta.is_spherical()) {
            Some(meta) => {
                let multiplier = self.multipliers.multiplier_for(meta.projection());
                debug!(
                    format = %format,
                    projection = %meta.projection(),
                    multiplier,
                    "Applying projection bitrate multiplier"
                );
                Ok(base.scaled(multiplier))
            }
            None => Ok(base.clone()),
        }
    }

    /// Tier jobs take their rates from the ladder level, which already
    /// accounts for the projection
    fn profile_for(&self, job: &EncodeJob) -> Result<EncodingProfile, DomainError> {
        match &job.tier {
            Some(tier) => Ok(self.profiles.lookup(job.format, job.preset)?.for_level(&tier.level)),
            None => self.resolve_profile(job.format, job.preset, job.projection.as_ref()),
        }
    }

    /// Run every pass of `job` in order. Statistics logs are removed on
    /// every exit path; the rendition is kept only on success.
    pub async fn run(&self, job: &EncodeJob, cancel: &CancelFlag) -> Result<EncodedRendition, JobFailure> {
        let codec = job.format.codec();
        let prepared = self
            .profile_for(job)
            .and_then(|profile| PassPlan::for_profile(&profile).map(|plan| (profile, plan)));
        let (profile, plan) = match prepared {
            Ok(prepared) => prepared,
            Err(error) => {
                let mut state = EncodingPassState::new(&job.job_id, job.format, codec, 0);
                state.fail(Duration::ZERO);
                return Err(JobFailure { state, error });
            }
        };

        info!(
            job_id = %job.job_id,
            format = %job.format,
            codec = %codec,
            passes = plan.total(),
            target_kbps = profile.target_bitrate_kbps,
            source = %job.source.path().display(),
            "Starting encode job"
        );

        let mut state = EncodingPassState::new(&job.job_id, job.format, codec, plan.total());
        let result = self.drive(job, &profile, &plan, &mut state, cancel).await;
        if result.is_err() && !state.status().is_terminal() {
            state.fail(Duration::ZERO);
        }
        self.progress.on_finished(&job.job_id, state.status());

        match result {
            Ok(output) => {
                info!(
                    job_id = %job.job_id,
                    elapsed = %Utils::format_duration(state.elapsed()),
                    output = %output.display(),
                    "Encode job completed"
                );
                Ok(EncodedRendition {
                    job_id: job.job_id.clone(),
                    format: job.format,
                    profile,
                    source: job.source.clone(),
                    output,
                    tier: job.tier.as_ref().map(|tier| tier.level.rendition_key()),
                    state,
                })
            }
            Err(error) => {
                error!(job_id = %job.job_id, status = ?state.status(), error = %error, "Encode job stopped");
                Err(JobFailure { state, error })
            }
        }
    }

    async fn drive(
        &self,
        job: &EncodeJob,
        profile: &EncodingProfile,
        plan: &PassPlan,
        state: &mut EncodingPassState,
        cancel: &CancelFlag,
    ) -> Result<PathBuf, DomainError> {
        tokio::fs::create_dir_all(&job.job_dir).await.map_err(|e| {
            DomainError::FsFail(format!(
                "Failed to create job directory {}: {}",
                job.job_dir.display(),
                e
            ))
        })?;
        let output = job.output_path();
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let _cleanup = StatsCleanupGuard::new(&job.job_dir);
        let rendition = RenditionGuard::new(&output);

        for &pass in plan.passes() {
            if cancel.is_cancelled() {
                state.cancel();
                info!(job_id = %job.job_id, completed = state.completed_passes(), "Job cancelled");
                return Err(DomainError::Cancelled {
                    completed_passes: state.completed_passes(),
                });
            }

            let footprint = pass_footprint_mib(profile, job.asset.duration_seconds(), pass.kind);
            let _permit = self.budget.reserve(footprint).await?;

            state.begin_pass(pass.index)?;
            self.progress.on_pass_start(&job.job_id, pass.index, plan.total());

            let invocation = build_invocation(job, profile, plan, pass, &output);
            let started = Instant::now();
            let outcome = self.encoder.run_pass(&invocation).await;
            let elapsed = started.elapsed();

            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(err) => {
                    state.fail(elapsed);
                    return Err(as_pass_failure(err, &invocation));
                }
            };
            if !outcome.stderr.is_empty() {
                debug!(job_id = %job.job_id, pass = pass.index, stderr = %outcome.stderr, "Encoder diagnostics");
            }

            if let Some(stats) = &invocation.stats_out {
                if !stats_written(stats).await {
                    state.fail(elapsed);
                    return Err(missing_artifact(&invocation, "statistics log", stats, &outcome.stderr));
                }
            }
            if pass.kind == PassKind::Final && !path_exists(&output).await {
                state.fail(elapsed);
                return Err(missing_artifact(&invocation, "rendition", &output, &outcome.stderr));
            }

            state.complete_pass(pass.index, elapsed, invocation.stats_out.clone())?;
            self.progress
                .on_pass_complete(&job.job_id, pass.index, plan.total(), elapsed);
        }

        rendition.keep();
        Ok(output)
    }
}

fn build_invocation(
    job: &EncodeJob,
    profile: &EncodingProfile,
    plan: &PassPlan,
    pass: PlannedPass,
    output: &Path,
) -> EncodeInvocation {
    let is_final = pass.kind == PassKind::Final;
    let stats_in = (pass.index > 1).then(|| JobLayout::stats_log(&job.job_dir, pass.index - 1));
    let stats_out = pass
        .kind
        .writes_stats()
        .then(|| JobLayout::stats_log(&job.job_dir, pass.index));
    let spherical = if is_final {
        job.projection
            .as_ref()
            .filter(|meta| meta.is_spherical())
            .map(|meta| meta.projection())
    } else {
        None
    };

    EncodeInvocation {
        job_id: job.job_id.clone(),
        format: job.format,
        codec: profile.codec,
        container: profile.container,
        input: job.source.path().to_path_buf(),
        output: if is_final {
            PassOutput::File(output.to_path_buf())
        } else {
            PassOutput::Discard
        },
        pass_index: pass.index,
        total_passes: plan.total(),
        stats_in,
        stats_out,
        rate: RateControl {
            target_kbps: profile.target_bitrate_kbps,
            min_kbps: profile.min_bitrate_kbps,
            max_kbps: profile.max_bitrate_kbps,
            crf: profile.crf,
        },
        audio_bitrate_kbps: is_final.then_some(profile.audio_bitrate_kbps),
        spherical,
        scale: job.tier.as_ref().map(|tier| tier.level.resolution()),
        keyframe_seconds: job.tier.as_ref().map(|tier| tier.keyframe_seconds),
    }
}

fn pass_footprint_mib(profile: &EncodingProfile, duration: f64, kind: PassKind) -> u32 {
    match kind {
        PassKind::Final => Utils::bitrate_footprint_mib(
            profile.max_bitrate_kbps + profile.audio_bitrate_kbps,
            duration,
        )
        .max(STATS_FOOTPRINT_MIB),
        PassKind::Analysis | PassKind::Refinement => STATS_FOOTPRINT_MIB,
    }
}

/// Any encoder error becomes a pass failure carrying codec and pass context
fn as_pass_failure(err: DomainError, invocation: &EncodeInvocation) -> DomainError {
    match err {
        failure @ DomainError::PassExecutionFailed { .. } => failure,
        other => DomainError::PassExecutionFailed {
            format: invocation.format.as_str().to_string(),
            codec: invocation.codec.as_str().to_string(),
            pass_index: invocation.pass_index,
            total_passes: invocation.total_passes,
            exit_code: None,
            stderr: other.to_string(),
        },
    }
}

fn missing_artifact(invocation: &EncodeInvocation, what: &str, path: &Path, stderr: &str) -> DomainError {
    warn!(
        job_id = %invocation.job_id,
        pass = invocation.pass_index,
        path = %path.display(),
        "Encoder reported success but {} is missing",
        what
    );
    let mut message = format!("{} {} was not written", what, path.display());
    if !stderr.is_empty() {
        message.push('\n');
        message.push_str(stderr);
    }
    DomainError::PassExecutionFailed {
        format: invocation.format.as_str().to_string(),
        codec: invocation.codec.as_str().to_string(),
        pass_index: invocation.pass_index,
        total_passes: invocation.total_passes,
        exit_code: Some(0),
        stderr: message,
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

/// Encoders may suffix the requested log name (`pass_1-0.log`), so any file
/// starting with the log's stem counts
async fn stats_written(stats: &Path) -> bool {
    if path_exists(stats).await {
        return true;
    }
    let (Some(dir), Some(stem)) = (stats.parent(), stats.file_stem()) else {
        return false;
    };
    let stem = stem.to_string_lossy().into_owned();
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return false;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_name().to_string_lossy().starts_with(&stem) {
            return true;
        }
    }
    false
}
