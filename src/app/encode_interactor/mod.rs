// Encode interactor - Multi-format rendition jobs for one source

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::app::analyze_interactor::{AnalyzeInteractor, AnalyzeRequest};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::DisplayClass;
use crate::engine::{CancelFlag, EncodeJob, EncodedRendition, FailureReport, JobRunner};
use crate::output::package::rendition_file;
use crate::output::{build_ladder, LadderRequest};
use crate::planner::{CompletedRenditions, SourceSelector};
use crate::ports::*;
use crate::utils::path::JobLayout;

/// One `encode_rendition` job: every requested format of one source
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub input: PathBuf,
    pub asset_id: Option<String>,
    pub formats: Vec<OutputFormat>,
    pub preset: QualityPreset,
}

/// One `encode_ladder` job: every ladder level of one source, written where
/// the package builder looks for them
#[derive(Debug, Clone)]
pub struct LadderEncodeRequest {
    pub input: PathBuf,
    pub asset_id: Option<String>,
    pub codecs: Vec<Codec>,
    /// Empty keeps every tier the source fits
    pub classes: Vec<DisplayClass>,
    pub hints: Option<ContentHints>,
    pub preset: QualityPreset,
    /// Receives `{level}_{codec}.{ext}` files
    pub renditions_dir: PathBuf,
    /// Package segment length; renditions get a keyframe at every boundary
    pub segment_duration: u32,
}

/// A rendition that finished every pass
#[derive(Debug, Clone, Serialize)]
pub struct RenditionSummary {
    pub job_id: String,
    pub format: OutputFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    pub output: PathBuf,
    pub source: PathBuf,
    pub from_intermediate: bool,
    pub passes: u8,
    pub target_bitrate_kbps: u32,
}

impl From<&EncodedRendition> for RenditionSummary {
    fn from(rendition: &EncodedRendition) -> Self {
        Self {
            job_id: rendition.job_id.clone(),
            format: rendition.format,
            tier: rendition.tier.clone(),
            output: rendition.output.clone(),
            source: rendition.source.path().to_path_buf(),
            from_intermediate: rendition.source.is_intermediate(),
            passes: rendition.state.total_passes(),
            target_bitrate_kbps: rendition.profile.target_bitrate_kbps,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EncodeResponse {
    pub asset_id: String,
    pub projection: ProjectionMetadata,
    pub renditions: Vec<RenditionSummary>,
    pub failures: Vec<FailureReport>,
}

impl EncodeResponse {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Interactor for rendition encoding
pub struct EncodeInteractor {
    analyze: Arc<AnalyzeInteractor>,
    runner: Arc<JobRunner>,
    fs_port: Arc<dyn FsPort>,
    layout: JobLayout,
}

impl EncodeInteractor {
    /// Create new encode interactor with injected collaborators
    pub fn new(
        analyze: Arc<AnalyzeInteractor>,
        runner: Arc<JobRunner>,
        fs_port: Arc<dyn FsPort>,
        layout: JobLayout,
    ) -> Self {
        Self {
            analyze,
            runner,
            fs_port,
            layout,
        }
    }

    pub fn layout(&self) -> &JobLayout {
        &self.layout
    }

    /// Encode every requested format. Formats that can re-encode from
    /// another rendition run after the formats that produce one; only an
    /// upstream job that completed in this call is used as their source.
    pub async fn encode_rendition(
        &self,
        request: &EncodeRequest,
        cancel: CancelFlag,
    ) -> Result<EncodeResponse, DomainError> {
        if request.formats.is_empty() {
            return Err(DomainError::BadArgs("no output formats requested".to_string()));
        }
        let analysis = self
            .analyze
            .analyze(&AnalyzeRequest {
                input: request.input.clone(),
                asset_id: request.asset_id.clone(),
            })
            .await?;
        let asset = analysis.asset;
        let projection = analysis.projection;

        let mut formats: Vec<OutputFormat> = Vec::new();
        for format in &request.formats {
            if !formats.contains(format) {
                formats.push(*format);
            }
        }
        let (upstream, derived): (Vec<OutputFormat>, Vec<OutputFormat>) = formats
            .into_iter()
            .partition(|format| format.preferred_intermediate().is_none());

        info!(
            asset_id = %asset.id(),
            upstream = upstream.len(),
            derived = derived.len(),
            preset = %request.preset.as_str(),
            "Scheduling encode jobs"
        );

        let mut response = EncodeResponse {
            asset_id: asset.id().to_string(),
            projection: projection.clone(),
            renditions: Vec::new(),
            failures: Vec::new(),
        };

        let mut completed = CompletedRenditions::new();
        for stage in [upstream, derived] {
            if stage.is_empty() {
                continue;
            }
            let jobs: Vec<EncodeJob> = stage
                .into_iter()
                .map(|format| {
                    let source = SourceSelector::select(format, asset.source_path(), &completed);
                    EncodeJob::new(
                        asset.clone(),
                        format,
                        request.preset,
                        Some(projection.clone()),
                        source,
                        &self.layout,
                    )
                })
                .collect();

            for rendition in self.collect(jobs, &cancel, &mut response).await {
                completed.record(rendition.format, rendition.output);
            }
        }

        Ok(response)
    }

    /// Encode one rendition per ladder level, scaled to the level's size
    /// and rated by its bitrates, into `renditions_dir`
    pub async fn encode_ladder(
        &self,
        request: &LadderEncodeRequest,
        cancel: CancelFlag,
    ) -> Result<EncodeResponse, DomainError> {
        let analysis = self
            .analyze
            .analyze(&AnalyzeRequest {
                input: request.input.clone(),
                asset_id: request.asset_id.clone(),
            })
            .await?;
        let asset = analysis.asset;
        let projection = analysis.projection;

        let levels = build_ladder(&LadderRequest::for_asset(
            &asset,
            Some(&projection),
            request.codecs.clone(),
            request.classes.clone(),
            request.hints.as_ref(),
        ))?;
        self.fs_port.create_directory(&request.renditions_dir).await?;

        let jobs = levels
            .into_iter()
            .map(|level| {
                let output = rendition_file(&request.renditions_dir, &level);
                EncodeJob::for_tier(
                    asset.clone(),
                    level,
                    request.preset,
                    Some(projection.clone()),
                    output,
                    request.segment_duration,
                    &self.layout,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            asset_id = %asset.id(),
            levels = jobs.len(),
            renditions = %request.renditions_dir.display(),
            "Scheduling ladder encode"
        );

        let mut response = EncodeResponse {
            asset_id: asset.id().to_string(),
            projection,
            renditions: Vec::new(),
            failures: Vec::new(),
        };
        self.collect(jobs, &cancel, &mut response).await;
        Ok(response)
    }

    /// Run `jobs` on the worker pool, recording every outcome in `response`
    async fn collect(
        &self,
        jobs: Vec<EncodeJob>,
        cancel: &CancelFlag,
        response: &mut EncodeResponse,
    ) -> Vec<EncodedRendition> {
        let mut finished = Vec::new();
        for (job_id, result) in self.runner.run_all(jobs, cancel.clone()).await {
            match result {
                Ok(rendition) => {
                    response.renditions.push(RenditionSummary::from(&rendition));
                    finished.push(rendition);
                }
                Err(failure) => {
                    warn!(job_id = %job_id, error = %failure.error, "Rendition failed");
                    response.failures.push(failure.report());
                }
            }
        }
        finished
    }
}
