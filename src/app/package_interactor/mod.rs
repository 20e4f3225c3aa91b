// Package interactor - Streaming package assembly for one source

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::app::analyze_interactor::{AnalyzeInteractor, AnalyzeRequest};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::DisplayClass;
use crate::output::{PackageBuilder, PackageReport, PackageRequest};

/// One `build_streaming_package` job
#[derive(Debug, Clone)]
pub struct PackageJob {
    /// Source the renditions were encoded from
    pub input: PathBuf,
    pub asset_id: Option<String>,
    pub renditions_dir: PathBuf,
    pub output_dir: PathBuf,
    pub formats: Vec<StreamingFormat>,
    pub codecs: Vec<Codec>,
    /// Empty keeps every tier the source fits
    pub classes: Vec<DisplayClass>,
    pub hints: Option<ContentHints>,
    pub publish_time: DateTime<Utc>,
}

/// Interactor for streaming package assembly
pub struct PackageInteractor {
    analyze: Arc<AnalyzeInteractor>,
    builder: Arc<PackageBuilder>,
}

impl PackageInteractor {
    /// Create new package interactor with injected collaborators
    pub fn new(analyze: Arc<AnalyzeInteractor>, builder: Arc<PackageBuilder>) -> Self {
        Self { analyze, builder }
    }

    /// Analyze the source, then package its renditions. Formats whose
    /// renditions are incomplete come back in the report's failures.
    pub async fn build_streaming_package(&self, job: &PackageJob) -> Result<PackageReport, DomainError> {
        let analysis = self
            .analyze
            .analyze(&AnalyzeRequest {
                input: job.input.clone(),
                asset_id: job.asset_id.clone(),
            })
            .await?;

        let request = PackageRequest {
            asset: analysis.asset,
            projection: Some(analysis.projection),
            formats: job.formats.clone(),
            codecs: job.codecs.clone(),
            classes: job.classes.clone(),
            hints: job.hints.clone(),
            renditions_dir: job.renditions_dir.clone(),
            output_dir: job.output_dir.clone(),
            publish_time: job.publish_time,
        };
        let report = self.builder.build(&request).await?;

        info!(
            asset_id = %report.package.asset_id,
            output = %report.package.output_dir.display(),
            complete = report.is_complete(),
            "Package job finished"
        );
        Ok(report)
    }
}
