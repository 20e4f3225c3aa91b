// Analyze interactor - Probes a source and classifies its projection

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;
use crate::probe::SphericalAnalyzer;
use crate::utils::path::asset_id_for;

/// Source to classify
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub input: PathBuf,
    /// Defaults to the file stem
    pub asset_id: Option<String>,
}

impl AnalyzeRequest {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            asset_id: None,
        }
    }
}

/// Ingested asset with its one classification
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    pub asset: VideoAsset,
    pub projection: ProjectionMetadata,
    pub tags: BTreeMap<String, String>,
}

/// Interactor for source ingestion and projection analysis
pub struct AnalyzeInteractor {
    probe_port: Arc<dyn ProbePort>,
    fs_port: Arc<dyn FsPort>,
    analyzer: SphericalAnalyzer,
}

impl AnalyzeInteractor {
    /// Create new analyze interactor with injected ports
    pub fn new(probe_port: Arc<dyn ProbePort>, fs_port: Arc<dyn FsPort>) -> Self {
        Self {
            probe_port,
            fs_port,
            analyzer: SphericalAnalyzer::new(),
        }
    }

    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, DomainError> {
        if !self.fs_port.file_exists(&request.input).await? {
            return Err(DomainError::FsFail(format!(
                "Input file does not exist: {}",
                request.input.display()
            )));
        }

        let media = self.probe_port.probe_media(&request.input).await?;
        let asset_id = request
            .asset_id
            .clone()
            .unwrap_or_else(|| asset_id_for(&request.input));
        let asset = media.into_asset(&asset_id, &request.input)?;
        let projection = self.analyzer.analyze_asset(&asset, media.tags.clone());

        info!(
            asset_id = %asset.id(),
            resolution = %asset.resolution(),
            projection = %projection.projection(),
            confidence = projection.confidence(),
            "Source analyzed"
        );

        Ok(AnalyzeResponse {
            asset,
            projection,
            tags: media.tags,
        })
    }
}
