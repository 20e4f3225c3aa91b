//! JSON descriptors written next to the manifests

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::model::{BitrateLevel, ProjectionMetadata, Resolution, StereoMode, TiledVariant};
use crate::output::tiling::TileGrid;

const DESCRIPTOR_VERSION: &str = "1.0";

/// Tile layout per level for viewport-adaptive players
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportDescriptor {
    pub version: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub projection: String,
    pub stereo_mode: StereoMode,
    pub segment_duration: u32,
    pub grid: TileGrid,
    pub levels: Vec<TiledVariant>,
}

impl ViewportDescriptor {
    pub fn new(
        projection: &ProjectionMetadata,
        segment_duration: u32,
        grid: TileGrid,
        levels: Vec<TiledVariant>,
    ) -> Self {
        Self {
            version: DESCRIPTOR_VERSION.to_string(),
            kind: "viewport_adaptive".to_string(),
            projection: projection.projection().as_str().to_string(),
            stereo_mode: projection.stereo_mode(),
            segment_duration,
            grid,
            levels,
        }
    }
}

/// One ladder row as listed in the descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderEntry {
    pub key: String,
    #[serde(flatten)]
    pub level: BitrateLevel,
}

/// Streaming format that could not be packaged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatFailure {
    pub format: String,
    pub error: String,
}

/// Summary of one package build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderDescriptor {
    pub version: String,
    pub asset_id: String,
    pub source: Resolution,
    pub duration_seconds: f64,
    pub projection: Option<ProjectionMetadata>,
    pub segment_duration: u32,
    pub levels: Vec<LadderEntry>,
    pub hls_playlist: Option<String>,
    pub dash_manifest: Option<String>,
    pub viewport_manifest: Option<String>,
    #[serde(default)]
    pub failures: Vec<FormatFailure>,
}

impl LadderDescriptor {
    pub fn entries(levels: &[BitrateLevel]) -> Vec<LadderEntry> {
        levels
            .iter()
            .map(|level| LadderEntry {
                key: level.rendition_key(),
                level: level.clone(),
            })
            .collect()
    }
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String, DomainError> {
    let mut json = serde_json::to_string_pretty(value)
        .map_err(|e| DomainError::ManifestWrite(format!("JSON: {}", e)))?;
    json.push('\n');
    Ok(json)
}
