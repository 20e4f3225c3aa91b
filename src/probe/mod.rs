//! Media inspection and spherical classification

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::model::{Resolution, VideoAsset};

pub mod spherical;

pub use spherical::{AnalysisInput, SphericalAnalyzer};

/// Facts read from a source container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbedMedia {
    pub width: u32,
    pub height: u32,
    /// Duration in seconds
    pub duration: f64,
    pub frame_rate: f64,
    /// Format, stream and side-data tags merged into one map
    pub tags: BTreeMap<String, String>,
}

impl ProbedMedia {
    /// Turn probe output into an immutable asset
    pub fn into_asset(&self, id: &str, path: &Path) -> Result<VideoAsset, DomainError> {
        VideoAsset::new(
            id,
            path,
            self.duration,
            Resolution::new(self.width, self.height)?,
            self.frame_rate,
        )
    }

    /// Parse `ffprobe -print_format json -show_format -show_streams` output
    pub fn from_ffprobe_json(json: &str) -> Result<Self, DomainError> {
        let report: FfprobeReport = serde_json::from_str(json)
            .map_err(|e| DomainError::DecodeFail(format!("Invalid ffprobe output: {}", e)))?;

        let video = report
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| DomainError::DecodeFail("No video stream found".to_string()))?;

        let mut tags = report.format.tags.clone();
        tags.extend(video.tags.clone());
        for side_data in &video.side_data_list {
            if side_data.side_data_type.as_deref() == Some("Spherical Mapping") {
                tags.insert(
                    "spherical".to_string(),
                    side_data
                        .projection
                        .clone()
                        .unwrap_or_else(|| "equirectangular".to_string()),
                );
            }
            if side_data.side_data_type.as_deref() == Some("Stereo 3D") {
                if let Some(kind) = &side_data.r#type {
                    let mode = match kind.as_str() {
                        "top and bottom" => "top-bottom",
                        "side by side" => "left-right",
                        other => other,
                    };
                    tags.insert("stereo_mode".to_string(), mode.to_string());
                }
            }
        }

        let duration = report
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        Ok(Self {
            width: video.width.unwrap_or(0),
            height: video.height.unwrap_or(0),
            duration,
            frame_rate: video
                .r_frame_rate
                .as_deref()
                .and_then(parse_rational)
                .unwrap_or(30.0),
            tags,
        })
    }
}

/// Parse "30000/1001" or "25" style rates
fn parse_rational(value: &str) -> Option<f64> {
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num.trim().parse::<f64>().ok()? / den
        }
        None => value.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[derive(Debug, Deserialize)]
struct FfprobeReport {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: FfprobeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    side_data_type: Option<String>,
    projection: Option<String>,
    r#type: Option<String>,
}
