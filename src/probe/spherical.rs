//! Spherical projection classification
//!
//! Three independent signals are evaluated: embedded metadata tags, the frame
//! aspect ratio and tokens in the file name. The most confident signal wins;
//! on equal confidence the metadata tag beats the heuristics.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::model::*;

/// Frame aspect ratios accepted as 2:1 (plus or minus 5%)
const TWO_TO_ONE: std::ops::RangeInclusive<f64> = 1.9..=2.1;

const SPHERICAL_TAG_MARKERS: [&str; 5] = [
    "spherical",
    "sphericalvideo",
    "spherical-video",
    "projection_type",
    "projectiontype",
];

const STEREO_TAG_MARKERS: [&str; 3] = ["stereo_mode", "stereomode", "stereoscopicmode"];

const FILENAME_VOCABULARY: [&str; 8] = [
    "360",
    "vr",
    "spherical",
    "equirect",
    "equirectangular",
    "panoramic",
    "immersive",
    "omnidirectional",
];

/// Inputs to one classification
#[derive(Debug, Clone, Default)]
pub struct AnalysisInput {
    /// Container/stream tags, keys as found in the file
    pub tags: BTreeMap<String, String>,
    pub file_name: Option<String>,
    pub aspect_ratio: Option<f64>,
}

impl AnalysisInput {
    /// Gather the signals available for an asset
    pub fn for_asset(asset: &VideoAsset, tags: BTreeMap<String, String>) -> Self {
        Self {
            tags,
            file_name: Some(asset.file_name()),
            aspect_ratio: Some(asset.resolution().aspect_ratio()),
        }
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: f64) -> Self {
        self.aspect_ratio = Some(aspect_ratio);
        self
    }
}

/// One fired signal and the projection it suggests
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    signal: DetectionSignal,
    projection: ProjectionType,
}

/// Classifies projection type, stereo mode and confidence
#[derive(Debug, Clone, Copy, Default)]
pub struct SphericalAnalyzer;

impl SphericalAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Classify the given signals. Never fails: no signal yields `unknown`.
    pub fn analyze(&self, input: &AnalysisInput) -> ProjectionMetadata {
        let mut candidates = Vec::new();
        let tag_projection = Self::tag_signal(&input.tags);

        if let Some(projection) = tag_projection {
            candidates.push(Candidate {
                signal: DetectionSignal::MetadataTag,
                projection,
            });
        }
        if let Some(ratio) = input.aspect_ratio {
            if Self::is_two_to_one(ratio) {
                candidates.push(Candidate {
                    signal: DetectionSignal::AspectRatio,
                    projection: ProjectionType::Equirectangular,
                });
            }
        }
        if let Some(name) = input.file_name.as_deref() {
            if let Some(projection) = Self::filename_signal(name) {
                candidates.push(Candidate {
                    signal: DetectionSignal::Filename,
                    projection,
                });
            }
        }

        let signals: Vec<DetectionSignal> = candidates.iter().map(|c| c.signal).collect();
        let winner = candidates.iter().copied().reduce(|best, next| {
            let (a, b) = (best.signal.confidence(), next.signal.confidence());
            if b > a || (b == a && next.signal.is_structural() && !best.signal.is_structural()) {
                next
            } else {
                best
            }
        });

        let Some(winner) = winner else {
            debug!("No spherical signal detected");
            return ProjectionMetadata::unknown();
        };

        let stereo_mode = if tag_projection.is_some() {
            Self::stereo_signal(&input.tags)
        } else {
            StereoMode::Mono
        };

        debug!(
            projection = %winner.projection,
            signal = ?winner.signal,
            fired = signals.len(),
            "Classified projection"
        );

        ProjectionMetadata::new(
            winner.projection,
            stereo_mode,
            winner.signal.confidence(),
            signals,
        )
    }

    /// Convenience entry for an ingested asset
    pub fn analyze_asset(
        &self,
        asset: &VideoAsset,
        tags: BTreeMap<String, String>,
    ) -> ProjectionMetadata {
        self.analyze(&AnalysisInput::for_asset(asset, tags))
    }

    fn is_two_to_one(ratio: f64) -> bool {
        TWO_TO_ONE.contains(&ratio)
    }

    fn tag_signal(tags: &BTreeMap<String, String>) -> Option<ProjectionType> {
        let mut found = false;
        let mut projection = ProjectionType::Equirectangular;

        for (name, value) in tags {
            let name = name.to_lowercase();
            if !SPHERICAL_TAG_MARKERS.iter().any(|m| name.contains(m)) {
                continue;
            }
            found = true;
            if let Some(parsed) = Self::projection_in_value(value) {
                projection = parsed;
            }
        }

        found.then_some(projection)
    }

    fn projection_in_value(value: &str) -> Option<ProjectionType> {
        let value = value.to_lowercase();
        [
            ("equirectangular", ProjectionType::Equirectangular),
            ("cubemap", ProjectionType::Cubemap),
            ("cylindrical", ProjectionType::Cylindrical),
            ("stereographic", ProjectionType::Stereographic),
            ("fisheye", ProjectionType::Fisheye),
        ]
        .into_iter()
        .find(|(marker, _)| value.contains(marker))
        .map(|(_, projection)| projection)
    }

    fn stereo_signal(tags: &BTreeMap<String, String>) -> StereoMode {
        for (name, value) in tags {
            let name = name.to_lowercase();
            if !STEREO_TAG_MARKERS.iter().any(|m| name.contains(m)) {
                continue;
            }
            let value = value.to_lowercase();
            if value.contains("top-bottom") || value == "tb" {
                return StereoMode::TopBottom;
            }
            if value.contains("left-right") || value == "lr" {
                return StereoMode::LeftRight;
            }
        }
        StereoMode::Mono
    }

    fn filename_signal(file_name: &str) -> Option<ProjectionType> {
        let stem = file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(file_name)
            .to_lowercase();
        let tokens: Vec<&str> = stem
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let specific = tokens.iter().find_map(|token| match *token {
            "cube" | "cubemap" => Some(ProjectionType::Cubemap),
            "cylindrical" | "cylinder" => Some(ProjectionType::Cylindrical),
            "fisheye" => Some(ProjectionType::Fisheye),
            "equirect" | "equirectangular" | "spherical" => Some(ProjectionType::Equirectangular),
            _ => None,
        });
        if specific.is_some() {
            return specific;
        }

        tokens
            .iter()
            .any(|token| FILENAME_VOCABULARY.contains(token))
            .then_some(ProjectionType::Equirectangular)
    }
}
