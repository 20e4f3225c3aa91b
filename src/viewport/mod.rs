//! Viewport extraction, thumbnails and sprite sheets

pub mod perspective;
pub mod sprite;

use std::fmt;
use std::str::FromStr;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::{ProjectionMetadata, Resolution, ViewDirection, Viewport};
use crate::projection::{
    convert_frame, CubemapLayout, Pole, ProjectionGeometry, ProjectionParams,
};

pub use perspective::{render_flat, render_perspective, PerspectiveCamera};
pub use sprite::{build_sprite_sheet, sprite_timestamps, webvtt_index, SpriteGrid, MAX_SPRITE_TILES};

/// Named thumbnail views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailPreset {
    Direction(ViewDirection),
    /// Whole sphere folded around the nadir
    Stereographic,
}

impl ThumbnailPreset {
    /// The six directions followed by the little-planet view
    pub fn all() -> Vec<ThumbnailPreset> {
        ViewDirection::ALL
            .iter()
            .copied()
            .map(ThumbnailPreset::Direction)
            .chain(std::iter::once(ThumbnailPreset::Stereographic))
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailPreset::Direction(direction) => direction.as_str(),
            ThumbnailPreset::Stereographic => "stereographic",
        }
    }
}

impl fmt::Display for ThumbnailPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThumbnailPreset {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stereographic" | "little_planet" | "little-planet" => {
                Ok(ThumbnailPreset::Stereographic)
            }
            other => other.parse().map(ThumbnailPreset::Direction),
        }
    }
}

/// Extracts flat views from frames of one source
#[derive(Debug, Clone, Copy)]
pub struct ViewportExtractor {
    /// `None` when the source is not spherical
    source: Option<ProjectionGeometry>,
}

impl ViewportExtractor {
    /// Extractor for an explicit source geometry
    pub fn new(source: ProjectionGeometry) -> Self {
        Self {
            source: Some(source),
        }
    }

    /// Extractor that resizes whole frames
    pub fn flat() -> Self {
        Self { source: None }
    }

    /// Pick geometry from a classification, falling back to flat output for
    /// non-spherical or unusable classifications
    pub fn for_metadata(
        metadata: &ProjectionMetadata,
        layout: Option<CubemapLayout>,
        params: &ProjectionParams,
    ) -> Self {
        let projection = match metadata.require_spherical() {
            Ok(projection) => projection,
            Err(err) => {
                debug!(reason = %err, "Using flat extraction");
                return Self::flat();
            }
        };
        match ProjectionGeometry::resolve(projection, layout, params) {
            Ok(geometry) => Self::new(geometry),
            Err(err) => {
                warn!(projection = %projection, error = %err, "Falling back to flat extraction");
                Self::flat()
            }
        }
    }

    pub fn is_flat(&self) -> bool {
        self.source.is_none()
    }

    /// One perspective view
    pub fn extract(&self, frame: &RgbImage, viewport: &Viewport) -> Result<RgbImage, DomainError> {
        match self.source {
            Some(source) => render_perspective(frame, source, viewport),
            None => Ok(render_flat(frame, viewport.output())),
        }
    }

    /// Square thumbnail for a named preset
    pub fn thumbnail(
        &self,
        frame: &RgbImage,
        preset: ThumbnailPreset,
        size: u32,
        fov: f64,
    ) -> Result<RgbImage, DomainError> {
        let output = Resolution::new(size, size)?;
        match (preset, self.source) {
            (ThumbnailPreset::Direction(direction), _) => {
                let viewport = Viewport::from_direction(direction, fov, output)?;
                self.extract(frame, &viewport)
            }
            (ThumbnailPreset::Stereographic, Some(source)) => convert_frame(
                frame,
                source,
                ProjectionGeometry::Stereographic {
                    pole: Pole::South,
                    fov: ProjectionParams::default().stereographic_fov,
                },
                output,
            ),
            (ThumbnailPreset::Stereographic, None) => Ok(render_flat(frame, output)),
        }
    }

    /// One thumbnail per preset, in preset order
    pub fn thumbnails(
        &self,
        frame: &RgbImage,
        presets: &[ThumbnailPreset],
        size: u32,
        fov: f64,
    ) -> Result<Vec<(ThumbnailPreset, RgbImage)>, DomainError> {
        presets
            .iter()
            .map(|&preset| Ok((preset, self.thumbnail(frame, preset, size, fov)?)))
            .collect()
    }
}
