//! Bitrate ladder generation

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::errors::DomainError;
use crate::domain::model::{
    BitrateLevel, Codec, Container, ContentHints, ProjectionMetadata, ProjectionType, Resolution, VideoAsset,
};
use crate::domain::rules::{spherical_tiers, standard_tiers, validate_ladder_order, DisplayClass, LadderTier};

/// Inputs for one ladder computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderRequest {
    pub source: Resolution,
    pub duration_seconds: f64,
    /// Use the 2:1 spherical tier table
    pub spherical: bool,
    /// One ladder group per codec, in this order
    pub codecs: Vec<Codec>,
    /// Display classes to keep; empty keeps every class
    #[serde(default)]
    pub classes: Vec<DisplayClass>,
    /// Scale applied to every bitrate, from content hints
    #[serde(default = "unit")]
    pub motion_multiplier: f64,
}

fn unit() -> f64 {
    1.0
}

impl LadderRequest {
    pub fn new(source: Resolution, duration_seconds: f64, spherical: bool, codecs: Vec<Codec>) -> Self {
        Self {
            source,
            duration_seconds,
            spherical,
            codecs,
            classes: Vec::new(),
            motion_multiplier: 1.0,
        }
    }

    /// Inputs for an analyzed asset. The 2:1 tier table applies to
    /// equirectangular sources only; hints scale every bitrate.
    pub fn for_asset(
        asset: &VideoAsset,
        projection: Option<&ProjectionMetadata>,
        codecs: Vec<Codec>,
        classes: Vec<DisplayClass>,
        hints: Option<&ContentHints>,
    ) -> Self {
        let equirect = projection
            .is_some_and(|meta| meta.is_spherical() && meta.projection() == ProjectionType::Equirectangular);
        Self::new(asset.resolution(), asset.duration_seconds(), equirect, codecs)
            .with_classes(classes)
            .with_motion_multiplier(hints.map(|h| h.motion_multiplier()).unwrap_or(1.0))
    }

    pub fn with_classes(mut self, classes: Vec<DisplayClass>) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_motion_multiplier(mut self, multiplier: f64) -> Self {
        self.motion_multiplier = multiplier;
        self
    }
}

/// Container a packaged rendition of `codec` is muxed into
pub fn packaging_container(codec: Codec) -> Result<Container, DomainError> {
    match codec {
        Codec::H264 | Codec::Hevc | Codec::Av1 => Ok(Container::Mp4),
        Codec::Vp9 => Ok(Container::Webm),
        Codec::Theora => Err(DomainError::UnsupportedFormat(
            "theora renditions cannot be packaged for adaptive streaming".to_string(),
        )),
    }
}

/// Compute the ordered ladder: codec groups in request order, each ascending
/// by resolution. Pure; identical requests give identical ladders.
pub fn build_ladder(request: &LadderRequest) -> Result<Vec<BitrateLevel>, DomainError> {
    if request.codecs.is_empty() {
        return Err(DomainError::BadArgs("ladder needs at least one codec".to_string()));
    }
    let multiplier = if request.motion_multiplier.is_finite() && request.motion_multiplier > 0.0 {
        request.motion_multiplier
    } else {
        1.0
    };

    let tiers = select_tiers(request)?;
    let mut levels = Vec::with_capacity(tiers.len() * request.codecs.len());

    for &codec in &request.codecs {
        let container = packaging_container(codec)?;
        let group: Vec<BitrateLevel> = tiers
            .iter()
            .map(|tier| BitrateLevel {
                name: tier.name.clone(),
                width: tier.width,
                height: tier.height,
                bitrate_kbps: scale(tier.bitrate_kbps, multiplier),
                max_bitrate_kbps: scale(tier.max_bitrate_kbps, multiplier),
                codec,
                container,
            })
            .collect();
        validate_ladder_order(&group)?;
        levels.extend(group);
    }

    debug!(
        source = %request.source,
        spherical = request.spherical,
        levels = levels.len(),
        "Computed bitrate ladder"
    );
    Ok(levels)
}

#[derive(Debug, Clone)]
struct SelectedTier {
    name: String,
    width: u32,
    height: u32,
    bitrate_kbps: u32,
    max_bitrate_kbps: u32,
}

impl From<&LadderTier> for SelectedTier {
    fn from(tier: &LadderTier) -> Self {
        Self {
            name: tier.name.to_string(),
            width: tier.width,
            height: tier.height,
            bitrate_kbps: tier.bitrate_kbps,
            max_bitrate_kbps: tier.max_bitrate_kbps,
        }
    }
}

fn select_tiers(request: &LadderRequest) -> Result<Vec<SelectedTier>, DomainError> {
    let table = if request.spherical {
        spherical_tiers()
    } else {
        standard_tiers()
    };

    let fitting: Vec<&LadderTier> = table
        .iter()
        .filter(|tier| tier.width <= request.source.width && tier.height <= request.source.height)
        .collect();

    // Sources smaller than the lowest tier still get one native rung
    if fitting.is_empty() {
        return Ok(vec![native_tier(request.source, &table[0])]);
    }

    let selected: Vec<SelectedTier> = fitting
        .into_iter()
        .filter(|tier| request.classes.is_empty() || request.classes.contains(&tier.class))
        .map(SelectedTier::from)
        .collect();

    if selected.is_empty() {
        let classes: Vec<&str> = request.classes.iter().map(|c| c.as_str()).collect();
        return Err(DomainError::BadArgs(format!(
            "no ladder tier of class {} fits a {} source",
            classes.join("/"),
            request.source
        )));
    }
    Ok(selected)
}

fn native_tier(source: Resolution, lowest: &LadderTier) -> SelectedTier {
    let width = (source.width & !1).max(2);
    let height = (source.height & !1).max(2);
    let ratio = (width as f64 * height as f64) / (lowest.width as f64 * lowest.height as f64);
    SelectedTier {
        name: format!("{}p", height),
        width,
        height,
        bitrate_kbps: scale(lowest.bitrate_kbps, ratio).max(1),
        max_bitrate_kbps: scale(lowest.max_bitrate_kbps, ratio).max(1),
    }
}

fn scale(kbps: u32, multiplier: f64) -> u32 {
    (kbps as f64 * multiplier).round() as u32
}
