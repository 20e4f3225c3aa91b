// Domain rules - Lookup tables and policies

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::errors::*;
use crate::domain::model::*;

/// Base bitrates per quality preset: (target, min, max, audio, crf)
const PRESET_BASE: [(QualityPreset, u32, u32, u32, u32, u8); 4] = [
    (QualityPreset::Low, 1000, 500, 1500, 128, 28),
    (QualityPreset::Medium, 2500, 1000, 4000, 192, 23),
    (QualityPreset::High, 5000, 2000, 8000, 256, 18),
    (QualityPreset::Ultra, 10000, 5000, 15000, 320, 15),
];

/// Read-only encoding profile table keyed by (format, preset)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileTable {
    entries: Vec<EncodingProfile>,
}

impl ProfileTable {
    /// Built-in table covering every format and preset
    pub fn standard() -> Self {
        let mut entries = Vec::with_capacity(OutputFormat::ALL.len() * PRESET_BASE.len());
        for format in OutputFormat::ALL {
            for &(preset, target, min, max, audio, crf) in &PRESET_BASE {
                let codec = format.codec();
                let efficiency = Self::codec_efficiency(codec, preset);
                let scale = |kbps: u32| (kbps as f64 * efficiency).round() as u32;

                entries.push(EncodingProfile {
                    format,
                    preset,
                    codec,
                    container: format.container(),
                    target_bitrate_kbps: scale(target),
                    min_bitrate_kbps: scale(min),
                    max_bitrate_kbps: scale(max),
                    audio_bitrate_kbps: audio,
                    crf: Self::codec_crf(codec, preset, crf),
                    pass_count: codec.default_pass_count(),
                });
            }
        }
        Self { entries }
    }

    /// Build a table from explicit entries, validating each one
    pub fn from_entries(entries: Vec<EncodingProfile>) -> Result<Self, DomainError> {
        for entry in &entries {
            entry.validate()?;
        }
        Ok(Self { entries })
    }

    /// Replace or add one entry
    pub fn with_override(mut self, profile: EncodingProfile) -> Result<Self, DomainError> {
        profile.validate()?;
        match self
            .entries
            .iter_mut()
            .find(|e| e.format == profile.format && e.preset == profile.preset)
        {
            Some(existing) => *existing = profile,
            None => self.entries.push(profile),
        }
        Ok(self)
    }

    /// Profile for a format/preset pair
    pub fn lookup(
        &self,
        format: OutputFormat,
        preset: QualityPreset,
    ) -> Result<&EncodingProfile, DomainError> {
        self.entries
            .iter()
            .find(|e| e.format == format && e.preset == preset)
            .ok_or_else(|| DomainError::UnknownProfile {
                format: format.as_str().to_string(),
                preset: preset.as_str().to_string(),
            })
    }

    pub fn entries(&self) -> &[EncodingProfile] {
        &self.entries
    }

    /// Newer codecs reach the same quality with less bitrate
    fn codec_efficiency(codec: Codec, preset: QualityPreset) -> f64 {
        match codec {
            Codec::Av1 | Codec::Hevc => match preset {
                QualityPreset::Low => 0.7,
                QualityPreset::Medium => 0.8,
                QualityPreset::High => 0.9,
                QualityPreset::Ultra => 1.0,
            },
            _ => 1.0,
        }
    }

    fn codec_crf(codec: Codec, preset: QualityPreset, base: u8) -> Option<u8> {
        match codec {
            Codec::Theora => None,
            Codec::Av1 => Some(match preset {
                QualityPreset::Low => 35,
                QualityPreset::Medium => 28,
                QualityPreset::High => 22,
                QualityPreset::Ultra => 18,
            }),
            Codec::Hevc => Some(match preset {
                QualityPreset::Low => 30,
                QualityPreset::Medium => 25,
                QualityPreset::High => 20,
                QualityPreset::Ultra => 16,
            }),
            Codec::H264 | Codec::Vp9 => Some(base),
        }
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Projection-aware bitrate multipliers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionMultipliers {
    multipliers: BTreeMap<ProjectionType, f64>,
}

impl ProjectionMultipliers {
    /// Spherical content spreads detail over a larger frame than a flat view shows
    pub fn standard() -> Self {
        let multipliers = BTreeMap::from([
            (ProjectionType::Equirectangular, 2.5),
            (ProjectionType::Cubemap, 2.0),
            (ProjectionType::Cylindrical, 1.8),
            (ProjectionType::Stereographic, 2.2),
            (ProjectionType::Unknown, 2.0),
        ]);
        Self { multipliers }
    }

    /// Set the multiplier for one projection
    pub fn with(mut self, projection: ProjectionType, multiplier: f64) -> Result<Self, DomainError> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(DomainError::ConfigInvalid(format!(
                "multiplier for {} must be positive, got {}",
                projection, multiplier
            )));
        }
        self.multipliers.insert(projection, multiplier);
        Ok(self)
    }

    /// Multiplier for a projection; projections without an entry use the `unknown` entry
    pub fn multiplier_for(&self, projection: ProjectionType) -> f64 {
        self.multipliers
            .get(&projection)
            .or_else(|| self.multipliers.get(&ProjectionType::Unknown))
            .copied()
            .unwrap_or(1.0)
    }
}

impl Default for ProjectionMultipliers {
    fn default() -> Self {
        Self::standard()
    }
}

/// Target display class used to filter ladder tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayClass {
    Mobile,
    Sd,
    Hd,
    Fhd,
    Uhd,
}

impl DisplayClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayClass::Mobile => "mobile",
            DisplayClass::Sd => "sd",
            DisplayClass::Hd => "hd",
            DisplayClass::Fhd => "fhd",
            DisplayClass::Uhd => "uhd",
        }
    }
}

impl std::str::FromStr for DisplayClass {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mobile" => Ok(DisplayClass::Mobile),
            "sd" => Ok(DisplayClass::Sd),
            "hd" => Ok(DisplayClass::Hd),
            "fhd" => Ok(DisplayClass::Fhd),
            "uhd" | "4k" => Ok(DisplayClass::Uhd),
            other => Err(DomainError::BadArgs(format!("Unknown display class: {}", other))),
        }
    }
}

/// One row of a canonical tier table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LadderTier {
    pub name: &'static str,
    pub class: DisplayClass,
    pub width: u32,
    pub height: u32,
    pub bitrate_kbps: u32,
    pub max_bitrate_kbps: u32,
}

const STANDARD_TIERS: [LadderTier; 6] = [
    LadderTier { name: "240p", class: DisplayClass::Mobile, width: 426, height: 240, bitrate_kbps: 400, max_bitrate_kbps: 600 },
    LadderTier { name: "360p", class: DisplayClass::Mobile, width: 640, height: 360, bitrate_kbps: 800, max_bitrate_kbps: 1200 },
    LadderTier { name: "480p", class: DisplayClass::Sd, width: 854, height: 480, bitrate_kbps: 1500, max_bitrate_kbps: 2250 },
    LadderTier { name: "720p", class: DisplayClass::Hd, width: 1280, height: 720, bitrate_kbps: 3000, max_bitrate_kbps: 4500 },
    LadderTier { name: "1080p", class: DisplayClass::Fhd, width: 1920, height: 1080, bitrate_kbps: 6000, max_bitrate_kbps: 9000 },
    LadderTier { name: "2160p", class: DisplayClass::Uhd, width: 3840, height: 2160, bitrate_kbps: 15000, max_bitrate_kbps: 22500 },
];

const SPHERICAL_TIERS: [LadderTier; 5] = [
    LadderTier { name: "640p_360", class: DisplayClass::Mobile, width: 1280, height: 640, bitrate_kbps: 800, max_bitrate_kbps: 1200 },
    LadderTier { name: "960p_360", class: DisplayClass::Sd, width: 1920, height: 960, bitrate_kbps: 1500, max_bitrate_kbps: 2250 },
    LadderTier { name: "1280p_360", class: DisplayClass::Hd, width: 2560, height: 1280, bitrate_kbps: 3000, max_bitrate_kbps: 4500 },
    LadderTier { name: "1920p_360", class: DisplayClass::Fhd, width: 3840, height: 1920, bitrate_kbps: 6000, max_bitrate_kbps: 9000 },
    LadderTier { name: "2560p_360", class: DisplayClass::Uhd, width: 5120, height: 2560, bitrate_kbps: 12000, max_bitrate_kbps: 18000 },
];

/// Tier table for flat sources, ascending by resolution
pub fn standard_tiers() -> &'static [LadderTier] {
    &STANDARD_TIERS
}

/// Tier table for 2:1 spherical sources, ascending by resolution
pub fn spherical_tiers() -> &'static [LadderTier] {
    &SPHERICAL_TIERS
}

/// Check that bitrates never decrease as resolution grows
pub fn validate_ladder_order(levels: &[BitrateLevel]) -> Result<(), DomainError> {
    for pair in levels.windows(2) {
        let (lower, upper) = (&pair[0], &pair[1]);
        if upper.resolution().pixel_count() < lower.resolution().pixel_count() {
            return Err(DomainError::BadArgs(format!(
                "ladder is not ordered by resolution: {} before {}",
                lower.name, upper.name
            )));
        }
        if upper.bitrate_kbps < lower.bitrate_kbps {
            return Err(DomainError::BadArgs(format!(
                "bitrate decreases from {} ({} kbps) to {} ({} kbps)",
                lower.name, lower.bitrate_kbps, upper.name, upper.bitrate_kbps
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
