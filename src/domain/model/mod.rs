// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Frame or rendition size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Create a resolution, rejecting zero-sized frames
    pub fn new(width: u32, height: u32) -> Result<Self, DomainError> {
        if width == 0 || height == 0 {
            return Err(DomainError::InvalidDimensions(format!(
                "{}x{} has a zero dimension",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    /// Width divided by height
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// True when both dimensions are at most those of `other`
    pub fn fits_within(&self, other: &Resolution) -> bool {
        self.width <= other.width && self.height <= other.height
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Ingested source video. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAsset {
    id: String,
    source_path: PathBuf,
    duration_seconds: f64,
    resolution: Resolution,
    frame_rate: f64,
}

impl VideoAsset {
    /// Create new video asset with validation
    pub fn new(
        id: impl Into<String>,
        source_path: impl Into<PathBuf>,
        duration_seconds: f64,
        resolution: Resolution,
        frame_rate: f64,
    ) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::BadArgs("Asset id cannot be empty".to_string()));
        }
        if !duration_seconds.is_finite() || duration_seconds < 0.0 {
            return Err(DomainError::BadArgs(format!(
                "Invalid duration: {}",
                duration_seconds
            )));
        }
        if !frame_rate.is_finite() || frame_rate <= 0.0 {
            return Err(DomainError::BadArgs("Frame rate must be positive".to_string()));
        }

        Ok(Self {
            id,
            source_path: source_path.into(),
            duration_seconds,
            resolution,
            frame_rate,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// File name of the source, used by filename heuristics
    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Spherical projection topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionType {
    Equirectangular,
    Cubemap,
    Cylindrical,
    Stereographic,
    Fisheye,
    Unknown,
}

impl ProjectionType {
    pub const ALL: [ProjectionType; 6] = [
        ProjectionType::Equirectangular,
        ProjectionType::Cubemap,
        ProjectionType::Cylindrical,
        ProjectionType::Stereographic,
        ProjectionType::Fisheye,
        ProjectionType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectionType::Equirectangular => "equirectangular",
            ProjectionType::Cubemap => "cubemap",
            ProjectionType::Cylindrical => "cylindrical",
            ProjectionType::Stereographic => "stereographic",
            ProjectionType::Fisheye => "fisheye",
            ProjectionType::Unknown => "unknown",
        }
    }

    /// Everything except `Unknown` is a spherical topology
    pub fn is_spherical(&self) -> bool {
        !matches!(self, ProjectionType::Unknown)
    }
}

impl fmt::Display for ProjectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equirectangular" | "equirect" | "erp" => Ok(ProjectionType::Equirectangular),
            "cubemap" | "cube" => Ok(ProjectionType::Cubemap),
            "cylindrical" => Ok(ProjectionType::Cylindrical),
            "stereographic" | "little_planet" | "little-planet" => {
                Ok(ProjectionType::Stereographic)
            }
            "fisheye" => Ok(ProjectionType::Fisheye),
            "unknown" => Ok(ProjectionType::Unknown),
            other => Err(DomainError::UnsupportedProjection(other.to_string())),
        }
    }
}

/// Stereoscopic frame packing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StereoMode {
    #[default]
    Mono,
    TopBottom,
    LeftRight,
}

impl StereoMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StereoMode::Mono => "mono",
            StereoMode::TopBottom => "top-bottom",
            StereoMode::LeftRight => "left-right",
        }
    }

    pub fn is_stereoscopic(&self) -> bool {
        !matches!(self, StereoMode::Mono)
    }
}

/// Independent signal that contributed to a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSignal {
    MetadataTag,
    AspectRatio,
    Filename,
}

impl DetectionSignal {
    /// Confidence assigned when this signal fires
    pub fn confidence(&self) -> f64 {
        match self {
            DetectionSignal::MetadataTag => 1.0,
            DetectionSignal::AspectRatio => 0.8,
            DetectionSignal::Filename => 0.6,
        }
    }

    /// Structurally verified signals win confidence ties over heuristics
    pub fn is_structural(&self) -> bool {
        matches!(self, DetectionSignal::MetadataTag)
    }
}

/// Result of one analysis run. Never mutated; re-analysis builds a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionMetadata {
    projection: ProjectionType,
    stereo_mode: StereoMode,
    confidence: f64,
    signals: Vec<DetectionSignal>,
}

impl ProjectionMetadata {
    pub fn new(
        projection: ProjectionType,
        stereo_mode: StereoMode,
        confidence: f64,
        signals: Vec<DetectionSignal>,
    ) -> Self {
        Self {
            projection,
            stereo_mode,
            confidence: confidence.clamp(0.0, 1.0),
            signals,
        }
    }

    /// Terminal classification when no signal fires
    pub fn unknown() -> Self {
        Self::new(ProjectionType::Unknown, StereoMode::Mono, 0.0, Vec::new())
    }

    pub fn projection(&self) -> ProjectionType {
        self.projection
    }

    pub fn stereo_mode(&self) -> StereoMode {
        self.stereo_mode
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Signals that fired, in evaluation order
    pub fn signals(&self) -> &[DetectionSignal] {
        &self.signals
    }

    pub fn is_spherical(&self) -> bool {
        self.projection.is_spherical()
    }

    /// Projection for spherical processing, or `ClassificationAmbiguous`
    pub fn require_spherical(&self) -> Result<ProjectionType, DomainError> {
        if self.is_spherical() {
            Ok(self.projection)
        } else {
            Err(DomainError::ClassificationAmbiguous(
                "no spherical signal detected".to_string(),
            ))
        }
    }
}

/// Virtual camera orientation and output size for one extraction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    yaw: f64,
    pitch: f64,
    horizontal_fov: f64,
    output: Resolution,
}

impl Viewport {
    /// Build a viewport; yaw wraps into [-180, 180], pitch clamps into [-90, 90]
    pub fn new(
        yaw: f64,
        pitch: f64,
        horizontal_fov: f64,
        output: Resolution,
    ) -> Result<Self, DomainError> {
        if !yaw.is_finite() || !pitch.is_finite() {
            return Err(DomainError::BadArgs("Yaw and pitch must be finite".to_string()));
        }
        if !(horizontal_fov > 0.0 && horizontal_fov < 180.0) {
            return Err(DomainError::BadArgs(format!(
                "Horizontal field of view must be in (0, 180), got {}",
                horizontal_fov
            )));
        }

        Ok(Self {
            yaw: normalize_yaw(yaw),
            pitch: pitch.clamp(-90.0, 90.0),
            horizontal_fov,
            output,
        })
    }

    /// Viewport looking along one of the canonical directions
    pub fn from_direction(
        direction: ViewDirection,
        horizontal_fov: f64,
        output: Resolution,
    ) -> Result<Self, DomainError> {
        let (yaw, pitch) = direction.yaw_pitch();
        Self::new(yaw, pitch, horizontal_fov, output)
    }

    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn horizontal_fov(&self) -> f64 {
        self.horizontal_fov
    }

    /// Vertical field of view implied by the output aspect ratio
    pub fn vertical_fov(&self) -> f64 {
        let half = (self.horizontal_fov.to_radians() / 2.0).tan() / self.output.aspect_ratio();
        (2.0 * half.atan()).to_degrees()
    }

    pub fn output(&self) -> Resolution {
        self.output
    }
}

/// Wrap an angle in degrees into [-180, 180]
pub fn normalize_yaw(yaw: f64) -> f64 {
    let wrapped = (yaw + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && yaw > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Named viewing directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewDirection {
    Front,
    Back,
    Left,
    Right,
    Up,
    Down,
}

impl ViewDirection {
    pub const ALL: [ViewDirection; 6] = [
        ViewDirection::Front,
        ViewDirection::Back,
        ViewDirection::Left,
        ViewDirection::Right,
        ViewDirection::Up,
        ViewDirection::Down,
    ];

    /// Fixed (yaw, pitch) in degrees
    pub fn yaw_pitch(&self) -> (f64, f64) {
        match self {
            ViewDirection::Front => (0.0, 0.0),
            ViewDirection::Back => (180.0, 0.0),
            ViewDirection::Left => (-90.0, 0.0),
            ViewDirection::Right => (90.0, 0.0),
            ViewDirection::Up => (0.0, 90.0),
            ViewDirection::Down => (0.0, -90.0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewDirection::Front => "front",
            ViewDirection::Back => "back",
            ViewDirection::Left => "left",
            ViewDirection::Right => "right",
            ViewDirection::Up => "up",
            ViewDirection::Down => "down",
        }
    }
}

impl FromStr for ViewDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewDirection::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| DomainError::BadArgs(format!("Unknown view direction: {}", s)))
    }
}

/// Video codec family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    H264,
    Hevc,
    Vp9,
    Av1,
    Theora,
}

impl Codec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::H264 => "h264",
            Codec::Hevc => "hevc",
            Codec::Vp9 => "vp9",
            Codec::Av1 => "av1",
            Codec::Theora => "theora",
        }
    }

    /// Encoder name understood by the external encode capability
    pub fn encoder_name(&self) -> &'static str {
        match self {
            Codec::H264 => "libx264",
            Codec::Hevc => "libx265",
            Codec::Vp9 => "libvpx-vp9",
            Codec::Av1 => "libaom-av1",
            Codec::Theora => "libtheora",
        }
    }

    /// Pass count: legacy codecs single-pass, delivery codecs two-pass,
    /// next-generation codecs add a refinement pass
    pub fn default_pass_count(&self) -> u8 {
        match self {
            Codec::Theora => 1,
            Codec::H264 | Codec::Hevc | Codec::Vp9 => 2,
            Codec::Av1 => 3,
        }
    }

    /// RFC 6381 codec string for playlists and manifests
    pub fn rfc6381(&self) -> &'static str {
        match self {
            Codec::H264 => "avc1.42E01E",
            Codec::Hevc => "hev1.1.6.L93.B0",
            Codec::Vp9 => "vp09.00.10.08",
            Codec::Av1 => "av01.0.05M.08",
            Codec::Theora => "theora",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Codec {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "h264" | "avc" => Ok(Codec::H264),
            "hevc" | "h265" => Ok(Codec::Hevc),
            "vp9" => Ok(Codec::Vp9),
            "av1" => Ok(Codec::Av1),
            "theora" => Ok(Codec::Theora),
            other => Err(DomainError::BadArgs(format!("Unknown codec: {}", other))),
        }
    }
}

/// Output container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Webm,
    Ogg,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Webm => "webm",
            Container::Ogg => "ogv",
        }
    }

    /// Muxer name for the external encoder's `-f` flag
    pub fn muxer(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Webm => "webm",
            Container::Ogg => "ogg",
        }
    }

    pub fn audio_codec(&self) -> &'static str {
        match self {
            Container::Mp4 => "aac",
            Container::Webm => "libopus",
            Container::Ogg => "libvorbis",
        }
    }
}

/// Requested output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Mp4,
    Webm,
    Ogv,
    Hevc,
    Av1Mp4,
    Av1Webm,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 6] = [
        OutputFormat::Mp4,
        OutputFormat::Webm,
        OutputFormat::Ogv,
        OutputFormat::Hevc,
        OutputFormat::Av1Mp4,
        OutputFormat::Av1Webm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
            OutputFormat::Ogv => "ogv",
            OutputFormat::Hevc => "hevc",
            OutputFormat::Av1Mp4 => "av1_mp4",
            OutputFormat::Av1Webm => "av1_webm",
        }
    }

    pub fn codec(&self) -> Codec {
        match self {
            OutputFormat::Mp4 => Codec::H264,
            OutputFormat::Webm => Codec::Vp9,
            OutputFormat::Ogv => Codec::Theora,
            OutputFormat::Hevc => Codec::Hevc,
            OutputFormat::Av1Mp4 | OutputFormat::Av1Webm => Codec::Av1,
        }
    }

    pub fn container(&self) -> Container {
        match self {
            OutputFormat::Mp4 | OutputFormat::Hevc | OutputFormat::Av1Mp4 => Container::Mp4,
            OutputFormat::Webm | OutputFormat::Av1Webm => Container::Webm,
            OutputFormat::Ogv => Container::Ogg,
        }
    }

    /// Format producing `codec` in `container`, if any
    pub fn for_rendition(codec: Codec, container: Container) -> Option<OutputFormat> {
        OutputFormat::ALL
            .iter()
            .copied()
            .find(|f| f.codec() == codec && f.container() == container)
    }

    /// Already-encoded rendition this format should re-encode from when present
    pub fn preferred_intermediate(&self) -> Option<OutputFormat> {
        match self {
            OutputFormat::Webm | OutputFormat::Ogv => Some(OutputFormat::Mp4),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| DomainError::UnsupportedFormat(s.to_string()))
    }
}

/// Named quality preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
    Ultra,
}

impl QualityPreset {
    pub const ALL: [QualityPreset; 4] = [
        QualityPreset::Low,
        QualityPreset::Medium,
        QualityPreset::High,
        QualityPreset::Ultra,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "low",
            QualityPreset::Medium => "medium",
            QualityPreset::High => "high",
            QualityPreset::Ultra => "ultra",
        }
    }
}

impl FromStr for QualityPreset {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QualityPreset::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| DomainError::BadArgs(format!("Unknown quality preset: {}", s)))
    }
}

/// One read-only row of the encoding profile table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingProfile {
    pub format: OutputFormat,
    pub preset: QualityPreset,
    pub codec: Codec,
    pub container: Container,
    pub target_bitrate_kbps: u32,
    pub min_bitrate_kbps: u32,
    pub max_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
    #[serde(default)]
    pub crf: Option<u8>,
    pub pass_count: u8,
}

impl EncodingProfile {
    /// Check bitrate ordering, CRF range and pass count
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(1..=3).contains(&self.pass_count) {
            return Err(DomainError::ConfigInvalid(format!(
                "{}/{}: pass count must be 1-3, got {}",
                self.format.as_str(),
                self.preset.as_str(),
                self.pass_count
            )));
        }
        if self.min_bitrate_kbps > self.target_bitrate_kbps
            || self.target_bitrate_kbps > self.max_bitrate_kbps
        {
            return Err(DomainError::ConfigInvalid(format!(
                "{}/{}: bitrates must satisfy min <= target <= max",
                self.format.as_str(),
                self.preset.as_str()
            )));
        }
        if let Some(crf) = self.crf {
            if crf > 63 {
                return Err(DomainError::ConfigInvalid(format!(
                    "{}/{}: CRF value cannot exceed 63",
                    self.format.as_str(),
                    self.preset.as_str()
                )));
            }
        }
        Ok(())
    }

    /// Copy rated for a ladder tier. The floor keeps the table's min/target ratio.
    pub fn for_level(&self, level: &BitrateLevel) -> Self {
        let floor = if self.target_bitrate_kbps == 0 {
            0
        } else {
            (level.bitrate_kbps as u64 * self.min_bitrate_kbps as u64 / self.target_bitrate_kbps as u64) as u32
        };
        Self {
            target_bitrate_kbps: level.bitrate_kbps,
            min_bitrate_kbps: floor.min(level.bitrate_kbps),
            max_bitrate_kbps: level.max_bitrate_kbps.max(level.bitrate_kbps),
            ..self.clone()
        }
    }

    /// Copy with all video bitrates scaled; audio and CRF are untouched
    pub fn scaled(&self, multiplier: f64) -> Self {
        let scale = |kbps: u32| (kbps as f64 * multiplier).round() as u32;
        Self {
            target_bitrate_kbps: scale(self.target_bitrate_kbps),
            min_bitrate_kbps: scale(self.min_bitrate_kbps),
            max_bitrate_kbps: scale(self.max_bitrate_kbps),
            ..self.clone()
        }
    }
}

/// One rung of a bitrate ladder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitrateLevel {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub bitrate_kbps: u32,
    pub max_bitrate_kbps: u32,
    pub codec: Codec,
    pub container: Container,
}

impl BitrateLevel {
    pub fn resolution(&self) -> Resolution {
        Resolution {
            width: self.width,
            height: self.height,
        }
    }

    /// Unique per ladder: tier name plus codec
    pub fn rendition_key(&self) -> String {
        format!("{}_{}", self.name, self.codec.as_str())
    }
}

/// Adaptive streaming delivery format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamingFormat {
    Hls,
    Dash,
}

impl StreamingFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamingFormat::Hls => "hls",
            StreamingFormat::Dash => "dash",
        }
    }
}

impl FromStr for StreamingFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hls" => Ok(StreamingFormat::Hls),
            "dash" => Ok(StreamingFormat::Dash),
            other => Err(DomainError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// One independently encoded region of a tiled spherical rendition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDescriptor {
    pub index: u32,
    pub row: u32,
    pub column: u32,
    /// Centre of the tile on the sphere, degrees
    pub yaw_center: f64,
    pub pitch_center: f64,
    /// Angular extent of the tile, degrees
    pub yaw_span: f64,
    pub pitch_span: f64,
    /// Pixel rectangle inside the level's equirectangular frame
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub full_bitrate_kbps: u32,
    pub reduced_bitrate_kbps: u32,
}

/// Tile grid for one ladder level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiledVariant {
    pub level: String,
    pub columns: u32,
    pub rows: u32,
    pub tiles: Vec<TileDescriptor>,
}

/// Precomputed content-analysis output. Every field is optional input;
/// absence falls back to fixed defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentHints {
    /// Timestamps (seconds) worth previewing
    pub recommended_timestamps: Vec<f64>,
    pub scene_boundaries: Vec<f64>,
    /// Motion level in [0, 1]
    pub motion_intensity: Option<f64>,
}

impl ContentHints {
    /// Recommended timestamps inside `[0, duration]`, sorted and deduplicated
    pub fn timestamps_within(&self, duration: f64) -> Vec<f64> {
        let mut out: Vec<f64> = self
            .recommended_timestamps
            .iter()
            .copied()
            .filter(|t| t.is_finite() && *t >= 0.0 && *t <= duration)
            .collect();
        out.sort_by(|a, b| a.total_cmp(b));
        out.dedup();
        out
    }

    /// Bitrate scale for motion-heavy content, 1.0 to 1.5
    pub fn motion_multiplier(&self) -> f64 {
        self.motion_intensity
            .filter(|m| m.is_finite())
            .map(|m| 1.0 + m.clamp(0.0, 1.0) * 0.5)
            .unwrap_or(1.0)
    }
}

/// Assembled adaptive streaming package for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingPackage {
    pub asset_id: String,
    pub output_dir: PathBuf,
    pub levels: Vec<BitrateLevel>,
    pub segment_duration: u32,
    pub hls_playlist: Option<PathBuf>,
    pub dash_manifest: Option<PathBuf>,
    pub viewport_manifest: Option<PathBuf>,
    pub projection: Option<ProjectionMetadata>,
    pub tiled_variants: Vec<TiledVariant>,
}

#[cfg(test)]
mod tests;
