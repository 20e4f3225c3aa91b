// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::RgbImage;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::probe::ProbedMedia;

/// Port for media file probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe a media file for dimensions, timing and container tags
    async fn probe_media(&self, path: &Path) -> Result<ProbedMedia, DomainError>;
}

/// Where a pass writes its encoded stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutput {
    /// Analysis passes throw the stream away
    Discard,
    File(PathBuf),
}

/// Bitrate and quality parameters for one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateControl {
    pub target_kbps: u32,
    pub min_kbps: u32,
    pub max_kbps: u32,
    pub crf: Option<u8>,
}

/// One call to the external encoder
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeInvocation {
    pub job_id: String,
    pub format: OutputFormat,
    pub codec: Codec,
    pub container: Container,
    pub input: PathBuf,
    pub output: PassOutput,
    /// 1-based
    pub pass_index: u8,
    pub total_passes: u8,
    /// Statistics this pass reads, written by an earlier pass
    pub stats_in: Option<PathBuf>,
    /// Statistics this pass writes
    pub stats_out: Option<PathBuf>,
    pub rate: RateControl,
    /// `None` on analysis passes, which drop audio
    pub audio_bitrate_kbps: Option<u32>,
    /// Projection tagged into the final output
    pub spherical: Option<ProjectionType>,
    /// Output frame size when rendering a ladder tier; `None` keeps the source size
    pub scale: Option<Resolution>,
    /// Forced keyframe spacing in seconds, so segment boundaries land on keyframes
    pub keyframe_seconds: Option<u32>,
}

impl EncodeInvocation {
    pub fn is_final(&self) -> bool {
        self.pass_index == self.total_passes
    }
}

/// Result of a successful pass
#[derive(Debug, Clone, Default)]
pub struct PassOutcome {
    /// Diagnostic stream captured from the encoder
    pub stderr: String,
}

/// Port for the external encode capability
#[async_trait]
pub trait EncodePort: Send + Sync {
    /// Run one pass to completion; failures carry the captured diagnostics
    async fn run_pass(&self, invocation: &EncodeInvocation) -> Result<PassOutcome, DomainError>;
}

/// One completed rendition split into streaming segments
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentInvocation {
    pub rendition: PathBuf,
    pub container: Container,
    /// Receives the init segment and the numbered media segments
    pub output_dir: PathBuf,
    pub init_name: String,
    /// printf-style media segment name, numbered from 1
    pub segment_pattern: String,
    pub segment_duration: u32,
}

/// Port for the external stream-copy segmenter
#[async_trait]
pub trait SegmentPort: Send + Sync {
    /// Write the init segment and media segments of one rendition
    async fn segment(&self, invocation: &SegmentInvocation) -> Result<PassOutcome, DomainError>;
}

/// Port for frame decoding and still-image IO
#[async_trait]
pub trait FramePort: Send + Sync {
    /// Decode the frame shown at `timestamp` seconds
    async fn decode_frame(&self, source: &Path, timestamp: f64) -> Result<RgbImage, DomainError>;

    /// Load a still image
    async fn read_image(&self, path: &Path) -> Result<RgbImage, DomainError>;

    /// Save a still image, format chosen by extension
    async fn write_image(&self, image: &RgbImage, path: &Path) -> Result<(), DomainError>;
}

/// Port for file system operations
#[async_trait]
pub trait FsPort: Send + Sync {
    /// Check if file exists
    async fn file_exists(&self, path: &Path) -> Result<bool, DomainError>;

    /// Get file size
    async fn file_size(&self, path: &Path) -> Result<u64, DomainError>;

    /// Create directory (including parent directories)
    async fn create_directory(&self, path: &Path) -> Result<(), DomainError>;

    /// Write a text file, replacing any existing content
    async fn write_text(&self, path: &Path, contents: &str) -> Result<(), DomainError>;

    /// Delete file
    async fn delete_file(&self, path: &Path) -> Result<(), DomainError>;
}
