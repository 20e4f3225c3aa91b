//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::domain::model::{Codec, OutputFormat, ProjectionType, QualityPreset, StreamingFormat};
use crate::domain::rules::DisplayClass;
use crate::projection::{CubemapLayout, Pole};
use crate::viewport::ThumbnailPreset;

/// Overrides for the parametric projections
#[derive(Args, Debug, Clone, Default)]
pub struct ParamArgs {
    /// Vertical field of view of a cylindrical band, degrees
    #[arg(long)]
    pub cylindrical_vfov: Option<f64>,

    /// Pole a stereographic image is centred on
    #[arg(long)]
    pub pole: Option<Pole>,

    /// Field of view of a stereographic disc, degrees
    #[arg(long)]
    pub stereographic_fov: Option<f64>,

    /// Field of view of a fisheye lens, degrees
    #[arg(long)]
    pub fisheye_fov: Option<f64>,
}

/// Source geometry shared by the frame commands
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Source projection (classified from the file when omitted)
    #[arg(long)]
    pub projection: Option<ProjectionType>,

    /// Face layout of a cubemap source
    #[arg(long)]
    pub layout: Option<CubemapLayout>,

    #[command(flatten)]
    pub params: ParamArgs,
}

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Asset identifier (default: file stem)
    #[arg(long)]
    pub asset_id: Option<String>,
}

/// Arguments for the convert command
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input image or video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output image path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Projection of the input
    #[arg(long)]
    pub from: ProjectionType,

    /// Projection to produce
    #[arg(long)]
    pub to: ProjectionType,

    /// Face layout of a cubemap input
    #[arg(long)]
    pub from_layout: Option<CubemapLayout>,

    /// Face layout of a cubemap output
    #[arg(long)]
    pub to_layout: Option<CubemapLayout>,

    /// Output width in pixels
    #[arg(long, default_value = "2048")]
    pub width: u32,

    /// Output height in pixels
    #[arg(long, default_value = "1024")]
    pub height: u32,

    /// Frame to convert from a video (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(long, default_value = "0")]
    pub at: String,

    #[command(flatten)]
    pub params: ParamArgs,
}

/// Arguments for the viewport command
#[derive(Args, Debug)]
pub struct ViewportArgs {
    /// Input image or video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output image path, or directory when writing thumbnails
    #[arg(short, long)]
    pub output: PathBuf,

    /// Yaw in degrees, positive to the right
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub yaw: f64,

    /// Pitch in degrees, positive up
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub pitch: f64,

    /// Horizontal field of view, degrees (default from config)
    #[arg(long)]
    pub fov: Option<f64>,

    /// Named view; overrides yaw and pitch
    #[arg(long)]
    pub preset: Option<ThumbnailPreset>,

    /// Write one square thumbnail per preset into the output directory
    #[arg(long)]
    pub thumbnails: bool,

    /// Output width (default from config)
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height (default from config)
    #[arg(long)]
    pub height: Option<u32>,

    /// Frame to use from a video (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(long, default_value = "0")]
    pub at: String,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Arguments for the sprite command
#[derive(Args, Debug)]
pub struct SpriteArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory receiving the sheet and its WebVTT index
    #[arg(short, long)]
    pub output: PathBuf,

    /// Seconds between frames (default from config)
    #[arg(long)]
    pub interval: Option<f64>,

    /// Explicit timestamps, comma-separated; overrides hints and interval
    #[arg(long)]
    pub at: Option<String>,

    /// Content-analysis hints JSON
    #[arg(long)]
    pub hints: Option<PathBuf>,

    /// Tiles per sheet row (default from config)
    #[arg(long)]
    pub columns: Option<u32>,

    /// Tile width in pixels (default from config)
    #[arg(long)]
    pub tile_width: Option<u32>,

    /// Yaw of every tile's view, degrees
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub yaw: f64,

    /// Pitch of every tile's view, degrees
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub pitch: f64,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Arguments for the encode command
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Asset identifier (default: file stem)
    #[arg(long)]
    pub asset_id: Option<String>,

    /// Output formats, comma-separated (default from config)
    #[arg(long, value_delimiter = ',')]
    pub formats: Vec<OutputFormat>,

    /// Quality preset (default from config)
    #[arg(long)]
    pub preset: Option<QualityPreset>,

    /// Root of the per-job working directories (default from config)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Jobs run at the same time (default from config)
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Encode every ladder level into this directory, named for the package command
    #[arg(long)]
    pub renditions: Option<PathBuf>,

    /// Ladder codecs for --renditions, comma-separated (default from config)
    #[arg(long, value_delimiter = ',')]
    pub codecs: Vec<Codec>,

    /// Restrict the ladder to these display classes
    #[arg(long, value_delimiter = ',')]
    pub classes: Vec<DisplayClass>,

    /// Content-analysis hints JSON
    #[arg(long)]
    pub hints: Option<PathBuf>,

    /// Segment length ladder levels are keyframe-aligned to (default from config)
    #[arg(long)]
    pub segment_duration: Option<u32>,
}

/// Arguments for the package command
#[derive(Args, Debug)]
pub struct PackageArgs {
    /// Source video the renditions were encoded from
    #[arg(short, long)]
    pub input: PathBuf,

    /// Asset identifier (default: file stem)
    #[arg(long)]
    pub asset_id: Option<String>,

    /// Directory holding `{level}_{codec}` renditions
    #[arg(long)]
    pub renditions: PathBuf,

    /// Package output directory
    #[arg(short, long)]
    pub output: PathBuf,

    /// Streaming formats, comma-separated (default from config)
    #[arg(long, value_delimiter = ',')]
    pub formats: Vec<StreamingFormat>,

    /// Ladder codecs, comma-separated (default from config)
    #[arg(long, value_delimiter = ',')]
    pub codecs: Vec<Codec>,

    /// Restrict the ladder to these display classes
    #[arg(long, value_delimiter = ',')]
    pub classes: Vec<DisplayClass>,

    /// Content-analysis hints JSON
    #[arg(long)]
    pub hints: Option<PathBuf>,

    /// Segment length in seconds (default from config)
    #[arg(long)]
    pub segment_duration: Option<u32>,

    /// MPD publish time, RFC 3339 (default: now)
    #[arg(long)]
    pub publish_time: Option<String>,
}
