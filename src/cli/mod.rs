//! CLI module for Spherecast
//!
//! Each subcommand maps onto one job entry point. Configuration is read from
//! the file, then `SPHERECAST_*` variables, then the flags given here.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::adapters::PipelineConfig;
use crate::utils::logging::{LogFormat, LogLevel};

pub mod args;
pub mod commands;

pub use args::{AnalyzeArgs, ConvertArgs, EncodeArgs, PackageArgs, SpriteArgs, ViewportArgs};

/// Spherecast 360° video pipeline
///
/// Classifies spherical sources, converts between projections, extracts
/// flat views, encodes multi-pass renditions and assembles HLS/DASH packages.
#[derive(Parser, Debug)]
#[command(name = "spherecast")]
#[command(about = "Spherecast - 360° video projection, encoding and packaging")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./spherecast.toml when present)
    #[arg(long, global = true, env = "SPHERECAST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify the projection of a source
    Analyze(AnalyzeArgs),
    /// Re-project an image or video frame
    Convert(ConvertArgs),
    /// Extract a flat view or multi-angle thumbnails
    Viewport(ViewportArgs),
    /// Build a seek-preview sprite sheet with a WebVTT index
    Sprite(SpriteArgs),
    /// Encode renditions through the multi-pass scheduler
    Encode(EncodeArgs),
    /// Assemble HLS/DASH manifests from completed renditions
    Package(PackageArgs),
}

impl Cli {
    /// Flags win over environment and file values
    pub fn apply_overrides(&self, config: &mut PipelineConfig) {
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        match &self.command {
            Commands::Encode(args) => {
                if !args.formats.is_empty() {
                    config.encoding.formats = args.formats.clone();
                }
                if let Some(preset) = args.preset {
                    config.encoding.preset = preset;
                }
                if let Some(work_dir) = &args.work_dir {
                    config.storage.work_dir = work_dir.clone();
                }
                if let Some(jobs) = args.jobs {
                    config.workers.max_concurrent_jobs = jobs;
                }
                if !args.codecs.is_empty() {
                    config.streaming.codecs = args.codecs.clone();
                }
                if let Some(segment_duration) = args.segment_duration {
                    config.streaming.segment_duration = segment_duration;
                }
            }
            Commands::Package(args) => {
                if !args.formats.is_empty() {
                    config.streaming.formats = args.formats.clone();
                }
                if !args.codecs.is_empty() {
                    config.streaming.codecs = args.codecs.clone();
                }
                if let Some(segment_duration) = args.segment_duration {
                    config.streaming.segment_duration = segment_duration;
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Codec, OutputFormat, QualityPreset};

    #[test]
    fn test_encode_flags_override_config() {
        let cli = Cli::try_parse_from([
            "spherecast",
            "--log-level",
            "debug",
            "encode",
            "-i",
            "clip.mp4",
            "--formats",
            "mp4,webm",
            "--preset",
            "high",
            "--jobs",
            "3",
        ])
        .unwrap();
        let mut config = PipelineConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.encoding.formats, vec![OutputFormat::Mp4, OutputFormat::Webm]);
        assert_eq!(config.encoding.preset, QualityPreset::High);
        assert_eq!(config.workers.max_concurrent_jobs, 3);
    }

    #[test]
    fn test_ladder_encode_flags() {
        let cli = Cli::try_parse_from([
            "spherecast",
            "encode",
            "-i",
            "clip.mp4",
            "--renditions",
            "renditions",
            "--codecs",
            "h264,vp9",
            "--segment-duration",
            "4",
        ])
        .unwrap();
        let mut config = PipelineConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.streaming.codecs, vec![Codec::H264, Codec::Vp9]);
        assert_eq!(config.streaming.segment_duration, 4);
        match cli.command {
            Commands::Encode(args) => assert_eq!(args.renditions, Some(PathBuf::from("renditions"))),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_negative_yaw_parses() {
        let cli = Cli::try_parse_from([
            "spherecast", "viewport", "-i", "pano.jpg", "-o", "view.jpg", "--yaw", "-90",
        ])
        .unwrap();
        match cli.command {
            Commands::Viewport(args) => assert_eq!(args.yaw, -90.0),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result = Cli::try_parse_from(["spherecast", "encode", "-i", "a.mp4", "--formats", "gif"]);
        assert!(result.is_err());
    }
}
