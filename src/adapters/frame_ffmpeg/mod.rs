//! Frame decoding through ffmpeg and still-image IO through `image`

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, RgbImage};
use tracing::debug;

use crate::adapters::exec_ffmpeg::run_tool;
use crate::domain::errors::*;
use crate::ports::*;

/// Decodes single frames by piping one PNG out of ffmpeg
pub struct FrameAdapter {
    ffmpeg: PathBuf,
    timeout: Duration,
}

impl FrameAdapter {
    pub fn new(ffmpeg: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            timeout,
        }
    }

    fn args(source: &Path, timestamp: f64) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-v".into(),
            "error".into(),
            "-ss".into(),
            format!("{:.3}", timestamp.max(0.0)).into(),
            "-i".into(),
        ];
        args.push(source.as_os_str().to_os_string());
        for arg in ["-frames:v", "1", "-f", "image2pipe", "-c:v", "png", "-"] {
            args.push(arg.into());
        }
        args
    }
}

#[async_trait]
impl FramePort for FrameAdapter {
    async fn decode_frame(&self, source: &Path, timestamp: f64) -> Result<RgbImage, DomainError> {
        let output = run_tool(&self.ffmpeg, &Self::args(source, timestamp), self.timeout)
            .await
            .map_err(|failure| {
                DomainError::DecodeFail(format!(
                    "no frame at {:.3}s in {}: {}",
                    timestamp,
                    source.display(),
                    failure.diagnostics()
                ))
            })?;
        if output.stdout.is_empty() {
            return Err(DomainError::DecodeFail(format!(
                "no frame at {:.3}s in {}",
                timestamp,
                source.display()
            )));
        }
        debug!(source = %source.display(), timestamp, bytes = output.stdout.len(), "Decoded frame");
        let frame = image::load_from_memory_with_format(&output.stdout, ImageFormat::Png)?;
        Ok(frame.to_rgb8())
    }

    async fn read_image(&self, path: &Path) -> Result<RgbImage, DomainError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || image::open(&path).map(|img| img.to_rgb8()))
            .await
            .map_err(|e| DomainError::DecodeFail(format!("image reader stopped: {}", e)))?
            .map_err(DomainError::from)
    }

    async fn write_image(&self, image: &RgbImage, path: &Path) -> Result<(), DomainError> {
        let image = image.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || image.save(&path))
            .await
            .map_err(|e| DomainError::FsFail(format!("image writer stopped: {}", e)))?
            .map_err(|e| DomainError::FsFail(format!("failed to save image: {}", e)))
    }
}
