//! FFprobe adapter for media file probing

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::adapters::exec_ffmpeg::run_tool;
use crate::domain::errors::*;
use crate::ports::*;
use crate::probe::ProbedMedia;

/// FFprobe-based probe adapter
pub struct FFprobeAdapter {
    ffprobe: PathBuf,
    timeout: Duration,
}

impl FFprobeAdapter {
    /// Create new FFprobe adapter
    pub fn new(ffprobe: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            timeout,
        }
    }

    fn args(path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-v", "error", "-print_format", "json", "-show_format", "-show_streams"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(path.as_os_str().to_os_string());
        args
    }
}

#[async_trait]
impl ProbePort for FFprobeAdapter {
    async fn probe_media(&self, path: &Path) -> Result<ProbedMedia, DomainError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(DomainError::FsFail(format!("Input file does not exist: {}", path.display())));
        }

        let output = run_tool(&self.ffprobe, &Self::args(path), self.timeout)
            .await
            .map_err(|failure| {
                DomainError::DecodeFail(format!("ffprobe failed on {}: {}", path.display(), failure.diagnostics()))
            })?;

        let media = ProbedMedia::from_ffprobe_json(&String::from_utf8_lossy(&output.stdout))?;
        debug!(
            path = %path.display(),
            width = media.width,
            height = media.height,
            duration = media.duration,
            tags = media.tags.len(),
            "Probed media"
        );
        Ok(media)
    }
}
