// Application layer - Job entry points

pub mod analyze_interactor;
pub mod container;
pub mod convert_interactor;
pub mod encode_interactor;
pub mod package_interactor;
pub mod viewport_interactor;

use std::path::Path;

use image::RgbImage;

use crate::domain::errors::DomainError;
use crate::ports::{FramePort, FsPort};
use crate::utils::path::is_still_image;

// Re-export interactors
pub use analyze_interactor::{AnalyzeInteractor, AnalyzeRequest, AnalyzeResponse};
pub use container::{AppContainer, DefaultAppContainer, PortSet};
pub use convert_interactor::{ConvertInteractor, ConvertRequest, ConvertResponse};
pub use encode_interactor::{
    EncodeInteractor, EncodeRequest, EncodeResponse, LadderEncodeRequest, RenditionSummary,
};
pub use package_interactor::{PackageInteractor, PackageJob};
pub use viewport_interactor::{
    SourceSpec, SpriteRequest, SpriteResponse, ThumbnailRequest, ViewportInteractor,
    ViewportRequest, ViewportResponse,
};

/// Load the frame a job works on: still images straight from disk, videos
/// decoded at `timestamp`
pub(crate) async fn load_frame(
    frame_port: &dyn FramePort,
    fs_port: &dyn FsPort,
    input: &Path,
    timestamp: f64,
) -> Result<RgbImage, DomainError> {
    if !fs_port.file_exists(input).await? {
        return Err(DomainError::FsFail(format!(
            "Input file does not exist: {}",
            input.display()
        )));
    }
    if is_still_image(input) {
        frame_port.read_image(input).await
    } else {
        frame_port.decode_frame(input, timestamp).await
    }
}

/// Run per-pixel work off the async workers
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, DomainError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DomainError::DecodeFail(format!("frame worker stopped: {}", e)))?
}

/// Make sure the directory holding `path` exists
pub(crate) async fn ensure_parent(fs_port: &dyn FsPort, path: &Path) -> Result<(), DomainError> {
    match path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        Some(parent) => fs_port.create_directory(parent).await,
        None => Ok(()),
    }
}
