// Convert interactor - Re-projects one frame into another topology

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::app::{ensure_parent, load_frame, run_blocking};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;
use crate::projection::{convert_frame, CubemapLayout, ProjectionGeometry, ProjectionParams};

/// One `convert_projection` job
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    /// Still image, or a video to take one frame from
    pub input: PathBuf,
    /// Image path; the extension picks the encoding
    pub output: PathBuf,
    pub source: ProjectionType,
    pub target: ProjectionType,
    pub source_layout: Option<CubemapLayout>,
    pub target_layout: Option<CubemapLayout>,
    pub params: ProjectionParams,
    pub output_size: Resolution,
    /// Seconds into a video source; ignored for still images
    pub timestamp: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertResponse {
    pub output: PathBuf,
    pub source: ProjectionType,
    pub target: ProjectionType,
    pub source_size: Resolution,
    pub output_size: Resolution,
}

/// Interactor for projection conversion
pub struct ConvertInteractor {
    frame_port: Arc<dyn FramePort>,
    fs_port: Arc<dyn FsPort>,
}

impl ConvertInteractor {
    /// Create new convert interactor with injected ports
    pub fn new(frame_port: Arc<dyn FramePort>, fs_port: Arc<dyn FsPort>) -> Self {
        Self {
            frame_port,
            fs_port,
        }
    }

    /// Convert the frame and write it. Geometry is checked before any
    /// decoding so bad parameters fail fast.
    pub async fn convert_projection(
        &self,
        request: &ConvertRequest,
    ) -> Result<ConvertResponse, DomainError> {
        let source =
            ProjectionGeometry::resolve(request.source, request.source_layout, &request.params)?;
        let target =
            ProjectionGeometry::resolve(request.target, request.target_layout, &request.params)?;
        let output_size = request.output_size;
        target.check_dimensions(output_size.width, output_size.height)?;

        let frame = load_frame(
            self.frame_port.as_ref(),
            self.fs_port.as_ref(),
            &request.input,
            request.timestamp,
        )
        .await?;
        let source_size = Resolution::new(frame.width(), frame.height())?;

        let converted = run_blocking(move || convert_frame(&frame, source, target, output_size)).await?;

        ensure_parent(self.fs_port.as_ref(), &request.output).await?;
        self.frame_port.write_image(&converted, &request.output).await?;

        info!(
            input = %request.input.display(),
            output = %request.output.display(),
            from = %request.source,
            to = %request.target,
            size = %output_size,
            "Projection converted"
        );

        Ok(ConvertResponse {
            output: request.output.clone(),
            source: request.source,
            target: request.target,
            source_size,
            output_size,
        })
    }
}
