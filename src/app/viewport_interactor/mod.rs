// Viewport interactor - Flat views, thumbnails and sprite sheets from spherical sources

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info};

use crate::app::{ensure_parent, load_frame, run_blocking};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;
use crate::probe::{AnalysisInput, SphericalAnalyzer};
use crate::projection::{CubemapLayout, ProjectionGeometry, ProjectionParams};
use crate::utils::path::is_still_image;
use crate::viewport::{
    build_sprite_sheet, sprite_timestamps, webvtt_index, SpriteGrid, ThumbnailPreset,
    ViewportExtractor,
};

pub const SPRITE_SHEET: &str = "sprite.jpg";
pub const SPRITE_INDEX: &str = "thumbnails.vtt";

/// How to read the source geometry
#[derive(Debug, Clone, Default)]
pub struct SourceSpec {
    /// `None` classifies the source first
    pub projection: Option<ProjectionType>,
    pub layout: Option<CubemapLayout>,
    pub params: ProjectionParams,
}

/// One `extract_viewport` job
#[derive(Debug, Clone)]
pub struct ViewportRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub source: SourceSpec,
    pub viewport: Viewport,
    pub timestamp: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewportResponse {
    pub output: PathBuf,
    /// Whole-frame resize used because the source is not spherical
    pub flat: bool,
}

/// Multi-angle thumbnails for one timestamp
#[derive(Debug, Clone)]
pub struct ThumbnailRequest {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub source: SourceSpec,
    /// Empty means every preset
    pub presets: Vec<ThumbnailPreset>,
    pub size: u32,
    pub fov: f64,
    pub timestamp: f64,
}

/// Seek-preview sprite sheet for a video
#[derive(Debug, Clone)]
pub struct SpriteRequest {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub source: SourceSpec,
    /// Camera for every tile; its output size is the tile size
    pub viewport: Viewport,
    /// Seconds between tiles when no hints are given
    pub interval: f64,
    pub columns: u32,
    pub hints: Option<ContentHints>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpriteResponse {
    pub sheet: PathBuf,
    pub index: PathBuf,
    pub timestamps: Vec<f64>,
    pub grid: SpriteGrid,
}

/// Interactor for viewport extraction use cases
pub struct ViewportInteractor {
    probe_port: Arc<dyn ProbePort>,
    frame_port: Arc<dyn FramePort>,
    fs_port: Arc<dyn FsPort>,
    analyzer: SphericalAnalyzer,
}

impl ViewportInteractor {
    /// Create new viewport interactor with injected ports
    pub fn new(
        probe_port: Arc<dyn ProbePort>,
        frame_port: Arc<dyn FramePort>,
        fs_port: Arc<dyn FsPort>,
    ) -> Self {
        Self {
            probe_port,
            frame_port,
            fs_port,
            analyzer: SphericalAnalyzer::new(),
        }
    }

    pub async fn extract_viewport(
        &self,
        request: &ViewportRequest,
    ) -> Result<ViewportResponse, DomainError> {
        let frame = self.frame(&request.input, request.timestamp).await?;
        let extractor = self.extractor(&request.source, &request.input, &frame).await?;
        let viewport = request.viewport;

        let view = run_blocking(move || extractor.extract(&frame, &viewport)).await?;
        ensure_parent(self.fs_port.as_ref(), &request.output).await?;
        self.frame_port.write_image(&view, &request.output).await?;

        info!(
            output = %request.output.display(),
            yaw = viewport.yaw(),
            pitch = viewport.pitch(),
            fov = viewport.horizontal_fov(),
            flat = extractor.is_flat(),
            "Viewport extracted"
        );
        Ok(ViewportResponse {
            output: request.output.clone(),
            flat: extractor.is_flat(),
        })
    }

    /// Writes `thumb_{preset}.jpg` per preset, in preset order
    pub async fn thumbnails(&self, request: &ThumbnailRequest) -> Result<Vec<PathBuf>, DomainError> {
        let presets = if request.presets.is_empty() {
            ThumbnailPreset::all()
        } else {
            request.presets.clone()
        };
        let frame = self.frame(&request.input, request.timestamp).await?;
        let extractor = self.extractor(&request.source, &request.input, &frame).await?;
        let (size, fov) = (request.size, request.fov);

        let views = run_blocking(move || extractor.thumbnails(&frame, &presets, size, fov)).await?;

        self.fs_port.create_directory(&request.output_dir).await?;
        let mut written = Vec::with_capacity(views.len());
        for (preset, image) in &views {
            let path = request.output_dir.join(format!("thumb_{}.jpg", preset));
            self.frame_port.write_image(image, &path).await?;
            written.push(path);
        }
        info!(dir = %request.output_dir.display(), count = written.len(), "Thumbnails written");
        Ok(written)
    }

    /// Sample the video, extract one view per timestamp, tile the views
    /// into a sheet and index them in WebVTT
    pub async fn sprite_sheet(&self, request: &SpriteRequest) -> Result<SpriteResponse, DomainError> {
        if !self.fs_port.file_exists(&request.input).await? {
            return Err(DomainError::FsFail(format!(
                "Input file does not exist: {}",
                request.input.display()
            )));
        }
        let media = self.probe_port.probe_media(&request.input).await?;
        let timestamps = sprite_timestamps(media.duration, request.interval, request.hints.as_ref());
        debug!(count = timestamps.len(), duration = media.duration, "Sprite timestamps chosen");

        let grid = SpriteGrid::for_frames(request.columns, timestamps.len())?;
        let viewport = request.viewport;

        // Only one full-size source frame is alive at a time
        let mut extractor: Option<ViewportExtractor> = None;
        let mut tiles = Vec::with_capacity(timestamps.len());
        for &timestamp in &timestamps {
            let frame = self.frame_port.decode_frame(&request.input, timestamp).await?;
            let current = match extractor {
                Some(current) => current,
                None => {
                    let chosen =
                        self.extractor_with_tags(&request.source, &request.input, &frame, media.tags.clone())?;
                    extractor = Some(chosen);
                    chosen
                }
            };
            tiles.push(run_blocking(move || current.extract(&frame, &viewport)).await?);
        }
        let sheet = run_blocking(move || build_sprite_sheet(&tiles, grid)).await?;

        self.fs_port.create_directory(&request.output_dir).await?;
        let sheet_path = request.output_dir.join(SPRITE_SHEET);
        self.frame_port.write_image(&sheet, &sheet_path).await?;

        let output = viewport.output();
        let index = webvtt_index(
            &timestamps,
            media.duration,
            grid,
            output.width,
            output.height,
            SPRITE_SHEET,
        );
        let index_path = request.output_dir.join(SPRITE_INDEX);
        self.fs_port.write_text(&index_path, &index).await?;

        info!(
            sheet = %sheet_path.display(),
            tiles = timestamps.len(),
            columns = grid.columns,
            rows = grid.rows,
            "Sprite sheet written"
        );
        Ok(SpriteResponse {
            sheet: sheet_path,
            index: index_path,
            timestamps,
            grid,
        })
    }

    async fn frame(&self, input: &Path, timestamp: f64) -> Result<RgbImage, DomainError> {
        load_frame(self.frame_port.as_ref(), self.fs_port.as_ref(), input, timestamp).await
    }

    async fn extractor(
        &self,
        source: &SourceSpec,
        input: &Path,
        frame: &RgbImage,
    ) -> Result<ViewportExtractor, DomainError> {
        let tags = if source.projection.is_none() && !is_still_image(input) {
            self.probe_port.probe_media(input).await?.tags
        } else {
            BTreeMap::new()
        };
        self.extractor_with_tags(source, input, frame, tags)
    }

    /// A declared projection must resolve; a classified one falls back to
    /// flat extraction when it cannot
    fn extractor_with_tags(
        &self,
        source: &SourceSpec,
        input: &Path,
        frame: &RgbImage,
        tags: BTreeMap<String, String>,
    ) -> Result<ViewportExtractor, DomainError> {
        match source.projection {
            Some(ProjectionType::Unknown) => Ok(ViewportExtractor::flat()),
            Some(projection) => Ok(ViewportExtractor::new(ProjectionGeometry::resolve(
                projection,
                source.layout,
                &source.params,
            )?)),
            None => {
                let mut analysis = AnalysisInput::default()
                    .with_tags(tags)
                    .with_aspect_ratio(frame.width() as f64 / frame.height().max(1) as f64);
                if let Some(name) = input.file_name() {
                    analysis = analysis.with_file_name(name.to_string_lossy());
                }
                let metadata = self.analyzer.analyze(&analysis);
                Ok(ViewportExtractor::for_metadata(
                    &metadata,
                    source.layout,
                    &source.params,
                ))
            }
        }
    }
}
