//! Command implementations

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::adapters::PipelineConfig;
use crate::app::{
    AnalyzeRequest, AppContainer, ConvertRequest, EncodeRequest, LadderEncodeRequest, PackageJob,
    SourceSpec, SpriteRequest, ThumbnailRequest, ViewportRequest,
};
use crate::cli::args::{
    AnalyzeArgs, ConvertArgs, EncodeArgs, PackageArgs, ParamArgs, SourceArgs, SpriteArgs,
    ViewportArgs,
};
use crate::cli::Commands;
use crate::domain::model::{ContentHints, Resolution, StreamingPackage, Viewport};
use crate::engine::CancelFlag;
use crate::output::descriptor::FormatFailure;
use crate::projection::ProjectionParams;
use crate::utils::time::TimeParser;
use crate::viewport::ThumbnailPreset;

/// Run one parsed command against the wired container
pub async fn execute(
    command: Commands,
    container: &dyn AppContainer,
    config: &PipelineConfig,
) -> Result<()> {
    match command {
        Commands::Analyze(args) => analyze(container, args).await,
        Commands::Convert(args) => convert(container, args).await,
        Commands::Viewport(args) => viewport(container, config, args).await,
        Commands::Sprite(args) => sprite(container, config, args).await,
        Commands::Encode(args) => encode(container, config, args).await,
        Commands::Package(args) => package(container, config, args).await,
    }
}

/// Execute the analyze command
pub async fn analyze(container: &dyn AppContainer, args: AnalyzeArgs) -> Result<()> {
    let response = container
        .analyze_interactor()
        .analyze(&AnalyzeRequest {
            input: args.input,
            asset_id: args.asset_id,
        })
        .await
        .context("Failed to analyze input")?;
    print_json(&response)
}

/// Execute the convert command
pub async fn convert(container: &dyn AppContainer, args: ConvertArgs) -> Result<()> {
    let request = ConvertRequest {
        input: args.input,
        output: args.output,
        source: args.from,
        target: args.to,
        source_layout: args.from_layout,
        target_layout: args.to_layout,
        params: projection_params(&args.params),
        output_size: Resolution::new(args.width, args.height)?,
        timestamp: TimeParser::new().parse_time(&args.at)?,
    };
    let response = container
        .convert_interactor()
        .convert_projection(&request)
        .await
        .context("Projection conversion failed")?;
    print_json(&response)
}

/// Execute the viewport command
pub async fn viewport(
    container: &dyn AppContainer,
    config: &PipelineConfig,
    args: ViewportArgs,
) -> Result<()> {
    let interactor = container.viewport_interactor();
    let timestamp = TimeParser::new().parse_time(&args.at)?;
    let fov = args.fov.unwrap_or(config.thumbnails.fov);

    if args.thumbnails {
        let size = args
            .width
            .or(args.height)
            .unwrap_or(config.thumbnails.width.min(config.thumbnails.height));
        let request = ThumbnailRequest {
            input: args.input,
            output_dir: args.output,
            source: source_spec(&args.source),
            presets: args.preset.into_iter().collect(),
            size,
            fov,
            timestamp,
        };
        let written = interactor
            .thumbnails(&request)
            .await
            .context("Thumbnail extraction failed")?;
        return print_json(&written);
    }

    let output = Resolution::new(
        args.width.unwrap_or(config.thumbnails.width),
        args.height.unwrap_or(config.thumbnails.height),
    )?;
    let view = match args.preset {
        Some(ThumbnailPreset::Direction(direction)) => Viewport::from_direction(direction, fov, output)?,
        Some(ThumbnailPreset::Stereographic) => {
            bail!("the stereographic preset is only available with --thumbnails")
        }
        None => Viewport::new(args.yaw, args.pitch, fov, output)?,
    };
    let request = ViewportRequest {
        input: args.input,
        output: args.output,
        source: source_spec(&args.source),
        viewport: view,
        timestamp,
    };
    let response = interactor
        .extract_viewport(&request)
        .await
        .context("Viewport extraction failed")?;
    print_json(&response)
}

/// Execute the sprite command
pub async fn sprite(
    container: &dyn AppContainer,
    config: &PipelineConfig,
    args: SpriteArgs,
) -> Result<()> {
    let hints = match (&args.at, &args.hints) {
        (Some(list), _) => Some(ContentHints {
            recommended_timestamps: TimeParser::new().parse_list(list)?,
            ..ContentHints::default()
        }),
        (None, Some(path)) => Some(load_hints(path).await?),
        (None, None) => None,
    };
    let tile_width = args.tile_width.unwrap_or(config.thumbnails.sprite_tile_width);
    let tile_height = (tile_width * 9 / 16).max(1);
    let view = Viewport::new(
        args.yaw,
        args.pitch,
        config.thumbnails.fov,
        Resolution::new(tile_width, tile_height)?,
    )?;

    let request = SpriteRequest {
        input: args.input,
        output_dir: args.output,
        source: source_spec(&args.source),
        viewport: view,
        interval: args.interval.unwrap_or(config.thumbnails.sprite_interval),
        columns: args.columns.unwrap_or(config.thumbnails.sprite_columns),
        hints,
    };
    let response = container
        .viewport_interactor()
        .sprite_sheet(&request)
        .await
        .context("Sprite sheet generation failed")?;
    print_json(&response)
}

/// Execute the encode command: one rendition per format, or with
/// `--renditions` one per ladder level. Ctrl-C stops the jobs after their
/// current pass.
pub async fn encode(
    container: &dyn AppContainer,
    config: &PipelineConfig,
    args: EncodeArgs,
) -> Result<()> {
    let cancel = CancelFlag::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current pass");
            watcher.cancel();
        }
    });

    let interactor = container.encode_interactor();
    let response = match args.renditions {
        Some(renditions_dir) => {
            let hints = match &args.hints {
                Some(path) => Some(load_hints(path).await?),
                None => None,
            };
            let request = LadderEncodeRequest {
                input: args.input,
                asset_id: args.asset_id,
                codecs: config.streaming.codecs.clone(),
                classes: args.classes,
                hints,
                preset: config.encoding.preset,
                renditions_dir,
                segment_duration: config.streaming.segment_duration,
            };
            interactor.encode_ladder(&request, cancel).await
        }
        None => {
            let request = EncodeRequest {
                input: args.input,
                asset_id: args.asset_id,
                formats: config.encoding.formats.clone(),
                preset: config.encoding.preset,
            };
            interactor.encode_rendition(&request, cancel).await
        }
    }
    .context("Encode job could not start")?;
    print_json(&response)?;

    if !response.is_complete() {
        bail!(
            "{} of {} renditions failed",
            response.failures.len(),
            response.failures.len() + response.renditions.len()
        );
    }
    info!(asset_id = %response.asset_id, renditions = response.renditions.len(), "All renditions encoded");
    Ok(())
}

/// Execute the package command
pub async fn package(
    container: &dyn AppContainer,
    config: &PipelineConfig,
    args: PackageArgs,
) -> Result<()> {
    let hints = match &args.hints {
        Some(path) => Some(load_hints(path).await?),
        None => None,
    };
    let publish_time = match &args.publish_time {
        Some(value) => DateTime::parse_from_rfc3339(value)
            .with_context(|| format!("Invalid publish time '{}'", value))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let job = PackageJob {
        input: args.input,
        asset_id: args.asset_id,
        renditions_dir: args.renditions,
        output_dir: args.output,
        formats: config.streaming.formats.clone(),
        codecs: config.streaming.codecs.clone(),
        classes: args.classes,
        hints,
        publish_time,
    };
    let report = container
        .package_interactor()
        .build_streaming_package(&job)
        .await
        .context("Streaming package could not be built")?;

    print_json(&PackageSummary {
        package: &report.package,
        failures: report.failure_list(),
    })?;

    if !report.is_complete() {
        bail!("{} streaming format(s) could not be packaged", report.failures.len());
    }
    Ok(())
}

#[derive(Serialize)]
struct PackageSummary<'a> {
    package: &'a StreamingPackage,
    failures: Vec<FormatFailure>,
}

fn source_spec(args: &SourceArgs) -> SourceSpec {
    SourceSpec {
        projection: args.projection,
        layout: args.layout,
        params: projection_params(&args.params),
    }
}

fn projection_params(args: &ParamArgs) -> ProjectionParams {
    let mut params = ProjectionParams::default();
    if let Some(vfov) = args.cylindrical_vfov {
        params.cylindrical_vfov = vfov;
    }
    if let Some(pole) = args.pole {
        params.stereographic_pole = pole;
    }
    if let Some(fov) = args.stereographic_fov {
        params.stereographic_fov = fov;
    }
    if let Some(fov) = args.fisheye_fov {
        params.fisheye_fov = fov;
    }
    params
}

/// Content-analysis output; a missing file is an error, missing fields are not
async fn load_hints(path: &Path) -> Result<ContentHints> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read hints file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid hints file {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
