//! Spherecast command-line entry point
//!
//! # Usage
//!
//! ```bash
//! spherecast analyze -i clip_360.mp4
//! spherecast convert -i pano.jpg -o cube.png --from equirectangular --to cubemap --to-layout grid_3x2 --width 3072 --height 2048
//! spherecast viewport -i clip_360.mp4 -o thumbs/ --thumbnails --at 00:00:05
//! spherecast encode -i clip_360.mp4 --formats mp4,webm,hevc --preset high
//! spherecast package -i clip_360.mp4 --renditions renditions/ -o package/
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use spherecast::adapters::TomlConfigAdapter;
use spherecast::app::DefaultAppContainer;
use spherecast::cli::{commands, Cli};
use spherecast::utils::logging::LoggingSystem;

/// Main entry point for the Spherecast CLI
#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    let mut config = TomlConfigAdapter::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    let logging = LoggingSystem::new(config.logging.clone());
    logging.initialize()?;
    logging.log_system_info();

    let container = DefaultAppContainer::new(&config)?;

    let result = commands::execute(cli.command, &container, &config).await;
    match &result {
        Ok(()) => info!("Spherecast completed successfully"),
        Err(err) => error!(error = %format!("{:#}", err), "Spherecast failed"),
    }
    result
}
