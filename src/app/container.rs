use std::sync::Arc;

use crate::adapters::{FFmpegAdapter, FFprobeAdapter, FrameAdapter, LocalFsAdapter, PipelineConfig};
use crate::app::{
    analyze_interactor::AnalyzeInteractor, convert_interactor::ConvertInteractor,
    encode_interactor::EncodeInteractor, package_interactor::PackageInteractor,
    viewport_interactor::ViewportInteractor,
};
use crate::domain::errors::DomainError;
use crate::engine::{JobRunner, PassScheduler, ProgressCallback, StorageBudget, TracingProgress};
use crate::output::PackageBuilder;
use crate::ports::{EncodePort, FramePort, FsPort, ProbePort, SegmentPort};
use crate::utils::path::JobLayout;

pub trait AppContainer: Send + Sync {
    fn analyze_interactor(&self) -> Arc<AnalyzeInteractor>;
    fn convert_interactor(&self) -> Arc<ConvertInteractor>;
    fn viewport_interactor(&self) -> Arc<ViewportInteractor>;
    fn encode_interactor(&self) -> Arc<EncodeInteractor>;
    fn package_interactor(&self) -> Arc<PackageInteractor>;
}

/// The external capabilities every interactor is built from
#[derive(Clone)]
pub struct PortSet {
    pub probe: Arc<dyn ProbePort>,
    pub encode: Arc<dyn EncodePort>,
    pub segment: Arc<dyn SegmentPort>,
    pub frame: Arc<dyn FramePort>,
    pub fs: Arc<dyn FsPort>,
    pub progress: Arc<dyn ProgressCallback>,
}

pub struct DefaultAppContainer {
    analyze_interactor: Arc<AnalyzeInteractor>,
    convert_interactor: Arc<ConvertInteractor>,
    viewport_interactor: Arc<ViewportInteractor>,
    encode_interactor: Arc<EncodeInteractor>,
    package_interactor: Arc<PackageInteractor>,
}

impl DefaultAppContainer {
    /// Wire the ffmpeg-backed adapters described by `config`
    pub fn new(config: &PipelineConfig) -> Result<Self, DomainError> {
        config.validate()?;
        let probe_port = Arc::new(FFprobeAdapter::new(
            &config.ffmpeg.ffprobe_path,
            config.ffmpeg.probe_timeout(),
        ));
        let encode_port = Arc::new(FFmpegAdapter::new(
            &config.ffmpeg.ffmpeg_path,
            config.ffmpeg.pass_timeout(),
        )?);
        let frame_port = Arc::new(FrameAdapter::new(
            &config.ffmpeg.ffmpeg_path,
            config.ffmpeg.probe_timeout(),
        ));
        let fs_port = Arc::new(LocalFsAdapter::new());

        let ports = PortSet {
            probe: Arc::clone(&probe_port) as Arc<dyn ProbePort>,
            encode: Arc::clone(&encode_port) as Arc<dyn EncodePort>,
            segment: Arc::clone(&encode_port) as Arc<dyn SegmentPort>,
            frame: Arc::clone(&frame_port) as Arc<dyn FramePort>,
            fs: Arc::clone(&fs_port) as Arc<dyn FsPort>,
            progress: Arc::new(TracingProgress) as Arc<dyn ProgressCallback>,
        };
        Self::with_ports(ports, config)
    }

    /// Wire interactors around caller-supplied ports
    pub fn with_ports(ports: PortSet, config: &PipelineConfig) -> Result<Self, DomainError> {
        let scheduler = PassScheduler::new(
            Arc::clone(&ports.encode),
            Arc::new(config.profile_table()?),
            Arc::new(config.projection_multipliers()?),
            StorageBudget::new(config.storage.temp_budget_mib)?,
        )
        .with_progress(Arc::clone(&ports.progress));
        let runner = Arc::new(JobRunner::new(
            Arc::new(scheduler),
            config.workers.max_concurrent_jobs,
        ));
        let builder = Arc::new(PackageBuilder::new(
            Arc::clone(&ports.fs),
            Arc::clone(&ports.segment),
            config.package_settings()?,
        )?);

        let analyze_interactor = Arc::new(AnalyzeInteractor::new(
            Arc::clone(&ports.probe),
            Arc::clone(&ports.fs),
        ));

        let convert_interactor = Arc::new(ConvertInteractor::new(
            Arc::clone(&ports.frame),
            Arc::clone(&ports.fs),
        ));

        let viewport_interactor = Arc::new(ViewportInteractor::new(
            Arc::clone(&ports.probe),
            Arc::clone(&ports.frame),
            Arc::clone(&ports.fs),
        ));

        let encode_interactor = Arc::new(EncodeInteractor::new(
            Arc::clone(&analyze_interactor),
            runner,
            Arc::clone(&ports.fs),
            JobLayout::new(&config.storage.work_dir),
        ));

        let package_interactor = Arc::new(PackageInteractor::new(
            Arc::clone(&analyze_interactor),
            builder,
        ));

        Ok(Self {
            analyze_interactor,
            convert_interactor,
            viewport_interactor,
            encode_interactor,
            package_interactor,
        })
    }
}

impl AppContainer for DefaultAppContainer {
    fn analyze_interactor(&self) -> Arc<AnalyzeInteractor> {
        Arc::clone(&self.analyze_interactor)
    }

    fn convert_interactor(&self) -> Arc<ConvertInteractor> {
        Arc::clone(&self.convert_interactor)
    }

    fn viewport_interactor(&self) -> Arc<ViewportInteractor> {
        Arc::clone(&self.viewport_interactor)
    }

    fn encode_interactor(&self) -> Arc<EncodeInteractor> {
        Arc::clone(&self.encode_interactor)
    }

    fn package_interactor(&self) -> Arc<PackageInteractor> {
        Arc::clone(&self.package_interactor)
    }
}
