//! Streaming package assembly from completed renditions

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::{
    BitrateLevel, Codec, ContentHints, ProjectionMetadata, ProjectionType, StreamingFormat,
    StreamingPackage, TiledVariant, VideoAsset,
};
use crate::domain::rules::DisplayClass;
use crate::output::descriptor::{to_json, FormatFailure, LadderDescriptor, ViewportDescriptor};
use crate::output::dash::{render_mpd, MpdContext};
use crate::output::hls::{hls_levels, render_master, render_media};
use crate::output::ladder::{build_ladder, LadderRequest};
use crate::output::tiling::{tile_level, TileGrid};
use crate::output::{
    init_segment_name, segment_pattern, DASH_MANIFEST, HLS_MASTER, LADDER_DESCRIPTOR, MEDIA_PLAYLIST,
    VIEWPORT_DESCRIPTOR,
};
use crate::ports::{FsPort, SegmentInvocation, SegmentPort};
use crate::utils::Utils;

/// Packaging knobs shared by every request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSettings {
    pub segment_duration: u32,
    pub tile_grid: TileGrid,
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            segment_duration: 6,
            tile_grid: TileGrid::default(),
        }
    }
}

/// One package job: where the renditions are and what to emit
#[derive(Debug, Clone)]
pub struct PackageRequest {
    pub asset: VideoAsset,
    pub projection: Option<ProjectionMetadata>,
    pub formats: Vec<StreamingFormat>,
    pub codecs: Vec<Codec>,
    pub classes: Vec<DisplayClass>,
    pub hints: Option<ContentHints>,
    /// Completed renditions, named `{level}_{codec}.{ext}`
    pub renditions_dir: PathBuf,
    pub output_dir: PathBuf,
    pub publish_time: DateTime<Utc>,
}

impl PackageRequest {
    fn spherical(&self) -> Option<&ProjectionMetadata> {
        self.projection.as_ref().filter(|meta| meta.is_spherical())
    }

    /// 2:1 tiers and tiling apply to equirectangular frames only
    fn equirectangular(&self) -> Option<&ProjectionMetadata> {
        self.spherical()
            .filter(|meta| meta.projection() == ProjectionType::Equirectangular)
    }
}

/// Built package plus the formats that could not be assembled
#[derive(Debug, Clone)]
pub struct PackageReport {
    pub package: StreamingPackage,
    pub failures: Vec<(StreamingFormat, DomainError)>,
}

impl PackageReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure_list(&self) -> Vec<FormatFailure> {
        format_failures(&self.failures)
    }
}

fn format_failures(failures: &[(StreamingFormat, DomainError)]) -> Vec<FormatFailure> {
    failures
        .iter()
        .map(|(format, error)| FormatFailure {
            format: format.as_str().to_string(),
            error: error.to_string(),
        })
        .collect()
}

/// Expected file of a completed rendition for `level`
pub fn rendition_file(renditions_dir: &Path, level: &BitrateLevel) -> PathBuf {
    renditions_dir.join(format!("{}.{}", level.rendition_key(), level.container.extension()))
}

/// Turns a ladder plus completed renditions into segments, manifests and
/// descriptors
pub struct PackageBuilder {
    fs: Arc<dyn FsPort>,
    segmenter: Arc<dyn SegmentPort>,
    settings: PackageSettings,
}

impl PackageBuilder {
    pub fn new(
        fs: Arc<dyn FsPort>,
        segmenter: Arc<dyn SegmentPort>,
        settings: PackageSettings,
    ) -> Result<Self, DomainError> {
        if settings.segment_duration == 0 {
            return Err(DomainError::ConfigInvalid(
                "segment duration must be at least 1 second".to_string(),
            ));
        }
        Ok(Self {
            fs,
            segmenter,
            settings,
        })
    }

    pub fn settings(&self) -> PackageSettings {
        self.settings
    }

    /// Ladder this builder would package for `request`
    pub fn ladder(&self, request: &PackageRequest) -> Result<Vec<BitrateLevel>, DomainError> {
        build_ladder(&LadderRequest::for_asset(
            &request.asset,
            request.projection.as_ref(),
            request.codecs.clone(),
            request.classes.clone(),
            request.hints.as_ref(),
        ))
    }

    /// Build every requested format. A format whose ladder is not fully
    /// encoded is reported and skipped; the others are still written.
    pub async fn build(&self, request: &PackageRequest) -> Result<PackageReport, DomainError> {
        if request.formats.is_empty() {
            return Err(DomainError::BadArgs("no streaming format requested".to_string()));
        }
        let levels = self.ladder(request)?;
        self.fs.create_directory(&request.output_dir).await?;

        let mut package = StreamingPackage {
            asset_id: request.asset.id().to_string(),
            output_dir: request.output_dir.clone(),
            levels: levels.clone(),
            segment_duration: self.settings.segment_duration,
            hls_playlist: None,
            dash_manifest: None,
            viewport_manifest: None,
            projection: request.projection.clone(),
            tiled_variants: Vec::new(),
        };
        let mut failures = Vec::new();
        let mut segmented = BTreeSet::new();

        for &format in &request.formats {
            let outcome = match format {
                StreamingFormat::Hls => self.write_hls(request, &levels, &mut segmented).await,
                StreamingFormat::Dash => self.write_dash(request, &levels, &mut segmented).await,
            };
            match outcome {
                Ok(path) => match format {
                    StreamingFormat::Hls => package.hls_playlist = Some(path),
                    StreamingFormat::Dash => package.dash_manifest = Some(path),
                },
                Err(error) => {
                    warn!(asset = %request.asset.id(), format = format.as_str(), error = %error, "Streaming format not packaged");
                    self.remove_stale_manifest(request, format).await?;
                    failures.push((format, error));
                }
            }
        }

        if let Some(meta) = request.equirectangular() {
            let variants = self.tiled_variants(&levels)?;
            let descriptor =
                ViewportDescriptor::new(meta, self.settings.segment_duration, self.settings.tile_grid, variants.clone());
            let path = request.output_dir.join(VIEWPORT_DESCRIPTOR);
            self.fs.write_text(&path, &to_json(&descriptor)?).await?;
            package.tiled_variants = variants;
            package.viewport_manifest = Some(path);
        }

        let descriptor = LadderDescriptor {
            version: "1.0".to_string(),
            asset_id: package.asset_id.clone(),
            source: request.asset.resolution(),
            duration_seconds: request.asset.duration_seconds(),
            projection: request.projection.clone(),
            segment_duration: self.settings.segment_duration,
            levels: LadderDescriptor::entries(&levels),
            hls_playlist: package.hls_playlist.as_ref().map(|p| relative(&request.output_dir, p)),
            dash_manifest: package.dash_manifest.as_ref().map(|p| relative(&request.output_dir, p)),
            viewport_manifest: package.viewport_manifest.as_ref().map(|p| relative(&request.output_dir, p)),
            failures: format_failures(&failures),
        };
        self.fs
            .write_text(&request.output_dir.join(LADDER_DESCRIPTOR), &to_json(&descriptor)?)
            .await?;

        info!(
            asset = %package.asset_id,
            levels = package.levels.len(),
            failed_formats = failures.len(),
            "Streaming package assembled"
        );
        Ok(PackageReport { package, failures })
    }

    /// Every level must have its rendition before a manifest references it
    async fn require_renditions(
        &self,
        format: StreamingFormat,
        request: &PackageRequest,
        levels: &[&BitrateLevel],
    ) -> Result<(), DomainError> {
        if levels.is_empty() {
            return Err(DomainError::UnsupportedFormat(format!(
                "{} needs at least one level in a supported container",
                format.as_str()
            )));
        }
        for level in levels {
            let file = rendition_file(&request.renditions_dir, level);
            // A zero-byte file is what an interrupted encode leaves behind
            let size = match self.fs.file_exists(&file).await? {
                true => self.fs.file_size(&file).await?,
                false => 0,
            };
            if size == 0 {
                return Err(DomainError::LadderInconsistent {
                    format: format.as_str().to_string(),
                    tier: level.rendition_key(),
                });
            }
            debug!(tier = %level.rendition_key(), size = %Utils::format_file_size(size), "Rendition present");
        }
        Ok(())
    }

    /// Split each level's rendition into `{output}/{level}/`, once per build
    async fn segment_levels(
        &self,
        request: &PackageRequest,
        levels: &[&BitrateLevel],
        segmented: &mut BTreeSet<String>,
    ) -> Result<(), DomainError> {
        for level in levels {
            let key = level.rendition_key();
            if segmented.contains(&key) {
                continue;
            }
            let dir = request.output_dir.join(&key);
            self.fs.create_directory(&dir).await?;
            let invocation = SegmentInvocation {
                rendition: rendition_file(&request.renditions_dir, level),
                container: level.container,
                output_dir: dir.clone(),
                init_name: init_segment_name(level.container),
                segment_pattern: segment_pattern(level.container),
                segment_duration: self.settings.segment_duration,
            };
            let outcome = self.segmenter.segment(&invocation).await?;
            if !outcome.stderr.is_empty() {
                debug!(tier = %key, stderr = %outcome.stderr, "Segmenter diagnostics");
            }

            let init = dir.join(&invocation.init_name);
            if !self.fs.file_exists(&init).await? {
                return Err(DomainError::ManifestWrite(format!(
                    "segmenting {} left no {}",
                    key, invocation.init_name
                )));
            }
            debug!(tier = %key, dir = %dir.display(), "Rendition segmented");
            segmented.insert(key);
        }
        Ok(())
    }

    /// A manifest left by an earlier run must not outlive a failed rebuild
    async fn remove_stale_manifest(&self, request: &PackageRequest, format: StreamingFormat) -> Result<(), DomainError> {
        let manifest = match format {
            StreamingFormat::Hls => request.output_dir.join(HLS_MASTER),
            StreamingFormat::Dash => request.output_dir.join(DASH_MANIFEST),
        };
        if self.fs.file_exists(&manifest).await? {
            debug!(path = %manifest.display(), "Removing stale manifest");
            self.fs.delete_file(&manifest).await?;
        }
        Ok(())
    }

    async fn write_hls(
        &self,
        request: &PackageRequest,
        levels: &[BitrateLevel],
        segmented: &mut BTreeSet<String>,
    ) -> Result<PathBuf, DomainError> {
        let selected = hls_levels(levels);
        self.require_renditions(StreamingFormat::Hls, request, &selected).await?;
        self.segment_levels(request, &selected, segmented).await?;

        let spherical = request.spherical();
        let media = render_media(
            request.asset.duration_seconds(),
            self.settings.segment_duration,
            spherical,
        );
        for level in &selected {
            let dir = request.output_dir.join(level.rendition_key());
            self.fs.create_directory(&dir).await?;
            self.fs.write_text(&dir.join(MEDIA_PLAYLIST), &media).await?;
        }

        let master = request.output_dir.join(HLS_MASTER);
        self.fs
            .write_text(&master, &render_master(&selected, spherical))
            .await?;
        Ok(master)
    }

    async fn write_dash(
        &self,
        request: &PackageRequest,
        levels: &[BitrateLevel],
        segmented: &mut BTreeSet<String>,
    ) -> Result<PathBuf, DomainError> {
        let selected: Vec<&BitrateLevel> = levels.iter().collect();
        self.require_renditions(StreamingFormat::Dash, request, &selected).await?;
        self.segment_levels(request, &selected, segmented).await?;

        let ctx = MpdContext {
            duration_seconds: request.asset.duration_seconds(),
            segment_duration: self.settings.segment_duration,
            projection: request.spherical(),
            publish_time: request.publish_time,
        };
        let manifest = request.output_dir.join(DASH_MANIFEST);
        self.fs.write_text(&manifest, &render_mpd(levels, &ctx)?).await?;
        Ok(manifest)
    }

    /// One tiled variant per distinct level name; tiling is codec-independent
    fn tiled_variants(&self, levels: &[BitrateLevel]) -> Result<Vec<TiledVariant>, DomainError> {
        let mut variants: Vec<TiledVariant> = Vec::new();
        for level in levels {
            if variants.iter().any(|v| v.level == level.name) {
                continue;
            }
            variants.push(tile_level(level, self.settings.tile_grid)?);
        }
        Ok(variants)
    }
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DetectionSignal, Resolution, StereoMode};
    use crate::ports::PassOutcome;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory file system
    #[derive(Default)]
    struct MemoryFs {
        files: Mutex<BTreeMap<PathBuf, String>>,
        present: BTreeSet<PathBuf>,
    }

    impl MemoryFs {
        fn with_files(present: impl IntoIterator<Item = PathBuf>) -> Self {
            Self {
                files: Mutex::new(BTreeMap::new()),
                present: present.into_iter().collect(),
            }
        }

        fn read(&self, path: &Path) -> Option<String> {
            self.files.lock().unwrap().get(path).cloned()
        }
    }

    #[async_trait]
    impl FsPort for MemoryFs {
        async fn file_exists(&self, path: &Path) -> Result<bool, DomainError> {
            Ok(self.present.contains(path) || self.files.lock().unwrap().contains_key(path))
        }

        async fn file_size(&self, path: &Path) -> Result<u64, DomainError> {
            if self.present.contains(path) {
                return Ok(4096);
            }
            Ok(self.read(path).map(|s| s.len() as u64).unwrap_or(0))
        }

        async fn create_directory(&self, _path: &Path) -> Result<(), DomainError> {
            Ok(())
        }

        async fn write_text(&self, path: &Path, contents: &str) -> Result<(), DomainError> {
            self.files.lock().unwrap().insert(path.to_path_buf(), contents.to_string());
            Ok(())
        }

        async fn delete_file(&self, path: &Path) -> Result<(), DomainError> {
            self.files.lock().unwrap().remove(path);
            Ok(())
        }
    }

    /// Writes an init segment and one media segment into the shared memory fs
    struct MemorySegmenter {
        fs: Arc<MemoryFs>,
        calls: Mutex<Vec<SegmentInvocation>>,
        skip_init: bool,
    }

    impl MemorySegmenter {
        fn new(fs: Arc<MemoryFs>) -> Self {
            Self {
                fs,
                calls: Mutex::new(Vec::new()),
                skip_init: false,
            }
        }

        fn calls(&self) -> Vec<SegmentInvocation> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SegmentPort for MemorySegmenter {
        async fn segment(&self, invocation: &SegmentInvocation) -> Result<PassOutcome, DomainError> {
            self.calls.lock().unwrap().push(invocation.clone());
            if !self.skip_init {
                self.fs
                    .write_text(&invocation.output_dir.join(&invocation.init_name), "init")
                    .await?;
            }
            let first = invocation.segment_pattern.replace("%05d", "00001");
            self.fs.write_text(&invocation.output_dir.join(first), "media").await?;
            Ok(PassOutcome::default())
        }
    }

    fn builder(fs: &Arc<MemoryFs>) -> (PackageBuilder, Arc<MemorySegmenter>) {
        let segmenter = Arc::new(MemorySegmenter::new(Arc::clone(fs)));
        let builder = PackageBuilder::new(
            Arc::clone(fs) as Arc<dyn FsPort>,
            Arc::clone(&segmenter) as Arc<dyn SegmentPort>,
            PackageSettings::default(),
        )
        .unwrap();
        (builder, segmenter)
    }

    fn request(projection: Option<ProjectionMetadata>) -> PackageRequest {
        PackageRequest {
            asset: VideoAsset::new("tour", "/in/tour.mp4", 20.0, Resolution::new(2560, 1280).unwrap(), 30.0)
                .unwrap(),
            projection,
            formats: vec![StreamingFormat::Hls, StreamingFormat::Dash],
            codecs: vec![Codec::H264, Codec::Vp9],
            classes: Vec::new(),
            hints: None,
            renditions_dir: PathBuf::from("/r"),
            output_dir: PathBuf::from("/out"),
            publish_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn equirect() -> ProjectionMetadata {
        ProjectionMetadata::new(
            ProjectionType::Equirectangular,
            StereoMode::Mono,
            1.0,
            vec![DetectionSignal::MetadataTag],
        )
    }

    fn all_renditions(request: &PackageRequest) -> Vec<PathBuf> {
        let (sizing, _) = builder(&Arc::new(MemoryFs::default()));
        sizing
            .ladder(request)
            .unwrap()
            .iter()
            .map(|level| rendition_file(&request.renditions_dir, level))
            .collect()
    }

    #[tokio::test]
    async fn test_complete_spherical_package() {
        let request = request(Some(equirect()));
        let fs = Arc::new(MemoryFs::with_files(all_renditions(&request)));
        let (builder, segmenter) = builder(&fs);

        let report = builder.build(&request).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.package.levels.len(), 6);
        assert_eq!(report.package.hls_playlist, Some(PathBuf::from("/out/master.m3u8")));
        assert_eq!(report.package.dash_manifest, Some(PathBuf::from("/out/manifest.mpd")));
        assert_eq!(report.package.tiled_variants.len(), 3);

        let master = fs.read(Path::new("/out/master.m3u8")).unwrap();
        assert_eq!(master.matches("#EXT-X-STREAM-INF").count(), 3);
        assert!(master.contains("#EXT-X-SPHERICAL:projection=equirectangular"));
        assert!(fs.read(Path::new("/out/640p_360_h264/playlist.m3u8")).is_some());
        assert!(fs.read(Path::new("/out/viewport_adaptive.json")).is_some());
        assert!(fs.read(Path::new("/out/ladder.json")).is_some());

        // HLS and DASH share segments, so each level is split once
        let calls = segmenter.calls();
        assert_eq!(calls.len(), 6);
        let vp9 = calls
            .iter()
            .find(|c| c.output_dir == Path::new("/out/1280p_360_vp9"))
            .unwrap();
        assert_eq!(vp9.rendition, PathBuf::from("/r/1280p_360_vp9.webm"));
        assert_eq!(vp9.init_name, "init.webm");
        assert_eq!(vp9.segment_pattern, "segment_%05d.webm");
        assert_eq!(vp9.segment_duration, 6);
        assert!(fs.read(Path::new("/out/640p_360_h264/init.mp4")).is_some());
        assert!(fs.read(Path::new("/out/640p_360_h264/segment_00001.m4s")).is_some());
    }

    #[tokio::test]
    async fn test_missing_rendition_fails_only_its_format() {
        let request = request(Some(equirect()));
        let present: Vec<PathBuf> = all_renditions(&request)
            .into_iter()
            .filter(|p| !p.ends_with("1280p_360_vp9.webm"))
            .collect();
        let fs = Arc::new(MemoryFs::with_files(present));
        fs.write_text(Path::new("/out/manifest.mpd"), "<MPD/>").await.unwrap();
        let (builder, segmenter) = builder(&fs);

        let report = builder.build(&request).await.unwrap();
        assert!(report.package.hls_playlist.is_some());
        assert!(report.package.dash_manifest.is_none());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(
            report.failures[0],
            (
                StreamingFormat::Dash,
                DomainError::LadderInconsistent {
                    format: "dash".to_string(),
                    tier: "1280p_360_vp9".to_string()
                }
            )
        );
        let ladder = fs.read(Path::new("/out/ladder.json")).unwrap();
        assert!(ladder.contains("1280p_360_vp9"));
        assert!(fs.read(Path::new("/out/manifest.mpd")).is_none());
        // only the HLS levels were segmented
        assert!(segmenter.calls().iter().all(|c| c.container == crate::domain::model::Container::Mp4));
    }

    #[tokio::test]
    async fn test_segmenting_without_init_fails_the_format() {
        let mut request = request(None);
        request.formats = vec![StreamingFormat::Hls];
        request.codecs = vec![Codec::H264];
        let fs = Arc::new(MemoryFs::with_files(all_renditions(&request)));
        let mut segmenter = MemorySegmenter::new(Arc::clone(&fs));
        segmenter.skip_init = true;
        let builder = PackageBuilder::new(
            Arc::clone(&fs) as Arc<dyn FsPort>,
            Arc::new(segmenter),
            PackageSettings::default(),
        )
        .unwrap();

        let report = builder.build(&request).await.unwrap();
        assert!(report.package.hls_playlist.is_none());
        assert!(matches!(report.failures[0], (StreamingFormat::Hls, DomainError::ManifestWrite(_))));
        assert!(fs.read(Path::new("/out/master.m3u8")).is_none());
    }

    #[tokio::test]
    async fn test_flat_source_has_no_tiles() {
        let mut request = request(None);
        request.codecs = vec![Codec::H264];
        let fs = Arc::new(MemoryFs::with_files(all_renditions(&request)));
        let (builder, _) = builder(&fs);

        let report = builder.build(&request).await.unwrap();
        assert!(report.is_complete());
        assert!(report.package.tiled_variants.is_empty());
        assert!(report.package.viewport_manifest.is_none());
        // 2560x1280 flat: 240p through 1080p
        assert_eq!(report.package.levels.len(), 5);
        assert_eq!(report.package.levels.last().unwrap().name, "1080p");
    }

    #[tokio::test]
    async fn test_rebuild_is_identical() {
        let request = request(Some(equirect()));
        let fs = Arc::new(MemoryFs::with_files(all_renditions(&request)));
        let (builder, _) = builder(&fs);

        builder.build(&request).await.unwrap();
        let first = fs.read(Path::new("/out/manifest.mpd")).unwrap();
        builder.build(&request).await.unwrap();
        assert_eq!(first, fs.read(Path::new("/out/manifest.mpd")).unwrap());
    }

    #[test]
    fn test_zero_segment_duration_rejected() {
        let settings = PackageSettings {
            segment_duration: 0,
            tile_grid: TileGrid::default(),
        };
        let fs = Arc::new(MemoryFs::default());
        let segmenter = Arc::new(MemorySegmenter::new(Arc::clone(&fs)));
        assert!(PackageBuilder::new(fs, segmenter, settings).is_err());
    }
}
