//! Working-directory layout for encode jobs

use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::domain::model::OutputFormat;

/// File-name prefix shared by every encoder statistics artifact
pub const STATS_PREFIX: &str = "pass_";

/// Paths of one job's working directory, rooted at the configured work dir
///
/// ```text
/// {work_root}/{asset_id}-{format}/pass_{n}.log
/// {work_root}/{asset_id}-{format}/{format}.{ext}
/// {work_root}/{asset_id}-{level}_{codec}/pass_{n}.log
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLayout {
    work_root: PathBuf,
}

impl JobLayout {
    pub fn new(work_root: impl Into<PathBuf>) -> Self {
        Self {
            work_root: work_root.into(),
        }
    }

    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    /// Jobs for one asset differ by format, so each gets its own directory
    pub fn job_id(asset_id: &str, format: OutputFormat) -> String {
        format!("{}-{}", sanitize(asset_id), format.as_str())
    }

    /// Ladder tier jobs are keyed by level and codec instead
    pub fn tier_job_id(asset_id: &str, rendition_key: &str) -> String {
        format!("{}-{}", sanitize(asset_id), sanitize(rendition_key))
    }

    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.work_root.join(job_id)
    }

    /// Statistics log written by pass `n`
    pub fn stats_log(job_dir: &Path, pass_index: u8) -> PathBuf {
        job_dir.join(format!("{}{}.log", STATS_PREFIX, pass_index))
    }

    /// Final rendition inside a job directory
    pub fn rendition_path(job_dir: &Path, format: OutputFormat) -> PathBuf {
        job_dir.join(format!("{}.{}", format.as_str(), format.container().extension()))
    }

    pub fn is_stats_artifact(file_name: &str) -> bool {
        file_name.starts_with(STATS_PREFIX)
    }
}

/// Default asset id: the source file stem
pub fn asset_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| sanitize(&stem.to_string_lossy()))
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| "asset".to_string())
}

/// Still images are read straight from disk, videos need a decoder
pub fn is_still_image(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok()
}

/// Keep ids usable as a single path component
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_paths() {
        let layout = JobLayout::new("/work");
        let job_id = JobLayout::job_id("asset42", OutputFormat::Webm);
        assert_eq!(job_id, "asset42-webm");

        let dir = layout.job_dir(&job_id);
        assert_eq!(dir, PathBuf::from("/work/asset42-webm"));
        assert_eq!(
            JobLayout::stats_log(&dir, 2),
            PathBuf::from("/work/asset42-webm/pass_2.log")
        );
        assert_eq!(
            JobLayout::rendition_path(&dir, OutputFormat::Ogv),
            PathBuf::from("/work/asset42-webm/ogv.ogv")
        );
    }

    #[test]
    fn test_job_dirs() {
        let layout = JobLayout::new("/work");
        let mp4 = layout.job_dir(&JobLayout::job_id("a", OutputFormat::Mp4));
        assert_eq!(JobLayout::rendition_path(&mp4, OutputFormat::Mp4), PathBuf::from("/work/a-mp4/mp4.mp4"));
        assert_eq!(
            layout.job_dir(&JobLayout::tier_job_id("a", "960p_360_vp9")),
            PathBuf::from("/work/a-960p_360_vp9")
        );
    }

    #[test]
    fn test_ids_are_single_components() {
        assert_eq!(JobLayout::job_id("../x y", OutputFormat::Mp4), ".._x_y-mp4");
        assert!(JobLayout::is_stats_artifact("pass_1-0.log.mbtree"));
        assert!(!JobLayout::is_stats_artifact("mp4.mp4"));
    }

    #[test]
    fn test_asset_id_and_still_images() {
        assert_eq!(asset_id_for(Path::new("/in/clip 360.mp4")), "clip_360");
        assert_eq!(asset_id_for(Path::new("/")), "asset");
        assert!(is_still_image(Path::new("pano.jpg")));
        assert!(is_still_image(Path::new("pano.PNG")));
        assert!(!is_still_image(Path::new("clip.mp4")));
    }
}
