//! Source selection for encode jobs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::model::OutputFormat;

/// Input chosen for a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceChoice {
    /// The asset's raw source file
    Original(PathBuf),
    /// A rendition already produced for the same asset
    Intermediate { format: OutputFormat, path: PathBuf },
}

impl SourceChoice {
    pub fn path(&self) -> &Path {
        match self {
            SourceChoice::Original(path) => path,
            SourceChoice::Intermediate { path, .. } => path,
        }
    }

    pub fn is_intermediate(&self) -> bool {
        matches!(self, SourceChoice::Intermediate { .. })
    }
}

/// Renditions that finished every pass during the current request. A file
/// left on disk by another run never counts.
#[derive(Debug, Clone, Default)]
pub struct CompletedRenditions {
    outputs: BTreeMap<OutputFormat, PathBuf>,
}

impl CompletedRenditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, format: OutputFormat, output: PathBuf) {
        self.outputs.insert(format, output);
    }

    pub fn get(&self, format: OutputFormat) -> Option<&Path> {
        self.outputs.get(&format).map(PathBuf::as_path)
    }
}

/// Picks the highest-fidelity available input for a format
pub struct SourceSelector;

impl SourceSelector {
    /// A completed upstream rendition wins over the original for formats
    /// that prefer one
    pub fn select(format: OutputFormat, original: &Path, completed: &CompletedRenditions) -> SourceChoice {
        let upstream = format.preferred_intermediate();
        let intermediate = upstream.and_then(|up| completed.get(up)).map(Path::to_path_buf);
        match (upstream, intermediate) {
            (Some(upstream), Some(path)) => {
                info!(
                    format = %format,
                    intermediate = %path.display(),
                    "Re-encoding from {} intermediate",
                    upstream
                );
                SourceChoice::Intermediate {
                    format: upstream,
                    path,
                }
            }
            (Some(upstream), None) => {
                debug!(format = %format, "No {} rendition completed in this run, using original", upstream);
                SourceChoice::Original(original.to_path_buf())
            }
            (None, _) => SourceChoice::Original(original.to_path_buf()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed_mp4() -> CompletedRenditions {
        let mut completed = CompletedRenditions::new();
        completed.record(OutputFormat::Mp4, PathBuf::from("/work/a-mp4/mp4.mp4"));
        completed
    }

    #[test]
    fn test_webm_prefers_mp4_intermediate() {
        let choice = SourceSelector::select(OutputFormat::Webm, Path::new("/in/raw.mov"), &completed_mp4());
        assert!(choice.is_intermediate());
        assert_eq!(choice.path(), Path::new("/work/a-mp4/mp4.mp4"));
    }

    #[test]
    fn test_falls_back_to_original() {
        let choice = SourceSelector::select(OutputFormat::Ogv, Path::new("/in/raw.mov"), &CompletedRenditions::new());
        assert_eq!(choice, SourceChoice::Original(PathBuf::from("/in/raw.mov")));
    }

    #[test]
    fn test_unrelated_completion_is_not_an_intermediate() {
        let mut completed = CompletedRenditions::new();
        completed.record(OutputFormat::Hevc, PathBuf::from("/work/a-hevc/hevc.mp4"));
        let choice = SourceSelector::select(OutputFormat::Webm, Path::new("/in/raw.mov"), &completed);
        assert!(!choice.is_intermediate());
    }

    #[test]
    fn test_formats_without_preference_ignore_intermediate() {
        let choice = SourceSelector::select(OutputFormat::Hevc, Path::new("/in/raw.mov"), &completed_mp4());
        assert!(!choice.is_intermediate());
    }
}
