//! Bitrate ladders, streaming manifests and package descriptors

use crate::domain::model::Container;

pub mod dash;
pub mod descriptor;
pub mod hls;
pub mod ladder;
pub mod package;
pub mod tiling;

pub use ladder::{build_ladder, LadderRequest};
pub use package::{PackageBuilder, PackageReport, PackageRequest, PackageSettings};
pub use tiling::{tile_level, tiles_for_viewport, TileGrid};

pub const HLS_MASTER: &str = "master.m3u8";
pub const MEDIA_PLAYLIST: &str = "playlist.m3u8";
pub const DASH_MANIFEST: &str = "manifest.mpd";
pub const VIEWPORT_DESCRIPTOR: &str = "viewport_adaptive.json";
pub const LADDER_DESCRIPTOR: &str = "ladder.json";
pub const INIT_SEGMENT_MP4: &str = "init.mp4";

/// Segment lengths covering `duration`; the last one holds the remainder
pub fn segment_durations(duration: f64, segment_duration: u32) -> Vec<f64> {
    let step = segment_duration.max(1) as f64;
    if !duration.is_finite() || duration <= 0.0 {
        return vec![step];
    }
    let count = (duration / step).ceil() as usize;
    (0..count)
        .map(|i| (duration - i as f64 * step).min(step))
        .collect()
}

pub(crate) fn segment_extension(container: Container) -> &'static str {
    match container {
        Container::Webm => "webm",
        _ => "m4s",
    }
}

/// Media segment file name, numbered from 1
pub fn segment_name(number: u32, container: Container) -> String {
    format!("segment_{:05}.{}", number, segment_extension(container))
}

/// printf-style form of [`segment_name`] handed to the segmenter
pub fn segment_pattern(container: Container) -> String {
    format!("segment_%05d.{}", segment_extension(container))
}

pub fn init_segment_name(container: Container) -> String {
    match container {
        Container::Webm => "init.webm".to_string(),
        _ => INIT_SEGMENT_MP4.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_durations() {
        assert_eq!(segment_durations(12.0, 6), vec![6.0, 6.0]);
        assert_eq!(segment_durations(13.5, 6), vec![6.0, 6.0, 1.5]);
        assert_eq!(segment_durations(0.0, 4), vec![4.0]);
    }

    #[test]
    fn test_segment_name() {
        assert_eq!(segment_name(1, Container::Mp4), "segment_00001.m4s");
        assert_eq!(segment_name(42, Container::Webm), "segment_00042.webm");
        assert_eq!(segment_pattern(Container::Mp4), "segment_%05d.m4s");
        assert_eq!(init_segment_name(Container::Webm), "init.webm");
        assert_eq!(init_segment_name(Container::Mp4), "init.mp4");
    }
}
