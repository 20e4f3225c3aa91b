//! HLS master and media playlists

use crate::domain::model::{BitrateLevel, Container, ProjectionMetadata};
use crate::output::{segment_durations, segment_name, MEDIA_PLAYLIST, INIT_SEGMENT_MP4};

const HLS_VERSION: u32 = 6;
const AAC_LC: &str = "mp4a.40.2";

/// Only fragmented-MP4 renditions are referenced from HLS
pub fn hls_levels(levels: &[BitrateLevel]) -> Vec<&BitrateLevel> {
    levels.iter().filter(|l| l.container == Container::Mp4).collect()
}

/// `#EXT-X-SPHERICAL` value for spherical sources
fn spherical_tag(projection: Option<&ProjectionMetadata>) -> Option<String> {
    let meta = projection.filter(|m| m.is_spherical())?;
    let mut tag = format!("#EXT-X-SPHERICAL:projection={}", meta.projection());
    if meta.stereo_mode().is_stereoscopic() {
        tag.push_str(&format!(",stereo_mode={}", meta.stereo_mode().as_str()));
    }
    Some(tag)
}

/// Master playlist with one variant per level
pub fn render_master(levels: &[&BitrateLevel], projection: Option<&ProjectionMetadata>) -> String {
    let mut lines = vec!["#EXTM3U".to_string(), format!("#EXT-X-VERSION:{}", HLS_VERSION)];
    if let Some(tag) = spherical_tag(projection) {
        lines.push(tag);
    }
    lines.push("#EXT-X-INDEPENDENT-SEGMENTS".to_string());

    for level in levels {
        let attrs = [
            format!("BANDWIDTH={}", level.max_bitrate_kbps as u64 * 1000),
            format!("AVERAGE-BANDWIDTH={}", level.bitrate_kbps as u64 * 1000),
            format!("RESOLUTION={}x{}", level.width, level.height),
            format!("CODECS=\"{},{}\"", level.codec.rfc6381(), AAC_LC),
        ];
        lines.push(format!("#EXT-X-STREAM-INF:{}", attrs.join(",")));
        lines.push(format!("{}/{}", level.rendition_key(), MEDIA_PLAYLIST));
    }

    lines.push(String::new());
    lines.join("\n")
}

/// VOD media playlist for one level, segments relative to the playlist
pub fn render_media(duration_seconds: f64, segment_duration: u32, projection: Option<&ProjectionMetadata>) -> String {
    let durations = segment_durations(duration_seconds, segment_duration);
    let target = durations
        .iter()
        .fold(segment_duration as f64, |acc, d| acc.max(*d))
        .ceil() as u32;

    let mut lines = vec![
        "#EXTM3U".to_string(),
        format!("#EXT-X-VERSION:{}", HLS_VERSION),
    ];
    if let Some(tag) = spherical_tag(projection) {
        lines.push(tag);
    }
    lines.push(format!("#EXT-X-TARGETDURATION:{}", target));
    lines.push("#EXT-X-MEDIA-SEQUENCE:0".to_string());
    lines.push("#EXT-X-PLAYLIST-TYPE:VOD".to_string());
    lines.push("#EXT-X-INDEPENDENT-SEGMENTS".to_string());
    lines.push(format!("#EXT-X-MAP:URI=\"{}\"", INIT_SEGMENT_MP4));

    for (i, duration) in durations.iter().enumerate() {
        lines.push(format!("#EXTINF:{:.3},", duration));
        lines.push(segment_name(i as u32 + 1, Container::Mp4));
    }
    lines.push("#EXT-X-ENDLIST".to_string());
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Codec, DetectionSignal, ProjectionType, StereoMode};

    fn level(name: &str, codec: Codec, container: Container) -> BitrateLevel {
        BitrateLevel {
            name: name.to_string(),
            width: 1920,
            height: 960,
            bitrate_kbps: 1500,
            max_bitrate_kbps: 2250,
            codec,
            container,
        }
    }

    #[test]
    fn test_master_playlist() {
        let levels = vec![
            level("960p_360", Codec::H264, Container::Mp4),
            level("960p_360", Codec::Vp9, Container::Webm),
        ];
        let meta = ProjectionMetadata::new(
            ProjectionType::Equirectangular,
            StereoMode::TopBottom,
            1.0,
            vec![DetectionSignal::MetadataTag],
        );
        let playlist = render_master(&hls_levels(&levels), Some(&meta));
        let lines: Vec<&str> = playlist.lines().collect();
        assert_eq!(lines[0], "#EXTM3U");
        assert_eq!(lines[1], "#EXT-X-VERSION:6");
        assert_eq!(lines[2], "#EXT-X-SPHERICAL:projection=equirectangular,stereo_mode=top-bottom");
        assert_eq!(
            lines[4],
            "#EXT-X-STREAM-INF:BANDWIDTH=2250000,AVERAGE-BANDWIDTH=1500000,RESOLUTION=1920x960,CODECS=\"avc1.42E01E,mp4a.40.2\""
        );
        assert_eq!(lines[5], "960p_360_h264/playlist.m3u8");
        assert!(!playlist.contains("vp09"));
    }

    #[test]
    fn test_flat_master_has_no_spherical_tag() {
        let levels = vec![level("1080p", Codec::H264, Container::Mp4)];
        let playlist = render_master(&hls_levels(&levels), Some(&ProjectionMetadata::unknown()));
        assert!(!playlist.contains("SPHERICAL"));
    }

    #[test]
    fn test_media_playlist_segments() {
        let playlist = render_media(14.0, 6, None);
        assert!(playlist.contains("#EXT-X-TARGETDURATION:6\n"));
        assert!(playlist.contains("#EXT-X-MAP:URI=\"init.mp4\""));
        assert!(playlist.contains("#EXTINF:6.000,\nsegment_00001.m4s"));
        assert!(playlist.contains("#EXTINF:2.000,\nsegment_00003.m4s"));
        assert!(!playlist.contains("segment_00004"));
        assert!(playlist.trim_end().ends_with("#EXT-X-ENDLIST"));
    }
}
