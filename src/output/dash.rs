//! DASH manifest written with quick-xml

use std::io::Cursor;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::domain::errors::DomainError;
use crate::domain::model::{BitrateLevel, Codec, Container, ProjectionMetadata};
use crate::output::{init_segment_name, segment_extension};
use crate::utils::time::format_iso8601_duration;

const MPD_NAMESPACE: &str = "urn:mpeg:dash:schema:mpd:2011";
const ON_DEMAND_PROFILE: &str = "urn:mpeg:dash:profile:isoff-on-demand:2011";
const SPHERICAL_SCHEME: &str = "http://youtube.com/yt/spherical";
const PROJECTION_SCHEME: &str = "http://youtube.com/yt/projection";
const TIMESCALE: u32 = 1000;

/// Everything the manifest describes besides the levels
#[derive(Debug, Clone)]
pub struct MpdContext<'a> {
    pub duration_seconds: f64,
    pub segment_duration: u32,
    pub projection: Option<&'a ProjectionMetadata>,
    /// Injected so repeated builds of the same package are byte-identical
    pub publish_time: DateTime<Utc>,
}

fn mime_type(container: Container) -> &'static str {
    match container {
        Container::Mp4 => "video/mp4",
        Container::Webm => "video/webm",
        Container::Ogg => "video/ogg",
    }
}

/// Codec groups in first-seen order
fn codec_groups(levels: &[BitrateLevel]) -> Vec<(Codec, Vec<&BitrateLevel>)> {
    let mut groups: Vec<(Codec, Vec<&BitrateLevel>)> = Vec::new();
    for level in levels {
        match groups.iter_mut().find(|(codec, _)| *codec == level.codec) {
            Some((_, members)) => members.push(level),
            None => groups.push((level.codec, vec![level])),
        }
    }
    groups
}

fn emit<'a>(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'a>) -> Result<(), DomainError> {
    writer
        .write_event(event)
        .map_err(|e| DomainError::ManifestWrite(format!("MPD: {}", e)))
}

/// Static on-demand MPD, one AdaptationSet per codec
pub fn render_mpd(levels: &[BitrateLevel], ctx: &MpdContext<'_>) -> Result<String, DomainError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    let duration = format_iso8601_duration(ctx.duration_seconds);
    let min_buffer = format!("PT{}S", ctx.segment_duration);
    let publish = ctx.publish_time.to_rfc3339_opts(SecondsFormat::Secs, true);

    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut mpd = BytesStart::new("MPD");
    mpd.push_attribute(("xmlns", MPD_NAMESPACE));
    mpd.push_attribute(("profiles", ON_DEMAND_PROFILE));
    mpd.push_attribute(("type", "static"));
    mpd.push_attribute(("mediaPresentationDuration", duration.as_str()));
    mpd.push_attribute(("minBufferTime", min_buffer.as_str()));
    mpd.push_attribute(("publishTime", publish.as_str()));
    emit(&mut writer, Event::Start(mpd))?;

    let mut period = BytesStart::new("Period");
    period.push_attribute(("id", "0"));
    period.push_attribute(("start", "PT0S"));
    emit(&mut writer, Event::Start(period))?;

    for (set_id, (codec, members)) in codec_groups(levels).into_iter().enumerate() {
        let container = members[0].container;
        let set_id = set_id.to_string();
        let mut set = BytesStart::new("AdaptationSet");
        set.push_attribute(("id", set_id.as_str()));
        set.push_attribute(("contentType", "video"));
        set.push_attribute(("mimeType", mime_type(container)));
        set.push_attribute(("codecs", codec.rfc6381()));
        set.push_attribute(("segmentAlignment", "true"));
        set.push_attribute(("startWithSAP", "1"));
        emit(&mut writer, Event::Start(set))?;

        if let Some(meta) = ctx.projection.filter(|m| m.is_spherical()) {
            let mut spherical = BytesStart::new("SupplementalProperty");
            spherical.push_attribute(("schemeIdUri", SPHERICAL_SCHEME));
            spherical.push_attribute(("value", "1"));
            emit(&mut writer, Event::Empty(spherical))?;

            let mut projection = BytesStart::new("SupplementalProperty");
            projection.push_attribute(("schemeIdUri", PROJECTION_SCHEME));
            projection.push_attribute(("value", meta.projection().as_str()));
            emit(&mut writer, Event::Empty(projection))?;
        }

        for level in members {
            write_representation(&mut writer, level, ctx.segment_duration)?;
        }
        emit(&mut writer, Event::End(BytesEnd::new("AdaptationSet")))?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("Period")))?;
    emit(&mut writer, Event::End(BytesEnd::new("MPD")))?;

    let mut xml = String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| DomainError::ManifestWrite(e.to_string()))?;
    xml.push('\n');
    Ok(xml)
}

fn write_representation(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    level: &BitrateLevel,
    segment_duration: u32,
) -> Result<(), DomainError> {
    let key = level.rendition_key();
    let bandwidth = (level.bitrate_kbps as u64 * 1000).to_string();
    let width = level.width.to_string();
    let height = level.height.to_string();

    let mut representation = BytesStart::new("Representation");
    representation.push_attribute(("id", key.as_str()));
    representation.push_attribute(("bandwidth", bandwidth.as_str()));
    representation.push_attribute(("width", width.as_str()));
    representation.push_attribute(("height", height.as_str()));
    emit(writer, Event::Start(representation))?;

    let initialization = format!("{}/{}", key, init_segment_name(level.container));
    let media = format!("{}/segment_$Number%05d$.{}", key, segment_extension(level.container));
    let timescale = TIMESCALE.to_string();
    let duration = (segment_duration * TIMESCALE).to_string();

    let mut template = BytesStart::new("SegmentTemplate");
    template.push_attribute(("initialization", initialization.as_str()));
    template.push_attribute(("media", media.as_str()));
    template.push_attribute(("timescale", timescale.as_str()));
    template.push_attribute(("duration", duration.as_str()));
    template.push_attribute(("startNumber", "1"));
    emit(writer, Event::Empty(template))?;

    emit(writer, Event::End(BytesEnd::new("Representation")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DetectionSignal, ProjectionType, StereoMode};
    use chrono::TimeZone;

    fn level(name: &str, height: u32, kbps: u32, codec: Codec, container: Container) -> BitrateLevel {
        BitrateLevel {
            name: name.to_string(),
            width: height * 2,
            height,
            bitrate_kbps: kbps,
            max_bitrate_kbps: kbps * 3 / 2,
            codec,
            container,
        }
    }

    fn context(projection: Option<&ProjectionMetadata>) -> MpdContext<'_> {
        MpdContext {
            duration_seconds: 30.0,
            segment_duration: 6,
            projection,
            publish_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_adaptation_set_per_codec() {
        let levels = vec![
            level("640p_360", 640, 800, Codec::H264, Container::Mp4),
            level("960p_360", 960, 1500, Codec::H264, Container::Mp4),
            level("640p_360", 640, 800, Codec::Vp9, Container::Webm),
        ];
        let meta = ProjectionMetadata::new(
            ProjectionType::Equirectangular,
            StereoMode::Mono,
            1.0,
            vec![DetectionSignal::MetadataTag],
        );
        let xml = render_mpd(&levels, &context(Some(&meta))).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("type=\"static\""));
        assert!(xml.contains("mediaPresentationDuration=\"PT30.000S\""));
        assert!(xml.contains("minBufferTime=\"PT6S\""));
        assert!(xml.contains("publishTime=\"2024-01-01T00:00:00Z\""));
        assert_eq!(xml.matches("<AdaptationSet").count(), 2);
        assert_eq!(xml.matches("<Representation").count(), 3);
        assert_eq!(xml.matches("http://youtube.com/yt/spherical").count(), 2);
        assert!(xml.contains("value=\"equirectangular\""));
        assert!(xml.contains("media=\"960p_360_h264/segment_$Number%05d$.m4s\""));
        assert!(xml.contains("initialization=\"640p_360_vp9/init.webm\""));
        assert!(xml.contains("duration=\"6000\""));
        assert!(xml.contains("mimeType=\"video/webm\""));
    }

    #[test]
    fn test_flat_mpd_has_no_spherical_property() {
        let levels = vec![level("720p", 720, 3000, Codec::H264, Container::Mp4)];
        let xml = render_mpd(&levels, &context(None)).unwrap();
        assert!(!xml.contains("SupplementalProperty"));
    }

    #[test]
    fn test_deterministic() {
        let levels = vec![level("720p", 720, 3000, Codec::Hevc, Container::Mp4)];
        assert_eq!(
            render_mpd(&levels, &context(None)).unwrap(),
            render_mpd(&levels, &context(None)).unwrap()
        );
    }
}
