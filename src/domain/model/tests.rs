// Unit tests for domain models

use super::*;

fn res(width: u32, height: u32) -> Resolution {
    Resolution::new(width, height).unwrap()
}

#[test]
fn test_resolution_rejects_zero() {
    assert!(Resolution::new(0, 1080).is_err());
    assert!(Resolution::new(1920, 0).is_err());
    assert_eq!(res(3840, 1920).aspect_ratio(), 2.0);
}

#[test]
fn test_resolution_fits_within() {
    assert!(res(1280, 720).fits_within(&res(1920, 1080)));
    assert!(res(1920, 1080).fits_within(&res(1920, 1080)));
    assert!(!res(3840, 2160).fits_within(&res(1920, 1080)));
    assert_eq!(format!("{}", res(640, 360)), "640x360");
}

#[test]
fn test_video_asset_validation() {
    let asset = VideoAsset::new("a1", "/media/clip_360.mp4", 12.5, res(3840, 1920), 30.0).unwrap();
    assert_eq!(asset.id(), "a1");
    assert_eq!(asset.file_name(), "clip_360.mp4");
    assert_eq!(asset.resolution(), res(3840, 1920));

    assert!(VideoAsset::new("", "x.mp4", 1.0, res(10, 10), 30.0).is_err());
    assert!(VideoAsset::new("a", "x.mp4", -1.0, res(10, 10), 30.0).is_err());
    assert!(VideoAsset::new("a", "x.mp4", 1.0, res(10, 10), 0.0).is_err());
}

#[test]
fn test_projection_type_parse() {
    assert_eq!(
        "equirect".parse::<ProjectionType>().unwrap(),
        ProjectionType::Equirectangular
    );
    assert_eq!(
        "Little-Planet".parse::<ProjectionType>().unwrap(),
        ProjectionType::Stereographic
    );
    assert!(matches!(
        "mercator".parse::<ProjectionType>(),
        Err(DomainError::UnsupportedProjection(_))
    ));
    assert!(!ProjectionType::Unknown.is_spherical());
    assert!(ProjectionType::Fisheye.is_spherical());
}

#[test]
fn test_projection_metadata_clamps_confidence() {
    let meta = ProjectionMetadata::new(
        ProjectionType::Cubemap,
        StereoMode::Mono,
        1.7,
        vec![DetectionSignal::MetadataTag],
    );
    assert_eq!(meta.confidence(), 1.0);
    assert_eq!(meta.require_spherical().unwrap(), ProjectionType::Cubemap);

    let unknown = ProjectionMetadata::unknown();
    assert_eq!(unknown.confidence(), 0.0);
    assert!(unknown.signals().is_empty());
    assert!(matches!(
        unknown.require_spherical(),
        Err(DomainError::ClassificationAmbiguous(_))
    ));
}

#[test]
fn test_viewport_normalization() {
    let vp = Viewport::new(270.0, 120.0, 90.0, res(640, 360)).unwrap();
    assert_eq!(vp.yaw(), -90.0);
    assert_eq!(vp.pitch(), 90.0);

    let vp = Viewport::new(-190.0, -100.0, 90.0, res(640, 360)).unwrap();
    assert_eq!(vp.yaw(), 170.0);
    assert_eq!(vp.pitch(), -90.0);

    assert_eq!(Viewport::new(180.0, 0.0, 90.0, res(8, 8)).unwrap().yaw(), 180.0);
}

#[test]
fn test_viewport_rejects_bad_fov() {
    assert!(Viewport::new(0.0, 0.0, 0.0, res(8, 8)).is_err());
    assert!(Viewport::new(0.0, 0.0, 180.0, res(8, 8)).is_err());
    assert!(Viewport::new(f64::NAN, 0.0, 90.0, res(8, 8)).is_err());
}

#[test]
fn test_viewport_vertical_fov() {
    let square = Viewport::new(0.0, 0.0, 90.0, res(100, 100)).unwrap();
    assert!((square.vertical_fov() - 90.0).abs() < 1e-9);

    let wide = Viewport::new(0.0, 0.0, 90.0, res(200, 100)).unwrap();
    assert!(wide.vertical_fov() < 90.0);
}

#[test]
fn test_view_direction_presets() {
    assert_eq!(ViewDirection::Back.yaw_pitch(), (180.0, 0.0));
    assert_eq!(ViewDirection::Down.yaw_pitch(), (0.0, -90.0));
    assert_eq!("LEFT".parse::<ViewDirection>().unwrap(), ViewDirection::Left);
    assert!("sideways".parse::<ViewDirection>().is_err());

    let vp = Viewport::from_direction(ViewDirection::Right, 90.0, res(64, 64)).unwrap();
    assert_eq!(vp.yaw(), 90.0);
}

#[test]
fn test_output_format_mapping() {
    assert_eq!(OutputFormat::Webm.codec(), Codec::Vp9);
    assert_eq!(OutputFormat::Ogv.container().extension(), "ogv");
    assert_eq!(OutputFormat::Av1Webm.container(), Container::Webm);
    assert_eq!("av1_mp4".parse::<OutputFormat>().unwrap(), OutputFormat::Av1Mp4);
    assert!(matches!(
        "flv".parse::<OutputFormat>(),
        Err(DomainError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_codec_pass_counts() {
    assert_eq!(Codec::Theora.default_pass_count(), 1);
    assert_eq!(Codec::H264.default_pass_count(), 2);
    assert_eq!(Codec::Vp9.default_pass_count(), 2);
    assert_eq!(Codec::Hevc.default_pass_count(), 2);
    assert_eq!(Codec::Av1.default_pass_count(), 3);
}

#[test]
fn test_profile_validation_and_scaling() {
    let profile = EncodingProfile {
        format: OutputFormat::Mp4,
        preset: QualityPreset::Medium,
        codec: Codec::H264,
        container: Container::Mp4,
        target_bitrate_kbps: 2500,
        min_bitrate_kbps: 1000,
        max_bitrate_kbps: 4000,
        audio_bitrate_kbps: 192,
        crf: Some(23),
        pass_count: 2,
    };
    assert!(profile.validate().is_ok());

    let scaled = profile.scaled(2.5);
    assert_eq!(scaled.target_bitrate_kbps, 6250);
    assert_eq!(scaled.max_bitrate_kbps, 10000);
    assert_eq!(scaled.audio_bitrate_kbps, 192);
    assert_eq!(scaled.crf, Some(23));

    let tier = BitrateLevel {
        name: "960p_360".to_string(),
        width: 1920,
        height: 960,
        bitrate_kbps: 1500,
        max_bitrate_kbps: 2250,
        codec: Codec::H264,
        container: Container::Mp4,
    };
    let rated = profile.for_level(&tier);
    assert_eq!(rated.target_bitrate_kbps, 1500);
    assert_eq!(rated.min_bitrate_kbps, 600);
    assert_eq!(rated.max_bitrate_kbps, 2250);
    assert_eq!(rated.pass_count, 2);
    assert!(rated.validate().is_ok());

    let mut broken = profile.clone();
    broken.min_bitrate_kbps = 5000;
    assert!(broken.validate().is_err());

    let mut broken = profile;
    broken.pass_count = 4;
    assert!(broken.validate().is_err());
}

#[test]
fn test_serde_names() {
    let json = serde_json::to_string(&OutputFormat::Av1Webm).unwrap();
    assert_eq!(json, "\"av1_webm\"");
    let json = serde_json::to_string(&StereoMode::TopBottom).unwrap();
    assert_eq!(json, "\"top-bottom\"");
}

#[test]
fn test_content_hints_defaults() {
    let hints = ContentHints::default();
    assert!(hints.timestamps_within(100.0).is_empty());
    assert_eq!(hints.motion_multiplier(), 1.0);
}

#[test]
fn test_content_hints_filtering() {
    let hints = ContentHints {
        recommended_timestamps: vec![30.0, -1.0, 5.0, 30.0, 400.0, f64::NAN],
        scene_boundaries: vec![],
        motion_intensity: Some(3.0),
    };
    assert_eq!(hints.timestamps_within(120.0), vec![5.0, 30.0]);
    assert_eq!(hints.motion_multiplier(), 1.5);

    let parsed: ContentHints = serde_json::from_str(r#"{"motion_intensity": 0.5}"#).unwrap();
    assert_eq!(parsed.motion_multiplier(), 1.25);
}

#[test]
fn test_intermediate_preference() {
    assert_eq!(OutputFormat::Webm.preferred_intermediate(), Some(OutputFormat::Mp4));
    assert_eq!(OutputFormat::Ogv.preferred_intermediate(), Some(OutputFormat::Mp4));
    assert_eq!(OutputFormat::Mp4.preferred_intermediate(), None);
    assert_eq!(OutputFormat::Hevc.preferred_intermediate(), None);
}

#[test]
fn test_format_for_rendition() {
    assert_eq!(OutputFormat::for_rendition(Codec::Vp9, Container::Webm), Some(OutputFormat::Webm));
    assert_eq!(OutputFormat::for_rendition(Codec::Av1, Container::Mp4), Some(OutputFormat::Av1Mp4));
    assert_eq!(OutputFormat::for_rendition(Codec::H264, Container::Webm), None);
}

#[test]
fn test_rendition_key() {
    let level = BitrateLevel {
        name: "1080p".to_string(),
        width: 1920,
        height: 1080,
        bitrate_kbps: 6000,
        max_bitrate_kbps: 9000,
        codec: Codec::Hevc,
        container: Container::Mp4,
    };
    assert_eq!(level.rendition_key(), "1080p_hevc");
    assert_eq!(level.resolution(), res(1920, 1080));
}
