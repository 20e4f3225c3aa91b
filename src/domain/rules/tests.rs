// Unit tests for lookup tables and policies

use super::*;

#[test]
fn test_standard_table_covers_every_pair() {
    let table = ProfileTable::standard();
    for format in OutputFormat::ALL {
        for preset in QualityPreset::ALL {
            let profile = table.lookup(format, preset).unwrap();
            assert!(profile.validate().is_ok());
            assert_eq!(profile.codec, format.codec());
            assert_eq!(profile.pass_count, format.codec().default_pass_count());
        }
    }
}

#[test]
fn test_standard_table_values() {
    let table = ProfileTable::standard();

    let mp4 = table.lookup(OutputFormat::Mp4, QualityPreset::Medium).unwrap();
    assert_eq!(mp4.target_bitrate_kbps, 2500);
    assert_eq!(mp4.min_bitrate_kbps, 1000);
    assert_eq!(mp4.max_bitrate_kbps, 4000);
    assert_eq!(mp4.audio_bitrate_kbps, 192);
    assert_eq!(mp4.crf, Some(23));

    let av1 = table.lookup(OutputFormat::Av1Webm, QualityPreset::Low).unwrap();
    assert_eq!(av1.crf, Some(35));
    assert_eq!(av1.target_bitrate_kbps, 700);
    assert_eq!(av1.pass_count, 3);

    let ogv = table.lookup(OutputFormat::Ogv, QualityPreset::High).unwrap();
    assert_eq!(ogv.crf, None);
    assert_eq!(ogv.pass_count, 1);
}

#[test]
fn test_override_replaces_entry() {
    let mut custom = ProfileTable::standard()
        .lookup(OutputFormat::Mp4, QualityPreset::Low)
        .unwrap()
        .clone();
    custom.target_bitrate_kbps = 1200;

    let table = ProfileTable::standard().with_override(custom).unwrap();
    let entry = table.lookup(OutputFormat::Mp4, QualityPreset::Low).unwrap();
    assert_eq!(entry.target_bitrate_kbps, 1200);
    assert_eq!(table.entries().len(), ProfileTable::standard().entries().len());
}

#[test]
fn test_lookup_missing_profile() {
    let table = ProfileTable::from_entries(Vec::new()).unwrap();
    let err = table
        .lookup(OutputFormat::Hevc, QualityPreset::Ultra)
        .unwrap_err();
    assert_eq!(
        err,
        DomainError::UnknownProfile {
            format: "hevc".to_string(),
            preset: "ultra".to_string()
        }
    );
}

#[test]
fn test_projection_multipliers() {
    let multipliers = ProjectionMultipliers::standard();
    assert_eq!(multipliers.multiplier_for(ProjectionType::Equirectangular), 2.5);
    assert_eq!(multipliers.multiplier_for(ProjectionType::Cubemap), 2.0);
    assert_eq!(multipliers.multiplier_for(ProjectionType::Cylindrical), 1.8);
    assert_eq!(multipliers.multiplier_for(ProjectionType::Stereographic), 2.2);
    // no dedicated fisheye entry
    assert_eq!(multipliers.multiplier_for(ProjectionType::Fisheye), 2.0);

    let tuned = multipliers.with(ProjectionType::Fisheye, 1.6).unwrap();
    assert_eq!(tuned.multiplier_for(ProjectionType::Fisheye), 1.6);
    assert!(ProjectionMultipliers::standard()
        .with(ProjectionType::Cubemap, 0.0)
        .is_err());
}

#[test]
fn test_tier_tables_ascending() {
    for table in [standard_tiers(), spherical_tiers()] {
        for pair in table.windows(2) {
            assert!(pair[0].width < pair[1].width);
            assert!(pair[0].bitrate_kbps <= pair[1].bitrate_kbps);
        }
    }
    for tier in spherical_tiers() {
        assert_eq!(tier.width, tier.height * 2);
    }
}

#[test]
fn test_validate_ladder_order() {
    let level = |name: &str, width, height, bitrate| BitrateLevel {
        name: name.to_string(),
        width,
        height,
        bitrate_kbps: bitrate,
        max_bitrate_kbps: bitrate * 3 / 2,
        codec: Codec::H264,
        container: Container::Mp4,
    };

    let good = vec![level("a", 640, 360, 800), level("b", 1280, 720, 3000)];
    assert!(validate_ladder_order(&good).is_ok());

    let bad = vec![level("a", 640, 360, 800), level("b", 1280, 720, 700)];
    assert!(validate_ladder_order(&bad).is_err());
}

#[test]
fn test_display_class_parse() {
    assert_eq!("4K".parse::<DisplayClass>().unwrap(), DisplayClass::Uhd);
    assert!("8k".parse::<DisplayClass>().is_err());
}
