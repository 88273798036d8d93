use std::path::PathBuf;

use hdrmerge_core::pipeline::{LoadOptions, MergeConfig, PreviewSize, SaveOptions};

#[test]
fn test_default_config_round_trip() {
    let config = MergeConfig::default();
    let text = toml::to_string(&config).unwrap();

    assert!(text.contains("[load]"));
    assert!(text.contains("[save]"));
    let parsed: MergeConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_partial_config_uses_defaults() {
    let text = r#"
        [load]
        batch = true
        batch_gap = 4.5

        [save]
        preview_size = "half"
        file_name = "%id[-1]/hdr_%in[0]"
    "#;

    let config: MergeConfig = toml::from_str(text).unwrap();

    assert!(config.load.batch);
    assert_eq!(config.load.batch_gap, 4.5);
    assert!(config.load.align);
    assert!(config.load.crop);
    assert_eq!(config.load.custom_wl, LoadOptions::default().custom_wl);
    assert_eq!(config.save.preview_size, PreviewSize::Half);
    assert_eq!(config.save.file_name, "%id[-1]/hdr_%in[0]");
    assert_eq!(config.save.bps, 16);
    assert_eq!(config.save.feather_radius, SaveOptions::default().feather_radius);
}

#[test]
fn test_empty_config_is_default() {
    let config: MergeConfig = toml::from_str("").unwrap();
    assert_eq!(config, MergeConfig::default());
}

#[test]
fn test_file_names_in_config() {
    let text = r#"
        [load]
        file_names = ["a/IMG_1.ser", "a/IMG_2.ser"]
        with_singles = true
    "#;

    let config: MergeConfig = toml::from_str(text).unwrap();

    assert_eq!(
        config.load.file_names,
        [PathBuf::from("a/IMG_1.ser"), PathBuf::from("a/IMG_2.ser")]
    );
    assert!(config.load.with_singles);
    assert!(!config.load.batch);
}

#[test]
fn test_unknown_preview_size_is_rejected() {
    let text = "[save]\npreview_size = \"quarter\"\n";
    assert!(toml::from_str::<MergeConfig>(text).is_err());
}
