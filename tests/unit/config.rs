use super::*;

#[test]
fn defaults_match_episode_render_settings() {
    let cfg = RenderConfig::default();
    assert_eq!(cfg.resolution, Resolution::HD);
    assert_eq!(cfg.framerate, 25);
    assert_eq!(cfg.background_volume, 0.5);
    assert_eq!(cfg.fades.scene_ceiling_sec, 0.5);
    assert_eq!(cfg.fades.music_fade_out_sec, 1.0);
    assert_eq!(cfg.zoom.target, 1.2);
    assert_eq!(cfg.zoom.increment_cap, 0.0001);
    assert_eq!(cfg.zoom.upscale_factor, 4);
    assert_eq!(cfg.encoding.sample_rate, 44_100);
    assert_eq!(cfg.encoding.audio_channels, 2);
    cfg.validate().unwrap();
}

#[test]
fn partial_json_keeps_defaults() {
    let json = r#"{ "framerate": 30, "fades": { "music_fade_out_sec": 2.0 } }"#;
    let cfg = RenderConfig::from_reader(json.as_bytes()).unwrap();
    assert_eq!(cfg.framerate, 30);
    assert_eq!(cfg.fades.music_fade_out_sec, 2.0);
    assert_eq!(cfg.fades.scene_ceiling_sec, 0.5);
    assert_eq!(cfg.resolution, Resolution::HD);
}

#[test]
fn unknown_fields_are_rejected() {
    let err = RenderConfig::from_reader(r#"{ "fps": 30 }"#.as_bytes()).unwrap_err();
    assert!(matches!(err, StoryreelError::Serde(_)));
}

#[test]
fn validation_catches_bad_values() {
    let mut cfg = RenderConfig::default();
    cfg.framerate = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = RenderConfig::default();
    cfg.background_volume = f64::NAN;
    assert!(cfg.validate().is_err());

    let mut cfg = RenderConfig::default();
    cfg.fades.scene_divisor = 1.5;
    assert!(cfg.validate().is_err());

    let mut cfg = RenderConfig::default();
    cfg.zoom.target = 0.9;
    assert!(cfg.validate().is_err());

    let mut cfg = RenderConfig::default();
    cfg.max_parallel_scenes = Some(0);
    assert!(cfg.validate().is_err());

    let mut cfg = RenderConfig::default();
    cfg.encoding.container_ext = ".mp4".to_owned();
    assert!(cfg.validate().is_err());
}
