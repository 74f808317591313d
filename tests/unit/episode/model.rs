use super::*;

const SAMPLE: &str = r#"{
    "title": "ignored generator metadata",
    "scenes": [
        { "type": "image",
          "content": { "filename": "content/a.jpg", "audio": { "filename": "content/a.mp3" } } },
        { "type": "video", "fadeOut": false,
          "content": { "filename": "content/b.mp4", "audio": { "filename": "content/b.mp3" },
                       "description": "extra" } }
    ],
    "textOverlays": [
        { "text": "Beyond belief", "appearance": { "start": 1, "end": 3 } }
    ],
    "backgroundMusic": { "filename": "content/music.mp3" }
}"#;

#[test]
fn parses_document_into_typed_episode() {
    let ep = Episode::from_reader(SAMPLE.as_bytes()).unwrap();
    assert_eq!(ep.scenes().len(), 2);
    assert_eq!(ep.scenes()[0].kind, SceneKind::Image);
    assert_eq!(ep.scenes()[0].narration, PathBuf::from("content/a.mp3"));
    assert_eq!(ep.scenes()[0].fade_out_hint, None);
    assert_eq!(ep.scenes()[1].kind, SceneKind::Video);
    assert_eq!(ep.scenes()[1].fade_out_hint, Some(false));
    assert_eq!(ep.overlays().len(), 1);
    assert_eq!(ep.overlays()[0].start, 1.0);
    assert_eq!(ep.music().path, PathBuf::from("content/music.mp3"));
}

#[test]
fn overlays_are_optional() {
    let json = r#"{
        "scenes": [ { "type": "image",
            "content": { "filename": "a.png", "audio": { "filename": "a.mp3" } } } ],
        "backgroundMusic": { "filename": "m.mp3" }
    }"#;
    let ep = Episode::from_reader(json.as_bytes()).unwrap();
    assert!(ep.overlays().is_empty());
}

#[test]
fn unsupported_scene_type_names_index_and_kind() {
    let json = r#"{
        "scenes": [
            { "type": "image", "content": { "filename": "a.png", "audio": { "filename": "a.mp3" } } },
            { "type": "hologram", "content": { "filename": "b", "audio": { "filename": "b.mp3" } } }
        ],
        "backgroundMusic": { "filename": "m.mp3" }
    }"#;
    match Episode::from_reader(json.as_bytes()).unwrap_err() {
        StoryreelError::UnsupportedSceneType { index, kind } => {
            assert_eq!(index, 1);
            assert_eq!(kind, "hologram");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_scene_list_is_rejected() {
    let json = r#"{ "scenes": [], "backgroundMusic": { "filename": "m.mp3" } }"#;
    let err = Episode::from_reader(json.as_bytes()).unwrap_err();
    assert!(matches!(err, StoryreelError::Validation(_)));
}

#[test]
fn inverted_overlay_window_is_rejected() {
    let json = r#"{
        "scenes": [ { "type": "image",
            "content": { "filename": "a.png", "audio": { "filename": "a.mp3" } } } ],
        "textOverlays": [ { "text": "x", "appearance": { "start": 4, "end": 2 } } ],
        "backgroundMusic": { "filename": "m.mp3" }
    }"#;
    let err = Episode::from_reader(json.as_bytes()).unwrap_err();
    assert!(err.to_string().contains("overlay #0"));
}

#[test]
fn malformed_json_is_a_serde_error() {
    let err = Episode::from_reader("{ not json".as_bytes()).unwrap_err();
    assert!(matches!(err, StoryreelError::Serde(_)));
}

#[test]
fn check_assets_reports_missing_narration_first() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("a.png");
    std::fs::write(&image, b"png").unwrap();
    let scene = Scene {
        kind: SceneKind::Image,
        visual: image,
        narration: dir.path().join("missing.mp3"),
        fade_out_hint: None,
    };
    match scene.check_assets().unwrap_err() {
        StoryreelError::MissingAsset { role, path } => {
            assert_eq!(role, "narration audio");
            assert!(path.ends_with("missing.mp3"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
