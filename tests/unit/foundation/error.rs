use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        StoryreelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        StoryreelError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    assert!(
        StoryreelError::cancelled("x")
            .to_string()
            .starts_with("cancelled:")
    );
    let missing = StoryreelError::missing_asset("narration audio", Path::new("a/voice.mp3"));
    assert_eq!(missing.to_string(), "missing narration audio 'a/voice.mp3'");
}

#[test]
fn tool_errors_carry_diagnostics() {
    let err = StoryreelError::tool("ffmpeg", "exit status: 1", "Invalid argument");
    let text = err.to_string();
    assert!(text.contains("ffmpeg"));
    assert!(text.contains("exit status: 1"));
    assert!(text.contains("Invalid argument"));
}

#[test]
fn wrappers_name_scene_and_stage() {
    let err = StoryreelError::probe(Path::new("v.mp4"), "no duration")
        .in_scene(3)
        .in_stage("scene render");
    let text = err.to_string();
    assert!(text.starts_with("scene render stage failed"));
    assert!(text.contains("scene #3"));
    assert!(text.contains("no duration"));
}

#[test]
fn cancellation_is_visible_through_wrappers() {
    let err = StoryreelError::cancelled("deadline")
        .in_scene(0)
        .in_stage("scene render");
    assert!(err.is_cancelled());
    assert!(!StoryreelError::validation("x").in_stage("mix").is_cancelled());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = StoryreelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn root_cause_unwraps_every_layer() {
    let err = StoryreelError::missing_asset("scene image", Path::new("i.png"))
        .in_scene(1)
        .in_stage("init");
    assert!(matches!(
        err.root_cause(),
        StoryreelError::MissingAsset {
            role: "scene image",
            ..
        }
    ));
    let plain = StoryreelError::validation("x");
    assert!(matches!(plain.root_cause(), StoryreelError::Validation(_)));
}
