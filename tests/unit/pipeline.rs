use super::*;
use crate::tool::runner::ToolOutput;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[test]
fn layout_defaults_follow_episode_name() {
    let layout = RunLayout::for_episode(Path::new("episodes/ep1.json"), None, None, "mp4").unwrap();
    assert_eq!(layout.output, PathBuf::from("episodes/ep1.mp4"));
    assert_eq!(layout.work_dir, PathBuf::from("generated-ep1"));
    assert_eq!(layout.scene_clip(2), PathBuf::from("generated-ep1/scene2.mp4"));
    assert_eq!(layout.combined(), PathBuf::from("generated-ep1/combined.mp4"));
    assert_eq!(
        layout.overlay_payload(0),
        PathBuf::from("generated-ep1/overlay0.txt")
    );
}

#[test]
fn layout_respects_explicit_paths() {
    let layout = RunLayout::for_episode(
        Path::new("ep1.json"),
        Some(PathBuf::from("out/final.mkv")),
        Some(PathBuf::from("/tmp/work")),
        "mkv",
    )
    .unwrap();
    assert_eq!(layout.output, PathBuf::from("out/final.mkv"));
    assert_eq!(layout.scene_clip(0), PathBuf::from("/tmp/work/scene0.mkv"));
}

#[test]
fn output_without_extension_is_rejected() {
    let err = RunLayout::for_episode(
        Path::new("ep1.json"),
        Some(PathBuf::from("out/final")),
        None,
        "mp4",
    )
    .unwrap_err();
    assert!(matches!(err, StoryreelError::Validation(_)));
    assert!(err.to_string().contains("out/final"), "{err}");
}

#[test]
fn ensure_dirs_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let layout = RunLayout::new(
        dir.path().join("work"),
        dir.path().join("nested/out/final.mp4"),
        "mp4",
    );
    layout.ensure_dirs().unwrap();
    layout.ensure_dirs().unwrap();
    assert!(layout.work_dir.is_dir());
    assert!(dir.path().join("nested/out").is_dir());
}

#[test]
fn stage_labels() {
    assert_eq!(Stage::SceneRender.label(), "scene render");
    assert_eq!(Stage::ComposeOverlays.label(), "compose overlays");
    assert_eq!(Stage::Aborted.label(), "aborted");
}

#[test]
fn zero_threads_is_rejected() {
    assert!(build_thread_pool(Some(0)).is_err());
    assert_eq!(build_thread_pool(Some(2)).unwrap().current_num_threads(), 2);
}

struct ConstProbe(f64);

impl MediaProbe for ConstProbe {
    fn duration(&self, _path: &Path) -> StoryreelResult<f64> {
        Ok(self.0)
    }
}

/// Fails every scene whose output name contains `fail_on`; all other commands succeed.
struct SelectiveRunner {
    fail_on: &'static str,
    ran: Mutex<Vec<String>>,
}

impl ToolRunner for SelectiveRunner {
    fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> StoryreelResult<ToolOutput> {
        cancel.checkpoint("test tool")?;
        let out = invocation.args.last().unwrap().clone();
        self.ran.lock().unwrap().push(out.clone());
        if out.contains(self.fail_on) {
            return Err(StoryreelError::tool("ffmpeg", "exit status: 1", "bad input"));
        }
        std::fs::write(&out, b"x").unwrap();
        Ok(ToolOutput::default())
    }
}

fn episode_in(dir: &Path, scenes: usize) -> Episode {
    let mut list = Vec::new();
    for i in 0..scenes {
        let img = dir.join(format!("img{i}.png"));
        let voice = dir.join(format!("voice{i}.mp3"));
        std::fs::write(&img, b"i").unwrap();
        std::fs::write(&voice, b"a").unwrap();
        list.push(serde_json::json!({
            "type": "image",
            "content": {"filename": img, "audio": {"filename": voice}}
        }));
    }
    let music = dir.join("music.mp3");
    std::fs::write(&music, b"m").unwrap();
    let doc = serde_json::json!({
        "scenes": list,
        "backgroundMusic": {"filename": music}
    });
    Episode::from_reader(doc.to_string().as_bytes()).unwrap()
}

#[test]
fn scene_failure_aborts_in_scene_render_stage() {
    let dir = tempfile::tempdir().unwrap();
    let episode = episode_in(dir.path(), 3);
    let layout = RunLayout::new(dir.path().join("work"), dir.path().join("out.mp4"), "mp4");
    let cfg = RenderConfig {
        max_parallel_scenes: Some(1),
        ..RenderConfig::default()
    };
    let probe = ConstProbe(2.0);
    let runner = SelectiveRunner {
        fail_on: "scene1",
        ran: Mutex::new(Vec::new()),
    };

    let err = Pipeline::new(&cfg, &probe, &runner, CancellationToken::new())
        .run(&episode, &layout)
        .unwrap_err();

    match &err {
        StoryreelError::Stage { stage, source } => {
            assert_eq!(*stage, "scene render");
            assert!(matches!(**source, StoryreelError::Scene { index: 1, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        err.root_cause(),
        StoryreelError::ToolInvocation { .. }
    ));
    let ran = runner.ran.lock().unwrap();
    assert!(!ran.iter().any(|o| o.contains("combined")));
    assert!(!layout.output.exists());
}

/// Scene 0 blocks until cancelled; scene 1 fails once scene 0 is running.
struct BlockingRunner {
    started: AtomicBool,
    log: Mutex<Vec<String>>,
}

impl BlockingRunner {
    fn wait_until(limit: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + limit;
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }
}

impl ToolRunner for BlockingRunner {
    fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> StoryreelResult<ToolOutput> {
        let out = invocation.args.last().unwrap().clone();
        if out.contains("scene0") {
            self.started.store(true, Ordering::SeqCst);
            if Self::wait_until(Duration::from_secs(10), || cancel.is_cancelled()) {
                self.log.lock().unwrap().push("scene0 cancelled".to_owned());
                return Err(StoryreelError::cancelled("ffmpeg terminated"));
            }
            self.log.lock().unwrap().push("scene0 finished".to_owned());
        } else if out.contains("scene1") {
            Self::wait_until(Duration::from_secs(10), || self.started.load(Ordering::SeqCst));
            return Err(StoryreelError::tool("ffmpeg", "exit 1", "bad"));
        }
        std::fs::write(&out, b"x").unwrap();
        Ok(ToolOutput::default())
    }
}

#[test]
fn parallel_failure_cancels_siblings_and_reports_real_error() {
    let dir = tempfile::tempdir().unwrap();
    let episode = episode_in(dir.path(), 2);
    let layout = RunLayout::new(dir.path().join("work"), dir.path().join("out.mp4"), "mp4");
    let cfg = RenderConfig {
        max_parallel_scenes: Some(2),
        ..RenderConfig::default()
    };
    let probe = ConstProbe(2.0);
    let runner = BlockingRunner {
        started: AtomicBool::new(false),
        log: Mutex::new(Vec::new()),
    };

    let err = Pipeline::new(&cfg, &probe, &runner, CancellationToken::new())
        .run(&episode, &layout)
        .unwrap_err();

    assert!(!err.is_cancelled(), "{err}");
    assert!(matches!(
        err.root_cause(),
        StoryreelError::ToolInvocation { .. }
    ));
    match &err {
        StoryreelError::Stage { stage, source } => {
            assert_eq!(*stage, "scene render");
            assert!(matches!(**source, StoryreelError::Scene { index: 1, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(*runner.log.lock().unwrap(), vec!["scene0 cancelled"]);
    assert!(!layout.output.exists());
}

#[test]
fn cancelled_run_stops_before_tools() {
    let dir = tempfile::tempdir().unwrap();
    let episode = episode_in(dir.path(), 2);
    let layout = RunLayout::new(dir.path().join("work"), dir.path().join("out.mp4"), "mp4");
    let cfg = RenderConfig::default();
    let probe = ConstProbe(2.0);
    let runner = SelectiveRunner {
        fail_on: "never",
        ran: Mutex::new(Vec::new()),
    };
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = Pipeline::new(&cfg, &probe, &runner, cancel)
        .run(&episode, &layout)
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(runner.ran.lock().unwrap().is_empty());
}

#[derive(Default)]
struct Collect(Mutex<Vec<PipelineEvent>>);

impl PipelineObserver for Collect {
    fn on_event(&self, event: &PipelineEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

#[test]
fn observer_sees_stages_and_scenes() {
    let dir = tempfile::tempdir().unwrap();
    let episode = episode_in(dir.path(), 2);
    let layout = RunLayout::new(dir.path().join("work"), dir.path().join("out.mp4"), "mp4");
    let cfg = RenderConfig::default();
    let probe = ConstProbe(2.0);
    let runner = SelectiveRunner {
        fail_on: "never",
        ran: Mutex::new(Vec::new()),
    };
    let events = Collect::default();

    let report = Pipeline::new(&cfg, &probe, &runner, CancellationToken::new())
        .with_observer(&events)
        .run(&episode, &layout)
        .unwrap();

    assert_eq!(
        report.stages,
        vec![
            Stage::Init,
            Stage::SceneRender,
            Stage::Concatenate,
            Stage::Mix,
            Stage::Done
        ]
    );
    let events = events.0.lock().unwrap();
    let rendered = events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::SceneRendered { .. }))
        .count();
    assert_eq!(rendered, 2);
    assert!(matches!(
        events.last(),
        Some(PipelineEvent::Finished { total_duration, .. }) if *total_duration == 2.0
    ));
}
