use super::*;
use crate::tool::command::Invocation;
use crate::tool::runner::ToolOutput;

/// Writes `contents` to the last argument (the output path) unless configured to fail.
struct FakeFfmpeg {
    fail: bool,
    write: bool,
}

impl ToolRunner for FakeFfmpeg {
    fn run(
        &self,
        invocation: &Invocation,
        _cancel: &CancellationToken,
    ) -> StoryreelResult<ToolOutput> {
        let out = invocation.args.last().unwrap();
        if self.write {
            std::fs::write(out, b"clip").unwrap();
        }
        if self.fail {
            return Err(StoryreelError::tool("ffmpeg", "exit status: 1", "boom"));
        }
        Ok(ToolOutput::default())
    }
}

#[test]
fn partial_path_keeps_extension() {
    assert_eq!(
        partial_path(Path::new("work/scene0.mp4")),
        PathBuf::from("work/scene0.partial.mp4")
    );
    assert_eq!(
        partial_path(Path::new("out")),
        PathBuf::from("out.partial")
    );
}

#[test]
fn success_renames_partial_into_place() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("scene0.mp4");
    let cmd = FfmpegCommand::new(&out);
    run_ffmpeg(
        &FakeFfmpeg {
            fail: false,
            write: true,
        },
        Path::new("ffmpeg"),
        &cmd,
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), b"clip");
    assert!(!partial_path(&out).exists());
}

#[test]
fn failure_removes_partial_and_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("scene0.mp4");
    let err = run_ffmpeg(
        &FakeFfmpeg {
            fail: true,
            write: true,
        },
        Path::new("ffmpeg"),
        &FfmpegCommand::new(&out),
        &CancellationToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, StoryreelError::ToolInvocation { .. }));
    assert!(!out.exists());
    assert!(!partial_path(&out).exists());
}

#[test]
fn missing_output_after_success_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("combined.mp4");
    let err = run_ffmpeg(
        &FakeFfmpeg {
            fail: false,
            write: false,
        },
        Path::new("/opt/ffmpeg/bin/ffmpeg"),
        &FfmpegCommand::new(&out),
        &CancellationToken::new(),
    )
    .unwrap_err();
    match err {
        StoryreelError::ToolInvocation { tool, reason, .. } => {
            assert_eq!(tool, "ffmpeg");
            assert_eq!(reason, "no output produced");
        }
        other => panic!("unexpected error: {other}"),
    }
}
