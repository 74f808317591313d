//! External tool plumbing: typed commands, process execution and cancellation.

use std::path::{Path, PathBuf};

use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Cooperative cancellation with optional deadline.
pub mod cancel;
/// Typed ffmpeg command descriptors.
pub mod command;
/// Process execution behind the [`runner::ToolRunner`] seam.
pub mod runner;

use cancel::CancellationToken;
use command::FfmpegCommand;
use runner::ToolRunner;

/// Sibling path an in-progress output is written to: `<stem>.partial.<ext>`.
pub fn partial_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!("{stem}.partial.{}", ext.to_string_lossy()),
        None => format!("{stem}.partial"),
    };
    output.with_file_name(name)
}

/// Removes the partial file unless the run completed.
struct PartialOutput(Option<PathBuf>);

impl PartialOutput {
    fn commit(mut self, dest: &Path) -> StoryreelResult<()> {
        let Some(path) = self.0.take() else {
            return Ok(());
        };
        std::fs::rename(&path, dest).map_err(|e| {
            let _ = std::fs::remove_file(&path);
            anyhow::anyhow!(
                "rename '{}' -> '{}': {e}",
                path.display(),
                dest.display()
            )
        })?;
        Ok(())
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Run `cmd` with `ffmpeg`, publishing its output only on success.
///
/// The command writes to [`partial_path`] first; a failed or cancelled run therefore never leaves
/// a truncated file at the final destination.
pub fn run_ffmpeg(
    runner: &dyn ToolRunner,
    ffmpeg: &Path,
    cmd: &FfmpegCommand,
    cancel: &CancellationToken,
) -> StoryreelResult<()> {
    let partial = partial_path(&cmd.output);
    let guard = PartialOutput(Some(partial.clone()));
    let invocation = cmd.with_output(&partial).invocation(ffmpeg);
    tracing::debug!(command = %invocation.display_line(), "ffmpeg");

    runner.run(&invocation, cancel)?;

    if !partial.is_file() {
        return Err(StoryreelError::tool(
            invocation.tool_name(),
            "no output produced",
            format!("expected '{}'", partial.display()),
        ));
    }
    guard.commit(&cmd.output)
}

#[cfg(test)]
#[path = "../../tests/unit/tool/mod.rs"]
mod tests;
