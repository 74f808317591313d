//! Media duration queries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::tool::cancel::CancellationToken;
use crate::tool::command::Invocation;
use crate::tool::runner::ToolRunner;

/// Read-only duration lookup.
pub trait MediaProbe: Send + Sync {
    /// Duration of `path` in seconds. Never negative or non-finite.
    fn duration(&self, path: &Path) -> StoryreelResult<f64>;
}

/// [`MediaProbe`] backed by `ffprobe`'s JSON output.
pub struct FfprobeProbe {
    runner: Arc<dyn ToolRunner>,
    program: PathBuf,
    cancel: CancellationToken,
}

impl FfprobeProbe {
    pub fn new(runner: Arc<dyn ToolRunner>, program: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            program: program.into(),
            cancel: CancellationToken::new(),
        }
    }

    /// Abort in-flight probes when `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn invocation(&self, path: &Path) -> Invocation {
        Invocation {
            program: self.program.clone(),
            args: vec![
                "-v".to_owned(),
                "error".to_owned(),
                "-print_format".to_owned(),
                "json".to_owned(),
                "-show_format".to_owned(),
                path.to_string_lossy().into_owned(),
            ],
        }
    }
}

impl MediaProbe for FfprobeProbe {
    fn duration(&self, path: &Path) -> StoryreelResult<f64> {
        if !path.is_file() {
            return Err(StoryreelError::probe(path, "file does not exist"));
        }

        let out = self
            .runner
            .run(&self.invocation(path), &self.cancel)
            .map_err(|e| match e {
                StoryreelError::ToolInvocation {
                    reason,
                    diagnostics,
                    ..
                } => StoryreelError::probe(path, format!("ffprobe {reason}: {diagnostics}")),
                other => other,
            })?;

        let seconds = parse_probe_json(&out.stdout).map_err(|r| StoryreelError::probe(path, r))?;
        tracing::debug!(path = %path.display(), seconds, "probed duration");
        Ok(seconds)
    }
}

fn parse_probe_json(stdout: &[u8]) -> Result<f64, String> {
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut =
        serde_json::from_slice(stdout).map_err(|e| format!("ffprobe json parse failed: {e}"))?;
    let raw = parsed
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| "ffprobe reported no duration".to_owned())?;
    parse_duration_value(&raw)
}

/// Parse a duration string as printed by ffprobe.
///
/// Accepts plain decimal or scientific notation with a `.` separator only.
pub fn parse_duration_value(raw: &str) -> Result<f64, String> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("n/a") {
        return Err(format!("no usable duration ('{s}')"));
    }
    if s.contains(',') {
        return Err(format!("duration '{s}' contains a separator"));
    }
    let v: f64 = s
        .parse()
        .map_err(|_| format!("duration '{s}' is not a number"))?;
    if !v.is_finite() {
        return Err(format!("duration '{s}' is not finite"));
    }
    if v < 0.0 {
        return Err(format!("duration '{s}' is negative"));
    }
    Ok(v)
}

#[cfg(test)]
#[path = "../tests/unit/probe.rs"]
mod tests;
