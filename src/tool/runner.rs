use std::io::{ErrorKind, Read};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::tool::cancel::CancellationToken;
use crate::tool::command::Invocation;

/// Characters of stderr kept in [`StoryreelError::ToolInvocation`] diagnostics.
const DIAGNOSTIC_TAIL_CHARS: usize = 2000;

/// Captured output of a successful invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Executes external tool invocations.
///
/// Implementations must return `Err` for non-zero exits and must stop the process promptly once
/// `cancel` fires. Scene renders call this from several worker threads at once.
pub trait ToolRunner: Send + Sync {
    fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> StoryreelResult<ToolOutput>;
}

/// Runs tools as child processes of this one.
#[derive(Clone, Debug)]
pub struct SystemRunner {
    poll_interval: Duration,
}

impl SystemRunner {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

impl ToolRunner for SystemRunner {
    fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> StoryreelResult<ToolOutput> {
        let tool = invocation.tool_name();
        cancel.checkpoint(&tool)?;
        tracing::debug!(command = %invocation.display_line(), "spawning {tool}");

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    StoryreelError::tool(
                        &tool,
                        "executable not found",
                        format!(
                            "'{}' is not installed or not on PATH",
                            invocation.program.display()
                        ),
                    )
                } else {
                    StoryreelError::tool(&tool, "failed to spawn", e.to_string())
                }
            })?;

        // Both pipes are drained off-thread so a chatty tool never blocks on a full pipe.
        let stdout_drain = spawn_drain(child.stdout.take());
        let stderr_drain = spawn_drain(child.stderr.take());

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(StoryreelError::tool(&tool, "failed to wait", e.to_string()));
                }
            }
            if cancel.is_cancelled() {
                tracing::warn!("terminating {tool} after cancellation");
                let _ = child.kill();
                let _ = child.wait();
                let _ = join_drain(stdout_drain);
                let _ = join_drain(stderr_drain);
                return Err(StoryreelError::cancelled(format!("{tool} terminated")));
            }
            thread::sleep(self.poll_interval);
        };

        let stdout = join_drain(stdout_drain)?;
        let stderr = join_drain(stderr_drain)?;
        if !status.success() {
            return Err(StoryreelError::tool(
                &tool,
                format!("exited with {status}"),
                tail_chars(&String::from_utf8_lossy(&stderr), DIAGNOSTIC_TAIL_CHARS),
            ));
        }
        Ok(ToolOutput { stdout, stderr })
    }
}

type Drain = Option<JoinHandle<std::io::Result<Vec<u8>>>>;

fn spawn_drain<R: Read + Send + 'static>(pipe: Option<R>) -> Drain {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn join_drain(drain: Drain) -> StoryreelResult<Vec<u8>> {
    let Some(handle) = drain else {
        return Ok(Vec::new());
    };
    handle
        .join()
        .map_err(|_| StoryreelError::tool("pipe", "drain thread panicked", ""))?
        .map_err(|e| StoryreelError::tool("pipe", "read failed", e.to_string()))
}

/// Last `max_chars` characters of `s`, trimmed.
pub(crate) fn tail_chars(s: &str, max_chars: usize) -> String {
    let count = s.chars().count();
    let skip = count.saturating_sub(max_chars);
    s.chars().skip(skip).collect::<String>().trim().to_owned()
}

#[cfg(test)]
#[path = "../../tests/unit/tool/runner.rs"]
mod tests;
