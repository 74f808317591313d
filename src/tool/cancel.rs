use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Cheap, cloneable cancellation handle passed down to every tool invocation.
///
/// A token is cancelled when its own flag is set, when any ancestor is cancelled, or when its
/// deadline has passed. Cancelling a child never affects the parent.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    parent: Option<Box<CancellationToken>>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that cancels itself once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            ..Self::default()
        }
    }

    /// Token that observes `self` but can be cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Box::new(self.clone())),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return true;
        }
        self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// `Err(Cancelled)` when the token has fired; `what` names the step that was about to run.
    pub fn checkpoint(&self, what: &str) -> StoryreelResult<()> {
        if self.is_cancelled() {
            return Err(StoryreelError::cancelled(format!("{what} cancelled")));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tool/cancel.rs"]
mod tests;
