use std::path::{Path, PathBuf};

/// Convenience result type used across storyreel.
pub type StoryreelResult<T> = Result<T, StoryreelError>;

/// Every variant is fatal for the run that produced it; nothing is retried.
#[derive(thiserror::Error, Debug)]
pub enum StoryreelError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("probe error for '{}': {reason}", path.display())]
    Probe {
        path: PathBuf,
        reason: String,
    },

    #[error("unsupported scene type '{kind}' in scene #{index}")]
    UnsupportedSceneType {
        index: usize,
        kind: String,
    },

    #[error("{tool} invocation failed ({reason}): {diagnostics}")]
    ToolInvocation {
        tool: String,
        reason: String,
        diagnostics: String,
    },

    #[error("missing {role} '{}'", path.display())]
    MissingAsset {
        role: &'static str,
        path: PathBuf,
    },

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("scene #{index} failed: {source}")]
    Scene {
        index: usize,
        source: Box<StoryreelError>,
    },

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: &'static str,
        source: Box<StoryreelError>,
    },

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoryreelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn probe(path: &Path, reason: impl Into<String>) -> Self {
        Self::Probe {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn tool(
        tool: impl Into<String>,
        reason: impl Into<String>,
        diagnostics: impl Into<String>,
    ) -> Self {
        Self::ToolInvocation {
            tool: tool.into(),
            reason: reason.into(),
            diagnostics: diagnostics.into(),
        }
    }

    pub fn missing_asset(role: &'static str, path: &Path) -> Self {
        Self::MissingAsset {
            role,
            path: path.to_path_buf(),
        }
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Attribute this error to scene `index`.
    pub fn in_scene(self, index: usize) -> Self {
        Self::Scene {
            index,
            source: Box::new(self),
        }
    }

    /// Attribute this error to pipeline stage `stage`.
    pub fn in_stage(self, stage: &'static str) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// Innermost error beneath any scene/stage wrappers.
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Scene { source, .. } | Self::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// `true` when the root cause is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), Self::Cancelled(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
