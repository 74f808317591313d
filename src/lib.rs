#![forbid(unsafe_code)]
//! Storyreel renders narrated short-form video episodes with `ffmpeg`.
//!
//! An [`Episode`] (scenes with a visual and a narration track, timed text overlays, and
//! background music) is turned into one video by a staged [`Pipeline`]: every scene becomes a
//! clip as long as its narration, the clips are concatenated, and the result is mixed with
//! looped music while overlays are drawn on top.
//!
//! All graph construction is pure and produces typed [`FfmpegCommand`] values; execution goes
//! through the [`ToolRunner`] and [`MediaProbe`] seams so tests can substitute both.

pub mod config;
pub mod episode;
pub mod foundation;
pub mod pipeline;
pub mod probe;
pub mod render;
pub mod timing;
pub mod tool;

pub use config::RenderConfig;
pub use episode::fades::{SceneFades, derive_scene_fades};
pub use episode::model::{Episode, Scene, SceneKind, TextOverlay};
pub use foundation::core::{AspectRatio, Resolution};
pub use foundation::error::{StoryreelError, StoryreelResult};
pub use pipeline::{
    EpisodePlan, NoopObserver, Pipeline, PipelineEvent, PipelineObserver, RenderReport,
    RunLayout, Stage,
};
pub use probe::{FfprobeProbe, MediaProbe};
pub use tool::cancel::CancellationToken;
pub use tool::command::{FfmpegCommand, FfmpegInput, Invocation};
pub use tool::runner::{SystemRunner, ToolOutput, ToolRunner};
