//! Filter-graph construction and the per-stage renderers.
//!
//! Each renderer has a pure `plan` step that only builds an [`crate::tool::command::FfmpegCommand`]
//! and a second step that runs it through a [`crate::tool::runner::ToolRunner`].

/// Scene clips joined into the combined track.
pub mod concat;
/// Filter graph builder and value quoting.
pub mod filter;
/// Final audio mix.
pub mod mix;
/// Timed text overlays.
pub mod overlay;
/// Per-scene clip rendering.
pub mod scene;
