//! Episode document model and derived per-scene data.

/// Fade flags derived from the scene order.
pub mod fades;
/// JSON document types and their validated counterparts.
pub mod model;
