/// Shared value types (resolution, aspect ratio, number formatting).
pub mod core;
/// Error taxonomy and result alias.
pub mod error;
