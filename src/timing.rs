//! Duration-driven timing math shared by the renderers.
//!
//! Everything here is pure: inputs are probed durations and config values, outputs are the
//! numbers that end up in filter expressions.

use crate::config::{FadePolicy, ZoomPolicy};
use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Fade length for one end of a scene.
///
/// Capped at the policy ceiling for long scenes and at `audio_duration / divisor` for short
/// ones, so the in and out fades together never cover more than the whole scene.
pub fn scene_fade_length(audio_duration: f64, policy: &FadePolicy) -> f64 {
    (audio_duration / policy.scene_divisor)
        .min(policy.scene_ceiling_sec)
        .max(0.0)
}

/// Slow zoom-in parameters for a still-image scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomPlan {
    /// Frames emitted for the image (`floor(duration * fps) + 1`).
    pub frame_count: u64,
    /// Per-frame zoom delta.
    pub increment: f64,
    /// Zoom factor the expression clamps to.
    pub target: f64,
}

impl ZoomPlan {
    /// Zoom factor reached on the last frame.
    pub fn final_zoom(&self) -> f64 {
        let steps = self.frame_count.saturating_sub(1) as f64;
        (1.0 + self.increment * steps).min(self.target)
    }
}

pub fn zoom_plan(audio_duration: f64, framerate: u32, policy: &ZoomPolicy) -> ZoomPlan {
    let frame_count = (audio_duration.max(0.0) * f64::from(framerate)).floor() as u64 + 1;
    let increment = (policy.target / frame_count as f64).min(policy.increment_cap);
    ZoomPlan {
        frame_count,
        increment,
        target: policy.target,
    }
}

/// Presentation-timestamp multiplier that maps a source video onto the narration length.
pub fn stretch_factor(audio_duration: f64, video_duration: f64) -> StoryreelResult<f64> {
    if !(video_duration.is_finite() && video_duration > 0.0) {
        return Err(StoryreelError::validation(format!(
            "cannot stretch a video of duration {video_duration}s"
        )));
    }
    Ok(audio_duration / video_duration)
}

/// A fade positioned on a stream's timeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FadeWindow {
    pub start: f64,
    pub duration: f64,
}

impl FadeWindow {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Fade-out of length `fade_len` that ends exactly at `total`.
///
/// Streams shorter than the fade are faded over their whole length.
pub fn fade_out_window(total: f64, fade_len: f64) -> FadeWindow {
    if total > fade_len {
        FadeWindow {
            start: total - fade_len,
            duration: fade_len,
        }
    } else {
        FadeWindow {
            start: 0.0,
            duration: total.max(0.0),
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/timing.rs"]
mod tests;
