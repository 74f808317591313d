//! Process-wide render settings.
//!
//! A [`RenderConfig`] is built once before a run (defaults, optionally a JSON file, then CLI
//! overrides), validated, and then only ever borrowed immutably by the pipeline stages.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::foundation::core::{AspectRatio, Resolution};
use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Immutable settings threaded through every pipeline component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Target output resolution for every scene and the final file.
    pub resolution: Resolution,
    /// Output frames per second.
    pub framerate: u32,
    /// Display aspect ratio forced during concatenation.
    pub display_aspect: AspectRatio,
    /// Gain applied to the looped background music before mixing.
    pub background_volume: f64,
    /// Scene and music fade lengths.
    pub fades: FadePolicy,
    /// Slow zoom applied to still-image scenes.
    pub zoom: ZoomPolicy,
    /// Look of timed text overlays.
    pub overlay: OverlayStyle,
    /// Codecs and stream layout of every encode.
    pub encoding: EncodingOpts,
    /// External executables.
    pub tools: ToolPaths,
    /// Upper bound on concurrently rendered scenes. `None` uses rayon defaults.
    pub max_parallel_scenes: Option<usize>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::HD,
            framerate: 25,
            display_aspect: AspectRatio::WIDESCREEN,
            background_volume: 0.5,
            fades: FadePolicy::default(),
            zoom: ZoomPolicy::default(),
            overlay: OverlayStyle::default(),
            encoding: EncodingOpts::default(),
            tools: ToolPaths::default(),
            max_parallel_scenes: None,
        }
    }
}

/// Fade lengths for scene transitions and the background-music tail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FadePolicy {
    /// Longest fade applied at either end of a scene, in seconds.
    pub scene_ceiling_sec: f64,
    /// Scene fades never exceed `audio_duration / scene_divisor`.
    pub scene_divisor: f64,
    /// Length of the background-music fade-out that ends at the episode end.
    pub music_fade_out_sec: f64,
    /// Fade the last scene out when the document does not say otherwise.
    pub final_scene_fade_out: bool,
}

impl Default for FadePolicy {
    fn default() -> Self {
        Self {
            scene_ceiling_sec: 0.5,
            scene_divisor: 3.0,
            music_fade_out_sec: 1.0,
            final_scene_fade_out: true,
        }
    }
}

/// "Ken Burns" zoom for still images.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZoomPolicy {
    /// Zoom factor that is never exceeded.
    pub target: f64,
    /// Per-frame zoom increment ceiling.
    pub increment_cap: f64,
    /// Images are zoomed at `resolution * upscale_factor` and then downscaled.
    pub upscale_factor: u32,
}

impl Default for ZoomPolicy {
    fn default() -> Self {
        Self {
            target: 1.2,
            increment_cap: 0.0001,
            upscale_factor: 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlayStyle {
    /// Opacity ramp at each end of an overlay window, in seconds.
    pub ramp_sec: f64,
    pub font_size: u32,
    pub font_color: String,
    pub border_width: u32,
    pub border_color: String,
    /// Distance between the text baseline box and the bottom edge, in pixels.
    pub bottom_margin: u32,
    /// Font file handed to `drawtext`. `None` leaves the choice to ffmpeg/fontconfig.
    pub font_file: Option<PathBuf>,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            ramp_sec: 1.0,
            font_size: 48,
            font_color: "white".to_owned(),
            border_width: 2,
            border_color: "black".to_owned(),
            bottom_margin: 60,
            font_file: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingOpts {
    pub video_codec: String,
    pub pixel_format: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub audio_channels: u16,
    pub sample_rate: u32,
    /// Extension (without dot) of every produced media file.
    pub container_ext: String,
}

impl Default for EncodingOpts {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_owned(),
            pixel_format: "yuv420p".to_owned(),
            audio_codec: "aac".to_owned(),
            audio_bitrate: "192k".to_owned(),
            audio_channels: 2,
            sample_rate: 44_100,
            container_ext: "mp4".to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl RenderConfig {
    /// Parse a (possibly partial) config from a JSON reader. Missing fields keep defaults.
    pub fn from_reader<R: std::io::Read>(r: R) -> StoryreelResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| StoryreelError::serde(format!("parse render config JSON: {e}")))
    }

    /// Parse a config from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> StoryreelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            StoryreelError::validation(format!("open render config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn validate(&self) -> StoryreelResult<()> {
        self.resolution.validate()?;
        if self.framerate == 0 {
            return Err(StoryreelError::validation("framerate must be non-zero"));
        }
        if self.display_aspect.num == 0 || self.display_aspect.den == 0 {
            return Err(StoryreelError::validation(
                "display aspect terms must be non-zero",
            ));
        }
        if !self.background_volume.is_finite() || self.background_volume < 0.0 {
            return Err(StoryreelError::validation(
                "background_volume must be a finite, non-negative multiplier",
            ));
        }

        let f = &self.fades;
        if !(f.scene_ceiling_sec.is_finite() && f.scene_ceiling_sec > 0.0) {
            return Err(StoryreelError::validation(
                "fades.scene_ceiling_sec must be > 0",
            ));
        }
        if !(f.scene_divisor.is_finite() && f.scene_divisor >= 2.0) {
            // Below 2 the in and out fades of one scene could overlap.
            return Err(StoryreelError::validation(
                "fades.scene_divisor must be >= 2",
            ));
        }
        if !(f.music_fade_out_sec.is_finite() && f.music_fade_out_sec > 0.0) {
            return Err(StoryreelError::validation(
                "fades.music_fade_out_sec must be > 0",
            ));
        }

        let z = &self.zoom;
        if !(z.target.is_finite() && z.target >= 1.0) {
            return Err(StoryreelError::validation("zoom.target must be >= 1"));
        }
        if !(z.increment_cap.is_finite() && z.increment_cap > 0.0) {
            return Err(StoryreelError::validation("zoom.increment_cap must be > 0"));
        }
        if z.upscale_factor == 0 {
            return Err(StoryreelError::validation(
                "zoom.upscale_factor must be >= 1",
            ));
        }

        if !(self.overlay.ramp_sec.is_finite() && self.overlay.ramp_sec > 0.0) {
            return Err(StoryreelError::validation("overlay.ramp_sec must be > 0"));
        }
        if self.overlay.font_size == 0 {
            return Err(StoryreelError::validation("overlay.font_size must be > 0"));
        }

        let e = &self.encoding;
        if e.audio_channels == 0 || e.sample_rate == 0 {
            return Err(StoryreelError::validation(
                "encoding audio_channels/sample_rate must be non-zero",
            ));
        }
        if e.container_ext.is_empty() || e.container_ext.contains(['.', '/', '\\']) {
            return Err(StoryreelError::validation(format!(
                "encoding.container_ext '{}' must be a bare extension",
                e.container_ext
            )));
        }

        if let Some(n) = self.max_parallel_scenes
            && n == 0
        {
            return Err(StoryreelError::validation(
                "max_parallel_scenes must be >= 1 when set",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
