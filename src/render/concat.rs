use std::path::{Path, PathBuf};

use crate::config::RenderConfig;
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::render::filter::FilterGraph;
use crate::tool::cancel::CancellationToken;
use crate::tool::command::{FfmpegCommand, FfmpegInput};
use crate::tool::run_ffmpeg;
use crate::tool::runner::ToolRunner;

/// Joins rendered scene clips, in order, into the combined narration track.
pub struct Concatenator<'a> {
    config: &'a RenderConfig,
}

impl<'a> Concatenator<'a> {
    pub fn new(config: &'a RenderConfig) -> Self {
        Self { config }
    }

    /// Build the concat command. Every clip is rescaled and forced to the display aspect so
    /// that mismatched sources cannot break the concat filter.
    pub fn plan(&self, clips: &[PathBuf], output: &Path) -> StoryreelResult<FfmpegCommand> {
        if clips.is_empty() {
            return Err(StoryreelError::validation(
                "nothing to concatenate: no scene clips were rendered",
            ));
        }
        let cfg = self.config;
        let enc = &cfg.encoding;

        let mut graph = FilterGraph::new();
        let mut pairs = Vec::with_capacity(clips.len() * 2);
        for i in 0..clips.len() {
            graph.chain(
                [format!("{i}:v")],
                vec![
                    format!("scale={}", cfg.resolution.scale_arg()),
                    format!("setdar={}", cfg.display_aspect.filter_arg()),
                ],
                [format!("v{i}")],
            );
            graph.chain(
                [format!("{i}:a")],
                vec![format!(
                    "aformat=sample_rates={}:channel_layouts={}",
                    enc.sample_rate,
                    channel_layout(enc.audio_channels)
                )],
                [format!("a{i}")],
            );
            pairs.push(format!("v{i}"));
            pairs.push(format!("a{i}"));
        }
        graph.chain(
            pairs,
            vec![format!("concat=n={}:v=1:a=1", clips.len())],
            ["outv", "outa"],
        );

        let cmd = clips
            .iter()
            .fold(FfmpegCommand::new(output), |cmd, clip| {
                cmd.input(FfmpegInput::new(clip))
            })
            .filter_complex(graph.render())
            .map("[outv]")
            .map("[outa]")
            .opt("c:v", &enc.video_codec)
            .opt("pix_fmt", &enc.pixel_format)
            .opt("r", cfg.framerate.to_string())
            .opt("c:a", &enc.audio_codec)
            .opt("b:a", &enc.audio_bitrate)
            .opt("ac", enc.audio_channels.to_string())
            .opt("ar", enc.sample_rate.to_string());
        Ok(cmd)
    }

    pub fn concatenate(
        &self,
        clips: &[PathBuf],
        output: &Path,
        runner: &dyn ToolRunner,
        cancel: &CancellationToken,
    ) -> StoryreelResult<()> {
        let cmd = self.plan(clips, output)?;
        tracing::info!(clips = clips.len(), output = %output.display(), "concatenating scenes");
        run_ffmpeg(runner, &self.config.tools.ffmpeg, &cmd, cancel)
    }
}

/// ffmpeg channel layout name for a channel count.
pub(crate) fn channel_layout(channels: u16) -> String {
    match channels {
        1 => "mono".to_owned(),
        2 => "stereo".to_owned(),
        n => format!("{n}c"),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/concat.rs"]
mod tests;
