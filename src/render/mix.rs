use std::path::Path;

use crate::config::RenderConfig;
use crate::episode::model::require_file;
use crate::foundation::core::fmt_num;
use crate::foundation::error::StoryreelResult;
use crate::probe::MediaProbe;
use crate::render::concat::channel_layout;
use crate::render::filter::FilterGraph;
use crate::timing;
use crate::tool::cancel::CancellationToken;
use crate::tool::command::{FfmpegCommand, FfmpegInput};
use crate::tool::run_ffmpeg;
use crate::tool::runner::ToolRunner;

/// Produces the final file: narration mixed with looped, attenuated music, plus overlays.
pub struct AudioMixer<'a> {
    config: &'a RenderConfig,
    probe: &'a dyn MediaProbe,
}

impl<'a> AudioMixer<'a> {
    pub fn new(config: &'a RenderConfig, probe: &'a dyn MediaProbe) -> Self {
        Self { config, probe }
    }

    /// Final encode command for a combined track of `total` seconds. Pure.
    pub fn plan(
        &self,
        combined: &Path,
        music: &Path,
        overlay_filter: Option<&str>,
        total: f64,
        output: &Path,
    ) -> FfmpegCommand {
        let cfg = self.config;
        let enc = &cfg.encoding;
        let fade = timing::fade_out_window(total, cfg.fades.music_fade_out_sec);

        let mut graph = FilterGraph::new();
        graph.chain(
            ["1:a"],
            vec![
                format!("volume={}", fmt_num(cfg.background_volume)),
                format!(
                    "afade=t=out:st={}:d={}",
                    fmt_num(fade.start),
                    fmt_num(fade.duration)
                ),
            ],
            ["bg"],
        );
        graph.chain(
            ["0:a", "bg"],
            vec![
                "amix=inputs=2:duration=longest:normalize=1".to_owned(),
                format!(
                    "aformat=sample_rates={}:channel_layouts={}",
                    enc.sample_rate,
                    channel_layout(enc.audio_channels)
                ),
            ],
            ["aout"],
        );
        if let Some(chain) = overlay_filter {
            graph.chain(["0:v"], vec![chain.to_owned()], ["vout"]);
        }

        let mut cmd = FfmpegCommand::new(output)
            .input(FfmpegInput::new(combined))
            .input(FfmpegInput::new(music).option("stream_loop", "-1"))
            .filter_complex(graph.render());
        // Overlays force a video re-encode; otherwise the combined video is copied as is.
        cmd = match overlay_filter {
            Some(_) => cmd
                .map("[vout]")
                .opt("c:v", &enc.video_codec)
                .opt("pix_fmt", &enc.pixel_format)
                .opt("r", cfg.framerate.to_string()),
            None => cmd.map("0:v").opt("c:v", "copy"),
        };
        cmd.map("[aout]")
            .opt("c:a", &enc.audio_codec)
            .opt("b:a", &enc.audio_bitrate)
            .opt("ac", enc.audio_channels.to_string())
            .opt("ar", enc.sample_rate.to_string())
            .opt("t", fmt_num(total))
            .flag("shortest")
    }

    /// Probe the combined track, then run the final encode. Returns the episode length.
    pub fn mix(
        &self,
        combined: &Path,
        music: &Path,
        overlay_filter: Option<&str>,
        output: &Path,
        runner: &dyn ToolRunner,
        cancel: &CancellationToken,
    ) -> StoryreelResult<f64> {
        require_file("background music", music)?;
        let total = self.probe.duration(combined)?;
        let cmd = self.plan(combined, music, overlay_filter, total, output);
        tracing::info!(total, output = %output.display(), "mixing final output");
        run_ffmpeg(runner, &self.config.tools.ffmpeg, &cmd, cancel)?;
        Ok(total)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/mix.rs"]
mod tests;
