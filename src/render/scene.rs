use std::path::Path;

use crate::config::RenderConfig;
use crate::episode::fades::SceneFades;
use crate::episode::model::{Scene, SceneKind};
use crate::foundation::core::fmt_num;
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::probe::MediaProbe;
use crate::render::filter::FilterGraph;
use crate::timing::{self, ZoomPlan};
use crate::tool::cancel::CancellationToken;
use crate::tool::command::{FfmpegCommand, FfmpegInput};
use crate::tool::run_ffmpeg;
use crate::tool::runner::ToolRunner;

/// How the visual is fitted to the narration length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SceneMotion {
    /// Still image held for the narration with a slow centred zoom.
    KenBurns(ZoomPlan),
    /// Source video time-stretched by `factor`.
    Stretch { video_duration: f64, factor: f64 },
}

/// Probed and derived numbers for one scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneTiming {
    /// Narration length; the clip is exactly this long.
    pub audio_duration: f64,
    pub fade_length: f64,
    pub motion: SceneMotion,
}

/// Everything needed to render one scene clip.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenePlan {
    pub index: usize,
    pub timing: SceneTiming,
    pub fades: SceneFades,
    pub command: FfmpegCommand,
}

/// Renders one scene into a clip whose length matches its narration.
pub struct SceneRenderer<'a> {
    config: &'a RenderConfig,
    probe: &'a dyn MediaProbe,
}

impl<'a> SceneRenderer<'a> {
    pub fn new(config: &'a RenderConfig, probe: &'a dyn MediaProbe) -> Self {
        Self { config, probe }
    }

    /// Check the scene's files, probe durations and build the encode command.
    ///
    /// Missing files are reported before any probe runs.
    pub fn plan(
        &self,
        index: usize,
        scene: &Scene,
        fades: SceneFades,
        output: &Path,
    ) -> StoryreelResult<ScenePlan> {
        scene.check_assets()?;
        let timing = self.timing(scene)?;
        let command = self.command(scene, &timing, fades, output);
        Ok(ScenePlan {
            index,
            timing,
            fades,
            command,
        })
    }

    pub fn timing(&self, scene: &Scene) -> StoryreelResult<SceneTiming> {
        let audio_duration = self.probe.duration(&scene.narration)?;
        if audio_duration <= 0.0 {
            return Err(StoryreelError::probe(
                &scene.narration,
                "narration has zero length",
            ));
        }
        let fade_length = timing::scene_fade_length(audio_duration, &self.config.fades);

        let motion = match scene.kind {
            SceneKind::Image => SceneMotion::KenBurns(timing::zoom_plan(
                audio_duration,
                self.config.framerate,
                &self.config.zoom,
            )),
            SceneKind::Video => {
                let video_duration = self.probe.duration(&scene.visual)?;
                let factor = timing::stretch_factor(audio_duration, video_duration)
                    .map_err(|e| StoryreelError::probe(&scene.visual, e.to_string()))?;
                SceneMotion::Stretch {
                    video_duration,
                    factor,
                }
            }
        };

        Ok(SceneTiming {
            audio_duration,
            fade_length,
            motion,
        })
    }

    /// Encode command for a scene with known timing. Pure.
    pub fn command(
        &self,
        scene: &Scene,
        timing: &SceneTiming,
        fades: SceneFades,
        output: &Path,
    ) -> FfmpegCommand {
        let cfg = self.config;
        let res = cfg.resolution;
        let fps = cfg.framerate;

        let mut filters = match timing.motion {
            SceneMotion::KenBurns(zoom) => {
                // Zoom at an upscaled size so the per-frame crop does not jitter.
                let big = res.scaled(cfg.zoom.upscale_factor);
                vec![
                    format!("scale={}", big.scale_arg()),
                    format!(
                        "zoompan=z='min(zoom+{},{})':x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':d={}:s={}:fps={fps}",
                        fmt_num(zoom.increment),
                        fmt_num(zoom.target),
                        zoom.frame_count,
                        big.size_arg(),
                    ),
                    format!("scale={}", res.scale_arg()),
                ]
            }
            SceneMotion::Stretch { factor, .. } => vec![
                format!("setpts={}*PTS", fmt_num(factor)),
                format!("scale={}", res.scale_arg()),
                format!("fps={fps}"),
            ],
        };

        let d = timing.audio_duration;
        let f = timing.fade_length;
        if fades.fade_in && f > 0.0 {
            filters.push(format!("fade=t=in:st=0:d={}", fmt_num(f)));
        }
        if fades.fade_out && f > 0.0 {
            let w = timing::fade_out_window(d, f);
            filters.push(format!(
                "fade=t=out:st={}:d={}",
                fmt_num(w.start),
                fmt_num(w.duration)
            ));
        }
        filters.push("setsar=1".to_owned());
        filters.push(format!("format={}", cfg.encoding.pixel_format));

        let mut graph = FilterGraph::new();
        graph.chain(["0:v"], filters, ["v"]);

        let enc = &cfg.encoding;
        let mut cmd = FfmpegCommand::new(output)
            .input(FfmpegInput::new(&scene.visual))
            .input(FfmpegInput::new(&scene.narration))
            .filter_complex(graph.render())
            .map("[v]")
            .map("1:a")
            .opt("c:v", &enc.video_codec);
        if scene.kind == SceneKind::Image {
            cmd = cmd.opt("tune", "stillimage");
        }
        cmd.opt("pix_fmt", &enc.pixel_format)
            .opt("r", fps.to_string())
            .opt("c:a", &enc.audio_codec)
            .opt("b:a", &enc.audio_bitrate)
            .opt("ac", enc.audio_channels.to_string())
            .opt("ar", enc.sample_rate.to_string())
            .opt("t", fmt_num(d))
    }

    #[tracing::instrument(skip_all, fields(scene = plan.index))]
    pub fn render(
        &self,
        plan: &ScenePlan,
        runner: &dyn ToolRunner,
        cancel: &CancellationToken,
    ) -> StoryreelResult<()> {
        tracing::info!(
            duration = plan.timing.audio_duration,
            fade_in = plan.fades.fade_in,
            fade_out = plan.fades.fade_out,
            "rendering scene"
        );
        run_ffmpeg(runner, &self.config.tools.ffmpeg, &plan.command, cancel)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/scene.rs"]
mod tests;
