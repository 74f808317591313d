//! Staged episode rendering.
//!
//! A run moves through `Init → SceneRender → Concatenate → ComposeOverlays → Mix → Done`.
//! Any error moves it to `Aborted` and is returned wrapped with the stage it happened in.
//! Nothing is retried and intermediate files are left in the work directory for inspection.

use std::path::{Path, PathBuf};

use anyhow::Context;
use rayon::prelude::*;

use crate::config::RenderConfig;
use crate::episode::fades::{SceneFades, derive_scene_fades};
use crate::episode::model::{Episode, Scene};
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::probe::MediaProbe;
use crate::render::concat::Concatenator;
use crate::render::mix::AudioMixer;
use crate::render::overlay::{OverlayPlan, TextOverlayComposer, payload_file_name};
use crate::render::scene::{ScenePlan, SceneRenderer};
use crate::tool::cancel::CancellationToken;
use crate::tool::command::{FfmpegCommand, Invocation};
use crate::tool::runner::ToolRunner;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Init,
    SceneRender,
    Concatenate,
    ComposeOverlays,
    Mix,
    Done,
    Aborted,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::SceneRender => "scene render",
            Self::Concatenate => "concatenate",
            Self::ComposeOverlays => "compose overlays",
            Self::Mix => "mix",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

/// Where one run reads and writes its files.
///
/// The work directory belongs to a single run; concurrent runs need distinct directories.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunLayout {
    pub work_dir: PathBuf,
    pub output: PathBuf,
    ext: String,
}

impl RunLayout {
    pub fn new(work_dir: impl Into<PathBuf>, output: impl Into<PathBuf>, ext: &str) -> Self {
        Self {
            work_dir: work_dir.into(),
            output: output.into(),
            ext: ext.to_owned(),
        }
    }

    /// Defaults: output next to the episode with extension `ext`, work directory
    /// `generated-<episode stem>` relative to the current directory.
    ///
    /// ffmpeg picks the muxer from the output's extension, so an output without one is rejected.
    pub fn for_episode(
        episode_path: &Path,
        output: Option<PathBuf>,
        work_dir: Option<PathBuf>,
        ext: &str,
    ) -> StoryreelResult<Self> {
        let stem = episode_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "episode".to_owned());
        let output = output.unwrap_or_else(|| episode_path.with_extension(ext));
        if output.extension().is_none_or(|e| e.is_empty()) {
            return Err(StoryreelError::validation(format!(
                "output file '{}' has no extension to pick a container from",
                output.display()
            )));
        }
        let work_dir = work_dir.unwrap_or_else(|| PathBuf::from(format!("generated-{stem}")));
        Ok(Self::new(work_dir, output, ext))
    }

    pub fn scene_clip(&self, index: usize) -> PathBuf {
        self.work_dir.join(format!("scene{index}.{}", self.ext))
    }

    pub fn combined(&self) -> PathBuf {
        self.work_dir.join(format!("combined.{}", self.ext))
    }

    pub fn overlay_payload(&self, index: usize) -> PathBuf {
        self.work_dir.join(payload_file_name(index))
    }

    /// Create the work directory and the output's parent directory. Existing ones are fine.
    pub fn ensure_dirs(&self) -> StoryreelResult<()> {
        std::fs::create_dir_all(&self.work_dir)
            .with_context(|| format!("create work directory '{}'", self.work_dir.display()))?;
        if let Some(parent) = self.output.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output directory '{}'", parent.display()))?;
        }
        Ok(())
    }
}

/// Progress notifications. Scene events arrive from worker threads.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    StageStarted(Stage),
    SceneStarted { index: usize },
    SceneRendered { index: usize, clip: PathBuf },
    Finished { output: PathBuf, total_duration: f64 },
}

pub trait PipelineObserver: Sync {
    fn on_event(&self, event: &PipelineEvent);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn on_event(&self, _event: &PipelineEvent) {}
}

static NOOP_OBSERVER: NoopObserver = NoopObserver;

/// Outcome of a successful run.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderReport {
    pub output: PathBuf,
    pub scene_clips: Vec<PathBuf>,
    pub combined: PathBuf,
    /// Probed length of the combined track, which is also the output length.
    pub total_duration: f64,
    pub overlay_count: usize,
    /// Stages entered, in order.
    pub stages: Vec<Stage>,
}

/// Every command a run would execute, built without running any tool.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodePlan {
    pub scenes: Vec<ScenePlan>,
    pub concat: FfmpegCommand,
    pub overlays: OverlayPlan,
    pub mix: FfmpegCommand,
    /// Sum of narration lengths; stands in for the probed combined length.
    pub predicted_duration: f64,
}

impl EpisodePlan {
    /// Invocations in execution order.
    pub fn invocations(&self, ffmpeg: &Path) -> Vec<Invocation> {
        self.scenes
            .iter()
            .map(|s| &s.command)
            .chain([&self.concat, &self.mix])
            .map(|c| c.invocation(ffmpeg))
            .collect()
    }
}

struct Progress<'o> {
    current: Stage,
    visited: Vec<Stage>,
    observer: &'o dyn PipelineObserver,
}

impl<'o> Progress<'o> {
    fn new(observer: &'o dyn PipelineObserver) -> Self {
        Self {
            current: Stage::Init,
            visited: Vec::new(),
            observer,
        }
    }

    fn enter(&mut self, stage: Stage, cancel: &CancellationToken) -> StoryreelResult<()> {
        self.record(stage);
        cancel.checkpoint(stage.label())
    }

    fn record(&mut self, stage: Stage) {
        self.current = stage;
        self.visited.push(stage);
        tracing::info!(stage = stage.label(), "stage started");
        self.observer.on_event(&PipelineEvent::StageStarted(stage));
    }
}

/// Sequences the renderers for one episode.
pub struct Pipeline<'a> {
    config: &'a RenderConfig,
    probe: &'a dyn MediaProbe,
    runner: &'a dyn ToolRunner,
    cancel: CancellationToken,
    observer: &'a dyn PipelineObserver,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a RenderConfig,
        probe: &'a dyn MediaProbe,
        runner: &'a dyn ToolRunner,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            probe,
            runner,
            cancel,
            observer: &NOOP_OBSERVER,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn PipelineObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Build every command without running any tool or writing any file.
    ///
    /// Durations are still probed. Two plans of unchanged inputs compare equal.
    pub fn plan(&self, episode: &Episode, layout: &RunLayout) -> StoryreelResult<EpisodePlan> {
        self.config.validate()?;
        episode.check_assets()?;
        let fades = derive_scene_fades(episode.scenes(), self.config.fades.final_scene_fade_out);

        let renderer = SceneRenderer::new(self.config, self.probe);
        let scenes = episode
            .scenes()
            .iter()
            .zip(&fades)
            .enumerate()
            .map(|(i, (scene, &f))| {
                renderer
                    .plan(i, scene, f, &layout.scene_clip(i))
                    .map_err(|e| e.in_scene(i))
            })
            .collect::<StoryreelResult<Vec<_>>>()?;

        let clips: Vec<PathBuf> = (0..scenes.len()).map(|i| layout.scene_clip(i)).collect();
        let concat = Concatenator::new(self.config).plan(&clips, &layout.combined())?;
        let overlays =
            TextOverlayComposer::new(&self.config.overlay).plan(episode.overlays(), &layout.work_dir);
        let predicted_duration = scenes.iter().map(|s| s.timing.audio_duration).sum();
        let mix = AudioMixer::new(self.config, self.probe).plan(
            &layout.combined(),
            &episode.music().path,
            overlays.filter.as_deref(),
            predicted_duration,
            &layout.output,
        );

        Ok(EpisodePlan {
            scenes,
            concat,
            overlays,
            mix,
            predicted_duration,
        })
    }

    /// Render `episode` into `layout.output`.
    pub fn run(&self, episode: &Episode, layout: &RunLayout) -> StoryreelResult<RenderReport> {
        let mut progress = Progress::new(self.observer);
        match self.execute(episode, layout, &mut progress) {
            Ok(report) => Ok(report),
            Err(err) => {
                let failed = progress.current;
                tracing::error!(stage = failed.label(), error = %err, "pipeline aborted");
                progress.record(Stage::Aborted);
                Err(err.in_stage(failed.label()))
            }
        }
    }

    fn execute(
        &self,
        episode: &Episode,
        layout: &RunLayout,
        progress: &mut Progress<'_>,
    ) -> StoryreelResult<RenderReport> {
        progress.enter(Stage::Init, &self.cancel)?;
        self.config.validate()?;
        // All referenced files are checked before the first tool runs.
        episode.check_assets()?;
        layout.ensure_dirs()?;
        let fades = derive_scene_fades(episode.scenes(), self.config.fades.final_scene_fade_out);

        progress.enter(Stage::SceneRender, &self.cancel)?;
        let scene_clips = self.render_scenes(episode.scenes(), &fades, layout)?;

        progress.enter(Stage::Concatenate, &self.cancel)?;
        let combined = layout.combined();
        Concatenator::new(self.config).concatenate(
            &scene_clips,
            &combined,
            self.runner,
            &self.cancel,
        )?;

        let overlay_filter = if episode.overlays().is_empty() {
            None
        } else {
            progress.enter(Stage::ComposeOverlays, &self.cancel)?;
            TextOverlayComposer::new(&self.config.overlay)
                .compose(episode.overlays(), &layout.work_dir)?
        };

        progress.enter(Stage::Mix, &self.cancel)?;
        let total_duration = AudioMixer::new(self.config, self.probe).mix(
            &combined,
            &episode.music().path,
            overlay_filter.as_deref(),
            &layout.output,
            self.runner,
            &self.cancel,
        )?;

        progress.record(Stage::Done);
        self.observer.on_event(&PipelineEvent::Finished {
            output: layout.output.clone(),
            total_duration,
        });
        Ok(RenderReport {
            output: layout.output.clone(),
            scene_clips,
            combined,
            total_duration,
            overlay_count: episode.overlays().len(),
            stages: progress.visited.clone(),
        })
    }

    /// Render all scenes on a bounded pool. Returns clip paths in scene order.
    ///
    /// The first failure cancels the remaining renders; that failure is reported in preference
    /// to the cancellations it caused.
    fn render_scenes(
        &self,
        scenes: &[Scene],
        fades: &[SceneFades],
        layout: &RunLayout,
    ) -> StoryreelResult<Vec<PathBuf>> {
        let pool = build_thread_pool(self.config.max_parallel_scenes)?;
        let scenes_cancel = self.cancel.child();
        let renderer = SceneRenderer::new(self.config, self.probe);

        let results: Vec<StoryreelResult<PathBuf>> = pool.install(|| {
            scenes
                .par_iter()
                .zip(fades.par_iter())
                .enumerate()
                .map(|(index, (scene, &f))| {
                    let clip = layout.scene_clip(index);
                    self.render_scene(&renderer, index, scene, f, &clip, &scenes_cancel)
                        .map(|()| clip)
                        .map_err(|e| {
                            scenes_cancel.cancel();
                            e.in_scene(index)
                        })
                })
                .collect()
        });

        let mut clips = Vec::with_capacity(results.len());
        let mut cancelled = None;
        for r in results {
            match r {
                Ok(clip) => clips.push(clip),
                Err(e) if e.is_cancelled() => {
                    cancelled.get_or_insert(e);
                }
                Err(e) => return Err(e),
            }
        }
        match cancelled {
            Some(e) => Err(e),
            None => Ok(clips),
        }
    }

    fn render_scene(
        &self,
        renderer: &SceneRenderer<'_>,
        index: usize,
        scene: &Scene,
        fades: SceneFades,
        clip: &Path,
        cancel: &CancellationToken,
    ) -> StoryreelResult<()> {
        cancel.checkpoint("scene render")?;
        self.observer
            .on_event(&PipelineEvent::SceneStarted { index });
        let plan = renderer.plan(index, scene, fades, clip)?;
        renderer.render(&plan, self.runner, cancel)?;
        self.observer.on_event(&PipelineEvent::SceneRendered {
            index,
            clip: clip.to_path_buf(),
        });
        Ok(())
    }
}

fn build_thread_pool(threads: Option<usize>) -> StoryreelResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(StoryreelError::validation(
            "max_parallel_scenes must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| StoryreelError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
