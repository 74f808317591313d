use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use storyreel::{
    CancellationToken, Episode, FfprobeProbe, Pipeline, PipelineEvent, PipelineObserver,
    RenderConfig, RunLayout, SystemRunner, ToolRunner,
};

#[derive(Parser, Debug)]
#[command(name = "storyreel", version)]
struct Cli {
    /// Episode JSON document.
    episode_file: PathBuf,

    /// Output video path (default: episode path with the container extension).
    output_file: Option<PathBuf>,

    /// Directory for intermediate files (default: `generated-<episode name>`).
    temp_directory: Option<PathBuf>,

    /// Render config JSON; absent fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum number of scenes rendered at once.
    #[arg(long)]
    threads: Option<usize>,

    /// Background music gain.
    #[arg(long)]
    music_volume: Option<f64>,

    /// Abort the run after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print the ffmpeg commands instead of running them.
    #[arg(long)]
    dry_run: bool,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Prints scene progress to stdout.
struct ProgressPrinter;

impl PipelineObserver for ProgressPrinter {
    fn on_event(&self, event: &PipelineEvent) {
        if let PipelineEvent::SceneStarted { index } = event {
            println!("Rendering scene #{index}");
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<RenderConfig> {
    let mut config = match &cli.config {
        Some(path) => RenderConfig::from_path(path)
            .with_context(|| format!("load render config '{}'", path.display()))?,
        None => RenderConfig::default(),
    };
    if let Some(n) = cli.threads {
        config.max_parallel_scenes = Some(n);
    }
    if let Some(v) = cli.music_volume {
        config.background_volume = v;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let episode = Episode::from_path(&cli.episode_file)
        .with_context(|| format!("load episode '{}'", cli.episode_file.display()))?;
    let layout = RunLayout::for_episode(
        &cli.episode_file,
        cli.output_file.clone(),
        cli.temp_directory.clone(),
        &config.encoding.container_ext,
    )?;

    let cancel = match cli.timeout_secs {
        Some(secs) => CancellationToken::with_timeout(Duration::from_secs(secs)),
        None => CancellationToken::new(),
    };
    let runner: Arc<dyn ToolRunner> = Arc::new(SystemRunner::default());
    let probe = FfprobeProbe::new(runner.clone(), &config.tools.ffprobe).with_cancel(cancel.clone());
    let observer = ProgressPrinter;
    let pipeline =
        Pipeline::new(&config, &probe, runner.as_ref(), cancel).with_observer(&observer);

    if cli.dry_run {
        let plan = pipeline.plan(&episode, &layout)?;
        for payload in &plan.overlays.payloads {
            println!("# {} <- {:?}", payload.path.display(), payload.text);
        }
        for inv in plan.invocations(&config.tools.ffmpeg) {
            println!("{}", inv.display_line());
        }
        return Ok(());
    }

    let report = pipeline.run(&episode, &layout)?;
    eprintln!(
        "wrote {} ({:.2}s, {} scenes)",
        report.output.display(),
        report.total_duration,
        report.scene_clips.len()
    );
    Ok(())
}
