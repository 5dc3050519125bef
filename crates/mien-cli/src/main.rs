use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mien_core::{CatalogKind, DeltaCatalog, EmotionClassifier, EmotionLabel};
use mien_models::{ModelFile, ModelRole};
use tracing_subscriber::EnvFilter;

mod config;
#[cfg_attr(not(feature = "opencv"), allow(dead_code))]
mod engine;
mod replay;

use config::Config;

#[derive(Parser)]
#[command(name = "mien", version, about = "Frame-to-frame facial expression classifier")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify expressions live from a webcam.
    Run(RunArgs),
    /// Classify a recorded JSON-lines landmark stream.
    Replay(ReplayArgs),
    /// Print the landmark pair catalog.
    Catalog {
        /// Catalog to print (reference or corrected).
        #[arg(long)]
        catalog: Option<CatalogKind>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Face detector model (Haar cascade XML).
    detector_model: PathBuf,
    /// Landmark model (LBF YAML).
    landmark_model: PathBuf,
    /// Webcam index.
    #[arg(long)]
    camera: Option<i32>,
    /// Landmark pair catalog (reference or corrected).
    #[arg(long)]
    catalog: Option<CatalogKind>,
    /// Log labels instead of opening a window.
    #[arg(long)]
    headless: bool,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
    /// Reuse the previous iteration's landmarks instead of re-fitting.
    #[arg(long)]
    reuse_previous_landmarks: bool,
}

#[derive(Args)]
struct ReplayArgs {
    /// JSON-lines file, one `{"landmarks": [[x, y], ...] | null}` per frame.
    file: PathBuf,
    /// Landmark pair catalog (reference or corrected).
    #[arg(long)]
    catalog: Option<CatalogKind>,
    /// Emit one JSON object per frame instead of plain labels.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Command::Run(args) => run(config, args),
        Command::Replay(args) => replay(config, args),
        Command::Catalog { catalog } => print_catalog(catalog.unwrap_or(config.catalog)),
    }
}

fn run(mut config: Config, args: RunArgs) -> Result<()> {
    if let Some(camera) = args.camera {
        config.camera_index = camera;
    }
    if let Some(catalog) = args.catalog {
        config.catalog = catalog;
    }
    if args.max_frames.is_some() {
        config.max_frames = args.max_frames;
    }
    config.headless |= args.headless;
    config.reuse_previous_landmarks |= args.reuse_previous_landmarks;

    mien_models::verify_models(&[
        ModelFile::new(ModelRole::Detector, &args.detector_model)
            .pinned(config.detector_sha256.clone()),
        ModelFile::new(ModelRole::Landmarks, &args.landmark_model)
            .pinned(config.landmark_sha256.clone()),
    ])
    .context("model check failed")?;

    let classifier = EmotionClassifier::new(DeltaCatalog::from_kind(config.catalog))?;
    tracing::info!(
        catalog = %config.catalog,
        camera = config.camera_index,
        headless = config.headless,
        reuse_previous_landmarks = config.reuse_previous_landmarks,
        "mien starting"
    );

    let options = engine::LoopOptions {
        reuse_previous_landmarks: config.reuse_previous_landmarks,
        max_frames: config.max_frames,
    };
    let summary = live::run(&config, &args, classifier, options)?;

    tracing::info!(frames = summary.frames, exit = ?summary.exit, "session finished");
    for label in EmotionLabel::ALL {
        let count = summary.count(label);
        if count > 0 {
            tracing::info!(%label, count, "label total");
        }
    }
    Ok(())
}

#[cfg(feature = "opencv")]
mod live {
    use anyhow::{Context, Result};
    use mien_core::EmotionClassifier;
    use mien_hw::opencv_backend::{CameraSource, CascadeDetector, LbfFitter, WindowSink};
    use mien_hw::{FrameSink, LogSink};

    use crate::config::Config;
    use crate::engine::{FrameLoop, LoopOptions, LoopSummary};
    use crate::RunArgs;

    const WINDOW_NAME: &str = "Facial Landmark Detection";

    pub fn run(
        config: &Config,
        args: &RunArgs,
        classifier: EmotionClassifier,
        options: LoopOptions,
    ) -> Result<LoopSummary> {
        let detector = CascadeDetector::load(&args.detector_model.to_string_lossy())?;
        let fitter = LbfFitter::load(&args.landmark_model.to_string_lossy())?;
        let source = CameraSource::open(config.camera_index)?;

        let sink: Box<dyn FrameSink> = if config.headless {
            Box::new(LogSink::new())
        } else {
            Box::new(WindowSink::open(WINDOW_NAME)?)
        };

        let mut frame_loop = FrameLoop::new(source, detector, fitter, sink, classifier, options);
        frame_loop.run().context("frame loop failed")
    }
}

#[cfg(not(feature = "opencv"))]
mod live {
    use anyhow::Result;
    use mien_core::EmotionClassifier;
    use mien_hw::HwError;

    use crate::config::Config;
    use crate::engine::{LoopOptions, LoopSummary};
    use crate::RunArgs;

    pub fn run(
        _config: &Config,
        _args: &RunArgs,
        _classifier: EmotionClassifier,
        _options: LoopOptions,
    ) -> Result<LoopSummary> {
        Err(HwError::Unsupported("live camera capture").into())
    }
}

fn replay(config: Config, args: ReplayArgs) -> Result<()> {
    let catalog = args.catalog.unwrap_or(config.catalog);
    let classifier = EmotionClassifier::new(DeltaCatalog::from_kind(catalog))?;

    let file = File::open(&args.file)
        .with_context(|| format!("failed to open {}", args.file.display()))?;
    let stdout = io::stdout();
    let summary = replay::replay(&classifier, BufReader::new(file), stdout.lock(), args.json)?;

    tracing::info!(frames = summary.frames, %catalog, "replay finished");
    for label in EmotionLabel::ALL {
        if let Some(count) = summary.labels.get(&label) {
            tracing::debug!(%label, count, "label total");
        }
    }
    Ok(())
}

fn print_catalog(kind: CatalogKind) -> Result<()> {
    let catalog = DeltaCatalog::from_kind(kind);
    let mut out = io::stdout().lock();
    writeln!(out, "# {kind} catalog, {} pairs", catalog.pairs().len())?;
    for pair in catalog.pairs() {
        let (ca, cb) = pair.current;
        let (pa, pb) = pair.previous;
        let marker = if pair.is_symmetric() && pair.key == format!("{ca}to{cb}") {
            ""
        } else {
            "  *"
        };
        writeln!(
            out,
            "{:<5} {:<7} current ({ca:>2},{cb:>2})  previous ({pa:>2},{pb:>2}){marker}",
            pair.group, pair.key
        )?;
    }
    Ok(())
}
