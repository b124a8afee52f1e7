use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use scene_compositor::{
    composition::SceneCompositor,
    config::Config,
    player::{cancel_pair, ExportStage},
    scene::load_scenes,
};

#[derive(Parser)]
#[command(
    name = "scene-compositor",
    version,
    about = "Render narrated image scenes into a single video",
    long_about = "Scene Compositor plays each scene's narration audio and renders its image with an eased pan/zoom and time-synchronized captions, producing one video whose length is exactly the sum of the narration."
)]
struct Cli {
    /// Scene manifest (TOML or JSON) or a directory of NN_name.* assets
    #[arg(short, long)]
    manifest: PathBuf,

    /// Output video file path (defaults to <title>.mp4)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Give up on a scene whose assets take longer than this to load (seconds)
    #[arg(long)]
    asset_timeout: Option<f64>,

    /// Render without caption overlays
    #[arg(long)]
    no_captions: bool,

    /// Render everything but do not write a video file
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG overrides the default level
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("Starting Scene Compositor v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };

    if let Some(timeout) = cli.asset_timeout {
        config.export.asset_timeout_secs = Some(timeout);
    }
    if cli.no_captions {
        config.caption.enabled = false;
    }
    config.validate()?;

    let scenes = load_scenes(&cli.manifest)?;
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.mp4", scenes.title())));

    let (handle, cancel) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling export");
            handle.cancel();
        }
    });

    let compositor = SceneCompositor::new(config).with_progress(|p| {
        if p.stage == ExportStage::Rendering {
            info!(
                "Progress: {}% ({}/{} scenes, {} frames)",
                p.percent(),
                p.scenes_completed,
                p.total_scenes,
                p.frames_rendered
            );
        }
    });

    let result = if cli.dry_run {
        compositor.dry_run(&scenes, cancel).await
    } else {
        compositor.export(&scenes, &output, cancel).await
    };

    match result {
        Ok(report) => {
            match &report.output {
                Some(path) => info!(
                    "Saved {:?}: {:.2}s, {} frames, {:.1} MB",
                    path,
                    report.duration,
                    report.frame_count,
                    report.file_size as f64 / 1024.0 / 1024.0
                ),
                None => info!(
                    "Dry run finished: {:.2}s, {} frames",
                    report.duration, report.frame_count
                ),
            }
            for scene in &report.scenes {
                info!(
                    "   Scene {}: {:.2}s audio, {} frames, {} captions",
                    scene.index + 1,
                    scene.audio_duration,
                    scene.frames,
                    scene.captions
                );
            }
            Ok(())
        }
        Err(e) => {
            error!("Export failed");
            Err(anyhow::anyhow!(e.user_message()))
        }
    }
}
