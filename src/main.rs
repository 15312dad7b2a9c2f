use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use photophase::config::Configuration;
use photophase::dispatch::render_channel;
use photophase::events::InventoryEvent;
use photophase::renderer::WallpaperRenderer;
use photophase::tasks;
use photophase::world::World;

#[derive(Debug, Parser)]
#[command(
    name = "photophase",
    version,
    about = "tiled photo wallpaper with animated transitions"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Deterministic RNG seed for layouts, transitions and photo order
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info,wgpu_core=warn,wgpu_hal=warn,naga=warn,winit=warn",
        1 => "debug,wgpu_core=warn,wgpu_hal=warn,naga=warn,winit=warn",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        seed,
        verbose,
    } = Args::parse();
    init_tracing(verbose);

    let cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    let seed = seed.or(cfg.seed);
    tracing::info!(
        library = %cfg.photo_library_path.display(),
        interval = %humantime::format_duration(cfg.transitions.interval),
        seed = ?seed,
        "loaded configuration from {}",
        config.display()
    );

    let event_loop = tasks::viewer::build_event_loop()?;
    let (to_render, render_queue) = render_channel();
    let to_render = to_render.with_waker(tasks::viewer::waker(event_loop.create_proxy()));
    let (loader_handle, loader_rx) = tasks::loader::loader_channel();
    let (inv_tx, inv_rx) = mpsc::channel::<InventoryEvent>(128); // Files -> Loader

    let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
    let world = World::new(cfg.world_settings(), rng);
    let renderer = WallpaperRenderer::new(world, loader_handle, cfg.renderer_settings());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    // Files
    tasks.spawn({
        let root = cfg.photo_library_path.clone();
        let cancel = cancel.clone();
        async move {
            tasks::files::run(root, inv_tx, cancel, seed)
                .await
                .context("files task failed")
        }
    });

    // Loader
    tasks.spawn({
        let cancel = cancel.clone();
        let settings = cfg.loader_settings();
        async move {
            tasks::loader::run(loader_rx, inv_rx, to_render, cancel, settings, seed)
                .await
                .context("loader task failed")
        }
    });

    // The viewer owns the main thread until the window closes or cancellation occurs
    if let Err(e) =
        tasks::viewer::run_windowed(event_loop, renderer, render_queue, cancel.clone())
            .context("viewer failed")
    {
        tracing::error!("{e:?}");
    }
    cancel.cancel();

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}
