use ascii_gif_player::utils::format_duration;
use ascii_gif_player::{
    AnimationPlayer, AnimationSequence, Cli, ConsoleRenderer, DecodedSource, FrameConverter,
    FrameSource, StopSignal,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info};
use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let cli = Cli::parse();

    // Validate CLI arguments
    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        process::exit(1);
    }

    // Set up logging level
    if cli.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }

    info!("Starting ASCII GIF Player v{}", env!("CARGO_PKG_VERSION"));

    // Registered before decoding so an early signal also ends in a clean exit
    let stop = StopSignal::new();
    install_stop_handlers(&stop)?;

    let path = cli.file_path.clone();
    let policy = cli.format_policy();
    let source = run_until_stopped(&stop, move || DecodedSource::open(&path, policy))
        .await?
        .with_context(|| format!("Failed to load '{}'", cli.file_path.display()))?;

    if cli.info_only {
        let (width, height) = source.size();
        println!("Image Information:");
        println!("  File: {}", cli.file_path.display());
        println!("  Dimensions: {}x{}", width, height);
        println!("  Frames: {}", source.frame_count());
        println!("  Cycle Duration: {}", format_duration(source.total_duration()));
        println!("  Frame Durations (ms): {:?}", source.frame_durations());
        return Ok(());
    }

    let converter = FrameConverter::new(cli.conversion_config()?);
    // The decoded frames are dropped with the worker closure once converted
    let sequence = run_until_stopped(&stop, move || {
        AnimationSequence::from_source(&source, &converter)
    })
    .await?
    .context("Failed to convert frames")?;

    let mut renderer = ConsoleRenderer::stdout();
    renderer.init()?;

    let player = AnimationPlayer::new(sequence).with_max_cycles(cli.cycles);
    let result = player.play(&mut renderer, &stop).await;

    // Cleanup
    debug!("Cleaning up and exiting");
    renderer.cleanup()?;

    let summary = result.context("Playback aborted")?;
    debug!("Exit after {:?}", summary);
    Ok(())
}

/// Stop playback on Ctrl+C, and on SIGTERM where available
fn install_stop_handlers(stop: &StopSignal) -> Result<()> {
    let stop = stop.clone();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt()).context("Failed to listen for SIGINT")?;
        let mut terminate = signal(SignalKind::terminate()).context("Failed to listen for SIGTERM")?;
        tokio::spawn(async move {
            tokio::select! {
                _ = interrupt.recv() => info!("Ctrl+C pressed, stopping playback"),
                _ = terminate.recv() => info!("SIGTERM received, stopping playback"),
            }
            stop.stop();
        });
    }

    #[cfg(not(unix))]
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl+C pressed, stopping playback");
                stop.stop();
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    Ok(())
}

/// Run blocking work off the runtime thread, exiting with code 0 if a stop arrives first
async fn run_until_stopped<T, F>(stop: &StopSignal, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);
    tokio::select! {
        biased;
        _ = stop.stopped() => {
            info!("Stopped before playback started");
            // The blocking worker cannot be cancelled, and dropping the runtime would wait on it
            process::exit(0);
        }
        joined = task => joined.context("Worker thread panicked"),
    }
}
