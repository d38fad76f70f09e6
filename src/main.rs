use std::process::ExitCode;
use std::thread::JoinHandle;

use anyhow::Context;
use clap::Parser;
use ffmpeg_pipe::{
    PipelineError,
    decoder::VideoDecoder,
    input::AvInput,
    render::{PlaybackReport, Player},
    scaler::Scaler,
    surface::FrameSurface,
    worker::DecodeParts,
};
use tokio_util::sync::CancellationToken;

mod config;
mod presenter;

use config::PlayerConfig;
use presenter::SnapshotPresenter;

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .filter_module("ffmpeg_pipe", level)
        .parse_default_env()
        .init();
}

/// Cancels `quit` on Ctrl-C. The runtime lives on its own thread so the render
/// loop keeps the main thread.
fn spawn_quit_listener(quit: CancellationToken) -> anyhow::Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build signal runtime")?;

    let handle = std::thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                tokio::select! {
                    _ = quit.cancelled() => {}
                    res = tokio::signal::ctrl_c() => {
                        match res {
                            Ok(()) => log::info!("ctrl+c received"),
                            Err(e) => log::warn!("cannot listen for ctrl+c: {}", e),
                        }
                        quit.cancel();
                    }
                }
            });
        })
        .context("spawn signal thread")?;
    Ok(handle)
}

fn play(config: &PlayerConfig) -> anyhow::Result<PlaybackReport> {
    ffmpeg_pipe::init(config.verbose)?;

    let input = AvInput::open(&config.input)?;
    let stream = input.best_video_stream()?;
    let decoder = VideoDecoder::new(&stream)?;
    let scaler = Scaler::for_decoder(&decoder, config.layout)?;
    let surface = FrameSurface::new(decoder.width(), decoder.height(), config.layout);

    if let Some(dir) = &config.snapshot_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create snapshot dir {}", dir.display()))?;
    }

    let quit = CancellationToken::new();
    let signals = spawn_quit_listener(quit.clone())?;
    let presenter = SnapshotPresenter::new(
        quit.clone(),
        config.snapshot_dir.clone(),
        config.snapshot_every,
    );

    let parts = DecodeParts {
        source: input,
        decoder,
        converter: scaler,
    };
    let result = Player::start(
        parts,
        surface,
        presenter,
        config.worker_config(),
        config.render_config(),
    )
    .and_then(Player::run);

    // process-wide subsystems go last
    quit.cancel();
    if signals.join().is_err() {
        log::warn!("signal thread panicked");
    }

    Ok(result?)
}

fn main() -> ExitCode {
    let config = PlayerConfig::parse();
    init_logging(config.verbose);

    match play(&config) {
        Ok(report) if report.is_clean() => {
            log::info!(
                "playback ended ({:?}): {} frames decoded, {} presents",
                report.exit,
                report.worker.stats.frames_published,
                report.presents
            );
            ExitCode::SUCCESS
        }
        Ok(report) => {
            log::error!("playback ended abnormally: {}", report.worker.status);
            ExitCode::FAILURE
        }
        Err(e) => {
            match e.downcast_ref::<PipelineError>() {
                Some(err) if err.is_startup() => log::error!("cannot start playback: {:#}", e),
                _ => log::error!("{:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
