use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use ffmpeg_pipe::{layout::PixelLayout, render::RenderConfig, worker::WorkerConfig};

/// Plays the best video stream of a media file through the decode/present pipeline.
#[derive(Parser, Debug, Clone)]
#[command(name = "lite-player", version)]
pub struct PlayerConfig {
    /// Media file to open
    pub input: PathBuf,

    /// Pixel layout of the presentation surface
    #[arg(long, default_value_t = PixelLayout::Rgb565)]
    pub layout: PixelLayout,

    /// Sleep after every decoded frame, in milliseconds
    #[arg(long, default_value_t = 30)]
    pub decode_delay_ms: u64,

    /// Sleep between presents, in milliseconds
    #[arg(long, default_value_t = 30)]
    pub render_delay_ms: u64,

    /// Stop after this many presents
    #[arg(long)]
    pub max_presents: Option<u64>,

    /// Keep showing the last frame after the stream ends, until Ctrl-C
    #[arg(long)]
    pub linger: bool,

    /// Write presented frames as JPEG into this directory
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Snapshot every Nth present
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub snapshot_every: u64,

    /// Debug logging, including FFmpeg's own messages
    #[arg(short, long)]
    pub verbose: bool,
}

impl PlayerConfig {
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            frame_delay: Duration::from_millis(self.decode_delay_ms),
        }
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            frame_delay: Duration::from_millis(self.render_delay_ms),
            exit_when_finished: !self.linger,
            max_presents: self.max_presents,
        }
    }
}
