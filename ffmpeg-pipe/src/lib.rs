//! Single-stream video playback pipeline.
//!
//! Data flow:
//! ```text
//!  AvInput ──packets──► VideoDecoder ──frames──► Scaler ──► FrameSurface ──► Presenter
//!  └──────────────── decode worker thread ────────────────┘   (shared)     render loop
//! ```
//!
//! The decode worker and the render loop are the only two threads. They share
//! the [`surface::FrameSurface`] (behind one mutex) and the
//! [`state::PipelineState`] stop flag, nothing else.

pub mod decoder;
pub mod error;
pub mod frame;
pub mod input;
pub mod layout;
pub mod packet;
pub mod render;
pub mod scaler;
pub mod state;
pub mod stream;
pub mod surface;
pub mod worker;

#[cfg(test)]
mod testing;

pub use error::PipelineError;

/// Registers FFmpeg components. Call once at startup, before opening any input.
///
/// FFmpeg's own logging is lowered to errors unless `verbose` is set.
pub fn init(verbose: bool) -> Result<(), PipelineError> {
    ffmpeg_next::init().map_err(PipelineError::Init)?;
    let level = if verbose {
        ffmpeg_next::util::log::Level::Info
    } else {
        ffmpeg_next::util::log::Level::Error
    };
    ffmpeg_next::util::log::set_level(level);
    Ok(())
}
