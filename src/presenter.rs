use std::path::{Path, PathBuf};

use ffmpeg_pipe::{
    PipelineError,
    render::{Presenter, PresenterEvent},
    surface::SurfaceSnapshot,
};
use jpeg_encoder::{ColorType, Encoder};
use tokio_util::sync::CancellationToken;

const JPEG_QUALITY: u8 = 85;

/// Headless presenter: quits when `quit` is cancelled and, if a directory is
/// configured, writes every `every`th presented frame there as a JPEG.
pub struct SnapshotPresenter {
    quit: CancellationToken,
    dir: Option<PathBuf>,
    every: u64,
    presented: u64,
    last_sequence: u64,
    last_saved: u64,
}

impl SnapshotPresenter {
    pub fn new(quit: CancellationToken, dir: Option<PathBuf>, every: u64) -> Self {
        Self {
            quit,
            dir,
            every: every.max(1),
            presented: 0,
            last_sequence: 0,
            last_saved: 0,
        }
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    fn save(&mut self, dir: &Path, frame: &SurfaceSnapshot) -> Result<(), PipelineError> {
        let width = u16::try_from(frame.width)
            .map_err(|_| PipelineError::Presentation(format!("{}px too wide for jpeg", frame.width)))?;
        let height = u16::try_from(frame.height).map_err(|_| {
            PipelineError::Presentation(format!("{}px too tall for jpeg", frame.height))
        })?;

        let path = dir.join(format!("frame-{:06}.jpg", frame.sequence));
        let rgb = frame.to_rgb24();
        Encoder::new_file(&path, JPEG_QUALITY)
            .and_then(|encoder| encoder.encode(&rgb, width, height, ColorType::Rgb))
            .map_err(|e| PipelineError::Presentation(format!("{}: {}", path.display(), e)))?;

        log::debug!("saved {}", path.display());
        self.last_saved = frame.sequence;
        Ok(())
    }
}

impl Presenter for SnapshotPresenter {
    fn poll_event(&mut self) -> Option<PresenterEvent> {
        self.quit.is_cancelled().then_some(PresenterEvent::Quit)
    }

    fn present(&mut self, frame: &SurfaceSnapshot) -> Result<(), PipelineError> {
        self.presented += 1;
        if frame.sequence != self.last_sequence {
            log::trace!(
                "present #{}: frame {} ({} skipped)",
                self.presented,
                frame.sequence,
                frame.sequence.saturating_sub(self.last_sequence + 1)
            );
            self.last_sequence = frame.sequence;
        }

        let due = self.presented % self.every == 0;
        let fresh = !frame.is_blank() && frame.sequence != self.last_saved;
        if let Some(dir) = self.dir.clone().filter(|_| due && fresh) {
            self.save(&dir, frame)?;
        }
        Ok(())
    }
}
