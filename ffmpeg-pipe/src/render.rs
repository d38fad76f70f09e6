use std::{sync::Arc, time::Duration};

use crate::{
    decoder::FrameDecoder,
    error::PipelineError,
    input::PacketSource,
    scaler::FrameConverter,
    state::PipelineState,
    surface::{FrameSurface, SurfaceSnapshot},
    worker::{DecodeParts, DecodeWorker, WorkerConfig, WorkerReport},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenterEvent {
    Quit,
    Key(char),
}

/// The display side: shows surface contents and reports user input.
pub trait Presenter {
    /// Non-blocking; `None` when no input is pending.
    fn poll_event(&mut self) -> Option<PresenterEvent>;

    /// Shows one copy of the surface. The surface is not locked during the call,
    /// so the decode worker keeps publishing however long this takes.
    fn present(&mut self, frame: &SurfaceSnapshot) -> Result<(), PipelineError>;
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Fixed sleep between presents.
    pub frame_delay: Duration,
    /// Leave the loop once the worker has published the whole stream.
    /// When false the last frame stays up until quit is requested.
    pub exit_when_finished: bool,
    pub max_presents: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            frame_delay: Duration::from_millis(30),
            exit_when_finished: true,
            max_presents: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderExit {
    QuitRequested,
    StreamFinished,
    WorkerStopped,
    PresentLimit,
}

#[derive(Debug)]
pub struct PlaybackReport {
    pub exit: RenderExit,
    pub presents: u64,
    pub worker: WorkerReport,
}

impl PlaybackReport {
    /// False when the decode worker terminated abnormally.
    pub fn is_clean(&self) -> bool {
        !self.worker.status.is_abnormal()
    }
}

/// Owns every pipeline resource: presenter, surface, and the decode worker
/// (which in turn owns source, decoder and converter).
pub struct Player<P, S, D, C> {
    presenter: P,
    surface: Arc<FrameSurface>,
    state: Arc<PipelineState>,
    worker: DecodeWorker<S, D, C>,
    config: RenderConfig,
}

impl<P, S, D, C> Player<P, S, D, C>
where
    P: Presenter,
    S: PacketSource + Send + 'static,
    D: FrameDecoder<Packet = S::Packet> + Send + 'static,
    C: FrameConverter<D::Frame> + Send + 'static,
{
    /// Starts the decode worker. Everything passed in must already be fully initialised.
    pub fn start(
        parts: DecodeParts<S, D, C>,
        surface: FrameSurface,
        presenter: P,
        worker_config: WorkerConfig,
        config: RenderConfig,
    ) -> Result<Self, PipelineError> {
        let surface = Arc::new(surface);
        let state = Arc::new(PipelineState::new());
        let worker = DecodeWorker::spawn(
            parts,
            Arc::clone(&surface),
            Arc::clone(&state),
            worker_config,
        )?;

        Ok(Self {
            presenter,
            surface,
            state,
            worker,
            config,
        })
    }

    pub fn state(&self) -> Arc<PipelineState> {
        Arc::clone(&self.state)
    }

    /// Runs the render loop on the calling thread, then stops and joins the worker.
    ///
    /// Release order on return: presenter, surface, then source/decoder/converter.
    pub fn run(self) -> Result<PlaybackReport, PipelineError> {
        let Self {
            mut presenter,
            surface,
            state,
            worker,
            config,
        } = self;

        let mut presents = 0u64;
        let outcome = render_loop(
            &mut presenter,
            &surface,
            &state,
            || worker.is_finished(),
            &config,
            &mut presents,
        );

        state.request_stop();
        let joined = worker.join();
        log::info!(
            "render loop exited after {} presents ({:?})",
            presents,
            outcome.as_ref().ok()
        );

        drop(presenter);
        drop(surface);
        let (parts, worker_report) = joined?;
        drop(parts);

        let exit = outcome?;
        Ok(PlaybackReport {
            exit,
            presents,
            worker: worker_report,
        })
    }
}

/// `worker_exited` reports whether the decode thread has returned, which also
/// covers a worker that died without marking `state` stopped.
fn render_loop<P: Presenter>(
    presenter: &mut P,
    surface: &FrameSurface,
    state: &PipelineState,
    worker_exited: impl Fn() -> bool,
    config: &RenderConfig,
    presents: &mut u64,
) -> Result<RenderExit, PipelineError> {
    loop {
        match presenter.poll_event() {
            Some(PresenterEvent::Quit) | Some(PresenterEvent::Key('q')) => {
                return Ok(RenderExit::QuitRequested);
            }
            Some(PresenterEvent::Key(_)) | None => {}
        }

        // read before presenting: once stopped, this present shows the final frame.
        // thread exit is read first, a clean worker marks the state before it returns
        let exited = worker_exited();
        let worker_stopped = state.is_stopped();
        if worker_stopped && state.is_aborted() {
            return Ok(RenderExit::WorkerStopped);
        }
        if exited && !worker_stopped {
            log::error!("decode worker exited without stopping");
            return Ok(RenderExit::WorkerStopped);
        }

        let frame = surface.snapshot();
        presenter.present(&frame)?;
        *presents += 1;

        if worker_stopped && config.exit_when_finished {
            return Ok(RenderExit::StreamFinished);
        }
        if config.max_presents.is_some_and(|max| *presents >= max) {
            return Ok(RenderExit::PresentLimit);
        }

        if !config.frame_delay.is_zero() {
            std::thread::sleep(config.frame_delay);
        }
    }
}

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;
