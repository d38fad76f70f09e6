use std::{
    fmt::{Display, Formatter},
    sync::Arc,
    thread::JoinHandle,
    time::Duration,
};

use crate::{
    decoder::{FrameDecoder, Submit},
    error::PipelineError,
    input::PacketSource,
    packet::StreamPacket,
    scaler::FrameConverter,
    state::PipelineState,
    surface::FrameSurface,
};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Fixed sleep after every published frame. Not tied to stream timestamps.
    pub frame_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            frame_delay: Duration::from_millis(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStage {
    Idle,
    Reading,
    Decoding,
    Converting,
    Publishing,
    Pacing,
    Draining,
    Stopped,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub packets_read: u64,
    pub packets_skipped: u64,
    pub packets_submitted: u64,
    pub busy_retries: u64,
    pub frames_decoded: u64,
    pub frames_published: u64,
}

#[derive(Debug)]
pub enum WorkerStatus {
    /// End of stream reached and every buffered frame published.
    Finished,
    /// Stop was requested; buffered frames were discarded.
    Cancelled,
    Aborted(PipelineError),
}

impl WorkerStatus {
    pub fn is_abnormal(&self) -> bool {
        matches!(self, WorkerStatus::Aborted(_))
    }
}

impl Display for WorkerStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerStatus::Finished => f.write_str("finished"),
            WorkerStatus::Cancelled => f.write_str("cancelled"),
            WorkerStatus::Aborted(err) => write!(f, "aborted: {}", err),
        }
    }
}

#[derive(Debug)]
pub struct WorkerReport {
    pub status: WorkerStatus,
    pub stats: WorkerStats,
    /// Stage the worker was in when reading ended, before draining.
    pub ended_in: WorkerStage,
    /// Always [`WorkerStage::Stopped`] once the report exists.
    pub stage: WorkerStage,
}

/// What the decode worker owns while it runs; handed back on join so the owner
/// controls the release order.
pub struct DecodeParts<S, D, C> {
    pub source: S,
    pub decoder: D,
    pub converter: C,
}

enum Ending {
    EndOfStream,
    StopRequested,
}

fn transition(stage: &mut WorkerStage, next: WorkerStage) {
    if *stage == next {
        return;
    }
    log::trace!("decode worker: {:?} -> {:?}", stage, next);
    *stage = next;
}

struct DecodeLoop<'a, S, D, C> {
    parts: DecodeParts<S, D, C>,
    surface: &'a FrameSurface,
    state: &'a PipelineState,
    config: &'a WorkerConfig,
    stage: WorkerStage,
    stats: WorkerStats,
}

impl<S, D, C> DecodeLoop<'_, S, D, C>
where
    S: PacketSource,
    D: FrameDecoder<Packet = S::Packet>,
    C: FrameConverter<D::Frame>,
{
    fn run(&mut self) -> (WorkerStatus, WorkerStage) {
        let ending = self.read_loop();
        let ended_in = self.stage;
        let status = match ending {
            Ok(Ending::EndOfStream) => {
                transition(&mut self.stage, WorkerStage::Draining);
                match self.flush_tail() {
                    Ok(()) => WorkerStatus::Finished,
                    Err(err) => {
                        self.parts.decoder.flush();
                        WorkerStatus::Aborted(err)
                    }
                }
            }
            Ok(Ending::StopRequested) => {
                transition(&mut self.stage, WorkerStage::Draining);
                self.parts.decoder.flush();
                WorkerStatus::Cancelled
            }
            Err(err) => {
                transition(&mut self.stage, WorkerStage::Draining);
                self.parts.decoder.flush();
                WorkerStatus::Aborted(err)
            }
        };
        transition(&mut self.stage, WorkerStage::Stopped);
        (status, ended_in)
    }

    fn read_loop(&mut self) -> Result<Ending, PipelineError> {
        loop {
            transition(&mut self.stage, WorkerStage::Reading);
            if self.state.is_stop_requested() {
                return Ok(Ending::StopRequested);
            }
            let Some(packet) = self.parts.source.next_packet()? else {
                return Ok(Ending::EndOfStream);
            };
            self.stats.packets_read += 1;

            if packet.stream_index() != self.parts.decoder.stream_index() {
                self.stats.packets_skipped += 1;
                continue;
            }
            self.feed(&packet)?;
        }
    }

    /// Submits one packet, draining after every attempt, until the decoder takes it.
    fn feed(&mut self, packet: &S::Packet) -> Result<(), PipelineError> {
        loop {
            transition(&mut self.stage, WorkerStage::Decoding);
            let submit = self.parts.decoder.submit(packet)?;
            let drained = self.publish_available(WorkerStage::Decoding)?;
            match submit {
                Submit::Accepted => {
                    self.stats.packets_submitted += 1;
                    return Ok(());
                }
                // a busy decoder that yields nothing would spin forever
                Submit::Busy if drained == 0 => {
                    return Err(PipelineError::Decode(ffmpeg_next::Error::Other {
                        errno: ffmpeg_next::util::error::EAGAIN,
                    }));
                }
                Submit::Busy => self.stats.busy_retries += 1,
            }
        }
    }

    /// Converts and publishes every frame the decoder has ready, in its order.
    /// `receiving` is the stage the worker is in while it waits on the decoder.
    fn publish_available(&mut self, receiving: WorkerStage) -> Result<u64, PipelineError> {
        let mut published = 0;
        let mut frames = self.parts.decoder.drain();
        loop {
            transition(&mut self.stage, receiving);
            let Some(frame) = frames.next() else {
                break;
            };
            let frame = frame?;
            self.stats.frames_decoded += 1;

            transition(&mut self.stage, WorkerStage::Converting);
            let converted = self.parts.converter.convert(&frame)?;
            drop(frame);

            transition(&mut self.stage, WorkerStage::Publishing);
            let sequence = self.surface.publish(&converted)?;
            drop(converted);
            self.stats.frames_published += 1;
            published += 1;
            log::trace!("published frame #{}", sequence);

            transition(&mut self.stage, WorkerStage::Pacing);
            if !self.config.frame_delay.is_zero() {
                std::thread::sleep(self.config.frame_delay);
            }
        }
        Ok(published)
    }

    fn flush_tail(&mut self) -> Result<(), PipelineError> {
        self.parts.decoder.send_eof()?;
        let tail = self.publish_available(WorkerStage::Draining)?;
        log::debug!("end of stream, {} buffered frames flushed", tail);
        Ok(())
    }
}

/// Runs the decode loop on the calling thread until end of stream, a stop request
/// or a fatal error, then marks `state` stopped.
pub fn run_decode_loop<S, D, C>(
    parts: DecodeParts<S, D, C>,
    surface: &FrameSurface,
    state: &PipelineState,
    config: &WorkerConfig,
) -> (DecodeParts<S, D, C>, WorkerReport)
where
    S: PacketSource,
    D: FrameDecoder<Packet = S::Packet>,
    C: FrameConverter<D::Frame>,
{
    let mut decode_loop = DecodeLoop {
        parts,
        surface,
        state,
        config,
        stage: WorkerStage::Idle,
        stats: WorkerStats::default(),
    };
    let (status, ended_in) = decode_loop.run();
    let stats = decode_loop.stats;

    match &status {
        WorkerStatus::Aborted(err) => log::error!(
            "decode worker aborted while {:?} after {} packets, {} frames: {}",
            ended_in,
            stats.packets_read,
            stats.frames_published,
            err
        ),
        status => log::info!(
            "decode worker {}: {} packets read ({} skipped), {} frames published",
            status,
            stats.packets_read,
            stats.packets_skipped,
            stats.frames_published
        ),
    }

    state.mark_stopped(status.is_abnormal());
    let report = WorkerReport {
        status,
        stats,
        ended_in,
        stage: decode_loop.stage,
    };
    (decode_loop.parts, report)
}

type WorkerResult<S, D, C> = (DecodeParts<S, D, C>, WorkerReport);

/// Owning handle of the decode thread. Dropping it requests a stop and joins.
pub struct DecodeWorker<S, D, C> {
    handle: Option<JoinHandle<WorkerResult<S, D, C>>>,
    state: Arc<PipelineState>,
}

impl<S, D, C> DecodeWorker<S, D, C>
where
    S: PacketSource + Send + 'static,
    D: FrameDecoder<Packet = S::Packet> + Send + 'static,
    C: FrameConverter<D::Frame> + Send + 'static,
{
    pub fn spawn(
        parts: DecodeParts<S, D, C>,
        surface: Arc<FrameSurface>,
        state: Arc<PipelineState>,
        config: WorkerConfig,
    ) -> Result<Self, PipelineError> {
        let thread_state = Arc::clone(&state);
        let handle = std::thread::Builder::new()
            .name("decode-worker".to_string())
            .spawn(move || {
                log::info!("decode worker started");
                run_decode_loop(parts, &surface, &thread_state, &config)
            })
            .map_err(PipelineError::WorkerSpawn)?;

        Ok(Self {
            handle: Some(handle),
            state,
        })
    }
}

impl<S, D, C> DecodeWorker<S, D, C> {
    pub fn stop(&self) {
        self.state.request_stop();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Blocks until the worker thread has exited. Does not request a stop by itself.
    pub fn join(mut self) -> Result<WorkerResult<S, D, C>, PipelineError> {
        let Some(handle) = self.handle.take() else {
            return Err(PipelineError::WorkerPanicked);
        };
        handle.join().map_err(|_| {
            self.state.mark_stopped(true);
            PipelineError::WorkerPanicked
        })
    }
}

impl<S, D, C> Drop for DecodeWorker<S, D, C> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.state.request_stop();
            if handle.join().is_err() {
                self.state.mark_stopped(true);
            }
        }
    }
}

#[cfg(test)]
#[path = "worker_test.rs"]
mod worker_test;
