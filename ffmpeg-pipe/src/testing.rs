//! In-memory doubles of the codec, conversion and presentation capabilities.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    decoder::{FrameDecoder, Submit},
    error::PipelineError,
    frame::Plane,
    input::PacketSource,
    layout::PixelLayout,
    packet::StreamPacket,
    render::{Presenter, PresenterEvent},
    scaler::FrameConverter,
    state::PipelineState,
    surface::SurfaceSnapshot,
};

pub const WIDTH: u32 = 16;
pub const HEIGHT: u32 = 8;
pub const LAYOUT: PixelLayout = PixelLayout::Rgba;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestPacket {
    pub stream: usize,
    pub id: u32,
}

impl StreamPacket for TestPacket {
    fn stream_index(&self) -> usize {
        self.stream
    }
}

/// Packets for the given stream indices, ids counting from 0.
pub fn packets(streams: &[usize]) -> Vec<TestPacket> {
    streams
        .iter()
        .enumerate()
        .map(|(id, &stream)| TestPacket {
            stream,
            id: id as u32,
        })
        .collect()
}

pub struct ScriptedSource {
    packets: VecDeque<TestPacket>,
    reads: Arc<Mutex<u64>>,
    stop_on_read: Option<(u64, Arc<PipelineState>)>,
    fail_on_read: Option<(u64, ffmpeg_next::Error)>,
}

impl ScriptedSource {
    pub fn new(packets: Vec<TestPacket>) -> Self {
        Self {
            packets: packets.into(),
            reads: Arc::new(Mutex::new(0)),
            stop_on_read: None,
            fail_on_read: None,
        }
    }

    /// Requests a pipeline stop from inside the `n`th successful read.
    pub fn stop_on_read(mut self, n: u64, state: Arc<PipelineState>) -> Self {
        self.stop_on_read = Some((n, state));
        self
    }

    /// The `n`th read attempt fails with `err`, as a demuxer read would.
    pub fn fail_on_read(mut self, n: u64, err: ffmpeg_next::Error) -> Self {
        self.fail_on_read = Some((n, err));
        self
    }

    pub fn reads(&self) -> Arc<Mutex<u64>> {
        Arc::clone(&self.reads)
    }
}

impl PacketSource for ScriptedSource {
    type Packet = TestPacket;

    fn next_packet(&mut self) -> Result<Option<TestPacket>, PipelineError> {
        let mut reads = self.reads.lock();
        if let Some((n, err)) = self.fail_on_read {
            if *reads + 1 == n {
                *reads += 1;
                return Err(PipelineError::Decode(err));
            }
        }
        let Some(packet) = self.packets.pop_front() else {
            return Ok(None);
        };
        *reads += 1;
        if let Some((n, state)) = &self.stop_on_read {
            if *reads == *n {
                state.request_stop();
            }
        }
        Ok(Some(packet))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestFrame {
    pub id: u32,
}

#[derive(Debug, Default)]
pub struct DecoderLog {
    pub submitted: Vec<u32>,
    pub busy: u64,
    pub eof: bool,
    pub flushed: bool,
}

/// Emits `frames_per_packet` frames per accepted packet and holds back the last
/// `delay` of them until more input or end of stream arrives, like a codec with
/// B-frame reordering latency.
pub struct ScriptedDecoder {
    stream_index: usize,
    frames_per_packet: u32,
    delay: usize,
    capacity: usize,
    fail_on_submit: Option<usize>,
    panic_on_submit: Option<usize>,
    pending: VecDeque<TestFrame>,
    next_id: u32,
    release: bool,
    log: Arc<Mutex<DecoderLog>>,
}

impl ScriptedDecoder {
    pub fn new(stream_index: usize) -> Self {
        Self {
            stream_index,
            frames_per_packet: 1,
            delay: 0,
            capacity: usize::MAX,
            fail_on_submit: None,
            panic_on_submit: None,
            pending: VecDeque::new(),
            next_id: 0,
            release: false,
            log: Arc::new(Mutex::new(DecoderLog::default())),
        }
    }

    pub fn frames_per_packet(mut self, n: u32) -> Self {
        self.frames_per_packet = n;
        self
    }

    pub fn delay(mut self, delay: usize) -> Self {
        self.delay = delay;
        self
    }

    /// Reports busy while this many frames are pending.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// The `n`th submission (1-based) fails with a decode error.
    pub fn fail_on_submit(mut self, n: usize) -> Self {
        self.fail_on_submit = Some(n);
        self
    }

    /// The `n`th submission (1-based) panics, taking the worker thread down.
    pub fn panic_on_submit(mut self, n: usize) -> Self {
        self.panic_on_submit = Some(n);
        self
    }

    pub fn log(&self) -> Arc<Mutex<DecoderLog>> {
        Arc::clone(&self.log)
    }
}

impl FrameDecoder for ScriptedDecoder {
    type Packet = TestPacket;
    type Frame = TestFrame;

    fn stream_index(&self) -> usize {
        self.stream_index
    }

    fn submit(&mut self, packet: &TestPacket) -> Result<Submit, PipelineError> {
        let submitted = self.log.lock().submitted.len();
        if self.panic_on_submit == Some(submitted + 1) {
            panic!("decoder crashed on packet {}", packet.id);
        }
        let mut log = self.log.lock();
        assert_eq!(
            packet.stream, self.stream_index,
            "packet of another stream submitted"
        );
        if self.fail_on_submit == Some(log.submitted.len() + 1) {
            return Err(PipelineError::Decode(ffmpeg_next::Error::InvalidData));
        }
        if self.pending.len() >= self.capacity {
            log.busy += 1;
            self.release = true;
            return Ok(Submit::Busy);
        }
        log.submitted.push(packet.id);
        self.release = false;
        for _ in 0..self.frames_per_packet {
            self.pending.push_back(TestFrame { id: self.next_id });
            self.next_id += 1;
        }
        Ok(Submit::Accepted)
    }

    fn receive_frame(&mut self) -> Result<Option<TestFrame>, PipelineError> {
        let hold = if self.release || self.log.lock().eof {
            0
        } else {
            self.delay
        };
        if self.pending.len() > hold {
            Ok(self.pending.pop_front())
        } else {
            Ok(None)
        }
    }

    fn send_eof(&mut self) -> Result<(), PipelineError> {
        self.log.lock().eof = true;
        Ok(())
    }

    fn flush(&mut self) {
        self.pending.clear();
        self.log.lock().flushed = true;
    }
}

/// Turns frame `id` into a solid plane whose every byte is `id as u8`.
pub struct FillConverter {
    stride: usize,
    fail_on_frame: Option<u32>,
    converted: Arc<Mutex<Vec<u32>>>,
}

impl FillConverter {
    pub fn new() -> Self {
        Self {
            stride: LAYOUT.row_bytes(WIDTH) + 12,
            fail_on_frame: None,
            converted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn fail_on_frame(mut self, id: u32) -> Self {
        self.fail_on_frame = Some(id);
        self
    }

    pub fn converted(&self) -> Arc<Mutex<Vec<u32>>> {
        Arc::clone(&self.converted)
    }
}

impl FrameConverter<TestFrame> for FillConverter {
    type Output = Plane;

    fn convert(&mut self, frame: &TestFrame) -> Result<Plane, PipelineError> {
        if self.fail_on_frame == Some(frame.id) {
            return Err(PipelineError::Conversion(ffmpeg_next::Error::InvalidData));
        }
        let mut plane = Plane::with_stride(WIDTH, HEIGHT, LAYOUT, self.stride);
        for y in 0..HEIGHT {
            plane.row_mut(y).fill(frame.id as u8);
        }
        self.converted.lock().push(frame.id);
        Ok(plane)
    }
}

#[derive(Debug, Default)]
pub struct PresenterLog {
    /// (sequence, first byte) of every presented surface.
    pub presented: Vec<(u64, u8)>,
    pub dropped: bool,
}

/// Quits after a number of presents, or on a scripted key press.
pub struct ScriptedPresenter {
    quit_after: Option<usize>,
    key_after: Option<(usize, char)>,
    fail_on_present: Option<usize>,
    log: Arc<Mutex<PresenterLog>>,
}

impl ScriptedPresenter {
    pub fn new() -> Self {
        Self {
            quit_after: None,
            key_after: None,
            fail_on_present: None,
            log: Arc::new(Mutex::new(PresenterLog::default())),
        }
    }

    pub fn quit_after(mut self, presents: usize) -> Self {
        self.quit_after = Some(presents);
        self
    }

    pub fn key_after(mut self, presents: usize, key: char) -> Self {
        self.key_after = Some((presents, key));
        self
    }

    pub fn fail_on_present(mut self, n: usize) -> Self {
        self.fail_on_present = Some(n);
        self
    }

    pub fn log(&self) -> Arc<Mutex<PresenterLog>> {
        Arc::clone(&self.log)
    }
}

impl Presenter for ScriptedPresenter {
    fn poll_event(&mut self) -> Option<PresenterEvent> {
        let presented = self.log.lock().presented.len();
        if self.quit_after.is_some_and(|n| presented >= n) {
            return Some(PresenterEvent::Quit);
        }
        match self.key_after {
            Some((n, key)) if presented >= n => Some(PresenterEvent::Key(key)),
            _ => None,
        }
    }

    fn present(&mut self, frame: &SurfaceSnapshot) -> Result<(), PipelineError> {
        let mut log = self.log.lock();
        if self.fail_on_present == Some(log.presented.len() + 1) {
            return Err(PipelineError::Presentation("surface lost".to_string()));
        }
        log.presented.push((frame.sequence, frame.data[0]));
        Ok(())
    }
}

impl Drop for ScriptedPresenter {
    fn drop(&mut self) {
        self.log.lock().dropped = true;
    }
}
