use crate::{
    error::PipelineError,
    frame::DecodedFrame,
    packet::{RawPacket, StreamPacket},
    stream::AvStream,
};

/// Outcome of handing one packet to a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submit {
    Accepted,
    /// Internal buffers are full. Drain frames, then submit the same packet again.
    Busy,
}

/// Per-stream codec state: packets in, frames out, in decoder order.
pub trait FrameDecoder {
    type Packet: StreamPacket;
    type Frame;

    /// Stream this decoder was opened for. Packets of other streams must not be submitted.
    fn stream_index(&self) -> usize;

    fn submit(&mut self, packet: &Self::Packet) -> Result<Submit, PipelineError>;

    /// Next buffered frame, or `Ok(None)` when the decoder needs more input.
    fn receive_frame(&mut self) -> Result<Option<Self::Frame>, PipelineError>;

    /// Signals end of input; frames still buffered become receivable.
    fn send_eof(&mut self) -> Result<(), PipelineError>;

    /// Drops every buffered frame.
    fn flush(&mut self);

    /// Lazily yields every frame currently available. Call again after the next submit.
    fn drain(&mut self) -> Drain<'_, Self>
    where
        Self: Sized,
    {
        Drain {
            decoder: self,
            done: false,
        }
    }
}

pub struct Drain<'a, D: FrameDecoder> {
    decoder: &'a mut D,
    done: bool,
}

impl<D: FrameDecoder> Iterator for Drain<'_, D> {
    type Item = Result<D::Frame, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.decoder.receive_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn is_again(err: &ffmpeg_next::Error) -> bool {
    matches!(err, ffmpeg_next::Error::Other { errno } if *errno == ffmpeg_next::util::error::EAGAIN)
}

/// FFmpeg video decoder bound to one stream. The codec context is freed on drop.
pub struct VideoDecoder {
    stream: AvStream,
    inner: ffmpeg_next::codec::decoder::Video,
}

impl VideoDecoder {
    pub fn new(stream: &AvStream) -> Result<Self, PipelineError> {
        let codec = format!("{:?}", stream.codec_id());
        let init_err = |source| PipelineError::DecoderInit {
            codec: codec.clone(),
            source,
        };

        let mut decoder_ctx = ffmpeg_next::codec::Context::new();
        unsafe {
            (*decoder_ctx.as_mut_ptr()).time_base = stream.time_base().into();
        }
        decoder_ctx
            .set_parameters(stream.parameters().clone())
            .map_err(init_err)?;

        let video_decoder = decoder_ctx.decoder().video().map_err(init_err)?;
        if video_decoder.format() == ffmpeg_next::format::Pixel::None
            || video_decoder.width() == 0
            || video_decoder.height() == 0
        {
            return Err(init_err(ffmpeg_next::Error::InvalidData));
        }

        log::debug!(
            "opened {} decoder: {}x{} {:?}",
            codec,
            video_decoder.width(),
            video_decoder.height(),
            video_decoder.format()
        );

        Ok(Self {
            stream: stream.clone(),
            inner: video_decoder,
        })
    }

    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    pub fn format(&self) -> ffmpeg_next::format::Pixel {
        self.inner.format()
    }
}

impl FrameDecoder for VideoDecoder {
    type Packet = RawPacket;
    type Frame = DecodedFrame;

    fn stream_index(&self) -> usize {
        self.stream.index()
    }

    fn submit(&mut self, packet: &RawPacket) -> Result<Submit, PipelineError> {
        match self.inner.send_packet(packet.packet()) {
            Ok(()) => Ok(Submit::Accepted),
            Err(err) if is_again(&err) => Ok(Submit::Busy),
            Err(err) => Err(PipelineError::Decode(err)),
        }
    }

    fn receive_frame(&mut self) -> Result<Option<DecodedFrame>, PipelineError> {
        let mut frame = ffmpeg_next::frame::Video::empty();
        match self.inner.receive_frame(&mut frame) {
            Ok(()) => Ok(Some(DecodedFrame::from(frame))),
            Err(ffmpeg_next::Error::Eof) => Ok(None),
            Err(err) if is_again(&err) => Ok(None),
            Err(err) => Err(PipelineError::Decode(err)),
        }
    }

    fn send_eof(&mut self) -> Result<(), PipelineError> {
        self.inner.send_eof().map_err(PipelineError::Decode)
    }

    fn flush(&mut self) {
        self.inner.flush();
    }
}

unsafe impl Send for VideoDecoder {}
