use std::path::Path;

use crate::{
    error::PipelineError,
    packet::{RawPacket, StreamPacket},
    stream::AvStream,
};

/// Anything the decode worker can pull compressed packets from.
pub trait PacketSource {
    type Packet: StreamPacket;

    /// Next packet in container order; `Ok(None)` at end of stream.
    fn next_packet(&mut self) -> Result<Option<Self::Packet>, PipelineError>;
}

/// An opened media container. The demuxer is closed when this is dropped.
pub struct AvInput {
    inner: ffmpeg_next::format::context::Input,
    path: String,
}

impl AvInput {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let inner =
            ffmpeg_next::format::input(path).map_err(|source| PipelineError::SourceOpen {
                path: display.clone(),
                source,
            })?;

        log::debug!(
            "opened {} ({}), {} streams",
            display,
            inner.format().name(),
            inner.nb_streams()
        );

        Ok(Self {
            inner,
            path: display,
        })
    }

    /// Picks the stream FFmpeg ranks best among the video streams.
    pub fn best_video_stream(&self) -> Result<AvStream, PipelineError> {
        let stream = self
            .inner
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .map(AvStream::from)
            .ok_or_else(|| PipelineError::StreamSelection {
                path: self.path.clone(),
            })?;

        log::info!(
            "{}: video stream #{} {:?} {}x{} @ {} fps, time base {}",
            self.path,
            stream.index(),
            stream.codec_id(),
            stream.width(),
            stream.height(),
            stream
                .fps()
                .map_or_else(|| "unknown".to_string(), |fps| format!("{:.2}", fps)),
            stream.time_base()
        );
        Ok(stream)
    }
}

unsafe impl Send for AvInput {}

impl PacketSource for AvInput {
    type Packet = RawPacket;

    fn next_packet(&mut self) -> Result<Option<RawPacket>, PipelineError> {
        let mut packet = ffmpeg_next::codec::packet::Packet::empty();
        let read = packet.read(&mut self.inner);
        Ok(read_outcome(read)?.then(|| RawPacket::from(packet)))
    }
}

/// `Ok(false)` at end of stream. Any other failure, including a demuxer that
/// has nothing ready yet, ends the read loop with an error.
fn read_outcome(read: Result<(), ffmpeg_next::Error>) -> Result<bool, PipelineError> {
    match read {
        Ok(()) => Ok(true),
        Err(ffmpeg_next::Error::Eof) => Ok(false),
        Err(err) => Err(PipelineError::Decode(err)),
    }
}
