use ffmpeg_next::software::scaling::{Context, Flags};

use crate::{
    decoder::VideoDecoder,
    error::PipelineError,
    frame::{DecodedFrame, PlaneView, ScaledFrame},
    layout::PixelLayout,
};

/// Re-encodes decoded frames into the presentation layout.
pub trait FrameConverter<F> {
    type Output: PlaneView;

    fn convert(&mut self, frame: &F) -> Result<Self::Output, PipelineError>;
}

/// swscale context converting between pixel layouts at a fixed size. Never rescales.
pub struct Scaler {
    context: Context,
    layout: PixelLayout,
}

impl Scaler {
    pub fn new(
        source: ffmpeg_next::format::Pixel,
        width: u32,
        height: u32,
        layout: PixelLayout,
    ) -> Result<Self, PipelineError> {
        let context = Context::get(
            source,
            width,
            height,
            layout.pixel(),
            width,
            height,
            Flags::BICUBIC,
        )
        .map_err(PipelineError::Conversion)?;
        Ok(Self { context, layout })
    }

    pub fn for_decoder(decoder: &VideoDecoder, layout: PixelLayout) -> Result<Self, PipelineError> {
        Self::new(decoder.format(), decoder.width(), decoder.height(), layout)
    }

    fn run(
        &mut self,
        frame: &ffmpeg_next::frame::Video,
        dst: &mut ffmpeg_next::frame::Video,
    ) -> Result<(), PipelineError> {
        self.context
            .run(frame, dst)
            .map_err(PipelineError::Conversion)
    }
}

impl FrameConverter<DecodedFrame> for Scaler {
    type Output = ScaledFrame;

    fn convert(&mut self, frame: &DecodedFrame) -> Result<ScaledFrame, PipelineError> {
        // backing storage is allocated up front, swscale only fills it
        let mut out =
            ffmpeg_next::frame::Video::new(self.layout.pixel(), frame.width(), frame.height());
        self.run(frame.as_video(), &mut out)?;
        Ok(ScaledFrame::new(out, self.layout))
    }
}

unsafe impl Send for Scaler {}
