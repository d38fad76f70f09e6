use ffmpeg_next::{Rational, codec::Parameters, format::stream::Stream};

/// The selected video stream, detached from the demuxer so it can travel with
/// the decoder to the worker thread.
#[derive(Clone)]
pub struct AvStream {
    index: usize,
    parameters: Parameters,
    time_base: Rational,
    frame_rate: Rational,
    width: u32,
    height: u32,
}

// parameters are cloned out of the stream, nothing points back into the demuxer
unsafe impl Send for AvStream {}
unsafe impl Sync for AvStream {}

impl AvStream {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    pub fn codec_id(&self) -> ffmpeg_next::codec::Id {
        self.parameters.id()
    }

    /// Coded size as declared by the container.
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Average frame rate, `None` when the container does not declare one.
    pub fn fps(&self) -> Option<f64> {
        rate_to_fps(self.frame_rate)
    }
}

fn rate_to_fps(rate: Rational) -> Option<f64> {
    (rate.numerator() > 0 && rate.denominator() > 0).then(|| f64::from(rate))
}

fn coded_size(parameters: &Parameters) -> (u32, u32) {
    unsafe {
        let ptr = parameters.as_ptr();
        ((*ptr).width.max(0) as u32, (*ptr).height.max(0) as u32)
    }
}

impl From<Stream<'_>> for AvStream {
    fn from(stream: Stream<'_>) -> Self {
        let parameters = stream.parameters().clone();
        let (width, height) = coded_size(&parameters);
        Self {
            index: stream.index(),
            parameters,
            time_base: stream.time_base(),
            frame_rate: stream.avg_frame_rate(),
            width,
            height,
        }
    }
}
