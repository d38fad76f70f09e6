use crate::layout::PixelLayout;

/// Read access to a single packed plane, as the surface copies it.
///
/// `data()` must hold at least `stride() * (height() - 1) + layout().row_bytes(width())`
/// bytes; `stride()` may be larger than the row's byte count.
pub trait PlaneView {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn layout(&self) -> PixelLayout;
    fn stride(&self) -> usize;
    fn data(&self) -> &[u8];

    fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride();
        &self.data()[start..start + self.layout().row_bytes(self.width())]
    }
}

/// A frame as it leaves the decoder, in whatever layout the codec produced.
pub struct DecodedFrame {
    frame: ffmpeg_next::frame::Video,
}

impl From<ffmpeg_next::frame::Video> for DecodedFrame {
    fn from(frame: ffmpeg_next::frame::Video) -> Self {
        Self { frame }
    }
}

impl DecodedFrame {
    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    pub fn as_video(&self) -> &ffmpeg_next::frame::Video {
        &self.frame
    }
}

/// Output of the scaler: an FFmpeg frame in one of the packed [`PixelLayout`]s.
pub struct ScaledFrame {
    frame: ffmpeg_next::frame::Video,
    layout: PixelLayout,
}

impl ScaledFrame {
    pub(crate) fn new(frame: ffmpeg_next::frame::Video, layout: PixelLayout) -> Self {
        Self { frame, layout }
    }
}

impl PlaneView for ScaledFrame {
    fn width(&self) -> u32 {
        self.frame.width()
    }

    fn height(&self) -> u32 {
        self.frame.height()
    }

    fn layout(&self) -> PixelLayout {
        self.layout
    }

    fn stride(&self) -> usize {
        self.frame.stride(0)
    }

    fn data(&self) -> &[u8] {
        self.frame.data(0)
    }
}

/// Heap-backed packed plane with an explicit stride.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    width: u32,
    height: u32,
    layout: PixelLayout,
    stride: usize,
    data: Vec<u8>,
}

impl Plane {
    pub fn new(width: u32, height: u32, layout: PixelLayout) -> Self {
        Self::with_stride(width, height, layout, layout.row_bytes(width))
    }

    /// # Panics
    /// If `stride` is smaller than one row of pixels.
    pub fn with_stride(width: u32, height: u32, layout: PixelLayout, stride: usize) -> Self {
        assert!(
            stride >= layout.row_bytes(width),
            "stride {} shorter than a {}px {} row",
            stride,
            width,
            layout
        );
        Self {
            width,
            height,
            layout,
            stride,
            data: vec![0; stride * height as usize],
        }
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let len = self.layout.row_bytes(self.width);
        &mut self.data[start..start + len]
    }

    pub fn fill_rgb(&mut self, color: [u8; 3]) {
        let bpp = self.layout.bytes_per_pixel();
        for y in 0..self.height {
            let layout = self.layout;
            for px in self.row_mut(y).chunks_exact_mut(bpp) {
                layout.write_rgb(color, px);
            }
        }
    }
}

impl PlaneView for Plane {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn layout(&self) -> PixelLayout {
        self.layout
    }

    fn stride(&self) -> usize {
        self.stride
    }

    fn data(&self) -> &[u8] {
        &self.data
    }
}
