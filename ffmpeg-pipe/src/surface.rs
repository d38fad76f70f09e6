use bytes::Bytes;
use parking_lot::Mutex;

use crate::{error::PipelineError, frame::PlaneView, layout::PixelLayout};

/// Row pitch alignment of surfaces created with [`FrameSurface::new`].
pub const ROW_ALIGN: usize = 32;

/// The single presentation buffer shared by the decode worker and the render loop.
///
/// Both [`publish`](Self::publish) and [`snapshot`](Self::snapshot) hold the lock
/// for exactly one copy, so a reader only ever sees the blank buffer or one
/// complete frame. Newer frames overwrite older ones; nothing is queued.
pub struct FrameSurface {
    width: u32,
    height: u32,
    layout: PixelLayout,
    stride: usize,
    inner: Mutex<SurfaceBuffer>,
}

struct SurfaceBuffer {
    data: Vec<u8>,
    sequence: u64,
}

/// Owned copy of the surface, taken under the lock and read after it is released.
#[derive(Debug, Clone)]
pub struct SurfaceSnapshot {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub stride: usize,
    /// Number of frames published so far; 0 means the surface is still blank.
    pub sequence: u64,
    pub data: Bytes,
}

impl SurfaceSnapshot {
    pub fn is_blank(&self) -> bool {
        self.sequence == 0
    }

    /// Tightly packed RGB24 copy of the visible pixels.
    pub fn to_rgb24(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height {
            self.layout.expand_rgb(self.row(y), &mut out);
        }
        out
    }
}

impl PlaneView for SurfaceSnapshot {
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

impl FrameSurface {
    pub fn new(width: u32, height: u32, layout: PixelLayout) -> Self {
        let stride = layout.row_bytes(width).div_ceil(ROW_ALIGN) * ROW_ALIGN;
        Self::with_stride(width, height, layout, stride)
    }

    /// # Panics
    /// If `stride` cannot hold one row of `width` pixels.
    pub fn with_stride(width: u32, height: u32, layout: PixelLayout, stride: usize) -> Self {
        assert!(
            stride >= layout.row_bytes(width),
            "surface stride {} shorter than a {}px {} row",
            stride,
            width,
            layout
        );
        Self {
            width,
            height,
            layout,
            stride,
            inner: Mutex::new(SurfaceBuffer {
                data: vec![0; stride * height as usize],
                sequence: 0,
            }),
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Copies a converted frame in row by row and returns its sequence number.
    ///
    /// Source and surface strides are independent. A frame of the wrong size or
    /// layout is rejected before the lock is taken, leaving the surface untouched.
    pub fn publish<F: PlaneView + ?Sized>(&self, frame: &F) -> Result<u64, PipelineError> {
        if frame.width() != self.width
            || frame.height() != self.height
            || frame.layout() != self.layout
        {
            return Err(PipelineError::Presentation(format!(
                "frame {}x{} {} does not fit surface {}x{} {}",
                frame.width(),
                frame.height(),
                frame.layout(),
                self.width,
                self.height,
                self.layout
            )));
        }

        let row_bytes = self.layout.row_bytes(self.width);
        let src_stride = frame.stride();
        let src = frame.data();
        let needed = match self.height {
            0 => 0,
            h => src_stride * (h as usize - 1) + row_bytes,
        };
        if src_stride < row_bytes || src.len() < needed {
            return Err(PipelineError::Presentation(format!(
                "frame plane too short: stride {}, {} bytes, need {}",
                src_stride,
                src.len(),
                needed
            )));
        }

        let mut buffer = self.inner.lock();
        if src_stride == self.stride {
            buffer.data[..needed].copy_from_slice(&src[..needed]);
        } else {
            for y in 0..self.height as usize {
                let s = y * src_stride;
                let d = y * self.stride;
                buffer.data[d..d + row_bytes].copy_from_slice(&src[s..s + row_bytes]);
            }
        }
        buffer.sequence += 1;
        Ok(buffer.sequence)
    }

    /// Copies the current contents out. The lock is held for the copy only.
    pub fn snapshot(&self) -> SurfaceSnapshot {
        let buffer = self.inner.lock();
        let data = Bytes::copy_from_slice(&buffer.data);
        let sequence = buffer.sequence;
        drop(buffer);

        SurfaceSnapshot {
            width: self.width,
            height: self.height,
            layout: self.layout,
            stride: self.stride,
            sequence,
            data,
        }
    }

    pub fn sequence(&self) -> u64 {
        self.inner.lock().sequence
    }
}
