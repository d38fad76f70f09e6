use std::fmt::{Display, Formatter};
use std::str::FromStr;

use ffmpeg_next::format::Pixel;

/// Packed pixel layouts the presentation surface can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelLayout {
    /// 16 bit, little endian, 5-6-5.
    #[default]
    Rgb565,
    Rgb24,
    Rgba,
    Bgra,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Rgb565 => 2,
            PixelLayout::Rgb24 => 3,
            PixelLayout::Rgba | PixelLayout::Bgra => 4,
        }
    }

    /// Tight byte count of one row of `width` pixels.
    pub fn row_bytes(self, width: u32) -> usize {
        width as usize * self.bytes_per_pixel()
    }

    pub fn pixel(self) -> Pixel {
        match self {
            PixelLayout::Rgb565 => Pixel::RGB565LE,
            PixelLayout::Rgb24 => Pixel::RGB24,
            PixelLayout::Rgba => Pixel::RGBA,
            PixelLayout::Bgra => Pixel::BGRA,
        }
    }

    /// Encodes one RGB color into `out`, which must hold `bytes_per_pixel()` bytes.
    pub fn write_rgb(self, [r, g, b]: [u8; 3], out: &mut [u8]) {
        match self {
            PixelLayout::Rgb565 => {
                let v = ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3);
                out[..2].copy_from_slice(&v.to_le_bytes());
            }
            PixelLayout::Rgb24 => out[..3].copy_from_slice(&[r, g, b]),
            PixelLayout::Rgba => out[..4].copy_from_slice(&[r, g, b, 0xff]),
            PixelLayout::Bgra => out[..4].copy_from_slice(&[b, g, r, 0xff]),
        }
    }

    /// Decodes one pixel back to RGB. 5/6 bit channels are widened by bit replication.
    pub fn read_rgb(self, px: &[u8]) -> [u8; 3] {
        match self {
            PixelLayout::Rgb565 => {
                let v = u16::from_le_bytes([px[0], px[1]]);
                let r = ((v >> 11) & 0x1f) as u8;
                let g = ((v >> 5) & 0x3f) as u8;
                let b = (v & 0x1f) as u8;
                [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
            }
            PixelLayout::Rgb24 | PixelLayout::Rgba => [px[0], px[1], px[2]],
            PixelLayout::Bgra => [px[2], px[1], px[0]],
        }
    }

    /// Expands one row of this layout into tightly packed RGB24.
    pub fn expand_rgb(self, row: &[u8], out: &mut Vec<u8>) {
        for px in row.chunks_exact(self.bytes_per_pixel()) {
            out.extend_from_slice(&self.read_rgb(px));
        }
    }
}

impl Display for PixelLayout {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PixelLayout::Rgb565 => "rgb565",
            PixelLayout::Rgb24 => "rgb24",
            PixelLayout::Rgba => "rgba",
            PixelLayout::Bgra => "bgra",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown pixel layout {0:?} (expected rgb565, rgb24, rgba or bgra)")]
pub struct UnknownLayout(String);

impl FromStr for PixelLayout {
    type Err = UnknownLayout;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rgb565" => Ok(PixelLayout::Rgb565),
            "rgb24" | "rgb" => Ok(PixelLayout::Rgb24),
            "rgba" => Ok(PixelLayout::Rgba),
            "bgra" => Ok(PixelLayout::Bgra),
            _ => Err(UnknownLayout(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PixelLayout; 4] = [
        PixelLayout::Rgb565,
        PixelLayout::Rgb24,
        PixelLayout::Rgba,
        PixelLayout::Bgra,
    ];

    #[test]
    fn test_primary_colors_survive_every_layout() {
        let colors = [
            [0, 0, 0],
            [255, 255, 255],
            [255, 0, 0],
            [0, 255, 0],
            [0, 0, 255],
        ];
        for layout in ALL {
            let mut px = [0u8; 4];
            for color in colors {
                layout.write_rgb(color, &mut px);
                assert_eq!(layout.read_rgb(&px), color, "{layout}");
            }
        }
    }

    #[test]
    fn test_rgb565_is_little_endian() {
        let mut px = [0u8; 2];
        PixelLayout::Rgb565.write_rgb([255, 0, 0], &mut px);
        assert_eq!(px, [0x00, 0xf8]);
        PixelLayout::Rgb565.write_rgb([0, 0, 255], &mut px);
        assert_eq!(px, [0x1f, 0x00]);
    }

    #[test]
    fn test_parse_and_display() {
        for layout in ALL {
            assert_eq!(layout.to_string().parse::<PixelLayout>().unwrap(), layout);
        }
        assert_eq!("RGBA".parse::<PixelLayout>().unwrap(), PixelLayout::Rgba);
        assert!("yuv420p".parse::<PixelLayout>().is_err());
        assert_eq!(PixelLayout::default(), PixelLayout::Rgb565);
    }

    #[test]
    fn test_expand_rgb() {
        let mut row = vec![0u8; 3 * 4];
        for (i, px) in row.chunks_exact_mut(4).enumerate() {
            PixelLayout::Bgra.write_rgb([i as u8, 10, 200], px);
        }
        let mut out = Vec::new();
        PixelLayout::Bgra.expand_rgb(&row, &mut out);
        assert_eq!(out, vec![0, 10, 200, 1, 10, 200, 2, 10, 200]);
    }
}
