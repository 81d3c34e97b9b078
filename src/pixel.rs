//! Decoding of server-side pixmap images into RGB32 bitmaps.

use crate::bitmap::{Bitmap, Color};

/// Index of the lowest set bit, or 0 if no bit is set.
pub fn lowest_set_bit(mask: u32) -> u32 {
    (0..u32::BITS).find(|&i| mask & (1u32 << i) != 0).unwrap_or(0)
}

/// Channel masks of a visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelMasks {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
}

impl ChannelMasks {
    pub fn is_empty(&self) -> bool {
        self.red == 0 && self.green == 0 && self.blue == 0
    }

    /// Pack an RGB32 value into a pixel laid out by these masks, keeping the
    /// top bits of each channel.
    pub fn pack(&self, rgb: u32) -> u32 {
        let channel = |value: u32, mask: u32| {
            if mask == 0 {
                return 0;
            }
            let width = mask.count_ones();
            let scaled = if width >= 8 {
                value << (width - 8)
            } else {
                value >> (8 - width)
            };
            (scaled << lowest_set_bit(mask)) & mask
        };
        channel((rgb >> 16) & 0xff, self.red)
            | channel((rgb >> 8) & 0xff, self.green)
            | channel(rgb & 0xff, self.blue)
    }

    /// (red, green, blue) bit shifts.
    pub fn shifts(&self) -> (u32, u32, u32) {
        (
            lowest_set_bit(self.red),
            lowest_set_bit(self.green),
            lowest_set_bit(self.blue),
        )
    }
}

/// The fixed set of pixel layouts we know how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32 bpp, already laid out as 0x??RRGGBB.
    Argb32,
    /// 16 bpp, 5-6-5.
    Rgb565,
    /// 16 bpp, 5-5-5.
    Rgb555,
    /// 8 bpp. The palette index is taken as the color value, which is lossy.
    Indexed8,
    /// Anything else decodes to black.
    Unknown,
}

impl PixelFormat {
    /// First matching rule wins.
    pub fn select(bits_per_pixel: u8, red_shift: u32, green_shift: u32, blue_shift: u32) -> Self {
        match (bits_per_pixel, red_shift, green_shift, blue_shift) {
            (32, _, _, _) => PixelFormat::Argb32,
            (16, 11, 5, 0) => PixelFormat::Rgb565,
            (16, 10, 5, 0) => PixelFormat::Rgb555,
            (8, _, _, _) => PixelFormat::Indexed8,
            _ => PixelFormat::Unknown,
        }
    }

    pub fn decode(self, pixel: u32) -> u32 {
        match self {
            PixelFormat::Argb32 | PixelFormat::Indexed8 => pixel,
            PixelFormat::Rgb565 => {
                (pixel & 0xf800) << 8 | (pixel & 0x07e0) << 5 | (pixel & 0x001f) << 3
            }
            PixelFormat::Rgb555 => {
                (pixel & 0x7c00) << 9 | (pixel & 0x03e0) << 6 | (pixel & 0x001f) << 3
            }
            PixelFormat::Unknown => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LsbFirst,
    MsbFirst,
}

/// A ZPixmap image as returned by GetImage, together with its layout.
/// The buffer is owned and released when the image is dropped.
#[derive(Debug, Clone)]
pub struct NativeImage {
    pub width: u16,
    pub height: u16,
    pub depth: u8,
    pub bits_per_pixel: u8,
    /// Scanline padding in bits
    pub scanline_pad: u8,
    pub byte_order: ByteOrder,
    /// Masks of the image's own visual, if the server reported one
    pub masks: Option<ChannelMasks>,
    pub data: Vec<u8>,
}

impl NativeImage {
    /// Bytes per scanline, including padding.
    pub fn stride(&self) -> usize {
        let pad = self.scanline_pad.max(8) as usize;
        let bits = self.width as usize * self.bits_per_pixel as usize;
        bits.div_ceil(pad) * pad / 8
    }

    /// Raw pixel value. Unsupported depths and short buffers read as 0.
    pub fn pixel(&self, x: u16, y: u16) -> u32 {
        let bytes = match self.bits_per_pixel {
            8 => 1,
            16 => 2,
            24 => 3,
            32 => 4,
            _ => return 0,
        };
        let offset = y as usize * self.stride() + x as usize * bytes;
        let raw = match self.data.get(offset..offset + bytes) {
            Some(raw) => raw,
            None => return 0,
        };
        match self.byte_order {
            ByteOrder::LsbFirst => raw.iter().rev().fold(0, |acc, &b| acc << 8 | b as u32),
            ByteOrder::MsbFirst => raw.iter().fold(0, |acc, &b| acc << 8 | b as u32),
        }
    }

    /// Select a converter once and decode every pixel.
    /// `default_masks` are used when the image carries no masks of its own.
    pub fn decode_into_bitmap(&self, default_masks: ChannelMasks) -> (PixelFormat, Bitmap) {
        let masks = self
            .masks
            .filter(|m| !m.is_empty())
            .unwrap_or(default_masks);
        let (red_shift, green_shift, blue_shift) = masks.shifts();
        let format = PixelFormat::select(self.bits_per_pixel, red_shift, green_shift, blue_shift);

        let mut bitmap = Bitmap::filled(self.width, self.height, Color::BLACK);
        for y in 0..self.height {
            for x in 0..self.width {
                bitmap.set_pixel(x, y, format.decode(self.pixel(x, y)));
            }
        }
        (format, bitmap)
    }
}
