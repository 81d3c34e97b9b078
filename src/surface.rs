use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::xproto::*;
use x11rb::wrapper::ConnectionExt as _;

use crate::bitmap::{Bitmap, Rect};
use crate::connection::XConnection;
use crate::error::{BackdropError, Result};
use crate::pixel::{ByteOrder, ChannelMasks};

/// Fixed part of a PutImage request, in bytes.
const PUT_IMAGE_HEADER: usize = 24;

/// Top-level window that transparent widget frames are drawn into.
pub struct Surface {
    pub window: Window,
    pub gc: Gcontext,
    bits_per_pixel: u8,
    scanline_pad: u8,
    /// Channel layout of the root visual, used to pack frame pixels
    masks: ChannelMasks,
}

impl XConnection {
    /// Create (but do not map) a top-level window at `placement`.
    pub fn create_surface(&self, placement: Rect, title: &str) -> Result<Surface> {
        let (bits_per_pixel, scanline_pad) = self
            .pixmap_format(self.root_depth)
            .filter(|(bpp, _)| *bpp == 32 || *bpp == 16)
            .ok_or_else(|| {
                BackdropError::Other(format!("Unsupported root depth {}", self.root_depth))
            })?;
        if self.root_masks.is_empty() {
            return Err(BackdropError::Other(
                "Root visual has no channel masks".to_string(),
            ));
        }

        let window = self.generate_id()?;
        let gc = self.generate_id()?;

        self.conn.create_window(
            self.root_depth,
            window,
            self.root,
            placement.x,
            placement.y,
            placement.width.max(1),
            placement.height.max(1),
            0,
            WindowClass::INPUT_OUTPUT,
            self.root_visual,
            // No background: every exposed pixel is painted by us
            &CreateWindowAux::new()
                .background_pixmap(x11rb::NONE)
                .event_mask(
                    EventMask::EXPOSURE
                        | EventMask::STRUCTURE_NOTIFY
                        | EventMask::ENTER_WINDOW
                        | EventMask::LEAVE_WINDOW,
                ),
        )?;

        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.WM_PROTOCOLS,
            AtomEnum::ATOM,
            &[self.atoms.WM_DELETE_WINDOW],
        )?;
        self.conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_NAME,
            AtomEnum::STRING,
            title.as_bytes(),
        )?;
        self.conn.change_property8(
            PropMode::REPLACE,
            window,
            self.atoms._NET_WM_NAME,
            self.atoms.UTF8_STRING,
            title.as_bytes(),
        )?;

        self.conn.create_gc(gc, window, &CreateGCAux::new())?;
        self.conn.flush()?;

        log::debug!(
            "Created surface 0x{:x} at {:?} ({} bpp)",
            window,
            placement,
            bits_per_pixel
        );

        Ok(Surface {
            window,
            gc,
            bits_per_pixel,
            scanline_pad,
            masks: self.root_masks,
        })
    }

    /// Geometry of the surface in root window coordinates.
    pub fn root_geometry(&self, surface: &Surface) -> Result<Rect> {
        let geom = self.conn.get_geometry(surface.window)?.reply()?;
        let pos = self
            .conn
            .translate_coordinates(surface.window, self.root, 0, 0)?
            .reply()?;
        Ok(Rect::new(pos.dst_x, pos.dst_y, geom.width, geom.height))
    }

    /// Whether `event` is the window manager asking the surface to close.
    pub fn is_close_request(&self, surface: &Surface, event: &ClientMessageEvent) -> bool {
        event.window == surface.window
            && event.type_ == self.atoms.WM_PROTOCOLS
            && event.format == 32
            && event.data.as_data32()[0] == self.atoms.WM_DELETE_WINDOW
    }

    /// Upload a frame to the window, split into strips that fit in a
    /// single request.
    pub fn present(&self, surface: &Surface, frame: &Bitmap) -> Result<()> {
        if frame.is_null() {
            return Ok(());
        }

        let data = encode_frame(
            frame,
            surface.bits_per_pixel,
            surface.scanline_pad,
            surface.masks,
            self.byte_order(),
        );
        let stride = data.len() / frame.height() as usize;
        let max_rows = (self.conn.maximum_request_bytes().saturating_sub(PUT_IMAGE_HEADER)
            / stride)
            .clamp(1, u16::MAX as usize);

        for (i, strip) in data.chunks(max_rows * stride).enumerate() {
            let rows = (strip.len() / stride) as u16;
            self.conn.put_image(
                ImageFormat::Z_PIXMAP,
                surface.window,
                surface.gc,
                frame.width(),
                rows,
                0,
                (i * max_rows) as i16,
                0,
                self.root_depth,
                strip,
            )?;
        }
        self.conn.flush()?;
        Ok(())
    }

    pub fn destroy_surface(&self, surface: &Surface) -> Result<()> {
        self.conn.free_gc(surface.gc)?;
        self.conn.destroy_window(surface.window)?;
        self.conn.flush()?;
        Ok(())
    }
}

/// Encode an RGB32 bitmap as ZPixmap scanlines in the visual's channel layout.
fn encode_frame(
    frame: &Bitmap,
    bits_per_pixel: u8,
    scanline_pad: u8,
    masks: ChannelMasks,
    order: ByteOrder,
) -> Vec<u8> {
    let bytes = bits_per_pixel as usize / 8;
    let pad = scanline_pad.max(8) as usize;
    let stride = (frame.width() as usize * bits_per_pixel as usize).div_ceil(pad) * pad / 8;

    let mut data = vec![0u8; stride * frame.height() as usize];
    for (row, line) in frame.pixels().chunks(frame.width() as usize).enumerate() {
        for (col, &rgb) in line.iter().enumerate() {
            let value = masks.pack(rgb);
            let start = row * stride + col * bytes;
            let out = &mut data[start..start + bytes];
            match order {
                ByteOrder::LsbFirst => out.copy_from_slice(&value.to_le_bytes()[..bytes]),
                ByteOrder::MsbFirst => out.copy_from_slice(&value.to_be_bytes()[4 - bytes..]),
            }
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Color;
    use crate::pixel::{NativeImage, PixelFormat};

    const RGB888: ChannelMasks = ChannelMasks {
        red: 0xff0000,
        green: 0x00ff00,
        blue: 0x0000ff,
    };
    const RGB565: ChannelMasks = ChannelMasks {
        red: 0xf800,
        green: 0x07e0,
        blue: 0x001f,
    };
    const RGB555: ChannelMasks = ChannelMasks {
        red: 0x7c00,
        green: 0x03e0,
        blue: 0x001f,
    };

    fn image_16bpp(width: u16, height: u16, data: Vec<u8>) -> NativeImage {
        NativeImage {
            width,
            height,
            depth: 16,
            bits_per_pixel: 16,
            scanline_pad: 32,
            byte_order: ByteOrder::LsbFirst,
            masks: None,
            data,
        }
    }

    #[test]
    fn test_encode_32bpp_lsb() {
        let mut frame = Bitmap::filled(2, 1, Color::BLACK);
        frame.set_pixel(1, 0, 0x123456);
        let data = encode_frame(&frame, 32, 32, RGB888, ByteOrder::LsbFirst);
        assert_eq!(data, vec![0, 0, 0, 0, 0x56, 0x34, 0x12, 0]);
    }

    #[test]
    fn test_encode_16bpp_pads_rows() {
        let frame = Bitmap::filled(3, 2, Color::parse("#ff0000").unwrap());
        let data = encode_frame(&frame, 16, 32, RGB565, ByteOrder::MsbFirst);
        // 6 bytes of pixels padded to 8 per row
        assert_eq!(data.len(), 16);
        assert_eq!(&data[..2], &[0xf8, 0x00]);
        assert_eq!(&data[6..8], &[0, 0]);
    }

    #[test]
    fn test_encoded_frame_reads_back_through_decoder() {
        let mut frame = Bitmap::filled(3, 2, Color::WHITE);
        frame.set_pixel(2, 1, 0xf80000);
        let data = encode_frame(&frame, 16, 32, RGB565, ByteOrder::LsbFirst);
        let image = image_16bpp(3, 2, data);
        assert_eq!(PixelFormat::Rgb565.decode(image.pixel(2, 1)), 0xf80000);
        assert_eq!(PixelFormat::Rgb565.decode(image.pixel(0, 0)), 0xf8fcf8);
    }

    #[test]
    fn test_depth15_root_uses_555_layout() {
        let frame = Bitmap::filled(1, 1, Color::parse("#00ff00").unwrap());
        let data = encode_frame(&frame, 16, 32, RGB555, ByteOrder::LsbFirst);
        let image = image_16bpp(1, 1, data);
        assert_eq!(image.pixel(0, 0), 0x03e0);
        assert_eq!(PixelFormat::Rgb555.decode(image.pixel(0, 0)), 0x00f800);

        let frame = Bitmap::filled(1, 1, Color::parse("#ff0000").unwrap());
        let data = encode_frame(&frame, 16, 32, RGB555, ByteOrder::LsbFirst);
        let decoded = PixelFormat::Rgb555.decode(image_16bpp(1, 1, data).pixel(0, 0));
        assert_eq!(decoded, 0xf80000);
    }
}
