use x11rb::atom_manager;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use crate::display::{DesktopDisplay, WindowProperty};
use crate::error::Result;
use crate::pixel::{ByteOrder, ChannelMasks, NativeImage};

atom_manager! {
    pub Atoms: AtomsCookie {
        WM_PROTOCOLS,
        WM_DELETE_WINDOW,
        UTF8_STRING,
        _NET_WM_NAME,
    }
}

pub struct XConnection {
    pub conn: RustConnection,
    pub screen_num: usize,
    pub atoms: Atoms,
    pub root: Window,
    pub screen_width: u16,
    pub screen_height: u16,
    pub root_depth: u8,
    pub root_visual: Visualid,
    pub root_masks: ChannelMasks,
}

impl XConnection {
    pub fn new() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None)?;
        let screen = &conn.setup().roots[screen_num];

        let atoms = Atoms::new(&conn)?.reply()?;

        let root_masks = find_visual_masks(screen, screen.root_visual).unwrap_or_default();
        log::info!(
            "Root visual 0x{:x}, depth {}, masks r=0x{:x} g=0x{:x} b=0x{:x}",
            screen.root_visual,
            screen.root_depth,
            root_masks.red,
            root_masks.green,
            root_masks.blue
        );

        Ok(Self {
            root: screen.root,
            screen_width: screen.width_in_pixels,
            screen_height: screen.height_in_pixels,
            root_depth: screen.root_depth,
            root_visual: screen.root_visual,
            root_masks,
            conn,
            screen_num,
            atoms,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }

    pub fn generate_id(&self) -> Result<u32> {
        Ok(self.conn.generate_id()?)
    }

    /// Bits per pixel and scanline pad the server uses for `depth`.
    pub fn pixmap_format(&self, depth: u8) -> Option<(u8, u8)> {
        self.conn
            .setup()
            .pixmap_formats
            .iter()
            .find(|f| f.depth == depth)
            .map(|f| (f.bits_per_pixel, f.scanline_pad))
    }

    pub fn byte_order(&self) -> ByteOrder {
        if self.conn.setup().image_byte_order == ImageOrder::MSB_FIRST {
            ByteOrder::MsbFirst
        } else {
            ByteOrder::LsbFirst
        }
    }
}

/// Channel masks of a visual on this screen.
fn find_visual_masks(screen: &Screen, visual: Visualid) -> Option<ChannelMasks> {
    screen
        .allowed_depths
        .iter()
        .flat_map(|d| d.visuals.iter())
        .find(|v| v.visual_id == visual)
        .map(|v| ChannelMasks {
            red: v.red_mask,
            green: v.green_mask,
            blue: v.blue_mask,
        })
}

impl DesktopDisplay for XConnection {
    fn root_window(&self) -> Window {
        self.root
    }

    fn screen_size(&self) -> (u16, u16) {
        (self.screen_width, self.screen_height)
    }

    fn existing_atom(&self, name: &[u8]) -> Result<Option<Atom>> {
        let reply = self.conn.intern_atom(true, name)?.reply()?;
        if reply.atom == x11rb::NONE {
            Ok(None)
        } else {
            Ok(Some(reply.atom))
        }
    }

    fn property(&self, window: Window, atom: Atom) -> Result<Option<WindowProperty>> {
        let reply = self
            .conn
            .get_property(false, window, atom, AtomEnum::ANY, 0, 1)?
            .reply()?;

        if reply.type_ == u32::from(AtomEnum::NONE) || reply.value_len == 0 {
            return Ok(None);
        }

        let values: Vec<u32> = match reply.value32() {
            Some(values) => values.collect(),
            None => return Ok(None),
        };
        Ok(Some(WindowProperty {
            type_: reply.type_,
            values,
        }))
    }

    fn parent(&self, window: Window) -> Result<Option<Window>> {
        let tree = self.conn.query_tree(window)?.reply()?;
        if tree.parent == x11rb::NONE || window == tree.root {
            Ok(None)
        } else {
            Ok(Some(tree.parent))
        }
    }

    fn watch_properties(&self, window: Window, enable: bool) -> Result<()> {
        // Keep whatever else this client already selected on the window
        let attrs = self.conn.get_window_attributes(window)?.reply()?;
        let current = u32::from(attrs.your_event_mask);
        let property = u32::from(EventMask::PROPERTY_CHANGE);
        let mask = if enable {
            current | property
        } else {
            current & !property
        };

        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::from(mask)),
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn pixmap_size(&self, pixmap: Pixmap) -> Result<(u16, u16)> {
        let geom = self.conn.get_geometry(pixmap)?.reply()?;
        Ok((geom.width, geom.height))
    }

    fn fetch_image(&self, pixmap: Pixmap, width: u16, height: u16) -> Result<NativeImage> {
        // ZPixmap is not derived from the pixmap's layout. It is the format
        // observed to work across servers, and decoding assumes it.
        let reply = self
            .conn
            .get_image(ImageFormat::Z_PIXMAP, pixmap, 0, 0, width, height, !0)?
            .reply()?;

        let (bits_per_pixel, scanline_pad) = self
            .pixmap_format(reply.depth)
            .unwrap_or((reply.depth, 32));

        let screen = &self.conn.setup().roots[self.screen_num];
        let masks = if reply.visual == x11rb::NONE {
            None
        } else {
            find_visual_masks(screen, reply.visual)
        };

        log::debug!(
            "Fetched pixmap 0x{:x}: {}x{} depth {} bpp {} pad {} ({} bytes)",
            pixmap,
            width,
            height,
            reply.depth,
            bits_per_pixel,
            scanline_pad,
            reply.data.len()
        );

        Ok(NativeImage {
            width,
            height,
            depth: reply.depth,
            bits_per_pixel,
            scanline_pad,
            byte_order: self.byte_order(),
            masks,
            data: reply.data,
        })
    }

    fn default_masks(&self) -> ChannelMasks {
        self.root_masks
    }
}
