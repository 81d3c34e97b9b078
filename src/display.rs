//! The X11 primitives the background cache depends on.
//!
//! `XConnection` implements this against a live server; the cache and the
//! locator only ever see the trait, so they can run against a fake display
//! in tests.

use x11rb::protocol::xproto::{Atom, Pixmap, Window};

use crate::error::Result;
use crate::pixel::{ChannelMasks, NativeImage};

/// A window property read as 32-bit items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowProperty {
    pub type_: Atom,
    pub values: Vec<u32>,
}

pub trait DesktopDisplay {
    /// Window of the desktop, where the tree walk starts.
    fn root_window(&self) -> Window;

    /// Size of the whole screen in pixels.
    fn screen_size(&self) -> (u16, u16);

    /// Look up an atom without creating it. `None` if the server has never
    /// seen the name.
    fn existing_atom(&self, name: &[u8]) -> Result<Option<Atom>>;

    /// Read a property. `None` if the window does not carry it or it is
    /// empty.
    fn property(&self, window: Window, atom: Atom) -> Result<Option<WindowProperty>>;

    /// Parent of `window`, `None` at the top of the tree.
    fn parent(&self, window: Window) -> Result<Option<Window>>;

    /// Start or stop receiving PropertyNotify for `window`.
    fn watch_properties(&self, window: Window, enable: bool) -> Result<()>;

    fn pixmap_size(&self, pixmap: Pixmap) -> Result<(u16, u16)>;

    /// Fetch the full contents of `pixmap` in ZPixmap format.
    fn fetch_image(&self, pixmap: Pixmap, width: u16, height: u16) -> Result<NativeImage>;

    /// Channel masks of the screen's default visual.
    fn default_masks(&self) -> ChannelMasks;
}
