use x11rb::protocol::xproto::{Atom, Window};

use crate::display::DesktopDisplay;
use crate::error::{BackdropError, Result};

/// Property under which the desktop background pixmap is published.
pub const ROOT_PIXMAP_PROPERTY: &[u8] = b"_XROOTPMAP_ID";

/// Finds the window that publishes the desktop background pixmap and keeps
/// PropertyNotify selected on it.
#[derive(Debug, Default)]
pub struct DesktopLocator {
    root_pixmap_atom: Option<Atom>,
    desktop: Option<Window>,
}

impl DesktopLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently watched window, if any.
    #[cfg(test)]
    pub fn desktop(&self) -> Option<Window> {
        self.desktop
    }

    /// Whether a property change on `window` for `atom` concerns the
    /// background.
    pub fn watches(&self, window: Window, atom: Atom) -> bool {
        self.desktop == Some(window) && self.root_pixmap_atom == Some(atom)
    }

    /// Walk upward from the desktop window until a window carries the root
    /// pixmap property.
    pub fn locate(&mut self, display: &impl DesktopDisplay) -> Result<(Window, Atom)> {
        let atom = match self.root_pixmap_atom {
            Some(atom) => atom,
            None => {
                let atom = display
                    .existing_atom(ROOT_PIXMAP_PROPERTY)?
                    .ok_or(BackdropError::NoRootPixmapAtom)?;
                self.root_pixmap_atom = Some(atom);
                atom
            }
        };

        let mut candidate = Some(display.root_window());
        while let Some(window) = candidate {
            if display.property(window, atom)?.is_some() {
                self.watch(display, window)?;
                return Ok((window, atom));
            }
            candidate = display.parent(window)?;
        }

        log::debug!("No window carries the root pixmap property");
        Err(BackdropError::DesktopWindowNotFound)
    }

    fn watch(&mut self, display: &impl DesktopDisplay, window: Window) -> Result<()> {
        if self.desktop == Some(window) {
            return Ok(());
        }

        if let Some(old) = self.desktop.take() {
            log::debug!("Desktop window moved from 0x{:x} to 0x{:x}", old, window);
            if let Err(e) = display.watch_properties(old, false) {
                // The old window may already be gone
                log::debug!("Failed to unwatch 0x{:x}: {}", old, e);
            }
        }

        display.watch_properties(window, true)?;
        self.desktop = Some(window);
        log::info!("Watching desktop window 0x{:x} for background changes", window);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory display used by the locator and cache tests.

    use std::cell::RefCell;
    use std::collections::HashMap;

    use x11rb::protocol::xproto::{Atom, AtomEnum, Pixmap, Window};

    use crate::display::{DesktopDisplay, WindowProperty};
    use crate::error::{BackdropError, Result};
    use crate::pixel::{ByteOrder, ChannelMasks, NativeImage};

    pub const ROOT: Window = 1;
    pub const ROOT_PMAP_ATOM: Atom = 300;

    #[derive(Default)]
    pub struct FakeDisplay {
        pub screen: (u16, u16),
        pub atoms: HashMap<Vec<u8>, Atom>,
        pub parents: HashMap<Window, Window>,
        pub properties: HashMap<(Window, Atom), WindowProperty>,
        /// pixmap -> (width, height, 32bpp pixels)
        pub pixmaps: HashMap<Pixmap, (u16, u16, Vec<u32>)>,
        pub watched: RefCell<Vec<Window>>,
        pub fetches: RefCell<usize>,
    }

    impl FakeDisplay {
        pub fn new(width: u16, height: u16) -> Self {
            Self {
                screen: (width, height),
                ..Default::default()
            }
        }

        pub fn with_atom(mut self) -> Self {
            self.atoms.insert(b"_XROOTPMAP_ID".to_vec(), ROOT_PMAP_ATOM);
            self
        }

        pub fn set_root_pixmap(&mut self, window: Window, pixmap: Pixmap) {
            self.properties.insert(
                (window, ROOT_PMAP_ATOM),
                WindowProperty {
                    type_: AtomEnum::PIXMAP.into(),
                    values: vec![pixmap],
                },
            );
        }
    }

    impl DesktopDisplay for FakeDisplay {
        fn root_window(&self) -> Window {
            ROOT
        }

        fn screen_size(&self) -> (u16, u16) {
            self.screen
        }

        fn existing_atom(&self, name: &[u8]) -> Result<Option<Atom>> {
            Ok(self.atoms.get(name).copied())
        }

        fn property(&self, window: Window, atom: Atom) -> Result<Option<WindowProperty>> {
            Ok(self.properties.get(&(window, atom)).cloned())
        }

        fn parent(&self, window: Window) -> Result<Option<Window>> {
            Ok(self.parents.get(&window).copied())
        }

        fn watch_properties(&self, window: Window, enable: bool) -> Result<()> {
            let mut watched = self.watched.borrow_mut();
            if enable {
                watched.push(window);
            } else {
                watched.retain(|&w| w != window);
            }
            Ok(())
        }

        fn pixmap_size(&self, pixmap: Pixmap) -> Result<(u16, u16)> {
            self.pixmaps
                .get(&pixmap)
                .map(|(w, h, _)| (*w, *h))
                .ok_or_else(|| BackdropError::Other(format!("bad pixmap {}", pixmap)))
        }

        fn fetch_image(&self, pixmap: Pixmap, width: u16, height: u16) -> Result<NativeImage> {
            *self.fetches.borrow_mut() += 1;
            let (_, _, pixels) = self
                .pixmaps
                .get(&pixmap)
                .ok_or_else(|| BackdropError::Other(format!("bad pixmap {}", pixmap)))?;
            Ok(NativeImage {
                width,
                height,
                depth: 24,
                bits_per_pixel: 32,
                scanline_pad: 32,
                byte_order: ByteOrder::LsbFirst,
                masks: None,
                data: pixels.iter().flat_map(|p| p.to_le_bytes()).collect(),
            })
        }

        fn default_masks(&self) -> ChannelMasks {
            ChannelMasks {
                red: 0xff0000,
                green: 0x00ff00,
                blue: 0x0000ff,
            }
        }
    }
}
