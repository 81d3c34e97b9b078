//! Cached copy of the desktop background, for pseudo-transparency.

use x11rb::protocol::xproto::{Atom, AtomEnum, Window};
use x11rb::protocol::Event;

use crate::bitmap::{Bitmap, Color, Rect};
use crate::display::DesktopDisplay;
use crate::error::{BackdropError, Result};
use crate::locator::DesktopLocator;
use crate::pixel::PixelFormat;

/// Holds the current desktop wallpaper as a bitmap.
///
/// Owned by the application and handed to widgets by reference. It is only
/// written by [`BackgroundCache::reload`]; every failure to read the
/// wallpaper leaves a screen-sized bitmap in the fill color instead.
pub struct BackgroundCache {
    bitmap: Bitmap,
    locator: DesktopLocator,
    fill: Color,
    /// Bumped after every reload so consumers can tell the background changed
    generation: u64,
}

impl BackgroundCache {
    pub fn new(fill: Color) -> Self {
        Self {
            bitmap: Bitmap::default(),
            locator: DesktopLocator::new(),
            fill,
            generation: 0,
        }
    }

    /// True once a reload has produced a bitmap, wallpaper or fallback.
    pub fn is_valid(&self) -> bool {
        !self.bitmap.is_null()
    }

    pub fn full_bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Background under `rect`, always exactly `rect`'s size. Areas outside
    /// the cached bitmap come out in the fill color.
    pub fn region_at(&self, rect: Rect) -> Bitmap {
        self.bitmap.region(rect, self.fill)
    }

    /// Re-read the wallpaper from the server. Never fails: on any error the
    /// cache holds a solid bitmap the size of the screen.
    pub fn reload(&mut self, display: &impl DesktopDisplay) {
        self.bitmap = Bitmap::default();

        match self.load(display) {
            Ok(bitmap) => self.bitmap = bitmap,
            Err(e) => {
                match &e {
                    BackdropError::NoRootPixmapAtom | BackdropError::DesktopWindowNotFound => {
                        log::info!("No desktop background available: {}", e);
                    }
                    _ => log::debug!("Failed to load desktop background: {}", e),
                }
                let (width, height) = display.screen_size();
                self.bitmap = Bitmap::filled(width, height, self.fill);
            }
        }

        self.generation += 1;
        log::debug!(
            "Background reloaded ({}x{}, generation {})",
            self.bitmap.width(),
            self.bitmap.height(),
            self.generation
        );
    }

    fn load(&mut self, display: &impl DesktopDisplay) -> Result<Bitmap> {
        let (window, atom) = self.locator.locate(display)?;

        let property = display
            .property(window, atom)?
            .ok_or(BackdropError::DesktopWindowNotFound)?;
        if property.type_ != u32::from(AtomEnum::PIXMAP) {
            return Err(BackdropError::NotAPixmap(property.type_));
        }
        let pixmap = match property.values.first() {
            Some(&pixmap) if pixmap != x11rb::NONE => pixmap,
            _ => return Err(BackdropError::NullPixmap),
        };

        let (width, height) = display.pixmap_size(pixmap)?;
        if width == 0 || height == 0 {
            return Err(BackdropError::EmptyPixmap(width, height));
        }

        let image = display.fetch_image(pixmap, width, height)?;
        let (format, bitmap) = image.decode_into_bitmap(display.default_masks());
        if format == PixelFormat::Unknown {
            log::warn!(
                "Unsupported root pixmap format ({} bpp, depth {}), background will be black",
                image.bits_per_pixel,
                image.depth
            );
        } else {
            log::debug!("Decoded root pixmap 0x{:x} as {:?}", pixmap, format);
        }
        Ok(bitmap)
    }

    /// Reload if the change is to the watched desktop property.
    /// Returns true when the background was reloaded.
    pub fn handle_property_change(
        &mut self,
        display: &impl DesktopDisplay,
        window: Window,
        atom: Atom,
    ) -> bool {
        if !self.locator.watches(window, atom) {
            return false;
        }
        log::info!("Desktop background changed, reloading");
        self.reload(display);
        true
    }

    /// Event loop entry point. Only PropertyNotify is of interest.
    pub fn handle_event(&mut self, display: &impl DesktopDisplay, event: &Event) -> bool {
        match event {
            Event::PropertyNotify(e) => self.handle_property_change(display, e.window, e.atom),
            _ => false,
        }
    }
}
