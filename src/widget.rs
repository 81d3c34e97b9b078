use crate::background::BackgroundCache;
use crate::bitmap::{Bitmap, Color, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintState {
    /// `local` matches the current geometry, tint and background.
    Clean,
    /// `local` must be recomputed before the next paint.
    Dirty,
}

/// A pseudo-transparent widget: shows the desktop background under its own
/// screen geometry, tinted, with an optional hover highlight.
#[derive(Debug)]
pub struct TransparentWidget {
    /// Geometry in root window coordinates
    geometry: Rect,
    tint: Option<Color>,
    highlight: Option<Color>,
    highlighted: bool,
    state: PaintState,
    local: Bitmap,
}

impl TransparentWidget {
    pub fn new(geometry: Rect, tint: Option<Color>, highlight: Option<Color>) -> Self {
        Self {
            geometry,
            tint,
            highlight,
            highlighted: false,
            state: PaintState::Dirty,
            local: Bitmap::default(),
        }
    }

    pub fn geometry(&self) -> Rect {
        self.geometry
    }

    #[cfg(test)]
    pub fn state(&self) -> PaintState {
        self.state
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    pub fn moved(&mut self, x: i16, y: i16) {
        self.geometry.x = x;
        self.geometry.y = y;
        self.state = PaintState::Dirty;
    }

    pub fn resized(&mut self, width: u16, height: u16) {
        self.geometry.width = width;
        self.geometry.height = height;
        self.state = PaintState::Dirty;
    }

    pub fn shown(&mut self) {
        self.state = PaintState::Dirty;
    }

    /// The shared background was reloaded.
    pub fn background_changed(&mut self) {
        self.state = PaintState::Dirty;
    }

    /// Pointer entered. Returns whether a repaint is needed.
    pub fn enter(&mut self) -> bool {
        self.set_highlighted(true)
    }

    /// Pointer left. Returns whether a repaint is needed.
    pub fn leave(&mut self) -> bool {
        self.set_highlighted(false)
    }

    fn set_highlighted(&mut self, on: bool) -> bool {
        let changed = self.highlighted != on;
        self.highlighted = on;
        changed && self.highlight.is_some()
    }

    /// Produce the frame to draw, recomputing the background first if it is
    /// stale.
    pub fn paint(&mut self, background: &BackgroundCache) -> Bitmap {
        if self.state == PaintState::Dirty {
            let mut local = background.region_at(self.geometry);
            if let Some(tint) = self.tint {
                local.blend(tint);
            }
            self.local = local;
            self.state = PaintState::Clean;
        }

        let mut frame = self.local.clone();
        match self.highlight {
            Some(highlight) if self.highlighted => frame.blend(highlight),
            _ => {}
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::fake::FakeDisplay;

    fn cache(fill: Color) -> BackgroundCache {
        let mut cache = BackgroundCache::new(fill);
        cache.reload(&FakeDisplay::new(100, 100));
        cache
    }

    #[test]
    fn test_dirty_until_painted() {
        let bg = cache(Color::WHITE);
        let mut widget = TransparentWidget::new(Rect::new(0, 0, 10, 10), None, None);
        assert_eq!(widget.state(), PaintState::Dirty);

        widget.paint(&bg);
        assert_eq!(widget.state(), PaintState::Clean);

        widget.moved(5, 5);
        assert_eq!(widget.state(), PaintState::Dirty);
        widget.paint(&bg);
        assert_eq!(widget.state(), PaintState::Clean);

        widget.shown();
        assert_eq!(widget.state(), PaintState::Dirty);
    }

    #[test]
    fn test_no_stale_frame_after_resize() {
        let bg = cache(Color::WHITE);
        let mut widget = TransparentWidget::new(Rect::new(0, 0, 10, 10), None, None);
        let frame = widget.paint(&bg);
        assert_eq!((frame.width(), frame.height()), (10, 10));

        widget.resized(30, 20);
        let frame = widget.paint(&bg);
        assert_eq!((frame.width(), frame.height()), (30, 20));
    }

    #[test]
    fn test_tint_is_applied() {
        let bg = cache(Color::WHITE);
        let mut widget =
            TransparentWidget::new(Rect::new(0, 0, 2, 2), Some(Color(0xff000000)), None);
        let frame = widget.paint(&bg);
        assert!(frame.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_highlight_overlays_without_recompute() {
        let bg = cache(Color::BLACK);
        let mut widget =
            TransparentWidget::new(Rect::new(0, 0, 2, 2), None, Some(Color(0xffffffff)));
        widget.paint(&bg);

        assert!(widget.enter());
        assert_eq!(widget.state(), PaintState::Clean);
        let frame = widget.paint(&bg);
        assert_eq!(frame.pixel(0, 0), 0xffffff);

        // Entering twice is not a change
        assert!(!widget.enter());

        assert!(widget.leave());
        let frame = widget.paint(&bg);
        assert_eq!(frame.pixel(0, 0), 0x000000);
    }

    #[test]
    fn test_hover_without_highlight_color_needs_no_repaint() {
        let mut widget = TransparentWidget::new(Rect::new(0, 0, 2, 2), None, None);
        assert!(!widget.enter());
        assert!(widget.is_highlighted());
        assert!(!widget.leave());
    }

    #[test]
    fn test_background_change_recomputes() {
        let mut bg = cache(Color::WHITE);
        let mut widget = TransparentWidget::new(Rect::new(0, 0, 2, 2), None, None);
        assert_eq!(widget.paint(&bg).pixel(0, 0), 0xffffff);

        bg = cache(Color::BLACK);
        widget.background_changed();
        assert_eq!(widget.paint(&bg).pixel(0, 0), 0x000000);
    }
}
