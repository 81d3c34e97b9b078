//! In-memory RGB32 bitmaps, colors and screen rectangles.

/// Packed `0xAARRGGBB` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u32);

impl Color {
    pub const WHITE: Color = Color(0xff_ff_ff_ff);
    pub const BLACK: Color = Color(0xff_00_00_00);

    /// Parse `#RRGGBB` (opaque) or `#AARRGGBB`.
    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(hex, 16).ok()?;
        match hex.len() {
            6 => Some(Color(0xff00_0000 | value)),
            8 => Some(Color(value)),
            _ => None,
        }
    }

    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(self) -> u8 {
        self.0 as u8
    }

    /// Color channels without alpha, as stored in a [`Bitmap`].
    pub fn rgb(self) -> u32 {
        self.0 & 0x00ff_ffff
    }
}

/// Screen-relative rectangle, in X11 coordinate types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub fn new(x: i16, y: i16, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }
}

/// Row-major RGB32 image. The top byte of each pixel is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bitmap {
    width: u16,
    height: u16,
    pixels: Vec<u32>,
}

impl Bitmap {
    pub fn filled(width: u16, height: u16, color: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![color.rgb(); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn is_null(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u16, y: u16) -> u32 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn set_pixel(&mut self, x: u16, y: u16, value: u32) {
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels[idx] = value & 0x00ff_ffff;
    }

    /// Copy out `rect`. The result always has `rect`'s size; anything
    /// falling outside this bitmap is filled with `pad`.
    pub fn region(&self, rect: Rect, pad: Color) -> Bitmap {
        let mut out = Bitmap::filled(rect.width, rect.height, pad);

        // Intersection in source coordinates
        let left = (rect.x as i32).max(0);
        let top = (rect.y as i32).max(0);
        let right = (rect.x as i32 + rect.width as i32).min(self.width as i32);
        let bottom = (rect.y as i32 + rect.height as i32).min(self.height as i32);
        if left >= right || top >= bottom {
            return out;
        }

        let span = (right - left) as usize;
        for sy in top..bottom {
            let src = sy as usize * self.width as usize + left as usize;
            let dy = (sy - rect.y as i32) as usize;
            let dx = (left - rect.x as i32) as usize;
            let dst = dy * rect.width as usize + dx;
            out.pixels[dst..dst + span].copy_from_slice(&self.pixels[src..src + span]);
        }
        out
    }

    /// Source-over blend of a flat color across the whole bitmap.
    pub fn blend(&mut self, color: Color) {
        let a = color.alpha() as u32;
        if a == 0 {
            return;
        }
        if a == 255 {
            self.pixels.fill(color.rgb());
            return;
        }
        let (r, g, b) = (color.red() as u32, color.green() as u32, color.blue() as u32);
        for p in self.pixels.iter_mut() {
            let mix = |src: u32, dst: u32| (src * a + dst * (255 - a) + 127) / 255;
            let dr = mix(r, (*p >> 16) & 0xff);
            let dg = mix(g, (*p >> 8) & 0xff);
            let db = mix(b, *p & 0xff);
            *p = dr << 16 | dg << 8 | db;
        }
    }
}
