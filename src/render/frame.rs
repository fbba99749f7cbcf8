//! Monochrome canvas sized to the panel.

use image::{GrayImage, Luma};

/// The two inks an e-paper panel knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black,
    White,
}

impl Color {
    const fn luma(self) -> u8 {
        match self {
            Self::Black => 0,
            Self::White => 255,
        }
    }
}

/// One screenful of pixels, built fresh for every render.
///
/// Pixels are stored as 8-bit luma restricted to 0 and 255 so the frame can
/// be saved or blitted with the `image` crate directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFrame {
    pixels: GrayImage,
}

impl DisplayFrame {
    /// An all-white frame.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: GrayImage::from_pixel(width, height, Luma([Color::White.luma()])),
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let Luma([v]) = *self.pixels.get_pixel(x, y);
        Some(if v < 128 { Color::Black } else { Color::White })
    }

    /// Set one pixel; coordinates off the canvas are ignored.
    pub fn set(&mut self, x: i64, y: i64, color: Color) {
        if x < 0 || y < 0 || x >= i64::from(self.width()) || y >= i64::from(self.height()) {
            return;
        }
        self.pixels
            .put_pixel(x as u32, y as u32, Luma([color.luma()]));
    }

    /// Fill the rectangle spanning `x0..=x1`, `y0..=y1`, clipped to the canvas.
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Color) {
        let (x0, x1) = (x0.max(0), x1.min(i64::from(self.width()) - 1));
        let (y0, y1) = (y0.max(0), y1.min(i64::from(self.height()) - 1));
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.set(x, y, color);
            }
        }
    }

    pub fn vline(&mut self, x: i64, color: Color) {
        self.fill_rect(x, 0, x, i64::from(self.height()) - 1, color);
    }

    /// Horizontal rule from `x_from` to the right edge.
    pub fn hline(&mut self, y: i64, x_from: i64, color: Color) {
        self.fill_rect(x_from, y, i64::from(self.width()) - 1, y, color);
    }

    /// Copy a bilevel image onto the canvas with its top-left at `(x, y)`.
    /// Parts outside the canvas are dropped.
    pub fn paste(&mut self, img: &GrayImage, x: i64, y: i64) {
        image::imageops::replace(&mut self.pixels, img, x, y);
    }

    #[must_use]
    pub fn as_image(&self) -> &GrayImage {
        &self.pixels
    }

    /// Driver-native buffer: 1 bit per pixel, MSB first, each row padded to
    /// a whole byte, set bits are white.
    #[must_use]
    pub fn to_packed(&self) -> Vec<u8> {
        let row_bytes = self.width().div_ceil(8) as usize;
        let mut out = vec![0u8; row_bytes * self.height() as usize];
        for (x, y, Luma([v])) in self.pixels.enumerate_pixels() {
            if *v >= 128 {
                let idx = y as usize * row_bytes + (x / 8) as usize;
                out[idx] |= 0x80 >> (x % 8);
            }
        }
        out
    }
}
