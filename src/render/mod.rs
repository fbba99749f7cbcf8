//! Turning images and status text into panel frames.

pub mod fonts;
pub mod frame;
pub mod layout;

use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use image::imageops::{self, BiLevel};
use image::{DynamicImage, GrayImage, ImageError, ImageReader, Rgba, RgbaImage};
use tracing::{debug, info, warn};

use crate::events::ImageOutcome;
use crate::platform::panel::Panel;
use fonts::Fonts;
use frame::{Color, DisplayFrame};

/// Everything the control loop can put on screen.
pub trait Screen {
    /// Show an image file with its name as caption. A file that is gone or
    /// does not decode yields [`ImageOutcome::Unavailable`] and leaves the
    /// panel untouched; a file that exists but cannot be opened is an error.
    fn show_image(&mut self, path: &Path) -> Result<ImageOutcome>;
    /// Show a bracketed status banner.
    fn show_message(&mut self, text: &str) -> Result<()>;
    /// List the pending queue beside the button legend.
    fn show_queue(&mut self, entries: &[&Path]) -> Result<()>;
    /// Put the hardware in a safe state before the process exits.
    fn shutdown(&mut self) -> Result<()>;
}

/// Renders onto a [`Panel`], putting it back to sleep after every refresh.
pub struct Renderer<P: Panel> {
    panel: P,
    fonts: Fonts,
    version: String,
}

impl<P: Panel> Renderer<P> {
    pub fn new(panel: P, fonts: Fonts, version: impl Into<String>) -> Self {
        Self {
            panel,
            fonts,
            version: version.into(),
        }
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    fn blank(&self) -> DisplayFrame {
        let (w, h) = self.panel.size();
        DisplayFrame::new(w, h)
    }

    /// Compose an image frame: centered picture plus bottom-left caption.
    pub fn compose_image(&self, img: &DynamicImage, caption: &str) -> DisplayFrame {
        let mut frame = self.blank();
        let mono = to_monochrome(img);
        let (x, y) = layout::centered_origin(
            (frame.width(), frame.height()),
            (mono.width(), mono.height()),
        );
        frame.paste(&mono, x, y);

        let small = &self.fonts.small;
        let bar = layout::caption_bar(
            (frame.width(), frame.height()),
            small.width(caption),
            font_px(self.fonts.small.px()),
        );
        frame.fill_rect(bar.x0, bar.y0, bar.x1, bar.y1, Color::White);
        let (tx, ty) = bar.text_origin();
        small.draw(&mut frame, tx, ty, caption, Color::Black);
        frame
    }

    /// Compose a status banner: white text on a black bar.
    pub fn compose_message(&self, text: &str) -> DisplayFrame {
        let mut frame = self.blank();
        let banner = format!("[{text}]");
        let large = &self.fonts.large;
        let bar = layout::message_bar(
            (frame.width(), frame.height()),
            large.width(&banner),
            font_px(self.fonts.large.px()),
        );
        frame.fill_rect(bar.x0, bar.y0, bar.x1, bar.y1, Color::Black);
        let (tx, ty) = bar.text_origin();
        large.draw(&mut frame, tx, ty, &banner, Color::White);
        frame
    }

    /// Compose the queue overview: legend on the left, numbered rows on the right.
    pub fn compose_queue(&self, entries: &[&Path]) -> DisplayFrame {
        let mut frame = self.blank();
        frame.vline(layout::INDEX_DIVIDER_X, Color::Black);
        frame.vline(layout::NAME_DIVIDER_X, Color::Black);
        for y in layout::row_rules(frame.height()) {
            frame.hline(y, layout::INDEX_DIVIDER_X, Color::Black);
        }

        let large = &self.fonts.large;
        let rows = layout::overview_rows(frame.height());
        for (row, path) in entries.iter().take(rows).enumerate() {
            let y = layout::row_text_y(row);
            large.draw(
                &mut frame,
                layout::INDEX_DIVIDER_X + 4,
                y,
                &(row + 1).to_string(),
                Color::Black,
            );
            large.draw(
                &mut frame,
                layout::NAME_DIVIDER_X + 4,
                y,
                &file_name(path),
                Color::Black,
            );
        }

        for (y, text) in layout::LEGEND {
            large.draw(&mut frame, 2, y, text, Color::Black);
        }
        let version_y = i64::from(frame.height()) - i64::from(font_px(self.fonts.small.px()));
        self.fonts.small.draw(
            &mut frame,
            layout::BAR_PADDING,
            version_y,
            &format!("v{}", self.version),
            Color::Black,
        );
        frame
    }

    /// Full refresh: wake, clear, draw, sleep. The panel is put to sleep
    /// even when drawing fails.
    fn push(&mut self, frame: &DisplayFrame) -> Result<()> {
        self.panel.init().context("panel init failed")?;
        let shown = self
            .panel
            .clear(Color::White)
            .and_then(|()| self.panel.display(frame));
        let slept = self.panel.sleep().context("panel sleep failed");
        shown.context("panel refresh failed")?;
        slept
    }
}

impl<P: Panel> Screen for Renderer<P> {
    fn show_image(&mut self, path: &Path) -> Result<ImageOutcome> {
        // Only the open can fault. Truncated or half-copied data is unavailable.
        let reader = match ImageReader::open(path) {
            Ok(reader) => reader,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "image vanished before display");
                return Ok(ImageOutcome::Unavailable);
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to open {}", path.display()));
            }
        };
        let decoded = reader
            .with_guessed_format()
            .map_err(ImageError::IoError)
            .and_then(ImageReader::decode);
        let img = match decoded {
            Ok(img) => img,
            Err(err) => {
                warn!(path = %path.display(), "image could not be decoded: {err}");
                return Ok(ImageOutcome::Unavailable);
            }
        };
        let frame = self.compose_image(&img, &caption(path));
        self.push(&frame)?;
        info!(path = %path.display(), "image displayed");
        Ok(ImageOutcome::Displayed)
    }

    fn show_message(&mut self, text: &str) -> Result<()> {
        let frame = self.compose_message(text);
        self.push(&frame)?;
        info!(message = text, "message displayed");
        Ok(())
    }

    fn show_queue(&mut self, entries: &[&Path]) -> Result<()> {
        let frame = self.compose_queue(entries);
        self.push(&frame)?;
        debug!(entries = entries.len(), "queue overview displayed");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        let slept = self.panel.sleep();
        self.panel.release().context("panel release failed")?;
        slept
    }
}

/// Flatten transparency onto white and dither down to black and white.
pub fn to_monochrome(img: &DynamicImage) -> GrayImage {
    let mut flat = RgbaImage::from_pixel(img.width(), img.height(), Rgba([255, 255, 255, 255]));
    imageops::overlay(&mut flat, &img.to_rgba8(), 0, 0);
    let mut gray = DynamicImage::ImageRgba8(flat).to_luma8();
    imageops::dither(&mut gray, &BiLevel);
    gray
}

/// File name without directory or extension.
pub fn caption(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn font_px(px: f32) -> u32 {
    px.round().max(1.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, LumaA};
    use std::path::PathBuf;

    #[test]
    fn caption_drops_directory_and_extension() {
        assert_eq!(caption(Path::new("/share/sub/sunset.final.png")), "sunset.final");
        assert_eq!(caption(Path::new("/share/noext")), "noext");
    }

    #[test]
    fn transparent_pixels_become_white() {
        let mut img = image::ImageBuffer::from_pixel(2, 1, LumaA([0u8, 0]));
        img.put_pixel(1, 0, LumaA([0, 255]));
        let mono = to_monochrome(&DynamicImage::ImageLumaA8(img));
        assert_eq!(*mono.get_pixel(0, 0), Luma([255]));
        assert_eq!(*mono.get_pixel(1, 0), Luma([0]));
    }

    #[test]
    fn monochrome_output_is_bilevel() {
        let img = image::GrayImage::from_fn(16, 16, |x, y| Luma([((x + y) * 8) as u8]));
        let mono = to_monochrome(&DynamicImage::ImageLuma8(img));
        assert!(mono.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn file_name_keeps_extension() {
        assert_eq!(file_name(&PathBuf::from("/a/b/c.jpeg")), "c.jpeg");
    }
}
