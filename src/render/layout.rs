//! Screen geometry shared by the renderers.

/// Left padding inside caption and message bars.
pub const BAR_PADDING: i64 = 4;

/// Overview: x of the divider left of the index column.
pub const INDEX_DIVIDER_X: i64 = 62;
/// Overview: x of the divider between index and file name.
pub const NAME_DIVIDER_X: i64 = 80;
/// Overview: height of one queue row.
pub const ROW_HEIGHT: i64 = 22;
/// Overview: text inset from the top of a row.
pub const ROW_TEXT_INSET: i64 = 4;

/// Overview legend lines as `(y, text)`; one pair per button.
pub const LEGEND: [(i64, &str); 8] = [
    (4, "BTN1:"),
    (20, "Queue"),
    (40, "BTN2:"),
    (56, "Next"),
    (76, "BTN3:"),
    (92, "Latest"),
    (112, "BTN4:"),
    (128, "Reload"),
];

/// Top-left position that centers an image on the canvas.
///
/// Horizontal offsets round up and vertical offsets round down, nudging odd
/// leftovers toward the top-right, away from the bottom-left caption.
/// Offsets go negative when the image is larger than the canvas.
#[must_use]
pub fn centered_origin(canvas: (u32, u32), image: (u32, u32)) -> (i64, i64) {
    let dx = i64::from(canvas.0) - i64::from(image.0);
    let dy = i64::from(canvas.1) - i64::from(image.1);
    (div_ceil_2(dx), dy.div_euclid(2))
}

fn div_ceil_2(v: i64) -> i64 {
    -((-v).div_euclid(2))
}

/// An axis-aligned, inclusive rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bar {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

impl Bar {
    /// Where the text inside the bar starts.
    #[must_use]
    pub const fn text_origin(&self) -> (i64, i64) {
        (self.x0 + BAR_PADDING, self.y0)
    }
}

/// Bottom-left caption bar for a text `text_width` wide in a font of
/// `font_px` pixels.
#[must_use]
pub fn caption_bar(canvas: (u32, u32), text_width: u32, font_px: u32) -> Bar {
    let h = i64::from(canvas.1);
    Bar {
        x0: 0,
        y0: h - i64::from(font_px),
        x1: 2 * BAR_PADDING + i64::from(text_width),
        y1: h - 1,
    }
}

/// Message banner along the bottom edge, centered horizontally.
#[must_use]
pub fn message_bar(canvas: (u32, u32), text_width: u32, font_px: u32) -> Bar {
    let (w, h) = (i64::from(canvas.0), i64::from(canvas.1));
    let bar_w = 2 * BAR_PADDING + i64::from(text_width);
    let x0 = ((w - bar_w) / 2).max(0);
    Bar {
        x0,
        y0: h - i64::from(font_px),
        x1: x0 + bar_w,
        y1: h - 1,
    }
}

/// Number of queue rows that fit on the overview.
#[must_use]
pub fn overview_rows(canvas_height: u32) -> usize {
    (i64::from(canvas_height) / ROW_HEIGHT).max(0) as usize
}

/// y coordinates of the rules separating overview rows.
pub fn row_rules(canvas_height: u32) -> impl Iterator<Item = i64> {
    (1..overview_rows(canvas_height) as i64).map(|row| row * ROW_HEIGHT)
}

/// Top of the text in overview row `row` (zero-based).
#[must_use]
pub const fn row_text_y(row: usize) -> i64 {
    row as i64 * ROW_HEIGHT + ROW_TEXT_INSET
}
