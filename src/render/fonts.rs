use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use ab_glyph::{Font, FontArc, FontVec, PxScale, ScaleFont, point};
use fontdb::{Database, Family, Query, Source};
use tracing::{info, warn};

use super::frame::{Color, DisplayFrame};
use crate::error::Error;

/// A font at one pixel size.
#[derive(Clone)]
pub struct Typeface {
    font: FontArc,
    scale: PxScale,
}

impl Typeface {
    pub fn new(font: FontArc, px: f32) -> Self {
        Self {
            font,
            scale: PxScale::from(px),
        }
    }

    #[must_use]
    pub fn px(&self) -> f32 {
        self.scale.y
    }

    /// Advance width of `text` in whole pixels.
    #[must_use]
    pub fn width(&self, text: &str) -> u32 {
        let scaled = self.font.as_scaled(self.scale);
        let mut width = 0.0f32;
        let mut previous = None;
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            previous = Some(id);
        }
        width.ceil().max(0.0) as u32
    }

    /// Draw `text` with its top edge at `y`. Coverage below one half is
    /// left untouched so glyphs stay crisp on a bilevel panel.
    pub fn draw(&self, frame: &mut DisplayFrame, x: i64, y: i64, text: &str, color: Color) {
        let scaled = self.font.as_scaled(self.scale);
        let mut caret = point(x as f32, y as f32 + scaled.ascent());
        let mut previous = None;
        for ch in text.chars() {
            let glyph_id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                caret.x += scaled.kern(prev, glyph_id);
            }
            let glyph = glyph_id.with_scale_and_position(self.scale, caret);
            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                let origin_x = bounds.min.x.floor() as i64;
                let origin_y = bounds.min.y.floor() as i64;
                outlined.draw(|gx, gy, v| {
                    if v >= 0.5 {
                        frame.set(origin_x + i64::from(gx), origin_y + i64::from(gy), color);
                    }
                });
            }
            caret.x += scaled.h_advance(glyph_id);
            previous = Some(glyph_id);
        }
    }
}

/// The two sizes used on screen.
#[derive(Clone)]
pub struct Fonts {
    /// Captions and the version string.
    pub small: Typeface,
    /// Messages and the queue overview.
    pub large: Typeface,
}

impl Fonts {
    /// Load `path` at both sizes, falling back to a system font when the
    /// file does not exist.
    pub fn load(path: &Path, small_px: f32, large_px: f32) -> Result<Self, Error> {
        let font = match fs::read(path) {
            Ok(data) => {
                FontArc::try_from_vec(data).map_err(|_| Error::BadFont(path.to_path_buf()))?
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "font file missing; using a system font");
                system_font().ok_or_else(|| Error::NoFont(path.to_path_buf()))?
            }
            Err(err) => return Err(err.into()),
        };
        info!(path = %path.display(), small_px, large_px, "fonts loaded");
        Ok(Self::from_font(font, small_px, large_px))
    }

    pub fn from_font(font: FontArc, small_px: f32, large_px: f32) -> Self {
        Self {
            small: Typeface::new(font.clone(), small_px),
            large: Typeface::new(font, large_px),
        }
    }
}

/// First usable installed font, preferring monospace faces.
pub fn system_font() -> Option<FontArc> {
    let mut db = Database::new();
    db.load_system_fonts();

    let preferred_families = [
        Family::Name("DejaVu Sans Mono"),
        Family::Monospace,
        Family::Name("DejaVu Sans"),
        Family::SansSerif,
    ];

    for family in preferred_families {
        if let Some(id) = db.query(&Query {
            families: &[family],
            ..Default::default()
        }) && let Some(font) = load_face(&db, id)
        {
            return Some(font);
        }
    }

    for face in db.faces() {
        if let Some(font) = load_face(&db, face.id) {
            return Some(font);
        }
    }
    None
}

fn load_face(db: &Database, id: fontdb::ID) -> Option<FontArc> {
    let face = db.face(id)?;
    let data = match &face.source {
        Source::Binary(data) => data.as_ref().as_ref().to_vec(),
        Source::File(path) => fs::read(path).ok()?,
        Source::SharedFile(_, data) => data.as_ref().as_ref().to_vec(),
    };
    // Collections (.ttc) hold several faces; pick the one fontdb matched.
    FontVec::try_from_vec_and_index(data, face.index)
        .ok()
        .map(FontArc::new)
}
