use crate::{Error, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use log::{debug, warn};
use rusttype::{Font, Scale};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

const REPLACEMENT_GLYPH: [u8; 7] = [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0, 0b00100];

static SUBSTITUTION_WARNING: Once = Once::new();

const SYSTEM_FONT_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/TTF",
    "/usr/share/fonts/dejavu",
    "/usr/share/fonts/truetype/liberation",
    "/System/Library/Fonts/Supplemental",
    "C:\\Windows\\Fonts",
];

const SYSTEM_FONT_FILES: &[&str] = &["DejaVuSans.ttf", "LiberationSans-Regular.ttf", "Arial.ttf", "arial.ttf"];

/// Text renderer for labels, titles and chart annotations.
pub enum LabelFont {
    TrueType { font: Font<'static>, scale: Scale },
    /// Built-in 5x7 glyphs, each pixel drawn as a `scale`-sized square.
    Bitmap { scale: u32 },
}

impl LabelFont {
    pub fn load(path: impl AsRef<Path>, size: f32) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        let font = Font::try_from_vec(bytes).ok_or_else(|| Error::io(path, "not a TrueType font"))?;
        debug!("loaded font {}", path.display());
        Ok(LabelFont::TrueType {
            font,
            scale: Scale::uniform(size),
        })
    }

    pub fn bitmap(size: f32) -> Self {
        LabelFont::Bitmap {
            scale: ((size / (GLYPH_HEIGHT + 1) as f32).round() as u32).max(1),
        }
    }

    /// Configured font, then well-known system fonts, then the bitmap font.
    pub fn discover(configured: Option<&Path>, size: f32) -> Result<Self> {
        if let Some(path) = configured {
            return Self::load(path, size);
        }
        for candidate in system_font_candidates() {
            if !candidate.is_file() {
                continue;
            }
            match Self::load(&candidate, size) {
                Ok(font) => return Ok(font),
                Err(e) => warn!("skipping font: {e}"),
            }
        }
        debug!("no TrueType font found, using bitmap glyphs");
        Ok(Self::bitmap(size))
    }

    /// Width and height in pixels of `text` when drawn.
    pub fn text_size(&self, text: &str) -> (u32, u32) {
        match self {
            LabelFont::TrueType { font, scale } => {
                let (w, _) = text_size(*scale, font, text);
                (w.max(0) as u32, scale.y.ceil() as u32)
            }
            LabelFont::Bitmap { scale } => {
                let n = text.chars().count() as u32;
                let w = if n == 0 { 0 } else { n * (GLYPH_WIDTH + 1) - 1 };
                (w * scale, GLYPH_HEIGHT * scale)
            }
        }
    }

    /// Draw `text` with its top-left corner at `(x, y)`. Pixels outside the
    /// canvas are clipped.
    pub fn draw(&self, canvas: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        match self {
            LabelFont::TrueType { font, scale } => {
                draw_text_mut(canvas, color, x, y, *scale, font, text);
            }
            LabelFont::Bitmap { scale } => {
                let step = ((GLYPH_WIDTH + 1) * scale) as i32;
                for (i, ch) in text.chars().enumerate() {
                    let rows = glyph(ch).unwrap_or_else(|| {
                        SUBSTITUTION_WARNING.call_once(|| {
                            warn!("bitmap font has no glyph for {ch:?}, drawing '?'; set font_path to a TrueType font for such labels")
                        });
                        REPLACEMENT_GLYPH
                    });
                    draw_glyph(canvas, x + i as i32 * step, y, rows, *scale, color);
                }
            }
        }
    }
}

fn system_font_candidates() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = dirs::font_dir().into_iter().collect();
    dirs.extend(SYSTEM_FONT_DIRS.iter().map(PathBuf::from));
    dirs.iter()
        .flat_map(|dir| SYSTEM_FONT_FILES.iter().map(move |f| dir.join(f)))
        .collect()
}

fn draw_glyph(canvas: &mut RgbImage, x: i32, y: i32, rows: [u8; 7], scale: u32, color: Rgb<u8>) {
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    for (row, bits) in rows.iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                continue;
            }
            for dy in 0..scale {
                for dx in 0..scale {
                    let px = x + (col * scale + dx) as i32;
                    let py = y + (row as u32 * scale + dy) as i32;
                    if px >= 0 && py >= 0 && px < w && py < h {
                        canvas.put_pixel(px as u32, py as u32, color);
                    }
                }
            }
        }
    }
}

fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        ' ' => [0; 7],
        '.' => [0, 0, 0, 0, 0, 0b01100, 0b01100],
        ',' => [0, 0, 0, 0, 0b01100, 0b00100, 0b01000],
        ':' => [0, 0b01100, 0b01100, 0, 0b01100, 0b01100, 0],
        '-' => [0, 0, 0, 0b11111, 0, 0, 0],
        '+' => [0, 0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0],
        '_' => [0, 0, 0, 0, 0, 0, 0b11111],
        '%' => [0b11000, 0b11001, 0b00010, 0b00100, 0b01000, 0b10011, 0b00011],
        '/' => [0b00001, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b10000],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        '\'' => [0b00100, 0b00100, 0b01000, 0, 0, 0, 0],
        '?' => REPLACEMENT_GLYPH,
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bitmap_text_size() {
        let font = LabelFont::Bitmap { scale: 2 };
        assert_eq!(font.text_size(""), (0, 14));
        assert_eq!(font.text_size("cat"), ((3 * 6 - 1) * 2, 14));
    }

    #[test]
    fn bitmap_draw_clips_at_edges() {
        let mut img = RgbImage::new(8, 8);
        let font = LabelFont::Bitmap { scale: 1 };
        font.draw(&mut img, -3, -3, "W1", Rgb([255, 0, 0]));
        font.draw(&mut img, 6, 6, "W", Rgb([255, 0, 0]));

        let mut img = RgbImage::new(8, 8);
        font.draw(&mut img, 0, 0, "L", Rgb([9, 9, 9]));
        assert_eq!(img.get_pixel(0, 0), &Rgb([9, 9, 9]));
        assert_eq!(img.get_pixel(4, 6), &Rgb([9, 9, 9]));
        assert_eq!(img.get_pixel(4, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn unsupported_characters_draw_the_replacement_glyph() {
        assert!(glyph('a').is_some());
        assert!(glyph('中').is_none());

        let font = LabelFont::Bitmap { scale: 1 };
        let mut question = RgbImage::new(12, 8);
        font.draw(&mut question, 0, 0, "??", Rgb([9, 9, 9]));
        let mut cjk = RgbImage::new(12, 8);
        font.draw(&mut cjk, 0, 0, "猫狗", Rgb([9, 9, 9]));
        assert_eq!(question, cjk);
    }

    #[test]
    fn bitmap_scale_follows_font_size() {
        assert!(matches!(LabelFont::bitmap(12.0), LabelFont::Bitmap { scale: 2 }));
        assert!(matches!(LabelFont::bitmap(3.0), LabelFont::Bitmap { scale: 1 }));
    }

    #[test]
    fn configured_font_must_exist() {
        assert!(LabelFont::discover(Some(Path::new("/no/such/font.ttf")), 12.0).is_err());
    }
}
