use super::color::Color;
use super::font::LabelFont;
use crate::annotation::BoundingBox;
use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use log::{debug, warn};

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

const LABEL_PADDING: u32 = 1;
const LABEL_GAP: i32 = 2;
const TITLE_PADDING: u32 = 6;
const MARKER_RADIUS: f32 = 3.0;
const MAX_MARGIN: u32 = 1 << 16;

/// Clamp `v` to `[-margin, extent + margin]` so it fits `i32` arithmetic;
/// `None` for NaN.
fn clamp_coord(v: f32, extent: u32, margin: u32) -> Option<i32> {
    if v.is_nan() {
        return None;
    }
    let margin = margin.min(MAX_MARGIN) as f32;
    let extent = extent.min(i32::MAX as u32 / 2) as f32;
    Some(v.clamp(-margin, extent + margin) as i32)
}

/// Drawing surface owned by a single render call. Released when dropped, so
/// every exit path of a render (including `?`) frees it.
pub struct Figure {
    canvas: RgbImage,
}

impl Figure {
    pub fn new(image: &RgbImage) -> Self {
        Self::from_canvas(image.clone())
    }

    #[cfg(test)]
    pub fn blank(width: u32, height: u32) -> Self {
        Self::from_canvas(RgbImage::from_pixel(width, height, WHITE))
    }

    pub fn from_canvas(canvas: RgbImage) -> Self {
        debug!("acquired {}x{} drawing surface", canvas.width(), canvas.height());
        Self { canvas }
    }

    #[cfg(test)]
    pub fn canvas(&self) -> &RgbImage {
        &self.canvas
    }

    /// Hollow rectangle whose outer stroke passes through both corners.
    /// Coordinates far off the canvas are pulled in to just past its edge.
    pub fn draw_box(&mut self, bbox: &BoundingBox, color: Color, line_width: u32) {
        let (cw, ch) = self.canvas.dimensions();
        let thickness = line_width.clamp(1, MAX_MARGIN);
        let margin = thickness + 1;
        let (Some(x0), Some(y0), Some(x1), Some(y1)) = (
            clamp_coord(bbox.x_min, cw, margin),
            clamp_coord(bbox.y_min, ch, margin),
            clamp_coord(bbox.x_max, cw, margin),
            clamp_coord(bbox.y_max, ch, margin),
        ) else {
            warn!("skipping box with NaN coordinates {:?}", bbox.coords());
            return;
        };
        let (w, h) = (x1 - x0, y1 - y0);
        let rgb = color.to_rgb8();
        for t in 0..thickness as i32 {
            let rect = Rect::at(x0 + t, y0 + t).of_size((w + 1 - 2 * t).max(1) as u32, (h + 1 - 2 * t).max(1) as u32);
            draw_hollow_rect_mut(&mut self.canvas, rect, rgb);
        }
    }

    /// Text on a `color` background sitting just above `(x, y)`, kept inside
    /// the canvas when the box touches the top edge.
    pub fn draw_label(&mut self, font: &LabelFont, text: &str, x: f32, y: f32, color: Color) {
        let (tw, th) = font.text_size(text);
        let (bg_w, bg_h) = (tw + 2 * LABEL_PADDING, th + 2 * LABEL_PADDING);
        let (cw, ch) = self.canvas.dimensions();
        let (Some(left), Some(anchor)) = (
            clamp_coord(x, cw, bg_w),
            clamp_coord(y, ch, bg_h + LABEL_GAP as u32),
        ) else {
            return;
        };
        let top = anchor.saturating_sub(LABEL_GAP + bg_h.min(MAX_MARGIN) as i32).max(0);
        draw_filled_rect_mut(&mut self.canvas, Rect::at(left, top).of_size(bg_w, bg_h), color.to_rgb8());
        let pad = LABEL_PADDING as i32;
        font.draw(&mut self.canvas, left + pad, top + pad, text, color.text_color());
    }

    /// Black text on a white plate with its top-left corner at `(x, y)`.
    pub fn draw_caption(&mut self, font: &LabelFont, text: &str, x: i32, y: i32) {
        let (tw, th) = font.text_size(text);
        let rect = Rect::at(x, y).of_size(tw + 2 * LABEL_PADDING, th + 2 * LABEL_PADDING);
        draw_filled_rect_mut(&mut self.canvas, rect, WHITE);
        let pad = LABEL_PADDING as i32;
        font.draw(&mut self.canvas, x + pad, y + pad, text, BLACK);
    }

    /// `x`-shaped point marker.
    pub fn mark(&mut self, x: f32, y: f32, color: Rgb<u8>) {
        let r = MARKER_RADIUS;
        let (cw, ch) = self.canvas.dimensions();
        let margin = r as u32 + 1;
        let (Some(x), Some(y)) = (clamp_coord(x, cw, margin), clamp_coord(y, ch, margin)) else {
            return;
        };
        let (x, y) = (x as f32, y as f32);
        draw_line_segment_mut(&mut self.canvas, (x - r, y - r), (x + r, y + r), color);
        draw_line_segment_mut(&mut self.canvas, (x - r, y + r), (x + r, y - r), color);
    }

    /// Closed polyline with a 3-pixel stroke.
    pub fn draw_polygon(&mut self, points: &[(f32, f32)], color: Rgb<u8>) {
        let (cw, ch) = self.canvas.dimensions();
        let points: Option<Vec<(f32, f32)>> = points
            .iter()
            .map(|&(x, y)| Some((clamp_coord(x, cw, cw)? as f32, clamp_coord(y, ch, ch)? as f32)))
            .collect();
        let Some(points) = points.filter(|p| p.len() >= 2) else {
            return;
        };
        for (i, &start) in points.iter().enumerate() {
            let end = points[(i + 1) % points.len()];
            for offset in [-1.0, 0.0, 1.0] {
                draw_line_segment_mut(&mut self.canvas, (start.0 + offset, start.1), (end.0 + offset, end.1), color);
                draw_line_segment_mut(&mut self.canvas, (start.0, start.1 + offset), (end.0, end.1 + offset), color);
            }
        }
    }

    /// Hand the raster back, with `title` centered in a white band on top.
    pub fn finish(mut self, font: &LabelFont, title: Option<&str>) -> RgbImage {
        let canvas = std::mem::take(&mut self.canvas);
        let Some(title) = title.filter(|t| !t.is_empty()) else {
            return canvas;
        };
        let (tw, th) = font.text_size(title);
        let band = th + 2 * TITLE_PADDING;
        let mut out = RgbImage::from_pixel(canvas.width(), canvas.height() + band, WHITE);
        imageops::replace(&mut out, &canvas, 0, band as i64);
        let x = (canvas.width() as i32 - tw as i32) / 2;
        font.draw(&mut out, x, TITLE_PADDING as i32, title, BLACK);
        out
    }
}

impl Drop for Figure {
    fn drop(&mut self) {
        debug!("released drawing surface");
    }
}
