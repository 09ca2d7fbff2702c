use crate::render::figure::{BLACK, WHITE};
use crate::render::LabelFont;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

pub const CHART_WIDTH: u32 = 640;
pub const CHART_HEIGHT: u32 = 480;

const MARGIN_LEFT: f32 = 84.0;
const MARGIN_RIGHT: f32 = 24.0;
const MARGIN_TOP: f32 = 44.0;
const MARGIN_BOTTOM: f32 = 56.0;
const Y_TICKS: usize = 5;
const MAX_X_TICKS: usize = 10;
const TICK_LEN: f32 = 4.0;

/// Line colors, assigned to series in order.
pub const SERIES_COLORS: [Rgb<u8>; 4] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([214, 39, 40]),
];

/// One curve; `values[i]` belongs to epoch `i + 1`.
#[derive(Debug, Clone, Copy)]
pub struct Series<'a> {
    pub label: Option<&'a str>,
    pub values: &'a [f64],
}

#[derive(Debug, Clone)]
pub struct LineChart<'a> {
    pub title: &'a str,
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub series: Vec<Series<'a>>,
}

struct PlotArea {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl PlotArea {
    fn x(&self, epoch: f64) -> f32 {
        let (lo, hi) = self.x_range;
        self.left + ((epoch - lo) / (hi - lo)) as f32 * (self.right - self.left)
    }

    fn y(&self, value: f64) -> f32 {
        let (lo, hi) = self.y_range;
        self.bottom - ((value - lo) / (hi - lo)) as f32 * (self.bottom - self.top)
    }
}

impl LineChart<'_> {
    pub fn render(&self, font: &LabelFont) -> RgbImage {
        let mut canvas = RgbImage::from_pixel(CHART_WIDTH, CHART_HEIGHT, WHITE);
        let epochs = self.series.iter().map(|s| s.values.len()).max().unwrap_or(0);
        let plot = PlotArea {
            left: MARGIN_LEFT,
            right: CHART_WIDTH as f32 - MARGIN_RIGHT,
            top: MARGIN_TOP,
            bottom: CHART_HEIGHT as f32 - MARGIN_BOTTOM,
            x_range: if epochs <= 1 { (0.5, 1.5) } else { (1.0, epochs as f64) },
            y_range: value_range(self.series.iter().flat_map(|s| s.values.iter().copied())),
        };

        self.draw_axes(&mut canvas, &plot, font, epochs);

        for (series, color) in self.series.iter().zip(SERIES_COLORS.iter().cycle()) {
            let points: Vec<Option<(f32, f32)>> = series
                .values
                .iter()
                .enumerate()
                .map(|(i, &v)| v.is_finite().then(|| (plot.x(i as f64 + 1.0), plot.y(v))))
                .collect();
            if let [Some((x, y))] = points.as_slice() {
                draw_filled_circle_mut(&mut canvas, (*x as i32, *y as i32), 3, *color);
            }
            for pair in points.windows(2) {
                if let [Some(a), Some(b)] = pair {
                    draw_line_segment_mut(&mut canvas, *a, *b, *color);
                }
            }
        }

        self.draw_legend(&mut canvas, &plot, font);
        self.draw_titles(&mut canvas, &plot, font);
        canvas
    }

    fn draw_axes(&self, canvas: &mut RgbImage, plot: &PlotArea, font: &LabelFont, epochs: usize) {
        draw_line_segment_mut(canvas, (plot.left, plot.bottom), (plot.right, plot.bottom), BLACK);
        draw_line_segment_mut(canvas, (plot.left, plot.top), (plot.left, plot.bottom), BLACK);

        let (lo, hi) = plot.y_range;
        for i in 0..=Y_TICKS {
            let value = lo + (hi - lo) * i as f64 / Y_TICKS as f64;
            let y = plot.y(value);
            draw_line_segment_mut(canvas, (plot.left - TICK_LEN, y), (plot.left, y), BLACK);

            let text = format_tick(value);
            let (tw, th) = font.text_size(&text);
            let x = plot.left - TICK_LEN - 4.0 - tw as f32;
            font.draw(canvas, x as i32, (y - th as f32 / 2.0) as i32, &text, BLACK);
        }

        let step = epochs.div_ceil(MAX_X_TICKS).max(1);
        for epoch in (1..=epochs.max(1)).step_by(step) {
            let x = plot.x(epoch as f64);
            draw_line_segment_mut(canvas, (x, plot.bottom), (x, plot.bottom + TICK_LEN), BLACK);

            let text = epoch.to_string();
            let (tw, _) = font.text_size(&text);
            font.draw(canvas, (x - tw as f32 / 2.0) as i32, (plot.bottom + TICK_LEN + 4.0) as i32, &text, BLACK);
        }
    }

    fn draw_legend(&self, canvas: &mut RgbImage, plot: &PlotArea, font: &LabelFont) {
        let entries: Vec<(&str, Rgb<u8>)> = self
            .series
            .iter()
            .zip(SERIES_COLORS.iter().cycle())
            .filter_map(|(s, c)| s.label.map(|l| (l, *c)))
            .collect();
        let widest = entries.iter().map(|(l, _)| font.text_size(l).0).max().unwrap_or(0);

        for (row, (label, color)) in entries.iter().enumerate() {
            let (_, th) = font.text_size(label);
            let y = plot.top + 8.0 + row as f32 * (th as f32 + 6.0);
            let text_x = plot.right - 8.0 - widest as f32;
            let mid = y + th as f32 / 2.0;
            draw_line_segment_mut(canvas, (text_x - 28.0, mid), (text_x - 6.0, mid), *color);
            font.draw(canvas, text_x as i32, y as i32, label, BLACK);
        }
    }

    fn draw_titles(&self, canvas: &mut RgbImage, plot: &PlotArea, font: &LabelFont) {
        let (tw, th) = font.text_size(self.title);
        let title_y = (plot.top - th as f32) / 2.0;
        font.draw(canvas, (CHART_WIDTH as i32 - tw as i32) / 2, title_y as i32, self.title, BLACK);

        let (tw, th) = font.text_size(self.x_label);
        let center = (plot.left + plot.right) / 2.0;
        let y = CHART_HEIGHT as f32 - th as f32 - 8.0;
        font.draw(canvas, (center - tw as f32 / 2.0) as i32, y as i32, self.x_label, BLACK);

        font.draw(canvas, 8, (plot.top - th as f32 - 4.0) as i32, self.y_label, BLACK);
    }
}

/// Padded `(min, max)` of the finite values; `(0, 1)` when there are none.
fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return (0.0, 1.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { (lo.abs() * 0.1).max(0.5) };
    (lo - pad, hi + pad)
}

fn format_tick(v: f64) -> String {
    let a = v.abs();
    if a < 1e-12 {
        "0".to_string()
    } else if !(1e-2..1e4).contains(&a) {
        format!("{v:.1e}")
    } else if a < 1.0 {
        format!("{v:.3}")
    } else {
        format!("{v:.2}")
    }
}
