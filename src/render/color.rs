use crate::annotation::{BoundingBox, LabelId};
use image::Rgb;
use rand::seq::SliceRandom;
use rand::Rng;

/// Fixed label palette, 8-bit RGB.
pub const PALETTE: [[u8; 3]; 20] = [
    [230, 25, 75],
    [60, 180, 75],
    [255, 225, 25],
    [0, 130, 200],
    [245, 130, 48],
    [145, 30, 180],
    [70, 240, 240],
    [240, 50, 230],
    [210, 245, 60],
    [250, 190, 212],
    [0, 128, 128],
    [220, 190, 255],
    [170, 110, 40],
    [255, 250, 200],
    [128, 0, 0],
    [170, 255, 195],
    [128, 128, 0],
    [255, 215, 180],
    [0, 0, 128],
    [128, 128, 128],
];

/// Relative-luminance cut-off from the W3C contrast guidance. At or below it
/// white text reads better than black.
pub const WHITE_TEXT_MAX_LUMINANCE: f32 = 0.179;

/// RGB color with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub fn from_rgb8([r, g, b]: [u8; 3]) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    pub fn to_rgb8(self) -> Rgb<u8> {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgb([c(self.r), c(self.g), c(self.b)])
    }

    pub fn luminance(self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }

    /// Black or white, whichever is readable on top of `self`.
    pub fn text_color(self) -> Rgb<u8> {
        if use_white_text(self.luminance()) {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    }
}

pub fn use_white_text(luminance: f32) -> bool {
    luminance <= WHITE_TEXT_MAX_LUMINANCE
}

/// Colors for the labels seen during one render call.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelColors {
    labels: Vec<LabelId>,
    colors: Vec<Color>,
}

impl LabelColors {
    /// Label ids in first-encounter order.
    pub fn labels(&self) -> &[LabelId] {
        &self.labels
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn color_of(&self, label: &LabelId) -> Option<Color> {
        let index = self.labels.iter().position(|l| l == label)?;
        self.colors.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

pub fn assign_colors(lists: &[&[BoundingBox]]) -> LabelColors {
    assign_colors_with(&mut rand::thread_rng(), lists)
}

/// Collect label ids across `lists` in first-seen order and give each one a
/// palette color. Fewer labels than palette entries draws a random sample
/// without replacement; otherwise the palette is tiled in order.
pub fn assign_colors_with<R: Rng + ?Sized>(rng: &mut R, lists: &[&[BoundingBox]]) -> LabelColors {
    let mut labels: Vec<LabelId> = Vec::new();
    for bbox in lists.iter().flat_map(|list| list.iter()) {
        if !labels.contains(&bbox.label) {
            labels.push(bbox.label.clone());
        }
    }

    let colors = if labels.len() < PALETTE.len() {
        let mut palette = PALETTE.to_vec();
        let (sample, _) = palette.partial_shuffle(rng, labels.len());
        sample.iter().copied().map(Color::from_rgb8).collect()
    } else {
        PALETTE
            .iter()
            .cycle()
            .take(labels.len())
            .copied()
            .map(Color::from_rgb8)
            .collect()
    };

    LabelColors { labels, colors }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn boxes(labels: impl IntoIterator<Item = u32>) -> Vec<BoundingBox> {
        labels
            .into_iter()
            .map(|l| BoundingBox::new(1.0, 1.0, 2.0, 2.0, l))
            .collect()
    }

    fn palette_colors() -> Vec<Color> {
        PALETTE.iter().copied().map(Color::from_rgb8).collect()
    }

    #[test]
    fn contrast_boundary() {
        assert!(use_white_text(0.179));
        assert!(!use_white_text(0.18));
        assert_eq!(Color { r: 0.0, g: 0.0, b: 1.0 }.text_color(), Rgb([255, 255, 255]));
        assert_eq!(Color { r: 1.0, g: 1.0, b: 0.0 }.text_color(), Rgb([0, 0, 0]));
    }

    #[test]
    fn small_label_set_samples_distinct_palette_colors() {
        let list = boxes([3, 1, 3, 7, 1]);
        let mut rng = StdRng::seed_from_u64(7);
        let colors = assign_colors_with(&mut rng, &[&list]);

        let order: Vec<&str> = colors.labels().iter().map(LabelId::as_str).collect();
        assert_eq!(order, ["3", "1", "7"]);
        assert_eq!(colors.colors().len(), 3);

        let palette = palette_colors();
        for (i, c) in colors.colors().iter().enumerate() {
            assert!(palette.contains(c));
            assert!(!colors.colors()[..i].contains(c), "sampled with replacement");
        }
    }

    #[test]
    fn large_label_set_tiles_deterministically() {
        let list = boxes(0..(PALETTE.len() as u32 + 5));
        let a = assign_colors(&[&list]);
        let b = assign_colors(&[&list]);
        assert_eq!(a, b);

        let palette = palette_colors();
        assert_eq!(&a.colors()[..PALETTE.len()], &palette[..]);
        assert_eq!(a.colors()[PALETTE.len()], palette[0]);
        assert_eq!(a.color_of(&LabelId::from(PALETTE.len() as u32 + 4)), Some(palette[4]));
    }

    #[test]
    fn joint_assignment_covers_every_list() {
        let gt = boxes([1, 2]);
        let pred = boxes([2, 9]);
        let colors = assign_colors(&[&gt, &pred]);
        assert_eq!(colors.len(), 3);
        assert!(colors.color_of(&LabelId::from(9u32)).is_some());
        assert!(colors.color_of(&LabelId::from(4u32)).is_none());
    }

    #[test]
    fn rgb8_round_trip() {
        for rgb in PALETTE {
            assert_eq!(Color::from_rgb8(rgb).to_rgb8(), Rgb(rgb));
        }
    }
}
