use super::color::{assign_colors, LabelColors};
use super::figure::{Figure, WHITE};
use super::Renderer;
use crate::annotation::{BoundingBox, DatasetMetadata, LabelNames};
use crate::{io, Error, Result};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use log::debug;
use ndarray::Array3;
use std::path::{Path, PathBuf};

/// Number of cells in [`Renderer::render_grid`].
pub const GRID_CELLS: usize = 4;

const TOP_LEFT_MARKER: Rgb<u8> = Rgb([255, 0, 0]);
const BOTTOM_RIGHT_MARKER: Rgb<u8> = Rgb([0, 128, 0]);
const POLYGON_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Options for [`Renderer::render_normalized`].
#[derive(Debug, Clone, Copy)]
pub struct NormalizedOptions<'a> {
    /// Boxes are stored as `(y_min, x_min, y_max, x_max)`.
    pub axis_swap: bool,
    /// Boxes are in `[0, 1]` and get multiplied by `[W, H, W, H]`.
    pub is_normalized: bool,
    /// Save as `<output_dir>/{index:03}.png`.
    pub index: Option<u32>,
    pub title: Option<&'a str>,
    pub label_names: Option<&'a LabelNames>,
}

impl Default for NormalizedOptions<'_> {
    fn default() -> Self {
        Self {
            axis_swap: false,
            is_normalized: true,
            index: None,
            title: None,
            label_names: None,
        }
    }
}

/// Copies of `boxes` moved right by `dx`; sentinels are kept as they are.
pub fn shift_boxes(boxes: &[BoundingBox], dx: f32) -> Vec<BoundingBox> {
    boxes.iter().map(|b| b.shifted_x(dx)).collect()
}

impl Renderer {
    /// Draw one image with its boxes and `"<name>"` / `"<name> <p>%"` labels.
    pub fn render_single(
        &mut self,
        image: &RgbImage,
        annotations: &[BoundingBox],
        label_names: &LabelNames,
        probabilities: Option<&[f32]>,
        title: Option<&str>,
        output_path: Option<&Path>,
    ) -> Result<RgbImage> {
        let colors = assign_colors(&[annotations]);
        let mut figure = Figure::new(image);
        self.draw_annotations(&mut figure, annotations, &colors, label_names, probabilities)?;
        let rendered = figure.finish(&self.font, title);

        if let Some(path) = output_path {
            io::save_image(&rendered, path)?;
        }
        self.present(title.unwrap_or("annotations"), &rendered)?;
        Ok(rendered)
    }

    /// Ground truth on the left copy of `image`, predictions on the right,
    /// separated by a white column. Both halves share one color assignment.
    pub fn compose_comparison(
        &self,
        image: &RgbImage,
        ground_truth: &[BoundingBox],
        predicted: &[BoundingBox],
        probabilities: &[f32],
        label_names: &LabelNames,
    ) -> Result<RgbImage> {
        let (w, h) = image.dimensions();
        let offset = w + self.config.separator_width;

        let mut canvas = RgbImage::from_pixel(offset + w, h, WHITE);
        imageops::replace(&mut canvas, image, 0, 0);
        imageops::replace(&mut canvas, image, offset as i64, 0);

        let colors = assign_colors(&[ground_truth, predicted]);
        let shifted = shift_boxes(predicted, offset as f32);

        let mut figure = Figure::from_canvas(canvas);
        self.draw_annotations(&mut figure, ground_truth, &colors, label_names, None)?;
        self.draw_annotations(&mut figure, &shifted, &colors, label_names, Some(probabilities))?;
        Ok(figure.finish(&self.font, None))
    }

    /// [`compose_comparison`](Self::compose_comparison) resized to the
    /// configured `H×W×3` tensor for experiment loggers.
    pub fn render_comparison(
        &self,
        image: &RgbImage,
        ground_truth: &[BoundingBox],
        predicted: &[BoundingBox],
        probabilities: &[f32],
        label_names: &LabelNames,
    ) -> Result<Array3<u8>> {
        let (height, width) = (self.config.comparison_height, self.config.comparison_width);
        if height == 0 || width == 0 {
            return Err(Error::invalid(format!("comparison size {height}x{width} is empty")));
        }
        let composite = self.compose_comparison(image, ground_truth, predicted, probabilities, label_names)?;
        let resized = imageops::resize(&composite, width, height, FilterType::Triangle);
        Array3::from_shape_vec((height as usize, width as usize, 3), resized.into_raw())
            .map_err(|e| Error::invalid(format!("comparison buffer: {e}")))
    }

    /// 2×2 grid without spacing; every cell gets its own colors and is titled
    /// with its file name. Cells take the size of the largest image.
    pub fn render_grid<P: AsRef<Path>>(
        &mut self,
        image_paths: &[P],
        annotations: &[Vec<BoundingBox>],
        label_names: &LabelNames,
        title: Option<&str>,
    ) -> Result<RgbImage> {
        if image_paths.len() != GRID_CELLS || annotations.len() != GRID_CELLS {
            return Err(Error::invalid(format!(
                "grid needs exactly {GRID_CELLS} images and {GRID_CELLS} annotation lists, got {} and {}",
                image_paths.len(),
                annotations.len()
            )));
        }

        let images = image_paths.iter().map(io::load_image).collect::<Result<Vec<_>>>()?;
        let cell_w = images.iter().map(RgbImage::width).max().unwrap_or(0);
        let cell_h = images.iter().map(RgbImage::height).max().unwrap_or(0);

        let mut grid = RgbImage::from_pixel(2 * cell_w, 2 * cell_h, WHITE);
        for (index, ((path, image), boxes)) in image_paths.iter().zip(&images).zip(annotations).enumerate() {
            let name = file_name(path.as_ref());
            let cell = self
                .render_cell(image, boxes, label_names, (cell_w, cell_h), &name)
                .map_err(|e| in_image(e, &name))?;
            let (col, row) = ((index % 2) as u32, (index / 2) as u32);
            imageops::replace(&mut grid, &cell, (col * cell_w) as i64, (row * cell_h) as i64);
        }

        let rendered = Figure::from_canvas(grid).finish(&self.font, title);
        self.present(title.unwrap_or("annotations"), &rendered)?;
        Ok(rendered)
    }

    fn render_cell(
        &self,
        image: &RgbImage,
        boxes: &[BoundingBox],
        label_names: &LabelNames,
        (cell_w, cell_h): (u32, u32),
        caption: &str,
    ) -> Result<RgbImage> {
        let (w, h) = image.dimensions();
        let (image, boxes) = if (w, h) == (cell_w, cell_h) {
            (image.clone(), boxes.to_vec())
        } else {
            let (sx, sy) = (cell_w as f32 / w as f32, cell_h as f32 / h as f32);
            let scaled: Vec<BoundingBox> = boxes
                .iter()
                .map(|b| BoundingBox {
                    x_min: b.x_min * sx,
                    y_min: b.y_min * sy,
                    x_max: b.x_max * sx,
                    y_max: b.y_max * sy,
                    label: b.label.clone(),
                })
                .collect();
            (imageops::resize(image, cell_w, cell_h, FilterType::Triangle), scaled)
        };

        let colors = assign_colors(&[&boxes]);
        let mut figure = Figure::from_canvas(image);
        self.draw_annotations(&mut figure, &boxes, &colors, label_names, None)?;

        let (tw, _) = self.font.text_size(caption);
        figure.draw_caption(&self.font, caption, (cell_w as i32 - tw as i32) / 2, 0);
        Ok(figure.finish(&self.font, None))
    }

    /// Debug view of raw model boxes: optional axis swap and `[W, H, W, H]`
    /// scaling, corner markers, and an optional indexed save. Returns the next
    /// index, or `None` when no index was given.
    pub fn render_normalized(
        &mut self,
        image: &RgbImage,
        boxes: &[BoundingBox],
        options: NormalizedOptions<'_>,
    ) -> Result<Option<u32>> {
        let (w, h) = image.dimensions();
        let colors = assign_colors(&[boxes]);
        let mut figure = Figure::new(image);

        for (index, original) in boxes.iter().enumerate() {
            let mut bbox = if options.axis_swap {
                original.swapped_axes()
            } else {
                original.clone()
            };
            if options.is_normalized {
                bbox = bbox.scaled(w, h);
            }
            if bbox.is_sentinel() {
                continue;
            }

            let color = color_for(&colors, index, &bbox)?;
            figure.draw_box(&bbox, color, self.config.line_width);
            if let Some(names) = options.label_names {
                let name = names.name_of(index, &bbox.label)?;
                figure.draw_label(&self.font, name, bbox.x_min, bbox.y_min, color);
            }
            figure.mark(bbox.x_min, bbox.y_min, TOP_LEFT_MARKER);
            figure.mark(bbox.x_max, bbox.y_max, BOTTOM_RIGHT_MARKER);
        }

        let rendered = figure.finish(&self.font, options.title);
        if let Some(index) = options.index {
            io::save_image(&rendered, self.indexed_path(index))?;
        }
        self.present(options.title.unwrap_or("boxes"), &rendered)?;
        Ok(options.index.map(|i| i + 1))
    }

    /// Closed red outlines (e.g. rotated text boxes), saved as
    /// `<output_dir>/{index:03}.png`.
    pub fn render_polygons(&mut self, image: &RgbImage, polygons: &[Vec<(f32, f32)>], index: u32) -> Result<PathBuf> {
        let mut figure = Figure::new(image);
        for polygon in polygons {
            figure.draw_polygon(polygon, POLYGON_COLOR);
        }
        let rendered = figure.finish(&self.font, None);
        let path = self.indexed_path(index);
        io::save_image(&rendered, &path)?;
        self.present("polygons", &rendered)?;
        Ok(path)
    }

    /// Render an image addressed as `.../<dataset>/<split>/<image>` with the
    /// annotations and label names `metadata` holds for it.
    pub fn render_dataset_image(
        &mut self,
        metadata: &dyn DatasetMetadata,
        image_path: &Path,
        title: Option<&str>,
    ) -> Result<RgbImage> {
        let parts: Vec<&str> = image_path
            .iter()
            .rev()
            .take(3)
            .map(|c| c.to_str())
            .collect::<Option<_>>()
            .ok_or_else(|| Error::invalid(format!("non UTF-8 path {}", image_path.display())))?;
        let &[image_name, split, dataset] = parts.as_slice() else {
            return Err(Error::invalid(format!(
                "expected a <dataset>/<split>/<image> path, got {}",
                image_path.display()
            )));
        };

        let annotations = metadata.annotations(dataset, split)?;
        let boxes = annotations.get(image_name).ok_or_else(|| {
            Error::invalid(format!("no annotations for '{image_name}' in {dataset}/{split}"))
        })?;
        let names = metadata.label_names(dataset)?;
        let image = io::load_image(image_path)?;

        self.render_single(&image, boxes, &names, None, title, None)
            .map_err(|e| in_image(e, image_name))
    }

    fn draw_annotations(
        &self,
        figure: &mut Figure,
        boxes: &[BoundingBox],
        colors: &LabelColors,
        label_names: &LabelNames,
        probabilities: Option<&[f32]>,
    ) -> Result<()> {
        if let Some(probs) = probabilities {
            if probs.len() < boxes.len() {
                return Err(Error::invalid(format!(
                    "{} boxes but only {} probabilities",
                    boxes.len(),
                    probs.len()
                )));
            }
        }

        for (index, bbox) in boxes.iter().enumerate() {
            if bbox.is_sentinel() {
                continue;
            }
            let color = color_for(colors, index, bbox)?;
            let name = label_names.name_of(index, &bbox.label)?;
            let text = match probabilities {
                Some(probs) => format!("{name} {:.2}%", probs[index] * 100.0),
                None => name.to_string(),
            };
            debug!("box {index}: '{text}' at {:?}", bbox.coords());

            figure.draw_box(bbox, color, self.config.line_width);
            figure.draw_label(&self.font, &text, bbox.x_min, bbox.y_min, color);
        }
        Ok(())
    }

    fn indexed_path(&self, index: u32) -> PathBuf {
        self.config.output_dir.join(format!("{index:03}.png"))
    }
}

fn color_for(colors: &LabelColors, index: usize, bbox: &BoundingBox) -> Result<super::Color> {
    colors
        .color_of(&bbox.label)
        .ok_or_else(|| Error::malformed(format!("box {index}: label id '{}' has no color", bbox.label)))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn in_image(err: Error, image: &str) -> Error {
    match err {
        Error::MalformedAnnotation(msg) => Error::malformed(format!("{image}: {msg}")),
        Error::InvalidInput(msg) => Error::invalid(format!("{image}: {msg}")),
        other => other,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::render::RecordingViewer;
    use crate::settings::RenderConfig;

    fn renderer() -> Renderer {
        Renderer::headless(RenderConfig::default())
    }

    fn gray(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([90, 90, 90]))
    }

    fn names() -> LabelNames {
        [("cat", "cat"), ("0", "person"), ("1", "car")].into_iter().collect()
    }

    #[test]
    fn sentinel_boxes_skip_name_lookup() {
        let boxes = vec![
            BoundingBox::new(2.0, 12.0, 20.0, 30.0, 0u32),
            BoundingBox::new(0.0, 0.0, 0.0, 0.0, 99u32),
        ];
        let out = renderer()
            .render_single(&gray(40, 40), &boxes, &names(), None, None, None)
            .unwrap();
        assert_eq!(out.dimensions(), (40, 40));
        assert_ne!(out.get_pixel(2, 20), &Rgb([90, 90, 90]));
    }

    #[test]
    fn unknown_label_is_malformed() {
        let boxes = vec![BoundingBox::new(2.0, 2.0, 20.0, 20.0, 7u32)];
        let err = renderer()
            .render_single(&gray(40, 40), &boxes, &names(), None, None, None)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedAnnotation(_)), "{err}");
        assert!(err.to_string().contains("box 0"));
    }

    #[test]
    fn short_probabilities_are_invalid() {
        let boxes = vec![
            BoundingBox::new(2.0, 2.0, 20.0, 20.0, 0u32),
            BoundingBox::new(4.0, 4.0, 30.0, 30.0, 1u32),
        ];
        let err = renderer()
            .render_single(&gray(40, 40), &boxes, &names(), Some(&[0.5]), None, None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn single_render_saves_and_shows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("single.png");
        let viewer = RecordingViewer::default();
        let mut r = renderer().with_viewer(viewer.clone());

        let boxes = vec![BoundingBox::new(2.0, 12.0, 20.0, 30.0, 0u32)];
        let out = r
            .render_single(&gray(40, 40), &boxes, &names(), Some(&[0.875]), Some("frame 1"), Some(&path))
            .unwrap();

        assert!(path.is_file());
        assert_eq!(viewer.titles(), ["frame 1"]);
        assert_eq!(viewer.images()[0], out);
        assert!(out.height() > 40, "title band expected");
    }

    #[test]
    fn predictions_shift_onto_right_copy() {
        let gt = vec![BoundingBox::new(10.0, 10.0, 50.0, 50.0, "cat")];
        let pred = gt.clone();
        let shifted = shift_boxes(&pred, 210.0);
        assert_eq!(shifted[0], BoundingBox::new(220.0, 10.0, 260.0, 50.0, "cat"));
        assert_eq!(pred[0].x_min, 10.0);

        let composite = renderer()
            .compose_comparison(&gray(200, 100), &gt, &pred, &[0.9], &names())
            .unwrap();
        assert_eq!(composite.dimensions(), (410, 100));

        // separator column stays white, both left edges share one color
        assert_eq!(composite.get_pixel(205, 70), &WHITE);
        let left = composite.get_pixel(10, 30);
        assert_ne!(left, &Rgb([90, 90, 90]));
        assert_eq!(composite.get_pixel(220, 30), left);
        assert_eq!(composite.get_pixel(259, 30), &Rgb([90, 90, 90]));
        assert_eq!(composite.get_pixel(260, 30), left);
    }

    #[test]
    fn comparison_tensor_has_fixed_shape() {
        let gt = vec![BoundingBox::new(10.0, 10.0, 50.0, 50.0, 0u32), BoundingBox::new(0.0, 0.0, 0.0, 0.0, 0u32)];
        let pred = vec![BoundingBox::new(12.0, 8.0, 40.0, 60.0, 1u32)];
        let tensor = renderer()
            .render_comparison(&gray(64, 64), &gt, &pred, &[0.42], &names())
            .unwrap();
        assert_eq!(tensor.shape(), &[400, 1200, 3]);
    }

    #[test]
    fn normalized_render_returns_next_index_and_saves() {
        let tmp = tempfile::tempdir().unwrap();
        let config = RenderConfig {
            output_dir: tmp.path().to_path_buf(),
            ..RenderConfig::default()
        };
        let mut r = Renderer::headless(config);
        let boxes = vec![
            BoundingBox::new(0.1, 0.2, 0.5, 0.6, 0u32),
            BoundingBox::new(0.0, 0.0, 0.0, 0.0, 5u32),
        ];
        let options = NormalizedOptions {
            index: Some(7),
            ..Default::default()
        };

        let next = r.render_normalized(&gray(200, 100), &boxes, options).unwrap();
        assert_eq!(next, Some(8));
        assert!(tmp.path().join("007.png").is_file());

        let next = r
            .render_normalized(&gray(200, 100), &boxes, NormalizedOptions::default())
            .unwrap();
        assert_eq!(next, None);
    }

    #[test]
    fn normalized_render_marks_corners_after_axis_swap() {
        let viewer = RecordingViewer::default();
        let mut r = renderer().with_viewer(viewer.clone());
        // (y_min, x_min, y_max, x_max) of pixel box (20, 20, 100, 60)
        let boxes = vec![BoundingBox::new(0.2, 0.1, 0.6, 0.5, 1u32)];
        let names = names();
        let options = NormalizedOptions {
            axis_swap: true,
            label_names: Some(&names),
            ..Default::default()
        };
        r.render_normalized(&gray(200, 100), &boxes, options).unwrap();

        let shown = &viewer.images()[0];
        assert_eq!(shown.get_pixel(20, 20), &TOP_LEFT_MARKER);
        assert_eq!(shown.get_pixel(100, 60), &BOTTOM_RIGHT_MARKER);
    }

    #[test]
    fn unbounded_boxes_render_without_overflow() {
        let boxes = vec![
            BoundingBox::new(0.0, 0.0, 1e10, 10.0, 0u32),
            BoundingBox::new(5.0, 5.0, f32::INFINITY, 20.0, 1u32),
            BoundingBox::new(5.0, -3e9, 20.0, 20.0, 0u32),
        ];
        let out = renderer()
            .render_single(&gray(40, 40), &boxes, &names(), Some(&[0.5, 0.25, 0.75]), None, None)
            .unwrap();
        assert_eq!(out.dimensions(), (40, 40));

        let gt = vec![BoundingBox::new(2.0, 2.0, 10.0, 10.0, 0u32)];
        let tensor = renderer()
            .render_comparison(&gray(40, 40), &gt, &boxes, &[0.5, 0.25, 0.75], &names())
            .unwrap();
        assert_eq!(tensor.shape(), &[400, 1200, 3]);

        let raw = vec![BoundingBox::new(0.1, -1e9, f32::INFINITY, 0.5, 1u32)];
        let names = names();
        let options = NormalizedOptions {
            label_names: Some(&names),
            ..Default::default()
        };
        renderer().render_normalized(&gray(40, 40), &raw, options).unwrap();
    }

    #[test]
    fn normalized_sentinels_skip_name_lookup() {
        // the second box truncates to all zeros on a 40x40 image
        let boxes = vec![
            BoundingBox::new(0.1, 0.1, 0.5, 0.5, 0u32),
            BoundingBox::new(0.0, 0.0, 0.0, 0.0, 99u32),
            BoundingBox::new(0.001, 0.002, 0.01, 0.02, 98u32),
        ];
        let names = names();
        let options = NormalizedOptions {
            label_names: Some(&names),
            ..Default::default()
        };
        renderer().render_normalized(&gray(40, 40), &boxes, options).unwrap();

        let unknown = vec![BoundingBox::new(0.1, 0.1, 0.5, 0.5, 99u32)];
        let err = renderer().render_normalized(&gray(40, 40), &unknown, options).unwrap_err();
        assert!(matches!(err, Error::MalformedAnnotation(_)));
    }

    #[test]
    fn comparison_sentinels_skip_name_lookup() {
        let gt = vec![
            BoundingBox::new(2.0, 12.0, 20.0, 30.0, 0u32),
            BoundingBox::new(0.0, 0.0, 0.0, 0.0, 42u32),
        ];
        let pred = vec![
            BoundingBox::new(0.0, 0.0, 0.0, 0.0, 43u32),
            BoundingBox::new(4.0, 14.0, 22.0, 32.0, 1u32),
        ];
        let composite = renderer()
            .compose_comparison(&gray(40, 40), &gt, &pred, &[0.0, 0.6], &names())
            .unwrap();
        assert_eq!(composite.dimensions(), (90, 40));
    }

    #[test]
    fn polygons_saved_by_index() {
        let tmp = tempfile::tempdir().unwrap();
        let config = RenderConfig {
            output_dir: tmp.path().to_path_buf(),
            ..RenderConfig::default()
        };
        let polygon = vec![(5.0, 5.0), (30.0, 8.0), (28.0, 30.0), (4.0, 25.0)];
        let path = Renderer::headless(config)
            .render_polygons(&gray(40, 40), &[polygon], 3)
            .unwrap();
        assert_eq!(path, tmp.path().join("003.png"));

        let saved = io::load_image(&path).unwrap();
        assert_eq!(saved.get_pixel(5, 5), &POLYGON_COLOR);
    }
}
