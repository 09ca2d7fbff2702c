use crate::settings::RenderConfig;
use crate::Result;
use image::RgbImage;

pub mod annotate;
pub mod color;
pub mod display;
pub mod figure;
pub mod font;

pub use annotate::NormalizedOptions;
pub use color::{assign_colors, assign_colors_with, Color, LabelColors, PALETTE};
pub use display::{RecordingViewer, Viewer, WindowViewer};
pub use figure::Figure;
pub use font::LabelFont;

/// Annotation renderer. Holds the settings, the label font and, when display
/// is enabled, the viewer every finished figure is shown in.
pub struct Renderer {
    config: RenderConfig,
    font: LabelFont,
    viewer: Option<Box<dyn Viewer>>,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Result<Self> {
        let font = LabelFont::discover(config.font_path.as_deref(), config.font_size)?;
        let viewer: Option<Box<dyn Viewer>> = if config.show {
            Some(Box::<WindowViewer>::default())
        } else {
            None
        };
        Ok(Self { config, font, viewer })
    }

    /// Renderer that never opens a window and draws with the bitmap font.
    pub fn headless(config: RenderConfig) -> Self {
        let font = LabelFont::bitmap(config.font_size);
        Self {
            config,
            font,
            viewer: None,
        }
    }

    pub fn with_viewer(mut self, viewer: impl Viewer + 'static) -> Self {
        self.viewer = Some(Box::new(viewer));
        self
    }

    fn present(&mut self, title: &str, image: &RgbImage) -> Result<()> {
        match self.viewer.as_mut() {
            Some(viewer) => viewer.show(title, image),
            None => Ok(()),
        }
    }
}
