use crate::{Error, Result};
use image::RgbImage;
use log::debug;
use minifb::{Key, Window, WindowOptions};
use std::cell::RefCell;
use std::rc::Rc;

/// Interactive output sink for rendered figures.
pub trait Viewer {
    fn show(&mut self, title: &str, image: &RgbImage) -> Result<()>;
}

/// Blocking `minifb` window; returns once the window is closed or Escape is
/// pressed.
#[derive(Debug)]
pub struct WindowViewer {
    pub target_fps: usize,
}

impl Default for WindowViewer {
    fn default() -> Self {
        Self { target_fps: 30 }
    }
}

impl Viewer for WindowViewer {
    fn show(&mut self, title: &str, image: &RgbImage) -> Result<()> {
        let (w, h) = (image.width() as usize, image.height() as usize);
        let buffer: Vec<u32> = image
            .pixels()
            .map(|p| {
                let [r, g, b] = p.0;
                (r as u32) << 16 | (g as u32) << 8 | b as u32
            })
            .collect();

        let mut window =
            Window::new(title, w, h, WindowOptions::default()).map_err(|e| Error::Display(e.to_string()))?;
        window.set_target_fps(self.target_fps.max(1));
        debug!("showing '{title}' ({w}x{h})");

        while window.is_open() && !window.is_key_down(Key::Escape) {
            window
                .update_with_buffer(&buffer, w, h)
                .map_err(|e| Error::Display(e.to_string()))?;
        }
        Ok(())
    }
}

/// Keeps every shown figure in memory instead of opening a window. Clones
/// share the same record.
#[derive(Debug, Default, Clone)]
pub struct RecordingViewer {
    shown: Rc<RefCell<Vec<(String, RgbImage)>>>,
}

impl RecordingViewer {
    pub fn titles(&self) -> Vec<String> {
        self.shown.borrow().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn images(&self) -> Vec<RgbImage> {
        self.shown.borrow().iter().map(|(_, img)| img.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.shown.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shown.borrow().is_empty()
    }
}

impl Viewer for RecordingViewer {
    fn show(&mut self, title: &str, image: &RgbImage) -> Result<()> {
        self.shown.borrow_mut().push((title.to_string(), image.clone()));
        Ok(())
    }
}
