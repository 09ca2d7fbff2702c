use crate::Result;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_NAME: &str = "bbox-viz";

/// Renderer settings. Loaded by [`RenderConfig::load`] from, in increasing
/// priority: built-in defaults, `<config dir>/bbox-viz/config.toml`,
/// `./bbox-viz.toml`, an explicit file, and `BBOX_VIZ_*` variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Open a window for every rendered figure.
    pub show: bool,
    /// Where indexed figures (`000.png`, `001.png`, ...) land.
    pub output_dir: PathBuf,
    /// TrueType font for labels and titles. Falls back to system fonts, then
    /// to the built-in bitmap font.
    pub font_path: Option<PathBuf>,
    pub font_size: f32,
    pub line_width: u32,
    /// White column between the two halves of a comparison image.
    pub separator_width: u32,
    pub comparison_height: u32,
    pub comparison_width: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            show: false,
            output_dir: PathBuf::from("."),
            font_path: None,
            font_size: 12.0,
            line_width: 1,
            separator_width: 10,
            comparison_height: 400,
            comparison_width: 1200,
        }
    }
}

impl RenderConfig {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&RenderConfig::default())?);

        if let Some(dir) = dirs::config_dir() {
            builder = builder.add_source(File::from(dir.join(CONFIG_NAME).join("config.toml")).required(false));
        }
        builder = builder.add_source(File::with_name(CONFIG_NAME).required(false));
        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(Environment::with_prefix("BBOX_VIZ").try_parsing(true))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn explicit_file_overrides_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("viz.toml");
        fs::write(&path, "separator_width = 4\nline_width = 2\noutput_dir = \"figs\"\n").unwrap();

        let cfg = RenderConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.separator_width, 4);
        assert_eq!(cfg.line_width, 2);
        assert_eq!(cfg.output_dir, PathBuf::from("figs"));
        assert_eq!(cfg.comparison_width, 1200);
        assert!(cfg.font_path.is_none());
    }

    #[test]
    fn missing_explicit_file_fails() {
        let err = RenderConfig::load(Some(Path::new("/no/such/viz.toml")));
        assert!(err.is_err());
    }
}
