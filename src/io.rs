use crate::{Error, Result};
use image::RgbImage;
use log::info;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Decode any supported raster into an 8-bit RGB buffer.
pub fn load_image(path: impl AsRef<Path>) -> Result<RgbImage> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|e| Error::io(path, e))?;
    Ok(img.to_rgb8())
}

/// Encode `image` to `path`; the extension selects the format. Missing parent
/// directories are created.
pub fn save_image(image: &RgbImage, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }
    image.save(path).map_err(|e| Error::io(path, e))?;
    info!("saved {}x{} image to {}", image.width(), image.height(), path.display());
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod test {
    use super::*;
    use image::Rgb;

    #[test]
    fn save_creates_parent_dirs_and_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/dir/out.png");
        let img = RgbImage::from_pixel(3, 2, Rgb([12, 34, 56]));
        save_image(&img, &path).unwrap();

        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded.dimensions(), (3, 2));
        assert_eq!(loaded.get_pixel(1, 1), &Rgb([12, 34, 56]));
    }

    #[test]
    fn missing_file_is_io_failure() {
        let err = load_image("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, Error::IoFailure { .. }));
        assert!(err.to_string().contains("/definitely/not/here.png"));
    }
}
