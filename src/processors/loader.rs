// sizefit/src/processors/loader.rs
use crate::core::{Result, SizefitError};
use image::{DynamicImage, GenericImageView, ImageReader};
use std::path::Path;

/// A decoded source image plus the on-disk size it was read from.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub image: DynamicImage,
    pub file_size: u64,
}

#[derive(Clone)]
pub struct Loader {
    max_dimensions: Option<(u32, u32)>,
}

impl Loader {
    pub fn new() -> Self {
        Self {
            max_dimensions: Some((100_000, 100_000)),
        }
    }

    pub fn with_max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.max_dimensions = Some((width, height));
        self
    }

    /// Decodes `path` once. Every failure is reported as `LoadFailure`.
    pub fn load(&self, path: &Path) -> Result<LoadedImage> {
        log::debug!("Loading image from: {}", path.display());

        let file_size = self.validate_path(path)?;

        let image = ImageReader::open(path)
            .map_err(|e| load_failure(path, e))?
            .with_guessed_format()
            .map_err(|e| load_failure(path, e))?
            .decode()
            .map_err(|e| load_failure(path, e))?;

        if let Some((max_w, max_h)) = self.max_dimensions {
            let (width, height) = image.dimensions();
            if width > max_w || height > max_h {
                return Err(SizefitError::LoadFailure(format!(
                    "Image dimensions {}x{} exceed maximum {}x{}",
                    width, height, max_w, max_h
                )));
            }
        }

        let (width, height) = image.dimensions();
        log::debug!(
            "Loaded image: {}x{} pixels, color: {:?}, {} bytes on disk",
            width,
            height,
            image.color(),
            file_size
        );

        Ok(LoadedImage { image, file_size })
    }

    fn validate_path(&self, path: &Path) -> Result<u64> {
        let metadata = path.metadata().map_err(|e| load_failure(path, e))?;

        if !metadata.is_file() {
            return Err(SizefitError::LoadFailure(format!(
                "Not a file: {}",
                path.display()
            )));
        }

        if metadata.len() == 0 {
            return Err(SizefitError::LoadFailure(format!(
                "File is empty: {}",
                path.display()
            )));
        }

        Ok(metadata.len())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

fn load_failure(path: &Path, err: impl std::fmt::Display) -> SizefitError {
    SizefitError::LoadFailure(format!("{}: {}", path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_load_reports_size_and_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("src.png");
        RgbImage::new(6, 4).save(&path).unwrap();

        let loaded = Loader::new().load(&path).unwrap();
        assert_eq!(loaded.image.dimensions(), (6, 4));
        assert_eq!(loaded.file_size, std::fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn test_missing_and_corrupt_files_are_load_failures() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.jpg");
        assert!(matches!(
            Loader::new().load(&missing),
            Err(SizefitError::LoadFailure(_))
        ));

        let corrupt = dir.path().join("corrupt.jpg");
        std::fs::write(&corrupt, b"definitely not a jpeg").unwrap();
        assert!(matches!(
            Loader::new().load(&corrupt),
            Err(SizefitError::LoadFailure(_))
        ));

        let empty = dir.path().join("empty.png");
        std::fs::write(&empty, b"").unwrap();
        assert!(matches!(
            Loader::new().load(&empty),
            Err(SizefitError::LoadFailure(_))
        ));
    }

    #[test]
    fn test_dimension_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        RgbImage::new(20, 2).save(&path).unwrap();

        let loader = Loader::new().with_max_dimensions(10, 10);
        assert!(matches!(loader.load(&path), Err(SizefitError::LoadFailure(_))));
    }
}
