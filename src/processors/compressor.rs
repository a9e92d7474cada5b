// sizefit/src/processors/compressor.rs
use super::strategy::EncodeParams;
use crate::core::{OutputFormat, Result, SizefitError};
use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use oxipng::{optimize_from_memory, Options};
use std::io::{Cursor, Write};
use std::path::Path;

const METERS_PER_INCH: f64 = 0.0254;

/// Bytes produced by a trial encode together with their measured size.
#[derive(Debug)]
pub struct Trial {
    pub size: u64,
    pub bytes: Vec<u8>,
}

impl Trial {
    /// Writes the already encoded bytes to `destination`.
    pub fn persist(&self, destination: &Path) -> Result<u64> {
        std::fs::write(destination, &self.bytes)?;
        Ok(std::fs::metadata(destination)?.len())
    }
}

/// Black-box encoder the search measures through.
///
/// Implementors only provide [`Encoder::encode`]; trial and final encodes are
/// built on top of it.
pub trait Encoder: Send + Sync {
    fn encode(&self, image: &DynamicImage, format: OutputFormat, params: EncodeParams) -> Result<Vec<u8>>;

    /// Encodes into a uniquely named scratch file inside `scratch_dir` and
    /// reports its size on disk. The scratch file is removed before returning,
    /// on success and on error alike.
    fn trial_encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        params: EncodeParams,
        scratch_dir: &Path,
    ) -> Result<Trial> {
        let bytes = self.encode(image, format, params)?;

        let mut scratch = tempfile::Builder::new()
            .prefix(".sizefit-trial-")
            .suffix(&format!(".{}", format.primary_extension()))
            .tempfile_in(scratch_dir)?;
        scratch.write_all(&bytes)?;
        scratch.flush()?;
        let size = scratch.as_file().metadata()?.len();
        scratch.close()?;

        Ok(Trial { size, bytes })
    }

    fn final_encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        params: EncodeParams,
        destination: &Path,
    ) -> Result<u64> {
        let bytes = self.encode(image, format, params)?;
        std::fs::write(destination, &bytes)?;
        let size = std::fs::metadata(destination)?.len();
        log::debug!(
            "Saved {} to {} ({} bytes, {:?})",
            format,
            destination.display(),
            size,
            params
        );
        Ok(size)
    }
}

/// Production encoder covering JPEG, PNG, WebP and TIFF.
#[derive(Debug, Clone)]
pub struct Compressor {
    optimize_png: bool,
}

impl Compressor {
    pub fn new() -> Self {
        Self { optimize_png: true }
    }

    pub fn with_png_optimization(mut self, optimize: bool) -> Self {
        self.optimize_png = optimize;
        self
    }

    fn encode_jpeg(&self, image: &DynamicImage, params: EncodeParams) -> Result<Vec<u8>> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut buffer = Cursor::new(Vec::new());

        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, params.quality);
        if let Some(dpi) = params.resolution {
            encoder.set_pixel_density(PixelDensity::dpi(clamp_density(dpi)));
        }
        encoder
            .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
            .map_err(|e| SizefitError::encode(OutputFormat::Jpeg, e))?;

        Ok(buffer.into_inner())
    }

    fn encode_webp(&self, image: &DynamicImage, params: EncodeParams) -> Result<Vec<u8>> {
        // WebP has no density field; the resolution parameter is ignored.
        let quality = params.quality as f32;
        let encoded = if image.color().has_alpha() {
            let rgba = image.to_rgba8();
            let (width, height) = rgba.dimensions();
            webp::Encoder::from_rgba(&rgba, width, height).encode(quality)
        } else {
            let rgb = image.to_rgb8();
            let (width, height) = rgb.dimensions();
            webp::Encoder::from_rgb(&rgb, width, height).encode(quality)
        };

        if encoded.is_empty() {
            return Err(SizefitError::encode(
                OutputFormat::WebP,
                "encoder produced no data",
            ));
        }

        Ok(encoded.to_vec())
    }

    fn encode_png(&self, image: &DynamicImage, params: EncodeParams) -> Result<Vec<u8>> {
        let (data, color) = if image.color().has_alpha() {
            (image.to_rgba8().into_raw(), png::ColorType::Rgba)
        } else {
            (image.to_rgb8().into_raw(), png::ColorType::Rgb)
        };

        let mut buffer = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut buffer, image.width(), image.height());
            encoder.set_color(color);
            encoder.set_depth(png::BitDepth::Eight);
            if let Some(dpi) = params.resolution {
                let ppm = dots_per_meter(dpi);
                encoder.set_pixel_dims(Some(png::PixelDimensions {
                    xppu: ppm,
                    yppu: ppm,
                    unit: png::Unit::Meter,
                }));
            }

            let mut writer = encoder
                .write_header()
                .map_err(|e| SizefitError::encode(OutputFormat::Png, format!("header: {}", e)))?;
            writer
                .write_image_data(&data)
                .map_err(|e| SizefitError::encode(OutputFormat::Png, format!("data: {}", e)))?;
            writer
                .finish()
                .map_err(|e| SizefitError::encode(OutputFormat::Png, format!("finish: {}", e)))?;
        }

        if self.optimize_png {
            return optimize_from_memory(&buffer, &Options::default())
                .map_err(|e| SizefitError::encode(OutputFormat::Png, format!("optimization failed: {}", e)));
        }

        Ok(buffer)
    }

    fn encode_tiff(&self, image: &DynamicImage, params: EncodeParams) -> Result<Vec<u8>> {
        use tiff::encoder::colortype::{RGB8, RGBA8};
        use tiff::encoder::compression::Deflate;
        use tiff::encoder::{Rational, TiffEncoder};
        use tiff::tags::ResolutionUnit;

        let tiff_err = |e: tiff::TiffError| SizefitError::encode(OutputFormat::Tiff, e);
        let (width, height) = (image.width(), image.height());
        let resolution = params.resolution.map(|dpi| Rational { n: dpi, d: 1 });
        let mut buffer = Cursor::new(Vec::new());

        {
            let mut encoder = TiffEncoder::new(&mut buffer).map_err(tiff_err)?;
            if image.color().has_alpha() {
                let rgba = image.to_rgba8();
                let mut frame = encoder
                    .new_image_with_compression::<RGBA8, _>(width, height, Deflate::default())
                    .map_err(tiff_err)?;
                if let Some(value) = resolution {
                    frame.resolution(ResolutionUnit::Inch, value);
                }
                frame.write_data(rgba.as_raw()).map_err(tiff_err)?;
            } else {
                let rgb = image.to_rgb8();
                let mut frame = encoder
                    .new_image_with_compression::<RGB8, _>(width, height, Deflate::default())
                    .map_err(tiff_err)?;
                if let Some(value) = resolution {
                    frame.resolution(ResolutionUnit::Inch, value);
                }
                frame.write_data(rgb.as_raw()).map_err(tiff_err)?;
            }
        }

        Ok(buffer.into_inner())
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder for Compressor {
    fn encode(&self, image: &DynamicImage, format: OutputFormat, params: EncodeParams) -> Result<Vec<u8>> {
        match format {
            OutputFormat::Jpeg => self.encode_jpeg(image, params),
            OutputFormat::Png => self.encode_png(image, params),
            OutputFormat::WebP => self.encode_webp(image, params),
            OutputFormat::Tiff => self.encode_tiff(image, params),
        }
    }
}

fn clamp_density(dpi: u32) -> u16 {
    dpi.clamp(1, u16::MAX as u32) as u16
}

fn dots_per_meter(dpi: u32) -> u32 {
    (dpi as f64 / METERS_PER_INCH).round() as u32
}
