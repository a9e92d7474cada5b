// sizefit/src/processors/metadata.rs
use exif::{Exif, In, Reader, Tag, Value};
use image::ImageFormat;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

/// Resolution reported when a source carries none.
pub const DEFAULT_RESOLUTION: u32 = 72;

const CM_PER_INCH: f64 = 2.54;
const METERS_PER_INCH: f64 = 0.0254;

pub struct MetadataProcessor;

impl MetadataProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Reads EXIF from `path`. Missing or unreadable metadata is not an error.
    pub fn read_metadata(&self, path: &Path) -> Option<Exif> {
        let file = File::open(path).ok()?;
        let mut bufreader = BufReader::new(&file);

        match Reader::new().read_from_container(&mut bufreader) {
            Ok(exif) => {
                log::debug!("Found EXIF data in {}", path.display());
                Some(exif)
            }
            Err(exif::Error::NotFound(_)) => {
                log::debug!("No EXIF data found in {}", path.display());
                None
            }
            Err(e) => {
                log::debug!("Ignoring unreadable EXIF in {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Horizontal resolution in dots per inch, if the source declares one.
    pub fn resolution(&self, exif: &Exif) -> Option<u32> {
        let field = exif.get_field(Tag::XResolution, In::PRIMARY)?;
        let value = match &field.value {
            Value::Rational(values) => values.first()?.to_f64(),
            _ => return None,
        };

        // ResolutionUnit 3 is centimetres; 2 (inches) is the default.
        let per_inch = match exif
            .get_field(Tag::ResolutionUnit, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
        {
            Some(3) => value * CM_PER_INCH,
            _ => value,
        };

        to_dpi(per_inch)
    }

    /// Density declared by the image container itself: the JFIF header,
    /// the PNG pHYs chunk or the TIFF resolution tags.
    pub fn container_resolution(&self, path: &Path) -> Option<u32> {
        let bytes = std::fs::read(path).ok()?;
        let per_inch = match image::guess_format(&bytes).ok()? {
            ImageFormat::Jpeg => jfif_density(&bytes),
            ImageFormat::Png => png_density(&bytes),
            ImageFormat::Tiff => tiff_density(&bytes),
            _ => None,
        }?;

        log::debug!("Container density of {}: {:.2} DPI", path.display(), per_inch);
        to_dpi(per_inch)
    }

    /// Source resolution for result messages: container density, then EXIF,
    /// then 72 DPI.
    pub fn source_resolution(&self, path: &Path) -> u32 {
        self.container_resolution(path)
            .or_else(|| {
                self.read_metadata(path)
                    .and_then(|exif| self.resolution(&exif))
            })
            .unwrap_or(DEFAULT_RESOLUTION)
    }
}

fn to_dpi(per_inch: f64) -> Option<u32> {
    if per_inch.is_finite() && per_inch >= 1.0 && per_inch <= u32::MAX as f64 {
        Some(per_inch.round() as u32)
    } else {
        None
    }
}

/// Walks the marker segments up to the first scan looking for JFIF APP0.
fn jfif_density(bytes: &[u8]) -> Option<f64> {
    let mut pos = 2;

    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }

        let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        let segment = bytes.get(pos + 4..pos + 2 + len)?;
        if marker == 0xE0 && segment.len() >= 12 && segment.starts_with(b"JFIF\0") {
            let density = f64::from(u16::from_be_bytes([segment[8], segment[9]]));
            // Units: 0 is an aspect ratio only, 1 dots per inch, 2 dots per cm.
            return match segment[7] {
                1 => Some(density),
                2 => Some(density * CM_PER_INCH),
                _ => None,
            };
        }

        pos += 2 + len;
    }

    None
}

fn png_density(bytes: &[u8]) -> Option<f64> {
    let reader = png::Decoder::new(Cursor::new(bytes)).read_info().ok()?;
    let dims = reader.info().pixel_dims?;

    match dims.unit {
        png::Unit::Meter => Some(f64::from(dims.xppu) * METERS_PER_INCH),
        png::Unit::Unspecified => None,
    }
}

fn tiff_density(bytes: &[u8]) -> Option<f64> {
    use tiff::decoder::ifd::Value as TiffValue;
    use tiff::tags::Tag as TiffTag;

    let mut decoder = tiff::decoder::Decoder::new(Cursor::new(bytes)).ok()?;
    let value = match decoder.find_tag(TiffTag::XResolution).ok()?? {
        TiffValue::Rational(n, d) if d != 0 => f64::from(n) / f64::from(d),
        _ => return None,
    };

    // ResolutionUnit defaults to inches; 1 means no absolute unit.
    match decoder
        .find_tag_unsigned::<u16>(TiffTag::ResolutionUnit)
        .ok()
        .flatten()
    {
        Some(1) => None,
        Some(3) => Some(value * CM_PER_INCH),
        _ => Some(value),
    }
}

impl Default for MetadataProcessor {
    fn default() -> Self {
        Self::new()
    }
}
