// sizefit/src/core/mod.rs
pub mod processor;

use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Which encoder knob the search varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
    Quality,
    Resolution,
}

impl SearchMode {
    pub fn label(&self) -> &'static str {
        match self {
            SearchMode::Quality => "Size",
            SearchMode::Resolution => "DPI",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Tiff,
}

/// Static capability record for one output format.
#[derive(Debug, Clone, Copy)]
pub struct FormatSpec {
    pub format: OutputFormat,
    pub extensions: &'static [&'static str],
    pub quality_capable: bool,
    pub resolution_capable: bool,
}

const FORMAT_TABLE: [FormatSpec; 4] = [
    FormatSpec {
        format: OutputFormat::Jpeg,
        extensions: &["jpg", "jpeg"],
        quality_capable: true,
        resolution_capable: true,
    },
    FormatSpec {
        format: OutputFormat::Png,
        extensions: &["png"],
        quality_capable: false,
        resolution_capable: true,
    },
    FormatSpec {
        format: OutputFormat::WebP,
        extensions: &["webp"],
        quality_capable: true,
        resolution_capable: true,
    },
    FormatSpec {
        format: OutputFormat::Tiff,
        extensions: &["tiff", "tif"],
        quality_capable: false,
        resolution_capable: true,
    },
];

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Jpeg,
        OutputFormat::Png,
        OutputFormat::WebP,
        OutputFormat::Tiff,
    ];

    pub fn spec(&self) -> &'static FormatSpec {
        // The table is ordered like the enum.
        &FORMAT_TABLE[*self as usize]
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        FORMAT_TABLE
            .iter()
            .find(|spec| spec.extensions.contains(&ext.as_str()))
            .map(|spec| spec.format)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn is_quality_capable(&self) -> bool {
        self.spec().quality_capable
    }

    pub fn supports(&self, mode: SearchMode) -> bool {
        match mode {
            SearchMode::Quality => self.spec().quality_capable,
            SearchMode::Resolution => self.spec().resolution_capable,
        }
    }

    pub fn primary_extension(&self) -> &'static str {
        self.spec().extensions[0]
    }

    /// Extensions of every format usable in `mode`, dotted, for messages.
    pub fn extensions_for(mode: SearchMode) -> Vec<String> {
        Self::ALL
            .iter()
            .filter(|format| format.supports(mode))
            .flat_map(|format| format.spec().extensions.iter())
            .map(|ext| format!(".{}", ext))
            .collect()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::WebP => "WebP",
            OutputFormat::Tiff => "TIFF",
        };
        f.write_str(name)
    }
}

/// Closed integer interval searched by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterDomain {
    pub min: u32,
    pub max: u32,
}

impl ParameterDomain {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if self.min > self.max {
            return Err(SizefitError::InvalidParameter(format!(
                "{} range is empty: min {} > max {}",
                name, self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Upper bound on encoder calls. A single-point domain takes one trial;
    /// otherwise two boundary trials plus a bisection over the whole domain.
    pub fn max_trials(&self) -> u32 {
        if self.min >= self.max {
            return 1;
        }
        let span = u64::from(self.max - self.min) + 1;
        let steps = u64::BITS - span.leading_zeros();
        steps + 2
    }
}

#[derive(Debug, Clone)]
pub struct ResizeConfig {
    pub quality_range: ParameterDomain,
    pub resolution_range: ParameterDomain,
    pub tolerance: f64,
    /// Quality used for lossy formats while searching resolution.
    pub resolution_mode_quality: u8,
    pub optimize_png: bool,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            quality_range: ParameterDomain::new(10, 95),
            resolution_range: ParameterDomain::new(25, 600),
            tolerance: 0.05,
            resolution_mode_quality: 95,
            optimize_png: true,
        }
    }
}

impl ResizeConfig {
    pub fn validate(&self) -> Result<()> {
        self.quality_range.validate("Quality")?;
        self.resolution_range.validate("Resolution")?;

        if self.quality_range.min == 0 || self.quality_range.max > 100 {
            return Err(SizefitError::InvalidParameter(
                "Quality range must lie within 1 and 100".to_string(),
            ));
        }

        if self.resolution_range.min == 0 || self.resolution_range.max > u16::MAX as u32 {
            return Err(SizefitError::InvalidParameter(format!(
                "Resolution range must lie within 1 and {} DPI",
                u16::MAX
            )));
        }

        if !(0.0..1.0).contains(&self.tolerance) {
            return Err(SizefitError::InvalidParameter(format!(
                "Tolerance must be in [0, 1), got {}",
                self.tolerance
            )));
        }

        if self.resolution_mode_quality == 0 || self.resolution_mode_quality > 100 {
            return Err(SizefitError::InvalidParameter(
                "Quality must be between 1 and 100".to_string(),
            ));
        }

        Ok(())
    }

    pub fn domain_for(&self, mode: SearchMode) -> ParameterDomain {
        match mode {
            SearchMode::Quality => self.quality_range,
            SearchMode::Resolution => self.resolution_range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeStatus {
    /// A parameter meeting the target was found and written.
    Succeeded,
    /// Target unreachable; the smallest output the domain allows was written.
    BestEffort,
    /// Nothing usable was written.
    Failed,
}

/// Final record of one resize operation. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct ResizeResult {
    pub status: ResizeStatus,
    pub message: String,
    pub input_size: Option<u64>,
    pub output_size: Option<u64>,
    pub quality: Option<u8>,
    pub resolution: Option<u32>,
    pub elapsed: Duration,
}

impl ResizeResult {
    pub fn success(&self) -> bool {
        self.status == ResizeStatus::Succeeded
    }

    pub fn failed(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            status: ResizeStatus::Failed,
            message: message.into(),
            input_size: None,
            output_size: None,
            quality: None,
            resolution: None,
            elapsed,
        }
    }
}

/// Aggregate over a batch of resize results.
#[derive(Debug, Default, Clone)]
pub struct BatchSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub best_effort: usize,
    pub failed: usize,
    pub total_input_size: u64,
    pub total_output_size: u64,
    pub errors: Vec<(String, String)>,
}

impl BatchSummary {
    pub fn record(&mut self, name: &str, result: &ResizeResult) {
        self.processed += 1;
        match result.status {
            ResizeStatus::Succeeded => self.succeeded += 1,
            ResizeStatus::BestEffort => self.best_effort += 1,
            ResizeStatus::Failed => self.failed += 1,
        }

        if let Some(size) = result.input_size {
            self.total_input_size += size;
        }
        if let Some(size) = result.output_size {
            self.total_output_size += size;
        }

        if !result.success() {
            self.errors.push((name.to_string(), result.message.clone()));
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.processed == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.processed as f64 * 100.0
    }

    /// Percentage saved relative to the inputs, or `None` when either side is empty.
    pub fn size_reduction(&self) -> Option<f64> {
        if self.total_input_size == 0 || self.total_output_size == 0 {
            return None;
        }
        let saved = self.total_input_size as f64 - self.total_output_size as f64;
        Some(saved / self.total_input_size as f64 * 100.0)
    }
}

#[derive(Error, Debug)]
pub enum SizefitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to load image: {0}")]
    LoadFailure(String),

    #[error("Failed to encode {format}: {reason}")]
    EncodeFailure { format: OutputFormat, reason: String },

    #[error("Processing error: {0}")]
    ProcessingError(String),
}

impl SizefitError {
    pub fn encode(format: OutputFormat, reason: impl fmt::Display) -> Self {
        SizefitError::EncodeFailure {
            format,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SizefitError>;
