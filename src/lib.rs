mod cli;
mod core;
mod processors;
mod utils;

pub use crate::cli::{Cli, Commands, TargetArgs};
pub use crate::core::processor::ResizeOperation;
pub use crate::core::{
    BatchSummary, FormatSpec, OutputFormat, ParameterDomain, ResizeConfig,
    ResizeResult, ResizeStatus, Result, SearchMode, SizefitError,
};
pub use crate::processors::{
    summarize, tolerance_bytes, BatchConfig, BatchItem, BatchProcessor, BoundedSearch,
    Compressor, EncodeParams, Encoder, LoadedImage, Loader, MetadataProcessor, QualityStrategy,
    ResolutionStrategy, SearchOutcome, SearchStrategy, Trial,
};
pub use crate::utils::{
    derive_output_path, determine_output_path, format_file_size, is_supported_format, parse_size,
    unique_path, with_thousands, BarProgress, NoProgress, ProgressReporter,
};

pub mod prelude {
    pub use crate::{
        BatchProcessor, BoundedSearch, Compressor, Encoder, ResizeConfig, ResizeOperation,
        SearchMode, SearchOutcome,
    };
}

// Re-export commonly used types
pub use image::DynamicImage;
