// sizefit/src/processors/mod.rs
mod batch;
mod compressor;
mod loader;
mod metadata;
mod search;
mod strategy;

pub use batch::{summarize, BatchConfig, BatchItem, BatchProcessor};
pub use compressor::{Compressor, Encoder, Trial};
pub use loader::{LoadedImage, Loader};
pub use metadata::MetadataProcessor;
pub use search::{tolerance_bytes, BoundedSearch, SearchOutcome};
pub use strategy::{EncodeParams, QualityStrategy, ResolutionStrategy, SearchStrategy};

