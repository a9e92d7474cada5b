// sizefit/src/core/processor.rs
use super::{
    OutputFormat, ResizeConfig, ResizeResult, ResizeStatus, Result, SearchMode, SizefitError,
};
use crate::processors::{
    Compressor, EncodeParams, Encoder, Loader, MetadataProcessor, QualityStrategy,
    ResolutionStrategy, SearchOutcome, SearchStrategy, Trial,
};
use crate::utils::with_thousands;
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Converts one image to a target byte size.
///
/// `resize` never returns an error: every failure is folded into the
/// returned [`ResizeResult`].
pub struct ResizeOperation {
    config: ResizeConfig,
    loader: Loader,
    encoder: Arc<dyn Encoder>,
    metadata_processor: MetadataProcessor,
    quality: QualityStrategy,
    resolution: ResolutionStrategy,
}

/// What the search settled on, before it is turned into a result record.
struct Settled {
    status: ResizeStatus,
    value: u32,
    output_size: u64,
}

impl ResizeOperation {
    pub fn new(config: ResizeConfig) -> Result<Self> {
        let encoder = Compressor::new().with_png_optimization(config.optimize_png);
        Self::with_encoder(config, Arc::new(encoder))
    }

    pub fn with_encoder(config: ResizeConfig, encoder: Arc<dyn Encoder>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            quality: QualityStrategy::from_config(&config),
            resolution: ResolutionStrategy::from_config(&config),
            config,
            loader: Loader::new(),
            encoder,
            metadata_processor: MetadataProcessor::new(),
        })
    }

    pub fn config(&self) -> &ResizeConfig {
        &self.config
    }

    fn strategy(&self, mode: SearchMode) -> &dyn SearchStrategy {
        match mode {
            SearchMode::Quality => &self.quality,
            SearchMode::Resolution => &self.resolution,
        }
    }

    pub fn resize(
        &self,
        input_path: &Path,
        output_path: &Path,
        target_bytes: u64,
        mode: SearchMode,
    ) -> ResizeResult {
        let start = Instant::now();
        let strategy = self.strategy(mode);

        // Validating
        let format = match self.validate_format(output_path, mode) {
            Ok(format) => format,
            Err(e) => {
                log::warn!("{}", e);
                return ResizeResult::failed(e.to_string(), start.elapsed());
            }
        };

        // Loaded
        let loaded = match self.loader.load(input_path) {
            Ok(loaded) => loaded,
            Err(e) => return self.error_result(input_path, e, start),
        };

        // Searching
        let settled = match self.search_and_write(strategy, &loaded.image, format, output_path, target_bytes) {
            Ok(settled) => settled,
            Err(e) => return self.error_result(input_path, e, start),
        };

        let at = strategy.describe(settled.value);
        let message = match settled.status {
            ResizeStatus::Succeeded => {
                let mut message = format!(
                    "Success: {} bytes (target: {}) at {}",
                    with_thousands(settled.output_size),
                    with_thousands(target_bytes),
                    at
                );
                if mode == SearchMode::Resolution {
                    let was = self.metadata_processor.source_resolution(input_path);
                    message.push_str(&format!(" (was {} DPI)", was));
                }
                log::info!("{}: {}", input_path.display(), message);
                message
            }
            _ => {
                let message = format!(
                    "Cannot reach {} bytes. Best effort: {} bytes at {}",
                    with_thousands(target_bytes),
                    with_thousands(settled.output_size),
                    at
                );
                log::warn!("{}: {}", input_path.display(), message);
                message
            }
        };

        let (quality, resolution) = match mode {
            SearchMode::Quality => (Some(strategy.params_for(settled.value).quality), None),
            SearchMode::Resolution => (None, Some(settled.value)),
        };

        ResizeResult {
            status: settled.status,
            message,
            input_size: Some(loaded.file_size),
            output_size: Some(settled.output_size),
            quality,
            resolution,
            elapsed: start.elapsed(),
        }
    }

    fn validate_format(&self, output_path: &Path, mode: SearchMode) -> Result<OutputFormat> {
        let extension = output_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        let format = OutputFormat::from_path(output_path).ok_or_else(|| {
            SizefitError::UnsupportedFormat(format!("unrecognized output extension {:?}", extension))
        })?;

        if !self.strategy(mode).applies_to(format) {
            return Err(SizefitError::UnsupportedFormat(format!(
                "{} mode only supports {}. Got: {}",
                mode.label(),
                OutputFormat::extensions_for(mode).join(", "),
                extension
            )));
        }

        Ok(format)
    }

    fn search_and_write(
        &self,
        strategy: &dyn SearchStrategy,
        image: &DynamicImage,
        format: OutputFormat,
        output_path: &Path,
        target_bytes: u64,
    ) -> Result<Settled> {
        let scratch_dir = scratch_dir_for(output_path);
        std::fs::create_dir_all(&scratch_dir)?;

        let floor = strategy.domain().min;
        let mut floor_trial: Option<Trial> = None;
        let mut measure = |params: EncodeParams| -> Result<u64> {
            let trial = self.encoder.trial_encode(image, format, params, &scratch_dir)?;
            let size = trial.size;
            if params == strategy.params_for(floor) {
                floor_trial = Some(trial);
            }
            Ok(size)
        };

        let outcome = strategy.search(target_bytes, &mut measure)?;
        log::debug!("Search outcome for {}: {:?}", output_path.display(), outcome);

        match outcome {
            SearchOutcome::Found { parameter, size } => {
                let output_size = self.encoder.final_encode(
                    image,
                    format,
                    strategy.params_for(parameter),
                    output_path,
                )?;
                if output_size != size {
                    log::warn!(
                        "Encoder is not deterministic: trial gave {} bytes, final encode {} bytes",
                        size,
                        output_size
                    );
                }
                Ok(Settled {
                    status: ResizeStatus::Succeeded,
                    value: parameter,
                    output_size,
                })
            }
            SearchOutcome::Unreachable { parameter, .. } => {
                // Reuse the bytes measured at the boundary instead of encoding again.
                let output_size = match floor_trial.take() {
                    Some(trial) if parameter == floor => trial.persist(output_path)?,
                    _ => self.encoder.final_encode(
                        image,
                        format,
                        strategy.params_for(parameter),
                        output_path,
                    )?,
                };
                Ok(Settled {
                    status: ResizeStatus::BestEffort,
                    value: parameter,
                    output_size,
                })
            }
        }
    }

    fn error_result(&self, input_path: &Path, err: SizefitError, start: Instant) -> ResizeResult {
        let name = input_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| input_path.display().to_string());
        let message = format!("Error processing {}: {}", name, err);
        log::warn!("{}", message);
        ResizeResult::failed(message, start.elapsed())
    }
}

fn scratch_dir_for(output_path: &Path) -> std::path::PathBuf {
    match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    }
}
