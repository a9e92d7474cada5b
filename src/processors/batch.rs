// sizefit/src/processors/batch.rs
use crate::core::processor::ResizeOperation;
use crate::core::{BatchSummary, ResizeResult, Result, SearchMode, SizefitError};
use crate::utils::{determine_output_path, is_supported_format, NoProgress, ProgressReporter};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Orchestration settings shared by every image in a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchConfig {
    pub output_dir: Option<PathBuf>,
    pub suffix: Option<String>,
    pub overwrite: bool,
    pub recursive: bool,
    /// Worker threads; 0 uses rayon's global pool.
    pub threads: usize,
}

/// One planned unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub input: PathBuf,
    pub output: PathBuf,
}

pub struct BatchProcessor {
    operation: ResizeOperation,
    config: BatchConfig,
    thread_pool: Option<rayon::ThreadPool>,
    progress: Arc<dyn ProgressReporter>,
}

impl BatchProcessor {
    pub fn new(operation: ResizeOperation, config: BatchConfig) -> Result<Self> {
        let thread_pool = if config.threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.threads)
                .build()
                .map_err(|e| {
                    SizefitError::ProcessingError(format!("Failed to create thread pool: {}", e))
                })?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            operation,
            config,
            thread_pool,
            progress: Arc::new(NoProgress),
        })
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Expands files and directories into a sorted, de-duplicated list of images.
    pub fn collect_inputs(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();

        for input in inputs {
            if input.is_dir() {
                let walker = if self.config.recursive {
                    WalkDir::new(input)
                } else {
                    WalkDir::new(input).max_depth(1)
                };

                paths.extend(
                    walker
                        .into_iter()
                        .filter_map(|entry| entry.ok())
                        .filter(|entry| entry.file_type().is_file())
                        .filter(|entry| is_supported_format(entry.path()))
                        .map(|entry| entry.into_path()),
                );
            } else if input.is_file() {
                if is_supported_format(input) {
                    paths.push(input.clone());
                } else {
                    log::warn!("Skipping unsupported file: {}", input.display());
                }
            } else {
                return Err(SizefitError::InvalidParameter(format!(
                    "Input does not exist: {}",
                    input.display()
                )));
            }
        }

        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    /// Assigns every input an output path. Names are reserved in order, so
    /// two inputs never share an output unless overwriting is requested.
    pub fn plan(&self, inputs: &[PathBuf]) -> Vec<BatchItem> {
        let mut reserved = HashSet::new();

        inputs
            .iter()
            .map(|input| {
                let output = determine_output_path(
                    input,
                    self.config.output_dir.as_deref(),
                    self.config.suffix.as_deref(),
                    self.config.overwrite,
                    &reserved,
                );
                reserved.insert(output.clone());
                BatchItem {
                    input: input.clone(),
                    output,
                }
            })
            .collect()
    }

    pub fn run(
        &self,
        inputs: &[PathBuf],
        target_bytes: u64,
        mode: SearchMode,
    ) -> Result<Vec<(BatchItem, ResizeResult)>> {
        let images = self.collect_inputs(inputs)?;
        if images.is_empty() {
            return Err(SizefitError::InvalidParameter(
                "No input image files found".to_string(),
            ));
        }

        if let Some(dir) = &self.config.output_dir {
            std::fs::create_dir_all(dir)?;
        }

        let items = self.plan(&images);
        log::info!(
            "Processing {} images in {} mode, target {} bytes",
            items.len(),
            mode.label(),
            target_bytes
        );

        self.progress.start(items.len());

        let process = |item: &BatchItem| {
            let result = self
                .operation
                .resize(&item.input, &item.output, target_bytes, mode);
            self.progress.advance(&display_name(&item.input), &result);
            (item.clone(), result)
        };

        let results: Vec<(BatchItem, ResizeResult)> = match &self.thread_pool {
            Some(pool) => pool.install(|| items.par_iter().map(process).collect()),
            None => items.par_iter().map(process).collect(),
        };

        self.progress.finish(&summarize(&results));
        Ok(results)
    }

    pub fn validate_paths(&self, inputs: &[PathBuf]) -> Result<()> {
        if let Some(output_dir) = &self.config.output_dir {
            if output_dir.exists() && !output_dir.is_dir() {
                return Err(SizefitError::InvalidParameter(format!(
                    "Output path exists but is not a directory: {}",
                    output_dir.display()
                )));
            }
        }

        if inputs.is_empty() {
            return Err(SizefitError::InvalidParameter(
                "At least one input is required".to_string(),
            ));
        }

        Ok(())
    }
}

pub fn summarize(results: &[(BatchItem, ResizeResult)]) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for (item, result) in results {
        summary.record(&display_name(&item.input), result);
    }
    summary
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResizeConfig;

    fn processor(config: BatchConfig) -> BatchProcessor {
        let operation = ResizeOperation::new(ResizeConfig::default()).unwrap();
        BatchProcessor::new(operation, config).unwrap()
    }

    #[test]
    fn test_collect_inputs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.jpg", "a.PNG", "notes.txt", "c.gif"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/d.webp"), b"x").unwrap();

        let flat = processor(BatchConfig::default())
            .collect_inputs(&[dir.path().to_path_buf(), dir.path().join("b.jpg")])
            .unwrap();
        assert_eq!(flat, vec![dir.path().join("a.PNG"), dir.path().join("b.jpg")]);

        let deep = processor(BatchConfig {
            recursive: true,
            ..BatchConfig::default()
        })
        .collect_inputs(&[dir.path().to_path_buf()])
        .unwrap();
        assert_eq!(deep.len(), 3);
        assert!(deep.contains(&dir.path().join("nested/d.webp")));
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = processor(BatchConfig::default()).collect_inputs(&[dir.path().join("nope.jpg")]);
        assert!(matches!(result, Err(SizefitError::InvalidParameter(_))));
    }

    #[test]
    fn test_plan_avoids_collisions_within_batch() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let inputs = vec![dir.path().join("x/photo.jpg"), dir.path().join("y/photo.jpg")];

        let batch = processor(BatchConfig {
            output_dir: Some(out.clone()),
            suffix: Some("_small".to_string()),
            ..BatchConfig::default()
        });
        let plan = batch.plan(&inputs);

        assert_eq!(plan[0].output, out.join("photo_small.jpg"));
        assert_eq!(plan[1].output, out.join("photo_small_1.jpg"));
    }

    #[test]
    fn test_plan_with_overwrite_reuses_names() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("photo.jpg");
        std::fs::write(&input, b"x").unwrap();

        let batch = processor(BatchConfig {
            overwrite: true,
            ..BatchConfig::default()
        });
        assert_eq!(batch.plan(&[input.clone()])[0].output, input);
    }
}
