// sizefit/src/cli.rs
use crate::core::{ParameterDomain, ResizeConfig, Result, SearchMode, SizefitError};
use crate::processors::BatchConfig;
use crate::utils::parse_size;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sizefit",
    version,
    about = "Resize images to a target file size by adjusting quality or DPI",
    after_help = "Examples:\n  sizefit size input.jpg 500KB\n  sizefit size *.jpg 1MB --suffix _resized\n  sizefit dpi photo.tiff 2MB\n  sizefit dpi images/ 800KB --output resized/"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print every result, not only failures, and enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable the progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Adjust compression quality to reach the target size (JPEG, WebP)
    Size(TargetArgs),

    /// Adjust DPI metadata to reach the target size (JPEG, PNG, WebP, TIFF)
    Dpi(TargetArgs),
}

impl Commands {
    pub fn mode(&self) -> SearchMode {
        match self {
            Commands::Size(_) => SearchMode::Quality,
            Commands::Dpi(_) => SearchMode::Resolution,
        }
    }

    pub fn args(&self) -> &TargetArgs {
        match self {
            Commands::Size(args) | Commands::Dpi(args) => args,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Input image files or directories, followed by the target file size
    /// (e.g. 500KB, 1.2MB, 2048)
    #[arg(required = true, num_args = 1.., value_name = "INPUT... TARGET_SIZE")]
    pub operands: Vec<String>,

    /// Output directory (default: next to each input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Suffix appended to output file names
    #[arg(long)]
    pub suffix: Option<String>,

    /// Overwrite existing output files instead of numbering new ones
    #[arg(long)]
    pub overwrite: bool,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Worker threads (0 = one per core)
    #[arg(short = 'j', long, default_value_t = 0)]
    pub threads: usize,

    /// Lower bound of the searched parameter
    #[arg(long)]
    pub min: Option<u32>,

    /// Upper bound of the searched parameter
    #[arg(long)]
    pub max: Option<u32>,

    /// Accepted undershoot as a fraction of the target
    #[arg(long)]
    pub tolerance: Option<f64>,
}

impl TargetArgs {
    pub fn inputs(&self) -> Vec<PathBuf> {
        let count = self.operands.len().saturating_sub(1);
        self.operands[..count].iter().map(PathBuf::from).collect()
    }

    pub fn target_size(&self) -> Result<u64> {
        match self.operands.as_slice() {
            [_, .., target] => parse_size(target),
            _ => Err(SizefitError::InvalidParameter(
                "Expected at least one input followed by a target size".to_string(),
            )),
        }
    }

    pub fn resize_config(&self, mode: SearchMode) -> ResizeConfig {
        let mut config = ResizeConfig::default();
        let domain = config.domain_for(mode);
        let domain = ParameterDomain::new(
            self.min.unwrap_or(domain.min),
            self.max.unwrap_or(domain.max),
        );

        match mode {
            SearchMode::Quality => config.quality_range = domain,
            SearchMode::Resolution => config.resolution_range = domain,
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }

        config
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            output_dir: self.output.clone(),
            suffix: self.suffix.clone(),
            overwrite: self.overwrite,
            recursive: self.recursive,
            threads: self.threads,
        }
    }
}
