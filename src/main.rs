use anyhow::Context;
use clap::{CommandFactory, Parser};
use log::LevelFilter;
use sizefit::{
    format_file_size, summarize, with_thousands, BarProgress, BatchProcessor, Cli, NoProgress,
    BatchSummary, ProgressReporter, ResizeOperation, SearchMode,
};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logger
    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let mode = cli.command.mode();
    let args = cli.command.args();

    let target_bytes = match args.target_size() {
        Ok(bytes) => bytes,
        Err(e) => Cli::command()
            .error(clap::error::ErrorKind::ValueValidation, e.to_string())
            .exit(),
    };

    let operation = ResizeOperation::new(args.resize_config(mode))
        .context("Invalid search configuration")?;
    log::debug!("Search configuration: {:?}", operation.config());

    let progress: Arc<dyn ProgressReporter> = if cli.no_progress {
        Arc::new(NoProgress)
    } else {
        Arc::new(BarProgress::new(format!("{} Mode", mode.label())))
    };

    let inputs = args.inputs();
    let processor = BatchProcessor::new(operation, args.batch_config())?.with_progress(progress);
    processor.validate_paths(&inputs)?;

    let results = processor
        .run(&inputs, target_bytes, mode)
        .context("Batch processing failed")?;

    for (item, result) in &results {
        if cli.verbose || !result.success() {
            let name = item
                .input
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| item.input.display().to_string());
            println!("{}: {}", name, result.message);
        }
    }

    let summary = summarize(&results);
    print_summary(mode, &summary);

    if summary.failed > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_summary(mode: SearchMode, summary: &BatchSummary) {
    if summary.processed == 0 {
        return;
    }

    println!("\nSummary:");
    println!("  Mode: {}", mode.label());
    println!("  Processed: {} images", summary.processed);
    println!(
        "  Success: {} ({:.1}%)",
        summary.succeeded,
        summary.success_rate()
    );
    if summary.best_effort > 0 {
        println!("  Best effort (target missed): {}", summary.best_effort);
    }
    if summary.failed > 0 {
        println!("  Failed: {}", summary.failed);
    }

    if let Some(reduction) = summary.size_reduction() {
        println!(
            "  Total input size: {} bytes ({})",
            with_thousands(summary.total_input_size),
            format_file_size(summary.total_input_size)
        );
        println!(
            "  Total output size: {} bytes ({})",
            with_thousands(summary.total_output_size),
            format_file_size(summary.total_output_size)
        );
        println!("  Size reduction: {:.1}%", reduction);
    }
}
