// sizefit/src/utils/mod.rs
use crate::core::{OutputFormat, Result, SizefitError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

mod progress;

pub use progress::{BarProgress, NoProgress, ProgressReporter};

const MAX_RENAME_ATTEMPTS: u32 = 1000;

/// Parses sizes such as `500KB`, `1.5mb`, `2m` or `123456` into bytes.
///
/// Units are 1024-based and case-insensitive; spaces are ignored and a
/// fractional byte count is truncated.
pub fn parse_size(text: &str) -> Result<u64> {
    let invalid = || {
        SizefitError::InvalidParameter(format!(
            "Invalid size format: '{}'. Use formats like '500KB', '1.5MB', or '100000'",
            text
        ))
    };

    let normalized: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    let split = normalized
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(normalized.len());
    let (number, unit) = normalized.split_at(split);

    // digits with at most one dot, and at least one digit after it if present
    let valid_number = !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit() || c == '.')
        && number.matches('.').count() <= 1
        && !number.ends_with('.');
    if !valid_number {
        return Err(invalid());
    }

    let multiplier: u64 = match unit {
        "" | "b" => 1,
        "k" | "kb" => 1 << 10,
        "m" | "mb" => 1 << 20,
        "g" | "gb" => 1 << 30,
        "t" | "tb" => 1 << 40,
        _ => {
            return Err(SizefitError::InvalidParameter(format!(
                "Unsupported unit: '{}'. Supported units: b, k, kb, m, mb, g, gb, t, tb",
                unit
            )))
        }
    };

    let value: f64 = number.parse().map_err(|_| invalid())?;
    Ok((value * multiplier as f64) as u64)
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut exponent = 0;
    while size >= 1024.0 && exponent < UNITS.len() - 1 {
        size /= 1024.0;
        exponent += 1;
    }

    format!("{:.2} {}", size, UNITS[exponent])
}

/// `1234567` -> `"1,234,567"`.
pub fn with_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn is_supported_format(path: &Path) -> bool {
    OutputFormat::from_path(path).is_some()
}

/// `<output_dir or input parent>/<stem><suffix>.<ext>`.
pub fn derive_output_path(input_path: &Path, output_dir: Option<&Path>, suffix: Option<&str>) -> PathBuf {
    let file_name = match suffix {
        Some(suffix) if !suffix.is_empty() => {
            let stem = input_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            match input_path.extension() {
                Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
                None => format!("{}{}", stem, suffix),
            }
        }
        _ => input_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string()),
    };

    match output_dir {
        Some(dir) => dir.join(file_name),
        None => input_path.with_file_name(file_name),
    }
}

/// Returns `base` if free, otherwise `<stem>_N.<ext>` for the first free `N`.
///
/// A path counts as taken if it exists on disk or is in `reserved`.
pub fn unique_path(base: &Path, reserved: &HashSet<PathBuf>) -> PathBuf {
    let taken = |p: &Path| p.exists() || reserved.contains(p);
    if !taken(base) {
        return base.to_path_buf();
    }

    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let extension = base
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    for counter in 1..=MAX_RENAME_ATTEMPTS {
        let candidate = base.with_file_name(format!("{}_{}{}", stem, counter, extension));
        if !taken(&candidate) {
            return candidate;
        }
    }

    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    base.with_file_name(format!("{}_{}{}", stem, timestamp, extension))
}

/// Output path for `input_path`, auto-incremented unless `overwrite` is set.
pub fn determine_output_path(
    input_path: &Path,
    output_dir: Option<&Path>,
    suffix: Option<&str>,
    overwrite: bool,
    reserved: &HashSet<PathBuf>,
) -> PathBuf {
    let base = derive_output_path(input_path, output_dir, suffix);
    if overwrite {
        base
    } else {
        unique_path(&base, reserved)
    }
}
