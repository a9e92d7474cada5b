// sizefit/src/processors/strategy.rs
use super::search::{BoundedSearch, SearchOutcome};
use crate::core::{OutputFormat, ParameterDomain, ResizeConfig, Result, SearchMode};

/// Encoder settings for a single trial or final encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub quality: u8,
    pub resolution: Option<u32>,
}

/// One-dimensional instantiation of [`BoundedSearch`] over an encoder knob.
pub trait SearchStrategy: Send + Sync {
    fn mode(&self) -> SearchMode;

    fn domain(&self) -> ParameterDomain;

    fn tolerance(&self) -> f64;

    fn applies_to(&self, format: OutputFormat) -> bool {
        format.supports(self.mode())
    }

    /// Maps a parameter value from the domain to concrete encoder settings.
    fn params_for(&self, value: u32) -> EncodeParams;

    /// Human readable "at ..." fragment for result messages.
    fn describe(&self, value: u32) -> String;

    fn search(
        &self,
        target_bytes: u64,
        measure: &mut dyn FnMut(EncodeParams) -> Result<u64>,
    ) -> Result<SearchOutcome> {
        let search = BoundedSearch::new(self.domain(), target_bytes, self.tolerance())?;
        search.run(|value| measure(self.params_for(value)))
    }
}

/// Varies lossy compression quality; only for quality-capable formats.
#[derive(Debug, Clone)]
pub struct QualityStrategy {
    domain: ParameterDomain,
    tolerance: f64,
}

impl QualityStrategy {
    pub fn new(domain: ParameterDomain, tolerance: f64) -> Self {
        Self { domain, tolerance }
    }

    pub fn from_config(config: &ResizeConfig) -> Self {
        Self::new(config.quality_range, config.tolerance)
    }
}

impl Default for QualityStrategy {
    fn default() -> Self {
        Self::from_config(&ResizeConfig::default())
    }
}

impl SearchStrategy for QualityStrategy {
    fn mode(&self) -> SearchMode {
        SearchMode::Quality
    }

    fn domain(&self) -> ParameterDomain {
        self.domain
    }

    fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn params_for(&self, value: u32) -> EncodeParams {
        EncodeParams {
            quality: value.clamp(1, 100) as u8,
            resolution: None,
        }
    }

    fn describe(&self, value: u32) -> String {
        format!("quality {}", value)
    }
}

/// Varies the nominal DPI written into the container.
///
/// For formats whose size does not depend on the stored density the search
/// settles on a boundary after one or two trials.
#[derive(Debug, Clone)]
pub struct ResolutionStrategy {
    domain: ParameterDomain,
    tolerance: f64,
    quality: u8,
}

impl ResolutionStrategy {
    pub fn new(domain: ParameterDomain, tolerance: f64, quality: u8) -> Self {
        Self {
            domain,
            tolerance,
            quality: quality.clamp(1, 100),
        }
    }

    pub fn from_config(config: &ResizeConfig) -> Self {
        Self::new(
            config.resolution_range,
            config.tolerance,
            config.resolution_mode_quality,
        )
    }
}

impl Default for ResolutionStrategy {
    fn default() -> Self {
        Self::from_config(&ResizeConfig::default())
    }
}

impl SearchStrategy for ResolutionStrategy {
    fn mode(&self) -> SearchMode {
        SearchMode::Resolution
    }

    fn domain(&self) -> ParameterDomain {
        self.domain
    }

    fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn params_for(&self, value: u32) -> EncodeParams {
        EncodeParams {
            quality: self.quality,
            resolution: Some(value),
        }
    }

    fn describe(&self, value: u32) -> String {
        format!("{} DPI", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_strategy_defaults() {
        let strategy = QualityStrategy::default();
        assert_eq!(strategy.domain(), ParameterDomain::new(10, 95));
        assert_eq!(strategy.tolerance(), 0.05);
        assert!(strategy.applies_to(OutputFormat::Jpeg));
        assert!(strategy.applies_to(OutputFormat::WebP));
        assert!(!strategy.applies_to(OutputFormat::Png));
        assert!(!strategy.applies_to(OutputFormat::Tiff));
        assert_eq!(
            strategy.params_for(42),
            EncodeParams { quality: 42, resolution: None }
        );
    }

    #[test]
    fn test_resolution_strategy_defaults() {
        let strategy = ResolutionStrategy::default();
        assert_eq!(strategy.domain(), ParameterDomain::new(25, 600));
        for format in OutputFormat::ALL {
            assert!(strategy.applies_to(format));
        }
        assert_eq!(
            strategy.params_for(300),
            EncodeParams { quality: 95, resolution: Some(300) }
        );
        assert_eq!(strategy.describe(300), "300 DPI");
    }

    #[test]
    fn test_quality_search_end_to_end_scenario() {
        let strategy = QualityStrategy::new(ParameterDomain::new(10, 95), 0.0);
        let mut trials = Vec::new();
        let outcome = strategy
            .search(50_000, &mut |params| {
                trials.push(params.quality);
                Ok(params.quality as u64 * 1000)
            })
            .unwrap();

        assert_eq!(outcome, SearchOutcome::Found { parameter: 50, size: 50_000 });
        assert_eq!(&trials[..2], &[95, 10]);
    }

    // Both domains report an unreachable target the same way. Resolution mode
    // does not succeed at its minimum when that minimum still exceeds the target.
    #[test]
    fn test_resolution_search_reports_unreachable_when_min_exceeds_target() {
        let strategy = ResolutionStrategy::default();
        let outcome = strategy
            .search(10_000, &mut |params| Ok(20_000 + params.resolution.unwrap_or(0) as u64))
            .unwrap();

        assert_eq!(outcome, SearchOutcome::Unreachable { parameter: 25, size: 20_025 });
        assert!(!outcome.is_found());
    }

    #[test]
    fn test_resolution_search_invariant_size_settles_on_max() {
        let strategy = ResolutionStrategy::default();
        let mut calls = 0;
        let outcome = strategy
            .search(10_000, &mut |_| {
                calls += 1;
                Ok(9_000)
            })
            .unwrap();

        assert_eq!(outcome, SearchOutcome::Found { parameter: 600, size: 9_000 });
        assert_eq!(calls, 1);
    }
}
