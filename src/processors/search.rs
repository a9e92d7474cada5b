// sizefit/src/processors/search.rs
//! Bounded bisection over an integer encoder parameter.
//!
//! The search assumes encoded size is non-decreasing in the parameter and
//! looks for the largest value whose measured size stays at or below the
//! target. It never estimates a size: every size it returns came from the
//! `measure` callback for exactly the parameter it is paired with.

use crate::core::{ParameterDomain, Result, SizefitError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Found { parameter: u32, size: u64 },
    /// No parameter fits. `parameter`/`size` describe the smallest-output
    /// boundary, usable as a best-effort result.
    Unreachable { parameter: u32, size: u64 },
}

impl SearchOutcome {
    pub fn parameter(&self) -> u32 {
        match *self {
            SearchOutcome::Found { parameter, .. } | SearchOutcome::Unreachable { parameter, .. } => {
                parameter
            }
        }
    }

    pub fn size(&self) -> u64 {
        match *self {
            SearchOutcome::Found { size, .. } | SearchOutcome::Unreachable { size, .. } => size,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found { .. })
    }
}

/// `max(1, round(target * ratio))`.
pub fn tolerance_bytes(target_bytes: u64, tolerance_ratio: f64) -> u64 {
    let tolerance = (target_bytes as f64 * tolerance_ratio).round() as u64;
    tolerance.max(1)
}

#[derive(Debug, Clone, Copy)]
pub struct BoundedSearch {
    domain: ParameterDomain,
    target_bytes: u64,
    tolerance_ratio: f64,
}

impl BoundedSearch {
    pub fn new(domain: ParameterDomain, target_bytes: u64, tolerance_ratio: f64) -> Result<Self> {
        domain.validate("Search")?;
        if !(0.0..1.0).contains(&tolerance_ratio) {
            return Err(SizefitError::InvalidParameter(format!(
                "Tolerance must be in [0, 1), got {}",
                tolerance_ratio
            )));
        }

        Ok(Self {
            domain,
            target_bytes,
            tolerance_ratio,
        })
    }

    /// Runs the search. An error from `measure` aborts it and is returned as is.
    pub fn run<F>(&self, mut measure: F) -> Result<SearchOutcome>
    where
        F: FnMut(u32) -> Result<u64>,
    {
        let ParameterDomain { min, max } = self.domain;
        let target = self.target_bytes;
        let tolerance = tolerance_bytes(target, self.tolerance_ratio);

        let max_size = measure(max)?;
        log::debug!("Boundary {} -> {} bytes (target {})", max, max_size, target);
        if max_size <= target {
            return Ok(SearchOutcome::Found {
                parameter: max,
                size: max_size,
            });
        }

        if min == max {
            return Ok(SearchOutcome::Unreachable {
                parameter: min,
                size: max_size,
            });
        }

        let min_size = measure(min)?;
        log::debug!("Boundary {} -> {} bytes (target {})", min, min_size, target);
        if min_size > target {
            return Ok(SearchOutcome::Unreachable {
                parameter: min,
                size: min_size,
            });
        }

        // measure(min) <= target < measure(max). min is the fallback; the
        // tolerance only ends the search at a bisection midpoint.
        let mut best = (min, min_size);
        let mut low = min;
        let mut high = max;

        while low <= high {
            let mid = low + (high - low) / 2;
            let size = measure(mid)?;
            log::debug!("Trial {} -> {} bytes (target {})", mid, size, target);

            if size <= target {
                best = (mid, size);
                if target - size <= tolerance {
                    break;
                }
                match mid.checked_add(1) {
                    Some(next) => low = next,
                    None => break,
                }
            } else {
                match mid.checked_sub(1) {
                    Some(next) => high = next,
                    None => break,
                }
            }
        }

        Ok(SearchOutcome::Found {
            parameter: best.0,
            size: best.1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn linear(step: u64) -> impl Fn(u32) -> Result<u64> {
        move |p| Ok(p as u64 * step)
    }

    fn run(domain: (u32, u32), target: u64, tolerance: f64, f: impl FnMut(u32) -> Result<u64>) -> SearchOutcome {
        BoundedSearch::new(ParameterDomain::new(domain.0, domain.1), target, tolerance)
            .unwrap()
            .run(f)
            .unwrap()
    }

    #[test]
    fn test_tolerance_bytes() {
        assert_eq!(tolerance_bytes(50_000, 0.05), 2_500);
        assert_eq!(tolerance_bytes(10, 0.05), 1);
        assert_eq!(tolerance_bytes(0, 0.05), 1);
        assert_eq!(tolerance_bytes(30, 0.05), 2); // 1.5 rounds up
        assert_eq!(tolerance_bytes(1_000, 0.0), 1);
    }

    #[test]
    fn test_max_boundary_short_circuits() {
        let calls = RefCell::new(Vec::new());
        let outcome = run((10, 95), 100_000, 0.05, |p| {
            calls.borrow_mut().push(p);
            Ok(p as u64 * 1000)
        });

        assert_eq!(outcome, SearchOutcome::Found { parameter: 95, size: 95_000 });
        assert_eq!(*calls.borrow(), vec![95]);
    }

    #[test]
    fn test_exact_fit_at_max_is_found() {
        let outcome = run((10, 95), 95_000, 0.05, linear(1000));
        assert_eq!(outcome, SearchOutcome::Found { parameter: 95, size: 95_000 });
    }

    #[test]
    fn test_unreachable_reports_min_boundary() {
        let calls = RefCell::new(Vec::new());
        let outcome = run((10, 95), 5_000, 0.05, |p| {
            calls.borrow_mut().push(p);
            Ok(p as u64 * 1000)
        });

        assert_eq!(outcome, SearchOutcome::Unreachable { parameter: 10, size: 10_000 });
        assert_eq!(*calls.borrow(), vec![95, 10]);
    }

    #[test]
    fn test_converges_to_exact_target_without_tolerance() {
        let outcome = run((10, 95), 50_000, 0.0, linear(1000));
        assert_eq!(outcome, SearchOutcome::Found { parameter: 50, size: 50_000 });
    }

    #[test]
    fn test_tolerance_stops_early() {
        let calls = RefCell::new(0u32);
        let outcome = run((10, 95), 50_000, 0.05, |p| {
            *calls.borrow_mut() += 1;
            Ok(p as u64 * 1000)
        });

        // 49_000 is within 2_500 bytes of the target
        assert_eq!(outcome, SearchOutcome::Found { parameter: 49, size: 49_000 });
        assert!(outcome.size() <= 50_000);
        assert!(*calls.borrow() <= ParameterDomain::new(10, 95).max_trials());
    }

    #[test]
    fn test_single_point_domain() {
        let calls = RefCell::new(0u32);
        let fits = run((40, 40), 50_000, 0.05, |p| {
            *calls.borrow_mut() += 1;
            Ok(p as u64 * 1000)
        });
        assert_eq!(fits, SearchOutcome::Found { parameter: 40, size: 40_000 });
        assert_eq!(*calls.borrow(), 1);

        *calls.borrow_mut() = 0;
        let misses = run((40, 40), 30_000, 0.05, |p| {
            *calls.borrow_mut() += 1;
            Ok(p as u64 * 1000)
        });
        assert_eq!(misses, SearchOutcome::Unreachable { parameter: 40, size: 40_000 });
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_two_point_domain() {
        let calls = RefCell::new(0u32);
        let outcome = run((1, 2), 150, 0.0, |p| {
            *calls.borrow_mut() += 1;
            Ok(p as u64 * 100)
        });

        assert_eq!(outcome, SearchOutcome::Found { parameter: 1, size: 100 });
        assert!(*calls.borrow() <= ParameterDomain::new(1, 2).max_trials());
    }

    #[test]
    fn test_exact_fit_at_min_is_found() {
        assert_eq!(
            run((10, 95), 10_000, 0.0, linear(1000)),
            SearchOutcome::Found { parameter: 10, size: 10_000 }
        );
    }

    #[test]
    fn test_min_within_tolerance_keeps_searching_upward() {
        let calls = RefCell::new(Vec::new());
        let outcome = run((10, 95), 50_000, 0.05, |p| {
            calls.borrow_mut().push(p);
            Ok(match p {
                10 => 48_000,
                95 => 60_000,
                _ => 49_000,
            })
        });

        assert_eq!(outcome, SearchOutcome::Found { parameter: 52, size: 49_000 });
        assert_eq!(*calls.borrow(), vec![95, 10, 52]);
    }

    #[test]
    fn test_unstable_measure_at_zero_does_not_underflow() {
        let calls = RefCell::new(0u32);
        let outcome = run((0, 1), 100, 0.0, |p| {
            *calls.borrow_mut() += 1;
            // Only the first measurement of 0 fits.
            Ok(if p == 0 && *calls.borrow() == 2 { 50 } else { 500 })
        });

        assert_eq!(outcome, SearchOutcome::Found { parameter: 0, size: 50 });
        assert_eq!(*calls.borrow(), 3);
    }

    #[test]
    fn test_step_function_finds_maximal_fitting_parameter() {
        let step = |p: u32| -> u64 {
            match p {
                0..=19 => 1_000,
                20..=44 => 4_000,
                45..=70 => 9_000,
                _ => 20_000,
            }
        };

        for target in [1_000u64, 3_999, 4_000, 8_999, 9_000, 19_999] {
            let outcome = run((0, 100), target, 0.0, |p| Ok(step(p)));
            let SearchOutcome::Found { parameter, size } = outcome else {
                panic!("target {} should be reachable", target);
            };
            assert!(size <= target);
            assert_eq!(size, step(parameter));

            let best = (0..=100).filter(|&p| step(p) <= target).max().unwrap();
            // Within tolerance, any parameter sharing the best size is acceptable.
            assert_eq!(step(parameter), step(best), "target {}", target);
        }
    }

    #[test]
    fn test_exhaustive_against_linear_measure() {
        let domain = ParameterDomain::new(3, 97);
        for target in (0..=1_200u64).step_by(37) {
            let calls = RefCell::new(0u32);
            let outcome = run((3, 97), target, 0.0, |p| {
                *calls.borrow_mut() += 1;
                Ok(p as u64 * 11)
            });
            assert!(domain.contains(outcome.parameter()));
            assert!(*calls.borrow() <= domain.max_trials(), "target {}", target);
            let fitting = (3..=97u32).filter(|&p| p as u64 * 11 <= target).max();
            match fitting {
                Some(best) => {
                    assert_eq!(outcome, SearchOutcome::Found { parameter: best, size: best as u64 * 11 })
                }
                None => assert_eq!(outcome, SearchOutcome::Unreachable { parameter: 3, size: 33 }),
            }
        }
    }

    #[test]
    fn test_search_is_idempotent() {
        let first = run((10, 95), 61_234, 0.05, linear(997));
        let second = run((10, 95), 61_234, 0.05, linear(997));
        assert_eq!(first, second);
    }

    #[test]
    fn test_constant_measure_converges_at_boundary() {
        let calls = RefCell::new(0u32);
        let outcome = run((25, 600), 10_000, 0.05, |_| {
            *calls.borrow_mut() += 1;
            Ok(8_000)
        });
        assert_eq!(outcome, SearchOutcome::Found { parameter: 600, size: 8_000 });
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_measure_error_propagates() {
        let search = BoundedSearch::new(ParameterDomain::new(10, 95), 50_000, 0.05).unwrap();
        let result = search.run(|p| {
            if p < 90 {
                Err(SizefitError::ProcessingError("encoder crashed".to_string()))
            } else {
                Ok(p as u64 * 1000)
            }
        });
        assert!(matches!(result, Err(SizefitError::ProcessingError(_))));
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        assert!(BoundedSearch::new(ParameterDomain::new(10, 5), 100, 0.05).is_err());
        assert!(BoundedSearch::new(ParameterDomain::new(5, 10), 100, 1.0).is_err());
        assert!(BoundedSearch::new(ParameterDomain::new(5, 10), 100, -0.1).is_err());
    }
}
