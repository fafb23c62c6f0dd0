//! Time-domain cross-correlation.
//!
//! Cost is `O(n * max_shift)`, which beats the FFT path for short windows
//! or small search ranges.

use crate::errors::AlignResult;

use super::{normalization, Correlator};

/// Cross-correlation evaluated lag by lag.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectCorrelator;

impl Correlator for DirectCorrelator {
    fn name(&self) -> &str {
        "Direct"
    }

    fn description(&self) -> &str {
        "Time-domain cross-correlation"
    }

    fn raw_correlation(&self, a: &[f64], b: &[f64], max_shift: usize) -> AlignResult<Vec<f64>> {
        let norm = normalization(a, b)?;
        let n = a.len() as isize;
        let max_shift = max_shift as isize;

        let values = (-max_shift..=max_shift)
            .map(|k| {
                let lo = (-k).max(0);
                let hi = (n - k).min(n);
                let sum: f64 = (lo..hi)
                    .map(|i| a[i as usize] * b[(i + k) as usize])
                    .sum();
                sum / norm
            })
            .collect();

        Ok(values)
    }
}
