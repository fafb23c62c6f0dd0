//! Cross-correlation of equal-length windows.
//!
//! This module defines the `Correlator` trait and its implementations. Both
//! engines only ever talk to the trait, so a time-domain or frequency-domain
//! implementation can be swapped without touching either engine.
//!
//! Lag convention: a positive lag means `b` is delayed relative to `a`, i.e.
//! `b[n] = a[n - lag]` correlates perfectly.

mod direct;
mod fft;
mod peak_fit;

pub use direct::DirectCorrelator;
pub use fft::FftCorrelator;
pub use peak_fit::fit_peak;

use serde::{Deserialize, Serialize};

use crate::errors::{AlignError, AlignResult};
use crate::models::CorrelatorKind;
use crate::processing::l2_norm;

/// Result of correlating two windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    /// Lag of maximum |correlation|, in samples.
    pub lag: isize,
    /// Magnitude of the normalized correlation at `lag` (0.0 - 1.0).
    pub coefficient: f64,
    /// Sign of the correlation at `lag`: 1 or -1.
    pub polarity: i8,
    /// Parabolic sub-sample refinement of `lag`.
    pub subsample_lag: f64,
}

impl Correlation {
    /// Correlation value at the peak, with its sign.
    pub fn signed_coefficient(&self) -> f64 {
        self.polarity as f64 * self.coefficient
    }

    /// Lag converted to seconds.
    pub fn lag_seconds(&self, sample_interval: f64) -> f64 {
        self.lag as f64 * sample_interval
    }
}

/// Trait for cross-correlation strategies.
///
/// Implementations only compute the normalized correlation function; peak
/// picking is shared so every implementation agrees on ties and polarity.
pub trait Correlator: Send + Sync {
    /// Name of this correlator.
    fn name(&self) -> &str;

    /// Short description of the strategy.
    fn description(&self) -> &str;

    /// Normalized correlation `c(k) = sum a[n] b[n+k] / (|a| |b|)` for
    /// `k` in `[-max_shift, max_shift]`, stored at index `k + max_shift`.
    ///
    /// `max_shift` must already be clamped to `len - 1`.
    fn raw_correlation(&self, a: &[f64], b: &[f64], max_shift: usize) -> AlignResult<Vec<f64>>;

    /// Correlate two equal-length signals over lags `[-max_shift, max_shift]`.
    ///
    /// `max_shift` is clamped to `len - 1`. Fails with
    /// [`AlignError::DegenerateSignal`] if either input has zero norm.
    fn correlate(&self, a: &[f64], b: &[f64], max_shift: usize) -> AlignResult<Correlation> {
        let max_shift = max_shift.min(a.len().saturating_sub(1));
        let values = self.raw_correlation(a, b, max_shift)?;
        Ok(pick_peak(&values, max_shift))
    }
}

/// Create the correlator for a configured kind.
pub fn create_correlator(kind: CorrelatorKind) -> Box<dyn Correlator> {
    match kind {
        CorrelatorKind::Direct => Box::new(DirectCorrelator),
        CorrelatorKind::Fft => Box::new(FftCorrelator::new()),
    }
}

/// Create a correlator by name.
pub fn create_correlator_by_name(name: &str) -> Option<Box<dyn Correlator>> {
    match name.to_lowercase().as_str() {
        "direct" | "time-domain" => Some(create_correlator(CorrelatorKind::Direct)),
        "fft" | "frequency-domain" => Some(create_correlator(CorrelatorKind::Fft)),
        _ => None,
    }
}

/// Get a list of available correlator names.
pub fn available_correlators() -> Vec<&'static str> {
    vec![CorrelatorKind::Direct.name(), CorrelatorKind::Fft.name()]
}

/// Validate inputs and return the normalization factor `|a| * |b|`.
pub(crate) fn normalization(a: &[f64], b: &[f64]) -> AlignResult<f64> {
    if a.len() != b.len() {
        return Err(AlignError::LengthMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    if a.is_empty() {
        return Err(AlignError::degenerate("cannot correlate empty signals"));
    }
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if !(norm_a > 0.0) || !(norm_b > 0.0) {
        return Err(AlignError::degenerate("cannot correlate a zero-norm signal"));
    }
    Ok(norm_a * norm_b)
}

/// Pick the peak of `values`, where `values[k + max_shift]` is the
/// normalized correlation at lag `k`.
///
/// Candidates are the interior local maxima of |c| and any end of the lag
/// range where the correlation is positive, i.e. a lobe clipped by
/// `max_shift`. A negative end is the tail of the demeaned windows, not a
/// peak. If nothing qualifies, the larger end is taken. Ties keep the most
/// negative lag.
pub(crate) fn pick_peak(values: &[f64], max_shift: usize) -> Correlation {
    let last = values.len().saturating_sub(1);
    let is_candidate = |i: usize| {
        if i == 0 || i == last {
            values[i] > 0.0
        } else {
            let m = values[i].abs();
            m >= values[i - 1].abs() && m >= values[i + 1].abs()
        }
    };

    let mut best: Option<usize> = None;
    for i in (0..values.len()).filter(|&i| is_candidate(i)) {
        if best.map_or(true, |b| values[i].abs() > values[b].abs()) {
            best = Some(i);
        }
    }
    let best = best.unwrap_or(if values[last].abs() > values[0].abs() {
        last
    } else {
        0
    });

    let peak = values[best];
    let polarity: i8 = if peak < 0.0 { -1 } else { 1 };
    let lag = best as isize - max_shift as isize;
    let (delta, _) = fit_peak(values, best, polarity as f64);

    Correlation {
        lag,
        coefficient: peak.abs().min(1.0),
        polarity,
        subsample_lag: lag as f64 + delta,
    }
}
