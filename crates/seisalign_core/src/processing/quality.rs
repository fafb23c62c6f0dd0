//! Per-trace quality metrics.
//!
//! All functions are pure - no I/O, no side effects.

use crate::errors::{AlignError, AlignResult};
use crate::models::CoefficientAveraging;

/// Euclidean norm of a signal.
pub fn l2_norm(signal: &[f64]) -> f64 {
    signal.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Scale `signal` to unit Euclidean norm.
pub fn unit_vector(signal: &[f64]) -> AlignResult<Vec<f64>> {
    let norm = l2_norm(signal);
    if !(norm > 0.0) {
        return Err(AlignError::degenerate("cannot normalize a zero-norm signal"));
    }
    Ok(signal.iter().map(|x| x / norm).collect())
}

/// Signal-to-noise ratio around time zero.
///
/// `time_window` gives the times of the first and last sample relative to
/// time zero. The ratio compares the energy after time zero to the energy
/// before it, scaled by `sqrt(n_before / n_after)` so the result is an RMS
/// ratio independent of where the split falls.
pub fn snr(signal: &[f64], sample_interval: f64, time_window: (f64, f64)) -> AlignResult<f64> {
    if !(sample_interval > 0.0) {
        return Err(AlignError::invalid_config(format!(
            "sample interval {} must be positive",
            sample_interval
        )));
    }
    let split = (-time_window.0 / sample_interval).round() as isize;
    snr_at(signal, split)
}

/// Signal-to-noise ratio with the split at sample index `split`.
pub fn snr_at(signal: &[f64], split: isize) -> AlignResult<f64> {
    let n = signal.len() as isize;
    if split <= 0 || split >= n {
        return Err(AlignError::degenerate(format!(
            "time zero at sample {} leaves no samples on one side of a {}-sample window",
            split, n
        )));
    }
    let (before, after) = signal.split_at(split as usize);

    let noise = l2_norm(before);
    if !(noise > 0.0) {
        return Err(AlignError::degenerate("pre-arrival segment has zero norm"));
    }
    let ratio = l2_norm(after) / noise;
    Ok(ratio * (before.len() as f64 / after.len() as f64).sqrt())
}

/// Coherence of `signal` with a unit-norm reference direction.
///
/// `1 - |s - (s.r) r| / |s|`: 1.0 when the signal lies along the reference,
/// 0.0 when it is orthogonal to it.
pub fn coherence(signal: &[f64], reference_unit: &[f64]) -> AlignResult<f64> {
    if signal.len() != reference_unit.len() {
        return Err(AlignError::LengthMismatch {
            expected: reference_unit.len(),
            got: signal.len(),
        });
    }
    let norm = l2_norm(signal);
    if !(norm > 0.0) {
        return Err(AlignError::degenerate("coherence of a zero-norm signal"));
    }

    let projection: f64 = signal.iter().zip(reference_unit).map(|(s, r)| s * r).sum();
    let residual = signal
        .iter()
        .zip(reference_unit)
        .map(|(s, r)| {
            let d = s - projection * r;
            d * d
        })
        .sum::<f64>()
        .sqrt();

    Ok(1.0 - residual / norm)
}

/// Normalized correlation of two equal-length signals at zero lag.
pub fn zero_lag_coefficient(a: &[f64], b: &[f64]) -> AlignResult<f64> {
    if a.len() != b.len() {
        return Err(AlignError::LengthMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    let denom = l2_norm(a) * l2_norm(b);
    if !(denom > 0.0) {
        return Err(AlignError::degenerate("zero-lag coefficient of a zero-norm signal"));
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    Ok(dot / denom)
}

/// Average a set of correlation coefficients.
///
/// Returns NaN for an empty set.
pub fn mean_coefficient(values: &[f64], averaging: CoefficientAveraging) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let n = values.len() as f64;
    match averaging {
        CoefficientAveraging::Arithmetic => values.iter().sum::<f64>() / n,
        CoefficientAveraging::Fisher => {
            // atanh diverges at +/-1
            let limit = 1.0 - f64::EPSILON;
            let z = values
                .iter()
                .map(|c| c.clamp(-limit, limit).atanh())
                .sum::<f64>()
                / n;
            z.tanh()
        }
    }
}

/// Population standard deviation (0.0 for fewer than two values).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn snr_is_rms_ratio() {
        // 10 samples of amplitude 1 before, 30 samples of amplitude 4 after
        let mut signal = vec![1.0; 10];
        signal.extend(vec![4.0; 30]);
        let value = snr(&signal, 0.1, (-1.0, 2.9)).unwrap();
        assert_relative_eq!(value, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn snr_rejects_silent_noise_segment() {
        let mut signal = vec![0.0; 10];
        signal.extend(vec![1.0; 10]);
        assert!(matches!(
            snr(&signal, 0.1, (-1.0, 0.9)),
            Err(AlignError::DegenerateSignal(_))
        ));
    }

    #[test]
    fn snr_rejects_split_outside_window() {
        let signal = vec![1.0; 10];
        assert!(snr(&signal, 0.1, (0.5, 1.4)).is_err());
        assert!(snr_at(&signal, 10).is_err());
    }

    #[test]
    fn coherence_of_reference_is_one() {
        let reference = unit_vector(&[1.0, 2.0, -1.0, 0.5]).unwrap();
        let signal: Vec<f64> = reference.iter().map(|r| -3.0 * r).collect();
        assert_relative_eq!(coherence(&signal, &reference).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn coherence_of_orthogonal_signal_is_zero() {
        let reference = [1.0, 0.0, 0.0];
        let signal = [0.0, 2.0, 1.0];
        assert_relative_eq!(coherence(&signal, &reference).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn coherence_of_zero_signal_fails() {
        assert!(coherence(&[0.0, 0.0], &[1.0, 0.0]).is_err());
    }

    #[test]
    fn zero_lag_coefficient_detects_scaling_and_inversion() {
        let a = [1.0, -2.0, 3.0];
        let b = [2.0, -4.0, 6.0];
        let c = [-1.0, 2.0, -3.0];
        assert_relative_eq!(zero_lag_coefficient(&a, &b).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(zero_lag_coefficient(&a, &c).unwrap(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn fisher_mean_handles_perfect_coefficients() {
        let values = [1.0, 1.0, 0.5];
        let fisher = mean_coefficient(&values, CoefficientAveraging::Fisher);
        assert!(fisher.is_finite());
        assert!(fisher > mean_coefficient(&values, CoefficientAveraging::Arithmetic));
    }

    #[test]
    fn arithmetic_mean_of_coefficients() {
        let values = [0.9, 0.7, 0.8];
        assert_relative_eq!(
            mean_coefficient(&values, CoefficientAveraging::Arithmetic),
            0.8,
            epsilon = 1e-12
        );
        assert!(mean_coefficient(&[], CoefficientAveraging::Arithmetic).is_nan());
    }

    #[test]
    fn std_dev_is_population() {
        assert_relative_eq!(std_dev(&[1.0, 3.0]), 1.0, epsilon = 1e-12);
        assert_eq!(std_dev(&[5.0]), 0.0);
    }
}
