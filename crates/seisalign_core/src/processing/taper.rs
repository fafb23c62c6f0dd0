//! Raised-cosine tapering and mean removal.

use crate::models::TaperType;

/// Weights for one taper edge of `len` samples.
///
/// Index 0 is the outermost sample; the weight approaches 1.0 towards the
/// window interior.
pub fn taper_weights(len: usize, taper: TaperType) -> Vec<f64> {
    let (f0, f1) = taper.coefficients();
    let omega = taper.omega(len);
    (0..len).map(|i| f0 - f1 * (omega * i as f64).cos()).collect()
}

/// Taper `taper_len` samples at each end of `samples` in place.
///
/// The taper length is clamped to half the signal so the two edges never
/// overlap. Samples between the edges are untouched.
pub fn apply_taper(samples: &mut [f64], taper_len: usize, taper: TaperType) {
    let n = samples.len();
    let len = taper_len.min(n / 2);
    if len == 0 {
        return;
    }

    for (i, w) in taper_weights(len, taper).into_iter().enumerate() {
        samples[i] *= w;
        samples[n - 1 - i] *= w;
    }
}

/// Subtract the mean from `samples` in place.
pub fn remove_mean(samples: &mut [f64]) {
    if samples.is_empty() {
        return;
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    for s in samples.iter_mut() {
        *s -= mean;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_taper_is_symmetric_and_leaves_interior() {
        let mut samples = vec![1.0; 20];
        apply_taper(&mut samples, 5, TaperType::Hann);

        assert_eq!(samples[0], 0.0);
        for i in 0..20 {
            assert!((samples[i] - samples[19 - i]).abs() < 1e-12);
        }
        for s in &samples[5..15] {
            assert_eq!(*s, 1.0);
        }
        // Monotonic rise across the edge
        for i in 1..5 {
            assert!(samples[i] > samples[i - 1]);
        }
    }

    #[test]
    fn hamming_taper_starts_above_zero() {
        let w = taper_weights(8, TaperType::Hamming);
        assert!((w[0] - 0.08).abs() < 1e-12);
    }

    #[test]
    fn taper_longer_than_half_is_clamped() {
        let mut samples = vec![1.0; 6];
        apply_taper(&mut samples, 10, TaperType::Cosine);
        for i in 0..3 {
            assert!((samples[i] - samples[5 - i]).abs() < 1e-12);
        }
        assert_eq!(samples[0], 0.0);
    }

    #[test]
    fn zero_length_taper_is_noop() {
        let mut samples = vec![2.0; 4];
        apply_taper(&mut samples, 0, TaperType::Hann);
        assert_eq!(samples, vec![2.0; 4]);
    }

    #[test]
    fn remove_mean_centers_signal() {
        let mut samples = vec![1.0, 2.0, 3.0, 6.0];
        remove_mean(&mut samples);
        assert!(samples.iter().sum::<f64>().abs() < 1e-12);
        assert!((samples[0] + 2.0).abs() < 1e-12);
    }
}
