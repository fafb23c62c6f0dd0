//! FFT-based cross-correlation.
//!
//! Uses the correlation theorem: `c = IFFT(conj(FFT(a)) * FFT(b))`, with both
//! inputs zero-padded so the circular result contains the full linear
//! correlation.

use rustfft::{num_complex::Complex, FftPlanner};

use crate::errors::AlignResult;

use super::{normalization, Correlator};

/// Cross-correlation using FFT.
#[derive(Debug, Clone, Copy, Default)]
pub struct FftCorrelator;

impl FftCorrelator {
    /// Create a new FFT correlator.
    pub fn new() -> Self {
        Self
    }

    /// Full circular correlation of length `fft_len`.
    ///
    /// Index `k` holds lag `k`; negative lags wrap to `fft_len + k`.
    fn compute_cross_correlation(&self, a: &[f64], b: &[f64]) -> Vec<f64> {
        // Pad to a power of 2 that can contain the full correlation
        let correlation_len = a.len() + b.len() - 1;
        let fft_len = correlation_len.next_power_of_two();

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(fft_len);
        let ifft = planner.plan_fft_inverse(fft_len);

        let mut a_complex: Vec<Complex<f64>> = a.iter().map(|&x| Complex::new(x, 0.0)).collect();
        a_complex.resize(fft_len, Complex::new(0.0, 0.0));

        let mut b_complex: Vec<Complex<f64>> = b.iter().map(|&x| Complex::new(x, 0.0)).collect();
        b_complex.resize(fft_len, Complex::new(0.0, 0.0));

        fft.process(&mut a_complex);
        fft.process(&mut b_complex);

        let mut product: Vec<Complex<f64>> = a_complex
            .iter()
            .zip(b_complex.iter())
            .map(|(x, y)| x.conj() * y)
            .collect();

        ifft.process(&mut product);

        // rustfft does not normalize the inverse transform
        let scale = 1.0 / fft_len as f64;
        product.iter().map(|c| c.re * scale).collect()
    }
}

impl Correlator for FftCorrelator {
    fn name(&self) -> &str {
        "FFT"
    }

    fn description(&self) -> &str {
        "Frequency-domain cross-correlation using FFT"
    }

    fn raw_correlation(&self, a: &[f64], b: &[f64], max_shift: usize) -> AlignResult<Vec<f64>> {
        let norm = normalization(a, b)?;
        let circular = self.compute_cross_correlation(a, b);
        let fft_len = circular.len() as isize;
        let max_shift = max_shift as isize;

        let values = (-max_shift..=max_shift)
            .map(|k| circular[k.rem_euclid(fft_len) as usize] / norm)
            .collect();

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::DirectCorrelator;
    use crate::processing::shift_samples;
    use approx::assert_abs_diff_eq;

    fn wavelet(n: usize, center: f64) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let x = (i as f64 - center) / 4.0;
                (1.0 - 2.0 * x * x) * (-x * x).exp()
            })
            .collect()
    }

    #[test]
    fn matches_direct_correlation() {
        let a = wavelet(100, 45.0);
        let b: Vec<f64> = wavelet(100, 52.0)
            .iter()
            .enumerate()
            .map(|(i, x)| x + 0.05 * (i as f64 * 0.7).sin())
            .collect();

        let fft = FftCorrelator::new().raw_correlation(&a, &b, 20).unwrap();
        let direct = DirectCorrelator.raw_correlation(&a, &b, 20).unwrap();
        assert_eq!(fft.len(), direct.len());
        for (x, y) in fft.iter().zip(&direct) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-10);
        }
    }

    #[test]
    fn recovers_shift_in_both_directions() {
        let a = wavelet(128, 64.0);
        for lag in [-12isize, -1, 0, 7, 15] {
            let b = shift_samples(&a, -lag);
            let c = FftCorrelator::new().correlate(&a, &b, 20).unwrap();
            assert_eq!(c.lag, lag);
            assert_eq!(c.polarity, 1);
        }
    }

    #[test]
    fn polarity_flip_keeps_lag_and_magnitude() {
        let a = wavelet(128, 60.0);
        let b = shift_samples(&a, -4);
        let flipped: Vec<f64> = b.iter().map(|x| -x).collect();

        let c1 = FftCorrelator::new().correlate(&a, &b, 10).unwrap();
        let c2 = FftCorrelator::new().correlate(&a, &flipped, 10).unwrap();
        assert_eq!(c1.lag, c2.lag);
        assert_eq!(c2.polarity, -1);
        assert_abs_diff_eq!(c1.coefficient, c2.coefficient, epsilon = 1e-12);
    }
}
