//! Peak fitting for sub-sample lags.
//!
//! Uses quadratic (parabolic) interpolation through the peak and its two
//! neighbors to locate the true maximum between samples.

/// Fit a parabola through `values[peak_index - 1..=peak_index + 1]`.
///
/// `polarity` flips the values so that a negative peak is treated as a
/// maximum. Returns `(delta, refined_peak)` where `delta` is the offset of
/// the true peak from `peak_index` in samples, clamped to `[-0.5, 0.5]`.
/// At the array edges no interpolation is possible and `delta` is 0.
pub fn fit_peak(values: &[f64], peak_index: usize, polarity: f64) -> (f64, f64) {
    let y1 = polarity * values[peak_index];
    if peak_index == 0 || peak_index + 1 >= values.len() {
        return (0.0, y1);
    }

    let y0 = polarity * values[peak_index - 1];
    let y2 = polarity * values[peak_index + 1];

    // y = a x^2 + b x + c through x = -1, 0, 1
    let a = (y0 + y2) / 2.0 - y1;
    let b = (y2 - y0) / 2.0;

    if a.abs() <= 1e-12 {
        return (0.0, y1);
    }

    let delta = (-b / (2.0 * a)).clamp(-0.5, 0.5);
    let refined = y1 - (b * b) / (4.0 * a);
    (delta, refined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_on_perfect_parabola() {
        // Peak at x = 5.3
        let values: Vec<f64> = (0..11)
            .map(|i| {
                let x = i as f64 - 5.3;
                1.0 - x * x
            })
            .collect();
        let (delta, refined) = fit_peak(&values, 5, 1.0);
        assert!((delta - 0.3).abs() < 1e-9, "delta was {}", delta);
        assert!((refined - 1.0).abs() < 1e-9);
    }

    #[test]
    fn symmetric_peak_has_no_offset() {
        let values = [0.5, 0.8, 1.0, 0.8, 0.5];
        let (delta, _) = fit_peak(&values, 2, 1.0);
        assert!(delta.abs() < 1e-12);
    }

    #[test]
    fn negative_peak_is_fitted_with_polarity() {
        let values = [-0.3, -0.6, -1.0, -0.8, -0.4];
        let (delta, refined) = fit_peak(&values, 2, -1.0);
        assert!(delta > 0.0 && delta < 0.5);
        assert!(refined >= 1.0);
    }

    #[test]
    fn edge_peak_returns_discrete() {
        let values = [1.0, 0.8, 0.5, 0.3];
        assert_eq!(fit_peak(&values, 0, 1.0), (0.0, 1.0));
    }
}
