//! Stack construction and convergence scoring.

use crate::errors::{AlignError, AlignResult};
use crate::models::ConvergenceMetric;
use crate::processing::{apply_taper, l2_norm, zero_lag_coefficient, WindowMatrix};

/// Weighted average of the windows in `matrix`, each scaled to unit peak
/// amplitude first, then tapered.
///
/// `weights[i]` applies to row `i`; a zero weight leaves the row out. The
/// sum is divided by the total absolute weight, so negative weights flip
/// reversed traces without shrinking the stack.
pub fn build_stack(matrix: &WindowMatrix, weights: &[f64]) -> AlignResult<Vec<f64>> {
    if weights.len() != matrix.n_traces() {
        return Err(AlignError::LengthMismatch {
            expected: matrix.n_traces(),
            got: weights.len(),
        });
    }

    let mut stack = vec![0.0; matrix.n_samples()];
    let mut total_weight = 0.0;

    for (row, &weight) in matrix.rows.iter().zip(weights) {
        if weight == 0.0 {
            continue;
        }
        let peak = row.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
        if peak == 0.0 {
            continue;
        }
        let scale = weight / peak;
        for (s, x) in stack.iter_mut().zip(row) {
            *s += scale * x;
        }
        total_weight += weight.abs();
    }

    if total_weight == 0.0 {
        return Err(AlignError::degenerate("no trace contributes to the stack"));
    }

    for s in &mut stack {
        *s /= total_weight;
    }
    apply_taper(&mut stack, matrix.layout.taper_len, matrix.layout.taper);
    Ok(stack)
}

/// Score how much the stack changed between iterations (0.0 = unchanged).
pub fn convergence_score(
    current: &[f64],
    previous: &[f64],
    metric: ConvergenceMetric,
) -> AlignResult<f64> {
    match metric {
        ConvergenceMetric::Coefficient => Ok(1.0 - zero_lag_coefficient(current, previous)?),
        ConvergenceMetric::Residual => {
            if current.len() != previous.len() {
                return Err(AlignError::LengthMismatch {
                    expected: current.len(),
                    got: previous.len(),
                });
            }
            let norm = l2_norm(current);
            if !(norm > 0.0) {
                return Err(AlignError::degenerate("stack has zero norm"));
            }
            let change: f64 = current
                .iter()
                .zip(previous)
                .map(|(a, b)| (a - b).abs())
                .sum();
            Ok(change / (norm * current.len() as f64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{WindowConfig, WindowLayout};
    use approx::assert_relative_eq;

    fn matrix(rows: Vec<Vec<f64>>, taper_fraction: f64) -> WindowMatrix {
        let n = rows[0].len();
        let config = WindowConfig {
            t0: 0.0,
            t1: n as f64 / (1.0 + taper_fraction),
            taper_fraction,
            ..Default::default()
        };
        let layout = WindowLayout::new(&config, 1.0).unwrap();
        assert_eq!(layout.n_samples, n);
        WindowMatrix {
            anchors: vec![0.0; rows.len()],
            rows,
            layout,
            degraded: Vec::new(),
        }
    }

    #[test]
    fn rows_are_peak_normalized() {
        let m = matrix(vec![vec![0.0, 2.0, 0.0, 0.0], vec![0.0, 10.0, 0.0, 0.0]], 0.0);
        let stack = build_stack(&m, &[1.0, 1.0]).unwrap();
        assert_eq!(stack, vec![0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn negative_weight_flips_reversed_trace() {
        let m = matrix(vec![vec![0.0, 1.0, -0.5, 0.0], vec![0.0, -1.0, 0.5, 0.0]], 0.0);
        let stack = build_stack(&m, &[0.9, -0.9]).unwrap();
        assert_relative_eq!(stack[1], 1.0);
        assert_relative_eq!(stack[2], -0.5);
    }

    #[test]
    fn zero_weight_rows_are_left_out() {
        let m = matrix(vec![vec![0.0, 1.0, 0.0, 0.0], vec![1.0, 0.0, 0.0, 0.0]], 0.0);
        let stack = build_stack(&m, &[1.0, 0.0]).unwrap();
        assert_eq!(stack, vec![0.0, 1.0, 0.0, 0.0]);
        assert!(matches!(
            build_stack(&m, &[0.0, 0.0]),
            Err(AlignError::DegenerateSignal(_))
        ));
    }

    #[test]
    fn stack_is_tapered() {
        let m = matrix(vec![vec![1.0; 22]], 0.1);
        assert!(m.layout.taper_len > 0);
        let stack = build_stack(&m, &[1.0]).unwrap();
        assert_relative_eq!(stack[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(stack[11], 1.0);
    }

    #[test]
    fn identical_stacks_score_zero() {
        let s = [0.0, 1.0, 3.0, -2.0];
        for metric in [ConvergenceMetric::Coefficient, ConvergenceMetric::Residual] {
            assert_relative_eq!(convergence_score(&s, &s, metric).unwrap(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn residual_score_is_scaled_l1_change() {
        let current = [3.0, 4.0];
        let previous = [2.0, 4.5];
        let score = convergence_score(&current, &previous, ConvergenceMetric::Residual).unwrap();
        // (1 + 0.5) / (5 * 2)
        assert_relative_eq!(score, 0.15);
    }
}
