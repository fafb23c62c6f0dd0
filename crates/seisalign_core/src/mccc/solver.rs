//! Least-squares solution of the pairwise delay system.
//!
//! Each pair `(i, j)` contributes the row `t_i - t_j = delay_ij`, and one
//! extra row `sum t_i = 0` pins the otherwise free common shift. The
//! solvers work on the normal equations directly, so the design matrix
//! with its `N (N - 1) / 2 + 1` rows is never built.

use nalgebra::{Cholesky, DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::errors::{AlignError, AlignResult};

/// Relative pivot size below which the normal matrix counts as singular.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Measured delay between traces `i < j`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairDelay {
    pub i: usize,
    pub j: usize,
    /// Estimated `t_i - t_j` in seconds.
    pub delay: f64,
    /// Peak correlation coefficient of the pair.
    pub coefficient: f64,
    /// Delay implied by the input picks minus `delay`.
    pub lag_time: f64,
}

/// Ordinary least-squares solution.
///
/// With unit weights the normal matrix of the full pair set plus the
/// zero-mean row is `N * I`, so `t = A^T d / N`.
pub fn solve_unweighted(n: usize, pairs: &[PairDelay]) -> Vec<f64> {
    let mut t = vec![0.0; n];
    if n == 0 {
        return t;
    }
    for p in pairs {
        t[p.i] += p.delay;
        t[p.j] -= p.delay;
    }
    let scale = 1.0 / n as f64;
    for x in &mut t {
        *x *= scale;
    }
    t
}

/// Normal matrix `A^T W A` of the weighted system.
pub fn normal_matrix(
    n: usize,
    pairs: &[PairDelay],
    weights: &[f64],
    constraint_weight: f64,
) -> DMatrix<f64> {
    let mut m = DMatrix::<f64>::from_element(n, n, constraint_weight);
    for (p, &w) in pairs.iter().zip(weights) {
        m[(p.i, p.i)] += w;
        m[(p.j, p.j)] += w;
        m[(p.i, p.j)] -= w;
        m[(p.j, p.i)] -= w;
    }
    m
}

/// Weighted least-squares solution, `weights[k]` applying to `pairs[k]`.
///
/// Fails with [`AlignError::SingularSystem`] if the normal matrix is not
/// positive definite.
pub fn solve_weighted(
    n: usize,
    pairs: &[PairDelay],
    weights: &[f64],
    constraint_weight: f64,
) -> AlignResult<Vec<f64>> {
    if weights.len() != pairs.len() {
        return Err(AlignError::LengthMismatch {
            expected: pairs.len(),
            got: weights.len(),
        });
    }
    if let Some(w) = weights.iter().find(|w| !(w.is_finite() && **w >= 0.0)) {
        return Err(AlignError::singular(format!(
            "pair weight {} is not a finite non-negative number",
            w
        )));
    }

    let m = normal_matrix(n, pairs, weights, constraint_weight);
    let mut rhs = DVector::<f64>::zeros(n);
    for (p, &w) in pairs.iter().zip(weights) {
        rhs[p.i] += w * p.delay;
        rhs[p.j] -= w * p.delay;
    }

    let scale = m.diagonal().max();
    let cholesky = Cholesky::new(m)
        .ok_or_else(|| AlignError::singular("normal matrix is not positive definite"))?;

    let min_pivot = cholesky.l_dirty().diagonal().min();
    if min_pivot * min_pivot <= PIVOT_TOLERANCE * scale {
        return Err(AlignError::singular(format!(
            "normal matrix is numerically singular (pivot {:.3e})",
            min_pivot
        )));
    }

    let t = cholesky.solve(&rhs);
    Ok(t.iter().copied().collect())
}

/// Residuals `delay_ij - (t_i - t_j)`, one per pair.
pub fn residuals(pairs: &[PairDelay], t: &[f64]) -> Vec<f64> {
    pairs.iter().map(|p| p.delay - (t[p.i] - t[p.j])).collect()
}

/// Root mean square of `values` (0.0 when empty).
pub(crate) fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
}
