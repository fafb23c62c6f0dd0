//! Configuration and result types for MCCC runs.

use serde::{Deserialize, Serialize};

use crate::errors::{AlignError, AlignResult};
use crate::models::{CoefficientAveraging, CorrelatorKind, McccWeighting, TraceSet};
use crate::processing::{FilterConfig, WindowConfig};

/// Settings for one MCCC run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McccConfig {
    /// Correlation window around each reference pick.
    pub window: WindowConfig,
    /// Pre-filter applied to whole traces.
    pub filter: FilterConfig,
    /// Largest pairwise lag searched, in samples.
    pub max_shift: usize,
    /// Weighting of the least-squares solve.
    pub weighting: McccWeighting,
    /// Weight of the zero-mean row.
    pub constraint_weight: f64,
    /// How pairwise coefficients are averaged per trace.
    pub coefficient_averaging: CoefficientAveraging,
    /// Correlator implementation.
    pub correlator: CorrelatorKind,
    /// Use parabolic sub-sample lags for the pairwise delays.
    pub use_peak_fit: bool,
    /// Fewest traces accepted.
    pub min_traces: usize,
}

impl Default for McccConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            filter: FilterConfig::default(),
            max_shift: 50,
            weighting: McccWeighting::default(),
            constraint_weight: 1.0,
            coefficient_averaging: CoefficientAveraging::default(),
            correlator: CorrelatorKind::default(),
            use_peak_fit: false,
            min_traces: 5,
        }
    }
}

impl McccConfig {
    /// Reject settings that cannot produce a solve.
    pub fn validate(&self) -> AlignResult<()> {
        self.window.validate()?;
        self.filter.validate()?;
        if !(self.constraint_weight > 0.0 && self.constraint_weight.is_finite()) {
            return Err(AlignError::invalid_config(format!(
                "constraint weight {} must be positive",
                self.constraint_weight
            )));
        }
        // standard errors divide by N - 2
        if self.min_traces < 3 {
            return Err(AlignError::invalid_config(format!(
                "min_traces {} must be at least 3",
                self.min_traces
            )));
        }
        Ok(())
    }
}

/// Solved delays, one entry per trace in set order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerTraceDelays {
    /// Relative delays `t_i`, summing to zero.
    pub relative: Vec<f64>,
    /// Final picks, `mean_reference_time + t_i`.
    pub picks: Vec<f64>,
    /// Mean of the input reference picks.
    pub mean_reference_time: f64,
}

/// Error estimates and quality scores, one entry per trace in set order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerTraceErrors {
    /// RMS over the `N - 1` pairs involving the trace of
    /// `delay_ij - (t_i - t_j)`.
    pub residual_rms: Vec<f64>,
    /// `sqrt(sum r_ij^2 / (N - 2))`.
    pub standard_error: Vec<f64>,
    /// Mean pairwise coefficient.
    pub coefficient_mean: Vec<f64>,
    /// Standard deviation of the pairwise coefficients.
    pub coefficient_std: Vec<f64>,
}

/// Summary of the least-squares solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverReport {
    /// RMS residual over all pairs after the solve.
    pub overall_rms: f64,
    /// RMS residual over all pairs of the input picks.
    pub prior_rms: f64,
    /// `sum t_i`.
    pub constraint_sum: f64,
    /// Weighting used.
    pub weighting: McccWeighting,
    /// Number of correlated pairs.
    pub pair_count: usize,
    /// Traces whose window was partly zero-filled.
    pub degraded: Vec<usize>,
}

/// Everything an MCCC run hands back.
#[derive(Debug, Clone)]
pub struct McccOutcome {
    /// The input traces with `output_time` set to the solved pick and
    /// `correlation_coefficient` to the mean pairwise coefficient.
    pub traces: TraceSet,
    pub delays: PerTraceDelays,
    pub errors: PerTraceErrors,
    pub report: SolverReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = McccConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_traces, 5);
        assert_eq!(config.constraint_weight, 1.0);
    }

    #[test]
    fn non_positive_constraint_weight_rejected() {
        let config = McccConfig {
            constraint_weight: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AlignError::InvalidConfig(_))));
    }

    #[test]
    fn deserializes_partial_config() {
        let config: McccConfig =
            serde_json::from_str(r#"{"weighting": "residual-weighted", "use_peak_fit": true}"#)
                .unwrap();
        assert_eq!(config.weighting, McccWeighting::ResidualWeighted);
        assert!(config.use_peak_fit);
        assert_eq!(config.max_shift, 50);
    }
}
