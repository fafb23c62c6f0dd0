//! Configuration and result types for ICCS runs.

use serde::{Deserialize, Serialize};

use crate::errors::{AlignError, AlignResult};
use crate::models::{ConvergenceMetric, CorrelatorKind, Stack, StackWeighting, TraceSet};
use crate::processing::{FilterConfig, WindowConfig};

/// Settings for one ICCS run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IccsConfig {
    /// Correlation window around each pick.
    pub window: WindowConfig,
    /// Pre-filter applied to whole traces.
    pub filter: FilterConfig,
    /// Largest lag searched against the stack, in samples.
    pub max_shift: usize,
    /// Upper bound on stack/correlate iterations.
    pub max_iterations: usize,
    /// Stop once the convergence score is at or below this value.
    pub convergence_threshold: f64,
    /// How the convergence score compares successive stacks.
    pub convergence_metric: ConvergenceMetric,
    /// How traces are weighted in the stack.
    pub stack_weighting: StackWeighting,
    /// Correlator implementation.
    pub correlator: CorrelatorKind,
    /// Deselect traces whose coefficient drops below this value.
    pub min_correlation: Option<f64>,
}

impl Default for IccsConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            filter: FilterConfig::default(),
            max_shift: 50,
            max_iterations: 10,
            convergence_threshold: 1e-5,
            convergence_metric: ConvergenceMetric::default(),
            stack_weighting: StackWeighting::default(),
            correlator: CorrelatorKind::default(),
            min_correlation: None,
        }
    }
}

impl IccsConfig {
    /// Reject settings that cannot produce a run.
    pub fn validate(&self) -> AlignResult<()> {
        self.window.validate()?;
        self.filter.validate()?;
        if self.max_iterations == 0 {
            return Err(AlignError::invalid_config("max_iterations must be at least 1"));
        }
        if !(self.convergence_threshold >= 0.0 && self.convergence_threshold.is_finite()) {
            return Err(AlignError::invalid_config(format!(
                "convergence threshold {} must be finite and non-negative",
                self.convergence_threshold
            )));
        }
        if let Some(min) = self.min_correlation {
            if !(0.0..=1.0).contains(&min) {
                return Err(AlignError::invalid_config(format!(
                    "min_correlation {} must be in [0, 1]",
                    min
                )));
            }
        }
        Ok(())
    }
}

/// Phase of an ICCS run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IccsState {
    Initializing,
    Iterating,
    /// Successive stacks agreed within the threshold.
    Converged,
    /// The iteration budget ran out. Results are still usable.
    MaxIterationsReached,
}

impl std::fmt::Display for IccsState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::Iterating => "iterating",
            Self::Converged => "converged",
            Self::MaxIterationsReached => "max iterations reached",
        };
        write!(f, "{}", name)
    }
}

/// How an ICCS run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    /// Terminal state.
    pub state: IccsState,
    /// Number of iterations started.
    pub iterations: usize,
    /// Convergence score per iteration, starting with the second.
    pub scores: Vec<f64>,
    /// Traces whose window was zero-filled in any iteration.
    pub degraded: Vec<usize>,
    /// Traces deselected for low correlation, in the order it happened.
    pub deselected: Vec<usize>,
}

impl ConvergenceReport {
    pub(crate) fn new() -> Self {
        Self {
            state: IccsState::Initializing,
            iterations: 0,
            scores: Vec::new(),
            degraded: Vec::new(),
            deselected: Vec::new(),
        }
    }

    /// Check if the run converged.
    pub fn is_converged(&self) -> bool {
        self.state == IccsState::Converged
    }

    /// Last convergence score, if at least two stacks were built.
    pub fn final_score(&self) -> Option<f64> {
        self.scores.last().copied()
    }
}

/// Everything an ICCS run hands back.
#[derive(Debug, Clone)]
pub struct IccsOutcome {
    /// The input traces with updated picks, weights and quality fields.
    pub traces: TraceSet,
    /// Final stack.
    pub stack: Stack,
    /// How the run ended.
    pub report: ConvergenceReport,
}
