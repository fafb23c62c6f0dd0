//! The ICCS stack/correlate/update loop.

use std::borrow::Cow;
use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::correlation::{create_correlator, Correlation, Correlator};
use crate::errors::{AlignError, AlignResult};
use crate::models::{Stack, StackWeighting, Trace, TraceSet};
use crate::processing::{
    coherence, prepare_samples, shift_samples, snr_at, unit_vector, window_at, WindowLayout,
    WindowMatrix,
};

use super::stack::{build_stack, convergence_score};
use super::types::{ConvergenceReport, IccsConfig, IccsOutcome, IccsState};

/// Fewest selected traces a stack is built from.
pub const MIN_TRACES: usize = 2;

/// Iterative cross-correlation and stack engine.
///
/// Holds the configuration and the correlator; each call to [`run`](Self::run)
/// takes ownership of a trace set and hands it back in the outcome.
pub struct IccsEngine {
    config: IccsConfig,
    correlator: Box<dyn Correlator>,
}

/// Per-trace state carried between iterations.
#[derive(Debug, Clone, Copy)]
struct TraceState {
    output_time: f64,
    weight: f64,
    selected: bool,
    correlation_coefficient: f64,
    snr: f64,
    coherence: f64,
}

impl TraceState {
    fn initial(trace: &Trace) -> Self {
        Self {
            output_time: trace.reference_time,
            weight: 1.0,
            selected: trace.selected,
            correlation_coefficient: f64::NAN,
            snr: f64::NAN,
            coherence: f64::NAN,
        }
    }

    fn stack_weight(&self) -> f64 {
        if self.selected {
            self.weight
        } else {
            0.0
        }
    }
}

/// One trace measured against the stack.
#[derive(Debug, Clone, Copy)]
struct Measurement {
    correlation: Correlation,
    snr: f64,
    coherence: f64,
}

impl IccsEngine {
    /// Create an engine using the correlator named in `config`.
    pub fn new(config: IccsConfig) -> Self {
        let correlator = create_correlator(config.correlator);
        Self { config, correlator }
    }

    /// Set the correlator.
    pub fn with_correlator(mut self, correlator: Box<dyn Correlator>) -> Self {
        self.correlator = correlator;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &IccsConfig {
        &self.config
    }

    /// Align `traces` and build their stack.
    ///
    /// Hitting `max_iterations` is reported in the outcome, not as an error.
    pub fn run(&self, mut traces: TraceSet) -> AlignResult<IccsOutcome> {
        self.config.validate()?;

        let selected = traces.selected_count();
        if selected < MIN_TRACES {
            return Err(AlignError::InsufficientTraces {
                got: selected,
                required: MIN_TRACES,
            });
        }
        let sample_interval = traces
            .sample_interval()
            .ok_or(AlignError::InsufficientTraces {
                got: 0,
                required: MIN_TRACES,
            })?;
        let layout = self.config.window.layout(sample_interval)?;

        tracing::info!(
            "ICCS: aligning {} traces ({} selected) using {} correlator, window {} samples",
            traces.len(),
            selected,
            self.correlator.name(),
            layout.n_samples
        );

        let reference_time = traces.mean_reference_time();
        let (states, samples, report) = {
            let sources = prepare_samples(&traces, &self.config.filter)?;
            self.iterate(&traces, &sources, &layout)?
        };

        for (trace, state) in traces.iter_mut().zip(&states) {
            trace.output_time = state.output_time;
            trace.weight = state.weight;
            trace.selected = state.selected;
            trace.correlation_coefficient = state.correlation_coefficient;
            trace.snr = state.snr;
            trace.coherence = state.coherence;
        }

        let output_time = traces.mean_output_time();
        let stack = Stack {
            samples,
            sample_interval,
            begin_time: output_time + layout.start_offset,
            reference_time,
            output_time,
        };

        tracing::info!(
            "ICCS finished: {} after {} iterations (final score {:?})",
            report.state,
            report.iterations,
            report.final_score()
        );

        Ok(IccsOutcome {
            traces,
            stack,
            report,
        })
    }

    fn iterate(
        &self,
        traces: &TraceSet,
        sources: &[Cow<'_, [f64]>],
        layout: &WindowLayout,
    ) -> AlignResult<(Vec<TraceState>, Vec<f64>, ConvergenceReport)> {
        let config = &self.config;
        let mut states: Vec<TraceState> = traces.iter().map(TraceState::initial).collect();
        let mut report = ConvergenceReport::new();
        let mut degraded = BTreeSet::new();
        let mut previous: Option<Vec<f64>> = None;

        for iteration in 1..=config.max_iterations {
            report.state = IccsState::Iterating;
            report.iterations = iteration;

            let anchors: Vec<f64> = states.iter().map(|s| s.output_time).collect();
            let matrix = window_at(traces, sources, &anchors, layout)?;
            degraded.extend(matrix.degraded.iter().copied());

            let weights: Vec<f64> = states.iter().map(TraceState::stack_weight).collect();
            let stack = build_stack(&matrix, &weights)?;

            if let Some(prev) = previous.as_deref() {
                let score = convergence_score(&stack, prev, config.convergence_metric)?;
                report.scores.push(score);
                tracing::debug!("ICCS iteration {}: convergence score {:.3e}", iteration, score);

                if score <= config.convergence_threshold {
                    report.state = IccsState::Converged;
                    report.degraded = degraded.into_iter().collect();
                    return Ok((states, stack, report));
                }
            } else {
                tracing::debug!("ICCS iteration {}: initial stack", iteration);
            }

            self.update(&matrix, &stack, &mut states)?;
            if let Some(min) = config.min_correlation {
                deselect_poor(traces, &mut states, min, &mut report.deselected);
            }
            previous = Some(stack);
        }

        tracing::warn!(
            "ICCS did not converge within {} iterations",
            config.max_iterations
        );
        report.state = IccsState::MaxIterationsReached;
        report.degraded = degraded.into_iter().collect();
        Ok((states, previous.unwrap_or_default(), report))
    }

    /// Correlate every window against the stack and move the picks.
    ///
    /// New picks are measured from each row's grid-snapped anchor, so an
    /// off-grid input pick lands on the sample grid after the first update.
    fn update(
        &self,
        matrix: &WindowMatrix,
        stack: &[f64],
        states: &mut [TraceState],
    ) -> AlignResult<()> {
        let layout = &matrix.layout;
        let unit_stack = unit_vector(stack)?;
        let correlator = self.correlator.as_ref();
        let max_shift = self.config.max_shift;

        let measurements = matrix
            .rows
            .par_iter()
            .map(|row| measure(correlator, row, &unit_stack, layout, max_shift))
            .collect::<AlignResult<Vec<_>>>()?;

        for ((state, m), &anchor) in states.iter_mut().zip(measurements).zip(&matrix.anchors) {
            state.output_time = anchor + m.correlation.lag_seconds(layout.sample_interval);
            state.correlation_coefficient = m.correlation.coefficient;
            state.snr = m.snr;
            state.coherence = m.coherence;
            if self.config.stack_weighting == StackWeighting::CorrelationWeighted {
                state.weight = m.correlation.signed_coefficient();
            }
        }
        Ok(())
    }
}

/// Correlate one window against the unit-norm stack and score it.
///
/// SNR and coherence are left undefined when the aligned window has no
/// energy on one side of the pick.
fn measure(
    correlator: &dyn Correlator,
    window: &[f64],
    unit_stack: &[f64],
    layout: &WindowLayout,
    max_shift: usize,
) -> AlignResult<Measurement> {
    let correlation = correlator.correlate(unit_stack, window, max_shift)?;

    let snr = snr_at(window, layout.zero_index + correlation.lag).unwrap_or_else(|e| {
        tracing::debug!("SNR undefined: {}", e);
        f64::NAN
    });
    let aligned = shift_samples(window, correlation.lag);
    let coherence = coherence(&aligned, unit_stack).unwrap_or_else(|e| {
        tracing::debug!("Coherence undefined: {}", e);
        f64::NAN
    });

    Ok(Measurement {
        correlation,
        snr,
        coherence,
    })
}

/// Deselect selected traces below `min_correlation`, worst first, keeping
/// at least [`MIN_TRACES`] selected.
fn deselect_poor(
    traces: &TraceSet,
    states: &mut [TraceState],
    min_correlation: f64,
    deselected: &mut Vec<usize>,
) {
    let mut candidates: Vec<usize> = (0..states.len())
        .filter(|&i| states[i].selected && states[i].correlation_coefficient < min_correlation)
        .collect();
    candidates.sort_by(|&a, &b| {
        states[a]
            .correlation_coefficient
            .total_cmp(&states[b].correlation_coefficient)
    });

    let mut remaining = states.iter().filter(|s| s.selected).count();
    for index in candidates {
        let name = traces.get(index).map(|t| t.name.as_str()).unwrap_or("?");
        if remaining <= MIN_TRACES {
            tracing::warn!(
                "Keeping trace '{}' (coefficient {:.3}): only {} traces selected",
                name,
                states[index].correlation_coefficient,
                remaining
            );
            continue;
        }
        tracing::warn!(
            "Deselecting trace '{}': coefficient {:.3} below {:.3}",
            name,
            states[index].correlation_coefficient,
            min_correlation
        );
        states[index].selected = false;
        remaining -= 1;
        deselected.push(index);
    }
}

/// Run ICCS with the correlator named in `config`.
pub fn run_iccs(traces: TraceSet, config: &IccsConfig) -> AlignResult<IccsOutcome> {
    IccsEngine::new(config.clone()).run(traces)
}
