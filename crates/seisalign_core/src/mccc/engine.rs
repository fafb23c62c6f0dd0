//! Pairwise correlation and delay solve.

use rayon::prelude::*;

use crate::correlation::{create_correlator, Correlator};
use crate::errors::{AlignError, AlignResult};
use crate::models::{McccWeighting, TimePick, TraceSet};
use crate::processing::{mean_coefficient, prepare_samples, std_dev, window_traces, WindowMatrix};

use super::solver::{residuals, rms, solve_unweighted, solve_weighted, PairDelay};
use super::types::{McccConfig, McccOutcome, PerTraceDelays, PerTraceErrors, SolverReport};

/// Multi-channel cross-correlation engine.
pub struct McccEngine {
    config: McccConfig,
    correlator: Box<dyn Correlator>,
}

impl McccEngine {
    /// Create an engine using the correlator named in `config`.
    pub fn new(config: McccConfig) -> Self {
        let correlator = create_correlator(config.correlator);
        Self { config, correlator }
    }

    /// Set the correlator.
    pub fn with_correlator(mut self, correlator: Box<dyn Correlator>) -> Self {
        self.correlator = correlator;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &McccConfig {
        &self.config
    }

    /// Solve for one delay per trace from windows at the reference picks.
    ///
    /// Sets each trace's `output_time` to its solved pick and its
    /// `correlation_coefficient` to the mean pairwise coefficient.
    pub fn run(&self, mut traces: TraceSet) -> AlignResult<McccOutcome> {
        let config = &self.config;
        config.validate()?;

        let n = traces.len();
        if n < config.min_traces {
            return Err(AlignError::InsufficientTraces {
                got: n,
                required: config.min_traces,
            });
        }
        let sample_interval = traces
            .sample_interval()
            .ok_or(AlignError::InsufficientTraces {
                got: 0,
                required: config.min_traces,
            })?;
        let layout = config.window.layout(sample_interval)?;

        tracing::info!(
            "MCCC: correlating {} traces ({} pairs) using {} correlator, {} weighting, {} coefficient mean",
            n,
            n * (n - 1) / 2,
            self.correlator.name(),
            config.weighting,
            config.coefficient_averaging
        );

        let (pairs, degraded) = {
            let sources = prepare_samples(&traces, &config.filter)?;
            let matrix = window_traces(&traces, &sources, TimePick::Reference, &layout)?;
            (self.correlate_pairs(&matrix)?, matrix.degraded)
        };

        let first_pass = solve_unweighted(n, &pairs);
        let relative = match config.weighting {
            McccWeighting::None => first_pass,
            McccWeighting::CorrelationWeighted => {
                let weights: Vec<f64> = pairs.iter().map(|p| p.coefficient).collect();
                solve_weighted(n, &pairs, &weights, config.constraint_weight)?
            }
            McccWeighting::ResidualWeighted => {
                // floor at one sample so exact pairs do not dominate
                let floor = sample_interval * sample_interval;
                let weights: Vec<f64> = residuals(&pairs, &first_pass)
                    .iter()
                    .map(|r| 1.0 / (r * r + floor))
                    .collect();
                solve_weighted(n, &pairs, &weights, config.constraint_weight)?
            }
        };

        let pair_residuals = residuals(&pairs, &relative);
        let errors = self.trace_errors(n, &pairs, &pair_residuals);

        let mean_reference_time = traces.mean_reference_time();
        let picks: Vec<f64> = relative.iter().map(|t| mean_reference_time + t).collect();

        let lag_times: Vec<f64> = pairs.iter().map(|p| p.lag_time).collect();
        let report = SolverReport {
            overall_rms: rms(&pair_residuals),
            prior_rms: rms(&lag_times),
            constraint_sum: relative.iter().sum(),
            weighting: config.weighting,
            pair_count: pairs.len(),
            degraded,
        };

        for ((trace, &pick), &coefficient) in traces
            .iter_mut()
            .zip(&picks)
            .zip(&errors.coefficient_mean)
        {
            // SNR and coherence measured at the previous picks no longer apply
            trace.clear_quality();
            trace.output_time = pick;
            trace.correlation_coefficient = coefficient;
        }

        tracing::info!(
            "MCCC finished: residual RMS {:.4}s (input picks {:.4}s), sum of delays {:.2e}",
            report.overall_rms,
            report.prior_rms,
            report.constraint_sum
        );

        Ok(McccOutcome {
            traces,
            delays: PerTraceDelays {
                relative,
                picks,
                mean_reference_time,
            },
            errors,
            report,
        })
    }

    /// Correlate every pair `i < j` of windows.
    ///
    /// Delays are taken between the windows' grid-snapped anchors, which may
    /// differ from the reference picks by up to half a sample.
    fn correlate_pairs(&self, matrix: &WindowMatrix) -> AlignResult<Vec<PairDelay>> {
        let n = matrix.n_traces();
        let dt = matrix.layout.sample_interval;
        let anchors = &matrix.anchors;
        let index_pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();

        let correlator = self.correlator.as_ref();
        let max_shift = self.config.max_shift;
        let use_peak_fit = self.config.use_peak_fit;

        index_pairs
            .par_iter()
            .map(|&(i, j)| -> AlignResult<PairDelay> {
                let c = correlator.correlate(matrix.row(i), matrix.row(j), max_shift)?;
                let lag = if use_peak_fit {
                    c.subsample_lag
                } else {
                    c.lag as f64
                };
                let lag_time = lag * dt;
                tracing::trace!(
                    "Pair ({}, {}): lag {:.2} samples, coefficient {:.3}",
                    i,
                    j,
                    lag,
                    c.coefficient
                );
                Ok(PairDelay {
                    i,
                    j,
                    delay: anchors[i] - anchors[j] - lag_time,
                    coefficient: c.coefficient,
                    lag_time,
                })
            })
            .collect()
    }

    fn trace_errors(
        &self,
        n: usize,
        pairs: &[PairDelay],
        pair_residuals: &[f64],
    ) -> PerTraceErrors {
        let mut squared = vec![0.0; n];
        let mut coefficients: Vec<Vec<f64>> = vec![Vec::new(); n];
        for (p, r) in pairs.iter().zip(pair_residuals) {
            squared[p.i] += r * r;
            squared[p.j] += r * r;
            coefficients[p.i].push(p.coefficient);
            coefficients[p.j].push(p.coefficient);
        }

        let averaging = self.config.coefficient_averaging;
        PerTraceErrors {
            residual_rms: squared.iter().map(|s| (s / (n - 1) as f64).sqrt()).collect(),
            standard_error: squared.iter().map(|s| (s / (n - 2) as f64).sqrt()).collect(),
            coefficient_mean: coefficients
                .iter()
                .map(|c| mean_coefficient(c, averaging))
                .collect(),
            coefficient_std: coefficients.iter().map(|c| std_dev(c)).collect(),
        }
    }
}

/// Run MCCC with the correlator named in `config`.
pub fn run_mccc(traces: TraceSet, config: &McccConfig) -> AlignResult<McccOutcome> {
    McccEngine::new(config.clone()).run(traces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::DirectCorrelator;
    use crate::models::Trace;
    use approx::assert_relative_eq;

    const DT: f64 = 0.05;

    /// Ricker wavelet (1 Hz) arriving at `arrival`, picked at `pick`.
    fn ricker_trace(name: &str, arrival: f64, pick: f64) -> Trace {
        let f = 1.0;
        let samples = (0..1200)
            .map(|i| {
                let x = std::f64::consts::PI * f * (i as f64 * DT - arrival);
                (1.0 - 2.0 * x * x) * (-x * x).exp()
            })
            .collect();
        Trace::new(name, samples, DT, 0.0, pick)
    }

    /// Arrivals at `30 + delays[i]`, all picked at the nearest whole second.
    fn delayed_set(delays: &[f64]) -> TraceSet {
        delays
            .iter()
            .enumerate()
            .map(|(i, &d)| ricker_trace(&format!("ST{:02}", i), 30.0 + d, (30.0 + d).round()))
            .collect()
    }

    const DELAYS: [f64; 6] = [-1.2, -0.45, 0.0, 0.35, 0.8, 1.4];

    fn assert_recovers(outcome: &McccOutcome, delays: &[f64], tolerance: f64) {
        let t = &outcome.delays.relative;
        for i in 0..delays.len() {
            for j in 0..delays.len() {
                let error = (t[i] - t[j]) - (delays[i] - delays[j]);
                assert!(error.abs() <= tolerance, "pair ({}, {}) off by {}", i, j, error);
            }
        }
    }

    #[test]
    fn recovers_exact_delays() {
        let outcome = run_mccc(delayed_set(&DELAYS), &McccConfig::default()).unwrap();

        assert_recovers(&outcome, &DELAYS, 1e-9);
        assert_relative_eq!(outcome.report.constraint_sum, 0.0, epsilon = 1e-9);
        assert!(outcome.report.overall_rms < 1e-9);
        assert!(outcome.report.prior_rms > 0.1);
        assert_eq!(outcome.report.pair_count, 15);
        for i in 0..DELAYS.len() {
            assert!(outcome.errors.residual_rms[i] < 1e-9);
            assert!(outcome.errors.standard_error[i] < 1e-9);
            assert_relative_eq!(outcome.errors.coefficient_mean[i], 1.0, epsilon = 1e-9);
            assert!(outcome.errors.coefficient_std[i] < 1e-9);
        }
    }

    #[test]
    fn picks_keep_mean_reference_time() {
        let traces = delayed_set(&DELAYS);
        let mean_ref = traces.mean_reference_time();
        let outcome = run_mccc(traces, &McccConfig::default()).unwrap();

        assert_relative_eq!(outcome.delays.mean_reference_time, mean_ref);
        let mean_pick = outcome.delays.picks.iter().sum::<f64>() / DELAYS.len() as f64;
        assert_relative_eq!(mean_pick, mean_ref, epsilon = 1e-9);
        for (trace, pick) in outcome.traces.iter().zip(&outcome.delays.picks) {
            assert_eq!(trace.output_time, *pick);
        }
    }

    #[test]
    fn weighted_schemes_recover_exact_delays() {
        for weighting in [McccWeighting::CorrelationWeighted, McccWeighting::ResidualWeighted] {
            let config = McccConfig {
                weighting,
                ..Default::default()
            };
            let outcome = run_mccc(delayed_set(&DELAYS), &config).unwrap();
            assert_eq!(outcome.report.weighting, weighting);
            assert_recovers(&outcome, &DELAYS, 1e-9);
            assert!(outcome.report.constraint_sum.abs() < 1e-9);
        }
    }

    #[test]
    fn peak_fit_refines_subsample_delays() {
        let delays = [-0.62, -0.31, 0.0, 0.27, 0.51];
        let integer = run_mccc(delayed_set(&delays), &McccConfig::default()).unwrap();
        let fitted = McccEngine::new(McccConfig {
            use_peak_fit: true,
            ..Default::default()
        })
        .with_correlator(Box::new(DirectCorrelator))
        .run(delayed_set(&delays))
        .unwrap();

        let worst = |o: &McccOutcome| {
            let t = &o.delays.relative;
            (0..delays.len())
                .map(|i| ((t[i] - t[0]) - (delays[i] - delays[0])).abs())
                .fold(0.0, f64::max)
        };
        assert!(worst(&fitted) < worst(&integer));
        assert!(worst(&fitted) < 0.25 * DT);
    }

    #[test]
    fn off_grid_picks_do_not_bias_delays() {
        // Arrivals on the sample grid, picks up to 0.4 samples away from it
        let offsets = [0.02, -0.015, 0.01, -0.02, 0.018, -0.005];
        let traces: TraceSet = DELAYS
            .iter()
            .zip(offsets)
            .enumerate()
            .map(|(i, (&d, o))| {
                ricker_trace(&format!("ST{:02}", i), 30.0 + d, (30.0 + d).round() + o)
            })
            .collect();

        for use_peak_fit in [false, true] {
            let config = McccConfig {
                use_peak_fit,
                ..Default::default()
            };
            let outcome = run_mccc(traces.clone(), &config).unwrap();
            assert_recovers(&outcome, &DELAYS, 1e-9);
            assert!(outcome.report.overall_rms < 1e-9);
        }
    }

    #[test]
    fn fewer_than_five_traces_rejected() {
        let traces = delayed_set(&[0.0, 0.1, 0.2, 0.3]);
        assert!(matches!(
            run_mccc(traces, &McccConfig::default()),
            Err(AlignError::InsufficientTraces { got: 4, required: 5 })
        ));
    }

    #[test]
    fn outcome_serializes() {
        let outcome = run_mccc(delayed_set(&DELAYS), &McccConfig::default()).unwrap();
        let json = serde_json::to_string(&outcome.report).unwrap();
        assert!(json.contains("\"weighting\":\"none\""));
        let errors = serde_json::to_value(&outcome.errors).unwrap();
        assert_eq!(errors["residual_rms"].as_array().map(Vec::len), Some(6));
    }
}
