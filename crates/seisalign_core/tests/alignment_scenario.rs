mod common;

use common::synthetic_traces::{noisy_set, worst_relative_error, DT, PICK};
use seisalign_core::models::McccWeighting;
use seisalign_core::{
    run_iccs, run_mccc, FilterConfig, IccsConfig, IccsState, McccConfig, Stack,
};

// The outer shifts sit at the ends of the 40-sample lag range
const SHIFTS: [f64; 8] = [-2.0, -1.45, -0.8, -0.2, 0.35, 0.9, 1.5, 2.0];

fn scenario_config() -> IccsConfig {
    IccsConfig {
        max_shift: 40,
        convergence_threshold: 1e-4,
        ..Default::default()
    }
}

#[test]
fn iccs_then_mccc_recovers_shifts() {
    let traces = noisy_set(&SHIFTS, 0.01, 7);

    let iccs = run_iccs(traces, &scenario_config()).unwrap();
    assert_eq!(
        iccs.report.state,
        IccsState::Converged,
        "scores: {:?}",
        iccs.report.scores
    );
    assert!(iccs.report.iterations <= 10);
    assert!(iccs.report.degraded.is_empty());

    let iccs_picks = iccs.traces.output_times();
    let iccs_error = worst_relative_error(&iccs_picks, &SHIFTS);
    assert!(iccs_error <= DT + 1e-9, "ICCS pick error {:.4}s", iccs_error);

    let mut aligned = iccs.traces;
    aligned.promote_output_times();

    let mccc_config = McccConfig {
        use_peak_fit: true,
        ..Default::default()
    };
    let mccc = run_mccc(aligned, &mccc_config).unwrap();

    assert_eq!(mccc.report.pair_count, 28);
    assert!(mccc.report.constraint_sum.abs() < 1e-9);
    assert!(
        mccc.report.overall_rms <= mccc.report.prior_rms + 1e-12,
        "MCCC rms {} vs input {}",
        mccc.report.overall_rms,
        mccc.report.prior_rms
    );
    let mccc_error = worst_relative_error(&mccc.delays.picks, &SHIFTS);
    assert!(mccc_error <= DT, "MCCC pick error {:.4}s", mccc_error);
    for coefficient in &mccc.errors.coefficient_mean {
        assert!(*coefficient > 0.9);
    }
}

#[test]
fn mccc_reduces_residual_of_rough_picks() {
    // Picks off by up to half a second from the true arrivals
    let mut traces = noisy_set(&SHIFTS, 0.01, 11);
    let offsets = [0.3, -0.2, 0.45, 0.0, -0.35, 0.1, -0.5, 0.25];
    for ((trace, shift), offset) in traces.iter_mut().zip(SHIFTS).zip(offsets) {
        trace.reference_time = PICK + shift + offset;
    }

    let config = McccConfig {
        weighting: McccWeighting::CorrelationWeighted,
        ..Default::default()
    };
    let outcome = run_mccc(traces, &config).unwrap();

    assert!(outcome.report.prior_rms > 0.2);
    assert!(outcome.report.overall_rms < 0.5 * DT);
    assert!(worst_relative_error(&outcome.delays.picks, &SHIFTS) <= DT);
    for se in &outcome.errors.standard_error {
        assert!(se.is_finite());
    }
}

#[test]
fn filtered_iccs_keeps_relative_shifts() {
    let traces = noisy_set(&SHIFTS, 0.01, 3);
    let config = IccsConfig {
        filter: FilterConfig::band_pass(0.05, 2.0),
        ..scenario_config()
    };

    let outcome = run_iccs(traces, &config).unwrap();
    assert!(outcome.report.is_converged());
    let error = worst_relative_error(&outcome.traces.output_times(), &SHIFTS);
    assert!(error <= DT + 1e-9, "filtered pick error {:.4}s", error);
}

#[test]
fn outcome_state_survives_serialization() {
    let outcome = run_iccs(noisy_set(&SHIFTS, 0.01, 5), &scenario_config()).unwrap();

    let report = serde_json::to_string(&outcome.report).unwrap();
    assert!(report.contains("\"state\":\"converged\""));

    let stack: Stack = serde_json::from_str(&serde_json::to_string(&outcome.stack).unwrap())
        .unwrap();
    assert_eq!(stack.samples, outcome.stack.samples);
    assert!((stack.reference_time - PICK).abs() < 1e-12);
}
