use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use seisalign_core::{Trace, TraceSet};

/// 20 Hz sampling.
pub const DT: f64 = 0.05;
/// Initial pick shared by every synthetic trace.
pub const PICK: f64 = 30.0;
/// 60 s records starting at time 0.
pub const N_SAMPLES: usize = 1200;

/// Gaussian pulse of width `sigma` seconds centered on `arrival`.
pub fn gaussian_pulse(arrival: f64, sigma: f64) -> Vec<f64> {
    (0..N_SAMPLES)
        .map(|i| {
            let x = (i as f64 * DT - arrival) / sigma;
            (-0.5 * x * x).exp()
        })
        .collect()
}

/// One trace per shift: a common pulse arriving `shift` seconds after
/// `PICK`, plus independent Gaussian noise. All traces are picked at `PICK`.
pub fn noisy_set(shifts: &[f64], noise_std: f64, seed: u64) -> TraceSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, noise_std).expect("valid noise distribution");

    shifts
        .iter()
        .enumerate()
        .map(|(i, &shift)| {
            let samples = gaussian_pulse(PICK + shift, 0.5)
                .into_iter()
                .map(|x| x + noise.sample(&mut rng))
                .collect();
            Trace::new(format!("SYN{:02}", i), samples, DT, 0.0, PICK)
        })
        .collect()
}

/// Subtract the mean.
pub fn demeaned(values: &[f64]) -> Vec<f64> {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| v - mean).collect()
}

/// Largest deviation between recovered and true arrivals, ignoring the
/// common offset.
pub fn worst_relative_error(picks: &[f64], shifts: &[f64]) -> f64 {
    let errors: Vec<f64> = picks
        .iter()
        .zip(shifts)
        .map(|(p, s)| p - (PICK + s))
        .collect();
    demeaned(&errors)
        .into_iter()
        .fold(0.0, |worst, e| worst.max(e.abs()))
}
