//! Trace pre-filtering before windowing.
//!
//! Provides band-pass, low-pass and high-pass filters using IIR Butterworth
//! sections via the biquad crate. A zero-phase option runs the cascade
//! forward and then backward so filtered arrivals are not delayed.

use std::f64::consts::PI;

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};
use serde::{Deserialize, Serialize};

use crate::errors::{AlignError, AlignResult};

/// Filter applied to whole traces before windowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Traces are windowed as recorded.
    #[default]
    None,
    /// Keep content below `high_cutoff_hz`.
    LowPass,
    /// Keep `low_cutoff_hz..high_cutoff_hz`, the usual choice for teleseismic phases.
    BandPass,
    /// Keep content above `low_cutoff_hz`; suppresses long-period drift.
    HighPass,
}

/// Butterworth pre-filter shared by both engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub filter_type: FilterType,
    /// Corner in Hz; ignored by low-pass.
    pub low_cutoff_hz: f64,
    /// Corner in Hz; ignored by high-pass. Must stay below Nyquist.
    pub high_cutoff_hz: f64,
    /// Butterworth order, realized as cascaded second-order sections. Odd
    /// orders are rounded up to the next even order.
    pub order: usize,
    /// Run the cascade forward and backward (zero phase shift).
    pub zero_phase: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            filter_type: FilterType::None,
            low_cutoff_hz: 0.05,
            high_cutoff_hz: 2.0,
            order: 2,
            zero_phase: true,
        }
    }
}

impl FilterConfig {
    /// Band-pass between `low_hz` and `high_hz`.
    pub fn band_pass(low_hz: f64, high_hz: f64) -> Self {
        Self {
            filter_type: FilterType::BandPass,
            low_cutoff_hz: low_hz,
            high_cutoff_hz: high_hz,
            ..Default::default()
        }
    }

    /// Low-pass below `cutoff_hz`.
    pub fn low_pass(cutoff_hz: f64) -> Self {
        Self {
            filter_type: FilterType::LowPass,
            high_cutoff_hz: cutoff_hz,
            ..Default::default()
        }
    }

    /// High-pass above `cutoff_hz`.
    pub fn high_pass(cutoff_hz: f64) -> Self {
        Self {
            filter_type: FilterType::HighPass,
            low_cutoff_hz: cutoff_hz,
            ..Default::default()
        }
    }

    /// Whether any filtering will happen.
    pub fn is_enabled(&self) -> bool {
        self.filter_type != FilterType::None
    }

    /// Check cutoffs for ordering and positivity.
    ///
    /// Nyquist limits depend on the trace and are checked in [`apply_filter`].
    pub fn validate(&self) -> AlignResult<()> {
        let positive = |hz: f64| hz > 0.0 && hz.is_finite();
        let ok = match self.filter_type {
            FilterType::None => true,
            FilterType::LowPass => positive(self.high_cutoff_hz),
            FilterType::HighPass => positive(self.low_cutoff_hz),
            FilterType::BandPass => {
                positive(self.low_cutoff_hz)
                    && positive(self.high_cutoff_hz)
                    && self.low_cutoff_hz < self.high_cutoff_hz
            }
        };
        if !ok {
            return Err(AlignError::invalid_config(format!(
                "invalid {:?} cutoffs: low {} Hz, high {} Hz",
                self.filter_type, self.low_cutoff_hz, self.high_cutoff_hz
            )));
        }
        Ok(())
    }
}

/// Apply the configured filter to trace samples.
pub fn apply_filter(
    samples: &[f64],
    sample_interval: f64,
    config: &FilterConfig,
) -> AlignResult<Vec<f64>> {
    if !config.is_enabled() || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    config.validate()?;
    if !(sample_interval > 0.0 && sample_interval.is_finite()) {
        return Err(AlignError::invalid_config(format!(
            "sample interval {} must be positive",
            sample_interval
        )));
    }

    let sample_rate = 1.0 / sample_interval;
    let order = config.order;

    let mut stages = Vec::with_capacity(2);
    match config.filter_type {
        FilterType::None => {}
        FilterType::LowPass => {
            stages.push(butterworth(Pass::Low, sample_rate, config.high_cutoff_hz, order)?)
        }
        FilterType::HighPass => {
            stages.push(butterworth(Pass::High, sample_rate, config.low_cutoff_hz, order)?)
        }
        FilterType::BandPass => {
            // High-pass followed by low-pass
            stages.push(butterworth(Pass::High, sample_rate, config.low_cutoff_hz, order)?);
            stages.push(butterworth(Pass::Low, sample_rate, config.high_cutoff_hz, order)?);
        }
    }

    let mut result = samples.to_vec();
    for sections in &stages {
        run_cascade(&mut result, sections);
    }
    if config.zero_phase {
        result.reverse();
        for sections in &stages {
            run_cascade(&mut result, sections);
        }
        result.reverse();
    }

    Ok(result)
}

#[derive(Clone, Copy)]
enum Pass {
    Low,
    High,
}

/// Quality factor of each second-order section of a Butterworth filter.
///
/// The poles of an order-`n` Butterworth filter sit at angles
/// `(2k + 1)π / 2n` from the imaginary axis; each conjugate pair gives one
/// section with `Q = 1 / (2 sin θ)`. Odd orders are rounded up.
fn section_qs(order: usize) -> Vec<f64> {
    let sections = ((order + 1) / 2).max(1);
    let n = (2 * sections) as f64;
    (0..sections)
        .map(|k| 1.0 / (2.0 * ((2 * k + 1) as f64 * PI / (2.0 * n)).sin()))
        .collect()
}

/// Sections of one Butterworth low- or high-pass at `cutoff_hz`.
fn butterworth(
    pass: Pass,
    sample_rate: f64,
    cutoff_hz: f64,
    order: usize,
) -> AlignResult<Vec<Coefficients<f64>>> {
    if cutoff_hz >= sample_rate / 2.0 {
        return Err(AlignError::invalid_config(format!(
            "cutoff {} Hz is at or above Nyquist ({} Hz)",
            cutoff_hz,
            sample_rate / 2.0
        )));
    }
    let filter_type = match pass {
        Pass::Low => Type::LowPass,
        Pass::High => Type::HighPass,
    };
    section_qs(order)
        .into_iter()
        .map(|q| {
            Coefficients::<f64>::from_params(filter_type, sample_rate.hz(), cutoff_hz.hz(), q)
                .map_err(|e| AlignError::invalid_config(format!("filter design failed: {:?}", e)))
        })
        .collect()
}

/// Run each section once over `samples` in place, starting from rest.
fn run_cascade(samples: &mut [f64], sections: &[Coefficients<f64>]) {
    for coeffs in sections {
        let mut filter = DirectForm2Transposed::<f64>::new(*coeffs);
        for sample in samples.iter_mut() {
            *sample = filter.run(*sample);
        }
    }
}
