//! Fixed-length windows around per-trace picks.
//!
//! Every trace in a set is cut to the same number of samples so the windows
//! form a rectangular matrix, regardless of where each record starts or ends.
//! Missing data is zero-filled and reported rather than failing the run,
//! unless the zero-filled share exceeds `max_zero_fill`.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::errors::{AlignError, AlignResult};
use crate::models::{TaperType, TimePick, TraceSet};

use super::filtering::{apply_filter, FilterConfig};
use super::taper::{apply_taper, remove_mean};

/// Time window relative to a pick, plus taper settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window start relative to the pick (seconds, usually negative).
    pub t0: f64,
    /// Window end relative to the pick (seconds).
    pub t1: f64,
    /// Total taper margin as a fraction of `t1 - t0`, split evenly between
    /// both ends and added outside `[t0, t1]`.
    pub taper_fraction: f64,
    /// Taper variant.
    pub taper: TaperType,
    /// Largest share of a window that may be zero-filled (0.0 - 1.0).
    pub max_zero_fill: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            t0: -5.0,
            t1: 5.0,
            taper_fraction: 0.1,
            taper: TaperType::Hann,
            max_zero_fill: 0.5,
        }
    }
}

impl WindowConfig {
    /// Check window bounds and fractions.
    pub fn validate(&self) -> AlignResult<()> {
        if !(self.t0.is_finite() && self.t1.is_finite()) || self.t1 <= self.t0 {
            return Err(AlignError::invalid_config(format!(
                "time window [{}, {}] must be finite and increasing",
                self.t0, self.t1
            )));
        }
        if !(0.0..1.0).contains(&self.taper_fraction) {
            return Err(AlignError::invalid_config(format!(
                "taper fraction {} must be in [0, 1)",
                self.taper_fraction
            )));
        }
        if !(0.0..=1.0).contains(&self.max_zero_fill) {
            return Err(AlignError::invalid_config(format!(
                "max zero-fill {} must be in [0, 1]",
                self.max_zero_fill
            )));
        }
        Ok(())
    }

    /// Total taper margin in seconds.
    pub fn margin(&self) -> f64 {
        self.taper_fraction * (self.t1 - self.t0)
    }

    /// Resolve the window into sample counts for a given sample interval.
    pub fn layout(&self, sample_interval: f64) -> AlignResult<WindowLayout> {
        WindowLayout::new(self, sample_interval)
    }
}

/// A window configuration resolved to sample counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowLayout {
    /// Sample interval in seconds.
    pub sample_interval: f64,
    /// Samples per window, identical for every trace.
    pub n_samples: usize,
    /// Taper length at each end, in samples.
    pub taper_len: usize,
    /// Time of the first window sample relative to the pick.
    pub start_offset: f64,
    /// Index of the pick inside the window (may fall outside it).
    pub zero_index: isize,
    /// Taper variant.
    pub taper: TaperType,
    /// Largest zero-filled share before a window is rejected.
    pub max_zero_fill: f64,
}

impl WindowLayout {
    /// Resolve `config` for `sample_interval`.
    pub fn new(config: &WindowConfig, sample_interval: f64) -> AlignResult<Self> {
        config.validate()?;
        if !(sample_interval > 0.0 && sample_interval.is_finite()) {
            return Err(AlignError::invalid_config(format!(
                "sample interval {} must be positive",
                sample_interval
            )));
        }

        let margin = config.margin();
        let start_offset = config.t0 - margin / 2.0;
        let n_samples = ((config.t1 - config.t0 + margin) / sample_interval).round() as usize;
        if n_samples < 2 {
            return Err(AlignError::invalid_config(format!(
                "window [{}, {}] holds fewer than 2 samples at {}s",
                config.t0, config.t1, sample_interval
            )));
        }
        let taper_len = ((margin / 2.0 / sample_interval).round() as usize).min(n_samples / 2);
        let zero_index = (-start_offset / sample_interval).round() as isize;

        Ok(Self {
            sample_interval,
            n_samples,
            taper_len,
            start_offset,
            zero_index,
            taper: config.taper,
            max_zero_fill: config.max_zero_fill,
        })
    }

    /// Window span `(start, end)` relative to the pick, in seconds.
    pub fn time_window(&self) -> (f64, f64) {
        (
            self.start_offset,
            self.start_offset + (self.n_samples - 1) as f64 * self.sample_interval,
        )
    }

    /// Cut, demean and taper one window anchored at `anchor`.
    ///
    /// The window starts on the sample nearest `anchor + start_offset`, so the
    /// anchor it actually represents is snapped to the record's sample grid
    /// and returned in [`Window::anchor`]. The mean is taken over recorded
    /// samples only, so zero-filled samples stay exactly zero.
    pub fn extract(&self, samples: &[f64], begin_time: f64, anchor: f64) -> Window {
        let n = self.n_samples;
        let first =
            ((anchor + self.start_offset - begin_time) / self.sample_interval).round() as i64;
        let lo = first.max(0);
        let hi = (first + n as i64).min(samples.len() as i64);

        let mut out = vec![0.0; n];
        let covered = if hi > lo { (hi - lo) as usize } else { 0 };
        if covered > 0 {
            let dst = (lo - first) as usize;
            let src = lo as usize;
            out[dst..dst + covered].copy_from_slice(&samples[src..src + covered]);
            remove_mean(&mut out[dst..dst + covered]);
        }
        apply_taper(&mut out, self.taper_len, self.taper);

        Window {
            samples: out,
            zero_filled: n - covered,
            anchor: begin_time + first as f64 * self.sample_interval - self.start_offset,
        }
    }
}

/// One extracted window.
#[derive(Debug, Clone)]
pub struct Window {
    /// Demeaned, tapered samples.
    pub samples: Vec<f64>,
    /// Number of samples that fell outside the record.
    pub zero_filled: usize,
    /// Pick time the window is cut around, on the record's sample grid.
    pub anchor: f64,
}

impl Window {
    /// Share of the window that was zero-filled.
    pub fn zero_fill_fraction(&self) -> f64 {
        if self.samples.is_empty() {
            1.0
        } else {
            self.zero_filled as f64 / self.samples.len() as f64
        }
    }
}

/// Windows of a whole trace set, one row per trace in set order.
#[derive(Debug, Clone)]
pub struct WindowMatrix {
    /// Window samples, all of length `layout.n_samples`.
    pub rows: Vec<Vec<f64>>,
    /// Grid-snapped anchor of each row; lags measured between rows are
    /// relative to these times, not to the requested picks.
    pub anchors: Vec<f64>,
    /// Layout used to cut the rows.
    pub layout: WindowLayout,
    /// Indices of traces whose window was partly zero-filled.
    pub degraded: Vec<usize>,
}

impl WindowMatrix {
    /// Number of rows.
    pub fn n_traces(&self) -> usize {
        self.rows.len()
    }

    /// Number of samples per row.
    pub fn n_samples(&self) -> usize {
        self.layout.n_samples
    }

    /// Borrow one row.
    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }
}

/// Samples each trace is windowed from, filtered when a filter is configured.
pub fn prepare_samples<'a>(
    traces: &'a TraceSet,
    filter: &FilterConfig,
) -> AlignResult<Vec<Cow<'a, [f64]>>> {
    if !filter.is_enabled() {
        return Ok(traces.iter().map(|t| Cow::Borrowed(t.samples.as_slice())).collect());
    }

    traces
        .iter()
        .map(|t| apply_filter(&t.samples, t.sample_interval, filter).map(Cow::Owned))
        .collect()
}

/// Window every trace at the requested pick.
///
/// `sources[i]` holds the samples for trace `i` (see [`prepare_samples`]).
/// Windows that are partly zero-filled are flagged in
/// [`WindowMatrix::degraded`]; windows beyond `max_zero_fill` fail with
/// [`AlignError::InsufficientData`].
pub fn window_traces(
    traces: &TraceSet,
    sources: &[Cow<'_, [f64]>],
    pick: TimePick,
    layout: &WindowLayout,
) -> AlignResult<WindowMatrix> {
    let anchors: Vec<f64> = traces.iter().map(|t| t.pick(pick)).collect();
    window_at(traces, sources, &anchors, layout)
}

/// Window every trace at an explicit anchor time, `anchors[i]` for trace `i`.
pub fn window_at(
    traces: &TraceSet,
    sources: &[Cow<'_, [f64]>],
    anchors: &[f64],
    layout: &WindowLayout,
) -> AlignResult<WindowMatrix> {
    if sources.len() != traces.len() {
        return Err(AlignError::LengthMismatch {
            expected: traces.len(),
            got: sources.len(),
        });
    }
    if anchors.len() != traces.len() {
        return Err(AlignError::LengthMismatch {
            expected: traces.len(),
            got: anchors.len(),
        });
    }

    let mut rows = Vec::with_capacity(traces.len());
    let mut snapped = Vec::with_capacity(traces.len());
    let mut degraded = Vec::new();

    let items = traces.iter().zip(sources).zip(anchors);
    for (index, ((trace, source), &anchor)) in items.enumerate() {
        if !anchor.is_finite() {
            return Err(AlignError::invalid_config(format!(
                "trace '{}' has no usable pick (anchor {})",
                trace.name, anchor
            )));
        }
        let window = layout.extract(source, trace.begin_time, anchor);

        if window.zero_filled == layout.n_samples
            || window.zero_fill_fraction() > layout.max_zero_fill
        {
            return Err(AlignError::InsufficientData {
                trace: trace.name.clone(),
                zero_filled: window.zero_filled,
                window_len: layout.n_samples,
                max_zero_fill: layout.max_zero_fill,
            });
        }
        if window.zero_filled > 0 {
            tracing::warn!(
                "Trace '{}' window zero-filled: {} of {} samples outside record",
                trace.name,
                window.zero_filled,
                layout.n_samples
            );
            degraded.push(index);
        }
        snapped.push(window.anchor);
        rows.push(window.samples);
    }

    Ok(WindowMatrix {
        rows,
        anchors: snapped,
        layout: *layout,
        degraded,
    })
}

/// Shift a signal by `lag` samples, zero-filling the vacated end.
///
/// `out[n] = signal[n + lag]`, so a positive lag moves later content to
/// earlier indices.
pub fn shift_samples(signal: &[f64], lag: isize) -> Vec<f64> {
    let n = signal.len() as isize;
    (0..n)
        .map(|i| {
            let src = i + lag;
            if (0..n).contains(&src) {
                signal[src as usize]
            } else {
                0.0
            }
        })
        .collect()
}
