//! Traces, trace sets and stacks.

use serde::{Deserialize, Serialize};

/// Which time pick a window is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePick {
    /// The pick currently used to window the trace.
    #[default]
    Reference,
    /// The pick produced by an alignment run.
    Output,
}

/// A single-station recording of the event together with its processing state.
///
/// Times are in seconds relative to an epoch shared by every trace in the set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    /// Station / channel label, used in logs and errors.
    pub name: String,
    /// Samples at a fixed interval.
    pub samples: Vec<f64>,
    /// Sample interval in seconds.
    pub sample_interval: f64,
    /// Time of the first sample.
    pub begin_time: f64,
    /// Pick the extraction window is anchored to.
    pub reference_time: f64,
    /// Pick produced by the last alignment run.
    pub output_time: f64,
    /// Stacking weight (negative when the trace is polarity-reversed).
    pub weight: f64,
    /// Whether the trace contributes to the stack.
    pub selected: bool,
    /// Peak correlation coefficient from the last run (NaN until computed).
    pub correlation_coefficient: f64,
    /// Signal-to-noise ratio around the pick (NaN until computed).
    pub snr: f64,
    /// Coherence with the stack (NaN until computed).
    pub coherence: f64,
}

impl Trace {
    /// Create a trace with an initial pick.
    ///
    /// `output_time` starts equal to `reference_time`, the weight at 1.0 and
    /// all quality fields undefined.
    pub fn new(
        name: impl Into<String>,
        samples: Vec<f64>,
        sample_interval: f64,
        begin_time: f64,
        reference_time: f64,
    ) -> Self {
        Self {
            name: name.into(),
            samples,
            sample_interval,
            begin_time,
            reference_time,
            output_time: reference_time,
            weight: 1.0,
            selected: true,
            correlation_coefficient: f64::NAN,
            snr: f64::NAN,
            coherence: f64::NAN,
        }
    }

    /// Get the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the trace has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time of the last sample.
    pub fn end_time(&self) -> f64 {
        self.begin_time + self.samples.len().saturating_sub(1) as f64 * self.sample_interval
    }

    /// Get the requested time pick.
    pub fn pick(&self, pick: TimePick) -> f64 {
        match pick {
            TimePick::Reference => self.reference_time,
            TimePick::Output => self.output_time,
        }
    }

    /// Reset all quality fields to undefined.
    pub fn clear_quality(&mut self) {
        self.correlation_coefficient = f64::NAN;
        self.snr = f64::NAN;
        self.coherence = f64::NAN;
    }
}

/// All traces recorded for one event.
///
/// The order of traces carries no meaning, but indices into result vectors
/// always follow the order of the set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceSet {
    traces: Vec<Trace>,
}

impl TraceSet {
    /// Create a trace set.
    pub fn new(traces: Vec<Trace>) -> Self {
        Self { traces }
    }

    /// Get the number of traces.
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    /// Check if the set has no traces.
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Iterate over the traces.
    pub fn iter(&self) -> std::slice::Iter<'_, Trace> {
        self.traces.iter()
    }

    /// Iterate mutably over the traces.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Trace> {
        self.traces.iter_mut()
    }

    /// Get a trace by index.
    pub fn get(&self, index: usize) -> Option<&Trace> {
        self.traces.get(index)
    }

    /// Borrow the traces as a slice.
    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    /// Borrow the traces mutably.
    pub fn traces_mut(&mut self) -> &mut [Trace] {
        &mut self.traces
    }

    /// Consume the set and return its traces.
    pub fn into_inner(self) -> Vec<Trace> {
        self.traces
    }

    /// Common sample interval, taken from the first trace.
    ///
    /// Uniformity across the set is the caller's responsibility.
    pub fn sample_interval(&self) -> Option<f64> {
        self.traces.first().map(|t| t.sample_interval)
    }

    /// Number of traces currently selected for stacking.
    pub fn selected_count(&self) -> usize {
        self.traces.iter().filter(|t| t.selected).count()
    }

    /// Unweighted mean of the reference picks (0.0 for an empty set).
    pub fn mean_reference_time(&self) -> f64 {
        mean(self.traces.iter().map(|t| t.reference_time))
    }

    /// Unweighted mean of the output picks (0.0 for an empty set).
    pub fn mean_output_time(&self) -> f64 {
        mean(self.traces.iter().map(|t| t.output_time))
    }

    /// Copy every trace's `output_time` into its `reference_time`.
    ///
    /// This is the hand-off between an ICCS run and a following MCCC run.
    pub fn promote_output_times(&mut self) {
        for trace in &mut self.traces {
            trace.reference_time = trace.output_time;
        }
    }

    /// Output picks of every trace, in set order.
    pub fn output_times(&self) -> Vec<f64> {
        self.traces.iter().map(|t| t.output_time).collect()
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

impl FromIterator<Trace> for TraceSet {
    fn from_iter<I: IntoIterator<Item = Trace>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for TraceSet {
    type Item = Trace;
    type IntoIter = std::vec::IntoIter<Trace>;

    fn into_iter(self) -> Self::IntoIter {
        self.traces.into_iter()
    }
}

impl<'a> IntoIterator for &'a TraceSet {
    type Item = &'a Trace;
    type IntoIter = std::slice::Iter<'a, Trace>;

    fn into_iter(self) -> Self::IntoIter {
        self.traces.iter()
    }
}

/// Composite waveform produced by an ICCS run.
///
/// The stack is built in the aligned frame, so `begin_time` is expressed
/// relative to the stack's own `output_time`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stack {
    /// Tapered, weighted average of the normalized trace windows.
    pub samples: Vec<f64>,
    /// Sample interval in seconds.
    pub sample_interval: f64,
    /// Absolute time of the first stack sample.
    pub begin_time: f64,
    /// Mean of the initial trace picks.
    pub reference_time: f64,
    /// Mean of the final trace picks.
    pub output_time: f64,
}

impl Stack {
    /// Get the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
