//! Data models for waveform alignment.
//!
//! This module contains the core data structures shared by both engines:
//! - Enums selecting tapers, weighting policies and convergence metrics
//! - `Trace` and `TraceSet`, the per-station recordings and their picks
//! - `Stack`, the composite waveform produced by ICCS

mod enums;
mod trace;

pub use enums::{
    CoefficientAveraging, ConvergenceMetric, CorrelatorKind, McccWeighting, StackWeighting,
    TaperType,
};
pub use trace::{Stack, TimePick, Trace, TraceSet};
