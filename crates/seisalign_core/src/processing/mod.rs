//! Signal preparation shared by both alignment engines.
//!
//! # Architecture
//!
//! Preparation is a chain of pure functions that the engines compose:
//!
//! 1. **Filtering** (`filtering`): optional Butterworth pre-filter applied to
//!    whole traces before any window is cut.
//!
//! 2. **Windowing** (`window`): cut an equal-length window around each
//!    trace's pick, zero-filling where the record is too short.
//!
//! 3. **Tapering** (`taper`): remove the window mean and apply a
//!    raised-cosine taper over the margins.
//!
//! 4. **Quality metrics** (`quality`): SNR, coherence and coefficient
//!    averaging used to score traces.

pub mod filtering;
pub mod quality;
pub mod taper;
pub mod window;

pub use filtering::{apply_filter, FilterConfig, FilterType};
pub use quality::{
    coherence, l2_norm, mean_coefficient, snr, snr_at, std_dev, unit_vector, zero_lag_coefficient,
};
pub use taper::{apply_taper, remove_mean, taper_weights};
pub use window::{
    prepare_samples, shift_samples, window_at, window_traces, Window, WindowConfig, WindowLayout,
    WindowMatrix,
};
