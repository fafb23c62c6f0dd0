//! Seisalign Core - waveform alignment engines for seismic arrival times.
//!
//! This crate contains the alignment logic with zero I/O and UI dependencies:
//! reading waveforms, storing picks and plotting all belong to the caller.
//!
//! Two engines are provided:
//! - [`iccs`]: Iterative Cross-Correlation and Stack. Aligns every trace to a
//!   running weighted stack until the stack stops changing.
//! - [`mccc`]: Multi-Channel Cross-Correlation. Solves all pairwise delays of
//!   roughly aligned traces in a least-squares sense.
//!
//! A typical caller runs ICCS first, promotes the refined picks to reference
//! picks, then runs MCCC on the result:
//!
//! ```no_run
//! use seisalign_core::{run_iccs, run_mccc, IccsConfig, McccConfig, TraceSet};
//!
//! # fn load() -> TraceSet { unimplemented!() }
//! let traces = load();
//! let iccs = run_iccs(traces, &IccsConfig::default()).unwrap();
//! let mut traces = iccs.traces;
//! traces.promote_output_times();
//! let mccc = run_mccc(traces, &McccConfig::default()).unwrap();
//! println!("overall rms: {:.4}s", mccc.report.overall_rms);
//! ```

pub mod config;
pub mod correlation;
pub mod errors;
pub mod iccs;
pub mod logging;
pub mod mccc;
pub mod models;
pub mod processing;

pub use correlation::{create_correlator, Correlation, Correlator, DirectCorrelator, FftCorrelator};
pub use errors::{AlignError, AlignResult};
pub use iccs::{run_iccs, ConvergenceReport, IccsConfig, IccsEngine, IccsOutcome, IccsState};
pub use mccc::{
    run_mccc, McccConfig, McccEngine, McccOutcome, PerTraceDelays, PerTraceErrors, SolverReport,
};
pub use models::{Stack, TimePick, Trace, TraceSet};
pub use processing::{FilterConfig, WindowConfig};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
