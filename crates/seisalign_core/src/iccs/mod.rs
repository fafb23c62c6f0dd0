//! Iterative Cross-Correlation and Stack (ICCS).
//!
//! Each iteration windows every trace at its current pick, stacks the
//! peak-normalized windows, and correlates every window against the stack
//! to move its pick. The loop stops once two successive stacks agree within
//! the convergence threshold, or when the iteration budget runs out.

mod engine;
mod stack;
mod types;

pub use engine::{run_iccs, IccsEngine, MIN_TRACES};
pub use stack::{build_stack, convergence_score};
pub use types::{ConvergenceReport, IccsConfig, IccsOutcome, IccsState};
