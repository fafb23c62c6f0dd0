//! Multi-Channel Cross-Correlation (MCCC).
//!
//! Every pair of windows is correlated once, and the pairwise delays are
//! solved jointly for one delay per trace in the least-squares sense. The
//! result is globally consistent: unlike trace-versus-stack picks, no
//! single reference waveform biases it.

mod engine;
mod solver;
mod types;

pub use engine::{run_mccc, McccEngine};
pub use solver::{normal_matrix, residuals, solve_unweighted, solve_weighted, PairDelay};
pub use types::{McccConfig, McccOutcome, PerTraceDelays, PerTraceErrors, SolverReport};
