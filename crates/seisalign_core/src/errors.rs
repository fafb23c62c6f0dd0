//! Error types for the alignment engines.
//!
//! All errors are raised synchronously where they are detected and are never
//! retried internally. Retrying with a relaxed window or another weighting
//! scheme is up to the caller.

use thiserror::Error;

/// Errors raised by windowing, correlation and the ICCS/MCCC engines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignError {
    /// The requested window lies mostly outside a trace's recorded samples.
    #[error(
        "Insufficient data for trace '{trace}': {zero_filled} of {window_len} window samples \
         fall outside the record (limit {max_zero_fill:.2})"
    )]
    InsufficientData {
        trace: String,
        zero_filled: usize,
        window_len: usize,
        max_zero_fill: f64,
    },

    /// A signal segment has zero norm and cannot be normalized.
    #[error("Degenerate signal: {0}")]
    DegenerateSignal(String),

    /// Too few traces for the requested operation.
    #[error("Insufficient traces: got {got}, at least {required} required")]
    InsufficientTraces { got: usize, required: usize },

    /// The weighted normal equations are not positive definite.
    #[error("Singular system: {0}")]
    SingularSystem(String),

    /// Two signals that must have equal length do not.
    #[error("Length mismatch: expected {expected} samples, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// Configuration rejected before a run started.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AlignError {
    /// Create a degenerate signal error.
    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateSignal(message.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a singular system error.
    pub fn singular(message: impl Into<String>) -> Self {
        Self::SingularSystem(message.into())
    }
}

/// Type alias for alignment results.
pub type AlignResult<T> = Result<T, AlignError>;
