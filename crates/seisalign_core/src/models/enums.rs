//! Enums used to configure the alignment engines.

use serde::{Deserialize, Serialize};

/// Raised-cosine taper variant applied at both ends of a window.
///
/// Every variant follows `w(i) = f0 - f1 * cos(omega * i)` over the taper
/// length `L`, reaching 1.0 at `i = L`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaperType {
    /// Hann taper (`f0 = f1 = 0.5`, `omega = pi / L`).
    #[default]
    Hann,
    /// Hamming taper (`f0 = 0.54`, `f1 = 0.46`, `omega = pi / L`).
    Hamming,
    /// Cosine taper (`f0 = f1 = 1.0`, `omega = pi / (2L)`).
    Cosine,
}

impl TaperType {
    /// Get `(f0, f1)` for this variant.
    pub fn coefficients(&self) -> (f64, f64) {
        match self {
            TaperType::Hann => (0.5, 0.5),
            TaperType::Hamming => (0.54, 0.46),
            TaperType::Cosine => (1.0, 1.0),
        }
    }

    /// Get the angular step for a taper of `len` samples.
    pub fn omega(&self, len: usize) -> f64 {
        let len = len.max(1) as f64;
        match self {
            TaperType::Hann | TaperType::Hamming => std::f64::consts::PI / len,
            TaperType::Cosine => std::f64::consts::PI / (2.0 * len),
        }
    }
}

impl std::fmt::Display for TaperType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaperType::Hann => write!(f, "hann"),
            TaperType::Hamming => write!(f, "hamming"),
            TaperType::Cosine => write!(f, "cosine"),
        }
    }
}

/// How traces are weighted when building the ICCS stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StackWeighting {
    /// Every selected trace contributes with weight 1.0.
    Uniform,
    /// Weight is `polarity * coefficient` from the last correlation.
    #[default]
    CorrelationWeighted,
}

impl std::fmt::Display for StackWeighting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackWeighting::Uniform => write!(f, "uniform"),
            StackWeighting::CorrelationWeighted => write!(f, "correlation-weighted"),
        }
    }
}

/// Score used to decide whether consecutive ICCS stacks have converged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvergenceMetric {
    /// `1 - cc(stack_t, stack_t-1)` at zero lag.
    #[default]
    Coefficient,
    /// `|stack_t - stack_t-1|_1 / (|stack_t|_2 * N)`.
    Residual,
}

impl std::fmt::Display for ConvergenceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvergenceMetric::Coefficient => write!(f, "coefficient"),
            ConvergenceMetric::Residual => write!(f, "residual"),
        }
    }
}

/// Weighting of the MCCC least-squares system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum McccWeighting {
    /// Ordinary least squares, solved in closed form.
    #[default]
    None,
    /// Each pair row weighted by its correlation coefficient.
    CorrelationWeighted,
    /// Each pair row weighted by the inverse square of its first-pass residual.
    ResidualWeighted,
}

impl std::fmt::Display for McccWeighting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            McccWeighting::None => write!(f, "none"),
            McccWeighting::CorrelationWeighted => write!(f, "correlation-weighted"),
            McccWeighting::ResidualWeighted => write!(f, "residual-weighted"),
        }
    }
}

/// How pairwise correlation coefficients are averaged per trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoefficientAveraging {
    /// Arithmetic mean of the raw coefficients.
    #[default]
    Arithmetic,
    /// `tanh(mean(atanh(c)))`. Coefficients of exactly +/-1 are clamped
    /// just inside the open interval before the transform.
    Fisher,
}

impl std::fmt::Display for CoefficientAveraging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoefficientAveraging::Arithmetic => write!(f, "arithmetic"),
            CoefficientAveraging::Fisher => write!(f, "fisher"),
        }
    }
}

/// Cross-correlation implementation behind the `Correlator` seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelatorKind {
    /// Time-domain sum over the allowed lags.
    Direct,
    /// Frequency-domain correlation via FFT.
    #[default]
    Fft,
}

impl CorrelatorKind {
    /// Get the display name for this correlator.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Direct => "Direct",
            Self::Fft => "FFT",
        }
    }
}

impl std::fmt::Display for CorrelatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
