//! Persistent settings, one TOML table per [`ConfigSection`].
//!
//! Window and filter are shared; the engine tables hold only what differs
//! between ICCS and MCCC. Every key has a default, so partial files load.

use std::io;

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;

use crate::iccs::IccsConfig;
use crate::logging::{init_file_tracing, init_tracing, LogLevel};
use crate::mccc::McccConfig;
use crate::models::{
    CoefficientAveraging, ConvergenceMetric, CorrelatorKind, McccWeighting, StackWeighting,
};
use crate::processing::{FilterConfig, WindowConfig};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Correlation window shared by both engines.
    #[serde(default)]
    pub window: WindowConfig,

    /// Pre-filter shared by both engines.
    #[serde(default)]
    pub filter: FilterConfig,

    /// ICCS settings.
    #[serde(default)]
    pub iccs: IccsSettings,

    /// MCCC settings.
    #[serde(default)]
    pub mccc: McccSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Build the ICCS run configuration.
    pub fn iccs_config(&self) -> IccsConfig {
        IccsConfig {
            window: self.window.clone(),
            filter: self.filter.clone(),
            max_shift: self.iccs.max_shift,
            max_iterations: self.iccs.max_iterations,
            convergence_threshold: self.iccs.convergence_threshold,
            convergence_metric: self.iccs.convergence_metric,
            stack_weighting: self.iccs.stack_weighting,
            correlator: self.iccs.correlator,
            min_correlation: self.iccs.min_correlation,
        }
    }

    /// Build the MCCC run configuration.
    pub fn mccc_config(&self) -> McccConfig {
        McccConfig {
            window: self.window.clone(),
            filter: self.filter.clone(),
            max_shift: self.mccc.max_shift,
            weighting: self.mccc.weighting,
            constraint_weight: self.mccc.constraint_weight,
            coefficient_averaging: self.mccc.coefficient_averaging,
            correlator: self.mccc.correlator,
            use_peak_fit: self.mccc.use_peak_fit,
            min_traces: self.mccc.min_traces,
        }
    }
}

/// ICCS iteration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IccsSettings {
    /// Largest lag searched against the stack, in samples.
    #[serde(default = "default_max_shift")]
    pub max_shift: usize,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,

    #[serde(default)]
    pub convergence_metric: ConvergenceMetric,

    #[serde(default)]
    pub stack_weighting: StackWeighting,

    #[serde(default)]
    pub correlator: CorrelatorKind,

    /// Deselect traces below this coefficient. Unset disables deselection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_correlation: Option<f64>,
}

impl Default for IccsSettings {
    fn default() -> Self {
        let config = IccsConfig::default();
        Self {
            max_shift: config.max_shift,
            max_iterations: config.max_iterations,
            convergence_threshold: config.convergence_threshold,
            convergence_metric: config.convergence_metric,
            stack_weighting: config.stack_weighting,
            correlator: config.correlator,
            min_correlation: config.min_correlation,
        }
    }
}

/// MCCC solve settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McccSettings {
    /// Largest pairwise lag searched, in samples.
    #[serde(default = "default_max_shift")]
    pub max_shift: usize,

    #[serde(default)]
    pub weighting: McccWeighting,

    /// Weight of the zero-mean row.
    #[serde(default = "default_constraint_weight")]
    pub constraint_weight: f64,

    #[serde(default)]
    pub coefficient_averaging: CoefficientAveraging,

    #[serde(default)]
    pub correlator: CorrelatorKind,

    /// Use parabolic sub-sample lags.
    #[serde(default)]
    pub use_peak_fit: bool,

    #[serde(default = "default_min_traces")]
    pub min_traces: usize,
}

impl Default for McccSettings {
    fn default() -> Self {
        let config = McccConfig::default();
        Self {
            max_shift: config.max_shift,
            weighting: config.weighting,
            constraint_weight: config.constraint_weight,
            coefficient_averaging: config.coefficient_averaging,
            correlator: config.correlator,
            use_peak_fit: config.use_peak_fit,
            min_traces: config.min_traces,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Fallback level when `RUST_LOG` is unset.
    #[serde(default)]
    pub level: LogLevel,

    /// Also write logs to a file in `logs_folder`.
    #[serde(default)]
    pub log_to_file: bool,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_max_shift() -> usize {
    50
}

fn default_max_iterations() -> usize {
    10
}

fn default_convergence_threshold() -> f64 {
    1e-5
}

fn default_constraint_weight() -> f64 {
    1.0
}

fn default_min_traces() -> usize {
    5
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            log_to_file: false,
            logs_folder: default_logs_folder(),
        }
    }
}

impl LoggingSettings {
    /// Install the global subscriber these settings describe.
    ///
    /// Returns the file writer's guard when `log_to_file` is set; keep it
    /// alive for as long as logs should reach the file.
    pub fn install(&self) -> io::Result<Option<WorkerGuard>> {
        if self.log_to_file {
            init_file_tracing(&self.logs_folder, self.level).map(Some)
        } else {
            init_tracing(self.level);
            Ok(None)
        }
    }
}

/// Configuration sections for atomic updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Window,
    Filter,
    Iccs,
    Mccc,
    Logging,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 5] = [
        ConfigSection::Window,
        ConfigSection::Filter,
        ConfigSection::Iccs,
        ConfigSection::Mccc,
        ConfigSection::Logging,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Window => "window",
            ConfigSection::Filter => "filter",
            ConfigSection::Iccs => "iccs",
            ConfigSection::Mccc => "mccc",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the section.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Window => "Correlation window relative to each pick (seconds)",
            ConfigSection::Filter => "Pre-filter applied to whole traces",
            ConfigSection::Iccs => "Iterative cross-correlation and stack",
            ConfigSection::Mccc => "Multi-channel cross-correlation solve",
            ConfigSection::Logging => "Logging configuration",
        }
    }
}
