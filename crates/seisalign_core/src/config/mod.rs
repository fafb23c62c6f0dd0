//! Settings file for alignment runs.
//!
//! [`Settings`] holds one TOML table per concern and converts into
//! [`IccsConfig`](crate::IccsConfig) and [`McccConfig`](crate::McccConfig).
//! [`ConfigManager`] loads it with defaults filled in, replaces the file
//! through a temp file, and can rewrite a single table in place.
//!
//! # Example
//!
//! ```no_run
//! use seisalign_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/seisalign.toml");
//! config.load_or_create().unwrap();
//!
//! println!("ICCS window: {:?}", config.settings().iccs_config().window);
//!
//! config.settings_mut().mccc.use_peak_fit = true;
//! config.update_section(ConfigSection::Mccc).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{ConfigSection, IccsSettings, LoggingSettings, McccSettings, Settings};
