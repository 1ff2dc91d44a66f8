//! `LD_PRELOAD` companions for targets linked against `guardcov_targets`.
//!
//! Build with exactly one of the mode features:
//! * `redirect` (default): copy the guards into the harness' shared map when the target exits.
//! * `probe`: print the number of guards of the target and exit.
//!
//! Both modes find the table through the `get_guard_count` and `get_guard_values` symbols of the target.
#![allow(clippy::missing_safety_doc)]

#[cfg(all(feature = "probe", feature = "redirect"))]
#[cfg(not(any(doc, feature = "clippy")))]
compile_error!("the guardcov_preload `probe` and `redirect` features are mutually exclusive.");

use std::path::Path;

pub mod args;
pub mod config;
pub mod libc_start;
pub mod logger;
pub mod symbols;

#[cfg(feature = "probe")]
pub mod probe;
#[cfg(feature = "redirect")]
pub mod redirect;

pub use config::PreloadConfig;
pub use logger::FileLogger;

/// Reads the [`PreloadConfig`] from the environment and registers the [`FileLogger`] it asks for.
///
/// Without a configured log file, `fallback_log_file` is used. If that is `None` too, nothing is logged.
/// An invalid config is logged, and the defaults are used instead.
pub fn setup_logging(fallback_log_file: Option<&Path>) -> PreloadConfig {
    let (config, err) = match PreloadConfig::from_env() {
        Ok(config) => (config, None),
        Err(err) => (PreloadConfig::default(), Some(err)),
    };
    if let Some(log_file) = config.log_file_or(fallback_log_file) {
        // a second registration fails, the first logger stays in place
        let _ = FileLogger::new(log_file, config.log_level).set_logger();
    }
    if let Some(err) = err {
        log::error!("Invalid configuration, falling back to defaults: {err}");
    }
    config
}
