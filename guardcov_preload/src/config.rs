//! Runtime configuration of the preload library, read from the environment of the target.

use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use guardcov_targets::ExportMode;
use libafl_bolts::Error;
use log::LevelFilter;

/// Path of the log file.
pub const LOG_FILE_ENV: &str = "GUARDCOV_LOG_FILE";
/// Maximum level written to the log file.
pub const LOG_LEVEL_ENV: &str = "GUARDCOV_LOG_LEVEL";
/// How guards are narrowed to the bytes of the shared map, see [`ExportMode`].
pub const EXPORT_MODE_ENV: &str = "GUARDCOV_EXPORT_MODE";

/// The log file of the `redirect` mode if [`LOG_FILE_ENV`] is not set.
/// The `probe` mode does not log unless asked to.
pub const DEFAULT_LOG_FILE: &str = "redirection.log";

/// Settings of the preload library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadConfig {
    /// Where log lines are appended to, if set. The target's own stdout and stderr stay untouched.
    pub log_file: Option<PathBuf>,
    /// The maximum level that ends up in the log file
    pub log_level: LevelFilter,
    /// How guards are written into the shared map
    pub export_mode: ExportMode,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            log_level: LevelFilter::Info,
            export_mode: ExportMode::default(),
        }
    }
}

impl PreloadConfig {
    /// Reads the config from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the config through `lookup`, falling back to the defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(log_file) = lookup(LOG_FILE_ENV) {
            config.log_file = Some(PathBuf::from(log_file));
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            config.log_level = LevelFilter::from_str(&level).map_err(|_| {
                Error::illegal_argument(format!("Invalid {LOG_LEVEL_ENV}: {level:?}"))
            })?;
        }
        if let Some(mode) = lookup(EXPORT_MODE_ENV) {
            config.export_mode = ExportMode::from_str(&mode).map_err(|_| {
                Error::illegal_argument(format!(
                    "Invalid {EXPORT_MODE_ENV}: {mode:?}, expected truncate, saturate or edges"
                ))
            })?;
        }
        Ok(config)
    }

    /// The configured log file, or `fallback` if none was set.
    #[must_use]
    pub fn log_file_or(&self, fallback: Option<&Path>) -> Option<PathBuf> {
        self.log_file
            .clone()
            .or_else(|| fallback.map(Path::to_path_buf))
    }
}
