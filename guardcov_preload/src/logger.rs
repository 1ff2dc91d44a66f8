//! A [`log::Log`] implementation appending to a file, so the target's output stays clean.

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use libafl_bolts::{current_time, Error};
use log::{LevelFilter, Metadata, Record};

/// A simple logger struct that appends timestamped lines to a file when used with [`log::set_logger`].
///
/// The file is opened for every record, the logger only runs a handful of times per execution.
#[derive(Debug)]
pub struct FileLogger {
    path: PathBuf,
    level: LevelFilter,
}

impl FileLogger {
    /// Create a new [`log::Log`] logger that appends everything up to `level` to `path`
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P, level: LevelFilter) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            level,
        }
    }

    /// The file this logger appends to
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register this logger globally. Can only succeed once per process.
    pub fn set_logger(self) -> Result<(), Error> {
        let level = self.level;
        log::set_logger(Box::leak(Box::new(self)))
            .map_err(|_| Error::unknown("Failed to register logger"))?;
        log::set_max_level(level);
        Ok(())
    }

    fn append(&self, line: &str) -> Result<(), Error> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl log::Log for FileLogger {
    #[inline]
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "{}: [{}] {}\n",
            current_time().as_millis(),
            record.level(),
            record.args()
        );
        // nowhere left to report this to
        let _ = self.append(&line);
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use std::{env, fs, process};

    use log::{Level, LevelFilter, Log, Record};

    use super::FileLogger;

    #[test]
    fn test_appends_lines() {
        let path = env::temp_dir().join(format!("guardcov_logger_test_{}.log", process::id()));
        let _ = fs::remove_file(&path);

        let logger = FileLogger::new(&path, LevelFilter::Info);
        logger.log(
            &Record::builder()
                .level(Level::Error)
                .args(format_args!("Memory sizes don't match"))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Info)
                .args(format_args!("exported 12 guards"))
                .build(),
        );
        // filtered
        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .args(format_args!("not written"))
                .build(),
        );

        let content = fs::read_to_string(logger.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[ERROR] Memory sizes don't match"));
        assert!(lines[1].ends_with("[INFO] exported 12 guards"));
        fs::remove_file(&path).unwrap();
    }
}
