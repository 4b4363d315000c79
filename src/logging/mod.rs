use std::path::Path;

use anyhow::{Context, Error};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

mod file_log;
mod multilog;

pub use file_log::FileLog;
pub use multilog::MultiLogger;

/// One line of the JSON log file.
#[derive(Debug, Serialize, Deserialize)]
struct LogEntry {
    pub level: Level,
    pub message: String,
    pub target: String,
    pub module: String,
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Level {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl From<log::Level> for Level {
    fn from(value: log::Level) -> Self {
        match value {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warn,
            log::Level::Info => Level::Info,
            log::Level::Debug => Level::Debug,
            log::Level::Trace => Level::Trace,
        }
    }
}

impl From<&log::Record<'_>> for LogEntry {
    fn from(value: &log::Record) -> Self {
        Self {
            level: value.level().into(),
            message: value.args().to_string(),
            target: value.target().to_string(),
            module: value.module_path().unwrap_or_default().to_string(),
            file: value.file().unwrap_or_default().to_string(),
            line: value.line().unwrap_or_default(),
        }
    }
}

/// Registers the global logger: stderr at `verbosity`, plus every record as
/// JSON lines in `log_file` when one is given.
pub fn setup_logging(verbosity: LevelFilter, log_file: Option<&Path>) -> Result<(), Error> {
    let mut logger = MultiLogger::new()
        .with_logger(Box::new(
            env_logger::builder()
                .format_timestamp(None)
                .filter_level(verbosity)
                .build(),
        ))
        .with_max_level(verbosity);

    // The file sink records everything, whatever the console shows.
    if let Some(path) = log_file {
        logger.add_logger(FileLog::new(path).into_logger());
        logger.set_max_level(LevelFilter::Trace);
    }

    logger.init().context("Logger already registered")
}
