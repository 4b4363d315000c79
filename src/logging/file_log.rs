use std::{fs::File, io::Write, path::Path, sync::Mutex};

use log::{LevelFilter, Log, Metadata, Record};

use super::LogEntry;

/// Writes every accepted record to a file as one JSON object per line.
pub struct FileLog {
    target: Option<Mutex<File>>,
    max_level: LevelFilter,
}

impl FileLog {
    /// Truncates or creates `target`. A file that cannot be created disables
    /// the logger instead of failing.
    pub fn new(target: impl AsRef<Path>) -> Self {
        let file = match File::create(target.as_ref()) {
            Ok(f) => Some(Mutex::new(f)),
            Err(err) => {
                eprintln!(
                    "Logging setup error: failed to create log file '{}': {err}",
                    target.as_ref().display()
                );
                None
            }
        };

        Self {
            target: file,
            max_level: LevelFilter::Trace,
        }
    }

    pub fn with_max_level(self, max_level: LevelFilter) -> Self {
        Self { max_level, ..self }
    }

    pub fn into_logger(self) -> Box<dyn Log> {
        Box::new(self)
    }

    fn write_entry(&self, record: &Record) -> Result<(), Box<dyn std::error::Error + '_>> {
        if let Some(file) = self.target.as_ref() {
            let mut serialized = serde_json::to_string(&LogEntry::from(record))?;
            serialized.push('\n');

            let mut file = file.lock()?;
            file.write_all(serialized.as_bytes())?;
            file.flush()?;
        }

        Ok(())
    }
}

impl Log for FileLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.target.is_some() && metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        // Best effort
        let _ = self.write_entry(record);
    }

    fn flush(&self) {
        // Entries are flushed as they are written.
    }
}
