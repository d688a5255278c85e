//! Log writer module
//!
//! Thread-safe log sinks: stdout/stderr by default, or append-mode files.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock, PoisonError};

use super::level::LogLevel;

/// Global log writer instance
static LOG_WRITER: OnceLock<LogWriter> = OnceLock::new();

/// Log output target
enum LogTarget {
    Stdout,
    Stderr,
    File(Mutex<File>),
}

impl LogTarget {
    fn open(path: Option<&str>, fallback: Self) -> io::Result<Self> {
        match path {
            Some(p) => Ok(Self::File(Mutex::new(open_log_file(p)?))),
            None => Ok(fallback),
        }
    }

    fn write_line(&self, message: &str) {
        match self {
            Self::Stdout => println!("{message}"),
            Self::Stderr => eprintln!("{message}"),
            Self::File(file) => {
                let mut f = file.lock().unwrap_or_else(PoisonError::into_inner);
                let _ = writeln!(f, "{message}");
            }
        }
    }
}

/// Thread-safe log writer
pub struct LogWriter {
    level: LogLevel,
    access: LogTarget,
    error: LogTarget,
}

impl LogWriter {
    fn new(
        level: LogLevel,
        access_log_file: Option<&str>,
        error_log_file: Option<&str>,
    ) -> io::Result<Self> {
        Ok(Self {
            level,
            access: LogTarget::open(access_log_file, LogTarget::Stdout)?,
            error: LogTarget::open(error_log_file, LogTarget::Stderr)?,
        })
    }

    /// Write to access log; access lines bypass the level filter
    pub fn write_access(&self, message: &str) {
        self.access.write_line(message);
    }

    /// Write a message at `level` if the configured level allows it
    ///
    /// Info and debug share the access target; warnings and errors go to
    /// the error target.
    pub fn write(&self, level: LogLevel, message: &str) {
        if !self.level.allows(level) {
            return;
        }
        if level >= LogLevel::Warn {
            self.error.write_line(message);
        } else {
            self.access.write_line(message);
        }
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize the global log writer
///
/// Returns error if log files cannot be opened or the writer is already set.
pub fn init(
    level: LogLevel,
    access_log_file: Option<&str>,
    error_log_file: Option<&str>,
) -> io::Result<()> {
    let writer = LogWriter::new(level, access_log_file, error_log_file)?;
    LOG_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Log writer already initialized",
        )
    })
}

/// Get the global log writer, if `init()` has run
pub fn get() -> Option<&'static LogWriter> {
    LOG_WRITER.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_targets_receive_lines() {
        let dir = tempfile::tempdir().unwrap();
        let access = dir.path().join("logs").join("access.log");
        let error = dir.path().join("logs").join("error.log");

        let writer = LogWriter::new(
            LogLevel::Info,
            access.to_str(),
            error.to_str(),
        )
        .unwrap();

        writer.write_access("GET /api/data 200");
        writer.write(LogLevel::Info, "started");
        writer.write(LogLevel::Debug, "hidden");
        writer.write(LogLevel::Error, "boom");

        let access_content = std::fs::read_to_string(&access).unwrap();
        assert!(access_content.contains("GET /api/data 200"));
        assert!(access_content.contains("started"));
        assert!(!access_content.contains("hidden"));

        let error_content = std::fs::read_to_string(&error).unwrap();
        assert_eq!(error_content, "boom\n");
    }
}
