//! Logger module
//!
//! Server lifecycle messages, leveled error/warning lines, and per-request
//! access logging. Before `init()` runs (e.g. in tests) everything falls
//! back to stdout/stderr.

mod format;
mod level;
pub mod writer;

pub use format::AccessLogEntry;
pub use level::LogLevel;

use crate::config::Config;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        LogLevel::parse(&config.logging.level),
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn write(level: LogLevel, message: &str) {
    match writer::get() {
        Some(w) => w.write(level, message),
        None if level >= LogLevel::Warn => eprintln!("{message}"),
        None if level >= LogLevel::Info => println!("{message}"),
        None => {}
    }
}

pub fn write_info(message: &str) {
    write(LogLevel::Info, message);
}

pub fn log_debug(message: &str) {
    write(LogLevel::Debug, &format!("[DEBUG] {message}"));
}

pub fn log_warning(message: &str) {
    write(LogLevel::Warn, &format!("[WARN] {message}"));
}

pub fn log_error(message: &str) {
    write(LogLevel::Error, &format!("[ERROR] {message}"));
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("Daily URL service started");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Data file: {}", config.storage.data_file));
    write_info(&format!("Static root: {}", config.http.static_dir));
    write_info(&format!("Log level: {}", LogLevel::parse(&config.logging.level)));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(max) = config.performance.max_connections {
        write_info(&format!("Max connections: {max}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================");
}

pub fn log_server_stop() {
    write_info("[Shutdown] Listener closed, no longer accepting connections");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    log_debug(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    log_error(&format!("Failed to serve connection: {err:?}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    match writer::get() {
        Some(w) => w.write_access(&line),
        None => println!("{line}"),
    }
}
