//! Console logging.
//!
//! Components receive a `&dyn Logger` instead of writing to the process
//! streams directly, so tests can capture and assert on the exact lines a
//! run emits. Info lines go to stdout, error lines to stderr.

use std::io::Write;

/// Separator printed after each completed unit of work.
pub const BLOCK_END: &str = "-----------------------------------------";

/// Logging capability passed explicitly to every component that reports
/// progress.
pub trait Logger {
    fn info(&self, message: &str);
    fn err(&self, message: &str);
}

/// Logger backed by the process's stdout/stderr.
pub struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn info(&self, message: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "[INFO] : {message}");
    }

    fn err(&self, message: &str) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "[ERR ] : {message}");
    }
}
