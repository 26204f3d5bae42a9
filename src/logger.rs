use std::fmt::Debug;

use codemap::SpanLoc;

/// Receives diagnostic events emitted during compilation.
///
/// `@warn`, `@debug`, and deprecation warnings are routed here rather than
/// written to stderr directly, so embedders can capture or suppress them.
pub trait Logger: Debug {
    /// A message from a `@debug` rule.
    fn debug(&self, location: SpanLoc, message: &str);

    /// A message from a `@warn` rule or a deprecation warning.
    fn warn(&self, location: SpanLoc, message: &str);
}

/// Discards all logs.
#[derive(Debug)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn debug(&self, _location: SpanLoc, _message: &str) {}

    fn warn(&self, _location: SpanLoc, _message: &str) {}
}

/// Logs events to standard error, in the dart-sass text layout.
#[derive(Debug)]
pub struct StdLogger;

impl Logger for StdLogger {
    fn debug(&self, location: SpanLoc, message: &str) {
        let line = location.begin.line + 1;
        eprintln!("{}:{} DEBUG: {}", location.file.name(), line, message);
    }

    fn warn(&self, location: SpanLoc, message: &str) {
        eprintln!(
            "Warning: {}\n    ./{}:{}:{}",
            message,
            location.file.name(),
            location.begin.line + 1,
            location.begin.column + 1,
        );
    }
}
