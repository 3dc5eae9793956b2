// Structured logger with level filtering and a pluggable sink.
//
// The default sink writes colored lines to stderr. Embedders replace the
// sink to route records into their own logging pipeline; background
// workers log through this and never panic or escalate.

use std::fmt;
use std::sync::Arc;

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const RED: &str = "\x1b[31m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const MAGENTA: &str = "\x1b[35m";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            LogLevel::Debug => ansi::MAGENTA,
            LogLevel::Info => ansi::BLUE,
            LogLevel::Warn => ansi::YELLOW,
            LogLevel::Error => ansi::RED,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives every record that passes the level filter.
pub type LogSink = Arc<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Cheap to clone; `with_field` derives child loggers carrying context.
#[derive(Clone)]
pub struct Logger {
    level: LogLevel,
    sink: LogSink,
    fields: Vec<(String, String)>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl Logger {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            sink: Arc::new(stderr_sink),
            fields: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: LogSink) -> Self {
        self.sink = sink;
        self
    }

    /// A sink that drops everything, for tests that assert on behavior
    /// rather than output.
    pub fn discard() -> Self {
        Self::new(LogLevel::Error).with_sink(Arc::new(|_, _| {}))
    }

    /// Derive a logger that prefixes every record with `key=value`.
    pub fn with_field(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.fields.push((key.into(), value.into()));
        child
    }

    pub fn log(&self, level: LogLevel, msg: &str) {
        if level < self.level {
            return;
        }
        if self.fields.is_empty() {
            (self.sink)(level, msg);
            return;
        }
        let mut line = String::new();
        for (k, v) in &self.fields {
            line.push_str(k);
            line.push('=');
            line.push_str(v);
            line.push(' ');
        }
        line.push_str(msg);
        (self.sink)(level, &line);
    }

    pub fn debug(&self, msg: &str) {
        self.log(LogLevel::Debug, msg);
    }

    pub fn info(&self, msg: &str) {
        self.log(LogLevel::Info, msg);
    }

    pub fn warn(&self, msg: &str) {
        self.log(LogLevel::Warn, msg);
    }

    pub fn error(&self, msg: &str) {
        self.log(LogLevel::Error, msg);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("fields", &self.fields)
            .finish()
    }
}

fn stderr_sink(level: LogLevel, msg: &str) {
    eprintln!("{}[{}]{} {}", level.color(), level.as_str(), ansi::RESET, msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn capture() -> (Logger, Arc<Mutex<Vec<(LogLevel, String)>>>) {
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink_records = records.clone();
        let logger = Logger::new(LogLevel::Info).with_sink(Arc::new(move |level, msg| {
            sink_records.lock().unwrap().push((level, msg.to_string()));
        }));
        (logger, records)
    }

    #[test]
    fn test_level_filtering() {
        let (logger, records) = capture();
        logger.debug("dropped");
        logger.info("kept");
        logger.error("kept too");
        let records = records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, LogLevel::Info);
    }

    #[test]
    fn test_fields_prefix_records() {
        let (logger, records) = capture();
        logger.with_field("connector", "local").warn("open failed");
        let records = records.lock().unwrap();
        assert_eq!(records[0].1, "connector=local open failed");
    }
}
