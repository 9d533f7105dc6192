//! Error classification and reporting for the producer and consumer loops.

use std::fmt;

/// Errors raised inside a loop iteration.
#[derive(Debug, Clone)]
pub enum StationError {
    /// The iteration is abandoned but the loop keeps running.
    Recoverable(String),
    /// The loop must stop.
    Fatal(String),
}

impl StationError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StationError::Fatal(_))
    }
}

impl fmt::Display for StationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationError::Recoverable(msg) => write!(f, "Recoverable error: {}", msg),
            StationError::Fatal(msg) => write!(f, "Fatal error: {}", msg),
        }
    }
}

impl std::error::Error for StationError {}

/// Trait for reporting loop errors.
pub trait ErrorReporter: Send + Sync {
    /// Reports an error from the named stage.
    fn report(&self, station: &str, error: &StationError);
}

/// Reporter that forwards to the `log` facade: recoverable errors as
/// warnings, fatal ones as errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, station: &str, error: &StationError) {
        if error.is_fatal() {
            log::error!("[{}] {}", station, error);
        } else {
            log::warn!("[{}] {}", station, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_error_display() {
        let recoverable = StationError::Recoverable("sensor read timed out".to_string());
        assert_eq!(
            recoverable.to_string(),
            "Recoverable error: sensor read timed out"
        );

        let fatal = StationError::Fatal("stdout closed".to_string());
        assert_eq!(fatal.to_string(), "Fatal error: stdout closed");
    }

    #[test]
    fn test_is_fatal() {
        assert!(StationError::Fatal(String::new()).is_fatal());
        assert!(!StationError::Recoverable(String::new()).is_fatal());
    }

    #[test]
    fn test_log_reporter() {
        let reporter = LogReporter;
        // Just ensure it doesn't panic
        reporter.report("sensor", &StationError::Recoverable("test error".to_string()));
        reporter.report("output", &StationError::Fatal("test error".to_string()));
    }
}
