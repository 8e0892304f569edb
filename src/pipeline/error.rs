//! Error types and reporting for pipeline stations.

use crate::events::{Event, EventBus};
use std::fmt;

/// Errors that can occur during station processing.
#[derive(Debug, Clone)]
pub enum StationError {
    /// Recoverable error; the station drops the item and continues.
    Recoverable(String),
    /// Fatal error; the station shuts down, the rest of the pipeline
    /// keeps running.
    Fatal(String),
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

/// Trait for reporting station errors.
pub trait ErrorReporter: Send + Sync {
    /// Reports an error from a station.
    fn report(&self, station: &str, error: &StationError);
}

/// Simple error reporter that logs to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, station: &str, error: &StationError) {
        eprintln!("stagecue: [{}] {}", station, error);
    }
}

/// Reporter that logs everything and surfaces fatal errors to observers
/// as `system_error` events.
#[derive(Debug, Clone)]
pub struct BusReporter {
    bus: EventBus,
}

impl BusReporter {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl ErrorReporter for BusReporter {
    fn report(&self, station: &str, error: &StationError) {
        eprintln!("stagecue: [{}] {}", station, error);
        if let StationError::Fatal(msg) = error {
            self.bus.publish(Event::SystemError {
                error: format!("{}: {}", station, msg),
            });
        }
    }
}
