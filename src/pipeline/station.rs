//! Station framework: one worker thread per pipeline stage.

use crate::defaults;
use crate::pipeline::error::{ErrorReporter, StationError};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// A processing stage in the pipeline.
///
/// Stations are plain state machines; `StationRunner` supplies the thread,
/// the queues, and the shutdown handling.
pub trait Station: Send {
    type Input: Send + 'static;
    type Output: Send + 'static;

    /// Name for logging/debugging.
    fn name(&self) -> &'static str;

    /// Processes one item. `Ok(None)` means nothing to forward.
    fn process(&mut self, input: Self::Input) -> Result<Option<Self::Output>, StationError>;

    /// Called when no input arrived within the receive timeout. Lets
    /// time-driven stations (the segmenter) make progress while idle.
    fn idle(&mut self) -> Result<Option<Self::Output>, StationError> {
        Ok(None)
    }

    /// Called once when the station's thread exits.
    fn shutdown(&mut self) {}
}

/// Runs a station on its own thread until the pipeline shuts down.
///
/// The worker blocks on the input queue with a short timeout; each wake
/// checks the shared running flag, so cancellation is observed within one
/// timeout interval. In-flight items still queued at shutdown are dropped.
pub struct StationRunner {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl StationRunner {
    pub fn spawn<S>(
        mut station: S,
        input_rx: Receiver<S::Input>,
        output_tx: Sender<S::Output>,
        running: Arc<AtomicBool>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self
    where
        S: Station + 'static,
    {
        let name = station.name();
        let timeout = Duration::from_millis(defaults::RECV_TIMEOUT_MS);

        let handle = std::thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                let step = match input_rx.recv_timeout(timeout) {
                    Ok(item) => station.process(item),
                    Err(RecvTimeoutError::Timeout) => station.idle(),
                    Err(RecvTimeoutError::Disconnected) => break,
                };

                match step {
                    Ok(Some(output)) => {
                        // Blocking send: downstream backpressure propagates
                        // upstream instead of silently skipping items.
                        if output_tx.send(output).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(error @ StationError::Recoverable(_)) => {
                        reporter.report(name, &error);
                    }
                    Err(error) => {
                        reporter.report(name, &error);
                        break;
                    }
                }
            }
            station.shutdown();
        });

        Self { name, handle }
    }

    /// Waits for the station thread, reporting panics as an error string.
    pub fn join(self) -> Result<(), String> {
        self.handle.join().map_err(|panic_info| {
            let msg = panic_info
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
                .unwrap_or("unknown panic");
            format!("{} station panicked: {}", self.name, msg)
        })
    }
}
