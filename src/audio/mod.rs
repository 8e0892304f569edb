//! Audio input: capture sources and signal level measurement.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod level;
pub mod source;
pub mod wav;
