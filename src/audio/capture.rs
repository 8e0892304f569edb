//! Live audio capture using CPAL (Cross-Platform Audio Library).

use crate::audio::source::AudioSource;
use crate::defaults;
use crate::error::{Result, StagecueError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// Suppresses ALSA/JACK/PipeWire messages that CPAL triggers while probing
/// audio backends.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2.
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// List available audio input device names.
pub fn list_devices() -> Result<Vec<String>> {
    let devices = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        host.input_devices()
            .map(|devices| devices.filter_map(|d| d.name().ok()).collect::<Vec<_>>())
    })
    .map_err(|e| StagecueError::AudioCapture {
        message: format!("Failed to enumerate input devices: {}", e),
    })?;

    Ok(devices)
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only touched through the Mutex in CpalAudioSource,
/// so access is exclusive and never crosses threads concurrently.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Live microphone capture, buffering 16-bit PCM at 16kHz mono.
///
/// The preferred format (i16/16kHz/mono) is requested first; devices that
/// only expose float formats get a converting callback instead.
pub struct CpalAudioSource {
    device: cpal::Device,
    stream: Mutex<Option<SendableStream>>,
    buffer: Arc<Mutex<Vec<i16>>>,
    sample_rate: u32,
}

impl CpalAudioSource {
    /// Create a new CPAL audio source.
    ///
    /// # Arguments
    /// * `device_name` - Optional device name. If None, uses the default
    ///   input device.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let device = with_suppressed_stderr(|| {
            let host = cpal::default_host();

            match device_name {
                Some(name) => {
                    let mut devices =
                        host.input_devices()
                            .map_err(|e| StagecueError::AudioCapture {
                                message: format!("Failed to enumerate devices: {}", e),
                            })?;
                    devices
                        .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                        .ok_or_else(|| StagecueError::AudioDeviceNotFound {
                            device: name.to_string(),
                        })
                }
                None => host
                    .default_input_device()
                    .ok_or_else(|| StagecueError::AudioDeviceNotFound {
                        device: "default".to_string(),
                    }),
            }
        })?;

        Ok(Self {
            device,
            stream: Mutex::new(None),
            buffer: Arc::new(Mutex::new(Vec::new())),
            sample_rate: defaults::SAMPLE_RATE,
        })
    }

    fn build_stream(&self) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            eprintln!("stagecue: audio stream error: {}", err);
        };

        // Preferred: i16/16kHz/mono. PipeWire and PulseAudio convert
        // transparently for most hardware.
        let buffer = Arc::clone(&self.buffer);
        if let Ok(stream) = self.device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        // Fallback for devices that only expose float formats.
        let buffer = Arc::clone(&self.buffer);
        self.device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(
                            data.iter()
                                .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
                        );
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| StagecueError::AudioCapture {
                message: format!("Failed to build input stream: {}", e),
            })
    }
}

impl AudioSource for CpalAudioSource {
    fn start(&mut self) -> Result<()> {
        {
            let guard = self.stream.lock().map_err(|e| StagecueError::AudioCapture {
                message: format!("Failed to lock stream: {}", e),
            })?;
            if guard.is_some() {
                return Ok(()); // Already started
            }
        }

        let stream = self.build_stream()?;
        stream.play().map_err(|e| StagecueError::AudioCapture {
            message: format!("Failed to start audio stream: {}", e),
        })?;

        let mut guard = self.stream.lock().map_err(|e| StagecueError::AudioCapture {
            message: format!("Failed to lock stream: {}", e),
        })?;
        *guard = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut guard = self.stream.lock().map_err(|e| StagecueError::AudioCapture {
            message: format!("Failed to lock stream: {}", e),
        })?;

        if let Some(stream) = guard.take() {
            stream.0.pause().map_err(|e| StagecueError::AudioCapture {
                message: format!("Failed to stop audio stream: {}", e),
            })?;
        }
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        let mut buffer = self.buffer.lock().map_err(|e| StagecueError::AudioCapture {
            message: format!("Failed to lock audio buffer: {}", e),
        })?;

        Ok(std::mem::take(&mut *buffer))
    }

    fn is_finite(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_with_invalid_device_name_reports_not_found() {
        let source = CpalAudioSource::new(Some("NoSuchStageMicrophone"));
        match source {
            Err(StagecueError::AudioDeviceNotFound { device }) => {
                assert_eq!(device, "NoSuchStageMicrophone");
            }
            Err(StagecueError::AudioCapture { .. }) => {
                // Hosts without any audio backend fail enumeration instead.
            }
            _ => panic!("Expected a capture error"),
        }
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn capture_start_read_stop() {
        let mut source = CpalAudioSource::new(None).expect("Failed to create audio source");
        assert!(source.start().is_ok());
        std::thread::sleep(std::time::Duration::from_millis(100));
        assert!(source.read_samples().is_ok());
        assert!(source.stop().is_ok());
    }
}
