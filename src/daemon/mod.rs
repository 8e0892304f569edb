//! Daemon mode: builds the controller, serves IPC, waits for shutdown.

pub mod handler;

use crate::audio::source::AudioSource;
use crate::config::Config;
use crate::control::{Controller, SourceFactory};
use crate::cue::store::CueStore;
use crate::error::{Result, StagecueError};
use crate::events::{Event, EventBus};
use crate::ipc::server::IpcServer;
use crate::playback::{CommandPlayer, PlaybackEngine};
use crate::state;
use crate::stt::transcriber::{Transcriber, UnavailableTranscriber};
use crate::stt::whisper::{WhisperConfig, WhisperTranscriber};
use std::path::PathBuf;
use std::sync::Arc;

/// Run the daemon: load cues, build the controller, serve IPC until a
/// shutdown signal or command arrives.
///
/// # Arguments
/// * `config` - Configuration
/// * `socket_path` - Path to the Unix socket for IPC
/// * `input` - Optional WAV file driving the pipeline instead of a microphone
/// * `quiet` - Suppress status messages
pub async fn run_daemon(
    config: Config,
    socket_path: Option<PathBuf>,
    input: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let bus = EventBus::default();

    // Cue table: a missing or unreadable store is not fatal, the operator
    // can add cues over the control surface.
    let store = CueStore::new(config.store.cues_file.clone());
    let cues = match store.load() {
        Ok(cues) => {
            if !quiet {
                eprintln!(
                    "stagecue: loaded {} cues from {}",
                    cues.len(),
                    store.path().display()
                );
            }
            cues
        }
        Err(e) => {
            eprintln!("stagecue: {e}");
            Vec::new()
        }
    };
    let shared = state::shared(cues);

    // The engine loads once at startup. Failure degrades the daemon rather
    // than killing it: manual cue control still works, transcripts don't.
    let transcriber = build_transcriber(&config, &bus, quiet);
    let player = build_player(&config);
    let source_factory = build_source_factory(&config, input);

    let controller = Arc::new(Controller::new(
        config,
        shared.clone(),
        store,
        bus.clone(),
        transcriber,
        player,
        source_factory,
    ));

    let socket_path = socket_path.unwrap_or_else(IpcServer::default_socket_path);
    let server = Arc::new(IpcServer::new(socket_path, bus, shared));

    if !quiet {
        eprintln!(
            "stagecue: IPC server listening at {}",
            server.socket_path().display()
        );
        eprintln!("stagecue: daemon ready");
    }

    let handler = handler::ShowCommandHandler::new(controller.clone());
    let server_task = Arc::clone(&server);
    let mut server_handle = tokio::spawn(async move { server_task.start(handler).await });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            if !quiet {
                eprintln!("\nstagecue: received SIGINT, shutting down");
            }
        }
        res = wait_for_sigterm() => {
            if let Err(e) = res {
                eprintln!("stagecue: error setting up signal handler: {e}");
            }
            if !quiet {
                eprintln!("\nstagecue: received SIGTERM, shutting down");
            }
        }
        // A shutdown command ends the accept loop on its own.
        _ = &mut server_handle => {}
    }

    // Stop a live run; invalid-state just means nothing was running.
    if let Err(error) = controller.stop() {
        if !matches!(error, StagecueError::InvalidState { .. }) {
            eprintln!("stagecue: {error}");
        }
    }

    server.stop().await?;
    if !server_handle.is_finished() {
        if let Err(e) = server_handle.await {
            eprintln!("stagecue: daemon server task failed: {e}");
        }
    }

    if !quiet {
        eprintln!("stagecue: daemon stopped");
    }

    Ok(())
}

/// Wait for SIGTERM (used by service managers).
#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| StagecueError::Other(format!("Failed to register SIGTERM handler: {e}")))?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    std::future::pending::<()>().await;
    Ok(())
}

/// Load the speech engine, degrading to a stand-in on failure.
fn build_transcriber(config: &Config, bus: &EventBus, quiet: bool) -> Arc<dyn Transcriber> {
    let whisper_config = WhisperConfig {
        model_path: config.stt.model_path.clone(),
        language: config.stt.language.clone(),
        threads: None,
    };

    match WhisperTranscriber::new(whisper_config) {
        Ok(engine) => {
            if !engine.is_ready() {
                // Built without the whisper feature: the stub loads but
                // cannot transcribe.
                bus.publish(Event::SystemError {
                    error: "transcription engine unavailable in this build".to_string(),
                });
            } else if !quiet {
                eprintln!("stagecue: model '{}' loaded", engine.model_name());
            }
            Arc::new(engine)
        }
        Err(e) => {
            eprintln!("stagecue: {e}");
            bus.publish(Event::SystemError {
                error: e.to_string(),
            });
            Arc::new(UnavailableTranscriber::new(e.to_string()))
        }
    }
}

/// Pick the playback backend.
#[cfg(feature = "rodio-playback")]
fn build_player(config: &Config) -> Arc<dyn PlaybackEngine> {
    match crate::playback::RodioPlayer::new() {
        Ok(player) => Arc::new(player),
        Err(e) => {
            eprintln!("stagecue: {e}; falling back to external player");
            Arc::new(CommandPlayer::new(config.playback.player.clone()))
        }
    }
}

#[cfg(not(feature = "rodio-playback"))]
fn build_player(config: &Config) -> Arc<dyn PlaybackEngine> {
    Arc::new(CommandPlayer::new(config.playback.player.clone()))
}

/// Build the per-run audio source factory.
fn build_source_factory(config: &Config, input: Option<PathBuf>) -> SourceFactory {
    if let Some(path) = input {
        return Box::new(move || {
            let source = crate::audio::wav::WavAudioSource::open(&path)?;
            Ok(Box::new(source) as Box<dyn AudioSource>)
        });
    }

    #[cfg(feature = "cpal-audio")]
    {
        let device = config.audio.device.clone();
        Box::new(move || {
            let source = crate::audio::capture::CpalAudioSource::new(device.as_deref())?;
            Ok(Box::new(source) as Box<dyn AudioSource>)
        })
    }

    #[cfg(not(feature = "cpal-audio"))]
    {
        let _ = config;
        Box::new(|| {
            Err(StagecueError::AudioCapture {
                message: concat!(
                    "built without live capture; ",
                    "enable the cpal-audio feature or pass --input <wav>"
                )
                .to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn source_factory_prefers_the_wav_input() {
        let dir = TempDir::new().unwrap();
        let wav_path = dir.path().join("input.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&wav_path, spec).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.finalize().unwrap();

        let factory = build_source_factory(&Config::default(), Some(wav_path));
        let source = factory().unwrap();
        assert!(source.is_finite());
    }

    #[test]
    fn source_factory_with_missing_wav_fails_per_run() {
        let factory = build_source_factory(
            &Config::default(),
            Some(PathBuf::from("/nonexistent/input.wav")),
        );
        assert!(factory().is_err());
    }

    #[tokio::test]
    async fn build_transcriber_degrades_on_missing_model() {
        let mut config = Config::default();
        config.stt.model_path = PathBuf::from("/nonexistent/model.bin");

        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let transcriber = build_transcriber(&config, &bus, true);

        assert!(!transcriber.is_ready());
        match rx.recv().await.unwrap() {
            Event::SystemError { error } => {
                assert!(error.contains("model not found"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
