//! In-process playback via rodio.
//!
//! rodio's output stream is not Send, so a dedicated thread owns it and
//! receives file paths over a channel. Dropping the player closes the
//! channel and ends the thread.

use crate::error::{Result, StagecueError};
use crate::playback::PlaybackEngine;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Plays audio files on a dedicated output-stream thread.
pub struct RodioPlayer {
    tx: crossbeam_channel::Sender<PathBuf>,
}

impl RodioPlayer {
    /// Opens the default output device and starts the playback thread.
    pub fn new() -> Result<Self> {
        let (tx, rx) = crossbeam_channel::bounded::<PathBuf>(32);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<()>>(1);

        std::thread::Builder::new()
            .name("rodio-playback".to_string())
            .spawn(move || {
                let (_stream, handle) = match rodio::OutputStream::try_default() {
                    Ok(pair) => {
                        ready_tx.send(Ok(())).ok();
                        pair
                    }
                    Err(e) => {
                        ready_tx
                            .send(Err(StagecueError::Playback {
                                message: format!("failed to open output device: {}", e),
                            }))
                            .ok();
                        return;
                    }
                };

                while let Ok(path) = rx.recv() {
                    if let Err(e) = play_file(&handle, &path) {
                        eprintln!("stagecue: {}", e);
                    }
                }
            })
            .map_err(|e| StagecueError::Playback {
                message: format!("failed to spawn playback thread: {}", e),
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { tx }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(StagecueError::Playback {
                message: "playback thread exited during startup".to_string(),
            }),
        }
    }
}

fn play_file(handle: &rodio::OutputStreamHandle, path: &Path) -> Result<()> {
    let file = std::fs::File::open(path).map_err(|e| StagecueError::Playback {
        message: format!("failed to open {}: {}", path.display(), e),
    })?;
    let source =
        rodio::Decoder::new(BufReader::new(file)).map_err(|e| StagecueError::Playback {
            message: format!("failed to decode {}: {}", path.display(), e),
        })?;
    let sink = rodio::Sink::try_new(handle).map_err(|e| StagecueError::Playback {
        message: format!("failed to create sink: {}", e),
    })?;
    sink.append(source);
    // Audio keeps playing on rodio's own thread.
    sink.detach();
    Ok(())
}

impl PlaybackEngine for RodioPlayer {
    fn play(&self, path: &Path) -> Result<Option<Duration>> {
        self.tx
            .send(path.to_path_buf())
            .map_err(|_| StagecueError::Playback {
                message: "playback thread terminated".to_string(),
            })?;
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "rodio"
    }
}
