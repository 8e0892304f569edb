//! Command handler bridging IPC commands to the controller.

use crate::control::Controller;
use crate::error::Result;
use crate::ipc::protocol::{Command, Response};
use crate::ipc::server::CommandHandler;
use std::sync::Arc;

/// Maps IPC commands onto [`Controller`] operations and control errors
/// onto typed error responses.
pub struct ShowCommandHandler {
    controller: Arc<Controller>,
}

impl ShowCommandHandler {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self { controller }
    }

    fn ok(message: &str) -> Response {
        Response::Ok {
            message: message.to_string(),
        }
    }

    fn respond<T>(result: Result<T>, on_ok: impl FnOnce(T) -> Response) -> Response {
        match result {
            Ok(value) => on_ok(value),
            Err(e) => Response::from_error(&e),
        }
    }
}

#[async_trait::async_trait]
impl CommandHandler for ShowCommandHandler {
    async fn handle(&self, command: Command) -> Response {
        match command {
            Command::Start => {
                Self::respond(self.controller.start(), |_| Self::ok("System started"))
            }
            Command::Stop => Self::respond(self.controller.stop(), |_| Self::ok("System stopped")),
            Command::Next => Self::respond(self.controller.next(), |cue| Response::Cue { cue }),
            Command::Previous => {
                Self::respond(self.controller.previous(), |cue| Response::Cue { cue })
            }
            Command::Repeat => Self::respond(self.controller.repeat(), |cue| Response::Cue { cue }),
            Command::Play { cue_id } => {
                Self::respond(self.controller.play(cue_id), |cue| Response::Cue { cue })
            }
            Command::ListCues => {
                Self::respond(self.controller.list_cues(), |cues| Response::Cues { cues })
            }
            Command::AddCue { cue } => {
                Self::respond(self.controller.add_cue(cue), |cue| Response::Cue { cue })
            }
            Command::UpdateCue { cue_id, cue } => Self::respond(
                self.controller.update_cue(cue_id, cue),
                |cue| Response::Cue { cue },
            ),
            Command::DeleteCue { cue_id } => {
                Self::respond(self.controller.delete_cue(cue_id), |_| {
                    Self::ok("Cue deleted")
                })
            }
            Command::Status => Self::respond(self.controller.status(), |status| Response::Status {
                running: status.running,
                recording: status.recording,
                state: status.state.to_string(),
                current_cue_index: status.current_cue_index,
                last_played_cue_id: status.last_played_cue_id,
                detections: status.detections,
                matches: status.matches,
                uptime_secs: status.uptime_secs,
            }),
            Command::History => Self::respond(self.controller.history(), |entries| {
                Response::History { entries }
            }),
            // Follow never reaches the handler; the server streams it.
            Command::Follow => Self::ok("following"),
            Command::Shutdown => {
                // Stop a live run before the server exits its accept loop;
                // an already-stopped machine is fine.
                if let Err(error) = self.controller.stop() {
                    if !matches!(error, crate::error::StagecueError::InvalidState { .. }) {
                        eprintln!("stagecue: {error}");
                    }
                }
                Self::ok("Shutting down")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::MockAudioSource;
    use crate::config::Config;
    use crate::cue::Cue;
    use crate::cue::store::CueStore;
    use crate::events::EventBus;
    use crate::ipc::protocol::ErrorKind;
    use crate::playback::MockPlayer;
    use crate::state;
    use crate::stt::transcriber::MockTranscriber;
    use tempfile::TempDir;

    fn cue(id: u64, token: &str) -> Cue {
        Cue {
            id,
            source_text: token.to_string(),
            first_tokens: vec![token.to_string()],
            audio_reference: format!("line_{id:02}.wav"),
        }
    }

    fn handler_with_cues(dir: &TempDir, cues: Vec<Cue>) -> ShowCommandHandler {
        let mut config = Config::default();
        config.playback.audio_dir = dir.path().join("audio");
        config.store.cues_file = dir.path().join("cues.json");
        std::fs::create_dir_all(&config.playback.audio_dir).unwrap();

        let store = CueStore::new(config.store.cues_file.clone());
        store.save(&cues).unwrap();

        let controller = Controller::new(
            config,
            state::shared(cues),
            store,
            EventBus::default(),
            Arc::new(MockTranscriber::new("test").with_response("")),
            Arc::new(MockPlayer::new()),
            Box::new(|| Ok(Box::new(MockAudioSource::new().as_live_source()))),
        );
        ShowCommandHandler::new(Arc::new(controller))
    }

    #[tokio::test]
    async fn status_reflects_the_stopped_machine() {
        let dir = TempDir::new().unwrap();
        let handler = handler_with_cues(&dir, vec![cue(1, "hello")]);

        match handler.handle(Command::Status).await {
            Response::Status {
                running,
                state,
                current_cue_index,
                ..
            } => {
                assert!(!running);
                assert_eq!(state, "stopped");
                assert_eq!(current_cue_index, -1);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn list_cues_returns_the_table() {
        let dir = TempDir::new().unwrap();
        let handler = handler_with_cues(&dir, vec![cue(1, "one"), cue(2, "two")]);

        match handler.handle(Command::ListCues).await {
            Response::Cues { cues } => assert_eq!(cues.len(), 2),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn control_errors_become_typed_responses() {
        let dir = TempDir::new().unwrap();
        let handler = handler_with_cues(&dir, vec![cue(1, "one")]);

        // Stopped machine: manual playback is invalid_state.
        match handler.handle(Command::Next).await {
            Response::Error { kind, .. } => assert_eq!(kind, ErrorKind::InvalidState),
            other => panic!("unexpected response: {:?}", other),
        }

        // Unknown cue: not_found (after starting the run).
        assert!(matches!(
            handler.handle(Command::Start).await,
            Response::Ok { .. }
        ));
        match handler.handle(Command::Play { cue_id: 42 }).await {
            Response::Error { kind, .. } => assert_eq!(kind, ErrorKind::NotFound),
            other => panic!("unexpected response: {:?}", other),
        }

        // Invalid cue payload: validation_error.
        let mut bad = cue(9, "nine");
        bad.first_tokens.clear();
        match handler.handle(Command::AddCue { cue: bad }).await {
            Response::Error { kind, .. } => assert_eq!(kind, ErrorKind::Validation),
            other => panic!("unexpected response: {:?}", other),
        }

        assert!(matches!(
            handler.handle(Command::Stop).await,
            Response::Ok { .. }
        ));
    }

    #[tokio::test]
    async fn start_stop_lifecycle_through_the_handler() {
        let dir = TempDir::new().unwrap();
        let handler = handler_with_cues(&dir, vec![]);

        assert!(matches!(
            handler.handle(Command::Start).await,
            Response::Ok { .. }
        ));
        match handler.handle(Command::Status).await {
            Response::Status { running, .. } => assert!(running),
            other => panic!("unexpected response: {:?}", other),
        }
        assert!(matches!(
            handler.handle(Command::Stop).await,
            Response::Ok { .. }
        ));
    }

    #[tokio::test]
    async fn shutdown_stops_a_live_run() {
        let dir = TempDir::new().unwrap();
        let handler = handler_with_cues(&dir, vec![]);

        handler.handle(Command::Start).await;
        assert!(matches!(
            handler.handle(Command::Shutdown).await,
            Response::Ok { .. }
        ));
        match handler.handle(Command::Status).await {
            Response::Status { running, .. } => assert!(!running),
            other => panic!("unexpected response: {:?}", other),
        }
    }
}
