//! IPC client for sending commands to the daemon.

use crate::error::{Result, StagecueError};
use crate::events::Event;
use crate::ipc::protocol::{Command, Response};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// Send a command to the daemon via Unix socket.
///
/// # Errors
/// Returns `StagecueError::IpcConnection` if connection fails
/// Returns `StagecueError::IpcProtocol` if serialization/deserialization fails
pub async fn send_command(socket_path: &Path, command: Command) -> Result<Response> {
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| StagecueError::IpcConnection {
            message: format!("Failed to connect to daemon: {}", e),
        })?;

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let command_json = command.to_json().map_err(|e| StagecueError::IpcProtocol {
        message: format!("Failed to serialize command: {}", e),
    })?;

    writer
        .write_all(command_json.as_bytes())
        .await
        .map_err(|e| StagecueError::IpcConnection {
            message: format!("Failed to write command: {}", e),
        })?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| StagecueError::IpcConnection {
            message: format!("Failed to write newline: {}", e),
        })?;
    writer
        .flush()
        .await
        .map_err(|e| StagecueError::IpcConnection {
            message: format!("Failed to flush writer: {}", e),
        })?;

    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .await
        .map_err(|e| StagecueError::IpcConnection {
            message: format!("Failed to read response: {}", e),
        })?;

    Response::from_json(response_line.trim()).map_err(|e| StagecueError::IpcProtocol {
        message: format!("Failed to deserialize response: {}", e),
    })
}

/// Follow daemon events, invoking the callback per event until the daemon
/// closes the connection.
pub async fn follow<F>(socket_path: &Path, mut on_event: F) -> Result<()>
where
    F: FnMut(Event),
{
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| StagecueError::IpcConnection {
            message: format!("Failed to connect to daemon: {}", e),
        })?;

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let command_json = Command::Follow
        .to_json()
        .map_err(|e| StagecueError::IpcProtocol {
            message: format!("Failed to serialize command: {}", e),
        })?;
    writer
        .write_all(command_json.as_bytes())
        .await
        .map_err(|e| StagecueError::IpcConnection {
            message: format!("Failed to write command: {}", e),
        })?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| StagecueError::IpcConnection {
            message: format!("Failed to write newline: {}", e),
        })?;
    writer
        .flush()
        .await
        .map_err(|e| StagecueError::IpcConnection {
            message: format!("Failed to flush writer: {}", e),
        })?;

    loop {
        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| StagecueError::IpcConnection {
                message: format!("Failed to read event: {}", e),
            })?;
        if read == 0 {
            return Ok(());
        }

        match serde_json::from_str::<Event>(line.trim()) {
            Ok(event) => on_event(event),
            Err(e) => eprintln!("stagecue: malformed event from daemon: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::ipc::server::{CommandHandler, IpcServer};
    use crate::state;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct MockHandler;

    #[async_trait::async_trait]
    impl CommandHandler for MockHandler {
        async fn handle(&self, command: Command) -> Response {
            match command {
                Command::Start => Response::Ok {
                    message: "System started".to_string(),
                },
                Command::Play { cue_id } => Response::Error {
                    kind: crate::ipc::protocol::ErrorKind::NotFound,
                    message: format!("cue {cue_id} not found"),
                },
                _ => Response::Ok {
                    message: "ok".to_string(),
                },
            }
        }
    }

    async fn start_server(socket_path: std::path::PathBuf) -> Arc<IpcServer> {
        let server = Arc::new(IpcServer::new(
            socket_path,
            EventBus::default(),
            state::shared(vec![]),
        ));
        let task = Arc::clone(&server);
        tokio::spawn(async move { task.start(MockHandler).await });
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        server
    }

    #[tokio::test]
    async fn send_command_roundtrips() {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("test.sock");
        let server = start_server(socket_path.clone()).await;

        let response = send_command(&socket_path, Command::Start).await.unwrap();
        match response {
            Response::Ok { message } => assert_eq!(message, "System started"),
            other => panic!("unexpected response: {:?}", other),
        }

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn typed_errors_come_back_intact() {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("test.sock");
        let server = start_server(socket_path.clone()).await;

        let response = send_command(&socket_path, Command::Play { cue_id: 9 })
            .await
            .unwrap();
        match response {
            Response::Error { kind, message } => {
                assert_eq!(kind, crate::ipc::protocol::ErrorKind::NotFound);
                assert!(message.contains("cue 9"));
            }
            other => panic!("unexpected response: {:?}", other),
        }

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn connection_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("nonexistent.sock");

        let result = send_command(&socket_path, Command::Status).await;
        match result {
            Err(StagecueError::IpcConnection { message }) => {
                assert!(message.contains("Failed to connect to daemon"));
            }
            other => panic!("expected IpcConnection error, got {:?}", other.is_ok()),
        }
    }

    #[tokio::test]
    async fn sequential_commands_on_fresh_connections() {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("test.sock");
        let server = start_server(socket_path.clone()).await;

        for command in [Command::Start, Command::Stop, Command::Status] {
            let response = send_command(&socket_path, command).await.unwrap();
            assert!(matches!(response, Response::Ok { .. }));
        }

        server.stop().await.unwrap();
    }
}
