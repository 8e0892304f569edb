//! Async Unix socket IPC server for daemon control.
//!
//! One JSON command per connection, answered with one JSON response; a
//! `follow` command instead turns the connection into an event stream of
//! JSON lines, primed with a cue-table snapshot.

use crate::error::{Result, StagecueError};
use crate::events::{Event, EventBus};
use crate::ipc::protocol::{Command, Response};
use crate::state::SharedState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;

/// Handler trait for processing IPC commands.
#[async_trait::async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handle a command and return a response.
    async fn handle(&self, command: Command) -> Response;
}

/// State for managing server shutdown.
#[derive(Debug, Clone)]
struct ServerState {
    shutdown: Arc<Mutex<bool>>,
}

impl ServerState {
    fn new() -> Self {
        Self {
            shutdown: Arc::new(Mutex::new(false)),
        }
    }

    async fn is_shutdown(&self) -> bool {
        *self.shutdown.lock().await
    }

    async fn set_shutdown(&self) {
        *self.shutdown.lock().await = true;
    }
}

/// IPC server for handling daemon control commands via Unix socket.
pub struct IpcServer {
    socket_path: PathBuf,
    state: ServerState,
    bus: EventBus,
    show_state: SharedState,
}

impl IpcServer {
    /// Create a new IPC server bound to the specified socket path.
    pub fn new(socket_path: PathBuf, bus: EventBus, show_state: SharedState) -> Self {
        Self {
            socket_path,
            state: ServerState::new(),
            bus,
            show_state,
        }
    }

    /// Get the socket path this server is using.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Get the default socket path based on XDG_RUNTIME_DIR or fallback.
    pub fn default_socket_path() -> PathBuf {
        if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
            PathBuf::from(xdg_runtime).join("stagecue.sock")
        } else {
            let uid = unsafe { libc::getuid() };
            PathBuf::from(format!("/tmp/stagecue-{}.sock", uid))
        }
    }

    /// Start the IPC server and handle incoming connections.
    ///
    /// Returns once shutdown is requested, either via [`IpcServer::stop`]
    /// or a `shutdown` command from a client.
    pub async fn start<H>(&self, handler: H) -> Result<()>
    where
        H: CommandHandler + 'static,
    {
        // Clean up any existing socket file
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| StagecueError::IpcSocket {
                message: format!("Failed to remove existing socket: {}", e),
            })?;
        }

        let listener =
            UnixListener::bind(&self.socket_path).map_err(|e| StagecueError::IpcSocket {
                message: format!("Failed to bind to socket: {}", e),
            })?;

        let handler = Arc::new(handler);

        loop {
            if self.state.is_shutdown().await {
                break;
            }

            // Accept with timeout so the shutdown flag is rechecked.
            let accept_result =
                tokio::time::timeout(tokio::time::Duration::from_millis(100), listener.accept())
                    .await;

            match accept_result {
                Ok(Ok((stream, _))) => {
                    let handler = Arc::clone(&handler);
                    let server_state = self.state.clone();
                    let bus = self.bus.clone();
                    let show_state = self.show_state.clone();
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_client(stream, handler, server_state, bus, show_state).await
                        {
                            eprintln!("stagecue: error handling client: {}", e);
                        }
                    });
                }
                Ok(Err(e)) => {
                    return Err(StagecueError::IpcConnection {
                        message: format!("Failed to accept connection: {}", e),
                    });
                }
                Err(_) => {
                    // Timeout, loop around to recheck shutdown
                    continue;
                }
            }
        }

        Ok(())
    }

    /// Stop the IPC server and clean up the socket file.
    pub async fn stop(&self) -> Result<()> {
        self.state.set_shutdown().await;

        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| StagecueError::IpcSocket {
                message: format!("Failed to remove socket file: {}", e),
            })?;
        }

        Ok(())
    }
}

/// Handle a single client connection.
async fn handle_client<H>(
    stream: UnixStream,
    handler: Arc<H>,
    server_state: ServerState,
    bus: EventBus,
    show_state: SharedState,
) -> Result<()>
where
    H: CommandHandler,
{
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    // Read command (one line JSON)
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .await
        .map_err(|e| StagecueError::IpcConnection {
            message: format!("Failed to read command: {}", e),
        })?;

    let command = match Command::from_json(line.trim()) {
        Ok(command) => command,
        Err(e) => {
            let response = Response::Error {
                kind: crate::ipc::protocol::ErrorKind::Internal,
                message: format!("invalid command: {}", e),
            };
            write_json_line(&mut writer, &response.to_json().unwrap_or_default()).await?;
            return Ok(());
        }
    };

    if command == Command::Follow {
        return stream_events(&mut writer, bus, show_state).await;
    }

    let is_shutdown = command == Command::Shutdown;
    let response = handler.handle(command).await;
    let json = response.to_json().map_err(|e| StagecueError::IpcProtocol {
        message: format!("Failed to serialize response: {}", e),
    })?;
    write_json_line(&mut writer, &json).await?;

    if is_shutdown {
        server_state.set_shutdown().await;
    }

    Ok(())
}

/// Forward bus events to a follow client until it disconnects.
async fn stream_events(
    writer: &mut tokio::net::unix::OwnedWriteHalf,
    bus: EventBus,
    show_state: SharedState,
) -> Result<()> {
    // Subscribe before the snapshot so nothing falls in the gap.
    let mut rx = bus.subscribe();

    let snapshot = {
        let state = show_state
            .lock()
            .map_err(|_| StagecueError::Other("show state lock poisoned".to_string()))?;
        Event::CuesUpdated {
            cues: state.cues.clone(),
        }
    };
    let json = serde_json::to_string(&snapshot).map_err(|e| StagecueError::IpcProtocol {
        message: format!("Failed to serialize event: {}", e),
    })?;
    write_json_line(writer, &json).await?;

    loop {
        match rx.recv().await {
            Ok(event) => {
                let json =
                    serde_json::to_string(&event).map_err(|e| StagecueError::IpcProtocol {
                        message: format!("Failed to serialize event: {}", e),
                    })?;
                if write_json_line(writer, &json).await.is_err() {
                    // Client went away
                    return Ok(());
                }
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                // Slow client: skip what was missed and keep following.
                continue;
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                return Ok(());
            }
        }
    }
}

async fn write_json_line(
    writer: &mut tokio::net::unix::OwnedWriteHalf,
    json: &str,
) -> Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| StagecueError::IpcConnection {
            message: format!("Failed to write response: {}", e),
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
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::client::send_command;
    use crate::state;
    use tempfile::TempDir;

    struct MockHandler;

    #[async_trait::async_trait]
    impl CommandHandler for MockHandler {
        async fn handle(&self, command: Command) -> Response {
            match command {
                Command::Status => Response::Status {
                    running: false,
                    recording: false,
                    state: "stopped".to_string(),
                    current_cue_index: -1,
                    last_played_cue_id: None,
                    detections: 0,
                    matches: 0,
                    uptime_secs: None,
                },
                _ => Response::Ok {
                    message: "ok".to_string(),
                },
            }
        }
    }

    fn spawn_server(socket_path: PathBuf) -> (EventBus, Arc<IpcServer>) {
        let bus = EventBus::default();
        let server = Arc::new(IpcServer::new(socket_path, bus.clone(), state::shared(vec![])));
        let server_task = Arc::clone(&server);
        tokio::spawn(async move { server_task.start(MockHandler).await });
        (bus, server)
    }

    #[tokio::test]
    async fn responds_to_status_command() {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("test.sock");
        let (_bus, server) = spawn_server(socket_path.clone());

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let response = send_command(&socket_path, Command::Status).await.unwrap();
        match response {
            Response::Status { running, state, .. } => {
                assert!(!running);
                assert_eq!(state, "stopped");
            }
            other => panic!("Expected Status response, got: {:?}", other),
        }

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_command_stops_the_server() {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("test.sock");

        let bus = EventBus::default();
        let server = Arc::new(IpcServer::new(
            socket_path.clone(),
            bus,
            state::shared(vec![]),
        ));
        let server_task = Arc::clone(&server);
        let handle = tokio::spawn(async move { server_task.start(MockHandler).await });

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let response = send_command(&socket_path, Command::Shutdown).await.unwrap();
        assert!(matches!(response, Response::Ok { .. }));

        // The accept loop notices the flag and exits.
        let result = tokio::time::timeout(tokio::time::Duration::from_secs(2), handle).await;
        assert!(result.is_ok(), "server did not stop after shutdown command");
    }

    #[tokio::test]
    async fn invalid_json_gets_a_typed_error_response() {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("test.sock");
        let (_bus, server) = spawn_server(socket_path.clone());

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let stream = UnixStream::connect(&socket_path).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        writer.write_all(b"this is not json\n").await.unwrap();
        writer.flush().await.unwrap();

        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();

        let response = Response::from_json(line.trim()).unwrap();
        assert!(matches!(response, Response::Error { .. }));

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn follow_streams_snapshot_then_events() {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("test.sock");
        let (bus, server) = spawn_server(socket_path.clone());

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let stream = UnixStream::connect(&socket_path).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        writer
            .write_all(Command::Follow.to_json().unwrap().as_bytes())
            .await
            .unwrap();
        writer.write_all(b"\n").await.unwrap();
        writer.flush().await.unwrap();

        let mut reader = BufReader::new(reader);

        // First line is always the cue snapshot.
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let event: Event = serde_json::from_str(line.trim()).unwrap();
        assert!(matches!(event, Event::CuesUpdated { .. }));

        // Published events follow.
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        bus.publish(Event::SystemStatus {
            status: "started".to_string(),
            message: "x".to_string(),
        });

        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let event: Event = serde_json::from_str(line.trim()).unwrap();
        assert!(matches!(event, Event::SystemStatus { .. }));

        server.stop().await.unwrap();
    }

    #[test]
    fn default_socket_path_is_stable() {
        let path = IpcServer::default_socket_path();
        assert!(path.to_string_lossy().contains("stagecue"));
    }
}
