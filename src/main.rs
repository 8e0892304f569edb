use anyhow::Result;
use clap::Parser;
use stagecue::cli::{Cli, Commands, CuesAction};
use stagecue::config::Config;
use stagecue::cue::Cue;
use stagecue::daemon::run_daemon;
use stagecue::events::Event;
use stagecue::ipc::client::{follow, send_command};
use stagecue::ipc::protocol::{Command, Response};
use stagecue::ipc::server::IpcServer;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon { input } => {
            let config = load_config(cli.config.as_deref())?;
            run_daemon(config, cli.socket, input, cli.quiet).await?;
        }
        Commands::Start => handle_ipc_command(cli.socket, Command::Start).await?,
        Commands::Stop => handle_ipc_command(cli.socket, Command::Stop).await?,
        Commands::Next => handle_ipc_command(cli.socket, Command::Next).await?,
        Commands::Previous => handle_ipc_command(cli.socket, Command::Previous).await?,
        Commands::Repeat => handle_ipc_command(cli.socket, Command::Repeat).await?,
        Commands::Play { cue_id } => {
            handle_ipc_command(cli.socket, Command::Play { cue_id }).await?;
        }
        Commands::Cues { action } => match action {
            CuesAction::List => handle_ipc_command(cli.socket, Command::ListCues).await?,
            CuesAction::Add { file } => {
                let cue = read_cue_file(&file)?;
                handle_ipc_command(cli.socket, Command::AddCue { cue }).await?;
            }
            CuesAction::Update { cue_id, file } => {
                let cue = read_cue_file(&file)?;
                handle_ipc_command(cli.socket, Command::UpdateCue { cue_id, cue }).await?;
            }
            CuesAction::Remove { cue_id } => {
                handle_ipc_command(cli.socket, Command::DeleteCue { cue_id }).await?;
            }
        },
        Commands::Status => handle_ipc_command(cli.socket, Command::Status).await?,
        Commands::History => handle_ipc_command(cli.socket, Command::History).await?,
        Commands::Follow => handle_follow(cli.socket).await?,
        Commands::Shutdown => handle_ipc_command(cli.socket, Command::Shutdown).await?,
    }

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/stagecue/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)?
    } else {
        Config::load_or_default(&Config::default_path())?
    };

    Ok(config.with_env_overrides())
}

fn read_cue_file(path: &Path) -> Result<Cue> {
    let contents = std::fs::read_to_string(path)?;
    let cue: Cue = serde_json::from_str(&contents)?;
    Ok(cue)
}

/// Send an IPC command to the daemon and print the response.
async fn handle_ipc_command(socket: Option<PathBuf>, command: Command) -> Result<()> {
    let socket_path = socket.unwrap_or_else(IpcServer::default_socket_path);

    match send_command(&socket_path, command).await {
        Ok(response) => {
            print_response(&response);
            if matches!(response, Response::Error { .. }) {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Failed to communicate with daemon: {e}");
            eprintln!("Is the daemon running? Start it with: stagecue daemon");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_response(response: &Response) {
    match response {
        Response::Ok { message } => println!("{message}"),
        Response::Cue { cue } => {
            println!("[{}] \"{}\" -> {}", cue.id, cue.source_text, cue.audio_reference);
        }
        Response::Cues { cues } => {
            if cues.is_empty() {
                println!("No cues configured");
                return;
            }
            for cue in cues {
                println!(
                    "[{}] \"{}\" (tokens: {}) -> {}",
                    cue.id,
                    cue.source_text,
                    cue.first_tokens.join(" "),
                    cue.audio_reference
                );
            }
        }
        Response::Status {
            running,
            recording,
            state,
            current_cue_index,
            last_played_cue_id,
            detections,
            matches,
            uptime_secs,
        } => {
            println!("Status:");
            println!("  State:      {state}");
            println!("  Running:    {}", if *running { "yes" } else { "no" });
            println!("  Recording:  {}", if *recording { "yes" } else { "no" });
            println!("  Cue index:  {current_cue_index}");
            match last_played_cue_id {
                Some(id) => println!("  Last cue:   {id}"),
                None => println!("  Last cue:   none"),
            }
            println!("  Detections: {detections}");
            println!("  Matches:    {matches}");
            if let Some(secs) = uptime_secs {
                println!("  Uptime:     {secs}s");
            }
        }
        Response::History { entries } => {
            if entries.is_empty() {
                println!("No transcripts yet");
                return;
            }
            for entry in entries {
                match entry.matched_cue {
                    Some(cue_id) => {
                        println!("#{} \"{}\" -> cue {}", entry.id, entry.text, cue_id)
                    }
                    None => println!("#{} \"{}\"", entry.id, entry.text),
                }
            }
        }
        Response::Error { kind, message } => {
            eprintln!("Error ({kind:?}): {message}");
        }
    }
}

/// Follow daemon events and render them live.
async fn handle_follow(socket: Option<PathBuf>) -> Result<()> {
    let socket_path = socket.unwrap_or_else(IpcServer::default_socket_path);

    println!("Following daemon events... (Ctrl+C to stop)");

    match follow(&socket_path, render_event).await {
        Ok(()) => println!("Daemon connection closed"),
        Err(e) => {
            eprintln!("Failed to follow daemon: {e}");
            eprintln!("Is the daemon running? Start it with: stagecue daemon");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn render_event(event: Event) {
    match event {
        Event::CuesUpdated { cues } => println!("[cues] {} cues in table", cues.len()),
        Event::SystemStatus { status, message } => println!("[status] {status}: {message}"),
        Event::SystemError { error } => println!("[error] {error}"),
        Event::TranscriptionDetected { entry } => println!("[heard] \"{}\"", entry.text),
        Event::CueMatched { cue, transcript, .. } => {
            println!("[match] cue {} on \"{}\"", cue.id, transcript)
        }
        Event::AudioPlaying { file, .. } => println!("[audio] playing {file}"),
        Event::AudioFinished { file, .. } => println!("[audio] finished {file}"),
    }
}
