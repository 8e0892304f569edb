//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Voice-triggered audio dubbing for live theatre.
#[derive(Parser, Debug)]
#[command(name = "stagecue", version, about)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the daemon IPC socket
    #[arg(long, global = true)]
    pub socket: Option<PathBuf>,

    /// Suppress status messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the show daemon
    Daemon {
        /// Drive the pipeline from a WAV file instead of the microphone
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Start the show pipeline
    Start,
    /// Stop the show pipeline
    Stop,
    /// Advance to the next cue and play it
    Next,
    /// Step back to the previous cue and play it
    Previous,
    /// Replay the last played cue
    Repeat,
    /// Play a cue by id
    Play {
        /// Cue id
        cue_id: u64,
    },
    /// Manage the cue table
    Cues {
        #[command(subcommand)]
        action: CuesAction,
    },
    /// Show run status and counters
    Status,
    /// Show the transcript history
    History,
    /// Follow daemon events live
    Follow,
    /// Shut down the daemon
    Shutdown,
}

#[derive(Subcommand, Debug)]
pub enum CuesAction {
    /// List all cues in table order
    List,
    /// Add a cue from a JSON file
    Add {
        /// Path to a JSON file holding one cue object
        file: PathBuf,
    },
    /// Replace a cue from a JSON file
    Update {
        /// Cue id to replace
        cue_id: u64,
        /// Path to a JSON file holding one cue object
        file: PathBuf,
    },
    /// Remove a cue by id
    Remove {
        /// Cue id
        cue_id: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_daemon_with_input() {
        let cli = Cli::parse_from(["stagecue", "daemon", "--input", "show.wav"]);
        match cli.command {
            Commands::Daemon { input } => {
                assert_eq!(input, Some(PathBuf::from("show.wav")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parses_play_with_cue_id() {
        let cli = Cli::parse_from(["stagecue", "play", "7"]);
        match cli.command {
            Commands::Play { cue_id } => assert_eq!(cue_id, 7),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parses_cue_management() {
        let cli = Cli::parse_from(["stagecue", "cues", "remove", "3"]);
        match cli.command {
            Commands::Cues {
                action: CuesAction::Remove { cue_id },
            } => assert_eq!(cue_id, 3),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn global_flags_apply_to_subcommands() {
        let cli = Cli::parse_from(["stagecue", "status", "--socket", "/tmp/x.sock", "-q"]);
        assert_eq!(cli.socket, Some(PathBuf::from("/tmp/x.sock")));
        assert!(cli.quiet);
    }
}
