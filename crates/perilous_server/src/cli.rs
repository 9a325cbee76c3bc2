//! Command-line interface for perilous.

use clap::{Parser, Subcommand};
use perilous_rules::Difficulty;
use std::path::PathBuf;

/// Perilous - survive the scenario, solve the phrase
#[derive(Parser, Debug)]
#[command(name = "perilous")]
#[command(about = "Multiplayer elimination party game server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML config file; defaults apply when it is missing
    #[arg(short, long, default_value = "perilous.toml", global = true)]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP game server
    Serve {
        /// Port to bind to, overriding the config file
        #[arg(short, long)]
        port: Option<u16>,

        /// Serve fallback content only, never calling a model
        #[arg(long)]
        offline: bool,
    },

    /// Play an all-bot game in-process and print the turn log
    Simulate {
        /// Number of bots
        #[arg(short, long, default_value = "3")]
        bots: usize,

        /// Puzzle difficulty
        #[arg(short, long, default_value = "medium")]
        difficulty: Difficulty,

        /// Seed for verdict rolls
        #[arg(long)]
        seed: Option<u64>,

        /// Use fallback content only, never calling a model
        #[arg(long)]
        offline: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulate_args() {
        let cli = Cli::parse_from([
            "perilous",
            "simulate",
            "--bots",
            "4",
            "--difficulty",
            "very-hard",
            "--offline",
        ]);
        match cli.command {
            Command::Simulate {
                bots,
                difficulty,
                seed,
                offline,
            } => {
                assert_eq!(bots, 4);
                assert_eq!(difficulty, Difficulty::VeryHard);
                assert_eq!(seed, None);
                assert!(offline);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::parse_from(["perilous", "serve"]);
        assert_eq!(cli.config, PathBuf::from("perilous.toml"));
        assert!(matches!(
            cli.command,
            Command::Serve {
                port: None,
                offline: false
            }
        ));
    }
}
