//! Command-line configuration of the learn client.
//!
//! Flags fall back to environment variables, so a `.env` file next to the
//! binary is enough to point a worker at a server.

use std::path::PathBuf;
use std::time::Duration;

use book_core::level::{Level, MIN_LEARN_LEVEL};
use clap::{Args, Parser, Subcommand};

use crate::error::EngineError;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Searches opening book positions handed out by the book server"
)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch jobs from the server and search them until killed
    Learn(LearnArgs),
    /// Evaluate every missing savable position up to a disc count
    Seed(SeedArgs),
}

#[derive(Args, Debug)]
pub struct ServerArgs {
    /// Base URL of the book server
    #[arg(long, env = "BOOK_SERVER_URL", default_value = "http://localhost:3000")]
    pub server_url: String,

    /// Shared secret sent in the x-token header
    #[arg(long, env = "BOOK_TOKEN")]
    pub token: String,
}

#[derive(Args, Debug)]
pub struct EngineArgs {
    /// Command for the engine (program path and arguments)
    #[arg(long, env = "EDAX_COMMAND")]
    pub engine: String,

    /// Working directory for the engine, defaults to the program's directory
    #[arg(long, env = "EDAX_WORKING_DIR")]
    pub engine_working_dir: Option<PathBuf>,

    /// Threads the engine may use
    #[arg(long, env = "EDAX_CORES", default_value_t = num_cpus::get())]
    pub cores: usize,

    /// Milliseconds to wait for engine output before polling again
    #[arg(long, default_value_t = 500)]
    pub poll_millis: u64,
}

#[derive(Args, Debug)]
pub struct LearnArgs {
    #[command(flatten)]
    pub server: ServerArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Build identifier reported when registering
    #[arg(long, env = "BUILD_ID", default_value = env!("CARGO_PKG_VERSION"))]
    pub build_id: String,

    /// Seconds between heartbeats
    #[arg(long, default_value_t = 60)]
    pub heartbeat_secs: u64,

    /// Seconds to sleep when the server has no job
    #[arg(long, default_value_t = 10)]
    pub idle_secs: u64,
}

#[derive(Args, Debug)]
pub struct SeedArgs {
    #[command(flatten)]
    pub server: ServerArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Largest disc count to fill in
    #[arg(long)]
    pub discs: u32,

    /// Level used for missing positions
    #[arg(long, default_value_t = MIN_LEARN_LEVEL)]
    pub level: Level,
}

impl Config {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl EngineArgs {
    /// Splits the engine command into program and arguments.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyCommand`] if the command names no program.
    pub fn command(&self) -> Result<(String, Vec<String>), EngineError> {
        let (program, args) = parse_command(&self.engine);
        if program.is_empty() {
            return Err(EngineError::EmptyCommand);
        }
        Ok((program, args))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_millis)
    }
}

/// Parse a command string using shell-like rules.
fn parse_command(cmd: &str) -> (String, Vec<String>) {
    match shlex::split(cmd) {
        Some(parts) if !parts.is_empty() => (parts[0].clone(), parts[1..].to_vec()),
        _ => {
            // Unbalanced quotes: fall back to whitespace splitting.
            let mut parts = cmd.split_whitespace().map(str::to_string);
            let program = parts.next().unwrap_or_default();
            (program, parts.collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command("./bin/edax -n 4 -eval-file 'data/eval 2.dat'"),
            (
                "./bin/edax".to_string(),
                vec![
                    "-n".to_string(),
                    "4".to_string(),
                    "-eval-file".to_string(),
                    "data/eval 2.dat".to_string()
                ]
            )
        );
        assert_eq!(parse_command("edax \"unclosed"), ("edax".to_string(), vec!["\"unclosed".to_string()]));
        assert_eq!(parse_command("   "), (String::new(), Vec::new()));
    }

    #[test]
    fn test_seed_args() {
        let config = Config::try_parse_from([
            "learn-client",
            "seed",
            "--token",
            "t",
            "--engine",
            "edax",
            "--discs",
            "8",
        ])
        .unwrap();
        let Command::Seed(args) = config.command else {
            panic!("expected seed");
        };
        assert_eq!(args.discs, 8);
        assert_eq!(args.level, MIN_LEARN_LEVEL);
        assert_eq!(args.engine.command().unwrap().0, "edax");
        assert!(args.engine.cores >= 1);
    }
}
