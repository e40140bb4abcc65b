//! Command-line configuration of the book server.
//!
//! Every flag can also be given through the environment, and `main` loads a
//! `.env` file first so deployments can keep the secrets out of the command line.

use std::net::SocketAddr;

use chrono::TimeDelta;
use clap::{Args, Parser, Subcommand};

use crate::api::AuthConfig;
use crate::state::SchedulerConfig;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Coordinates learn clients that extend the opening book"
)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Print the number of stored positions per disc count and level
    Stats(DatabaseArgs),
}

#[derive(Args, Debug)]
pub struct DatabaseArgs {
    /// SQLite database holding the book
    #[arg(long, env = "BOOK_DATABASE_URL", default_value = "sqlite://book.db")]
    pub database_url: String,

    /// Maximum number of pooled database connections
    #[arg(long, env = "BOOK_MAX_CONNECTIONS", default_value_t = 8)]
    pub max_connections: u32,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "BOOK_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Shared secret expected in the x-token header
    #[arg(long, env = "BOOK_TOKEN")]
    pub token: String,

    /// User name for the statistics endpoints
    #[arg(long, env = "BOOK_STATS_USER", default_value = "admin")]
    pub stats_user: String,

    /// Password for the statistics endpoints
    #[arg(long, env = "BOOK_STATS_PASSWORD")]
    pub stats_password: String,

    /// Seconds without contact before a client is dropped
    #[arg(
        long,
        env = "BOOK_INACTIVITY_TIMEOUT_SECS",
        default_value_t = 300,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub inactivity_timeout_secs: u32,

    /// Minimum seconds between two sweeps for silent clients
    #[arg(
        long,
        env = "BOOK_PRUNE_INTERVAL_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub prune_interval_secs: u32,

    /// Minimum seconds between two scans for work at lower disc counts
    #[arg(
        long,
        env = "BOOK_RESCAN_INTERVAL_SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub rescan_interval_secs: u32,
}

impl Config {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl ServeArgs {
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            inactivity_timeout: TimeDelta::seconds(i64::from(self.inactivity_timeout_secs)),
            prune_interval: TimeDelta::seconds(i64::from(self.prune_interval_secs)),
            rescan_interval: TimeDelta::seconds(i64::from(self.rescan_interval_secs)),
        }
    }

    pub fn auth(&self) -> AuthConfig {
        AuthConfig {
            token: self.token.clone(),
            stats_user: self.stats_user.clone(),
            stats_password: self.stats_password.clone(),
        }
    }
}
