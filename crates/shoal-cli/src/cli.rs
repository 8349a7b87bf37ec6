//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Shoal CLI - managed Postgres on the Shoal fleet platform.
#[derive(Parser, Debug, Clone)]
#[command(name = "shoal")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control-plane API URL.
    #[arg(long, env = "SHOAL_API_URL", default_value = "http://api.shoal.internal")]
    pub api_url: String,

    /// Path to the local agent socket.
    #[arg(long, env = "SHOAL_AGENT_SOCKET")]
    pub agent_socket: Option<PathBuf>,

    /// Organization slug.
    #[arg(short = 'o', long, env = "SHOAL_ORG", default_value = "personal")]
    pub org: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Postgres cluster commands.
    Postgres {
        /// Postgres subcommand to execute.
        #[command(subcommand)]
        command: PostgresCommands,
    },
}

/// Postgres subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum PostgresCommands {
    /// Connect to the Postgres console on the cluster's primary.
    Connect(ConnectArgs),
}

/// Arguments for the connect command.
#[derive(Parser, Debug, Clone)]
pub struct ConnectArgs {
    /// Cluster name.
    #[arg(short = 'a', long, env = "SHOAL_APP")]
    pub app: String,

    /// The name of the database you would like to connect to.
    #[arg(short = 'd', long, default_value = "postgres")]
    pub database: String,

    /// The postgres user to connect with.
    #[arg(short = 'u', long, default_value = "postgres")]
    pub user: String,

    /// The postgres user password.
    #[arg(short = 'p', long)]
    pub password: Option<String>,
}
