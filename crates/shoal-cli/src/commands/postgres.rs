//! Postgres command implementation.
//!
//! `connect` orchestrates the whole flow: cluster lookup and type check,
//! tunnel establishment, leader discovery, then handoff to the interactive
//! console session. Every check runs before terminal takeover; the session
//! starts only once the flow cannot fail locally anymore.

use std::path::PathBuf;

use tokio::time::timeout;
use tracing::info;

use shoal_cluster::{Member, discover_leader};
use shoal_tunnel::{
    AgentClient, AgentDialer, FramedShellTransport, HttpRoleProbe, SessionCommand, launch_session,
};

use crate::cli::{ConnectArgs, PostgresCommands};
use crate::client::PlatformClient;
use crate::config::ConnectConfig;
use crate::error::CliError;

/// Postgres command executor.
pub struct PostgresCommand {
    api_url: String,
    agent_socket: Option<PathBuf>,
    org: String,
    config: ConnectConfig,
}

impl PostgresCommand {
    /// Creates a new postgres command.
    #[must_use]
    pub fn new(api_url: impl Into<String>, agent_socket: Option<PathBuf>, org: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            agent_socket,
            org: org.into(),
            config: ConnectConfig::default(),
        }
    }

    /// Overrides the connect configuration.
    #[must_use]
    pub fn with_config(mut self, config: ConnectConfig) -> Self {
        self.config = config;
        self
    }

    /// Executes a postgres subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    pub async fn execute(&self, command: &PostgresCommands) -> Result<(), CliError> {
        match command {
            PostgresCommands::Connect(args) => self.connect(args).await,
        }
    }

    /// Connects to the Postgres console on the cluster's primary.
    ///
    /// # Errors
    ///
    /// Returns an error if any pre-session step fails or the remote
    /// session ends with a non-zero status.
    pub async fn connect(&self, args: &ConnectArgs) -> Result<(), CliError> {
        // Everything before terminal takeover runs under one deadline and
        // can be interrupted with Ctrl-C.
        let prepared = tokio::select! {
            result = timeout(self.config.connect_timeout, self.prepare_session(args)) => {
                result.map_err(|_| {
                    CliError::Timeout(format!(
                        "connection setup did not complete within {}s",
                        self.config.connect_timeout.as_secs()
                    ))
                })??
            }
            _ = tokio::signal::ctrl_c() => return Err(CliError::Interrupted),
        };

        let PreparedSession { transport, leader, command } = prepared;
        launch_session(&transport, leader.addr, self.config.session_port, command).await?;
        Ok(())
    }

    async fn prepare_session(&self, args: &ConnectArgs) -> Result<PreparedSession, CliError> {
        let platform = PlatformClient::new(&self.api_url)?;
        let cluster = platform.get_cluster(&self.org, &args.app).await?;
        if !cluster.is_postgres() {
            return Err(CliError::NotPostgres(args.app.clone()));
        }

        let agent = match &self.agent_socket {
            Some(path) => AgentClient::with_socket_path(path),
            None => AgentClient::new(),
        };
        let tunnel = agent.establish(cluster.org.clone()).await?;
        let dialer = tunnel.dialer();
        let probe = HttpRoleProbe::new(dialer.clone()).with_port(self.config.management_port);

        let leader =
            discover_leader(&cluster, &self.config.requirement, &tunnel, &platform, &probe)
                .await?;
        info!(cluster = %cluster.name, leader = %leader.addr, "opening console session");

        let command = SessionCommand::postgres_connect(
            &args.database,
            &args.user,
            args.password.as_deref().unwrap_or(""),
        );
        Ok(PreparedSession {
            transport: FramedShellTransport::new(dialer),
            leader,
            command,
        })
    }
}

/// Everything resolved before terminal takeover.
struct PreparedSession {
    transport: FramedShellTransport<AgentDialer>,
    leader: Member,
    command: SessionCommand,
}
