//! CLI error types.

use std::fmt;

use shoal_cluster::ClusterError;
use shoal_tunnel::TunnelError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Invalid configuration (flags, URLs, environment).
    Config(String),
    /// Control-plane API request failed.
    Api(String),
    /// The requested cluster does not exist.
    ClusterNotFound(String),
    /// The requested cluster is not a Postgres cluster.
    NotPostgres(String),
    /// A pre-session step exceeded the connect deadline.
    Timeout(String),
    /// The operator interrupted the command before the session started.
    Interrupted,
    /// Leader discovery failed.
    Cluster(ClusterError),
    /// Tunnel, probe, or session failure.
    Tunnel(TunnelError),
    /// IO error.
    Io(std::io::Error),
}

impl CliError {
    /// Returns the process exit code this error should map to.
    ///
    /// A remote session that ended with a non-zero status propagates that
    /// status; every other failure exits 1.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        if let Self::Tunnel(err) = self {
            if let Some(code) = err.exit_code() {
                return u8::try_from(code).ok().filter(|c| *c != 0).unwrap_or(1);
            }
        }
        1
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Api(msg) => write!(f, "api error: {msg}"),
            Self::ClusterNotFound(name) => write!(f, "cluster not found: {name}"),
            Self::NotPostgres(name) => write!(f, "cluster {name} is not a postgres cluster"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::Cluster(e) => write!(f, "{e}"),
            Self::Tunnel(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cluster(e) => Some(e),
            Self::Tunnel(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ClusterError> for CliError {
    fn from(err: ClusterError) -> Self {
        Self::Cluster(err)
    }
}

impl From<TunnelError> for CliError {
    fn from(err: TunnelError) -> Self {
        Self::Tunnel(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
