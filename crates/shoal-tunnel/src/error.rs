//! Error types for tunnel, probe, and session operations.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for tunnel operations.
pub type Result<T> = std::result::Result<T, TunnelError>;

/// Errors that can occur while talking to the agent, probing members, or
/// running the interactive session.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// The local agent socket could not be reached.
    #[error("agent unreachable at {}: {source}", .path.display())]
    AgentUnreachable {
        /// Path to the agent socket.
        path: PathBuf,
        /// The underlying connection error.
        #[source]
        source: std::io::Error,
    },

    /// The agent processed the request and reported a failure.
    #[error("agent error: {message}")]
    Agent {
        /// The agent's error message.
        message: String,
    },

    /// The agent's reply could not be understood.
    #[error("agent protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Dialing a member address through the tunnel failed.
    #[error("dial failed for {addr}: {message}")]
    Dial {
        /// The member address being dialed.
        addr: SocketAddr,
        /// Reason for the failure.
        message: String,
    },

    /// The role probe against a member failed.
    #[error("role probe failed for {addr}: {message}")]
    Probe {
        /// The member address being probed.
        addr: SocketAddr,
        /// Reason for the failure.
        message: String,
    },

    /// The interactive session failed before or during transport.
    #[error("session failed: {message}")]
    Session {
        /// Reason for the failure.
        message: String,
    },

    /// The remote session ended with a non-zero exit status.
    #[error("remote session exited with status {code}")]
    SessionExit {
        /// The remote command's exit status.
        code: i32,
    },

    /// IO error (socket operations, stdio).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TunnelError {
    /// Creates an `AgentUnreachable` error.
    #[must_use]
    pub fn agent_unreachable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::AgentUnreachable {
            path: path.into(),
            source,
        }
    }

    /// Creates an `Agent` error with the agent's message.
    #[must_use]
    pub fn agent(message: impl Into<String>) -> Self {
        Self::Agent {
            message: message.into(),
        }
    }

    /// Creates a `Protocol` error.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a `Dial` error.
    #[must_use]
    pub fn dial(addr: SocketAddr, message: impl Into<String>) -> Self {
        Self::Dial {
            addr,
            message: message.into(),
        }
    }

    /// Creates a `Probe` error.
    #[must_use]
    pub fn probe(addr: SocketAddr, message: impl Into<String>) -> Self {
        Self::Probe {
            addr,
            message: message.into(),
        }
    }

    /// Creates a `Session` error.
    #[must_use]
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Creates a `SessionExit` error carrying the remote exit status.
    #[must_use]
    pub fn session_exit(code: i32) -> Self {
        Self::SessionExit { code }
    }

    /// Returns the remote exit status if this error carries one.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::SessionExit { code } => Some(*code),
            _ => None,
        }
    }

    /// Returns `true` if this error came out of the session transport.
    #[must_use]
    pub fn is_session(&self) -> bool {
        matches!(self, Self::Session { .. } | Self::SessionExit { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_unreachable_display() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = TunnelError::agent_unreachable("/var/run/shoal/agent.sock", io);
        assert_eq!(
            err.to_string(),
            "agent unreachable at /var/run/shoal/agent.sock: no such file"
        );
    }

    #[test]
    fn agent_display() {
        let err = TunnelError::agent("tunnel not configured for org acme");
        assert_eq!(err.to_string(), "agent error: tunnel not configured for org acme");
    }

    #[test]
    fn protocol_display() {
        let err = TunnelError::protocol("unexpected reply variant");
        assert_eq!(err.to_string(), "agent protocol error: unexpected reply variant");
    }

    #[test]
    fn dial_display() {
        let addr: SocketAddr = "10.0.0.1:5522".parse().ok().unwrap();
        let err = TunnelError::dial(addr, "connection refused");
        assert_eq!(err.to_string(), "dial failed for 10.0.0.1:5522: connection refused");
    }

    #[test]
    fn probe_display() {
        let addr: SocketAddr = "[fdaa::3]:5500".parse().ok().unwrap();
        let err = TunnelError::probe(addr, "status 503");
        assert_eq!(err.to_string(), "role probe failed for [fdaa::3]:5500: status 503");
    }

    #[test]
    fn session_exit_display_and_code() {
        let err = TunnelError::session_exit(42);
        assert_eq!(err.to_string(), "remote session exited with status 42");
        assert_eq!(err.exit_code(), Some(42));
        assert!(err.is_session());
    }

    #[test]
    fn exit_code_absent_for_other_errors() {
        assert_eq!(TunnelError::agent("x").exit_code(), None);
        assert!(!TunnelError::agent("x").is_session());
    }

    #[test]
    fn io_error_from_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe");
        let err: TunnelError = io.into();
        assert!(matches!(err, TunnelError::Io(_)));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TunnelError>();
    }
}
