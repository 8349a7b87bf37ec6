//! Client for the local Shoal agent.
//!
//! The agent runs on the operator's machine, owns the private-network
//! tunnel, and exposes a unix-socket API: newline-delimited JSON request,
//! one JSON reply line, and (for dials) the socket then becomes the proxied
//! byte stream. The tunnel's cryptographic handshake lives entirely inside
//! the agent; this client treats it as opaque.

use std::net::IpAddr;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::debug;

use shoal_cluster::{MembershipDirectory, SourceError};

use crate::dialer::AgentDialer;
use crate::error::{Result, TunnelError};

/// Default agent socket path.
pub const DEFAULT_AGENT_SOCKET: &str = "/var/run/shoal/agent.sock";

/// Requests understood by the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum AgentRequest {
    /// Bring up (or reuse) the tunnel for an organization.
    Establish { org: String },
    /// List the private addresses the directory knows for a cluster.
    Instances { org: String, cluster: String },
    /// Proxy a TCP stream to a private member address.
    Dial { org: String, addr: SocketAddr },
}

/// Replies sent by the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum AgentReply {
    /// Request succeeded with no payload.
    Ok,
    /// Directory listing for an `Instances` request.
    Instances { addresses: Vec<IpAddr> },
    /// Request failed.
    Error { message: String },
}

/// Writes one request line to the agent.
pub(crate) async fn send_request<S>(stream: &mut S, request: &AgentRequest) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(request)
        .map_err(|e| TunnelError::protocol(format!("could not encode request: {e}")))?;
    line.push(b'\n');
    stream.write_all(&line).await?;
    stream.flush().await?;
    Ok(())
}

/// Reads one reply line from the agent.
///
/// Reads byte-by-byte up to the newline so that, after a `Dial` reply, no
/// proxied stream bytes are consumed from the socket.
pub(crate) async fn read_reply<S>(stream: &mut S) -> Result<AgentReply>
where
    S: AsyncRead + Unpin,
{
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = stream.read(&mut byte).await?;
        if n == 0 {
            return Err(TunnelError::protocol("agent closed the connection mid-reply"));
        }
        if byte[0] == b'\n' {
            break;
        }
        line.push(byte[0]);
        if line.len() > 64 * 1024 {
            return Err(TunnelError::protocol("agent reply exceeds 64KiB"));
        }
    }
    serde_json::from_slice(&line)
        .map_err(|e| TunnelError::protocol(format!("could not decode reply: {e}")))
}

/// Client for the local agent's unix-socket API.
#[derive(Debug, Clone)]
pub struct AgentClient {
    socket_path: PathBuf,
}

impl AgentClient {
    /// Creates a client against the default socket path.
    #[must_use]
    pub fn new() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_AGENT_SOCKET),
        }
    }

    /// Creates a client against a custom socket path.
    #[must_use]
    pub fn with_socket_path(path: impl AsRef<Path>) -> Self {
        Self {
            socket_path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the socket path this client talks to.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Establishes (or reuses) the tunnel for an organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the agent is unreachable or refuses the request.
    pub async fn establish(&self, org: impl Into<String>) -> Result<TunnelHandle> {
        let org = org.into();
        let request = AgentRequest::Establish { org: org.clone() };
        let mut stream = self.connect().await?;
        send_request(&mut stream, &request).await?;
        match read_reply(&mut stream).await? {
            AgentReply::Ok => {
                debug!(%org, "tunnel established");
                Ok(TunnelHandle {
                    socket_path: self.socket_path.clone(),
                    org,
                })
            }
            AgentReply::Error { message } => Err(TunnelError::agent(message)),
            other => Err(TunnelError::protocol(format!(
                "unexpected reply to establish: {other:?}"
            ))),
        }
    }

    async fn connect(&self) -> Result<UnixStream> {
        UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| TunnelError::agent_unreachable(self.socket_path.clone(), e))
    }
}

impl Default for AgentClient {
    fn default() -> Self {
        Self::new()
    }
}

/// An established tunnel, bound to one organization.
///
/// The handle does not hold the socket open; each operation opens a fresh
/// connection to the agent, which multiplexes them over the one tunnel it
/// maintains.
#[derive(Debug, Clone)]
pub struct TunnelHandle {
    socket_path: PathBuf,
    org: String,
}

impl TunnelHandle {
    /// Returns the organization this tunnel is bound to.
    #[must_use]
    pub fn org(&self) -> &str {
        &self.org
    }

    /// Returns a dialer that proxies TCP streams through this tunnel.
    #[must_use]
    pub fn dialer(&self) -> AgentDialer {
        AgentDialer::new(self.socket_path.clone(), self.org.clone())
    }

    /// Lists the private addresses the directory knows for a cluster.
    ///
    /// Best-effort: the agent omits addresses with no reachable response.
    ///
    /// # Errors
    ///
    /// Returns an error if the agent is unreachable or the query fails.
    pub async fn instances(&self, cluster: &str) -> Result<Vec<IpAddr>> {
        self.list_instances(&self.org, cluster).await
    }

    async fn list_instances(&self, org: &str, cluster: &str) -> Result<Vec<IpAddr>> {
        let request = AgentRequest::Instances {
            org: org.to_string(),
            cluster: cluster.to_string(),
        };
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| TunnelError::agent_unreachable(self.socket_path.clone(), e))?;
        send_request(&mut stream, &request).await?;
        match read_reply(&mut stream).await? {
            AgentReply::Instances { addresses } => Ok(addresses),
            AgentReply::Error { message } => Err(TunnelError::agent(message)),
            other => Err(TunnelError::protocol(format!(
                "unexpected reply to instances: {other:?}"
            ))),
        }
    }
}

impl MembershipDirectory for TunnelHandle {
    fn list_addresses(
        &self,
        org: &str,
        cluster: &str,
    ) -> impl Future<Output = std::result::Result<Vec<IpAddr>, SourceError>> + Send {
        async move {
            self.list_instances(org, cluster)
                .await
                .map_err(|e| -> SourceError { Box::new(e) })
        }
    }
}
