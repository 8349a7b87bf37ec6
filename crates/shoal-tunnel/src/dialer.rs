//! Dialing member addresses through the tunnel.

use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;
use tracing::trace;

use crate::agent::{AgentReply, AgentRequest, read_reply, send_request};
use crate::error::{Result, TunnelError};

/// Default management port members listen on for role queries.
pub const DEFAULT_MANAGEMENT_PORT: u16 = 5500;

/// Default port members expose the interactive shell service on.
pub const DEFAULT_SESSION_PORT: u16 = 5522;

/// Capability to open a byte stream to a private member address.
pub trait Dial: Send + Sync {
    /// Stream type produced by a successful dial.
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Opens a stream to the given member address.
    fn dial(&self, addr: SocketAddr) -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// Dialer that proxies streams through the local agent's tunnel.
///
/// Each dial opens a fresh agent connection; after the agent acknowledges
/// the dial, the unix socket carries the proxied bytes verbatim.
#[derive(Debug, Clone)]
pub struct AgentDialer {
    socket_path: PathBuf,
    org: String,
}

impl AgentDialer {
    /// Creates a dialer bound to an organization's tunnel.
    #[must_use]
    pub fn new(socket_path: PathBuf, org: String) -> Self {
        Self { socket_path, org }
    }

    /// Returns the organization this dialer routes for.
    #[must_use]
    pub fn org(&self) -> &str {
        &self.org
    }

    async fn dial_inner(&self, addr: SocketAddr) -> Result<UnixStream> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| TunnelError::agent_unreachable(self.socket_path.clone(), e))?;
        let request = AgentRequest::Dial {
            org: self.org.clone(),
            addr,
        };
        send_request(&mut stream, &request).await?;
        match read_reply(&mut stream).await? {
            AgentReply::Ok => {
                trace!(%addr, "dial established");
                Ok(stream)
            }
            AgentReply::Error { message } => Err(TunnelError::dial(addr, message)),
            other => Err(TunnelError::protocol(format!(
                "unexpected reply to dial: {other:?}"
            ))),
        }
    }
}

impl Dial for AgentDialer {
    type Stream = UnixStream;

    fn dial(&self, addr: SocketAddr) -> impl Future<Output = Result<Self::Stream>> + Send {
        self.dial_inner(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn dialer_carries_org() {
        let dialer = AgentDialer::new(PathBuf::from("/tmp/agent.sock"), "acme".to_string());
        assert_eq!(dialer.org(), "acme");
    }

    #[tokio::test]
    async fn dial_fails_when_agent_absent() {
        let dialer = AgentDialer::new(
            PathBuf::from("/nonexistent/shoal-agent.sock"),
            "acme".to_string(),
        );
        let addr: SocketAddr = "10.0.0.1:5500".parse().ok().unwrap();
        let err = dialer.dial(addr).await.err().unwrap();
        assert!(matches!(err, TunnelError::AgentUnreachable { .. }));
    }

    #[tokio::test]
    async fn dial_yields_proxied_stream_after_ack() {
        let dir = std::env::temp_dir().join(format!("shoal-dial-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("dial.sock");
        let _ = std::fs::remove_file(&path);

        let listener = tokio::net::UnixListener::bind(&path).ok().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.ok().unwrap();
            let mut line = Vec::new();
            let mut byte = [0u8; 1];
            loop {
                let n = stream.read(&mut byte).await.ok().unwrap();
                if n == 0 || byte[0] == b'\n' {
                    break;
                }
                line.push(byte[0]);
            }
            let request: AgentRequest = serde_json::from_slice(&line).ok().unwrap();
            assert!(matches!(request, AgentRequest::Dial { .. }));
            // Acknowledge, then behave as the proxied remote end.
            stream.write_all(b"{\"type\":\"ok\"}\nhello from member").await.ok().unwrap();
        });

        let dialer = AgentDialer::new(path.clone(), "acme".to_string());
        let addr: SocketAddr = "10.0.0.7:5500".parse().ok().unwrap();
        let mut stream = dialer.dial(addr).await.ok().unwrap();

        let mut greeting = Vec::new();
        stream.read_to_end(&mut greeting).await.ok().unwrap();
        assert_eq!(greeting, b"hello from member");

        server.await.ok().unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn dial_surfaces_agent_refusal() {
        let dir = std::env::temp_dir().join(format!("shoal-dial-err-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("dial-err.sock");
        let _ = std::fs::remove_file(&path);

        let listener = tokio::net::UnixListener::bind(&path).ok().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.ok().unwrap();
            let mut byte = [0u8; 1];
            loop {
                let n = stream.read(&mut byte).await.ok().unwrap();
                if n == 0 || byte[0] == b'\n' {
                    break;
                }
            }
            stream
                .write_all(b"{\"type\":\"error\",\"message\":\"no route to member\"}\n")
                .await
                .ok()
                .unwrap();
        });

        let dialer = AgentDialer::new(path.clone(), "acme".to_string());
        let addr: SocketAddr = "10.0.0.9:5522".parse().ok().unwrap();
        let err = dialer.dial(addr).await.err().unwrap();
        assert_eq!(err.to_string(), "dial failed for 10.0.0.9:5522: no route to member");

        server.await.ok().unwrap();
        let _ = std::fs::remove_file(&path);
    }
}
