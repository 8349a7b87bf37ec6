//! Per-node role probe over the tunnel.
//!
//! Every cluster member exposes a small management API on a fixed port.
//! The probe dials the member through the tunnel and asks `GET
//! /v1/admin/role`; the body is the member's current role.

use std::net::{IpAddr, SocketAddr};

use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::{Method, Request, header};
use hyper_util::rt::TokioIo;
use tracing::debug;

use shoal_cluster::{NodeRole, RoleProbe, SourceError};

use crate::dialer::{DEFAULT_MANAGEMENT_PORT, Dial};
use crate::error::{Result, TunnelError};

/// Path of the role endpoint on the member management API.
const ROLE_PATH: &str = "/v1/admin/role";

/// Role probe speaking HTTP/1 to the member management port.
#[derive(Debug, Clone)]
pub struct HttpRoleProbe<D> {
    dialer: D,
    port: u16,
}

impl<D: Dial> HttpRoleProbe<D> {
    /// Creates a probe over the given dialer, using the default management
    /// port.
    #[must_use]
    pub fn new(dialer: D) -> Self {
        Self {
            dialer,
            port: DEFAULT_MANAGEMENT_PORT,
        }
    }

    /// Overrides the management port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Queries the member at `addr` for its current role.
    ///
    /// # Errors
    ///
    /// Returns an error if the dial, the HTTP exchange, or role parsing
    /// fails.
    pub async fn fetch_role(&self, addr: IpAddr) -> Result<NodeRole> {
        let target = SocketAddr::new(addr, self.port);
        let stream = self.dialer.dial(target).await?;
        let io = TokioIo::new(stream);

        let (mut sender, connection) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| TunnelError::probe(target, format!("handshake failed: {e}")))?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                debug!(error = %err, "probe connection closed with error");
            }
        });

        let request = Request::builder()
            .method(Method::GET)
            .uri(ROLE_PATH)
            .header(header::HOST, target.to_string())
            .body(Empty::<Bytes>::new())
            .map_err(|e| TunnelError::probe(target, format!("could not build request: {e}")))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| TunnelError::probe(target, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TunnelError::probe(target, format!("status {status}")));
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| TunnelError::probe(target, format!("could not read body: {e}")))?
            .to_bytes();

        parse_role(&body).ok_or_else(|| {
            TunnelError::probe(
                target,
                format!("unexpected role {:?}", String::from_utf8_lossy(&body)),
            )
        })
    }
}

fn parse_role(body: &[u8]) -> Option<NodeRole> {
    match std::str::from_utf8(body).ok()?.trim() {
        "primary" => Some(NodeRole::Primary),
        "replica" => Some(NodeRole::Replica),
        "unknown" => Some(NodeRole::Unknown),
        _ => None,
    }
}

impl<D: Dial> RoleProbe for HttpRoleProbe<D> {
    fn role_of(
        &self,
        addr: IpAddr,
    ) -> impl Future<Output = std::result::Result<NodeRole, SourceError>> + Send {
        async move {
            self.fetch_role(addr)
                .await
                .map_err(|e| -> SourceError { Box::new(e) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::{TcpListener, TcpStream};

    /// Test dialer that connects straight to loopback, standing in for the
    /// tunnel.
    #[derive(Debug, Clone)]
    struct LoopbackDial {
        target: SocketAddr,
    }

    impl Dial for LoopbackDial {
        type Stream = TcpStream;

        fn dial(&self, _addr: SocketAddr) -> impl Future<Output = Result<Self::Stream>> + Send {
            let target = self.target;
            async move {
                TcpStream::connect(target)
                    .await
                    .map_err(|e| TunnelError::dial(target, e.to_string()))
            }
        }
    }

    async fn serve_once(response: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.ok().unwrap();
        let addr = listener.local_addr().ok().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.ok().unwrap();
            // Drain the request head before answering.
            let mut buf = [0u8; 1024];
            let _ = tokio::io::AsyncReadExt::read(&mut stream, &mut buf).await;
            stream.write_all(response.as_bytes()).await.ok().unwrap();
        });
        addr
    }

    #[test_case::test_case("primary", NodeRole::Primary; "primary body")]
    #[test_case::test_case("replica", NodeRole::Replica; "replica body")]
    #[test_case::test_case("unknown", NodeRole::Unknown; "unknown body")]
    #[tokio::test]
    async fn fetch_role_parses_body(body: &str, expected: NodeRole) {
        let response: &'static str = match body {
            "primary" => "HTTP/1.1 200 OK\r\ncontent-length: 7\r\n\r\nprimary",
            "replica" => "HTTP/1.1 200 OK\r\ncontent-length: 7\r\n\r\nreplica",
            _ => "HTTP/1.1 200 OK\r\ncontent-length: 7\r\n\r\nunknown",
        };
        let server = serve_once(response).await;
        let probe = HttpRoleProbe::new(LoopbackDial { target: server });

        let role = probe.fetch_role("10.0.0.1".parse().ok().unwrap()).await.ok().unwrap();
        assert_eq!(role, expected);
    }

    #[tokio::test]
    async fn fetch_role_rejects_unexpected_body() {
        let server = serve_once("HTTP/1.1 200 OK\r\ncontent-length: 6\r\n\r\nbanana").await;
        let probe = HttpRoleProbe::new(LoopbackDial { target: server });

        let err = probe.fetch_role("10.0.0.1".parse().ok().unwrap()).await.err().unwrap();
        assert!(err.to_string().contains("unexpected role"));
    }

    #[tokio::test]
    async fn fetch_role_rejects_error_status() {
        let server = serve_once("HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\n\r\n").await;
        let probe = HttpRoleProbe::new(LoopbackDial { target: server });

        let err = probe.fetch_role("10.0.0.1".parse().ok().unwrap()).await.err().unwrap();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn fetch_role_surfaces_dial_failure() {
        // Point at a port nothing listens on.
        let probe = HttpRoleProbe::new(LoopbackDial {
            target: "127.0.0.1:1".parse().ok().unwrap(),
        });
        let err = probe.fetch_role("10.0.0.1".parse().ok().unwrap()).await.err().unwrap();
        assert!(matches!(err, TunnelError::Dial { .. }));
    }

    #[test]
    fn parse_role_trims_whitespace() {
        assert_eq!(parse_role(b"primary\n"), Some(NodeRole::Primary));
        assert_eq!(parse_role(b"  replica  "), Some(NodeRole::Replica));
        assert_eq!(parse_role(b"leader"), None);
        assert_eq!(parse_role(&[0xff, 0xfe]), None);
    }

    #[test]
    fn probe_uses_management_port_by_default() {
        let probe = HttpRoleProbe::new(LoopbackDial {
            target: "127.0.0.1:1".parse().ok().unwrap(),
        });
        assert_eq!(probe.port, DEFAULT_MANAGEMENT_PORT);
        let probe = probe.with_port(9500);
        assert_eq!(probe.port, 9500);
    }
}
