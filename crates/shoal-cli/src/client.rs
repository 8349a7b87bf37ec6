//! Control-plane HTTP client.
//!
//! One client covers both control-plane surfaces the connect flow needs:
//! cluster lookup and the node-lifecycle listing. It also implements the
//! [`NodeLifecycle`] collaborator trait so leader discovery can consume it
//! directly.
//!
//! # Example
//!
//! ```rust,no_run
//! use shoal_cli::client::PlatformClient;
//!
//! # async fn example() -> Result<(), shoal_cli::CliError> {
//! let client = PlatformClient::new("http://api.shoal.internal")?;
//! let cluster = client.get_cluster("acme", "db-prod").await?;
//! println!("mode: {}", cluster.mode);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode, Uri, header};
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use tokio::time::timeout;
use tracing::debug;

use shoal_cluster::{Cluster, Member, NodeLifecycle, SourceError};

use crate::error::CliError;

/// Default request timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Control-plane HTTP client.
pub struct PlatformClient {
    base_url: String,
    http: Client<HttpConnector, Empty<Bytes>>,
    request_timeout: Duration,
}

impl std::fmt::Debug for PlatformClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformClient")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl PlatformClient {
    /// Creates a client against the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not use the `http://` scheme.
    pub fn new(base_url: &str) -> Result<Self, CliError> {
        if !base_url.starts_with("http://") {
            return Err(CliError::Config(format!(
                "invalid api URL: {base_url}, must start with http://"
            )));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::builder(TokioExecutor::new()).build_http(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Fetches a cluster by organization and name.
    ///
    /// # Errors
    ///
    /// Returns `ClusterNotFound` for a 404, or an API error for any other
    /// failure.
    pub async fn get_cluster(&self, org: &str, name: &str) -> Result<Cluster, CliError> {
        let (status, body) = self.get(&format!("/v1/orgs/{org}/clusters/{name}")).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(CliError::ClusterNotFound(format!("{org}/{name}")));
        }
        if !status.is_success() {
            return Err(CliError::Api(format!(
                "cluster lookup for {name} failed with status {status}"
            )));
        }
        serde_json::from_slice(&body)
            .map_err(|e| CliError::Api(format!("could not decode cluster {name}: {e}")))
    }

    /// Lists a cluster's members in the active lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns an API error if the query or decoding fails.
    pub async fn list_active_members(&self, cluster: &str) -> Result<Vec<Member>, CliError> {
        let (status, body) = self
            .get(&format!("/v1/clusters/{cluster}/members?state=active"))
            .await?;
        if !status.is_success() {
            return Err(CliError::Api(format!(
                "member listing for {cluster} failed with status {status}"
            )));
        }
        serde_json::from_slice(&body)
            .map_err(|e| CliError::Api(format!("could not decode members of {cluster}: {e}")))
    }

    async fn get(&self, path: &str) -> Result<(StatusCode, Bytes), CliError> {
        let uri: Uri = format!("{}{path}", self.base_url)
            .parse()
            .map_err(|e| CliError::Config(format!("invalid request URI: {e}")))?;
        debug!(%uri, "control-plane request");

        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::ACCEPT, "application/json")
            .body(Empty::new())
            .map_err(|e| CliError::Api(format!("could not build request: {e}")))?;

        let response = timeout(self.request_timeout, self.http.request(request))
            .await
            .map_err(|_| CliError::Timeout("control-plane request timed out".into()))?
            .map_err(|e| CliError::Api(e.to_string()))?;

        let status = response.status();
        let body = timeout(self.request_timeout, response.into_body().collect())
            .await
            .map_err(|_| CliError::Timeout("control-plane response timed out".into()))?
            .map_err(|e| CliError::Api(e.to_string()))?
            .to_bytes();
        Ok((status, body))
    }
}

impl NodeLifecycle for PlatformClient {
    fn list_active(
        &self,
        cluster: &str,
    ) -> impl Future<Output = Result<Vec<Member>, SourceError>> + Send {
        async move {
            self.list_active_members(cluster)
                .await
                .map_err(|e| -> SourceError { Box::new(e) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(response: String) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.ok().unwrap();
        let addr = listener.local_addr().ok().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.ok().unwrap();
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf).await;
            stream.write_all(response.as_bytes()).await.ok().unwrap();
        });
        addr
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{body}",
            body.len()
        )
    }

    #[test]
    fn new_rejects_non_http_url() {
        let err = PlatformClient::new("ws://api.shoal.internal").err().unwrap();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn new_trims_trailing_slash() {
        let client = PlatformClient::new("http://api.shoal.internal/").ok().unwrap();
        assert_eq!(client.base_url, "http://api.shoal.internal");
    }

    #[tokio::test]
    async fn get_cluster_decodes_payload() {
        let body = r#"{"name":"db-prod","org":"acme","mode":"managed","kind":"postgres","declared_version":"0.0.10"}"#;
        let addr = serve_once(http_response("200 OK", body)).await;

        let client = PlatformClient::new(&format!("http://{addr}")).ok().unwrap();
        let cluster = client.get_cluster("acme", "db-prod").await.ok().unwrap();

        assert_eq!(cluster.name, "db-prod");
        assert_eq!(cluster.mode, shoal_cluster::OrchestrationMode::Managed);
        assert!(cluster.is_postgres());
        assert_eq!(cluster.declared_version.as_deref(), Some("0.0.10"));
    }

    #[tokio::test]
    async fn get_cluster_maps_404_to_not_found() {
        let addr = serve_once(http_response("404 Not Found", "{}")).await;

        let client = PlatformClient::new(&format!("http://{addr}")).ok().unwrap();
        let err = client.get_cluster("acme", "ghost").await.err().unwrap();
        assert_eq!(err.to_string(), "cluster not found: acme/ghost");
    }

    #[tokio::test]
    async fn get_cluster_surfaces_server_error() {
        let addr = serve_once(http_response("500 Internal Server Error", "{}")).await;

        let client = PlatformClient::new(&format!("http://{addr}")).ok().unwrap();
        let err = client.get_cluster("acme", "db-prod").await.err().unwrap();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn list_active_members_decodes_payload() {
        let body = r#"[{"addr":"10.0.0.1","version":"0.0.10","role":"unknown"},{"addr":"10.0.0.2","version":"0.0.10"}]"#;
        let addr = serve_once(http_response("200 OK", body)).await;

        let client = PlatformClient::new(&format!("http://{addr}")).ok().unwrap();
        let members = client.list_active_members("db-prod").await.ok().unwrap();

        assert_eq!(members.len(), 2);
        assert_eq!(members[0].addr.to_string(), "10.0.0.1");
        assert_eq!(members[1].role, shoal_cluster::NodeRole::Unknown);
    }

    #[tokio::test]
    async fn list_active_members_rejects_bad_json() {
        let addr = serve_once(http_response("200 OK", "not json")).await;

        let client = PlatformClient::new(&format!("http://{addr}")).ok().unwrap();
        let err = client.list_active_members("db-prod").await.err().unwrap();
        assert!(err.to_string().contains("could not decode"));
    }

    #[tokio::test]
    async fn unreachable_api_is_an_api_error() {
        let client = PlatformClient::new("http://127.0.0.1:1").ok().unwrap();
        let err = client.get_cluster("acme", "db").await.err().unwrap();
        assert!(matches!(err, CliError::Api(_)));
    }
}
