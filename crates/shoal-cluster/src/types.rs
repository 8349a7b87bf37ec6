//! Core types for cluster topology and leader discovery.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// The fleet-orchestration scheme a cluster runs on.
///
/// The orchestration mode determines how membership and node roles are
/// discovered. The set is closed: a mode tag this version does not recognize
/// is preserved in [`OrchestrationMode::Other`] so that dispatch can refuse
/// it by name instead of guessing at its semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrchestrationMode {
    /// Directory-based clusters from the first platform generation.
    ///
    /// Membership comes from the private-network directory; node roles are
    /// not tracked and must be probed.
    Legacy,
    /// Lifecycle-managed clusters on the current platform generation.
    ///
    /// Membership comes from the node-lifecycle service, which is
    /// authoritative and tracks lifecycle state per node.
    Managed,
    /// An orchestration mode this version does not understand.
    Other(String),
}

impl OrchestrationMode {
    /// Parses a mode tag. Unrecognized tags are preserved, not rejected.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        match tag {
            "legacy" => Self::Legacy,
            "managed" => Self::Managed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for OrchestrationMode {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl From<OrchestrationMode> for String {
    fn from(mode: OrchestrationMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for OrchestrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Managed => write!(f, "managed"),
            Self::Other(tag) => write!(f, "{tag}"),
        }
    }
}

/// The kind of workload a cluster hosts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClusterKind {
    /// A managed Postgres deployment.
    Postgres,
    /// Any other workload kind, preserved verbatim.
    Other(String),
}

impl ClusterKind {
    /// Parses a kind tag. Unrecognized tags are preserved.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        match tag {
            "postgres" => Self::Postgres,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ClusterKind {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl From<ClusterKind> for String {
    fn from(kind: ClusterKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for ClusterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
            Self::Other(tag) => write!(f, "{tag}"),
        }
    }
}

/// A managed cluster as described by the control plane.
///
/// Immutable for the duration of one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    /// Cluster name, unique within the organization.
    pub name: String,
    /// Organization slug that owns the cluster.
    pub org: String,
    /// Orchestration mode the cluster runs on.
    pub mode: OrchestrationMode,
    /// Workload kind.
    pub kind: ClusterKind,
    /// Software version declared in the cluster's image metadata.
    ///
    /// Legacy members inherit this version because the directory tracks
    /// addresses only.
    pub declared_version: Option<String>,
}

impl Cluster {
    /// Returns `true` if this cluster hosts Postgres.
    #[must_use]
    pub fn is_postgres(&self) -> bool {
        self.kind == ClusterKind::Postgres
    }
}

/// Role of a cluster member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// The member currently accepting writes.
    Primary,
    /// A read replica following the primary.
    Replica,
    /// Role not yet discovered.
    #[default]
    Unknown,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Replica => write!(f, "replica"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A single cluster node as seen by one invocation.
///
/// Members are produced fresh by topology resolution and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Private-network address of the node.
    pub addr: IpAddr,
    /// Software version the node reports (or inherits from the cluster).
    pub version: String,
    /// Role indicator; [`NodeRole::Unknown`] until discovered.
    #[serde(default)]
    pub role: NodeRole,
}

impl Member {
    /// Creates a member with an undiscovered role.
    #[must_use]
    pub fn new(addr: IpAddr, version: impl Into<String>) -> Self {
        Self {
            addr,
            version: version.into(),
            role: NodeRole::Unknown,
        }
    }

    /// Returns the member with the given role set.
    #[must_use]
    pub fn with_role(mut self, role: NodeRole) -> Self {
        self.role = role;
        self
    }

    /// Returns `true` if the member is flagged as the primary.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.role == NodeRole::Primary
    }
}
