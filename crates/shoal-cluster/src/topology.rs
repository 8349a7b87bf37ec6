//! Topology resolution: one resolver per orchestration mode.
//!
//! Each orchestration mode has its own membership source with its own
//! trust model. The legacy directory is best-effort and may silently omit
//! unreachable members; the node-lifecycle service is authoritative and
//! pre-filters on lifecycle state. Dispatch is exhaustive over the closed
//! mode set and refuses unrecognized modes by name.

use std::future::Future;
use std::net::IpAddr;

use tracing::debug;

use crate::error::{ClusterError, Result, SourceError};
use crate::leader::RoleProbe;
use crate::types::{Cluster, Member, OrchestrationMode};

/// Membership directory for legacy clusters.
///
/// Best-effort: addresses with no reachable response are omitted rather
/// than reported as errors. Partial visibility is expected.
pub trait MembershipDirectory: Send + Sync {
    /// Lists the private addresses of the cluster's reachable members.
    fn list_addresses(
        &self,
        org: &str,
        cluster: &str,
    ) -> impl Future<Output = std::result::Result<Vec<IpAddr>, SourceError>> + Send;
}

/// Node-lifecycle service for managed clusters.
///
/// Authoritative: the returned set is already filtered to members in the
/// active lifecycle state.
pub trait NodeLifecycle: Send + Sync {
    /// Lists the cluster's active members.
    fn list_active(
        &self,
        cluster: &str,
    ) -> impl Future<Output = std::result::Result<Vec<Member>, SourceError>> + Send;
}

/// Resolver for legacy, directory-based clusters.
///
/// The directory tracks addresses only. Members inherit the cluster's
/// declared image version, and their role stays undiscovered until the
/// leader selector probes them.
#[derive(Debug)]
pub struct LegacyResolver<'a, D> {
    directory: &'a D,
}

impl<'a, D: MembershipDirectory> LegacyResolver<'a, D> {
    /// Creates a resolver over the given directory.
    #[must_use]
    pub fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    /// Resolves the cluster's members from the directory.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::MemberList`] if the directory query fails,
    /// or [`ClusterError::EmptyMembership`] if it returns zero addresses.
    pub async fn resolve(&self, cluster: &Cluster) -> Result<Vec<Member>> {
        let addresses = self
            .directory
            .list_addresses(&cluster.org, &cluster.name)
            .await
            .map_err(|source| ClusterError::member_list(cluster.name.clone(), source))?;

        debug!(cluster = %cluster.name, count = addresses.len(), "directory listed members");

        if addresses.is_empty() {
            return Err(ClusterError::empty_membership(cluster.name.clone()));
        }

        let version = cluster.declared_version.clone().unwrap_or_default();
        Ok(addresses
            .into_iter()
            .map(|addr| Member::new(addr, version.clone()))
            .collect())
    }
}

/// Resolver for managed, lifecycle-tracked clusters.
///
/// Members come back from the lifecycle service with their versions; the
/// resolver annotates each with an explicit role via a per-node probe.
#[derive(Debug)]
pub struct ManagedResolver<'a, L, P> {
    lifecycle: &'a L,
    probe: &'a P,
}

impl<'a, L: NodeLifecycle, P: RoleProbe> ManagedResolver<'a, L, P> {
    /// Creates a resolver over the given lifecycle service and role probe.
    #[must_use]
    pub fn new(lifecycle: &'a L, probe: &'a P) -> Self {
        Self { lifecycle, probe }
    }

    /// Resolves the cluster's active members, role-annotated.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::MemberList`] if the lifecycle query fails,
    /// or [`ClusterError::Probe`] if a member's role probe fails.
    pub async fn resolve(&self, cluster: &Cluster) -> Result<Vec<Member>> {
        let members = self
            .lifecycle
            .list_active(&cluster.name)
            .await
            .map_err(|source| ClusterError::member_list(cluster.name.clone(), source))?;

        debug!(cluster = %cluster.name, count = members.len(), "lifecycle listed active members");

        let mut annotated = Vec::with_capacity(members.len());
        for member in members {
            let role = self
                .probe
                .role_of(member.addr)
                .await
                .map_err(|source| ClusterError::probe(member.addr, source))?;
            annotated.push(member.with_role(role));
        }
        Ok(annotated)
    }
}

/// Resolves the member set for a cluster, dispatching on orchestration mode.
///
/// # Errors
///
/// Returns [`ClusterError::UnsupportedTopology`] for an unrecognized mode;
/// otherwise propagates the mode-specific resolver's errors.
pub async fn resolve_members<D, L, P>(
    cluster: &Cluster,
    directory: &D,
    lifecycle: &L,
    probe: &P,
) -> Result<Vec<Member>>
where
    D: MembershipDirectory,
    L: NodeLifecycle,
    P: RoleProbe,
{
    match &cluster.mode {
        OrchestrationMode::Legacy => LegacyResolver::new(directory).resolve(cluster).await,
        OrchestrationMode::Managed => {
            ManagedResolver::new(lifecycle, probe).resolve(cluster).await
        }
        OrchestrationMode::Other(mode) => Err(ClusterError::unsupported_topology(mode.clone())),
    }
}

/// In-memory membership directory for tests.
#[derive(Debug, Default)]
pub struct FakeDirectory {
    addresses: Vec<IpAddr>,
    failure: Option<String>,
}

impl FakeDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an address to the directory listing.
    #[must_use]
    pub fn with_address(mut self, addr: IpAddr) -> Self {
        self.addresses.push(addr);
        self
    }

    /// Makes every query fail with the given message.
    #[must_use]
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }
}

impl MembershipDirectory for FakeDirectory {
    fn list_addresses(
        &self,
        _org: &str,
        _cluster: &str,
    ) -> impl Future<Output = std::result::Result<Vec<IpAddr>, SourceError>> + Send {
        let result = match &self.failure {
            Some(message) => Err(std::io::Error::other(message.clone()).into()),
            None => Ok(self.addresses.clone()),
        };
        async move { result }
    }
}

/// In-memory node-lifecycle service for tests.
#[derive(Debug, Default)]
pub struct FakeLifecycle {
    members: Vec<Member>,
    failure: Option<String>,
}

impl FakeLifecycle {
    /// Creates an empty lifecycle service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an active member to the listing.
    #[must_use]
    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    /// Makes every query fail with the given message.
    #[must_use]
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }
}

impl NodeLifecycle for FakeLifecycle {
    fn list_active(
        &self,
        _cluster: &str,
    ) -> impl Future<Output = std::result::Result<Vec<Member>, SourceError>> + Send {
        let result = match &self.failure {
            Some(message) => Err(std::io::Error::other(message.clone()).into()),
            None => Ok(self.members.clone()),
        };
        async move { result }
    }
}
