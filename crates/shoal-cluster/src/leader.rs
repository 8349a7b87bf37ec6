//! Leader selection: exactly one primary, or a loud failure.

use std::collections::HashMap;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Mutex;

use tracing::debug;

use crate::error::{ClusterError, Result, SourceError};
use crate::types::{Member, NodeRole};

/// Lightweight per-node role probe, performed over the established tunnel.
pub trait RoleProbe: Send + Sync {
    /// Asks the node at `addr` for its current cluster role.
    fn role_of(
        &self,
        addr: IpAddr,
    ) -> impl Future<Output = std::result::Result<NodeRole, SourceError>> + Send;
}

/// Selects the leader by probing candidates in input order.
///
/// This is a first-match policy: probing stops at the first member that
/// affirms it is primary, so a split-brain cluster with several
/// self-declared primaries is not detected here. A probe transport error
/// fails the selection outright rather than skipping the member.
///
/// # Errors
///
/// Returns [`ClusterError::Probe`] if a probe fails, or
/// [`ClusterError::NoLeaderFound`] when every candidate denies being
/// primary.
pub async fn select_leader_by_probe<P: RoleProbe>(
    cluster: &str,
    members: &[Member],
    probe: &P,
) -> Result<Member> {
    for member in members {
        let role = probe
            .role_of(member.addr)
            .await
            .map_err(|source| ClusterError::probe(member.addr, source))?;
        debug!(addr = %member.addr, %role, "probed member role");
        if role == NodeRole::Primary {
            return Ok(member.clone().with_role(NodeRole::Primary));
        }
    }
    Err(ClusterError::no_leader_found(cluster))
}

/// Selects the leader from an already-role-annotated member set.
///
/// Exactly one primary flag is expected.
///
/// # Errors
///
/// Returns [`ClusterError::NoLeaderFound`] when no member is flagged
/// primary, or [`ClusterError::AmbiguousLeader`] when more than one is —
/// an upstream split-brain or transitional state this layer refuses to
/// resolve by picking arbitrarily.
pub fn select_leader_by_role(cluster: &str, members: &[Member]) -> Result<Member> {
    let mut primaries = members.iter().filter(|m| m.is_primary());
    match (primaries.next(), primaries.next()) {
        (Some(leader), None) => Ok(leader.clone()),
        (None, _) => Err(ClusterError::no_leader_found(cluster)),
        (Some(_), Some(_)) => {
            let count = members.iter().filter(|m| m.is_primary()).count();
            Err(ClusterError::ambiguous_leader(cluster, count))
        }
    }
}

/// Scripted role probe for tests.
///
/// Records the order of probed addresses so tests can assert on probe
/// counts and first-match behavior.
#[derive(Debug, Default)]
pub struct FakeRoleProbe {
    roles: HashMap<IpAddr, NodeRole>,
    errors: HashMap<IpAddr, String>,
    calls: Mutex<Vec<IpAddr>>,
}

impl FakeRoleProbe {
    /// Creates a probe that answers [`NodeRole::Unknown`] for every address.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the role answer for an address.
    #[must_use]
    pub fn with_role(mut self, addr: IpAddr, role: NodeRole) -> Self {
        self.roles.insert(addr, role);
        self
    }

    /// Scripts a probe failure for an address.
    #[must_use]
    pub fn with_error(mut self, addr: IpAddr, message: impl Into<String>) -> Self {
        self.errors.insert(addr, message.into());
        self
    }

    /// Returns the addresses probed so far, in order.
    #[must_use]
    pub fn probed(&self) -> Vec<IpAddr> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Returns how many probes have been issued.
    #[must_use]
    pub fn probe_count(&self) -> usize {
        self.probed().len()
    }
}

impl RoleProbe for FakeRoleProbe {
    fn role_of(
        &self,
        addr: IpAddr,
    ) -> impl Future<Output = std::result::Result<NodeRole, SourceError>> + Send {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(addr);
        }
        let result = match self.errors.get(&addr) {
            Some(message) => Err(std::io::Error::other(message.clone()).into()),
            None => Ok(self.roles.get(&addr).copied().unwrap_or_default()),
        };
        async move { result }
    }
}
