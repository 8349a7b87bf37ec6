//! End-to-end leader discovery: resolve members, gate versions, select.
//!
//! Every step here is synchronous with respect to the overall flow and
//! free of external side effects; the caller only opens the interactive
//! session once this function has returned a leader.

use tracing::info;

use crate::error::{ClusterError, Result};
use crate::leader::{RoleProbe, select_leader_by_probe, select_leader_by_role};
use crate::topology::{MembershipDirectory, NodeLifecycle, resolve_members};
use crate::types::{Cluster, Member, OrchestrationMode};
use crate::version::{VersionRequirement, check_compatible};

/// Discovers the cluster's leader.
///
/// Resolves the member set for the cluster's orchestration mode, runs the
/// version gate over it, then selects exactly one primary: by sequential
/// probing for legacy clusters, by filtering role annotations for managed
/// ones.
///
/// # Errors
///
/// Propagates resolver, gate, and selector errors unmodified in kind; see
/// [`ClusterError`] for the taxonomy.
pub async fn discover_leader<D, L, P>(
    cluster: &Cluster,
    requirement: &VersionRequirement,
    directory: &D,
    lifecycle: &L,
    probe: &P,
) -> Result<Member>
where
    D: MembershipDirectory,
    L: NodeLifecycle,
    P: RoleProbe,
{
    let members = resolve_members(cluster, directory, lifecycle, probe).await?;
    check_compatible(&members, requirement)?;

    let leader = match &cluster.mode {
        OrchestrationMode::Legacy => {
            select_leader_by_probe(&cluster.name, &members, probe).await?
        }
        OrchestrationMode::Managed => select_leader_by_role(&cluster.name, &members)?,
        OrchestrationMode::Other(mode) => {
            return Err(ClusterError::unsupported_topology(mode.clone()));
        }
    };

    info!(cluster = %cluster.name, leader = %leader.addr, "selected cluster leader");
    Ok(leader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leader::FakeRoleProbe;
    use crate::topology::{FakeDirectory, FakeLifecycle};
    use crate::types::{ClusterKind, NodeRole};
    use semver::Version;
    use std::net::IpAddr;

    fn addr(s: &str) -> IpAddr {
        s.parse().ok().unwrap()
    }

    fn requirement() -> VersionRequirement {
        VersionRequirement::new(Version::new(0, 0, 9), Version::new(0, 0, 4))
    }

    fn cluster(mode: OrchestrationMode, declared: Option<&str>) -> Cluster {
        Cluster {
            name: "db".to_string(),
            org: "acme".to_string(),
            mode,
            kind: ClusterKind::Postgres,
            declared_version: declared.map(String::from),
        }
    }

    #[tokio::test]
    async fn legacy_flow_gates_before_probing() {
        // Version gate failure must surface before any probe is issued.
        let directory = FakeDirectory::new().with_address(addr("10.0.0.5"));
        let probe = FakeRoleProbe::new().with_role(addr("10.0.0.5"), NodeRole::Primary);

        let err = discover_leader(
            &cluster(OrchestrationMode::Legacy, Some("0.0.2")),
            &requirement(),
            &directory,
            &FakeLifecycle::new(),
            &probe,
        )
        .await
        .err()
        .unwrap();

        assert!(err.is_compatibility());
        assert_eq!(probe.probe_count(), 0);
    }

    #[tokio::test]
    async fn legacy_flow_probes_after_gate_passes() {
        let directory = FakeDirectory::new()
            .with_address(addr("10.0.0.1"))
            .with_address(addr("10.0.0.2"));
        let probe = FakeRoleProbe::new()
            .with_role(addr("10.0.0.1"), NodeRole::Replica)
            .with_role(addr("10.0.0.2"), NodeRole::Primary);

        let leader = discover_leader(
            &cluster(OrchestrationMode::Legacy, Some("0.0.9")),
            &requirement(),
            &directory,
            &FakeLifecycle::new(),
            &probe,
        )
        .await
        .ok()
        .unwrap();

        assert_eq!(leader.addr, addr("10.0.0.2"));
        assert_eq!(probe.probe_count(), 2);
    }

    #[tokio::test]
    async fn managed_flow_selects_by_annotation() {
        let lifecycle = FakeLifecycle::new()
            .with_member(Member::new(addr("10.0.0.1"), "0.0.10"))
            .with_member(Member::new(addr("10.0.0.2"), "0.0.10"));
        let probe = FakeRoleProbe::new()
            .with_role(addr("10.0.0.1"), NodeRole::Replica)
            .with_role(addr("10.0.0.2"), NodeRole::Primary);

        let leader = discover_leader(
            &cluster(OrchestrationMode::Managed, None),
            &requirement(),
            &FakeDirectory::new(),
            &lifecycle,
            &probe,
        )
        .await
        .ok()
        .unwrap();

        assert_eq!(leader.addr, addr("10.0.0.2"));
        assert!(leader.is_primary());
    }

    #[tokio::test]
    async fn unknown_mode_is_refused() {
        let err = discover_leader(
            &cluster(OrchestrationMode::Other("submarine".to_string()), None),
            &requirement(),
            &FakeDirectory::new(),
            &FakeLifecycle::new(),
            &FakeRoleProbe::new(),
        )
        .await
        .err()
        .unwrap();

        assert!(err.is_configuration());
    }
}
