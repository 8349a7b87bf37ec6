//! # shoal-cluster
//!
//! Cluster topology, version gating, and leader discovery for Shoal
//! Postgres clusters.
//!
//! This crate holds the mode-aware core of `shoal postgres connect`:
//!
//! - **Version gate** - arity-keyed minimum-version checks over a resolved
//!   member set
//! - **Topology resolution** - one resolver per orchestration mode (the
//!   legacy membership directory, the managed node-lifecycle service)
//! - **Leader selection** - exactly one primary, discovered by sequential
//!   probing (legacy) or role filtering (managed)
//!
//! Boundary collaborators (directory, lifecycle service, role probe) are
//! traits; `Fake*` implementations ship in-crate for tests.
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   Leader Discovery                       │
//! │                                                          │
//! │  ┌──────────────┐   ┌──────────────┐   ┌─────────────┐  │
//! │  │   Topology   │   │   Version    │   │   Leader    │  │
//! │  │   Resolver   │──▶│     Gate     │──▶│  Selector   │  │
//! │  └──────────────┘   └──────────────┘   └─────────────┘  │
//! │    directory /         pure check        probe / role    │
//! │    lifecycle                             filter          │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use shoal_cluster::{
//!     Cluster, ClusterKind, FakeDirectory, FakeLifecycle, FakeRoleProbe,
//!     NodeRole, OrchestrationMode, VersionRequirement, discover_leader,
//! };
//!
//! # async fn example() -> shoal_cluster::Result<()> {
//! let cluster = Cluster {
//!     name: "db-prod".to_string(),
//!     org: "acme".to_string(),
//!     mode: OrchestrationMode::Legacy,
//!     kind: ClusterKind::Postgres,
//!     declared_version: Some("0.0.10".to_string()),
//! };
//!
//! let directory = FakeDirectory::new().with_address("10.0.0.1".parse().unwrap());
//! let probe = FakeRoleProbe::new().with_role("10.0.0.1".parse().unwrap(), NodeRole::Primary);
//! let requirement = VersionRequirement::new(
//!     semver::Version::new(0, 0, 9),
//!     semver::Version::new(0, 0, 4),
//! );
//!
//! let leader = discover_leader(
//!     &cluster,
//!     &requirement,
//!     &directory,
//!     &FakeLifecycle::new(),
//!     &probe,
//! )
//! .await?;
//! println!("leader at {}", leader.addr);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod flow;
pub mod leader;
pub mod topology;
pub mod types;
pub mod version;

pub use error::{ClusterError, Result, SourceError};
pub use flow::discover_leader;
pub use leader::{FakeRoleProbe, RoleProbe, select_leader_by_probe, select_leader_by_role};
pub use topology::{
    FakeDirectory, FakeLifecycle, LegacyResolver, ManagedResolver, MembershipDirectory,
    NodeLifecycle, resolve_members,
};
pub use types::{Cluster, ClusterKind, Member, NodeRole, OrchestrationMode};
pub use version::{ClusterArity, VersionRequirement, check_compatible};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
