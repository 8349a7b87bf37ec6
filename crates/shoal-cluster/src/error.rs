//! Error types for cluster topology and leader discovery.

use std::net::IpAddr;

use thiserror::Error;

/// Result type alias for cluster operations.
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Boxed error from a boundary collaborator (directory, lifecycle service,
/// role probe).
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while resolving topology and selecting a leader.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// A member's declared version could not be parsed.
    ///
    /// Version checks fail closed: an unreadable version must not silently
    /// pass the gate.
    #[error("member {addr} reports unparsable version {version:?}")]
    InvalidVersion {
        /// Address of the offending member.
        addr: IpAddr,
        /// The raw version string.
        version: String,
    },

    /// A member version is below the floor for the cluster's arity.
    #[error("incompatible version: {version} is below the required minimum {floor} for {arity} clusters")]
    IncompatibleVersion {
        /// The lowest version found among the members.
        version: semver::Version,
        /// The required floor.
        floor: semver::Version,
        /// Arity the floor applies to.
        arity: crate::version::ClusterArity,
    },

    /// The membership directory returned zero addresses.
    #[error("no member addresses found for cluster {cluster}")]
    EmptyMembership {
        /// The cluster that came up empty.
        cluster: String,
    },

    /// The membership source query itself failed.
    #[error("could not list members of cluster {cluster}: {source}")]
    MemberList {
        /// The cluster being queried.
        cluster: String,
        /// The underlying collaborator error.
        #[source]
        source: SourceError,
    },

    /// The cluster's orchestration mode has unknown semantics.
    #[error("orchestration mode {mode} is not supported")]
    UnsupportedTopology {
        /// The unrecognized mode tag.
        mode: String,
    },

    /// No member claimed or was flagged as primary.
    #[error("no leader found for cluster {cluster}")]
    NoLeaderFound {
        /// The cluster that lacks a primary.
        cluster: String,
    },

    /// More than one member is flagged as primary.
    #[error("cluster {cluster} reports {count} primaries, expected exactly one")]
    AmbiguousLeader {
        /// The cluster in a split-brain or transitional state.
        cluster: String,
        /// How many primaries were flagged.
        count: usize,
    },

    /// A role probe failed against a member.
    #[error("role probe failed for {addr}: {source}")]
    Probe {
        /// Address that was being probed.
        addr: IpAddr,
        /// The underlying probe error.
        #[source]
        source: SourceError,
    },
}

impl ClusterError {
    /// Creates an `InvalidVersion` error.
    #[must_use]
    pub fn invalid_version(addr: IpAddr, version: impl Into<String>) -> Self {
        Self::InvalidVersion {
            addr,
            version: version.into(),
        }
    }

    /// Creates an `EmptyMembership` error for the cluster.
    #[must_use]
    pub fn empty_membership(cluster: impl Into<String>) -> Self {
        Self::EmptyMembership {
            cluster: cluster.into(),
        }
    }

    /// Creates a `MemberList` error wrapping a collaborator failure.
    #[must_use]
    pub fn member_list(cluster: impl Into<String>, source: SourceError) -> Self {
        Self::MemberList {
            cluster: cluster.into(),
            source,
        }
    }

    /// Creates an `UnsupportedTopology` error naming the mode.
    #[must_use]
    pub fn unsupported_topology(mode: impl Into<String>) -> Self {
        Self::UnsupportedTopology { mode: mode.into() }
    }

    /// Creates a `NoLeaderFound` error for the cluster.
    #[must_use]
    pub fn no_leader_found(cluster: impl Into<String>) -> Self {
        Self::NoLeaderFound {
            cluster: cluster.into(),
        }
    }

    /// Creates an `AmbiguousLeader` error.
    #[must_use]
    pub fn ambiguous_leader(cluster: impl Into<String>, count: usize) -> Self {
        Self::AmbiguousLeader {
            cluster: cluster.into(),
            count,
        }
    }

    /// Creates a `Probe` error wrapping a collaborator failure.
    #[must_use]
    pub fn probe(addr: IpAddr, source: SourceError) -> Self {
        Self::Probe { addr, source }
    }

    /// Returns `true` if this error indicates a configuration problem
    /// rather than a cluster-state problem.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::UnsupportedTopology { .. })
    }

    /// Returns `true` if this error came out of the version gate.
    #[must_use]
    pub fn is_compatibility(&self) -> bool {
        matches!(
            self,
            Self::InvalidVersion { .. } | Self::IncompatibleVersion { .. }
        )
    }

    /// Returns `true` if this error indicates a membership-source problem.
    #[must_use]
    pub fn is_membership(&self) -> bool {
        matches!(self, Self::EmptyMembership { .. } | Self::MemberList { .. })
    }

    /// Returns `true` if this error indicates a split-brain or transitional
    /// cluster state rather than a connectivity problem.
    #[must_use]
    pub fn is_leader_resolution(&self) -> bool {
        matches!(
            self,
            Self::NoLeaderFound { .. } | Self::AmbiguousLeader { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::ClusterArity;

    fn addr(s: &str) -> IpAddr {
        s.parse().ok().unwrap()
    }

    #[test]
    fn invalid_version_display() {
        let err = ClusterError::invalid_version(addr("10.0.0.1"), "not-a-version");
        assert_eq!(
            err.to_string(),
            "member 10.0.0.1 reports unparsable version \"not-a-version\""
        );
    }

    #[test]
    fn incompatible_version_display() {
        let err = ClusterError::IncompatibleVersion {
            version: semver::Version::new(0, 0, 2),
            floor: semver::Version::new(0, 0, 4),
            arity: ClusterArity::Standalone,
        };
        assert_eq!(
            err.to_string(),
            "incompatible version: 0.0.2 is below the required minimum 0.0.4 for standalone clusters"
        );
    }

    #[test]
    fn empty_membership_display() {
        let err = ClusterError::empty_membership("db-prod");
        assert_eq!(err.to_string(), "no member addresses found for cluster db-prod");
    }

    #[test]
    fn member_list_display_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ClusterError::member_list("db-prod", Box::new(io));
        assert_eq!(
            err.to_string(),
            "could not list members of cluster db-prod: refused"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn unsupported_topology_display() {
        let err = ClusterError::unsupported_topology("submarine");
        assert_eq!(err.to_string(), "orchestration mode submarine is not supported");
    }

    #[test]
    fn no_leader_found_display() {
        let err = ClusterError::no_leader_found("db-prod");
        assert_eq!(err.to_string(), "no leader found for cluster db-prod");
    }

    #[test]
    fn ambiguous_leader_display() {
        let err = ClusterError::ambiguous_leader("db-prod", 2);
        assert_eq!(
            err.to_string(),
            "cluster db-prod reports 2 primaries, expected exactly one"
        );
    }

    #[test]
    fn probe_display() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = ClusterError::probe(addr("fdaa::3"), Box::new(io));
        assert_eq!(err.to_string(), "role probe failed for fdaa::3: timed out");
    }

    #[test]
    fn taxonomy_predicates() {
        assert!(ClusterError::unsupported_topology("x").is_configuration());
        assert!(ClusterError::invalid_version(addr("10.0.0.1"), "x").is_compatibility());
        assert!(ClusterError::empty_membership("c").is_membership());
        assert!(ClusterError::no_leader_found("c").is_leader_resolution());
        assert!(ClusterError::ambiguous_leader("c", 3).is_leader_resolution());

        // Leader-resolution errors are distinct from membership errors.
        assert!(!ClusterError::no_leader_found("c").is_membership());
        assert!(!ClusterError::empty_membership("c").is_leader_resolution());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClusterError>();
    }
}
