//! Version gate: arity-keyed minimum-version checks.
//!
//! The gate is pure validation. Floors arrive as explicit configuration so
//! the component stays testable; nothing here performs I/O.

use std::fmt;

use semver::Version;

use crate::error::{ClusterError, Result};
use crate::types::Member;

/// Cluster arity, derived from the member count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterArity {
    /// A single-member cluster.
    Standalone,
    /// A multi-member, highly-available cluster.
    HighlyAvailable,
}

impl ClusterArity {
    /// Derives the arity from a member count.
    ///
    /// One member is standalone; anything more is highly available.
    #[must_use]
    pub fn from_member_count(count: usize) -> Self {
        if count <= 1 {
            Self::Standalone
        } else {
            Self::HighlyAvailable
        }
    }
}

impl fmt::Display for ClusterArity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => write!(f, "standalone"),
            Self::HighlyAvailable => write!(f, "highly-available"),
        }
    }
}

/// Minimum-version floors keyed by cluster arity.
///
/// Invariant (by construction, not enforced here): the highly-available
/// floor is at least the standalone floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequirement {
    /// Floor for highly-available clusters.
    pub ha_min: Version,
    /// Floor for standalone clusters.
    pub standalone_min: Version,
}

impl VersionRequirement {
    /// Creates a requirement from the two floors.
    #[must_use]
    pub fn new(ha_min: Version, standalone_min: Version) -> Self {
        Self {
            ha_min,
            standalone_min,
        }
    }

    /// Returns the floor that applies to the given arity.
    #[must_use]
    pub fn floor_for(&self, arity: ClusterArity) -> &Version {
        match arity {
            ClusterArity::Standalone => &self.standalone_min,
            ClusterArity::HighlyAvailable => &self.ha_min,
        }
    }
}

/// Checks every member's version against the arity-appropriate floor.
///
/// The lowest version among the members is compared against the floor;
/// a version exactly at the floor passes. A member whose version cannot be
/// parsed fails the check outright. An empty member list is vacuously
/// compatible (the topology resolver rejects empty membership before the
/// gate runs).
///
/// # Errors
///
/// Returns [`ClusterError::InvalidVersion`] for an unparsable member
/// version, or [`ClusterError::IncompatibleVersion`] naming the offending
/// version and the required floor.
pub fn check_compatible(members: &[Member], requirement: &VersionRequirement) -> Result<()> {
    let arity = ClusterArity::from_member_count(members.len());

    let mut lowest: Option<Version> = None;
    for member in members {
        let version = Version::parse(&member.version)
            .map_err(|_| ClusterError::invalid_version(member.addr, member.version.clone()))?;
        match &lowest {
            Some(current) if *current <= version => {}
            _ => lowest = Some(version),
        }
    }

    let Some(lowest) = lowest else {
        return Ok(());
    };

    let floor = requirement.floor_for(arity);
    if lowest < *floor {
        return Err(ClusterError::IncompatibleVersion {
            version: lowest,
            floor: floor.clone(),
            arity,
        });
    }

    Ok(())
}
