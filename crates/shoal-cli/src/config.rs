//! Connect-flow configuration.
//!
//! Version floors and deadlines are explicit configuration handed to the
//! components that use them; nothing downstream embeds these values.

use std::time::Duration;

use semver::Version;
use shoal_cluster::VersionRequirement;
use shoal_tunnel::dialer::{DEFAULT_MANAGEMENT_PORT, DEFAULT_SESSION_PORT};

/// Minimum console version for highly-available clusters.
const MIN_POSTGRES_HA_VERSION: Version = Version::new(0, 0, 9);

/// Minimum console version for standalone clusters.
const MIN_POSTGRES_STANDALONE_VERSION: Version = Version::new(0, 0, 4);

/// Default deadline covering every network step before terminal takeover.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for one `postgres connect` invocation.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Version floors for the compatibility gate.
    pub requirement: VersionRequirement,
    /// Deadline for all pre-session steps combined. The interactive
    /// session itself is unbounded.
    pub connect_timeout: Duration,
    /// Management port members answer role probes on.
    pub management_port: u16,
    /// Port members expose the console session service on.
    pub session_port: u16,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            requirement: VersionRequirement::new(
                MIN_POSTGRES_HA_VERSION,
                MIN_POSTGRES_STANDALONE_VERSION,
            ),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            management_port: DEFAULT_MANAGEMENT_PORT,
            session_port: DEFAULT_SESSION_PORT,
        }
    }
}

impl ConnectConfig {
    /// Overrides the connect deadline.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
