//! # shoal-tunnel
//!
//! Private-network tunnel handle, role probing, and interactive session
//! launch for Shoal.
//!
//! The local Shoal agent owns the tunnel and its cryptographic handshake;
//! this crate is the client side of its unix-socket API plus everything
//! that rides on the tunnel:
//!
//! - **Tunnel handle** - establish the tunnel for an organization, list the
//!   directory's view of a cluster's members
//! - **Dialer** - proxy TCP streams to private member addresses
//! - **Role probe** - ask a member's management port for its cluster role
//! - **Session launcher** - run the interactive remote console, wired to
//!   local stdio, propagating the remote exit status
//!
//! # Example
//!
//! ```rust,no_run
//! use shoal_tunnel::{AgentClient, FramedShellTransport, SessionCommand};
//! use shoal_tunnel::dialer::DEFAULT_SESSION_PORT;
//!
//! # async fn example() -> shoal_tunnel::Result<()> {
//! let agent = AgentClient::new();
//! let tunnel = agent.establish("acme").await?;
//!
//! let transport = FramedShellTransport::new(tunnel.dialer());
//! let command = SessionCommand::postgres_connect("postgres", "postgres", "");
//! shoal_tunnel::launch_session(
//!     &transport,
//!     "fdaa::3".parse().unwrap(),
//!     DEFAULT_SESSION_PORT,
//!     command,
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agent;
pub mod dialer;
pub mod error;
pub mod probe;
pub mod session;

pub use agent::{AgentClient, DEFAULT_AGENT_SOCKET, TunnelHandle};
pub use dialer::{AgentDialer, DEFAULT_MANAGEMENT_PORT, DEFAULT_SESSION_PORT, Dial};
pub use error::{Result, TunnelError};
pub use probe::HttpRoleProbe;
pub use session::{
    FakeSessionTransport, FramedShellTransport, SessionCommand, SessionParams, SessionTransport,
    launch_session,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
