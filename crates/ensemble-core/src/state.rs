//! Connection state reported by coordination clients

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Client built but not started
    Latent,

    /// First connection attempt in progress
    Connecting,

    /// Connected to an ensemble member
    Connected,

    /// Connection dropped, session may still be alive
    Suspended,

    /// Session considered expired or retries exhausted
    Lost,

    /// Client closed
    Closed,
}

impl ConnectionState {
    /// Returns true if the client currently holds a live connection
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Returns true once the client has been closed
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Latent => "LATENT",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Suspended => "SUSPENDED",
            ConnectionState::Lost => "LOST",
            ConnectionState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}
