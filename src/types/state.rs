//! Connection and acquisition state types

use serde::Serialize;

use super::AcquisitionStats;

/// Connection lifecycle state, owned by the connection manager.
///
/// `Capturing` implies the transport is connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    Capturing,
}

impl ConnectionState {
    /// True while a transport is open
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Capturing)
    }

    pub fn is_capturing(self) -> bool {
        self == ConnectionState::Capturing
    }
}

/// Acquisition worker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    #[default]
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Result of asking the acquisition loop to start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    /// A new worker was spawned
    Started,
    /// A worker was already running; nothing changed
    AlreadyActive,
}

/// Snapshot returned by [`ConnectionManager::status`](crate::ConnectionManager::status)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcquisitionStatus {
    pub state: ConnectionState,
    pub port: Option<String>,
    pub stats: AcquisitionStats,
}

impl AcquisitionStatus {
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn is_capturing(&self) -> bool {
        self.state.is_capturing()
    }
}
