//! Error types for serial telemetry acquisition.
//!
//! Only a handful of failures are actionable for a caller: listing ports,
//! choosing a port, opening it, and asking for capture without a
//! connection. Everything that happens inside the acquisition loop (a
//! malformed frame, a transient read fault) is absorbed and surfaces as a
//! loss counter in [`AcquisitionStats`](crate::AcquisitionStats) instead.
//!
//! ## Error Categories
//!
//! - **Enumeration**: the platform could not list serial ports
//! - **Port selection**: auto-detection found no port or more than one
//! - **Connection**: the transport could not be opened or initialized
//! - **State**: an operation needs a live connection
//! - **Frame loss**: decode failures and read faults (internal only)
//! - **Configuration**: settings could not be loaded
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use vibrawatch::AcquisitionError;
//!
//! let error = AcquisitionError::connect_failed("COM3", "access denied");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use thiserror::Error;

use crate::types::PortDescriptor;

/// Result type alias for acquisition operations.
pub type Result<T, E = AcquisitionError> = std::result::Result<T, E>;

/// Main error type for acquisition operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AcquisitionError {
    #[error("Failed to enumerate serial ports: {reason}")]
    Enumeration {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("No port selected: {matches} of {} enumerated ports matched the device signature", .available.len())]
    NoPortSelected { matches: usize, available: Vec<PortDescriptor> },

    #[error("Failed to connect to {port}: {reason}")]
    Connect {
        port: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Not connected to a device")]
    NotConnected,

    #[error("Malformed frame: {details}")]
    Decode { details: String },

    #[error("Transport read fault")]
    TransportRead {
        #[source]
        source: std::io::Error,
    },

    #[error("Transport write failed")]
    TransportWrite {
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl AcquisitionError {
    /// Returns whether the error is one a caller is expected to act on.
    ///
    /// Frame losses are recorded as statistics and never reach callers.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, AcquisitionError::Decode { .. } | AcquisitionError::TransportRead { .. })
    }

    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            AcquisitionError::Enumeration { .. } => true,
            AcquisitionError::NoPortSelected { .. } => false,
            AcquisitionError::Connect { .. } => true,
            AcquisitionError::NotConnected => false,
            AcquisitionError::Decode { .. } => false,
            AcquisitionError::TransportRead { .. } => true,
            AcquisitionError::TransportWrite { .. } => true,
            AcquisitionError::Config(_) => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            AcquisitionError::Enumeration { .. } => vec![
                "Check that the serial subsystem is available",
                "Verify permissions to query serial devices",
            ],
            AcquisitionError::NoPortSelected { .. } => vec![
                "Choose a port explicitly from the enumerated list",
                "Check the device is plugged in and powered",
                "Extend the vendor allow-list if the device reports another description",
            ],
            AcquisitionError::Connect { .. } => vec![
                "Close other programs holding the port",
                "Check the port name and cable",
                "Verify permissions on the serial device",
            ],
            AcquisitionError::NotConnected => {
                vec!["Connect to a device before starting capture", "Reconnect after a disconnect"]
            }
            AcquisitionError::Decode { .. } => vec![
                "Check the firmware emits one JSON object per line",
                "Verify the baud rate matches the device",
            ],
            AcquisitionError::TransportRead { .. } => {
                vec!["Check the cable connection", "Reconnect the device"]
            }
            AcquisitionError::TransportWrite { .. } => {
                vec!["Check the device is still connected", "Reconnect before sending"]
            }
            AcquisitionError::Config(_) => vec![
                "Check the configuration file syntax",
                "Check VIBRAWATCH_* environment variables",
            ],
        }
    }

    /// Helper constructor for enumeration errors.
    pub fn enumeration_failed(reason: impl Into<String>) -> Self {
        AcquisitionError::Enumeration { reason: reason.into(), source: None }
    }

    /// Helper constructor for enumeration errors with source.
    pub fn enumeration_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        AcquisitionError::Enumeration { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for connection errors.
    pub fn connect_failed(port: impl Into<String>, reason: impl Into<String>) -> Self {
        AcquisitionError::Connect { port: port.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connect_failed_with_source(
        port: impl Into<String>,
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        AcquisitionError::Connect { port: port.into(), reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for frame decode losses.
    pub fn decode(details: impl Into<String>) -> Self {
        AcquisitionError::Decode { details: details.into() }
    }

    /// Helper constructor for port selection failures.
    pub fn no_port_selected(matches: usize, available: Vec<PortDescriptor>) -> Self {
        AcquisitionError::NoPortSelected { matches, available }
    }
}

impl From<std::io::Error> for AcquisitionError {
    fn from(err: std::io::Error) -> Self {
        AcquisitionError::TransportRead { source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            port in "[A-Za-z0-9/]{1,16}",
            reason in ".*",
            details in ".*",
            matches in 0usize..5usize
          ) {
            let connect = AcquisitionError::connect_failed(port.clone(), reason.clone());
            let msg = connect.to_string();
            prop_assert!(msg.contains(&port));
            prop_assert!(msg.contains(&reason));

            let decode = AcquisitionError::decode(details.clone());
            prop_assert!(decode.to_string().contains(&details));

            let selection = AcquisitionError::no_port_selected(matches, Vec::new());
            prop_assert!(selection.to_string().contains(&matches.to_string()));
          }

          #[test]
          fn source_chain_is_preserved(base_message in ".*") {
            let io = std::io::Error::other(base_message.clone());
            let err = AcquisitionError::connect_failed_with_source("COM7", "open failed", Box::new(io));

            let source = std::error::Error::source(&err).map(|s| s.to_string());
            prop_assert_eq!(source, Some(base_message));
          }
        }
    }

    #[test]
    fn only_structural_errors_are_actionable() {
        assert!(AcquisitionError::enumeration_failed("udev").is_actionable());
        assert!(AcquisitionError::no_port_selected(0, Vec::new()).is_actionable());
        assert!(AcquisitionError::connect_failed("COM3", "busy").is_actionable());
        assert!(AcquisitionError::NotConnected.is_actionable());

        assert!(!AcquisitionError::decode("{bad}").is_actionable());
        let read: AcquisitionError = std::io::Error::other("unplugged").into();
        assert!(!read.is_actionable());
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<AcquisitionError>();

        let error = AcquisitionError::NotConnected;
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn recovery_methods_work() {
        let connect = AcquisitionError::connect_failed("COM3", "busy");
        let selection = AcquisitionError::no_port_selected(2, Vec::new());

        assert!(connect.is_retryable());
        assert!(!selection.is_retryable());
        assert!(!AcquisitionError::NotConnected.is_retryable());
        assert!(!AcquisitionError::decode("{bad}").is_retryable());

        for suggestion in connect.recovery_suggestions() {
            assert!(suggestion.len() > 5);
        }
        assert!(!selection.recovery_suggestions().is_empty());
    }

    #[test]
    fn no_port_selected_keeps_enumerated_ports() {
        let ports = vec![
            PortDescriptor::new("/dev/ttyUSB0", "USB Serial"),
            PortDescriptor::new("/dev/ttyACM0", "Arduino Uno"),
        ];
        match AcquisitionError::no_port_selected(2, ports) {
            AcquisitionError::NoPortSelected { matches, available } => {
                assert_eq!(matches, 2);
                assert_eq!(available.len(), 2);
                assert_eq!(available[1].id, "/dev/ttyACM0");
            }
            other => panic!("Expected NoPortSelected, got {other:?}"),
        }
    }
}
