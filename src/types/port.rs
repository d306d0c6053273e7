//! Serial port descriptors

use serde::{Deserialize, Serialize};
use std::fmt;

/// A port reported by enumeration: its identifier and a human-readable description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortDescriptor {
    /// Device path or name (`/dev/ttyACM0`, `COM3`)
    pub id: String,
    /// Description reported by the platform (`Arduino Uno`, `USB Serial Device`)
    pub description: String,
}

impl PortDescriptor {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self { id: id.into(), description: description.into() }
    }
}

impl fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.id, self.description)
    }
}
