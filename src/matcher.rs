//! Port auto-detection.
//!
//! Detection is a heuristic over port descriptions, so the matcher is
//! pluggable: any `Fn(&PortDescriptor) -> bool` works, and
//! [`VendorMatcher`] covers the usual "description contains a vendor
//! string" case. Selection only succeeds on exactly one match.

use crate::types::PortDescriptor;
use crate::{AcquisitionError, Result};

/// Decides whether an enumerated port looks like the device
pub trait PortMatcher: Send + Sync {
    fn matches(&self, port: &PortDescriptor) -> bool;
}

impl<F> PortMatcher for F
where
    F: Fn(&PortDescriptor) -> bool + Send + Sync,
{
    fn matches(&self, port: &PortDescriptor) -> bool {
        self(port)
    }
}

/// Case-insensitive substring match against an allow-list of vendor strings
#[derive(Debug, Clone)]
pub struct VendorMatcher {
    signatures: Vec<String>,
}

impl VendorMatcher {
    pub fn new<I, S>(signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            signatures: signatures
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn signatures(&self) -> &[String] {
        &self.signatures
    }
}

impl Default for VendorMatcher {
    fn default() -> Self {
        Self::new(["arduino", "usb"])
    }
}

impl PortMatcher for VendorMatcher {
    fn matches(&self, port: &PortDescriptor) -> bool {
        let description = port.description.to_lowercase();
        self.signatures.iter().any(|signature| description.contains(signature.as_str()))
    }
}

/// Pick the single port accepted by `matcher`.
///
/// Zero or several matches fail with `NoPortSelected`, carrying the full list
/// so the caller can offer a manual choice.
pub fn select_port(ports: Vec<PortDescriptor>, matcher: &dyn PortMatcher) -> Result<PortDescriptor> {
    let mut candidates = ports.iter().filter(|port| matcher.matches(port));

    match (candidates.next(), candidates.next()) {
        (Some(only), None) => Ok(only.clone()),
        (None, _) => Err(AcquisitionError::no_port_selected(0, ports)),
        (Some(_), Some(_)) => {
            let matches = ports.iter().filter(|port| matcher.matches(port)).count();
            Err(AcquisitionError::no_port_selected(matches, ports))
        }
    }
}
