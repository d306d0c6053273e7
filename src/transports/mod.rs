//! Transport implementations

pub mod mock;
pub mod serial;

pub use mock::{MockConnector, MockHandle, MockTransport};
pub use serial::{SerialConnector, SerialTransport};
