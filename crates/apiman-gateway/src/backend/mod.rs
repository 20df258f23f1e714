//! Backend module.

mod forwarder;
mod probe;

pub use forwarder::{Forwarder, REQUEST_ID_HEADER};
pub use probe::{DescriptorProbe, ProbeOutcome};
