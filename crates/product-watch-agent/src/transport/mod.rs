//! Transport layer for host communication.

pub mod framing;
pub mod stdio;

pub use stdio::StdioTransport;
