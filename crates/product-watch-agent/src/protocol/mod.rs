//! Host protocol handling: message dispatch.

pub mod handler;

pub use handler::{LogControl, NoopLogControl, ProtocolHandler};
