//! Data types exchanged with the host.

pub mod error;
pub mod message;

pub use error::*;
pub use message::*;
