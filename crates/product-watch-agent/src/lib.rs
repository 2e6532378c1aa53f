//! ProductWatch agent: drives a watcher from a host process over
//! newline-delimited JSON on stdio.

pub mod config;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod types;

pub use config::{load_config, resolve_config_path, resolve_store_path};
pub use protocol::{LogControl, ProtocolHandler};
pub use session::WatchSession;
pub use transport::StdioTransport;
