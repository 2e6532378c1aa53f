//! Watcher session lifecycle.

pub mod manager;

pub use manager::WatchSession;
