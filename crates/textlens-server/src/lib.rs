//! Lifecycle management for the textlens OCR server.
//!
//! Owns one HTTP listener, one realtime hub and one recognizer gate;
//! exposes start/stop, observable event registries and human-readable
//! bind addresses.

pub mod lifecycle;
pub mod net;

pub use lifecycle::{LifecycleManager, LifecycleState};
pub use net::{local_ipv4, server_address, websocket_address, NO_NETWORK};
