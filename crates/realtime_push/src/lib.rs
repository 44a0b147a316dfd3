//! # Realtime Push
//!
//! Session-keyed fan-out of notification payloads to currently connected
//! clients. Nothing here is durable: the routing table lives in memory and
//! clients re-subscribe after a restart.

/// The routing table and live sessions.
mod registry;
pub use registry::*;

/// Payload and configuration types.
mod types;
pub use types::*;
