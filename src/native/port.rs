//! Connection primitives.
//!
//! [`Connector`] is the "connect to native host" primitive and [`Port`] is the
//! handle it returns. Inbound traffic is not pushed through callbacks; the
//! owner polls [`Port::try_recv`] from its own event loop so every handler
//! runs on the same thread.

use super::manifest::ManifestError;
use serde_json::Value;
use std::io;
use thiserror::Error;

/// Something that happened on the remote side of a port.
#[derive(Debug, Clone, PartialEq)]
pub enum PortEvent {
    /// One inbound message, in arrival order.
    Message(Value),
    /// The host or the transport closed the channel. Sent at most once.
    Disconnected { reason: Option<String> },
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("access to native messaging host {host} is forbidden for origin {origin}")]
    OriginNotAllowed { host: String, origin: String },

    #[error("failed to start native messaging host {path}: {source}")]
    Spawn { path: String, source: io::Error },
}

#[derive(Debug, Error)]
pub enum PortError {
    #[error("attempting to use a disconnected port")]
    Closed,
}

/// An open channel to a native messaging host.
pub trait Port {
    /// Send one message. Delivery is fire-and-forget.
    fn post_message(&mut self, message: &Value) -> Result<(), PortError>;

    /// Next pending inbound event, if any.
    fn try_recv(&mut self) -> Option<PortEvent>;

    /// Close the channel from the local side. Safe to call more than once.
    fn disconnect(&mut self);
}

/// Opens ports to native messaging hosts by name.
pub trait Connector {
    fn connect(&mut self, host_id: &str) -> Result<Box<dyn Port>, ConnectError>;
}
