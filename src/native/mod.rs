//! # Native Messaging
//!
//! The transport side of host-test: everything needed to act as the browser
//! end of a native messaging channel.
//!
//! ## Submodules
//!
//! - [`framing`] - length-prefixed JSON wire codec
//! - [`manifest`] - host manifests: validation, lookup, install, listing
//! - [`port`] - the [`Connector`] / [`Port`] traits the panel is written against
//! - [`process`] - spawns a registered host and talks to it over stdio
//! - [`echo`] - a built-in host that reflects every request

pub mod echo;
pub mod framing;
pub mod manifest;
pub mod port;
pub mod process;

pub use port::{ConnectError, Connector, Port, PortError, PortEvent};
pub use process::ProcessConnector;
