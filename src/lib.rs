//! host-test - a terminal test harness for browser native messaging hosts
//!
//! This library provides the connection panel state machine, the native
//! messaging transport it drives (manifests, framing, spawned host processes),
//! the ratatui front end, and a small Discord IPC client that sends the same
//! payloads straight to Discord.

pub mod discord;
pub mod logging;
pub mod messages;
pub mod native;
pub mod panel;
pub mod ui;
