//! # UI Module
//!
//! Terminal front end for the connection panel.
//!
//! ## Components
//!
//! - [`App`] - focus, host input, log scrolling, key handling
//! - [`mod@render`] - draws the panel with ratatui
//! - [`theme`] - built-in color themes
//! - [`config`] - read-only user configuration
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │  host-test   ● connected to io.github.p00ya.cdb │
//! ├─────────────────────────────────────────────────┤
//! │ Native messaging host: io.github.p00ya.cdb      │
//! ├─────────┬──────────┬──────────┬──────┬──────────┤
//! │ Connect │Handshake │ Activity │ Ping │Disconnect│
//! ├─────────┴──────────┴──────────┴──────┴──────────┤
//! │ Output                                          │
//! │ Connected to io.github.p00ya.cdb                │
//! │ Received: {"cmd":"DISPATCH",...}                │
//! ├─────────────────────────────────────────────────┤
//! │ footer                                          │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod config;
pub mod render;
pub mod theme;

pub use app::App;
pub use config::Config;
pub use render::render;
