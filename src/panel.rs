//! # Connection Panel
//!
//! The state machine behind the UI. A [`ConnectionPanel`] holds at most one
//! open [`Port`], mediates the user actions (connect, handshake, set activity,
//! ping, disconnect) and reacts to the two inbound events (message, remote
//! disconnect).
//!
//! ## States
//!
//! ```text
//!                connect(host) ok
//!   Disconnected ─────────────────▶ Connected
//!        ▲                              │
//!        └──────────────────────────────┘
//!         disconnect() / remote disconnect
//! ```
//!
//! The panel never touches a terminal. Output goes through an injected
//! [`PanelView`], and the port comes from an injected [`Connector`], so every
//! transition can be driven from a test.
//!
//! ## Control Enablement
//!
//! | Control | Disconnected | Connected |
//! |---------|--------------|-----------|
//! | Host input, Connect | enabled | disabled |
//! | Disconnect | disabled | enabled |
//! | Handshake, Set activity, Ping | enabled | enabled |

use crate::messages::{nonce_now, CommandRequest, Handshake, Ping};
use crate::native::{Connector, Port, PortEvent};
use serde::Serialize;
use serde_json::Value;

/// Client id of the Chrome/Discord bridge development app.
pub const DEFAULT_CLIENT_ID: &str = "922040684020645908";

/// Activity state sent by the set-activity action.
pub const DEFAULT_ACTIVITY_STATE: &str = "Testing with host-test";

/// The user-facing controls whose enabled state mirrors the panel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    HostInput,
    Connect,
    Handshake,
    SetActivity,
    Ping,
    Disconnect,
}

impl Control {
    /// Display order.
    pub const ALL: [Control; 6] = [
        Control::HostInput,
        Control::Connect,
        Control::Handshake,
        Control::SetActivity,
        Control::Ping,
        Control::Disconnect,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Control::HostInput => "Host",
            Control::Connect => "Connect",
            Control::Handshake => "Handshake",
            Control::SetActivity => "Set Activity",
            Control::Ping => "Ping",
            Control::Disconnect => "Disconnect",
        }
    }

    /// Single-key shortcut, if the control has one.
    pub fn shortcut(self) -> Option<char> {
        match self {
            Control::HostInput => None,
            Control::Connect => Some('c'),
            Control::Handshake => Some('h'),
            Control::SetActivity => Some('a'),
            Control::Ping => Some('p'),
            Control::Disconnect => Some('d'),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// What the panel needs from whatever displays it.
pub trait PanelView {
    fn set_control_enabled(&mut self, control: Control, enabled: bool);
    fn append_log(&mut self, line: String);
}

/// Append-only log of panel output. Never evicts.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    lines: Vec<String>,
}

impl LogBuffer {
    pub fn push(&mut self, line: String) {
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// True if some entry is exactly `line`.
    pub fn contains(&self, line: &str) -> bool {
        self.lines.iter().any(|l| l == line)
    }
}

const CONTROL_COUNT: usize = Control::ALL.len();

/// Enabled flags for every [`Control`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlStates([bool; CONTROL_COUNT]);

impl Default for ControlStates {
    fn default() -> Self {
        Self([true; CONTROL_COUNT])
    }
}

impl ControlStates {
    pub fn is_enabled(&self, control: Control) -> bool {
        self.0[control.index()]
    }

    pub fn set(&mut self, control: Control, enabled: bool) {
        self.0[control.index()] = enabled;
    }
}

/// In-memory [`PanelView`]: the log plus control flags, read by the renderer.
#[derive(Debug, Clone, Default)]
pub struct BufferedView {
    pub log: LogBuffer,
    pub controls: ControlStates,
}

impl PanelView for BufferedView {
    fn set_control_enabled(&mut self, control: Control, enabled: bool) {
        self.controls.set(control, enabled);
    }

    fn append_log(&mut self, line: String) {
        self.log.push(line);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Disconnected,
    Connected,
}

/// Values baked into the outgoing demo payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelSettings {
    pub client_id: String,
    pub activity_state: String,
    /// Placeholder pid; the remote end requires the field but not a real process.
    pub activity_pid: u32,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            activity_state: DEFAULT_ACTIVITY_STATE.to_string(),
            activity_pid: 0,
        }
    }
}

/// The open channel. Existing only inside `Some` keeps "handle iff connected"
/// true by construction.
struct Connection {
    host_id: String,
    port: Box<dyn Port>,
}

pub struct ConnectionPanel<V: PanelView> {
    connector: Box<dyn Connector>,
    view: V,
    settings: PanelSettings,
    connection: Option<Connection>,
}

impl<V: PanelView> ConnectionPanel<V> {
    pub fn new(connector: Box<dyn Connector>, view: V, settings: PanelSettings) -> Self {
        let mut panel = Self {
            connector,
            view,
            settings,
            connection: None,
        };
        panel.view.set_control_enabled(Control::Handshake, true);
        panel.view.set_control_enabled(Control::SetActivity, true);
        panel.view.set_control_enabled(Control::Ping, true);
        panel.apply_controls();
        panel
    }

    pub fn state(&self) -> PanelState {
        if self.connection.is_some() {
            PanelState::Connected
        } else {
            PanelState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Host id of the open connection.
    pub fn host_id(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.host_id.as_str())
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Open a port to `host_id`.
    ///
    /// A second connect while one is open is rejected: it is logged and the
    /// existing port stays as it is.
    pub fn connect(&mut self, host_id: &str) {
        if let Some(existing) = &self.connection {
            tracing::warn!(
                requested = host_id,
                current = %existing.host_id,
                "connect ignored: already connected"
            );
            self.log("Already connected".to_string());
            return;
        }

        match self.connector.connect(host_id) {
            Ok(port) => {
                tracing::info!(host = host_id, "connected");
                self.connection = Some(Connection {
                    host_id: host_id.to_string(),
                    port,
                });
                self.log(format!("Connected to {host_id}"));
            }
            Err(e) => {
                tracing::warn!(host = host_id, error = %e, "connect failed");
                self.log(format!("Failed to connect to {host_id}: {e}"));
            }
        }
        self.apply_controls();
    }

    pub fn send_handshake(&mut self) {
        if !self.ensure_connected("handshake") {
            return;
        }
        let payload = Handshake::new(&self.settings.client_id, nonce_now());
        self.post("handshake", &payload);
    }

    pub fn send_activity(&mut self) {
        if !self.ensure_connected("set activity") {
            return;
        }
        let payload = CommandRequest::set_activity(
            self.settings.activity_pid,
            &self.settings.activity_state,
            None,
            nonce_now(),
        );
        self.post("set activity", &payload);
    }

    pub fn send_ping(&mut self) {
        if !self.ensure_connected("ping") {
            return;
        }
        self.post("ping", &Ping { t: nonce_now() });
    }

    /// Close the port from our side.
    pub fn disconnect(&mut self) {
        let Some(mut connection) = self.connection.take() else {
            tracing::info!("disconnect ignored: not connected");
            return;
        };

        connection.port.disconnect();
        tracing::info!(host = %connection.host_id, "disconnected by user");
        self.log("Disconnected".to_string());
        self.apply_controls();
    }

    /// Inbound message handler.
    pub fn on_message(&mut self, payload: Value) {
        if self.connection.is_none() {
            tracing::info!(%payload, "message ignored: not connected");
            return;
        }
        self.log(format!("Received: {payload}"));
    }

    /// Remote disconnect handler. `reason` is appended as its own line.
    pub fn on_remote_disconnect(&mut self, reason: Option<String>) {
        let Some(mut connection) = self.connection.take() else {
            tracing::info!("remote disconnect ignored: not connected");
            return;
        };

        // Reap whatever is left of the host process.
        connection.port.disconnect();
        tracing::info!(host = %connection.host_id, ?reason, "disconnected by remote host");

        self.log("Disconnected by remote host".to_string());
        if let Some(reason) = reason {
            self.log(format!("Error: {reason}"));
        }
        self.apply_controls();
    }

    /// Dispatch every pending port event in arrival order.
    ///
    /// Returns how many events were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;

        loop {
            let Some(connection) = self.connection.as_mut() else {
                break;
            };
            let Some(event) = connection.port.try_recv() else {
                break;
            };

            handled += 1;
            match event {
                PortEvent::Message(payload) => self.on_message(payload),
                PortEvent::Disconnected { reason } => self.on_remote_disconnect(reason),
            }
        }

        handled
    }

    fn ensure_connected(&self, action: &str) -> bool {
        if self.connection.is_none() {
            tracing::warn!(action, "not sent: not connected");
            return false;
        }
        true
    }

    fn post<T: Serialize>(&mut self, action: &str, payload: &T) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };

        let message = match serde_json::to_value(payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(action, error = %e, "failed to serialize payload");
                return;
            }
        };

        if let Err(e) = connection.port.post_message(&message) {
            tracing::warn!(action, host = %connection.host_id, error = %e, "send failed");
        }
    }

    fn apply_controls(&mut self) {
        let connected = self.is_connected();
        self.view.set_control_enabled(Control::HostInput, !connected);
        self.view.set_control_enabled(Control::Connect, !connected);
        self.view.set_control_enabled(Control::Disconnect, connected);
    }

    fn log(&mut self, line: String) {
        self.view.append_log(line);
    }
}
