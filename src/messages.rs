//! # Demo Payloads
//!
//! The hand-crafted messages the panel can send, also used verbatim by the
//! `--set-activity` Discord client. Field names follow the Discord IPC
//! protocol spoken by the Chrome/Discord bridge host.
//!
//! | Action | Payload |
//! |--------|---------|
//! | Handshake | `{"v":1,"client_id":"…","nonce":1700000000000}` |
//! | Set activity | `{"nonce":…,"cmd":"SET_ACTIVITY","args":{"pid":0,"activity":{"state":"…"}}}` |
//! | Ping | `{"t":1700000000000}` |

use chrono::Utc;
use serde::Serialize;

/// Only known handshake protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Command name for rich presence updates.
pub const SET_ACTIVITY: &str = "SET_ACTIVITY";

/// Current time in milliseconds since the Unix epoch, used as a nonce.
pub fn nonce_now() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Handshake {
    pub v: u32,
    pub client_id: String,
    pub nonce: i64,
}

impl Handshake {
    pub fn new(client_id: &str, nonce: i64) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            client_id: client_id.to_string(),
            nonce,
        }
    }
}

/// Rich presence activity. Only the fields the harness sets are modelled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetActivityArgs {
    /// The remote end rejects requests without a pid, even a meaningless one.
    pub pid: u32,
    pub activity: Activity,
}

/// Outer frame of a command request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandRequest<A> {
    pub nonce: i64,
    pub cmd: String,
    pub args: A,
}

impl CommandRequest<SetActivityArgs> {
    pub fn set_activity(pid: u32, state: &str, details: Option<&str>, nonce: i64) -> Self {
        Self {
            nonce,
            cmd: SET_ACTIVITY.to_string(),
            args: SetActivityArgs {
                pid,
                activity: Activity {
                    state: state.to_string(),
                    details: details.map(str::to_string),
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ping {
    pub t: i64,
}
