//! # Discord IPC
//!
//! A minimal client for the local Discord RPC socket, enough to set a rich
//! presence activity from the command line with the same payloads the panel
//! sends to a bridge host.
//!
//! ## Wire Format
//!
//! ```text
//! ┌────────────────┬────────────────┬──────────────────────┐
//! │ opcode (u32 le)│ len (u32 le)   │ JSON payload (len)   │
//! └────────────────┴────────────────┴──────────────────────┘
//! ```
//!
//! The first packet a client sends is a `Handshake`; everything after it is a
//! `Frame`. Discord may interleave `Ping` packets, which are answered with a
//! `Pong` carrying the same payload, and ends the session with `Close`.
//!
//! ## Socket Location
//!
//! `discord-ipc-0` through `discord-ipc-9` inside the first of
//! `$XDG_RUNTIME_DIR`, `$TMPDIR`, `$TMP`, `$TEMP` that is set, falling back
//! to the system temp directory.

use serde::Serialize;
use serde_json::Value;
use std::env;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Bytes in a packet header: opcode then payload length.
pub const HEADER_LEN: usize = 8;

/// Largest payload accepted from Discord.
pub const MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Sockets are numbered `discord-ipc-0` to `discord-ipc-9`.
const SOCKET_SLOTS: u32 = 10;

/// Well-known applications that can be named instead of giving an id.
pub const KNOWN_CLIENTS: &[(&str, &str)] = &[
    ("monkeytype", "798272335035498557"),
    ("wanikani", "800166344023867443"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Handshake,
    Frame,
    Close,
    Ping,
    Pong,
}

impl Opcode {
    fn code(self) -> u32 {
        match self {
            Opcode::Handshake => 0,
            Opcode::Frame => 1,
            Opcode::Close => 2,
            Opcode::Ping => 3,
            Opcode::Pong => 4,
        }
    }

    fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Opcode::Handshake),
            1 => Some(Opcode::Frame),
            2 => Some(Opcode::Close),
            3 => Some(Opcode::Ping),
            4 => Some(Opcode::Pong),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("invalid CLIENT_ID '{value}'; must be a number or one of: [{known}]")]
    InvalidClientId { value: String, known: String },

    #[error("no Discord IPC socket in {}: {source}", dir.display())]
    NoSocket { dir: PathBuf, source: io::Error },

    #[error("Discord IPC is not supported on this platform")]
    Unsupported,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("unexpected opcode {0}")]
    UnknownOpcode(u32),

    #[error("payload of {len} bytes exceeds the {limit}-byte limit")]
    TooLarge { len: usize, limit: usize },

    #[error("wanted {expected}-byte payload, read {got} bytes")]
    Truncated { expected: usize, got: usize },

    #[error("Discord IPC connection terminated: {0}")]
    Closed(String),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// One packet on the socket.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub opcode: Opcode,
    pub payload: Vec<u8>,
}

/// Turn a numeric id or a [`KNOWN_CLIENTS`] name into a client id.
pub fn resolve_client_id(value: &str) -> Result<String, IpcError> {
    if let Some((_, id)) = KNOWN_CLIENTS.iter().find(|(name, _)| *name == value) {
        return Ok((*id).to_string());
    }
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        return Ok(value.to_string());
    }

    let known: Vec<&str> = KNOWN_CLIENTS.iter().map(|(name, _)| *name).collect();
    Err(IpcError::InvalidClientId {
        value: value.to_string(),
        known: known.join(", "),
    })
}

/// Directory holding the `discord-ipc-N` sockets.
pub fn socket_dir() -> PathBuf {
    ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"]
        .iter()
        .find_map(|var| env::var_os(var).filter(|v| !v.is_empty()))
        .map_or_else(env::temp_dir, PathBuf::from)
}

pub fn write_packet<W: Write>(writer: &mut W, opcode: Opcode, payload: &[u8]) -> Result<(), IpcError> {
    let len = u32::try_from(payload.len()).map_err(|_| IpcError::TooLarge {
        len: payload.len(),
        limit: u32::MAX as usize,
    })?;

    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&opcode.code().to_le_bytes());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(payload);

    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}

/// Read one packet. `Ok(None)` means the socket closed between packets.
pub fn read_packet<R: Read>(reader: &mut R) -> Result<Option<Packet>, IpcError> {
    let mut header = [0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(IpcError::Truncated {
                    expected: HEADER_LEN,
                    got: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }

    let [o0, o1, o2, o3, l0, l1, l2, l3] = header;
    let code = u32::from_le_bytes([o0, o1, o2, o3]);
    let len = u32::from_le_bytes([l0, l1, l2, l3]) as usize;

    let opcode = Opcode::from_code(code).ok_or(IpcError::UnknownOpcode(code))?;
    if len > MAX_PAYLOAD {
        return Err(IpcError::TooLarge {
            len,
            limit: MAX_PAYLOAD,
        });
    }

    let mut payload = Vec::new();
    reader.take(len as u64).read_to_end(&mut payload)?;
    if payload.len() < len {
        return Err(IpcError::Truncated {
            expected: len,
            got: payload.len(),
        });
    }

    Ok(Some(Packet { opcode, payload }))
}

/// A request/response client over any byte stream.
#[derive(Debug)]
pub struct IpcClient<S> {
    stream: S,
    handshaken: bool,
}

impl<S: Read + Write> IpcClient<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            handshaken: false,
        }
    }

    /// Send `request` and wait for Discord's answer.
    pub fn send<T: Serialize>(&mut self, request: &T) -> Result<Value, IpcError> {
        let opcode = if self.handshaken {
            Opcode::Frame
        } else {
            Opcode::Handshake
        };

        let payload = serde_json::to_vec(request)?;
        write_packet(&mut self.stream, opcode, &payload)?;
        self.handshaken = true;
        tracing::debug!(?opcode, bytes = payload.len(), "sent to Discord");

        self.next_frame()
    }

    /// Answer pings until Discord closes the session.
    ///
    /// Unsolicited frames are logged and otherwise ignored.
    pub fn serve(&mut self) -> Result<(), IpcError> {
        loop {
            match self.next_frame() {
                Ok(frame) => tracing::info!(%frame, "unsolicited frame from Discord"),
                Err(IpcError::Closed(reason)) => {
                    tracing::info!(%reason, "Discord session ended");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Read until a frame arrives, handling control packets on the way.
    fn next_frame(&mut self) -> Result<Value, IpcError> {
        loop {
            let Some(packet) = read_packet(&mut self.stream)? else {
                return Err(IpcError::Closed("socket closed".to_string()));
            };

            match packet.opcode {
                Opcode::Ping => write_packet(&mut self.stream, Opcode::Pong, &packet.payload)?,
                Opcode::Pong => {}
                Opcode::Close => {
                    let reason = String::from_utf8_lossy(&packet.payload).into_owned();
                    return Err(IpcError::Closed(reason));
                }
                Opcode::Frame | Opcode::Handshake => {
                    return Ok(serde_json::from_slice(&packet.payload)?);
                }
            }
        }
    }
}

#[cfg(unix)]
mod unix {
    use super::{IpcClient, IpcError, SOCKET_SLOTS};
    use std::io;
    use std::os::unix::net::UnixStream;
    use std::path::Path;

    /// Connect to the first live `discord-ipc-N` socket in `dir`.
    pub fn dial(dir: &Path) -> Result<IpcClient<UnixStream>, IpcError> {
        let mut last_error = io::Error::new(io::ErrorKind::NotFound, "no sockets tried");

        for slot in 0..SOCKET_SLOTS {
            let path = dir.join(format!("discord-ipc-{slot}"));
            match UnixStream::connect(&path) {
                Ok(stream) => {
                    tracing::info!(socket = %path.display(), "connected to Discord");
                    return Ok(IpcClient::new(stream));
                }
                Err(e) => last_error = e,
            }
        }

        Err(IpcError::NoSocket {
            dir: dir.to_path_buf(),
            source: last_error,
        })
    }

    impl IpcClient<UnixStream> {
        /// A second handle on the socket, for shutting it down from another thread.
        pub fn try_clone_stream(&self) -> io::Result<UnixStream> {
            self.stream.try_clone()
        }
    }
}

#[cfg(unix)]
pub use unix::dial;

#[cfg(not(unix))]
pub fn dial(_dir: &std::path::Path) -> Result<IpcClient<std::net::TcpStream>, IpcError> {
    Err(IpcError::Unsupported)
}
