//! # Native Messaging Framing
//!
//! Every message on a native messaging channel is a 4-byte header holding the
//! payload length as a `u32` in the platform's native byte order, followed by
//! that many bytes of UTF-8 JSON.
//!
//! ```text
//! ┌──────────────┬───────────────────────────────┐
//! │ len (u32 ne) │ JSON payload (len bytes)       │
//! └──────────────┴───────────────────────────────┘
//! ```
//!
//! The codec itself is `native_messaging::host`. This module pins the size
//! limits for both directions and folds the crate's errors into [`FrameError`].

use native_messaging::host::{self, NmError};
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::Value;
use std::io::{self, Read, Write};
use thiserror::Error;

/// Number of bytes in the length header.
pub const HEADER_LEN: usize = 4;

/// Largest payload a host is allowed to send to its client.
pub const MAX_FROM_HOST: usize = 1024 * 1024;

/// Largest payload a host accepts from its client. Chrome allows up to 4 GiB,
/// but a length that large from a test client is a corrupt header.
pub const MAX_TO_HOST: usize = 64 * 1024 * 1024;

/// Errors produced while reading or writing frames.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error(transparent)]
    Transport(#[from] NmError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize `message` and write it as one frame.
pub fn write_message<W: Write, T: Serialize>(
    writer: &mut W,
    message: &T,
) -> Result<(), FrameError> {
    host::send_json(&mut *writer, message)?;
    writer.flush()?;
    Ok(())
}

/// Read one raw frame payload.
///
/// Returns `Ok(None)` when the peer has closed the stream.
pub fn read_frame<R: Read>(reader: &mut R, limit: usize) -> Result<Option<String>, FrameError> {
    match host::decode_message_opt(&mut *reader, limit) {
        Ok(payload) => Ok(payload),
        Err(NmError::Disconnected) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read one frame and parse it as JSON.
pub fn read_message<R: Read>(reader: &mut R, limit: usize) -> Result<Option<Value>, FrameError> {
    match read_frame(reader, limit)? {
        Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
        None => Ok(None),
    }
}

/// Read one frame without re-encoding it, so it can be forwarded verbatim.
pub fn read_raw<R: Read>(reader: &mut R, limit: usize) -> Result<Option<Box<RawValue>>, FrameError> {
    match read_frame(reader, limit)? {
        Some(payload) => Ok(Some(RawValue::from_string(payload)?)),
        None => Ok(None),
    }
}
