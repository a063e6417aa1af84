//! A native messaging host that sends every request straight back.
//!
//! Useful as a known-good peer when exercising the panel or a browser
//! extension. Runs until the client closes the stream.

use super::framing::{self, FrameError, MAX_TO_HOST};
use std::io::{Read, Write};

/// Echo frames from `input` to `output` until a clean end of stream.
///
/// Returns the number of messages echoed. Payload text is forwarded as
/// received; frames over [`MAX_TO_HOST`] end the session with an error.
pub fn run<R: Read, W: Write>(input: &mut R, output: &mut W) -> Result<usize, FrameError> {
    let mut count = 0;
    while let Some(payload) = framing::read_raw(input, MAX_TO_HOST)? {
        framing::write_message(output, &payload)?;
        count += 1;
    }
    tracing::info!(messages = count, "client closed the stream");
    Ok(count)
}
