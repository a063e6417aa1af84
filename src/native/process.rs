//! # Process-backed Ports
//!
//! Plays the browser's side of native messaging: the host named by a manifest
//! is spawned with the caller's origin as its only argument, requests are
//! written to its stdin and responses are read from its stdout.
//!
//! ## Threads
//!
//! Each port runs two threads so the owner never blocks on the child:
//!
//! - A writer thread owns the child's stdin and encodes queued requests. A host
//!   that stops reading stalls only this thread.
//! - A reader thread owns the child's stdout, decodes frames and forwards them
//!   over an mpsc channel, then sends exactly one [`PortEvent::Disconnected`]
//!   when the stream ends.
//!
//! Once the port is closed the receiver is dropped and anything the reader
//! thread still produces is discarded.

use super::framing::{self, MAX_FROM_HOST};
use super::manifest;
use super::port::{ConnectError, Connector, Port, PortError, PortEvent};
use serde_json::Value;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

/// Reason reported when the host closes its stdout.
pub const HOST_EXITED: &str = "Native host has exited.";

/// Connects by looking up manifests and spawning the registered executable.
#[derive(Debug, Clone)]
pub struct ProcessConnector {
    manifest_dirs: Vec<PathBuf>,
    origin: String,
}

impl ProcessConnector {
    /// `manifest_dirs` are searched in order; see [`manifest::search_dirs`].
    pub fn new(manifest_dirs: Vec<PathBuf>, origin: impl Into<String>) -> Self {
        Self {
            manifest_dirs,
            origin: origin.into(),
        }
    }

}

impl Connector for ProcessConnector {
    fn connect(&mut self, host_id: &str) -> Result<Box<dyn Port>, ConnectError> {
        let installed = manifest::find(host_id, &self.manifest_dirs)?;

        if !installed.allows_origin(&self.origin) {
            return Err(ConnectError::OriginNotAllowed {
                host: host_id.to_string(),
                origin: self.origin.clone(),
            });
        }

        let executable = installed.executable();
        tracing::info!(
            host = host_id,
            path = %executable.display(),
            origin = %self.origin,
            "spawning native messaging host"
        );

        let mut child = Command::new(&executable)
            .arg(&self.origin)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ConnectError::Spawn {
                path: executable.display().to_string(),
                source,
            })?;

        let (tx, rx) = mpsc::channel();
        match child.stdout.take() {
            Some(stdout) => spawn_reader(host_id, stdout, tx),
            None => {
                let _ = tx.send(PortEvent::Disconnected {
                    reason: Some("host stdout unavailable".to_string()),
                });
            }
        }

        let outbox = child
            .stdin
            .take()
            .and_then(|stdin| spawn_writer(host_id, stdin));

        Ok(Box::new(ProcessPort {
            host_id: host_id.to_string(),
            child: Some(child),
            outbox,
            events: rx,
        }))
    }
}

fn spawn_reader(host_id: &str, stdout: ChildStdout, tx: Sender<PortEvent>) {
    let host_id = host_id.to_string();
    let name = format!("host-reader:{host_id}");

    let spawned = thread::Builder::new().name(name).spawn({
        let tx = tx.clone();
        move || read_loop(&host_id, stdout, &tx)
    });

    if let Err(e) = spawned {
        let _ = tx.send(PortEvent::Disconnected {
            reason: Some(format!("failed to start reader thread: {e}")),
        });
    }
}

/// Start the thread that feeds the child's stdin. `None` if it could not start.
fn spawn_writer(host_id: &str, stdin: ChildStdin) -> Option<Sender<Value>> {
    let host_id = host_id.to_string();
    let (tx, rx) = mpsc::channel::<Value>();

    let spawned = thread::Builder::new()
        .name(format!("host-writer:{host_id}"))
        .spawn(move || write_loop(&host_id, stdin, &rx));

    match spawned {
        Ok(_) => Some(tx),
        Err(e) => {
            tracing::warn!(error = %e, "failed to start writer thread");
            None
        }
    }
}

fn write_loop(host_id: &str, mut stdin: ChildStdin, outbox: &Receiver<Value>) {
    // Ends when the port drops its sender; stdin closes with this thread.
    for message in outbox {
        if let Err(e) = framing::write_message(&mut stdin, &message) {
            tracing::warn!(host = host_id, error = %e, "failed to write to host");
            return;
        }
        tracing::debug!(host = host_id, %message, "message to host");
    }
}

fn read_loop(host_id: &str, stdout: ChildStdout, tx: &Sender<PortEvent>) {
    let mut reader = BufReader::new(stdout);

    let reason = loop {
        match framing::read_message(&mut reader, MAX_FROM_HOST) {
            Ok(Some(message)) => {
                tracing::debug!(host = host_id, %message, "message from host");
                if tx.send(PortEvent::Message(message)).is_err() {
                    // Port already closed locally.
                    return;
                }
            }
            Ok(None) => break HOST_EXITED.to_string(),
            Err(e) => {
                break format!("Error when communicating with the native messaging host: {e}")
            }
        }
    };

    tracing::info!(host = host_id, %reason, "host channel closed");
    let _ = tx.send(PortEvent::Disconnected {
        reason: Some(reason),
    });
}

/// A port backed by a child process.
#[derive(Debug)]
pub struct ProcessPort {
    host_id: String,
    child: Option<Child>,
    outbox: Option<Sender<Value>>,
    events: Receiver<PortEvent>,
}

impl Port for ProcessPort {
    /// Queue `message` for the writer thread. Never blocks on the child.
    fn post_message(&mut self, message: &Value) -> Result<(), PortError> {
        let outbox = self.outbox.as_ref().ok_or(PortError::Closed)?;
        outbox
            .send(message.clone())
            .map_err(|_| PortError::Closed)
    }

    fn try_recv(&mut self) -> Option<PortEvent> {
        self.events.try_recv().ok()
    }

    fn disconnect(&mut self) {
        // The writer thread closes stdin, the host's cue to exit.
        drop(self.outbox.take());

        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                tracing::debug!(host = %self.host_id, error = %e, "host already exited");
            }
            match child.wait() {
                Ok(status) => tracing::info!(host = %self.host_id, %status, "host stopped"),
                Err(e) => tracing::warn!(host = %self.host_id, error = %e, "failed to reap host"),
            }
        }
    }
}

impl Drop for ProcessPort {
    fn drop(&mut self) {
        self.disconnect();
    }
}
