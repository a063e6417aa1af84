//! End-to-end tests against the built binary
//!
//! The binary doubles as an echo host, so these tests register it with a
//! manifest in a temp directory and drive it through the real process
//! transport, exactly as the panel does.

use host_test::native::framing::{read_message, write_message, MAX_FROM_HOST};
use host_test::native::manifest::Manifest;
use host_test::native::{Connector, Port, PortEvent, ProcessConnector};
use host_test::panel::{BufferedView, ConnectionPanel, PanelSettings, PanelState};
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

const ORIGIN: &str = "chrome-extension://host-test/";
const HOST: &str = "io.github.example.host";

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_host-test"))
}

/// Register the test binary as `HOST` in `dir`.
fn register_echo_host(dir: &Path) {
    let manifest = Manifest::new(HOST, "echo", binary(), vec![ORIGIN.to_string()]);
    std::fs::create_dir_all(dir).unwrap();
    let contents = serde_json::to_string_pretty(&manifest).unwrap();
    std::fs::write(dir.join(format!("{HOST}.json")), contents).unwrap();
}

/// Poll `f` until it yields a value or five seconds pass.
fn wait_for<T>(mut f: impl FnMut() -> Option<T>) -> T {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(value) = f() {
            return value;
        }
        assert!(Instant::now() < deadline, "timed out waiting");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_echo_host_over_stdio() {
    let mut child = Command::new(binary())
        .arg("--echo-host")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    {
        let mut stdin = child.stdin.take().unwrap();
        write_message(&mut stdin, &json!({"t": 1})).unwrap();
        write_message(&mut stdin, &json!({"v": 1, "client_id": "1"})).unwrap();
        stdin.flush().unwrap();
        // Dropping stdin ends the session.
    }

    let mut stdout = child.stdout.take().unwrap();
    assert_eq!(
        read_message(&mut stdout, MAX_FROM_HOST).unwrap(),
        Some(json!({"t": 1}))
    );
    assert_eq!(
        read_message(&mut stdout, MAX_FROM_HOST).unwrap(),
        Some(json!({"v": 1, "client_id": "1"}))
    );
    assert_eq!(read_message(&mut stdout, MAX_FROM_HOST).unwrap(), None);

    assert!(child.wait().unwrap().success());
}

#[test]
fn test_process_port_round_trip() {
    let temp = TempDir::new().unwrap();
    register_echo_host(temp.path());

    let mut connector = ProcessConnector::new(vec![temp.path().to_path_buf()], ORIGIN);
    let mut port = connector.connect(HOST).unwrap();

    port.post_message(&json!({"t": 99})).unwrap();
    let event = wait_for(|| port.try_recv());
    assert_eq!(event, PortEvent::Message(json!({"t": 99})));

    port.disconnect();
}

#[test]
fn test_panel_session_against_echo_host() {
    let temp = TempDir::new().unwrap();
    register_echo_host(temp.path());

    let connector = ProcessConnector::new(vec![temp.path().to_path_buf()], ORIGIN);
    let mut panel = ConnectionPanel::new(
        Box::new(connector),
        BufferedView::default(),
        PanelSettings::default(),
    );

    panel.connect(HOST);
    assert_eq!(panel.state(), PanelState::Connected);

    panel.send_handshake();
    wait_for(|| (panel.pump() > 0).then_some(()));

    let received = panel
        .view()
        .log
        .lines()
        .iter()
        .find(|l| l.starts_with("Received: "))
        .cloned()
        .unwrap();
    assert!(received.starts_with(r#"Received: {"v":1,"client_id":"922040684020645908","nonce":"#));

    panel.disconnect();
    assert_eq!(panel.state(), PanelState::Disconnected);
    assert!(panel.host_id().is_none());
    assert_eq!(panel.view().log.lines().last().unwrap(), "Disconnected");
}

#[test]
fn test_list_hosts_with_config_dir() {
    let temp = TempDir::new().unwrap();
    let hosts_dir = temp.path().join("hosts");
    register_echo_host(&hosts_dir);

    let config_path = temp.path().join("config.json");
    let config = json!({ "manifest_dirs": [hosts_dir] });
    std::fs::write(&config_path, config.to_string()).unwrap();

    let output = Command::new(binary())
        .arg("--list-hosts")
        .arg("--config")
        .arg(&config_path)
        .arg("--log-file")
        .arg(temp.path().join("test.log"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(HOST));
}

#[cfg(unix)]
#[test]
fn test_set_activity_without_discord_fails_cleanly() {
    let temp = TempDir::new().unwrap();

    let output = Command::new(binary())
        .args(["--set-activity", "922040684020645908", "Testing"])
        .env("XDG_RUNTIME_DIR", temp.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error connecting to Discord socket"));
}

#[cfg(unix)]
#[test]
fn test_set_activity_rejects_unknown_client_name() {
    let output = Command::new(binary())
        .args(["--set-activity", "not-a-client", "Testing"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid CLIENT_ID"));
}
