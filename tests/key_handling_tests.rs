//! Keyboard event handling tests
//!
//! Tests for keyboard input handling: host input editing, shortcuts,
//! focus traversal and quitting.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use host_test::native::{ConnectError, Connector, Port, PortError, PortEvent};
use host_test::panel::{BufferedView, ConnectionPanel, Control, PanelSettings};
use host_test::ui::theme::Theme;
use host_test::ui::App;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Helper to create a key event
fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::empty())
}

struct RecordingPort {
    sent: Arc<Mutex<Vec<Value>>>,
}

impl Port for RecordingPort {
    fn post_message(&mut self, message: &Value) -> Result<(), PortError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn try_recv(&mut self) -> Option<PortEvent> {
        None
    }

    fn disconnect(&mut self) {}
}

struct RecordingConnector {
    hosts: Arc<Mutex<Vec<String>>>,
    sent: Arc<Mutex<Vec<Value>>>,
}

impl Connector for RecordingConnector {
    fn connect(&mut self, host_id: &str) -> Result<Box<dyn Port>, ConnectError> {
        self.hosts.lock().unwrap().push(host_id.to_string());
        Ok(Box::new(RecordingPort {
            sent: Arc::clone(&self.sent),
        }))
    }
}

/// Helper to create a test app plus handles on what it connected to and sent
fn create_test_app() -> (App, Arc<Mutex<Vec<String>>>, Arc<Mutex<Vec<Value>>>) {
    let hosts = Arc::new(Mutex::new(Vec::new()));
    let sent = Arc::new(Mutex::new(Vec::new()));
    let connector = RecordingConnector {
        hosts: Arc::clone(&hosts),
        sent: Arc::clone(&sent),
    };
    let panel = ConnectionPanel::new(
        Box::new(connector),
        BufferedView::default(),
        PanelSettings::default(),
    );
    let app = App::new(
        panel,
        "io.example".to_string(),
        Theme::default_theme().clone(),
    );
    (app, hosts, sent)
}

#[tokio::test]
async fn test_quit_with_q_key() {
    let (mut app, _, _) = create_test_app();
    assert!(!app.should_quit);

    app.handle_key(key(KeyCode::Char('q')));
    assert!(app.should_quit);
}

#[tokio::test]
async fn test_quit_with_ctrl_c_while_editing() {
    let (mut app, _, _) = create_test_app();
    app.focus = Control::HostInput;

    app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit);
    assert_eq!(app.host_input, "io.example");
}

#[tokio::test]
async fn test_typing_edits_host_input() {
    let (mut app, hosts, _) = create_test_app();
    app.focus = Control::HostInput;

    app.handle_key(key(KeyCode::Char('.')));
    app.handle_key(key(KeyCode::Char('c')));
    app.handle_key(key(KeyCode::Char('q')));
    app.handle_key(key(KeyCode::Backspace));

    // Shortcut letters are plain text while the input has focus
    assert_eq!(app.host_input, "io.example.c");
    assert!(!app.should_quit);
    assert!(hosts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_connect_shortcut_uses_trimmed_input() {
    let (mut app, hosts, _) = create_test_app();
    app.host_input = "  io.example.echo ".to_string();

    app.handle_key(key(KeyCode::Char('c')));

    assert_eq!(*hosts.lock().unwrap(), vec!["io.example.echo".to_string()]);
    assert!(app.panel.is_connected());
}

#[tokio::test]
async fn test_host_input_locked_while_connected() {
    let (mut app, _, _) = create_test_app();
    app.handle_key(key(KeyCode::Char('c')));

    app.focus = Control::HostInput;
    app.handle_key(key(KeyCode::Char('x')));

    assert_eq!(app.host_input, "io.example");
}

#[tokio::test]
async fn test_action_shortcuts_send_payloads() {
    let (mut app, _, sent) = create_test_app();
    app.handle_key(key(KeyCode::Char('c')));
    app.handle_key(key(KeyCode::Char('h')));
    app.handle_key(key(KeyCode::Char('a')));
    app.handle_key(key(KeyCode::Char('p')));

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0]["v"], 1);
    assert_eq!(sent[1]["cmd"], "SET_ACTIVITY");
    assert!(sent[2]["t"].is_i64());
}

#[tokio::test]
async fn test_enter_presses_focused_control() {
    let (mut app, _, _) = create_test_app();
    assert_eq!(app.focus, Control::Connect);

    app.handle_key(key(KeyCode::Enter));
    assert!(app.panel.is_connected());

    app.focus = Control::Disconnect;
    app.handle_key(key(KeyCode::Enter));
    assert!(!app.panel.is_connected());
    assert_eq!(app.log_lines().last().unwrap(), "Disconnected");
}

#[tokio::test]
async fn test_tab_cycles_only_enabled_controls() {
    let (mut app, _, _) = create_test_app();
    let mut seen = Vec::new();
    for _ in 0..Control::ALL.len() {
        app.handle_key(key(KeyCode::Tab));
        seen.push(app.focus);
    }

    assert!(!seen.contains(&Control::Disconnect));
    assert!(seen.contains(&Control::HostInput));
}

#[tokio::test]
async fn test_theme_cycles() {
    let (mut app, _, _) = create_test_app();
    let before = app.theme.name;

    app.handle_key(key(KeyCode::Char('t')));
    assert_ne!(app.theme.name, before);
}
