use crate::panel::{BufferedView, ConnectionPanel, Control};
use crate::ui::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub type Panel = ConnectionPanel<BufferedView>;

/// TUI state wrapped around the connection panel.
pub struct App {
    pub panel: Panel,
    /// Contents of the host id input.
    pub host_input: String,
    pub focus: Control,
    /// Lines scrolled up from the newest log entry (0 = follow the tail).
    pub log_scroll: usize,
    pub should_quit: bool,
    pub theme: Theme,
}

impl App {
    pub fn new(panel: Panel, host_input: String, theme: Theme) -> Self {
        let mut app = Self {
            panel,
            host_input,
            focus: Control::Connect,
            log_scroll: 0,
            should_quit: false,
            theme,
        };
        app.settle_focus();
        app
    }

    pub fn is_enabled(&self, control: Control) -> bool {
        self.panel.view().controls.is_enabled(control)
    }

    pub fn log_lines(&self) -> &[String] {
        self.panel.view().log.lines()
    }

    /// Handle pending port events. Called once per loop iteration.
    pub fn tick(&mut self) {
        if self.panel.pump() > 0 {
            self.settle_focus();
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }

        match key.code {
            KeyCode::Esc => self.quit(),
            KeyCode::Tab => self.focus_next(),
            KeyCode::BackTab => self.focus_previous(),
            KeyCode::Enter => self.activate(self.focus),
            KeyCode::Up => self.scroll_log_up(),
            KeyCode::Down => self.scroll_log_down(),
            _ if self.editing_host() => self.edit_host(key.code),
            KeyCode::Char('q') => self.quit(),
            KeyCode::Char('t') => self.cycle_theme(),
            KeyCode::Char('k') => self.scroll_log_up(),
            KeyCode::Char('j') => self.scroll_log_down(),
            KeyCode::Char('G') => self.log_scroll = 0,
            KeyCode::Char(c) => {
                let control = Control::ALL
                    .into_iter()
                    .find(|ctl| ctl.shortcut() == Some(c));
                if let Some(control) = control {
                    self.activate(control);
                }
            }
            _ => {}
        }
    }

    /// Press a control. Disabled controls do nothing, like a greyed-out button.
    pub fn activate(&mut self, control: Control) {
        if !self.is_enabled(control) {
            tracing::info!(?control, "ignored: control disabled");
            return;
        }

        match control {
            Control::HostInput => self.focus = Control::HostInput,
            Control::Connect => {
                let host = self.host_input.trim().to_string();
                self.panel.connect(&host);
            }
            Control::Handshake => self.panel.send_handshake(),
            Control::SetActivity => self.panel.send_activity(),
            Control::Ping => self.panel.send_ping(),
            Control::Disconnect => self.panel.disconnect(),
        }

        self.log_scroll = 0;
        self.settle_focus();
    }

    pub fn focus_next(&mut self) {
        self.move_focus(1);
    }

    pub fn focus_previous(&mut self) {
        self.move_focus(Control::ALL.len() - 1);
    }

    pub fn scroll_log_up(&mut self) {
        if self.log_scroll < self.log_lines().len().saturating_sub(1) {
            self.log_scroll += 1;
        }
    }

    pub fn scroll_log_down(&mut self) {
        self.log_scroll = self.log_scroll.saturating_sub(1);
    }

    pub fn cycle_theme(&mut self) {
        self.theme = self.theme.next().clone();
    }

    /// Leave the app, closing any open port first.
    pub fn quit(&mut self) {
        self.panel.disconnect();
        self.should_quit = true;
    }

    fn editing_host(&self) -> bool {
        self.focus == Control::HostInput && self.is_enabled(Control::HostInput)
    }

    fn edit_host(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c) => self.host_input.push(c),
            KeyCode::Backspace => {
                self.host_input.pop();
            }
            _ => {}
        }
    }

    /// Step through `Control::ALL` by `step` (mod len) until an enabled control.
    fn move_focus(&mut self, step: usize) {
        let len = Control::ALL.len();
        let start = Control::ALL
            .iter()
            .position(|c| *c == self.focus)
            .unwrap_or(0);

        for i in 1..=len {
            let candidate = Control::ALL[(start + i * step) % len];
            if self.is_enabled(candidate) {
                self.focus = candidate;
                return;
            }
        }
    }

    /// Keep focus off disabled controls after a state change.
    fn settle_focus(&mut self) {
        if !self.is_enabled(self.focus) {
            self.focus_next();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{ConnectError, Connector, Port, PortError, PortEvent};
    use crate::panel::PanelSettings;
    use serde_json::Value;
    use std::sync::mpsc::{self, Receiver};

    struct NullPort(Receiver<PortEvent>);

    impl Port for NullPort {
        fn post_message(&mut self, _message: &Value) -> Result<(), PortError> {
            Ok(())
        }

        fn try_recv(&mut self) -> Option<PortEvent> {
            self.0.try_recv().ok()
        }

        fn disconnect(&mut self) {}
    }

    struct NullConnector;

    impl Connector for NullConnector {
        fn connect(&mut self, _host_id: &str) -> Result<Box<dyn Port>, ConnectError> {
            let (_tx, rx) = mpsc::channel();
            Ok(Box::new(NullPort(rx)))
        }
    }

    fn app() -> App {
        let panel = Panel::new(
            Box::new(NullConnector),
            BufferedView::default(),
            PanelSettings::default(),
        );
        App::new(panel, "io.example".to_string(), Theme::default_theme().clone())
    }

    #[test]
    fn test_initial_focus_is_connect() {
        assert_eq!(app().focus, Control::Connect);
    }

    #[test]
    fn test_focus_skips_disabled_controls() {
        let mut app = app();
        app.focus = Control::Ping;
        app.focus_next();
        // Disconnect is disabled while disconnected, so focus wraps.
        assert_eq!(app.focus, Control::HostInput);

        app.focus_previous();
        assert_eq!(app.focus, Control::Ping);
    }

    #[test]
    fn test_focus_moves_off_connect_after_connecting() {
        let mut app = app();
        app.activate(Control::Connect);

        assert!(app.panel.is_connected());
        assert_ne!(app.focus, Control::Connect);
        assert!(app.is_enabled(app.focus));
    }

    #[test]
    fn test_disabled_control_does_nothing() {
        let mut app = app();
        app.activate(Control::Disconnect);
        assert!(app.log_lines().is_empty());
    }

    #[test]
    fn test_scroll_is_bounded_by_log() {
        let mut app = app();
        app.scroll_log_up();
        assert_eq!(app.log_scroll, 0);

        for host in ["io.a", "io.b", "io.c"] {
            app.panel.connect(host);
            app.panel.disconnect();
        }
        for _ in 0..20 {
            app.scroll_log_up();
        }
        assert_eq!(app.log_scroll, app.log_lines().len() - 1);

        app.scroll_log_down();
        assert_eq!(app.log_scroll, app.log_lines().len() - 2);
    }

    #[test]
    fn test_quit_disconnects() {
        let mut app = app();
        app.activate(Control::Connect);
        app.quit();

        assert!(app.should_quit);
        assert!(!app.panel.is_connected());
    }
}
