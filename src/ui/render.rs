use crate::panel::Control;
use crate::ui::app::App;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Buttons in the action row, left to right.
const BUTTONS: [Control; 5] = [
    Control::Connect,
    Control::Handshake,
    Control::SetActivity,
    Control::Ping,
    Control::Disconnect,
];

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Host input
            Constraint::Length(3), // Buttons
            Constraint::Min(0),    // Log
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    frame.render_widget(
        Block::default().style(Style::default().bg(app.theme.bg)),
        frame.area(),
    );

    render_header(frame, app, chunks[0]);
    render_host_input(frame, app, chunks[1]);
    render_buttons(frame, app, chunks[2]);
    render_log(frame, app, chunks[3]);
    render_footer(frame, app, chunks[4]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let status = match app.panel.host_id() {
        Some(host) => Span::styled(
            format!("● connected to {host}"),
            Style::default().fg(theme.success),
        ),
        None => Span::styled("○ disconnected", Style::default().fg(theme.fg_dim)),
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "  host-test  ",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        status,
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.accent)),
    );

    frame.render_widget(header, area);
}

fn render_host_input(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let enabled = app.is_enabled(Control::HostInput);
    let focused = app.focus == Control::HostInput;

    let mut text = vec![Span::styled(
        app.host_input.clone(),
        Style::default().fg(if enabled { theme.fg } else { theme.fg_dim }),
    )];
    if focused && enabled {
        text.push(Span::styled("▏", Style::default().fg(theme.accent)));
    }

    let input = Paragraph::new(Line::from(text)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Native messaging host ")
            .border_style(border_style(app, Control::HostInput)),
    );

    frame.render_widget(input, area);
}

fn render_buttons(frame: &mut Frame, app: &App, area: Rect) {
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, BUTTONS.len() as u32); BUTTONS.len()])
        .split(area);

    for (control, cell) in BUTTONS.iter().zip(cells.iter()) {
        let label = match control.shortcut() {
            Some(key) => format!("{} [{}]", control.label(), key),
            None => control.label().to_string(),
        };
        let style = if app.is_enabled(*control) {
            Style::default().fg(app.theme.fg)
        } else {
            Style::default()
                .fg(app.theme.fg_dim)
                .add_modifier(Modifier::DIM)
        };

        let button = Paragraph::new(Span::styled(label, style))
            .centered()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style(app, *control)),
            );
        frame.render_widget(button, *cell);
    }
}

fn render_log(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let lines = app.log_lines();

    // Bottom-anchored window over wrapped rows, shifted up by the scroll offset.
    let width = area.width.saturating_sub(2) as usize;
    let visible = area.height.saturating_sub(2) as usize;
    let end = lines.len().saturating_sub(app.log_scroll);

    let mut rows: Vec<Line> = Vec::new();
    for line in lines[..end].iter().rev() {
        if rows.len() >= visible {
            break;
        }
        let style = Style::default().fg(log_color(app, line));
        rows.extend(
            wrap_rows(line, width)
                .into_iter()
                .rev()
                .map(|row| Line::styled(row, style)),
        );
    }
    rows.truncate(visible);
    rows.reverse();

    let title = if app.log_scroll > 0 {
        format!(" Output ({} more below) ", app.log_scroll)
    } else {
        " Output ".to_string()
    };

    let log = Paragraph::new(rows).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(theme.fg_dim)),
    );

    frame.render_widget(log, area);
}

fn log_color(app: &App, line: &str) -> Color {
    let theme = &app.theme;
    if line.starts_with("Received: ") {
        theme.received
    } else if line.starts_with("Error: ")
        || line.starts_with("Failed ")
        || line == "Disconnected by remote host"
    {
        theme.error
    } else {
        theme.fg
    }
}

/// Hard-wrap `line` into rows of at most `width` characters.
fn wrap_rows(line: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }
    if line.is_empty() {
        return vec![String::new()];
    }
    let chars: Vec<char> = line.chars().collect();
    chars.chunks(width).map(|row| row.iter().collect()).collect()
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = if app.focus == Control::HostInput && app.is_enabled(Control::HostInput) {
        "[type] Edit host  [Enter] Focus  [Tab] Next  [Esc] Quit"
    } else {
        "[Tab] Next  [Enter] Press  [c/h/a/p/d] Actions  [j/k] Scroll  [t] Theme  [q] Quit"
    };

    let footer = Paragraph::new(format!("{help_text}  ·  {}", app.theme.name))
        .style(Style::default().fg(app.theme.fg_dim));

    frame.render_widget(footer, area);
}

fn border_style(app: &App, control: Control) -> Style {
    if app.focus == control {
        Style::default().fg(app.theme.accent)
    } else {
        Style::default().fg(app.theme.fg_dim)
    }
}
