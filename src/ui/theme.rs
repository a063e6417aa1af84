//! # Themes
//!
//! Colors for the panel, grouped by the role they play. Rendering code never
//! names a `Color` directly; it asks the active [`Theme`].
//!
//! Built-in themes, cycled with `t`:
//!
//! - **Catppuccin Mocha** (default)
//! - **Nord**
//! - **Gruvbox Dark**

use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,

    pub bg: Color,
    /// Regular text and enabled controls.
    pub fg: Color,
    /// Hints, footer, disabled controls.
    pub fg_dim: Color,
    /// Focused borders and the header.
    pub accent: Color,
    /// Inbound message lines.
    pub received: Color,
    /// Connected indicator.
    pub success: Color,
    /// Failures and remote disconnects.
    pub error: Color,
}

impl Theme {
    pub fn all() -> &'static [Theme] {
        &BUILT_IN_THEMES
    }

    /// Find a built-in theme by name (case-insensitive).
    pub fn by_name(name: &str) -> Option<&'static Theme> {
        BUILT_IN_THEMES
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn default_theme() -> &'static Theme {
        &BUILT_IN_THEMES[0]
    }

    /// The theme after this one, wrapping around.
    pub fn next(&self) -> &'static Theme {
        let pos = BUILT_IN_THEMES
            .iter()
            .position(|t| t.name == self.name)
            .unwrap_or(0);
        &BUILT_IN_THEMES[(pos + 1) % BUILT_IN_THEMES.len()]
    }
}

static BUILT_IN_THEMES: [Theme; 3] = [
    Theme {
        name: "Catppuccin Mocha",
        bg: Color::Rgb(30, 30, 46),         // base
        fg: Color::Rgb(205, 214, 244),      // text
        fg_dim: Color::Rgb(108, 112, 134),  // overlay0
        accent: Color::Rgb(137, 180, 250),  // blue
        received: Color::Rgb(148, 226, 213), // teal
        success: Color::Rgb(166, 227, 161), // green
        error: Color::Rgb(243, 139, 168),   // red
    },
    Theme {
        name: "Nord",
        bg: Color::Rgb(46, 52, 64),
        fg: Color::Rgb(216, 222, 233),
        fg_dim: Color::Rgb(76, 86, 106),
        accent: Color::Rgb(136, 192, 208),
        received: Color::Rgb(143, 188, 187),
        success: Color::Rgb(163, 190, 140),
        error: Color::Rgb(191, 97, 106),
    },
    Theme {
        name: "Gruvbox Dark",
        bg: Color::Rgb(40, 40, 40),
        fg: Color::Rgb(235, 219, 178),
        fg_dim: Color::Rgb(146, 131, 116),
        accent: Color::Rgb(131, 165, 152),
        received: Color::Rgb(142, 192, 124),
        success: Color::Rgb(184, 187, 38),
        error: Color::Rgb(251, 73, 52),
    },
];
