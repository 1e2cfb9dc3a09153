// Appearance settings, loaded once at startup and passed to whoever needs them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Colour scheme preference.
///
/// Stored as `"system"`, `"light"` or `"dark"`. Anything else reads back as
/// `System`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::System, Theme::Light, Theme::Dark];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::System => "system",
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Theme::System => "System",
            Theme::Light => "Light",
            Theme::Dark => "Dark",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Theme::System => Theme::Light,
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::System,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Theme::System => Theme::Dark,
            Theme::Light => Theme::System,
            Theme::Dark => Theme::Light,
        }
    }

    /// Strict parse for user input (CLI flag, API body)
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "system" => Some(Theme::System),
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

impl From<String> for Theme {
    fn from(raw: String) -> Self {
        Theme::parse(&raw).unwrap_or_default()
    }
}

impl From<Theme> for String {
    fn from(theme: Theme) -> Self {
        theme.as_str().to_string()
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// User settings. There is exactly one instance, owned by the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub selected_theme: Theme,
}

impl Settings {
    pub fn with_theme(selected_theme: Theme) -> Self {
        Settings { selected_theme }
    }
}
