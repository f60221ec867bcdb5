//! Light and dark themes.
//!
//! A [`Theme`] is chosen once (from configuration or per request) and passed
//! explicitly to every adapter. Nothing here reads global state.

use serde::{Deserialize, Serialize};

/// Color scheme of the lesson UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    /// Light background.
    #[default]
    Light,
    /// Dark background.
    Dark,
}

impl Theme {
    /// Parses a theme name, ignoring case.
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    /// Lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Colors for this theme.
    pub const fn palette(&self) -> Palette {
        match self {
            Self::Light => Palette::LIGHT,
            Self::Dark => Palette::DARK,
        }
    }

    /// Built-in Mermaid theme closest to this one.
    pub const fn mermaid_theme(&self) -> &'static str {
        match self {
            Self::Light => "default",
            Self::Dark => "dark",
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Theme {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid theme '{s}': expected one of 'light', 'dark'"
            ))
        })
    }
}

impl Serialize for Theme {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Colors used by code blocks and diagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Palette {
    /// Page background.
    pub background: &'static str,
    /// Body text.
    pub text: &'static str,
    /// Code block background.
    pub code_background: &'static str,
    /// Line number gutter.
    pub gutter: &'static str,
    /// Diagram node fill.
    pub node_fill: &'static str,
    /// Diagram node border.
    pub node_border: &'static str,
    /// Diagram edges.
    pub line: &'static str,
    /// Accent for highlights.
    pub accent: &'static str,
    /// Error text.
    pub error: &'static str,
}

impl Palette {
    /// Light palette.
    pub const LIGHT: Self = Self {
        background: "#ffffff",
        text: "#1f2937",
        code_background: "#f6f8fa",
        gutter: "#9ca3af",
        node_fill: "#eef2ff",
        node_border: "#6366f1",
        line: "#4b5563",
        accent: "#4f46e5",
        error: "#b91c1c",
    };

    /// Dark palette.
    pub const DARK: Self = Self {
        background: "#0f172a",
        text: "#e5e7eb",
        code_background: "#1e293b",
        gutter: "#64748b",
        node_fill: "#1e1b4b",
        node_border: "#818cf8",
        line: "#cbd5e1",
        accent: "#a5b4fc",
        error: "#f87171",
    };
}
