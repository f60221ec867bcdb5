//! Code block presentation.
//!
//! Turns a snippet into line-numbered HTML with a copy affordance, or a
//! fenced Markdown block. The raw code is kept verbatim for copying.

use std::fmt::Write;

use serde::Serialize;

use crate::theme::Theme;

/// Language label used when the snippet does not name one.
pub const PLAIN_TEXT: &str = "text";

/// A snippet ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlock {
    /// Language slug.
    pub language: String,
    /// Source exactly as authored.
    pub code: String,
    /// Theme the block is rendered for.
    pub theme: Theme,
}

/// Rendered form returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedCode {
    /// Language slug.
    pub language: String,
    /// Theme name.
    pub theme: Theme,
    /// HTML fragment.
    pub html: String,
    /// Text placed on the clipboard by the copy button.
    pub copy_text: String,
    /// Number of lines.
    pub line_count: usize,
}

impl CodeBlock {
    /// Creates a code block. An empty language becomes plain text.
    pub fn new(code: impl Into<String>, language: impl Into<String>, theme: Theme) -> Self {
        let language = language.into();
        let language = if language.trim().is_empty() {
            PLAIN_TEXT.to_string()
        } else {
            language.trim().to_lowercase()
        };
        Self {
            language,
            code: code.into(),
            theme,
        }
    }

    /// Lines of code, without the trailing newline's empty line.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.code.trim_end_matches('\n').split('\n')
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        if self.code.trim_end_matches('\n').is_empty() {
            return 0;
        }
        self.lines().count()
    }

    /// HTML fragment with line numbers and a copy button.
    pub fn to_html(&self) -> String {
        let palette = self.theme.palette();
        let mut html = String::new();
        let _ = write!(
            html,
            "<div class=\"code-block\" data-theme=\"{}\" style=\"background:{};color:{}\">",
            self.theme, palette.code_background, palette.text
        );
        let _ = write!(
            html,
            "<button class=\"copy-button\" data-copy=\"{}\">Copy</button>",
            escape_html(&self.code)
        );
        let _ = write!(
            html,
            "<pre><code class=\"language-{}\">",
            escape_html(&self.language)
        );
        if self.line_count() > 0 {
            for (number, line) in self.lines().enumerate() {
                let _ = writeln!(
                    html,
                    "<span class=\"line\"><span class=\"line-number\" style=\"color:{}\">{}</span>{}</span>",
                    palette.gutter,
                    number + 1,
                    escape_html(line)
                );
            }
        }
        html.push_str("</code></pre></div>");
        html
    }

    /// Fenced Markdown block. The fence grows when the code contains backticks.
    pub fn to_markdown(&self) -> String {
        let longest_run = longest_backtick_run(&self.code);
        let fence = "`".repeat(longest_run.max(2) + 1);
        let body = self.code.trim_end_matches('\n');
        format!("{fence}{}\n{body}\n{fence}\n", self.language)
    }

    /// Renders everything the API returns for a snippet.
    pub fn render(&self) -> RenderedCode {
        RenderedCode {
            language: self.language.clone(),
            theme: self.theme,
            html: self.to_html(),
            copy_text: self.code.clone(),
            line_count: self.line_count(),
        }
    }
}

/// Escapes text for HTML element content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}
