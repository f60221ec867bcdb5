//! Diagram presentation.
//!
//! Mermaid sources are rendered by a [`DiagramRenderer`] (normally the
//! `mmdc` command line tool) and then re-themed: a Mermaid `init` directive
//! carrying the palette goes in front of the source, and the resulting SVG
//! gets a `<style>` block and a `data-theme` attribute. A failed render never
//! surfaces as an error: the learner gets a placeholder message plus a simple
//! SVG listing the diagram's node labels.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::code::escape_html;
use crate::theme::Theme;
use crate::{RenderError, Result};

/// Leading `%%{init: ...}%%` directives already present in a source.
static INIT_DIRECTIVE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?s)^\s*(%%\{\s*init\s*:.*?\}%%\s*)+").ok());

/// Opening `<svg ...>` tag.
static SVG_OPEN_TAG: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"<svg\b[^>]*>").ok());

/// Node labels such as `A[Start]`, `B(Load "x")`, `C{Valid?}` and `D((Done))`.
static NODE_LABEL: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r#"[A-Za-z0-9_]+\s*(?:\[\[|\(\(|\[|\(|\{)\s*"?([^\]\)\}"]+?)"?\s*(?:\]\]|\)\)|\]|\)|\})"#,
    )
    .ok()
});

/// Name of the Mermaid command line renderer.
pub const MMDC_BINARY: &str = "mmdc";

/// Width of the fallback SVG.
const FALLBACK_WIDTH: usize = 320;
/// Height of one fallback node row.
const FALLBACK_ROW: usize = 48;

// ============================================================================
// Renderer contract
// ============================================================================

/// Turns Mermaid source into SVG markup.
pub trait DiagramRenderer: Send + Sync + std::fmt::Debug {
    /// Renders `source`, returning the SVG document.
    fn render_svg(&self, source: &str) -> Result<String>;
}

/// Result of rendering one diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiagramArtifact {
    /// The renderer produced an SVG, re-themed.
    Rendered {
        /// Themed SVG markup.
        svg: String,
        /// Theme applied.
        theme: Theme,
    },
    /// Rendering failed.
    Fallback {
        /// Why rendering failed.
        error: String,
        /// Inline HTML message for the learner.
        placeholder: String,
        /// Simple SVG listing the node labels.
        svg: String,
        /// Theme applied.
        theme: Theme,
    },
}

impl DiagramArtifact {
    /// SVG markup of either variant.
    pub fn svg(&self) -> &str {
        match self {
            Self::Rendered { svg, .. } | Self::Fallback { svg, .. } => svg,
        }
    }

    /// `true` when the real renderer succeeded.
    pub const fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Renders diagrams for a theme. Stateless: the same source and theme always
/// produce the same artifact.
#[derive(Debug)]
pub struct DiagramAdapter {
    renderer: Box<dyn DiagramRenderer>,
}

impl DiagramAdapter {
    /// Creates an adapter over a renderer.
    pub fn new(renderer: Box<dyn DiagramRenderer>) -> Self {
        Self { renderer }
    }

    /// Renders `source` for `theme`, falling back on failure.
    pub fn render(&self, source: &str, theme: Theme) -> DiagramArtifact {
        let themed_source = with_theme_directive(source, theme);
        match self.renderer.render_svg(&themed_source) {
            Ok(svg) => {
                debug!(%theme, bytes = svg.len(), "Diagram rendered");
                DiagramArtifact::Rendered {
                    svg: style_svg(&svg, theme),
                    theme,
                }
            }
            Err(e) => {
                warn!(error = %e, "Diagram rendering failed, using fallback");
                let labels = extract_labels(source);
                DiagramArtifact::Fallback {
                    placeholder: placeholder_html(&e, theme),
                    svg: fallback_svg(&labels, theme),
                    error: e.to_string(),
                    theme,
                }
            }
        }
    }
}

/// Replaces any leading `init` directive with one carrying `theme`'s palette.
pub fn with_theme_directive(source: &str, theme: Theme) -> String {
    let body = INIT_DIRECTIVE
        .as_ref()
        .map_or(source, |re| re.find(source).map_or(source, |m| &source[m.end()..]));
    let palette = theme.palette();
    format!(
        "%%{{init: {{\"theme\":\"base\",\"themeVariables\":{{\"background\":\"{}\",\"primaryColor\":\"{}\",\"primaryBorderColor\":\"{}\",\"primaryTextColor\":\"{}\",\"lineColor\":\"{}\"}}}}}}%%\n{}",
        palette.background,
        palette.node_fill,
        palette.node_border,
        palette.text,
        palette.line,
        body.trim_start()
    )
}

/// Adds `data-theme` and a palette `<style>` block to an SVG document.
///
/// Markup without an `<svg>` tag is returned unchanged.
pub fn style_svg(svg: &str, theme: Theme) -> String {
    let Some(open) = SVG_OPEN_TAG.as_ref().and_then(|re| re.find(svg)) else {
        return svg.to_string();
    };
    let tag = open.as_str();
    let tag_body = tag.trim_end_matches('>').trim_end_matches('/');
    let self_closing = tag.ends_with("/>");
    let tag_body = strip_attribute(tag_body, "data-theme");

    let palette = theme.palette();
    let style = format!(
        "<style>.node rect,.node circle,.node polygon,.node path{{fill:{};stroke:{};}}\
         .edgePath path,.flowchart-link{{stroke:{};}}\
         .label,text,.nodeLabel,.edgeLabel{{color:{};fill:{};}}</style>",
        palette.node_fill, palette.node_border, palette.line, palette.text, palette.text
    );

    let mut out = String::with_capacity(svg.len() + style.len() + 32);
    out.push_str(&svg[..open.start()]);
    let _ = write!(out, "{tag_body} data-theme=\"{theme}\">");
    out.push_str(&style);
    if self_closing {
        out.push_str("</svg>");
    }
    out.push_str(&svg[open.end()..]);
    out
}

fn strip_attribute(tag: &str, name: &str) -> String {
    Regex::new(&format!(r#"\s{}="[^"]*""#, regex::escape(name)))
        .map_or_else(|_| tag.to_string(), |re| re.replace_all(tag, "").into_owned())
}

/// Node labels in order of first appearance, without duplicates.
pub fn extract_labels(source: &str) -> Vec<String> {
    let Some(re) = NODE_LABEL.as_ref() else {
        return Vec::new();
    };
    let mut labels: Vec<String> = Vec::new();
    for caps in re.captures_iter(source) {
        if let Some(label) = caps.get(1).map(|m| m.as_str().trim()) {
            if !label.is_empty() && !labels.iter().any(|l| l == label) {
                labels.push(label.to_string());
            }
        }
    }
    labels
}

/// A minimal SVG stacking the labels as boxes.
pub fn fallback_svg(labels: &[String], theme: Theme) -> String {
    let palette = theme.palette();
    let rows = labels.len().max(1);
    let height = rows * FALLBACK_ROW + 16;
    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{FALLBACK_WIDTH}\" height=\"{height}\" \
         viewBox=\"0 0 {FALLBACK_WIDTH} {height}\" data-theme=\"{theme}\" class=\"diagram-fallback\">"
    );
    let _ = write!(
        svg,
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        palette.background
    );
    if labels.is_empty() {
        let _ = write!(
            svg,
            "<text x=\"16\" y=\"36\" fill=\"{}\">Diagram unavailable</text>",
            palette.error
        );
    }
    for (i, label) in labels.iter().enumerate() {
        let y = 8 + i * FALLBACK_ROW;
        let _ = write!(
            svg,
            "<rect x=\"16\" y=\"{y}\" width=\"{}\" height=\"36\" rx=\"6\" fill=\"{}\" stroke=\"{}\"/>",
            FALLBACK_WIDTH - 32,
            palette.node_fill,
            palette.node_border
        );
        let _ = write!(
            svg,
            "<text x=\"28\" y=\"{}\" fill=\"{}\">{}</text>",
            y + 23,
            palette.text,
            escape_html(label)
        );
    }
    svg.push_str("</svg>");
    svg
}

fn placeholder_html(error: &RenderError, theme: Theme) -> String {
    format!(
        "<div class=\"diagram-error\" data-theme=\"{theme}\" style=\"color:{}\">Diagram could not be rendered: {}</div>",
        theme.palette().error,
        escape_html(&error.summary())
    )
}

// ============================================================================
// mmdc renderer
// ============================================================================

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(0);

/// Renders through the Mermaid CLI (`mmdc`).
///
/// The binary is located on first use: the configured path if any, otherwise
/// the first `mmdc` on `PATH`. The lookup result is cached.
#[derive(Debug, Default)]
pub struct MermaidCli {
    configured: Option<PathBuf>,
    resolved: OnceCell<Option<PathBuf>>,
}

impl MermaidCli {
    /// Creates a renderer, optionally pinned to an explicit binary path.
    pub fn new(configured: Option<PathBuf>) -> Self {
        Self {
            configured,
            resolved: OnceCell::new(),
        }
    }

    /// The binary that will be used, looking it up if needed.
    pub fn binary(&self) -> Option<&Path> {
        self.resolved
            .get_or_init(|| {
                let found = match &self.configured {
                    Some(path) => path.is_file().then(|| path.clone()),
                    None => find_on_path(MMDC_BINARY),
                };
                match &found {
                    Some(path) => info!(path = %path.display(), "Found Mermaid CLI"),
                    None => warn!("Mermaid CLI not found; diagrams will use the fallback"),
                }
                found
            })
            .as_deref()
    }
}

impl DiagramRenderer for MermaidCli {
    fn render_svg(&self, source: &str) -> Result<String> {
        let binary = self.binary().ok_or_else(|| RenderError::renderer_unavailable(MMDC_BINARY))?;

        let id = NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir();
        let input = dir.join(format!("codepath-diagram-{}-{id}.mmd", std::process::id()));
        let output = input.with_extension("svg");
        std::fs::write(&input, source)?;

        let result = Command::new(binary)
            .arg("--quiet")
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .output();

        let svg = match result {
            Ok(out) if out.status.success() => {
                std::fs::read_to_string(&output).map_err(RenderError::from)
            }
            Ok(out) => Err(RenderError::RenderFailed {
                message: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            }),
            Err(e) => Err(RenderError::from(e)),
        };

        let _ = std::fs::remove_file(&input);
        let _ = std::fs::remove_file(&output);
        svg
    }
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
