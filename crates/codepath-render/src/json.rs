//! JSON lesson reports.
//!
//! # Example
//!
//! ```rust
//! use codepath_render::LessonReport;
//! use codepath_render::json::JsonGenerator;
//!
//! let report = LessonReport::default();
//! let generator = JsonGenerator::new(&report);
//!
//! let compact = generator.generate().unwrap();
//! assert!(!compact.contains('\n'));
//!
//! let pretty = generator.generate_pretty().unwrap();
//! assert!(pretty.contains("\"lesson_type\""));
//! ```

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::{LessonReport, RenderError, Result};

/// JSON report generator.
pub struct JsonGenerator<'a> {
    report: &'a LessonReport,
}

impl<'a> JsonGenerator<'a> {
    /// Creates a new JSON generator for the given report.
    #[must_use]
    pub const fn new(report: &'a LessonReport) -> Self {
        Self { report }
    }

    /// Compact, single-line JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Serialization`] if JSON serialization fails.
    pub fn generate(&self) -> Result<String> {
        serde_json::to_string(self.report).map_err(RenderError::from)
    }

    /// Pretty-printed JSON with 2-space indentation.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Serialization`] if JSON serialization fails.
    pub fn generate_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self.report).map_err(RenderError::from)
    }

    /// Writes the report to `path`, creating or overwriting it. Parent
    /// directories must exist.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Serialization`] if JSON serialization fails.
    /// Returns [`RenderError::Io`] if file creation or writing fails.
    pub fn write_to_file(&self, path: &Path, pretty: bool) -> Result<()> {
        let json = if pretty {
            self.generate_pretty()?
        } else {
            self.generate()?
        };

        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;

        Ok(())
    }
}
