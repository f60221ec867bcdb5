//! Content sources.
//!
//! The engine reads tutorials and language metadata through the
//! [`ContentSource`] trait. Missing content is `Ok(None)`, never an error;
//! errors are reserved for unreadable or oversized files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::content::{Language, Lesson, RawTutorial, Tutorial};
use crate::error::{EngineError, Result};

/// Default maximum content file size in bytes (1 MiB).
pub const MAX_CONTENT_SIZE: u64 = 1024 * 1024;

/// One entry in the tutorial catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorialSummary {
    /// URL slug.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Number of lessons.
    pub lesson_count: usize,
}

/// Read-only access to tutorial content.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// All tutorials, ordered by slug.
    async fn tutorials(&self) -> Result<Vec<TutorialSummary>>;

    /// One tutorial by slug.
    async fn tutorial(&self, slug: &str) -> Result<Option<Tutorial>>;

    /// Language metadata by slug.
    async fn language(&self, slug: &str) -> Result<Option<Language>>;

    /// One lesson of a tutorial.
    async fn lesson(&self, tutorial: &str, lesson: &str) -> Result<Option<Lesson>> {
        Ok(self
            .tutorial(tutorial)
            .await?
            .and_then(|t| t.lesson(lesson).cloned()))
    }
}

/// Reads a content file, enforcing the size limit and UTF-8.
///
/// # Errors
///
/// Returns `EngineError::ContentFileNotFound`, `EngineError::ContentTooLarge`
/// or `EngineError::ContentEncodingError`.
pub fn read_content_file(path: &Path, max_bytes: u64) -> Result<String> {
    let metadata = std::fs::metadata(path).map_err(|e| metadata_error(path, e))?;
    check_size(path, metadata.len(), max_bytes)?;
    std::fs::read_to_string(path).map_err(|e| read_error(path, e))
}

/// Async [`read_content_file`] on `tokio::fs`.
///
/// # Errors
///
/// Same as [`read_content_file`].
pub async fn read_content_file_async(path: &Path, max_bytes: u64) -> Result<String> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| metadata_error(path, e))?;
    check_size(path, metadata.len(), max_bytes)?;
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| read_error(path, e))
}

fn metadata_error(path: &Path, err: std::io::Error) -> EngineError {
    if err.kind() == std::io::ErrorKind::NotFound {
        EngineError::content_not_found(path)
    } else {
        EngineError::Io(err)
    }
}

fn read_error(path: &Path, err: std::io::Error) -> EngineError {
    if err.kind() == std::io::ErrorKind::InvalidData {
        EngineError::content_encoding(path)
    } else {
        EngineError::Io(err)
    }
}

fn check_size(path: &Path, size: u64, max_bytes: u64) -> Result<()> {
    if size > max_bytes {
        return Err(EngineError::content_too_large(path, size / 1024, max_bytes / 1024));
    }
    Ok(())
}

/// Reads and parses a raw tutorial file without validating lessons.
///
/// # Errors
///
/// Returns file errors from [`read_content_file`] and
/// `EngineError::InvalidContent` when the JSON does not describe a tutorial.
pub fn load_raw_tutorial(path: &Path, max_bytes: u64) -> Result<RawTutorial> {
    parse_raw_tutorial(path, &read_content_file(path, max_bytes)?)
}

fn parse_raw_tutorial(path: &Path, contents: &str) -> Result<RawTutorial> {
    serde_json::from_str(contents)
        .map_err(|e| EngineError::invalid_content(path.display().to_string(), e.to_string()))
}

/// Content stored as JSON files:
/// `<root>/tutorials/<slug>.json` and `<root>/languages/<slug>.json`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    max_bytes: u64,
}

impl DirectorySource {
    /// Creates a source rooted at `root` with the default size limit.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_bytes: MAX_CONTENT_SIZE,
        }
    }

    /// Overrides the per-file size limit.
    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tutorial_path(&self, slug: &str) -> Option<PathBuf> {
        is_safe_slug(slug).then(|| self.root.join("tutorials").join(format!("{slug}.json")))
    }

    fn language_path(&self, slug: &str) -> Option<PathBuf> {
        is_safe_slug(slug).then(|| self.root.join("languages").join(format!("{slug}.json")))
    }

    async fn load_tutorial(&self, path: &Path) -> Result<Option<Tutorial>> {
        let contents = match read_content_file_async(path, self.max_bytes).await {
            Ok(contents) => contents,
            Err(EngineError::ContentFileNotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let raw = parse_raw_tutorial(path, &contents)?;
        Ok(Some(Tutorial::from_raw(raw)))
    }
}

#[async_trait]
impl ContentSource for DirectorySource {
    async fn tutorials(&self) -> Result<Vec<TutorialSummary>> {
        let dir = self.root.join("tutorials");
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "No tutorials directory");
                return Ok(Vec::new());
            }
            Err(e) => return Err(EngineError::Io(e)),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match self.load_tutorial(&path).await {
                Ok(Some(tutorial)) => summaries.push(TutorialSummary {
                    lesson_count: tutorial.lessons.len(),
                    slug: tutorial.slug,
                    title: tutorial.title,
                }),
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable tutorial");
                }
            }
        }
        summaries.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(summaries)
    }

    async fn tutorial(&self, slug: &str) -> Result<Option<Tutorial>> {
        let Some(path) = self.tutorial_path(slug) else {
            return Ok(None);
        };
        self.load_tutorial(&path).await
    }

    async fn language(&self, slug: &str) -> Result<Option<Language>> {
        let Some(path) = self.language_path(slug) else {
            return Ok(None);
        };
        let contents = match read_content_file_async(&path, self.max_bytes).await {
            Ok(contents) => contents,
            Err(EngineError::ContentFileNotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let language = serde_json::from_str(&contents)
            .map_err(|e| EngineError::invalid_content(slug, e.to_string()))?;
        Ok(Some(language))
    }
}

/// In-memory content, used by tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tutorials: BTreeMap<String, Tutorial>,
    languages: BTreeMap<String, Language>,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tutorial, replacing any with the same slug.
    #[must_use]
    pub fn with_tutorial(mut self, tutorial: Tutorial) -> Self {
        self.tutorials.insert(tutorial.slug.clone(), tutorial);
        self
    }

    /// Adds language metadata.
    #[must_use]
    pub fn with_language(mut self, language: Language) -> Self {
        self.languages.insert(language.slug.clone(), language);
        self
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn tutorials(&self) -> Result<Vec<TutorialSummary>> {
        Ok(self
            .tutorials
            .values()
            .map(|t| TutorialSummary {
                slug: t.slug.clone(),
                title: t.title.clone(),
                lesson_count: t.lessons.len(),
            })
            .collect())
    }

    async fn tutorial(&self, slug: &str) -> Result<Option<Tutorial>> {
        Ok(self.tutorials.get(slug).cloned())
    }

    async fn language(&self, slug: &str) -> Result<Option<Language>> {
        Ok(self.languages.get(slug).cloned())
    }
}

/// Slugs map to file names, so path separators and dot segments are refused.
fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
