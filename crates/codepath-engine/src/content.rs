//! Tutorial and lesson content.
//!
//! Content arrives as loosely-shaped CMS JSON. It is deserialized into the
//! `Raw*` types below, which accept missing payloads and the "string or
//! `{field}`" list items the CMS emits, and is then validated exactly once
//! into [`Lesson`] / [`LessonBody`]. Everything downstream of this module can
//! rely on the typed shape: an MCQ question has exactly one correct option,
//! every `{{blankN}}` has a blank, and block orders form a permutation.
//!
//! A lesson that fails validation is not an error for the tutorial; it
//! becomes [`LessonBody::Unavailable`] and renders as a placeholder.

use std::collections::{HashMap, HashSet};
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Matches `{{blankN}}` placeholders, tolerating inner whitespace.
static BLANK_PLACEHOLDER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\{\{\s*blank(\d+)\s*\}\}").ok());

// ============================================================================
// Typed model
// ============================================================================

/// Tutorial difficulty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Difficulty {
    /// Entry level (default).
    #[default]
    Beginner,
    /// Assumes the basics.
    Intermediate,
    /// Assumes fluency.
    Advanced,
}

impl Difficulty {
    /// Parses a string into a `Difficulty`, case-insensitively.
    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid difficulty '{s}': expected one of 'beginner', 'intermediate', 'advanced'"
            ))
        })
    }
}

impl Serialize for Difficulty {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Programming language metadata served alongside tutorials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    /// URL slug, e.g. `rust`.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Syntax id used by the code editor.
    #[serde(default)]
    pub editor_language: Option<String>,
    /// File extension without the dot.
    #[serde(default)]
    pub file_extension: Option<String>,
    /// Toolchain version shown in the playground.
    #[serde(default)]
    pub version: Option<String>,
}

/// A validated tutorial: metadata plus its ordered lessons.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tutorial {
    /// URL slug.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Short description.
    pub description: String,
    /// Difficulty level.
    pub difficulty: Difficulty,
    /// Language slug, if the tutorial targets one language.
    pub language: Option<String>,
    /// Reference material (markdown) shown beside the lessons.
    pub reference: Option<String>,
    /// Lessons in order.
    pub lessons: Vec<Lesson>,
}

impl Tutorial {
    /// Validates a raw tutorial, turning broken lessons into placeholders.
    pub fn from_raw(raw: RawTutorial) -> Self {
        let lessons = raw
            .lessons
            .into_iter()
            .enumerate()
            .map(|(index, lesson)| Lesson::from_raw(lesson, index))
            .collect();
        Self {
            slug: raw.slug,
            title: raw.title,
            description: raw.description.unwrap_or_default(),
            difficulty: raw.difficulty.unwrap_or_default(),
            language: raw.language.map(TextItem::into_text),
            reference: raw.reference,
            lessons,
        }
    }

    /// Validates a raw tutorial and reports every issue instead of
    /// substituting placeholders.
    pub fn from_raw_strict(raw: RawTutorial) -> std::result::Result<Self, Vec<ContentIssue>> {
        let mut issues = Vec::new();
        let mut lessons = Vec::with_capacity(raw.lessons.len());
        for (index, lesson) in raw.lessons.into_iter().enumerate() {
            match Lesson::try_from_raw(lesson, index) {
                Ok(lesson) => lessons.push(lesson),
                Err(mut found) => issues.append(&mut found),
            }
        }
        if !issues.is_empty() {
            return Err(issues);
        }
        Ok(Self {
            slug: raw.slug,
            title: raw.title,
            description: raw.description.unwrap_or_default(),
            difficulty: raw.difficulty.unwrap_or_default(),
            language: raw.language.map(TextItem::into_text),
            reference: raw.reference,
            lessons,
        })
    }

    /// Finds a lesson by slug.
    pub fn lesson(&self, slug: &str) -> Option<&Lesson> {
        self.lessons.iter().find(|lesson| lesson.slug == slug)
    }
}

/// The four interaction types a lesson can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LessonKind {
    /// Explanatory sections, no evaluation.
    #[serde(rename = "concept")]
    Concept,
    /// Multiple choice.
    #[serde(rename = "mcq")]
    Mcq,
    /// Put shuffled code blocks back in order.
    #[serde(rename = "codeblock_rearranging")]
    CodeRearrange,
    /// Complete a code template.
    #[serde(rename = "fill_in_blanks")]
    FillInBlanks,
}

impl LessonKind {
    /// Parses the CMS `type` field.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "concept" => Some(Self::Concept),
            "mcq" => Some(Self::Mcq),
            "codeblock_rearranging" => Some(Self::CodeRearrange),
            "fill_in_blanks" => Some(Self::FillInBlanks),
            _ => None,
        }
    }

    /// The CMS spelling of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Concept => "concept",
            Self::Mcq => "mcq",
            Self::CodeRearrange => "codeblock_rearranging",
            Self::FillInBlanks => "fill_in_blanks",
        }
    }
}

impl fmt::Display for LessonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated lesson.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    /// Stable identifier.
    pub id: String,
    /// URL slug.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Ordered learning objectives.
    pub learning_objectives: Vec<String>,
    /// Type-specific payload.
    pub body: LessonBody,
}

/// Type-specific lesson payload, checked at load time.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum LessonBody {
    /// Concept sections and key points.
    Concept(ConceptData),
    /// Multiple-choice questions.
    Mcq(Vec<McqQuestion>),
    /// Code-block rearrangement questions.
    #[serde(rename = "codeblock_rearranging")]
    CodeRearrange(Vec<RearrangeQuestion>),
    /// Fill-in-the-blank questions.
    FillInBlanks(Vec<FibQuestion>),
    /// The payload was missing or malformed.
    Unavailable {
        /// The declared lesson type, when it was recognisable.
        kind: Option<LessonKind>,
        /// Why the content could not be used.
        reason: String,
    },
}

impl LessonBody {
    /// The lesson kind, if known.
    pub const fn kind(&self) -> Option<LessonKind> {
        match self {
            Self::Concept(_) => Some(LessonKind::Concept),
            Self::Mcq(_) => Some(LessonKind::Mcq),
            Self::CodeRearrange(_) => Some(LessonKind::CodeRearrange),
            Self::FillInBlanks(_) => Some(LessonKind::FillInBlanks),
            Self::Unavailable { kind, .. } => *kind,
        }
    }

    /// Number of navigable positions: sections for concepts, questions otherwise.
    pub fn len(&self) -> usize {
        match self {
            Self::Concept(data) => data.sections.len(),
            Self::Mcq(questions) => questions.len(),
            Self::CodeRearrange(questions) => questions.len(),
            Self::FillInBlanks(questions) => questions.len(),
            Self::Unavailable { .. } => 0,
        }
    }

    /// Returns `true` for placeholders and empty concept lessons.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the content could not be loaded.
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl Lesson {
    /// Validates a raw lesson. Invalid content becomes a placeholder.
    pub fn from_raw(raw: RawLesson, index: usize) -> Self {
        let slug = raw.slug_or_index(index);
        let id = raw.id_or_slug(index);
        let title = raw.title.clone().unwrap_or_else(|| slug.clone());
        let learning_objectives = raw
            .learning_objectives
            .clone()
            .into_iter()
            .map(TextItem::into_text)
            .collect();
        let kind = LessonKind::parse(&raw.kind);

        let body = match validate_body(&raw, &slug) {
            Ok(body) => body,
            Err(issues) => {
                let reason = issues
                    .iter()
                    .map(|issue| issue.message.clone())
                    .collect::<Vec<_>>()
                    .join("; ");
                warn!(lesson = %slug, issues = issues.len(), %reason, "Lesson content unavailable");
                LessonBody::Unavailable { kind, reason }
            }
        };

        Self {
            id,
            slug,
            title,
            learning_objectives,
            body,
        }
    }

    /// Validates a raw lesson, returning every issue found.
    pub fn try_from_raw(
        raw: RawLesson,
        index: usize,
    ) -> std::result::Result<Self, Vec<ContentIssue>> {
        let slug = raw.slug_or_index(index);
        let body = validate_body(&raw, &slug)?;
        Ok(Self {
            id: raw.id_or_slug(index),
            title: raw.title.unwrap_or_else(|| slug.clone()),
            learning_objectives: raw
                .learning_objectives
                .into_iter()
                .map(TextItem::into_text)
                .collect(),
            slug,
            body,
        })
    }

    /// The lesson kind, if known.
    pub const fn kind(&self) -> Option<LessonKind> {
        self.body.kind()
    }
}

/// A code snippet with its language tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSnippet {
    /// Syntax id.
    pub language: String,
    /// Source text.
    pub code: String,
}

/// One section of a concept lesson.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptSection {
    /// Section heading.
    pub title: String,
    /// Markdown body.
    pub content: String,
    /// Optional example code.
    pub code: Option<CodeSnippet>,
    /// Optional Mermaid source.
    pub diagram: Option<String>,
}

/// Concept lesson payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptData {
    /// Sections in order.
    pub sections: Vec<ConceptSection>,
    /// Summary bullet points.
    pub key_points: Vec<String>,
}

/// One option of a multiple-choice question.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McqOption {
    /// Option id, unique within the question.
    pub id: String,
    /// Display text.
    pub text: String,
    /// Whether this is the correct option.
    pub is_correct: bool,
    /// Shown once the question is answered.
    pub explanation: Option<String>,
}

/// A multiple-choice question with exactly one correct option.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McqQuestion {
    /// Question id.
    pub id: String,
    /// Question prompt.
    pub scenario: String,
    /// Optional Mermaid source.
    pub diagram: Option<String>,
    /// Optional code shown with the prompt.
    pub code: Option<CodeSnippet>,
    /// Options in display order (never shuffled).
    pub options: Vec<McqOption>,
    /// Overall explanation.
    pub explanation: Option<String>,
}

impl McqQuestion {
    /// Looks up an option by id.
    pub fn option(&self, id: &str) -> Option<&McqOption> {
        self.options.iter().find(|option| option.id == id)
    }

    /// The correct option. Always present for validated questions.
    pub fn correct_option(&self) -> Option<&McqOption> {
        self.options.iter().find(|option| option.is_correct)
    }
}

/// How a blank is answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlankKind {
    /// Free text input.
    #[default]
    Text,
    /// Pick from a list.
    Dropdown,
}

/// One blank in a fill-in-the-blank template.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blank {
    /// 1-based position matching `{{blankN}}`.
    pub position: u32,
    /// Input style.
    #[serde(rename = "type")]
    pub kind: BlankKind,
    /// Expected answer (compared trimmed and lowercased).
    pub correct_answer: String,
    /// Choices for dropdown blanks.
    pub options: Vec<String>,
    /// Hint shown on request or after a wrong answer.
    pub hint: Option<String>,
    /// Explanation shown after checking.
    pub explanation: Option<String>,
}

/// A fill-in-the-blank question.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FibQuestion {
    /// Question id.
    pub id: String,
    /// Question prompt.
    pub scenario: String,
    /// Optional Mermaid source.
    pub diagram: Option<String>,
    /// Code template with `{{blankN}}` placeholders.
    pub template: String,
    /// Syntax id of the template.
    pub language: String,
    /// Blanks ordered by position.
    pub blanks: Vec<Blank>,
    /// Overall explanation.
    pub explanation: Option<String>,
}

impl FibQuestion {
    /// Looks up a blank by position.
    pub fn blank(&self, position: u32) -> Option<&Blank> {
        self.blanks.iter().find(|blank| blank.position == position)
    }

    /// Splits the template into literal text and blank slots.
    pub fn segments(&self) -> Vec<TemplateSegment> {
        parse_template(&self.template)
    }
}

/// A piece of a fill-in-the-blank template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TemplateSegment {
    /// Literal code.
    Text {
        /// The text.
        text: String,
    },
    /// A `{{blankN}}` placeholder.
    Blank {
        /// The `N`.
        position: u32,
    },
}

/// Splits a template into literal and blank segments.
pub fn parse_template(template: &str) -> Vec<TemplateSegment> {
    let Some(re) = BLANK_PLACEHOLDER.as_ref() else {
        return vec![TemplateSegment::Text {
            text: template.to_string(),
        }];
    };

    let mut segments = Vec::new();
    let mut last = 0;
    for caps in re.captures_iter(template) {
        let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Ok(position) = number.as_str().parse::<u32>() else {
            continue;
        };
        if whole.start() > last {
            segments.push(TemplateSegment::Text {
                text: template[last..whole.start()].to_string(),
            });
        }
        segments.push(TemplateSegment::Blank { position });
        last = whole.end();
    }
    if last < template.len() {
        segments.push(TemplateSegment::Text {
            text: template[last..].to_string(),
        });
    }
    segments
}

/// A block of code to be placed in order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Block id, unique within the question.
    pub id: String,
    /// Code shown on the block.
    pub code: String,
    /// 1-based position in the solution.
    pub correct_order: u32,
}

/// A code-rearrangement question.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RearrangeQuestion {
    /// Question id.
    pub id: String,
    /// Question prompt.
    pub scenario: String,
    /// Optional Mermaid source.
    pub diagram: Option<String>,
    /// Syntax id of the blocks.
    pub language: String,
    /// Blocks in authoring order.
    pub blocks: Vec<Block>,
    /// Hints revealed one at a time.
    pub hints: Vec<String>,
    /// Overall explanation.
    pub explanation: Option<String>,
}

impl RearrangeQuestion {
    /// Block ids sorted by ascending `correct_order`.
    pub fn canonical_order(&self) -> Vec<String> {
        let mut blocks: Vec<&Block> = self.blocks.iter().collect();
        blocks.sort_by_key(|block| block.correct_order);
        blocks.into_iter().map(|block| block.id.clone()).collect()
    }

    /// Looks up a block by id.
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.id == id)
    }

    /// All block ids in authoring order.
    pub fn block_ids(&self) -> Vec<String> {
        self.blocks.iter().map(|block| block.id.clone()).collect()
    }
}

// ============================================================================
// Validation
// ============================================================================

/// One problem found while validating a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentIssue {
    /// Lesson slug.
    pub lesson: String,
    /// Question id, when the problem is inside a question.
    pub question: Option<String>,
    /// What is wrong.
    pub message: String,
}

impl fmt::Display for ContentIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.question {
            Some(question) => write!(f, "{} / {}: {}", self.lesson, question, self.message),
            None => write!(f, "{}: {}", self.lesson, self.message),
        }
    }
}

struct Issues<'a> {
    lesson: &'a str,
    found: Vec<ContentIssue>,
}

impl<'a> Issues<'a> {
    const fn new(lesson: &'a str) -> Self {
        Self {
            lesson,
            found: Vec::new(),
        }
    }

    fn lesson(&mut self, message: impl Into<String>) {
        self.found.push(ContentIssue {
            lesson: self.lesson.to_string(),
            question: None,
            message: message.into(),
        });
    }

    fn question(&mut self, question: &str, message: impl Into<String>) {
        self.found.push(ContentIssue {
            lesson: self.lesson.to_string(),
            question: Some(question.to_string()),
            message: message.into(),
        });
    }

    fn finish<T>(self, value: T) -> std::result::Result<T, Vec<ContentIssue>> {
        if self.found.is_empty() {
            Ok(value)
        } else {
            Err(self.found)
        }
    }
}

fn validate_body(
    raw: &RawLesson,
    slug: &str,
) -> std::result::Result<LessonBody, Vec<ContentIssue>> {
    let mut issues = Issues::new(slug);
    let Some(kind) = LessonKind::parse(&raw.kind) else {
        issues.lesson(format!("unknown lesson type '{}'", raw.kind));
        return issues.finish(LessonBody::Unavailable {
            kind: None,
            reason: String::new(),
        });
    };

    match kind {
        LessonKind::Concept => {
            let Some(data) = &raw.concept_data else {
                issues.lesson("missing conceptData");
                return issues.finish(LessonBody::Unavailable {
                    kind: Some(kind),
                    reason: String::new(),
                });
            };
            let body = LessonBody::Concept(validate_concept(data, &mut issues));
            issues.finish(body)
        }
        LessonKind::Mcq => {
            let questions = raw
                .mcq_data
                .as_ref()
                .map(|d| d.questions.as_slice())
                .unwrap_or_default();
            if questions.is_empty() {
                issues.lesson("mcqData has no questions");
            }
            let body = LessonBody::Mcq(
                questions
                    .iter()
                    .enumerate()
                    .map(|(i, q)| validate_mcq(q, i, &mut issues))
                    .collect(),
            );
            issues.finish(body)
        }
        LessonKind::FillInBlanks => {
            let questions = raw
                .fib_data
                .as_ref()
                .map(|d| d.questions.as_slice())
                .unwrap_or_default();
            if questions.is_empty() {
                issues.lesson("fibData has no questions");
            }
            let body = LessonBody::FillInBlanks(
                questions
                    .iter()
                    .enumerate()
                    .map(|(i, q)| validate_fib(q, i, &mut issues))
                    .collect(),
            );
            issues.finish(body)
        }
        LessonKind::CodeRearrange => {
            let questions = raw
                .code_rearrange_data
                .as_ref()
                .map(|d| d.questions.as_slice())
                .unwrap_or_default();
            if questions.is_empty() {
                issues.lesson("codeRearrangeData has no questions");
            }
            let body = LessonBody::CodeRearrange(
                questions
                    .iter()
                    .enumerate()
                    .map(|(i, q)| validate_rearrange(q, i, &mut issues))
                    .collect(),
            );
            issues.finish(body)
        }
    }
}

fn validate_concept(raw: &RawConceptData, issues: &mut Issues<'_>) -> ConceptData {
    if raw.sections.is_empty() {
        issues.lesson("conceptData has no sections");
    }
    let sections = raw
        .sections
        .iter()
        .enumerate()
        .map(|(i, section)| ConceptSection {
            title: section
                .title
                .clone()
                .unwrap_or_else(|| format!("Section {}", i + 1)),
            content: section.content.clone().unwrap_or_default(),
            code: section.code.as_ref().map(|code| CodeSnippet {
                language: section.code_language.clone().unwrap_or_else(|| "text".to_string()),
                code: code.clone(),
            }),
            diagram: non_blank(section.diagram.as_ref()),
        })
        .collect();
    ConceptData {
        sections,
        key_points: raw.key_points.iter().cloned().map(TextItem::into_text).collect(),
    }
}

fn validate_mcq(raw: &RawMcqQuestion, index: usize, issues: &mut Issues<'_>) -> McqQuestion {
    let id = raw.id.as_ref().map_or_else(|| format!("q{}", index + 1), ToString::to_string);

    if raw.options.is_empty() {
        issues.question(&id, "question has no options");
    }
    let correct = raw.options.iter().filter(|o| o.is_correct).count();
    if !raw.options.is_empty() && correct != 1 {
        issues.question(
            &id,
            format!("expected exactly one correct option, found {correct}"),
        );
    }

    let options: Vec<McqOption> = raw
        .options
        .iter()
        .enumerate()
        .map(|(i, option)| McqOption {
            id: option.id.as_ref().map_or_else(|| option_letter(i), ToString::to_string),
            text: option.text.clone().unwrap_or_default(),
            is_correct: option.is_correct,
            explanation: option.explanation.clone(),
        })
        .collect();

    let mut seen = HashSet::new();
    for option in &options {
        if !seen.insert(option.id.as_str()) {
            issues.question(&id, format!("duplicate option id '{}'", option.id));
        }
    }

    McqQuestion {
        scenario: raw.scenario.clone().unwrap_or_default(),
        diagram: non_blank(raw.diagram.as_ref()),
        code: raw.code.as_ref().map(|code| CodeSnippet {
            language: raw.code_language.clone().unwrap_or_else(|| "text".to_string()),
            code: code.clone(),
        }),
        options,
        explanation: raw.explanation.clone(),
        id,
    }
}

fn validate_fib(raw: &RawFibQuestion, index: usize, issues: &mut Issues<'_>) -> FibQuestion {
    let id = raw.id.as_ref().map_or_else(|| format!("q{}", index + 1), ToString::to_string);
    let template = raw.template.clone().unwrap_or_default();

    if raw.blanks.is_empty() {
        issues.question(&id, "question has no blanks");
    }

    let mut blanks = Vec::with_capacity(raw.blanks.len());
    let mut positions = HashSet::new();
    for (i, blank) in raw.blanks.iter().enumerate() {
        let position = blank.position.unwrap_or_else(|| u32::try_from(i + 1).unwrap_or(u32::MAX));
        if position == 0 {
            issues.question(&id, "blank positions are 1-based");
        }
        if !positions.insert(position) {
            issues.question(&id, format!("duplicate blank position {position}"));
        }
        let kind = match blank.kind.as_deref().map(str::to_lowercase).as_deref() {
            None | Some("text") => BlankKind::Text,
            Some("dropdown") => BlankKind::Dropdown,
            Some(other) => {
                issues.question(&id, format!("blank {position} has unknown type '{other}'"));
                BlankKind::Text
            }
        };
        let Some(correct_answer) = blank.correct_answer.clone() else {
            issues.question(&id, format!("blank {position} has no correctAnswer"));
            continue;
        };
        let options: Vec<String> = blank.options.iter().cloned().map(TextItem::into_text).collect();
        if kind == BlankKind::Dropdown {
            if options.is_empty() {
                issues.question(&id, format!("dropdown blank {position} has no options"));
            } else if !options
                .iter()
                .any(|option| normalize_answer(option) == normalize_answer(&correct_answer))
            {
                issues.question(
                    &id,
                    format!("dropdown blank {position} does not offer its correct answer"),
                );
            }
        }
        blanks.push(Blank {
            position,
            kind,
            correct_answer,
            options,
            hint: blank.hint.clone(),
            explanation: blank.explanation.clone(),
        });
    }
    blanks.sort_by_key(|blank| blank.position);

    for segment in parse_template(&template) {
        if let TemplateSegment::Blank { position } = segment {
            if !positions.contains(&position) {
                issues.question(&id, format!("template placeholder blank{position} has no blank"));
            }
        }
    }

    FibQuestion {
        scenario: raw.scenario.clone().unwrap_or_default(),
        diagram: non_blank(raw.diagram.as_ref()),
        template,
        language: raw.language.clone().unwrap_or_else(|| "text".to_string()),
        blanks,
        explanation: raw.explanation.clone(),
        id,
    }
}

fn validate_rearrange(
    raw: &RawRearrangeQuestion,
    index: usize,
    issues: &mut Issues<'_>,
) -> RearrangeQuestion {
    let id = raw.id.as_ref().map_or_else(|| format!("q{}", index + 1), ToString::to_string);

    if raw.blocks.is_empty() {
        issues.question(&id, "question has no blocks");
    }

    let mut ids = HashSet::new();
    let mut orders: HashMap<u32, usize> = HashMap::new();
    let mut blocks = Vec::with_capacity(raw.blocks.len());
    for (i, block) in raw.blocks.iter().enumerate() {
        let block_id = block.id.as_ref().map_or_else(|| format!("b{}", i + 1), ToString::to_string);
        if !ids.insert(block_id.clone()) {
            issues.question(&id, format!("duplicate block id '{block_id}'"));
        }
        let Some(correct_order) = block.correct_order else {
            issues.question(&id, format!("block '{block_id}' has no correctOrder"));
            continue;
        };
        *orders.entry(correct_order).or_default() += 1;
        blocks.push(Block {
            id: block_id,
            code: block.code.clone().unwrap_or_default(),
            correct_order,
        });
    }

    let total = raw.blocks.len();
    let is_permutation = orders.len() == total
        && orders.values().all(|count| *count == 1)
        && orders
            .keys()
            .all(|order| *order >= 1 && usize::try_from(*order).map_or(false, |o| o <= total));
    if total > 0 && !is_permutation {
        issues.question(&id, format!("correctOrder values must be a permutation of 1..={total}"));
    }

    RearrangeQuestion {
        scenario: raw.scenario.clone().unwrap_or_default(),
        diagram: non_blank(raw.diagram.as_ref()),
        language: raw.language.clone().unwrap_or_else(|| "text".to_string()),
        blocks,
        hints: raw.hints.iter().cloned().map(TextItem::into_text).collect(),
        explanation: raw.explanation.clone(),
        id,
    }
}

/// Trim and lowercase, the comparison form for blank answers.
pub fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

fn option_letter(index: usize) -> String {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map_or_else(|| format!("o{}", index + 1), |i| char::from(b'a' + i).to_string())
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty()).cloned()
}

// ============================================================================
// Raw CMS shapes
// ============================================================================

/// An id that may arrive as a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    /// String id.
    Text(String),
    /// Numeric id.
    Number(i64),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A list entry that may be a bare string or an object wrapping one,
/// e.g. `{"objective": "..."}` or `{"hint": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TextItem {
    /// Bare string.
    Plain(String),
    /// Object with one meaningful string field.
    Keyed(HashMap<String, serde_json::Value>),
}

impl TextItem {
    const KEYS: [&'static str; 8] = [
        "text",
        "objective",
        "point",
        "hint",
        "option",
        "value",
        "slug",
        "content",
    ];

    /// Extracts the text, preferring well-known field names.
    pub fn into_text(self) -> String {
        match self {
            Self::Plain(text) => text,
            Self::Keyed(map) => Self::KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(serde_json::Value::as_str))
                .map(str::to_string)
                .unwrap_or_default(),
        }
    }
}

/// Tutorial as exported by the CMS.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTutorial {
    /// URL slug.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
    /// Difficulty.
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    /// Language slug or `{slug}` relation.
    #[serde(default)]
    pub language: Option<TextItem>,
    /// Reference markdown.
    #[serde(default)]
    pub reference: Option<String>,
    /// Lessons in order.
    #[serde(default)]
    pub lessons: Vec<RawLesson>,
}

/// Lesson as exported by the CMS. All payloads optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLesson {
    /// Identifier.
    #[serde(default)]
    pub id: Option<RawId>,
    /// URL slug.
    #[serde(default)]
    pub slug: Option<String>,
    /// Display title.
    #[serde(default)]
    pub title: Option<String>,
    /// Lesson type string.
    #[serde(rename = "type")]
    pub kind: String,
    /// Learning objectives.
    #[serde(default)]
    pub learning_objectives: Vec<TextItem>,
    /// Concept payload.
    #[serde(default)]
    pub concept_data: Option<RawConceptData>,
    /// MCQ payload.
    #[serde(default)]
    pub mcq_data: Option<RawQuestions<RawMcqQuestion>>,
    /// Code-rearrange payload.
    #[serde(default)]
    pub code_rearrange_data: Option<RawQuestions<RawRearrangeQuestion>>,
    /// Fill-in-blank payload.
    #[serde(default)]
    pub fib_data: Option<RawQuestions<RawFibQuestion>>,
}

impl RawLesson {
    fn slug_or_index(&self, index: usize) -> String {
        self.slug
            .clone()
            .filter(|slug| !slug.trim().is_empty())
            .unwrap_or_else(|| format!("lesson-{}", index + 1))
    }

    fn id_or_slug(&self, index: usize) -> String {
        self.id
            .as_ref()
            .map_or_else(|| self.slug_or_index(index), ToString::to_string)
    }
}

/// A `{questions: [...]}` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestions<Q> {
    /// Questions in order.
    #[serde(default = "Vec::new")]
    pub questions: Vec<Q>,
}

/// Concept payload as exported by the CMS.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConceptData {
    /// Sections.
    #[serde(default)]
    pub sections: Vec<RawConceptSection>,
    /// Key points.
    #[serde(default)]
    pub key_points: Vec<TextItem>,
}

/// Concept section as exported by the CMS.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConceptSection {
    /// Heading.
    #[serde(default)]
    pub title: Option<String>,
    /// Body.
    #[serde(default)]
    pub content: Option<String>,
    /// Example code.
    #[serde(default)]
    pub code: Option<String>,
    /// Language of `code`.
    #[serde(default)]
    pub code_language: Option<String>,
    /// Mermaid source.
    #[serde(default)]
    pub diagram: Option<String>,
}

/// MCQ question as exported by the CMS.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMcqQuestion {
    /// Id.
    #[serde(default)]
    pub id: Option<RawId>,
    /// Prompt.
    #[serde(default, alias = "question")]
    pub scenario: Option<String>,
    /// Mermaid source.
    #[serde(default)]
    pub diagram: Option<String>,
    /// Code shown with the prompt.
    #[serde(default)]
    pub code: Option<String>,
    /// Language of `code`.
    #[serde(default)]
    pub code_language: Option<String>,
    /// Options.
    #[serde(default)]
    pub options: Vec<RawMcqOption>,
    /// Explanation.
    #[serde(default)]
    pub explanation: Option<String>,
}

/// MCQ option as exported by the CMS.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMcqOption {
    /// Id; defaults to a letter.
    #[serde(default)]
    pub id: Option<RawId>,
    /// Text.
    #[serde(default)]
    pub text: Option<String>,
    /// Correct flag.
    #[serde(default)]
    pub is_correct: bool,
    /// Explanation.
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Fill-in-blank question as exported by the CMS.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFibQuestion {
    /// Id.
    #[serde(default)]
    pub id: Option<RawId>,
    /// Prompt.
    #[serde(default, alias = "question")]
    pub scenario: Option<String>,
    /// Mermaid source.
    #[serde(default)]
    pub diagram: Option<String>,
    /// Template with placeholders.
    #[serde(default, alias = "code")]
    pub template: Option<String>,
    /// Syntax id.
    #[serde(default)]
    pub language: Option<String>,
    /// Blanks.
    #[serde(default)]
    pub blanks: Vec<RawBlank>,
    /// Explanation.
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Blank as exported by the CMS.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlank {
    /// 1-based position.
    #[serde(default)]
    pub position: Option<u32>,
    /// `text` or `dropdown`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Expected answer.
    #[serde(default)]
    pub correct_answer: Option<String>,
    /// Dropdown choices.
    #[serde(default)]
    pub options: Vec<TextItem>,
    /// Hint.
    #[serde(default)]
    pub hint: Option<String>,
    /// Explanation.
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Code-rearrange question as exported by the CMS.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRearrangeQuestion {
    /// Id.
    #[serde(default)]
    pub id: Option<RawId>,
    /// Prompt.
    #[serde(default, alias = "question")]
    pub scenario: Option<String>,
    /// Mermaid source.
    #[serde(default)]
    pub diagram: Option<String>,
    /// Syntax id.
    #[serde(default)]
    pub language: Option<String>,
    /// Blocks.
    #[serde(default)]
    pub blocks: Vec<RawBlock>,
    /// Hints.
    #[serde(default)]
    pub hints: Vec<TextItem>,
    /// Explanation.
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Code block as exported by the CMS.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    /// Id.
    #[serde(default)]
    pub id: Option<RawId>,
    /// Code.
    #[serde(default, alias = "content")]
    pub code: Option<String>,
    /// 1-based solution position.
    #[serde(default)]
    pub correct_order: Option<u32>,
}
