use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::llm_providers::LLMProvider;

/// Literal marker separating the generated body from its tag list
pub const TAGS_MARKER: &str = "TAGS:";

/// Source text longer than this is cut before summarizing
pub const MAX_SOURCE_CHARS: usize = 15_000;

const UNTAGGED: &str = "untagged";
const DEEP_READ_TAGS: &str = "deep-read";
const ERROR_TAGS: &str = "error";

/// Summary plus tags ready to be saved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteCard {
    pub summary: String,
    pub tags: String,
    /// Set when `summary` holds an inline service error
    #[serde(default)]
    pub failed: bool,
}

impl NoteCard {
    pub fn new(summary: String, tags: String) -> Self {
        Self {
            summary,
            tags,
            failed: false,
        }
    }

    /// True when the card carries an inline service error instead of a summary
    pub fn is_error(&self) -> bool {
        self.failed
    }
}

/// Where the text handed to `NoteAnalyzer::brief` came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    SearchResults,
    PageText,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SourceKind::SearchResults => f.write_str("search engine summaries"),
            SourceKind::PageText => f.write_str("full page text"),
        }
    }
}

/// Split generated text on the `TAGS:` marker.
///
/// Returns the trimmed body before the first marker and the trimmed tag list
/// between the first and second markers, or the whole text and `fallback`
/// when there is no marker.
pub fn split_tags(text: &str, fallback: &str) -> (String, String) {
    let mut parts = text.split(TAGS_MARKER);
    let body = parts.next().unwrap_or_default();
    match parts.next() {
        Some(tags) => (body.trim().to_string(), tags.trim().to_string()),
        None => (text.trim().to_string(), fallback.to_string()),
    }
}

/// First `max_chars` characters of `text`, on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Turns raw notes and fetched sources into saved-ready cards
pub struct NoteAnalyzer {
    provider: Arc<dyn LLMProvider>,
}

impl NoteAnalyzer {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// Rewrite a note as a review card.
    ///
    /// Service failures come back inline in the card rather than as errors.
    pub async fn analyze(&self, text: &str) -> NoteCard {
        if text.trim().is_empty() {
            return NoteCard::new("No content".to_string(), "uncategorized".to_string());
        }

        let prompt = format!(
            r#"Reorganize the user's input into a review card.
Input: {}
----
Markdown output format:
### (short title)
(one-sentence summary)
### Core concepts
(definitions)
### Key logic
(bullet points)
TAGS: tag1, tag2"#,
            text
        );

        match self
            .provider
            .generate(&prompt, Some("You are a patient logic tutor."))
            .await
        {
            Ok(response) => {
                let (summary, tags) = split_tags(&response, UNTAGGED);
                debug!("Analyzed note into {} chars, tags: {}", summary.len(), tags);
                NoteCard::new(summary, tags)
            }
            Err(e) => {
                warn!("Summarization failed via {}: {}", self.provider.name(), e);
                NoteCard {
                    summary: format!("AI error: {}", e),
                    tags: ERROR_TAGS.to_string(),
                    failed: true,
                }
            }
        }
    }

    /// Write a research brief from already-fetched source text.
    ///
    /// The caller decides how to surface the error.
    pub async fn brief(&self, kind: SourceKind, raw: &str) -> Result<NoteCard> {
        let source = truncate_chars(raw, MAX_SOURCE_CHARS);
        if source.len() < raw.len() {
            debug!("Truncated source from {} to {} bytes", raw.len(), source.len());
        }

        let prompt = format!(
            r#"The user provided [{}].
Content: {}
----
Write an in-depth brief:
### (title)
(summary of conclusions)
#### 1. Key details
#### 2. Insights
TAGS: deep-read, intel"#,
            kind, source
        );

        let response = self
            .provider
            .generate(&prompt, Some("You are a meticulous researcher."))
            .await?;

        let (summary, tags) = split_tags(&response, DEEP_READ_TAGS);
        Ok(NoteCard::new(summary, tags))
    }
}
