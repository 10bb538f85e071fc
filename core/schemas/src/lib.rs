use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ID Types
// ============================================================================

/// Surrogate key assigned by the store. Unique and increasing at insert time,
/// renumbered to 1..N by compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(pub i64);

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Category
// ============================================================================

/// Suggested categories. The store keeps any label, these are what the
/// clients offer by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "core")]
    Core,
    #[serde(rename = "idea")]
    Idea,
    #[serde(rename = "reading")]
    Reading,
    #[serde(rename = "research")]
    Research,
    #[serde(rename = "journal")]
    Journal,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Core,
        Category::Idea,
        Category::Reading,
        Category::Research,
        Category::Journal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Core => "core",
            Category::Idea => "idea",
            Category::Reading => "reading",
            Category::Research => "research",
            Category::Journal => "journal",
        }
    }

    /// Match a free-text label against the suggested set
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Memory Schema
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: MemoryId,
    pub created_at: String, // YYYY-MM-DD HH:MM:SS, local time
    pub category: String,
    pub content: String,
    pub summary: String,
    pub tags: String, // comma-separated, stored verbatim
}

impl MemoryRecord {
    /// Tags split for display. Storage keeps the raw string.
    pub fn tag_list(&self) -> Vec<&str> {
        split_tag_list(&self.tags)
    }
}

/// Input to a save: everything except the id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMemory {
    pub category: String,
    pub content: String,
    pub summary: String,
    pub tags: String,
}

impl NewMemory {
    pub fn new(
        category: impl Into<String>,
        content: impl Into<String>,
        summary: impl Into<String>,
        tags: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            content: content.into(),
            summary: summary.into(),
            tags: tags.into(),
        }
    }

    /// Manual entry: summary is the content itself
    pub fn manual(
        category: impl Into<String>,
        content: impl Into<String>,
        tags: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            category: category.into(),
            summary: content.clone(),
            content,
            tags: tags.into(),
        }
    }
}

pub fn split_tag_list(tags: &str) -> Vec<&str> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

// ============================================================================
// API Schema
// ============================================================================

/// Manual save request. A missing summary falls back to the content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRequest {
    pub category: String,
    pub content: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: String,
}

impl SaveRequest {
    pub fn into_new_memory(self) -> NewMemory {
        let summary = self
            .summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.content.clone());
        NewMemory::new(self.category, self.content, summary, self.tags)
    }
}

/// Free text to be summarized and tagged before saving
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRequest {
    pub category: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResponse {
    pub id: MemoryId,
    pub summary: String,
    pub tags: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub memories_used: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactResponse {
    pub records: usize,
}
