pub mod analysis;
pub mod chat;
pub mod config;
pub mod llm_providers;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use analysis::{split_tags, truncate_chars, NoteAnalyzer, NoteCard, SourceKind, MAX_SOURCE_CHARS, TAGS_MARKER};
pub use chat::ChatComposer;
pub use config::{LLMConfig, LLMProviderKind};
pub use llm_providers::{provider_from_config, LLMProvider, OllamaProvider, OpenAIProvider};
