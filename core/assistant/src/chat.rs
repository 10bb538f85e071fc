use second_brain_schemas::MemoryRecord;
use std::sync::Arc;
use tracing::{info, warn};

use crate::llm_providers::LLMProvider;

const EMPTY_CONTEXT: &str = "(no memories stored yet)";

/// Answers questions against recently stored memories
pub struct ChatComposer {
    provider: Arc<dyn LLMProvider>,
}

impl ChatComposer {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// Render records as the memory block of the prompt, one entry per record
    /// in the order given.
    pub fn memory_context(records: &[MemoryRecord]) -> String {
        if records.is_empty() {
            return EMPTY_CONTEXT.to_string();
        }

        records
            .iter()
            .map(|r| {
                format!(
                    "[ID:{}] [{}] Summary: {}\nTags: {}\n---\n",
                    r.id, r.category, r.summary, r.tags
                )
            })
            .collect()
    }

    pub fn build_prompt(query: &str, records: &[MemoryRecord]) -> String {
        format!(
            r#"[Role] Your second-brain advisor.
[Memories]
{}
[Question] "{}"
[Rules] 1. Always cite the memories you use as [ID:xx]. 2. If no memory applies, general knowledge is allowed but must be labelled as such."#,
            Self::memory_context(records),
            query
        )
    }

    /// Ask the service. Failures are returned as the answer text.
    pub async fn answer(&self, query: &str, records: &[MemoryRecord]) -> String {
        info!("Chat query over {} memories", records.len());

        let prompt = Self::build_prompt(query, records);
        match self.provider.generate(&prompt, None).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Chat generation failed via {}: {}", self.provider.name(), e);
                format!("Brain short-circuit: {}", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubProvider;
    use second_brain_schemas::MemoryId;

    fn record(id: i64, category: &str, summary: &str, tags: &str) -> MemoryRecord {
        MemoryRecord {
            id: MemoryId(id),
            created_at: "2025-03-01 09:00:00".into(),
            category: category.into(),
            content: summary.into(),
            summary: summary.into(),
            tags: tags.into(),
        }
    }

    #[test]
    fn test_memory_context_lines() {
        let records = vec![
            record(2, "idea", "Batch reviews on Sunday", "habit"),
            record(1, "core", "Lifetimes bound references", "rust"),
        ];

        let context = ChatComposer::memory_context(&records);
        assert_eq!(
            context,
            "[ID:2] [idea] Summary: Batch reviews on Sunday\nTags: habit\n---\n\
             [ID:1] [core] Summary: Lifetimes bound references\nTags: rust\n---\n"
        );
    }

    #[test]
    fn test_empty_context_placeholder() {
        let prompt = ChatComposer::build_prompt("what do I know?", &[]);
        assert!(prompt.contains(EMPTY_CONTEXT));
        assert!(prompt.contains("\"what do I know?\""));
    }

    #[tokio::test]
    async fn test_answer_uses_memories() {
        let stub = Arc::new(StubProvider::replying("See [ID:1]."));
        let composer = ChatComposer::new(stub.clone());

        let answer = composer
            .answer("lifetimes?", &[record(1, "core", "Lifetimes bound references", "rust")])
            .await;

        assert_eq!(answer, "See [ID:1].");
        assert!(stub.last_prompt().unwrap().contains("[ID:1] [core]"));
    }

    #[tokio::test]
    async fn test_answer_failure_is_inline() {
        let composer = ChatComposer::new(Arc::new(StubProvider::failing("connection reset")));

        let answer = composer.answer("anything", &[]).await;
        assert_eq!(answer, "Brain short-circuit: connection reset");
    }
}
