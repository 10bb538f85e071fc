//! Canned summarization service for tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Mutex;

use crate::llm_providers::LLMProvider;

/// Returns a fixed reply (or error) and remembers the last prompt it saw.
pub struct StubProvider {
    reply: std::result::Result<String, String>,
    last_prompt: Mutex<Option<String>>,
}

impl StubProvider {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LLMProvider for StubProvider {
    async fn generate(&self, prompt: &str, _system: Option<&str>) -> Result<String> {
        if let Ok(mut guard) = self.last_prompt.lock() {
            *guard = Some(prompt.to_string());
        }
        self.reply.clone().map_err(|e| anyhow!(e))
    }

    fn name(&self) -> &str {
        "stub"
    }
}
