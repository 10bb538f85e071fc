use anyhow::{bail, Context, Result};

/// Configuration for the summarization service
#[derive(Debug, Clone, PartialEq)]
pub struct LLMConfig {
    pub provider: LLMProviderKind,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Optional HTTP(S) proxy for outbound calls, e.g. `http://127.0.0.1:1082`
    pub proxy: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LLMProviderKind {
    Ollama,
    OpenAI,
}

const DEFAULT_TIMEOUT_SECS: u64 = 30;

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProviderKind::Ollama,
            api_key: None,
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            proxy: None,
        }
    }
}

impl LLMConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key lookup. `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = lookup("LLM_PROVIDER")
            .unwrap_or_else(|| "ollama".to_string())
            .to_lowercase();

        let provider = match provider.as_str() {
            "openai" => LLMProviderKind::OpenAI,
            "ollama" => LLMProviderKind::Ollama,
            other => bail!("Unknown LLM_PROVIDER '{}', expected ollama or openai", other),
        };

        let (base_url, model) = match provider {
            LLMProviderKind::Ollama => (
                lookup("OLLAMA_URL").unwrap_or_else(|| "http://localhost:11434".to_string()),
                lookup("OLLAMA_MODEL").unwrap_or_else(|| "llama3.2:3b".to_string()),
            ),
            LLMProviderKind::OpenAI => (
                lookup("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com".to_string()),
                lookup("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            ),
        };

        let api_key = if provider == LLMProviderKind::OpenAI {
            Some(lookup("OPENAI_API_KEY").context("OPENAI_API_KEY required for OpenAI provider")?)
        } else {
            None
        };

        let timeout_secs = match lookup("LLM_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("Invalid LLM_TIMEOUT_SECS '{}'", raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let proxy = lookup("LLM_PROXY").filter(|p| !p.trim().is_empty());

        Ok(Self {
            provider,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout_secs,
            proxy,
        })
    }
}
