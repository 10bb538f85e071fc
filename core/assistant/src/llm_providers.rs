/// LLM providers for the summarization service
/// Supports OpenAI-compatible chat completions and Ollama

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::{LLMConfig, LLMProviderKind};

/// External text-generation collaborator: free text in, generated text out.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String>;

    fn name(&self) -> &str;
}

fn build_client(config: &LLMConfig) -> Result<Client> {
    let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));

    if let Some(ref proxy) = config.proxy {
        debug!("Routing LLM calls through proxy {}", proxy);
        builder = builder.proxy(reqwest::Proxy::all(proxy).context("Invalid LLM proxy URL")?);
    }

    builder.build().context("Failed to build HTTP client")
}

/// Pick the provider named in the config
pub fn provider_from_config(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match config.provider {
        LLMProviderKind::OpenAI => Arc::new(OpenAIProvider::new(config)?),
        LLMProviderKind::Ollama => Arc::new(OllamaProvider::new(config)?),
    };
    Ok(provider)
}

/// OpenAI-compatible chat completions provider
pub struct OpenAIProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAIProvider {
    pub fn new(config: &LLMConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut messages = vec![];
        if let Some(sys) = system {
            messages.push(json!({
                "role": "system",
                "content": sys
            }));
        }
        messages.push(json!({
            "role": "user",
            "content": prompt
        }));

        let request_body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.7,
            "max_tokens": 1500
        });

        debug!("Calling OpenAI at {}", url);

        let mut request = self.client.post(&url).json(&request_body);
        if let Some(ref api_key) = self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.context("Failed to call OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI API error {}: {}", status, error_text));
        }

        let response_json: OpenAIResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        response_json
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("Empty response from OpenAI"))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Ollama provider for local processing
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(config: &LLMConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        })
    }
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let mut request_body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": 0.7,
                "num_predict": 1500,
            }
        });
        if let Some(sys) = system {
            request_body["system"] = json!(sys);
        }

        debug!("Calling Ollama at {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .context("Failed to call Ollama API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Ollama API error {}: {}", status, error_text));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(ollama_response.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_config() {
        let ollama = provider_from_config(&LLMConfig::default()).unwrap();
        assert_eq!(ollama.name(), "ollama");

        let config = LLMConfig {
            provider: LLMProviderKind::OpenAI,
            api_key: Some("sk-test".into()),
            base_url: "https://api.openai.com".into(),
            model: "gpt-4o-mini".into(),
            ..LLMConfig::default()
        };
        let openai = provider_from_config(&config).unwrap();
        assert_eq!(openai.name(), "openai");
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let config = LLMConfig {
            proxy: Some("not a url".into()),
            ..LLMConfig::default()
        };
        assert!(provider_from_config(&config).is_err());
    }

    #[test]
    fn test_openai_response_without_content() {
        let parsed: OpenAIResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
