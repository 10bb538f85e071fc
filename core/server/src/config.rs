use anyhow::{Context, Result};
use second_brain_assistant::LLMConfig;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Process configuration, built once at startup and handed to the router.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    /// How many recent memories the chat prompt sees
    pub chat_history_limit: usize,
    pub llm: LLMConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = match lookup("DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => {
                let home = lookup("HOME").context("HOME environment variable not set")?;
                PathBuf::from(home).join(".second-brain").join("second_brain.db")
            }
        };

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| "127.0.0.1:21960".to_string())
            .parse::<SocketAddr>()
            .context("Invalid BIND_ADDR")?;

        let chat_history_limit = match lookup("CHAT_HISTORY_LIMIT") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("Invalid CHAT_HISTORY_LIMIT '{}'", raw))?,
            None => second_brain_store::DEFAULT_LOAD_LIMIT,
        };

        let llm = LLMConfig::from_lookup(&lookup)?;

        Ok(Self {
            db_path,
            bind_addr,
            chat_history_limit,
            llm,
        })
    }
}
