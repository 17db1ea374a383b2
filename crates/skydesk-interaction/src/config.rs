//! Backend endpoint configuration.
//!
//! Supports reading settings from `~/.config/skydesk/config.json`, with
//! environment variables as a fallback.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use skydesk_core::{Result, SkydeskError};

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Resolved backend configuration for the chat API client.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the conversation backend (no trailing `/chat`).
    pub base_url: String,
    /// Whole-round-trip timeout. On expiry the turn fails terminally; the
    /// session clears its busy flag and keeps the optimistic user message.
    pub timeout: Duration,
}

/// On-disk configuration file shape for `~/.config/skydesk/config.json`.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    backend_url: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl BackendConfig {
    /// Creates a configuration pointing at the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Loads configuration with the usual resolution order.
    ///
    /// Priority:
    /// 1. `~/.config/skydesk/config.json`
    /// 2. `SKYDESK_BACKEND_URL` environment variable
    /// 3. Built-in default (`http://localhost:8000`)
    pub fn resolve() -> Self {
        if let Some(config) = load_config_file() {
            let mut resolved = Self::default();
            if let Some(url) = config.backend_url {
                resolved.base_url = url;
            }
            if let Some(secs) = config.timeout_secs {
                resolved.timeout = Duration::from_secs(secs);
            }
            return resolved;
        }

        if let Ok(url) = env::var("SKYDESK_BACKEND_URL") {
            if !url.trim().is_empty() {
                return Self::new(url);
            }
        }

        Self::default()
    }

    /// Validates the configuration before a client is built from it.
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(SkydeskError::config(format!(
                "backend URL must be http(s): {}",
                self.base_url
            )));
        }
        Ok(())
    }

    /// The full chat endpoint URL.
    pub fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url.trim_end_matches('/'))
    }
}

fn load_config_file() -> Option<ConfigFile> {
    let path = config_path()?;
    if !path.exists() {
        return None;
    }
    let content = fs::read_to_string(&path)
        .map_err(|e| tracing::warn!(path = %path.display(), "failed to read config file: {e}"))
        .ok()?;
    serde_json::from_str(&content)
        .map_err(|e| tracing::warn!(path = %path.display(), "failed to parse config file: {e}"))
        .ok()
}

/// Returns the path to the configuration file: ~/.config/skydesk/config.json
fn config_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join(".config").join("skydesk").join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_url_strips_trailing_slash() {
        let config = BackendConfig::new("http://localhost:8000/");
        assert_eq!(config.chat_url(), "http://localhost:8000/chat");
    }

    #[test]
    fn test_validate_rejects_bare_host() {
        let config = BackendConfig::new("localhost:8000");
        assert!(config.validate().unwrap_err().is_config());
    }
}
