//! Workspace configuration stored in `<root>/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::write_atomic;

/// Environment variable that overrides `agent.api_key`.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Workspace configuration (TOML).
///
/// Intended to be edited by humans. Missing fields default to working values;
/// only the API key has no default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DevboardConfig {
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Model identifier sent with every request.
    pub model: String,

    /// Upper bound on generated tokens per model call.
    pub max_tokens: u32,

    /// Base URL of the Messages API.
    pub api_base: String,

    /// Per-request timeout enforced by the HTTP transport.
    pub request_timeout_secs: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: 4096,
            api_base: "https://api.anthropic.com".to_string(),
            request_timeout_secs: 120,
            api_key: None,
        }
    }
}

impl DevboardConfig {
    pub fn validate(&self) -> Result<()> {
        if self.agent.model.trim().is_empty() {
            return Err(anyhow!("agent.model must not be empty"));
        }
        if self.agent.max_tokens == 0 {
            return Err(anyhow!("agent.max_tokens must be > 0"));
        }
        if self.agent.request_timeout_secs == 0 {
            return Err(anyhow!("agent.request_timeout_secs must be > 0"));
        }
        let base = &self.agent.api_base;
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(anyhow!("agent.api_base must be an http(s) URL"));
        }
        Ok(())
    }

    /// Prefer a non-empty key from the environment over the file.
    pub fn with_env_api_key(mut self, env_key: Option<String>) -> Self {
        if let Some(key) = env_key.filter(|key| !key.trim().is_empty()) {
            self.agent.api_key = Some(key);
        }
        self.agent.api_key = self.agent.api_key.filter(|key| !key.trim().is_empty());
        self
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `DevboardConfig::default()`.
pub fn load_config(path: &Path) -> Result<DevboardConfig> {
    if !path.exists() {
        let cfg = DevboardConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: DevboardConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &DevboardConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf, "toml.tmp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, DevboardConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let mut cfg = DevboardConfig::default();
        cfg.agent.max_tokens = 1024;
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[agent]\nmodel = \"custom-model\"\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.agent.model, "custom-model");
        assert_eq!(cfg.agent.max_tokens, AgentConfig::default().max_tokens);
    }

    #[test]
    fn zero_max_tokens_is_rejected() {
        let mut cfg = DevboardConfig::default();
        cfg.agent.max_tokens = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("max_tokens"));
    }

    #[test]
    fn env_key_wins_and_blank_keys_are_dropped() {
        let mut cfg = DevboardConfig::default();
        cfg.agent.api_key = Some("file-key".to_string());
        let resolved = cfg.clone().with_env_api_key(Some("env-key".to_string()));
        assert_eq!(resolved.agent.api_key.as_deref(), Some("env-key"));

        cfg.agent.api_key = Some("  ".to_string());
        assert_eq!(cfg.with_env_api_key(None).agent.api_key, None);
    }
}
