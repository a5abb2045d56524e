use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ParleyError, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_MODEL: &str = "gemma3:27b";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant for a UX case study.";
pub const DEFAULT_REDACTION_MARKER: &str = "[REDACTED]";
pub const DEFAULT_HISTORY_WINDOW: usize = 12;
pub const DEFAULT_ARCHIVE_DIR: &str = "archives";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
        }
    }
}

/// Static knobs for turning the transcript into a model prompt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PromptSettings {
    pub system_prompt: String,
    /// How many trailing transcript messages are replayed to the model.
    pub history_window: usize,
    /// Replace privacy-flagged history with `redaction_marker`.
    pub redact_privacy: bool,
    pub redaction_marker: String,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_window: DEFAULT_HISTORY_WINDOW,
            redact_privacy: true,
            redaction_marker: DEFAULT_REDACTION_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    #[default]
    Echo,
    Error,
}

impl FallbackPolicy {
    pub fn reply(self, prompt: &str, failure: &str) -> String {
        match self {
            Self::Echo => format!("Echo: {prompt}"),
            Self::Error => format!("Error: {failure}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub ollama: OllamaConfig,
    pub prompt: PromptSettings,
    pub fallback: FallbackPolicy,
    pub archive_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::convention_defaults()
    }
}

impl Config {
    pub fn convention_defaults() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            prompt: PromptSettings::default(),
            fallback: FallbackPolicy::default(),
            archive_dir: DEFAULT_ARCHIVE_DIR.to_string(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| ParleyError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(raw).map_err(|e| ParleyError::Config(e.to_string()))?;
        config.validated()
    }

    fn validated(self) -> Result<Self> {
        let base_url = self.ollama.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ParleyError::Config(format!(
                "ollama.base_url must be an http(s) URL, got `{}`",
                self.ollama.base_url
            )));
        }
        if self.ollama.model.trim().is_empty() {
            return Err(ParleyError::Config("ollama.model cannot be empty".to_string()));
        }
        if self.archive_dir.trim().is_empty() {
            return Err(ParleyError::Config("archive_dir cannot be empty".to_string()));
        }
        Ok(self)
    }

    /// Applies command-line / environment overrides on top of the loaded file.
    pub fn with_overrides(
        mut self,
        base_url: Option<String>,
        model: Option<String>,
        archive_dir: Option<String>,
    ) -> Result<Self> {
        if let Some(base_url) = base_url.filter(|v| !v.trim().is_empty()) {
            self.ollama.base_url = base_url.trim().to_string();
        }
        if let Some(model) = model.filter(|v| !v.trim().is_empty()) {
            self.ollama.model = model.trim().to_string();
        }
        if let Some(archive_dir) = archive_dir.filter(|v| !v.trim().is_empty()) {
            self.archive_dir = archive_dir;
        }
        self.validated()
    }
}
