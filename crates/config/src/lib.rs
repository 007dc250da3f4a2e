//! Configuration loading, validation, and management for taskloom.
//!
//! Loads configuration from `~/.taskloom/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.taskloom/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key sent as a bearer token (LocalAI accepts any value)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint, including `/v1`
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Temperature for every completion
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Ceiling for a single completion request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub speech: SpeechConfig,
}

fn default_api_base() -> String {
    "http://localhost:8080/v1".into()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_request_timeout_secs() -> u64 {
    1200
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_base", &self.api_base)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("models", &self.models)
            .field("agent", &self.agent)
            .field("memory", &self.memory)
            .field("tools", &self.tools)
            .field("speech", &self.speech)
            .finish()
    }
}

/// Which model serves which kind of request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Classification, planning and argument filling
    #[serde(default = "default_functions_model")]
    pub functions: String,

    /// Synthesis, analysis and summarization
    #[serde(default = "default_llm_model")]
    pub llm: String,

    #[serde(default = "default_embeddings_model")]
    pub embeddings: String,
}

fn default_functions_model() -> String {
    "functions".into()
}
fn default_llm_model() -> String {
    "gpt-4".into()
}
fn default_embeddings_model() -> String {
    "all-MiniLM-L6-v2".into()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            functions: default_functions_model(),
            llm: default_llm_model(),
            embeddings: default_embeddings_model(),
        }
    }
}

/// Evaluation loop switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Ask whether another action is needed after each action
    #[serde(default)]
    pub re_evaluate: bool,

    /// Summarize intermediate text before feeding it back
    #[serde(default)]
    pub postprocess: bool,

    /// Carry earlier subtask results into later subtasks
    #[serde(default)]
    pub subtask_context: bool,

    #[serde(default = "default_max_re_evaluations")]
    pub max_re_evaluations: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_max_re_evaluations() -> usize {
    5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            re_evaluate: false,
            postprocess: false,
            subtask_context: false,
            max_re_evaluations: default_max_re_evaluations(),
            system_prompt: None,
        }
    }
}

/// Memory store selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryBackendKind {
    /// JSON lines on disk, similarity by embeddings
    #[default]
    File,
    /// Process-local, keyword similarity
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub backend: MemoryBackendKind,

    /// Store location; defaults to `<config dir>/memories.jsonl`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// How many memories a recall returns
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,
}

fn default_recall_limit() -> usize {
    4
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: MemoryBackendKind::default(),
            path: None,
            recall_limit: default_recall_limit(),
        }
    }
}

impl MemoryConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("memories.jsonl"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Directory `write_file` writes into
    #[serde(default = "default_persistent_dir")]
    pub persistent_dir: PathBuf,

    /// Page text beyond this many characters is cut off
    #[serde(default = "default_browse_max_chars")]
    pub browse_max_chars: usize,

    #[serde(default = "default_search_results")]
    pub search_results: usize,
}

fn default_persistent_dir() -> PathBuf {
    AppConfig::config_dir().join("data")
}
fn default_browse_max_chars() -> usize {
    8000
}
fn default_search_results() -> usize {
    5
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            persistent_dir: default_persistent_dir(),
            browse_max_chars: default_browse_max_chars(),
            search_results: default_search_results(),
        }
    }
}

/// Spoken replies through a `/tts` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Base URL the `/tts` path is appended to
    #[serde(default = "default_speech_api_base")]
    pub api_base: String,

    #[serde(default = "default_speech_model")]
    pub model: String,

    /// Command that plays a WAV file given as its only argument
    #[serde(default = "default_player")]
    pub player: String,
}

fn default_speech_api_base() -> String {
    "http://localhost:8080".into()
}
fn default_speech_model() -> String {
    "en-us-kathleen-low.onnx".into()
}
fn default_player() -> String {
    "aplay".into()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: default_speech_api_base(),
            model: default_speech_model(),
            player: default_player(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.taskloom/config.toml),
    /// then apply environment overrides.
    ///
    /// API key lookup order:
    /// - `TASKLOOM_API_KEY` (highest priority)
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("TASKLOOM_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(base) = lookup("TASKLOOM_API_BASE") {
            self.api_base = base;
        }
        if let Some(model) = lookup("TASKLOOM_FUNCTIONS_MODEL") {
            self.models.functions = model;
        }
        if let Some(model) = lookup("TASKLOOM_LLM_MODEL") {
            self.models.llm = model;
        }
        if let Some(model) = lookup("TASKLOOM_EMBEDDINGS_MODEL") {
            self.models.embeddings = model;
        }
        if let Some(dir) = lookup("TASKLOOM_PERSISTENT_DIR") {
            self.tools.persistent_dir = PathBuf::from(dir);
        }
        if let Some(prompt) = lookup("TASKLOOM_SYSTEM_PROMPT").filter(|p| !p.trim().is_empty()) {
            self.agent.system_prompt = Some(prompt);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".taskloom")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be > 0".into(),
            ));
        }

        if self.agent.max_re_evaluations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_re_evaluations must be >= 1".into(),
            ));
        }

        if self.api_base.trim().is_empty() {
            return Err(ConfigError::ValidationError("api_base must not be empty".into()));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Key to send, or a placeholder for endpoints that ignore it.
    pub fn api_key_or_placeholder(&self) -> &str {
        self.api_key.as_deref().unwrap_or("sk-local")
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
            models: ModelsConfig::default(),
            agent: AgentConfig::default(),
            memory: MemoryConfig::default(),
            tools: ToolsConfig::default(),
            speech: SpeechConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for taskloom_core::Error {
    fn from(err: ConfigError) -> Self {
        taskloom_core::Error::Config {
            message: err.to_string(),
        }
    }
}
