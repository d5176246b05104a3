//! Configuration loading, validation, and management for askfolio.
//!
//! Loads configuration from `./askfolio.toml` (or an explicit path) with
//! environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "askfolio.toml";

/// Knowledge base file name looked up in every candidate directory.
pub const KNOWLEDGE_FILE_NAME: &str = "knowledge-base.json";

/// The root configuration structure.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the LLM provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// LLM provider and model settings
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Chunking and relevance scoring
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// History windowing
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Retry / timeout policy for completion calls
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Where the knowledge base lives
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Who the assistant talks about
    #[serde(default)]
    pub profile: ProfileConfig,

    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Redact a secret for Debug output.
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
            .field("provider", &self.provider)
            .field("retrieval", &self.retrieval)
            .field("conversation", &self.conversation)
            .field("orchestrator", &self.orchestrator)
            .field("knowledge", &self.knowledge)
            .field("profile", &self.profile)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Provider name ("openai", "openrouter", "ollama", ...)
    #[serde(default = "default_provider")]
    pub name: String,

    /// Override the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    300
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: default_provider(),
            api_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Relevance scoring strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    /// TF-IDF vectors compared by cosine similarity
    Tfidf,
    /// Query-token overlap with a whole-phrase bonus
    Lexical,
}

impl ScoringStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tfidf => "tfidf",
            Self::Lexical => "lexical",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_strategy")]
    pub strategy: ScoringStrategy,

    /// Tried when the primary strategy fails outright
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_strategy: Option<ScoringStrategy>,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// TF-IDF: chunks at or below this cosine similarity are discarded
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// TF-IDF: vocabulary size cap
    #[serde(default = "default_max_features")]
    pub max_features: usize,

    /// Lexical: bonus when the whole query appears verbatim
    #[serde(default = "default_phrase_bonus")]
    pub phrase_bonus: u32,

    /// Chunks with less field content than this are dropped
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,

    /// Query words that pull in project chunks when nothing else matched
    #[serde(default = "default_recall_triggers")]
    pub recall_triggers: Vec<String>,
}

fn default_strategy() -> ScoringStrategy {
    ScoringStrategy::Tfidf
}
fn default_top_k() -> usize {
    5
}
fn default_min_similarity() -> f32 {
    0.05
}
fn default_max_features() -> usize {
    100
}
fn default_phrase_bonus() -> u32 {
    2
}
fn default_min_chunk_chars() -> usize {
    1
}
fn default_recall_triggers() -> Vec<String> {
    vec!["project".into(), "work".into(), "build".into()]
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            secondary_strategy: None,
            top_k: default_top_k(),
            min_similarity: default_min_similarity(),
            max_features: default_max_features(),
            phrase_bonus: default_phrase_bonus(),
            min_chunk_chars: default_min_chunk_chars(),
            recall_triggers: default_recall_triggers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Number of prior user/assistant turns replayed to the model
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_history_window() -> usize {
    10
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Additional attempts after the first one
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,

    /// Delay before retry n is n * step, capped at max_backoff_secs
    #[serde(default = "default_backoff_step")]
    pub backoff_step_secs: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_max_retries() -> u32 {
    1
}
fn default_attempt_timeout() -> u64 {
    20
}
fn default_backoff_step() -> u64 {
    1
}
fn default_max_backoff() -> u64 {
    3
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            attempt_timeout_secs: default_attempt_timeout(),
            backoff_step_secs: default_backoff_step(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Explicit knowledge file, tried before the search directories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Directory holding `knowledge-base.json`
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Keep the parsed document until the file changes
    #[serde(default = "default_true")]
    pub cache: bool,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("api")
}
fn default_true() -> bool {
    true
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            path: None,
            base_dir: default_base_dir(),
            cache: true,
        }
    }
}

impl KnowledgeConfig {
    /// Ordered list of files the loader should try.
    ///
    /// explicit path → `<base_dir>/knowledge-base.json` →
    /// `<base_dir>/../api/knowledge-base.json` → `./knowledge-base.json`
    pub fn candidate_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(4);
        if let Some(path) = &self.path {
            paths.push(path.clone());
        }
        paths.push(self.base_dir.join(KNOWLEDGE_FILE_NAME));
        let parent = self
            .base_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        paths.push(parent.join("api").join(KNOWLEDGE_FILE_NAME));
        paths.push(PathBuf::from(KNOWLEDGE_FILE_NAME));
        paths.dedup();
        paths
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Name used in prompts and for an `about` section without a name
    #[serde(default = "default_owner_name")]
    pub owner_name: String,

    /// Replace the generated system prompt entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_owner_name() -> String {
    "the portfolio owner".into()
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            owner_name: default_owner_name(),
            system_prompt_override: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// CORS origins; `"*"` allows any origin
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Include truncated provider error text in failure bodies
    #[serde(default)]
    pub expose_diagnostics: bool,
}

fn default_port() -> u16 {
    3001
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_allowed_origins() -> Vec<String> {
    vec!["*".into()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: default_allowed_origins(),
            expose_diagnostics: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from `./askfolio.toml`.
    ///
    /// Also checks environment variables:
    /// - `ASKFOLIO_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `ASKFOLIO_MODEL`
    /// - `ASKFOLIO_KNOWLEDGE_PATH`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
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

    /// Apply overrides from an environment lookup.
    ///
    /// The API key from the environment wins over the file; an empty value
    /// counts as unset.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("ASKFOLIO_API_KEY").or_else(|| non_empty("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }

        if let Some(model) = non_empty("ASKFOLIO_MODEL") {
            self.provider.model = model;
        }

        if let Some(path) = non_empty("ASKFOLIO_KNOWLEDGE_PATH") {
            self.knowledge.path = Some(PathBuf::from(path));
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be at least 1".into(),
            ));
        }

        if !(0.0..1.0).contains(&self.retrieval.min_similarity) {
            return Err(ConfigError::ValidationError(
                "retrieval.min_similarity must be in [0.0, 1.0)".into(),
            ));
        }

        if self.orchestrator.attempt_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.attempt_timeout_secs must be > 0".into(),
            ));
        }

        if self.orchestrator.max_retries > 5 {
            return Err(ConfigError::ValidationError(
                "orchestrator.max_retries must be 5 or less".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// The API key, or the configuration error a chat request should report.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
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

    #[error("API key not configured: set ASKFOLIO_API_KEY or OPENAI_API_KEY")]
    MissingApiKey,
}
