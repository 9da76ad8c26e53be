use crate::error::{EncoreError, Result};
use crate::retry::RetryPolicy;
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncoreConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Path to the capture worker binary. Defaults to `encore-capture`
    /// next to the current executable, falling back to $PATH lookup.
    #[serde(default)]
    pub worker_binary: Option<String>,
    /// Directory for per-session event stores. Defaults to
    /// `~/.config/encore/sessions`.
    #[serde(default)]
    pub session_dir: Option<String>,
    /// How long to wait for the worker to exit after the terminate request
    /// before escalating to a hard kill.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    /// Tag key presses that immediately follow a left click with
    /// `possible_internet_research_input`.
    #[serde(default = "default_true")]
    pub followup_tagging: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            worker_binary: None,
            session_dir: None,
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            followup_tagging: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub dimensions: Option<usize>,
    #[serde(default)]
    pub env_var: Option<String>,
    /// Backoff applied to remote embedding calls.
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            api_key: None,
            base_url: None,
            dimensions: None,
            env_var: None,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub env_var: Option<String>,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            api_key: None,
            base_url: None,
            env_var: None,
            max_tokens: default_llm_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Interpreter for generated general-purpose scripts.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Hard cap on script execution time, in seconds.
    #[serde(default = "default_script_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            timeout_secs: default_script_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Path to the append-only example log. Defaults to
    /// `~/.config/encore/experiences.jsonl`.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self { path: None }
    }
}

// -- Defaults --

fn default_true() -> bool {
    true
}
fn default_shutdown_timeout_ms() -> u64 {
    3_000
}
fn default_embedding_provider() -> String {
    "hash".to_string()
}
fn default_embedding_model() -> String {
    "hash-128d".to_string()
}
fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_llm_max_tokens() -> usize {
    2048
}
fn default_interpreter() -> String {
    "osascript".to_string()
}
fn default_script_timeout_secs() -> u64 {
    120
}

/// Valid embedding provider names.
pub const VALID_EMBEDDING_PROVIDERS: &[&str] = &["hash", "openai"];

/// Valid LLM provider names.
pub const VALID_LLM_PROVIDERS: &[&str] = &["openai", "ollama"];

impl EncoreConfig {
    /// Load configuration with a two-layer TOML merge:
    /// 1. ~/.config/encore/config.toml (global)
    /// 2. ./encore.toml (per-directory override)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        if let Some(dir) = project_dir {
            let local_config = dir.join("encore.toml");
            if local_config.exists() {
                builder = builder.add_source(File::from(local_config).required(false));
            }
        }

        let config = builder
            .build()
            .map_err(|e| EncoreError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| EncoreError::Config(e.to_string()))
    }

    /// Non-fatal sanity checks; returns human-readable warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !VALID_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            warnings.push(format!(
                "unknown embedding provider '{}', valid: {}",
                self.embedding.provider,
                VALID_EMBEDDING_PROVIDERS.join(", ")
            ));
        }

        if !VALID_LLM_PROVIDERS.contains(&self.llm.provider.as_str()) {
            warnings.push(format!(
                "unknown LLM provider '{}', valid: {}",
                self.llm.provider,
                VALID_LLM_PROVIDERS.join(", ")
            ));
        }

        if self.runner.timeout_secs == 0 {
            warnings.push("runner.timeout_secs is 0; scripts will be killed immediately".into());
        }

        warnings
    }

    /// Resolved corpus log path.
    pub fn corpus_path(&self) -> PathBuf {
        match &self.corpus.path {
            Some(p) => PathBuf::from(p),
            None => config_dir().join("experiences.jsonl"),
        }
    }

    /// Resolved directory for per-session event stores.
    pub fn session_dir(&self) -> PathBuf {
        match &self.capture.session_dir {
            Some(p) => PathBuf::from(p),
            None => config_dir().join("sessions"),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("encore")
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("encore").join("config.toml"))
}

/// Resolve an API key: check config field first, then environment variable.
/// Used by both embedding and LLM service initialization.
pub fn resolve_api_key(
    api_key: Option<&str>,
    env_var_override: Option<&str>,
    default_env_var: &str,
    provider_name: &str,
    service_kind: &str,
) -> Result<String> {
    if let Some(key) = api_key {
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }

    let env_var_name = env_var_override.unwrap_or(default_env_var);

    std::env::var(env_var_name).map_err(|_| {
        EncoreError::Config(format!(
            "{provider_name} {service_kind} provider requires an API key \
             (set {service_kind}.api_key or {env_var_name})"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EncoreConfig::default();
        assert_eq!(config.embedding.provider, "hash");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.runner.interpreter, "osascript");
        assert_eq!(config.runner.timeout_secs, 120);
        assert_eq!(config.capture.shutdown_timeout_ms, 3_000);
        assert!(config.capture.followup_tagging);
    }

    #[test]
    fn test_load_config_no_files() {
        let config = EncoreConfig::load(Some(Path::new("/nonexistent/path"))).unwrap();
        assert_eq!(config.embedding.provider, "hash");
        assert_eq!(config.runner.timeout_secs, 120);
    }

    #[test]
    fn test_load_local_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("encore.toml"),
            "[runner]\ntimeout_secs = 5\n\n[llm]\nmodel = \"gpt-4o\"\n",
        )
        .unwrap();
        let config = EncoreConfig::load(Some(dir.path())).unwrap();
        assert_eq!(config.runner.timeout_secs, 5);
        assert_eq!(config.llm.model, "gpt-4o");
        // untouched sections keep defaults
        assert_eq!(config.embedding.provider, "hash");
    }

    #[test]
    fn test_load_retry_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("encore.toml"),
            "[embedding.retry]\nmax_retries = 5\nbase_delay_ms = 50\n",
        )
        .unwrap();
        let config = EncoreConfig::load(Some(dir.path())).unwrap();
        assert_eq!(config.embedding.retry, RetryPolicy::new(5, 50));
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = EncoreConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: EncoreConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.embedding.provider, config.embedding.provider);
        assert_eq!(parsed.runner.timeout_secs, config.runner.timeout_secs);
    }

    #[test]
    fn test_validate_unknown_providers() {
        let mut config = EncoreConfig::default();
        config.embedding.provider = "banana".into();
        config.llm.provider = "mango".into();
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_validate_clean() {
        let warnings = EncoreConfig::default().validate();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_resolve_api_key_from_config() {
        let key = resolve_api_key(
            Some("config-key"),
            None,
            "OPENAI_API_KEY",
            "openai",
            "embedding",
        )
        .unwrap();
        assert_eq!(key, "config-key");
    }

    #[test]
    fn test_resolve_api_key_custom_env_var() {
        let _env = crate::test_util::env_lock();
        std::env::set_var("ENCORE_TEST_KEY", "env-key");
        let key = resolve_api_key(
            None,
            Some("ENCORE_TEST_KEY"),
            "OPENAI_API_KEY",
            "openai",
            "embedding",
        )
        .unwrap();
        assert_eq!(key, "env-key");
        std::env::remove_var("ENCORE_TEST_KEY");
    }
}
