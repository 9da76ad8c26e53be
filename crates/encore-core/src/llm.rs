use crate::config::{self, LlmConfig};
use crate::error::{EncoreError, Result};

/// LLM text generation service used for script synthesis.
pub struct LlmService {
    provider: LlmProvider,
    config: LlmConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for LlmService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmService")
            .field("provider", &self.provider)
            .field("model", &self.config.model)
            .finish()
    }
}

#[derive(Debug)]
enum LlmProvider {
    OpenAI,
    Ollama,
}

impl LlmService {
    /// Create an LLM service from configuration. Provider name and API key
    /// are validated here so a misconfiguration fails before any capture or
    /// synthesis work begins.
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let provider = match cfg.provider.as_str() {
            "openai" => LlmProvider::OpenAI,
            "ollama" => LlmProvider::Ollama,
            other => {
                return Err(EncoreError::Config(format!(
                    "unknown LLM provider: '{other}' (expected 'openai' or 'ollama')"
                )));
            }
        };

        if matches!(provider, LlmProvider::OpenAI) {
            resolve_llm_key(cfg)?;
        }

        Ok(Self {
            provider,
            config: cfg.clone(),
            client: reqwest::Client::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Generate text from a prompt with an optional system message.
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        match &self.provider {
            LlmProvider::OpenAI => self.generate_openai(prompt, system).await,
            LlmProvider::Ollama => self.generate_ollama(prompt, system).await,
        }
    }

    /// OpenAI: POST {base_url}/v1/chat/completions
    async fn generate_openai(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let api_key = resolve_llm_key(&self.config)?;
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com");

        let url = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));

        let mut messages = Vec::new();
        if let Some(sys) = system {
            messages.push(serde_json::json!({"role": "system", "content": sys}));
        }
        messages.push(serde_json::json!({"role": "user", "content": prompt}));

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": self.config.max_tokens,
        });

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| EncoreError::Generation(format!("OpenAI request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(EncoreError::Generation(format!(
                "OpenAI error {status}: {text}"
            )));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| EncoreError::Generation(format!("OpenAI response parse error: {e}")))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| EncoreError::Generation("OpenAI response missing content".into()))
    }

    /// Ollama: POST {base_url}/api/generate
    async fn generate_ollama(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("http://localhost:11434");

        let url = format!("{}/api/generate", base_url.trim_end_matches('/'));

        let mut body = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "num_predict": self.config.max_tokens,
            }
        });

        if let Some(sys) = system {
            body["system"] = serde_json::Value::String(sys.to_string());
        }

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EncoreError::Generation(format!("Ollama request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(EncoreError::Generation(format!(
                "Ollama error {status}: {text}"
            )));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| EncoreError::Generation(format!("Ollama response parse error: {e}")))?;

        json["response"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| EncoreError::Generation("Ollama response missing 'response' field".into()))
    }
}

fn resolve_llm_key(cfg: &LlmConfig) -> Result<String> {
    config::resolve_api_key(
        cfg.api_key.as_deref(),
        cfg.env_var.as_deref(),
        "OPENAI_API_KEY",
        &cfg.provider,
        "llm",
    )
}
