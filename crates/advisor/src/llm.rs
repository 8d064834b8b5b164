use std::time::Duration;

use async_trait::async_trait;
use ecosim_core::config::{AdvisorConfig, LlmProvider};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
const MAX_COMPLETION_TOKENS: u32 = 1024;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("advisor is not configured: {0}")]
    NotConfigured(String),
    #[error("advisor request failed: {0}")]
    Request(String),
    #[error("advisor returned status {0}")]
    Status(u16),
    #[error("advisor response is malformed: {0}")]
    MalformedResponse(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AdvisorError>;
}

/// Chat/completion client for the supported hosted and local providers.
pub struct HttpLlmClient {
    client: Client,
    provider: LlmProvider,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
}

impl HttpLlmClient {
    pub fn from_config(config: &AdvisorConfig) -> Result<Self, AdvisorError> {
        let base_url = match (&config.base_url, config.provider) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, LlmProvider::OpenAi) => OPENAI_BASE_URL.to_string(),
            (None, LlmProvider::Anthropic) => ANTHROPIC_BASE_URL.to_string(),
            (None, LlmProvider::Ollama) => DEFAULT_OLLAMA_BASE_URL.to_string(),
        };
        if config.provider != LlmProvider::Ollama && config.api_key.is_none() {
            return Err(AdvisorError::NotConfigured(format!(
                "provider {:?} requires an api key",
                config.provider
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| AdvisorError::NotConfigured(error.to_string()))?;

        Ok(Self {
            client,
            provider: config.provider,
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    fn api_key(&self) -> Result<&str, AdvisorError> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or_else(|| AdvisorError::NotConfigured("missing api key".to_string()))
    }

    async fn post(&self, request: reqwest::RequestBuilder) -> Result<Value, AdvisorError> {
        let response =
            request.send().await.map_err(|error| AdvisorError::Request(error.to_string()))?;
        if !response.status().is_success() {
            return Err(AdvisorError::Status(response.status().as_u16()));
        }
        response.json::<Value>().await.map_err(|error| AdvisorError::MalformedResponse(error.to_string()))
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, AdvisorError> {
        let payload = match self.provider {
            LlmProvider::OpenAi => {
                let request = self
                    .client
                    .post(format!("{}/chat/completions", self.base_url))
                    .bearer_auth(self.api_key()?)
                    .json(&json!({
                        "model": self.model,
                        "messages": [{ "role": "user", "content": prompt }],
                    }));
                self.post(request).await?
            }
            LlmProvider::Anthropic => {
                let request = self
                    .client
                    .post(format!("{}/messages", self.base_url))
                    .header("x-api-key", self.api_key()?)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&json!({
                        "model": self.model,
                        "max_tokens": MAX_COMPLETION_TOKENS,
                        "messages": [{ "role": "user", "content": prompt }],
                    }));
                self.post(request).await?
            }
            LlmProvider::Ollama => {
                let request = self.client.post(format!("{}/api/generate", self.base_url)).json(
                    &json!({ "model": self.model, "prompt": prompt, "stream": false }),
                );
                self.post(request).await?
            }
        };

        completion_text(self.provider, &payload).ok_or_else(|| {
            AdvisorError::MalformedResponse("completion text missing from response".to_string())
        })
    }
}

fn completion_text(provider: LlmProvider, payload: &Value) -> Option<String> {
    let text = match provider {
        LlmProvider::OpenAi => payload.pointer("/choices/0/message/content"),
        LlmProvider::Anthropic => payload.pointer("/content/0/text"),
        LlmProvider::Ollama => payload.get("response"),
    };
    text.and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use ecosim_core::config::{AdvisorConfig, LlmProvider};
    use serde_json::json;

    use super::{completion_text, AdvisorError, HttpLlmClient};

    fn config(provider: LlmProvider) -> AdvisorConfig {
        AdvisorConfig {
            enabled: true,
            provider,
            api_key: None,
            base_url: None,
            model: "test-model".to_string(),
            timeout_secs: 5,
            failure_threshold: 3,
            cooldown_secs: 60,
        }
    }

    #[test]
    fn completion_text_is_read_per_provider() {
        let openai = json!({ "choices": [{ "message": { "content": "[1]" } }] });
        let anthropic = json!({ "content": [{ "type": "text", "text": "[2]" }] });
        let ollama = json!({ "response": "[3]", "done": true });

        assert_eq!(completion_text(LlmProvider::OpenAi, &openai).as_deref(), Some("[1]"));
        assert_eq!(completion_text(LlmProvider::Anthropic, &anthropic).as_deref(), Some("[2]"));
        assert_eq!(completion_text(LlmProvider::Ollama, &ollama).as_deref(), Some("[3]"));
        assert_eq!(completion_text(LlmProvider::OpenAi, &ollama), None);
    }

    #[test]
    fn hosted_providers_require_an_api_key() {
        let error = HttpLlmClient::from_config(&config(LlmProvider::Anthropic))
            .err()
            .expect("missing key");
        assert!(matches!(error, AdvisorError::NotConfigured(_)));
    }

    #[test]
    fn ollama_defaults_to_local_endpoint() {
        let mut config = config(LlmProvider::Ollama);
        config.base_url = Some("http://127.0.0.1:11434/".to_string());

        let client = HttpLlmClient::from_config(&config).expect("client");
        assert_eq!(client.provider(), LlmProvider::Ollama);
        assert_eq!(client.base_url, "http://127.0.0.1:11434");
    }
}
