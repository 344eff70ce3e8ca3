use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use ordercopilot_core::config::{LlmConfig, LlmProvider};

use crate::intent::pattern_payload;
use crate::prompts::message_from_user_prompt;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Structured-completion capability used by the intent extractor. Any error is
/// recoverable: the caller falls back to the deterministic parser.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Value>;
}

/// Deterministic keyword parser behind the completion seam.
#[derive(Clone, Debug, Default)]
pub struct PatternCompletionService;

#[async_trait]
impl CompletionService for PatternCompletionService {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<Value> {
        let payload = pattern_payload(message_from_user_prompt(user_prompt));
        Ok(serde_json::to_value(payload)?)
    }
}

#[derive(Clone, Debug)]
pub struct HttpCompletionConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub timeout: Duration,
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint that supports JSON
/// response format.
#[derive(Debug)]
pub struct HttpCompletionService {
    client: Client,
    config: HttpCompletionConfig,
}

impl HttpCompletionService {
    pub fn new(config: HttpCompletionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to create completion HTTP client")?;

        Ok(Self { client, config })
    }

    fn request_body(&self, system_prompt: &str, user_prompt: &str) -> Value {
        json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.1,
        })
    }
}

#[async_trait]
impl CompletionService for HttpCompletionService {
    #[instrument(skip(self, system_prompt, user_prompt), fields(model = %self.config.model))]
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Value> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&self.request_body(system_prompt, user_prompt));
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        debug!(event_name = "completion.request", url = %url, "sending completion request");
        let response = request.send().await.context("completion request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            bail!("completion API error {status}: {error_text}");
        }

        let response_json: Value =
            response.json().await.context("failed to decode completion response")?;
        extract_message_json(&response_json)
    }
}

/// Pulls `choices[0].message.content` and parses it as a JSON object.
fn extract_message_json(response: &Value) -> Result<Value> {
    let content = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("completion response has no message content"))?;

    let value: Value =
        serde_json::from_str(content).context("completion content is not valid JSON")?;
    if !value.is_object() {
        bail!("completion content is not a JSON object");
    }
    Ok(value)
}

/// Picks the completion implementation for the configured provider.
pub fn completion_service_from_config(llm: &LlmConfig) -> Result<Arc<dyn CompletionService>> {
    let timeout = Duration::from_secs(llm.timeout_secs);
    let service: Arc<dyn CompletionService> = match llm.provider {
        LlmProvider::Disabled => Arc::new(PatternCompletionService),
        LlmProvider::OpenAi => Arc::new(HttpCompletionService::new(HttpCompletionConfig {
            base_url: llm.base_url.clone().unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            api_key: llm.api_key.clone(),
            model: llm.model.clone(),
            timeout,
        })?),
        LlmProvider::Ollama => {
            let base_url = llm
                .base_url
                .clone()
                .ok_or_else(|| anyhow!("llm.base_url is required for the ollama provider"))?;
            let base_url = base_url.trim_end_matches('/').to_string();
            let base_url =
                if base_url.ends_with("/v1") { base_url } else { format!("{base_url}/v1") };
            Arc::new(HttpCompletionService::new(HttpCompletionConfig {
                base_url,
                api_key: None,
                model: llm.model.clone(),
                timeout,
            })?)
        }
    };
    Ok(service)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract_message_json, CompletionService, PatternCompletionService};
    use crate::prompts::{render_user_prompt, SYSTEM_PROMPT};

    #[test]
    fn message_content_is_parsed_as_json_object() {
        let response = json!({
            "choices": [{ "message": { "content": "{\"intent_type\": \"price_check\"}" } }]
        });
        let value = extract_message_json(&response).expect("valid content");
        assert_eq!(value["intent_type"], "price_check");
    }

    #[test]
    fn malformed_responses_are_errors() {
        assert!(extract_message_json(&json!({ "choices": [] })).is_err());
        assert!(extract_message_json(&json!({
            "choices": [{ "message": { "content": "not json" } }]
        }))
        .is_err());
        assert!(extract_message_json(&json!({
            "choices": [{ "message": { "content": "[1, 2]" } }]
        }))
        .is_err());
    }

    #[tokio::test]
    async fn pattern_service_answers_in_the_completion_shape() {
        let value = PatternCompletionService
            .complete(SYSTEM_PROMPT, &render_user_prompt("how much for 3 makita drills"))
            .await
            .expect("pattern service never fails");

        assert_eq!(value["intent_type"], "price_check");
        assert_eq!(value["products"][0]["quantity"], 3);
        assert_eq!(value["products"][0]["brand"], "Makita");
        assert_eq!(value["confidence_score"], 0.5);
    }
}
