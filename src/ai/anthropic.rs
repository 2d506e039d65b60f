use super::{error_from_response, AiClient, ChatMessage, ClientSettings, Completion, RateLimiter};
use crate::domain::Provider;
use crate::error::{ConsoleError, Result};
use crate::metrics::AiMetrics;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Messages API client.
pub struct AnthropicClient {
    http: reqwest::Client,
    endpoint: String,
    version: String,
    api_key: String,
    settings: ClientSettings,
    limiter: RateLimiter,
}

impl AnthropicClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        version: &str,
        api_key: String,
        settings: ClientSettings,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            http,
            endpoint: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            version: version.to_string(),
            api_key,
            settings,
            limiter,
        }
    }

    fn body(&self, prompt: &str, history: &[ChatMessage]) -> Value {
        let mut messages: Vec<Value> = history
            .iter()
            .map(|m| json!({"role": m.role, "content": m.content}))
            .collect();
        messages.push(json!({"role": "user", "content": prompt}));
        json!({
            "model": self.settings.model,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
            "messages": messages,
        })
    }
}

pub(crate) fn parse_response(body: &Value) -> Result<Completion> {
    let text = body["content"][0]["text"]
        .as_str()
        .ok_or_else(|| ConsoleError::api("Anthropic response has no text content"))?;
    Ok(Completion {
        text: text.trim().to_string(),
        input_tokens: body["usage"]["input_tokens"].as_i64().unwrap_or(0),
        output_tokens: body["usage"]["output_tokens"].as_i64().unwrap_or(0),
    })
}

#[async_trait]
impl AiClient for AnthropicClient {
    #[instrument(skip_all, fields(provider = "anthropic", model = %self.settings.model))]
    async fn complete(&self, prompt: &str, history: &[ChatMessage]) -> Result<Completion> {
        let _permit = self.limiter.acquire().await;
        let started = Instant::now();

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.version)
            .header("content-type", "application/json")
            .json(&self.body(prompt, history))
            .send()
            .await
            .map_err(|e| {
                AiMetrics::record_error("anthropic");
                ConsoleError::from(e)
            })?;

        if !response.status().is_success() {
            AiMetrics::record_error("anthropic");
            let err = error_from_response("Anthropic", response).await;
            warn!("{}", err);
            return Err(err);
        }

        let body: Value = response.json().await?;
        let completion = parse_response(&body)?;
        AiMetrics::record_success(
            "anthropic",
            started.elapsed(),
            completion.input_tokens,
            completion.output_tokens,
        );
        debug!(
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            "completion received"
        );
        Ok(completion)
    }

    fn provider(&self) -> Provider {
        Provider::Anthropic
    }
}
