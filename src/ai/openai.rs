use super::{error_from_response, AiClient, ChatMessage, ClientSettings, Completion, RateLimiter};
use crate::domain::Provider;
use crate::error::{ConsoleError, Result};
use crate::metrics::AiMetrics;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, instrument, warn};

const SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Chat Completions client.
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    settings: ClientSettings,
    limiter: RateLimiter,
}

impl OpenAiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: String,
        settings: ClientSettings,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            http,
            endpoint: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            settings,
            limiter,
        }
    }

    fn body(&self, prompt: &str, history: &[ChatMessage]) -> Value {
        let mut messages = vec![json!({"role": "system", "content": SYSTEM_PROMPT})];
        messages.extend(
            history
                .iter()
                .map(|m| json!({"role": m.role, "content": m.content})),
        );
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
    let text = body["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| ConsoleError::api("OpenAI response has no message content"))?;
    Ok(Completion {
        text: text.trim().to_string(),
        input_tokens: body["usage"]["prompt_tokens"].as_i64().unwrap_or(0),
        output_tokens: body["usage"]["completion_tokens"].as_i64().unwrap_or(0),
    })
}

#[async_trait]
impl AiClient for OpenAiClient {
    #[instrument(skip_all, fields(provider = "openai", model = %self.settings.model))]
    async fn complete(&self, prompt: &str, history: &[ChatMessage]) -> Result<Completion> {
        let _permit = self.limiter.acquire().await;
        let started = Instant::now();

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.body(prompt, history))
            .send()
            .await
            .map_err(|e| {
                AiMetrics::record_error("openai");
                ConsoleError::from(e)
            })?;

        if !response.status().is_success() {
            AiMetrics::record_error("openai");
            let err = error_from_response("OpenAI", response).await;
            warn!("{}", err);
            return Err(err);
        }

        let body: Value = response.json().await?;
        let completion = parse_response(&body)?;
        AiMetrics::record_success(
            "openai",
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
        Provider::OpenAi
    }
}
