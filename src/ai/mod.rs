//! Clients for the AI providers the agents run on.

pub mod anthropic;
pub mod openai;
pub mod prompts;
pub mod rate_limiter;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;
pub use rate_limiter::RateLimiter;

use crate::config::AiConfig;
use crate::domain::{Agent, AiModel, Provider};
use crate::error::{ConsoleError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Text and billed tokens of one completion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Completion {
    pub text: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
}

impl Completion {
    pub fn total_tokens(&self) -> i64 {
        self.input_tokens + self.output_tokens
    }
}

/// Sampling settings taken from the agent record.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl ClientSettings {
    pub fn for_agent(agent: &Agent, model: &AiModel) -> Self {
        Self {
            model: model.model_id.clone(),
            temperature: agent.temperature,
            max_tokens: agent.max_tokens,
        }
    }
}

#[async_trait]
pub trait AiClient: Send + Sync {
    /// Send `prompt` as the final user turn after `history`.
    async fn complete(&self, prompt: &str, history: &[ChatMessage]) -> Result<Completion>;

    fn provider(&self) -> Provider;
}

/// Builds the client an agent talks through.
pub trait ClientFactory: Send + Sync {
    fn build(&self, agent: &Agent, model: &AiModel) -> Result<Arc<dyn AiClient>>;
}

/// Factory for the real HTTP clients. Rate limits are shared per provider
/// across every client it builds.
pub struct HttpClientFactory {
    http: reqwest::Client,
    config: AiConfig,
    anthropic_limiter: RateLimiter,
    openai_limiter: RateLimiter,
}

impl HttpClientFactory {
    pub fn new(config: AiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        let limiter = || RateLimiter::per_minute(config.requests_per_minute, config.concurrency);
        Ok(Self {
            http,
            anthropic_limiter: limiter(),
            openai_limiter: limiter(),
            config,
        })
    }
}

impl ClientFactory for HttpClientFactory {
    fn build(&self, agent: &Agent, model: &AiModel) -> Result<Arc<dyn AiClient>> {
        let settings = ClientSettings::for_agent(agent, model);
        match model.provider {
            Provider::Anthropic => {
                let key = self.config.anthropic_api_key.clone().ok_or_else(|| {
                    ConsoleError::Config("ANTHROPIC_API_KEY is not configured".into())
                })?;
                Ok(Arc::new(AnthropicClient::new(
                    self.http.clone(),
                    &self.config.anthropic_base_url,
                    &self.config.anthropic_version,
                    key,
                    settings,
                    self.anthropic_limiter.clone(),
                )))
            }
            Provider::OpenAi => {
                let key = self.config.openai_api_key.clone().ok_or_else(|| {
                    ConsoleError::Config("OPENAI_API_KEY is not configured".into())
                })?;
                Ok(Arc::new(OpenAiClient::new(
                    self.http.clone(),
                    &self.config.openai_base_url,
                    key,
                    settings,
                    self.openai_limiter.clone(),
                )))
            }
        }
    }
}

/// Error for a non-success provider response, keeping the body for diagnosis.
pub(crate) async fn error_from_response(provider: &str, response: reqwest::Response) -> ConsoleError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ConsoleError::api(format!("{provider} API returned {status}: {body}"))
}

#[cfg(test)]
pub mod testing {
    //! Scripted clients for exercising agents without a provider.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replies with queued responses in order and records every prompt.
    #[derive(Default)]
    pub struct ScriptedClient {
        replies: Mutex<VecDeque<Result<String>>>,
        pub prompts: Mutex<Vec<(String, Vec<ChatMessage>)>>,
    }

    impl ScriptedClient {
        pub fn new<I, S>(replies: I) -> Arc<Self>
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub fn push(&self, reply: impl Into<String>) {
            self.replies.lock().unwrap().push_back(Ok(reply.into()));
        }

        pub fn push_error(&self, error: ConsoleError) {
            self.replies.lock().unwrap().push_back(Err(error));
        }

        pub fn prompt_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AiClient for ScriptedClient {
        async fn complete(&self, prompt: &str, history: &[ChatMessage]) -> Result<Completion> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), history.to_vec()));
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ConsoleError::api("script exhausted")))?;
            Ok(Completion {
                text: reply.trim().to_string(),
                input_tokens: 10,
                output_tokens: 20,
            })
        }

        fn provider(&self) -> Provider {
            Provider::Anthropic
        }
    }

    /// Hands the same scripted client to every agent.
    pub struct ScriptedFactory(pub Arc<ScriptedClient>);

    impl ClientFactory for ScriptedFactory {
        fn build(&self, _agent: &Agent, _model: &AiModel) -> Result<Arc<dyn AiClient>> {
            Ok(self.0.clone())
        }
    }
}
