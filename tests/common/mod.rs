#![allow(dead_code)]

use async_trait::async_trait;
use content_console::ai::{AiClient, ChatMessage, ClientFactory, Completion};
use content_console::app::Services;
use content_console::config::Config;
use content_console::domain::{Agent, AiModel, Category, Provider};
use content_console::error::{ConsoleError, Result};
use content_console::storage::InMemoryStorage;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Answers prompts from a fixed list of replies, in order.
#[derive(Default)]
pub struct Script {
    replies: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl Script {
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(reply.into());
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl AiClient for Script {
    async fn complete(&self, prompt: &str, _history: &[ChatMessage]) -> Result<Completion> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let text = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ConsoleError::api("script exhausted"))?;
        Ok(Completion {
            text,
            input_tokens: 100,
            output_tokens: 50,
        })
    }

    fn provider(&self) -> Provider {
        Provider::Anthropic
    }
}

pub struct ScriptFactory(pub Arc<Script>);

impl ClientFactory for ScriptFactory {
    fn build(&self, _agent: &Agent, _model: &AiModel) -> Result<Arc<dyn AiClient>> {
        Ok(self.0.clone())
    }
}

pub fn test_config(require_login: bool) -> Config {
    let mut config = Config::default();
    config.jobs.research_section_delay_ms = 0;
    config.jobs.retry_delay_seconds = 0;
    config.jobs.max_attempts = 1;
    config.site.public_base_url = "https://example.org".into();
    config.auth.require_login = require_login;
    config
}

/// In-memory services over the built-in catalogue.
pub async fn seeded_services(script: Arc<Script>, require_login: bool) -> Services {
    let services = Services::new(
        test_config(require_login),
        Arc::new(InMemoryStorage::new()),
        Arc::new(ScriptFactory(script)),
    );
    services.seed().await.unwrap();
    services
}

pub async fn category_id(services: &Services, name: &str) -> i64 {
    services
        .content
        .list_categories(None)
        .await
        .unwrap()
        .into_iter()
        .find(|c: &Category| c.name == name)
        .map(|c| c.id)
        .unwrap()
}

pub const SUGGESTIONS_REPLY: &str = r#"{
  "suggestions": [
    {"title": "The Camino Real", "main_topic": "Overland silver route",
     "sub_topics": ["Mule trains"], "point_of_view": "Trade history"}
  ]
}"#;

/// Replies for research on a suggestion with one sub-topic: six sections.
pub fn research_replies() -> Vec<String> {
    [
        "# Abstract",
        "## Main Topic Development",
        "## Mule trains",
        "## Contemporary Relevance",
        "## Conclusion",
        "## Sources and Further Reading",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Outline with two sections, both sections, excerpt and summary.
pub fn article_replies() -> Vec<String> {
    vec![
        "# The Camino Real\n## Introduction\n## Mule trains\n[END_OUTLINE]".into(),
        "## Introduction\nSilver crossed the isthmus.".into(),
        "## Mule trains\nThey carried it on mules.".into(),
        "Silver on the move.".into(),
        "Colonial overland trade across Panama.".into(),
    ]
}
