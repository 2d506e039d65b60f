//! AI agents that draft pipeline content.
//!
//! Each generation step resolves the active agent for its role, renders the
//! role's prompt template, talks to the provider through an [`AiClient`] and
//! stores the result as PENDING content through [`ContentService`].

pub mod editor;
pub mod media;
pub mod research;
pub mod social;
pub mod suggestions;
pub mod text;
pub mod translator;
pub mod writer;

use crate::ai::{prompts, AiClient, ChatMessage, ClientFactory, Completion};
use crate::content::ContentService;
use crate::domain::{Agent, AgentType, AiModel, Category, PromptTemplate, Taxonomy, Usage};
use crate::error::{ConsoleError, Result};
use crate::storage::Repository;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Knobs the agents read from configuration.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Pause between research sections.
    pub research_section_delay: Duration,
    /// Base URL articles are published under, for social posts.
    pub site_base_url: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            research_section_delay: Duration::from_secs(1),
            site_base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// An active agent bound to its model and provider client.
pub struct AgentRuntime {
    repo: Repository,
    pub agent: Agent,
    pub model: AiModel,
    client: Arc<dyn AiClient>,
}

impl AgentRuntime {
    /// First active agent of `agent_type`, with its model and client.
    pub async fn resolve(
        repo: &Repository,
        factory: &dyn ClientFactory,
        agent_type: AgentType,
    ) -> Result<Self> {
        let agent = repo
            .find_one(|a: &Agent| a.agent_type == agent_type && a.is_active)
            .await?
            .ok_or_else(|| {
                ConsoleError::Config(format!(
                    "No active agent found for type {}",
                    agent_type.as_str()
                ))
            })?;
        let model: AiModel = repo.require(agent.model_id).await?;
        let client = factory.build(&agent, &model)?;
        debug!(
            agent = %agent.name,
            model = %model.model_id,
            provider = client.provider().as_str(),
            "resolved agent"
        );
        Ok(Self {
            repo: repo.clone(),
            agent,
            model,
            client,
        })
    }

    /// The agent's stored override for `name`, else the built-in default.
    pub async fn template(&self, name: &str) -> Result<String> {
        let agent_id = self.agent.id;
        let custom = self
            .repo
            .find_one(|t: &PromptTemplate| t.agent_id == agent_id && t.name == name)
            .await?;
        match custom {
            Some(t) => Ok(t.template),
            None => prompts::builtin(name)
                .map(str::to_string)
                .ok_or_else(|| ConsoleError::Config(format!("Prompt template {name} not found"))),
        }
    }

    /// One completion, billed to the agent as a usage row.
    pub async fn complete(&self, prompt: &str, history: &[ChatMessage]) -> Result<Completion> {
        let completion = self.client.complete(prompt, history).await?;
        if completion.text.trim().is_empty() {
            return Err(ConsoleError::api("Empty response from AI provider"));
        }
        self.record_usage(&completion).await?;
        Ok(completion)
    }

    async fn record_usage(&self, completion: &Completion) -> Result<()> {
        let cost = self
            .model
            .cost(completion.input_tokens, completion.output_tokens);
        self.repo
            .create(Usage {
                id: 0,
                agent_id: self.agent.id,
                model_id: self.model.id,
                input_tokens: completion.input_tokens,
                output_tokens: completion.output_tokens,
                cost,
                created_at: Utc::now(),
            })
            .await?;
        info!(
            agent = %self.agent.name,
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            cost,
            "recorded usage"
        );
        Ok(())
    }
}

/// Entry point for every generation step.
#[derive(Clone)]
pub struct Generation {
    content: ContentService,
    factory: Arc<dyn ClientFactory>,
    options: GenerationOptions,
}

impl Generation {
    pub fn new(
        content: ContentService,
        factory: Arc<dyn ClientFactory>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            content,
            factory,
            options,
        }
    }

    pub fn content(&self) -> &ContentService {
        &self.content
    }

    pub(crate) async fn runtime(&self, agent_type: AgentType) -> Result<AgentRuntime> {
        AgentRuntime::resolve(self.content.repo(), self.factory.as_ref(), agent_type).await
    }

    /// Category and its taxonomy, as prompt context.
    pub(crate) async fn category_context(&self, category_id: i64) -> Result<(Taxonomy, Category)> {
        let repo = self.content.repo();
        let category: Category = repo.require(category_id).await?;
        let taxonomy: Taxonomy = repo.require(category.taxonomy_id).await?;
        Ok((taxonomy, category))
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::ai::testing::ScriptedClient;

    #[tokio::test]
    async fn completion_records_usage_with_model_cost() {
        let client = ScriptedClient::new(["hello"]);
        let gen = generation(client).await;
        let runtime = gen.runtime(AgentType::Writer).await.unwrap();
        let completion = runtime.complete("Hi", &[]).await.unwrap();
        assert_eq!(completion.text, "hello");

        let usage = gen.content().repo().list::<Usage>().await.unwrap();
        assert_eq!(usage.len(), 1);
        // 10 input at 3.00/M + 20 output at 15.00/M
        assert!((usage[0].cost - 0.00033).abs() < 1e-12);
    }

    #[tokio::test]
    async fn agent_override_wins_over_builtin() {
        let gen = generation(ScriptedClient::new(Vec::<String>::new())).await;
        let runtime = gen.runtime(AgentType::Writer).await.unwrap();
        let now = Utc::now();
        gen.content()
            .repo()
            .create(PromptTemplate {
                id: 0,
                agent_id: runtime.agent.id,
                name: prompts::ARTICLE_WRITING.into(),
                template: "Write {title}".into(),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        assert_eq!(
            runtime.template(prompts::ARTICLE_WRITING).await.unwrap(),
            "Write {title}"
        );
        assert!(runtime
            .template(prompts::RESEARCH)
            .await
            .unwrap()
            .contains("{sub_topics_list}"));
    }

    #[tokio::test]
    async fn missing_agent_is_reported_by_type() {
        let content = crate::content::fixtures::service();
        let gen = Generation::new(
            content,
            Arc::new(crate::ai::testing::ScriptedFactory(ScriptedClient::new(
                Vec::<String>::new(),
            ))),
            GenerationOptions::default(),
        );
        let err = gen.runtime(AgentType::Writer).await.err().unwrap();
        assert!(err.to_string().contains("No active agent found for type writer"));
    }

    #[tokio::test]
    async fn empty_reply_is_an_error() {
        let gen = generation(ScriptedClient::new(["   "])).await;
        let runtime = gen.runtime(AgentType::Researcher).await.unwrap();
        assert!(runtime.complete("Hi", &[]).await.is_err());
    }
}
