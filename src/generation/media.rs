use super::text::parse_reply;
use super::Generation;
use crate::ai::prompts::{self, render};
use crate::domain::{AgentType, ArticleSuggestion, GenerationMeta, MediaSuggestion, Research};
use crate::error::Result;
use crate::workflow::ensure_approved;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument};

#[derive(Debug, Deserialize)]
struct MediaReply {
    #[serde(default)]
    commons_categories: Vec<String>,
    #[serde(default)]
    search_queries: Vec<String>,
    #[serde(default)]
    illustration_topics: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

impl Generation {
    /// Ask the media manager where on Commons to look for illustrations.
    #[instrument(skip(self), fields(agent = "media_manager"))]
    pub async fn generate_media_suggestions(&self, research_id: i64) -> Result<MediaSuggestion> {
        let repo = self.content.repo();
        let research: Research = repo.require(research_id).await?;
        ensure_approved("Research", research.id, research.approval.status)?;
        let suggestion: ArticleSuggestion = repo.require(research.suggestion_id).await?;
        let (taxonomy, category) = self.category_context(suggestion.category_id).await?;
        let runtime = self.runtime(AgentType::MediaManager).await?;

        let template = runtime.template(prompts::MEDIA_SUGGESTIONS).await?;
        let prompt = render(
            &template,
            &[
                ("research_title", suggestion.title.clone()),
                ("taxonomy_name", taxonomy.name.clone()),
                ("taxonomy_description", taxonomy.description.clone()),
                ("category_name", category.name.clone()),
                ("category_description", category.description.clone()),
                ("research_content", research.content.clone()),
            ],
        );

        let started_at = Utc::now();
        let completion = runtime.complete(&prompt, &[]).await?;
        let reply: MediaReply = parse_reply(&completion.text)?;

        let suggestion = self
            .content
            .create_media_suggestion(
                research.id,
                reply.commons_categories,
                reply.search_queries,
                reply.illustration_topics,
                reply.reasoning,
                GenerationMeta::generated(runtime.model.id, completion.total_tokens(), started_at),
            )
            .await?;
        info!(
            "Generated media suggestion {} ({} categories, {} queries) for research {}",
            suggestion.id,
            suggestion.commons_categories.len(),
            suggestion.search_queries.len(),
            research.id
        );
        Ok(suggestion)
    }
}
