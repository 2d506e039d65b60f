use super::editor::{about_section, continue_reading_section, SERIES_WORD_THRESHOLD};
use super::text::{clean_excerpt, clean_summary, cut_outline, outline_sections, sources_section, word_count};
use super::{AgentRuntime, Generation};
use crate::ai::prompts::{self, render, SUMMARY_PROMPT};
use crate::ai::{ChatMessage, Completion};
use crate::content::NewArticle;
use crate::domain::{AgentType, Article, ArticleSuggestion, GenerationMeta, Research};
use crate::error::{ConsoleError, Result};
use crate::workflow::ensure_approved;
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

async fn request_sources_cleanup(runtime: &AgentRuntime, raw: &str) -> Result<Completion> {
    let template = runtime.template(prompts::SOURCES_CLEANUP).await?;
    let prompt = render(&template, &[("sources", raw.to_string())]);
    runtime.complete(&prompt, &[]).await
}

/// A finished draft waiting to be stored.
struct Draft<'a> {
    research: &'a Research,
    suggestion: &'a ArticleSuggestion,
    body: String,
    sources: Option<String>,
    tokens: i64,
    started_at: DateTime<Utc>,
}

impl Generation {
    /// Turn approved research into PENDING articles. The writer outlines
    /// first, then writes the outline section by section. Drafts over
    /// [`SERIES_WORD_THRESHOLD`] words become a linked series; the lead
    /// article comes first.
    #[instrument(skip(self), fields(agent = "writer"))]
    pub async fn generate_article(&self, research_id: i64) -> Result<Vec<Article>> {
        let repo = self.content.repo();
        let research: Research = repo.require(research_id).await?;
        ensure_approved("Research", research.id, research.approval.status)?;
        let suggestion: ArticleSuggestion = repo.require(research.suggestion_id).await?;
        let (taxonomy, category) = self.category_context(suggestion.category_id).await?;
        let runtime = self.runtime(AgentType::Writer).await?;
        let specs = suggestion.level.specs();

        let template = runtime.template(prompts::ARTICLE_WRITING).await?;
        let prompt = render(
            &template,
            &[
                ("taxonomy", taxonomy.name.clone()),
                ("taxonomy_description", taxonomy.description.clone()),
                ("category", category.name.clone()),
                ("category_description", category.description.clone()),
                ("title", suggestion.title.clone()),
                ("level", suggestion.level.key().to_string()),
                ("level_description", specs.description.to_string()),
                ("min_words", specs.min_words.to_string()),
                ("max_words", specs.max_words.to_string()),
                ("research_content", research.content.clone()),
            ],
        );

        let started_at = Utc::now();
        let outline_reply = runtime.complete(&prompt, &[]).await?;
        let mut tokens = outline_reply.total_tokens();
        let outline = cut_outline(&outline_reply.text);
        let sections = outline_sections(&outline);
        if sections.is_empty() {
            return Err(ConsoleError::api("Outline contained no ## sections"));
        }

        let mut history = vec![ChatMessage::user(prompt), ChatMessage::assistant(outline)];
        let mut written = Vec::with_capacity(sections.len());
        for section in &sections {
            let prompt = prompts::section_continuation(&section.title, &section.subsections);
            let reply = runtime.complete(&prompt, &history).await?;
            tokens += reply.total_tokens();
            history.push(ChatMessage::user(prompt));
            history.push(ChatMessage::assistant(reply.text.as_str()));
            written.push(reply.text);
        }

        let sources = match sources_section(&research.content) {
            Some(raw) => {
                let (cleaned, used) = self.clean_sources(&runtime, raw).await;
                tokens += used;
                Some(cleaned)
            }
            None => None,
        };

        let draft = Draft {
            research: &research,
            suggestion: &suggestion,
            body: written.join("\n\n"),
            sources,
            tokens,
            started_at,
        };
        let words = word_count(&draft.body);
        let articles = if words > SERIES_WORD_THRESHOLD {
            info!("Draft has {} words, splitting into a series", words);
            self.store_series(&runtime, draft).await?
        } else {
            vec![self.store_single(&runtime, draft).await?]
        };
        info!(
            "Generated {} article(s) ({} words) from research {}",
            articles.len(),
            words,
            research.id
        );
        Ok(articles)
    }

    /// The cleaned sources and the tokens spent. Falls back to the raw
    /// section when the cleanup call fails.
    async fn clean_sources(&self, runtime: &AgentRuntime, raw: String) -> (String, i64) {
        match request_sources_cleanup(runtime, &raw).await {
            Ok(reply) => (reply.text.trim().to_string(), reply.total_tokens()),
            Err(e) => {
                warn!("Sources cleanup failed, keeping them as written: {}", e);
                (raw, 0)
            }
        }
    }

    async fn store_single(&self, runtime: &AgentRuntime, draft: Draft<'_>) -> Result<Article> {
        let excerpt_prompt = prompts::excerpt_prompt(&draft.body);
        let excerpt = runtime.complete(&excerpt_prompt, &[]).await?;
        let excerpt_text = clean_excerpt(&excerpt.text);
        let history = [
            ChatMessage::user(excerpt_prompt),
            ChatMessage::assistant(excerpt_text.as_str()),
        ];
        let summary = runtime.complete(SUMMARY_PROMPT, &history).await?;
        let tokens = draft.tokens + excerpt.total_tokens() + summary.total_tokens();

        let mut content = draft.body;
        if let Some(sources) = &draft.sources {
            content.push_str(&format!("\n\n## Sources\n{sources}"));
        }
        self.content
            .create_article(NewArticle {
                research_id: draft.research.id,
                title: draft.suggestion.title.clone(),
                content,
                excerpt: Some(excerpt_text),
                ai_summary: Some(clean_summary(&summary.text)),
                generation: GenerationMeta::generated(runtime.model.id, tokens, draft.started_at),
            })
            .await
    }

    async fn store_series(&self, runtime: &AgentRuntime, draft: Draft<'_>) -> Result<Vec<Article>> {
        let series_title = draft.suggestion.title.as_str();
        let series = self
            .split_into_series(series_title, &draft.body, draft.sources.as_deref())
            .await?;
        let per_part = (draft.tokens + series.tokens) / series.parts.len() as i64;

        let mut parts = Vec::with_capacity(series.parts.len());
        for part in series.parts {
            let article = self
                .content
                .create_article(NewArticle {
                    research_id: draft.research.id,
                    title: part.title,
                    content: part.content,
                    excerpt: Some(part.excerpt),
                    ai_summary: Some(part.ai_summary),
                    generation: GenerationMeta::generated(runtime.model.id, per_part, draft.started_at),
                })
                .await?;
            parts.push(article);
        }

        let lead_id = parts[0].id;
        for (i, part) in parts.iter_mut().enumerate().skip(1) {
            *part = self
                .content
                .set_series_position(part.id, lead_id, i as i32 + 1)
                .await?;
        }

        let base_url = &self.options.site_base_url;
        let mut linked = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            let mut content = format!(
                "{}\n\n{}",
                about_section(series_title, &parts, i, base_url),
                part.content
            );
            if let Some(next) = continue_reading_section(&parts, i, base_url) {
                content.push_str("\n\n");
                content.push_str(&next);
            }
            linked.push(self.content.set_article_content(part.id, content).await?);
        }
        Ok(linked)
    }
}
