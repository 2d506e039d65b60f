use super::query::{cmp_ci, contains_ci, ListParams, Page, SortDirection};
use super::{required, ContentService};
use crate::domain::{
    Approval, Article, ArticleLevel, ArticleSuggestion, Category, ContentStatus, GenerationMeta,
    Media, MediaCandidate, MediaSuggestion, Research, SocialMediaPost, Tag,
};
use crate::error::{ConsoleError, Result};
use crate::workflow::{ensure_approved, PipelineStats, Stage, StatusCounts};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::info;

#[derive(Debug, Clone, async_graphql::InputObject)]
pub struct ArticleSuggestionInput {
    pub title: String,
    pub main_topic: String,
    pub sub_topics: Vec<String>,
    pub point_of_view: String,
}

#[derive(Debug, Clone, async_graphql::InputObject)]
pub struct ArticleInput {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub ai_summary: Option<String>,
    #[graphql(default)]
    pub tag_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct NewSuggestion {
    pub category_id: i64,
    pub title: String,
    pub main_topic: String,
    pub sub_topics: Vec<String>,
    pub point_of_view: String,
    pub level: ArticleLevel,
    pub model_id: Option<i64>,
    pub tokens_used: Option<i64>,
    pub generation_started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewResearch {
    pub suggestion_id: i64,
    pub content: String,
    pub generation: GenerationMeta,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub research_id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub ai_summary: Option<String>,
    pub generation: GenerationMeta,
}

fn sort_by_created(a: &DateTime<Utc>, b: &DateTime<Utc>, a_id: i64, b_id: i64) -> std::cmp::Ordering {
    a.cmp(b).then(a_id.cmp(&b_id))
}

impl ContentService {
    // Suggestions

    pub async fn create_suggestion(&self, new: NewSuggestion) -> Result<ArticleSuggestion> {
        self.repo.require::<Category>(new.category_id).await?;
        let title = required("title", &new.title)?;
        let now = Utc::now();
        let suggestion = self
            .repo
            .create(ArticleSuggestion {
                id: 0,
                category_id: new.category_id,
                title,
                main_topic: new.main_topic,
                sub_topics: new.sub_topics,
                point_of_view: new.point_of_view,
                level: new.level,
                approval: Approval::default(),
                generation: GenerationMeta {
                    tokens_used: new.tokens_used,
                    model_id: new.model_id,
                    generation_started_at: new.generation_started_at,
                    last_generation_error: None,
                },
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!("Created suggestion {} ({})", suggestion.title, suggestion.id);
        Ok(suggestion)
    }

    pub async fn list_suggestions(
        &self,
        params: &ListParams<ContentStatus>,
    ) -> Result<Page<ArticleSuggestion>> {
        let needle = params.needle();
        let mut items = self
            .repo
            .find(|s: &ArticleSuggestion| {
                params.status.map_or(true, |st| s.approval.status == st)
                    && needle.as_deref().map_or(true, |n| contains_ci(&s.title, n))
            })
            .await?;

        let dir = params.dir_or(SortDirection::Desc);
        match params.sort_key() {
            Some("title") => {
                items.sort_by(|a, b| dir.apply(cmp_ci(&a.title, &b.title).then(a.id.cmp(&b.id))))
            }
            _ => items.sort_by(|a, b| {
                dir.apply(sort_by_created(&a.created_at, &b.created_at, a.id, b.id))
            }),
        }
        Ok(Page::paginate(items, params.page(), params.page_size()))
    }

    pub async fn get_suggestion(&self, id: i64) -> Result<Option<ArticleSuggestion>> {
        self.repo.get(id).await
    }

    pub async fn update_suggestion(
        &self,
        id: i64,
        input: ArticleSuggestionInput,
    ) -> Result<ArticleSuggestion> {
        let mut suggestion: ArticleSuggestion = self.repo.require(id).await?;
        suggestion.title = required("title", &input.title)?;
        suggestion.main_topic = input.main_topic;
        suggestion.sub_topics = input.sub_topics;
        suggestion.point_of_view = input.point_of_view;
        suggestion.updated_at = Utc::now();
        self.repo.update(&suggestion).await?;
        Ok(suggestion)
    }

    pub async fn update_suggestion_status(
        &self,
        id: i64,
        status: ContentStatus,
        actor: Option<i64>,
    ) -> Result<ArticleSuggestion> {
        let mut suggestion: ArticleSuggestion = self.repo.require(id).await?;
        let now = Utc::now();
        suggestion.approval.transition(status, actor, now);
        suggestion.updated_at = now;
        self.repo.update(&suggestion).await?;
        Ok(suggestion)
    }

    pub async fn delete_suggestion(&self, id: i64) -> Result<bool> {
        self.repo.require::<ArticleSuggestion>(id).await?;
        if !self.research_for_suggestion(id).await?.is_empty() {
            return Err(ConsoleError::Conflict(format!(
                "Suggestion {id} already has research"
            )));
        }
        self.repo.delete::<ArticleSuggestion>(id).await
    }

    /// Approved suggestions that have no research yet, oldest first.
    pub async fn suggestions_awaiting_research(&self) -> Result<Vec<ArticleSuggestion>> {
        let researched: Vec<i64> = self
            .repo
            .list::<Research>()
            .await?
            .into_iter()
            .map(|r| r.suggestion_id)
            .collect();
        self.repo
            .find(|s: &ArticleSuggestion| {
                s.approval.is_approved() && !researched.contains(&s.id)
            })
            .await
    }

    /// How far a suggestion has travelled down the pipeline.
    pub async fn suggestion_stage(&self, id: i64) -> Result<Stage> {
        self.repo.require::<ArticleSuggestion>(id).await?;
        let research_ids: Vec<i64> = self
            .research_for_suggestion(id)
            .await?
            .iter()
            .map(|r| r.id)
            .collect();
        if research_ids.is_empty() {
            return Ok(Stage::Suggestion);
        }
        let articles = self
            .repo
            .find(|a: &Article| research_ids.contains(&a.research_id))
            .await?;
        Ok(if articles.iter().any(|a| a.published_at.is_some()) {
            Stage::Published
        } else if articles.is_empty() {
            Stage::Research
        } else {
            Stage::Article
        })
    }

    pub async fn record_suggestion_error(&self, id: i64, error: &str) -> Result<()> {
        let mut suggestion: ArticleSuggestion = self.repo.require(id).await?;
        suggestion.generation.last_generation_error = Some(error.to_string());
        self.repo.update(&suggestion).await
    }

    // Research

    pub async fn create_research(&self, new: NewResearch) -> Result<Research> {
        self.repo.require::<ArticleSuggestion>(new.suggestion_id).await?;
        let now = Utc::now();
        let research = self
            .repo
            .create(Research {
                id: 0,
                suggestion_id: new.suggestion_id,
                content: new.content,
                approval: Approval::default(),
                generation: new.generation,
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!(
            "Created research {} for suggestion {}",
            research.id, research.suggestion_id
        );
        Ok(research)
    }

    pub async fn research_for_suggestion(&self, suggestion_id: i64) -> Result<Vec<Research>> {
        self.repo
            .find(|r: &Research| r.suggestion_id == suggestion_id)
            .await
    }

    pub async fn list_research(&self, params: &ListParams<ContentStatus>) -> Result<Page<Research>> {
        let titles: HashMap<i64, String> = self
            .repo
            .list::<ArticleSuggestion>()
            .await?
            .into_iter()
            .map(|s| (s.id, s.title))
            .collect();
        let title_of = |r: &Research| titles.get(&r.suggestion_id).cloned().unwrap_or_default();

        let needle = params.needle();
        let mut items = self
            .repo
            .find(|r: &Research| {
                params.status.map_or(true, |st| r.approval.status == st)
                    && needle.as_deref().map_or(true, |n| {
                        contains_ci(&r.content, n) || contains_ci(&title_of(r), n)
                    })
            })
            .await?;

        let dir = params.dir_or(SortDirection::Asc);
        match params.sort_key() {
            Some("created_at") => items.sort_by(|a, b| {
                dir.apply(sort_by_created(&a.created_at, &b.created_at, a.id, b.id))
            }),
            _ => items.sort_by(|a, b| {
                dir.apply(cmp_ci(&title_of(a), &title_of(b)).then(a.id.cmp(&b.id)))
            }),
        }
        Ok(Page::paginate(items, params.page(), params.page_size()))
    }

    pub async fn get_research(&self, id: i64) -> Result<Option<Research>> {
        self.repo.get(id).await
    }

    pub async fn update_research(&self, id: i64, content: String) -> Result<Research> {
        let mut research: Research = self.repo.require(id).await?;
        research.content = content;
        research.updated_at = Utc::now();
        self.repo.update(&research).await?;
        Ok(research)
    }

    pub async fn update_research_status(
        &self,
        id: i64,
        status: ContentStatus,
        actor: Option<i64>,
    ) -> Result<Research> {
        let mut research: Research = self.repo.require(id).await?;
        let now = Utc::now();
        research.approval.transition(status, actor, now);
        research.updated_at = now;
        self.repo.update(&research).await?;
        Ok(research)
    }

    pub async fn record_research_error(&self, id: i64, error: &str) -> Result<()> {
        let mut research: Research = self.repo.require(id).await?;
        research.generation.last_generation_error = Some(error.to_string());
        self.repo.update(&research).await
    }

    // Articles

    /// Create a PENDING article from approved research. Category and level
    /// come from the research's suggestion.
    pub async fn create_article(&self, new: NewArticle) -> Result<Article> {
        let research: Research = self.repo.require(new.research_id).await?;
        ensure_approved("Research", research.id, research.approval.status)?;
        let suggestion: ArticleSuggestion = self.repo.require(research.suggestion_id).await?;
        let now = Utc::now();
        let article = self
            .repo
            .create(Article {
                id: 0,
                research_id: research.id,
                category_id: suggestion.category_id,
                title: required("title", &new.title)?,
                content: new.content,
                excerpt: new.excerpt,
                ai_summary: new.ai_summary,
                feature_image_id: None,
                level: suggestion.level,
                tag_ids: Vec::new(),
                related_article_ids: Vec::new(),
                approval: Approval::default(),
                published_at: None,
                generation: new.generation,
                series_parent_id: None,
                series_order: None,
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!("Created article {} ({})", article.title, article.id);
        Ok(article)
    }

    /// Make `id` part `order` of the series led by `parent_id`.
    pub async fn set_series_position(&self, id: i64, parent_id: i64, order: i32) -> Result<Article> {
        if id == parent_id {
            return Err(ConsoleError::Validation(
                "An article cannot continue itself".into(),
            ));
        }
        if order < 2 {
            return Err(ConsoleError::Validation(
                "Series continuations start at part 2".into(),
            ));
        }
        let parent: Article = self.repo.require(parent_id).await?;
        if parent.series_parent_id.is_some() {
            return Err(ConsoleError::Validation(format!(
                "Article {parent_id} is itself a continuation"
            )));
        }
        let mut article: Article = self.repo.require(id).await?;
        article.series_parent_id = Some(parent_id);
        article.series_order = Some(order);
        article.updated_at = Utc::now();
        self.repo.update(&article).await?;
        Ok(article)
    }

    /// Continuations of a lead article in reading order.
    pub async fn series_parts(&self, parent_id: i64) -> Result<Vec<Article>> {
        let mut parts = self
            .repo
            .find(|a: &Article| a.series_parent_id == Some(parent_id))
            .await?;
        parts.sort_by_key(|a| (a.series_order, a.id));
        Ok(parts)
    }

    pub async fn set_article_content(&self, id: i64, content: String) -> Result<Article> {
        let mut article: Article = self.repo.require(id).await?;
        article.content = content;
        article.updated_at = Utc::now();
        self.repo.update(&article).await?;
        Ok(article)
    }

    pub async fn list_articles(&self, params: &ListParams<ContentStatus>) -> Result<Page<Article>> {
        let needle = params.needle();
        let mut items = self
            .repo
            .find(|a: &Article| {
                params.status.map_or(true, |st| a.approval.status == st)
                    && needle
                        .as_deref()
                        .map_or(true, |n| contains_ci(&a.title, n) || contains_ci(&a.content, n))
            })
            .await?;

        let dir = params.dir_or(SortDirection::Asc);
        match params.sort_key() {
            Some("created_at") => items.sort_by(|a, b| {
                dir.apply(sort_by_created(&a.created_at, &b.created_at, a.id, b.id))
            }),
            Some("published_at") => items.sort_by(|a, b| {
                dir.apply(a.published_at.cmp(&b.published_at).then(a.id.cmp(&b.id)))
            }),
            _ => items.sort_by(|a, b| dir.apply(cmp_ci(&a.title, &b.title).then(a.id.cmp(&b.id)))),
        }
        Ok(Page::paginate(items, params.page(), params.page_size()))
    }

    pub async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        self.repo.get(id).await
    }

    pub async fn articles_for_research(&self, research_id: i64) -> Result<Vec<Article>> {
        self.repo
            .find(|a: &Article| a.research_id == research_id)
            .await
    }

    pub async fn articles_in_category(&self, category_id: i64) -> Result<Vec<Article>> {
        self.repo
            .find(|a: &Article| a.category_id == category_id)
            .await
    }

    pub async fn update_article(&self, id: i64, input: ArticleInput) -> Result<Article> {
        let mut article: Article = self.repo.require(id).await?;
        let mut seen = HashSet::new();
        let mut tag_ids = input.tag_ids;
        tag_ids.retain(|id| seen.insert(*id));
        for tag_id in &tag_ids {
            if self.repo.get::<Tag>(*tag_id).await?.is_none() {
                return Err(ConsoleError::Validation(format!("Tag {tag_id} does not exist")));
            }
        }
        article.title = required("title", &input.title)?;
        article.content = input.content;
        article.excerpt = input.excerpt;
        article.ai_summary = input.ai_summary;
        article.tag_ids = tag_ids;
        article.updated_at = Utc::now();
        self.repo.update(&article).await?;
        Ok(article)
    }

    pub async fn update_article_status(
        &self,
        id: i64,
        status: ContentStatus,
        actor: Option<i64>,
    ) -> Result<Article> {
        let mut article: Article = self.repo.require(id).await?;
        let now = Utc::now();
        article.approval.transition(status, actor, now);
        article.updated_at = now;
        self.repo.update(&article).await?;
        Ok(article)
    }

    pub async fn publish_article(&self, id: i64) -> Result<Article> {
        let mut article: Article = self.repo.require(id).await?;
        ensure_approved("Article", id, article.approval.status)?;
        let now = Utc::now();
        article.published_at = Some(now);
        article.updated_at = now;
        self.repo.update(&article).await?;
        info!("Published article {}", id);
        Ok(article)
    }

    pub async fn set_article_feature_image(
        &self,
        id: i64,
        media_id: Option<i64>,
    ) -> Result<Article> {
        let mut article: Article = self.repo.require(id).await?;
        if let Some(media_id) = media_id {
            self.repo.require::<Media>(media_id).await?;
        }
        article.feature_image_id = media_id;
        article.updated_at = Utc::now();
        self.repo.update(&article).await?;
        Ok(article)
    }

    pub async fn record_article_error(&self, id: i64, error: &str) -> Result<()> {
        let mut article: Article = self.repo.require(id).await?;
        article.generation.last_generation_error = Some(error.to_string());
        self.repo.update(&article).await
    }

    pub async fn article_relevance(&self, article: &Article) -> Result<f64> {
        let category_size = self
            .repo
            .count(|a: &Article| a.category_id == article.category_id)
            .await?;
        let approved_tags = self
            .repo
            .count(|t: &Tag| article.tag_ids.contains(&t.id) && t.approval.is_approved())
            .await?;
        let referenced_by = self
            .repo
            .count(|a: &Article| a.id != article.id && a.related_article_ids.contains(&article.id))
            .await?;
        Ok(article.relevance_score(category_size, approved_tags, referenced_by))
    }

    pub async fn pipeline_stats(&self) -> Result<PipelineStats> {
        let suggestions = self.repo.list::<ArticleSuggestion>().await?;
        let research = self.repo.list::<Research>().await?;
        let articles = self.repo.list::<Article>().await?;
        let tags = self.repo.list::<Tag>().await?;
        let posts = self.repo.list::<SocialMediaPost>().await?;
        let candidates = self.repo.list::<MediaCandidate>().await?;

        Ok(PipelineStats {
            suggestions: StatusCounts::tally(suggestions.iter().map(|s| s.approval.status)),
            research: StatusCounts::tally(research.iter().map(|r| r.approval.status)),
            articles: StatusCounts::tally(articles.iter().map(|a| a.approval.status)),
            published_articles: articles.iter().filter(|a| a.published_at.is_some()).count(),
            tags: StatusCounts::tally(tags.iter().map(|t| t.approval.status)),
            social_posts: StatusCounts::tally(posts.iter().map(|p| p.approval.status)),
            media_candidates: StatusCounts::tally(candidates.iter().map(|c| c.status)),
        })
    }

    pub async fn media_suggestions_for_research(
        &self,
        research_id: i64,
    ) -> Result<Vec<MediaSuggestion>> {
        self.repo
            .find(|m: &MediaSuggestion| m.research_id == research_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::content::TagInput;

    async fn approved_research(service: &ContentService) -> Research {
        let category_id = fixtures::category(service).await;
        let suggestion = service
            .create_suggestion(fixtures::new_suggestion(category_id, "The Canal"))
            .await
            .unwrap();
        let research = service
            .create_research(NewResearch {
                suggestion_id: suggestion.id,
                content: "# Abstract".into(),
                generation: GenerationMeta::default(),
            })
            .await
            .unwrap();
        service
            .update_research_status(research.id, ContentStatus::Approved, Some(1))
            .await
            .unwrap()
    }

    fn new_article(research_id: i64) -> NewArticle {
        NewArticle {
            research_id,
            title: "The Canal".into(),
            content: "Body".into(),
            excerpt: None,
            ai_summary: None,
            generation: GenerationMeta::default(),
        }
    }

    #[tokio::test]
    async fn suggestions_default_to_newest_first_and_sort_by_title() {
        let service = fixtures::service();
        let category_id = fixtures::category(&service).await;
        for title in ["Bravo", "Alpha", "Charlie"] {
            service
                .create_suggestion(fixtures::new_suggestion(category_id, title))
                .await
                .unwrap();
        }

        let newest = service.list_suggestions(&ListParams::default()).await.unwrap();
        assert_eq!(newest.items[0].title, "Charlie");

        let by_title = service
            .list_suggestions(&ListParams {
                sort: Some("title".into()),
                dir: Some(SortDirection::Asc),
                ..ListParams::default()
            })
            .await
            .unwrap();
        let titles: Vec<_> = by_title.items.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Bravo", "Charlie"]);
    }

    #[tokio::test]
    async fn stage_follows_the_furthest_artifact() {
        let service = fixtures::service();
        let research = approved_research(&service).await;
        let suggestion_id = research.suggestion_id;
        assert_eq!(service.suggestion_stage(suggestion_id).await.unwrap(), Stage::Research);

        let article = service.create_article(new_article(research.id)).await.unwrap();
        assert_eq!(service.suggestion_stage(suggestion_id).await.unwrap(), Stage::Article);

        service
            .update_article_status(article.id, ContentStatus::Approved, Some(1))
            .await
            .unwrap();
        service.publish_article(article.id).await.unwrap();
        assert_eq!(service.suggestion_stage(suggestion_id).await.unwrap(), Stage::Published);
    }

    #[tokio::test]
    async fn suggestion_with_research_cannot_be_deleted() {
        let service = fixtures::service();
        let research = approved_research(&service).await;
        let err = service.delete_suggestion(research.suggestion_id).await;
        assert!(matches!(err, Err(ConsoleError::Conflict(_))));
    }

    #[tokio::test]
    async fn article_requires_approved_research_and_inherits_suggestion_fields() {
        let service = fixtures::service();
        let research = approved_research(&service).await;

        let article = service.create_article(new_article(research.id)).await.unwrap();
        assert_eq!(article.level, ArticleLevel::General);
        assert_eq!(article.approval.status, ContentStatus::Pending);

        service
            .update_research_status(research.id, ContentStatus::Rejected, Some(1))
            .await
            .unwrap();
        let err = service.create_article(new_article(research.id)).await;
        assert!(matches!(err, Err(ConsoleError::Validation(_))));
    }

    #[tokio::test]
    async fn continuations_attach_to_a_lead_article() {
        let service = fixtures::service();
        let research = approved_research(&service).await;
        let lead = service.create_article(new_article(research.id)).await.unwrap();
        let third = service.create_article(new_article(research.id)).await.unwrap();
        let second = service.create_article(new_article(research.id)).await.unwrap();

        service.set_series_position(third.id, lead.id, 3).await.unwrap();
        service.set_series_position(second.id, lead.id, 2).await.unwrap();
        let parts: Vec<_> = service
            .series_parts(lead.id)
            .await
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(parts, vec![second.id, third.id]);

        let self_loop = service.set_series_position(lead.id, lead.id, 2).await;
        assert!(matches!(self_loop, Err(ConsoleError::Validation(_))));
        let nested = service.set_series_position(lead.id, second.id, 2).await;
        assert!(matches!(nested, Err(ConsoleError::Validation(_))));
        let missing = service.set_series_position(lead.id, 99, 2).await;
        assert!(matches!(missing, Err(ConsoleError::NotFound { .. })));
    }

    #[tokio::test]
    async fn publishing_needs_approval_and_tags_must_exist() {
        let service = fixtures::service();
        let research = approved_research(&service).await;
        let article = service.create_article(new_article(research.id)).await.unwrap();

        assert!(service.publish_article(article.id).await.is_err());

        let bad_tags = service
            .update_article(
                article.id,
                ArticleInput {
                    title: "The Canal".into(),
                    content: "Body".into(),
                    excerpt: None,
                    ai_summary: None,
                    tag_ids: vec![42],
                },
            )
            .await;
        assert!(matches!(bad_tags, Err(ConsoleError::Validation(_))));

        let tag = service.create_tag(TagInput { name: "Canal".into() }).await.unwrap();
        let updated = service
            .update_article(
                article.id,
                ArticleInput {
                    title: "The Canal Zone".into(),
                    content: "Body".into(),
                    excerpt: Some("Short".into()),
                    ai_summary: None,
                    tag_ids: vec![tag.id],
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.tag_ids, vec![tag.id]);

        service
            .update_article_status(article.id, ContentStatus::Approved, Some(2))
            .await
            .unwrap();
        let published = service.publish_article(article.id).await.unwrap();
        assert!(published.published_at.is_some());

        let stats = service.pipeline_stats().await.unwrap();
        assert_eq!(stats.articles.approved, 1);
        assert_eq!(stats.published_articles, 1);
        assert_eq!(stats.research.approved, 1);
    }

    #[tokio::test]
    async fn awaiting_research_skips_researched_suggestions() {
        let service = fixtures::service();
        let research = approved_research(&service).await;
        service
            .update_suggestion_status(research.suggestion_id, ContentStatus::Approved, Some(1))
            .await
            .unwrap();
        let category_id = fixtures::category_id_of(&service, research.suggestion_id).await;
        let fresh = service
            .create_suggestion(fixtures::new_suggestion(category_id, "Fresh"))
            .await
            .unwrap();
        service
            .update_suggestion_status(fresh.id, ContentStatus::Approved, Some(1))
            .await
            .unwrap();

        let waiting = service.suggestions_awaiting_research().await.unwrap();
        assert_eq!(waiting.iter().map(|s| s.id).collect::<Vec<_>>(), vec![fresh.id]);
    }
}
