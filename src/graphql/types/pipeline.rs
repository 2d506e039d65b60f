use super::media::{Media, MediaSuggestion};
use super::paginated;
use super::social::SocialMediaPost;
use super::taxonomy::{Category, Tag};
use crate::domain::{
    Article as ArticleRecord, ArticleLevel, ArticleSuggestion as SuggestionRecord, ContentStatus,
    Research as ResearchRecord, Tag as TagRecord,
};
use crate::graphql::schema::state;
use crate::workflow::Stage;
use async_graphql::{Context, FieldResult, Object, ResultExt};
use chrono::{DateTime, Utc};

/// An article idea in the editorial pipeline
#[derive(Clone)]
pub struct ArticleSuggestion {
    pub inner: SuggestionRecord,
}

impl From<SuggestionRecord> for ArticleSuggestion {
    fn from(suggestion: SuggestionRecord) -> Self {
        Self { inner: suggestion }
    }
}

#[Object]
impl ArticleSuggestion {
    async fn id(&self) -> i64 {
        self.inner.id
    }

    async fn category_id(&self) -> i64 {
        self.inner.category_id
    }

    async fn title(&self) -> &str {
        &self.inner.title
    }

    async fn main_topic(&self) -> &str {
        &self.inner.main_topic
    }

    async fn sub_topics(&self) -> &[String] {
        &self.inner.sub_topics
    }

    async fn point_of_view(&self) -> &str {
        &self.inner.point_of_view
    }

    async fn level(&self) -> ArticleLevel {
        self.inner.level
    }

    async fn status(&self) -> ContentStatus {
        self.inner.approval.status
    }

    async fn approved_by_id(&self) -> Option<i64> {
        self.inner.approval.approved_by_id
    }

    async fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.inner.approval.approved_at
    }

    async fn tokens_used(&self) -> Option<i64> {
        self.inner.generation.tokens_used
    }

    async fn model_id(&self) -> Option<i64> {
        self.inner.generation.model_id
    }

    async fn generation_started_at(&self) -> Option<DateTime<Utc>> {
        self.inner.generation.generation_started_at
    }

    /// Last failed generation attempt started from this suggestion
    async fn last_generation_error(&self) -> Option<&str> {
        self.inner.generation.last_generation_error.as_deref()
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.inner.updated_at
    }

    async fn category(&self, ctx: &Context<'_>) -> FieldResult<Option<Category>> {
        let context = state(ctx)?;
        let category = context
            .content
            .get_category(self.inner.category_id)
            .await
            .extend()?;
        Ok(category.map(Category::from))
    }

    /// Research written for this suggestion, if any
    async fn research(&self, ctx: &Context<'_>) -> FieldResult<Option<Research>> {
        let context = state(ctx)?;
        let research = context
            .content
            .research_for_suggestion(self.inner.id)
            .await
            .extend()?;
        Ok(research.into_iter().next().map(Research::from))
    }

    async fn stage(&self, ctx: &Context<'_>) -> FieldResult<Stage> {
        let context = state(ctx)?;
        context.content.suggestion_stage(self.inner.id).await.extend()
    }
}

#[derive(Clone)]
pub struct Research {
    pub inner: ResearchRecord,
}

impl From<ResearchRecord> for Research {
    fn from(research: ResearchRecord) -> Self {
        Self { inner: research }
    }
}

#[Object]
impl Research {
    async fn id(&self) -> i64 {
        self.inner.id
    }

    async fn suggestion_id(&self) -> i64 {
        self.inner.suggestion_id
    }

    async fn content(&self) -> &str {
        &self.inner.content
    }

    async fn status(&self) -> ContentStatus {
        self.inner.approval.status
    }

    async fn approved_by_id(&self) -> Option<i64> {
        self.inner.approval.approved_by_id
    }

    async fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.inner.approval.approved_at
    }

    async fn tokens_used(&self) -> Option<i64> {
        self.inner.generation.tokens_used
    }

    async fn last_generation_error(&self) -> Option<&str> {
        self.inner.generation.last_generation_error.as_deref()
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    async fn suggestion(&self, ctx: &Context<'_>) -> FieldResult<Option<ArticleSuggestion>> {
        let context = state(ctx)?;
        let suggestion = context
            .content
            .get_suggestion(self.inner.suggestion_id)
            .await
            .extend()?;
        Ok(suggestion.map(ArticleSuggestion::from))
    }

    async fn articles(&self, ctx: &Context<'_>) -> FieldResult<Vec<Article>> {
        let context = state(ctx)?;
        let articles = context
            .content
            .articles_for_research(self.inner.id)
            .await
            .extend()?;
        Ok(articles.into_iter().map(Article::from).collect())
    }

    async fn media_suggestions(&self, ctx: &Context<'_>) -> FieldResult<Vec<MediaSuggestion>> {
        let context = state(ctx)?;
        let suggestions = context
            .content
            .media_suggestions_for_research(self.inner.id)
            .await
            .extend()?;
        Ok(suggestions.into_iter().map(MediaSuggestion::from).collect())
    }
}

#[derive(Clone)]
pub struct Article {
    pub inner: ArticleRecord,
}

impl From<ArticleRecord> for Article {
    fn from(article: ArticleRecord) -> Self {
        Self { inner: article }
    }
}

#[Object]
impl Article {
    async fn id(&self) -> i64 {
        self.inner.id
    }

    async fn title(&self) -> &str {
        &self.inner.title
    }

    async fn content(&self) -> &str {
        &self.inner.content
    }

    async fn excerpt(&self) -> Option<&str> {
        self.inner.excerpt.as_deref()
    }

    async fn ai_summary(&self) -> Option<&str> {
        self.inner.ai_summary.as_deref()
    }

    async fn level(&self) -> ArticleLevel {
        self.inner.level
    }

    async fn status(&self) -> ContentStatus {
        self.inner.approval.status
    }

    async fn approved_by_id(&self) -> Option<i64> {
        self.inner.approval.approved_by_id
    }

    async fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.inner.approval.approved_at
    }

    async fn published_at(&self) -> Option<DateTime<Utc>> {
        self.inner.published_at
    }

    async fn tokens_used(&self) -> Option<i64> {
        self.inner.generation.tokens_used
    }

    async fn last_generation_error(&self) -> Option<&str> {
        self.inner.generation.last_generation_error.as_deref()
    }

    async fn word_count(&self) -> usize {
        self.inner.word_count()
    }

    async fn series_order(&self) -> Option<i32> {
        self.inner.series_order
    }

    /// Lead article of the series this one continues.
    async fn series_parent(&self, ctx: &Context<'_>) -> FieldResult<Option<Article>> {
        let Some(parent_id) = self.inner.series_parent_id else {
            return Ok(None);
        };
        let context = state(ctx)?;
        let parent = context.content.get_article(parent_id).await.extend()?;
        Ok(parent.map(Article::from))
    }

    /// Continuations in reading order; empty unless this is a lead article.
    async fn series_parts(&self, ctx: &Context<'_>) -> FieldResult<Vec<Article>> {
        let context = state(ctx)?;
        let parts = context
            .content
            .series_parts(self.inner.id)
            .await
            .extend()?;
        Ok(parts.into_iter().map(Article::from).collect())
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.inner.updated_at
    }

    async fn research(&self, ctx: &Context<'_>) -> FieldResult<Option<Research>> {
        let context = state(ctx)?;
        let research = context
            .content
            .get_research(self.inner.research_id)
            .await
            .extend()?;
        Ok(research.map(Research::from))
    }

    async fn category(&self, ctx: &Context<'_>) -> FieldResult<Option<Category>> {
        let context = state(ctx)?;
        let category = context
            .content
            .get_category(self.inner.category_id)
            .await
            .extend()?;
        Ok(category.map(Category::from))
    }

    async fn tags(&self, ctx: &Context<'_>) -> FieldResult<Vec<Tag>> {
        let context = state(ctx)?;
        let ids = &self.inner.tag_ids;
        let tags = context
            .content
            .repo()
            .find(|t: &TagRecord| ids.contains(&t.id))
            .await
            .extend()?;
        Ok(tags.into_iter().map(Tag::from).collect())
    }

    async fn feature_image(&self, ctx: &Context<'_>) -> FieldResult<Option<Media>> {
        let Some(media_id) = self.inner.feature_image_id else {
            return Ok(None);
        };
        let context = state(ctx)?;
        let media = context.content.get_media(media_id).await.extend()?;
        Ok(media.map(Media::from))
    }

    async fn social_media_posts(&self, ctx: &Context<'_>) -> FieldResult<Vec<SocialMediaPost>> {
        let context = state(ctx)?;
        let posts = context
            .content
            .list_social_posts(Some(self.inner.id), None)
            .await
            .extend()?;
        Ok(posts.into_iter().map(SocialMediaPost::from).collect())
    }

    /// Ranking score from status, category size, tags and cross references
    async fn relevance_score(&self, ctx: &Context<'_>) -> FieldResult<f64> {
        let context = state(ctx)?;
        context
            .content
            .article_relevance(&self.inner)
            .await
            .extend()
    }
}

paginated!(
    PaginatedArticleSuggestions,
    suggestions,
    ArticleSuggestion,
    SuggestionRecord
);
paginated!(PaginatedResearch, research, Research, ResearchRecord);
paginated!(PaginatedArticles, articles, Article, ArticleRecord);
