use super::list_params;
use crate::content::TranslationGap;
use crate::domain::{ContentStatus, MediaType, TranslatableKind};
use crate::graphql::schema::{state, RequestLanguage, Viewer};
use crate::graphql::types::{
    Article, ArticleSuggestion, Category, HashtagGroup, Job, Media, MediaCandidate,
    MediaSuggestion, PaginatedArticleSuggestions, PaginatedArticles, PaginatedResearch,
    PaginatedTags, Research, SocialMediaAccount, SocialMediaPost, Tag, Taxonomy, Translation,
    Language, User,
};
use crate::workflow::PipelineStats;
use async_graphql::{Context, FieldResult, Object, ResultExt, ID};
use uuid::Uuid;

const DEFAULT_JOB_LIMIT: i64 = 20;

/// Root query object for GraphQL
pub struct Query;

#[Object]
impl Query {
    /// All taxonomies in id order
    async fn taxonomies(&self, ctx: &Context<'_>) -> FieldResult<Vec<Taxonomy>> {
        let context = state(ctx)?;
        let taxonomies = context.content.list_taxonomies().await.extend()?;
        Ok(taxonomies.into_iter().map(Taxonomy::from).collect())
    }

    async fn taxonomy(&self, ctx: &Context<'_>, id: i64) -> FieldResult<Option<Taxonomy>> {
        let context = state(ctx)?;
        let taxonomy = context.content.get_taxonomy(id).await.extend()?;
        Ok(taxonomy.map(Taxonomy::from))
    }

    /// Categories, optionally limited to one taxonomy
    async fn categories(
        &self,
        ctx: &Context<'_>,
        taxonomy_id: Option<i64>,
    ) -> FieldResult<Vec<Category>> {
        let context = state(ctx)?;
        let categories = context.content.list_categories(taxonomy_id).await.extend()?;
        Ok(categories.into_iter().map(Category::from).collect())
    }

    async fn category(&self, ctx: &Context<'_>, id: i64) -> FieldResult<Option<Category>> {
        let context = state(ctx)?;
        let category = context.content.get_category(id).await.extend()?;
        Ok(category.map(Category::from))
    }

    /// Paginated tags
    #[allow(clippy::too_many_arguments)]
    async fn tags(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 1)] page: i64,
        #[graphql(default = 10)] page_size: i64,
        status: Option<ContentStatus>,
        search: Option<String>,
        #[graphql(default_with = "String::from(\"name\")")] sort: String,
        #[graphql(default_with = "String::from(\"asc\")")] dir: String,
    ) -> FieldResult<PaginatedTags> {
        let context = state(ctx)?;
        let params = list_params(page, page_size, status, search, sort, dir);
        let page = context.content.list_tags(&params).await.extend()?;
        Ok(page.into())
    }

    /// Every tag in name order
    async fn all_tags(
        &self,
        ctx: &Context<'_>,
        status: Option<ContentStatus>,
    ) -> FieldResult<Vec<Tag>> {
        let context = state(ctx)?;
        let tags = context.content.all_tags(status).await.extend()?;
        Ok(tags.into_iter().map(Tag::from).collect())
    }

    async fn tag(&self, ctx: &Context<'_>, id: i64) -> FieldResult<Option<Tag>> {
        let context = state(ctx)?;
        let tag = context.content.get_tag(id).await.extend()?;
        Ok(tag.map(Tag::from))
    }

    /// Paginated article suggestions, newest first by default
    #[allow(clippy::too_many_arguments)]
    async fn article_suggestions(
        &self,
        ctx: &Context<'_>,
        status: Option<ContentStatus>,
        #[graphql(default = 1)] page: i64,
        #[graphql(default = 10)] page_size: i64,
        search: Option<String>,
        #[graphql(default_with = "String::from(\"created_at\")")] sort: String,
        #[graphql(default_with = "String::from(\"desc\")")] dir: String,
    ) -> FieldResult<PaginatedArticleSuggestions> {
        let context = state(ctx)?;
        let params = list_params(page, page_size, status, search, sort, dir);
        let page = context.content.list_suggestions(&params).await.extend()?;
        Ok(page.into())
    }

    async fn article_suggestion(
        &self,
        ctx: &Context<'_>,
        id: i64,
    ) -> FieldResult<Option<ArticleSuggestion>> {
        let context = state(ctx)?;
        let suggestion = context.content.get_suggestion(id).await.extend()?;
        Ok(suggestion.map(ArticleSuggestion::from))
    }

    /// Paginated research, searching content and suggestion titles
    #[allow(clippy::too_many_arguments)]
    async fn research(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 1)] page: i64,
        #[graphql(default = 10)] page_size: i64,
        status: Option<ContentStatus>,
        search: Option<String>,
        #[graphql(default_with = "String::from(\"suggestion.title\")")] sort: String,
        #[graphql(default_with = "String::from(\"asc\")")] dir: String,
    ) -> FieldResult<PaginatedResearch> {
        let context = state(ctx)?;
        let params = list_params(page, page_size, status, search, sort, dir);
        let page = context.content.list_research(&params).await.extend()?;
        Ok(page.into())
    }

    async fn research_item(&self, ctx: &Context<'_>, id: i64) -> FieldResult<Option<Research>> {
        let context = state(ctx)?;
        let research = context.content.get_research(id).await.extend()?;
        Ok(research.map(Research::from))
    }

    /// Paginated articles
    #[allow(clippy::too_many_arguments)]
    async fn articles(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 1)] page: i64,
        #[graphql(default = 10)] page_size: i64,
        status: Option<ContentStatus>,
        search: Option<String>,
        #[graphql(default_with = "String::from(\"title\")")] sort: String,
        #[graphql(default_with = "String::from(\"asc\")")] dir: String,
    ) -> FieldResult<PaginatedArticles> {
        let context = state(ctx)?;
        let params = list_params(page, page_size, status, search, sort, dir);
        let page = context.content.list_articles(&params).await.extend()?;
        Ok(page.into())
    }

    async fn article(&self, ctx: &Context<'_>, id: i64) -> FieldResult<Option<Article>> {
        let context = state(ctx)?;
        let article = context.content.get_article(id).await.extend()?;
        Ok(article.map(Article::from))
    }

    async fn media_suggestions(&self, ctx: &Context<'_>) -> FieldResult<Vec<MediaSuggestion>> {
        let context = state(ctx)?;
        let suggestions = context.content.list_media_suggestions().await.extend()?;
        Ok(suggestions.into_iter().map(MediaSuggestion::from).collect())
    }

    async fn media_suggestion(
        &self,
        ctx: &Context<'_>,
        id: i64,
    ) -> FieldResult<Option<MediaSuggestion>> {
        let context = state(ctx)?;
        let suggestion = context.content.get_media_suggestion(id).await.extend()?;
        Ok(suggestion.map(MediaSuggestion::from))
    }

    /// Candidates newest first, optionally by review status
    async fn media_candidates(
        &self,
        ctx: &Context<'_>,
        status: Option<ContentStatus>,
    ) -> FieldResult<Vec<MediaCandidate>> {
        let context = state(ctx)?;
        let candidates = context.content.list_candidates(status).await.extend()?;
        Ok(candidates.into_iter().map(MediaCandidate::from).collect())
    }

    async fn media_library(
        &self,
        ctx: &Context<'_>,
        media_type: Option<MediaType>,
    ) -> FieldResult<Vec<Media>> {
        let context = state(ctx)?;
        let media = context.content.list_media(media_type).await.extend()?;
        Ok(media.into_iter().map(Media::from).collect())
    }

    async fn media(&self, ctx: &Context<'_>, id: i64) -> FieldResult<Option<Media>> {
        let context = state(ctx)?;
        let media = context.content.get_media(id).await.extend()?;
        Ok(media.map(Media::from))
    }

    async fn social_media_posts(
        &self,
        ctx: &Context<'_>,
        article_id: Option<i64>,
        status: Option<ContentStatus>,
    ) -> FieldResult<Vec<SocialMediaPost>> {
        let context = state(ctx)?;
        let posts = context
            .content
            .list_social_posts(article_id, status)
            .await
            .extend()?;
        Ok(posts.into_iter().map(SocialMediaPost::from).collect())
    }

    async fn hashtag_groups(&self, ctx: &Context<'_>) -> FieldResult<Vec<HashtagGroup>> {
        let context = state(ctx)?;
        let groups = context.content.list_hashtag_groups().await.extend()?;
        Ok(groups.into_iter().map(HashtagGroup::from).collect())
    }

    async fn social_media_accounts(
        &self,
        ctx: &Context<'_>,
    ) -> FieldResult<Vec<SocialMediaAccount>> {
        let context = state(ctx)?;
        let accounts = context.content.list_accounts().await.extend()?;
        Ok(accounts.into_iter().map(SocialMediaAccount::from).collect())
    }

    /// A background job by id
    async fn job(&self, ctx: &Context<'_>, id: ID) -> FieldResult<Option<Job>> {
        let context = state(ctx)?;
        let job_id = Uuid::parse_str(&id)?;
        Ok(context.queue.get(job_id).await.map(Job::from))
    }

    /// Most recently enqueued jobs first
    async fn jobs(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 20)] limit: i64,
    ) -> FieldResult<Vec<Job>> {
        let context = state(ctx)?;
        let limit = if limit < 1 { DEFAULT_JOB_LIMIT } else { limit };
        let records = context.queue.recent(limit as usize).await;
        Ok(records.into_iter().map(Job::from).collect())
    }

    /// Status counts across the pipeline
    async fn pipeline_stats(&self, ctx: &Context<'_>) -> FieldResult<PipelineStats> {
        let context = state(ctx)?;
        context.content.pipeline_stats().await.extend()
    }

    /// Approved languages, optionally only the active ones
    async fn languages(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] active_only: bool,
    ) -> FieldResult<Vec<Language>> {
        let context = state(ctx)?;
        let languages = context.content.list_languages(active_only).await.extend()?;
        Ok(languages.into_iter().map(Language::from).collect())
    }

    /// Language picked for this request from `Accept-Language`
    async fn request_language(&self, ctx: &Context<'_>) -> Option<String> {
        ctx.data_opt::<RequestLanguage>().map(|l| l.0.clone())
    }

    /// Stored translations of one record
    async fn translations(
        &self,
        ctx: &Context<'_>,
        kind: TranslatableKind,
        entity_id: i64,
        language: Option<String>,
    ) -> FieldResult<Vec<Translation>> {
        let context = state(ctx)?;
        let translations = context
            .content
            .translations_for(kind, entity_id, language.as_deref())
            .await
            .extend()?;
        Ok(translations.into_iter().map(Translation::from).collect())
    }

    /// A field in `language` (the request language when omitted), falling
    /// back to the untranslated text
    async fn translated_text(
        &self,
        ctx: &Context<'_>,
        kind: TranslatableKind,
        entity_id: i64,
        field: String,
        language: Option<String>,
    ) -> FieldResult<Option<String>> {
        let context = state(ctx)?;
        let language = match language {
            Some(code) => code,
            None => match ctx.data_opt::<RequestLanguage>() {
                Some(requested) => requested.0.clone(),
                None => context.content.negotiate_language(None).await,
            },
        };
        context
            .content
            .translated_text(kind, entity_id, &field, &language)
            .await
            .extend()
    }

    /// Records ready for translation that still lack some fields
    async fn missing_translations(
        &self,
        ctx: &Context<'_>,
        kind: Option<TranslatableKind>,
        language: Option<String>,
    ) -> FieldResult<Vec<TranslationGap>> {
        let context = state(ctx)?;
        context
            .content
            .missing_translations(kind, language.as_deref())
            .await
            .extend()
    }

    /// The logged-in user, if any
    async fn me(&self, ctx: &Context<'_>) -> Option<User> {
        ctx.data_opt::<Viewer>()
            .and_then(|v| v.user.clone())
            .map(User::from)
    }
}
