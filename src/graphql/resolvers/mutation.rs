use crate::content::{
    ArticleInput, ArticleSuggestionInput, CategoryInput, HashtagGroupInput, LanguageInput,
    MediaMetadataInput, SocialPostInput, TagInput, TaxonomyInput,
};
use crate::domain::{ArticleLevel, ContentStatus, TranslatableKind};
use crate::graphql::schema::{editor, state};
use crate::graphql::types::{
    Article, ArticleSuggestion, Category, HashtagGroup, JobEnqueueResponse, Language, Media,
    MediaCandidate, Research, SocialMediaPost, Tag, Taxonomy, Translation,
};
use crate::jobs::{check_preconditions, Job};
use async_graphql::{Context, FieldResult, Object, ResultExt};
use tracing::warn;

const DEFAULT_MAX_PER_QUERY: i64 = 20;

/// Validate the job against current content, then queue it. Precondition
/// failures are field errors; a refused enqueue is reported in the response.
async fn enqueue(ctx: &Context<'_>, job: Job) -> FieldResult<JobEnqueueResponse> {
    let context = state(ctx)?;
    check_preconditions(&context.content, &job).await.extend()?;
    match context.queue.enqueue(job).await {
        Ok(enqueued) => Ok(JobEnqueueResponse::queued(enqueued)),
        Err(e) => {
            warn!("Failed to enqueue job: {}", e);
            Ok(JobEnqueueResponse::failed(&e))
        }
    }
}

/// Negative counts collapse to zero so range checks reject them.
fn count_arg(count: i64) -> u32 {
    u32::try_from(count).unwrap_or(0)
}

/// Root mutation object for GraphQL
pub struct Mutation;

#[Object]
impl Mutation {
    // Taxonomies and categories

    async fn create_taxonomy(&self, ctx: &Context<'_>, input: TaxonomyInput) -> FieldResult<Taxonomy> {
        editor(ctx)?;
        let context = state(ctx)?;
        let taxonomy = context.content.create_taxonomy(input).await.extend()?;
        Ok(taxonomy.into())
    }

    async fn update_taxonomy(
        &self,
        ctx: &Context<'_>,
        id: i64,
        input: TaxonomyInput,
    ) -> FieldResult<Taxonomy> {
        editor(ctx)?;
        let context = state(ctx)?;
        let taxonomy = context.content.update_taxonomy(id, input).await.extend()?;
        Ok(taxonomy.into())
    }

    async fn delete_taxonomy(&self, ctx: &Context<'_>, id: i64) -> FieldResult<bool> {
        editor(ctx)?;
        let context = state(ctx)?;
        context.content.delete_taxonomy(id).await.extend()
    }

    async fn create_category(&self, ctx: &Context<'_>, input: CategoryInput) -> FieldResult<Category> {
        editor(ctx)?;
        let context = state(ctx)?;
        let category = context.content.create_category(input).await.extend()?;
        Ok(category.into())
    }

    async fn update_category(
        &self,
        ctx: &Context<'_>,
        id: i64,
        input: CategoryInput,
    ) -> FieldResult<Category> {
        editor(ctx)?;
        let context = state(ctx)?;
        let category = context.content.update_category(id, input).await.extend()?;
        Ok(category.into())
    }

    async fn delete_category(&self, ctx: &Context<'_>, id: i64) -> FieldResult<bool> {
        editor(ctx)?;
        let context = state(ctx)?;
        context.content.delete_category(id).await.extend()
    }

    // Tags

    async fn create_tag(&self, ctx: &Context<'_>, input: TagInput) -> FieldResult<Tag> {
        editor(ctx)?;
        let context = state(ctx)?;
        let tag = context.content.create_tag(input).await.extend()?;
        Ok(tag.into())
    }

    async fn update_tag(&self, ctx: &Context<'_>, id: i64, input: TagInput) -> FieldResult<Tag> {
        editor(ctx)?;
        let context = state(ctx)?;
        let tag = context.content.update_tag(id, input).await.extend()?;
        Ok(tag.into())
    }

    async fn update_tag_status(
        &self,
        ctx: &Context<'_>,
        id: i64,
        status: ContentStatus,
    ) -> FieldResult<Tag> {
        let actor = editor(ctx)?;
        let context = state(ctx)?;
        let tag = context
            .content
            .update_tag_status(id, status, actor)
            .await
            .extend()?;
        Ok(tag.into())
    }

    // Suggestions

    /// Queue generation of new suggestions for a category
    async fn generate_suggestions(
        &self,
        ctx: &Context<'_>,
        category_id: i64,
        count: i64,
        #[graphql(default_with = "ArticleLevel::General")] level: ArticleLevel,
    ) -> FieldResult<JobEnqueueResponse> {
        editor(ctx)?;
        enqueue(
            ctx,
            Job::GenerateSuggestions {
                category_id,
                level,
                count: count_arg(count),
            },
        )
        .await
    }

    async fn update_suggestion(
        &self,
        ctx: &Context<'_>,
        id: i64,
        input: ArticleSuggestionInput,
    ) -> FieldResult<ArticleSuggestion> {
        editor(ctx)?;
        let context = state(ctx)?;
        let suggestion = context.content.update_suggestion(id, input).await.extend()?;
        Ok(suggestion.into())
    }

    async fn update_suggestion_status(
        &self,
        ctx: &Context<'_>,
        id: i64,
        status: ContentStatus,
    ) -> FieldResult<ArticleSuggestion> {
        let actor = editor(ctx)?;
        let context = state(ctx)?;
        let suggestion = context
            .content
            .update_suggestion_status(id, status, actor)
            .await
            .extend()?;
        Ok(suggestion.into())
    }

    async fn delete_suggestion(&self, ctx: &Context<'_>, id: i64) -> FieldResult<bool> {
        editor(ctx)?;
        let context = state(ctx)?;
        context.content.delete_suggestion(id).await.extend()
    }

    /// Queue research and article generation for every approved suggestion
    /// that has no research yet
    async fn bulk_generate_articles(&self, ctx: &Context<'_>) -> FieldResult<JobEnqueueResponse> {
        editor(ctx)?;
        enqueue(ctx, Job::BulkGeneration).await
    }

    // Research

    async fn generate_research(
        &self,
        ctx: &Context<'_>,
        suggestion_id: i64,
    ) -> FieldResult<JobEnqueueResponse> {
        editor(ctx)?;
        enqueue(ctx, Job::GenerateResearch { suggestion_id }).await
    }

    async fn update_research(
        &self,
        ctx: &Context<'_>,
        id: i64,
        content: String,
    ) -> FieldResult<Research> {
        editor(ctx)?;
        let context = state(ctx)?;
        let research = context.content.update_research(id, content).await.extend()?;
        Ok(research.into())
    }

    async fn update_research_status(
        &self,
        ctx: &Context<'_>,
        id: i64,
        status: ContentStatus,
    ) -> FieldResult<Research> {
        let actor = editor(ctx)?;
        let context = state(ctx)?;
        let research = context
            .content
            .update_research_status(id, status, actor)
            .await
            .extend()?;
        Ok(research.into())
    }

    // Articles

    async fn generate_article(
        &self,
        ctx: &Context<'_>,
        research_id: i64,
    ) -> FieldResult<JobEnqueueResponse> {
        editor(ctx)?;
        enqueue(ctx, Job::GenerateArticle { research_id }).await
    }

    async fn generate_media_suggestions(
        &self,
        ctx: &Context<'_>,
        research_id: i64,
    ) -> FieldResult<JobEnqueueResponse> {
        editor(ctx)?;
        enqueue(ctx, Job::GenerateMediaSuggestions { research_id }).await
    }

    async fn update_article(
        &self,
        ctx: &Context<'_>,
        id: i64,
        input: ArticleInput,
    ) -> FieldResult<Article> {
        editor(ctx)?;
        let context = state(ctx)?;
        let article = context.content.update_article(id, input).await.extend()?;
        Ok(article.into())
    }

    async fn update_article_status(
        &self,
        ctx: &Context<'_>,
        id: i64,
        status: ContentStatus,
    ) -> FieldResult<Article> {
        let actor = editor(ctx)?;
        let context = state(ctx)?;
        let article = context
            .content
            .update_article_status(id, status, actor)
            .await
            .extend()?;
        Ok(article.into())
    }

    /// Stamp an approved article as published
    async fn publish_article(&self, ctx: &Context<'_>, id: i64) -> FieldResult<Article> {
        editor(ctx)?;
        let context = state(ctx)?;
        let article = context.content.publish_article(id).await.extend()?;
        Ok(article.into())
    }

    /// Set or clear (with a null media id) the feature image
    async fn set_article_feature_image(
        &self,
        ctx: &Context<'_>,
        id: i64,
        media_id: Option<i64>,
    ) -> FieldResult<Article> {
        editor(ctx)?;
        let context = state(ctx)?;
        let article = context
            .content
            .set_article_feature_image(id, media_id)
            .await
            .extend()?;
        Ok(article.into())
    }

    // Social

    async fn generate_story_promotion(
        &self,
        ctx: &Context<'_>,
        article_id: i64,
    ) -> FieldResult<JobEnqueueResponse> {
        editor(ctx)?;
        enqueue(ctx, Job::GenerateStoryPromotion { article_id }).await
    }

    /// Queue 1 to 10 fact posts for an approved article
    async fn generate_did_you_know_posts(
        &self,
        ctx: &Context<'_>,
        article_id: i64,
        #[graphql(default = 3)] count: i64,
    ) -> FieldResult<JobEnqueueResponse> {
        editor(ctx)?;
        enqueue(
            ctx,
            Job::GenerateDidYouKnowPosts {
                article_id,
                count: count_arg(count),
            },
        )
        .await
    }

    async fn update_social_media_post(
        &self,
        ctx: &Context<'_>,
        id: i64,
        input: SocialPostInput,
    ) -> FieldResult<SocialMediaPost> {
        editor(ctx)?;
        let context = state(ctx)?;
        let post = context.content.update_social_post(id, input).await.extend()?;
        Ok(post.into())
    }

    async fn update_social_media_post_status(
        &self,
        ctx: &Context<'_>,
        id: i64,
        status: ContentStatus,
    ) -> FieldResult<SocialMediaPost> {
        let actor = editor(ctx)?;
        let context = state(ctx)?;
        let post = context
            .content
            .update_social_post_status(id, status, actor)
            .await
            .extend()?;
        Ok(post.into())
    }

    async fn create_hashtag_group(
        &self,
        ctx: &Context<'_>,
        input: HashtagGroupInput,
    ) -> FieldResult<HashtagGroup> {
        editor(ctx)?;
        let context = state(ctx)?;
        let group = context.content.create_hashtag_group(input).await.extend()?;
        Ok(group.into())
    }

    // Media

    /// Queue a Wikimedia Commons search for a media suggestion
    async fn fetch_media_candidates(
        &self,
        ctx: &Context<'_>,
        suggestion_id: i64,
        #[graphql(default = 20)] max_per_query: i64,
    ) -> FieldResult<JobEnqueueResponse> {
        editor(ctx)?;
        let max_per_query = if max_per_query < 1 {
            DEFAULT_MAX_PER_QUERY
        } else {
            max_per_query
        };
        enqueue(
            ctx,
            Job::FetchMediaCandidates {
                suggestion_id,
                max_per_query: max_per_query as usize,
            },
        )
        .await
    }

    async fn update_candidate_status(
        &self,
        ctx: &Context<'_>,
        id: i64,
        status: ContentStatus,
        notes: Option<String>,
    ) -> FieldResult<MediaCandidate> {
        let actor = editor(ctx)?;
        let context = state(ctx)?;
        let candidate = context
            .content
            .update_candidate_status(id, status, notes, actor)
            .await
            .extend()?;
        Ok(candidate.into())
    }

    /// Approve a candidate and import it into the media library
    async fn approve_candidate_and_create_media(
        &self,
        ctx: &Context<'_>,
        id: i64,
        notes: Option<String>,
    ) -> FieldResult<MediaCandidate> {
        let actor = editor(ctx)?;
        let context = state(ctx)?;
        let candidate = context
            .content
            .approve_candidate_and_create_media(id, notes, actor)
            .await
            .extend()?;
        Ok(candidate.into())
    }

    async fn update_media_metadata(
        &self,
        ctx: &Context<'_>,
        id: i64,
        input: MediaMetadataInput,
    ) -> FieldResult<Media> {
        editor(ctx)?;
        let context = state(ctx)?;
        let media = context.content.update_media_metadata(id, input).await.extend()?;
        Ok(media.into())
    }

    // Languages and translations

    async fn create_language(&self, ctx: &Context<'_>, input: LanguageInput) -> FieldResult<Language> {
        editor(ctx)?;
        let context = state(ctx)?;
        let language = context.content.create_language(input).await.extend()?;
        Ok(language.into())
    }

    async fn set_default_language(&self, ctx: &Context<'_>, code: String) -> FieldResult<Language> {
        editor(ctx)?;
        let context = state(ctx)?;
        let language = context.content.set_default_language(&code).await.extend()?;
        Ok(language.into())
    }

    async fn set_language_active(
        &self,
        ctx: &Context<'_>,
        code: String,
        active: bool,
    ) -> FieldResult<Language> {
        editor(ctx)?;
        let context = state(ctx)?;
        let language = context
            .content
            .set_language_active(&code, active)
            .await
            .extend()?;
        Ok(language.into())
    }

    /// Queue translation of a record; all translatable fields when `fields`
    /// is empty
    async fn translate_entity(
        &self,
        ctx: &Context<'_>,
        kind: TranslatableKind,
        entity_id: i64,
        language: String,
        #[graphql(default)] fields: Vec<String>,
    ) -> FieldResult<JobEnqueueResponse> {
        editor(ctx)?;
        let job = Job::TranslateEntity {
            entity_kind: kind,
            entity_id,
            language,
            fields,
        };
        enqueue(ctx, job).await
    }

    async fn approve_translation(&self, ctx: &Context<'_>, id: i64) -> FieldResult<Translation> {
        let actor = editor(ctx)?;
        let context = state(ctx)?;
        let translation = context
            .content
            .approve_translation(id, actor)
            .await
            .extend()?;
        Ok(translation.into())
    }
}
