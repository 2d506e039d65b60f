use super::pipeline::Research;
use crate::domain::{
    ContentStatus, InstagramMediaType, Media as MediaRecord, MediaCandidate as CandidateRecord,
    MediaSource, MediaSuggestion as MediaSuggestionRecord, MediaType,
};
use crate::graphql::schema::state;
use async_graphql::{Context, FieldResult, Object, ResultExt};
use chrono::{DateTime, Utc};

/// A file in the media library
#[derive(Clone)]
pub struct Media {
    pub inner: MediaRecord,
}

impl From<MediaRecord> for Media {
    fn from(media: MediaRecord) -> Self {
        Self { inner: media }
    }
}

#[Object]
impl Media {
    async fn id(&self) -> i64 {
        self.inner.id
    }

    async fn filename(&self) -> &str {
        &self.inner.filename
    }

    async fn original_filename(&self) -> &str {
        &self.inner.original_filename
    }

    async fn file_path(&self) -> &str {
        &self.inner.file_path
    }

    async fn file_size(&self) -> i64 {
        self.inner.file_size
    }

    async fn mime_type(&self) -> &str {
        &self.inner.mime_type
    }

    async fn media_type(&self) -> MediaType {
        self.inner.media_type
    }

    async fn source(&self) -> MediaSource {
        self.inner.source
    }

    async fn title(&self) -> Option<&str> {
        self.inner.title.as_deref()
    }

    async fn caption(&self) -> Option<&str> {
        self.inner.caption.as_deref()
    }

    async fn alt_text(&self) -> Option<&str> {
        self.inner.alt_text.as_deref()
    }

    async fn external_url(&self) -> Option<&str> {
        self.inner.external_url.as_deref()
    }

    /// URL to display the file: the upload route for local files, the
    /// source page otherwise
    async fn public_url(&self, ctx: &Context<'_>) -> FieldResult<Option<String>> {
        let context = state(ctx)?;
        Ok(context.content.media_public_url(&self.inner))
    }

    async fn width(&self) -> Option<i64> {
        self.inner.width
    }

    async fn height(&self) -> Option<i64> {
        self.inner.height
    }

    async fn attribution(&self) -> Option<&str> {
        self.inner.attribution.as_deref()
    }

    async fn instagram_media_type(&self) -> Option<InstagramMediaType> {
        self.inner.instagram_media_type
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }
}

#[derive(Clone)]
pub struct MediaSuggestion {
    pub inner: MediaSuggestionRecord,
}

impl From<MediaSuggestionRecord> for MediaSuggestion {
    fn from(suggestion: MediaSuggestionRecord) -> Self {
        Self { inner: suggestion }
    }
}

#[Object]
impl MediaSuggestion {
    async fn id(&self) -> i64 {
        self.inner.id
    }

    async fn research_id(&self) -> i64 {
        self.inner.research_id
    }

    async fn commons_categories(&self) -> &[String] {
        &self.inner.commons_categories
    }

    async fn search_queries(&self) -> &[String] {
        &self.inner.search_queries
    }

    async fn illustration_topics(&self) -> &[String] {
        &self.inner.illustration_topics
    }

    async fn reasoning(&self) -> &str {
        &self.inner.reasoning
    }

    async fn last_generation_error(&self) -> Option<&str> {
        self.inner.generation.last_generation_error.as_deref()
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
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

    async fn candidates(&self, ctx: &Context<'_>) -> FieldResult<Vec<MediaCandidate>> {
        let context = state(ctx)?;
        let candidates = context
            .content
            .candidates_for_suggestion(self.inner.id)
            .await
            .extend()?;
        Ok(candidates.into_iter().map(MediaCandidate::from).collect())
    }
}

/// A Commons image awaiting review
#[derive(Clone)]
pub struct MediaCandidate {
    pub inner: CandidateRecord,
}

impl From<CandidateRecord> for MediaCandidate {
    fn from(candidate: CandidateRecord) -> Self {
        Self { inner: candidate }
    }
}

#[Object]
impl MediaCandidate {
    async fn id(&self) -> i64 {
        self.inner.id
    }

    async fn suggestion_id(&self) -> i64 {
        self.inner.suggestion_id
    }

    async fn commons_id(&self) -> &str {
        &self.inner.image.commons_id
    }

    async fn commons_url(&self) -> &str {
        &self.inner.image.commons_url
    }

    async fn title(&self) -> &str {
        &self.inner.image.title
    }

    async fn description(&self) -> Option<&str> {
        self.inner.image.description.as_deref()
    }

    async fn author(&self) -> Option<&str> {
        self.inner.image.author.as_deref()
    }

    async fn license(&self) -> &str {
        &self.inner.image.license
    }

    async fn license_url(&self) -> Option<&str> {
        self.inner.image.license_url.as_deref()
    }

    async fn width(&self) -> i64 {
        self.inner.image.width
    }

    async fn height(&self) -> i64 {
        self.inner.image.height
    }

    async fn mime_type(&self) -> &str {
        &self.inner.image.mime_type
    }

    async fn file_size(&self) -> i64 {
        self.inner.image.file_size
    }

    async fn status(&self) -> ContentStatus {
        self.inner.status
    }

    async fn reviewed_by_id(&self) -> Option<i64> {
        self.inner.reviewed_by_id
    }

    async fn reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.inner.reviewed_at
    }

    async fn review_notes(&self) -> Option<&str> {
        self.inner.review_notes.as_deref()
    }

    async fn media_id(&self) -> Option<i64> {
        self.inner.media_id
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    async fn suggestion(&self, ctx: &Context<'_>) -> FieldResult<Option<MediaSuggestion>> {
        let context = state(ctx)?;
        let suggestion = context
            .content
            .get_media_suggestion(self.inner.suggestion_id)
            .await
            .extend()?;
        Ok(suggestion.map(MediaSuggestion::from))
    }

    /// Library entry created when the candidate was approved
    async fn media(&self, ctx: &Context<'_>) -> FieldResult<Option<Media>> {
        let Some(media_id) = self.inner.media_id else {
            return Ok(None);
        };
        let context = state(ctx)?;
        let media = context.content.get_media(media_id).await.extend()?;
        Ok(media.map(Media::from))
    }
}
