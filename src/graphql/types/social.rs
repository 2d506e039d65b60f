use super::pipeline::Article;
use crate::domain::{
    ContentStatus, HashtagGroup as HashtagGroupRecord, Platform, PostType,
    SocialMediaAccount as AccountRecord, SocialMediaPost as PostRecord,
};
use crate::graphql::schema::state;
use async_graphql::{Context, FieldResult, Object, ResultExt};
use chrono::{DateTime, Utc};

#[derive(Clone)]
pub struct SocialMediaPost {
    pub inner: PostRecord,
}

impl From<PostRecord> for SocialMediaPost {
    fn from(post: PostRecord) -> Self {
        Self { inner: post }
    }
}

#[Object]
impl SocialMediaPost {
    async fn id(&self) -> i64 {
        self.inner.id
    }

    async fn article_id(&self) -> i64 {
        self.inner.article_id
    }

    async fn account_id(&self) -> i64 {
        self.inner.account_id
    }

    async fn platform(&self) -> Platform {
        self.inner.platform
    }

    async fn post_type(&self) -> PostType {
        self.inner.post_type
    }

    async fn content(&self) -> &str {
        &self.inner.content
    }

    async fn hashtags(&self) -> &[String] {
        &self.inner.hashtags
    }

    async fn image_url(&self) -> Option<&str> {
        self.inner.image_url.as_deref()
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

    async fn scheduled_for(&self) -> Option<DateTime<Utc>> {
        self.inner.scheduled_for
    }

    async fn posted_at(&self) -> Option<DateTime<Utc>> {
        self.inner.posted_at
    }

    async fn post_url(&self) -> Option<&str> {
        self.inner.post_url.as_deref()
    }

    async fn tokens_used(&self) -> Option<i64> {
        self.inner.generation.tokens_used
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    async fn article(&self, ctx: &Context<'_>) -> FieldResult<Option<Article>> {
        let context = state(ctx)?;
        let article = context
            .content
            .get_article(self.inner.article_id)
            .await
            .extend()?;
        Ok(article.map(Article::from))
    }
}

#[derive(Clone)]
pub struct HashtagGroup {
    pub inner: HashtagGroupRecord,
}

impl From<HashtagGroupRecord> for HashtagGroup {
    fn from(group: HashtagGroupRecord) -> Self {
        Self { inner: group }
    }
}

#[Object]
impl HashtagGroup {
    async fn id(&self) -> i64 {
        self.inner.id
    }

    async fn name(&self) -> &str {
        &self.inner.name
    }

    async fn hashtags(&self) -> &[String] {
        &self.inner.hashtags
    }

    /// Core groups are added to every generated post
    async fn is_core(&self) -> bool {
        self.inner.is_core
    }
}

/// A connected account. Credentials stay server-side.
#[derive(Clone)]
pub struct SocialMediaAccount {
    pub inner: AccountRecord,
}

impl From<AccountRecord> for SocialMediaAccount {
    fn from(account: AccountRecord) -> Self {
        Self { inner: account }
    }
}

#[Object]
impl SocialMediaAccount {
    async fn id(&self) -> i64 {
        self.inner.id
    }

    async fn platform(&self) -> Platform {
        self.inner.platform
    }

    async fn username(&self) -> &str {
        &self.inner.username
    }

    async fn is_active(&self) -> bool {
        self.inner.is_active
    }
}
