use super::{Approval, GenerationMeta};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, async_graphql::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    Instagram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, async_graphql::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostType {
    Feed,
    Story,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialMediaAccount {
    pub id: i64,
    pub platform: Platform,
    pub username: String,
    pub account_id: String,
    pub is_active: bool,
    /// Opaque provider credentials; never exposed over GraphQL.
    pub credentials: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialMediaPost {
    pub id: i64,
    pub article_id: i64,
    pub account_id: i64,
    pub platform: Platform,
    pub post_type: PostType,
    pub content: String,
    pub hashtags: Vec<String>,
    pub image_url: Option<String>,
    pub approval: Approval,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub posted_at: Option<DateTime<Utc>>,
    pub post_url: Option<String>,
    pub generation: GenerationMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Named hashtag set. Core groups are appended to every post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashtagGroup {
    pub id: i64,
    pub name: String,
    pub hashtags: Vec<String>,
    pub is_core: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
