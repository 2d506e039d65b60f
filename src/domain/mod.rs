//! Domain data shapes shared across layers.
//!
//! Every persisted record carries an integer `id` assigned by storage. Records
//! that take part in the editorial workflow embed an [`Approval`]; records an
//! AI agent produced embed [`GenerationMeta`].

pub mod agents;
pub mod content;
pub mod media;
pub mod social;
pub mod translations;
pub mod users;

pub use agents::{Agent, AgentType, AiModel, PromptTemplate, Provider, Usage};
pub use content::{
    Article, ArticleLevel, ArticleSuggestion, Category, LevelSpecs, Research, Tag, Taxonomy,
};
pub use media::{
    ImageMetadata, InstagramMediaType, Media, MediaCandidate, MediaSource, MediaSuggestion,
    MediaType,
};
pub use social::{HashtagGroup, Platform, PostType, SocialMediaAccount, SocialMediaPost};
pub use translations::{ApprovedLanguage, TranslatableKind, Translation};
pub use users::User;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review state shared by every piece of content in the pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, async_graphql::Enum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Pending => "PENDING",
            ContentStatus::Approved => "APPROVED",
            ContentStatus::Rejected => "REJECTED",
        }
    }
}

/// Who approved a record and when. Only set while the status is APPROVED.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub status: ContentStatus,
    pub approved_by_id: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Bookkeeping for records produced by an AI agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationMeta {
    pub tokens_used: Option<i64>,
    pub model_id: Option<i64>,
    pub generation_started_at: Option<DateTime<Utc>>,
    pub last_generation_error: Option<String>,
}

impl GenerationMeta {
    pub fn generated(model_id: i64, tokens_used: i64, started_at: DateTime<Utc>) -> Self {
        Self {
            tokens_used: Some(tokens_used),
            model_id: Some(model_id),
            generation_started_at: Some(started_at),
            last_generation_error: None,
        }
    }
}

/// Implements [`crate::storage::Entity`] for a record type with an `id: i64` field.
macro_rules! entity {
    ($ty:ty, $kind:literal, $name:literal) => {
        impl $crate::storage::Entity for $ty {
            const KIND: &'static str = $kind;
            const NAME: &'static str = $name;

            fn id(&self) -> i64 {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = id;
            }
        }
    };
}

entity!(Taxonomy, "taxonomy", "Taxonomy");
entity!(Category, "category", "Category");
entity!(Tag, "tag", "Tag");
entity!(ArticleSuggestion, "article_suggestion", "Suggestion");
entity!(Research, "research", "Research");
entity!(Article, "article", "Article");
entity!(SocialMediaAccount, "social_media_account", "Social media account");
entity!(SocialMediaPost, "social_media_post", "Social media post");
entity!(HashtagGroup, "hashtag_group", "Hashtag group");
entity!(MediaSuggestion, "media_suggestion", "Media suggestion");
entity!(MediaCandidate, "media_candidate", "Media candidate");
entity!(Media, "media", "Media");
entity!(User, "user", "User");
entity!(AiModel, "ai_model", "AI model");
entity!(Agent, "agent", "Agent");
entity!(PromptTemplate, "prompt_template", "Prompt template");
entity!(Usage, "usage", "Usage");
entity!(ApprovedLanguage, "approved_language", "Language");
entity!(Translation, "translation", "Translation");
