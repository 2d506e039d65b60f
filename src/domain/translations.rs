use super::GenerationMeta;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A language content may be translated into. Exactly one active language
/// is the default; it is the source of every translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedLanguage {
    pub id: i64,
    /// Short code such as `en` or `pt-BR`.
    pub code: String,
    pub name: String,
    pub is_active: bool,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Record kinds that carry translatable text.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, async_graphql::Enum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TranslatableKind {
    Taxonomy,
    Category,
    Tag,
    Article,
    Media,
    SocialMediaPost,
}

impl TranslatableKind {
    pub const ALL: [TranslatableKind; 6] = [
        TranslatableKind::Taxonomy,
        TranslatableKind::Category,
        TranslatableKind::Tag,
        TranslatableKind::Article,
        TranslatableKind::Media,
        TranslatableKind::SocialMediaPost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TranslatableKind::Taxonomy => "taxonomy",
            TranslatableKind::Category => "category",
            TranslatableKind::Tag => "tag",
            TranslatableKind::Article => "article",
            TranslatableKind::Media => "media",
            TranslatableKind::SocialMediaPost => "social_media_post",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|kind| kind.as_str() == key)
    }

    /// Fields translated when no explicit list is given.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            TranslatableKind::Taxonomy | TranslatableKind::Category => &["name", "description"],
            TranslatableKind::Tag => &["name"],
            TranslatableKind::Article => &["title", "content", "excerpt"],
            TranslatableKind::Media => &["title", "caption", "alt_text", "attribution"],
            TranslatableKind::SocialMediaPost => &["content", "hashtags"],
        }
    }

    /// Short fields use the metadata prompt; long ones the content prompt.
    pub fn is_metadata_field(field: &str) -> bool {
        matches!(field, "title" | "name" | "alt_text")
    }
}

/// Translated text of one field of one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub id: i64,
    pub entity_kind: TranslatableKind,
    pub entity_id: i64,
    pub field: String,
    pub language: String,
    pub content: String,
    pub is_generated: bool,
    pub generation: GenerationMeta,
    pub approved_by_id: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
