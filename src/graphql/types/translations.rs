use crate::domain::{
    ApprovedLanguage as LanguageRecord, TranslatableKind, Translation as TranslationRecord,
};
use async_graphql::Object;
use chrono::{DateTime, Utc};

#[derive(Clone)]
pub struct Language {
    pub inner: LanguageRecord,
}

impl From<LanguageRecord> for Language {
    fn from(language: LanguageRecord) -> Self {
        Self { inner: language }
    }
}

#[Object]
impl Language {
    async fn id(&self) -> i64 {
        self.inner.id
    }

    async fn code(&self) -> &str {
        &self.inner.code
    }

    async fn name(&self) -> &str {
        &self.inner.name
    }

    async fn is_active(&self) -> bool {
        self.inner.is_active
    }

    async fn is_default(&self) -> bool {
        self.inner.is_default
    }
}

#[derive(Clone)]
pub struct Translation {
    pub inner: TranslationRecord,
}

impl From<TranslationRecord> for Translation {
    fn from(translation: TranslationRecord) -> Self {
        Self { inner: translation }
    }
}

#[Object]
impl Translation {
    async fn id(&self) -> i64 {
        self.inner.id
    }

    async fn entity_kind(&self) -> TranslatableKind {
        self.inner.entity_kind
    }

    async fn entity_id(&self) -> i64 {
        self.inner.entity_id
    }

    async fn field(&self) -> &str {
        &self.inner.field
    }

    async fn language(&self) -> &str {
        &self.inner.language
    }

    async fn content(&self) -> &str {
        &self.inner.content
    }

    async fn is_generated(&self) -> bool {
        self.inner.is_generated
    }

    async fn tokens_used(&self) -> Option<i64> {
        self.inner.generation.tokens_used
    }

    async fn approved_by_id(&self) -> Option<i64> {
        self.inner.approved_by_id
    }

    async fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.inner.approved_at
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.inner.updated_at
    }
}
