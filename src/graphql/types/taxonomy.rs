use super::paginated;
use crate::domain::{
    Category as CategoryRecord, ContentStatus, Tag as TagRecord, Taxonomy as TaxonomyRecord,
};
use crate::graphql::schema::state;
use async_graphql::{Context, FieldResult, Object, ResultExt};
use chrono::{DateTime, Utc};

#[derive(Clone)]
pub struct Taxonomy {
    pub inner: TaxonomyRecord,
}

impl From<TaxonomyRecord> for Taxonomy {
    fn from(taxonomy: TaxonomyRecord) -> Self {
        Self { inner: taxonomy }
    }
}

#[Object]
impl Taxonomy {
    async fn id(&self) -> i64 {
        self.inner.id
    }

    async fn name(&self) -> &str {
        &self.inner.name
    }

    async fn description(&self) -> &str {
        &self.inner.description
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.inner.updated_at
    }

    /// Categories filed under this taxonomy
    async fn categories(&self, ctx: &Context<'_>) -> FieldResult<Vec<Category>> {
        let context = state(ctx)?;
        let categories = context
            .content
            .list_categories(Some(self.inner.id))
            .await
            .extend()?;
        Ok(categories.into_iter().map(Category::from).collect())
    }
}

#[derive(Clone)]
pub struct Category {
    pub inner: CategoryRecord,
}

impl From<CategoryRecord> for Category {
    fn from(category: CategoryRecord) -> Self {
        Self { inner: category }
    }
}

#[Object]
impl Category {
    async fn id(&self) -> i64 {
        self.inner.id
    }

    async fn name(&self) -> &str {
        &self.inner.name
    }

    async fn description(&self) -> &str {
        &self.inner.description
    }

    async fn taxonomy_id(&self) -> i64 {
        self.inner.taxonomy_id
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.inner.updated_at
    }

    async fn taxonomy(&self, ctx: &Context<'_>) -> FieldResult<Option<Taxonomy>> {
        let context = state(ctx)?;
        let taxonomy = context
            .content
            .get_taxonomy(self.inner.taxonomy_id)
            .await
            .extend()?;
        Ok(taxonomy.map(Taxonomy::from))
    }
}

#[derive(Clone)]
pub struct Tag {
    pub inner: TagRecord,
}

impl From<TagRecord> for Tag {
    fn from(tag: TagRecord) -> Self {
        Self { inner: tag }
    }
}

#[Object]
impl Tag {
    async fn id(&self) -> i64 {
        self.inner.id
    }

    async fn name(&self) -> &str {
        &self.inner.name
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

    async fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }
}

paginated!(PaginatedTags, tags, Tag, TagRecord);
