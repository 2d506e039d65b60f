use super::query::{cmp_ci, contains_ci, ListParams, Page, SortDirection};
use super::{required, ContentService};
use crate::domain::{Article, ArticleSuggestion, Category, ContentStatus, Tag, Taxonomy};
use crate::error::{ConsoleError, Result};
use chrono::Utc;
use tracing::info;

#[derive(Debug, Clone, async_graphql::InputObject)]
pub struct TaxonomyInput {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, async_graphql::InputObject)]
pub struct CategoryInput {
    pub name: String,
    pub description: String,
    pub taxonomy_id: i64,
}

#[derive(Debug, Clone, async_graphql::InputObject)]
pub struct TagInput {
    pub name: String,
}

impl ContentService {
    pub async fn list_taxonomies(&self) -> Result<Vec<Taxonomy>> {
        self.repo.list().await
    }

    pub async fn get_taxonomy(&self, id: i64) -> Result<Option<Taxonomy>> {
        self.repo.get(id).await
    }

    async fn ensure_unique_taxonomy(&self, name: &str, except: Option<i64>) -> Result<()> {
        let clash = self
            .repo
            .find_one(|t: &Taxonomy| Some(t.id) != except && t.name.eq_ignore_ascii_case(name))
            .await?;
        match clash {
            Some(_) => Err(ConsoleError::Conflict(format!(
                "Taxonomy '{name}' already exists"
            ))),
            None => Ok(()),
        }
    }

    pub async fn create_taxonomy(&self, input: TaxonomyInput) -> Result<Taxonomy> {
        let name = required("name", &input.name)?;
        self.ensure_unique_taxonomy(&name, None).await?;
        let now = Utc::now();
        let taxonomy = self
            .repo
            .create(Taxonomy {
                id: 0,
                name,
                description: input.description.trim().to_string(),
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!("Created taxonomy {} ({})", taxonomy.name, taxonomy.id);
        Ok(taxonomy)
    }

    pub async fn update_taxonomy(&self, id: i64, input: TaxonomyInput) -> Result<Taxonomy> {
        let mut taxonomy: Taxonomy = self.repo.require(id).await?;
        let name = required("name", &input.name)?;
        self.ensure_unique_taxonomy(&name, Some(id)).await?;
        taxonomy.name = name;
        taxonomy.description = input.description.trim().to_string();
        taxonomy.updated_at = Utc::now();
        self.repo.update(&taxonomy).await?;
        Ok(taxonomy)
    }

    pub async fn delete_taxonomy(&self, id: i64) -> Result<bool> {
        self.repo.require::<Taxonomy>(id).await?;
        let categories = self
            .repo
            .count(|c: &Category| c.taxonomy_id == id)
            .await?;
        if categories > 0 {
            return Err(ConsoleError::Conflict(format!(
                "Taxonomy {id} still has {categories} categories"
            )));
        }
        self.repo.delete::<Taxonomy>(id).await
    }

    pub async fn list_categories(&self, taxonomy_id: Option<i64>) -> Result<Vec<Category>> {
        self.repo
            .find(|c: &Category| taxonomy_id.map_or(true, |t| c.taxonomy_id == t))
            .await
    }

    pub async fn get_category(&self, id: i64) -> Result<Option<Category>> {
        self.repo.get(id).await
    }

    async fn validate_category(&self, input: &CategoryInput, except: Option<i64>) -> Result<String> {
        let name = required("name", &input.name)?;
        self.repo.require::<Taxonomy>(input.taxonomy_id).await?;
        let clash = self
            .repo
            .find_one(|c: &Category| {
                Some(c.id) != except
                    && c.taxonomy_id == input.taxonomy_id
                    && c.name.eq_ignore_ascii_case(&name)
            })
            .await?;
        if clash.is_some() {
            return Err(ConsoleError::Conflict(format!(
                "Category '{name}' already exists in taxonomy {}",
                input.taxonomy_id
            )));
        }
        Ok(name)
    }

    pub async fn create_category(&self, input: CategoryInput) -> Result<Category> {
        let name = self.validate_category(&input, None).await?;
        let now = Utc::now();
        let category = self
            .repo
            .create(Category {
                id: 0,
                taxonomy_id: input.taxonomy_id,
                name,
                description: input.description.trim().to_string(),
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!("Created category {} ({})", category.name, category.id);
        Ok(category)
    }

    pub async fn update_category(&self, id: i64, input: CategoryInput) -> Result<Category> {
        let mut category: Category = self.repo.require(id).await?;
        let name = self.validate_category(&input, Some(id)).await?;
        category.name = name;
        category.description = input.description.trim().to_string();
        category.taxonomy_id = input.taxonomy_id;
        category.updated_at = Utc::now();
        self.repo.update(&category).await?;
        Ok(category)
    }

    pub async fn delete_category(&self, id: i64) -> Result<bool> {
        self.repo.require::<Category>(id).await?;
        let suggestions = self
            .repo
            .count(|s: &ArticleSuggestion| s.category_id == id)
            .await?;
        let articles = self.repo.count(|a: &Article| a.category_id == id).await?;
        if suggestions + articles > 0 {
            return Err(ConsoleError::Conflict(format!(
                "Category {id} is referenced by {suggestions} suggestions and {articles} articles"
            )));
        }
        self.repo.delete::<Category>(id).await
    }

    pub async fn list_tags(&self, params: &ListParams<ContentStatus>) -> Result<Page<Tag>> {
        let needle = params.needle();
        let mut tags = self
            .repo
            .find(|t: &Tag| {
                params.status.map_or(true, |s| t.approval.status == s)
                    && needle.as_deref().map_or(true, |n| contains_ci(&t.name, n))
            })
            .await?;
        let dir = params.dir_or(SortDirection::Asc);
        tags.sort_by(|a, b| dir.apply(cmp_ci(&a.name, &b.name).then(a.id.cmp(&b.id))));
        Ok(Page::paginate(tags, params.page(), params.page_size()))
    }

    /// Every tag in name order, optionally filtered by status.
    pub async fn all_tags(&self, status: Option<ContentStatus>) -> Result<Vec<Tag>> {
        let mut tags = self
            .repo
            .find(|t: &Tag| status.map_or(true, |s| t.approval.status == s))
            .await?;
        tags.sort_by(|a, b| cmp_ci(&a.name, &b.name).then(a.id.cmp(&b.id)));
        Ok(tags)
    }

    pub async fn get_tag(&self, id: i64) -> Result<Option<Tag>> {
        self.repo.get(id).await
    }

    async fn ensure_unique_tag(&self, name: &str, except: Option<i64>) -> Result<()> {
        let clash = self
            .repo
            .find_one(|t: &Tag| Some(t.id) != except && t.name.eq_ignore_ascii_case(name))
            .await?;
        match clash {
            Some(_) => Err(ConsoleError::Conflict(format!("Tag '{name}' already exists"))),
            None => Ok(()),
        }
    }

    pub async fn create_tag(&self, input: TagInput) -> Result<Tag> {
        let name = required("name", &input.name)?;
        self.ensure_unique_tag(&name, None).await?;
        let now = Utc::now();
        self.repo
            .create(Tag {
                id: 0,
                name,
                approval: Default::default(),
                created_at: now,
                updated_at: now,
            })
            .await
    }

    pub async fn update_tag(&self, id: i64, input: TagInput) -> Result<Tag> {
        let mut tag: Tag = self.repo.require(id).await?;
        let name = required("name", &input.name)?;
        self.ensure_unique_tag(&name, Some(id)).await?;
        tag.name = name;
        tag.updated_at = Utc::now();
        self.repo.update(&tag).await?;
        Ok(tag)
    }

    pub async fn update_tag_status(
        &self,
        id: i64,
        status: ContentStatus,
        actor: Option<i64>,
    ) -> Result<Tag> {
        let mut tag: Tag = self.repo.require(id).await?;
        let now = Utc::now();
        tag.approval.transition(status, actor, now);
        tag.updated_at = now;
        self.repo.update(&tag).await?;
        Ok(tag)
    }
}
