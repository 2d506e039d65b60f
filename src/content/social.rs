use super::query::cmp_ci;
use super::{required, ContentService};
use crate::domain::{
    Approval, Article, ContentStatus, GenerationMeta, HashtagGroup, Platform, PostType,
    SocialMediaAccount, SocialMediaPost,
};
use crate::error::{ConsoleError, Result};
use chrono::Utc;

#[derive(Debug, Clone, async_graphql::InputObject)]
pub struct SocialPostInput {
    pub content: String,
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, async_graphql::InputObject)]
pub struct HashtagGroupInput {
    pub name: String,
    pub hashtags: Vec<String>,
    #[graphql(default)]
    pub is_core: bool,
}

#[derive(Debug, Clone)]
pub struct NewSocialPost {
    pub article_id: i64,
    pub account_id: i64,
    pub post_type: PostType,
    pub content: String,
    pub hashtags: Vec<String>,
    pub generation: GenerationMeta,
}

/// `#tag` form, without blanks or duplicates, original order kept.
pub fn normalize_hashtags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let trimmed = tag.trim().trim_start_matches('#');
        if trimmed.is_empty() {
            continue;
        }
        let tag = format!("#{trimmed}");
        if !out.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            out.push(tag);
        }
    }
    out
}

impl ContentService {
    pub async fn list_accounts(&self) -> Result<Vec<SocialMediaAccount>> {
        self.repo.list().await
    }

    pub async fn active_account(&self, platform: Platform) -> Result<Option<SocialMediaAccount>> {
        self.repo
            .find_one(|a: &SocialMediaAccount| a.platform == platform && a.is_active)
            .await
    }

    pub async fn create_social_post(&self, new: NewSocialPost) -> Result<SocialMediaPost> {
        let account: SocialMediaAccount = self.repo.require(new.account_id).await?;
        self.repo.require::<Article>(new.article_id).await?;
        let now = Utc::now();
        self.repo
            .create(SocialMediaPost {
                id: 0,
                article_id: new.article_id,
                account_id: account.id,
                platform: account.platform,
                post_type: new.post_type,
                content: required("content", &new.content)?,
                hashtags: normalize_hashtags(new.hashtags),
                image_url: None,
                approval: Approval::default(),
                scheduled_for: None,
                posted_at: None,
                post_url: None,
                generation: new.generation,
                created_at: now,
                updated_at: now,
            })
            .await
    }

    pub async fn list_social_posts(
        &self,
        article_id: Option<i64>,
        status: Option<ContentStatus>,
    ) -> Result<Vec<SocialMediaPost>> {
        let mut posts = self
            .repo
            .find(|p: &SocialMediaPost| {
                article_id.map_or(true, |a| p.article_id == a)
                    && status.map_or(true, |s| p.approval.status == s)
            })
            .await?;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(posts)
    }

    pub async fn update_social_post(&self, id: i64, input: SocialPostInput) -> Result<SocialMediaPost> {
        let mut post: SocialMediaPost = self.repo.require(id).await?;
        post.content = required("content", &input.content)?;
        post.hashtags = normalize_hashtags(input.hashtags);
        post.updated_at = Utc::now();
        self.repo.update(&post).await?;
        Ok(post)
    }

    pub async fn update_social_post_status(
        &self,
        id: i64,
        status: ContentStatus,
        actor: Option<i64>,
    ) -> Result<SocialMediaPost> {
        let mut post: SocialMediaPost = self.repo.require(id).await?;
        let now = Utc::now();
        post.approval.transition(status, actor, now);
        post.updated_at = now;
        self.repo.update(&post).await?;
        Ok(post)
    }

    /// Groups by name.
    pub async fn list_hashtag_groups(&self) -> Result<Vec<HashtagGroup>> {
        let mut groups = self.repo.list::<HashtagGroup>().await?;
        groups.sort_by(|a, b| cmp_ci(&a.name, &b.name));
        Ok(groups)
    }

    pub async fn hashtag_group_by_name(&self, name: &str) -> Result<Option<HashtagGroup>> {
        self.repo
            .find_one(|g: &HashtagGroup| g.name.eq_ignore_ascii_case(name.trim()))
            .await
    }

    pub async fn create_hashtag_group(&self, input: HashtagGroupInput) -> Result<HashtagGroup> {
        let name = required("name", &input.name)?;
        if self.hashtag_group_by_name(&name).await?.is_some() {
            return Err(ConsoleError::Conflict(format!(
                "Hashtag group '{name}' already exists"
            )));
        }
        let hashtags = normalize_hashtags(input.hashtags);
        if hashtags.is_empty() {
            return Err(ConsoleError::Validation(
                "A hashtag group needs at least one hashtag".into(),
            ));
        }
        let now = Utc::now();
        self.repo
            .create(HashtagGroup {
                id: 0,
                name,
                hashtags,
                is_core: input.is_core,
                created_at: now,
                updated_at: now,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    #[test]
    fn hashtags_are_prefixed_and_deduplicated() {
        let tags = normalize_hashtags(vec![
            "Panama".to_string(),
            "#panama".to_string(),
            " ".to_string(),
            "#History".to_string(),
        ]);
        assert_eq!(tags, vec!["#Panama", "#History"]);
    }

    #[tokio::test]
    async fn hashtag_group_names_are_unique() {
        let service = fixtures::service();
        let input = HashtagGroupInput {
            name: "Core".into(),
            hashtags: vec!["#Panama".into()],
            is_core: true,
        };
        service.create_hashtag_group(input.clone()).await.unwrap();
        let dup = service.create_hashtag_group(input).await;
        assert!(matches!(dup, Err(ConsoleError::Conflict(_))));

        let empty = service
            .create_hashtag_group(HashtagGroupInput {
                name: "Empty".into(),
                hashtags: vec![],
                is_core: false,
            })
            .await;
        assert!(matches!(empty, Err(ConsoleError::Validation(_))));
    }
}
