use super::text::parse_reply;
use super::Generation;
use crate::ai::prompts::{self, render};
use crate::content::NewSocialPost;
use crate::domain::{
    AgentType, Article, ArticleSuggestion, GenerationMeta, HashtagGroup, Platform, PostType,
    Research, SocialMediaAccount, SocialMediaPost,
};
use crate::error::{ConsoleError, Result};
use crate::workflow::ensure_approved;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument};

pub const MAX_DID_YOU_KNOW_POSTS: u32 = 10;
const CORE_HASHTAGS_PER_GROUP: usize = 3;
const SELECTED_GROUP_HASHTAGS: usize = 5;

#[derive(Debug, Deserialize)]
struct PostReply {
    content: String,
    #[serde(default)]
    hashtags: Vec<String>,
    #[serde(default)]
    selected_hashtag_groups: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PostsReply {
    posts: Vec<PostReply>,
}

pub fn slugify(title: &str) -> String {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Where an article is read on the public site.
pub fn article_url(base: &str, article: &Article) -> String {
    format!(
        "{}/articles/{}-{}",
        base.trim_end_matches('/'),
        article.id,
        slugify(&article.title)
    )
}

/// Non-core groups as `name:` followed by their hashtags, for the prompt.
pub fn format_hashtag_groups(groups: &[HashtagGroup]) -> String {
    groups
        .iter()
        .filter(|g| !g.is_core)
        .map(|g| format!("{}:\n{}\n", g.name, g.hashtags.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Core groups (first three each), then the first selected group (first
/// five), then the post's own hashtags.
pub fn compose_hashtags(
    groups: &[HashtagGroup],
    selected: &[String],
    specific: Vec<String>,
) -> Vec<String> {
    let mut out: Vec<String> = groups
        .iter()
        .filter(|g| g.is_core)
        .flat_map(|g| g.hashtags.iter().take(CORE_HASHTAGS_PER_GROUP).cloned())
        .collect();
    if let Some(group) = selected
        .first()
        .and_then(|name| groups.iter().find(|g| &g.name == name))
    {
        out.extend(group.hashtags.iter().take(SELECTED_GROUP_HASHTAGS).cloned());
    }
    out.extend(specific);
    out
}

impl Generation {
    async fn instagram_account(&self) -> Result<SocialMediaAccount> {
        self.content
            .active_account(Platform::Instagram)
            .await?
            .ok_or_else(|| ConsoleError::Config("No active Instagram account found".into()))
    }

    async fn approved_article(&self, article_id: i64) -> Result<(Article, Research, ArticleSuggestion)> {
        let repo = self.content.repo();
        let article: Article = repo.require(article_id).await?;
        ensure_approved("Article", article.id, article.approval.status)?;
        let research: Research = repo.require(article.research_id).await?;
        let suggestion: ArticleSuggestion = repo.require(research.suggestion_id).await?;
        Ok((article, research, suggestion))
    }

    /// One Instagram Story promoting an approved article.
    #[instrument(skip(self), fields(agent = "social_media"))]
    pub async fn generate_story_promotion(&self, article_id: i64) -> Result<SocialMediaPost> {
        let (article, _research, suggestion) = self.approved_article(article_id).await?;
        let account = self.instagram_account().await?;
        let (_, category) = self.category_context(article.category_id).await?;
        let groups = self.content.list_hashtag_groups().await?;
        let runtime = self.runtime(AgentType::SocialMedia).await?;

        let template = runtime
            .template(prompts::INSTAGRAM_STORY_ARTICLE_PROMOTION)
            .await?;
        let prompt = render(
            &template,
            &[
                ("article_title", article.title.clone()),
                ("article_main_topic", suggestion.main_topic.clone()),
                ("category_name", category.name.clone()),
                ("category_description", category.description.clone()),
                ("article_level", article.level.key().to_string()),
                ("article_url", article_url(&self.options.site_base_url, &article)),
                ("hashtag_groups", format_hashtag_groups(&groups)),
            ],
        );

        let started_at = Utc::now();
        let completion = runtime.complete(&prompt, &[]).await?;
        let reply: PostReply = parse_reply(&completion.text)?;
        let hashtags = compose_hashtags(&groups, &reply.selected_hashtag_groups, reply.hashtags);

        let post = self
            .content
            .create_social_post(NewSocialPost {
                article_id: article.id,
                account_id: account.id,
                post_type: PostType::Story,
                content: reply.content,
                hashtags,
                generation: GenerationMeta::generated(
                    runtime.model.id,
                    completion.total_tokens(),
                    started_at,
                ),
            })
            .await?;
        info!("Generated story promotion {} for article {}", post.id, article.id);
        Ok(post)
    }

    /// `count` "Did you know?" feed posts drawn from the article's research.
    #[instrument(skip(self), fields(agent = "social_media"))]
    pub async fn generate_did_you_know_posts(
        &self,
        article_id: i64,
        count: u32,
    ) -> Result<Vec<SocialMediaPost>> {
        validate_post_count(count)?;
        let (article, research, _suggestion) = self.approved_article(article_id).await?;
        let account = self.instagram_account().await?;
        let (_, category) = self.category_context(article.category_id).await?;
        let groups = self.content.list_hashtag_groups().await?;
        let runtime = self.runtime(AgentType::SocialMedia).await?;

        let template = runtime.template(prompts::INSTAGRAM_POST_DID_YOU_KNOW).await?;
        let prompt = render(
            &template,
            &[
                ("research_title", article.title.clone()),
                ("category_name", category.name.clone()),
                ("category_description", category.description.clone()),
                ("research_content", research.content.clone()),
                ("hashtag_groups", format_hashtag_groups(&groups)),
                ("num_posts", count.to_string()),
            ],
        );

        let started_at = Utc::now();
        let completion = runtime.complete(&prompt, &[]).await?;
        let reply: PostsReply = parse_reply(&completion.text)?;
        if reply.posts.is_empty() {
            return Err(ConsoleError::api("Response contained no posts"));
        }

        let per_post = completion.total_tokens() / reply.posts.len() as i64;
        let mut created = Vec::with_capacity(reply.posts.len());
        for item in reply.posts {
            let hashtags = compose_hashtags(&groups, &item.selected_hashtag_groups, item.hashtags);
            let post = self
                .content
                .create_social_post(NewSocialPost {
                    article_id: article.id,
                    account_id: account.id,
                    post_type: PostType::Feed,
                    content: item.content,
                    hashtags,
                    generation: GenerationMeta::generated(runtime.model.id, per_post, started_at),
                })
                .await?;
            created.push(post);
        }
        info!(
            "Generated {} did-you-know posts for article {}",
            created.len(),
            article.id
        );
        Ok(created)
    }
}

pub fn validate_post_count(count: u32) -> Result<()> {
    if !(1..=MAX_DID_YOU_KNOW_POSTS).contains(&count) {
        return Err(ConsoleError::Validation(format!(
            "Number of posts must be between 1 and {MAX_DID_YOU_KNOW_POSTS}"
        )));
    }
    Ok(())
}
