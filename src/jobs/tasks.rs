use super::{Job, JobContext, JobHandler};
use crate::content::ContentService;
use crate::domain::{Article, ArticleSuggestion, Category, ContentStatus, MediaSuggestion, Research};
use crate::error::{ConsoleError, Result};
use crate::generation::social::validate_post_count;
use crate::generation::Generation;
use crate::wikimedia::MediaCandidateFetcher;
use crate::workflow::ensure_approved;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{error, info, warn};

/// Checks a job can run against current content. Run before enqueueing and
/// again when the job starts, since content may change in between.
pub async fn check_preconditions(content: &ContentService, job: &Job) -> Result<()> {
    let repo = content.repo();
    match job {
        Job::GenerateSuggestions {
            category_id, count, ..
        } => {
            if *count < 1 {
                return Err(ConsoleError::Validation(
                    "Number of suggestions must be at least 1".into(),
                ));
            }
            repo.require::<Category>(*category_id).await?;
        }
        Job::GenerateResearch { suggestion_id } => {
            let s: ArticleSuggestion = repo.require(*suggestion_id).await?;
            ensure_approved("Suggestion", s.id, s.approval.status)?;
        }
        Job::GenerateArticle { research_id } | Job::GenerateMediaSuggestions { research_id } => {
            let r: Research = repo.require(*research_id).await?;
            ensure_approved("Research", r.id, r.approval.status)?;
        }
        Job::FetchMediaCandidates { suggestion_id, .. } => {
            repo.require::<MediaSuggestion>(*suggestion_id).await?;
        }
        Job::GenerateStoryPromotion { article_id } => {
            let a: Article = repo.require(*article_id).await?;
            ensure_approved("Article", a.id, a.approval.status)?;
        }
        Job::GenerateDidYouKnowPosts { article_id, count } => {
            validate_post_count(*count)?;
            let a: Article = repo.require(*article_id).await?;
            ensure_approved("Article", a.id, a.approval.status)?;
        }
        Job::BulkGeneration => {}
        Job::TranslateEntity {
            entity_kind,
            entity_id,
            language,
            ..
        } => {
            content.require_active_language(language).await?;
            if !content.ready_for_translation(*entity_kind, *entity_id).await? {
                return Err(ConsoleError::Validation(format!(
                    "{} {entity_id} is not ready for translation",
                    entity_kind.as_str()
                )));
            }
        }
    }
    Ok(())
}

/// Runs every job kind against the generation services.
pub struct TaskRunner {
    generation: Generation,
    fetcher: MediaCandidateFetcher,
    system_user_id: Option<i64>,
}

impl TaskRunner {
    pub fn new(
        generation: Generation,
        fetcher: MediaCandidateFetcher,
        system_user_id: Option<i64>,
    ) -> Self {
        Self {
            generation,
            fetcher,
            system_user_id,
        }
    }

    fn content(&self) -> &ContentService {
        self.generation.content()
    }

    /// Research, auto-approval and article for every approved suggestion
    /// that has no research yet. One failing suggestion does not stop the rest.
    async fn bulk_generate(&self, ctx: &JobContext) -> Result<Value> {
        let suggestions = self.content().suggestions_awaiting_research().await?;
        let total = suggestions.len();
        info!("Bulk generation over {} suggestions", total);

        let mut articles = Vec::new();
        let mut failures = Vec::new();
        for (i, suggestion) in suggestions.iter().enumerate() {
            ctx.report_item(i, total, format!("Researching suggestion {}", suggestion.id))
                .await;
            match self.process_suggestion(suggestion).await {
                Ok(written) => articles.extend(written.iter().map(|a| a.id)),
                Err(e) => {
                    error!("Bulk generation failed for suggestion {}: {}", suggestion.id, e);
                    if let Err(record_err) = self
                        .content()
                        .record_suggestion_error(suggestion.id, &e.to_string())
                        .await
                    {
                        warn!("Could not record error on suggestion {}: {}", suggestion.id, record_err);
                    }
                    failures.push(json!({"suggestion_id": suggestion.id, "error": e.to_string()}));
                }
            }
            ctx.report_item(i + 1, total, format!("Completed suggestion {}", suggestion.id))
                .await;
        }

        Ok(json!({
            "processed": total,
            "article_ids": articles,
            "failures": failures,
        }))
    }

    async fn process_suggestion(&self, suggestion: &ArticleSuggestion) -> Result<Vec<Article>> {
        let research = self.generation.generate_research(suggestion.id).await?;
        self.content()
            .update_research_status(research.id, ContentStatus::Approved, self.system_user_id)
            .await?;
        info!("Auto-approved research {}, writing article", research.id);
        self.generation.generate_article(research.id).await
    }

    /// Record a final failure on the record the job was working from.
    async fn record_failure(&self, job: &Job, message: &str) -> Result<()> {
        let content = self.content();
        match job {
            Job::GenerateResearch { suggestion_id } => {
                content.record_suggestion_error(*suggestion_id, message).await
            }
            Job::GenerateArticle { research_id } | Job::GenerateMediaSuggestions { research_id } => {
                content.record_research_error(*research_id, message).await
            }
            Job::FetchMediaCandidates { suggestion_id, .. } => {
                content.record_media_suggestion_error(*suggestion_id, message).await
            }
            Job::GenerateStoryPromotion { article_id }
            | Job::GenerateDidYouKnowPosts { article_id, .. } => {
                content.record_article_error(*article_id, message).await
            }
            Job::GenerateSuggestions { .. } | Job::BulkGeneration | Job::TranslateEntity { .. } => {
                Ok(())
            }
        }
    }
}

#[async_trait]
impl JobHandler for TaskRunner {
    async fn execute(&self, job: &Job, ctx: &JobContext) -> Result<Value> {
        check_preconditions(self.content(), job).await?;
        ctx.report_progress(0.0, format!("Starting {}", job.kind())).await;

        let result = match job {
            Job::GenerateSuggestions {
                category_id,
                level,
                count,
            } => {
                let created = self
                    .generation
                    .generate_suggestions(*category_id, *level, *count)
                    .await?;
                json!({"suggestion_ids": created.iter().map(|s| s.id).collect::<Vec<_>>()})
            }
            Job::GenerateResearch { suggestion_id } => {
                let research = self.generation.generate_research(*suggestion_id).await?;
                json!({"research_id": research.id})
            }
            Job::GenerateArticle { research_id } => {
                let articles = self.generation.generate_article(*research_id).await?;
                let ids: Vec<i64> = articles.iter().map(|a| a.id).collect();
                json!({"article_id": ids.first(), "article_ids": ids})
            }
            Job::GenerateMediaSuggestions { research_id } => {
                let suggestion = self.generation.generate_media_suggestions(*research_id).await?;
                json!({"media_suggestion_id": suggestion.id})
            }
            Job::FetchMediaCandidates {
                suggestion_id,
                max_per_query,
            } => {
                let created = self
                    .fetcher
                    .process_suggestion(*suggestion_id, *max_per_query)
                    .await?;
                json!({"candidate_ids": created.iter().map(|c| c.id).collect::<Vec<_>>()})
            }
            Job::GenerateStoryPromotion { article_id } => {
                let post = self.generation.generate_story_promotion(*article_id).await?;
                json!({"post_id": post.id})
            }
            Job::GenerateDidYouKnowPosts { article_id, count } => {
                let posts = self
                    .generation
                    .generate_did_you_know_posts(*article_id, *count)
                    .await?;
                json!({"post_ids": posts.iter().map(|p| p.id).collect::<Vec<_>>()})
            }
            Job::BulkGeneration => self.bulk_generate(ctx).await?,
            Job::TranslateEntity {
                entity_kind,
                entity_id,
                language,
                fields,
            } => {
                let outcome = self
                    .generation
                    .translate_entity(*entity_kind, *entity_id, language, fields)
                    .await?;
                json!({
                    "fields": outcome.fields,
                    "tokens": outcome.tokens,
                    "complete": outcome.all_succeeded(),
                })
            }
        };

        ctx.report_progress(100.0, format!("Completed {}", job.kind())).await;
        Ok(result)
    }

    async fn on_failure(&self, job: &Job, error: &ConsoleError) {
        if let Err(e) = self.record_failure(job, &error.to_string()).await {
            warn!("Could not record failure of {}: {}", job.kind(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedClient;
    use crate::content::fixtures::{category, new_suggestion};
    use crate::generation::fixtures::{approved_article, generation};
    use crate::jobs::{JobQueue, JobState, WorkerPool};
    use crate::wikimedia::{ImageSource, MediaCandidateFetcher};
    use crate::domain::ImageMetadata;
    use std::sync::Arc;
    use std::time::Duration;

    struct NoImages;

    #[async_trait]
    impl ImageSource for NoImages {
        async fn search_images(&self, _q: &str, _l: usize) -> Result<Vec<ImageMetadata>> {
            Ok(vec![])
        }
        async fn search_category(&self, _c: &str, _l: usize) -> Result<Vec<ImageMetadata>> {
            Ok(vec![])
        }
    }

    fn runner(generation: Generation) -> TaskRunner {
        let fetcher = MediaCandidateFetcher::new(generation.content().clone(), Arc::new(NoImages));
        TaskRunner::new(generation, fetcher, Some(1))
    }

    async fn run(runner: TaskRunner, job: Job) -> crate::jobs::JobRecord {
        let queue = JobQueue::new(10);
        let pool = WorkerPool::new(queue.clone(), Arc::new(runner), 1, 1, Duration::ZERO);
        let enqueued = queue.enqueue(job).await.unwrap();
        let (id, job) = queue.next().await.unwrap();
        pool.run(id, job).await;
        queue.get(enqueued.id).await.unwrap()
    }

    fn section_replies(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("## Section {i}\nText.")).collect()
    }

    #[tokio::test]
    async fn unapproved_suggestion_fails_precondition() {
        let gen = generation(ScriptedClient::new(Vec::<String>::new())).await;
        let category_id = category(gen.content()).await;
        let s = gen
            .content()
            .create_suggestion(new_suggestion(category_id, "Draft"))
            .await
            .unwrap();
        let err = check_preconditions(gen.content(), &Job::GenerateResearch { suggestion_id: s.id })
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
        assert!(check_preconditions(
            gen.content(),
            &Job::GenerateDidYouKnowPosts { article_id: 1, count: 11 }
        )
        .await
        .is_err());
    }

    #[tokio::test]
    async fn failed_research_is_recorded_on_suggestion() {
        let client = ScriptedClient::new(["# Abstract"]);
        let gen = generation(client).await;
        let category_id = category(gen.content()).await;
        let s = gen
            .content()
            .create_suggestion(new_suggestion(category_id, "Canal"))
            .await
            .unwrap();
        gen.content()
            .update_suggestion_status(s.id, ContentStatus::Approved, Some(1))
            .await
            .unwrap();

        let record = run(runner(gen.clone()), Job::GenerateResearch { suggestion_id: s.id }).await;
        assert_eq!(record.state, JobState::Failed);
        let stored = gen.content().get_suggestion(s.id).await.unwrap().unwrap();
        assert!(stored.generation.last_generation_error.is_some());
    }

    #[tokio::test]
    async fn bulk_generation_writes_articles_and_continues_past_failures() {
        // Suggestion one: 2 fixed + 2 sub-topics + 3 closing sections, then
        // outline, one section, excerpt and summary. Suggestion two runs out
        // of replies.
        let mut replies = section_replies(7);
        replies.extend([
            "## Introduction\n[END_OUTLINE]".to_string(),
            "## Introduction\nText.".into(),
            "Excerpt".into(),
            "Summary".into(),
        ]);
        let gen = generation(ScriptedClient::new(replies)).await;
        let category_id = category(gen.content()).await;
        for title in ["First", "Second"] {
            let s = gen
                .content()
                .create_suggestion(new_suggestion(category_id, title))
                .await
                .unwrap();
            gen.content()
                .update_suggestion_status(s.id, ContentStatus::Approved, Some(1))
                .await
                .unwrap();
        }

        let record = run(runner(gen.clone()), Job::BulkGeneration).await;
        assert_eq!(record.state, JobState::Finished);
        let result = record.result.unwrap();
        assert_eq!(result["processed"], 2);
        assert_eq!(result["article_ids"].as_array().unwrap().len(), 1);
        assert_eq!(result["failures"].as_array().unwrap().len(), 1);

        let research = gen.content().research_for_suggestion(1).await.unwrap();
        assert_eq!(research[0].approval.status, ContentStatus::Approved);
        assert_eq!(research[0].approval.approved_by_id, Some(1));
    }

    #[tokio::test]
    async fn malformed_reply_is_retried_until_well_formed() {
        let client = ScriptedClient::new([
            r#"{"text": "missing the content field"}"#,
            r##"{"content": "Silver on mules!", "hashtags": ["#mules"]}"##,
        ]);
        let gen = generation(client.clone()).await;
        let article_id = approved_article(&gen).await;

        let queue = JobQueue::new(10);
        let pool = WorkerPool::new(queue.clone(), Arc::new(runner(gen.clone())), 1, 2, Duration::ZERO);
        let enqueued = queue
            .enqueue(Job::GenerateStoryPromotion { article_id })
            .await
            .unwrap();
        let (id, job) = queue.next().await.unwrap();
        pool.run(id, job).await;

        let record = queue.get(enqueued.id).await.unwrap();
        assert_eq!(record.state, JobState::Finished);
        assert_eq!(record.attempts, 2);
        assert_eq!(client.prompts.lock().unwrap().len(), 2);
        let posts = gen.content().list_social_posts(Some(article_id), None).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].content, "Silver on mules!");
    }
}
