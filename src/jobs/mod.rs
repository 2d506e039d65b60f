//! In-process background jobs.
//!
//! Mutations enqueue a [`Job`] on the [`JobQueue`] and return its id right
//! away. A [`WorkerPool`] drains the queue with a fixed number of executors
//! and hands each job to a [`JobHandler`], normally the [`TaskRunner`].
//! Clients poll the job record for state and progress.

pub mod queue;
pub mod tasks;
pub mod worker;

pub use queue::{Enqueued, JobContext, JobQueue};
pub use tasks::{check_preconditions, TaskRunner};
pub use worker::{JobHandler, WorkerPool};

use crate::domain::{ArticleLevel, TranslatableKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub type JobId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Job {
    GenerateSuggestions {
        category_id: i64,
        level: ArticleLevel,
        count: u32,
    },
    GenerateResearch {
        suggestion_id: i64,
    },
    GenerateArticle {
        research_id: i64,
    },
    GenerateMediaSuggestions {
        research_id: i64,
    },
    FetchMediaCandidates {
        suggestion_id: i64,
        max_per_query: usize,
    },
    GenerateStoryPromotion {
        article_id: i64,
    },
    GenerateDidYouKnowPosts {
        article_id: i64,
        count: u32,
    },
    BulkGeneration,
    TranslateEntity {
        entity_kind: TranslatableKind,
        entity_id: i64,
        language: String,
        #[serde(default)]
        fields: Vec<String>,
    },
}

impl Job {
    pub fn kind(&self) -> &'static str {
        match self {
            Job::GenerateSuggestions { .. } => "generate_suggestions",
            Job::GenerateResearch { .. } => "generate_research",
            Job::GenerateArticle { .. } => "generate_article",
            Job::GenerateMediaSuggestions { .. } => "generate_media_suggestions",
            Job::FetchMediaCandidates { .. } => "fetch_media_candidates",
            Job::GenerateStoryPromotion { .. } => "generate_story_promotion",
            Job::GenerateDidYouKnowPosts { .. } => "generate_did_you_know_posts",
            Job::BulkGeneration => "bulk_generation",
            Job::TranslateEntity { .. } => "translate_entity",
        }
    }

    /// Human readable summary used in enqueue responses.
    pub fn describe(&self) -> String {
        match self {
            Job::GenerateSuggestions { category_id, count, .. } => {
                format!("Generating {count} suggestions for category {category_id}")
            }
            Job::GenerateResearch { suggestion_id } => {
                format!("Generating research for suggestion {suggestion_id}")
            }
            Job::GenerateArticle { research_id } => {
                format!("Generating article for research {research_id}")
            }
            Job::GenerateMediaSuggestions { research_id } => {
                format!("Generating media suggestions for research {research_id}")
            }
            Job::FetchMediaCandidates { suggestion_id, .. } => {
                format!("Fetching media candidates for suggestion {suggestion_id}")
            }
            Job::GenerateStoryPromotion { article_id } => {
                format!("Generating story promotion for article {article_id}")
            }
            Job::GenerateDidYouKnowPosts { article_id, count } => {
                format!("Generating {count} did-you-know posts for article {article_id}")
            }
            Job::BulkGeneration => "Generating research and articles for approved suggestions".into(),
            Job::TranslateEntity {
                entity_kind,
                entity_id,
                language,
                ..
            } => format!(
                "Translating {} {entity_id} into {language}",
                entity_kind.as_str()
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, async_graphql::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    Running,
    Finished,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Finished | JobState::Failed)
    }
}

/// Everything known about one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub job: Job,
    pub state: JobState,
    pub attempts: u32,
    /// 0..=100
    pub progress: f64,
    pub status_message: Option<String>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn new(job: Job) -> Self {
        Self {
            id: Uuid::new_v4(),
            job,
            state: JobState::Queued,
            attempts: 0,
            progress: 0.0,
            status_message: None,
            result: None,
            error: None,
            enqueued_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.job.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_serialize_with_kind_tag() {
        let job = Job::GenerateResearch { suggestion_id: 7 };
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["kind"], "generate_research");
        assert_eq!(value["suggestion_id"], 7);
        assert_eq!(job.kind(), "generate_research");
    }

    #[test]
    fn new_record_is_queued() {
        let record = JobRecord::new(Job::BulkGeneration);
        assert_eq!(record.state, JobState::Queued);
        assert!(!record.state.is_terminal());
        assert_eq!(record.attempts, 0);
    }
}
