//! Editorial status transitions and pipeline gates.

use crate::domain::{Approval, ContentStatus};
use crate::error::{ConsoleError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

impl Approval {
    /// Move to `to`. Approving records who and when; any other state clears
    /// the stamp so a re-approval is always attributed to its latest actor.
    pub fn transition(&mut self, to: ContentStatus, actor: Option<i64>, now: DateTime<Utc>) {
        self.status = to;
        if to == ContentStatus::Approved {
            self.approved_by_id = actor;
            self.approved_at = Some(now);
        } else {
            self.approved_by_id = None;
            self.approved_at = None;
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == ContentStatus::Approved
    }
}

/// Fails with a validation error unless `status` is APPROVED.
pub fn ensure_approved(entity: &str, id: i64, status: ContentStatus) -> Result<()> {
    if status == ContentStatus::Approved {
        Ok(())
    } else {
        Err(ConsoleError::Validation(format!(
            "{entity} {id} must be approved (current status: {})",
            status.as_str()
        )))
    }
}

/// Where a piece of content sits in the suggestion → published pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, async_graphql::Enum)]
pub enum Stage {
    Suggestion,
    Research,
    Article,
    Published,
}

impl Stage {
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Suggestion => Some(Stage::Research),
            Stage::Research => Some(Stage::Article),
            Stage::Article => Some(Stage::Published),
            Stage::Published => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, async_graphql::SimpleObject)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn tally<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = ContentStatus>,
    {
        statuses
            .into_iter()
            .fold(Self::default(), |mut counts, status| {
                match status {
                    ContentStatus::Pending => counts.pending += 1,
                    ContentStatus::Approved => counts.approved += 1,
                    ContentStatus::Rejected => counts.rejected += 1,
                }
                counts
            })
    }

    pub fn total(&self) -> usize {
        self.pending + self.approved + self.rejected
    }
}

/// Per-stage status counts for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, async_graphql::SimpleObject)]
pub struct PipelineStats {
    pub suggestions: StatusCounts,
    pub research: StatusCounts,
    pub articles: StatusCounts,
    pub published_articles: usize,
    pub tags: StatusCounts,
    pub social_posts: StatusCounts,
    pub media_candidates: StatusCounts,
}
