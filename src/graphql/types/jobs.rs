use crate::domain::User as UserRecord;
use crate::error::ConsoleError;
use crate::graphql::schema::state;
use crate::jobs::{Enqueued, JobRecord, JobState};
use async_graphql::{Context, FieldResult, Json, Object, SimpleObject, ID};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Outcome of asking for background work
#[derive(Debug, Clone, SimpleObject)]
pub struct JobEnqueueResponse {
    pub success: bool,
    pub message: String,
    pub job_id: Option<ID>,
    /// 1-based position in the queue at enqueue time
    pub position: Option<i64>,
}

impl JobEnqueueResponse {
    pub fn queued(enqueued: Enqueued) -> Self {
        Self {
            success: true,
            message: "Job created successfully".to_string(),
            job_id: Some(ID(enqueued.id.to_string())),
            position: Some(enqueued.position as i64),
        }
    }

    pub fn failed(error: &ConsoleError) -> Self {
        Self {
            success: false,
            message: format!("Failed to create job: {error}"),
            job_id: None,
            position: None,
        }
    }
}

/// A background job and its progress
#[derive(Clone)]
pub struct Job {
    pub inner: JobRecord,
}

impl From<JobRecord> for Job {
    fn from(record: JobRecord) -> Self {
        Self { inner: record }
    }
}

#[Object]
impl Job {
    async fn id(&self) -> ID {
        ID(self.inner.id.to_string())
    }

    async fn kind(&self) -> &str {
        self.inner.kind()
    }

    async fn description(&self) -> String {
        self.inner.job.describe()
    }

    async fn state(&self) -> JobState {
        self.inner.state
    }

    async fn attempts(&self) -> u32 {
        self.inner.attempts
    }

    /// Percent complete, 0 to 100
    async fn progress(&self) -> f64 {
        self.inner.progress
    }

    async fn status_message(&self) -> Option<&str> {
        self.inner.status_message.as_deref()
    }

    async fn result(&self) -> Option<Json<Value>> {
        self.inner.result.clone().map(Json)
    }

    async fn error(&self) -> Option<&str> {
        self.inner.error.as_deref()
    }

    async fn enqueued_at(&self) -> DateTime<Utc> {
        self.inner.enqueued_at
    }

    async fn started_at(&self) -> Option<DateTime<Utc>> {
        self.inner.started_at
    }

    async fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.inner.finished_at
    }

    /// Current 1-based queue position while still queued
    async fn position(&self, ctx: &Context<'_>) -> FieldResult<Option<i64>> {
        let context = state(ctx)?;
        Ok(context
            .queue
            .position(self.inner.id)
            .await
            .map(|p| p as i64))
    }
}

#[derive(Clone)]
pub struct User {
    pub inner: UserRecord,
}

impl From<UserRecord> for User {
    fn from(user: UserRecord) -> Self {
        Self { inner: user }
    }
}

#[Object]
impl User {
    async fn id(&self) -> i64 {
        self.inner.id
    }

    async fn email(&self) -> &str {
        &self.inner.email
    }

    async fn full_name(&self) -> &str {
        &self.inner.full_name
    }

    async fn active(&self) -> bool {
        self.inner.active
    }

    async fn last_login_at(&self) -> Option<DateTime<Utc>> {
        self.inner.last_login_at
    }
}
