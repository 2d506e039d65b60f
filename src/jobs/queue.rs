use super::{Job, JobId, JobRecord, JobState};
use crate::error::{ConsoleError, Result};
use crate::metrics::JobMetrics;
use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{debug, info};

/// Id and 1-based queue position of an accepted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enqueued {
    pub id: JobId,
    pub position: usize,
}

/// FIFO of pending jobs plus the record of every recent job. Clones share
/// the same queue.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<Inner>,
}

struct Inner {
    pending: Mutex<VecDeque<JobId>>,
    records: RwLock<HashMap<JobId, JobRecord>>,
    // Terminal jobs in completion order, oldest first.
    finished: Mutex<VecDeque<JobId>>,
    history_limit: usize,
    notify: Notify,
    closed: AtomicBool,
}

impl JobQueue {
    pub fn new(history_limit: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(VecDeque::new()),
                records: RwLock::new(HashMap::new()),
                finished: Mutex::new(VecDeque::new()),
                history_limit: history_limit.max(1),
                notify: Notify::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub async fn enqueue(&self, job: Job) -> Result<Enqueued> {
        if self.is_closed() {
            return Err(ConsoleError::Queue("job queue is shut down".into()));
        }
        let record = JobRecord::new(job);
        let id = record.id;
        let kind = record.kind();
        self.inner.records.write().await.insert(id, record);
        let position = {
            let mut pending = self.inner.pending.lock().await;
            pending.push_back(id);
            pending.len()
        };
        self.inner.notify.notify_one();
        JobMetrics::record_enqueued(kind);
        info!(job_id = %id, kind, position, "job enqueued");
        Ok(Enqueued { id, position })
    }

    /// Wait for the next pending job. `None` once the queue is closed and drained.
    pub async fn next(&self) -> Option<(JobId, Job)> {
        loop {
            let notified = self.inner.notify.notified();
            if let Some(id) = self.inner.pending.lock().await.pop_front() {
                if let Some(record) = self.inner.records.read().await.get(&id) {
                    return Some((id, record.job.clone()));
                }
                continue;
            }
            if self.is_closed() {
                return None;
            }
            notified.await;
        }
    }

    pub async fn get(&self, id: JobId) -> Option<JobRecord> {
        self.inner.records.read().await.get(&id).cloned()
    }

    /// 1-based position among pending jobs.
    pub async fn position(&self, id: JobId) -> Option<usize> {
        self.inner
            .pending
            .lock()
            .await
            .iter()
            .position(|p| *p == id)
            .map(|i| i + 1)
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.pending.lock().await.len()
    }

    /// Most recently enqueued jobs first.
    pub async fn recent(&self, limit: usize) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self.inner.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| b.enqueued_at.cmp(&a.enqueued_at));
        records.truncate(limit);
        records
    }

    pub async fn mark_running(&self, id: JobId, attempt: u32) {
        self.update(id, |r| {
            r.state = JobState::Running;
            r.attempts = attempt;
            r.started_at.get_or_insert_with(Utc::now);
        })
        .await;
    }

    pub async fn report_progress(&self, id: JobId, progress: f64, message: Option<String>) {
        self.update(id, |r| {
            r.progress = progress.clamp(0.0, 100.0);
            if message.is_some() {
                r.status_message = message;
            }
        })
        .await;
    }

    pub async fn finish(&self, id: JobId, result: Value) {
        self.update(id, |r| {
            r.state = JobState::Finished;
            r.progress = 100.0;
            r.result = Some(result);
            r.error = None;
            r.finished_at = Some(Utc::now());
        })
        .await;
        self.retire(id).await;
    }

    pub async fn fail(&self, id: JobId, error: String) {
        self.update(id, |r| {
            r.state = JobState::Failed;
            r.error = Some(error);
            r.finished_at = Some(Utc::now());
        })
        .await;
        self.retire(id).await;
    }

    /// Stop accepting jobs and wake idle workers so they can exit.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    async fn update(&self, id: JobId, f: impl FnOnce(&mut JobRecord)) {
        if let Some(record) = self.inner.records.write().await.get_mut(&id) {
            f(record);
        }
    }

    // Drop the oldest terminal records beyond the history limit.
    async fn retire(&self, id: JobId) {
        let mut finished = self.inner.finished.lock().await;
        finished.push_back(id);
        while finished.len() > self.inner.history_limit {
            if let Some(old) = finished.pop_front() {
                self.inner.records.write().await.remove(&old);
                debug!(job_id = %old, "job record pruned");
            }
        }
    }
}

/// Handle a running job uses to report progress.
#[derive(Clone)]
pub struct JobContext {
    pub id: JobId,
    pub attempt: u32,
    queue: JobQueue,
}

impl JobContext {
    pub fn new(id: JobId, attempt: u32, queue: JobQueue) -> Self {
        Self { id, attempt, queue }
    }

    pub async fn report_progress(&self, progress: f64, message: impl Into<String>) {
        self.queue
            .report_progress(self.id, progress, Some(message.into()))
            .await;
    }

    /// Progress for item `done` of `total`, as a percentage.
    pub async fn report_item(&self, done: usize, total: usize, message: impl Into<String>) {
        let pct = if total == 0 {
            100.0
        } else {
            done as f64 / total as f64 * 100.0
        };
        self.report_progress(pct, message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn jobs_come_out_in_order_with_positions() {
        let queue = JobQueue::new(10);
        let a = queue.enqueue(Job::GenerateResearch { suggestion_id: 1 }).await.unwrap();
        let b = queue.enqueue(Job::GenerateArticle { research_id: 2 }).await.unwrap();
        assert_eq!((a.position, b.position), (1, 2));
        assert_eq!(queue.position(b.id).await, Some(2));

        let (first, job) = queue.next().await.unwrap();
        assert_eq!(first, a.id);
        assert_eq!(job, Job::GenerateResearch { suggestion_id: 1 });
        assert_eq!(queue.position(b.id).await, Some(1));
    }

    #[tokio::test]
    async fn record_tracks_lifecycle() {
        let queue = JobQueue::new(10);
        let job = queue.enqueue(Job::BulkGeneration).await.unwrap();
        queue.next().await.unwrap();
        queue.mark_running(job.id, 1).await;
        queue.report_progress(job.id, 50.0, Some("half".into())).await;

        let running = queue.get(job.id).await.unwrap();
        assert_eq!(running.state, JobState::Running);
        assert_eq!(running.status_message.as_deref(), Some("half"));

        queue.finish(job.id, json!({"ok": true})).await;
        let done = queue.get(job.id).await.unwrap();
        assert_eq!(done.state, JobState::Finished);
        assert_eq!(done.progress, 100.0);
        assert!(done.finished_at.is_some());
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let queue = JobQueue::new(1);
        let a = queue.enqueue(Job::BulkGeneration).await.unwrap();
        let b = queue.enqueue(Job::BulkGeneration).await.unwrap();
        queue.fail(a.id, "boom".into()).await;
        queue.finish(b.id, json!(null)).await;
        assert!(queue.get(a.id).await.is_none());
        assert!(queue.get(b.id).await.is_some());
    }

    #[tokio::test]
    async fn closed_queue_rejects_and_releases_waiters() {
        let queue = JobQueue::new(10);
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.next().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close();
        let next = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(next.is_none());
        assert!(queue.enqueue(Job::BulkGeneration).await.is_err());
    }
}
