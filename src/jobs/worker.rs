use super::{Job, JobContext, JobId, JobQueue};
use crate::error::{ConsoleError, Result};
use crate::metrics::JobMetrics;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

/// Executes jobs taken off the queue.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn execute(&self, job: &Job, ctx: &JobContext) -> Result<Value>;

    /// Called once a job has failed its last attempt.
    async fn on_failure(&self, _job: &Job, _error: &ConsoleError) {}
}

/// Fixed set of executors draining one queue.
#[derive(Clone)]
pub struct WorkerPool {
    queue: JobQueue,
    handler: Arc<dyn JobHandler>,
    workers: usize,
    max_attempts: u32,
    retry_delay: Duration,
}

impl WorkerPool {
    pub fn new(
        queue: JobQueue,
        handler: Arc<dyn JobHandler>,
        workers: usize,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            queue,
            handler,
            workers: workers.max(1),
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// Start the executors. They run until the queue is closed and drained.
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        info!("Starting {} job workers", self.workers);
        (0..self.workers)
            .map(|worker| {
                let pool = self.clone();
                tokio::spawn(async move {
                    while let Some((id, job)) = pool.queue.next().await {
                        pool.run(id, job).await;
                    }
                    info!(worker, "job worker stopped");
                })
            })
            .collect()
    }

    /// Run one job to completion, retrying retryable failures.
    #[instrument(skip(self, job), fields(job_id = %id, kind = job.kind()))]
    pub async fn run(&self, id: JobId, job: Job) {
        let kind = job.kind();
        let started = Instant::now();
        JobMetrics::record_started();

        let mut attempt = 1;
        let outcome = loop {
            self.queue.mark_running(id, attempt).await;
            let ctx = JobContext::new(id, attempt, self.queue.clone());
            match self.handler.execute(&job, &ctx).await {
                Ok(result) => break Ok(result),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(attempt, "job attempt failed, retrying: {}", e);
                    JobMetrics::record_retry(kind);
                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => break Err(e),
            }
        };

        match outcome {
            Ok(result) => {
                JobMetrics::record_finished(kind, started.elapsed(), true);
                info!(attempt, "job finished");
                self.queue.finish(id, result).await;
            }
            Err(e) => {
                JobMetrics::record_finished(kind, started.elapsed(), false);
                error!(attempt, "job failed: {}", e);
                self.handler.on_failure(&job, &e).await;
                self.queue.fail(id, e.to_string()).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobState;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Fails with the given errors in turn, then succeeds.
    struct Flaky {
        errors: Mutex<Vec<ConsoleError>>,
        calls: AtomicU32,
        failures: Mutex<Vec<String>>,
    }

    impl Flaky {
        fn new(errors: Vec<ConsoleError>) -> Arc<Self> {
            Arc::new(Self {
                errors: Mutex::new(errors),
                calls: AtomicU32::new(0),
                failures: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl JobHandler for Flaky {
        async fn execute(&self, _job: &Job, ctx: &JobContext) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ctx.report_progress(50.0, "working").await;
            let next = {
                let mut errors = self.errors.lock().unwrap();
                (!errors.is_empty()).then(|| errors.remove(0))
            };
            match next {
                Some(e) => Err(e),
                None => Ok(json!({"attempt": ctx.attempt})),
            }
        }

        async fn on_failure(&self, _job: &Job, error: &ConsoleError) {
            self.failures.lock().unwrap().push(error.to_string());
        }
    }

    fn pool(queue: &JobQueue, handler: Arc<Flaky>) -> WorkerPool {
        WorkerPool::new(queue.clone(), handler, 1, 3, Duration::ZERO)
    }

    #[tokio::test]
    async fn retryable_failures_are_retried() {
        let queue = JobQueue::new(10);
        let handler = Flaky::new(vec![ConsoleError::api("overloaded")]);
        let job = queue.enqueue(Job::BulkGeneration).await.unwrap();
        let (id, next) = queue.next().await.unwrap();
        pool(&queue, handler.clone()).run(id, next).await;

        let record = queue.get(job.id).await.unwrap();
        assert_eq!(record.state, JobState::Finished);
        assert_eq!(record.attempts, 2);
        assert_eq!(record.result, Some(json!({"attempt": 2})));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let queue = JobQueue::new(10);
        let handler = Flaky::new(vec![ConsoleError::Validation("not approved".into())]);
        let job = queue.enqueue(Job::GenerateArticle { research_id: 1 }).await.unwrap();
        let (id, next) = queue.next().await.unwrap();
        pool(&queue, handler.clone()).run(id, next).await;

        let record = queue.get(job.id).await.unwrap();
        assert_eq!(record.state, JobState::Failed);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(handler.failures.lock().unwrap().len(), 1);
        assert!(record.error.unwrap().contains("not approved"));
    }

    #[tokio::test]
    async fn attempts_are_capped() {
        let queue = JobQueue::new(10);
        let handler = Flaky::new((0..5).map(|_| ConsoleError::api("down")).collect());
        let job = queue.enqueue(Job::BulkGeneration).await.unwrap();
        let (id, next) = queue.next().await.unwrap();
        pool(&queue, handler.clone()).run(id, next).await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
        assert_eq!(queue.get(job.id).await.unwrap().state, JobState::Failed);
    }

    #[tokio::test]
    async fn spawned_workers_drain_and_stop_on_close() {
        let queue = JobQueue::new(10);
        let handler = Flaky::new(vec![]);
        let handles = WorkerPool::new(queue.clone(), handler, 2, 1, Duration::ZERO).spawn();
        let a = queue.enqueue(Job::BulkGeneration).await.unwrap();
        let b = queue.enqueue(Job::BulkGeneration).await.unwrap();

        for _ in 0..100 {
            let done_a = queue.get(a.id).await.unwrap().state.is_terminal();
            let done_b = queue.get(b.id).await.unwrap().state.is_terminal();
            if done_a && done_b {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(queue.get(a.id).await.unwrap().state, JobState::Finished);

        queue.close();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .unwrap()
                .unwrap();
        }
    }
}
