use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub requests_per_min: Option<u64>,
    pub concurrency: Option<u32>,
}

/// Token bucket over requests per minute plus an optional cap on requests
/// in flight. Clones share the same buckets.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    limits: Limits,
    // (tokens, last refill)
    rpm_tokens: Mutex<(f64, Instant)>,
    sem: Option<Arc<Semaphore>>,
}

/// Held for the duration of a request; releases the concurrency slot on drop.
#[derive(Debug)]
pub struct Permit {
    _slot: Option<OwnedSemaphorePermit>,
}

impl RateLimiter {
    pub fn new(limits: Limits) -> Self {
        let capacity = limits.requests_per_min.unwrap_or(0) as f64;
        let sem = limits
            .concurrency
            .filter(|c| *c > 0)
            .map(|c| Arc::new(Semaphore::new(c as usize)));
        Self {
            inner: Arc::new(Inner {
                limits,
                rpm_tokens: Mutex::new((capacity, Instant::now())),
                sem,
            }),
        }
    }

    pub fn per_minute(requests: u64, concurrency: Option<u32>) -> Self {
        Self::new(Limits {
            requests_per_min: Some(requests),
            concurrency,
        })
    }

    pub fn unlimited() -> Self {
        Self::new(Limits::default())
    }

    /// Wait for a concurrency slot and a request token.
    pub async fn acquire(&self) -> Permit {
        // The semaphore is never closed, so acquisition only fails if it were.
        let slot = match &self.inner.sem {
            Some(sem) => sem.clone().acquire_owned().await.ok(),
            None => None,
        };

        if let Some(rpm) = self.inner.limits.requests_per_min.filter(|r| *r > 0) {
            self.consume_token(rpm as f64, 60.0).await;
        }
        Permit { _slot: slot }
    }

    async fn consume_token(&self, capacity: f64, period_secs: f64) {
        loop {
            let mut guard = self.inner.rpm_tokens.lock().await;
            let (ref mut tokens, ref mut last) = *guard;
            let now = Instant::now();
            let elapsed = now.duration_since(*last).as_secs_f64();
            let refill_rate = capacity / period_secs;
            *tokens = (*tokens + elapsed * refill_rate).min(capacity);
            *last = now;
            if *tokens >= 1.0 {
                *tokens -= 1.0;
                break;
            }
            let secs = (1.0 - *tokens) / refill_rate;
            drop(guard);
            tokio::time::sleep(Duration::from_secs_f64(secs.max(0.001))).await;
        }
    }
}
