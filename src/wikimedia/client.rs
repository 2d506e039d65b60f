use super::metadata::{pages_metadata, EXTMETADATA_FILTER};
use super::ImageSource;
use crate::ai::RateLimiter;
use crate::config::WikimediaConfig;
use crate::domain::ImageMetadata;
use crate::error::{ConsoleError, Result};
use crate::metrics::WikimediaMetrics;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Exponential backoff between attempts of one Commons request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `step` (0-based): 2^step seconds clamped
    /// to `[min_delay, max_delay]`.
    pub fn delay_for(&self, step: u32) -> Duration {
        let secs = 2u64.saturating_pow(step);
        Duration::from_secs(secs).clamp(self.min_delay, self.max_delay)
    }
}

/// Commons `api.php` client.
pub struct WikimediaClient {
    http: reqwest::Client,
    endpoint: String,
    limiter: RateLimiter,
    retry: RetryPolicy,
    batch_size: usize,
    batch_delay: Duration,
}

impl WikimediaClient {
    pub fn new(config: &WikimediaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            limiter: RateLimiter::per_minute(config.requests_per_minute, None),
            retry: RetryPolicy::default(),
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn get_once(&self, params: &[(&str, String)]) -> Result<Value> {
        let _permit = self.limiter.acquire().await;
        let response = self.http.get(&self.endpoint).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConsoleError::api(format!(
                "HTTP {status} error from Wikimedia: {body}"
            )));
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ConsoleError::api(format!("Invalid JSON in Wikimedia response: {e}"))
        })
    }

    /// GET with the retry policy applied to retryable failures.
    async fn get_json(&self, params: &[(&str, String)]) -> Result<Value> {
        let mut attempt = 1;
        loop {
            match self.get_once(params).await {
                Ok(body) => {
                    WikimediaMetrics::record_request(true);
                    return Ok(body);
                }
                Err(e) => {
                    WikimediaMetrics::record_request(false);
                    if !e.is_retryable() || attempt >= self.retry.max_attempts {
                        return Err(e);
                    }
                    let delay = self.retry.delay_for(attempt - 1);
                    warn!(attempt, ?delay, "Commons request failed, retrying: {}", e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn category_members(&self, category: &str, limit: usize) -> Result<Vec<String>> {
        let params = [
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("list", "categorymembers".to_string()),
            ("cmtype", "file".to_string()),
            ("cmtitle", format!("Category:{category}")),
            ("cmlimit", limit.to_string()),
        ];
        let body = self.get_json(&params).await?;
        Ok(body
            .pointer("/query/categorymembers")
            .and_then(Value::as_array)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|m| m.get("title").and_then(Value::as_str).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Metadata for file titles, fetched in batches. A failed batch is
    /// logged and skipped.
    async fn files_metadata(&self, titles: &[String]) -> Vec<ImageMetadata> {
        let mut results = Vec::new();
        for (i, batch) in titles.chunks(self.batch_size).enumerate() {
            if i > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
            let params = [
                ("action", "query".to_string()),
                ("format", "json".to_string()),
                ("prop", "imageinfo".to_string()),
                ("titles", batch.join("|")),
                ("iiprop", "url|size|mime|extmetadata".to_string()),
                ("iiextmetadatafilter", EXTMETADATA_FILTER.to_string()),
            ];
            match self.get_json(&params).await {
                Ok(body) => results.extend(pages_metadata(&body)),
                Err(e) => warn!("Error fetching file batch {}: {}", i, e),
            }
        }
        results
    }
}

#[async_trait]
impl ImageSource for WikimediaClient {
    #[instrument(skip(self))]
    async fn search_images(&self, query: &str, limit: usize) -> Result<Vec<ImageMetadata>> {
        let params = [
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("generator", "search".to_string()),
            ("gsrnamespace", "6".to_string()),
            ("gsrsearch", format!("filetype:bitmap|drawing {query}")),
            ("gsrlimit", limit.to_string()),
            ("prop", "imageinfo".to_string()),
            ("iiprop", "url|size|mime|extmetadata".to_string()),
            ("iiextmetadatafilter", EXTMETADATA_FILTER.to_string()),
        ];
        let body = self.get_json(&params).await?;
        let images = pages_metadata(&body);
        debug!(found = images.len(), "search complete");
        Ok(images)
    }

    #[instrument(skip(self))]
    async fn search_category(&self, category: &str, limit: usize) -> Result<Vec<ImageMetadata>> {
        let category = category.trim().trim_start_matches("Category:");
        let titles = self.category_members(category, limit).await?;
        if titles.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.files_metadata(&titles).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_clamped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(10), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn unreachable_endpoint_gives_up_after_max_attempts() {
        let config = WikimediaConfig {
            endpoint: "http://127.0.0.1:9/w/api.php".into(),
            requests_per_minute: 0,
            ..WikimediaConfig::default()
        };
        let client = WikimediaClient::new(&config).unwrap().with_retry(RetryPolicy {
            max_attempts: 2,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        });
        assert!(client.search_images("Gatun", 5).await.is_err());
    }
}
