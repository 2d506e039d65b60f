//! Prometheus metrics for jobs, AI calls and Commons requests.
//!
//! Every metric name lives in [`MetricName`] so the catalog can be listed and
//! checked in one place. Recording goes through the per-area structs below.

use std::net::SocketAddr;
use std::sync::Once;
use std::time::Duration;
use tracing::{info, warn};

static INIT: Once = Once::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    JobsEnqueued,
    JobsCompleted,
    JobsFailed,
    JobsRetried,
    JobDurationSeconds,
    JobsRunning,
    AiRequests,
    AiErrors,
    AiInputTokens,
    AiOutputTokens,
    AiRequestDurationSeconds,
    WikimediaRequests,
    WikimediaErrors,
    MediaCandidatesCreated,
}

impl MetricName {
    pub const ALL: [MetricName; 14] = [
        MetricName::JobsEnqueued,
        MetricName::JobsCompleted,
        MetricName::JobsFailed,
        MetricName::JobsRetried,
        MetricName::JobDurationSeconds,
        MetricName::JobsRunning,
        MetricName::AiRequests,
        MetricName::AiErrors,
        MetricName::AiInputTokens,
        MetricName::AiOutputTokens,
        MetricName::AiRequestDurationSeconds,
        MetricName::WikimediaRequests,
        MetricName::WikimediaErrors,
        MetricName::MediaCandidatesCreated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::JobsEnqueued => "console_jobs_enqueued_total",
            MetricName::JobsCompleted => "console_jobs_completed_total",
            MetricName::JobsFailed => "console_jobs_failed_total",
            MetricName::JobsRetried => "console_jobs_retried_total",
            MetricName::JobDurationSeconds => "console_job_duration_seconds",
            MetricName::JobsRunning => "console_jobs_running",
            MetricName::AiRequests => "console_ai_requests_total",
            MetricName::AiErrors => "console_ai_errors_total",
            MetricName::AiInputTokens => "console_ai_input_tokens_total",
            MetricName::AiOutputTokens => "console_ai_output_tokens_total",
            MetricName::AiRequestDurationSeconds => "console_ai_request_duration_seconds",
            MetricName::WikimediaRequests => "console_wikimedia_requests_total",
            MetricName::WikimediaErrors => "console_wikimedia_errors_total",
            MetricName::MediaCandidatesCreated => "console_media_candidates_created_total",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            MetricName::JobsEnqueued => "Jobs accepted by the queue",
            MetricName::JobsCompleted => "Jobs that finished successfully",
            MetricName::JobsFailed => "Jobs that failed after their last attempt",
            MetricName::JobsRetried => "Job attempts that were retried",
            MetricName::JobDurationSeconds => "Wall time of a job including retries",
            MetricName::JobsRunning => "Jobs currently executing",
            MetricName::AiRequests => "Completion requests sent to AI providers",
            MetricName::AiErrors => "Failed completion requests",
            MetricName::AiInputTokens => "Prompt tokens billed",
            MetricName::AiOutputTokens => "Completion tokens billed",
            MetricName::AiRequestDurationSeconds => "Latency of completion requests",
            MetricName::WikimediaRequests => "Requests sent to the Commons API",
            MetricName::WikimediaErrors => "Failed Commons API requests",
            MetricName::MediaCandidatesCreated => "Media candidates stored from Commons",
        }
    }
}

/// Install the Prometheus recorder with an HTTP listener on `addr`.
/// Idempotent; later calls are ignored.
pub fn init_metrics(addr: SocketAddr) {
    INIT.call_once(|| {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
        match builder.install() {
            Ok(()) => {
                for name in MetricName::ALL {
                    match name {
                        MetricName::JobsRunning => {
                            ::metrics::describe_gauge!(name.as_str(), name.help())
                        }
                        MetricName::JobDurationSeconds | MetricName::AiRequestDurationSeconds => {
                            ::metrics::describe_histogram!(name.as_str(), name.help())
                        }
                        _ => ::metrics::describe_counter!(name.as_str(), name.help()),
                    }
                }
                info!("Prometheus exporter listening on http://{}/metrics", addr);
            }
            Err(e) => warn!("Prometheus exporter install failed: {}", e),
        }
    });
}

pub struct JobMetrics;

impl JobMetrics {
    pub fn record_enqueued(kind: &'static str) {
        ::metrics::counter!(MetricName::JobsEnqueued.as_str(), "kind" => kind).increment(1);
    }

    pub fn record_started() {
        ::metrics::gauge!(MetricName::JobsRunning.as_str()).increment(1.0);
    }

    pub fn record_finished(kind: &'static str, elapsed: Duration, success: bool) {
        ::metrics::gauge!(MetricName::JobsRunning.as_str()).decrement(1.0);
        let name = if success {
            MetricName::JobsCompleted
        } else {
            MetricName::JobsFailed
        };
        ::metrics::counter!(name.as_str(), "kind" => kind).increment(1);
        ::metrics::histogram!(MetricName::JobDurationSeconds.as_str(), "kind" => kind)
            .record(elapsed.as_secs_f64());
    }

    pub fn record_retry(kind: &'static str) {
        ::metrics::counter!(MetricName::JobsRetried.as_str(), "kind" => kind).increment(1);
    }
}

pub struct AiMetrics;

impl AiMetrics {
    pub fn record_success(provider: &'static str, elapsed: Duration, input: i64, output: i64) {
        ::metrics::counter!(MetricName::AiRequests.as_str(), "provider" => provider).increment(1);
        ::metrics::counter!(MetricName::AiInputTokens.as_str(), "provider" => provider)
            .increment(input.max(0) as u64);
        ::metrics::counter!(MetricName::AiOutputTokens.as_str(), "provider" => provider)
            .increment(output.max(0) as u64);
        ::metrics::histogram!(MetricName::AiRequestDurationSeconds.as_str(), "provider" => provider)
            .record(elapsed.as_secs_f64());
    }

    pub fn record_error(provider: &'static str) {
        ::metrics::counter!(MetricName::AiRequests.as_str(), "provider" => provider).increment(1);
        ::metrics::counter!(MetricName::AiErrors.as_str(), "provider" => provider).increment(1);
    }
}

pub struct WikimediaMetrics;

impl WikimediaMetrics {
    pub fn record_request(success: bool) {
        ::metrics::counter!(MetricName::WikimediaRequests.as_str()).increment(1);
        if !success {
            ::metrics::counter!(MetricName::WikimediaErrors.as_str()).increment(1);
        }
    }

    pub fn record_candidates(count: usize) {
        ::metrics::counter!(MetricName::MediaCandidatesCreated.as_str()).increment(count as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn metric_names_are_unique_and_prefixed() {
        let names: HashSet<_> = MetricName::ALL.iter().map(|m| m.as_str()).collect();
        assert_eq!(names.len(), MetricName::ALL.len());
        assert!(names.iter().all(|n| n.starts_with("console_")));
    }

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        JobMetrics::record_enqueued("generate_research");
        AiMetrics::record_error("anthropic");
        WikimediaMetrics::record_request(false);
    }
}
