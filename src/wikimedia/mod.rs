//! Wikimedia Commons lookups that turn media suggestions into candidates.

pub mod client;
pub mod metadata;

pub use client::{RetryPolicy, WikimediaClient};

use crate::content::ContentService;
use crate::domain::{ImageMetadata, MediaCandidate, MediaSuggestion};
use crate::error::Result;
use crate::metrics::WikimediaMetrics;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Somewhere images can be searched for.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn search_images(&self, query: &str, limit: usize) -> Result<Vec<ImageMetadata>>;

    /// Files in a Commons category; the `Category:` prefix is optional.
    async fn search_category(&self, category: &str, limit: usize) -> Result<Vec<ImageMetadata>>;
}

/// Stores search results for a media suggestion as PENDING candidates.
#[derive(Clone)]
pub struct MediaCandidateFetcher {
    content: ContentService,
    source: Arc<dyn ImageSource>,
}

impl MediaCandidateFetcher {
    pub fn new(content: ContentService, source: Arc<dyn ImageSource>) -> Self {
        Self { content, source }
    }

    /// Search every category, then every query, of the suggestion. A source
    /// that fails is logged and skipped; images already stored for the
    /// suggestion are not stored twice.
    #[instrument(skip(self))]
    pub async fn process_suggestion(
        &self,
        suggestion_id: i64,
        max_per_query: usize,
    ) -> Result<Vec<MediaCandidate>> {
        let suggestion: MediaSuggestion = self.content.repo().require(suggestion_id).await?;
        let mut seen: HashSet<String> = self
            .content
            .candidates_for_suggestion(suggestion.id)
            .await?
            .into_iter()
            .map(|c| c.image.commons_id)
            .collect();

        let mut created = Vec::new();
        for category in &suggestion.commons_categories {
            match self.source.search_category(category, max_per_query).await {
                Ok(images) => {
                    created.extend(self.store(suggestion.id, images, &mut seen).await?)
                }
                Err(e) => error!("Error processing category '{}': {}", category, e),
            }
        }
        for query in &suggestion.search_queries {
            match self.source.search_images(query, max_per_query).await {
                Ok(images) => {
                    created.extend(self.store(suggestion.id, images, &mut seen).await?)
                }
                Err(e) => error!("Error processing query '{}': {}", query, e),
            }
        }

        WikimediaMetrics::record_candidates(created.len());
        info!(
            "Stored {} media candidates for suggestion {}",
            created.len(),
            suggestion.id
        );
        Ok(created)
    }

    async fn store(
        &self,
        suggestion_id: i64,
        images: Vec<ImageMetadata>,
        seen: &mut HashSet<String>,
    ) -> Result<Vec<MediaCandidate>> {
        let mut created = Vec::new();
        for image in images {
            if !seen.insert(image.commons_id.clone()) {
                continue;
            }
            created.push(self.content.create_candidate(suggestion_id, image).await?);
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::fixtures::service;
    use crate::domain::ContentStatus;
    use crate::error::ConsoleError;

    fn image(id: &str) -> ImageMetadata {
        ImageMetadata {
            commons_id: id.to_string(),
            commons_url: format!("https://upload.wikimedia.org/{id}"),
            title: id.to_string(),
            description: None,
            author: None,
            license: "cc0".into(),
            license_url: None,
            width: 10,
            height: 10,
            mime_type: "image/png".into(),
            file_size: 100,
        }
    }

    struct FakeSource;

    #[async_trait]
    impl ImageSource for FakeSource {
        async fn search_images(&self, query: &str, _limit: usize) -> Result<Vec<ImageMetadata>> {
            match query {
                "broken" => Err(ConsoleError::api("HTTP 503")),
                _ => Ok(vec![image("File:Locks.jpg"), image("File:Ship.jpg")]),
            }
        }

        async fn search_category(&self, _category: &str, _limit: usize) -> Result<Vec<ImageMetadata>> {
            Ok(vec![image("File:Locks.jpg")])
        }
    }

    #[tokio::test]
    async fn duplicates_and_failing_queries_are_skipped() {
        let content = service();
        let id = crate::content::fixtures::media_suggestion(&content).await;
        let fetcher = MediaCandidateFetcher::new(content.clone(), Arc::new(FakeSource));

        let created = fetcher.process_suggestion(id, 10).await.unwrap();
        let ids: Vec<_> = created.iter().map(|c| c.image.commons_id.as_str()).collect();
        assert_eq!(ids, vec!["File:Locks.jpg", "File:Ship.jpg"]);
        assert!(created.iter().all(|c| c.status == ContentStatus::Pending));

        // A second run finds nothing new.
        assert!(fetcher.process_suggestion(id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_suggestion_is_not_found() {
        let fetcher = MediaCandidateFetcher::new(service(), Arc::new(FakeSource));
        let err = fetcher.process_suggestion(99, 10).await.unwrap_err();
        assert!(matches!(err, ConsoleError::NotFound { .. }));
    }
}
