//! CRUD over the editorial records.
//!
//! [`ContentService`] owns every read and write the API performs. Its
//! operations are split by area across the submodules; each validates input
//! and references before touching storage.

pub mod media;
pub mod pipeline;
pub mod query;
pub mod social;
pub mod taxonomy;
pub mod translations;

pub use media::{MediaMetadataInput, Upload};
pub use pipeline::{ArticleInput, ArticleSuggestionInput, NewArticle, NewResearch, NewSuggestion};
pub use query::{ListParams, Page, SortDirection};
pub use social::{HashtagGroupInput, NewSocialPost, SocialPostInput};
pub use taxonomy::{CategoryInput, TagInput, TaxonomyInput};
pub use translations::{LanguageInput, NewTranslation, TranslationGap};

use crate::config::MediaConfig;
use crate::error::{ConsoleError, Result};
use crate::storage::Repository;

#[derive(Clone)]
pub struct ContentService {
    repo: Repository,
    media: MediaConfig,
}

impl ContentService {
    pub fn new(repo: Repository, media: MediaConfig) -> Self {
        Self { repo, media }
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn media_config(&self) -> &MediaConfig {
        &self.media
    }
}

/// Trimmed `value`, or a validation error naming `field` when it is blank.
pub(crate) fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConsoleError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}
