use super::ContentService;
use crate::domain::{
    ContentStatus, GenerationMeta, ImageMetadata, InstagramMediaType, Media, MediaCandidate,
    MediaSource, MediaSuggestion, MediaType, Research,
};
use crate::error::{ConsoleError, Result};
use chrono::Utc;
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A file received through the upload endpoint.
#[derive(Debug, Clone)]
pub struct Upload {
    pub original_filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Partial media update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, async_graphql::InputObject)]
pub struct MediaMetadataInput {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub alt_text: Option<String>,
    pub instagram_media_type: Option<InstagramMediaType>,
}

fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

fn attribution(image: &ImageMetadata) -> String {
    match image.author.as_deref().filter(|a| !a.is_empty()) {
        Some(author) => format!("{} / {} via Wikimedia Commons", author, image.license),
        None => format!("{} via Wikimedia Commons", image.license),
    }
}

impl ContentService {
    /// Library items, newest first.
    pub async fn list_media(&self, media_type: Option<MediaType>) -> Result<Vec<Media>> {
        let mut items = self
            .repo
            .find(|m: &Media| media_type.map_or(true, |t| m.media_type == t))
            .await?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    pub async fn get_media(&self, id: i64) -> Result<Option<Media>> {
        self.repo.get(id).await
    }

    pub fn media_public_url(&self, media: &Media) -> Option<String> {
        media.public_url(&self.media.public_base_url)
    }

    pub async fn update_media_metadata(&self, id: i64, input: MediaMetadataInput) -> Result<Media> {
        let mut media: Media = self.repo.require(id).await?;
        if let Some(title) = input.title {
            media.title = Some(title);
        }
        if let Some(caption) = input.caption {
            media.caption = Some(caption);
        }
        if let Some(alt_text) = input.alt_text {
            media.alt_text = Some(alt_text);
        }
        if let Some(kind) = input.instagram_media_type {
            media.instagram_media_type = Some(kind);
        }
        media.updated_at = Utc::now();
        self.repo.update(&media).await?;
        Ok(media)
    }

    /// Store an uploaded file under the upload directory with a generated
    /// unique name and register it in the library.
    pub async fn create_media_from_upload(&self, upload: Upload) -> Result<Media> {
        let original = upload.original_filename.trim().to_string();
        if original.is_empty() {
            return Err(ConsoleError::Validation("No file selected".into()));
        }
        let ext = Path::new(&original)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !self
            .media
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
        {
            return Err(ConsoleError::Validation(format!(
                "File type '{ext}' is not allowed"
            )));
        }
        if upload.bytes.len() > self.media.max_upload_bytes {
            return Err(ConsoleError::Validation(format!(
                "File exceeds the {} byte upload limit",
                self.media.max_upload_bytes
            )));
        }

        let mime_type = upload
            .content_type
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
            .unwrap_or_else(|| mime_for_extension(&ext).to_string());
        let filename = format!("{}.{}", Uuid::new_v4(), ext);

        tokio::fs::create_dir_all(&self.media.upload_dir).await?;
        let path = self.media.upload_dir.join(&filename);
        tokio::fs::write(&path, &upload.bytes).await?;
        debug!("Wrote {} bytes to {}", upload.bytes.len(), path.display());

        let now = Utc::now();
        let created = self
            .repo
            .create(Media {
                id: 0,
                filename,
                original_filename: original.clone(),
                file_path: path.to_string_lossy().into_owned(),
                file_size: upload.bytes.len() as i64,
                media_type: MediaType::from_mime(&mime_type),
                mime_type,
                source: MediaSource::Local,
                title: Some(original.clone()),
                caption: None,
                alt_text: Some(original),
                external_url: None,
                width: None,
                height: None,
                attribution: None,
                instagram_media_type: None,
                created_at: now,
                updated_at: now,
            })
            .await;
        let media = match created {
            Ok(media) => media,
            Err(e) => {
                if let Err(remove) = tokio::fs::remove_file(&path).await {
                    warn!("Failed to remove orphaned upload {}: {}", path.display(), remove);
                }
                return Err(e);
            }
        };
        info!("Stored upload {} as media {}", media.original_filename, media.id);
        Ok(media)
    }

    // Media suggestions

    pub async fn create_media_suggestion(
        &self,
        research_id: i64,
        commons_categories: Vec<String>,
        search_queries: Vec<String>,
        illustration_topics: Vec<String>,
        reasoning: String,
        generation: GenerationMeta,
    ) -> Result<MediaSuggestion> {
        self.repo.require::<Research>(research_id).await?;
        let now = Utc::now();
        self.repo
            .create(MediaSuggestion {
                id: 0,
                research_id,
                commons_categories,
                search_queries,
                illustration_topics,
                reasoning,
                generation,
                created_at: now,
                updated_at: now,
            })
            .await
    }

    pub async fn list_media_suggestions(&self) -> Result<Vec<MediaSuggestion>> {
        self.repo.list().await
    }

    pub async fn get_media_suggestion(&self, id: i64) -> Result<Option<MediaSuggestion>> {
        self.repo.get(id).await
    }

    pub async fn record_media_suggestion_error(&self, id: i64, error: &str) -> Result<()> {
        let mut suggestion: MediaSuggestion = self.repo.require(id).await?;
        suggestion.generation.last_generation_error = Some(error.to_string());
        self.repo.update(&suggestion).await
    }

    // Candidates

    pub async fn create_candidate(
        &self,
        suggestion_id: i64,
        image: ImageMetadata,
    ) -> Result<MediaCandidate> {
        self.repo.require::<MediaSuggestion>(suggestion_id).await?;
        let now = Utc::now();
        self.repo
            .create(MediaCandidate {
                id: 0,
                suggestion_id,
                image,
                status: ContentStatus::Pending,
                reviewed_by_id: None,
                reviewed_at: None,
                review_notes: None,
                media_id: None,
                created_at: now,
                updated_at: now,
            })
            .await
    }

    /// Candidates, newest first.
    pub async fn list_candidates(&self, status: Option<ContentStatus>) -> Result<Vec<MediaCandidate>> {
        let mut items = self
            .repo
            .find(|c: &MediaCandidate| status.map_or(true, |s| c.status == s))
            .await?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    pub async fn candidates_for_suggestion(&self, suggestion_id: i64) -> Result<Vec<MediaCandidate>> {
        self.repo
            .find(|c: &MediaCandidate| c.suggestion_id == suggestion_id)
            .await
    }

    pub async fn update_candidate_status(
        &self,
        id: i64,
        status: ContentStatus,
        notes: Option<String>,
        reviewer: Option<i64>,
    ) -> Result<MediaCandidate> {
        let mut candidate: MediaCandidate = self.repo.require(id).await?;
        let now = Utc::now();
        candidate.status = status;
        candidate.review_notes = notes;
        candidate.reviewed_by_id = reviewer;
        candidate.reviewed_at = Some(now);
        candidate.updated_at = now;
        self.repo.update(&candidate).await?;
        Ok(candidate)
    }

    /// Approve a candidate and import it into the media library. Calling it
    /// again on an already imported candidate returns it unchanged.
    pub async fn approve_candidate_and_create_media(
        &self,
        id: i64,
        notes: Option<String>,
        reviewer: Option<i64>,
    ) -> Result<MediaCandidate> {
        let mut candidate: MediaCandidate = self.repo.require(id).await?;
        if candidate.status == ContentStatus::Approved && candidate.media_id.is_some() {
            return Ok(candidate);
        }

        let image = &candidate.image;
        let now = Utc::now();
        let media = self
            .repo
            .create(Media {
                id: 0,
                filename: image
                    .commons_id
                    .trim_start_matches("File:")
                    .to_string(),
                original_filename: image.commons_id.clone(),
                file_path: image.commons_url.clone(),
                file_size: image.file_size,
                mime_type: image.mime_type.clone(),
                media_type: MediaType::from_mime(&image.mime_type),
                source: MediaSource::Wikimedia,
                title: Some(image.title.clone()),
                caption: image.description.clone(),
                alt_text: Some(image.title.clone()),
                external_url: Some(image.commons_url.clone()),
                width: Some(image.width),
                height: Some(image.height),
                attribution: Some(attribution(image)),
                instagram_media_type: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        candidate.status = ContentStatus::Approved;
        candidate.review_notes = notes;
        candidate.reviewed_by_id = reviewer;
        candidate.reviewed_at = Some(now);
        candidate.media_id = Some(media.id);
        candidate.updated_at = now;
        self.repo.update(&candidate).await?;
        info!("Imported candidate {} as media {}", candidate.id, media.id);
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaConfig;
    use crate::storage::Repository;

    fn service_with_uploads(dir: &Path) -> ContentService {
        let media = MediaConfig {
            upload_dir: dir.to_path_buf(),
            max_upload_bytes: 8,
            ..MediaConfig::default()
        };
        ContentService::new(Repository::in_memory(), media)
    }

    fn image() -> ImageMetadata {
        ImageMetadata {
            commons_id: "File:Canal locks.jpg".into(),
            commons_url: "https://upload.wikimedia.org/canal.jpg".into(),
            title: "Canal locks".into(),
            description: Some("Miraflores locks".into()),
            author: Some("Jane Doe".into()),
            license: "CC BY-SA 4.0".into(),
            license_url: None,
            width: 800,
            height: 600,
            mime_type: "image/jpeg".into(),
            file_size: 1024,
        }
    }

    #[tokio::test]
    async fn upload_validates_and_writes_unique_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with_uploads(dir.path());

        let media = service
            .create_media_from_upload(Upload {
                original_filename: "Canal.PNG".into(),
                content_type: None,
                bytes: b"png!".to_vec(),
            })
            .await
            .unwrap();
        assert!(media.filename.ends_with(".png"));
        assert_eq!(media.mime_type, "image/png");
        assert_eq!(media.media_type, MediaType::Image);
        assert!(dir.path().join(&media.filename).exists());
        assert_eq!(
            service.media_public_url(&media),
            Some(format!("/content/uploads/{}", media.filename))
        );

        let too_big = service
            .create_media_from_upload(Upload {
                original_filename: "big.png".into(),
                content_type: None,
                bytes: vec![0; 9],
            })
            .await;
        assert!(matches!(too_big, Err(ConsoleError::Validation(_))));

        let wrong_type = service
            .create_media_from_upload(Upload {
                original_filename: "run.exe".into(),
                content_type: None,
                bytes: vec![0; 2],
            })
            .await;
        assert!(matches!(wrong_type, Err(ConsoleError::Validation(_))));
    }

    #[tokio::test]
    async fn approving_candidate_imports_media_once() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with_uploads(dir.path());
        let suggestion_id = crate::content::fixtures::media_suggestion(&service).await;
        let candidate = service.create_candidate(suggestion_id, image()).await.unwrap();

        let approved = service
            .approve_candidate_and_create_media(candidate.id, Some("great".into()), Some(3))
            .await
            .unwrap();
        assert_eq!(approved.status, ContentStatus::Approved);
        assert_eq!(approved.reviewed_by_id, Some(3));
        let media_id = approved.media_id.unwrap();

        let media = service.get_media(media_id).await.unwrap().unwrap();
        assert_eq!(media.source, MediaSource::Wikimedia);
        assert_eq!(media.filename, "Canal locks.jpg");
        assert_eq!(
            media.attribution.as_deref(),
            Some("Jane Doe / CC BY-SA 4.0 via Wikimedia Commons")
        );

        let again = service
            .approve_candidate_and_create_media(candidate.id, None, Some(4))
            .await
            .unwrap();
        assert_eq!(again.media_id, Some(media_id));
        assert_eq!(service.list_media(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn metadata_update_is_partial() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with_uploads(dir.path());
        let media = service
            .create_media_from_upload(Upload {
                original_filename: "a.gif".into(),
                content_type: Some("image/gif".into()),
                bytes: vec![1],
            })
            .await
            .unwrap();

        let updated = service
            .update_media_metadata(
                media.id,
                MediaMetadataInput {
                    caption: Some("Pollera dancers".into()),
                    instagram_media_type: Some(InstagramMediaType::Square),
                    ..MediaMetadataInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title.as_deref(), Some("a.gif"));
        assert_eq!(updated.caption.as_deref(), Some("Pollera dancers"));
        assert_eq!(updated.instagram_media_type, Some(InstagramMediaType::Square));
    }

    #[tokio::test]
    async fn candidate_needs_existing_suggestion() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with_uploads(dir.path());
        let err = service.create_candidate(42, image()).await.unwrap_err();
        assert!(matches!(err, ConsoleError::NotFound { .. }));
        assert!(service.list_candidates(None).await.unwrap().is_empty());
    }

    struct ReadOnlyStorage;

    #[async_trait::async_trait]
    impl crate::storage::Storage for ReadOnlyStorage {
        async fn insert(&self, _kind: &'static str, _doc: serde_json::Value) -> Result<i64> {
            Err(ConsoleError::storage("read-only"))
        }
        async fn get(&self, _kind: &'static str, _id: i64) -> Result<Option<serde_json::Value>> {
            Ok(None)
        }
        async fn replace(&self, _kind: &'static str, _id: i64, _doc: serde_json::Value) -> Result<()> {
            Err(ConsoleError::storage("read-only"))
        }
        async fn remove(&self, _kind: &'static str, _id: i64) -> Result<bool> {
            Ok(false)
        }
        async fn scan(&self, _kind: &'static str) -> Result<Vec<serde_json::Value>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn failed_insert_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaConfig {
            upload_dir: dir.path().to_path_buf(),
            ..MediaConfig::default()
        };
        let service = ContentService::new(
            Repository::new(std::sync::Arc::new(ReadOnlyStorage)),
            media,
        );

        let err = service
            .create_media_from_upload(Upload {
                original_filename: "canal.png".into(),
                content_type: None,
                bytes: b"png!".to_vec(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Storage { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
