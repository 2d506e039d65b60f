use super::{ContentStatus, GenerationMeta};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, async_graphql::Enum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    #[default]
    Image,
    Video,
    Document,
    Pdf,
    Spreadsheet,
    Other,
}

impl MediaType {
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.to_ascii_lowercase();
        if mime.starts_with("image/") {
            MediaType::Image
        } else if mime.starts_with("video/") {
            MediaType::Video
        } else if mime == "application/pdf" {
            MediaType::Pdf
        } else if mime.contains("spreadsheet") || mime.contains("excel") || mime == "text/csv" {
            MediaType::Spreadsheet
        } else if mime.contains("document") || mime.contains("msword") || mime == "text/plain" {
            MediaType::Document
        } else {
            MediaType::Other
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, async_graphql::Enum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaSource {
    #[default]
    Local,
    Youtube,
    S3,
    Wikimedia,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, async_graphql::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstagramMediaType {
    Square,
    Portrait,
    Landscape,
    Story,
}

/// A file in the media library, uploaded locally or imported from Commons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub id: i64,
    pub filename: String,
    pub original_filename: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub media_type: MediaType,
    pub source: MediaSource,
    pub title: Option<String>,
    pub caption: Option<String>,
    pub alt_text: Option<String>,
    pub external_url: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub attribution: Option<String>,
    pub instagram_media_type: Option<InstagramMediaType>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Media {
    /// URL clients should use to display the file. Local files are served
    /// under `local_base`; everything else links out.
    pub fn public_url(&self, local_base: &str) -> Option<String> {
        match self.source {
            MediaSource::Local => Some(format!(
                "{}/{}",
                local_base.trim_end_matches('/'),
                self.filename
            )),
            _ => self.external_url.clone(),
        }
    }
}

/// Image search hints produced by the media manager for a piece of research.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSuggestion {
    pub id: i64,
    pub research_id: i64,
    pub commons_categories: Vec<String>,
    pub search_queries: Vec<String>,
    pub illustration_topics: Vec<String>,
    pub reasoning: String,
    pub generation: GenerationMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Normalized Commons image metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub commons_id: String,
    pub commons_url: String,
    pub title: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub license: String,
    pub license_url: Option<String>,
    pub width: i64,
    pub height: i64,
    pub mime_type: String,
    pub file_size: i64,
}

/// A Commons image proposed for a media suggestion, awaiting review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaCandidate {
    pub id: i64,
    pub suggestion_id: i64,
    #[serde(flatten)]
    pub image: ImageMetadata,
    pub status: ContentStatus,
    pub reviewed_by_id: Option<i64>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub media_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_follows_mime_family() {
        assert_eq!(MediaType::from_mime("image/PNG"), MediaType::Image);
        assert_eq!(MediaType::from_mime("application/pdf"), MediaType::Pdf);
        assert_eq!(MediaType::from_mime("text/csv"), MediaType::Spreadsheet);
        assert_eq!(MediaType::from_mime("application/zip"), MediaType::Other);
    }

    #[test]
    fn local_media_is_served_from_the_upload_prefix() {
        let now = Utc::now();
        let mut media = Media {
            id: 3,
            filename: "abc.png".into(),
            original_filename: "canal.png".into(),
            file_path: "uploads/abc.png".into(),
            file_size: 10,
            mime_type: "image/png".into(),
            media_type: MediaType::Image,
            source: MediaSource::Local,
            title: None,
            caption: None,
            alt_text: None,
            external_url: Some("https://upload.wikimedia.org/x.png".into()),
            width: None,
            height: None,
            attribution: None,
            instagram_media_type: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(
            media.public_url("/content/uploads/").as_deref(),
            Some("/content/uploads/abc.png")
        );

        media.source = MediaSource::Wikimedia;
        assert_eq!(
            media.public_url("/content/uploads").as_deref(),
            Some("https://upload.wikimedia.org/x.png")
        );
    }
}
