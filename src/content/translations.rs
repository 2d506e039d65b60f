use super::{required, ContentService};
use crate::domain::{
    ApprovedLanguage, Article, Category, GenerationMeta, Media, SocialMediaPost, Tag, Taxonomy,
    TranslatableKind, Translation,
};
use crate::error::{ConsoleError, Result};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

static LANGUAGE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]{2}(-[A-Z]{2})?$").unwrap());

/// Used when no language is configured at all.
pub const FALLBACK_LANGUAGE: &str = "en";

#[derive(Debug, Clone, async_graphql::InputObject)]
pub struct LanguageInput {
    pub code: String,
    pub name: String,
    #[graphql(default = true)]
    pub is_active: bool,
    #[graphql(default)]
    pub is_default: bool,
}

/// A translation produced by the translator agent, ready to store.
#[derive(Debug, Clone)]
pub struct NewTranslation {
    pub kind: TranslatableKind,
    pub entity_id: i64,
    pub field: String,
    pub language: String,
    pub content: String,
    pub generation: GenerationMeta,
}

/// Fields of one record that have no translation in a language yet.
#[derive(Debug, Clone, PartialEq, async_graphql::SimpleObject)]
pub struct TranslationGap {
    pub kind: TranslatableKind,
    pub entity_id: i64,
    pub language: String,
    pub fields: Vec<String>,
}

fn text(value: &str) -> Option<String> {
    Some(value.to_string()).filter(|v| !v.trim().is_empty())
}

fn opt_text(value: &Option<String>) -> Option<String> {
    value.as_deref().and_then(text)
}

fn unknown_field(kind: TranslatableKind, field: &str) -> ConsoleError {
    ConsoleError::Validation(format!(
        "{} has no translatable field '{field}'",
        kind.as_str()
    ))
}

impl ContentService {
    // Languages

    pub async fn list_languages(&self, active_only: bool) -> Result<Vec<ApprovedLanguage>> {
        self.repo
            .find(|l: &ApprovedLanguage| !active_only || l.is_active)
            .await
    }

    pub async fn language(&self, code: &str) -> Result<Option<ApprovedLanguage>> {
        self.repo
            .find_one(|l: &ApprovedLanguage| l.code == code)
            .await
    }

    pub async fn default_language(&self) -> Result<Option<ApprovedLanguage>> {
        self.repo
            .find_one(|l: &ApprovedLanguage| l.is_default)
            .await
    }

    /// The language `code` if it is approved and active.
    pub async fn require_active_language(&self, code: &str) -> Result<ApprovedLanguage> {
        match self.language(code).await? {
            Some(language) if language.is_active => Ok(language),
            _ => Err(ConsoleError::Validation(format!(
                "Language {code} is not approved for translation"
            ))),
        }
    }

    pub async fn create_language(&self, input: LanguageInput) -> Result<ApprovedLanguage> {
        let code = input.code.trim().to_string();
        if !LANGUAGE_CODE.is_match(&code) {
            return Err(ConsoleError::Validation(format!(
                "Language code '{code}' must look like 'en' or 'pt-BR'"
            )));
        }
        let name = required("name", &input.name)?;
        if input.is_default && !input.is_active {
            return Err(ConsoleError::Validation(
                "The default language must be active".into(),
            ));
        }
        let clash = self
            .repo
            .find_one(|l: &ApprovedLanguage| {
                l.code.eq_ignore_ascii_case(&code) || l.name.eq_ignore_ascii_case(&name)
            })
            .await?;
        if let Some(existing) = clash {
            return Err(ConsoleError::Conflict(format!(
                "Language {} ({}) already exists",
                existing.name, existing.code
            )));
        }
        let now = Utc::now();
        let language = self
            .repo
            .create(ApprovedLanguage {
                id: 0,
                code,
                name,
                is_active: input.is_active,
                is_default: false,
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!("Created language {} ({})", language.name, language.code);
        if input.is_default {
            return self.set_default_language(&language.code).await;
        }
        Ok(language)
    }

    /// Make `code` the only default language.
    pub async fn set_default_language(&self, code: &str) -> Result<ApprovedLanguage> {
        let target = self.require_active_language(code).await?;
        let now = Utc::now();
        for mut language in self.repo.list::<ApprovedLanguage>().await? {
            let is_default = language.id == target.id;
            if language.is_default != is_default {
                language.is_default = is_default;
                language.updated_at = now;
                self.repo.update(&language).await?;
            }
        }
        info!("Default language is now {}", code);
        self.repo.require(target.id).await
    }

    pub async fn set_language_active(&self, code: &str, active: bool) -> Result<ApprovedLanguage> {
        let mut language = self
            .language(code)
            .await?
            .ok_or_else(|| ConsoleError::Validation(format!("Unknown language {code}")))?;
        if !active && language.is_default {
            return Err(ConsoleError::Conflict(format!(
                "Language {code} is the default and cannot be deactivated"
            )));
        }
        language.is_active = active;
        language.updated_at = Utc::now();
        self.repo.update(&language).await?;
        Ok(language)
    }

    /// Pick the response language: an active language named in
    /// `Accept-Language` (highest quality first), else the default.
    pub async fn negotiate_language(&self, accept_language: Option<&str>) -> String {
        let languages = match self.list_languages(true).await {
            Ok(languages) => languages,
            Err(e) => {
                warn!("Could not load languages: {}", e);
                return FALLBACK_LANGUAGE.to_string();
            }
        };
        if let Some(code) = accept_language.and_then(|h| best_match(h, &languages)) {
            return code;
        }
        languages
            .into_iter()
            .find(|l| l.is_default)
            .map_or_else(|| FALLBACK_LANGUAGE.to_string(), |l| l.code)
    }

    // Translations

    /// Source-language text of `field`, `None` when the field is empty.
    pub async fn source_text(
        &self,
        kind: TranslatableKind,
        entity_id: i64,
        field: &str,
    ) -> Result<Option<String>> {
        if !kind.fields().contains(&field) {
            return Err(unknown_field(kind, field));
        }
        let repo = &self.repo;
        let value = match kind {
            TranslatableKind::Taxonomy => {
                let t: Taxonomy = repo.require(entity_id).await?;
                if field == "name" { text(&t.name) } else { text(&t.description) }
            }
            TranslatableKind::Category => {
                let c: Category = repo.require(entity_id).await?;
                if field == "name" { text(&c.name) } else { text(&c.description) }
            }
            TranslatableKind::Tag => text(&repo.require::<Tag>(entity_id).await?.name),
            TranslatableKind::Article => {
                let a: Article = repo.require(entity_id).await?;
                match field {
                    "title" => text(&a.title),
                    "content" => text(&a.content),
                    _ => opt_text(&a.excerpt),
                }
            }
            TranslatableKind::Media => {
                let m: Media = repo.require(entity_id).await?;
                match field {
                    "title" => opt_text(&m.title),
                    "caption" => opt_text(&m.caption),
                    "alt_text" => opt_text(&m.alt_text),
                    _ => opt_text(&m.attribution),
                }
            }
            TranslatableKind::SocialMediaPost => {
                let p: SocialMediaPost = repo.require(entity_id).await?;
                if field == "content" {
                    text(&p.content)
                } else {
                    text(&p.hashtags.join(", "))
                }
            }
        };
        Ok(value)
    }

    /// Whether a record may be translated: required text is present and
    /// reviewed content has been approved. Posts already published are final.
    pub async fn ready_for_translation(&self, kind: TranslatableKind, entity_id: i64) -> Result<bool> {
        let repo = &self.repo;
        let ready = match kind {
            TranslatableKind::Taxonomy => {
                let t: Taxonomy = repo.require(entity_id).await?;
                !t.name.is_empty() && !t.description.is_empty()
            }
            TranslatableKind::Category => {
                let c: Category = repo.require(entity_id).await?;
                !c.name.is_empty()
                    && !c.description.is_empty()
                    && repo.get::<Taxonomy>(c.taxonomy_id).await?.is_some()
            }
            TranslatableKind::Tag => {
                let t: Tag = repo.require(entity_id).await?;
                !t.name.is_empty() && t.approval.is_approved()
            }
            TranslatableKind::Article => {
                let a: Article = repo.require(entity_id).await?;
                !a.title.is_empty() && !a.content.is_empty() && a.approval.is_approved()
            }
            TranslatableKind::Media => {
                let m: Media = repo.require(entity_id).await?;
                opt_text(&m.title).is_some() || opt_text(&m.alt_text).is_some()
            }
            TranslatableKind::SocialMediaPost => {
                let p: SocialMediaPost = repo.require(entity_id).await?;
                !p.content.is_empty() && p.approval.is_approved() && p.posted_at.is_none()
            }
        };
        Ok(ready)
    }

    /// Insert or overwrite the translation for (record, field, language).
    /// Hashtag translations arrive comma separated and are stored as a JSON
    /// list.
    pub async fn save_translation(&self, new: NewTranslation) -> Result<Translation> {
        if !new.kind.fields().contains(&new.field.as_str()) {
            return Err(unknown_field(new.kind, &new.field));
        }
        self.require_active_language(&new.language).await?;
        let content = if new.field == "hashtags" {
            let tags: Vec<&str> = new
                .content
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect();
            serde_json::to_string(&tags)?
        } else {
            new.content.trim().to_string()
        };

        let now = Utc::now();
        let existing = self.translation(new.kind, new.entity_id, &new.field, &new.language).await?;
        if let Some(mut translation) = existing {
            let previous = translation.generation.tokens_used.unwrap_or(0);
            translation.content = content;
            translation.is_generated = true;
            translation.generation = GenerationMeta {
                tokens_used: Some(previous + new.generation.tokens_used.unwrap_or(0)),
                ..new.generation
            };
            translation.approved_by_id = None;
            translation.approved_at = None;
            translation.updated_at = now;
            self.repo.update(&translation).await?;
            return Ok(translation);
        }

        let translation = self
            .repo
            .create(Translation {
                id: 0,
                entity_kind: new.kind,
                entity_id: new.entity_id,
                field: new.field,
                language: new.language,
                content,
                is_generated: true,
                generation: new.generation,
                approved_by_id: None,
                approved_at: None,
                created_at: now,
                updated_at: now,
            })
            .await?;
        Ok(translation)
    }

    pub async fn translation(
        &self,
        kind: TranslatableKind,
        entity_id: i64,
        field: &str,
        language: &str,
    ) -> Result<Option<Translation>> {
        self.repo
            .find_one(|t: &Translation| {
                t.entity_kind == kind
                    && t.entity_id == entity_id
                    && t.field == field
                    && t.language == language
            })
            .await
    }

    /// Every translation of a record, optionally in one language.
    pub async fn translations_for(
        &self,
        kind: TranslatableKind,
        entity_id: i64,
        language: Option<&str>,
    ) -> Result<Vec<Translation>> {
        self.repo
            .find(|t: &Translation| {
                t.entity_kind == kind
                    && t.entity_id == entity_id
                    && language.map_or(true, |l| t.language == l)
            })
            .await
    }

    /// Text of `field` in `language`, falling back to the source text.
    pub async fn translated_text(
        &self,
        kind: TranslatableKind,
        entity_id: i64,
        field: &str,
        language: &str,
    ) -> Result<Option<String>> {
        if let Some(translation) = self.translation(kind, entity_id, field, language).await? {
            return Ok(Some(translation.content));
        }
        self.source_text(kind, entity_id, field).await
    }

    pub async fn approve_translation(&self, id: i64, approved_by: Option<i64>) -> Result<Translation> {
        let mut translation: Translation = self.repo.require(id).await?;
        translation.approved_by_id = approved_by;
        translation.approved_at = Some(Utc::now());
        translation.updated_at = Utc::now();
        self.repo.update(&translation).await?;
        Ok(translation)
    }

    async fn ids_of(&self, kind: TranslatableKind) -> Result<Vec<i64>> {
        let repo = &self.repo;
        let ids: Vec<i64> = match kind {
            TranslatableKind::Taxonomy => repo.list::<Taxonomy>().await?.iter().map(|r| r.id).collect(),
            TranslatableKind::Category => repo.list::<Category>().await?.iter().map(|r| r.id).collect(),
            TranslatableKind::Tag => repo.list::<Tag>().await?.iter().map(|r| r.id).collect(),
            TranslatableKind::Article => repo.list::<Article>().await?.iter().map(|r| r.id).collect(),
            TranslatableKind::Media => repo.list::<Media>().await?.iter().map(|r| r.id).collect(),
            TranslatableKind::SocialMediaPost => {
                repo.list::<SocialMediaPost>().await?.iter().map(|r| r.id).collect()
            }
        };
        Ok(ids)
    }

    /// Records ready for translation whose non-empty fields lack a
    /// translation, in every active non-default language or just `language`.
    pub async fn missing_translations(
        &self,
        kind: Option<TranslatableKind>,
        language: Option<&str>,
    ) -> Result<Vec<TranslationGap>> {
        let targets: Vec<String> = match language {
            Some(code) => vec![self.require_active_language(code).await?.code],
            None => self
                .list_languages(true)
                .await?
                .into_iter()
                .filter(|l| !l.is_default)
                .map(|l| l.code)
                .collect(),
        };
        let kinds = kind.map_or_else(|| TranslatableKind::ALL.to_vec(), |k| vec![k]);
        let existing = self.repo.list::<Translation>().await?;

        let mut gaps = Vec::new();
        for kind in kinds {
            for entity_id in self.ids_of(kind).await? {
                if !self.ready_for_translation(kind, entity_id).await? {
                    continue;
                }
                let mut present = Vec::new();
                for field in kind.fields() {
                    if self.source_text(kind, entity_id, field).await?.is_some() {
                        present.push(*field);
                    }
                }
                for code in &targets {
                    let fields: Vec<String> = present
                        .iter()
                        .filter(|field| {
                            !existing.iter().any(|t| {
                                t.entity_kind == kind
                                    && t.entity_id == entity_id
                                    && t.field == **field
                                    && &t.language == code
                            })
                        })
                        .map(|f| f.to_string())
                        .collect();
                    if !fields.is_empty() {
                        gaps.push(TranslationGap {
                            kind,
                            entity_id,
                            language: code.clone(),
                            fields,
                        });
                    }
                }
            }
        }
        Ok(gaps)
    }
}

/// Highest-quality `Accept-Language` entry naming one of `languages`. A
/// region-less entry also matches a regional code, so `pt` finds `pt-BR`.
fn best_match(header: &str, languages: &[ApprovedLanguage]) -> Option<String> {
    let mut ranges: Vec<(&str, f32)> = header
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let range = pieces.next()?.trim();
            let quality = pieces
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);
            Some((range, quality)).filter(|(r, q)| !r.is_empty() && *q > 0.0)
        })
        .collect();
    ranges.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    ranges.into_iter().find_map(|(range, _)| {
        languages
            .iter()
            .find(|l| l.code.eq_ignore_ascii_case(range))
            .or_else(|| {
                languages.iter().find(|l| {
                    l.code
                        .split('-')
                        .next()
                        .is_some_and(|primary| primary.eq_ignore_ascii_case(range))
                })
            })
            .map(|l| l.code.clone())
    })
}
