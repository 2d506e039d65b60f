//! Translator agent: renders records into another approved language, one
//! field at a time. A failing field does not stop the others.

use super::Generation;
use crate::ai::prompts::{self, render};
use crate::content::NewTranslation;
use crate::domain::{AgentType, GenerationMeta, TranslatableKind};
use crate::error::{ConsoleError, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

/// Per-field success of one translation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TranslationOutcome {
    pub fields: BTreeMap<String, bool>,
    pub tokens: i64,
}

impl TranslationOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.fields.values().all(|ok| *ok)
    }
}

impl Generation {
    /// Translate `fields` (all translatable fields when empty) of one record
    /// from the default language into `language`.
    #[instrument(skip(self, fields), fields(agent = "translator"))]
    pub async fn translate_entity(
        &self,
        kind: TranslatableKind,
        entity_id: i64,
        language: &str,
        fields: &[String],
    ) -> Result<TranslationOutcome> {
        let content = self.content();
        let target = content.require_active_language(language).await?;
        let source = content
            .default_language()
            .await?
            .ok_or_else(|| ConsoleError::Config("No default language configured".into()))?;
        if target.code == source.code {
            return Err(ConsoleError::Validation(format!(
                "{} is the source language",
                target.code
            )));
        }
        if !content.ready_for_translation(kind, entity_id).await? {
            return Err(ConsoleError::Validation(format!(
                "{} {entity_id} is not ready for translation",
                kind.as_str()
            )));
        }
        let wanted: Vec<String> = if fields.is_empty() {
            kind.fields().iter().map(|f| f.to_string()).collect()
        } else {
            fields.to_vec()
        };
        if let Some(unknown) = wanted.iter().find(|f| !kind.fields().contains(&f.as_str())) {
            return Err(ConsoleError::Validation(format!(
                "{} has no translatable field '{unknown}'",
                kind.as_str()
            )));
        }

        let runtime = self.runtime(AgentType::Translator).await?;
        let mut outcome = TranslationOutcome::default();
        for field in &wanted {
            let Some(text) = content
                .translated_text(kind, entity_id, field, &source.code)
                .await?
            else {
                continue;
            };
            let template_name = if TranslatableKind::is_metadata_field(field) {
                prompts::TRANSLATE_METADATA
            } else {
                prompts::TRANSLATE_CONTENT
            };
            let started_at = Utc::now();
            let attempt = async {
                let template = runtime.template(template_name).await?;
                let prompt = render(
                    &template,
                    &[
                        ("content", text),
                        ("source_language", source.name.clone()),
                        ("target_language", target.name.clone()),
                        ("entity_type", kind.as_str().to_string()),
                        ("field", field.clone()),
                    ],
                );
                let completion = runtime.complete(&prompt, &[]).await?;
                let tokens = completion.total_tokens();
                content
                    .save_translation(NewTranslation {
                        kind,
                        entity_id,
                        field: field.clone(),
                        language: target.code.clone(),
                        content: completion.text,
                        generation: GenerationMeta::generated(runtime.model.id, tokens, started_at),
                    })
                    .await?;
                Ok::<i64, ConsoleError>(tokens)
            };
            match attempt.await {
                Ok(tokens) => {
                    outcome.tokens += tokens;
                    outcome.fields.insert(field.clone(), true);
                }
                Err(e) => {
                    warn!("Translating {}.{} failed: {}", kind.as_str(), field, e);
                    outcome.fields.insert(field.clone(), false);
                }
            }
        }

        info!(
            "Translated {} {} into {}: {:?}",
            kind.as_str(),
            entity_id,
            target.code,
            outcome.fields
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::generation;
    use super::*;
    use crate::ai::testing::ScriptedClient;
    use crate::content::fixtures::category;
    use crate::content::LanguageInput;

    async fn languages(gen: &Generation) {
        for (code, name, is_default) in [("en", "English", true), ("es", "Spanish", false)] {
            gen.content()
                .create_language(LanguageInput {
                    code: code.into(),
                    name: name.into(),
                    is_active: true,
                    is_default,
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn each_field_is_translated_with_its_prompt() {
        let client = ScriptedClient::new(["Período colonial", "Dominio español"]);
        let gen = generation(client.clone()).await;
        languages(&gen).await;
        let category_id = category(gen.content()).await;

        let outcome = gen
            .translate_entity(TranslatableKind::Category, category_id, "es", &[])
            .await
            .unwrap();
        assert!(outcome.all_succeeded());
        assert_eq!(outcome.tokens, 60);

        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].0.contains("translating metadata"));
        assert!(prompts[0].0.contains("TARGET LANGUAGE: Spanish"));
        assert!(prompts[0].0.contains("Colonial Period"));
        assert!(prompts[1].0.contains("translating long-form text"));
        drop(prompts);

        let stored = gen
            .content()
            .translated_text(TranslatableKind::Category, category_id, "description", "es")
            .await
            .unwrap();
        assert_eq!(stored.as_deref(), Some("Dominio español"));
    }

    #[tokio::test]
    async fn failed_field_is_reported_and_the_rest_continue() {
        let client = ScriptedClient::new(Vec::<String>::new());
        client.push_error(ConsoleError::api("overloaded"));
        client.push("Dominio español");
        let gen = generation(client).await;
        languages(&gen).await;
        let category_id = category(gen.content()).await;

        let outcome = gen
            .translate_entity(TranslatableKind::Category, category_id, "es", &[])
            .await
            .unwrap();
        assert_eq!(outcome.fields.get("name"), Some(&false));
        assert_eq!(outcome.fields.get("description"), Some(&true));
        assert!(!outcome.all_succeeded());
    }

    #[tokio::test]
    async fn inactive_or_source_language_is_refused() {
        let gen = generation(ScriptedClient::new(Vec::<String>::new())).await;
        languages(&gen).await;
        let category_id = category(gen.content()).await;

        let err = gen
            .translate_entity(TranslatableKind::Category, category_id, "fr", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
        let err = gen
            .translate_entity(TranslatableKind::Category, category_id, "en", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
        let err = gen
            .translate_entity(TranslatableKind::Category, category_id, "es", &["slug".into()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("slug"));
    }
}
