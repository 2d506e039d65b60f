use super::text::parse_json_reply;
use super::Generation;
use crate::ai::prompts::{self, render};
use crate::content::NewSuggestion;
use crate::domain::{AgentType, Article, ArticleLevel, ArticleSuggestion};
use crate::error::{ConsoleError, Result};
use chrono::Utc;
use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

const SCHEMA_SOURCE: &str = include_str!("../../schemas/article_suggestions.v1.json");

// jsonschema 0.17 borrows the schema for 'static; it is parsed once and leaked.
static SCHEMA: Lazy<std::result::Result<JSONSchema, String>> = Lazy::new(|| {
    let value: Value = serde_json::from_str(SCHEMA_SOURCE).map_err(|e| e.to_string())?;
    let value: &'static Value = Box::leak(Box::new(value));
    JSONSchema::options()
        .compile(value)
        .map_err(|e| e.to_string())
});

#[derive(Debug, Deserialize)]
struct SuggestionsReply {
    suggestions: Vec<SuggestionItem>,
}

#[derive(Debug, Deserialize)]
struct SuggestionItem {
    title: String,
    main_topic: String,
    sub_topics: Vec<String>,
    point_of_view: String,
}

fn validate_reply(value: &Value) -> Result<()> {
    let schema = (*SCHEMA)
        .as_ref()
        .map_err(|e| ConsoleError::Config(format!("article suggestion schema: {e}")))?;
    if let Err(errors) = schema.validate(value) {
        let details: Vec<String> = errors
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect();
        return Err(ConsoleError::api(format!(
            "Invalid response format: {}",
            details.join("; ")
        )));
    }
    Ok(())
}

/// Bullet list of existing article summaries in the category.
fn existing_summaries(articles: &[Article]) -> String {
    let lines: Vec<String> = articles
        .iter()
        .filter_map(|a| {
            a.ai_summary
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(|s| format!("- {}: {}", a.title, s))
        })
        .collect();
    if lines.is_empty() {
        "No existing articles".to_string()
    } else {
        lines.join("\n")
    }
}

impl Generation {
    /// Ask the content manager for `count` new article ideas in a category.
    #[instrument(skip(self), fields(agent = "content_manager"))]
    pub async fn generate_suggestions(
        &self,
        category_id: i64,
        level: ArticleLevel,
        count: u32,
    ) -> Result<Vec<ArticleSuggestion>> {
        if count < 1 {
            return Err(ConsoleError::Validation(
                "Number of suggestions must be at least 1".into(),
            ));
        }
        let (taxonomy, category) = self.category_context(category_id).await?;
        let existing = self.content.articles_in_category(category.id).await?;
        let runtime = self.runtime(AgentType::ContentManager).await?;
        let specs = level.specs();

        let template = runtime.template(prompts::CONTENT_SUGGESTION).await?;
        let prompt = render(
            &template,
            &[
                ("taxonomy", taxonomy.name.clone()),
                ("taxonomy_description", taxonomy.description.clone()),
                ("category", category.name.clone()),
                ("category_description", category.description.clone()),
                ("level", level.key().to_string()),
                ("level_description", specs.description.to_string()),
                ("num_suggestions", count.to_string()),
                ("existing_summaries", existing_summaries(&existing)),
            ],
        );

        let started_at = Utc::now();
        let completion = runtime.complete(&prompt, &[]).await?;
        let value = parse_json_reply(&completion.text)?;
        validate_reply(&value)?;
        let reply: SuggestionsReply = serde_json::from_value(value)
            .map_err(|e| ConsoleError::api(format!("Unexpected API response structure: {e}")))?;

        let per_item = completion.total_tokens() / reply.suggestions.len() as i64;
        let mut created = Vec::with_capacity(reply.suggestions.len());
        for item in reply.suggestions {
            let suggestion = self
                .content
                .create_suggestion(NewSuggestion {
                    category_id: category.id,
                    title: item.title,
                    main_topic: item.main_topic,
                    sub_topics: item.sub_topics,
                    point_of_view: item.point_of_view,
                    level,
                    model_id: Some(runtime.model.id),
                    tokens_used: Some(per_item),
                    generation_started_at: Some(started_at),
                })
                .await?;
            created.push(suggestion);
        }
        info!(
            "Generated {} suggestions for category {}",
            created.len(),
            category.name
        );
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::generation;
    use super::*;
    use crate::ai::testing::ScriptedClient;
    use crate::content::fixtures::category;
    use crate::domain::ContentStatus;

    const REPLY: &str = r#"```json
{
  "suggestions": [
    {"title": "Gold on Mules", "main_topic": "The Camino Real",
     "sub_topics": ["Routes", "Ports"], "point_of_view": "Trade"},
    {"title": "The Chagres River", "main_topic": "River transport",
     "sub_topics": ["Boats"], "point_of_view": "Geography"}
  ]
}
```"#;

    #[tokio::test]
    async fn suggestions_are_created_pending_with_split_tokens() {
        let client = ScriptedClient::new([REPLY]);
        let gen = generation(client.clone()).await;
        let category_id = category(gen.content()).await;

        let created = gen
            .generate_suggestions(category_id, ArticleLevel::HighSchool, 2)
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|s| s.approval.status == ContentStatus::Pending));
        assert!(created.iter().all(|s| s.level == ArticleLevel::HighSchool));
        // 30 tokens over two suggestions
        assert_eq!(created[0].generation.tokens_used, Some(15));

        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].0.contains("No existing articles"));
        assert!(prompts[0].0.contains("Category: Colonial Period"));
    }

    #[tokio::test]
    async fn zero_count_is_rejected_before_calling_the_model() {
        let client = ScriptedClient::new(Vec::<String>::new());
        let gen = generation(client.clone()).await;
        let category_id = category(gen.content()).await;
        let err = gen
            .generate_suggestions(category_id, ArticleLevel::General, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
        assert_eq!(client.prompt_count(), 0);
    }

    #[tokio::test]
    async fn reply_without_suggestions_field_fails_validation() {
        let gen = generation(ScriptedClient::new([r#"{"ideas": []}"#])).await;
        let category_id = category(gen.content()).await;
        let err = gen
            .generate_suggestions(category_id, ArticleLevel::General, 1)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid response format"));
    }

    #[test]
    fn summaries_skip_articles_without_one() {
        assert_eq!(existing_summaries(&[]), "No existing articles");
    }
}
