use super::text::strip_code_fence;
use super::Generation;
use crate::ai::prompts::{self, render, research_continuation, subtopic_structure};
use crate::ai::ChatMessage;
use crate::content::NewResearch;
use crate::domain::{AgentType, ArticleSuggestion, GenerationMeta, Research};
use crate::error::{ConsoleError, Result};
use crate::workflow::ensure_approved;
use chrono::Utc;
use tracing::{debug, info, instrument};

const LEADING_SECTIONS: [&str; 2] = ["Abstract", "Main Topic Development"];
const TRAILING_SECTIONS: [&str; 3] = [
    "Contemporary Relevance",
    "Conclusion",
    "Sources and Further Reading",
];

/// Section titles in writing order: fixed openers, one per sub-topic, fixed closers.
pub fn research_sections(sub_topics: &[String]) -> Vec<String> {
    LEADING_SECTIONS
        .iter()
        .map(|s| s.to_string())
        .chain(sub_topics.iter().cloned())
        .chain(TRAILING_SECTIONS.iter().map(|s| s.to_string()))
        .collect()
}

impl Generation {
    /// Write a research document for an approved suggestion, one section per
    /// completion. Every continuation sees only the outline prompt and the
    /// abstract.
    #[instrument(skip(self), fields(agent = "researcher"))]
    pub async fn generate_research(&self, suggestion_id: i64) -> Result<Research> {
        let repo = self.content.repo();
        let suggestion: ArticleSuggestion = repo.require(suggestion_id).await?;
        ensure_approved("Suggestion", suggestion.id, suggestion.approval.status)?;
        let (taxonomy, category) = self.category_context(suggestion.category_id).await?;
        let runtime = self.runtime(AgentType::Researcher).await?;

        let sub_topics_list = suggestion
            .sub_topics
            .iter()
            .map(|t| format!("- {t}"))
            .collect::<Vec<_>>()
            .join("\n");
        let template = runtime.template(prompts::RESEARCH).await?;
        let initial_prompt = render(
            &template,
            &[
                ("taxonomy", taxonomy.name.clone()),
                ("taxonomy_description", taxonomy.description.clone()),
                ("category", category.name.clone()),
                ("category_description", category.description.clone()),
                ("title", suggestion.title.clone()),
                ("main_topic", suggestion.main_topic.clone()),
                ("sub_topics_list", sub_topics_list),
                ("point_of_view", suggestion.point_of_view.clone()),
                ("subtopic_structure", subtopic_structure(&suggestion.sub_topics)),
            ],
        );

        let started_at = Utc::now();
        let sections = research_sections(&suggestion.sub_topics);

        let abstract_completion = runtime.complete(&initial_prompt, &[]).await?;
        let mut tokens = abstract_completion.total_tokens();
        let history = [
            ChatMessage::user(initial_prompt.as_str()),
            ChatMessage::assistant(abstract_completion.text.as_str()),
        ];
        let mut parts = vec![strip_code_fence(&abstract_completion.text)];

        for pair in sections.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);
            if !self.options.research_section_delay.is_zero() {
                tokio::time::sleep(self.options.research_section_delay).await;
            }
            let prompt = research_continuation(previous, current);
            let completion = runtime.complete(&prompt, &history).await.map_err(|e| match e {
                ConsoleError::Api { message } if message.starts_with("Empty response") => {
                    ConsoleError::api(format!("Empty response for section: {current}"))
                }
                other => other,
            })?;
            tokens += completion.total_tokens();
            debug!(section = %current, "research section written");
            parts.push(strip_code_fence(&completion.text));
        }

        let research = self
            .content
            .create_research(NewResearch {
                suggestion_id: suggestion.id,
                content: parts.join("\n\n"),
                generation: GenerationMeta::generated(runtime.model.id, tokens, started_at),
            })
            .await?;
        info!(
            "Generated research {} ({} sections) for suggestion {}",
            research.id,
            sections.len(),
            suggestion.id
        );
        Ok(research)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::generation;
    use super::*;
    use crate::ai::testing::ScriptedClient;
    use crate::ai::Role;
    use crate::content::fixtures::{category, new_suggestion};
    use crate::domain::ContentStatus;

    #[test]
    fn sections_wrap_sub_topics() {
        let sections = research_sections(&["Ports".into()]);
        assert_eq!(
            sections,
            vec![
                "Abstract",
                "Main Topic Development",
                "Ports",
                "Contemporary Relevance",
                "Conclusion",
                "Sources and Further Reading"
            ]
        );
    }

    async fn approved_suggestion(gen: &Generation, sub_topics: Vec<String>) -> i64 {
        let category_id = category(gen.content()).await;
        let mut new = new_suggestion(category_id, "Portobelo Fairs");
        new.sub_topics = sub_topics;
        let s = gen.content().create_suggestion(new).await.unwrap();
        gen.content()
            .update_suggestion_status(s.id, ContentStatus::Approved, Some(1))
            .await
            .unwrap();
        s.id
    }

    #[tokio::test]
    async fn research_joins_sections_and_keeps_abstract_history() {
        let replies = [
            "```markdown\n# Abstract\nA.\n```",
            "## Main Topic Development\nB.",
            "## Fairs\nC.",
            "## Contemporary Relevance\nD.",
            "## Conclusion\nE.",
            "## Sources and Further Reading\nF.",
        ];
        let client = ScriptedClient::new(replies);
        let gen = generation(client.clone()).await;
        let suggestion_id = approved_suggestion(&gen, vec!["Fairs".into()]).await;

        let research = gen.generate_research(suggestion_id).await.unwrap();
        assert!(research.content.starts_with("# Abstract\nA.\n\n## Main Topic Development"));
        assert!(research.content.ends_with("## Sources and Further Reading\nF."));
        assert_eq!(research.approval.status, ContentStatus::Pending);
        assert_eq!(research.generation.tokens_used, Some(6 * 30));

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 6);
        assert!(prompts[0].1.is_empty());
        let (prompt, history) = &prompts[3];
        assert!(prompt.contains("completed the Fairs section"));
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn pending_suggestion_is_refused() {
        let client = ScriptedClient::new(Vec::<String>::new());
        let gen = generation(client.clone()).await;
        let category_id = category(gen.content()).await;
        let s = gen
            .content()
            .create_suggestion(new_suggestion(category_id, "Draft"))
            .await
            .unwrap();
        let err = gen.generate_research(s.id).await.unwrap_err();
        assert!(err.to_string().contains("must be approved"));
        assert_eq!(client.prompt_count(), 0);
    }

    #[tokio::test]
    async fn empty_section_fails_generation() {
        let client = ScriptedClient::new(["# Abstract", ""]);
        let gen = generation(client).await;
        let suggestion_id = approved_suggestion(&gen, vec![]).await;
        let err = gen.generate_research(suggestion_id).await.unwrap_err();
        assert!(err
            .to_string()
            .contains("Empty response for section: Main Topic Development"));
        assert!(gen.content().research_for_suggestion(suggestion_id).await.unwrap().is_empty());
    }
}
