//! Editor agent: turns an over-long draft into a series of standalone
//! articles, each framed with its own introduction and conclusion.

use super::social::article_url;
use super::text::{parse_reply, word_count};
use super::Generation;
use crate::ai::prompts::{self, render};
use crate::domain::{AgentType, Article};
use crate::error::{ConsoleError, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Drafts longer than this become a series.
pub const SERIES_WORD_THRESHOLD: usize = 3600;
const WORDS_PER_PART: usize = 1800;

#[derive(Debug, Deserialize)]
struct PartPlan {
    title: String,
    excerpt: String,
    ai_summary: String,
    #[serde(default)]
    sections: Vec<String>,
}

#[derive(Serialize)]
struct OtherPart<'a> {
    title: &'a str,
    excerpt: &'a str,
}

#[derive(Debug, Deserialize)]
struct Framing {
    introduction: String,
    conclusion: String,
}

/// One article of a series as drafted by the editor.
#[derive(Debug, Clone)]
pub struct SeriesDraft {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub ai_summary: String,
}

#[derive(Debug, Clone)]
pub struct EditedSeries {
    pub parts: Vec<SeriesDraft>,
    pub tokens: i64,
}

/// How many articles a draft of `words` words is split into.
pub fn parts_for(words: usize) -> usize {
    (words / WORDS_PER_PART).max(2)
}

/// Byte offset of the `##` or `###` heading line titled `section`.
fn heading_offset(full: &str, section: &str) -> Option<usize> {
    let mut offset = 0;
    for line in full.split_inclusive('\n') {
        let line_text = line.trim_end();
        let title = line_text
            .strip_prefix("## ")
            .or_else(|| line_text.strip_prefix("### "))
            .map(str::trim);
        if title == Some(section) {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

/// The named sections of `full`, each running to the next `##` heading.
/// Introduction and Conclusion are skipped; the editor writes new ones.
pub fn relevant_sections(full: &str, sections: &[String]) -> String {
    let mut picked = Vec::new();
    for section in sections {
        if section == "Introduction" || section == "Conclusion" {
            continue;
        }
        if let Some(start) = heading_offset(full, section) {
            let end = full[start + 1..]
                .find("\n## ")
                .map_or(full.len(), |offset| start + 1 + offset);
            picked.push(full[start..end].trim());
        }
    }
    picked.join("\n\n")
}

/// Header placed above each part: its position and links to the others.
pub fn about_section(series_title: &str, parts: &[Article], current: usize, base_url: &str) -> String {
    let mut about = format!(
        "*About this Article*\n\nThis article is part {} of a {}-part series about {}.\n\nArticles in this series:\n",
        current + 1,
        parts.len(),
        series_title
    );
    for (i, part) in parts.iter().enumerate() {
        if i == current {
            about.push_str(&format!("\n- {} (You are here)", part.title));
        } else {
            about.push_str(&format!("\n- [{}]({})", part.title, article_url(base_url, part)));
        }
    }
    about.push_str("\n\n---\n");
    about
}

/// Link to the next part; `None` for the last one.
pub fn continue_reading_section(parts: &[Article], current: usize, base_url: &str) -> Option<String> {
    let next = parts.get(current + 1)?;
    Some(format!(
        "---\n\n*Continue Reading*\n\nReady for the next part? Continue to [Part {}: {}]({})",
        current + 2,
        next.title,
        article_url(base_url, next)
    ))
}

impl Generation {
    /// Plan a series over `content`, then frame every part. Sources go on
    /// the last part; the others point to it.
    #[instrument(skip(self, content, sources), fields(agent = "editor"))]
    pub async fn split_into_series(
        &self,
        series_title: &str,
        content: &str,
        sources: Option<&str>,
    ) -> Result<EditedSeries> {
        let runtime = self.runtime(AgentType::Editor).await?;
        let num_parts = parts_for(word_count(content));

        let template = runtime.template(prompts::ARTICLE_SERIES_SPLIT).await?;
        let prompt = render(
            &template,
            &[
                ("num_parts", num_parts.to_string()),
                ("content", content.to_string()),
            ],
        );
        let plan_reply = runtime.complete(&prompt, &[]).await?;
        let mut tokens = plan_reply.total_tokens();
        let plan: Vec<PartPlan> = parse_reply(&plan_reply.text)?;
        if plan.len() < 2 {
            return Err(ConsoleError::api(format!(
                "Series plan needs at least two articles, got {}",
                plan.len()
            )));
        }

        let section_template = runtime.template(prompts::ARTICLE_SERIES_SECTION).await?;
        let mut parts = Vec::with_capacity(plan.len());
        for (i, part) in plan.iter().enumerate() {
            let section_text = relevant_sections(content, &part.sections);
            if section_text.is_empty() {
                return Err(ConsoleError::api(format!(
                    "None of the sections planned for '{}' exist in the draft",
                    part.title
                )));
            }
            let others: Vec<OtherPart> = plan
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, p)| OtherPart {
                    title: &p.title,
                    excerpt: &p.excerpt,
                })
                .collect();

            let prompt = render(
                &section_template,
                &[
                    ("series_title", series_title.to_string()),
                    ("title", part.title.clone()),
                    ("excerpt", part.excerpt.clone()),
                    ("section_text", section_text.clone()),
                    ("other_articles", serde_json::to_string(&others)?),
                ],
            );
            let reply = runtime.complete(&prompt, &[]).await?;
            tokens += reply.total_tokens();
            let framing: Framing = parse_reply(&reply.text)?;

            parts.push(SeriesDraft {
                title: part.title.clone(),
                content: format!(
                    "## Introduction\n\n{}\n\n{}\n\n## Conclusion\n\n{}",
                    framing.introduction.trim(),
                    section_text,
                    framing.conclusion.trim()
                ),
                excerpt: part.excerpt.clone(),
                ai_summary: part.ai_summary.clone(),
            });
        }

        if let Some(sources) = sources.map(str::trim).filter(|s| !s.is_empty()) {
            let last = parts.len() - 1;
            let last_title = parts[last].title.clone();
            for part in &mut parts[..last] {
                part.content.push_str(&format!(
                    "\n\n---\n*The sources consulted for this article series can be found in [{last_title}].*"
                ));
            }
            parts[last]
                .content
                .push_str(&format!("\n\n## Sources\n{sources}"));
        }

        info!("Split '{}' into {} articles", series_title, parts.len());
        Ok(EditedSeries { parts, tokens })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::generation;
    use super::*;
    use crate::ai::testing::ScriptedClient;
    use crate::domain::{Approval, ArticleLevel, GenerationMeta};
    use chrono::Utc;

    fn article(id: i64, title: &str) -> Article {
        let now = Utc::now();
        Article {
            id,
            research_id: 1,
            category_id: 1,
            title: title.into(),
            content: String::new(),
            excerpt: None,
            ai_summary: None,
            feature_image_id: None,
            level: ArticleLevel::General,
            tag_ids: Vec::new(),
            related_article_ids: Vec::new(),
            approval: Approval::default(),
            published_at: None,
            generation: GenerationMeta::default(),
            series_parent_id: None,
            series_order: None,
            created_at: now,
            updated_at: now,
        }
    }

    const DRAFT: &str = "## Introduction\nHook.\n\n## Mule Trains\nSilver moved by mule.\n### Fairs\nPortobelo fairs.\n\n## Canal\nLocks and ships.\n\n## Conclusion\nEnd.";

    #[test]
    fn relevant_sections_run_to_the_next_major_heading() {
        let text = relevant_sections(DRAFT, &["Introduction".into(), "Mule Trains".into()]);
        assert_eq!(text, "## Mule Trains\nSilver moved by mule.\n### Fairs\nPortobelo fairs.");

        let sub = relevant_sections(DRAFT, &["Fairs".into(), "Canal".into(), "Missing".into()]);
        assert_eq!(sub, "### Fairs\nPortobelo fairs.\n\n## Canal\nLocks and ships.");
    }

    #[test]
    fn part_count_has_a_floor_of_two() {
        assert_eq!(parts_for(3700), 2);
        assert_eq!(parts_for(5400), 3);
    }

    #[tokio::test]
    async fn series_parts_are_framed_and_sources_go_last() {
        let client = ScriptedClient::new([
            r#"```json
[
  {"title": "Silver Roads", "excerpt": "Mules.", "ai_summary": "Trade.", "sections": ["Introduction", "Mule Trains"]},
  {"title": "Water Roads", "excerpt": "Locks.", "ai_summary": "Canal.", "sections": ["Canal", "Conclusion"]}
]
```"#,
            r#"{"introduction": "Intro one.", "conclusion": "Outro one."}"#,
            r#"{"introduction": "Intro two.", "conclusion": "Outro two."}"#,
        ]);
        let gen = generation(client.clone()).await;

        let series = gen
            .split_into_series("The Isthmus", DRAFT, Some("- Ward, 1993"))
            .await
            .unwrap();
        assert_eq!(series.parts.len(), 2);
        assert_eq!(series.tokens, 90);

        let first = &series.parts[0];
        assert!(first.content.starts_with("## Introduction\n\nIntro one.\n\n## Mule Trains"));
        assert!(first.content.contains("## Conclusion\n\nOutro one."));
        assert!(first.content.ends_with("can be found in [Water Roads].*"));
        assert!(series.parts[1].content.ends_with("## Sources\n- Ward, 1993"));

        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].0.contains("into 2 cohesive articles"));
        assert!(prompts[1].0.contains(r#"[{"title":"Water Roads","excerpt":"Locks."}]"#));
    }

    #[tokio::test]
    async fn plan_with_unknown_sections_is_retryable() {
        let client = ScriptedClient::new([
            r#"[{"title": "A", "excerpt": "a", "ai_summary": "a", "sections": ["Nowhere"]},
                {"title": "B", "excerpt": "b", "ai_summary": "b", "sections": ["Canal"]}]"#,
        ]);
        let gen = generation(client).await;
        let err = gen.split_into_series("The Isthmus", DRAFT, None).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn about_and_continue_link_the_parts() {
        let parts = vec![article(4, "Silver Roads"), article(5, "Water Roads")];
        let about = about_section("The Isthmus", &parts, 0, "https://example.org");
        assert!(about.starts_with("*About this Article*\n\nThis article is part 1 of a 2-part series about The Isthmus."));
        assert!(about.contains("\n- Silver Roads (You are here)"));
        assert!(about.contains("\n- [Water Roads](https://example.org/articles/5-water-roads)"));

        let next = continue_reading_section(&parts, 0, "https://example.org").unwrap();
        assert!(next.ends_with("[Part 2: Water Roads](https://example.org/articles/5-water-roads)"));
        assert!(continue_reading_section(&parts, 1, "https://example.org").is_none());
    }
}
