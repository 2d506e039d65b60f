//! Cleanup of raw model output before it is stored.

use crate::ai::prompts::END_OUTLINE;
use crate::error::{ConsoleError, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

static REASONING_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""reasoning"\s*:\s*"([^"]*)""#).unwrap());

static SOURCES_SECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)## (?:Sources and Further Reading|Sources|Further Reading)(.*?)(?:##|\z)")
        .unwrap()
});

const SUMMARY_PREFIXES: [&str; 4] = [
    "TECHNICAL SUMMARY [100 words]:",
    "TECHNICAL SUMMARY:",
    "AI SUMMARY:",
    "SUMMARY:",
];

/// Drop a surrounding ``` fence (with or without a language tag).
pub fn strip_code_fence(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.len() >= 6 {
        let inner = &trimmed[3..trimmed.len() - 3];
        // The rest of the opening line is the language tag.
        let body = match inner.find('\n') {
            Some(idx) => &inner[idx + 1..],
            None => inner,
        };
        return body.trim().to_string();
    }
    trimmed.to_string()
}

/// Everything before the end-of-outline marker.
pub fn cut_outline(content: &str) -> String {
    match content.find(END_OUTLINE) {
        Some(idx) => content[..idx].trim().to_string(),
        None => content.trim().to_string(),
    }
}

/// A `##` heading of an outline with the `###` headings under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineSection {
    pub title: String,
    pub subsections: Vec<String>,
}

/// Sections of a markdown outline in order. `###` headings before the first
/// `##` heading are ignored.
pub fn outline_sections(outline: &str) -> Vec<OutlineSection> {
    let mut sections: Vec<OutlineSection> = Vec::new();
    for line in outline.lines() {
        if let Some(title) = line.strip_prefix("## ") {
            sections.push(OutlineSection {
                title: title.trim().to_string(),
                subsections: Vec::new(),
            });
        } else if let Some(sub) = line.strip_prefix("### ") {
            if let Some(current) = sections.last_mut() {
                current.subsections.push(sub.trim().to_string());
            }
        }
    }
    sections
}

/// Body of the research's sources section, if it has a non-empty one.
pub fn sources_section(research: &str) -> Option<String> {
    SOURCES_SECTION
        .captures(research)
        .map(|caps| caps[1].trim().to_string())
        .filter(|body| !body.is_empty())
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn clean_summary(summary: &str) -> String {
    let mut out = summary.trim();
    for prefix in SUMMARY_PREFIXES {
        if let Some(rest) = out.strip_prefix(prefix) {
            out = rest.trim();
        }
    }
    out.to_string()
}

pub fn clean_excerpt(excerpt: &str) -> String {
    let trimmed = excerpt.trim();
    let trimmed = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
    trimmed.trim().to_string()
}

/// Parse a JSON reply. Models sometimes break the `reasoning` string across
/// lines; when the first parse fails that field is collapsed to one line and
/// the parse retried.
pub fn parse_json_reply(content: &str) -> Result<Value> {
    let body = strip_code_fence(content);
    match serde_json::from_str(&body) {
        Ok(value) => Ok(value),
        Err(first) => {
            warn!("Initial JSON parse failed: {}", first);
            let repaired = REASONING_FIELD.replace(&body, |caps: &Captures| {
                let collapsed = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
                format!(r#""reasoning":"{collapsed}""#)
            });
            serde_json::from_str(&repaired)
                .map_err(|e| ConsoleError::api(format!("Invalid API response format: {e}")))
        }
    }
}

/// Parse a JSON reply into `T`. A reply of the wrong shape is an upstream
/// error, retried like any other bad model output.
pub fn parse_reply<T: DeserializeOwned>(content: &str) -> Result<T> {
    serde_json::from_value(parse_json_reply(content)?)
        .map_err(|e| ConsoleError::api(format!("Unexpected API response structure: {e}")))
}
