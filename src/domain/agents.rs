use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, async_graphql::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provider {
    Anthropic,
    #[graphql(name = "OPENAI")]
    #[serde(rename = "OPENAI")]
    OpenAi,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, async_graphql::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentType {
    ContentManager,
    Researcher,
    Writer,
    Editor,
    SocialMedia,
    Translator,
    MediaManager,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::ContentManager => "content_manager",
            AgentType::Researcher => "researcher",
            AgentType::Writer => "writer",
            AgentType::Editor => "editor",
            AgentType::SocialMedia => "social_media",
            AgentType::Translator => "translator",
            AgentType::MediaManager => "media_manager",
        }
    }
}

/// A provider model with its pricing in USD per million tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiModel {
    pub id: i64,
    pub name: String,
    pub provider: Provider,
    /// Identifier sent to the provider, e.g. `claude-3-5-sonnet-20241022`.
    pub model_id: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub input_rate: f64,
    pub output_rate: f64,
    pub batch_input_rate: Option<f64>,
    pub batch_output_rate: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AiModel {
    pub fn cost(&self, input_tokens: i64, output_tokens: i64) -> f64 {
        (input_tokens as f64 * self.input_rate + output_tokens as f64 * self.output_rate)
            / 1_000_000.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    pub agent_type: AgentType,
    pub description: Option<String>,
    pub model_id: i64,
    pub temperature: f64,
    pub max_tokens: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Operator override of a built-in prompt for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub id: i64,
    pub agent_id: i64,
    pub name: String,
    pub template: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Token usage and cost of one completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub id: i64,
    pub agent_id: i64,
    pub model_id: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost: f64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_uses_per_million_rates() {
        let now = Utc::now();
        let model = AiModel {
            id: 1,
            name: "Claude 3.5 Sonnet".into(),
            provider: Provider::Anthropic,
            model_id: "claude-3-5-sonnet-20241022".into(),
            description: None,
            is_active: true,
            input_rate: 3.0,
            output_rate: 15.0,
            batch_input_rate: None,
            batch_output_rate: None,
            created_at: now,
            updated_at: now,
        };
        let cost = model.cost(1_000_000, 200_000);
        assert!((cost - 6.0).abs() < 1e-9);
    }
}
