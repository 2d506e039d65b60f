use super::{Approval, ContentStatus, GenerationMeta};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reading level an article is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, async_graphql::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArticleLevel {
    Elementary,
    MiddleSchool,
    HighSchool,
    College,
    General,
}

/// Length and audience targets for an [`ArticleLevel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelSpecs {
    pub min_words: u32,
    pub max_words: u32,
    pub description: &'static str,
    pub audience: &'static str,
    pub characteristics: &'static [&'static str],
}

impl ArticleLevel {
    pub const ALL: [ArticleLevel; 5] = [
        ArticleLevel::Elementary,
        ArticleLevel::MiddleSchool,
        ArticleLevel::HighSchool,
        ArticleLevel::College,
        ArticleLevel::General,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ArticleLevel::Elementary => "ELEMENTARY",
            ArticleLevel::MiddleSchool => "MIDDLE_SCHOOL",
            ArticleLevel::HighSchool => "HIGH_SCHOOL",
            ArticleLevel::College => "COLLEGE",
            ArticleLevel::General => "GENERAL",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let normalized = key.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|level| level.key() == normalized)
    }

    pub fn specs(&self) -> LevelSpecs {
        match self {
            ArticleLevel::Elementary => LevelSpecs {
                min_words: 500,
                max_words: 800,
                description: "Elementary Level (grades 1-6)",
                audience: "Young students (grades 1-6)",
                characteristics: &[
                    "Short paragraphs",
                    "Simple language",
                    "Key terms highlighted",
                    "Fun fact boxes or sidebars",
                ],
            },
            ArticleLevel::MiddleSchool => LevelSpecs {
                min_words: 800,
                max_words: 1200,
                description: "Middle School Level (grades 7-9)",
                audience: "Middle school students (grades 7-9)",
                characteristics: &[
                    "More detailed explanations",
                    "Introduction to complex concepts",
                    "Mix of basic and field-specific vocabulary",
                    "Pull quotes from historical documents",
                ],
            },
            ArticleLevel::HighSchool => LevelSpecs {
                min_words: 1200,
                max_words: 2000,
                description: "High School Level (grades 9-12)",
                audience: "High school students (grades 9-12)",
                characteristics: &[
                    "In-depth analysis",
                    "Sophisticated language",
                    "Historical context",
                    "Primary source references",
                    "Critical thinking prompts",
                ],
            },
            ArticleLevel::College => LevelSpecs {
                min_words: 2000,
                max_words: 3000,
                description: "College Level",
                audience: "College students and academics",
                characteristics: &[
                    "Scholarly approach",
                    "Detailed analysis",
                    "Multiple perspectives",
                    "Citations and references",
                    "Technical terminology",
                    "Theoretical frameworks",
                ],
            },
            ArticleLevel::General => LevelSpecs {
                min_words: 1000,
                max_words: 1500,
                description: "General Audience",
                audience: "General adult audience",
                characteristics: &[
                    "Balanced approach",
                    "Clear explanations without oversimplification",
                    "Mix of basic and advanced concepts",
                    "Engaging storytelling elements",
                    "Contemporary relevance highlighted",
                ],
            },
        }
    }

    /// Weight of the level in [`Article::relevance_score`].
    pub fn relevance_weight(&self) -> f64 {
        match self {
            ArticleLevel::Elementary => 1.0,
            ArticleLevel::MiddleSchool => 2.0,
            ArticleLevel::HighSchool => 3.0,
            ArticleLevel::College => 4.0,
            ArticleLevel::General => 2.0,
        }
    }
}

/// Top of the content hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub taxonomy_id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub approval: Approval,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An article idea awaiting approval before research starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSuggestion {
    pub id: i64,
    pub category_id: i64,
    pub title: String,
    pub main_topic: String,
    pub sub_topics: Vec<String>,
    pub point_of_view: String,
    pub level: ArticleLevel,
    pub approval: Approval,
    pub generation: GenerationMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Research {
    pub id: i64,
    pub suggestion_id: i64,
    pub content: String,
    pub approval: Approval,
    pub generation: GenerationMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub research_id: i64,
    pub category_id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub ai_summary: Option<String>,
    pub feature_image_id: Option<i64>,
    pub level: ArticleLevel,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    #[serde(default)]
    pub related_article_ids: Vec<i64>,
    pub approval: Approval,
    pub published_at: Option<DateTime<Utc>>,
    pub generation: GenerationMeta,
    /// Lead article of the series this one continues; `None` for the lead
    /// and for standalone articles.
    #[serde(default)]
    pub series_parent_id: Option<i64>,
    /// 2.. for continuations.
    #[serde(default)]
    pub series_order: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    /// Ranking heuristic used by listings and the content manager.
    ///
    /// `category_size` is the number of articles in this article's category,
    /// `approved_tags` how many of its tags are approved and `referenced_by`
    /// how many articles list this one as related.
    pub fn relevance_score(
        &self,
        category_size: usize,
        approved_tags: usize,
        referenced_by: usize,
    ) -> f64 {
        let mut score = 0.0;
        if self.approval.status == ContentStatus::Approved {
            score += 2.0;
        }
        score += (category_size as f64 * 0.5).min(5.0);

        let pending_tags = self.tag_ids.len().saturating_sub(approved_tags);
        score += approved_tags as f64 * 0.5 + pending_tags as f64 * 0.2;

        score += self.related_article_ids.len() as f64 * 0.3;
        score += referenced_by as f64 * 0.4;
        score + self.level.relevance_weight()
    }
}
