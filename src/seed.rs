//! Idempotent seeding of the starting catalogue.
//!
//! The catalogue lives in `data/seed.toml` and is compiled in. Records are
//! matched by name (categories by taxonomy and name, accounts by platform and
//! username) so running the seed again only fills gaps.

use crate::auth::AuthService;
use crate::config::AuthConfig;
use crate::content::{
    CategoryInput, ContentService, HashtagGroupInput, LanguageInput, TaxonomyInput,
};
use crate::domain::{
    Agent, AgentType, AiModel, Category, Platform, Provider, SocialMediaAccount, Taxonomy, User,
};
use crate::error::{ConsoleError, Result};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

const CATALOG: &str = include_str!("../data/seed.toml");
const DEFAULT_MAX_TOKENS: u32 = 8192;

#[derive(Debug, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub models: Vec<ModelSeed>,
    #[serde(default)]
    pub agents: Vec<AgentSeed>,
    #[serde(default)]
    pub taxonomies: Vec<TaxonomySeed>,
    #[serde(default)]
    pub accounts: Vec<AccountSeed>,
    #[serde(default)]
    pub hashtag_groups: Vec<HashtagGroupSeed>,
    #[serde(default)]
    pub languages: Vec<LanguageSeed>,
}

#[derive(Debug, Deserialize)]
pub struct ModelSeed {
    pub name: String,
    pub provider: Provider,
    pub model_id: String,
    pub description: Option<String>,
    pub input_rate: f64,
    pub output_rate: f64,
    pub batch_input_rate: Option<f64>,
    pub batch_output_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct AgentSeed {
    pub name: String,
    pub agent_type: AgentType,
    pub description: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TaxonomySeed {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
}

#[derive(Debug, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct AccountSeed {
    pub platform: Platform,
    pub username: String,
    pub account_id: String,
}

#[derive(Debug, Deserialize)]
pub struct HashtagGroupSeed {
    pub name: String,
    #[serde(default)]
    pub is_core: bool,
    pub hashtags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LanguageSeed {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

impl Catalog {
    pub fn builtin() -> Result<Self> {
        Ok(toml::from_str(CATALOG)?)
    }
}

/// Counts of records created by one seeding run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub models: usize,
    pub agents: usize,
    pub taxonomies: usize,
    pub categories: usize,
    pub accounts: usize,
    pub hashtag_groups: usize,
    pub languages: usize,
    pub admin_created: bool,
}

impl SeedReport {
    pub fn total(&self) -> usize {
        self.models
            + self.agents
            + self.taxonomies
            + self.categories
            + self.accounts
            + self.hashtag_groups
            + self.languages
            + usize::from(self.admin_created)
    }
}

pub struct Seeder<'a> {
    content: &'a ContentService,
    auth: &'a AuthService,
}

impl<'a> Seeder<'a> {
    pub fn new(content: &'a ContentService, auth: &'a AuthService) -> Self {
        Self { content, auth }
    }

    pub async fn run(&self, catalog: &Catalog, auth_config: &AuthConfig) -> Result<SeedReport> {
        let mut report = SeedReport::default();
        self.seed_models(catalog, &mut report).await?;
        self.seed_agents(catalog, &mut report).await?;
        self.seed_taxonomies(catalog, &mut report).await?;
        self.seed_accounts(catalog, &mut report).await?;
        self.seed_hashtag_groups(catalog, &mut report).await?;
        self.seed_languages(catalog, &mut report).await?;
        report.admin_created = self.seed_admin(auth_config).await?;
        info!(created = report.total(), "Seeding finished: {:?}", report);
        Ok(report)
    }

    async fn seed_models(&self, catalog: &Catalog, report: &mut SeedReport) -> Result<()> {
        let repo = self.content.repo();
        for seed in &catalog.models {
            if repo.find_one(|m: &AiModel| m.name == seed.name).await?.is_some() {
                continue;
            }
            let now = Utc::now();
            repo.create(AiModel {
                id: 0,
                name: seed.name.clone(),
                provider: seed.provider,
                model_id: seed.model_id.clone(),
                description: seed.description.clone(),
                is_active: true,
                input_rate: seed.input_rate,
                output_rate: seed.output_rate,
                batch_input_rate: seed.batch_input_rate,
                batch_output_rate: seed.batch_output_rate,
                created_at: now,
                updated_at: now,
            })
            .await?;
            debug!("Created AI model {}", seed.name);
            report.models += 1;
        }
        Ok(())
    }

    async fn seed_agents(&self, catalog: &Catalog, report: &mut SeedReport) -> Result<()> {
        let repo = self.content.repo();
        for seed in &catalog.agents {
            if repo.find_one(|a: &Agent| a.name == seed.name).await?.is_some() {
                continue;
            }
            let model = repo
                .find_one(|m: &AiModel| m.name == seed.model)
                .await?
                .ok_or_else(|| {
                    ConsoleError::Config(format!(
                        "Agent {} references unknown model {}",
                        seed.name, seed.model
                    ))
                })?;
            let now = Utc::now();
            repo.create(Agent {
                id: 0,
                name: seed.name.clone(),
                agent_type: seed.agent_type,
                description: seed.description.clone(),
                model_id: model.id,
                temperature: seed.temperature,
                max_tokens: seed.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;
            debug!("Created agent {}", seed.name);
            report.agents += 1;
        }
        Ok(())
    }

    async fn seed_taxonomies(&self, catalog: &Catalog, report: &mut SeedReport) -> Result<()> {
        let repo = self.content.repo();
        for seed in &catalog.taxonomies {
            let taxonomy = match repo.find_one(|t: &Taxonomy| t.name == seed.name).await? {
                Some(existing) => existing,
                None => {
                    report.taxonomies += 1;
                    self.content
                        .create_taxonomy(TaxonomyInput {
                            name: seed.name.clone(),
                            description: seed.description.clone(),
                        })
                        .await?
                }
            };
            for category in &seed.categories {
                let exists = repo
                    .find_one(|c: &Category| c.taxonomy_id == taxonomy.id && c.name == category.name)
                    .await?
                    .is_some();
                if exists {
                    continue;
                }
                self.content
                    .create_category(CategoryInput {
                        name: category.name.clone(),
                        description: category.description.clone(),
                        taxonomy_id: taxonomy.id,
                    })
                    .await?;
                report.categories += 1;
            }
        }
        Ok(())
    }

    async fn seed_accounts(&self, catalog: &Catalog, report: &mut SeedReport) -> Result<()> {
        let repo = self.content.repo();
        for seed in &catalog.accounts {
            let exists = repo
                .find_one(|a: &SocialMediaAccount| {
                    a.platform == seed.platform && a.username == seed.username
                })
                .await?
                .is_some();
            if exists {
                continue;
            }
            let now = Utc::now();
            repo.create(SocialMediaAccount {
                id: 0,
                platform: seed.platform,
                username: seed.username.clone(),
                account_id: seed.account_id.clone(),
                is_active: true,
                credentials: serde_json::json!({}),
                created_at: now,
                updated_at: now,
            })
            .await?;
            report.accounts += 1;
        }
        Ok(())
    }

    async fn seed_hashtag_groups(&self, catalog: &Catalog, report: &mut SeedReport) -> Result<()> {
        for seed in &catalog.hashtag_groups {
            if self.content.hashtag_group_by_name(&seed.name).await?.is_some() {
                continue;
            }
            self.content
                .create_hashtag_group(HashtagGroupInput {
                    name: seed.name.clone(),
                    hashtags: seed.hashtags.clone(),
                    is_core: seed.is_core,
                })
                .await?;
            report.hashtag_groups += 1;
        }
        Ok(())
    }

    /// A seeded default only takes over when no default exists yet.
    async fn seed_languages(&self, catalog: &Catalog, report: &mut SeedReport) -> Result<()> {
        for seed in &catalog.languages {
            if self.content.language(&seed.code).await?.is_some() {
                continue;
            }
            let has_default = self.content.default_language().await?.is_some();
            self.content
                .create_language(LanguageInput {
                    code: seed.code.clone(),
                    name: seed.name.clone(),
                    is_active: true,
                    is_default: seed.is_default && !has_default,
                })
                .await?;
            report.languages += 1;
        }
        Ok(())
    }

    /// Bootstrap admin from configuration, when both email and password are set.
    async fn seed_admin(&self, config: &AuthConfig) -> Result<bool> {
        let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
            return Ok(false);
        };
        let email_key = email.trim().to_lowercase();
        let existing = self
            .content
            .repo()
            .count(|u: &User| u.email == email_key)
            .await?;
        if existing > 0 {
            return Ok(false);
        }
        self.auth
            .create_user(email, password, &config.admin_full_name)
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::fixtures::service;

    fn admin_config() -> AuthConfig {
        AuthConfig {
            admin_email: Some("admin@example.org".into()),
            admin_password: Some("change-me-now".into()),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn builtin_catalog_parses() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.models.len(), 1);
        assert_eq!(catalog.models[0].model_id, "claude-3-5-sonnet-20241022");
        assert_eq!(catalog.agents.len(), 7);
        assert!(catalog.hashtag_groups.iter().any(|g| g.is_core));
        assert_eq!(catalog.languages.iter().filter(|l| l.is_default).count(), 1);
    }

    #[tokio::test]
    async fn seeding_twice_creates_nothing_new() {
        let content = service();
        let auth = AuthService::new(content.repo().clone(), 24);
        let catalog = Catalog::builtin().unwrap();
        let seeder = Seeder::new(&content, &auth);

        let first = seeder.run(&catalog, &admin_config()).await.unwrap();
        assert_eq!(first.agents, 7);
        assert!(first.categories > 0);
        assert!(first.admin_created);

        let second = seeder.run(&catalog, &admin_config()).await.unwrap();
        assert_eq!(second.total(), 0);

        let model = content
            .repo()
            .find_one(|m: &AiModel| m.name == "Claude 3.5 Sonnet")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(model.input_rate, 3.0);
        assert_eq!(model.output_rate, 15.0);
        assert!(content.active_account(Platform::Instagram).await.unwrap().is_some());
        assert_eq!(first.languages, 2);
        assert_eq!(content.default_language().await.unwrap().unwrap().code, "en");
    }

    #[tokio::test]
    async fn admin_needs_email_and_password() {
        let content = service();
        let auth = AuthService::new(content.repo().clone(), 24);
        let seeder = Seeder::new(&content, &auth);
        let report = seeder
            .run(&Catalog::default(), &AuthConfig::default())
            .await
            .unwrap();
        assert!(!report.admin_created);
    }
}
