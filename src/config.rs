use crate::error::{ConsoleError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ai: AiConfig,
    pub jobs: JobsConfig,
    pub media: MediaConfig,
    pub wikimedia: WikimediaConfig,
    pub site: SiteConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `libsql://` / `https://` for a remote Turso database, anything else is a local file path.
    pub url: Option<String>,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub openai_base_url: String,
    pub anthropic_version: String,
    pub requests_per_minute: u64,
    pub concurrency: Option<u32>,
    pub timeout_seconds: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            openai_api_key: None,
            anthropic_base_url: "https://api.anthropic.com".to_string(),
            openai_base_url: "https://api.openai.com".to_string(),
            anthropic_version: "2023-06-01".to_string(),
            requests_per_minute: 50,
            concurrency: Some(4),
            timeout_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub workers: usize,
    pub max_attempts: u32,
    pub retry_delay_seconds: u64,
    pub research_section_delay_ms: u64,
    /// Recorded as approver when bulk generation auto-approves research.
    pub system_user_id: Option<i64>,
    pub history_limit: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            max_attempts: 3,
            retry_delay_seconds: 5,
            research_section_delay_ms: 5_000,
            system_user_id: Some(1),
            history_limit: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub allowed_extensions: Vec<String>,
    /// Prefix for locally stored files, e.g. `http://localhost:8080/content/uploads`.
    pub public_base_url: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 16 * 1024 * 1024,
            allowed_extensions: ["png", "jpg", "jpeg", "gif"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            public_base_url: "/content/uploads".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WikimediaConfig {
    pub endpoint: String,
    pub requests_per_minute: u64,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub user_agent: String,
}

impl Default for WikimediaConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://commons.wikimedia.org/w/api.php".to_string(),
            requests_per_minute: 30,
            batch_size: 50,
            batch_delay_ms: 1_000,
            user_agent: concat!("content-console/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub public_base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            public_base_url: "https://example.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub require_login: bool,
    pub session_ttl_hours: i64,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_full_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_login: true,
            session_ttl_hours: 24,
            admin_email: None,
            admin_password: None,
            admin_full_name: "Administrator".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path` (or `config.toml` when absent), then
    /// apply environment overrides. A missing default file yields defaults; a
    /// missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        let mut config = if config_path.exists() {
            let config_content = fs::read_to_string(&config_path).map_err(|e| {
                ConsoleError::Config(format!(
                    "Failed to read config file '{}': {}",
                    config_path.display(),
                    e
                ))
            })?;
            toml::from_str::<Config>(&config_content)?
        } else if explicit {
            return Err(ConsoleError::Config(format!(
                "Config file '{}' does not exist",
                config_path.display()
            )));
        } else {
            Config::default()
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = env::var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Ok(token) = env::var("DATABASE_AUTH_TOKEN") {
            self.database.auth_token = Some(token);
        }
        if let Ok(key) = env::var("ANTHROPIC_API_KEY") {
            self.ai.anthropic_api_key = Some(key);
        }
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            self.ai.openai_api_key = Some(key);
        }
        if let Some(port) = env::var("CONSOLE_PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Ok(email) = env::var("CONSOLE_ADMIN_EMAIL") {
            self.auth.admin_email = Some(email);
        }
        if let Ok(password) = env::var("CONSOLE_ADMIN_PASSWORD") {
            self.auth.admin_password = Some(password);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.jobs.workers == 0 {
            return Err(ConsoleError::Config("jobs.workers must be at least 1".into()));
        }
        if self.jobs.max_attempts == 0 {
            return Err(ConsoleError::Config("jobs.max_attempts must be at least 1".into()));
        }
        if self.wikimedia.batch_size == 0 || self.wikimedia.batch_size > 50 {
            return Err(ConsoleError::Config(
                "wikimedia.batch_size must be between 1 and 50".into(),
            ));
        }
        if self.auth.session_ttl_hours <= 0 {
            return Err(ConsoleError::Config("auth.session_ttl_hours must be positive".into()));
        }
        Ok(())
    }
}
