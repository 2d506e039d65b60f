//! Wiring of storage, services and workers from a [`Config`].

use crate::ai::{ClientFactory, HttpClientFactory};
use crate::auth::AuthService;
use crate::config::Config;
use crate::content::ContentService;
use crate::error::{ConsoleError, Result};
use crate::generation::{Generation, GenerationOptions};
use crate::jobs::{JobHandler, JobQueue, TaskRunner, WorkerPool};
use crate::seed::{Catalog, SeedReport, Seeder};
use crate::server::AppState;
use crate::storage::{InMemoryStorage, Repository, Storage};
use crate::wikimedia::{ImageSource, MediaCandidateFetcher, WikimediaClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Where records live for one console process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Process-local; everything is lost on exit.
    InMemory,
    /// The configured libSQL database.
    Database,
}

/// Every long-lived service of one console process.
#[derive(Clone)]
pub struct Services {
    pub config: Config,
    pub content: ContentService,
    pub auth: AuthService,
    pub queue: JobQueue,
    pub generation: Generation,
}

impl Services {
    /// Services over `storage` with AI clients from `factory`.
    pub fn new(config: Config, storage: Arc<dyn Storage>, factory: Arc<dyn ClientFactory>) -> Self {
        let repo = Repository::new(storage);
        let content = ContentService::new(repo.clone(), config.media.clone());
        let auth = AuthService::new(repo, config.auth.session_ttl_hours);
        let queue = JobQueue::new(config.jobs.history_limit);
        let generation = Generation::new(
            content.clone(),
            factory,
            GenerationOptions {
                research_section_delay: Duration::from_millis(config.jobs.research_section_delay_ms),
                site_base_url: config.site.public_base_url.clone(),
            },
        );
        Self {
            config,
            content,
            auth,
            queue,
            generation,
        }
    }

    /// Services with the real provider clients, in memory or on libSQL.
    pub async fn from_config(config: Config, mode: StorageMode) -> Result<Self> {
        let storage = open_storage(&config, mode).await?;
        let factory = Arc::new(HttpClientFactory::new(config.ai.clone())?);
        Ok(Self::new(config, storage, factory))
    }

    pub fn task_runner(&self, source: Arc<dyn ImageSource>) -> TaskRunner {
        let fetcher = MediaCandidateFetcher::new(self.content.clone(), source);
        TaskRunner::new(
            self.generation.clone(),
            fetcher,
            self.config.jobs.system_user_id,
        )
    }

    /// Task runner searching Wikimedia Commons.
    pub fn default_task_runner(&self) -> Result<TaskRunner> {
        let client = WikimediaClient::new(&self.config.wikimedia)?;
        Ok(self.task_runner(Arc::new(client)))
    }

    pub fn worker_pool(&self, handler: Arc<dyn JobHandler>) -> WorkerPool {
        WorkerPool::new(
            self.queue.clone(),
            handler,
            self.config.jobs.workers,
            self.config.jobs.max_attempts,
            Duration::from_secs(self.config.jobs.retry_delay_seconds),
        )
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.content.clone(),
            self.queue.clone(),
            self.auth.clone(),
            self.config.auth.require_login,
        )
    }

    pub async fn seed(&self) -> Result<SeedReport> {
        let catalog = Catalog::builtin()?;
        Seeder::new(&self.content, &self.auth)
            .run(&catalog, &self.config.auth)
            .await
    }
}

#[cfg(feature = "db")]
async fn open_storage(config: &Config, mode: StorageMode) -> Result<Arc<dyn Storage>> {
    use crate::storage::DatabaseStorage;

    if mode == StorageMode::InMemory {
        info!("Using in-memory storage");
        return Ok(Arc::new(InMemoryStorage::new()));
    }
    let url = config.database.url.as_deref().ok_or_else(|| {
        ConsoleError::Config(
            "DATABASE_URL or database.url is required; pass --in-memory to serve without one"
                .into(),
        )
    })?;
    let storage = DatabaseStorage::connect(url, config.database.auth_token.as_deref()).await?;
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "db"))]
async fn open_storage(_config: &Config, mode: StorageMode) -> Result<Arc<dyn Storage>> {
    if mode == StorageMode::Database {
        return Err(ConsoleError::Config(
            "database storage requires building with the `db` feature; \
             pass --in-memory to serve without one"
                .into(),
        ));
    }
    info!("Using in-memory storage");
    Ok(Arc::new(InMemoryStorage::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn database_mode_without_database_is_a_config_error() {
        let mut config = Config::default();
        config.database.url = None;
        let err = open_storage(&config, StorageMode::Database).await.err().unwrap();
        assert!(matches!(err, ConsoleError::Config(_)));
    }

    #[tokio::test]
    async fn in_memory_mode_needs_no_database() {
        let mut config = Config::default();
        config.database.url = None;
        let storage = open_storage(&config, StorageMode::InMemory).await.unwrap();
        assert_eq!(storage.insert("tag", serde_json::json!({})).await.unwrap(), 1);
    }
}
