use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use content_console::app::{Services, StorageMode};
use content_console::config::Config;
use content_console::domain::TranslatableKind;
use content_console::jobs::Job;
use content_console::{logging, metrics, server};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "content-console")]
#[command(about = "Editorial content pipeline console")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the GraphQL API server and job workers
    Serve {
        /// Serve a Prometheus exporter on this address
        #[arg(long)]
        metrics_addr: Option<SocketAddr>,

        /// Keep all records in memory instead of the configured database
        #[arg(long)]
        in_memory: bool,

        /// Skip seeding the reference catalogue on startup
        #[arg(long)]
        no_seed: bool,
    },
    /// Load models, agents, taxonomies and hashtag groups
    Seed,
    /// Create an active console user
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "Administrator")]
        name: String,
    },
    /// Research and write articles for every approved suggestion without research
    BulkGenerate,
    /// List approved languages
    Languages,
    /// Report records whose translatable fields lack a translation
    MissingTranslations {
        /// Only check this language code
        #[arg(long)]
        language: Option<String>,
        /// Translate every gap that is found
        #[arg(long)]
        fix: bool,
    },
    /// Translate one record into an approved language
    Translate {
        /// taxonomy, category, tag, article, media or social_media_post
        #[arg(value_parser = parse_kind)]
        kind: TranslatableKind,
        id: i64,
        #[arg(long)]
        language: String,
        /// Limit to these fields
        #[arg(long = "field")]
        fields: Vec<String>,
    },
}

fn parse_kind(value: &str) -> std::result::Result<TranslatableKind, String> {
    TranslatableKind::from_key(value).ok_or_else(|| format!("unknown record kind '{value}'"))
}

/// Only `serve --in-memory` runs without the configured database.
fn storage_mode(command: &Commands) -> StorageMode {
    match command {
        Commands::Serve { in_memory: true, .. } => StorageMode::InMemory,
        _ => StorageMode::Database,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    let services = Services::from_config(config, storage_mode(&cli.command)).await?;

    match cli.command {
        Commands::Serve {
            metrics_addr,
            no_seed,
            ..
        } => serve(services, metrics_addr, no_seed).await?,
        Commands::Seed => {
            let report = services.seed().await?;
            println!("🌱 Seeded {} records", report.total());
            println!("   models: {}, agents: {}", report.models, report.agents);
            println!(
                "   taxonomies: {}, categories: {}",
                report.taxonomies, report.categories
            );
            println!(
                "   accounts: {}, hashtag groups: {}, languages: {}",
                report.accounts, report.hashtag_groups, report.languages
            );
        }
        Commands::CreateAdmin {
            email,
            password,
            name,
        } => {
            let user = services.auth.create_user(&email, &password, &name).await?;
            println!("✅ Created user {} ({})", user.email, user.id);
        }
        Commands::BulkGenerate => {
            let result = run_job(&services, Job::BulkGeneration).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Languages => {
            for language in services.content.list_languages(false).await? {
                println!(
                    "{:<6} {:<20} {}{}",
                    language.code,
                    language.name,
                    if language.is_active { "active" } else { "inactive" },
                    if language.is_default { " (default)" } else { "" }
                );
            }
        }
        Commands::MissingTranslations { language, fix } => {
            let gaps = services
                .content
                .missing_translations(None, language.as_deref())
                .await?;
            if gaps.is_empty() {
                println!("✅ No missing translations");
            }
            for gap in gaps {
                println!(
                    "{} {} [{}]: {}",
                    gap.kind.as_str(),
                    gap.entity_id,
                    gap.language,
                    gap.fields.join(", ")
                );
                if fix {
                    let job = Job::TranslateEntity {
                        entity_kind: gap.kind,
                        entity_id: gap.entity_id,
                        language: gap.language,
                        fields: gap.fields,
                    };
                    match run_job(&services, job).await {
                        Ok(result) => println!("   translated: {result}"),
                        Err(e) => println!("   ❌ {e}"),
                    }
                }
            }
        }
        Commands::Translate {
            kind,
            id,
            language,
            fields,
        } => {
            let job = Job::TranslateEntity {
                entity_kind: kind,
                entity_id: id,
                language,
                fields,
            };
            let result = run_job(&services, job).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

/// Run one job to completion in this process and return its result.
async fn run_job(services: &Services, job: Job) -> Result<serde_json::Value> {
    let kind = job.kind();
    let runner = services.default_task_runner()?;
    let pool = services.worker_pool(Arc::new(runner));
    let enqueued = services.queue.enqueue(job).await?;
    if let Some((id, job)) = services.queue.next().await {
        pool.run(id, job).await;
    }
    let record = services
        .queue
        .get(enqueued.id)
        .await
        .with_context(|| format!("{kind} job disappeared"))?;
    match (record.result, record.error) {
        (Some(result), _) => Ok(result),
        (None, Some(error)) => anyhow::bail!("{kind} failed: {error}"),
        (None, None) => anyhow::bail!("{kind} did not finish"),
    }
}

async fn serve(services: Services, metrics_addr: Option<SocketAddr>, no_seed: bool) -> Result<()> {
    if let Some(addr) = metrics_addr {
        metrics::init_metrics(addr);
    }

    if !no_seed {
        let report = services.seed().await?;
        info!("Seeded {} reference records", report.total());
    }
    if services.config.auth.require_login && !services.auth.has_users().await? {
        warn!("Login is required but no users exist; run `create-admin` or set CONSOLE_ADMIN_EMAIL");
    }

    let runner = services.default_task_runner()?;
    let workers = services.worker_pool(Arc::new(runner)).spawn();

    let server_config = &services.config.server;
    let addr: SocketAddr = format!("{}:{}", server_config.host, server_config.port)
        .parse()
        .context("invalid server address")?;

    println!("📡 Server endpoints:");
    println!("   GraphQL API: http://{}/graphql", addr);
    println!("   GraphiQL:    http://{}/graphiql", addr);
    println!("   Health:      http://{}/health", addr);
    if let Some(metrics_addr) = metrics_addr {
        println!("   Metrics:     http://{}/metrics", metrics_addr);
    }

    server::start_server(services.app_state(), addr).await?;

    services.queue.close();
    for handle in workers {
        let _ = handle.await;
    }
    info!("Job workers stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("content-console").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn serve_has_no_metrics_listener_by_default() {
        match parse(&["serve"]).command {
            Commands::Serve { metrics_addr, .. } => assert!(metrics_addr.is_none()),
            _ => panic!("expected serve"),
        }
        match parse(&["serve", "--metrics-addr", "127.0.0.1:9464"]).command {
            Commands::Serve { metrics_addr, .. } => {
                assert_eq!(metrics_addr, Some("127.0.0.1:9464".parse().unwrap()))
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn only_in_memory_serve_skips_the_database() {
        assert_eq!(
            storage_mode(&parse(&["serve", "--in-memory"]).command),
            StorageMode::InMemory
        );
        assert_eq!(storage_mode(&parse(&["serve"]).command), StorageMode::Database);
        assert_eq!(storage_mode(&parse(&["seed"]).command), StorageMode::Database);
        assert_eq!(storage_mode(&parse(&["bulk-generate"]).command), StorageMode::Database);
        assert_eq!(
            storage_mode(&parse(&["translate", "tag", "3", "--language", "es"]).command),
            StorageMode::Database
        );
        assert_eq!(
            storage_mode(
                &parse(&["create-admin", "--email", "a@b.c", "--password", "password1"]).command
            ),
            StorageMode::Database
        );
    }

    #[test]
    fn translate_parses_kind_and_repeated_fields() {
        match parse(&[
            "translate", "social-media-post", "7", "--language", "es", "--field", "content",
            "--field", "hashtags",
        ])
        .command
        {
            Commands::Translate {
                kind, id, fields, ..
            } => {
                assert_eq!(kind, TranslatableKind::SocialMediaPost);
                assert_eq!(id, 7);
                assert_eq!(fields, vec!["content".to_string(), "hashtags".to_string()]);
            }
            _ => panic!("expected translate"),
        }
        assert!(Cli::try_parse_from(["content-console", "translate", "poem", "1", "--language", "es"]).is_err());
    }
}
