mod common;

use async_trait::async_trait;
use common::*;
use content_console::app::Services;
use content_console::content::NewSuggestion;
use content_console::domain::{ArticleLevel, ContentStatus, ImageMetadata};
use content_console::error::Result;
use content_console::jobs::{check_preconditions, Job, JobRecord, JobState, WorkerPool};
use content_console::wikimedia::ImageSource;
use std::sync::Arc;

/// Returns the same Commons file for every search.
struct OneImage;

#[async_trait]
impl ImageSource for OneImage {
    async fn search_images(&self, _query: &str, _limit: usize) -> Result<Vec<ImageMetadata>> {
        Ok(vec![mule_train()])
    }

    async fn search_category(&self, _category: &str, _limit: usize) -> Result<Vec<ImageMetadata>> {
        Ok(vec![mule_train()])
    }
}

fn mule_train() -> ImageMetadata {
    ImageMetadata {
        commons_id: "File:Mule_train.jpg".into(),
        commons_url: "https://upload.wikimedia.org/mule_train.jpg".into(),
        title: "Mule train".into(),
        description: Some("Mules crossing the isthmus".into()),
        author: Some("Unknown".into()),
        license: "CC BY-SA 4.0".into(),
        license_url: None,
        width: 800,
        height: 600,
        mime_type: "image/jpeg".into(),
        file_size: 1024,
    }
}

fn pool(services: &Services) -> WorkerPool {
    services.worker_pool(Arc::new(services.task_runner(Arc::new(OneImage))))
}

async fn run(services: &Services, pool: &WorkerPool, job: Job) -> JobRecord {
    check_preconditions(&services.content, &job).await.unwrap();
    let enqueued = services.queue.enqueue(job).await.unwrap();
    let (id, job) = services.queue.next().await.unwrap();
    assert_eq!(id, enqueued.id);
    pool.run(id, job).await;
    services.queue.get(id).await.unwrap()
}

fn id_of(record: &JobRecord, field: &str) -> i64 {
    record.result.as_ref().unwrap()[field].as_i64().unwrap()
}

#[tokio::test]
async fn suggestion_to_published_article_with_media_and_story() {
    let script = Script::new([SUGGESTIONS_REPLY]);
    let services = seeded_services(script.clone(), false).await;
    let pool = pool(&services);
    let category_id = category_id(&services, "Colonial Period").await;
    let editor = Some(7);

    let record = run(
        &services,
        &pool,
        Job::GenerateSuggestions {
            category_id,
            level: ArticleLevel::General,
            count: 1,
        },
    )
    .await;
    assert_eq!(record.state, JobState::Finished);
    let suggestion_id = record.result.as_ref().unwrap()["suggestion_ids"][0]
        .as_i64()
        .unwrap();
    services
        .content
        .update_suggestion_status(suggestion_id, ContentStatus::Approved, editor)
        .await
        .unwrap();

    research_replies().into_iter().for_each(|r| script.push(r));
    let record = run(&services, &pool, Job::GenerateResearch { suggestion_id }).await;
    assert_eq!(record.state, JobState::Finished);
    let research_id = id_of(&record, "research_id");
    let research = services.content.get_research(research_id).await.unwrap().unwrap();
    assert!(research.content.contains("## Mule trains"));
    services
        .content
        .update_research_status(research_id, ContentStatus::Approved, editor)
        .await
        .unwrap();

    article_replies().into_iter().for_each(|r| script.push(r));
    let record = run(&services, &pool, Job::GenerateArticle { research_id }).await;
    let article_id = id_of(&record, "article_id");
    services
        .content
        .update_article_status(article_id, ContentStatus::Approved, editor)
        .await
        .unwrap();
    let article = services.content.publish_article(article_id).await.unwrap();
    assert!(article.published_at.is_some());
    assert_eq!(article.approval.approved_by_id, editor);
    assert_eq!(
        article.content,
        "## Introduction\nSilver crossed the isthmus.\n\n## Mule trains\nThey carried it on mules."
    );
    assert_eq!(article.excerpt.as_deref(), Some("Silver on the move."));

    script.push(
        r#"{"commons_categories": ["Category:Camino Real"], "search_queries": ["mule train Panama"],
            "illustration_topics": ["Mule trains"], "reasoning": "Shows the route."}"#,
    );
    let record = run(&services, &pool, Job::GenerateMediaSuggestions { research_id }).await;
    let media_suggestion_id = id_of(&record, "media_suggestion_id");

    let record = run(
        &services,
        &pool,
        Job::FetchMediaCandidates {
            suggestion_id: media_suggestion_id,
            max_per_query: 5,
        },
    )
    .await;
    let candidate_ids = record.result.as_ref().unwrap()["candidate_ids"]
        .as_array()
        .unwrap()
        .clone();
    // Same file from category and query search is stored once
    assert_eq!(candidate_ids.len(), 1);

    let candidate = services
        .content
        .approve_candidate_and_create_media(candidate_ids[0].as_i64().unwrap(), None, editor)
        .await
        .unwrap();
    let article = services
        .content
        .set_article_feature_image(article_id, candidate.media_id)
        .await
        .unwrap();
    assert!(article.feature_image_id.is_some());

    script.push(
        r#"{"content": "Silver once crossed Panama on mules. Read more!", "hashtags": ["MuleTrains"],
            "selected_hashtag_groups": ["History"]}"#,
    );
    let record = run(&services, &pool, Job::GenerateStoryPromotion { article_id }).await;
    assert_eq!(record.state, JobState::Finished);
    let posts = services
        .content
        .list_social_posts(Some(article_id), None)
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(
        posts[0].hashtags[..4],
        ["Panama", "PanamaHistory", "PanamaInContext", "History"]
    );
    assert_eq!(posts[0].hashtags.last().map(String::as_str), Some("MuleTrains"));

    let stats = services.content.pipeline_stats().await.unwrap();
    assert_eq!(stats.suggestions.approved, 1);
    assert_eq!(stats.articles.approved, 1);
    assert_eq!(stats.published_articles, 1);
    assert_eq!(stats.social_posts.pending, 1);
    assert_eq!(stats.media_candidates.approved, 1);
}

#[tokio::test]
async fn research_for_pending_suggestion_is_refused_before_queueing() {
    let services = seeded_services(Script::new(Vec::<String>::new()), false).await;
    let category_id = category_id(&services, "Colonial Period").await;
    let suggestion = services
        .content
        .create_suggestion(NewSuggestion {
            category_id,
            title: "Portobelo Fairs".into(),
            main_topic: "Trade fairs".into(),
            sub_topics: vec!["Galleons".into()],
            point_of_view: "Economic".into(),
            level: ArticleLevel::General,
            model_id: None,
            tokens_used: None,
            generation_started_at: None,
        })
        .await
        .unwrap();

    let job = Job::GenerateResearch {
        suggestion_id: suggestion.id,
    };
    let err = check_preconditions(&services.content, &job).await.unwrap_err();
    assert!(err.to_string().contains("must be approved"));
    assert_eq!(services.queue.pending_count().await, 0);
}

#[tokio::test]
async fn failed_research_is_recorded_on_the_suggestion() {
    let script = Script::new(["# Abstract"]);
    let services = seeded_services(script, false).await;
    let pool = pool(&services);
    let category_id = category_id(&services, "Colonial Period").await;
    let suggestion = services
        .content
        .create_suggestion(NewSuggestion {
            category_id,
            title: "Portobelo Fairs".into(),
            main_topic: "Trade fairs".into(),
            sub_topics: vec![],
            point_of_view: "Economic".into(),
            level: ArticleLevel::College,
            model_id: None,
            tokens_used: None,
            generation_started_at: None,
        })
        .await
        .unwrap();
    services
        .content
        .update_suggestion_status(suggestion.id, ContentStatus::Approved, Some(1))
        .await
        .unwrap();

    let record = run(
        &services,
        &pool,
        Job::GenerateResearch {
            suggestion_id: suggestion.id,
        },
    )
    .await;
    assert_eq!(record.state, JobState::Failed);
    assert!(record.error.as_deref().unwrap().contains("script exhausted"));

    let suggestion = services
        .content
        .get_suggestion(suggestion.id)
        .await
        .unwrap()
        .unwrap();
    assert!(suggestion.generation.last_generation_error.is_some());
    assert!(services
        .content
        .research_for_suggestion(suggestion.id)
        .await
        .unwrap()
        .is_empty());
}
