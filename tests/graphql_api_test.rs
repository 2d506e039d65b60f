mod common;

use async_graphql::Request;
use common::*;
use content_console::app::Services;
use content_console::content::{NewSuggestion, NewTranslation};
use content_console::domain::{ArticleLevel, GenerationMeta, TranslatableKind, User};
use content_console::graphql::{RequestLanguage, Viewer};
use serde_json::{json, Value};

async fn execute(services: &Services, query: &str, user: Option<User>) -> Value {
    let schema = services.app_state().schema;
    let response = schema
        .execute(Request::new(query).data(Viewer { user }))
        .await;
    serde_json::to_value(&response).unwrap()
}

async fn editor(services: &Services) -> User {
    services
        .auth
        .create_user("editor@example.org", "correct horse", "Editor")
        .await
        .unwrap()
}

#[tokio::test]
async fn anonymous_writes_are_refused_when_login_is_required() {
    let services = seeded_services(Script::new(Vec::<String>::new()), true).await;
    let body = execute(
        &services,
        r#"mutation { createTaxonomy(input: {name: "Economy", description: "Trade"}) { id } }"#,
        None,
    )
    .await;

    assert_eq!(body["errors"][0]["extensions"]["code"], "UNAUTHENTICATED");
    assert!(body["errors"][0]["message"]
        .as_str()
        .unwrap()
        .contains("Authentication required"));
}

#[tokio::test]
async fn reads_are_open_to_anonymous_viewers() {
    let services = seeded_services(Script::new(Vec::<String>::new()), true).await;
    let body = execute(
        &services,
        "{ taxonomies { name categories { name } } pipelineStats { suggestions { pending } } me { email } }",
        None,
    )
    .await;

    assert!(body.get("errors").is_none(), "{body}");
    let taxonomies = body["data"]["taxonomies"].as_array().unwrap();
    assert_eq!(taxonomies.len(), 4);
    assert!(taxonomies
        .iter()
        .flat_map(|t| t["categories"].as_array().unwrap())
        .any(|c| c["name"] == "Colonial Period"));
    assert_eq!(body["data"]["pipelineStats"]["suggestions"]["pending"], 0);
    assert_eq!(body["data"]["me"], Value::Null);
}

#[tokio::test]
async fn generate_suggestions_queues_a_job() {
    let services = seeded_services(Script::new(Vec::<String>::new()), true).await;
    let user = editor(&services).await;
    let category_id = category_id(&services, "Colonial Period").await;

    let query = format!(
        "mutation {{ generateSuggestions(categoryId: {category_id}, count: 2, level: HIGH_SCHOOL) {{ success message jobId position }} }}"
    );
    let body = execute(&services, &query, Some(user)).await;

    let response = &body["data"]["generateSuggestions"];
    assert_eq!(response["success"], true);
    assert_eq!(response["message"], "Job created successfully");
    assert_eq!(response["position"], 1);

    let job_id = response["jobId"].as_str().unwrap();
    let body = execute(
        &services,
        &format!(r#"{{ job(id: "{job_id}") {{ kind state position }} }}"#),
        None,
    )
    .await;
    assert_eq!(
        body["data"]["job"],
        json!({"kind": "generate_suggestions", "state": "QUEUED", "position": 1})
    );
}

async fn pending_suggestion(services: &Services, title: &str) -> i64 {
    let category_id = category_id(services, "Colonial Period").await;
    services
        .content
        .create_suggestion(NewSuggestion {
            category_id,
            title: title.into(),
            main_topic: "Trade fairs".into(),
            sub_topics: vec!["Galleons".into()],
            point_of_view: "Economic".into(),
            level: ArticleLevel::General,
            model_id: None,
            tokens_used: None,
            generation_started_at: None,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn research_for_unapproved_suggestion_is_a_user_error() {
    let services = seeded_services(Script::new(Vec::<String>::new()), true).await;
    let user = editor(&services).await;
    let id = pending_suggestion(&services, "Portobelo Fairs").await;

    let body = execute(
        &services,
        &format!("mutation {{ generateResearch(suggestionId: {id}) {{ success }} }}"),
        Some(user),
    )
    .await;
    assert_eq!(body["errors"][0]["extensions"]["code"], "BAD_USER_INPUT");
    assert_eq!(services.queue.pending_count().await, 0);
}

#[tokio::test]
async fn approving_stamps_the_viewer_and_rejecting_clears_it() {
    let services = seeded_services(Script::new(Vec::<String>::new()), true).await;
    let user = editor(&services).await;
    let user_id = user.id;
    let id = pending_suggestion(&services, "Portobelo Fairs").await;

    let approve = format!(
        "mutation {{ updateSuggestionStatus(id: {id}, status: APPROVED) {{ status approvedById approvedAt }} }}"
    );
    let body = execute(&services, &approve, Some(user.clone())).await;
    let suggestion = &body["data"]["updateSuggestionStatus"];
    assert_eq!(suggestion["status"], "APPROVED");
    assert_eq!(suggestion["approvedById"], user_id);
    assert!(suggestion["approvedAt"].is_string());

    let reject = format!(
        "mutation {{ updateSuggestionStatus(id: {id}, status: REJECTED) {{ status approvedById approvedAt }} }}"
    );
    let body = execute(&services, &reject, Some(user)).await;
    assert_eq!(
        body["data"]["updateSuggestionStatus"],
        json!({"status": "REJECTED", "approvedById": null, "approvedAt": null})
    );
}

#[tokio::test]
async fn suggestions_are_paginated() {
    let services = seeded_services(Script::new(Vec::<String>::new()), true).await;
    for title in ["Galleons", "Fairs", "Forts"] {
        pending_suggestion(&services, title).await;
    }

    let body = execute(
        &services,
        "{ articleSuggestions(page: 2, pageSize: 2, sort: \"title\", dir: \"asc\") { total pages currentPage suggestions { title } } }",
        None,
    )
    .await;
    assert_eq!(
        body["data"]["articleSuggestions"],
        json!({"total": 3, "pages": 2, "currentPage": 2, "suggestions": [{"title": "Galleons"}]})
    );
}

#[tokio::test]
async fn translated_text_follows_the_request_language() {
    let services = seeded_services(Script::new(Vec::<String>::new()), true).await;
    let category_id = category_id(&services, "Colonial Period").await;
    services
        .content
        .save_translation(NewTranslation {
            kind: TranslatableKind::Category,
            entity_id: category_id,
            field: "name".into(),
            language: "es".into(),
            content: "Período colonial".into(),
            generation: GenerationMeta::default(),
        })
        .await
        .unwrap();

    let query = format!(
        "{{ requestLanguage translatedText(kind: CATEGORY, entityId: {category_id}, field: \"name\") languages(activeOnly: true) {{ code isDefault }} }}"
    );
    let schema = services.app_state().schema;
    let request = |language: &str| {
        async_graphql::Request::new(query.clone())
            .data(Viewer { user: None })
            .data(RequestLanguage(language.to_string()))
    };

    let spanish = serde_json::to_value(schema.execute(request("es")).await).unwrap();
    assert!(spanish.get("errors").is_none(), "{spanish}");
    assert_eq!(spanish["data"]["requestLanguage"], "es");
    assert_eq!(spanish["data"]["translatedText"], "Período colonial");
    assert_eq!(spanish["data"]["languages"].as_array().unwrap().len(), 2);

    let english = serde_json::to_value(schema.execute(request("en")).await).unwrap();
    assert_eq!(english["data"]["translatedText"], "Colonial Period");
}

#[tokio::test]
async fn translate_entity_queues_a_job_for_ready_records() {
    let services = seeded_services(Script::new(Vec::<String>::new()), true).await;
    let user = editor(&services).await;
    let category_id = category_id(&services, "Colonial Period").await;

    let query = format!(
        "mutation {{ translateEntity(kind: CATEGORY, entityId: {category_id}, language: \"es\") {{ success }} }}"
    );
    let body = execute(&services, &query, Some(user.clone())).await;
    assert_eq!(body["data"]["translateEntity"]["success"], true, "{body}");

    let query = format!(
        "mutation {{ translateEntity(kind: CATEGORY, entityId: {category_id}, language: \"fr\") {{ success }} }}"
    );
    let body = execute(&services, &query, Some(user)).await;
    assert!(body["errors"][0]["message"]
        .as_str()
        .unwrap()
        .contains("not approved for translation"));
}
