mod common;

use axum::http::{Method, StatusCode};
use common::{location, send, send_json};
use orm_scaffold::orm::meta::option;
use orm_scaffold::services::{GrantedPermissions, I18n, MapTranslator};
use orm_scaffold::web::{ScaffoldSettings, ScaffoldState, build_router};
use orm_scaffold::{ModelField, ModelMeta, OrmManager, PropertyType};
use serde_json::json;
use std::sync::Arc;

fn app() -> axum::Router {
    build_router(ScaffoldState::new(common::blog_orm()))
}

async fn add_article(app: &axum::Router, title: &str, author: &str) {
    let (status, headers, _) = send(
        app,
        Method::POST,
        "/scaffold/Article/en/add",
        Some(json!({"data": {"title": title, "author": {"name": author}}})),
    )
    .await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/scaffold/Article/en");
}

#[tokio::test]
async fn index_redirects_to_canonical_arguments() {
    let app = app();

    let (status, headers, _) = send(&app, Method::GET, "/scaffold/Article", None).await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/scaffold/Article/en?page=1&rows=25");
}

#[tokio::test]
async fn unpaginated_index_settles_after_one_redirect() {
    let settings = ScaffoldSettings {
        default_rows: 0,
        ..ScaffoldSettings::default()
    };
    let app = build_router(ScaffoldState::new(common::blog_orm()).with_settings(settings));

    let (status, headers, _) = send(&app, Method::GET, "/scaffold/Tag", None).await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    let canonical = location(&headers).to_string();
    assert!(canonical.starts_with("/scaffold/Tag/en?page=1"));
    assert!(!canonical.contains("rows="));

    let (status, _) = send_json(&app, Method::GET, &canonical, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(&app, Method::GET, "/scaffold/Article/en?page=1&rows=0", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn index_lists_entries_with_actions_and_exports() {
    let app = app();
    add_article(&app, "First", "Ada").await;
    add_article(&app, "Second", "Grace").await;

    let (status, body) = send_json(&app, Method::GET, "/scaffold/Article/en?page=1&rows=25", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "Article");
    assert_eq!(body["table"]["count"], 2);
    assert_eq!(body["table"]["rows"].as_array().unwrap().len(), 2);
    assert_eq!(body["table"]["actions"][0]["name"], "delete");
    assert_eq!(body["table"]["actions"][0]["url"], "/scaffold/Article/en/delete");
    assert_eq!(body["exports"]["csv"], "/scaffold/Article/en/export/csv");
    assert_eq!(body["actions"].as_object().unwrap().len(), 1);

    let first_row = &body["table"]["rows"][0];
    assert_eq!(first_row["cells"][0]["class"], "option");
    assert!(first_row["cells"][1]["value"].as_str().unwrap().contains("First"));
}

#[tokio::test]
async fn index_searches_and_paginates() {
    let app = app();
    for index in 0..3 {
        add_article(&app, &format!("Rust {}", index), "Ada").await;
    }
    add_article(&app, "Cooking", "Ada").await;

    let (_, body) = send_json(&app, Method::GET, "/scaffold/Article/en?page=2&rows=2&search=rust", None).await;

    assert_eq!(body["table"]["count"], 3);
    assert_eq!(body["table"]["pages"], 2);
    assert_eq!(body["table"]["page"], 2);
    assert_eq!(body["table"]["rows"].as_array().unwrap().len(), 1);
    assert_eq!(body["table"]["search_query"], "rust");

    let (_, body) = send_json(&app, Method::GET, "/scaffold/Article/en?page=9&rows=2", None).await;
    assert_eq!(body["table"]["page"], 1);
}

#[tokio::test]
async fn person_index_orders_by_name() {
    let app = app();
    add_article(&app, "One", "Bob").await;
    add_article(&app, "Two", "Alice").await;

    let (status, body) = send_json(
        &app,
        Method::GET,
        "/scaffold/Person/en?page=1&rows=10&order=Name&direction=desc",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["table"]["order_methods"], json!(["Name"]));
    assert_eq!(body["table"]["order_direction"], "desc");
    let rows = body["table"]["rows"].as_array().unwrap();
    assert!(rows[0]["cells"][1]["value"].as_str().unwrap().contains("Bob"));
    assert!(rows[1]["cells"][1]["value"].as_str().unwrap().contains("Alice"));
}

#[tokio::test]
async fn edit_form_is_prefilled() {
    let app = app();
    add_article(&app, "Hello", "Ada").await;

    let (status, body) = send_json(&app, Method::GET, "/scaffold/Article/en/edit/1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subtitle"], "Hello");
    assert_eq!(body["data"]["title"], "Hello");
    assert_eq!(body["data"]["author"]["name"], "Ada");
    assert_eq!(body["form"]["rows"][1]["name"], "title");
    assert_eq!(body["is_writable"], true);

    let (status, _) = send_json(&app, Method::GET, "/scaffold/Article/en/edit/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn edit_submission_updates_and_returns_to_referer() {
    let app = app();
    add_article(&app, "Draft", "Ada").await;

    let (status, headers, _) = send(
        &app,
        Method::POST,
        "/scaffold/Article/en/edit/1?referer=%2Fscaffold%2FArticle%2Fen%3Fpage%3D1",
        Some(json!({"data": {"id": 1, "title": "Final", "author": {"name": "Ada"}}})),
    )
    .await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/scaffold/Article/en?page=1");

    let (_, body) = send_json(&app, Method::GET, "/scaffold/Article/en/edit/1", None).await;
    assert_eq!(body["data"]["title"], "Final");
}

#[tokio::test]
async fn invalid_submission_returns_form_with_errors() {
    let app = app();

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/scaffold/Article/en/add",
        Some(json!({"data": {"title": "", "author": {"name": "Ada"}}})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["fields"]["title"][0]["code"], "error.validation.required");
    assert_eq!(body["data"]["author"]["name"], "Ada");

    let (_, body) = send_json(&app, Method::GET, "/scaffold/Article/en?page=1&rows=25", None).await;
    assert_eq!(body["table"]["count"], 0);
}

#[tokio::test]
async fn cancelled_submission_saves_nothing() {
    let app = app();

    let (status, headers, _) = send(
        &app,
        Method::POST,
        "/scaffold/Article/en/add",
        Some(json!({"data": {"title": "Ignored"}, "cancel": true})),
    )
    .await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/scaffold/Article/en");

    let (_, body) = send_json(&app, Method::GET, "/scaffold/Article/en?page=1&rows=25", None).await;
    assert_eq!(body["table"]["count"], 0);
}

#[tokio::test]
async fn detail_redirects_to_edit() {
    let app = app();

    let (status, headers, _) = send(&app, Method::GET, "/scaffold/Article/en/3", None).await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/scaffold/Article/en/edit/3");
}

#[tokio::test]
async fn export_streams_csv_attachment() {
    let app = app();
    add_article(&app, "Hello, world", "Ada").await;

    let (status, headers, body) = send(&app, Method::GET, "/scaffold/Article/en/export/csv", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "text/csv; charset=utf-8");
    assert_eq!(headers["content-disposition"], "attachment; filename=\"Article.csv\"");

    let csv = String::from_utf8(body).unwrap();
    assert!(csv.starts_with("Id,Title,Teaser,Author,Tags\n"));
    assert!(csv.contains("\"Hello, world\""));
    assert!(csv.contains("Ada"));

    let (status, _) = send_json(&app, Method::GET, "/scaffold/Article/en/export/xls", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, headers, _) = send(&app, Method::GET, "/scaffold/Article/export/json", None).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/scaffold/Article/en/export/json");
}

#[tokio::test]
async fn delete_reports_every_item() {
    let app = app();
    add_article(&app, "Doomed", "Ada").await;

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/scaffold/Article/en/delete",
        Some(json!({"ids": [1, 99]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], json!([1]));
    assert_eq!(body["messages"][0]["kind"], "success");
    assert_eq!(body["messages"][1]["kind"], "error");
    assert_eq!(body["referer"], "/scaffold/Article/en");
}

#[tokio::test]
async fn delete_of_referenced_entry_reports_reason() {
    let app = app();
    add_article(&app, "Kept", "Ada").await;

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/scaffold/Person/en/delete",
        Some(json!({"ids": [1]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], json!([]));
    assert_eq!(body["messages"][0]["kind"], "error");
    assert!(body["messages"][0]["text"].as_str().unwrap().contains("Article"));
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let app = app();

    for uri in [
        "/scaffold/Ghost",
        "/scaffold/Article/en/edit/x",
        "/scaffold/Article/xx?page=1&rows=25",
        "/scaffold/Article/en/delete",
    ] {
        let (status, body) = send_json(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["code"], "not_found");
    }
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let app = app();

    let (status, body) = send_json(&app, Method::POST, "/scaffold/Article/en/delete", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], json!([]));

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/scaffold/Article/en/add")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.clone(), request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

fn secured_app(permissions: GrantedPermissions) -> axum::Router {
    let vault = ModelMeta::new("Vault")
        .with_field(ModelField::property("name", PropertyType::String))
        .with_option(option::SECURITY, "true");

    let state = ScaffoldState::new(OrmManager::in_memory(vec![vault]).unwrap()).with_permissions(Arc::new(permissions));

    build_router(state)
}

#[tokio::test]
async fn secured_models_require_permissions() {
    let app = secured_app(GrantedPermissions::new());

    let (status, body) = send_json(&app, Method::GET, "/scaffold/Vault/en?page=1&rows=25", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "unauthorized");

    let (status, _) = send_json(&app, Method::GET, "/scaffold/Vault/en/add", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let app = secured_app(GrantedPermissions::new().grant("orm.model.Vault.read"));

    let (status, body) = send_json(&app, Method::GET, "/scaffold/Vault/en?page=1&rows=25", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["actions"].as_object().unwrap().is_empty());
    assert!(body["table"].get("actions").is_none());

    let (status, _) = send_json(&app, Method::POST, "/scaffold/Vault/en/delete", Some(json!({"ids": [1]}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

fn localized_app() -> axum::Router {
    let page = ModelMeta::new("Page")
        .with_field(ModelField::property("title", PropertyType::String).localized())
        .with_format("title", "{title}");

    let state = ScaffoldState::new(OrmManager::in_memory(vec![page]).unwrap())
        .with_i18n(I18n::new(vec!["en".to_string(), "nl".to_string()]))
        .with_translator(Arc::new(
            MapTranslator::new().with("error.delete.translation.empty", "Nothing to delete for %data%"),
        ));

    build_router(state)
}

#[tokio::test]
async fn localized_models_work_per_locale() {
    let app = localized_app();

    let (status, headers, _) = send(&app, Method::GET, "/scaffold/Page", None).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/scaffold/Page/en");

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/scaffold/Page/nl/add",
        Some(json!({"data": {"title": "Hallo"}})),
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    let (_, body) = send_json(&app, Method::GET, "/scaffold/Page/en?page=1&rows=25", None).await;
    assert_eq!(body["table"]["count"], 1);
    assert_eq!(body["locales"], json!(["en", "nl"]));
    assert_eq!(body["localize_url"], "/scaffold/Page/%locale%");
    assert_eq!(body["table"]["actions"][1]["name"], "delete-localized");

    let (_, body) = send_json(
        &app,
        Method::POST,
        "/scaffold/Page/nl/delete-localized",
        Some(json!({"ids": [1]})),
    )
    .await;
    assert_eq!(body["deleted"], json!([1]));

    let (_, body) = send_json(
        &app,
        Method::POST,
        "/scaffold/Page/nl/delete-localized",
        Some(json!({"ids": [1]})),
    )
    .await;
    assert_eq!(body["deleted"], json!([]));
    assert_eq!(body["messages"][0]["kind"], "error");
    assert!(body["messages"][0]["text"].as_str().unwrap().starts_with("Nothing to delete for"));
}
