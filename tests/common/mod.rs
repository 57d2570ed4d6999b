#![allow(dead_code)]

use axum::{
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode},
};
use orm_scaffold::orm::meta::option;
use orm_scaffold::{ModelField, ModelMeta, OrmManager, PropertyType};
use serde_json::Value;
use tower::ServiceExt;

/// Articles written by a person and tagged with tags.
pub fn blog_models() -> Vec<ModelMeta> {
    let person = ModelMeta::new("Person")
        .with_field(
            ModelField::property("name", PropertyType::String)
                .option(option::VALIDATION_REQUIRED, "true")
                .option(option::SEARCH, "true")
                .option(option::ORDER, "true"),
        )
        .with_format("title", "{name}");

    let tag = ModelMeta::new("Tag")
        .with_field(ModelField::property("name", PropertyType::String))
        .with_format("title", "{name}")
        .with_option(option::REST_EXPOSE, "true")
        .with_option(option::ORDER_FIELD, "name");

    let article = ModelMeta::new("Article")
        .with_field(
            ModelField::property("title", PropertyType::String)
                .option(option::VALIDATION_REQUIRED, "true")
                .option(option::SEARCH, "true"),
        )
        .with_field(ModelField::property("teaser", PropertyType::Text))
        .with_field(ModelField::belongs_to("author", "Person"))
        .with_field(ModelField::has_many("tags", "Tag").option(option::FORM_DEPTH, "0"))
        .with_format("title", "{title}")
        .with_format("teaser", "{teaser}");

    vec![person, tag, article]
}

pub fn blog_orm() -> OrmManager {
    OrmManager::in_memory(blog_models()).unwrap()
}

pub async fn send(
    app: &axum::Router,
    method: Method,
    uri: &str,
    payload: Option<Value>,
) -> (StatusCode, HeaderMap, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);

    let request = match payload {
        Some(payload) => builder
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let response = app.clone().oneshot(request).await.expect("response expected");
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should be readable");

    (status, headers, body.to_vec())
}

pub async fn send_json(app: &axum::Router, method: Method, uri: &str, payload: Option<Value>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, method, uri, payload).await;

    if body.is_empty() {
        return (status, Value::Null);
    }

    let json = serde_json::from_slice::<Value>(&body).expect("body should be valid JSON");
    (status, json)
}

pub fn location(headers: &HeaderMap) -> &str {
    headers
        .get("location")
        .and_then(|value| value.to_str().ok())
        .expect("redirect should carry a location")
}
