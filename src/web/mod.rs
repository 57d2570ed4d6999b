//! HTTP surface: scaffold screens, the model browser and the REST listing.
//!
//! Screens answer with JSON views; rendering them is left to the client.

pub mod builder;
pub mod error;
pub mod rest;
pub mod route;
pub mod scaffold;
pub mod state;

pub use error::{ErrorResponse, Result, WebError};
pub use route::{ScaffoldAction, ScaffoldRoute};
pub use state::{ScaffoldSettings, ScaffoldState};

use axum::{Json, Router, http::Method, routing::get};
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn build_router(state: ScaffoldState) -> Router {
    let settings = state.settings.clone();
    let base = settings.base_path.trim_end_matches('/');
    let orm = settings.orm_path.trim_end_matches('/');
    let api = settings.api_base.trim_end_matches('/');

    Router::new()
        .route("/health", get(healthcheck))
        .route(orm_root(orm), get(builder::list_models))
        .route(&format!("{}/model/:model", orm), get(builder::show_model))
        .route(&format!("{}/orm/:model", api), get(rest::list_entries))
        .route(
            &format!("{}/*path", base),
            get(scaffold::get_scaffold).post(scaffold::post_scaffold),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn orm_root(orm: &str) -> &str {
    if orm.is_empty() { "/" } else { orm }
}
