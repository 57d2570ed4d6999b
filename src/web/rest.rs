//! JSON listing of the models with the `rest.expose` option, used by the
//! autocomplete fields of the forms.

use crate::orm::entry::Entry;
use crate::orm::meta::option;
use crate::web::error::{Result, WebError};
use crate::web::state::ScaffoldState;
use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestQuery {
    pub locale: Option<String>,
    pub limit: Option<usize>,
    pub page: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RestListing {
    pub data: Vec<Entry>,
    pub total: usize,
}

pub async fn list_entries(
    State(state): State<ScaffoldState>,
    Path(name): Path<String>,
    Query(query): Query<RestQuery>,
) -> Result<Json<RestListing>> {
    let model = state.orm.get_model(&name)?;

    if !model.meta().options.get_bool(option::REST_EXPOSE) {
        return Err(WebError::not_found(format!("Model '{}' is not exposed", name)));
    }

    let locale = match &query.locale {
        Some(code) => state
            .i18n
            .get_locale(code)
            .map_err(|_| WebError::not_found(format!("Locale '{}' is not available", code)))?
            .to_string(),
        None => state.i18n.default_locale().to_string(),
    };

    let mut model_query = model.create_query(Some(&locale));
    if model.meta().is_localized() {
        model_query.set_fetch_unlocalized(true);
    }

    let total = model.count(&model_query)?;

    let limit = query.limit.filter(|limit| *limit > 0).unwrap_or(DEFAULT_LIMIT);
    let page = query.page.unwrap_or(1).max(1);
    model_query.set_limit(limit, (page - 1) * limit);

    let data = model.find(&model_query)?;

    Ok(Json(RestListing { data, total }))
}
