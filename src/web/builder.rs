//! Read-only browser of the model definitions.

use crate::orm::meta::Options;
use crate::table::{ModelFieldTable, ModelIndexTable, ModelTable, TableView};
use crate::web::error::Result;
use crate::web::state::ScaffoldState;
use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct ModelsView {
    pub table: TableView,
}

#[derive(Debug, Serialize)]
pub struct ModelView {
    pub name: String,
    pub localized: bool,
    pub options: Options,
    pub formats: BTreeMap<String, String>,
    pub fields: TableView,
    pub indexes: TableView,
    /// Models without a relation to this one
    pub unlinked: Vec<String>,
    pub scaffold_url: String,
}

pub async fn list_models(State(state): State<ScaffoldState>) -> Result<Json<ModelsView>> {
    let settings = &state.settings;

    let table = ModelTable::new(&state.orm, state.translator.as_ref())
        .with_model_action(format!("{}/model/%model%", settings.orm_path))
        .with_scaffold_action(format!("{}/%model%", settings.base_path))
        .build()?;

    Ok(Json(ModelsView { table }))
}

pub async fn show_model(State(state): State<ScaffoldState>, Path(name): Path<String>) -> Result<Json<ModelView>> {
    let model = state.orm.get_model(&name)?;
    let meta = model.meta();
    let model_action = format!("{}/model/%model%", state.settings.orm_path);

    Ok(Json(ModelView {
        name: meta.name.clone(),
        localized: meta.is_localized(),
        options: meta.options.clone(),
        formats: meta.formats().clone(),
        fields: ModelFieldTable::new(state.translator.as_ref(), meta)
            .with_model_action(model_action)
            .build(),
        indexes: ModelIndexTable::new(state.translator.as_ref(), meta.indexes()).build(),
        unlinked: state.orm.unlinked_models(&meta.name)?,
        scaffold_url: format!("{}/{}", state.settings.base_path, urlencoding::encode(&meta.name)),
    }))
}
