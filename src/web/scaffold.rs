//! Scaffold screens of one model: listing, add/edit forms, export and batch
//! deletes.
//!
//! Permissions are only checked for models with the `scaffold.security`
//! option, as `orm.model.{Model}.{read|write|delete}`.

use crate::core::{FieldError, OrmError, ValidationError};
use crate::export;
use crate::form::{FormData, FormErrors, ScaffoldForm, ScaffoldFormConfig};
use crate::orm::entry::Entry;
use crate::orm::format::default_title;
use crate::orm::meta::option;
use crate::orm::model::Model;
use crate::table::scaffold::field_label;
use crate::table::{
    EntryDecorator, LocalizeDecorator, OrderSetting, ScaffoldTable, SearchSetting, TableAction, TableView,
};
use crate::web::error::{Result, WebError};
use crate::web::route::{LOCALE_PLACEHOLDER, ScaffoldAction, ScaffoldRoute};
use crate::web::state::ScaffoldState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

const PERMISSION_READ: &str = "read";
const PERMISSION_WRITE: &str = "write";
const PERMISSION_DELETE: &str = "delete";

/// Listing arguments of the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScaffoldQuery {
    pub page: Option<usize>,
    pub rows: Option<usize>,
    pub order: Option<String>,
    pub direction: Option<String>,
    pub search: Option<String>,
    pub referer: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormSubmission {
    #[serde(default)]
    pub data: FormData,
    #[serde(default)]
    pub cancel: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct IndexView {
    pub model: String,
    pub title: String,
    pub locale: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locales: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localize_url: Option<String>,
    /// Action URL to label
    pub actions: BTreeMap<String, String>,
    /// Export format to URL
    pub exports: BTreeMap<String, String>,
    pub table: TableView,
}

#[derive(Debug, Serialize)]
pub struct FormView {
    pub model: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub locale: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locales: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localize_url: Option<String>,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    pub is_writable: bool,
    pub form: ScaffoldForm,
    pub data: FormData,
    pub errors: FormErrors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

/// Outcome of a batch delete; failed items do not stop the batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteReport {
    pub deleted: Vec<i64>,
    pub messages: Vec<Message>,
    pub referer: String,
}

impl DeleteReport {
    fn success(&mut self, text: String) {
        self.messages.push(Message {
            kind: MessageKind::Success,
            text,
        });
    }

    fn error(&mut self, text: String) {
        self.messages.push(Message {
            kind: MessageKind::Error,
            text,
        });
    }
}

pub async fn get_scaffold(
    State(state): State<ScaffoldState>,
    Path(path): Path<String>,
    Query(query): Query<ScaffoldQuery>,
    OriginalUri(uri): OriginalUri,
) -> Result<Response> {
    let route = ScaffoldRoute::parse(&path).ok_or_else(|| WebError::not_found(format!("No scaffold at '{}'", path)))?;
    let controller = ScaffoldController::new(&state, route)?;
    let request_url = uri.to_string();

    match controller.route.action.clone() {
        ScaffoldAction::Index => controller.index(&query, &request_url),
        ScaffoldAction::Add => controller.form(None, None, &query, &request_url),
        ScaffoldAction::Edit(id) => controller.form(Some(id), None, &query, &request_url),
        ScaffoldAction::Detail(id) => controller.detail(id, &query),
        ScaffoldAction::Export(format) => controller.export(&format, &query),
        ScaffoldAction::Delete | ScaffoldAction::DeleteLocalized => {
            Err(WebError::not_found("Deletes are submitted with POST"))
        }
    }
}

pub async fn post_scaffold(
    State(state): State<ScaffoldState>,
    Path(path): Path<String>,
    Query(query): Query<ScaffoldQuery>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let route = ScaffoldRoute::parse(&path).ok_or_else(|| WebError::not_found(format!("No scaffold at '{}'", path)))?;
    let controller = ScaffoldController::new(&state, route)?;
    let request_url = uri.to_string();

    match controller.route.action.clone() {
        ScaffoldAction::Add => controller.form(None, Some(parse_body(&body)?), &query, &request_url),
        ScaffoldAction::Edit(id) => controller.form(Some(id), Some(parse_body(&body)?), &query, &request_url),
        ScaffoldAction::Delete => controller.delete(parse_body(&body)?, &headers, false),
        ScaffoldAction::DeleteLocalized => controller.delete(parse_body(&body)?, &headers, true),
        _ => Err(WebError::not_found(format!("No scaffold action at '{}'", path))),
    }
}

fn parse_body<T: for<'de> Deserialize<'de> + Default>(body: &Bytes) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body).map_err(|e| WebError::Input(format!("Invalid request body: {}", e)))
}

fn redirect(url: &str) -> Response {
    Redirect::to(url).into_response()
}

fn with_referer(url: String, referer: Option<&str>) -> String {
    match referer {
        Some(referer) => format!("{}?referer={}", url, urlencoding::encode(referer)),
        None => url,
    }
}

struct ScaffoldController<'a> {
    state: &'a ScaffoldState,
    model: Arc<dyn Model>,
    route: ScaffoldRoute,
    secured: bool,
    localized: bool,
}

impl<'a> ScaffoldController<'a> {
    fn new(state: &'a ScaffoldState, route: ScaffoldRoute) -> Result<Self> {
        let model = state.orm.get_model(&route.model)?;
        let secured = model.meta().options.get_bool(option::SECURITY);
        let localized = model.meta().is_localized();

        Ok(Self {
            state,
            model,
            route,
            secured,
            localized,
        })
    }

    fn is_granted(&self, permission: &str) -> bool {
        !self.secured
            || self
                .state
                .permissions
                .is_granted(&format!("orm.model.{}.{}", self.model.name(), permission))
    }

    fn require(&self, permission: &str) -> Result<()> {
        if self.is_granted(permission) {
            Ok(())
        } else {
            Err(WebError::unauthorized(&format!("orm.model.{}.{}", self.model.name(), permission)))
        }
    }

    /// Locale of the route, `None` when the route has none. Unknown locales
    /// are not found.
    fn route_locale(&self) -> Result<Option<String>> {
        match &self.route.locale {
            Some(code) => self
                .state
                .i18n
                .get_locale(code)
                .map(|locale| Some(locale.to_string()))
                .map_err(|_| WebError::not_found(format!("Locale '{}' is not available", code))),
            None => Ok(None),
        }
    }

    fn default_locale(&self) -> String {
        self.state.i18n.default_locale().to_string()
    }

    fn url(&self, locale: &str, action: ScaffoldAction) -> String {
        ScaffoldRoute::new(self.model.name(), Some(locale.to_string()), action).path(&self.state.settings.base_path)
    }

    fn title(&self) -> String {
        match self.model.meta().option(option::TITLE) {
            Some(key) => self.state.translator.translate(key),
            None => self.model.name().to_string(),
        }
    }

    fn entry_title(&self, entry: &Entry) -> String {
        self.state.orm.formatter().title(self.model.meta(), entry)
    }

    fn locales(&self) -> Vec<String> {
        if self.localized {
            self.state.i18n.locale_codes().to_vec()
        } else {
            Vec::new()
        }
    }

    /// Listing table with the entry decorators, the model condition and the
    /// delete actions the user is allowed to use.
    fn table(&self, locale: &str, referer: Option<&str>) -> Result<ScaffoldTable> {
        let state = self.state;
        let meta = self.model.meta();

        let mut table = ScaffoldTable::new(
            self.model.clone(),
            state.translator.as_ref(),
            Some(locale),
            SearchSetting::Auto,
            OrderSetting::Auto,
        )?;
        table.set_pagination_options(state.settings.pagination.clone());

        let edit = with_referer(format!("{}/edit/%id%", self.url(locale, ScaffoldAction::Index)), referer);
        table.add_decorator(Box::new(
            EntryDecorator::new(meta, state.orm.formatter().clone())
                .with_action(edit.clone())
                .with_images(state.images.clone(), state.settings.default_image.clone()),
        ));

        if self.localized {
            table.add_decorator(Box::new(LocalizeDecorator::new(
                self.model.clone(),
                Some(edit.as_str()),
                locale,
                state.i18n.locale_codes(),
            )));
        }

        if let Some(condition) = meta.option(option::CONDITION) {
            table.query_mut().add_condition(condition, Vec::new())?;
        }

        if self.is_granted(PERMISSION_DELETE) {
            let confirmation = state.translator.translate("label.table.confirm.delete");

            table.add_action(
                TableAction::new("delete", state.translator.translate("button.delete"))
                    .with_url(self.url(locale, ScaffoldAction::Delete))
                    .with_confirmation(confirmation.clone()),
            );

            if self.localized {
                table.add_action(
                    TableAction::new("delete-localized", state.translator.translate("button.delete.locale"))
                        .with_url(self.url(locale, ScaffoldAction::DeleteLocalized))
                        .with_confirmation(confirmation),
                );
            }
        }

        Ok(table)
    }

    /// Default order method from the `order.field` and `order.direction`
    /// model options.
    fn default_order(&self) -> (Option<String>, Option<String>) {
        let meta = self.model.meta();

        let method = meta
            .option(option::ORDER_FIELD)
            .and_then(|name| meta.field(name))
            .map(|field| field_label(self.state.translator.as_ref(), field));

        (method, meta.option(option::ORDER_DIRECTION).map(String::from))
    }

    fn apply_arguments(&self, table: &mut ScaffoldTable, query: &ScaffoldQuery) {
        let (default_method, default_direction) = self.default_order();

        table.set_search_query(query.search.clone());

        if let Some(method) = query.order.clone().or(default_method) {
            table.set_order_method(&method);
        }

        if let Some(direction) = query.direction.clone().or(default_direction) {
            match direction.parse() {
                Ok(direction) => table.set_order_direction(direction),
                Err(_) => warn!("Ignoring order direction '{}'", direction),
            }
        }
    }

    fn index(&self, query: &ScaffoldQuery, request_url: &str) -> Result<Response> {
        self.require(PERMISSION_READ)?;

        let locale = match self.route_locale()? {
            Some(locale) => locale,
            None if self.localized => {
                return Ok(redirect(&self.url(&self.default_locale(), ScaffoldAction::Index)));
            }
            None => self.default_locale(),
        };

        let mut table = self.table(&locale, Some(request_url))?;
        self.apply_arguments(&mut table, query);
        table.set_rows_per_page(Some(query.rows.unwrap_or(self.state.settings.default_rows)));
        table.set_page(query.page.unwrap_or(1));

        let defaulted = query.page.is_none()
            || (query.rows.is_none() && table.rows_per_page().is_some())
            || (table.order_method().is_some() && (query.order.is_none() || query.direction.is_none()));
        if defaulted {
            let url = format!(
                "{}?{}",
                self.url(&locale, ScaffoldAction::Index),
                table_arguments(&table, true)
            );
            return Ok(redirect(&url));
        }

        let view = table.process()?;

        let mut actions = BTreeMap::new();
        if self.is_granted(PERMISSION_WRITE) {
            let key = self.model.meta().option(option::TITLE_ADD).unwrap_or("button.add");
            actions.insert(
                with_referer(self.url(&locale, ScaffoldAction::Add), Some(request_url)),
                self.state.translator.translate(key),
            );
        }

        let export_arguments = table_arguments(&table, false);
        let exports = self
            .state
            .exports
            .extensions()
            .into_iter()
            .map(|extension| {
                let mut url = self.url(&locale, ScaffoldAction::Export(extension.to_string()));
                if !export_arguments.is_empty() {
                    url.push('?');
                    url.push_str(&export_arguments);
                }
                (extension.to_string(), url)
            })
            .collect();

        Ok(Json(IndexView {
            model: self.model.name().to_string(),
            title: self.title(),
            locales: self.locales(),
            localize_url: self
                .localized
                .then(|| self.url(LOCALE_PLACEHOLDER, ScaffoldAction::Index)),
            locale,
            actions,
            exports,
            table: view,
        })
        .into_response())
    }

    fn detail(&self, id: i64, query: &ScaffoldQuery) -> Result<Response> {
        let locale = self.route_locale()?.unwrap_or_else(|| self.default_locale());
        let url = with_referer(self.url(&locale, ScaffoldAction::Edit(id)), query.referer.as_deref());

        Ok(redirect(&url))
    }

    fn form(
        &self,
        id: Option<i64>,
        submission: Option<FormSubmission>,
        query: &ScaffoldQuery,
        request_url: &str,
    ) -> Result<Response> {
        let locale = match self.route_locale()? {
            Some(locale) => locale,
            None if self.localized => {
                let action = match id {
                    Some(id) => ScaffoldAction::Edit(id),
                    None => ScaffoldAction::Add,
                };
                let url = with_referer(self.url(&self.default_locale(), action), query.referer.as_deref());
                return Ok(redirect(&url));
            }
            None => self.default_locale(),
        };

        let mut entry = match id {
            Some(id) => {
                let entry = self
                    .model
                    .find_by_id(id, Some(&locale))?
                    .ok_or_else(|| WebError::not_found(format!("{} #{} not found", self.model.name(), id)))?;
                self.require(PERMISSION_READ)?;
                entry
            }
            None => {
                self.require(PERMISSION_WRITE)?;
                self.model.create_entry()
            }
        };

        if self.localized {
            entry.set_locale(Some(locale.clone()));
        }

        let config = ScaffoldFormConfig::from_meta(self.model.meta(), self.state.permissions.as_ref())
            .with_locale(Some(locale.clone()));
        let form = ScaffoldForm::build(self.state.form_context(), self.model.as_ref(), &config, Some(&entry))?;

        let Some(submission) = submission else {
            let data = form.parse_set_data(&self.state.orm, &entry)?;
            return Ok(self.form_view(form, &entry, locale, query, request_url, data, FormErrors::default()));
        };

        if submission.cancel {
            return Ok(redirect(&self.form_referer(query, &locale)));
        }

        match self.submit(&form, &submission.data, entry.clone()) {
            Ok(saved) => {
                info!(
                    "Saved {} '{}' through the scaffold",
                    self.model.name(),
                    self.entry_title(&saved)
                );
                Ok(redirect(&self.form_referer(query, &locale)))
            }
            Err(WebError::Orm(OrmError::Validation(err))) => {
                let errors = form.map_validation_error(&err);
                let mut response = self.form_view(form, &entry, locale, query, request_url, submission.data, errors);
                *response.status_mut() = StatusCode::BAD_REQUEST;
                Ok(response)
            }
            Err(err) => Err(err),
        }
    }

    fn submit(&self, form: &ScaffoldForm, data: &FormData, entry: Entry) -> Result<Entry> {
        form.validate(data).map_err(OrmError::from)?;

        let mut entry = form.parse_get_data(&self.state.orm, data, Some(entry))?;

        self.require(PERMISSION_WRITE)?;
        self.model.save(&mut entry)?;

        Ok(entry)
    }

    fn form_referer(&self, query: &ScaffoldQuery, locale: &str) -> String {
        query
            .referer
            .clone()
            .filter(|referer| !referer.is_empty())
            .unwrap_or_else(|| self.url(locale, ScaffoldAction::Index))
    }

    #[allow(clippy::too_many_arguments)]
    fn form_view(
        &self,
        form: ScaffoldForm,
        entry: &Entry,
        locale: String,
        query: &ScaffoldQuery,
        request_url: &str,
        data: FormData,
        errors: FormErrors,
    ) -> Response {
        let referer = query.referer.clone();

        let localize_url = self.localized.then(|| match entry.id() {
            Some(id) => with_referer(self.url(LOCALE_PLACEHOLDER, ScaffoldAction::Edit(id)), referer.as_deref()),
            None => self.url(LOCALE_PLACEHOLDER, ScaffoldAction::Add),
        });

        Json(FormView {
            model: self.model.name().to_string(),
            title: self.title(),
            subtitle: entry.id().map(|_| self.entry_title(entry)),
            locales: self.locales(),
            localize_url,
            locale,
            action: request_url.to_string(),
            referer,
            is_writable: self.is_granted(PERMISSION_WRITE),
            form,
            data,
            errors,
        })
        .into_response()
    }

    fn export(&self, format: &str, query: &ScaffoldQuery) -> Result<Response> {
        let Some(locale) = self.route_locale()? else {
            let url = self.url(&self.default_locale(), ScaffoldAction::Export(format.to_string()));
            return Ok(redirect(&url));
        };

        self.require(PERMISSION_READ)?;
        let provider = self.state.exports.get(format)?;

        let mut table = self.table(&locale, None)?;
        self.apply_arguments(&mut table, query);

        let entries = table.process_export()?;
        let columns = export::model_columns(&self.state.orm, self.state.translator.as_ref(), self.model.meta())?;
        let body = provider.export(&columns, &entries)?;

        info!("Exported {} {} entries as {}", entries.len(), self.model.name(), format);

        let disposition = format!("attachment; filename=\"{}.{}\"", self.model.name(), provider.extension());

        Ok((
            [
                (header::CONTENT_TYPE, provider.content_type().to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            body,
        )
            .into_response())
    }

    fn delete(&self, request: DeleteRequest, headers: &HeaderMap, localized: bool) -> Result<Response> {
        self.require(PERMISSION_DELETE)?;

        let locale = self.route_locale()?.unwrap_or_else(|| self.default_locale());
        let translator = self.state.translator.as_ref();

        let referer = headers
            .get(header::REFERER)
            .and_then(|value| value.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| self.url(&locale, ScaffoldAction::Index));

        let mut report = DeleteReport {
            referer,
            ..DeleteReport::default()
        };

        for id in request.ids {
            let title = match self.model.find_by_id(id, Some(&locale))? {
                Some(entry) => self.entry_title(&entry),
                None => default_title(self.model.name(), &self.model.create_proxy(id, None)),
            };
            let parameters = BTreeMap::from([("data".to_string(), title)]);

            let result = if localized {
                self.model
                    .delete_localized(&self.model.create_proxy(id, Some(&locale)))
                    .map(|deleted| deleted.then_some(()))
            } else {
                self.model.delete(&self.model.create_proxy(id, None)).map(Some)
            };

            match result {
                Ok(Some(())) => {
                    report.deleted.push(id);
                    report.success(translator.translate_with("success.data.deleted", &parameters));
                }
                Ok(None) => report.error(translator.translate_with("error.delete.translation.empty", &parameters)),
                Err(OrmError::Validation(err)) => {
                    for error in validation_messages(&err) {
                        report.error(self.field_error_message(error));
                    }
                }
                Err(OrmError::EntryNotFound(..)) => {
                    warn!("Skipping delete of missing {} #{}", self.model.name(), id);
                    report.error(translator.translate_with("error.data.not.found", &parameters));
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(Json(report).into_response())
    }

    /// Translated message of a field error, the error message when the code
    /// has no translation.
    fn field_error_message(&self, error: &FieldError) -> String {
        let translated = self.state.translator.translate_with(&error.code, &error.parameters);

        if translated == error.code {
            error.message.clone()
        } else {
            translated
        }
    }
}

fn validation_messages(error: &ValidationError) -> impl Iterator<Item = &FieldError> {
    error.errors().values().flatten()
}

/// Query string of the table state: page and rows when `paginated`, the
/// order and the search.
fn table_arguments(table: &ScaffoldTable, paginated: bool) -> String {
    let mut arguments = Vec::new();

    if paginated {
        arguments.push(format!("page={}", table.page()));
        if let Some(rows) = table.rows_per_page() {
            arguments.push(format!("rows={}", rows));
        }
    }

    if let Some(method) = table.order_method() {
        arguments.push(format!("order={}", urlencoding::encode(method)));
        arguments.push(format!("direction={}", table.order_direction().as_param()));
    }

    if let Some(search) = table.search_query() {
        arguments.push(format!("search={}", urlencoding::encode(search)));
    }

    arguments.join("&")
}
