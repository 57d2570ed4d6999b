//! Thread-safe in-memory model storage.
//!
//! Every registered model gets a table of rows keyed by id. Unlocalized
//! values live on the row itself, localized values in a map per locale.
//! Relations are always stored as proxies and hydrated one level deep when
//! entries are read back.

use crate::core::{FieldError, OrmError, Result, ValidationError};
use crate::orm::entry::{Entry, FieldAccess, FieldValue};
use crate::orm::meta::{FieldKind, ModelMeta, PRIMARY_KEY, RelationKind};
use crate::orm::model::Model;
use crate::orm::query::ModelQuery;
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

pub const DEFAULT_LOCALE: &str = "en";

type FieldMap = BTreeMap<String, FieldValue>;

#[derive(Debug, Default)]
struct StoredRow {
    values: FieldMap,
    localized: BTreeMap<String, FieldMap>,
}

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, StoredRow>,
}

#[derive(Debug, Default)]
struct StoreState {
    metas: BTreeMap<String, Arc<ModelMeta>>,
    tables: BTreeMap<String, Table>,
}

impl StoreState {
    fn meta(&self, model: &str) -> Result<Arc<ModelMeta>> {
        self.metas
            .get(model)
            .cloned()
            .ok_or_else(|| OrmError::ModelNotFound(model.to_string()))
    }

    fn contains(&self, model: &str, id: i64) -> bool {
        self.tables
            .get(model)
            .is_some_and(|table| table.rows.contains_key(&id))
    }
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
    default_locale: String,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            default_locale: DEFAULT_LOCALE.to_string(),
        }
    }

    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Registers a model, replacing the metadata of a model with the same
    /// name while keeping its rows.
    pub fn register(&self, meta: ModelMeta) -> Result<Arc<MemoryModel>> {
        let meta = Arc::new(meta);

        let mut state = self.state.write()?;
        state.tables.entry(meta.name.clone()).or_default();
        state.metas.insert(meta.name.clone(), Arc::clone(&meta));

        debug!("Registered model {}", meta.name);

        Ok(Arc::new(MemoryModel {
            meta,
            store: self.clone(),
        }))
    }

    fn find(&self, query: &ModelQuery) -> Result<Vec<Entry>> {
        let entries = self.find_all(query)?;
        Ok(query.paginate(entries))
    }

    fn count(&self, query: &ModelQuery) -> Result<usize> {
        Ok(self.find_all(query)?.len())
    }

    fn find_all(&self, query: &ModelQuery) -> Result<Vec<Entry>> {
        let state = self.state.read()?;
        let meta = state.meta(query.model())?;

        let Some(table) = state.tables.get(query.model()) else {
            return Ok(Vec::new());
        };

        let reader = Reader {
            state: &state,
            default_locale: &self.default_locale,
        };

        let mut entries = Vec::new();
        for (id, row) in &table.rows {
            let Some(entry) = reader.materialize(&meta, *id, row, query.locale(), query.fetch_unlocalized(), true)
            else {
                continue;
            };

            if query.matches(&entry)? {
                entries.push(entry);
            }
        }

        query.sort(&mut entries);

        Ok(entries)
    }

    fn save(&self, entry: &mut Entry) -> Result<()> {
        let mut state = self.state.write()?;

        let mut errors = ValidationError::new();
        validate_entry(&state, entry, &mut errors)?;
        errors.into_result()?;

        write_entry(&mut state, entry, &self.default_locale)?;

        Ok(())
    }

    fn delete(&self, entry: &Entry) -> Result<()> {
        let id = entry
            .id()
            .ok_or_else(|| OrmError::ExecutionError(format!("Cannot delete a {} without id", entry.model())))?;

        let mut state = self.state.write()?;

        if !state.contains(entry.model(), id) {
            return Err(OrmError::EntryNotFound(entry.model().to_string(), id));
        }

        let referencing = referencing_models(&state, entry.model(), id);
        if !referencing.is_empty() {
            let mut errors = ValidationError::new();
            errors.add_general(
                FieldError::new(
                    "error.validation.delete.referenced",
                    format!(
                        "{} #{} is still referenced by {}",
                        entry.model(),
                        id,
                        referencing.join(", ")
                    ),
                )
                .with_parameter("model", entry.model())
                .with_parameter("id", id.to_string())
                .with_parameter("references", referencing.join(", ")),
            );

            return Err(errors.into());
        }

        if let Some(table) = state.tables.get_mut(entry.model()) {
            table.rows.remove(&id);
        }

        // drop dangling has-one/has-many references
        for table in state.tables.values_mut() {
            for row in table.rows.values_mut() {
                let maps = std::iter::once(&mut row.values).chain(row.localized.values_mut());
                for values in maps {
                    for value in values.values_mut() {
                        if let FieldValue::Entries(entries) = value {
                            entries.retain(|e| !(e.model() == entry.model() && e.id() == Some(id)));
                        }
                    }
                }
            }
        }

        info!("Deleted {} #{}", entry.model(), id);

        Ok(())
    }

    fn delete_localized(&self, entry: &Entry) -> Result<bool> {
        let id = entry
            .id()
            .ok_or_else(|| OrmError::ExecutionError(format!("Cannot delete a {} without id", entry.model())))?;
        let locale = entry.locale().unwrap_or(&self.default_locale).to_string();

        let mut state = self.state.write()?;
        let row = state
            .tables
            .get_mut(entry.model())
            .and_then(|table| table.rows.get_mut(&id))
            .ok_or_else(|| OrmError::EntryNotFound(entry.model().to_string(), id))?;

        let removed = row.localized.remove(&locale).is_some();
        if removed {
            info!("Deleted {} #{} in locale {}", entry.model(), id, locale);
        }

        Ok(removed)
    }

    fn localized_locales(&self, model: &str, id: i64) -> Result<Vec<String>> {
        let state = self.state.read()?;
        let row = state
            .tables
            .get(model)
            .and_then(|table| table.rows.get(&id))
            .ok_or_else(|| OrmError::EntryNotFound(model.to_string(), id))?;

        Ok(row.localized.keys().cloned().collect())
    }
}

struct Reader<'a> {
    state: &'a StoreState,
    default_locale: &'a str,
}

impl Reader<'_> {
    /// Builds the entry of a stored row in the requested locale. Returns
    /// `None` for localized models without data in that locale, unless
    /// `fetch_unlocalized` allows falling back to another locale.
    fn materialize(
        &self,
        meta: &ModelMeta,
        id: i64,
        row: &StoredRow,
        locale: Option<&str>,
        fetch_unlocalized: bool,
        hydrate: bool,
    ) -> Option<Entry> {
        let mut entry = Entry::new(meta.name.clone());
        entry.set_id(id);

        for (name, value) in &row.values {
            entry.set_field(name, value.clone());
        }

        if meta.is_localized() {
            let requested = locale.unwrap_or(self.default_locale);

            let used = if row.localized.contains_key(requested) {
                requested
            } else if !fetch_unlocalized {
                return None;
            } else if row.localized.contains_key(self.default_locale) {
                self.default_locale
            } else {
                row.localized.keys().next().map(String::as_str).unwrap_or(requested)
            };

            if let Some(values) = row.localized.get(used) {
                for (name, value) in values {
                    entry.set_field(name, value.clone());
                }
            }

            entry.set_locale(Some(used.to_string()));
        } else {
            entry.set_locale(locale.map(String::from));
        }

        if hydrate {
            for field in meta.relations() {
                let hydrated = match entry.get_field(&field.name) {
                    FieldValue::Entry(proxy) => self.hydrate(&proxy, locale).into(),
                    FieldValue::Entries(proxies) => proxies
                        .iter()
                        .map(|proxy| self.hydrate(proxy, locale))
                        .collect::<Vec<_>>()
                        .into(),
                    other => other,
                };

                entry.set_field(&field.name, hydrated);
            }
        }

        Some(entry)
    }

    fn hydrate(&self, proxy: &Entry, locale: Option<&str>) -> Entry {
        let loaded = proxy.id().and_then(|id| {
            let meta = self.state.metas.get(proxy.model())?;
            let row = self.state.tables.get(proxy.model())?.rows.get(&id)?;

            self.materialize(meta, id, row, locale, true, false)
        });

        loaded.unwrap_or_else(|| proxy.clone())
    }
}

fn validate_entry(state: &StoreState, entry: &Entry, errors: &mut ValidationError) -> Result<()> {
    let meta = state.meta(entry.model())?;

    for field in meta.fields() {
        if field.name == PRIMARY_KEY {
            continue;
        }

        match &field.kind {
            FieldKind::Property { property_type } => {
                let value = entry.scalar(&field.name);

                if field.is_required() && value.is_empty() {
                    errors.add(field.name.clone(), FieldError::required(&field.name));
                } else if !property_type.is_compatible(&value) {
                    errors.add(
                        field.name.clone(),
                        FieldError::new(
                            "error.validation.type",
                            format!("{} must be of type {}", field.name, property_type),
                        )
                        .with_parameter("field", field.name.clone())
                        .with_parameter("type", property_type.as_str()),
                    );
                }
            }
            FieldKind::Relation(relation) => match entry.get(&field.name) {
                Some(FieldValue::Entry(related)) => {
                    validate_related(state, &relation.model, related, &field.name, errors)?;
                }
                Some(FieldValue::Entries(related)) => {
                    if field.is_required() && related.is_empty() {
                        errors.add(field.name.clone(), FieldError::required(&field.name));
                    }

                    for (index, related) in related.iter().enumerate() {
                        let path = format!("{}.{}", field.name, index);
                        validate_related(state, &relation.model, related, &path, errors)?;
                    }
                }
                Some(FieldValue::Scalar(value)) if !value.is_null() => {
                    errors.add(
                        field.name.clone(),
                        FieldError::new(
                            "error.validation.type",
                            format!("{} must reference a {}", field.name, relation.model),
                        )
                        .with_parameter("field", field.name.clone())
                        .with_parameter("type", relation.model.clone()),
                    );
                }
                _ => {
                    if field.is_required() {
                        errors.add(field.name.clone(), FieldError::required(&field.name));
                    }
                }
            },
        }
    }

    Ok(())
}

fn validate_related(
    state: &StoreState,
    model: &str,
    related: &Entry,
    path: &str,
    errors: &mut ValidationError,
) -> Result<()> {
    if related.model() != model {
        errors.add(
            path,
            FieldError::new(
                "error.validation.type",
                format!("{} must reference a {}", path, model),
            )
            .with_parameter("field", path)
            .with_parameter("type", model),
        );

        return Ok(());
    }

    if related.is_proxy() {
        match related.id() {
            Some(id) if state.contains(model, id) => {}
            id => errors.add(
                path,
                FieldError::new(
                    "error.validation.reference",
                    format!("{} #{} does not exist", model, id.unwrap_or_default()),
                )
                .with_parameter("model", model)
                .with_parameter("id", id.unwrap_or_default().to_string()),
            ),
        }

        return Ok(());
    }

    let mut nested = ValidationError::new();
    validate_entry(state, related, &mut nested)?;
    errors.merge_prefixed(path, nested);

    Ok(())
}

/// Saves nested entries first, then the entry itself. Returns the entry id.
fn write_entry(state: &mut StoreState, entry: &mut Entry, default_locale: &str) -> Result<i64> {
    let meta = state.meta(entry.model())?;
    let locale = entry.locale().unwrap_or(default_locale).to_string();

    let mut stored_relations = FieldMap::new();
    for field in meta.relations() {
        let stored = match entry.get_field(&field.name) {
            FieldValue::Entry(mut related) => {
                if !related.is_proxy() {
                    inherit_locale(&mut related, &locale);
                    write_entry(state, &mut related, default_locale)?;
                }

                let proxy = related.to_proxy();
                entry.set_field(&field.name, FieldValue::Entry(related));
                proxy.map(FieldValue::from).unwrap_or_default()
            }
            FieldValue::Entries(mut related) => {
                for nested in related.iter_mut().filter(|e| !e.is_proxy()) {
                    inherit_locale(nested, &locale);
                    write_entry(state, nested, default_locale)?;
                }

                let proxies: Vec<Entry> = related.iter().filter_map(Entry::to_proxy).collect();
                entry.set_field(&field.name, FieldValue::Entries(related));
                FieldValue::Entries(proxies)
            }
            _ if field.is_relation_kind(RelationKind::HasMany) => FieldValue::Entries(Vec::new()),
            _ => FieldValue::null(),
        };

        if entry.get(&field.name).is_some() {
            stored_relations.insert(field.name.clone(), stored);
        }
    }

    let table = state.tables.entry(meta.name.clone()).or_default();
    let id = match entry.id() {
        Some(id) => {
            table.next_id = table.next_id.max(id);
            id
        }
        None => {
            table.next_id += 1;
            table.next_id
        }
    };
    entry.set_id(id);

    let row = table.rows.entry(id).or_default();
    if meta.is_localized() {
        row.localized.entry(locale.clone()).or_default();
    }

    for field in meta.fields() {
        if field.name == PRIMARY_KEY {
            continue;
        }

        let value = match stored_relations.remove(&field.name) {
            Some(value) => value,
            None if field.is_relation() => continue,
            None => match entry.get(&field.name) {
                Some(value) => value.clone(),
                None => continue,
            },
        };

        if field.localized {
            row.localized
                .entry(locale.clone())
                .or_default()
                .insert(field.name.clone(), value);
        } else {
            row.values.insert(field.name.clone(), value);
        }
    }

    if meta.is_localized() {
        entry.set_locale(Some(locale));
    }

    info!("Saved {} #{}", meta.name, id);

    Ok(id)
}

fn inherit_locale(entry: &mut Entry, locale: &str) {
    if entry.locale().is_none() {
        entry.set_locale(Some(locale.to_string()));
    }
}

/// Names of the models holding a belongs-to reference to the entry.
fn referencing_models(state: &StoreState, model: &str, id: i64) -> Vec<String> {
    let mut models = Vec::new();

    for (name, meta) in &state.metas {
        let fields: Vec<&str> = meta
            .relations_to(model)
            .filter(|f| f.is_relation_kind(RelationKind::BelongsTo))
            .map(|f| f.name.as_str())
            .collect();

        if fields.is_empty() {
            continue;
        }

        let Some(table) = state.tables.get(name) else {
            continue;
        };

        let referenced = table.rows.values().any(|row| {
            std::iter::once(&row.values)
                .chain(row.localized.values())
                .any(|values| {
                    fields.iter().any(|field| {
                        values
                            .get(*field)
                            .and_then(FieldValue::as_entry)
                            .is_some_and(|proxy| proxy.id() == Some(id))
                    })
                })
        });

        if referenced {
            models.push(name.clone());
        }
    }

    models
}

/// `Model` backed by a `MemoryStore`.
#[derive(Debug)]
pub struct MemoryModel {
    meta: Arc<ModelMeta>,
    store: MemoryStore,
}

impl MemoryModel {
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

impl Model for MemoryModel {
    fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    fn find(&self, query: &ModelQuery) -> Result<Vec<Entry>> {
        self.store.find(query)
    }

    fn count(&self, query: &ModelQuery) -> Result<usize> {
        self.store.count(query)
    }

    fn save(&self, entry: &mut Entry) -> Result<()> {
        if entry.model() != self.meta.name {
            return Err(OrmError::TypeMismatch(format!(
                "Cannot save a {} through the {} model",
                entry.model(),
                self.meta.name
            )));
        }

        self.store.save(entry)
    }

    fn delete(&self, entry: &Entry) -> Result<()> {
        self.store.delete(entry)
    }

    fn delete_localized(&self, entry: &Entry) -> Result<bool> {
        self.store.delete_localized(entry)
    }

    fn localized_locales(&self, id: i64) -> Result<Vec<String>> {
        self.store.localized_locales(&self.meta.name, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::orm::meta::{ModelField, PropertyType, option};

    fn models() -> (Arc<MemoryModel>, Arc<MemoryModel>) {
        let store = MemoryStore::new();

        let person = store
            .register(
                ModelMeta::new("Person").with_field(
                    ModelField::property("name", PropertyType::String).option(option::VALIDATION_REQUIRED, "1"),
                ),
            )
            .unwrap();
        let article = store
            .register(
                ModelMeta::new("Article")
                    .with_field(ModelField::property("title", PropertyType::String).localized())
                    .with_field(ModelField::belongs_to("author", "Person")),
            )
            .unwrap();

        (person, article)
    }

    #[test]
    fn save_cascades_into_new_relations() {
        let (person, article) = models();

        let mut entry = article
            .create_entry()
            .with_field("title", Value::from("Hello"))
            .with_field("author", Entry::new("Person").with_field("name", Value::from("Ada")));
        article.save(&mut entry).unwrap();

        let author_id = entry.related("author").and_then(Entry::id).unwrap();
        let stored = person.find_by_id(author_id, None).unwrap().unwrap();
        assert_eq!(stored.scalar("name"), Value::from("Ada"));

        let reloaded = article.find_by_id(entry.id().unwrap(), None).unwrap().unwrap();
        assert_eq!(reloaded.related("author").unwrap().scalar("name"), Value::from("Ada"));
        assert!(!reloaded.related("author").unwrap().is_proxy());
    }

    #[test]
    fn nested_validation_errors_use_field_paths() {
        let (_, article) = models();

        let mut entry = article
            .create_entry()
            .with_field("author", Entry::new("Person"));
        let err = article.save(&mut entry).unwrap_err();

        let validation = err.as_validation().unwrap();
        assert_eq!(validation.field_errors("author.name")[0].code, "error.validation.required");
    }

    #[test]
    fn localized_entries_are_hidden_in_other_locales_unless_requested() {
        let (_, article) = models();

        let mut entry = article.create_entry().with_field("title", Value::from("Hallo")).with_locale("nl");
        article.save(&mut entry).unwrap();

        let query = article.create_query(Some("en"));
        assert_eq!(article.count(&query).unwrap(), 0);

        let mut query = article.create_query(Some("en"));
        query.set_fetch_unlocalized(true);
        let found = article.find(&query).unwrap();
        assert_eq!(found[0].locale(), Some("nl"));
        assert_eq!(article.localized_locales(entry.id().unwrap()).unwrap(), vec!["nl"]);

        assert!(article.delete_localized(&entry).unwrap());
        assert!(!article.delete_localized(&entry).unwrap());
    }

    #[test]
    fn delete_refuses_referenced_entries() {
        let (person, article) = models();

        let mut author = person.create_entry().with_field("name", Value::from("Ada"));
        person.save(&mut author).unwrap();

        let mut entry = article
            .create_entry()
            .with_field("title", Value::from("Hello"))
            .with_field("author", author.to_proxy().unwrap());
        article.save(&mut entry).unwrap();

        let err = person.delete(&author).unwrap_err();
        assert_eq!(
            err.as_validation().unwrap().field_errors("")[0].code,
            "error.validation.delete.referenced"
        );

        article.delete(&entry).unwrap();
        person.delete(&author).unwrap();
        assert!(person.find_by_id(author.id().unwrap(), None).unwrap().is_none());
    }
}
