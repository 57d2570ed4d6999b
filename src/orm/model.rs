use crate::core::{Result, Value};
use crate::orm::entry::{Entry, FieldAccess, FieldValue};
use crate::orm::meta::{ModelMeta, PRIMARY_KEY};
use crate::orm::query::ModelQuery;

/// Data access for one model.
///
/// Implementations execute `ModelQuery` descriptions and persist entries.
/// The provided methods build on the required ones.
pub trait Model: Send + Sync {
    fn meta(&self) -> &ModelMeta;

    fn name(&self) -> &str {
        &self.meta().name
    }

    /// New entry with the field defaults of the model applied.
    fn create_entry(&self) -> Entry {
        let mut entry = Entry::new(self.name());

        for field in self.meta().fields() {
            if let Some(default) = &field.default {
                entry.set_field(&field.name, FieldValue::Scalar(default.clone()));
            }
        }

        entry
    }

    fn create_proxy(&self, id: i64, locale: Option<&str>) -> Entry {
        let mut proxy = Entry::proxy(self.name(), id);
        proxy.set_locale(locale.map(String::from));
        proxy
    }

    fn create_query(&self, locale: Option<&str>) -> ModelQuery {
        let mut query = ModelQuery::new(self.name());
        query.set_locale(locale.map(String::from));
        query
    }

    fn find(&self, query: &ModelQuery) -> Result<Vec<Entry>>;

    fn find_first(&self, query: &ModelQuery) -> Result<Option<Entry>> {
        let mut query = query.clone();
        query.set_limit(1, query.offset());

        Ok(self.find(&query)?.into_iter().next())
    }

    fn find_by_id(&self, id: i64, locale: Option<&str>) -> Result<Option<Entry>> {
        let mut query = self.create_query(locale);
        query.set_fetch_unlocalized(true);
        query.add_condition(&format!("{{{}}} = %1%", PRIMARY_KEY), vec![Value::Integer(id)])?;

        self.find_first(&query)
    }

    /// Number of entries matching the query, ignoring its limit.
    fn count(&self, query: &ModelQuery) -> Result<usize>;

    /// Inserts or updates the entry and assigns its id.
    fn save(&self, entry: &mut Entry) -> Result<()>;

    fn delete(&self, entry: &Entry) -> Result<()>;

    /// Removes the localized data of the entry in its locale. Returns `false`
    /// when there was nothing to remove.
    fn delete_localized(&self, entry: &Entry) -> Result<bool>;

    /// Locales the entry has localized data for.
    fn localized_locales(&self, id: i64) -> Result<Vec<String>>;

    /// Hook for a model specific search. Returns `true` when the search was
    /// applied to the query, `false` to fall back to the generic search.
    fn apply_search(&self, _query: &mut ModelQuery, _search: &str) -> Result<bool> {
        Ok(false)
    }
}
