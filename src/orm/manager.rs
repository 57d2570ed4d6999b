use crate::core::{OrmError, Result};
use crate::orm::format::EntryFormatter;
use crate::orm::memory::MemoryStore;
use crate::orm::meta::ModelMeta;
use crate::orm::model::Model;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry of the models available to the web layer.
#[derive(Clone, Default)]
pub struct OrmManager {
    models: BTreeMap<String, Arc<dyn Model>>,
    formatter: EntryFormatter,
}

impl OrmManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every definition in a fresh memory store.
    pub fn in_memory(metas: Vec<ModelMeta>) -> Result<Self> {
        Self::with_store(&MemoryStore::new(), metas)
    }

    pub fn with_store(store: &MemoryStore, metas: Vec<ModelMeta>) -> Result<Self> {
        let mut manager = Self::new();
        for meta in metas {
            manager.register(store.register(meta)?);
        }

        Ok(manager)
    }

    pub fn register(&mut self, model: Arc<dyn Model>) {
        self.models.insert(model.name().to_string(), model);
    }

    pub fn with_model(mut self, model: Arc<dyn Model>) -> Self {
        self.register(model);
        self
    }

    pub fn has_model(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn get_model(&self, name: &str) -> Result<Arc<dyn Model>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| OrmError::ModelNotFound(name.to_string()))
    }

    /// Related model of a relation field.
    pub fn relation_model(&self, model: &dyn Model, field: &str) -> Result<Arc<dyn Model>> {
        let meta = model.meta();
        let relation = meta
            .require_field(field)?
            .relation_meta()
            .ok_or_else(|| OrmError::TypeMismatch(format!("Field '{}' of '{}' is not a relation", field, meta.name)))?;

        self.get_model(&relation.model)
    }

    /// All models sorted by name.
    pub fn models(&self) -> Vec<Arc<dyn Model>> {
        self.models.values().cloned().collect()
    }

    /// Models with a relation to `name` which `name` does not relate back to.
    pub fn unlinked_models(&self, name: &str) -> Result<Vec<String>> {
        let model = self.get_model(name)?;

        Ok(self
            .models
            .values()
            .filter(|other| other.name() != name)
            .filter(|other| other.meta().relations_to(name).next().is_some())
            .filter(|other| model.meta().relations_to(other.name()).next().is_none())
            .map(|other| other.name().to_string())
            .collect())
    }

    pub fn formatter(&self) -> &EntryFormatter {
        &self.formatter
    }
}
