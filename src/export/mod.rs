//! Export of scaffold listings.
//!
//! The columns of an export are derived from the model: property fields
//! export their value, relation fields the title of the related entries.
//! Providers turn the columns and entries into a file.

pub mod error;

pub use error::{ExportError, ExportResult};

use crate::form::component::capitalize;
use crate::orm::OrmManager;
use crate::orm::entry::Entry;
use crate::orm::format::EntryFormatter;
use crate::orm::meta::{FORMAT_TITLE, ModelMeta, option};
use crate::services::Translator;
use crate::table::decorator::{FormatDecorator, PropertyDecorator};
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Value of one export column.
#[derive(Debug, Clone)]
pub enum ColumnValue {
    Property(PropertyDecorator),
    Format(FormatDecorator),
}

#[derive(Debug, Clone)]
pub struct ExportColumn {
    pub header: String,
    pub value: ColumnValue,
}

impl ExportColumn {
    pub fn value(&self, entry: &Entry) -> String {
        match &self.value {
            ColumnValue::Property(decorator) => decorator.value(entry),
            ColumnValue::Format(decorator) => decorator.value(entry),
        }
    }
}

/// Columns for every field of a model, headed by the translated labels.
pub fn model_columns(orm: &OrmManager, translator: &dyn Translator, meta: &ModelMeta) -> ExportResult<Vec<ExportColumn>> {
    let mut columns = Vec::new();

    for field in meta.fields() {
        let header = match field.options.get(option::LABEL_NAME) {
            Some(label) => translator.translate(label),
            None => capitalize(&field.name),
        };

        let value = match field.relation_meta() {
            Some(relation) => {
                let related = orm.get_model(&relation.model)?;
                let format = related
                    .meta()
                    .format(FORMAT_TITLE)
                    .map(String::from)
                    .unwrap_or_else(|| format!("{} #{{id}}", related.name()));

                ColumnValue::Format(FormatDecorator::new(EntryFormatter::new(), format).for_field(field.name.clone()))
            }
            None => ColumnValue::Property(PropertyDecorator::new(field.name.clone())),
        };

        columns.push(ExportColumn { header, value });
    }

    Ok(columns)
}

/// Turns rows of entries into a downloadable file.
pub trait ExportProvider: Send + Sync {
    /// File extension, also the format name in URLs.
    fn extension(&self) -> &str;

    fn content_type(&self) -> &str;

    fn export(&self, columns: &[ExportColumn], entries: &[Entry]) -> ExportResult<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl ExportProvider for CsvExporter {
    fn extension(&self) -> &str {
        "csv"
    }

    fn content_type(&self) -> &str {
        "text/csv; charset=utf-8"
    }

    fn export(&self, columns: &[ExportColumn], entries: &[Entry]) -> ExportResult<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer.write_record(columns.iter().map(|c| c.header.as_str()))?;
        for entry in entries {
            writer.write_record(columns.iter().map(|c| c.value(entry)))?;
        }

        writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
    }
}

/// Array of objects keyed by column header.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

impl ExportProvider for JsonExporter {
    fn extension(&self) -> &str {
        "json"
    }

    fn content_type(&self) -> &str {
        "application/json"
    }

    fn export(&self, columns: &[ExportColumn], entries: &[Entry]) -> ExportResult<Vec<u8>> {
        let rows: Vec<serde_json::Map<String, serde_json::Value>> = entries
            .iter()
            .map(|entry| {
                columns
                    .iter()
                    .map(|c| (c.header.clone(), serde_json::Value::String(c.value(entry))))
                    .collect()
            })
            .collect();

        Ok(serde_json::to_vec_pretty(&rows)?)
    }
}

/// Export providers by extension.
#[derive(Clone, Default)]
pub struct ExportRegistry {
    providers: BTreeMap<String, Arc<dyn ExportProvider>>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the CSV and JSON exporters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CsvExporter));
        registry.register(Arc::new(JsonExporter));
        registry
    }

    pub fn register(&mut self, provider: Arc<dyn ExportProvider>) {
        self.providers.insert(provider.extension().to_string(), provider);
    }

    pub fn get(&self, extension: &str) -> ExportResult<Arc<dyn ExportProvider>> {
        self.providers
            .get(extension)
            .cloned()
            .ok_or_else(|| ExportError::UnsupportedFormat(extension.to_string()))
    }

    pub fn extensions(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    pub fn export(&self, extension: &str, columns: &[ExportColumn], entries: &[Entry]) -> ExportResult<Vec<u8>> {
        let provider = self.get(extension)?;
        debug!("Exporting {} entries as {}", entries.len(), extension);

        provider.export(columns, entries)
    }
}
