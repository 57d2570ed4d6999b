//! JSON model definitions.
//!
//! A definition file holds one model or an array of models:
//!
//! ```json
//! {
//!   "name": "Article",
//!   "formats": { "title": "{title}" },
//!   "options": { "scaffold.search": ["title"] },
//!   "fields": [
//!     { "name": "title", "type": "string", "localized": true },
//!     { "name": "author", "type": "belongsTo", "model": "Person" }
//!   ]
//! }
//! ```

use crate::core::{OrmError, Result, Value};
use crate::orm::meta::{ModelField, ModelIndex, ModelMeta, Options, PRIMARY_KEY, PropertyType, RelationKind};
use log::{debug, info};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub foreign_key: Option<String>,
    #[serde(default)]
    pub link_model: Option<String>,
    #[serde(default)]
    pub ordered: bool,
    #[serde(default)]
    pub localized: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub options: Options,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub formats: BTreeMap<String, String>,
    #[serde(default)]
    pub indexes: Vec<ModelIndex>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DefinitionFile {
    Many(Vec<ModelDefinition>),
    One(ModelDefinition),
}

impl FieldDefinition {
    fn into_field(self, model: &str) -> Result<ModelField> {
        let relation_kind = match self.field_type.as_str() {
            "belongsTo" => Some(RelationKind::BelongsTo),
            "hasOne" => Some(RelationKind::HasOne),
            "hasMany" => Some(RelationKind::HasMany),
            _ => None,
        };

        let mut field = match relation_kind {
            Some(kind) => {
                let related = self.model.ok_or_else(|| {
                    OrmError::InvalidDefinition(format!(
                        "Relation field '{}' of '{}' has no model",
                        self.name, model
                    ))
                })?;

                let mut field = ModelField::relation(self.name, kind, related);
                if let Some(foreign_key) = self.foreign_key {
                    field = field.foreign_key(foreign_key);
                }
                if let Some(link_model) = self.link_model {
                    field = field.link_model(link_model);
                }
                if self.ordered {
                    field = field.ordered();
                }
                field
            }
            None => {
                let property_type: PropertyType = self.field_type.parse().map_err(|_| {
                    OrmError::InvalidDefinition(format!(
                        "Field '{}' of '{}' has unknown type '{}'",
                        self.name, model, self.field_type
                    ))
                })?;

                let mut field = ModelField::property(self.name, property_type);
                if let Some(default) = self.default {
                    field = field.default_value(default);
                }
                field
            }
        };

        field.localized = self.localized;
        field.options = self.options;

        Ok(field)
    }
}

impl ModelDefinition {
    pub fn into_meta(self) -> Result<ModelMeta> {
        if self.name.trim().is_empty() {
            return Err(OrmError::InvalidDefinition("Model without name".to_string()));
        }

        let mut meta = ModelMeta::new(self.name.clone());
        meta.options = self.options;

        let mut seen = BTreeSet::new();
        for field in self.fields {
            if field.name == PRIMARY_KEY {
                continue;
            }

            if !seen.insert(field.name.clone()) {
                return Err(OrmError::InvalidDefinition(format!(
                    "Duplicate field '{}' in model '{}'",
                    field.name, self.name
                )));
            }

            meta = meta.with_field(field.into_field(&self.name)?);
        }

        for (name, format) in self.formats {
            meta = meta.with_format(name, format);
        }

        for index in self.indexes {
            if let Some(missing) = index.fields.iter().find(|f| !meta.has_field(f)) {
                return Err(OrmError::InvalidDefinition(format!(
                    "Index '{}' of '{}' refers to unknown field '{}'",
                    index.name, self.name, missing
                )));
            }
            meta = meta.with_index(index);
        }

        Ok(meta)
    }
}

/// Parses the definitions of a JSON document.
pub fn parse_definitions(json: &str) -> Result<Vec<ModelMeta>> {
    let file: DefinitionFile = serde_json::from_str(json)
        .map_err(|e| OrmError::ParseError(format!("Invalid model definition: {}", e)))?;

    let definitions = match file {
        DefinitionFile::Many(definitions) => definitions,
        DefinitionFile::One(definition) => vec![definition],
    };

    definitions.into_iter().map(ModelDefinition::into_meta).collect()
}

/// Loads every `*.json` file of a directory, in file name order, and checks
/// that all relations point at loaded models.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<ModelMeta>> {
    let dir = dir.as_ref();

    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut metas = Vec::new();
    for path in paths {
        debug!("Loading model definitions from {}", path.display());

        let json = fs::read_to_string(&path)?;
        let parsed = parse_definitions(&json)
            .map_err(|e| OrmError::InvalidDefinition(format!("{}: {}", path.display(), e)))?;
        metas.extend(parsed);
    }

    validate_relations(&metas)?;

    info!("Loaded {} model(s) from {}", metas.len(), dir.display());

    Ok(metas)
}

/// Fails on duplicate model names and relations to unknown models.
pub fn validate_relations(metas: &[ModelMeta]) -> Result<()> {
    let mut names = BTreeSet::new();
    for meta in metas {
        if !names.insert(meta.name.as_str()) {
            return Err(OrmError::InvalidDefinition(format!("Duplicate model '{}'", meta.name)));
        }
    }

    for meta in metas {
        for field in meta.relations() {
            let Some(relation) = field.relation_meta() else {
                continue;
            };

            for related in std::iter::once(&relation.model).chain(relation.link_model.iter()) {
                if !names.contains(related.as_str()) {
                    return Err(OrmError::InvalidDefinition(format!(
                        "Field '{}' of '{}' relates to unknown model '{}'",
                        field.name, meta.name, related
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_and_multiple_definitions() {
        let single = parse_definitions(r#"{"name": "Tag", "fields": [{"name": "name", "type": "string"}]}"#).unwrap();
        assert_eq!(single.len(), 1);
        assert!(single[0].has_field("name"));

        let many = parse_definitions(
            r#"[{"name": "Tag"}, {"name": "Post", "fields": [{"name": "tags", "type": "hasMany", "model": "Tag", "ordered": true}]}]"#,
        )
        .unwrap();
        assert!(many[1].field("tags").unwrap().relation_meta().unwrap().ordered);
        validate_relations(&many).unwrap();
    }

    #[test]
    fn rejects_unknown_types_and_duplicates() {
        assert!(parse_definitions(r#"{"name": "Tag", "fields": [{"name": "x", "type": "blob"}]}"#).is_err());
        assert!(
            parse_definitions(
                r#"{"name": "Tag", "fields": [{"name": "x", "type": "string"}, {"name": "x", "type": "string"}]}"#
            )
            .is_err()
        );
        assert!(parse_definitions(r#"{"name": "Tag", "fields": [{"name": "x", "type": "belongsTo"}]}"#).is_err());
    }
}
