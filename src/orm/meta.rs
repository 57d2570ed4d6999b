//! Model metadata: fields, relations and string-keyed options.

use crate::core::{OrmError, Result, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Name of the primary key field every model carries.
pub const PRIMARY_KEY: &str = "id";

pub const FORMAT_TITLE: &str = "title";
pub const FORMAT_TEASER: &str = "teaser";
pub const FORMAT_IMAGE: &str = "image";

/// Option keys understood by the scaffolding.
pub mod option {
    pub const FORM_OMIT: &str = "scaffold.form.omit";
    pub const FORM_TYPE: &str = "scaffold.form.type";
    pub const FORM_DEPTH: &str = "scaffold.form.depth";
    pub const FORM_PERMISSION: &str = "scaffold.form.permission";
    pub const FORM_TAB: &str = "scaffold.form.tab";
    pub const FORM_TABS: &str = "scaffold.form.tabs";
    pub const FORM_WIDGET: &str = "scaffold.form.widget";
    pub const FORM_DEPENDANT: &str = "scaffold.form.dependant";
    pub const FORM_DECORATOR: &str = "scaffold.form.decorator";
    pub const FORM_CONDITION: &str = "scaffold.form.condition";
    pub const FORM_OPTIONS: &str = "scaffold.form.options";
    pub const SEARCH: &str = "scaffold.search";
    pub const ORDER: &str = "scaffold.order";
    pub const QUERY_ORDER: &str = "scaffold.query.order";
    pub const CONDITION: &str = "scaffold.condition";
    pub const SECURITY: &str = "scaffold.security";
    pub const TITLE: &str = "scaffold.title";
    pub const TITLE_ADD: &str = "scaffold.title.add";
    pub const LABEL_NAME: &str = "label.name";
    pub const LABEL_DESCRIPTION: &str = "label.description";
    pub const UPLOAD_PATH: &str = "upload.path";
    pub const TAXONOMY_VOCABULARY: &str = "taxonomy.vocabulary";
    pub const ASSETS_FOLDER: &str = "assets.folder";
    pub const GEO_TYPE: &str = "geo.type";
    pub const GEO_FILTER: &str = "geo.filter";
    pub const VALIDATION_REQUIRED: &str = "validation.required";
    pub const REST_EXPOSE: &str = "rest.expose";
    pub const ORDER_FIELD: &str = "order.field";
    pub const ORDER_DIRECTION: &str = "order.direction";

    /// Tab label override for `tab`.
    pub fn form_tab_label(tab: &str) -> String {
        format!("{FORM_TAB}.{tab}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Pk,
    Boolean,
    Integer,
    Float,
    String,
    Text,
    Email,
    Website,
    Password,
    Date,
    Datetime,
    File,
    Image,
}

impl PropertyType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pk => "pk",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Text => "text",
            Self::Email => "email",
            Self::Website => "website",
            Self::Password => "password",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::File => "file",
            Self::Image => "image",
        }
    }

    pub fn is_textual(self) -> bool {
        matches!(
            self,
            Self::String | Self::Text | Self::Email | Self::Website | Self::Password | Self::File | Self::Image
        )
    }

    /// Whether a stored value has the shape this type expects.
    pub fn is_compatible(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Pk | Self::Integer | Self::Date | Self::Datetime, Value::Integer(_)) => true,
            (Self::Float, Value::Integer(_) | Value::Float(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (t, Value::Text(_)) => t.is_textual(),
            _ => false,
        }
    }

    /// Converts a submitted value into the stored representation.
    ///
    /// Empty input becomes NULL, except for booleans which become `false`.
    /// Dates and datetimes are stored as unix timestamps; dates are rounded to
    /// the start of the day. Returns `None` when the value cannot be converted.
    pub fn coerce(self, value: &Value) -> Option<Value> {
        if value.is_empty() {
            return Some(match self {
                Self::Boolean => Value::Boolean(false),
                _ => Value::Null,
            });
        }

        match self {
            Self::Pk | Self::Integer => match value {
                Value::Integer(i) => Some(Value::Integer(*i)),
                Value::Float(f) if f.fract() == 0.0 => value.as_i64().map(Value::Integer),
                Value::Boolean(b) => Some(Value::Integer(i64::from(*b))),
                Value::Text(_) => value.as_i64().map(Value::Integer),
                _ => None,
            },
            Self::Float => match value {
                Value::Boolean(_) => None,
                other => other.as_f64().map(Value::Float),
            },
            Self::Boolean => match value {
                Value::Boolean(b) => Some(Value::Boolean(*b)),
                Value::Integer(i) => Some(Value::Boolean(*i != 0)),
                Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" | "on" | "yes" => Some(Value::Boolean(true)),
                    "0" | "false" | "off" | "no" => Some(Value::Boolean(false)),
                    _ => None,
                },
                _ => None,
            },
            Self::Date | Self::Datetime => {
                let timestamp = match value {
                    Value::Integer(i) => *i,
                    Value::Text(s) => parse_timestamp(s.trim())?,
                    _ => return None,
                };

                if self == Self::Date {
                    Some(Value::Integer(timestamp - timestamp.rem_euclid(86_400)))
                } else {
                    Some(Value::Integer(timestamp))
                }
            }
            _ => Some(Value::Text(value.to_string())),
        }
    }
}

fn parse_timestamp(input: &str) -> Option<i64> {
    if let Ok(timestamp) = input.parse::<i64>() {
        return Some(timestamp);
    }

    if let Ok(date_time) = DateTime::parse_from_rfc3339(input) {
        return Some(date_time.timestamp());
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(input, format) {
            return Some(date_time.and_utc().timestamp());
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date_time| date_time.and_utc().timestamp())
}

impl FromStr for PropertyType {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "pk" => Self::Pk,
            "boolean" => Self::Boolean,
            "integer" => Self::Integer,
            "float" => Self::Float,
            "string" => Self::String,
            "text" | "wysiwyg" => Self::Text,
            "email" => Self::Email,
            "website" => Self::Website,
            "password" => Self::Password,
            "date" => Self::Date,
            "datetime" => Self::Datetime,
            "file" => Self::File,
            "image" => Self::Image,
            other => {
                return Err(OrmError::InvalidDefinition(format!("Unknown property type '{}'", other)));
            }
        })
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    BelongsTo,
    HasOne,
    HasMany,
}

impl RelationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BelongsTo => "belongsTo",
            Self::HasOne => "hasOne",
            Self::HasMany => "hasMany",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub kind: RelationKind,
    pub model: String,
    /// Field in the related model pointing back to this one
    pub foreign_key: Option<String>,
    /// Model linking both sides of a many-to-many relation
    pub link_model: Option<String>,
    pub ordered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "field", rename_all = "lowercase")]
pub enum FieldKind {
    Property { property_type: PropertyType },
    Relation(Relation),
}

/// String-keyed option values of a model or field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, serde_json::Value>", into = "BTreeMap<String, String>")]
pub struct Options(BTreeMap<String, String>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        matches!(
            self.get(key).map(|v| v.to_ascii_lowercase()).as_deref(),
            Some("1" | "true" | "yes" | "on")
        )
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// Comma separated option split into trimmed, non-empty items.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, serde_json::Value>> for Options {
    fn from(raw: BTreeMap<String, serde_json::Value>) -> Self {
        let values = raw
            .into_iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    serde_json::Value::Null => return None,
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Bool(b) => b.to_string(),
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Array(items) => items
                        .into_iter()
                        .map(|item| match item {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(","),
                    object => object.to_string(),
                };

                Some((key, value))
            })
            .collect();

        Self(values)
    }
}

impl From<Options> for BTreeMap<String, String> {
    fn from(options: Options) -> Self {
        options.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelField {
    pub name: String,
    pub kind: FieldKind,
    pub localized: bool,
    pub default: Option<Value>,
    pub options: Options,
}

impl ModelField {
    pub fn property(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Property { property_type },
            localized: false,
            default: None,
            options: Options::new(),
        }
    }

    pub fn relation(name: impl Into<String>, kind: RelationKind, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Relation(Relation {
                kind,
                model: model.into(),
                foreign_key: None,
                link_model: None,
                ordered: false,
            }),
            localized: false,
            default: None,
            options: Options::new(),
        }
    }

    pub fn belongs_to(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self::relation(name, RelationKind::BelongsTo, model)
    }

    pub fn has_one(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self::relation(name, RelationKind::HasOne, model)
    }

    pub fn has_many(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self::relation(name, RelationKind::HasMany, model)
    }

    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.set(key, value);
        self
    }

    pub fn foreign_key(mut self, foreign_key: impl Into<String>) -> Self {
        if let FieldKind::Relation(relation) = &mut self.kind {
            relation.foreign_key = Some(foreign_key.into());
        }
        self
    }

    pub fn link_model(mut self, link_model: impl Into<String>) -> Self {
        if let FieldKind::Relation(relation) = &mut self.kind {
            relation.link_model = Some(link_model.into());
        }
        self
    }

    pub fn ordered(mut self) -> Self {
        if let FieldKind::Relation(relation) = &mut self.kind {
            relation.ordered = true;
        }
        self
    }

    pub fn relation_meta(&self) -> Option<&Relation> {
        match &self.kind {
            FieldKind::Relation(relation) => Some(relation),
            FieldKind::Property { .. } => None,
        }
    }

    pub fn property_type(&self) -> Option<PropertyType> {
        match &self.kind {
            FieldKind::Property { property_type } => Some(*property_type),
            FieldKind::Relation(_) => None,
        }
    }

    pub fn is_relation(&self) -> bool {
        matches!(self.kind, FieldKind::Relation(_))
    }

    pub fn is_relation_kind(&self, kind: RelationKind) -> bool {
        self.relation_meta().is_some_and(|r| r.kind == kind)
    }

    pub fn is_required(&self) -> bool {
        self.options.get_bool(option::VALIDATION_REQUIRED)
    }

    /// Type name as shown in definitions: the property type or the relation kind.
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            FieldKind::Property { property_type } => property_type.as_str(),
            FieldKind::Relation(relation) => relation.kind.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelIndex {
    pub name: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMeta {
    pub name: String,
    fields: Vec<ModelField>,
    pub options: Options,
    formats: BTreeMap<String, String>,
    indexes: Vec<ModelIndex>,
}

impl ModelMeta {
    /// Creates the metadata of a model holding only its primary key.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: vec![ModelField::property(PRIMARY_KEY, PropertyType::Pk)],
            options: Options::new(),
            formats: BTreeMap::new(),
            indexes: Vec::new(),
        }
    }

    /// Adds a field, replacing an existing field with the same name.
    pub fn with_field(mut self, field: ModelField) -> Self {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.set(key, value);
        self
    }

    pub fn with_format(mut self, name: impl Into<String>, format: impl Into<String>) -> Self {
        self.formats.insert(name.into(), format.into());
        self
    }

    pub fn with_index(mut self, index: ModelIndex) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn fields(&self) -> &[ModelField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&ModelField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn require_field(&self, name: &str) -> Result<&ModelField> {
        self.field(name)
            .ok_or_else(|| OrmError::FieldNotFound(name.to_string(), self.name.clone()))
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn properties(&self) -> impl Iterator<Item = &ModelField> {
        self.fields.iter().filter(|f| !f.is_relation())
    }

    pub fn relations(&self) -> impl Iterator<Item = &ModelField> {
        self.fields.iter().filter(|f| f.is_relation())
    }

    /// Relation fields of this model pointing at `model`.
    pub fn relations_to<'a>(&'a self, model: &'a str) -> impl Iterator<Item = &'a ModelField> {
        self.relations()
            .filter(move |f| f.relation_meta().is_some_and(|r| r.model == model))
    }

    pub fn is_localized(&self) -> bool {
        self.fields.iter().any(|f| f.localized)
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key)
    }

    pub fn format(&self, name: &str) -> Option<&str> {
        self.formats.get(name).map(String::as_str)
    }

    pub fn formats(&self) -> &BTreeMap<String, String> {
        &self.formats
    }

    pub fn indexes(&self) -> &[ModelIndex] {
        &self.indexes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_model_starts_with_primary_key() {
        let meta = ModelMeta::new("Article").with_field(ModelField::property("title", PropertyType::String));

        assert_eq!(meta.fields()[0].name, PRIMARY_KEY);
        assert_eq!(meta.fields()[0].property_type(), Some(PropertyType::Pk));
        assert!(meta.has_field("title"));
        assert!(!meta.is_localized());
    }

    #[test]
    fn coerce_handles_form_input() {
        assert_eq!(PropertyType::Integer.coerce(&"12".into()), Some(Value::Integer(12)));
        assert_eq!(PropertyType::Integer.coerce(&"twelve".into()), None);
        assert_eq!(PropertyType::Boolean.coerce(&"on".into()), Some(Value::Boolean(true)));
        assert_eq!(PropertyType::Boolean.coerce(&"".into()), Some(Value::Boolean(false)));
        assert_eq!(PropertyType::String.coerce(&"".into()), Some(Value::Null));
        assert_eq!(PropertyType::Float.coerce(&"1.5".into()), Some(Value::Float(1.5)));
    }

    #[test]
    fn dates_round_to_start_of_day() {
        let midnight = PropertyType::Date.coerce(&"2024-03-01".into()).unwrap();
        let later = PropertyType::Date.coerce(&"2024-03-01 17:45:00".into()).unwrap();

        assert_eq!(midnight, later);
        assert_eq!(
            PropertyType::Datetime.coerce(&"2024-03-01 00:01:00".into()),
            Some(Value::Integer(midnight.as_i64().unwrap() + 60))
        );
    }

    #[test]
    fn options_accept_json_scalars_and_lists() {
        let options: Options = serde_json::from_str(
            r#"{"scaffold.form.omit": true, "scaffold.form.depth": 2, "scaffold.search": ["title", "teaser"], "empty": null}"#,
        )
        .unwrap();

        assert!(options.get_bool("scaffold.form.omit"));
        assert_eq!(options.get_u32("scaffold.form.depth"), Some(2));
        assert_eq!(options.get_list("scaffold.search"), vec!["title", "teaser"]);
        assert_eq!(options.get("empty"), None);
    }
}
