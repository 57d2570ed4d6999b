use crate::core::Value;
use crate::expression::ValueSource;
use crate::orm::meta::PRIMARY_KEY;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of one entry field: a scalar, a related entry or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(Value),
    Entry(Box<Entry>),
    Entries(Vec<Entry>),
}

impl FieldValue {
    pub fn null() -> Self {
        Self::Scalar(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Value::Null))
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_entry(&self) -> Option<&Entry> {
        match self {
            Self::Entry(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn as_entries(&self) -> &[Entry] {
        match self {
            Self::Entries(entries) => entries,
            _ => &[],
        }
    }

    /// Value used when comparing this field in a condition: scalars as is,
    /// a related entry by its id.
    pub fn comparable(&self) -> Value {
        match self {
            Self::Scalar(value) => value.clone(),
            Self::Entry(entry) => entry.id().into(),
            Self::Entries(_) => Value::Null,
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::null()
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::Scalar(value)
    }
}

impl From<Entry> for FieldValue {
    fn from(entry: Entry) -> Self {
        Self::Entry(Box::new(entry))
    }
}

impl From<Vec<Entry>> for FieldValue {
    fn from(entries: Vec<Entry>) -> Self {
        Self::Entries(entries)
    }
}

/// Generic read/write access to the named fields of a record.
pub trait FieldAccess {
    /// Returns the field value, NULL when the field is not set.
    fn get_field(&self, name: &str) -> FieldValue;

    fn set_field(&mut self, name: &str, value: FieldValue);
}

/// One record of a model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entry {
    model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    locale: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    proxy: bool,
    #[serde(default)]
    fields: BTreeMap<String, FieldValue>,
}

impl Entry {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Reference to a stored entry carrying only its id.
    pub fn proxy(model: impl Into<String>, id: i64) -> Self {
        let mut entry = Self::new(model);
        entry.proxy = true;
        entry.set_id(id);
        entry
    }

    pub fn with_field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.set_field(name, value.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn id(&self) -> Option<i64> {
        self.fields
            .get(PRIMARY_KEY)
            .and_then(FieldValue::as_scalar)
            .and_then(Value::as_i64)
    }

    pub fn set_id(&mut self, id: i64) {
        self.fields.insert(PRIMARY_KEY.to_string(), Value::Integer(id).into());
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn set_locale(&mut self, locale: Option<String>) {
        self.locale = locale;
    }

    pub fn is_proxy(&self) -> bool {
        self.proxy
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Scalar value of a field, NULL for unset and relation fields.
    pub fn scalar(&self, name: &str) -> Value {
        self.fields
            .get(name)
            .and_then(FieldValue::as_scalar)
            .cloned()
            .unwrap_or_default()
    }

    pub fn related(&self, name: &str) -> Option<&Entry> {
        self.fields.get(name).and_then(FieldValue::as_entry)
    }

    pub fn related_many(&self, name: &str) -> &[Entry] {
        self.fields.get(name).map(FieldValue::as_entries).unwrap_or(&[])
    }

    /// Reduces this entry to a proxy of itself.
    pub fn to_proxy(&self) -> Option<Entry> {
        self.id().map(|id| {
            let mut proxy = Entry::proxy(self.model.clone(), id);
            proxy.locale = self.locale.clone();
            proxy
        })
    }
}

impl FieldAccess for Entry {
    fn get_field(&self, name: &str) -> FieldValue {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    fn set_field(&mut self, name: &str, value: FieldValue) {
        self.fields.insert(name.to_string(), value);
    }
}

impl ValueSource for Entry {
    fn value_of(&self, field: &str) -> Option<Value> {
        self.fields.get(field).map(FieldValue::comparable)
    }
}
