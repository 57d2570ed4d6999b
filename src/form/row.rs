use crate::form::component::ScaffoldForm;
use crate::orm::meta::ModelField;
use serde::Serialize;
use std::collections::BTreeMap;

/// One selectable value of an option row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new("", "")
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "row", rename_all = "lowercase")]
pub enum RowKind {
    /// Value only, no visible widget
    Hidden,
    Property {
        #[serde(rename = "type")]
        row_type: String,
    },
    Option {
        #[serde(rename = "type")]
        row_type: String,
        widget: Option<String>,
        multiple: bool,
        choices: Vec<Choice>,
    },
    Component {
        form: Box<ScaffoldForm>,
    },
    Collection {
        form: Box<ScaffoldForm>,
        ordered: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct FormRow {
    pub name: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Row type specific settings: `round`, `path`, `autocomplete.url`, ...
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, serde_json::Value>,
    #[serde(flatten)]
    pub kind: RowKind,
    #[serde(skip)]
    pub(crate) field: ModelField,
}

impl FormRow {
    pub(crate) fn new(field: &ModelField, label: String, kind: RowKind) -> Self {
        Self {
            name: field.name.clone(),
            label,
            description: None,
            tab: None,
            required: false,
            attributes: BTreeMap::new(),
            options: BTreeMap::new(),
            kind,
            field: field.clone(),
        }
    }

    pub fn field(&self) -> &ModelField {
        &self.field
    }

    /// Relation values of this row travel as ids instead of nested data.
    pub fn is_reference(&self) -> bool {
        self.field.is_relation() && !matches!(self.kind, RowKind::Component { .. } | RowKind::Collection { .. })
    }

    pub fn nested_form(&self) -> Option<&ScaffoldForm> {
        match &self.kind {
            RowKind::Component { form } | RowKind::Collection { form, .. } => Some(form),
            _ => None,
        }
    }

    pub fn choices(&self) -> &[Choice] {
        match &self.kind {
            RowKind::Option { choices, .. } => choices,
            _ => &[],
        }
    }
}

/// A named group of rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormTab {
    pub name: String,
    pub label: String,
    pub rows: Vec<String>,
}
