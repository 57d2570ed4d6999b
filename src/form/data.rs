use crate::core::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Submitted or prefilled value of one form row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Value(Value),
    List(Vec<FormValue>),
    Data(FormData),
}

/// Flat value map of a form component, keyed by row name.
pub type FormData = BTreeMap<String, FormValue>;

impl FormValue {
    pub fn null() -> Self {
        Self::Value(Value::Null)
    }

    /// Absent input: NULL, an empty string or an empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Value(value) => value.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Data(_) => false,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&FormData> {
        match self {
            Self::Data(data) => Some(data),
            _ => None,
        }
    }

    /// Items of a list; a single value counts as a list of one.
    pub fn items(&self) -> Vec<&FormValue> {
        match self {
            Self::List(items) => items.iter().collect(),
            other if other.is_empty() => Vec::new(),
            other => vec![other],
        }
    }
}

impl From<Value> for FormValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<FormData> for FormValue {
    fn from(data: FormData) -> Self {
        Self::Data(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_nested_submissions() {
        let data: FormData = serde_json::from_str(
            r#"{"title": "Hello", "tags": [1, 2], "author": {"name": "Ada"}, "teaser": null}"#,
        )
        .unwrap();

        assert_eq!(data["title"], FormValue::Value(Value::from("Hello")));
        assert_eq!(data["tags"].items().len(), 2);
        assert!(data["author"].as_data().is_some());
        assert!(data["teaser"].is_empty());
    }
}
