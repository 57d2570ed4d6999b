use crate::core::{OrmError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Resolves translation keys to human readable text.
pub trait Translator: Send + Sync {
    /// Returns the translation of `key`, or the key itself when untranslated.
    fn translate(&self, key: &str) -> String;

    /// Translates `key` and substitutes `%name%` placeholders.
    fn translate_with(&self, key: &str, parameters: &BTreeMap<String, String>) -> String {
        parameters
            .iter()
            .fold(self.translate(key), |text, (name, value)| {
                text.replace(&format!("%{}%", name), value)
            })
    }
}

/// Translator over a flat key to text map.
#[derive(Debug, Clone, Default)]
pub struct MapTranslator {
    translations: BTreeMap<String, String>,
}

impl MapTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.translations.insert(key.into(), text.into());
        self
    }

    /// Loads a JSON object of `"key": "text"` pairs.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        let translations: BTreeMap<String, String> = serde_json::from_str(&json).map_err(|e| {
            OrmError::ParseError(format!("Invalid translations in {}: {}", path.as_ref().display(), e))
        })?;

        Ok(Self { translations })
    }

    pub fn len(&self) -> usize {
        self.translations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }
}

impl Translator for MapTranslator {
    fn translate(&self, key: &str) -> String {
        self.translations
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untranslated_keys_are_returned_as_is() {
        let translator = MapTranslator::new().with("success.data.saved", "%data% is saved");

        let mut parameters = BTreeMap::new();
        parameters.insert("data".to_string(), "Article #1".to_string());

        assert_eq!(translator.translate_with("success.data.saved", &parameters), "Article #1 is saved");
        assert_eq!(translator.translate("label.title"), "label.title");
    }
}
