use crate::core::{OrmError, Result};

/// Locales content can be managed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I18n {
    locales: Vec<String>,
    default_locale: String,
}

impl Default for I18n {
    fn default() -> Self {
        Self::new(vec!["en".to_string()])
    }
}

impl I18n {
    /// The first locale is the default one.
    pub fn new(locales: Vec<String>) -> Self {
        let locales: Vec<String> = if locales.is_empty() { vec!["en".to_string()] } else { locales };
        let default_locale = locales[0].clone();

        Self {
            locales,
            default_locale,
        }
    }

    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        let locale = locale.into();
        if !self.locales.contains(&locale) {
            self.locales.push(locale.clone());
        }
        self.default_locale = locale;
        self
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn locale_codes(&self) -> &[String] {
        &self.locales
    }

    pub fn has_locale(&self, code: &str) -> bool {
        self.locales.iter().any(|l| l == code)
    }

    /// Resolves a locale code, failing for unknown codes.
    pub fn get_locale(&self, code: &str) -> Result<&str> {
        self.locales
            .iter()
            .find(|l| l.as_str() == code)
            .map(String::as_str)
            .ok_or_else(|| OrmError::ExecutionError(format!("Locale '{}' is not available", code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_locale_is_default() {
        let i18n = I18n::new(vec!["nl".into(), "en".into()]);

        assert_eq!(i18n.default_locale(), "nl");
        assert!(i18n.get_locale("en").is_ok());
        assert!(i18n.get_locale("fr").is_err());
        assert_eq!(i18n.with_default_locale("fr").locale_codes().len(), 3);
    }
}
