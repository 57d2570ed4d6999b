use crate::orm::definition::load_dir;
use crate::orm::{MemoryStore, OrmManager};
use crate::services::{Directories, GrantedPermissions, I18n, MapTranslator, PublicImageUrlGenerator};
use crate::web::{ScaffoldSettings, ScaffoldState};
use anyhow::{Context, Result, ensure};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Directory of the JSON model definitions
    pub models_dir: PathBuf,
    /// JSON file of translations
    pub translations: Option<PathBuf>,
    pub locales: Vec<String>,
    pub default_locale: Option<String>,
    pub application_dir: PathBuf,
    pub public_dir: PathBuf,
    /// Comma separated granted permissions, `*` grants everything
    pub permissions: String,
    pub default_rows: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let host = env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("APP_PORT must be a valid u16")?;

        let models_dir = env::var("SCAFFOLD_MODELS_DIR").unwrap_or_else(|_| "models".to_string());
        let translations = env::var("SCAFFOLD_TRANSLATIONS").ok().filter(|path| !path.is_empty());

        let locales = env::var("SCAFFOLD_LOCALES")
            .unwrap_or_else(|_| "en".to_string())
            .split(',')
            .map(str::trim)
            .filter(|locale| !locale.is_empty())
            .map(String::from)
            .collect();

        let default_locale = env::var("SCAFFOLD_DEFAULT_LOCALE").ok().filter(|locale| !locale.is_empty());

        let directories = Directories::default();
        let application_dir = env::var("SCAFFOLD_APPLICATION_DIR")
            .map(PathBuf::from)
            .unwrap_or(directories.application);
        let public_dir = env::var("SCAFFOLD_PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or(directories.public);

        let permissions = env::var("SCAFFOLD_PERMISSIONS").unwrap_or_else(|_| "*".to_string());

        let default_rows = parse_rows(&env::var("SCAFFOLD_ROWS").unwrap_or_else(|_| "25".to_string()))?;

        Ok(Self {
            host,
            port,
            models_dir: PathBuf::from(models_dir),
            translations: translations.map(PathBuf::from),
            locales,
            default_locale,
            application_dir,
            public_dir,
            permissions,
            default_rows,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn i18n(&self) -> I18n {
        let i18n = I18n::new(self.locales.clone());

        match &self.default_locale {
            Some(locale) => i18n.with_default_locale(locale.clone()),
            None => i18n,
        }
    }

    /// Loads the model definitions into a fresh memory store and wires the
    /// services of the scaffold screens.
    pub fn build_state(&self) -> Result<ScaffoldState> {
        let metas = load_dir(&self.models_dir)
            .with_context(|| format!("failed to load model definitions from {}", self.models_dir.display()))?;

        let i18n = self.i18n();
        let store = MemoryStore::new().with_default_locale(i18n.default_locale());
        let orm = OrmManager::with_store(&store, metas).context("failed to register the models")?;

        let translator = match &self.translations {
            Some(path) => MapTranslator::from_file(path)
                .with_context(|| format!("failed to load translations from {}", path.display()))?,
            None => MapTranslator::new(),
        };

        let directories = Directories::new(self.application_dir.clone(), self.public_dir.clone());
        let images = PublicImageUrlGenerator::new(self.public_dir.clone(), "/");

        let settings = ScaffoldSettings {
            default_rows: self.default_rows,
            ..ScaffoldSettings::default()
        };

        Ok(ScaffoldState::new(orm)
            .with_translator(Arc::new(translator))
            .with_permissions(Arc::new(GrantedPermissions::parse(&self.permissions)))
            .with_i18n(i18n)
            .with_directories(directories)
            .with_image_url_generator(Arc::new(images))
            .with_settings(settings))
    }
}

/// Rows per page of the listings; 0 would turn pagination off.
fn parse_rows(value: &str) -> Result<usize> {
    let rows = value
        .trim()
        .parse::<usize>()
        .context("SCAFFOLD_ROWS must be a valid number of rows")?;
    ensure!(rows > 0, "SCAFFOLD_ROWS must be at least 1");

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config(models_dir: PathBuf) -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            models_dir,
            translations: None,
            locales: vec!["en".to_string(), "nl".to_string()],
            default_locale: Some("nl".to_string()),
            application_dir: PathBuf::from("application"),
            public_dir: PathBuf::from("public"),
            permissions: "orm.model.*".to_string(),
            default_rows: 10,
        }
    }

    #[test]
    fn builds_state_from_definition_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("tag.json"),
            r#"{"name": "Tag", "fields": [{"name": "name", "type": "string"}], "formats": {"title": "{name}"}}"#,
        )
        .unwrap();

        let config = config(dir.path().to_path_buf());
        assert_eq!(config.address(), "127.0.0.1:3000");

        let state = config.build_state().unwrap();
        assert!(state.orm.has_model("Tag"));
        assert_eq!(state.i18n.default_locale(), "nl");
        assert_eq!(state.settings.default_rows, 10);
        assert!(state.permissions.is_granted("orm.model.Tag.read"));
        assert!(!state.permissions.is_granted("orm.admin"));
    }

    #[test]
    fn rows_per_page_must_be_positive() {
        assert_eq!(parse_rows("50").unwrap(), 50);
        assert_eq!(parse_rows(" 10 ").unwrap(), 10);
        assert!(parse_rows("0").is_err());
        assert!(parse_rows("many").is_err());
    }

    #[test]
    fn fails_on_missing_definition_directory() {
        let config = config(PathBuf::from("/nonexistent/models"));

        assert!(config.build_state().is_err());
    }
}
