use crate::export::ExportRegistry;
use crate::form::FormContext;
use crate::orm::OrmManager;
use crate::services::{
    Directories, GrantedPermissions, I18n, ImageUrlGenerator, MapTranslator, PermissionChecker,
    PublicImageUrlGenerator, Translator,
};
use crate::table::DEFAULT_PAGINATION;
use std::sync::Arc;

/// URLs and defaults of the scaffold screens.
#[derive(Debug, Clone)]
pub struct ScaffoldSettings {
    pub base_path: String,
    pub orm_path: String,
    pub api_base: String,
    pub default_rows: usize,
    pub pagination: Vec<usize>,
    pub default_image: Option<String>,
}

impl Default for ScaffoldSettings {
    fn default() -> Self {
        Self {
            base_path: "/scaffold".to_string(),
            orm_path: "/orm".to_string(),
            api_base: "/api".to_string(),
            default_rows: 25,
            pagination: DEFAULT_PAGINATION.to_vec(),
            default_image: Some("img/data.png".to_string()),
        }
    }
}

#[derive(Clone)]
pub struct ScaffoldState {
    pub orm: Arc<OrmManager>,
    pub translator: Arc<dyn Translator>,
    pub permissions: Arc<dyn PermissionChecker>,
    pub i18n: Arc<I18n>,
    pub directories: Arc<Directories>,
    pub images: Arc<dyn ImageUrlGenerator>,
    pub exports: Arc<ExportRegistry>,
    pub settings: Arc<ScaffoldSettings>,
}

impl ScaffoldState {
    /// State with untranslated labels, every permission granted and the
    /// CSV and JSON exporters.
    pub fn new(orm: OrmManager) -> Self {
        let directories = Directories::default();
        let images = PublicImageUrlGenerator::new(directories.public.clone(), "/");

        Self {
            orm: Arc::new(orm),
            translator: Arc::new(MapTranslator::new()),
            permissions: Arc::new(GrantedPermissions::admin()),
            i18n: Arc::new(I18n::default()),
            directories: Arc::new(directories),
            images: Arc::new(images),
            exports: Arc::new(ExportRegistry::with_defaults()),
            settings: Arc::new(ScaffoldSettings::default()),
        }
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionChecker>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_i18n(mut self, i18n: I18n) -> Self {
        self.i18n = Arc::new(i18n);
        self
    }

    pub fn with_directories(mut self, directories: Directories) -> Self {
        self.directories = Arc::new(directories);
        self
    }

    pub fn with_image_url_generator(mut self, images: Arc<dyn ImageUrlGenerator>) -> Self {
        self.images = images;
        self
    }

    pub fn with_exports(mut self, exports: ExportRegistry) -> Self {
        self.exports = Arc::new(exports);
        self
    }

    pub fn with_settings(mut self, settings: ScaffoldSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    pub fn form_context(&self) -> FormContext<'_> {
        FormContext {
            orm: &self.orm,
            translator: self.translator.as_ref(),
            permissions: self.permissions.as_ref(),
            directories: &self.directories,
            api_base: &self.settings.api_base,
        }
    }
}
