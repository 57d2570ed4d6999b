use crate::orm::meta::{ModelMeta, PRIMARY_KEY, option};
use crate::services::PermissionChecker;
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_DEPTH: u32 = 1;

/// Which fields a scaffold form shows and how deep relations expand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldFormConfig {
    depth: u32,
    field_depths: BTreeMap<String, u32>,
    hidden: BTreeSet<String>,
    omitted: BTreeSet<String>,
    locale: Option<String>,
    max_depth: Option<u32>,
}

impl Default for ScaffoldFormConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            field_depths: BTreeMap::new(),
            hidden: BTreeSet::from([PRIMARY_KEY.to_string()]),
            omitted: BTreeSet::new(),
            locale: None,
            max_depth: None,
        }
    }
}

impl ScaffoldFormConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the field options of a model: omitted, hidden, per field depth
    /// and field permissions.
    pub fn from_meta(meta: &ModelMeta, permissions: &dyn PermissionChecker) -> Self {
        let mut config = Self::new();

        if let Some(depth) = meta.options.get_u32(option::FORM_DEPTH) {
            config.depth = depth;
        }

        for field in meta.fields() {
            let options = &field.options;

            if options.get_bool(option::FORM_OMIT) {
                config.omitted.insert(field.name.clone());
            }

            if options.get(option::FORM_TYPE) == Some("hidden") {
                config.hidden.insert(field.name.clone());
            }

            if let Some(depth) = options.get_u32(option::FORM_DEPTH) {
                config.field_depths.insert(field.name.clone(), depth);
            }

            if let Some(permission) = options.get(option::FORM_PERMISSION)
                && !permissions.is_granted(permission)
            {
                config.omitted.insert(field.name.clone());
            }
        }

        config
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn omit_field(mut self, name: impl Into<String>) -> Self {
        self.omitted.insert(name.into());
        self
    }

    pub fn with_locale(mut self, locale: Option<String>) -> Self {
        self.locale = locale;
        self
    }

    /// Caps every field depth, used for nested components.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn depth(&self) -> u32 {
        self.depth.min(self.max_depth.unwrap_or(u32::MAX))
    }

    pub fn depth_for(&self, field: &str) -> u32 {
        let depth = self.field_depths.get(field).copied().unwrap_or(self.depth);
        depth.min(self.max_depth.unwrap_or(u32::MAX))
    }

    pub fn is_hidden(&self, field: &str) -> bool {
        self.hidden.contains(field)
    }

    pub fn is_omitted(&self, field: &str) -> bool {
        self.omitted.contains(field)
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::meta::{ModelField, PropertyType};
    use crate::services::GrantedPermissions;

    #[test]
    fn reads_field_options() {
        let meta = ModelMeta::new("Article")
            .with_field(ModelField::property("secret", PropertyType::String).option(option::FORM_OMIT, "true"))
            .with_field(ModelField::property("slug", PropertyType::String).option(option::FORM_TYPE, "hidden"))
            .with_field(ModelField::belongs_to("author", "Person").option(option::FORM_DEPTH, "3"))
            .with_field(
                ModelField::property("notes", PropertyType::Text).option(option::FORM_PERMISSION, "cms.notes"),
            );

        let config = ScaffoldFormConfig::from_meta(&meta, &GrantedPermissions::new());

        assert!(config.is_omitted("secret"));
        assert!(config.is_omitted("notes"));
        assert!(config.is_hidden("slug"));
        assert!(config.is_hidden(PRIMARY_KEY));
        assert_eq!(config.depth_for("author"), 3);
        assert_eq!(config.clone().with_max_depth(1).depth_for("author"), 1);
        assert_eq!(config.depth_for("title"), DEFAULT_DEPTH);
    }
}
