//! Cell decorators of the scaffold table.
//!
//! A decorator turns one entry into one cell of its table row. Decorators
//! run in the order they were added to the table.

use crate::core::Result;
use crate::orm::entry::{Entry, FieldAccess, FieldValue};
use crate::orm::format::EntryFormatter;
use crate::orm::meta::{FORMAT_IMAGE, FORMAT_TEASER, FORMAT_TITLE, ModelMeta};
use crate::orm::model::Model;
use crate::services::ImageUrlGenerator;
use crate::table::html;
use crate::table::view::{TableCell, TableRow};
use std::collections::BTreeMap;
use std::sync::Arc;

pub trait Decorator: Send + Sync {
    fn decorate(&self, entry: &Entry, row: &mut TableRow) -> Result<()>;
}

/// Replaces the id placeholder of an action URL, raw or URL encoded.
pub fn replace_id(href: &str, id: i64) -> String {
    let id = id.to_string();
    href.replace("%id%", &id).replace("%25id%25", &id)
}

/// Title, teaser and image of an entry through the formats of its model.
pub struct EntryDecorator {
    formatter: EntryFormatter,
    model: String,
    title: Option<String>,
    teaser: Option<String>,
    image: Option<String>,
    action: Option<String>,
    image_url_generator: Option<Arc<dyn ImageUrlGenerator>>,
    default_image: Option<String>,
}

impl EntryDecorator {
    pub fn new(meta: &ModelMeta, formatter: EntryFormatter) -> Self {
        Self {
            formatter,
            model: meta.name.clone(),
            title: meta.format(FORMAT_TITLE).map(String::from),
            teaser: meta.format(FORMAT_TEASER).map(String::from),
            image: meta.format(FORMAT_IMAGE).map(String::from),
            action: None,
            image_url_generator: None,
            default_image: None,
        }
    }

    /// Links the title to `action`, `%id%` replaced by the entry id.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Renders images when the model has an image format.
    pub fn with_images(mut self, generator: Arc<dyn ImageUrlGenerator>, default_image: Option<String>) -> Self {
        self.image_url_generator = Some(generator);
        self.default_image = default_image;
        self
    }

    fn title(&self, entry: &Entry) -> String {
        match &self.title {
            Some(format) => self.formatter.format_entry(entry, format),
            None => crate::orm::format::default_title(&self.model, entry),
        }
    }

    fn image_html(&self, entry: &Entry) -> Option<String> {
        let generator = self.image_url_generator.as_ref()?;
        let format = self.image.as_ref()?;

        let image = self.formatter.format_entry(entry, format);
        let image = if image.trim().is_empty() {
            self.default_image.clone()?
        } else {
            image
        };

        let mut attributes = BTreeMap::new();
        attributes.insert("class".to_string(), "data".to_string());

        Some(html::image(&generator.generate_url(&image), &attributes))
    }
}

impl Decorator for EntryDecorator {
    fn decorate(&self, entry: &Entry, row: &mut TableRow) -> Result<()> {
        let mut value = self.image_html(entry).unwrap_or_default();

        let title = html::escape(&self.title(entry));
        match (&self.action, entry.id()) {
            (Some(action), Some(id)) => value.push_str(&html::anchor(&title, &replace_id(action, id))),
            _ => value.push_str(&title),
        }

        if let Some(format) = &self.teaser {
            let teaser = self.formatter.format_entry(entry, format);
            if !teaser.trim().is_empty() {
                value.push_str(&html::info(&html::escape(&teaser)));
            }
        }

        row.push(TableCell::new(value).with_class("data"));

        Ok(())
    }
}

/// Lists the other locales of an entry, the ones with localized data in
/// bold, and marks rows shown in a fallback locale.
pub struct LocalizeDecorator {
    model: Arc<dyn Model>,
    action: Option<String>,
    locale: String,
    locales: Vec<String>,
}

impl LocalizeDecorator {
    pub const STYLE_UNLOCALIZED: &'static str = "unlocalized";

    /// `action` is the entry URL in the current locale; the locale in it is
    /// swapped for each listed locale.
    pub fn new(model: Arc<dyn Model>, action: Option<&str>, locale: &str, locales: &[String]) -> Self {
        Self {
            model,
            action: action.map(|action| localize_action(action, locale)),
            locale: locale.to_string(),
            locales: locales.iter().filter(|l| *l != locale).cloned().collect(),
        }
    }
}

/// Replaces the locale segment of a URL with a `%locale%` placeholder.
fn localize_action(action: &str, locale: &str) -> String {
    let mut action = action
        .replace(&format!("/{}/", locale), "/%locale%/")
        .replace(&format!("/{}?", locale), "/%locale%?")
        .replace(&format!("locale={}", locale), "locale=%locale%");

    let suffix = format!("/{}", locale);
    if action.ends_with(&suffix) {
        action.truncate(action.len() - locale.len());
        action.push_str("%locale%");
    }

    action
}

impl Decorator for LocalizeDecorator {
    fn decorate(&self, entry: &Entry, row: &mut TableRow) -> Result<()> {
        let Some(id) = entry.id() else {
            row.push(TableCell::default());
            return Ok(());
        };

        if entry.locale().is_some_and(|locale| locale != self.locale) {
            row.add_class(Self::STYLE_UNLOCALIZED);
        }

        let localized = self.model.localized_locales(id)?;

        let value = self
            .locales
            .iter()
            .map(|locale| {
                let label = if localized.contains(locale) {
                    format!("<strong>{}</strong>", html::escape(locale))
                } else {
                    html::escape(locale)
                };

                match &self.action {
                    Some(action) => {
                        let href = replace_id(action, id)
                            .replace("%25locale%25", locale)
                            .replace("%locale%", locale);
                        html::anchor(&label, &href)
                    }
                    None => label,
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        row.push(TableCell::new(value).with_class("locales"));

        Ok(())
    }
}

/// Selection checkbox holding the entry id.
#[derive(Debug, Clone, Default)]
pub struct OptionDecorator;

impl Decorator for OptionDecorator {
    fn decorate(&self, entry: &Entry, row: &mut TableRow) -> Result<()> {
        let value = entry
            .id()
            .map(|id| html::checkbox(html::FIELD_ID, &id.to_string()))
            .unwrap_or_default();

        row.push(TableCell::new(value).with_class("option"));

        Ok(())
    }
}

/// Link to an action on the entry, `%id%` in the URL replaced.
#[derive(Debug, Clone)]
pub struct ActionDecorator {
    label: String,
    href: String,
}

impl ActionDecorator {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
        }
    }
}

impl Decorator for ActionDecorator {
    fn decorate(&self, entry: &Entry, row: &mut TableRow) -> Result<()> {
        let value = entry
            .id()
            .map(|id| html::anchor(&html::escape(&self.label), &replace_id(&self.href, id)))
            .unwrap_or_default();

        row.push(TableCell::new(value).with_class("action"));

        Ok(())
    }
}

/// Renders a format string, either on the entry itself or on the related
/// entries of one of its fields.
#[derive(Debug, Clone)]
pub struct FormatDecorator {
    formatter: EntryFormatter,
    format: String,
    field: Option<String>,
}

impl FormatDecorator {
    pub fn new(formatter: EntryFormatter, format: impl Into<String>) -> Self {
        Self {
            formatter,
            format: format.into(),
            field: None,
        }
    }

    pub fn for_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Plain text value of the entry.
    pub fn value(&self, entry: &Entry) -> String {
        let Some(field) = &self.field else {
            return self.formatter.format_entry(entry, &self.format);
        };

        match entry.get_field(field) {
            FieldValue::Entry(related) => self.formatter.format_entry(&related, &self.format),
            FieldValue::Entries(related) => related
                .iter()
                .map(|related| self.formatter.format_entry(related, &self.format))
                .collect::<Vec<_>>()
                .join(", "),
            FieldValue::Scalar(value) => value.to_string(),
        }
    }
}

impl Decorator for FormatDecorator {
    fn decorate(&self, entry: &Entry, row: &mut TableRow) -> Result<()> {
        row.push(TableCell::new(html::escape(&self.value(entry))));
        Ok(())
    }
}

/// Raw value of one field, related entries reduced to their ids.
#[derive(Debug, Clone)]
pub struct PropertyDecorator {
    property: String,
}

impl PropertyDecorator {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
        }
    }

    pub fn value(&self, entry: &Entry) -> String {
        match entry.get_field(&self.property) {
            FieldValue::Entries(related) => related
                .iter()
                .filter_map(Entry::id)
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(","),
            value => value.comparable().to_string(),
        }
    }
}

impl Decorator for PropertyDecorator {
    fn decorate(&self, entry: &Entry, row: &mut TableRow) -> Result<()> {
        row.push(TableCell::new(html::escape(&self.value(entry))));
        Ok(())
    }
}
