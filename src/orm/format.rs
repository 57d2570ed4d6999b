use crate::orm::entry::{Entry, FieldValue};
use crate::orm::meta::{FORMAT_TITLE, ModelMeta};

/// Renders entries through format strings like `{title}` or
/// `{author.name|upper} - {teaser|truncate:40}`.
#[derive(Debug, Clone, Default)]
pub struct EntryFormatter;

impl EntryFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format_entry(&self, entry: &Entry, format: &str) -> String {
        let mut output = String::with_capacity(format.len());
        let mut rest = format;

        while let Some(start) = rest.find('{') {
            output.push_str(&rest[..start]);

            let Some(end) = rest[start..].find('}') else {
                rest = &rest[start..];
                break;
            };

            let mut parts = rest[start + 1..start + end].split('|').map(str::trim);
            let value = resolve_path(entry, parts.next().unwrap_or_default());
            output.push_str(&parts.filter(|f| !f.is_empty()).fold(value, apply_filter));

            rest = &rest[start + end + 1..];
        }

        output.push_str(rest);
        output
    }

    /// Title of an entry, falling back to `{Model} #{id}` when the model has
    /// no title format.
    pub fn title(&self, meta: &ModelMeta, entry: &Entry) -> String {
        match meta.format(FORMAT_TITLE) {
            Some(format) => self.format_entry(entry, format),
            None => default_title(&meta.name, entry),
        }
    }

    /// Renders a named format, `None` when the model does not define it or
    /// it renders empty.
    pub fn named(&self, meta: &ModelMeta, entry: &Entry, name: &str) -> Option<String> {
        meta.format(name)
            .map(|format| self.format_entry(entry, format))
            .filter(|s| !s.trim().is_empty())
    }
}

pub fn default_title(model: &str, entry: &Entry) -> String {
    match entry.id() {
        Some(id) => format!("{} #{}", model, id),
        None => model.to_string(),
    }
}

fn resolve_path(entry: &Entry, path: &str) -> String {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    match (entry.get(head), rest) {
        (None, _) => String::new(),
        (Some(FieldValue::Scalar(value)), _) => value.to_string(),
        (Some(FieldValue::Entry(related)), Some(rest)) => resolve_path(related, rest),
        (Some(FieldValue::Entry(related)), None) => default_title(related.model(), related),
        (Some(FieldValue::Entries(entries)), rest) => entries
            .iter()
            .map(|related| match rest {
                Some(rest) => resolve_path(related, rest),
                None => default_title(related.model(), related),
            })
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn apply_filter(value: String, filter: &str) -> String {
    let (name, argument) = match filter.split_once(':') {
        Some((name, argument)) => (name.trim(), Some(argument.trim())),
        None => (filter, None),
    };

    match name {
        "upper" => value.to_uppercase(),
        "lower" => value.to_lowercase(),
        "truncate" => {
            let length = argument.and_then(|a| a.parse::<usize>().ok()).unwrap_or(80);
            if value.chars().count() <= length {
                value
            } else {
                let mut truncated: String = value.chars().take(length).collect();
                truncated.push_str("...");
                truncated
            }
        }
        _ => {
            log::warn!("Unknown format filter '{}'", name);
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    #[test]
    fn formats_fields_relations_and_filters() {
        let author = Entry::new("Person").with_field("name", Value::from("Ada"));
        let entry = Entry::new("Article")
            .with_field("id", Value::Integer(3))
            .with_field("title", Value::from("A rather long headline"))
            .with_field("author", author);

        let formatter = EntryFormatter::new();

        assert_eq!(
            formatter.format_entry(&entry, "{title|truncate:8} by {author.name|upper}"),
            "A rather... by ADA"
        );
        assert_eq!(formatter.format_entry(&entry, "{missing}"), "");
    }

    #[test]
    fn title_falls_back_to_model_and_id() {
        let meta = ModelMeta::new("Article");
        let entry = Entry::proxy("Article", 9);

        assert_eq!(EntryFormatter::new().title(&meta, &entry), "Article #9");
    }
}
