//! Scaffold route dispatcher.
//!
//! Every scaffold screen lives under one wildcard route:
//!
//! ```text
//! {model}[/{locale}]                     index
//! {model}[/{locale}]/add                 add form
//! {model}[/{locale}]/edit/{id}           edit form
//! {model}[/{locale}]/{id}                detail, redirects to edit
//! {model}[/{locale}]/export/{format}     export
//! {model}[/{locale}]/delete              batch delete
//! {model}[/{locale}]/delete-localized    batch delete of one locale
//! ```
//!
//! The parser turns such a path into a [`ScaffoldRoute`]; combinations which
//! do not fit a screen yield `None`.

const ACTION_ADD: &str = "add";
const ACTION_EDIT: &str = "edit";
const ACTION_EXPORT: &str = "export";
const ACTION_DELETE: &str = "delete";
const ACTION_DELETE_LOCALIZED: &str = "delete-localized";

/// Locale segment kept verbatim in paths, substituted by the client.
pub const LOCALE_PLACEHOLDER: &str = "%locale%";

const ACTIONS: [&str; 5] = [ACTION_ADD, ACTION_EDIT, ACTION_EXPORT, ACTION_DELETE, ACTION_DELETE_LOCALIZED];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaffoldAction {
    Index,
    Add,
    Edit(i64),
    Detail(i64),
    Export(String),
    Delete,
    DeleteLocalized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldRoute {
    pub model: String,
    pub locale: Option<String>,
    pub action: ScaffoldAction,
}

impl ScaffoldRoute {
    pub fn new(model: impl Into<String>, locale: Option<String>, action: ScaffoldAction) -> Self {
        Self {
            model: model.into(),
            locale,
            action,
        }
    }

    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let (model, rest) = segments.split_first()?;

        // a locale is any segment which is neither an action nor an id
        let (locale, rest) = match rest.split_first() {
            Some((first, tail)) if !ACTIONS.contains(first) && first.parse::<i64>().is_err() => {
                (Some(first.to_string()), tail)
            }
            _ => (None, rest),
        };

        let action = match rest {
            [] => ScaffoldAction::Index,
            [action] if *action == ACTION_ADD => ScaffoldAction::Add,
            [action] if *action == ACTION_DELETE => ScaffoldAction::Delete,
            [action] if *action == ACTION_DELETE_LOCALIZED => ScaffoldAction::DeleteLocalized,
            [action, id] if *action == ACTION_EDIT => ScaffoldAction::Edit(id.parse().ok()?),
            [action, format] if *action == ACTION_EXPORT => ScaffoldAction::Export(format.to_string()),
            [id] => ScaffoldAction::Detail(id.parse().ok()?),
            _ => return None,
        };

        Some(Self::new(model.to_string(), locale, action))
    }

    /// Path of this route under `base`.
    pub fn path(&self, base: &str) -> String {
        let mut path = format!("{}/{}", base.trim_end_matches('/'), urlencoding::encode(&self.model));

        if let Some(locale) = &self.locale {
            path.push('/');
            if locale == LOCALE_PLACEHOLDER {
                path.push_str(locale);
            } else {
                path.push_str(&urlencoding::encode(locale));
            }
        }

        match &self.action {
            ScaffoldAction::Index => {}
            ScaffoldAction::Add => path.push_str("/add"),
            ScaffoldAction::Edit(id) => path.push_str(&format!("/edit/{}", id)),
            ScaffoldAction::Detail(id) => path.push_str(&format!("/{}", id)),
            ScaffoldAction::Export(format) => path.push_str(&format!("/export/{}", urlencoding::encode(format))),
            ScaffoldAction::Delete => path.push_str("/delete"),
            ScaffoldAction::DeleteLocalized => path.push_str("/delete-localized"),
        }

        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_screens_with_and_without_locale() {
        let route = ScaffoldRoute::parse("Article/en/edit/4").unwrap();
        assert_eq!(route.model, "Article");
        assert_eq!(route.locale.as_deref(), Some("en"));
        assert_eq!(route.action, ScaffoldAction::Edit(4));

        assert_eq!(ScaffoldRoute::parse("Article").unwrap().action, ScaffoldAction::Index);
        assert_eq!(ScaffoldRoute::parse("Article/add").unwrap().locale, None);
        assert_eq!(ScaffoldRoute::parse("Article/nl/7").unwrap().action, ScaffoldAction::Detail(7));
        assert_eq!(
            ScaffoldRoute::parse("/Article/en/export/csv").unwrap().action,
            ScaffoldAction::Export("csv".to_string())
        );
        assert_eq!(
            ScaffoldRoute::parse("Article/en/delete-localized").unwrap().action,
            ScaffoldAction::DeleteLocalized
        );
    }

    #[test]
    fn rejects_invalid_combinations() {
        assert!(ScaffoldRoute::parse("").is_none());
        assert!(ScaffoldRoute::parse("Article/en/edit").is_none());
        assert!(ScaffoldRoute::parse("Article/en/edit/x").is_none());
        assert!(ScaffoldRoute::parse("Article/en/add/3").is_none());
        assert!(ScaffoldRoute::parse("Article/en/export").is_none());
        assert!(ScaffoldRoute::parse("Article/en/4/edit/5").is_none());
    }

    #[test]
    fn renders_paths() {
        let route = ScaffoldRoute::new("Article", None, ScaffoldAction::Index);
        assert_eq!(route.path("/scaffold"), "/scaffold/Article");

        let route = ScaffoldRoute::new("Article", Some("en".to_string()), ScaffoldAction::Edit(3));
        assert_eq!(route.path("/scaffold/"), "/scaffold/Article/en/edit/3");
    }

    #[test]
    fn encodes_every_dynamic_segment() {
        let route = ScaffoldRoute::new("Blog Post", Some("en/us".to_string()), ScaffoldAction::Export("c v".to_string()));
        assert_eq!(route.path("/scaffold"), "/scaffold/Blog%20Post/en%2Fus/export/c%20v");

        let route = ScaffoldRoute::new("Article", Some(LOCALE_PLACEHOLDER.to_string()), ScaffoldAction::Add);
        assert_eq!(route.path("/scaffold"), "/scaffold/Article/%locale%/add");
    }
}
