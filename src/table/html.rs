//! Small markup helpers for table cells.

use std::collections::BTreeMap;

/// Name of the checkbox field selecting table rows for an action.
pub const FIELD_ID: &str = "id";

pub fn escape(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

fn escape_attribute(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}

fn attributes_html(attributes: &BTreeMap<String, String>) -> String {
    attributes
        .iter()
        .map(|(name, value)| format!(" {}=\"{}\"", name, escape_attribute(value)))
        .collect()
}

/// Anchor around already escaped label markup.
pub fn anchor(label_html: &str, href: &str) -> String {
    format!("<a href=\"{}\">{}</a>", escape_attribute(href), label_html)
}

pub fn image(src: &str, attributes: &BTreeMap<String, String>) -> String {
    format!("<img src=\"{}\"{} />", escape_attribute(src), attributes_html(attributes))
}

pub fn checkbox(name: &str, value: &str) -> String {
    format!(
        "<input type=\"checkbox\" name=\"{}[]\" value=\"{}\" />",
        escape_attribute(name),
        escape_attribute(value)
    )
}

pub fn info(content_html: &str) -> String {
    format!("<div class=\"info\">{}</div>", content_html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_text_and_attributes() {
        assert_eq!(escape("<b>Tom & Jerry</b>"), "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;");
        assert_eq!(anchor("Edit", "/x?a=1&b=\"2\""), "<a href=\"/x?a=1&amp;b=&quot;2&quot;\">Edit</a>");
        assert_eq!(checkbox(FIELD_ID, "7"), "<input type=\"checkbox\" name=\"id[]\" value=\"7\" />");
    }

    #[test]
    fn image_renders_sorted_attributes() {
        let mut attributes = BTreeMap::new();
        attributes.insert("title".to_string(), "Localized".to_string());
        attributes.insert("class".to_string(), "data".to_string());

        assert_eq!(
            image("img/a.png", &attributes),
            "<img src=\"img/a.png\" class=\"data\" title=\"Localized\" />"
        );
    }
}
