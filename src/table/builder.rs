//! Tables of the model browser: the registered models, the fields of one
//! model and its indexes.

use crate::core::Result;
use crate::orm::OrmManager;
use crate::orm::meta::{ModelField, ModelIndex, ModelMeta, PRIMARY_KEY, option};
use crate::services::Translator;
use crate::table::html;
use crate::table::view::{TableCell, TableRow, TableView};
use std::collections::BTreeMap;

pub const IMAGE_LOCALIZED: &str = "img/orm/localized.png";
pub const TRANSLATION_LOCALIZED: &str = "orm.label.localized";

fn parameters<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Translates `single` with `%{single_name}%` for one item, or `many` with
/// `%first%` and `%last%` for more. Empty for no items.
fn list_info(translator: &dyn Translator, mut items: Vec<String>, single: &str, single_name: &str, many: &str) -> String {
    match items.len() {
        0 => String::new(),
        1 => {
            let item = items.remove(0);
            translator.translate_with(single, &parameters([(single_name, item)])) + "<br />"
        }
        _ => {
            let last = items.pop().unwrap_or_default();
            translator.translate_with(many, &parameters([("first", items.join(", ")), ("last", last)])) + "<br />"
        }
    }
}

fn model_link(name: &str, action: Option<&str>) -> String {
    match action {
        Some(action) => html::anchor(&html::escape(name), &action.replace("%model%", name).replace("%25model%25", name)),
        None => html::escape(name),
    }
}

/// Every registered model with its relations and the models linking to it
/// one way.
pub struct ModelTable<'a> {
    orm: &'a OrmManager,
    translator: &'a dyn Translator,
    model_action: Option<String>,
    scaffold_action: Option<String>,
}

impl<'a> ModelTable<'a> {
    pub fn new(orm: &'a OrmManager, translator: &'a dyn Translator) -> Self {
        Self {
            orm,
            translator,
            model_action: None,
            scaffold_action: None,
        }
    }

    /// Links model names to `action`, `%model%` replaced by the name.
    pub fn with_model_action(mut self, action: impl Into<String>) -> Self {
        self.model_action = Some(action.into());
        self
    }

    /// Adds a scaffold link per model, `%model%` replaced by the name.
    pub fn with_scaffold_action(mut self, action: impl Into<String>) -> Self {
        self.scaffold_action = Some(action.into());
        self
    }

    pub fn build(&self) -> Result<TableView> {
        let action = self.model_action.as_deref();
        let mut rows = Vec::new();

        for model in self.orm.models() {
            let name = model.name();
            let mut value = model_link(name, action);

            let mut relations: Vec<String> = Vec::new();
            for field in model.meta().relations() {
                if let Some(relation) = field.relation_meta() {
                    let link = model_link(&relation.model, action);
                    if !relations.contains(&link) {
                        relations.push(link);
                    }
                }
            }

            let unlinked = self
                .orm
                .unlinked_models(name)?
                .iter()
                .map(|unlinked| model_link(unlinked, action))
                .collect();

            let info = list_info(self.translator, relations, "label.relation.with", "model", "label.relations.with")
                + &list_info(self.translator, unlinked, "label.unlinked.model", "model", "label.unlinked.models");
            if !info.is_empty() {
                value.push_str(&html::info(&info));
            }

            let mut row = TableRow::new(None);
            row.push(TableCell::new(value).with_class("model"));

            if let Some(scaffold) = &self.scaffold_action {
                let href = scaffold.replace("%model%", name).replace("%25model%25", name);
                let label = html::escape(&self.translator.translate("button.scaffold"));
                row.push(TableCell::new(html::anchor(&label, &href)).with_class("action"));
            }

            rows.push(row);
        }

        Ok(TableView::from_rows(rows))
    }
}

/// Fields of a model with their type, label and localization flag.
pub struct ModelFieldTable<'a> {
    translator: &'a dyn Translator,
    meta: &'a ModelMeta,
    model_action: Option<String>,
}

impl<'a> ModelFieldTable<'a> {
    pub fn new(translator: &'a dyn Translator, meta: &'a ModelMeta) -> Self {
        Self {
            translator,
            meta,
            model_action: None,
        }
    }

    pub fn with_model_action(mut self, action: impl Into<String>) -> Self {
        self.model_action = Some(action.into());
        self
    }

    pub fn build(&self) -> TableView {
        let rows = self
            .meta
            .fields()
            .iter()
            .filter(|field| field.name != PRIMARY_KEY)
            .map(|field| {
                let mut row = TableRow::new(None);
                row.push(TableCell::new(self.field_html(field)).with_class("field"));
                row.push(TableCell::new(self.label_html(field)).with_class("label"));
                row.push(TableCell::new(self.flags_html(field)).with_class("flags"));
                row
            })
            .collect();

        TableView::from_rows(rows)
    }

    fn field_html(&self, field: &ModelField) -> String {
        let mut value = html::escape(&field.name);
        let action = self.model_action.as_deref();

        let info = match field.relation_meta() {
            Some(relation) => {
                let link = relation.link_model.as_deref().map(|link| model_link(link, action));
                let key = match (&link, &relation.foreign_key) {
                    (Some(_), Some(_)) => "label.relation.type.link.fk",
                    (Some(_), None) => "label.relation.type.link",
                    (None, Some(_)) => "label.relation.type.fk",
                    (None, None) => "label.relation.type",
                };

                self.translator.translate_with(
                    key,
                    &parameters([
                        ("type", relation.kind.as_str().to_string()),
                        ("model", model_link(&relation.model, action)),
                        ("link", link.unwrap_or_default()),
                        ("foreignKey", relation.foreign_key.clone().unwrap_or_default()),
                    ]),
                )
            }
            None => {
                let mut info = self
                    .translator
                    .translate_with("label.field.type", &parameters([("type", field.type_name().to_string())]))
                    + "<br />";

                if let Some(default) = &field.default {
                    info.push_str(&format!(
                        "{}: {}",
                        self.translator.translate("label.value.default"),
                        html::escape(&default.to_string())
                    ));
                }

                info
            }
        };

        value.push_str(&html::info(&info));
        value
    }

    fn label_html(&self, field: &ModelField) -> String {
        match field.options.get(option::LABEL_NAME) {
            Some(label) => html::escape(&self.translator.translate(label)) + &html::info(&html::escape(label)),
            None => String::new(),
        }
    }

    fn flags_html(&self, field: &ModelField) -> String {
        if !field.localized {
            return String::new();
        }

        let mut attributes = BTreeMap::new();
        attributes.insert("title".to_string(), self.translator.translate(TRANSLATION_LOCALIZED));

        html::image(IMAGE_LOCALIZED, &attributes)
    }
}

/// Indexes of a model with the fields they cover.
pub struct ModelIndexTable<'a> {
    translator: &'a dyn Translator,
    indexes: &'a [ModelIndex],
}

impl<'a> ModelIndexTable<'a> {
    pub fn new(translator: &'a dyn Translator, indexes: &'a [ModelIndex]) -> Self {
        Self { translator, indexes }
    }

    pub fn build(&self) -> TableView {
        let rows = self
            .indexes
            .iter()
            .map(|index| {
                let fields = index.fields.iter().map(|f| html::escape(f)).collect();
                let info = list_info(self.translator, fields, "label.index.field.in", "field", "label.index.fields.in");

                let mut row = TableRow::new(None);
                row.push(TableCell::new(html::escape(&index.name) + &html::info(&info)).with_class("index"));
                row
            })
            .collect();

        TableView::from_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::meta::PropertyType;
    use crate::services::MapTranslator;

    fn translator() -> MapTranslator {
        MapTranslator::new()
            .with("label.relation.with", "Relation with %model%")
            .with("label.relations.with", "Relations with %first% and %last%")
            .with("label.unlinked.model", "Linked from %model%")
            .with("label.relation.type", "%type% %model%")
            .with("label.relation.type.fk", "%type% %model% through %foreignKey%")
            .with("label.field.type", "Type %type%")
            .with("label.index.fields.in", "On %first% and %last%")
            .with("button.scaffold", "Scaffold")
    }

    #[test]
    fn model_table_lists_relations_and_unlinked_models() {
        let orm = OrmManager::in_memory(vec![
            ModelMeta::new("Person"),
            ModelMeta::new("Tag"),
            ModelMeta::new("Article")
                .with_field(ModelField::belongs_to("author", "Person"))
                .with_field(ModelField::has_many("tags", "Tag")),
        ])
        .unwrap();
        let translator = translator();

        let view = ModelTable::new(&orm, &translator)
            .with_model_action("/orm/model/%model%")
            .with_scaffold_action("/scaffold/%model%")
            .build()
            .unwrap();

        assert_eq!(view.rows.len(), 3);
        assert_eq!(
            view.rows[0].cells[0].value,
            "<a href=\"/orm/model/Article\">Article</a><div class=\"info\">Relations with \
             <a href=\"/orm/model/Person\">Person</a> and <a href=\"/orm/model/Tag\">Tag</a><br /></div>"
        );
        assert_eq!(
            view.rows[1].cells[0].value,
            "<a href=\"/orm/model/Person\">Person</a><div class=\"info\">Linked from \
             <a href=\"/orm/model/Article\">Article</a><br /></div>"
        );
        assert_eq!(view.rows[2].cells[1].value, "<a href=\"/scaffold/Tag\">Scaffold</a>");
    }

    #[test]
    fn field_and_index_tables_describe_the_model() {
        let meta = ModelMeta::new("Article")
            .with_field(
                ModelField::property("title", PropertyType::String)
                    .localized()
                    .option(option::LABEL_NAME, "label.title"),
            )
            .with_field(ModelField::belongs_to("author", "Person").foreign_key("articles"))
            .with_index(ModelIndex {
                name: "lookup".to_string(),
                fields: vec!["title".to_string(), "author".to_string()],
            });
        let translator = translator();

        let fields = ModelFieldTable::new(&translator, &meta).build();
        assert_eq!(fields.rows.len(), 2);
        assert_eq!(fields.rows[0].cells[0].value, "title<div class=\"info\">Type string<br /></div>");
        assert_eq!(fields.rows[0].cells[1].value, "label.title<div class=\"info\">label.title</div>");
        assert!(fields.rows[0].cells[2].value.contains(IMAGE_LOCALIZED));
        assert_eq!(
            fields.rows[1].cells[0].value,
            "author<div class=\"info\">belongsTo Person through articles</div>"
        );
        assert_eq!(fields.rows[1].cells[2].value, "");

        let indexes = ModelIndexTable::new(&translator, meta.indexes()).build();
        assert_eq!(
            indexes.rows[0].cells[0].value,
            "lookup<div class=\"info\">On title and author<br /></div>"
        );
    }
}
