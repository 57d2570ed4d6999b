//! Scaffold form component.
//!
//! Builds a row tree from model metadata. Property fields become leaf rows,
//! relation fields either an option row referencing related entries by id or
//! a nested component, depending on the `scaffold.form.type` option and the
//! remaining depth. Every nested level gets one less depth, so building
//! terminates for any model graph.

use crate::core::{Result, Value};
use crate::expression::{Condition, Parameters};
use crate::form::config::ScaffoldFormConfig;
use crate::form::row::{Choice, FormRow, FormTab, RowKind};
use crate::orm::entry::Entry;
use crate::orm::meta::{ModelField, ModelMeta, PropertyType, RelationKind, option};
use crate::orm::{Model, OrmManager};
use crate::services::{Directories, PermissionChecker, Translator};
use log::debug;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

const OPTION_TYPES: [&str; 3] = ["option", "select", "object"];
const PROPERTY_TYPES: [&str; 4] = ["tags", "assets", "label", "geo"];

/// Services a form is built with.
#[derive(Clone, Copy)]
pub struct FormContext<'a> {
    pub orm: &'a OrmManager,
    pub translator: &'a dyn Translator,
    pub permissions: &'a dyn PermissionChecker,
    pub directories: &'a Directories,
    /// Base URL of the entry API, used for autocompletion
    pub api_base: &'a str,
}

/// How a field is rendered, resolved once per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldClass {
    Omitted,
    Hidden,
    Property { row_type: String },
    Option { row_type: Option<String> },
    Component { depth: u32 },
}

/// Classifies a field: omitted beats hidden, then property widgets, then
/// option rows for explicit option types or exhausted depth, otherwise a
/// nested component.
pub fn classify_field(field: &ModelField, config: &ScaffoldFormConfig) -> FieldClass {
    if config.is_omitted(&field.name) {
        return FieldClass::Omitted;
    }

    if config.is_hidden(&field.name) {
        return FieldClass::Hidden;
    }

    let row_type = field.options.get(option::FORM_TYPE);
    let is_option_type = row_type.is_some_and(|t| OPTION_TYPES.contains(&t));

    if row_type.is_some_and(|t| PROPERTY_TYPES.contains(&t)) || (!is_option_type && !field.is_relation()) {
        return FieldClass::Property {
            row_type: row_type.unwrap_or(field.type_name()).to_string(),
        };
    }

    let depth = config.depth_for(&field.name);
    if is_option_type || depth == 0 {
        return FieldClass::Option {
            row_type: row_type.map(String::from),
        };
    }

    FieldClass::Component { depth }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScaffoldForm {
    pub name: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    pub depth: u32,
    pub rows: Vec<FormRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tabs: Vec<FormTab>,
    #[serde(skip)]
    pub(crate) localized: bool,
}

impl ScaffoldForm {
    /// Builds the row tree of `model`. `data` is the entry being edited, used
    /// to evaluate option conditions against sibling values.
    pub fn build(
        ctx: FormContext<'_>,
        model: &dyn Model,
        config: &ScaffoldFormConfig,
        data: Option<&Entry>,
    ) -> Result<Self> {
        let meta = model.meta();

        let mut form = Self {
            name: format!("form-{}", meta.name.to_lowercase()),
            model: meta.name.clone(),
            locale: config.locale().map(String::from),
            depth: config.depth(),
            rows: Vec::new(),
            tabs: build_tabs(ctx.translator, meta),
            localized: meta.is_localized(),
        };

        for field in meta.fields() {
            debug!("Generating field {}", field.name);

            let class = classify_field(field, config);
            let label = field_label(ctx.translator, field);

            let mut row = match class {
                FieldClass::Omitted => continue,
                FieldClass::Hidden => {
                    form.rows.push(FormRow::new(field, label, RowKind::Hidden));
                    continue;
                }
                FieldClass::Property { row_type } => property_row(ctx, model, config, field, label, row_type)?,
                FieldClass::Option { row_type } => option_row(ctx, model, config, field, label, row_type, data)?,
                FieldClass::Component { depth } => component_row(ctx, model, config, field, label, depth, data)?,
            };

            row.description = field
                .options
                .get(option::LABEL_DESCRIPTION)
                .map(|key| ctx.translator.translate(key));
            row.required = field.is_required();

            if let Some(class) = field_dependency(field) {
                row.attributes.insert("class".to_string(), class);
            }

            if let Some(tab) = field.options.get(option::FORM_TAB)
                && let Some(form_tab) = form.tabs.iter_mut().find(|t| t.name == tab)
            {
                form_tab.rows.push(field.name.clone());
                row.tab = Some(tab.to_string());
            }

            form.rows.push(row);
        }

        Ok(form)
    }

    pub fn row(&self, name: &str) -> Option<&FormRow> {
        self.rows.iter().find(|r| r.name == name)
    }

    /// Names of the rows, in field order.
    pub fn row_names(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.name.as_str()).collect()
    }

    /// Whether a dotted error path such as `author.name` or `comments.0.body`
    /// points at a row of this tree.
    pub fn has_row_path(&self, path: &str) -> bool {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };

        let Some(row) = self.row(head) else {
            return false;
        };

        match (rest, &row.kind) {
            (None, _) => true,
            (Some(rest), RowKind::Component { form }) => form.has_row_path(rest),
            (Some(rest), RowKind::Collection { form, .. }) => match rest.split_once('.') {
                Some((index, rest)) if index.parse::<usize>().is_ok() => form.has_row_path(rest),
                None => rest.parse::<usize>().is_ok(),
                _ => false,
            },
            (Some(_), _) => false,
        }
    }
}

fn build_tabs(translator: &dyn Translator, meta: &ModelMeta) -> Vec<FormTab> {
    meta.options
        .get_list(option::FORM_TABS)
        .into_iter()
        .map(|tab| {
            let key = meta
                .options
                .get(&option::form_tab_label(&tab))
                .map(String::from)
                .unwrap_or_else(|| format!("label.{}", tab));

            FormTab {
                label: translator.translate(&key),
                name: tab,
                rows: Vec::new(),
            }
        })
        .collect()
}

fn field_label(translator: &dyn Translator, field: &ModelField) -> String {
    match field.options.get(option::LABEL_NAME) {
        Some(key) => translator.translate(key),
        None => capitalize(&field.name),
    }
}

pub(crate) fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// CSS classes of a field shown depending on another one, from
/// `scaffold.form.dependant = "field-value"`.
fn field_dependency(field: &ModelField) -> Option<String> {
    let dependant = field.options.get(option::FORM_DEPENDANT)?;

    let (name, value) = dependant.split_once('-').unwrap_or((dependant, "1"));

    Some(format!("option-{name} option-{name}-{value}"))
}

fn property_row(
    ctx: FormContext<'_>,
    model: &dyn Model,
    config: &ScaffoldFormConfig,
    field: &ModelField,
    label: String,
    row_type: String,
) -> Result<FormRow> {
    let mut row_type = row_type;
    let mut attributes = BTreeMap::new();
    let mut options = BTreeMap::new();
    let multiple = field.is_relation_kind(RelationKind::HasMany);

    match row_type.as_str() {
        "boolean" => {
            attributes.insert("data-toggle-dependant".to_string(), format!("option-{}", field.name));
        }
        "float" => {
            row_type = "number".to_string();
            attributes.insert("step".to_string(), "any".to_string());
        }
        "date" => {
            options.insert("round".to_string(), json!(true));
        }
        "label" => {
            if let Some(decorator) = field.options.get(option::FORM_DECORATOR) {
                options.insert("decorator".to_string(), json!(decorator));
                options.insert("html".to_string(), json!(true));
            } else if let Some(relation) = field.relation_meta() {
                let related = ctx.orm.get_model(&relation.model)?;
                let format = related
                    .meta()
                    .format(crate::orm::meta::FORMAT_TITLE)
                    .map(String::from)
                    .unwrap_or_else(|| format!("{} #{{id}}", related.name()));

                options.insert("decorator".to_string(), json!(format));
            }
        }
        "file" | "image" => {
            if let Some(path) = field.options.get(option::UPLOAD_PATH) {
                let path = ctx.directories.resolve(path);
                options.insert("path".to_string(), json!(path.to_string_lossy()));
            }
        }
        "tags" => {
            let mut url = format!(
                "{}/taxonomy-terms?list=1&fields[taxonomy-terms]=&filter[match][name]=%term%",
                ctx.api_base.trim_end_matches('/')
            );

            if let Some(vocabulary) = field.options.get(option::TAXONOMY_VOCABULARY) {
                if vocabulary.parse::<i64>().is_ok() {
                    url.push_str(&format!("&filter[exact][vocabulary]={}", vocabulary));
                } else {
                    url.push_str(&format!("&filter[exact][vocabulary.slug]={}", urlencoding::encode(vocabulary)));
                }
            }

            options.insert("autocomplete.url".to_string(), json!(url));
            options.insert("autocomplete.type".to_string(), json!("jsonapi"));
            options.insert("locale".to_string(), json!(config.locale()));
        }
        "assets" => {
            options.insert("multiple".to_string(), json!(multiple));
            if let Some(folder) = field.options.get(option::ASSETS_FOLDER) {
                options.insert("folder".to_string(), json!(folder));
            }
        }
        "geo" => {
            let geo_type = field.options.get(option::GEO_TYPE).unwrap_or_default();
            let geo_type = if geo_type.contains(',') {
                json!(field.options.get_list(option::GEO_TYPE))
            } else {
                json!(geo_type)
            };

            options.insert("multiple".to_string(), json!(multiple));
            options.insert("filter".to_string(), json!(field.options.get(option::GEO_FILTER)));
            options.insert("type".to_string(), geo_type);
            options.insert("locale".to_string(), json!(config.locale()));
        }
        _ => {}
    }

    debug!("Property row {} of {} as {}", field.name, model.name(), row_type);

    let mut row = FormRow::new(field, label, RowKind::Property { row_type });
    row.attributes = attributes;
    row.options = options;

    Ok(row)
}

fn option_row(
    ctx: FormContext<'_>,
    model: &dyn Model,
    config: &ScaffoldFormConfig,
    field: &ModelField,
    label: String,
    row_type: Option<String>,
    data: Option<&Entry>,
) -> Result<FormRow> {
    let (row_type, widget, multiple, mut choices) = match field.relation_meta() {
        Some(relation) => {
            let widget = field
                .options
                .get(option::FORM_WIDGET)
                .map(String::from)
                .or_else(|| row_type.filter(|t| t != "object"));
            let multiple = relation.kind == RelationKind::HasMany;
            let choices = relation_choices(ctx, model, config, field, &relation.model, data)?;

            ("option".to_string(), widget, multiple, choices)
        }
        None => {
            let choices = property_choices(ctx.translator, field);

            (row_type.unwrap_or_else(|| "option".to_string()), Some("option".to_string()), false, choices)
        }
    };

    if !multiple && widget.as_deref() != Some("option") {
        choices.insert(0, Choice::empty());
    }

    let mut row = FormRow::new(
        field,
        label,
        RowKind::Option {
            row_type,
            widget,
            multiple,
            choices,
        },
    );
    row.attributes
        .insert("data-toggle-dependant".to_string(), format!("option-{}", field.name));

    Ok(row)
}

/// Candidate entries of a relation, optionally filtered by the
/// `scaffold.form.condition` of the field. Named parameters in the condition
/// (`%vocabulary%`) take the value of the sibling field with that name.
fn relation_choices(
    ctx: FormContext<'_>,
    model: &dyn Model,
    config: &ScaffoldFormConfig,
    field: &ModelField,
    related: &str,
    data: Option<&Entry>,
) -> Result<Vec<Choice>> {
    let related = ctx.orm.get_model(related)?;

    let mut query = related.create_query(config.locale());
    query.set_fetch_unlocalized(true);

    if let Some(expression) = field.options.get(option::FORM_CONDITION) {
        let mut parameters = Parameters::new();
        for sibling in model.meta().fields() {
            let value = data
                .and_then(|entry| entry.get(&sibling.name))
                .map(|value| value.comparable())
                .unwrap_or(Value::Null);
            parameters = parameters.with_named(sibling.name.clone(), value);
        }

        query.add_parsed_condition(Condition::parse(expression)?, parameters);
    }

    if let Some(order_field) = related.meta().option(option::ORDER_FIELD) {
        let direction = related.meta().option(option::ORDER_DIRECTION).unwrap_or("ASC");
        query.add_order_by(&format!("{{{}}} {}", order_field, direction))?;
    }

    let formatter = ctx.orm.formatter();
    let choices = related
        .find(&query)?
        .iter()
        .filter_map(|entry| {
            entry
                .id()
                .map(|id| Choice::new(id.to_string(), formatter.title(related.meta(), entry)))
        })
        .collect();

    Ok(choices)
}

/// Choices of a property option row from `scaffold.form.options`, either
/// `a,b` or `a=label.a,b=label.b`.
fn property_choices(translator: &dyn Translator, field: &ModelField) -> Vec<Choice> {
    if field.property_type() == Some(PropertyType::Boolean) && field.options.get(option::FORM_OPTIONS).is_none() {
        return vec![Choice::new("1", translator.translate("label.yes")), Choice::new("0", translator.translate("label.no"))];
    }

    field
        .options
        .get_list(option::FORM_OPTIONS)
        .into_iter()
        .map(|item| match item.split_once('=') {
            Some((value, label)) => Choice::new(value.trim(), translator.translate(label.trim())),
            None => Choice::new(item.clone(), item),
        })
        .collect()
}

fn component_row(
    ctx: FormContext<'_>,
    model: &dyn Model,
    config: &ScaffoldFormConfig,
    field: &ModelField,
    label: String,
    depth: u32,
    data: Option<&Entry>,
) -> Result<FormRow> {
    let related = ctx.orm.relation_model(model, &field.name)?;
    let nested_depth = depth.saturating_sub(1);

    let mut nested_config = ScaffoldFormConfig::from_meta(related.meta(), ctx.permissions)
        .with_depth(nested_depth)
        .with_max_depth(nested_depth)
        .with_locale(config.locale().map(String::from));

    for back_reference in back_references(model.meta(), field, related.meta()) {
        nested_config = nested_config.omit_field(back_reference);
    }

    let nested_data = data.and_then(|entry| entry.related(&field.name));
    let form = Box::new(ScaffoldForm::build(ctx, related.as_ref(), &nested_config, nested_data)?);

    let kind = match field.relation_meta().map(|r| (r.kind, r.ordered)) {
        Some((RelationKind::HasMany, ordered)) => RowKind::Collection { form, ordered },
        _ => RowKind::Component { form },
    };

    Ok(FormRow::new(field, label, kind))
}

/// Fields of the related model pointing back at the owner of `field`. These
/// are implied by the nesting and left out of the nested form.
fn back_references(owner: &ModelMeta, field: &ModelField, related: &ModelMeta) -> Vec<String> {
    let Some(relation) = field.relation_meta() else {
        return Vec::new();
    };

    if relation.link_model.is_some() {
        return Vec::new();
    }

    if let Some(foreign_key) = &relation.foreign_key {
        return vec![foreign_key.clone()];
    }

    let inverse = match relation.kind {
        RelationKind::HasMany | RelationKind::HasOne => RelationKind::BelongsTo,
        RelationKind::BelongsTo => RelationKind::HasMany,
    };

    related
        .relations_to(&owner.name)
        .filter(|f| {
            f.is_relation_kind(inverse)
                || (relation.kind == RelationKind::BelongsTo && f.is_relation_kind(RelationKind::HasOne))
        })
        .map(|f| f.name.clone())
        .collect()
}
