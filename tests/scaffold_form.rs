mod common;

use orm_scaffold::form::{FormData, FormValue, RowKind, ScaffoldForm, ScaffoldFormConfig};
use orm_scaffold::services::GrantedPermissions;
use orm_scaffold::web::ScaffoldState;
use orm_scaffold::{Entry, FieldAccess, Model, OrmError, Value};

fn save_tag(state: &ScaffoldState, name: &str) -> i64 {
    let tags = state.orm.get_model("Tag").unwrap();
    let mut tag = tags.create_entry();
    tag.set_field("name", Value::from(name).into());
    tags.save(&mut tag).unwrap();
    tag.id().unwrap()
}

fn article_form(state: &ScaffoldState, entry: Option<&Entry>) -> ScaffoldForm {
    let articles = state.orm.get_model("Article").unwrap();
    let config = ScaffoldFormConfig::from_meta(articles.meta(), &GrantedPermissions::admin());

    ScaffoldForm::build(state.form_context(), articles.as_ref(), &config, entry).unwrap()
}

fn submission(json: serde_json::Value) -> FormData {
    serde_json::from_value(json).unwrap()
}

#[test]
fn builds_rows_for_properties_components_and_options() {
    let state = ScaffoldState::new(common::blog_orm());
    save_tag(&state, "zeta");
    save_tag(&state, "alpha");

    let form = article_form(&state, None);

    assert_eq!(form.name, "form-article");
    assert_eq!(form.row_names(), vec!["id", "title", "teaser", "author", "tags"]);

    assert!(matches!(form.row("id").unwrap().kind, RowKind::Hidden));

    let title = form.row("title").unwrap();
    assert_eq!(title.label, "Title");
    assert!(title.required);
    assert!(matches!(&title.kind, RowKind::Property { row_type } if row_type == "string"));

    let author = form.row("author").unwrap();
    let nested = author.nested_form().expect("author should be a nested component");
    assert!(matches!(author.kind, RowKind::Component { .. }));
    assert_eq!(nested.row_names(), vec!["id", "name"]);
    assert_eq!(nested.depth, 0);

    let tags = form.row("tags").unwrap();
    assert!(tags.is_reference());
    match &tags.kind {
        RowKind::Option { multiple, .. } => assert!(*multiple),
        other => panic!("tags should be an option row, got {:?}", other),
    }
    let labels: Vec<&str> = tags.choices().iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["alpha", "zeta"]);
}

#[test]
fn omitted_fields_are_left_out() {
    let state = ScaffoldState::new(common::blog_orm());
    let articles = state.orm.get_model("Article").unwrap();

    let config = ScaffoldFormConfig::from_meta(articles.meta(), &GrantedPermissions::admin()).omit_field("teaser");
    let form = ScaffoldForm::build(state.form_context(), articles.as_ref(), &config, None).unwrap();

    assert!(form.row("teaser").is_none());
    assert!(form.row("title").is_some());
}

#[test]
fn submitted_data_is_saved_with_nested_entries() {
    let state = ScaffoldState::new(common::blog_orm());
    let tag = save_tag(&state, "rust");
    let form = article_form(&state, None);

    let data = submission(serde_json::json!({
        "title": "Hello",
        "teaser": "",
        "author": {"name": "Ada"},
        "tags": [tag]
    }));

    form.validate(&data).unwrap();
    let mut entry = form.parse_get_data(&state.orm, &data, None).unwrap();

    let articles = state.orm.get_model("Article").unwrap();
    articles.save(&mut entry).unwrap();

    let saved = articles.find_by_id(entry.id().unwrap(), None).unwrap().unwrap();
    assert_eq!(saved.scalar("title"), Value::from("Hello"));
    assert!(saved.scalar("teaser").is_null());
    assert_eq!(saved.related("author").unwrap().scalar("name"), Value::from("Ada"));
    assert_eq!(saved.related_many("tags").len(), 1);

    let prefilled = article_form(&state, Some(&saved)).parse_set_data(&state.orm, &saved).unwrap();
    assert_eq!(prefilled["title"], FormValue::Value(Value::from("Hello")));
    assert_eq!(prefilled["tags"], FormValue::List(vec![FormValue::Value(Value::Integer(tag))]));

    let author = prefilled["author"].as_data().expect("author should be nested data");
    assert_eq!(author["name"], FormValue::Value(Value::from("Ada")));
}

#[test]
fn missing_required_values_are_reported_per_row() {
    let state = ScaffoldState::new(common::blog_orm());
    let form = article_form(&state, None);

    let data = submission(serde_json::json!({
        "title": "",
        "author": {"name": ""}
    }));

    let err = form.validate(&data).unwrap_err();
    assert_eq!(err.field_errors("title")[0].code, "error.validation.required");
    assert_eq!(err.field_errors("author.name").len(), 1);

    let mapped = form.map_validation_error(&err);
    assert!(mapped.fields.contains_key("title"));
    assert!(mapped.fields.contains_key("author.name"));
    assert!(mapped.general.is_empty());
}

#[test]
fn unconvertible_values_fail_as_validation_errors() {
    let counter = orm_scaffold::ModelMeta::new("Counter")
        .with_field(orm_scaffold::ModelField::property("hits", orm_scaffold::PropertyType::Integer));
    let state = ScaffoldState::new(orm_scaffold::OrmManager::in_memory(vec![counter]).unwrap());

    let counters = state.orm.get_model("Counter").unwrap();
    let config = ScaffoldFormConfig::from_meta(counters.meta(), &GrantedPermissions::admin());
    let form = ScaffoldForm::build(state.form_context(), counters.as_ref(), &config, None).unwrap();

    let data = submission(serde_json::json!({"hits": "many"}));

    match form.parse_get_data(&state.orm, &data, None) {
        Err(OrmError::Validation(err)) => {
            assert_eq!(err.field_errors("hits")[0].code, "error.validation.type");
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
}
