use orm_scaffold::form::{FieldClass, FormValue, RowKind, ScaffoldForm, ScaffoldFormConfig, classify_field};
use orm_scaffold::orm::meta::option;
use orm_scaffold::services::GrantedPermissions;
use orm_scaffold::web::ScaffoldState;
use orm_scaffold::{Entry, FieldAccess, FieldValue, Model, ModelField, ModelMeta, OrmManager, PropertyType, Value};

fn build(state: &ScaffoldState, model: &str, config: Option<ScaffoldFormConfig>) -> ScaffoldForm {
    let model = state.orm.get_model(model).unwrap();
    let config =
        config.unwrap_or_else(|| ScaffoldFormConfig::from_meta(model.meta(), &GrantedPermissions::admin()));

    ScaffoldForm::build(state.form_context(), model.as_ref(), &config, None).unwrap()
}

fn nesting_depth(form: &ScaffoldForm) -> usize {
    form.rows
        .iter()
        .filter_map(|row| row.nested_form())
        .map(|nested| 1 + nesting_depth(nested))
        .max()
        .unwrap_or(0)
}

#[test]
fn has_many_collection_round_trips_identities() {
    let post = ModelMeta::new("Post")
        .with_field(ModelField::property("title", PropertyType::String))
        .with_field(ModelField::has_many("comments", "Comment").ordered());
    let comment = ModelMeta::new("Comment")
        .with_field(ModelField::property("body", PropertyType::Text))
        .with_field(ModelField::belongs_to("post", "Post"));

    let state = ScaffoldState::new(OrmManager::in_memory(vec![post, comment]).unwrap());
    let form = build(&state, "Post", None);

    match &form.row("comments").unwrap().kind {
        RowKind::Collection { form, ordered } => {
            assert!(*ordered);
            assert_eq!(form.row_names(), vec!["id", "body"]);
        }
        other => panic!("comments should be a collection, got {:?}", other),
    }

    let data = serde_json::from_value(serde_json::json!({
        "title": "Hello",
        "comments": [{"body": "first"}, {"body": "second"}]
    }))
    .unwrap();

    let posts = state.orm.get_model("Post").unwrap();
    let mut entry = form.parse_get_data(&state.orm, &data, None).unwrap();
    posts.save(&mut entry).unwrap();

    let saved = posts.find_by_id(entry.id().unwrap(), None).unwrap().unwrap();
    let ids: Vec<Option<i64>> = saved.related_many("comments").iter().map(|c| c.id()).collect();
    assert_eq!(ids.len(), 2);

    let round_trip = form.parse_set_data(&state.orm, &saved).unwrap();
    let parsed = form.parse_get_data(&state.orm, &round_trip, Some(saved.clone())).unwrap();

    let parsed_ids: Vec<Option<i64>> = parsed.related_many("comments").iter().map(|c| c.id()).collect();
    assert_eq!(parsed_ids, ids);
    assert_eq!(parsed.related_many("comments")[1].scalar("body"), Value::from("second"));
}

#[test]
fn absent_booleans_become_false_and_other_scalars_null() {
    let flag = ModelMeta::new("Flag")
        .with_field(ModelField::property("published", PropertyType::Boolean))
        .with_field(ModelField::property("note", PropertyType::String));

    let state = ScaffoldState::new(OrmManager::in_memory(vec![flag]).unwrap());
    let form = build(&state, "Flag", None);

    let mut base = state.orm.get_model("Flag").unwrap().create_entry();
    base.set_field("note", Value::from("stale").into());

    let entry = form.parse_get_data(&state.orm, &Default::default(), Some(base)).unwrap();

    assert_eq!(entry.scalar("published"), Value::Boolean(false));
    assert!(entry.scalar("note").is_null());
}

#[test]
fn explicit_select_type_always_yields_option_row() {
    let field = ModelField::belongs_to("author", "Person")
        .option(option::FORM_TYPE, "select")
        .option(option::FORM_DEPTH, "5");
    let meta = ModelMeta::new("Article").with_field(field.clone());
    let config = ScaffoldFormConfig::from_meta(&meta, &GrantedPermissions::admin());

    assert_eq!(
        classify_field(&field, &config),
        FieldClass::Option {
            row_type: Some("select".to_string())
        }
    );

    let plain = ModelField::belongs_to("editor", "Person");
    assert_eq!(classify_field(&plain, &config.clone().with_depth(0)), FieldClass::Option { row_type: None });
    assert_eq!(classify_field(&plain, &config), FieldClass::Component { depth: 1 });
}

#[test]
fn self_referencing_models_stop_at_the_configured_depth() {
    let category = ModelMeta::new("Category")
        .with_field(ModelField::property("name", PropertyType::String))
        .with_field(ModelField::belongs_to("parent", "Category").option(option::FORM_DEPTH, "10"));

    let state = ScaffoldState::new(OrmManager::in_memory(vec![category]).unwrap());
    let categories = state.orm.get_model("Category").unwrap();

    for depth in 0..4 {
        let config = ScaffoldFormConfig::from_meta(categories.meta(), &GrantedPermissions::admin()).with_max_depth(depth);
        let form = build(&state, "Category", Some(config));

        assert_eq!(nesting_depth(&form), depth as usize);
    }
}

#[test]
fn option_rows_filter_candidates_by_sibling_values() {
    let term = ModelMeta::new("Term")
        .with_field(ModelField::property("name", PropertyType::String))
        .with_field(ModelField::property("vocabulary", PropertyType::Integer))
        .with_format("title", "{name}");
    let article = ModelMeta::new("Article")
        .with_field(ModelField::property("vocabulary", PropertyType::Integer))
        .with_field(
            ModelField::belongs_to("term", "Term")
                .option(option::FORM_TYPE, "select")
                .option(option::FORM_CONDITION, "{vocabulary} = %vocabulary%"),
        );

    let state = ScaffoldState::new(OrmManager::in_memory(vec![term, article]).unwrap());
    let terms = state.orm.get_model("Term").unwrap();
    for (name, vocabulary) in [("red", 1), ("green", 2), ("blue", 1)] {
        let mut entry = terms.create_entry();
        entry.set_field("name", Value::from(name).into());
        entry.set_field("vocabulary", Value::Integer(vocabulary).into());
        terms.save(&mut entry).unwrap();
    }

    let articles = state.orm.get_model("Article").unwrap();
    let mut data = articles.create_entry();
    data.set_field("vocabulary", Value::Integer(1).into());

    let config = ScaffoldFormConfig::from_meta(articles.meta(), &GrantedPermissions::admin());
    let form = ScaffoldForm::build(state.form_context(), articles.as_ref(), &config, Some(&data)).unwrap();

    let labels: Vec<&str> = form.row("term").unwrap().choices().iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["", "red", "blue"]);

    let submitted = form.parse_set_data(&state.orm, &data).unwrap();
    assert_eq!(submitted["term"], FormValue::Value(Value::Null));
}

#[test]
fn unedited_deep_relations_survive_a_save() {
    let country = ModelMeta::new("Country").with_field(ModelField::property("name", PropertyType::String));
    let person = ModelMeta::new("Person")
        .with_field(ModelField::property("name", PropertyType::String))
        .with_field(ModelField::belongs_to("country", "Country"));
    let article = ModelMeta::new("Article")
        .with_field(ModelField::property("title", PropertyType::String))
        .with_field(ModelField::belongs_to("author", "Person").option(option::FORM_DEPTH, "2"));

    let state = ScaffoldState::new(OrmManager::in_memory(vec![country, person, article]).unwrap());
    let countries = state.orm.get_model("Country").unwrap();
    let people = state.orm.get_model("Person").unwrap();
    let articles = state.orm.get_model("Article").unwrap();

    let mut belgium = countries.create_entry();
    belgium.set_field("name", Value::from("Belgium").into());
    countries.save(&mut belgium).unwrap();
    let country_id = belgium.id().unwrap();

    let mut ada = people.create_entry();
    ada.set_field("name", Value::from("Ada").into());
    ada.set_field("country", FieldValue::from(Entry::proxy("Country", country_id)));
    people.save(&mut ada).unwrap();

    let mut entry = articles.create_entry();
    entry.set_field("title", Value::from("Hello").into());
    entry.set_field("author", FieldValue::from(Entry::proxy("Person", ada.id().unwrap())));
    articles.save(&mut entry).unwrap();

    let form = build(&state, "Article", None);
    assert_eq!(nesting_depth(&form), 2);

    let loaded = articles.find_by_id(entry.id().unwrap(), None).unwrap().unwrap();
    let data = form.parse_set_data(&state.orm, &loaded).unwrap();

    let author = data["author"].as_data().unwrap();
    let country = author["country"].as_data().unwrap();
    assert_eq!(country["name"], FormValue::Value(Value::from("Belgium")));

    let mut parsed = form.parse_get_data(&state.orm, &data, Some(loaded)).unwrap();
    articles.save(&mut parsed).unwrap();

    let stored = countries.find_by_id(country_id, None).unwrap().unwrap();
    assert_eq!(stored.scalar("name"), Value::from("Belgium"));
    assert_eq!(countries.count(&countries.create_query(None)).unwrap(), 1);

    let author = people.find_by_id(ada.id().unwrap(), None).unwrap().unwrap();
    assert_eq!(author.scalar("name"), Value::from("Ada"));
    assert_eq!(author.related("country").and_then(Entry::id), Some(country_id));
}
