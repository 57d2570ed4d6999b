//! Listing table of the scaffold.
//!
//! Wraps a model query with a search box, named order methods and
//! pagination. Nothing is queried until [`ScaffoldTable::process`].

use crate::core::{Result, Value};
use crate::expression::{Condition, Direction, Parameters};
use crate::form::component::capitalize;
use crate::orm::entry::Entry;
use crate::orm::meta::{ModelField, PRIMARY_KEY, option};
use crate::orm::model::Model;
use crate::orm::query::ModelQuery;
use crate::services::Translator;
use crate::table::decorator::{Decorator, OptionDecorator};
use crate::table::view::{TableAction, TableRow, TableView};
use log::{debug, warn};
use std::sync::Arc;

pub const DEFAULT_PAGINATION: [usize; 7] = [5, 10, 25, 50, 100, 250, 500];

/// Fields the search box looks in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SearchSetting {
    Disabled,
    /// Fields flagged with `scaffold.search`
    #[default]
    Auto,
    Fields(Vec<String>),
}

/// Order methods offered by the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OrderSetting {
    Disabled,
    /// Property fields flagged with `scaffold.order`
    #[default]
    Auto,
    Fields(Vec<String>),
    Custom(Vec<OrderMethod>),
}

/// Named pair of order fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderMethod {
    pub label: String,
    pub asc: String,
    pub desc: String,
}

impl OrderMethod {
    pub fn new(label: impl Into<String>, asc: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            asc: asc.into(),
            desc: desc.into(),
        }
    }

    fn for_field(label: String, field: &str) -> Self {
        Self::new(label, format!("{{{}}} ASC", field), format!("{{{}}} DESC", field))
    }

    pub fn fragment(&self, direction: Direction) -> &str {
        match direction {
            Direction::Asc => &self.asc,
            Direction::Desc => &self.desc,
        }
    }
}

/// Label of a field in order method lists: the translated `label.name`
/// option or the capitalised field name.
pub fn field_label(translator: &dyn Translator, field: &ModelField) -> String {
    match field.options.get(option::LABEL_NAME) {
        Some(label) => translator.translate(label),
        None => capitalize(&field.name),
    }
}

pub struct ScaffoldTable {
    model: Arc<dyn Model>,
    query: ModelQuery,
    search_fields: Vec<String>,
    search_query: Option<String>,
    order_methods: Vec<OrderMethod>,
    order_method: Option<String>,
    order_direction: Direction,
    pagination: Vec<usize>,
    rows_per_page: Option<usize>,
    page: usize,
    pages: usize,
    count: usize,
    decorators: Vec<Box<dyn Decorator>>,
    actions: Vec<TableAction>,
}

impl ScaffoldTable {
    pub fn new(
        model: Arc<dyn Model>,
        translator: &dyn Translator,
        locale: Option<&str>,
        search: SearchSetting,
        order: OrderSetting,
    ) -> Result<Self> {
        let mut query = model.create_query(locale);
        if model.meta().is_localized() {
            query.set_fetch_unlocalized(true);
            query.set_add_is_localized_order(true);
        }

        let mut table = Self {
            model,
            query,
            search_fields: Vec::new(),
            search_query: None,
            order_methods: Vec::new(),
            order_method: None,
            order_direction: Direction::Asc,
            pagination: DEFAULT_PAGINATION.to_vec(),
            rows_per_page: None,
            page: 1,
            pages: 1,
            count: 0,
            decorators: Vec::new(),
            actions: Vec::new(),
        };

        table.search_fields = table.resolve_search_fields(search)?;
        table.order_methods = table.resolve_order_methods(translator, order)?;
        table.initialize_order(translator);

        Ok(table)
    }

    fn resolve_search_fields(&self, search: SearchSetting) -> Result<Vec<String>> {
        let meta = self.model.meta();

        match search {
            SearchSetting::Disabled => Ok(Vec::new()),
            SearchSetting::Auto => Ok(meta
                .fields()
                .iter()
                .filter(|field| field.options.get_bool(option::SEARCH))
                .map(|field| field.name.clone())
                .collect()),
            SearchSetting::Fields(fields) => {
                for field in &fields {
                    meta.require_field(field)?;
                }
                Ok(fields)
            }
        }
    }

    fn resolve_order_methods(&self, translator: &dyn Translator, order: OrderSetting) -> Result<Vec<OrderMethod>> {
        let meta = self.model.meta();

        let fields = match order {
            OrderSetting::Disabled => return Ok(Vec::new()),
            OrderSetting::Custom(methods) => return Ok(methods),
            OrderSetting::Auto => meta
                .properties()
                .filter(|field| field.name != PRIMARY_KEY)
                .map(|field| field.name.clone())
                .collect(),
            OrderSetting::Fields(fields) => fields,
        };

        let mut methods = Vec::new();
        for name in fields {
            let field = meta.require_field(&name)?;
            if !field.options.get_bool(option::ORDER) || field.is_relation() {
                continue;
            }

            methods.push(OrderMethod::for_field(field_label(translator, field), &name));
        }

        Ok(methods)
    }

    /// Initial order from the `scaffold.query.order` model option, for
    /// example `{name} DESC`.
    fn initialize_order(&mut self, translator: &dyn Translator) {
        let meta = self.model.meta();
        let Some(order) = meta.option(option::QUERY_ORDER) else {
            return;
        };

        let (name, direction) = match order.trim().split_once(' ') {
            Some((name, direction)) => (name, direction.parse().unwrap_or_default()),
            None => (order.trim(), Direction::Asc),
        };
        let name = name
            .strip_prefix('{')
            .and_then(|n| n.strip_suffix('}'))
            .unwrap_or(name);

        match meta.field(name) {
            Some(field) => {
                self.order_method = Some(field_label(translator, field));
                self.order_direction = direction;
            }
            None => warn!("Initial order field '{}' not found in {}", name, meta.name),
        }
    }

    pub fn model(&self) -> &Arc<dyn Model> {
        &self.model
    }

    pub fn query(&self) -> &ModelQuery {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut ModelQuery {
        &mut self.query
    }

    pub fn has_search(&self) -> bool {
        !self.search_fields.is_empty()
    }

    pub fn search_fields(&self) -> &[String] {
        &self.search_fields
    }

    pub fn search_query(&self) -> Option<&str> {
        self.search_query.as_deref()
    }

    pub fn set_search_query(&mut self, search: Option<String>) {
        self.search_query = search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    }

    pub fn has_order_methods(&self) -> bool {
        !self.order_methods.is_empty()
    }

    pub fn order_methods(&self) -> Vec<&str> {
        self.order_methods.iter().map(|m| m.label.as_str()).collect()
    }

    pub fn order_method(&self) -> Option<&str> {
        self.order_method.as_deref()
    }

    /// Selects an order method by label; unknown labels are ignored.
    pub fn set_order_method(&mut self, label: &str) {
        if self.order_methods.iter().any(|m| m.label == label) {
            self.order_method = Some(label.to_string());
        } else {
            debug!("Ignoring unknown order method '{}'", label);
        }
    }

    pub fn order_direction(&self) -> Direction {
        self.order_direction
    }

    pub fn set_order_direction(&mut self, direction: Direction) {
        self.order_direction = direction;
    }

    pub fn pagination_options(&self) -> &[usize] {
        &self.pagination
    }

    pub fn set_pagination_options(&mut self, options: Vec<usize>) {
        self.pagination = options;
    }

    pub fn rows_per_page(&self) -> Option<usize> {
        self.rows_per_page
    }

    /// Rows per page, `None` or 0 to disable pagination.
    pub fn set_rows_per_page(&mut self, rows: Option<usize>) {
        self.rows_per_page = rows.filter(|rows| *rows > 0);
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Number of rows matching the search, known after processing.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn add_decorator(&mut self, decorator: Box<dyn Decorator>) {
        self.decorators.push(decorator);
    }

    pub fn add_action(&mut self, action: TableAction) {
        self.actions.push(action);
    }

    pub fn has_actions(&self) -> bool {
        !self.actions.is_empty()
    }

    pub fn actions(&self) -> &[TableAction] {
        &self.actions
    }

    fn apply_search(&self, query: &mut ModelQuery) -> Result<()> {
        let Some(search) = &self.search_query else {
            return Ok(());
        };

        if !self.has_search() || self.model.apply_search(query, search)? {
            return Ok(());
        }

        if let Some(condition) = Condition::like_any(&self.search_fields) {
            query.add_parsed_condition(
                condition,
                Parameters::positional(vec![Value::Text(format!("%{}%", search))]),
            );
        }

        Ok(())
    }

    fn apply_order(&self, query: &mut ModelQuery) -> Result<()> {
        let Some(label) = &self.order_method else {
            return Ok(());
        };

        match self.order_methods.iter().find(|m| &m.label == label) {
            Some(method) => {
                query.add_order_by(method.fragment(self.order_direction))?;
            }
            None => warn!("Order method '{}' not found in {}", label, self.model.name()),
        }

        Ok(())
    }

    /// Query with the search and order applied, without pagination.
    pub fn filtered_query(&self) -> Result<ModelQuery> {
        let mut query = self.query.clone();
        self.apply_search(&mut query)?;
        self.apply_order(&mut query)?;

        Ok(query)
    }

    /// Runs the query for the current page and decorates the rows.
    pub fn process(&mut self) -> Result<TableView> {
        let mut query = self.filtered_query()?;

        let entries = match self.rows_per_page {
            Some(rows) => {
                self.count = self.model.count(&query)?;
                self.pages = self.count.div_ceil(rows).max(1);
                if self.page > self.pages {
                    self.page = 1;
                }

                query.set_limit(rows, (self.page - 1) * rows);

                if self.count > 0 {
                    self.model.find(&query)?
                } else {
                    Vec::new()
                }
            }
            None => {
                let entries = self.model.find(&query)?;
                self.count = entries.len();
                self.pages = 1;
                self.page = 1;
                entries
            }
        };

        debug!(
            "Table of {} shows {} of {} row(s), page {}/{}",
            self.model.name(),
            entries.len(),
            self.count,
            self.page,
            self.pages
        );

        let rows = entries
            .iter()
            .map(|entry| self.decorate(entry))
            .collect::<Result<Vec<_>>>()?;

        Ok(TableView {
            rows,
            actions: self.actions.clone(),
            has_search: self.has_search(),
            search_query: self.search_query.clone(),
            order_methods: self.order_methods().into_iter().map(String::from).collect(),
            order_method: self.order_method.clone(),
            order_direction: self.order_direction,
            page: self.page,
            pages: self.pages,
            rows_per_page: self.rows_per_page,
            pagination_options: if self.rows_per_page.is_some() {
                self.pagination.clone()
            } else {
                Vec::new()
            },
            count: self.count,
        })
    }

    /// All entries matching the search in the current order.
    pub fn process_export(&self) -> Result<Vec<Entry>> {
        self.model.find(&self.filtered_query()?)
    }

    fn decorate(&self, entry: &Entry) -> Result<TableRow> {
        let mut row = TableRow::new(entry.id());

        if self.has_actions() {
            OptionDecorator.decorate(entry, &mut row)?;
        }

        for decorator in &self.decorators {
            decorator.decorate(entry, &mut row)?;
        }

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::OrmManager;
    use crate::orm::meta::{ModelMeta, PropertyType};
    use crate::services::MapTranslator;
    use crate::table::decorator::PropertyDecorator;

    fn people() -> Arc<dyn Model> {
        let orm = OrmManager::in_memory(vec![
            ModelMeta::new("Person")
                .with_field(
                    ModelField::property("name", PropertyType::String)
                        .option(option::SEARCH, "1")
                        .option(option::ORDER, "1"),
                )
                .with_field(
                    ModelField::property("city", PropertyType::String)
                        .option(option::SEARCH, "1")
                        .option(option::ORDER, "1")
                        .option(option::LABEL_NAME, "label.city"),
                )
                .with_field(ModelField::property("age", PropertyType::Integer))
                .with_option(option::QUERY_ORDER, "{name} DESC"),
        ])
        .unwrap();

        let model = orm.get_model("Person").unwrap();
        for (name, city) in [("Ann", "Gent"), ("Bob", "Antwerp"), ("Cid", "Brussels"), ("Dirk", "Gentbrugge")] {
            let mut entry = model
                .create_entry()
                .with_field("name", Value::from(name))
                .with_field("city", Value::from(city));
            model.save(&mut entry).unwrap();
        }

        model
    }

    fn table(model: Arc<dyn Model>) -> ScaffoldTable {
        let translator = MapTranslator::new().with("label.city", "Town");
        let mut table = ScaffoldTable::new(model, &translator, None, SearchSetting::Auto, OrderSetting::Auto).unwrap();
        table.add_decorator(Box::new(PropertyDecorator::new("name")));
        table
    }

    fn names(view: &TableView) -> Vec<&str> {
        view.rows.iter().map(|row| row.cells.last().unwrap().value.as_str()).collect()
    }

    #[test]
    fn resolves_search_fields_and_order_methods() {
        let table = table(people());

        assert_eq!(table.search_fields(), ["name", "city"]);
        assert_eq!(table.order_methods(), vec!["Name", "Town"]);
        assert_eq!(table.order_method(), Some("Name"));
        assert_eq!(table.order_direction(), Direction::Desc);
    }

    #[test]
    fn search_matches_any_search_field() {
        let mut table = table(people());
        table.set_search_query(Some("gent".to_string()));
        table.set_order_direction(Direction::Asc);

        let view = table.process().unwrap();
        assert_eq!(names(&view), vec!["Ann", "Dirk"]);
        assert_eq!(view.count, 2);
    }

    #[test]
    fn order_switch_changes_order_not_filter() {
        let mut table = table(people());
        table.set_order_method("Town");
        table.set_order_direction(Direction::Asc);
        assert_eq!(names(&table.process().unwrap()), vec!["Bob", "Cid", "Ann", "Dirk"]);

        table.set_order_method("Unknown");
        assert_eq!(table.order_method(), Some("Town"));
    }

    #[test]
    fn out_of_range_page_resets_to_first() {
        let mut table = table(people());
        table.set_rows_per_page(Some(3));
        table.set_page(2);

        let view = table.process().unwrap();
        assert_eq!(view.pages, 2);
        assert_eq!(names(&view), vec!["Ann"]);

        table.set_page(7);
        let view = table.process().unwrap();
        assert_eq!(view.page, 1);
        assert_eq!(names(&view), vec!["Dirk", "Cid", "Bob"]);
    }

    #[test]
    fn actions_prepend_selection_checkbox() {
        let mut table = table(people());
        table.add_action(TableAction::new("delete", "Delete"));

        let view = table.process().unwrap();
        assert_eq!(view.rows[0].cells.len(), 2);
        assert_eq!(view.rows[0].cells[0].class.as_deref(), Some("option"));
        assert_eq!(table.process_export().unwrap().len(), 4);
    }
}
