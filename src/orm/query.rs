use crate::core::{Result, Value};
use crate::expression::{Condition, Direction, OrderBy, Parameters};
use crate::orm::entry::Entry;
use std::cmp::Ordering;

/// Description of a model query, executed by `Model::find` and `Model::count`.
#[derive(Debug, Clone, Default)]
pub struct ModelQuery {
    model: String,
    locale: Option<String>,
    fetch_unlocalized: bool,
    add_is_localized_order: bool,
    conditions: Vec<(Condition, Parameters)>,
    order_by: Vec<OrderBy>,
    limit: Option<usize>,
    offset: usize,
}

impl ModelQuery {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn set_locale(&mut self, locale: Option<String>) {
        self.locale = locale;
    }

    pub fn fetch_unlocalized(&self) -> bool {
        self.fetch_unlocalized
    }

    /// Include entries without data in the query locale, filled from another locale.
    pub fn set_fetch_unlocalized(&mut self, fetch: bool) {
        self.fetch_unlocalized = fetch;
    }

    pub fn add_is_localized_order(&self) -> bool {
        self.add_is_localized_order
    }

    /// Sort entries localized in the query locale before the others.
    pub fn set_add_is_localized_order(&mut self, add: bool) {
        self.add_is_localized_order = add;
    }

    /// Parses and adds a condition with positional parameters `%1%`, `%2%`, ...
    pub fn add_condition(&mut self, expression: &str, parameters: Vec<Value>) -> Result<&mut Self> {
        let condition = Condition::parse(expression)?;
        self.conditions.push((condition, Parameters::positional(parameters)));
        Ok(self)
    }

    pub fn add_parsed_condition(&mut self, condition: Condition, parameters: Parameters) -> &mut Self {
        self.conditions.push((condition, parameters));
        self
    }

    pub fn conditions(&self) -> &[(Condition, Parameters)] {
        &self.conditions
    }

    /// Adds the terms of an order fragment like `{name} ASC, {id} DESC`.
    pub fn add_order_by(&mut self, fragment: &str) -> Result<&mut Self> {
        self.order_by.extend(OrderBy::parse_fragment(fragment)?);
        Ok(self)
    }

    pub fn clear_order_by(&mut self) {
        self.order_by.clear();
    }

    pub fn order_by(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn set_limit(&mut self, limit: usize, offset: usize) {
        self.limit = Some(limit);
        self.offset = offset;
    }

    pub fn clear_limit(&mut self) {
        self.limit = None;
        self.offset = 0;
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether the entry satisfies every condition of this query.
    pub fn matches(&self, entry: &Entry) -> Result<bool> {
        for (condition, parameters) in &self.conditions {
            if !condition.evaluate(entry, parameters)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Sorts the entries on the order terms, ties broken by id.
    pub fn sort(&self, entries: &mut [Entry]) {
        let locale = self.locale.as_deref();

        entries.sort_by(|a, b| {
            if self.add_is_localized_order && locale.is_some() {
                let localized_a = a.locale() == locale;
                let localized_b = b.locale() == locale;

                match localized_b.cmp(&localized_a) {
                    Ordering::Equal => {}
                    other => return other,
                }
            }

            for term in &self.order_by {
                let left = a.get(&term.field).map(|v| v.comparable()).unwrap_or_default();
                let right = b.get(&term.field).map(|v| v.comparable()).unwrap_or_default();

                let ordering = compare_for_sort(&left, &right);
                let ordering = match (term.direction, left.is_null() || right.is_null()) {
                    // nulls stay last in both directions
                    (Direction::Desc, false) => ordering.reverse(),
                    _ => ordering,
                };

                if ordering != Ordering::Equal {
                    return ordering;
                }
            }

            a.id().cmp(&b.id())
        });
    }

    /// Slices the sorted entries on the limit and offset.
    pub fn paginate(&self, entries: Vec<Entry>) -> Vec<Entry> {
        let iter = entries.into_iter().skip(self.offset);

        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

fn compare_for_sort(left: &Value, right: &Value) -> Ordering {
    match left.compare(right) {
        Ok(ordering) => ordering,
        Err(_) => left.to_string().cmp(&right.to_string()),
    }
}
