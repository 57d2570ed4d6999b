use crate::expression::Direction;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableCell {
    /// Cell markup
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

impl TableCell {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            class: None,
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub class: Vec<String>,
    pub cells: Vec<TableCell>,
}

impl TableRow {
    pub fn new(id: Option<i64>) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !self.class.contains(&class) {
            self.class.push(class);
        }
    }

    pub fn push(&mut self, cell: TableCell) {
        self.cells.push(cell);
    }
}

/// Action executed on the selected rows of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableAction {
    pub name: String,
    pub label: String,
    /// Endpoint receiving the selected ids
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<String>,
}

impl TableAction {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            url: None,
            confirmation: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_confirmation(mut self, confirmation: impl Into<String>) -> Self {
        self.confirmation = Some(confirmation.into());
        self
    }
}

/// Rendered table with the state of its search, order and pagination.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableView {
    pub rows: Vec<TableRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<TableAction>,
    pub has_search: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_methods: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_method: Option<String>,
    pub order_direction: Direction,
    pub page: usize,
    pub pages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_per_page: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pagination_options: Vec<usize>,
    /// Total number of rows matching the search
    pub count: usize,
}

impl TableView {
    /// Table without search, order or pagination.
    pub fn from_rows(rows: Vec<TableRow>) -> Self {
        let count = rows.len();

        Self {
            rows,
            page: 1,
            pages: 1,
            count,
            ..Self::default()
        }
    }
}
