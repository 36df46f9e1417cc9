use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOrder {
    pub column: String,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, SortDirection::Asc)
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, SortDirection::Desc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum FilterPredicate {
    Equals(String),
    NotEquals(String),
    /// Case-insensitive substring match
    Contains(String),
    GreaterThan(String),
    LessThan(String),
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub predicate: FilterPredicate,
}

impl Filter {
    pub fn new(column: impl Into<String>, predicate: FilterPredicate) -> Self {
        Self {
            column: column.into(),
            predicate,
        }
    }

    /// A draft filter without a column cannot be sent to the database.
    pub fn is_complete(&self) -> bool {
        !self.column.trim().is_empty()
    }
}

/// One fetch issued against a table. Built fresh per fetch and never mutated
/// after it has been handed to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub table_name: String,
    /// 1-based
    pub page: usize,
    pub order: Vec<SortOrder>,
    /// `None` means the caller did not supply filters; the store keeps its own.
    pub filters: Option<Vec<Filter>>,
    pub show_filter: bool,
}

impl FetchRequest {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            page: 1,
            order: Vec::new(),
            filters: None,
            show_filter: false,
        }
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_order(mut self, order: Vec<SortOrder>) -> Self {
        self.order = order;
        self
    }

    pub fn with_filters(mut self, filters: Vec<Filter>, show_filter: bool) -> Self {
        self.filters = Some(filters);
        self.show_filter = show_filter;
        self
    }

    pub fn has_order_on(&self, column: &str) -> bool {
        self.order.iter().any(|o| o.column == column)
    }

    /// Appends an ascending sort on `column` unless the order already covers it.
    /// Returns whether an entry was appended.
    pub fn append_stable_order(&mut self, column: &str) -> bool {
        if self.has_order_on(column) {
            return false;
        }
        self.order.push(SortOrder::asc(column));
        true
    }

    pub fn content_query(&self, page_size: usize) -> ContentQuery {
        ContentQuery {
            table_name: self.table_name.clone(),
            page: self.page.max(1),
            page_size,
            order: self.order.clone(),
            filters: self.filters.clone().unwrap_or_default(),
        }
    }
}

const MAX_OFFSET: usize = i64::MAX as usize;

/// What the gateway receives for a content page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentQuery {
    pub table_name: String,
    pub page: usize,
    pub page_size: usize,
    pub order: Vec<SortOrder>,
    pub filters: Vec<Filter>,
}

impl ContentQuery {
    /// Row offset of the page, capped at the largest OFFSET the database accepts.
    pub fn offset(&self) -> usize {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.page_size)
            .min(MAX_OFFSET)
    }
}
