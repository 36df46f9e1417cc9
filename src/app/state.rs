use tabula_domain::{FetchRequest, Filter, ForeignTableView, TableContent, TableRegistry};

use crate::connection_state::ConnectionState;
use crate::edit_buffer::EditBuffer;
use crate::error_log::ErrorLog;

#[derive(Debug, Clone)]
pub struct AppState {
    pub connection_state: ConnectionState,
    pub registry: TableRegistry,
    pub table_search: String,
    /// Table most recently requested by the user.
    pub selected_table: Option<String>,
    pub fetching_table: Option<String>,
    pub is_fetching: bool,
    pub content: Option<TableContent>,
    pub filter_draft: Vec<Filter>,
    pub edits: EditBuffer,
    pub foreign_table: Option<ForeignTableView>,
    pub errors: ErrorLog,
    pub page_size: usize,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(page_size: usize) -> Self {
        Self {
            connection_state: ConnectionState::default(),
            registry: TableRegistry::default(),
            table_search: String::new(),
            selected_table: None,
            fetching_table: None,
            is_fetching: false,
            content: None,
            filter_draft: Vec::new(),
            edits: EditBuffer::default(),
            foreign_table: None,
            errors: ErrorLog::default(),
            page_size: page_size.max(1),
            should_quit: false,
        }
    }

    /// Drops everything tied to the connection. Page size survives.
    pub fn reset(&mut self) {
        *self = Self::new(self.page_size);
    }

    pub fn displayed_table(&self) -> Option<&str> {
        self.content.as_ref().map(|c| c.table_name.as_str())
    }

    pub fn is_displayed(&self, table: &str) -> bool {
        self.displayed_table() == Some(table)
    }

    /// Request reproducing what is on screen: same page, order and filters.
    pub fn current_request(&self) -> Option<FetchRequest> {
        self.content.as_ref().map(|content| {
            FetchRequest::new(content.table_name.clone())
                .with_page(content.page)
                .with_order(content.order.clone())
                .with_filters(content.filters.clone(), content.show_filter)
        })
    }

    pub fn total_pages(&self) -> usize {
        self.content
            .as_ref()
            .map_or(1, |c| c.total_pages(self.page_size))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(100)
    }
}
