use tabula_domain::{
    ColumnValue, ConstraintDescriptor, ContentPage, ContentPatch, EditId, FetchRequest, Filter,
    ForeignTableView, KeyValue, NewConstraint, SortDirection, SortOrder, TableContent,
    TableRegistry,
};

/// How an incoming content result treats the store's filter state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterUpdate {
    Replace {
        filters: Vec<Filter>,
        show_filter: bool,
    },
    /// Applied only while the filter bar is shown.
    ReplaceIfShown(Vec<Filter>),
    Keep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,

    // Session
    SessionOpened {
        database_name: String,
        auto_select: bool,
    },
    Disconnect,

    // Table list
    ReloadTables,
    SearchTables(String),
    TablesCleared,
    TablesReplaced(TableRegistry),

    // Table content
    SelectTable(String),
    OpenTable(FetchRequest),
    ReloadCurrentTable,
    LoadStructure,
    FetchStarted {
        table: String,
    },
    FetchStopped,
    ContentReplaced {
        content: Box<TableContent>,
        filters: FilterUpdate,
    },
    RowsReplaced {
        table_name: String,
        page: ContentPage,
        order: Vec<SortOrder>,
        page_no: usize,
        filters: FilterUpdate,
    },
    ConstraintsLoaded {
        table: String,
        constraints: Vec<ConstraintDescriptor>,
    },

    // Filter / sort / pagination
    AddFilter(Filter),
    SetFilter {
        index: usize,
        filter: Filter,
    },
    RemoveFilter(usize),
    ToggleFilter,
    ApplyFilters,
    ClearFilter {
        refresh: bool,
    },
    SetSort {
        column: String,
        direction: Option<SortDirection>,
    },
    NextPage,
    PrevPage,
    GoToPage(usize),

    // Cell edits
    StageCellEdit {
        row_index: usize,
        column_key: String,
        value: Option<String>,
    },
    UndoEdit(EditId),
    UndoEdits,
    CommitEdits,
    /// The batch failed as a whole; no cell was written.
    EditsRejected {
        ids: Vec<EditId>,
        error: String,
    },
    ContentPatched {
        table: String,
        patch: ContentPatch,
    },

    // Rows
    InsertRow {
        table: String,
        values: Vec<ColumnValue>,
    },
    /// Inserts a copy of a displayed row, primary key left to its default.
    CloneRow {
        row_index: usize,
    },
    RowInserted {
        table: String,
    },
    DeleteRows {
        table: String,
        keys: Vec<Vec<KeyValue>>,
    },
    /// Row indexes into the displayed page.
    DeleteDisplayedRows(Vec<usize>),

    // Schema changes
    CreateTable {
        base: String,
    },
    TableCreated {
        name: String,
    },
    DropTable(String),
    TableDropped {
        name: String,
    },
    TruncateTable {
        name: String,
        restart_identity: bool,
    },
    TableTruncated {
        name: String,
    },
    RenameTable {
        from: String,
        to: String,
    },
    TableRenamed {
        from: String,
        to: String,
    },
    AddColumn {
        table: String,
        name: String,
        data_type: String,
    },
    DropColumn {
        table: String,
        name: String,
    },
    AddConstraint {
        table: String,
        constraint: NewConstraint,
    },
    DropConstraint {
        table: String,
        name: String,
    },

    // Foreign table peek
    OpenForeignTable {
        table: String,
        column: String,
    },
    ForeignTableLoaded(Box<ForeignTableView>),
    CloseForeignTable,

    // Errors
    ErrorCaught(String),
    CloseErrors,
}

impl Action {
    /// Results reported back by orchestration tasks, as opposed to user intents.
    pub fn is_task_event(&self) -> bool {
        matches!(
            self,
            Self::TablesCleared
                | Self::TablesReplaced(_)
                | Self::FetchStarted { .. }
                | Self::FetchStopped
                | Self::ContentReplaced { .. }
                | Self::RowsReplaced { .. }
                | Self::ConstraintsLoaded { .. }
                | Self::EditsRejected { .. }
                | Self::ContentPatched { .. }
                | Self::RowInserted { .. }
                | Self::TableCreated { .. }
                | Self::TableDropped { .. }
                | Self::TableTruncated { .. }
                | Self::TableRenamed { .. }
                | Self::ForeignTableLoaded(_)
                | Self::ErrorCaught(_)
        )
    }
}
