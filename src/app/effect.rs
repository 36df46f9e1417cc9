//! Side effects returned by the reducer, executed by EffectRunner.

use tabula_domain::{CellEdit, ColumnDescriptor, ColumnValue, FetchRequest, KeyValue, NewConstraint};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Full fetch chain: indexes, primary keys, structure, content.
    LoadTable(FetchRequest),
    /// Content only, for the displayed table.
    RefreshContent(FetchRequest),
    LoadConstraints {
        table: String,
        structure: Vec<ColumnDescriptor>,
    },
    ListTables {
        auto_select: bool,
    },
    /// Clears the registry, lists again and reopens `restore` if it still exists.
    ReloadTables {
        restore: Option<FetchRequest>,
    },
    CreateTable {
        base: String,
    },
    DropTable {
        name: String,
    },
    TruncateTable {
        name: String,
        restart_identity: bool,
    },
    RenameTable {
        from: String,
        to: String,
    },
    CommitCellEdits(Vec<CellEdit>),
    InsertRow {
        table: String,
        values: Vec<ColumnValue>,
    },
    DeleteRows {
        table: String,
        keys: Vec<Vec<KeyValue>>,
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
    OpenForeignTable {
        request: FetchRequest,
        first_column: String,
    },
    /// Ends the session generation: later task events are dropped.
    ResetSession,
}
