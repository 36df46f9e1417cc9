//! Async orchestration tasks. Each reports back to the store only through
//! the session's action channel.

pub mod create_table;
pub mod foreign_table;
pub mod list_tables;
pub mod load_table;
pub mod mutations;
pub mod refresh_content;
pub mod structure;

pub use create_table::{CreateTableError, create_table};
pub use foreign_table::open_foreign_table;
pub use list_tables::{list_tables, reload_all};
pub use load_table::{LoadOutcome, load_table};
pub use mutations::{
    RenameTableError, add_column, add_constraint, commit_cell_edits, delete_rows, drop_column,
    drop_constraint, drop_table, insert_row, rename_table, truncate_table,
};
pub use refresh_content::refresh_content;
pub use structure::load_constraints;
