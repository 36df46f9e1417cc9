pub mod column;
pub mod constraint;
pub mod content;
pub mod edit;
pub mod fetch_request;
pub mod foreign_key;
pub mod index;
pub mod table;
pub mod table_name;

pub use column::ColumnDescriptor;
pub use constraint::{ConstraintDescriptor, ConstraintKind, NewConstraint};
pub use content::{ContentPage, ContentPatch, ForeignTableView, Row, TableContent};
pub use edit::{CellEdit, ColumnValue, EditId, KeyValue, UpdateResult};
pub use fetch_request::{
    ContentQuery, FetchRequest, Filter, FilterPredicate, SortDirection, SortOrder,
};
pub use foreign_key::ForeignKey;
pub use index::{Index, IndexMethod};
pub use table::{TableIdentity, TableRegistry, TableSummary};
pub use table_name::{MAX_IDENTIFIER_BYTES, TableName, TableNameError};
