use async_trait::async_trait;
use thiserror::Error;

use tabula_domain::{
    CellEdit, ColumnDescriptor, ColumnValue, ConstraintDescriptor, ContentPage, ContentQuery,
    Index, KeyValue, NewConstraint, TableSummary, UpdateResult,
};

/// Substring the database reports when a relation name is taken.
pub const NAME_COLLISION_MARKER: &str = "already exists";

/// Database access used by every orchestration task.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DatabaseGateway: Send + Sync {
    async fn get_table_indexes(&self, table: &str) -> Result<Vec<Index>, GatewayError>;

    /// Primary-key columns in key order.
    async fn get_primary_keys(&self, table: &str) -> Result<Vec<String>, GatewayError>;

    async fn get_table_structure(&self, table: &str)
    -> Result<Vec<ColumnDescriptor>, GatewayError>;

    async fn get_table_content(&self, query: &ContentQuery) -> Result<ContentPage, GatewayError>;

    async fn get_tables(&self) -> Result<Vec<String>, GatewayError>;

    async fn get_table_oids(&self, tables: &[String]) -> Result<Vec<TableSummary>, GatewayError>;

    /// Annotates each summary with its outgoing foreign keys.
    async fn get_foreign_keys(
        &self,
        tables: Vec<TableSummary>,
    ) -> Result<Vec<TableSummary>, GatewayError>;

    async fn get_table_constraints(
        &self,
        table: &str,
    ) -> Result<Vec<ConstraintDescriptor>, GatewayError>;

    async fn get_not_null_constraints(
        &self,
        structure: &[ColumnDescriptor],
        oid: u32,
    ) -> Result<Vec<ConstraintDescriptor>, GatewayError>;

    async fn create_table(&self, name: &str) -> Result<(), GatewayError>;

    async fn drop_table(&self, name: &str) -> Result<(), GatewayError>;

    async fn truncate_table(&self, name: &str, restart_identity: bool) -> Result<(), GatewayError>;

    async fn rename_table(&self, from: &str, to: &str) -> Result<(), GatewayError>;

    async fn update_cells(&self, edits: &[CellEdit]) -> Result<Vec<UpdateResult>, GatewayError>;

    /// Inserts one row. Columns not listed take their defaults.
    async fn insert_row(&self, table: &str, values: &[ColumnValue]) -> Result<(), GatewayError>;

    /// Deletes rows by primary key. Returns how many rows were removed.
    async fn delete_rows(&self, table: &str, keys: &[Vec<KeyValue>]) -> Result<u64, GatewayError>;

    async fn add_column(
        &self,
        table: &str,
        name: &str,
        data_type: &str,
    ) -> Result<ColumnDescriptor, GatewayError>;

    async fn drop_column(&self, table: &str, name: &str) -> Result<(), GatewayError>;

    async fn add_constraint(
        &self,
        table: &str,
        constraint: &NewConstraint,
    ) -> Result<ConstraintDescriptor, GatewayError>;

    async fn drop_constraint(&self, table: &str, name: &str) -> Result<(), GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Command not found: {0}")]
    CommandNotFound(String),
    #[error("Operation timed out")]
    Timeout,
}

impl GatewayError {
    pub fn is_name_collision(&self) -> bool {
        match self {
            Self::ConnectionFailed(msg) | Self::QueryFailed(msg) => {
                msg.contains(NAME_COLLISION_MARKER)
            }
            _ => false,
        }
    }
}
