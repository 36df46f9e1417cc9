//! Schema and data changes. Each one commits through the gateway, then emits
//! a targeted patch instead of reloading the table.

use tabula_domain::{
    CellEdit, ColumnValue, ContentPatch, KeyValue, NewConstraint, TableName, TableNameError,
    UpdateResult,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::action::Action;
use crate::ports::GatewayError;
use crate::session::SessionContext;

fn report(session: &SessionContext, operation: &'static str, error: GatewayError) -> GatewayError {
    warn!(operation, error = %error, "mutation failed");
    session.emit(Action::ErrorCaught(error.to_string()));
    error
}

fn patch(session: &SessionContext, table: &str, patch: ContentPatch) {
    session.emit(Action::ContentPatched {
        table: table.to_string(),
        patch,
    });
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenameTableError {
    #[error("Invalid table name: {0}")]
    InvalidName(#[from] TableNameError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Sends the whole batch in one call. On rejection the edits stay staged.
#[tracing::instrument(skip_all, fields(edits = edits.len()))]
pub async fn commit_cell_edits(
    session: &SessionContext,
    edits: Vec<CellEdit>,
) -> Result<Vec<UpdateResult>, GatewayError> {
    let Some(table) = edits.first().map(|e| e.table_name.clone()) else {
        return Ok(Vec::new());
    };
    let results = match session.call(session.gateway().update_cells(&edits)).await {
        Ok(results) => results,
        Err(e) => {
            session.emit(Action::EditsRejected {
                ids: edits.iter().map(|edit| edit.id).collect(),
                error: e.to_string(),
            });
            return Err(report(session, "update_cells", e));
        }
    };

    let failed = results.iter().filter(|r| r.is_error()).count();
    info!(table = %table, updated = results.len() - failed, failed, "cell edits committed");
    patch(session, &table, ContentPatch::Cells(results.clone()));
    Ok(results)
}

#[tracing::instrument(skip(session))]
pub async fn insert_row(
    session: &SessionContext,
    table: &str,
    values: &[ColumnValue],
) -> Result<(), GatewayError> {
    session
        .call(session.gateway().insert_row(table, values))
        .await
        .map_err(|e| report(session, "insert_row", e))?;
    info!("row inserted");
    session.emit(Action::RowInserted {
        table: table.to_string(),
    });
    Ok(())
}

#[tracing::instrument(skip(session, keys), fields(keys = keys.len()))]
pub async fn delete_rows(
    session: &SessionContext,
    table: &str,
    keys: Vec<Vec<KeyValue>>,
) -> Result<u64, GatewayError> {
    if keys.is_empty() {
        return Ok(0);
    }
    let deleted = session
        .call(session.gateway().delete_rows(table, &keys))
        .await
        .map_err(|e| report(session, "delete_rows", e))?;
    info!(deleted, "rows deleted");
    patch(session, table, ContentPatch::RowsDeleted(keys));
    Ok(deleted)
}

#[tracing::instrument(skip(session))]
pub async fn rename_table(
    session: &SessionContext,
    from: &str,
    to: &str,
) -> Result<String, RenameTableError> {
    match run_rename(session, from, to).await {
        Ok(name) => {
            info!(name = %name, "table renamed");
            session.emit(Action::TableRenamed {
                from: from.to_string(),
                to: name.clone(),
            });
            Ok(name)
        }
        Err(e) => {
            warn!(error = %e, "table rename failed");
            session.emit(Action::ErrorCaught(e.to_string()));
            Err(e)
        }
    }
}

async fn run_rename(
    session: &SessionContext,
    from: &str,
    to: &str,
) -> Result<String, RenameTableError> {
    let to = TableName::new(to)?;
    session
        .call(session.gateway().rename_table(from, to.as_str()))
        .await?;
    Ok(to.as_str().to_string())
}

#[tracing::instrument(skip(session))]
pub async fn add_column(
    session: &SessionContext,
    table: &str,
    name: &str,
    data_type: &str,
) -> Result<(), GatewayError> {
    let column = session
        .call(session.gateway().add_column(table, name, data_type))
        .await
        .map_err(|e| report(session, "add_column", e))?;
    patch(session, table, ContentPatch::ColumnAdded(column));
    Ok(())
}

#[tracing::instrument(skip(session))]
pub async fn drop_column(session: &SessionContext, table: &str, name: &str) -> Result<(), GatewayError> {
    session
        .call(session.gateway().drop_column(table, name))
        .await
        .map_err(|e| report(session, "drop_column", e))?;
    patch(
        session,
        table,
        ContentPatch::ColumnDropped {
            name: name.to_string(),
        },
    );
    Ok(())
}

#[tracing::instrument(skip(session))]
pub async fn add_constraint(
    session: &SessionContext,
    table: &str,
    constraint: &NewConstraint,
) -> Result<(), GatewayError> {
    let added = session
        .call(session.gateway().add_constraint(table, constraint))
        .await
        .map_err(|e| report(session, "add_constraint", e))?;
    patch(session, table, ContentPatch::ConstraintAdded(added));
    Ok(())
}

#[tracing::instrument(skip(session))]
pub async fn drop_constraint(
    session: &SessionContext,
    table: &str,
    name: &str,
) -> Result<(), GatewayError> {
    session
        .call(session.gateway().drop_constraint(table, name))
        .await
        .map_err(|e| report(session, "drop_constraint", e))?;
    patch(
        session,
        table,
        ContentPatch::ConstraintDropped {
            name: name.to_string(),
        },
    );
    Ok(())
}

#[tracing::instrument(skip(session))]
pub async fn drop_table(session: &SessionContext, name: &str) -> Result<(), GatewayError> {
    session
        .call(session.gateway().drop_table(name))
        .await
        .map_err(|e| report(session, "drop_table", e))?;
    info!("table dropped");
    session.emit(Action::TableDropped {
        name: name.to_string(),
    });
    Ok(())
}

#[tracing::instrument(skip(session))]
pub async fn truncate_table(
    session: &SessionContext,
    name: &str,
    restart_identity: bool,
) -> Result<(), GatewayError> {
    session
        .call(session.gateway().truncate_table(name, restart_identity))
        .await
        .map_err(|e| report(session, "truncate_table", e))?;
    info!("table truncated");
    session.emit(Action::TableTruncated {
        name: name.to_string(),
    });
    Ok(())
}
