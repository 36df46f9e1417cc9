use std::sync::Arc;

use tabula_domain::{FetchRequest, TableRegistry, TableSummary};
use tracing::{debug, info, warn};

use super::load_table::{LoadOutcome, load_table};
use crate::action::Action;
use crate::ports::GatewayError;
use crate::session::SessionContext;

/// Rebuilds the table registry. Returns the first table name, or an empty
/// string when the database has no tables.
#[tracing::instrument(skip_all)]
pub async fn list_tables(session: &SessionContext) -> Result<String, GatewayError> {
    let registry = sync_registry(session).await?;
    Ok(registry.first_name().unwrap_or_default().to_string())
}

/// Clears the registry, lists tables again and, when `restore` names a table
/// that still exists, reloads it with its previous page, order and filters.
#[tracing::instrument(skip_all, fields(restore = restore.as_ref().map(|r| r.table_name.as_str())))]
pub async fn reload_all(
    session: Arc<SessionContext>,
    restore: Option<FetchRequest>,
) -> Result<Option<LoadOutcome>, GatewayError> {
    session.emit(Action::TablesCleared);
    let registry = sync_registry(&session).await?;

    let Some(request) = restore else {
        return Ok(None);
    };
    if !registry.contains(&request.table_name) {
        debug!(table = %request.table_name, "previous table is gone, not restoring");
        return Ok(None);
    }
    Ok(Some(load_table(session, request).await))
}

async fn sync_registry(session: &SessionContext) -> Result<TableRegistry, GatewayError> {
    match fetch_registry(session).await {
        Ok(registry) => {
            info!(tables = registry.len(), "table list synchronized");
            if registry.is_empty() {
                session.emit(Action::FetchStopped);
            }
            session.emit(Action::TablesReplaced(registry.clone()));
            Ok(registry)
        }
        Err(e) => {
            warn!(error = %e, "table list failed");
            session.emit(Action::ErrorCaught(e.to_string()));
            Err(e)
        }
    }
}

async fn fetch_registry(session: &SessionContext) -> Result<TableRegistry, GatewayError> {
    let gateway = session.gateway();
    let names = session.call(gateway.get_tables()).await?;
    if names.is_empty() {
        return Ok(TableRegistry::default());
    }

    let resolved = session.call(gateway.get_table_oids(&names)).await?;
    let summaries = names
        .iter()
        .map(|name| {
            resolved
                .iter()
                .find(|s| &s.name == name)
                .cloned()
                .unwrap_or_else(|| TableSummary::new(name.clone()))
        })
        .collect();

    let annotated = session.call(gateway.get_foreign_keys(summaries)).await?;
    Ok(TableRegistry::new(annotated))
}
