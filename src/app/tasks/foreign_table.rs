use tabula_domain::{FetchRequest, ForeignTableView};
use tracing::info;

use crate::action::Action;
use crate::ports::GatewayError;
use crate::session::SessionContext;

/// Loads a read-only view of a referenced table. Leaves the fetch cursor
/// alone since the main content is not replaced.
#[tracing::instrument(skip_all, fields(table = %request.table_name))]
pub async fn open_foreign_table(
    session: &SessionContext,
    request: FetchRequest,
    first_column: String,
) -> Result<(), GatewayError> {
    let result = fetch_view(session, request, first_column).await;
    match result {
        Ok(view) => {
            info!(rows = view.rows.len(), "foreign table loaded");
            session.emit(Action::ForeignTableLoaded(Box::new(view)));
            Ok(())
        }
        Err(e) => {
            session.emit(Action::ErrorCaught(e.to_string()));
            Err(e)
        }
    }
}

async fn fetch_view(
    session: &SessionContext,
    request: FetchRequest,
    first_column: String,
) -> Result<ForeignTableView, GatewayError> {
    let gateway = session.gateway();
    let structure = session
        .call(gateway.get_table_structure(&request.table_name))
        .await?;

    let query = request
        .with_order(Vec::new())
        .content_query(session.settings().page_size);
    let page = session.call(gateway.get_table_content(&query)).await?;

    Ok(ForeignTableView {
        table_name: query.table_name,
        first_column,
        structure,
        columns: page.columns,
        rows: page.rows,
        total_count: page.total_count,
    })
}
