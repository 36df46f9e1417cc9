use std::future::Future;
use std::sync::Arc;

use tabula_domain::{FetchRequest, TableContent};
use tracing::{debug, info, warn};

use crate::action::{Action, FilterUpdate};
use crate::coordinator::FetchToken;
use crate::ports::GatewayError;
use crate::session::SessionContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Completed,
    /// Another fetch took over the cursor; nothing was emitted after that.
    Interrupted,
    Failed(GatewayError),
}

/// Issues a full load of `request.table_name`.
///
/// The cursor moves and `FetchStarted` is emitted before this returns, so a
/// later call always supersedes an earlier one regardless of when the
/// returned futures are polled.
pub fn load_table(
    session: Arc<SessionContext>,
    request: FetchRequest,
) -> impl Future<Output = LoadOutcome> + Send + 'static {
    let token = session.coordinator().begin_fetch(&request.table_name);
    session.emit(Action::FetchStarted {
        table: request.table_name.clone(),
    });
    async move { run_chain(&session, token, request).await }
}

#[tracing::instrument(skip_all, fields(table = %request.table_name, page = request.page))]
async fn run_chain(
    session: &SessionContext,
    token: FetchToken,
    mut request: FetchRequest,
) -> LoadOutcome {
    let gateway = session.gateway();
    let table = request.table_name.clone();

    match session.call(gateway.get_table_indexes(&table)).await {
        Ok(indexes) => debug!(count = indexes.len(), "indexes ready"),
        Err(e) => return fail(session, &token, "indexes", e),
    }

    let primary_keys = match session.call(gateway.get_primary_keys(&table)).await {
        Ok(keys) => keys,
        Err(e) => {
            warn!(error = %e, "primary key lookup failed, loading without stable order");
            Vec::new()
        }
    };

    if !session.coordinator().is_current(&token) {
        debug!("superseded after primary keys");
        return LoadOutcome::Interrupted;
    }

    if let Some(first) = primary_keys.first()
        && request.append_stable_order(first)
    {
        debug!(column = %first, "appended primary key order");
    }

    let structure = match session.call(gateway.get_table_structure(&table)).await {
        Ok(structure) => structure,
        Err(e) => return fail(session, &token, "structure", e),
    };

    if !session.coordinator().is_current(&token) {
        debug!("superseded after structure");
        return LoadOutcome::Interrupted;
    }

    let query = request.content_query(session.settings().page_size);
    let page = match session.call(gateway.get_table_content(&query)).await {
        Ok(page) => page,
        Err(e) => return fail(session, &token, "content", e),
    };

    let filters = match &request.filters {
        Some(filters) => FilterUpdate::Replace {
            filters: filters.clone(),
            show_filter: request.show_filter,
        },
        None => FilterUpdate::Keep,
    };
    let row_count = page.rows.len();
    let content = TableContent {
        table_name: table,
        columns: page.columns,
        rows: page.rows,
        total_count: page.total_count,
        structure,
        primary_keys,
        constraints: Vec::new(),
        filters: request.filters.unwrap_or_default(),
        show_filter: request.show_filter,
        order: request.order,
        page: query.page,
    };

    let emitted = session.emit_if_current(
        &token,
        [
            Action::ContentReplaced {
                content: Box::new(content),
                filters,
            },
            Action::FetchStopped,
        ],
    );

    if emitted {
        info!(rows = row_count, "table loaded");
        LoadOutcome::Completed
    } else {
        debug!("superseded before emit, dropping content");
        LoadOutcome::Interrupted
    }
}

/// Reports `error` if the chain is still current; stale failures are dropped.
pub(crate) fn fail(
    session: &SessionContext,
    token: &FetchToken,
    stage: &'static str,
    error: GatewayError,
) -> LoadOutcome {
    let reported = session.emit_if_current(
        token,
        [Action::ErrorCaught(error.to_string()), Action::FetchStopped],
    );
    if reported {
        warn!(stage, error = %error, "fetch failed");
        LoadOutcome::Failed(error)
    } else {
        debug!(stage, error = %error, "dropping failure of superseded fetch");
        LoadOutcome::Interrupted
    }
}
