use std::future::Future;
use std::sync::Arc;

use tabula_domain::FetchRequest;
use tracing::{Instrument, debug};

use super::load_table::{LoadOutcome, fail};
use crate::action::{Action, FilterUpdate};
use crate::session::SessionContext;

/// Re-reads the rows of the displayed table for a new page, order or filter
/// set. Structure, primary keys and constraints in the store are left alone.
pub fn refresh_content(
    session: Arc<SessionContext>,
    request: FetchRequest,
) -> impl Future<Output = LoadOutcome> + Send + 'static {
    let token = session.coordinator().begin_fetch(&request.table_name);
    session.emit(Action::FetchStarted {
        table: request.table_name.clone(),
    });
    let span = tracing::info_span!(
        "refresh_content",
        table = %request.table_name,
        page = request.page
    );
    async move {
        let query = request.content_query(session.settings().page_size);

        let page = match session
            .call(session.gateway().get_table_content(&query))
            .await
        {
            Ok(page) => page,
            Err(e) => return fail(&session, &token, "content", e),
        };

        let filters = match request.filters {
            Some(filters) => FilterUpdate::ReplaceIfShown(filters),
            None => FilterUpdate::Keep,
        };

        let emitted = session.emit_if_current(
            &token,
            [
                Action::RowsReplaced {
                    table_name: request.table_name,
                    page,
                    order: request.order,
                    page_no: query.page,
                    filters,
                },
                Action::FetchStopped,
            ],
        );

        if emitted {
            LoadOutcome::Completed
        } else {
            debug!("superseded before emit, dropping rows");
            LoadOutcome::Interrupted
        }
    }
    .instrument(span)
}
