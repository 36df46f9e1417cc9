use std::future::Future;
use std::sync::Arc;

use tabula_domain::ColumnDescriptor;
use tracing::{Instrument, debug};

use super::load_table::{LoadOutcome, fail};
use crate::action::Action;
use crate::session::SessionContext;

/// Loads table constraints plus the NOT NULL constraints implied by the
/// column structure, and emits them as one list.
pub fn load_constraints(
    session: Arc<SessionContext>,
    table: String,
    structure: Vec<ColumnDescriptor>,
) -> impl Future<Output = LoadOutcome> + Send + 'static {
    let token = session.coordinator().begin_fetch(&table);
    session.emit(Action::FetchStarted {
        table: table.clone(),
    });
    let span = tracing::info_span!("load_constraints", table = %table);
    async move {
        let gateway = session.gateway();
        let mut constraints = match session.call(gateway.get_table_constraints(&table)).await {
            Ok(constraints) => constraints,
            Err(e) => return fail(&session, &token, "constraints", e),
        };

        let oids = match session
            .call(gateway.get_table_oids(std::slice::from_ref(&table)))
            .await
        {
            Ok(oids) => oids,
            Err(e) => return fail(&session, &token, "oid", e),
        };

        match oids.iter().find(|s| s.name == table).and_then(|s| s.oid) {
            Some(oid) => {
                match session
                    .call(gateway.get_not_null_constraints(&structure, oid))
                    .await
                {
                    Ok(not_null) => constraints.extend(not_null),
                    Err(e) => return fail(&session, &token, "not_null", e),
                }
            }
            None => debug!("no oid resolved, skipping not-null constraints"),
        }

        let emitted = session.emit_if_current(
            &token,
            [
                Action::ConstraintsLoaded { table, constraints },
                Action::FetchStopped,
            ],
        );
        if emitted {
            LoadOutcome::Completed
        } else {
            debug!("superseded before emit, dropping constraints");
            LoadOutcome::Interrupted
        }
    }
    .instrument(span)
}
