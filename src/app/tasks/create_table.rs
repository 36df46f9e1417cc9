//! Creates a table under a free name derived from a base name.
//!
//! Candidates are tried as `base`, `base0`, `base1`, ... A candidate the
//! database reports as already existing moves on to the next suffix; any
//! other failure ends the attempt.

use tabula_domain::{TableName, TableNameError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::ports::GatewayError;
use crate::session::SessionContext;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateTableError {
    #[error("Failed to create table {name}: {source}")]
    CreationFailed { name: String, source: GatewayError },
    #[error("No free table name for {base} after {attempts} attempts")]
    RetriesExhausted { base: String, attempts: u32 },
    #[error("Invalid table name: {0}")]
    InvalidName(#[from] TableNameError),
    #[error("Table {0} is already being created")]
    AlreadyInProgress(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CreationStep {
    /// `None` proposes the bare base name.
    Proposing { attempt: Option<u32> },
    RejectedRetry { next: u32 },
    Accepted(TableName),
}

#[tracing::instrument(skip(session))]
pub async fn create_table(session: &SessionContext, base: &str) -> Result<String, CreateTableError> {
    let result = run(session, base).await;
    if let Err(e) = &result {
        warn!(error = %e, "table creation failed");
        session.emit(Action::ErrorCaught(e.to_string()));
    }
    result
}

async fn run(session: &SessionContext, base: &str) -> Result<String, CreateTableError> {
    let base = TableName::new(base)?;
    let Some(_claim) = session.begin_creation(base.as_str()) else {
        return Err(CreateTableError::AlreadyInProgress(base.to_string()));
    };
    let max_attempts = session.settings().max_create_attempts;

    let mut proposals = 0;
    let mut step = CreationStep::Proposing { attempt: None };
    loop {
        step = match step {
            CreationStep::Proposing { attempt } => {
                if proposals >= max_attempts {
                    return Err(CreateTableError::RetriesExhausted {
                        base: base.to_string(),
                        attempts: proposals,
                    });
                }
                proposals += 1;

                let candidate = base.with_suffix(attempt)?;
                match session
                    .call(session.gateway().create_table(candidate.as_str()))
                    .await
                {
                    Ok(()) => CreationStep::Accepted(candidate),
                    Err(e) if e.is_name_collision() => {
                        debug!(candidate = %candidate, "name taken");
                        CreationStep::RejectedRetry {
                            next: attempt.map_or(0, |n| n + 1),
                        }
                    }
                    Err(source) => {
                        return Err(CreateTableError::CreationFailed {
                            name: candidate.to_string(),
                            source,
                        });
                    }
                }
            }
            CreationStep::RejectedRetry { next } => CreationStep::Proposing {
                attempt: Some(next),
            },
            CreationStep::Accepted(name) => {
                info!(name = %name, attempts = proposals, "table created");
                session.emit(Action::TableCreated {
                    name: name.to_string(),
                });
                return Ok(name.to_string());
            }
        };
    }
}
