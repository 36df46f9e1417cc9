//! Executes side effects returned by the reducer.
//!
//! Every effect becomes a task on one [`TaskTracker`]. Fetch effects issue
//! synchronously inside [`EffectRunner::run`], so the fetch cursor follows
//! reducer order even though the tasks themselves run concurrently.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::debug;

use crate::action::Action;
use crate::effect::Effect;
use crate::session::SessionContext;
use crate::tasks;

pub struct EffectRunner {
    session: Arc<SessionContext>,
    tracker: TaskTracker,
}

impl EffectRunner {
    pub fn new(session: Arc<SessionContext>) -> Self {
        Self {
            session,
            tracker: TaskTracker::new(),
        }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            self.run_single(effect);
        }
    }

    fn run_single(&self, effect: Effect) {
        debug!(?effect, "running effect");
        let session = self.session.pinned();
        match effect {
            Effect::LoadTable(request) => {
                self.tracker.spawn(tasks::load_table(session, request));
            }
            Effect::RefreshContent(request) => {
                self.tracker.spawn(tasks::refresh_content(session, request));
            }
            Effect::LoadConstraints { table, structure } => {
                self.tracker
                    .spawn(tasks::load_constraints(session, table, structure));
            }
            Effect::ListTables { auto_select } => {
                self.tracker.spawn(async move {
                    match tasks::list_tables(&session).await {
                        Ok(first) if auto_select && !first.is_empty() => {
                            session.emit(Action::SelectTable(first));
                        }
                        Ok(_) => {}
                        Err(e) => debug!(error = %e, "list_tables task failed"),
                    }
                });
            }
            Effect::ReloadTables { restore } => {
                self.tracker.spawn(async move {
                    if let Err(e) = tasks::reload_all(session, restore).await {
                        debug!(error = %e, "reload_all task failed");
                    }
                });
            }
            Effect::CreateTable { base } => {
                self.tracker.spawn(async move {
                    if let Err(e) = tasks::create_table(&session, &base).await {
                        debug!(error = %e, "create_table task failed");
                    }
                });
            }
            Effect::DropTable { name } => {
                self.tracker.spawn(async move {
                    if let Err(e) = tasks::drop_table(&session, &name).await {
                        debug!(error = %e, "drop_table task failed");
                    }
                });
            }
            Effect::TruncateTable {
                name,
                restart_identity,
            } => {
                self.tracker.spawn(async move {
                    if let Err(e) = tasks::truncate_table(&session, &name, restart_identity).await {
                        debug!(error = %e, "truncate_table task failed");
                    }
                });
            }
            Effect::RenameTable { from, to } => {
                self.tracker.spawn(async move {
                    if let Err(e) = tasks::rename_table(&session, &from, &to).await {
                        debug!(error = %e, "rename_table task failed");
                    }
                });
            }
            Effect::CommitCellEdits(edits) => {
                self.tracker.spawn(async move {
                    if let Err(e) = tasks::commit_cell_edits(&session, edits).await {
                        debug!(error = %e, "commit_cell_edits task failed");
                    }
                });
            }
            Effect::InsertRow { table, values } => {
                self.tracker.spawn(async move {
                    if let Err(e) = tasks::insert_row(&session, &table, &values).await {
                        debug!(error = %e, "insert_row task failed");
                    }
                });
            }
            Effect::DeleteRows { table, keys } => {
                self.tracker.spawn(async move {
                    if let Err(e) = tasks::delete_rows(&session, &table, keys).await {
                        debug!(error = %e, "delete_rows task failed");
                    }
                });
            }
            Effect::AddColumn {
                table,
                name,
                data_type,
            } => {
                self.tracker.spawn(async move {
                    if let Err(e) = tasks::add_column(&session, &table, &name, &data_type).await {
                        debug!(error = %e, "add_column task failed");
                    }
                });
            }
            Effect::DropColumn { table, name } => {
                self.tracker.spawn(async move {
                    if let Err(e) = tasks::drop_column(&session, &table, &name).await {
                        debug!(error = %e, "drop_column task failed");
                    }
                });
            }
            Effect::AddConstraint { table, constraint } => {
                self.tracker.spawn(async move {
                    if let Err(e) = tasks::add_constraint(&session, &table, &constraint).await {
                        debug!(error = %e, "add_constraint task failed");
                    }
                });
            }
            Effect::DropConstraint { table, name } => {
                self.tracker.spawn(async move {
                    if let Err(e) = tasks::drop_constraint(&session, &table, &name).await {
                        debug!(error = %e, "drop_constraint task failed");
                    }
                });
            }
            Effect::OpenForeignTable {
                request,
                first_column,
            } => {
                self.tracker.spawn(async move {
                    if let Err(e) = tasks::open_foreign_table(&session, request, first_column).await
                    {
                        debug!(error = %e, "open_foreign_table task failed");
                    }
                });
            }
            Effect::ResetSession => self.session.end_generation(),
        }
    }

    /// No task is running. Anything a finished task emitted is already queued.
    pub fn is_idle(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Resolves once every task spawned so far has finished.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
