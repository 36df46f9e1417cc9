//! Command-line surface: argument parsing and one-shot command execution
//! against the store.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, bail, eyre};
use tokio::sync::mpsc;
use tracing::debug;

use crate::app::action::Action;
use crate::app::effect_runner::EffectRunner;
use crate::app::event_loop::{dispatch, run_until_idle};
use crate::app::state::AppState;
use crate::domain::{
    ColumnValue, FetchRequest, Filter, FilterPredicate, KeyValue, NewConstraint, SortDirection,
    SortOrder,
};
use crate::output;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    pub dsn: String,

    /// Config file (defaults to <config dir>/tabula/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List tables in the public schema
    Tables {
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one page of a table
    Show {
        table: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// `column` or `column:desc`, repeatable
        #[arg(long, value_parser = parse_sort)]
        sort: Vec<SortOrder>,
        /// `col=v`, `col!=v`, `col~v`, `col>v`, `col<v`, `col:null`, `col:notnull`
        #[arg(long, value_parser = parse_filter)]
        filter: Vec<Filter>,
        #[arg(long)]
        json: bool,
    },
    /// Columns and constraints of a table
    Structure { table: String },
    /// Rows of a referenced table
    Peek { table: String, column: String },
    /// Create a table under a free name derived from `base`
    Create { base: Option<String> },
    Drop {
        table: String,
    },
    Truncate {
        table: String,
        #[arg(long)]
        restart_identity: bool,
    },
    Rename {
        table: String,
        new_name: String,
    },
    /// Insert a row; unset columns take their defaults
    Insert {
        table: String,
        /// `col=value` or `col:null`, repeatable
        #[arg(long = "set", value_parser = parse_assignment)]
        values: Vec<ColumnValue>,
    },
    /// Insert a copy of the row with the given first primary-key value
    Clone {
        table: String,
        id: String,
    },
    /// Delete rows by first primary-key value
    Delete {
        table: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Update one cell, addressing the row by its first primary-key column
    Update {
        table: String,
        id: String,
        column: String,
        value: Option<String>,
        /// Store NULL instead of a value
        #[arg(long, conflicts_with = "value")]
        null: bool,
    },
    AddColumn {
        table: String,
        name: String,
        data_type: String,
    },
    DropColumn {
        table: String,
        name: String,
    },
    AddConstraint {
        table: String,
        column: String,
        #[arg(long, value_enum)]
        kind: ConstraintArg,
        /// CHECK expression
        #[arg(long)]
        expression: Option<String>,
        /// `table.column` for foreign keys
        #[arg(long)]
        references: Option<String>,
    },
    DropConstraint {
        table: String,
        name: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintArg {
    PrimaryKey,
    Unique,
    NotNull,
    Check,
    ForeignKey,
}

pub fn parse_sort(raw: &str) -> Result<SortOrder, String> {
    let (column, direction) = match raw.rsplit_once(':') {
        Some((column, dir)) => {
            let direction = match dir.to_ascii_lowercase().as_str() {
                "asc" => SortDirection::Asc,
                "desc" => SortDirection::Desc,
                other => return Err(format!("unknown sort direction: {}", other)),
            };
            (column, direction)
        }
        None => (raw, SortDirection::Asc),
    };
    if column.trim().is_empty() {
        return Err("sort column is empty".to_string());
    }
    Ok(SortOrder::new(column.trim(), direction))
}

pub fn parse_filter(raw: &str) -> Result<Filter, String> {
    if let Some(column) = raw.strip_suffix(":notnull") {
        return filter(column, FilterPredicate::IsNotNull);
    }
    if let Some(column) = raw.strip_suffix(":null") {
        return filter(column, FilterPredicate::IsNull);
    }
    if let Some((column, value)) = raw.split_once("!=") {
        return filter(column, FilterPredicate::NotEquals(value.to_string()));
    }
    let Some(at) = raw.find(['=', '~', '>', '<']) else {
        return Err(format!("unrecognized filter: {}", raw));
    };
    let (column, rest) = raw.split_at(at);
    let value = rest[1..].to_string();
    let predicate = match &rest[..1] {
        "=" => FilterPredicate::Equals(value),
        "~" => FilterPredicate::Contains(value),
        ">" => FilterPredicate::GreaterThan(value),
        _ => FilterPredicate::LessThan(value),
    };
    filter(column, predicate)
}

pub fn parse_assignment(raw: &str) -> Result<ColumnValue, String> {
    let (column, value) = match raw.split_once('=') {
        Some((column, value)) => (column, Some(value.to_string())),
        None => match raw.strip_suffix(":null") {
            Some(column) => (column, None),
            None => return Err(format!("expected col=value or col:null, got {}", raw)),
        },
    };
    let column = column.trim();
    if column.is_empty() {
        return Err("column is empty".to_string());
    }
    Ok(ColumnValue::new(column, value))
}

fn filter(column: &str, predicate: FilterPredicate) -> Result<Filter, String> {
    let column = column.trim();
    if column.is_empty() {
        return Err("filter column is empty".to_string());
    }
    Ok(Filter::new(column, predicate))
}

fn new_constraint(
    column: String,
    kind: ConstraintArg,
    expression: Option<String>,
    references: Option<String>,
) -> Result<NewConstraint> {
    Ok(match kind {
        ConstraintArg::PrimaryKey => NewConstraint::PrimaryKey { column },
        ConstraintArg::Unique => NewConstraint::Unique { column },
        ConstraintArg::NotNull => NewConstraint::NotNull { column },
        ConstraintArg::Check => NewConstraint::Check {
            column,
            expression: expression.ok_or_else(|| eyre!("--expression is required for check"))?,
        },
        ConstraintArg::ForeignKey => {
            let target =
                references.ok_or_else(|| eyre!("--references is required for foreign-key"))?;
            let Some((table, target_column)) = target.split_once('.') else {
                bail!("--references must be table.column");
            };
            NewConstraint::ForeignKey {
                column,
                references_table: table.to_string(),
                references_column: target_column.to_string(),
            }
        }
    })
}

/// Owns the store and drives it until the work started by each action is done.
pub struct Driver {
    pub state: AppState,
    runner: EffectRunner,
    rx: mpsc::UnboundedReceiver<Action>,
}

impl Driver {
    pub fn new(state: AppState, runner: EffectRunner, rx: mpsc::UnboundedReceiver<Action>) -> Self {
        Self { state, runner, rx }
    }

    pub fn dispatch(&mut self, action: Action) {
        dispatch(&mut self.state, &self.runner, action);
    }

    /// Runs until idle. Any error the store caught becomes the result.
    pub async fn settle(&mut self) -> Result<()> {
        run_until_idle(&mut self.state, &self.runner, &mut self.rx).await;
        if self.state.errors.is_empty() {
            Ok(())
        } else {
            Err(eyre!(output::render_errors(&self.state.errors)))
        }
    }

    pub async fn send(&mut self, action: Action) -> Result<()> {
        self.dispatch(action);
        self.settle().await
    }

    fn ensure_table(&self, table: &str) -> Result<()> {
        if self.state.registry.contains(table) {
            Ok(())
        } else {
            Err(eyre!("table {} not found", table))
        }
    }

    fn content_text(&self) -> Result<String> {
        self.state
            .content
            .as_ref()
            .map(|c| output::render_content(c, self.state.page_size))
            .ok_or_else(|| eyre!("no content loaded"))
    }

    fn structure_text(&self) -> Result<String> {
        self.state
            .content
            .as_ref()
            .map(output::render_structure)
            .ok_or_else(|| eyre!("no content loaded"))
    }

    /// Selects `table` and returns its first primary-key column.
    async fn open_keyed(&mut self, table: &str) -> Result<String> {
        self.ensure_table(table)?;
        self.send(Action::SelectTable(table.to_string())).await?;
        self.state
            .content
            .as_ref()
            .and_then(|c| c.primary_keys.first().cloned())
            .ok_or_else(|| eyre!("table {} has no primary key", table))
    }

    /// Opens `table` filtered to the row keyed `id` and returns its index.
    async fn open_row(&mut self, table: &str, id: &str) -> Result<usize> {
        let key_column = self.open_keyed(table).await?;
        let by_id = vec![Filter::new(
            key_column.clone(),
            FilterPredicate::Equals(id.to_string()),
        )];
        self.send(Action::OpenTable(
            FetchRequest::new(table).with_filters(by_id, true),
        ))
        .await?;
        self.state
            .content
            .as_ref()
            .and_then(|c| c.row_index_by_key(&[KeyValue::new(key_column, id)]))
            .ok_or_else(|| eyre!("no row with key {} in {}", id, table))
    }

    /// Shows the unfiltered last page, where new rows usually land.
    async fn last_page_text(&mut self) -> Result<String> {
        self.send(Action::ClearFilter { refresh: true }).await?;
        let last = self.state.total_pages();
        self.send(Action::GoToPage(last)).await?;
        self.content_text()
    }

    /// Opens `table` with its structure and constraints loaded.
    async fn open_with_structure(&mut self, table: &str) -> Result<()> {
        self.ensure_table(table)?;
        self.send(Action::SelectTable(table.to_string())).await?;
        self.send(Action::LoadStructure).await
    }

    pub async fn execute(&mut self, command: Command, default_base: &str) -> Result<String> {
        debug!(?command, "executing");
        match command {
            Command::Tables { search } => {
                if let Some(keyword) = search {
                    self.dispatch(Action::SearchTables(keyword));
                }
                let tables = self.state.registry.search(&self.state.table_search);
                Ok(output::render_tables(&tables))
            }
            Command::Show {
                table,
                page,
                sort,
                filter,
                json,
            } => {
                self.ensure_table(&table)?;
                let show_filter = !filter.is_empty();
                let request = FetchRequest::new(table)
                    .with_page(page)
                    .with_order(sort)
                    .with_filters(filter, show_filter);
                self.send(Action::OpenTable(request)).await?;
                let last = self.state.total_pages();
                if self.state.content.as_ref().is_some_and(|c| c.page > last) {
                    self.send(Action::GoToPage(last)).await?;
                }
                if json {
                    let content = self
                        .state
                        .content
                        .as_ref()
                        .ok_or_else(|| eyre!("no content loaded"))?;
                    Ok(serde_json::to_string_pretty(&output::content_json(
                        content,
                        self.state.page_size,
                    ))?)
                } else {
                    self.content_text()
                }
            }
            Command::Structure { table } => {
                self.open_with_structure(&table).await?;
                self.structure_text()
            }
            Command::Peek { table, column } => {
                self.ensure_table(&table)?;
                self.send(Action::OpenForeignTable { table, column }).await?;
                self.state
                    .foreign_table
                    .as_ref()
                    .map(output::render_foreign_table)
                    .ok_or_else(|| eyre!("no rows loaded"))
            }
            Command::Create { base } => {
                let base = base.unwrap_or_else(|| default_base.to_string());
                self.send(Action::CreateTable { base }).await?;
                let created = self
                    .state
                    .selected_table
                    .clone()
                    .ok_or_else(|| eyre!("table creation did not report a name"))?;
                Ok(format!("created {}", created))
            }
            Command::Drop { table } => {
                self.ensure_table(&table)?;
                self.send(Action::DropTable(table.clone())).await?;
                Ok(format!("dropped {}", table))
            }
            Command::Truncate {
                table,
                restart_identity,
            } => {
                self.ensure_table(&table)?;
                self.send(Action::SelectTable(table.clone())).await?;
                self.send(Action::TruncateTable {
                    name: table,
                    restart_identity,
                })
                .await?;
                self.content_text()
            }
            Command::Update {
                table,
                id,
                column,
                value,
                null,
            } => {
                let row_index = self.open_row(&table, &id).await?;
                let value = if null {
                    None
                } else {
                    Some(value.ok_or_else(|| eyre!("a value or --null is required"))?)
                };
                self.dispatch(Action::StageCellEdit {
                    row_index,
                    column_key: column,
                    value,
                });
                if let Some(latest) = self.state.errors.latest() {
                    bail!("{}", latest.message);
                }
                self.send(Action::CommitEdits).await?;
                if let Some((_, failed)) = self
                    .state
                    .edits
                    .iter()
                    .find(|(_, edit)| edit.error.is_some())
                {
                    bail!(
                        "update rejected: {}",
                        failed.error.clone().unwrap_or_default()
                    );
                }
                self.content_text()
            }
            Command::Rename { table, new_name } => {
                self.ensure_table(&table)?;
                self.send(Action::RenameTable {
                    from: table.clone(),
                    to: new_name.clone(),
                })
                .await?;
                Ok(format!("renamed {} to {}", table, new_name.trim()))
            }
            Command::Insert { table, values } => {
                self.ensure_table(&table)?;
                self.send(Action::SelectTable(table.clone())).await?;
                self.send(Action::InsertRow { table, values }).await?;
                self.last_page_text().await
            }
            Command::Clone { table, id } => {
                let row_index = self.open_row(&table, &id).await?;
                self.send(Action::CloneRow { row_index }).await?;
                self.last_page_text().await
            }
            Command::Delete { table, ids } => {
                let key_column = self.open_keyed(&table).await?;
                let keys = ids
                    .into_iter()
                    .map(|id| vec![KeyValue::new(key_column.clone(), id)])
                    .collect();
                self.send(Action::DeleteRows { table, keys }).await?;
                self.content_text()
            }
            Command::AddColumn {
                table,
                name,
                data_type,
            } => {
                self.open_with_structure(&table).await?;
                self.send(Action::AddColumn {
                    table,
                    name,
                    data_type,
                })
                .await?;
                self.structure_text()
            }
            Command::DropColumn { table, name } => {
                self.open_with_structure(&table).await?;
                self.send(Action::DropColumn { table, name }).await?;
                self.structure_text()
            }
            Command::AddConstraint {
                table,
                column,
                kind,
                expression,
                references,
            } => {
                let constraint = new_constraint(column, kind, expression, references)?;
                self.open_with_structure(&table).await?;
                self.send(Action::AddConstraint { table, constraint })
                    .await?;
                self.structure_text()
            }
            Command::DropConstraint { table, name } => {
                self.open_with_structure(&table).await?;
                self.send(Action::DropConstraint { table, name }).await?;
                self.structure_text()
            }
        }
    }
}
