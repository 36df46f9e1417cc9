use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use tabula_app::ports::{DatabaseGateway, GatewayError};
use tabula_domain::{
    CellEdit, ColumnDescriptor, ColumnValue, ConstraintDescriptor, ConstraintKind, ContentPage,
    ContentQuery, ForeignKey, Index, IndexMethod, KeyValue, NewConstraint, Row, TableSummary,
    UpdateResult,
};

use crate::sql;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Printed by psql in place of NULL in CSV output. Plain `--csv` writes NULL
/// as an empty field, which would read back as an empty string.
const NULL_MARKER: &str = "\u{1}NULL\u{1}";

/// stderr fragments psql prints when it never reached the server.
const CONNECTION_MARKERS: [&str; 4] = [
    "could not connect",
    "connection to server",
    "could not translate host name",
    "password authentication failed",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    /// `-t -A`: bare values, used for `json_agg` documents and counts.
    Tuples,
    /// `--csv` with a header row.
    Csv,
    /// Default formatting, output ignored.
    Plain,
}

/// Talks to PostgreSQL through the `psql` client, one process per call.
pub struct PostgresGateway {
    dsn: String,
    psql_path: String,
    timeout_secs: u64,
}

impl PostgresGateway {
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            psql_path: "psql".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_psql_path(mut self, path: impl Into<String>) -> Self {
        self.psql_path = path.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    async fn run(&self, output: Output, query: &str) -> Result<String, GatewayError> {
        let start = Instant::now();

        let mut command = Command::new(&self.psql_path);
        command
            .arg(&self.dsn)
            .arg("-X") // Ignore .psqlrc to avoid unexpected output
            .arg("-v")
            .arg("ON_ERROR_STOP=1");
        match output {
            Output::Tuples => {
                command.arg("-t").arg("-A");
            }
            Output::Csv => {
                command
                    .arg("--csv")
                    .arg("-P")
                    .arg(format!("null={}", NULL_MARKER));
            }
            Output::Plain => {}
        }
        let mut child = command
            .arg("-c")
            .arg(query)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GatewayError::CommandNotFound(e.to_string()))?;

        // Read stdout/stderr BEFORE wait() to prevent pipe buffer deadlock
        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        let (status, stdout, stderr) = timeout(Duration::from_secs(self.timeout_secs), async {
            let (stdout_result, stderr_result) = tokio::join!(
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut out) = stdout_handle {
                        out.read_to_end(&mut buf).await?;
                    }
                    Ok::<_, std::io::Error>(String::from_utf8_lossy(&buf).into_owned())
                },
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut err) = stderr_handle {
                        err.read_to_end(&mut buf).await?;
                    }
                    Ok::<_, std::io::Error>(String::from_utf8_lossy(&buf).into_owned())
                }
            );

            let stdout = stdout_result?;
            let stderr = stderr_result?;
            let status = child.wait().await?;

            Ok::<_, std::io::Error>((status, stdout, stderr))
        })
        .await
        .map_err(|_| GatewayError::Timeout)?
        .map_err(|e| GatewayError::QueryFailed(e.to_string()))?;

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            success = status.success(),
            "psql finished"
        );

        if !status.success() {
            return Err(classify_failure(stderr.trim()));
        }

        Ok(stdout)
    }

    async fn query_json<T: DeserializeOwned>(&self, query: &str) -> Result<Vec<T>, GatewayError> {
        let raw = self.run(Output::Tuples, query).await?;
        parse_json_rows(&raw)
    }

    async fn execute(&self, statement: &str) -> Result<(), GatewayError> {
        self.run(Output::Plain, statement).await.map(|_| ())
    }

    async fn count_rows(&self, query: &ContentQuery) -> Result<u64, GatewayError> {
        let raw = self
            .run(
                Output::Tuples,
                &sql::count_query(&query.table_name, &query.filters),
            )
            .await?;
        parse_count(&raw)
    }

    async fn constraint_exists(&self, table: &str, name: &str) -> Result<bool, GatewayError> {
        let names: Vec<String> = self
            .query_json(&sql::constraint_exists_query(table, name))
            .await?;
        Ok(!names.is_empty())
    }

    async fn update_cell(&self, edit: &CellEdit) -> Result<UpdateResult, GatewayError> {
        if edit.primary_key.is_empty() {
            return Ok(UpdateResult::rejected(edit, "row has no primary key"));
        }
        match self
            .query_json::<Option<String>>(&sql::update_cell(edit))
            .await
        {
            Ok(values) => Ok(match values.into_iter().next() {
                Some(value) => UpdateResult::applied(edit, value),
                None => UpdateResult::rejected(edit, "row not found"),
            }),
            Err(GatewayError::QueryFailed(message)) => {
                warn!(id = %edit.id, column = %edit.column_key, "cell update rejected");
                Ok(UpdateResult::rejected(edit, message))
            }
            Err(e) => Err(e),
        }
    }

    /// Extract database name from DSN string.
    /// Supports both URI format (postgres://host/dbname) and key=value format (dbname=mydb).
    pub fn extract_database_name(dsn: &str) -> String {
        let without_params = dsn.split('?').next().unwrap_or(dsn);
        if without_params.contains("://")
            && let Some(db) = without_params
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty() && !s.contains('@') && !s.contains(':'))
        {
            return db.to_string();
        }
        if let Some(start) = dsn.find("dbname=") {
            let rest = &dsn[start + 7..];
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            return rest[..end].to_string();
        }
        "unknown".to_string()
    }
}

fn classify_failure(stderr: &str) -> GatewayError {
    let lower = stderr.to_lowercase();
    if CONNECTION_MARKERS.iter().any(|m| lower.contains(m)) {
        GatewayError::ConnectionFailed(stderr.to_string())
    } else {
        GatewayError::QueryFailed(stderr.to_string())
    }
}

/// `json_agg` yields `null` (or nothing) for zero rows.
fn parse_json_rows<T: DeserializeOwned>(json: &str) -> Result<Vec<T>, GatewayError> {
    let trimmed = json.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).map_err(|e| GatewayError::InvalidJson(e.to_string()))
}

fn parse_count(raw: &str) -> Result<u64, GatewayError> {
    let trimmed = raw.trim();
    trimmed
        .parse()
        .map_err(|_| GatewayError::QueryFailed(format!("Unexpected row count: {}", trimmed)))
}

fn parse_csv_page(csv_data: &str) -> Result<(Vec<String>, Vec<Row>), GatewayError> {
    if csv_data.trim().is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| GatewayError::QueryFailed(format!("CSV parse error: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| GatewayError::QueryFailed(format!("CSV parse error: {}", e)))?;
        rows.push(
            record
                .iter()
                .map(|field| (field != NULL_MARKER).then(|| field.to_string()))
                .collect(),
        );
    }

    Ok((columns, rows))
}

fn parse_columns(json: &str) -> Result<Vec<ColumnDescriptor>, GatewayError> {
    #[derive(serde::Deserialize)]
    struct RawColumn {
        name: String,
        data_type: String,
        nullable: bool,
        default: Option<String>,
        is_primary_key: bool,
        ordinal_position: i32,
    }

    let raw: Vec<RawColumn> = parse_json_rows(json)?;
    Ok(raw
        .into_iter()
        .map(|c| ColumnDescriptor {
            name: c.name,
            data_type: c.data_type,
            nullable: c.nullable,
            default: c.default,
            is_primary_key: c.is_primary_key,
            ordinal_position: c.ordinal_position,
        })
        .collect())
}

fn parse_indexes(json: &str) -> Result<Vec<Index>, GatewayError> {
    #[derive(serde::Deserialize)]
    struct RawIndex {
        name: String,
        columns: Vec<String>,
        is_unique: bool,
        is_primary: bool,
        method: String,
    }

    let raw: Vec<RawIndex> = parse_json_rows(json)?;
    Ok(raw
        .into_iter()
        .map(|i| Index {
            name: i.name,
            columns: i.columns,
            is_unique: i.is_unique,
            is_primary: i.is_primary,
            method: IndexMethod::from_am_name(&i.method),
        })
        .collect())
}

#[derive(serde::Deserialize)]
struct RawOid {
    name: String,
    oid: u32,
}

/// Keeps the caller's order; names the catalog does not know get no oid.
fn attach_oids(names: &[String], raw: Vec<RawOid>) -> Vec<TableSummary> {
    names
        .iter()
        .map(|name| {
            let summary = TableSummary::new(name.clone());
            match raw.iter().find(|r| &r.name == name) {
                Some(r) => summary.with_oid(r.oid),
                None => summary,
            }
        })
        .collect()
}

#[derive(serde::Deserialize)]
struct RawForeignKey {
    oid: u32,
    name: String,
    column: String,
    references_table: String,
    references_column: String,
}

fn attach_foreign_keys(mut tables: Vec<TableSummary>, raw: Vec<RawForeignKey>) -> Vec<TableSummary> {
    for fk in raw {
        if let Some(table) = tables.iter_mut().find(|t| t.oid == Some(fk.oid)) {
            table.foreign_keys.push(ForeignKey {
                name: fk.name,
                column: fk.column,
                references_table: fk.references_table,
                references_column: fk.references_column,
            });
        }
    }
    tables
}

fn parse_constraints(json: &str) -> Result<Vec<ConstraintDescriptor>, GatewayError> {
    #[derive(serde::Deserialize)]
    struct RawConstraint {
        name: String,
        column_name: String,
        contype: String,
        detail: Option<String>,
    }

    let raw: Vec<RawConstraint> = parse_json_rows(json)?;
    Ok(raw
        .into_iter()
        .filter_map(|c| {
            let Some(kind) = ConstraintKind::from_contype(&c.contype) else {
                debug!(contype = %c.contype, name = %c.name, "skipping unknown constraint type");
                return None;
            };
            Some(ConstraintDescriptor {
                name: c.name,
                column_name: c.column_name,
                kind,
                detail: c.detail,
            })
        })
        .collect())
}

fn parse_not_null(json: &str) -> Result<Vec<ConstraintDescriptor>, GatewayError> {
    #[derive(serde::Deserialize)]
    struct RawNotNull {
        table_name: String,
        column_name: String,
    }

    let raw: Vec<RawNotNull> = parse_json_rows(json)?;
    Ok(raw
        .into_iter()
        .map(|n| {
            ConstraintDescriptor::new(
                sql::not_null_name(&n.table_name, &n.column_name),
                n.column_name,
                ConstraintKind::NotNull,
            )
        })
        .collect())
}

fn describe_new_constraint(table: &str, constraint: &NewConstraint) -> ConstraintDescriptor {
    let name = sql::constraint_name(table, constraint);
    let mut descriptor = ConstraintDescriptor::new(name, constraint.column(), constraint.kind());
    descriptor.detail = match constraint {
        NewConstraint::Check { expression, .. } => Some(expression.clone()),
        NewConstraint::ForeignKey {
            references_table,
            references_column,
            ..
        } => Some(format!("{}.{}", references_table, references_column)),
        _ => None,
    };
    descriptor
}

#[async_trait]
impl DatabaseGateway for PostgresGateway {
    async fn get_table_indexes(&self, table: &str) -> Result<Vec<Index>, GatewayError> {
        let raw = self.run(Output::Tuples, &sql::indexes_query(table)).await?;
        parse_indexes(&raw)
    }

    async fn get_primary_keys(&self, table: &str) -> Result<Vec<String>, GatewayError> {
        self.query_json(&sql::primary_keys_query(table)).await
    }

    async fn get_table_structure(
        &self,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>, GatewayError> {
        let raw = self.run(Output::Tuples, &sql::columns_query(table)).await?;
        parse_columns(&raw)
    }

    async fn get_table_content(&self, query: &ContentQuery) -> Result<ContentPage, GatewayError> {
        let content_sql = sql::content_query(query);
        let (raw, total_count) = tokio::try_join!(
            self.run(Output::Csv, &content_sql),
            self.count_rows(query)
        )?;
        let (columns, rows) = parse_csv_page(&raw)?;
        Ok(ContentPage {
            columns,
            rows,
            total_count,
        })
    }

    async fn get_tables(&self) -> Result<Vec<String>, GatewayError> {
        self.query_json(&sql::tables_query()).await
    }

    async fn get_table_oids(&self, tables: &[String]) -> Result<Vec<TableSummary>, GatewayError> {
        if tables.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<RawOid> = self.query_json(&sql::table_oids_query(tables)).await?;
        Ok(attach_oids(tables, raw))
    }

    async fn get_foreign_keys(
        &self,
        tables: Vec<TableSummary>,
    ) -> Result<Vec<TableSummary>, GatewayError> {
        let oids: Vec<u32> = tables.iter().filter_map(|t| t.oid).collect();
        if oids.is_empty() {
            return Ok(tables);
        }
        let raw: Vec<RawForeignKey> = self.query_json(&sql::foreign_keys_query(&oids)).await?;
        Ok(attach_foreign_keys(tables, raw))
    }

    async fn get_table_constraints(
        &self,
        table: &str,
    ) -> Result<Vec<ConstraintDescriptor>, GatewayError> {
        let raw = self
            .run(Output::Tuples, &sql::constraints_query(table))
            .await?;
        parse_constraints(&raw)
    }

    async fn get_not_null_constraints(
        &self,
        structure: &[ColumnDescriptor],
        oid: u32,
    ) -> Result<Vec<ConstraintDescriptor>, GatewayError> {
        let columns: Vec<String> = structure.iter().map(|c| c.name.clone()).collect();
        if columns.is_empty() {
            return Ok(Vec::new());
        }
        let raw = self
            .run(Output::Tuples, &sql::not_null_query(&columns, oid))
            .await?;
        parse_not_null(&raw)
    }

    async fn create_table(&self, name: &str) -> Result<(), GatewayError> {
        self.execute(&sql::create_table(name)).await
    }

    async fn drop_table(&self, name: &str) -> Result<(), GatewayError> {
        self.execute(&sql::drop_table(name)).await
    }

    async fn truncate_table(&self, name: &str, restart_identity: bool) -> Result<(), GatewayError> {
        self.execute(&sql::truncate_table(name, restart_identity))
            .await
    }

    async fn rename_table(&self, from: &str, to: &str) -> Result<(), GatewayError> {
        self.execute(&sql::rename_table(from, to)).await
    }

    async fn update_cells(&self, edits: &[CellEdit]) -> Result<Vec<UpdateResult>, GatewayError> {
        let mut results = Vec::with_capacity(edits.len());
        for edit in edits {
            results.push(self.update_cell(edit).await?);
        }
        Ok(results)
    }

    async fn insert_row(&self, table: &str, values: &[ColumnValue]) -> Result<(), GatewayError> {
        self.execute(&sql::insert_row(table, values)).await
    }

    async fn delete_rows(&self, table: &str, keys: &[Vec<KeyValue>]) -> Result<u64, GatewayError> {
        if keys.is_empty() || keys.iter().any(Vec::is_empty) {
            return Err(GatewayError::QueryFailed(
                "rows can only be deleted by primary key".to_string(),
            ));
        }
        let raw = self
            .run(Output::Tuples, &sql::delete_rows(table, keys))
            .await?;
        parse_count(&raw)
    }

    async fn add_column(
        &self,
        table: &str,
        name: &str,
        data_type: &str,
    ) -> Result<ColumnDescriptor, GatewayError> {
        self.execute(&sql::add_column(table, name, data_type))
            .await?;
        self.get_table_structure(table)
            .await?
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                GatewayError::QueryFailed(format!("column {} missing after ALTER TABLE", name))
            })
    }

    async fn drop_column(&self, table: &str, name: &str) -> Result<(), GatewayError> {
        self.execute(&sql::drop_column(table, name)).await
    }

    async fn add_constraint(
        &self,
        table: &str,
        constraint: &NewConstraint,
    ) -> Result<ConstraintDescriptor, GatewayError> {
        let descriptor = describe_new_constraint(table, constraint);
        self.execute(&sql::add_constraint(table, &descriptor.name, constraint))
            .await?;
        Ok(descriptor)
    }

    async fn drop_constraint(&self, table: &str, name: &str) -> Result<(), GatewayError> {
        if let Some(column) = sql::not_null_column(table, name)
            && !self.constraint_exists(table, name).await?
        {
            return self.execute(&sql::drop_not_null(table, column)).await;
        }
        self.execute(&sql::drop_constraint(table, name)).await
    }
}
