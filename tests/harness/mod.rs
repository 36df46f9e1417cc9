#![allow(dead_code, reason = "each test binary uses a different part of the harness")]

pub mod fixtures;

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore, mpsc};

use tabula::app::action::Action;
use tabula::app::effect_runner::EffectRunner;
use tabula::app::ports::{DatabaseGateway, GatewayError};
use tabula::app::session::{SessionContext, SessionSettings};
use tabula::app::state::AppState;
use tabula::cli::Driver;
use tabula::domain::{
    CellEdit, ColumnDescriptor, ColumnValue, ConstraintDescriptor, ConstraintKind, ContentPage,
    ContentQuery, Filter, FilterPredicate, ForeignKey, Index, IndexMethod, KeyValue,
    NewConstraint, Row, SortDirection, TableSummary, UpdateResult,
};

#[derive(Debug, Clone)]
pub struct FakeTable {
    pub structure: Vec<ColumnDescriptor>,
    pub primary_keys: Vec<String>,
    pub rows: Vec<Row>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl FakeTable {
    fn column_index(&self, name: &str) -> Option<usize> {
        self.structure.iter().position(|c| c.name == name)
    }

    fn matches_key(&self, row: &Row, key: &[KeyValue]) -> bool {
        !key.is_empty()
            && key.iter().all(|kv| {
                self.column_index(&kv.column)
                    .is_some_and(|i| row[i].as_deref() == Some(kv.value.as_str()))
            })
    }

    fn next_id(&self, column: usize) -> String {
        let max = self
            .rows
            .iter()
            .filter_map(|row| row[column].as_deref()?.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        (max + 1).to_string()
    }
}

/// Parks content fetches of one table until released.
struct Gate {
    entered: Notify,
    permits: Semaphore,
}

/// In-memory gateway. Tables are listed in name order, oids follow that
/// order starting at 1000.
#[derive(Default)]
pub struct FakeGateway {
    tables: Mutex<BTreeMap<String, FakeTable>>,
    reserved_names: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
    calls: Mutex<Vec<String>>,
}

fn missing(table: &str) -> GatewayError {
    GatewayError::QueryFailed(format!("ERROR:  relation \"{}\" does not exist", table))
}

fn compare_values(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

/// NULL sorts after every value, as in PostgreSQL's ascending order.
fn compare_cells(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => compare_values(a, b),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
    }
}

/// NULL satisfies only `IsNull`.
fn matches(filter: &Filter, value: Option<&str>) -> bool {
    let Some(value) = value else {
        return filter.predicate == FilterPredicate::IsNull;
    };
    match &filter.predicate {
        FilterPredicate::Equals(v) => value == v,
        FilterPredicate::NotEquals(v) => value != v,
        FilterPredicate::Contains(v) => value.to_lowercase().contains(&v.to_lowercase()),
        FilterPredicate::GreaterThan(v) => compare_values(value, v) == Ordering::Greater,
        FilterPredicate::LessThan(v) => compare_values(value, v) == Ordering::Less,
        FilterPredicate::IsNull => false,
        FilterPredicate::IsNotNull => true,
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, name: &str, table: FakeTable) -> Self {
        self.tables.lock().unwrap().insert(name.to_string(), table);
        self
    }

    /// Names `create_table` rejects as already existing.
    pub fn reserve_names(self, names: &[&str]) -> Self {
        self.reserved_names
            .lock()
            .unwrap()
            .extend(names.iter().map(|n| (*n).to_string()));
        self
    }

    /// Subsequent content fetches of `table` wait for [`Self::release`].
    pub fn gate_content(&self, table: &str) {
        self.gates.lock().unwrap().insert(
            table.to_string(),
            Arc::new(Gate {
                entered: Notify::new(),
                permits: Semaphore::new(0),
            }),
        );
    }

    /// Resolves once a content fetch of `table` is parked at its gate.
    pub async fn wait_parked(&self, table: &str) {
        let gate = self.gate(table).expect("table is not gated");
        gate.entered.notified().await;
    }

    pub fn release(&self, table: &str) {
        if let Some(gate) = self.gate(table) {
            gate.permits.add_permits(1);
        }
    }

    fn gate(&self, table: &str) -> Option<Arc<Gate>> {
        self.gates.lock().unwrap().get(table).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn table(&self, name: &str) -> Option<FakeTable> {
        self.tables.lock().unwrap().get(name).cloned()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn with_existing<T>(
        &self,
        table: &str,
        f: impl FnOnce(&mut FakeTable) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let mut tables = self.tables.lock().unwrap();
        let entry = tables.get_mut(table).ok_or_else(|| missing(table))?;
        f(entry)
    }

    fn page(&self, query: &ContentQuery) -> Result<ContentPage, GatewayError> {
        let table = self.table(&query.table_name).ok_or_else(|| missing(&query.table_name))?;

        let mut rows: Vec<Row> = table
            .rows
            .iter()
            .filter(|row| {
                query.filters.iter().all(|f| {
                    table
                        .column_index(&f.column)
                        .is_some_and(|i| matches(f, row[i].as_deref()))
                })
            })
            .cloned()
            .collect();

        let sort: Vec<(usize, SortDirection)> = query
            .order
            .iter()
            .filter_map(|o| table.column_index(&o.column).map(|i| (i, o.direction)))
            .collect();
        rows.sort_by(|a, b| {
            sort.iter()
                .map(|&(i, direction)| {
                    let ordering = compare_cells(a[i].as_deref(), b[i].as_deref());
                    match direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                })
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });

        let total_count = rows.len() as u64;
        let rows = rows
            .into_iter()
            .skip(query.offset())
            .take(query.page_size)
            .collect();
        Ok(ContentPage {
            columns: table.structure.iter().map(|c| c.name.clone()).collect(),
            rows,
            total_count,
        })
    }
}

#[async_trait]
impl DatabaseGateway for FakeGateway {
    async fn get_table_indexes(&self, table: &str) -> Result<Vec<Index>, GatewayError> {
        self.record(format!("get_table_indexes:{}", table));
        let t = self.table(table).ok_or_else(|| missing(table))?;
        if t.primary_keys.is_empty() {
            return Ok(vec![]);
        }
        Ok(vec![Index {
            name: format!("{}_pkey", table),
            columns: t.primary_keys,
            is_unique: true,
            is_primary: true,
            method: IndexMethod::BTree,
        }])
    }

    async fn get_primary_keys(&self, table: &str) -> Result<Vec<String>, GatewayError> {
        self.record(format!("get_primary_keys:{}", table));
        self.table(table)
            .map(|t| t.primary_keys)
            .ok_or_else(|| missing(table))
    }

    async fn get_table_structure(
        &self,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>, GatewayError> {
        self.record(format!("get_table_structure:{}", table));
        self.table(table)
            .map(|t| t.structure)
            .ok_or_else(|| missing(table))
    }

    async fn get_table_content(&self, query: &ContentQuery) -> Result<ContentPage, GatewayError> {
        self.record(format!("get_table_content:{}", query.table_name));
        if let Some(gate) = self.gate(&query.table_name) {
            gate.entered.notify_one();
            let permit = gate
                .permits
                .acquire()
                .await
                .map_err(|e| GatewayError::QueryFailed(e.to_string()))?;
            permit.forget();
        }
        self.page(query)
    }

    async fn get_tables(&self) -> Result<Vec<String>, GatewayError> {
        self.record("get_tables".to_string());
        Ok(self.tables.lock().unwrap().keys().cloned().collect())
    }

    async fn get_table_oids(&self, tables: &[String]) -> Result<Vec<TableSummary>, GatewayError> {
        self.record("get_table_oids".to_string());
        let known: Vec<String> = self.tables.lock().unwrap().keys().cloned().collect();
        Ok(tables
            .iter()
            .map(|name| {
                let summary = TableSummary::new(name.clone());
                match known.iter().position(|k| k == name) {
                    Some(i) => summary.with_oid(1000 + i as u32),
                    None => summary,
                }
            })
            .collect())
    }

    async fn get_foreign_keys(
        &self,
        tables: Vec<TableSummary>,
    ) -> Result<Vec<TableSummary>, GatewayError> {
        self.record("get_foreign_keys".to_string());
        Ok(tables
            .into_iter()
            .map(|mut summary| {
                if let Some(t) = self.table(&summary.name) {
                    summary.foreign_keys = t.foreign_keys;
                }
                summary
            })
            .collect())
    }

    async fn get_table_constraints(
        &self,
        table: &str,
    ) -> Result<Vec<ConstraintDescriptor>, GatewayError> {
        self.record(format!("get_table_constraints:{}", table));
        let t = self.table(table).ok_or_else(|| missing(table))?;
        let mut constraints: Vec<ConstraintDescriptor> = t
            .primary_keys
            .iter()
            .map(|pk| {
                ConstraintDescriptor::new(format!("{}_pkey", table), pk, ConstraintKind::PrimaryKey)
            })
            .collect();
        constraints.extend(t.foreign_keys.iter().map(|fk| {
            let mut descriptor =
                ConstraintDescriptor::new(&fk.name, &fk.column, ConstraintKind::ForeignKey);
            descriptor.detail = Some(fk.target());
            descriptor
        }));
        Ok(constraints)
    }

    async fn get_not_null_constraints(
        &self,
        structure: &[ColumnDescriptor],
        oid: u32,
    ) -> Result<Vec<ConstraintDescriptor>, GatewayError> {
        self.record(format!("get_not_null_constraints:{}", oid));
        let table = self
            .tables
            .lock()
            .unwrap()
            .keys()
            .nth((oid - 1000) as usize)
            .cloned()
            .unwrap_or_default();
        Ok(structure
            .iter()
            .filter(|c| !c.nullable)
            .map(|c| {
                ConstraintDescriptor::new(
                    format!("{}_{}_not_null", table, c.name),
                    &c.name,
                    ConstraintKind::NotNull,
                )
            })
            .collect())
    }

    async fn create_table(&self, name: &str) -> Result<(), GatewayError> {
        self.record(format!("create_table:{}", name));
        let mut tables = self.tables.lock().unwrap();
        if tables.contains_key(name) || self.reserved_names.lock().unwrap().contains(name) {
            return Err(GatewayError::QueryFailed(format!(
                "ERROR:  relation \"{}\" already exists",
                name
            )));
        }
        let mut id = ColumnDescriptor::new("id", "integer");
        id.nullable = false;
        id.is_primary_key = true;
        id.ordinal_position = 1;
        tables.insert(
            name.to_string(),
            FakeTable {
                structure: vec![id],
                primary_keys: vec!["id".to_string()],
                rows: vec![],
                foreign_keys: vec![],
            },
        );
        Ok(())
    }

    async fn drop_table(&self, name: &str) -> Result<(), GatewayError> {
        self.record(format!("drop_table:{}", name));
        self.tables
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| missing(name))
    }

    async fn truncate_table(&self, name: &str, _restart_identity: bool) -> Result<(), GatewayError> {
        self.record(format!("truncate_table:{}", name));
        self.with_existing(name, |t| {
            t.rows.clear();
            Ok(())
        })
    }

    async fn rename_table(&self, from: &str, to: &str) -> Result<(), GatewayError> {
        self.record(format!("rename_table:{}:{}", from, to));
        let mut tables = self.tables.lock().unwrap();
        if tables.contains_key(to) {
            return Err(GatewayError::QueryFailed(format!(
                "ERROR:  relation \"{}\" already exists",
                to
            )));
        }
        let table = tables.remove(from).ok_or_else(|| missing(from))?;
        tables.insert(to.to_string(), table);
        for fk in tables.values_mut().flat_map(|t| t.foreign_keys.iter_mut()) {
            if fk.references_table == from {
                fk.references_table = to.to_string();
            }
        }
        Ok(())
    }

    async fn update_cells(&self, edits: &[CellEdit]) -> Result<Vec<UpdateResult>, GatewayError> {
        self.record(format!("update_cells:{}", edits.len()));
        let mut results = Vec::new();
        for edit in edits {
            let result = self.with_existing(&edit.table_name, |t| {
                let Some(column) = t.column_index(&edit.column_key) else {
                    return Ok(UpdateResult::rejected(
                        edit,
                        format!("column \"{}\" does not exist", edit.column_key),
                    ));
                };
                let key: Vec<(usize, &str)> = edit
                    .primary_key
                    .iter()
                    .filter_map(|kv| t.column_index(&kv.column).map(|i| (i, kv.value.as_str())))
                    .collect();
                let Some(row) = t
                    .rows
                    .iter_mut()
                    .find(|row| key.iter().all(|&(i, v)| row[i].as_deref() == Some(v)))
                else {
                    return Ok(UpdateResult::rejected(edit, "row not found"));
                };
                row[column].clone_from(&edit.value);
                Ok(UpdateResult::applied(edit, edit.value.clone()))
            })?;
            results.push(result);
        }
        Ok(results)
    }

    async fn insert_row(&self, table: &str, values: &[ColumnValue]) -> Result<(), GatewayError> {
        self.record(format!("insert_row:{}", table));
        self.with_existing(table, |t| {
            if let Some(unknown) = values.iter().find(|v| t.column_index(&v.column).is_none()) {
                return Err(GatewayError::QueryFailed(format!(
                    "ERROR:  column \"{}\" of relation \"{}\" does not exist",
                    unknown.column, table
                )));
            }
            let mut row = Vec::with_capacity(t.structure.len());
            for (i, column) in t.structure.iter().enumerate() {
                let value = match values.iter().find(|v| v.column == column.name) {
                    Some(v) => v.value.clone(),
                    None if column.is_primary_key => Some(t.next_id(i)),
                    None => None,
                };
                if value.is_none() && !column.nullable {
                    return Err(GatewayError::QueryFailed(format!(
                        "ERROR:  null value in column \"{}\" violates not-null constraint",
                        column.name
                    )));
                }
                row.push(value);
            }
            t.rows.push(row);
            Ok(())
        })
    }

    async fn delete_rows(&self, table: &str, keys: &[Vec<KeyValue>]) -> Result<u64, GatewayError> {
        self.record(format!("delete_rows:{}:{}", table, keys.len()));
        self.with_existing(table, |t| {
            let before = t.rows.len();
            let kept: Vec<Row> = t
                .rows
                .iter()
                .filter(|row| !keys.iter().any(|key| t.matches_key(row, key)))
                .cloned()
                .collect();
            t.rows = kept;
            Ok((before - t.rows.len()) as u64)
        })
    }

    async fn add_column(
        &self,
        table: &str,
        name: &str,
        data_type: &str,
    ) -> Result<ColumnDescriptor, GatewayError> {
        self.record(format!("add_column:{}.{}", table, name));
        self.with_existing(table, |t| {
            if t.column_index(name).is_some() {
                return Err(GatewayError::QueryFailed(format!(
                    "ERROR:  column \"{}\" of relation \"{}\" already exists",
                    name, table
                )));
            }
            let mut column = ColumnDescriptor::new(name, data_type);
            column.ordinal_position = t.structure.len() as i32 + 1;
            t.structure.push(column.clone());
            for row in &mut t.rows {
                row.push(None);
            }
            Ok(column)
        })
    }

    async fn drop_column(&self, table: &str, name: &str) -> Result<(), GatewayError> {
        self.record(format!("drop_column:{}.{}", table, name));
        self.with_existing(table, |t| {
            let index = t.column_index(name).ok_or_else(|| {
                GatewayError::QueryFailed(format!("ERROR:  column \"{}\" does not exist", name))
            })?;
            t.structure.remove(index);
            t.primary_keys.retain(|pk| pk != name);
            for row in &mut t.rows {
                row.remove(index);
            }
            Ok(())
        })
    }

    async fn add_constraint(
        &self,
        table: &str,
        constraint: &NewConstraint,
    ) -> Result<ConstraintDescriptor, GatewayError> {
        self.record(format!("add_constraint:{}", table));
        self.with_existing(table, |t| {
            let index = t.column_index(constraint.column()).ok_or_else(|| {
                GatewayError::QueryFailed(format!(
                    "ERROR:  column \"{}\" does not exist",
                    constraint.column()
                ))
            })?;
            let name = match constraint {
                NewConstraint::NotNull { column } => {
                    t.structure[index].nullable = false;
                    format!("{}_{}_not_null", table, column)
                }
                NewConstraint::Unique { column } => format!("{}_{}_key", table, column),
                NewConstraint::PrimaryKey { .. } => format!("{}_pkey", table),
                NewConstraint::Check { column, .. } => format!("{}_{}_check", table, column),
                NewConstraint::ForeignKey { column, .. } => format!("{}_{}_fkey", table, column),
            };
            Ok(ConstraintDescriptor::new(
                name,
                constraint.column(),
                constraint.kind(),
            ))
        })
    }

    async fn drop_constraint(&self, table: &str, name: &str) -> Result<(), GatewayError> {
        self.record(format!("drop_constraint:{}.{}", table, name));
        self.with_existing(table, |_| Ok(()))
    }
}

pub fn session(
    gateway: Arc<FakeGateway>,
) -> (Arc<SessionContext>, mpsc::UnboundedReceiver<Action>) {
    session_with(gateway, SessionSettings::default())
}

pub fn session_with(
    gateway: Arc<FakeGateway>,
    settings: SessionSettings,
) -> (Arc<SessionContext>, mpsc::UnboundedReceiver<Action>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(SessionContext::new(gateway, tx, settings)), rx)
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<Action>) -> Vec<Action> {
    let mut actions = Vec::new();
    while let Ok(action) = rx.try_recv() {
        actions.push(action);
    }
    actions
}

/// Store, runner and channel wired to `gateway`, with the session opened.
pub async fn connected_driver(gateway: Arc<FakeGateway>, settings: SessionSettings) -> Driver {
    let page_size = settings.page_size;
    let (session, rx) = session_with(gateway, settings);
    let mut driver = Driver::new(AppState::new(page_size), EffectRunner::new(session), rx);
    driver
        .send(Action::SessionOpened {
            database_name: "test_db".to_string(),
            auto_select: false,
        })
        .await
        .unwrap();
    driver
}
