//! Scriptable in-memory driver for executor tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use dbmap_core::{
    ColumnMeta, Constraint, Driver, DriverError, DriverResult, GeneratedKeys, IsolationLevel, Procedure,
    Record, Registration, Row, RowCursor, Savepoint, Schema, Statement, Table, Value, WireType,
    property,
};
use dbmap_dialect::{Dialect, Sqlite};

use crate::Database;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Parent {
    pub pk: Option<i32>,
    pub col: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Manual {
    pub pk: Option<String>,
    pub col: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Filter {
    pub col: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Count {
    pub total: i64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Rename {
    pub pk: i32,
    pub col: String,
}

/// SQLite-flavored database over Parent (generated key) and Manual (assigned key).
pub fn database() -> Database {
    database_with(Sqlite)
}

pub fn database_with(dialect: impl Dialect + 'static) -> Database {
    let registration = Registration::new()
        .schema(
            Schema::new("main")
                .table(
                    Table::new("Parent", property!(Parent, pk?))
                        .column(property!(Parent, col))
                        .constraint("pk", Constraint::AutoIncrement),
                )
                .table(Table::new("Manual", property!(Manual, pk?)).column(property!(Manual, col))),
        )
        .input(Record::<Filter>::new().property(property!(Filter, col)))
        .output(Record::<Count>::new().property(property!(Count, total)))
        .procedure(
            Procedure::<Rename>::new("rename")
                .arg(property!(Rename, pk))
                .arg(property!(Rename, col)),
        );
    match Database::new(dialect, registration) {
        Ok(db) => db,
        Err(err) => panic!("mock registration failed: {err}"),
    }
}

/// Everything the driver saw.
#[derive(Debug, Default, Clone)]
pub struct MockLog {
    pub prepared: Vec<(String, GeneratedKeys)>,
    /// Bound values per prepared statement.
    pub binds: Vec<Vec<(usize, WireType, Value)>>,
    /// Row count of every executed batch.
    pub batches: Vec<usize>,
    /// BEGIN, COMMIT, ROLLBACK, SAVEPOINT name, ROLLBACK TO name, CLOSE.
    pub events: Vec<String>,
    pub closed_statements: usize,
    pub closed_cursors: usize,
}

impl MockLog {
    pub fn statements(&self) -> Vec<&str> {
        self.prepared.iter().map(|(sql, _)| sql.as_str()).collect()
    }
}

#[derive(Debug, Default)]
struct State {
    log: MockLog,
    rows: VecDeque<Vec<Row>>,
    counts: VecDeque<u64>,
    batch_counts: VecDeque<Vec<u64>>,
    keys: VecDeque<DriverResult<Option<Value>>>,
    fail_on: Vec<String>,
    fail_bind: Option<Value>,
    fail_close: bool,
    fail_commit: bool,
    fail_rollback: bool,
}

/// Cloning shares the script and the log.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<State>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Snapshot of the log.
    pub fn log(&self) -> MockLog {
        self.state().log.clone()
    }

    /// Result set for the next `execute_query`.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.state().rows.push_back(rows);
    }

    /// Row count for the next `execute_update`; defaults to 1.
    pub fn push_count(&self, count: u64) {
        self.state().counts.push_back(count);
    }

    /// Per-row counts of the next `execute_batch` calls, in order. Unscripted
    /// batches report one row each.
    pub fn script_batch_counts(&self, counts: Vec<Vec<u64>>) {
        self.state().batch_counts.extend(counts);
    }

    /// Answer of the next `generated_key`; defaults to `Ok(None)`.
    pub fn push_key(&self, key: DriverResult<Option<Value>>) {
        self.state().keys.push_back(key);
    }

    /// Fail every execution of SQL containing `pattern`.
    pub fn fail_on(&self, pattern: &str) {
        self.state().fail_on.push(pattern.to_string());
    }

    /// Fail every bind of `value`.
    pub fn fail_bind(&self, value: Value) {
        self.state().fail_bind = Some(value);
    }

    pub fn fail_close(&self) {
        self.state().fail_close = true;
    }

    pub fn fail_commit(&self) {
        self.state().fail_commit = true;
    }

    pub fn fail_rollback(&self) {
        self.state().fail_rollback = true;
    }

    fn check(&self, sql: &str) -> DriverResult<()> {
        if self.state().fail_on.iter().any(|p| sql.contains(p.as_str())) {
            return Err(DriverError::new(format!("scripted failure: {sql}")));
        }
        Ok(())
    }

    fn event(&self, event: String, fail: bool) -> DriverResult<()> {
        self.state().log.events.push(event.clone());
        if fail {
            return Err(DriverError::new(format!("scripted failure: {event}")));
        }
        Ok(())
    }
}

struct MockStatement {
    driver: MockDriver,
    sql: String,
    index: usize,
    pending: usize,
}

impl Statement for MockStatement {
    fn bind(&mut self, index: usize, wire: WireType, value: &Value) -> DriverResult<()> {
        let mut state = self.driver.state();
        if state.fail_bind.as_ref() == Some(value) {
            return Err(DriverError::new(format!("scripted bind failure: {value}")));
        }
        state.log.binds[self.index].push((index, wire, value.clone()));
        Ok(())
    }

    fn add_batch(&mut self) -> DriverResult<()> {
        self.pending += 1;
        Ok(())
    }

    fn execute_batch(&mut self) -> DriverResult<Vec<u64>> {
        self.driver.check(&self.sql)?;
        let rows = std::mem::take(&mut self.pending);
        let mut state = self.driver.state();
        state.log.batches.push(rows);
        Ok(state.batch_counts.pop_front().unwrap_or_else(|| vec![1; rows]))
    }

    fn execute_update(&mut self) -> DriverResult<u64> {
        self.driver.check(&self.sql)?;
        Ok(self.driver.state().counts.pop_front().unwrap_or(1))
    }

    fn execute_query(&mut self) -> DriverResult<Box<dyn RowCursor + '_>> {
        self.driver.check(&self.sql)?;
        let rows = self.driver.state().rows.pop_front().unwrap_or_default();
        Ok(Box::new(MockCursor {
            driver: self.driver.clone(),
            rows: rows.into(),
        }))
    }

    fn generated_key(&mut self) -> DriverResult<Option<Value>> {
        self.driver.state().keys.pop_front().unwrap_or(Ok(None))
    }

    fn close(&mut self) -> DriverResult<()> {
        let mut state = self.driver.state();
        state.log.closed_statements += 1;
        if state.fail_close {
            return Err(DriverError::new("scripted close failure"));
        }
        Ok(())
    }
}

struct MockCursor {
    driver: MockDriver,
    rows: VecDeque<Row>,
}

impl RowCursor for MockCursor {
    fn next_row(&mut self) -> DriverResult<Option<Row>> {
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) -> DriverResult<()> {
        let mut state = self.driver.state();
        state.log.closed_cursors += 1;
        if state.fail_close {
            return Err(DriverError::new("scripted close failure"));
        }
        Ok(())
    }
}

impl Driver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn prepare(&mut self, sql: &str, keys: &GeneratedKeys) -> DriverResult<Box<dyn Statement + '_>> {
        let index = {
            let mut state = self.state();
            state.log.prepared.push((sql.to_string(), keys.clone()));
            state.log.binds.push(Vec::new());
            state.log.prepared.len() - 1
        };
        Ok(Box::new(MockStatement {
            driver: self.clone(),
            sql: sql.to_string(),
            index,
            pending: 0,
        }))
    }

    fn begin(&mut self, isolation: Option<IsolationLevel>) -> DriverResult<()> {
        let event = match isolation {
            Some(level) => format!("BEGIN {}", level.as_sql()),
            None => "BEGIN".to_string(),
        };
        self.event(event, false)
    }

    fn commit(&mut self) -> DriverResult<()> {
        let fail = self.state().fail_commit;
        self.event("COMMIT".to_string(), fail)
    }

    fn rollback(&mut self) -> DriverResult<()> {
        let fail = self.state().fail_rollback;
        self.event("ROLLBACK".to_string(), fail)
    }

    fn savepoint(&mut self, savepoint: &Savepoint) -> DriverResult<()> {
        self.event(format!("SAVEPOINT {}", savepoint.name()), false)
    }

    fn rollback_to(&mut self, savepoint: &Savepoint) -> DriverResult<()> {
        self.event(format!("ROLLBACK TO {}", savepoint.name()), false)
    }

    fn close(&mut self) -> DriverResult<()> {
        self.event("CLOSE".to_string(), false)
    }
}

/// One-column result row.
pub fn single(name: &str, value: Value) -> Row {
    let columns: Arc<[ColumnMeta]> = Arc::from(vec![ColumnMeta::new(name, None)]);
    Row::new(columns, vec![value])
}
