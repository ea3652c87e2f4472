//! SQLite driver for dbmap.
//!
//! [`SqliteDriver`] implements the [`Driver`] contract over an embedded
//! SQLite connection (rusqlite, bundled library). It is the driver the
//! workspace's integration tests run against.
//!
//! # Mapping
//!
//! | dbmap [`Value`]                        | SQLite storage class |
//! |----------------------------------------|----------------------|
//! | `Bool`, integers, `Date`, timestamps   | INTEGER              |
//! | `Float`, `Double`                      | REAL                 |
//! | `Text`, `Decimal`, `Json`              | TEXT                 |
//! | `Bytes`, `Uuid`                        | BLOB                 |
//!
//! Result columns carry the wire type parsed from their declared column type,
//! so the mapper can check it against the serializer that decodes it.
//! Expression columns have no declared type and are not checked.
//!
//! Batches are executed row by row on one prepared statement. Generated keys
//! come from `last_insert_rowid()`.

use std::sync::Arc;
use std::time::Duration;

use dbmap_core::{
    ColumnMeta, Driver, DriverError, DriverResult, GeneratedKeys, IsolationLevel, Row, RowCursor,
    Savepoint, Statement, Value, WireType,
};
use rusqlite::Connection;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde::{Deserialize, Serialize};

/// Path that opens a private in-memory database.
pub const MEMORY: &str = ":memory:";

// ============================================================================
// Configuration
// ============================================================================

/// How to open a SQLite database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file, or [`MEMORY`].
    pub path: String,
    /// Enforce foreign key constraints (`PRAGMA foreign_keys`).
    pub foreign_keys: bool,
    /// How long to wait on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: MEMORY.to_string(),
            foreign_keys: true,
            busy_timeout_ms: 5000,
        }
    }
}

impl SqliteConfig {
    /// Private in-memory database with foreign keys enforced.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Database stored at `path`.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    #[must_use]
    pub fn busy_timeout_ms(mut self, millis: u64) -> Self {
        self.busy_timeout_ms = millis;
        self
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn failure(context: &'static str) -> impl Fn(rusqlite::Error) -> DriverError {
    move |err| DriverError::with_source(format!("sqlite {context}: {err}"), err)
}

fn closed() -> DriverError {
    DriverError::new("sqlite connection is closed")
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::TinyInt(v) => SqlValue::Integer(i64::from(*v)),
        Value::SmallInt(v) => SqlValue::Integer(i64::from(*v)),
        Value::Int(v) | Value::Date(v) => SqlValue::Integer(i64::from(*v)),
        Value::BigInt(v) | Value::Time(v) | Value::Timestamp(v) | Value::TimestampTz(v) => {
            SqlValue::Integer(*v)
        }
        Value::Float(v) => SqlValue::Real(f64::from(*v)),
        Value::Double(v) => SqlValue::Real(*v),
        Value::Decimal(s) | Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::Uuid(bytes) => SqlValue::Blob(bytes.to_vec()),
        Value::Json(j) => SqlValue::Text(j.to_string()),
    }
}

/// TEXT that is not valid UTF-8 is an error, never a lossy string.
fn from_sql(value: ValueRef<'_>, wire: Option<WireType>, column: &str) -> DriverResult<Value> {
    let value = match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if wire == Some(WireType::Boolean) => Value::Bool(i != 0),
        ValueRef::Integer(i) => Value::BigInt(i),
        ValueRef::Real(f) => Value::Double(f),
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|err| {
                DriverError::with_source(format!("sqlite column '{column}' holds invalid UTF-8"), err)
            })?;
            Value::Text(text.to_string())
        }
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    };
    Ok(value)
}

/// Statements whose row count is meaningful. SQLite keeps reporting the last
/// DML count after DDL, so everything else reports 0.
fn is_dml(sql: &str) -> bool {
    let head: String = sql
        .trim_start()
        .chars()
        .take_while(char::is_ascii_alphabetic)
        .collect::<String>()
        .to_ascii_uppercase();
    matches!(head.as_str(), "INSERT" | "UPDATE" | "DELETE" | "REPLACE" | "WITH")
}

// ============================================================================
// Driver
// ============================================================================

/// One SQLite connection.
#[derive(Debug)]
pub struct SqliteDriver {
    conn: Option<Connection>,
    config: SqliteConfig,
}

impl SqliteDriver {
    /// Open the database described by `config`.
    #[tracing::instrument(level = "debug", skip(config), fields(path = %config.path))]
    pub fn open(config: &SqliteConfig) -> DriverResult<Self> {
        let conn = if config.path == MEMORY {
            Connection::open_in_memory()
        } else {
            Connection::open(&config.path)
        }
        .map_err(failure("open"))?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(failure("busy timeout"))?;
        let pragma = if config.foreign_keys {
            "PRAGMA foreign_keys = ON"
        } else {
            "PRAGMA foreign_keys = OFF"
        };
        conn.execute_batch(pragma).map_err(failure("pragma"))?;
        tracing::info!(path = %config.path, foreign_keys = config.foreign_keys, "Opened SQLite database");
        Ok(Self {
            conn: Some(conn),
            config: config.clone(),
        })
    }

    /// Private in-memory database.
    pub fn memory() -> DriverResult<Self> {
        Self::open(&SqliteConfig::memory())
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    fn conn(&self) -> DriverResult<&Connection> {
        self.conn.as_ref().ok_or_else(closed)
    }

    fn run(&self, sql: &str, context: &'static str) -> DriverResult<()> {
        tracing::debug!(sql, "SQLite control statement");
        self.conn()?.execute_batch(sql).map_err(failure(context))
    }
}

impl Driver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn prepare(&mut self, sql: &str, keys: &GeneratedKeys) -> DriverResult<Box<dyn Statement + '_>> {
        let conn = self.conn()?;
        let stmt = conn.prepare(sql).map_err(failure("prepare"))?;
        Ok(Box::new(SqliteStatement {
            conn,
            stmt,
            keys: keys.clone(),
            dml: is_dml(sql),
            bound: Vec::new(),
            batch: Vec::new(),
            last_key: None,
        }))
    }

    fn begin(&mut self, isolation: Option<IsolationLevel>) -> DriverResult<()> {
        if let Some(level) = isolation {
            // SQLite transactions are always serializable.
            tracing::debug!(isolation = level.as_sql(), "Isolation level not configurable on SQLite");
        }
        self.run("BEGIN", "begin")
    }

    fn commit(&mut self) -> DriverResult<()> {
        self.run("COMMIT", "commit")
    }

    fn rollback(&mut self) -> DriverResult<()> {
        self.run("ROLLBACK", "rollback")
    }

    fn savepoint(&mut self, savepoint: &Savepoint) -> DriverResult<()> {
        self.run(&format!("SAVEPOINT {}", savepoint.name()), "savepoint")
    }

    fn rollback_to(&mut self, savepoint: &Savepoint) -> DriverResult<()> {
        self.run(
            &format!("ROLLBACK TO SAVEPOINT {}", savepoint.name()),
            "rollback to savepoint",
        )
    }

    fn close(&mut self) -> DriverResult<()> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, err)| failure("close")(err)),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Statements and cursors
// ============================================================================

struct SqliteStatement<'c> {
    conn: &'c Connection,
    stmt: rusqlite::Statement<'c>,
    keys: GeneratedKeys,
    dml: bool,
    bound: Vec<(usize, SqlValue)>,
    batch: Vec<Vec<(usize, SqlValue)>>,
    last_key: Option<i64>,
}

impl SqliteStatement<'_> {
    fn apply(&mut self, values: &[(usize, SqlValue)]) -> DriverResult<()> {
        for (index, value) in values {
            self.stmt
                .raw_bind_parameter(*index, value)
                .map_err(failure("bind"))?;
        }
        Ok(())
    }

    fn execute_bound(&mut self, values: &[(usize, SqlValue)]) -> DriverResult<u64> {
        self.apply(values)?;
        let count = self.stmt.raw_execute().map_err(failure("execute"))?;
        if !self.dml {
            return Ok(0);
        }
        if count > 0 && self.keys != GeneratedKeys::None {
            self.last_key = Some(self.conn.last_insert_rowid());
        }
        Ok(count as u64)
    }

    fn columns(&self) -> Arc<[ColumnMeta]> {
        self.stmt
            .columns()
            .iter()
            .map(|c| ColumnMeta::new(c.name(), c.decl_type().and_then(WireType::from_declared)))
            .collect::<Vec<_>>()
            .into()
    }
}

impl Statement for SqliteStatement<'_> {
    fn bind(&mut self, index: usize, _wire: WireType, value: &Value) -> DriverResult<()> {
        self.bound.retain(|(i, _)| *i != index);
        self.bound.push((index, to_sql(value)));
        Ok(())
    }

    fn add_batch(&mut self) -> DriverResult<()> {
        self.batch.push(std::mem::take(&mut self.bound));
        Ok(())
    }

    fn execute_batch(&mut self) -> DriverResult<Vec<u64>> {
        let rows = std::mem::take(&mut self.batch);
        rows.iter().map(|values| self.execute_bound(values)).collect()
    }

    fn execute_update(&mut self) -> DriverResult<u64> {
        let values = std::mem::take(&mut self.bound);
        self.execute_bound(&values)
    }

    fn execute_query(&mut self) -> DriverResult<Box<dyn RowCursor + '_>> {
        let values = std::mem::take(&mut self.bound);
        self.apply(&values)?;
        let columns = self.columns();
        Ok(Box::new(SqliteCursor {
            rows: self.stmt.raw_query(),
            columns,
        }))
    }

    fn generated_key(&mut self) -> DriverResult<Option<Value>> {
        if self.keys == GeneratedKeys::None {
            return Ok(None);
        }
        Ok(self.last_key.map(Value::BigInt))
    }

    fn close(&mut self) -> DriverResult<()> {
        // Finalized when dropped.
        Ok(())
    }
}

struct SqliteCursor<'s> {
    rows: rusqlite::Rows<'s>,
    columns: Arc<[ColumnMeta]>,
}

impl RowCursor for SqliteCursor<'_> {
    fn next_row(&mut self) -> DriverResult<Option<Row>> {
        let Some(row) = self.rows.next().map_err(failure("step"))? else {
            return Ok(None);
        };
        let mut values = Vec::with_capacity(self.columns.len());
        for (i, column) in self.columns.iter().enumerate() {
            let value = row.get_ref(i).map_err(failure("read column"))?;
            values.push(from_sql(value, column.wire, &column.name)?);
        }
        Ok(Some(Row::new(Arc::clone(&self.columns), values)))
    }

    fn close(&mut self) -> DriverResult<()> {
        Ok(())
    }
}
